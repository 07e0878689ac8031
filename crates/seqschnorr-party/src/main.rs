//! Sequential Schnorr party CLI
//!
//! Command-line interface for one co-signer:
//! - Key generation
//! - Appending a signature to a running signature
//! - Checking a running signature before signing
//! - Verifying a finished signature

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use seqschnorr_core::{keygen, wire, Keypair, SessionConfig, SessionRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

/// Sequential Schnorr party node
#[derive(Parser)]
#[command(name = "seqschnorr-party")]
#[command(about = "Sequential n-of-n Schnorr co-signer")]
#[command(version)]
struct Cli {
    /// Data directory for key files
    #[arg(short, long, env = "SIGNER_DEST", default_value = "./data")]
    dest: PathBuf,

    /// Name of this signer's key file
    #[arg(short, long, env = "SIGNER_NAME", default_value = "default")]
    name: String,

    /// Treat messages as hex instead of UTF-8 text
    #[arg(long, global = true)]
    hex: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new signer key
    Keygen,

    /// Add this signer's signature to the running signature
    Append {
        /// Message to sign
        #[arg(short, long)]
        message: String,

        /// Ordered signer public keys (comma-separated hex)
        #[arg(short, long)]
        signers: String,

        /// This signer's position in the list (0-indexed)
        #[arg(short, long)]
        index: usize,

        /// Running signature from the previous signer (hex); omit for the first signer
        #[arg(long)]
        input: Option<String>,
    },

    /// Check a running signature left by the first `signed` signers
    Check {
        /// Message being signed
        #[arg(short, long)]
        message: String,

        /// Ordered signer public keys (comma-separated hex)
        #[arg(short, long)]
        signers: String,

        /// Number of signers that have already signed
        #[arg(long)]
        signed: usize,

        /// Running signature (hex)
        #[arg(long)]
        input: String,
    },

    /// Verify a finished signature against the signer list
    Verify {
        /// Signed message
        #[arg(short, long)]
        message: String,

        /// Signer public keys (comma-separated hex)
        #[arg(short, long)]
        signers: String,

        /// Signature (hex)
        #[arg(long)]
        signature: String,
    },

    /// Run a complete session locally with freshly generated keys
    Demo {
        /// Number of signers
        #[arg(short, long, default_value_t = 3)]
        parties: usize,

        /// Message to sign
        #[arg(short, long, default_value = "test msg")]
        message: String,
    },

    /// Show this signer's public key
    Info,
}

/// Key file contents
#[derive(Serialize, Deserialize)]
struct KeyFile {
    secret: String,
    public: String,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Keygen => run_keygen(&cli),
        Commands::Append {
            message,
            signers,
            index,
            input,
        } => run_append(&cli, message, signers, *index, input.as_deref()),
        Commands::Check {
            message,
            signers,
            signed,
            input,
        } => run_check(&cli, message, signers, *signed, input),
        Commands::Verify {
            message,
            signers,
            signature,
        } => run_verify(&cli, message, signers, signature),
        Commands::Demo { parties, message } => run_demo(&cli, *parties, message),
        Commands::Info => show_info(&cli),
    }
}

fn run_keygen(cli: &Cli) -> Result<()> {
    std::fs::create_dir_all(&cli.dest)?;

    let keypair = keygen::generate_keypair()?;
    let key_file = KeyFile {
        secret: hex::encode(keypair.secret_bytes()),
        public: hex::encode(keypair.public_bytes()),
    };

    let path = key_path(cli);
    let json = serde_json::to_string_pretty(&key_file)?;
    std::fs::write(&path, json)?;

    info!(public_key = %key_file.public, path = ?path, "Key generated and saved");

    println!("Public Key: {}", key_file.public);

    Ok(())
}

fn run_append(
    cli: &Cli,
    message: &str,
    signers: &str,
    index: usize,
    input: Option<&str>,
) -> Result<()> {
    let keypair = load_keypair(cli)?;
    let message = parse_message(cli, message)?;
    let signers = parse_signers(signers)?;
    let running = match input {
        Some(hex_sig) => parse_signature(hex_sig)?,
        None => [0u8; 64],
    };

    info!(index, signers = signers.len(), "Appending signature");

    let output = wire::append_signature(
        &running,
        &message,
        &keypair.secret_bytes(),
        &signers,
        index,
    )
    .with_context(|| format!("signer {} could not append", index))?;

    println!("{}", hex::encode(output));
    if index + 1 == signers.len() {
        println!("Signature complete");
    }

    Ok(())
}

fn run_check(cli: &Cli, message: &str, signers: &str, signed: usize, input: &str) -> Result<()> {
    let message = parse_message(cli, message)?;
    let signers = parse_signers(signers)?;
    if signed > signers.len() {
        bail!("{} signed but only {} signers", signed, signers.len());
    }
    let running = parse_signature(input)?;

    wire::verify_sign_input(&signers[..signed], &signers, &message, &running)
        .context("running signature rejected")?;

    println!("Running signature valid for {} of {} signers", signed, signers.len());
    Ok(())
}

fn run_verify(cli: &Cli, message: &str, signers: &str, signature: &str) -> Result<()> {
    let message = parse_message(cli, message)?;
    let signers = parse_signers(signers)?;
    let signature = parse_signature(signature)?;

    wire::multi_verify(&signers, &message, &signature).context("signature rejected")?;

    println!("Signature valid");
    Ok(())
}

fn run_demo(cli: &Cli, parties: usize, message: &str) -> Result<()> {
    let message = parse_message(cli, message)?;

    let keypairs = (0..parties)
        .map(|_| keygen::generate_keypair())
        .collect::<seqschnorr_core::Result<Vec<Keypair>>>()?;
    let points: Vec<_> = keypairs.iter().map(|k| k.public_point()).collect();

    let registry = SessionRegistry::new();
    let session_id = registry.open(SessionConfig::new(&message, &points)?)?;

    info!(
        session = %hex::encode(session_id),
        parties,
        "Starting demo session"
    );

    for (index, keypair) in keypairs.iter().enumerate() {
        let running = registry.append(&session_id, index, &keypair.private_key(&message)?)?;
        println!("  [{}] {} -> {}", index, hex::encode(keypair.public_bytes()), running);
    }

    let signature = registry.finalize(&session_id)?;
    let signers: Vec<String> = keypairs
        .iter()
        .map(|k| hex::encode(k.public_bytes()))
        .collect();

    println!("Signers: {}", signers.join(","));
    println!("Signature: {}", signature);

    Ok(())
}

fn show_info(cli: &Cli) -> Result<()> {
    let keypair = load_keypair(cli)?;

    println!("Signer Info:");
    println!("  Name: {}", cli.name);
    println!("  Public Key: {}", hex::encode(keypair.public_bytes()));

    Ok(())
}

fn key_path(cli: &Cli) -> PathBuf {
    cli.dest.join(format!("signer.{}.json", cli.name))
}

fn load_keypair(cli: &Cli) -> Result<Keypair> {
    let path = key_path(cli);
    read_key_file(&path).with_context(|| format!("loading {}", path.display()))
}

fn read_key_file(path: &Path) -> Result<Keypair> {
    let json = std::fs::read_to_string(path)?;
    let key_file: KeyFile = serde_json::from_str(&json)?;

    let secret: [u8; 32] = hex::decode(&key_file.secret)?
        .try_into()
        .map_err(|_| anyhow::anyhow!("Secret must be 32 bytes"))?;
    let keypair = Keypair::from_bytes(&secret)?;

    if hex::encode(keypair.public_bytes()) != key_file.public.to_lowercase() {
        bail!("public key does not match secret");
    }
    Ok(keypair)
}

fn parse_message(cli: &Cli, message: &str) -> Result<Vec<u8>> {
    if cli.hex {
        Ok(hex::decode(message).context("message is not valid hex")?)
    } else {
        Ok(message.as_bytes().to_vec())
    }
}

fn parse_signers(signers: &str) -> Result<Vec<[u8; 33]>> {
    signers
        .split(',')
        .map(|s| -> Result<[u8; 33]> {
            let bytes = hex::decode(s.trim()).with_context(|| format!("bad signer key {}", s))?;
            bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("Signer key {} must be 33 bytes", s))
        })
        .collect()
}

fn parse_signature(signature: &str) -> Result<[u8; 64]> {
    hex::decode(signature.trim())?
        .try_into()
        .map_err(|_| anyhow::anyhow!("Signature must be 64 bytes"))
}

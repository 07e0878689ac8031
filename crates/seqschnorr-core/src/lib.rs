//! # Sequential Schnorr Core
//!
//! Schnorr signatures over secp256k1 with sequential n-of-n aggregation.
//!
//! This crate provides:
//! - Curve arithmetic and compressed point encoding
//! - Key generation and deterministic per-message nonces
//! - Single-signer sign/verify
//! - The sequential protocol in which an ordered list of signers each extend
//!   a running signature until it verifies against the sum of their keys
//!
//! ## Protocol Overview
//!
//! Every signer derives its nonce from its own key and the message, so the
//! nonce commitments of all signers are known up front. The aggregate key
//! and aggregate nonce fix a single challenge for the whole session. Signer
//! `i` checks the running signature left by signers `0..i`, adds its share,
//! and passes the result on. The final artifact is an ordinary 64-byte
//! signature.
//!
//! ## Example
//!
//! ```rust,ignore
//! use seqschnorr_core::{keygen, sign, Signature};
//!
//! let mut running = Signature::ZERO;
//! for (index, keypair) in keypairs.iter().enumerate() {
//!     let private_key = keypair.private_key(message)?;
//!     running = sign::append_signature(&running, message, &private_key, &signers, index)?;
//! }
//! sign::multi_verify(&points, message, &running)?;
//! ```

pub mod curve;
pub mod error;
pub mod keygen;
pub mod session;
pub mod sign;
pub mod types;
pub mod wire;

pub use error::{Error, InputError, Result, VerifyFailure};
pub use keygen::{generate_keypair, Keypair};
pub use session::{SessionConfig, SessionRegistry, SigningSession};
pub use types::{PrivateKey, PublicKey, SessionId, Signature, SIGNATURE_LEN};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

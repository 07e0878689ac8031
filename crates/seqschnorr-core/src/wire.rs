//! Byte-level API
//!
//! Callers hand over raw wire values: 32-byte secrets, 33-byte compressed
//! long-term keys and 64-byte signatures. Nonces and nonce commitments are
//! derived here from the message, so signer lists only carry P.

use crate::curve::{self, POINT_LEN, SCALAR_LEN};
use crate::error::InputError;
use crate::keygen::generate_keypair;
use crate::types::SIGNATURE_LEN;
use crate::{sign, PrivateKey, PublicKey, Result, Signature};
use k256::ProjectivePoint;

fn signer_list(keys: &[[u8; POINT_LEN]], message: &[u8]) -> Result<Vec<PublicKey>> {
    keys.iter()
        .map(|p| PublicKey::from_bytes(p, message))
        .collect()
}

/// Fresh (secret, compressed public key) from the OS RNG
pub fn generate_keypair_bytes() -> Result<([u8; SCALAR_LEN], [u8; POINT_LEN])> {
    let keypair = generate_keypair()?;
    Ok((keypair.secret_bytes(), keypair.public_bytes()))
}

/// Extend `running` with the signature of the signer at `index`
pub fn append_signature(
    running: &[u8; SIGNATURE_LEN],
    message: &[u8],
    secret: &[u8; SCALAR_LEN],
    signers: &[[u8; POINT_LEN]],
    index: usize,
) -> Result<[u8; SIGNATURE_LEN]> {
    if signers.is_empty() {
        return Err(InputError::EmptyKeyList.into());
    }

    let private_key = PrivateKey::from_bytes(secret, message)?;
    let full = signer_list(signers, message)?;
    let running = Signature::from_bytes(running);

    let next = sign::append_signature(&running, message, &private_key, &full, index)?;
    Ok(next.to_bytes())
}

/// Check the running signature produced by `signed` within the session of `signers`
pub fn verify_sign_input(
    signed: &[[u8; POINT_LEN]],
    signers: &[[u8; POINT_LEN]],
    message: &[u8],
    running: &[u8; SIGNATURE_LEN],
) -> Result<()> {
    if signed.is_empty() {
        return Ok(());
    }
    if signers.is_empty() {
        return Err(InputError::EmptyKeyList.into());
    }
    if signers.len() < signed.len() {
        return Err(InputError::SubsetTooLarge {
            signed: signed.len(),
            total: signers.len(),
        }
        .into());
    }

    let signed = signer_list(signed, message)?;
    let full = signer_list(signers, message)?;
    sign::verify_sign_input(&signed, &full, message, &Signature::from_bytes(running))
}

/// Verify a signature against one compressed public key
pub fn verify(
    public_key: &[u8; POINT_LEN],
    message: &[u8],
    signature: &[u8; SIGNATURE_LEN],
) -> Result<()> {
    let point = curve::unmarshal(public_key)?;
    sign::verify(&point, message, &Signature::from_bytes(signature))
}

/// Verify a signature against the sum of several compressed public keys
pub fn multi_verify(
    public_keys: &[[u8; POINT_LEN]],
    message: &[u8],
    signature: &[u8; SIGNATURE_LEN],
) -> Result<()> {
    let points = public_keys
        .iter()
        .map(|p| curve::unmarshal(p))
        .collect::<Result<Vec<ProjectivePoint>>>()?;
    sign::multi_verify(&points, message, &Signature::from_bytes(signature))
}

//! Single-signer Schnorr signing and verification

use super::challenge::{aggregate_key, aggregate_point, challenge, nonce_y, parity_adjust};
use super::PartialSignature;
use crate::curve;
use crate::error::{Error, Result, VerifyFailure};
use crate::{PrivateKey, PublicKey, Signature};
use k256::ProjectivePoint;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument};

/// Whether two signer entries carry the same P and R
pub(crate) fn same_signer(a: &PublicKey, b: &PublicKey) -> bool {
    bool::from(a.p.ct_eq(&b.p) & a.r.ct_eq(&b.r))
}

/// Produce this signer's contribution (R_i, s_i) against the full signer list
///
/// The key's (d*G, k0*G) must appear somewhere in `ordered`. R_i is the raw,
/// unadjusted nonce point; s_i already carries the parity flip decided by
/// the aggregate nonce.
#[instrument(skip_all, fields(signers = ordered.len()))]
pub fn sign(
    message: &[u8],
    private_key: &PrivateKey,
    ordered: &[PublicKey],
) -> Result<PartialSignature> {
    let own = private_key.public_key();
    let slot = ordered
        .iter()
        .position(|entry| same_signer(&own, entry))
        .ok_or(Error::KeyMismatch { slot: None })?;

    let aggregate = aggregate_key(ordered)?;
    let (rx, _) = curve::affine_coordinates(&aggregate.r)?;
    let k = parity_adjust(&nonce_y(&aggregate.r)?, private_key.nonce());
    let e = challenge(&aggregate.p, &rx, message)?;
    let s = k + e * private_key.secret();

    debug!(slot, "Computed signature share");

    Ok(PartialSignature {
        slot,
        r_point: own.r,
        s,
    })
}

/// Check a signature against a single public key
///
/// Rejects r >= p and s >= N as invalid input. Otherwise recovers
/// R' = s*G - e*P and requires a non-identity R' whose y is a quadratic
/// residue and whose x equals r.
#[instrument(skip_all)]
pub fn verify(public_key: &ProjectivePoint, message: &[u8], signature: &Signature) -> Result<()> {
    signature.r_field()?;
    let s = signature.s_scalar()?;

    let e = challenge(public_key, &signature.r, message)?;
    let recovered = curve::subtract(
        &curve::scalar_base_mult(&s),
        &curve::scalar_mult(public_key, &e),
    );

    if recovered == ProjectivePoint::IDENTITY {
        return Err(VerifyFailure::IdentityPoint.into());
    }
    if curve::jacobi_y(&recovered)? != 1 {
        return Err(VerifyFailure::JacobiParity.into());
    }
    let (x, _) = curve::affine_coordinates(&recovered)?;
    if x != signature.r {
        return Err(VerifyFailure::XCoordinate.into());
    }

    Ok(())
}

/// Verify against the EC sum of several long-term keys
pub fn multi_verify(
    public_keys: &[ProjectivePoint],
    message: &[u8],
    signature: &Signature,
) -> Result<()> {
    let aggregate = aggregate_point(public_keys)?;
    verify(&aggregate, message, signature)
}

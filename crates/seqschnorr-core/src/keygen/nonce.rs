//! Deterministic per-message nonces
//!
//! Both halves of a signer's nonce come from the same child offset, so the
//! private nonce k0 = d + offset and the public commitment R = offset*G + P
//! always agree without any interaction.

use crate::curve;
use crate::error::{Error, InputError, Result};
use hmac::{Hmac, Mac};
use k256::{ProjectivePoint, Scalar};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// HMAC-SHA512 keyed by the 32-byte x-coordinate over (y || message)
///
/// Returns the left 32 bytes of the MAC as a big-endian integer; it is not
/// reduced mod N here.
pub fn child_offset(x: &[u8; 32], y: &[u8; 32], message: &[u8]) -> Result<[u8; 32]> {
    let mut hmac = HmacSha512::new_from_slice(x).map_err(|_| InputError::Length {
        expected: 32,
        actual: x.len(),
    })?;
    hmac.update(y);
    hmac.update(message);

    let result = hmac.finalize().into_bytes();
    let mut il = [0u8; 32];
    il.copy_from_slice(&result[..32]);
    Ok(il)
}

fn offset_for(point: &ProjectivePoint, message: &[u8]) -> Result<Scalar> {
    let (x, y) = curve::affine_coordinates(point)?;
    let il = child_offset(&x, &y, message)?;
    Ok(curve::reduce_scalar(&il))
}

/// k0 = (d + offset(d*G, message)) mod N
pub fn private_nonce(d: &Scalar, message: &[u8]) -> Result<Scalar> {
    let p = curve::scalar_base_mult(d);
    let k0 = *d + offset_for(&p, message)?;
    if k0 == Scalar::ZERO {
        return Err(Error::DegenerateNonce);
    }
    Ok(k0)
}

/// R = offset(P, message)*G + P, computable from public data alone
pub fn public_nonce(p: &ProjectivePoint, message: &[u8]) -> Result<ProjectivePoint> {
    let offset = offset_for(p, message)?;
    let r = curve::add(&curve::scalar_base_mult(&offset), p);
    if r == ProjectivePoint::IDENTITY {
        return Err(Error::DegenerateNonce);
    }
    Ok(r)
}

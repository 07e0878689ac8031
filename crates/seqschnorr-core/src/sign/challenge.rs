//! Key aggregation, challenge hashing and nonce parity normalization

use crate::curve;
use crate::error::{InputError, Result};
use crate::PublicKey;
use k256::{FieldElement, ProjectivePoint, Scalar};
use sha2::{Digest, Sha256};

/// EC sum of the points; fails on an empty list
pub fn aggregate_point(points: &[ProjectivePoint]) -> Result<ProjectivePoint> {
    if points.is_empty() {
        return Err(InputError::EmptyKeyList.into());
    }
    Ok(points
        .iter()
        .fold(ProjectivePoint::IDENTITY, |acc, point| curve::add(&acc, point)))
}

/// Sum the P fields and the R fields separately
pub fn aggregate_key(keys: &[PublicKey]) -> Result<PublicKey> {
    let p_points: Vec<ProjectivePoint> = keys.iter().map(|key| key.p).collect();
    let r_points: Vec<ProjectivePoint> = keys.iter().map(|key| key.r).collect();
    Ok(PublicKey::new(
        aggregate_point(&p_points)?,
        aggregate_point(&r_points)?,
    ))
}

/// e = SHA256(Rx || compressed(P) || message) mod N
pub fn challenge(p_agg: &ProjectivePoint, rx_agg: &[u8; 32], message: &[u8]) -> Result<Scalar> {
    let p_bytes = curve::marshal(p_agg)?;
    let digest = Sha256::new()
        .chain_update(rx_agg)
        .chain_update(p_bytes)
        .chain_update(message)
        .finalize();

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    Ok(curve::reduce_scalar(&hash))
}

/// k0 when Ry is a quadratic residue, N - k0 otherwise
pub fn parity_adjust(ry_agg: &FieldElement, k0: &Scalar) -> Scalar {
    if curve::jacobi(ry_agg) == 1 {
        *k0
    } else {
        -*k0
    }
}

/// Whether signers must negate their nonces for this aggregate nonce point
pub fn nonce_is_flipped(r_agg: &ProjectivePoint) -> Result<bool> {
    Ok(curve::jacobi_y(r_agg)? != 1)
}

/// Affine y of the aggregate nonce as a field element
pub(crate) fn nonce_y(r_agg: &ProjectivePoint) -> Result<FieldElement> {
    let (_, y) = curve::affine_coordinates(r_agg)?;
    curve::field_from_bytes(&y)
}

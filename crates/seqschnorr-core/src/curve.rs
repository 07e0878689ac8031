//! Curve arithmetic over secp256k1
//!
//! The curve is fixed at the type level by `k256`, so every operation here is
//! a free function over its point, scalar and field types. Points travel as
//! [`ProjectivePoint`]; the identity is representable but has no compressed
//! encoding.

use crate::error::{InputError, Result};
use k256::{
    elliptic_curve::{
        bigint::U256,
        ops::Reduce,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        PrimeField,
    },
    AffinePoint, EncodedPoint, FieldBytes, FieldElement, ProjectivePoint, Scalar,
};

/// Compressed point length (parity prefix + x)
pub const POINT_LEN: usize = 33;

/// Fixed width of scalars and field elements
pub const SCALAR_LEN: usize = 32;

/// k * G
pub fn scalar_base_mult(k: &Scalar) -> ProjectivePoint {
    ProjectivePoint::GENERATOR * k
}

/// k * P
pub fn scalar_mult(point: &ProjectivePoint, k: &Scalar) -> ProjectivePoint {
    *point * k
}

/// P + Q, identity-aware
pub fn add(p: &ProjectivePoint, q: &ProjectivePoint) -> ProjectivePoint {
    *p + q
}

/// -P (same x, y replaced by p - y)
pub fn negate(point: &ProjectivePoint) -> ProjectivePoint {
    -*point
}

/// P - Q
pub fn subtract(p: &ProjectivePoint, q: &ProjectivePoint) -> ProjectivePoint {
    add(p, &negate(q))
}

/// Whether P is a finite point satisfying y^2 = x^3 + 7; the identity is not
pub fn is_on_curve(point: &ProjectivePoint) -> bool {
    match affine_coordinates(point) {
        Ok((x, y)) => coordinates_on_curve(&x, &y),
        Err(_) => false,
    }
}

fn coordinates_on_curve(x: &[u8; SCALAR_LEN], y: &[u8; SCALAR_LEN]) -> bool {
    let encoded = EncodedPoint::from_affine_coordinates(
        &FieldBytes::from(*x),
        &FieldBytes::from(*y),
        false,
    );
    AffinePoint::from_encoded_point(&encoded).is_some().into()
}

/// Encode a point as 0x02/0x03 (by y parity) followed by big-endian x
pub fn marshal(point: &ProjectivePoint) -> Result<[u8; POINT_LEN]> {
    if *point == ProjectivePoint::IDENTITY {
        return Err(InputError::IdentityPoint.into());
    }

    let encoded = point.to_affine().to_encoded_point(true);
    let bytes: [u8; POINT_LEN] = encoded.as_bytes().try_into().map_err(|_| {
        InputError::Length {
            expected: POINT_LEN,
            actual: encoded.len(),
        }
    })?;
    Ok(bytes)
}

/// Decode a 33-byte compressed point, rejecting bad prefixes and off-curve x
pub fn unmarshal(bytes: &[u8]) -> Result<ProjectivePoint> {
    if bytes.len() != POINT_LEN {
        return Err(InputError::Length {
            expected: POINT_LEN,
            actual: bytes.len(),
        }
        .into());
    }
    match bytes[0] {
        0x02 | 0x03 => {}
        prefix => return Err(InputError::PointPrefix(prefix).into()),
    }

    let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| InputError::NotOnCurve)?;
    let affine_opt = AffinePoint::from_encoded_point(&encoded);
    let affine: AffinePoint =
        Option::<AffinePoint>::from(affine_opt).ok_or(InputError::NotOnCurve)?;
    let point = ProjectivePoint::from(affine);
    if !is_on_curve(&point) {
        return Err(InputError::NotOnCurve.into());
    }
    Ok(point)
}

/// Big-endian affine (x, y); fails on the identity
pub fn affine_coordinates(
    point: &ProjectivePoint,
) -> Result<([u8; SCALAR_LEN], [u8; SCALAR_LEN])> {
    let encoded = point.to_affine().to_encoded_point(false);
    match (encoded.x(), encoded.y()) {
        (Some(x), Some(y)) => {
            let mut x_bytes = [0u8; SCALAR_LEN];
            let mut y_bytes = [0u8; SCALAR_LEN];
            x_bytes.copy_from_slice(x);
            y_bytes.copy_from_slice(y);
            Ok((x_bytes, y_bytes))
        }
        _ => Err(InputError::IdentityPoint.into()),
    }
}

/// Fixed-width big-endian encoding, left-padded with zeros
pub fn scalar_to_bytes(scalar: &Scalar) -> [u8; SCALAR_LEN] {
    let mut out = [0u8; SCALAR_LEN];
    out.copy_from_slice(&scalar.to_bytes());
    out
}

/// Canonical scalar decoding; values >= N are rejected
pub fn scalar_from_bytes(bytes: &[u8; SCALAR_LEN]) -> Result<Scalar> {
    let scalar_opt = Scalar::from_repr(FieldBytes::from(*bytes));
    Option::<Scalar>::from(scalar_opt).ok_or_else(|| InputError::ScalarOutOfRange.into())
}

/// Interpret 32 big-endian bytes as an integer and reduce it mod N
pub fn reduce_scalar(bytes: &[u8; SCALAR_LEN]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&(*bytes).into())
}

/// Canonical field element decoding; values >= p are rejected
pub fn field_from_bytes(bytes: &[u8; SCALAR_LEN]) -> Result<FieldElement> {
    let fe_opt = FieldElement::from_bytes(&FieldBytes::from(*bytes));
    Option::<FieldElement>::from(fe_opt).ok_or_else(|| InputError::FieldOutOfRange.into())
}

/// Jacobi symbol (value / p): 0 for zero, 1 for a quadratic residue, -1 otherwise
///
/// p is prime, so the symbol reduces to whether a square root exists.
pub fn jacobi(value: &FieldElement) -> i8 {
    if bool::from(value.is_zero()) {
        0
    } else if bool::from(value.sqrt().is_some()) {
        1
    } else {
        -1
    }
}

/// Jacobi symbol of the point's y-coordinate; fails on the identity
pub fn jacobi_y(point: &ProjectivePoint) -> Result<i8> {
    let (_, y) = affine_coordinates(point)?;
    Ok(jacobi(&field_from_bytes(&y)?))
}

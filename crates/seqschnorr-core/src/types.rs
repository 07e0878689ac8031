//! Core types for sequential Schnorr signing

use crate::curve::{self, POINT_LEN, SCALAR_LEN};
use crate::error::InputError;
use crate::keygen;
use k256::{FieldElement, ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Unique identifier for a signing session
pub type SessionId = [u8; 32];

/// Signature wire length: r (32) || s (32)
pub const SIGNATURE_LEN: usize = 64;

/// Secret material for one signer and one message
///
/// `k0` is bound to the message it was derived for. Reusing it for another
/// message or another signer set leaks `d`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    d: Scalar,
    k0: Scalar,
}

impl PrivateKey {
    /// Build the session key for `message` from the long-term secret
    pub fn new(d: Scalar, message: &[u8]) -> crate::Result<Self> {
        if d == Scalar::ZERO {
            return Err(InputError::ZeroScalar.into());
        }
        let k0 = keygen::private_nonce(&d, message)?;
        Ok(Self { d, k0 })
    }

    /// Parse a 32-byte big-endian secret and derive its nonce for `message`
    pub fn from_bytes(secret: &[u8; SCALAR_LEN], message: &[u8]) -> crate::Result<Self> {
        Self::new(curve::scalar_from_bytes(secret)?, message)
    }

    pub(crate) fn secret(&self) -> &Scalar {
        &self.d
    }

    pub(crate) fn nonce(&self) -> &Scalar {
        &self.k0
    }

    /// The public half: P = d*G, R = k0*G
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            p: curve::scalar_base_mult(&self.d),
            r: curve::scalar_base_mult(&self.k0),
        }
    }

    /// 32-byte big-endian secret scalar
    pub fn to_bytes(&self) -> [u8; SCALAR_LEN] {
        curve::scalar_to_bytes(&self.d)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey").finish_non_exhaustive()
    }
}

/// A signer's long-term key P together with its nonce commitment R for one message
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublicKey {
    /// Long-term key
    pub p: ProjectivePoint,
    /// Per-message nonce commitment
    pub r: ProjectivePoint,
}

impl PublicKey {
    /// Pair explicit points
    pub fn new(p: ProjectivePoint, r: ProjectivePoint) -> Self {
        Self { p, r }
    }

    /// Recompute R from P and the message; anyone can do this
    pub fn for_message(p: ProjectivePoint, message: &[u8]) -> crate::Result<Self> {
        let r = keygen::public_nonce(&p, message)?;
        Ok(Self { p, r })
    }

    /// Parse a compressed long-term key and derive R for `message`
    pub fn from_bytes(p: &[u8], message: &[u8]) -> crate::Result<Self> {
        Self::for_message(curve::unmarshal(p)?, message)
    }

    /// Compressed long-term key
    pub fn p_bytes(&self) -> crate::Result<[u8; POINT_LEN]> {
        curve::marshal(&self.p)
    }

    /// Compressed nonce commitment
    pub fn r_bytes(&self) -> crate::Result<[u8; POINT_LEN]> {
        curve::marshal(&self.r)
    }
}

#[derive(Serialize, Deserialize)]
struct PublicKeyRepr {
    p: String,
    r: String,
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::Error;

        let repr = PublicKeyRepr {
            p: hex::encode(self.p_bytes().map_err(S::Error::custom)?),
            r: hex::encode(self.r_bytes().map_err(S::Error::custom)?),
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let repr = PublicKeyRepr::deserialize(deserializer)?;
        let decode = |value: &str| -> Result<ProjectivePoint, D::Error> {
            let bytes = hex::decode(value).map_err(D::Error::custom)?;
            curve::unmarshal(&bytes).map_err(D::Error::custom)
        };
        Ok(PublicKey {
            p: decode(&repr.p)?,
            r: decode(&repr.r)?,
        })
    }
}

/// Schnorr signature r || s
///
/// Also carries the running partial signature between sequential signers;
/// `Signature::ZERO` is the state before anyone has signed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    /// x-coordinate of the (aggregate) nonce point
    pub r: [u8; 32],
    /// Scalar component
    pub s: [u8; 32],
}

impl Signature {
    /// Running signature before the first signer
    pub const ZERO: Signature = Signature {
        r: [0u8; 32],
        s: [0u8; 32],
    };

    /// Create a new signature
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Self { r, s }
    }

    /// Take r from the nonce point's x-coordinate
    pub fn from_point(r_point: &ProjectivePoint, s: &Scalar) -> crate::Result<Self> {
        let (r, _) = curve::affine_coordinates(r_point)?;
        Ok(Self {
            r,
            s: curve::scalar_to_bytes(s),
        })
    }

    /// Split a 64-byte wire signature
    pub fn from_bytes(bytes: &[u8; SIGNATURE_LEN]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Self { r, s }
    }

    /// Like [`Signature::from_bytes`] with a length check
    pub fn from_slice(bytes: &[u8]) -> crate::Result<Self> {
        let array: &[u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| InputError::Length {
            expected: SIGNATURE_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self::from_bytes(array))
    }

    /// Convert to bytes (r || s)
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..].copy_from_slice(&self.s);
        bytes
    }

    /// r as a field element; fails if r >= p
    pub fn r_field(&self) -> crate::Result<FieldElement> {
        curve::field_from_bytes(&self.r)
    }

    /// s as a scalar; fails if s >= N
    pub fn s_scalar(&self) -> crate::Result<Scalar> {
        curve::scalar_from_bytes(&self.s)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        Signature::from_slice(&bytes).map_err(D::Error::custom)
    }
}

//! Signing module
//!
//! Single-signer Schnorr over an ordered signer list, and the sequential
//! protocol that threads a running signature from signer to signer.

mod challenge;
mod schnorr;
mod sequential;

pub use challenge::{aggregate_key, aggregate_point, challenge, nonce_is_flipped, parity_adjust};
pub use schnorr::{multi_verify, sign, verify};
pub use sequential::{append_signature, verify_sign_input};

use crate::{Result, Signature};
use k256::{ProjectivePoint, Scalar};

/// One signer's contribution
#[derive(Debug, Clone)]
pub struct PartialSignature {
    /// Position of the signer in the ordered list
    pub slot: usize,
    /// The signer's own nonce point k0*G, before any parity flip
    pub r_point: ProjectivePoint,
    /// s_i = k + e*d mod N
    pub s: Scalar,
}

impl PartialSignature {
    /// Standalone signature (R_i.x, s_i); valid on its own only for a single signer
    pub fn to_signature(&self) -> Result<Signature> {
        Signature::from_point(&self.r_point, &self.s)
    }
}

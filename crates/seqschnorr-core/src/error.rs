//! Error types for sequential Schnorr operations

use thiserror::Error;

/// Result type alias for signing and verification operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while signing, aggregating or verifying
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed or out-of-range input
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// The private key does not derive the public key it claims
    #[error("Private key does not match signer {}", slot_label(.slot))]
    KeyMismatch { slot: Option<usize> },

    /// A Schnorr equation check failed
    #[error("Verification failed: {0}")]
    VerificationFailed(#[from] VerifyFailure),

    /// The derived nonce reduced to zero
    #[error("Degenerate nonce: k0 reduced to zero")]
    DegenerateNonce,
}

fn slot_label(slot: &Option<usize>) -> String {
    match slot {
        Some(index) => format!("at index {}", index),
        None => "in signer list".to_string(),
    }
}

/// Reasons an input is rejected before any curve equation is evaluated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("compressed point prefix must be 0x02 or 0x03, got {0:#04x}")]
    PointPrefix(u8),

    #[error("point is not on the curve")]
    NotOnCurve,

    #[error("identity point has no compressed encoding")]
    IdentityPoint,

    #[error("scalar is larger than or equal to curve order")]
    ScalarOutOfRange,

    #[error("secret scalar is zero")]
    ZeroScalar,

    #[error("value is larger than or equal to field size")]
    FieldOutOfRange,

    #[error("signer list is empty")]
    EmptyKeyList,

    #[error("signed subset has {signed} keys but the full set only {total}")]
    SubsetTooLarge { signed: usize, total: usize },

    #[error("index {index} out of range for {len} signers")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("append out of sequence: expected index {expected}, got {got}")]
    OutOfSequence { expected: usize, got: usize },

    #[error("session {0} not found")]
    UnknownSession(String),

    #[error("session {0} is already open")]
    DuplicateSession(String),

    #[error("session already holds every signature")]
    SessionComplete,
}

/// Which inequality of a Schnorr check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyFailure {
    #[error("recovered nonce point is the identity")]
    IdentityPoint,

    #[error("recovered nonce y-coordinate is not a quadratic residue")]
    JacobiParity,

    #[error("recovered nonce x-coordinate does not match r")]
    XCoordinate,

    #[error("r does not match the signed subset's aggregate nonce")]
    RunningNonce,

    #[error("recovered nonce y-coordinate does not match the signed subset")]
    YCoordinate,

    #[error("session has {signed} of {total} signatures")]
    Incomplete { signed: usize, total: usize },
}

impl Error {
    /// Returns true for any verification failure, regardless of the inequality
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, Error::VerificationFailed(_))
    }
}

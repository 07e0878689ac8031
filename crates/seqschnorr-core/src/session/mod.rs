//! Signing sessions
//!
//! A [`SigningSession`] owns the running signature for one message and one
//! ordered signer list, and only accepts the signer at its cursor. This is
//! the coordination that [`crate::sign::append_signature`] leaves to the
//! caller.

mod registry;

pub use registry::SessionRegistry;

use crate::error::{InputError, VerifyFailure};
use crate::sign::{append_signature, multi_verify, verify_sign_input};
use crate::{PrivateKey, PublicKey, Result, SessionId, Signature};
use k256::ProjectivePoint;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Configuration for a signing session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session identifier
    pub session_id: SessionId,

    /// Message every signer signs
    pub message: Vec<u8>,

    /// Ordered signer list; position is identity
    pub signers: Vec<PublicKey>,
}

impl SessionConfig {
    /// Create a session for `message`, deriving each signer's nonce commitment
    pub fn new(message: &[u8], signer_keys: &[ProjectivePoint]) -> Result<Self> {
        let signers = signer_keys
            .iter()
            .map(|p| PublicKey::for_message(*p, message))
            .collect::<Result<Vec<_>>>()?;
        Self::with_signers(message, signers)
    }

    /// Create a session from already-derived signer entries
    pub fn with_signers(message: &[u8], signers: Vec<PublicKey>) -> Result<Self> {
        if signers.is_empty() {
            return Err(InputError::EmptyKeyList.into());
        }

        Ok(Self {
            session_id: rand::random(),
            message: message.to_vec(),
            signers,
        })
    }

    /// Long-term keys of every signer, in order
    pub fn signer_points(&self) -> Vec<ProjectivePoint> {
        self.signers.iter().map(|key| key.p).collect()
    }
}

/// Running state of one sequential signing session
#[derive(Debug, Clone)]
pub struct SigningSession {
    config: SessionConfig,
    cursor: usize,
    running: Signature,
}

impl SigningSession {
    /// Start a session with nobody signed
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            cursor: 0,
            running: Signature::ZERO,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.config.session_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Index of the next signer
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn running_signature(&self) -> &Signature {
        &self.running
    }

    /// Check if every signer has contributed
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.config.signers.len()
    }

    fn expect_next(&self, index: usize) -> Result<()> {
        if self.is_complete() {
            return Err(InputError::SessionComplete.into());
        }
        if index != self.cursor {
            return Err(InputError::OutOfSequence {
                expected: self.cursor,
                got: index,
            }
            .into());
        }
        Ok(())
    }

    /// Sign locally as the signer at `index`, which must equal the cursor
    #[instrument(skip(self, private_key), fields(session = %hex::encode(self.session_id())))]
    pub fn append(&mut self, index: usize, private_key: &PrivateKey) -> Result<Signature> {
        self.expect_next(index)?;

        let next = append_signature(
            &self.running,
            &self.config.message,
            private_key,
            &self.config.signers,
            index,
        )?;
        self.advance(next);
        Ok(next)
    }

    /// Accept a running signature produced elsewhere by the signer at `index`
    ///
    /// The signature must verify as the checkpoint after `index`; a rejected
    /// submission leaves the session unchanged.
    #[instrument(skip(self, running), fields(session = %hex::encode(self.session_id())))]
    pub fn submit(&mut self, index: usize, running: Signature) -> Result<()> {
        self.expect_next(index)?;

        verify_sign_input(
            &self.config.signers[..=index],
            &self.config.signers,
            &self.config.message,
            &running,
        )?;
        self.advance(running);
        Ok(())
    }

    fn advance(&mut self, running: Signature) {
        self.running = running;
        self.cursor += 1;
        info!(
            signed = self.cursor,
            signers = self.config.signers.len(),
            "Session advanced"
        );
    }

    /// Re-check the current running signature against the signers so far
    pub fn check(&self) -> Result<()> {
        verify_sign_input(
            &self.config.signers[..self.cursor],
            &self.config.signers,
            &self.config.message,
            &self.running,
        )
    }

    /// The final signature, verified against the sum of all long-term keys
    pub fn finalize(&self) -> Result<Signature> {
        if !self.is_complete() {
            return Err(VerifyFailure::Incomplete {
                signed: self.cursor,
                total: self.config.signers.len(),
            }
            .into());
        }

        multi_verify(
            &self.config.signer_points(),
            &self.config.message,
            &self.running,
        )?;
        Ok(self.running)
    }
}

//! Concurrent store of signing sessions

use super::{SessionConfig, SigningSession};
use crate::error::InputError;
use crate::{PrivateKey, Result, SessionId, Signature};
use dashmap::{mapref::entry::Entry, DashMap};
use tracing::{debug, info};

/// Sessions keyed by id
///
/// Every mutation holds the entry's exclusive lock for the whole append, so
/// two signers racing on one session cannot both extend the same running
/// signature. Distinct sessions do not block each other beyond their shard.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SigningSession>,
}

fn unknown(session_id: &SessionId) -> InputError {
    InputError::UnknownSession(hex::encode(session_id))
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh session and return its id
    ///
    /// An id that is already registered is rejected; the live session keeps
    /// its cursor and running signature.
    pub fn open(&self, config: SessionConfig) -> Result<SessionId> {
        let session_id = config.session_id;
        match self.sessions.entry(session_id) {
            Entry::Occupied(_) => {
                Err(InputError::DuplicateSession(hex::encode(session_id)).into())
            }
            Entry::Vacant(slot) => {
                debug!(
                    session = %hex::encode(session_id),
                    signers = config.signers.len(),
                    "Opening session"
                );
                slot.insert(SigningSession::new(config));
                Ok(session_id)
            }
        }
    }

    /// Append a local signature to the session at `index`
    pub fn append(
        &self,
        session_id: &SessionId,
        index: usize,
        private_key: &PrivateKey,
    ) -> Result<Signature> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| unknown(session_id))?;
        session.append(index, private_key)
    }

    /// Accept a running signature computed by a remote signer
    pub fn submit(&self, session_id: &SessionId, index: usize, running: Signature) -> Result<()> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| unknown(session_id))?;
        session.submit(index, running)
    }

    /// Current running signature of the session
    pub fn running_signature(&self, session_id: &SessionId) -> Result<Signature> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| unknown(session_id))?;
        Ok(*session.running_signature())
    }

    /// Index of the signer expected next
    pub fn cursor(&self, session_id: &SessionId) -> Result<usize> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| unknown(session_id))?;
        Ok(session.cursor())
    }

    /// Verify the completed session, remove it and return its signature
    ///
    /// An incomplete or invalid session stays registered.
    pub fn finalize(&self, session_id: &SessionId) -> Result<Signature> {
        let signature = {
            let session = self
                .sessions
                .get(session_id)
                .ok_or_else(|| unknown(session_id))?;
            session.finalize()?
        };

        self.sessions.remove(session_id);
        info!(session = %hex::encode(session_id), "Session completed");
        Ok(signature)
    }

    /// Drop a session without finishing it
    pub fn abort(&self, session_id: &SessionId) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::keygen::{generate_keypair_with, Keypair};
    use k256::ProjectivePoint;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;
    use std::thread;

    fn keypairs(n: usize, seed: u64) -> Vec<Keypair> {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        (0..n).map(|_| generate_keypair_with(&mut rng).unwrap()).collect()
    }

    fn config(keys: &[Keypair], message: &[u8]) -> SessionConfig {
        let points: Vec<ProjectivePoint> = keys.iter().map(|k| k.public_point()).collect();
        SessionConfig::new(message, &points).unwrap()
    }

    #[test]
    fn test_open_append_finalize() {
        let registry = SessionRegistry::new();
        let message = b"registry";
        let keys = keypairs(3, 1);
        let id = registry.open(config(&keys, message)).unwrap();
        assert_eq!(registry.len(), 1);

        for (index, keypair) in keys.iter().enumerate() {
            assert_eq!(registry.cursor(&id).unwrap(), index);
            registry
                .append(&id, index, &keypair.private_key(message).unwrap())
                .unwrap();
        }

        registry.finalize(&id).unwrap();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.running_signature(&id),
            Err(Error::InvalidInput(InputError::UnknownSession(_)))
        ));
    }

    #[test]
    fn test_reopening_live_session_is_rejected() {
        let registry = SessionRegistry::new();
        let message = b"reopen";
        let keys = keypairs(2, 5);
        let session_config = config(&keys, message);
        let id = registry.open(session_config.clone()).unwrap();

        let first = registry
            .append(&id, 0, &keys[0].private_key(message).unwrap())
            .unwrap();

        assert_eq!(
            registry.open(session_config),
            Err(Error::InvalidInput(InputError::DuplicateSession(hex::encode(id))))
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.cursor(&id).unwrap(), 1);
        assert_eq!(registry.running_signature(&id).unwrap(), first);
        assert_eq!(
            registry.append(&id, 0, &keys[0].private_key(message).unwrap()),
            Err(Error::InvalidInput(InputError::OutOfSequence { expected: 1, got: 0 }))
        );

        registry
            .append(&id, 1, &keys[1].private_key(message).unwrap())
            .unwrap();
        registry.finalize(&id).unwrap();
    }

    #[test]
    fn test_incomplete_session_stays_registered() {
        let registry = SessionRegistry::new();
        let message = b"partial";
        let keys = keypairs(2, 2);
        let id = registry.open(config(&keys, message)).unwrap();
        registry
            .append(&id, 0, &keys[0].private_key(message).unwrap())
            .unwrap();

        assert!(registry.finalize(&id).is_err());
        assert_eq!(registry.len(), 1);
        assert!(registry.abort(&id));
        assert!(!registry.abort(&id));
    }

    #[test]
    fn test_racing_appends_on_one_session_serialize() {
        let registry = SessionRegistry::new();
        let message = b"race";
        let keys = keypairs(2, 3);
        let id = registry.open(config(&keys, message)).unwrap();

        let outcomes: Vec<Result<Signature>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let registry = &registry;
                    let key = keys[0].private_key(message).unwrap();
                    scope.spawn(move || registry.append(&id, 0, &key))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        for outcome in outcomes.iter().filter(|r| r.is_err()) {
            assert_eq!(
                outcome.as_ref().unwrap_err(),
                &Error::InvalidInput(InputError::OutOfSequence { expected: 1, got: 0 })
            );
        }
        assert_eq!(registry.cursor(&id).unwrap(), 1);
    }

    #[test]
    fn test_independent_sessions_in_parallel() {
        let registry = SessionRegistry::new();
        let keys = keypairs(3, 4);
        let messages: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i; 16]).collect();
        let ids: Vec<SessionId> = messages
            .iter()
            .map(|m| registry.open(config(&keys, m)).unwrap())
            .collect();

        thread::scope(|scope| {
            for (id, message) in ids.iter().zip(&messages) {
                let registry = &registry;
                let keys = &keys;
                scope.spawn(move || {
                    for (index, keypair) in keys.iter().enumerate() {
                        registry
                            .append(id, index, &keypair.private_key(message).unwrap())
                            .unwrap();
                    }
                });
            }
        });

        for id in &ids {
            registry.finalize(id).unwrap();
        }
        assert!(registry.is_empty());
    }
}

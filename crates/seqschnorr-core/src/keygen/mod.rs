//! Key generation module
//!
//! Long-term keys are drawn once from a secure RNG; per-message nonces are
//! derived deterministically from them (see [`private_nonce`] and
//! [`public_nonce`]).

mod nonce;

pub use nonce::{child_offset, private_nonce, public_nonce};

use crate::curve::{self, POINT_LEN, SCALAR_LEN};
use crate::{PrivateKey, PublicKey, Result};
use k256::{ProjectivePoint, Scalar};
use rand::rngs::OsRng;
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, instrument};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Long-term signer key
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Keypair {
    secret: Scalar,
    #[zeroize(skip)]
    public: [u8; POINT_LEN],
}

impl Keypair {
    /// Rebuild a keypair from a nonzero secret scalar
    pub fn from_secret(secret: Scalar) -> Result<Self> {
        if secret == Scalar::ZERO {
            return Err(crate::error::InputError::ZeroScalar.into());
        }
        let public = curve::marshal(&curve::scalar_base_mult(&secret))?;
        Ok(Self { secret, public })
    }

    /// Parse a 32-byte big-endian secret
    pub fn from_bytes(secret: &[u8; SCALAR_LEN]) -> Result<Self> {
        Self::from_secret(curve::scalar_from_bytes(secret)?)
    }

    /// 32-byte big-endian secret scalar
    pub fn secret_bytes(&self) -> [u8; SCALAR_LEN] {
        curve::scalar_to_bytes(&self.secret)
    }

    /// Compressed long-term public key
    pub fn public_bytes(&self) -> [u8; POINT_LEN] {
        self.public
    }

    /// Long-term public key as a point
    pub fn public_point(&self) -> ProjectivePoint {
        curve::scalar_base_mult(&self.secret)
    }

    /// Session key (d, k0) for signing `message`
    pub fn private_key(&self, message: &[u8]) -> Result<PrivateKey> {
        PrivateKey::new(self.secret, message)
    }

    /// Signer-list entry (P, R) for `message`
    pub fn public_key(&self, message: &[u8]) -> Result<PublicKey> {
        PublicKey::for_message(self.public_point(), message)
    }
}

/// Generate a keypair from the operating system RNG
pub fn generate_keypair() -> Result<Keypair> {
    generate_keypair_with(&mut OsRng)
}

/// Generate a keypair, redrawing until the secret is nonzero mod N
#[instrument(skip(rng))]
pub fn generate_keypair_with<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Keypair> {
    let mut buf = Zeroizing::new([0u8; SCALAR_LEN]);
    let secret = loop {
        rng.fill_bytes(&mut buf[..]);
        let candidate = curve::reduce_scalar(&buf);
        if candidate != Scalar::ZERO {
            break candidate;
        }
        debug!("Drew a zero secret, redrawing");
    };

    let keypair = Keypair::from_secret(secret)?;
    debug!(public_key = hex::encode(keypair.public), "Generated keypair");
    Ok(keypair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    /// Yields N on the first draw, then delegates
    struct OrderThenRandom {
        first: bool,
        inner: ChaCha20Rng,
    }

    impl RngCore for OrderThenRandom {
        fn next_u32(&mut self) -> u32 {
            self.inner.next_u32()
        }

        fn next_u64(&mut self) -> u64 {
            self.inner.next_u64()
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            if self.first {
                self.first = false;
                let order =
                    hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141")
                        .unwrap();
                dest.copy_from_slice(&order);
            } else {
                self.inner.fill_bytes(dest);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for OrderThenRandom {}

    #[test]
    fn test_generate_keypair_is_valid() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for _ in 0..8 {
            let keypair = generate_keypair_with(&mut rng).unwrap();
            assert_ne!(keypair.secret_bytes(), [0u8; 32]);
            assert_ne!(keypair.public_point(), ProjectivePoint::IDENTITY);
            assert_eq!(
                curve::unmarshal(&keypair.public_bytes()).unwrap(),
                keypair.public_point()
            );
        }
    }

    #[test]
    fn test_generate_keypair_redraws_zero() {
        let mut rng = OrderThenRandom {
            first: true,
            inner: ChaCha20Rng::seed_from_u64(1),
        };
        let keypair = generate_keypair_with(&mut rng).unwrap();
        assert_ne!(keypair.secret_bytes(), [0u8; 32]);
    }

    #[test]
    fn test_os_rng_keypair() {
        let keypair = generate_keypair().unwrap();
        let rebuilt = Keypair::from_bytes(&keypair.secret_bytes()).unwrap();
        assert_eq!(rebuilt.public_bytes(), keypair.public_bytes());
    }

    #[test]
    fn test_session_keys_agree() {
        let keypair = Keypair::from_secret(Scalar::from(11u64)).unwrap();
        let message = b"session";
        let private_key = keypair.private_key(message).unwrap();
        assert_eq!(private_key.public_key(), keypair.public_key(message).unwrap());
    }

    #[test]
    fn test_from_secret_rejects_zero() {
        assert!(Keypair::from_secret(Scalar::ZERO).is_err());
    }
}

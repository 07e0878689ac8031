//! Sequential n-of-n aggregation
//!
//! Signers contribute one at a time in list order. Each inherits the running
//! signature from its predecessors, checks it with [`verify_sign_input`], and
//! folds in its own share with [`append_signature`]. After the last index the
//! running signature verifies against the sum of every long-term key.
//!
//! Nothing here tracks which indices have already signed; the caller must
//! serialize appends per session (see [`crate::session`]).

use super::challenge::{aggregate_key, challenge, nonce_is_flipped};
use super::schnorr::{same_signer, sign};
use crate::curve;
use crate::error::{Error, InputError, Result, VerifyFailure};
use crate::{PrivateKey, PublicKey, Signature};
use k256::ProjectivePoint;
use tracing::{debug, info, instrument, warn};

/// Check a running signature produced by `signed` within the session of `full`
///
/// Trivially succeeds when nobody has signed. The challenge always comes from
/// the full set's aggregate. The recovered point s*G - e*P_signed must have
/// x == r == the subset's aggregate R.x, and must equal the subset's
/// aggregate R once the full set's parity flip is undone.
#[instrument(skip_all, fields(signed = signed.len(), signers = full.len()))]
pub fn verify_sign_input(
    signed: &[PublicKey],
    full: &[PublicKey],
    message: &[u8],
    running: &Signature,
) -> Result<()> {
    if signed.is_empty() {
        return Ok(());
    }
    if full.is_empty() {
        return Err(InputError::EmptyKeyList.into());
    }
    if signed.len() > full.len() {
        return Err(InputError::SubsetTooLarge {
            signed: signed.len(),
            total: full.len(),
        }
        .into());
    }

    running.r_field()?;
    let s = running.s_scalar()?;

    let session = aggregate_key(full)?;
    let (session_rx, _) = curve::affine_coordinates(&session.r)?;
    let e = challenge(&session.p, &session_rx, message)?;
    let flipped = nonce_is_flipped(&session.r)?;

    let subset = aggregate_key(signed)?;
    let recovered = curve::subtract(
        &curve::scalar_base_mult(&s),
        &curve::scalar_mult(&subset.p, &e),
    );

    let failure = check_recovered(&recovered, &subset.r, flipped, running);
    if let Err(reason) = failure {
        warn!(%reason, "Running signature rejected");
        return Err(reason.into());
    }

    debug!(flipped, "Running signature accepted");
    Ok(())
}

fn check_recovered(
    recovered: &ProjectivePoint,
    subset_r: &ProjectivePoint,
    flipped: bool,
    running: &Signature,
) -> std::result::Result<(), VerifyFailure> {
    if *recovered == ProjectivePoint::IDENTITY || *subset_r == ProjectivePoint::IDENTITY {
        return Err(VerifyFailure::IdentityPoint);
    }
    let (recovered_x, _) =
        curve::affine_coordinates(recovered).map_err(|_| VerifyFailure::IdentityPoint)?;
    let (subset_rx, _) =
        curve::affine_coordinates(subset_r).map_err(|_| VerifyFailure::IdentityPoint)?;

    if recovered_x != running.r {
        return Err(VerifyFailure::XCoordinate);
    }
    if subset_rx != running.r {
        return Err(VerifyFailure::RunningNonce);
    }

    let expected = if flipped {
        curve::negate(subset_r)
    } else {
        *subset_r
    };
    if *recovered != expected {
        return Err(VerifyFailure::YCoordinate);
    }
    Ok(())
}

/// Fold signer `index`'s share into the running signature
///
/// For `index > 0` the inherited signature is checked against
/// `full[..index]` first and any failure aborts the call. The new r is the
/// x-coordinate of the nonce sum over `full[..=index]`; the new s is the
/// running s plus this signer's share.
#[instrument(skip(running, message, private_key, full), fields(signers = full.len()))]
pub fn append_signature(
    running: &Signature,
    message: &[u8],
    private_key: &PrivateKey,
    full: &[PublicKey],
    index: usize,
) -> Result<Signature> {
    if index >= full.len() {
        return Err(InputError::IndexOutOfRange {
            index,
            len: full.len(),
        }
        .into());
    }
    if !same_signer(&private_key.public_key(), &full[index]) {
        return Err(Error::KeyMismatch { slot: Some(index) });
    }

    if index > 0 {
        verify_sign_input(&full[..index], full, message, running)?;
    }

    let share = sign(message, private_key, full)?;

    let signature = if index == 0 {
        share.to_signature()?
    } else {
        let prior = aggregate_key(&full[..index])?;
        let r_point = curve::add(&prior.r, &share.r_point);
        let s = running.s_scalar()? + share.s;
        Signature::from_point(&r_point, &s)?
    };

    info!(
        index,
        complete = index + 1 == full.len(),
        "Appended signature"
    );

    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::{generate_keypair_with, Keypair};
    use crate::sign::multi_verify;
    use k256::Scalar;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    struct Party {
        private_key: PrivateKey,
        public_key: PublicKey,
        point: ProjectivePoint,
    }

    fn parties(n: usize, seed: u64, message: &[u8]) -> Vec<Party> {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let keypair = generate_keypair_with(&mut rng).unwrap();
                party_from(&keypair, message)
            })
            .collect()
    }

    fn party_from(keypair: &Keypair, message: &[u8]) -> Party {
        Party {
            private_key: keypair.private_key(message).unwrap(),
            public_key: keypair.public_key(message).unwrap(),
            point: keypair.public_point(),
        }
    }

    fn run(parties: &[Party], message: &[u8]) -> Vec<Signature> {
        let full: Vec<PublicKey> = parties.iter().map(|p| p.public_key).collect();
        let mut running = Signature::ZERO;
        let mut history = Vec::new();
        for (index, party) in parties.iter().enumerate() {
            running = append_signature(&running, message, &party.private_key, &full, index).unwrap();
            history.push(running);
        }
        history
    }

    #[test]
    fn test_aggregation_round_trip() {
        let message = b"aggregate me";
        for (seed, n) in [1usize, 2, 5, 10].into_iter().enumerate() {
            let parties = parties(n, seed as u64, message);
            let history = run(&parties, message);
            let points: Vec<ProjectivePoint> = parties.iter().map(|p| p.point).collect();
            multi_verify(&points, message, history.last().unwrap()).unwrap();
        }
    }

    #[test]
    fn test_checkpoints_hold_after_each_signer() {
        let message = b"checkpoints";
        let parties = parties(5, 11, message);
        let full: Vec<PublicKey> = parties.iter().map(|p| p.public_key).collect();
        let history = run(&parties, message);

        verify_sign_input(&[], &full, message, &Signature::ZERO).unwrap();
        for (k, running) in history.iter().enumerate() {
            verify_sign_input(&full[..k + 1], &full, message, running).unwrap();
        }
    }

    #[test]
    fn test_checkpoint_detects_tampered_bytes() {
        let message = b"tamper";
        let parties = parties(4, 21, message);
        let full: Vec<PublicKey> = parties.iter().map(|p| p.public_key).collect();
        let history = run(&parties, message);
        let running = history[1];

        for position in [0usize, 17, 31, 32, 45, 63] {
            let mut bytes = running.to_bytes();
            bytes[position] ^= 0x01;
            let tampered = Signature::from_bytes(&bytes);
            assert!(verify_sign_input(&full[..2], &full, message, &tampered).is_err());
        }
    }

    #[test]
    fn test_checkpoint_detects_wrong_subset() {
        let message = b"subset";
        let parties = parties(4, 31, message);
        let full: Vec<PublicKey> = parties.iter().map(|p| p.public_key).collect();
        let history = run(&parties, message);

        // signed by positions 0 and 1; claim positions 1 and 2 instead
        assert!(verify_sign_input(&full[1..3], &full, message, &history[1]).is_err());

        // same keys moved to different positions of the full list
        let mut reordered = full.clone();
        reordered.swap(1, 2);
        assert!(verify_sign_input(&reordered[..2], &reordered, message, &history[1]).is_err());
    }

    #[test]
    fn test_checkpoint_rejects_oversized_subset() {
        let message = b"oversized";
        let parties = parties(2, 41, message);
        let full: Vec<PublicKey> = parties.iter().map(|p| p.public_key).collect();
        let mut signed = full.clone();
        signed.push(full[0]);
        assert_eq!(
            verify_sign_input(&signed, &full, message, &Signature::ZERO),
            Err(Error::InvalidInput(InputError::SubsetTooLarge { signed: 3, total: 2 }))
        );
        assert_eq!(
            verify_sign_input(&full, &[], message, &Signature::ZERO),
            Err(Error::InvalidInput(InputError::EmptyKeyList))
        );
    }

    #[test]
    fn test_append_rejects_bad_index() {
        let message = b"index";
        let parties = parties(3, 51, message);
        let full: Vec<PublicKey> = parties.iter().map(|p| p.public_key).collect();

        assert_eq!(
            append_signature(&Signature::ZERO, message, &parties[0].private_key, &full, 3),
            Err(Error::InvalidInput(InputError::IndexOutOfRange { index: 3, len: 3 }))
        );
        assert_eq!(
            append_signature(&Signature::ZERO, message, &parties[0].private_key, &full, 1),
            Err(Error::KeyMismatch { slot: Some(1) })
        );
    }

    #[test]
    fn test_append_aborts_on_tampered_input() {
        let message = b"abort";
        let parties = parties(3, 61, message);
        let full: Vec<PublicKey> = parties.iter().map(|p| p.public_key).collect();
        let first =
            append_signature(&Signature::ZERO, message, &parties[0].private_key, &full, 0).unwrap();

        let mut bytes = first.to_bytes();
        bytes[40] ^= 0x80;
        let tampered = Signature::from_bytes(&bytes);
        let err = append_signature(&tampered, message, &parties[1].private_key, &full, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::VerificationFailed(_) | Error::InvalidInput(InputError::ScalarOutOfRange)
        ));
    }

    #[test]
    fn test_skipping_a_signer_is_caught_downstream() {
        let message = b"skip";
        let parties = parties(3, 71, message);
        let full: Vec<PublicKey> = parties.iter().map(|p| p.public_key).collect();
        let first =
            append_signature(&Signature::ZERO, message, &parties[0].private_key, &full, 0).unwrap();

        // signer 2 acts as if signer 1 had already contributed
        assert!(append_signature(&first, message, &parties[2].private_key, &full, 2).is_err());
    }

    #[test]
    fn test_two_of_two_unit_keys_match_direct_verify() {
        let message = b"test msg";
        let parties: Vec<Party> = [1u64, 2]
            .iter()
            .map(|d| party_from(&Keypair::from_secret(Scalar::from(*d)).unwrap(), message))
            .collect();
        let history = run(&parties, message);
        let signature = history.last().unwrap();

        let points: Vec<ProjectivePoint> = parties.iter().map(|p| p.point).collect();
        multi_verify(&points, message, signature).unwrap();

        let three_g = curve::scalar_base_mult(&Scalar::from(3u64));
        crate::sign::verify(&three_g, message, signature).unwrap();
    }
}

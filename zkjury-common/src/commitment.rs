//! Juror secret material and the commitment scheme.
//!
//! A juror owns a `(nullifier, secret)` pair sampled as 31 random bytes each,
//! interpreted little-endian. 31 bytes keep the raw integer strictly below
//! 2^248, comfortably inside the 254-bit field, so the byte-to-field mapping
//! is injective and the commitment stays binding at the byte level.

use halo2curves_axiom::bn256::Fr;
use halo2curves_axiom::ff::PrimeField;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{poseidon, reduce_le_bytes_to_fr};

/// Width of sampled secret material in bytes.
pub const SECRET_BYTES: usize = 31;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The value does not fit below the 2^248 sampling bound.
    #[error("secret material exceeds the {SECRET_BYTES}-byte sampling bound")]
    OutOfRange,
}

/// The vote bound into a commitment: a single bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    No,
    Yes,
}

impl VoteChoice {
    pub fn from_bit(bit: u8) -> Result<Self, crate::CodecError> {
        match bit {
            0 => Ok(VoteChoice::No),
            1 => Ok(VoteChoice::Yes),
            other => Err(crate::CodecError::InvalidVoteBit(other)),
        }
    }

    /// Parses a field element that is expected to encode a vote bit.
    pub fn from_fr(value: Fr) -> Result<Self, crate::CodecError> {
        if value == Fr::zero() {
            Ok(VoteChoice::No)
        } else if value == Fr::one() {
            Ok(VoteChoice::Yes)
        } else {
            Err(crate::CodecError::VoteNotBoolean)
        }
    }

    pub fn bit(self) -> u8 {
        match self {
            VoteChoice::No => 0,
            VoteChoice::Yes => 1,
        }
    }

    pub fn to_fr(self) -> Fr {
        Fr::from(self.bit() as u64)
    }

    pub fn opposite(self) -> Self {
        match self {
            VoteChoice::No => VoteChoice::Yes,
            VoteChoice::Yes => VoteChoice::No,
        }
    }
}

/// A juror's private `(nullifier, secret)` pair.
///
/// Construction is restricted to the checked constructors so that both values
/// are guaranteed to sit below the sampling bound. The pair never leaves the
/// juror's process; only the derived commitment and nullifier hash are shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JurorKey {
    nullifier: Fr,
    secret: Fr,
}

impl JurorKey {
    /// Samples a fresh key. Draws 31 bytes per value and resamples on the
    /// (explicitly checked) out-of-range case rather than reducing silently.
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        loop {
            let nullifier = random_secret_fr(rng);
            let secret = random_secret_fr(rng);
            if let Ok(key) = Self::from_parts(nullifier, secret) {
                return key;
            }
        }
    }

    /// Imports previously sampled 31-byte secret material (little-endian).
    pub fn from_bytes(
        nullifier: [u8; SECRET_BYTES],
        secret: [u8; SECRET_BYTES],
    ) -> Result<Self, KeyError> {
        Self::from_parts(
            reduce_le_bytes_to_fr(&nullifier),
            reduce_le_bytes_to_fr(&secret),
        )
    }

    /// Imports field elements, rejecting values at or above 2^248.
    pub fn from_parts(nullifier: Fr, secret: Fr) -> Result<Self, KeyError> {
        if !fits_sampling_bound(&nullifier) || !fits_sampling_bound(&secret) {
            return Err(KeyError::OutOfRange);
        }
        Ok(Self { nullifier, secret })
    }

    pub fn nullifier(&self) -> Fr {
        self.nullifier
    }

    pub fn secret(&self) -> Fr {
        self.secret
    }

    /// `Poseidon3(nullifier, secret, vote)` — the public leaf value.
    pub fn commitment(&self, vote: VoteChoice) -> Fr {
        poseidon::hash3(self.nullifier, self.secret, vote.to_fr())
    }

    /// `Poseidon1(nullifier)` — a function of the nullifier alone, safe to
    /// disclose at vote time without leaking the vote or the secret.
    pub fn nullifier_hash(&self) -> Fr {
        poseidon::hash1(self.nullifier)
    }
}

/// Derives `(commitment, nullifier_hash)` for a key and vote.
pub fn build_commitment(key: &JurorKey, vote: VoteChoice) -> (Fr, Fr) {
    (key.commitment(vote), key.nullifier_hash())
}

fn random_secret_fr<R: RngCore>(rng: &mut R) -> Fr {
    let mut bytes = [0u8; SECRET_BYTES];
    rng.fill_bytes(&mut bytes);
    reduce_le_bytes_to_fr(&bytes)
}

fn fits_sampling_bound(value: &Fr) -> bool {
    value.to_repr().as_ref()[SECRET_BYTES..]
        .iter()
        .all(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn sampled_keys_fit_the_bound() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let key = JurorKey::random(&mut rng);
        assert!(fits_sampling_bound(&key.nullifier()));
        assert!(fits_sampling_bound(&key.secret()));

        let other = JurorKey::random(&mut rng);
        assert_ne!(key, other);
    }

    #[test]
    fn from_parts_rejects_values_above_the_bound() {
        let too_big = -Fr::one();
        assert_eq!(
            JurorKey::from_parts(too_big, Fr::from(5u64)),
            Err(KeyError::OutOfRange)
        );
        assert_eq!(
            JurorKey::from_parts(Fr::from(5u64), too_big),
            Err(KeyError::OutOfRange)
        );
    }

    #[test]
    fn nullifier_hash_ignores_secret_and_vote() {
        let a = JurorKey::from_parts(Fr::from(10u64), Fr::from(20u64)).unwrap();
        let b = JurorKey::from_parts(Fr::from(10u64), Fr::from(30u64)).unwrap();
        assert_eq!(a.nullifier_hash(), b.nullifier_hash());
        assert_ne!(a.commitment(VoteChoice::Yes), b.commitment(VoteChoice::Yes));
    }

    #[test]
    fn commitment_binds_the_vote() {
        let key = JurorKey::from_parts(Fr::from(10u64), Fr::from(20u64)).unwrap();
        assert_ne!(key.commitment(VoteChoice::Yes), key.commitment(VoteChoice::No));
    }

    #[test]
    fn swapping_nullifier_and_secret_changes_everything() {
        let key = JurorKey::from_parts(Fr::from(10u64), Fr::from(20u64)).unwrap();
        let swapped = JurorKey::from_parts(Fr::from(20u64), Fr::from(10u64)).unwrap();
        assert_ne!(
            key.commitment(VoteChoice::Yes),
            swapped.commitment(VoteChoice::Yes)
        );
        assert_ne!(key.nullifier_hash(), swapped.nullifier_hash());
    }

    #[test]
    fn vote_bits_round_trip() {
        assert_eq!(VoteChoice::from_bit(0).unwrap(), VoteChoice::No);
        assert_eq!(VoteChoice::from_bit(1).unwrap(), VoteChoice::Yes);
        assert!(VoteChoice::from_bit(2).is_err());
        assert_eq!(VoteChoice::Yes.opposite(), VoteChoice::No);
    }

    #[test]
    fn only_zero_and_one_parse_as_votes() {
        assert_eq!(VoteChoice::from_fr(Fr::zero()).unwrap(), VoteChoice::No);
        assert_eq!(VoteChoice::from_fr(Fr::one()).unwrap(), VoteChoice::Yes);
        assert_eq!(
            VoteChoice::from_fr(Fr::from(2u64)),
            Err(crate::CodecError::VoteNotBoolean)
        );
    }

    proptest! {
        #[test]
        fn swap_asymmetry_holds_for_random_material(
            n in any::<[u8; SECRET_BYTES]>(),
            s in any::<[u8; SECRET_BYTES]>(),
        ) {
            prop_assume!(n != s);
            let key = JurorKey::from_bytes(n, s).unwrap();
            let swapped = JurorKey::from_bytes(s, n).unwrap();
            prop_assert_ne!(
                key.commitment(VoteChoice::No),
                swapped.commitment(VoteChoice::No)
            );
            prop_assert_ne!(key.nullifier_hash(), swapped.nullifier_hash());
        }
    }
}

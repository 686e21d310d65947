//! Native Poseidon hashing over BN254's scalar field.
//!
//! Digests computed here must agree bit-for-bit with the in-circuit hasher
//! used by the voting relations, so the width, rate, round counts, and
//! capacity/padding convention are fixed in one place and shared.

use halo2curves_axiom::bn256::Fr;
use halo2curves_axiom::ff::Field;
use poseidon_primitives::poseidon::primitives::{Hash as PoseidonHash, Spec, VariableLengthIden3};

pub const POSEIDON_T: usize = 6;
pub const POSEIDON_RATE: usize = 5;
pub const POSEIDON_FULL_ROUNDS: usize = 8;
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;

const POSEIDON_CAPACITY: u128 = 1u128 << 64;

/// Hash of a single element. Used for nullifier hashes.
pub fn hash1(a: Fr) -> Fr {
    poseidon_hash(&[a])
}

/// Hash of an ordered pair. Used for membership-tree nodes.
pub fn hash2(a: Fr, b: Fr) -> Fr {
    poseidon_hash(&[a, b])
}

/// Hash of an ordered triple. Used for juror commitments.
pub fn hash3(a: Fr, b: Fr, c: Fr) -> Fr {
    poseidon_hash(&[a, b, c])
}

fn poseidon_hash(inputs: &[Fr]) -> Fr {
    PoseidonHash::<Fr, JuryPoseidonSpec, VariableLengthIden3, POSEIDON_T, POSEIDON_RATE>::init()
        .hash_with_cap(inputs, POSEIDON_CAPACITY)
}

#[derive(Debug)]
struct JuryPoseidonSpec;

impl Spec<Fr, POSEIDON_T, POSEIDON_RATE> for JuryPoseidonSpec {
    fn full_rounds() -> usize {
        POSEIDON_FULL_ROUNDS
    }

    fn partial_rounds() -> usize {
        POSEIDON_PARTIAL_ROUNDS
    }

    fn sbox(val: Fr) -> Fr {
        val.pow_vartime([5])
    }

    fn secure_mds() -> usize {
        0
    }
}

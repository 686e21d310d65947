// zkjury/zkjury-circuit/src/gadgets/poseidon.rs
// Numan Thabit 2025

use halo2_base::{
    gates::flex_gate::GateChip,
    poseidon::hasher::{spec::OptimizedPoseidonSpec, PoseidonHasher},
    AssignedValue, Context,
};
use halo2curves_axiom::bn256::Fr;
use zkjury_common::poseidon::{
    POSEIDON_FULL_ROUNDS, POSEIDON_PARTIAL_ROUNDS, POSEIDON_RATE, POSEIDON_T,
};

/// In-circuit hasher producing the same digests as `zkjury_common::poseidon`.
pub type JuryHasher = PoseidonHasher<Fr, POSEIDON_T, POSEIDON_RATE>;

/// Builds a hasher with its round constants loaded once; the instance is
/// reusable across every hash call in a single synthesis.
pub fn new_hasher(ctx: &mut Context<Fr>, gate: &GateChip<Fr>) -> JuryHasher {
    let mut hasher = PoseidonHasher::<Fr, POSEIDON_T, POSEIDON_RATE>::new(poseidon_spec());
    hasher.initialize_consts(ctx, gate);
    hasher
}

pub fn hash_single(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    hasher: &mut JuryHasher,
    value: AssignedValue<Fr>,
) -> AssignedValue<Fr> {
    hasher.hash_fix_len_array(ctx, gate, &[value])
}

pub fn hash_pair(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    hasher: &mut JuryHasher,
    left: AssignedValue<Fr>,
    right: AssignedValue<Fr>,
) -> AssignedValue<Fr> {
    hasher.hash_fix_len_array(ctx, gate, &[left, right])
}

pub fn hash_triple(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    hasher: &mut JuryHasher,
    a: AssignedValue<Fr>,
    b: AssignedValue<Fr>,
    c: AssignedValue<Fr>,
) -> AssignedValue<Fr> {
    hasher.hash_fix_len_array(ctx, gate, &[a, b, c])
}

fn poseidon_spec() -> OptimizedPoseidonSpec<Fr, POSEIDON_T, POSEIDON_RATE> {
    OptimizedPoseidonSpec::new::<POSEIDON_FULL_ROUNDS, POSEIDON_PARTIAL_ROUNDS, 0>()
}

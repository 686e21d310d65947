// zkjury/zkjury-circuit/src/gadgets/merkle.rs
// Numan Thabit 2025

use halo2_base::{
    gates::{flex_gate::GateChip, GateInstructions},
    AssignedValue, Context,
};
use halo2curves_axiom::bn256::Fr;

use crate::gadgets::poseidon::{hash_pair, JuryHasher};

/// Walks a sibling path from `leaf` up to the root it implies. Each direction
/// bit selects whether the running node hashes on the right (bit = 1) or the
/// left (bit = 0) of its sibling. Every bit is constrained to be boolean.
pub fn climb_merkle_path(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    hasher: &mut JuryHasher,
    leaf: AssignedValue<Fr>,
    siblings: &[AssignedValue<Fr>],
    bits: &[AssignedValue<Fr>],
) -> AssignedValue<Fr> {
    assert_eq!(
        siblings.len(),
        bits.len(),
        "merkle path needs one direction bit per sibling"
    );

    let mut node = leaf;
    for (sibling, bit) in siblings.iter().zip(bits.iter()) {
        let bit_sq = gate.mul(ctx, *bit, *bit);
        ctx.constrain_equal(&bit_sq, bit);

        let left = gate.select(ctx, *sibling, node, *bit);
        let right = gate.select(ctx, node, *sibling, *bit);
        node = hash_pair(ctx, gate, hasher, left, right);
    }
    node
}

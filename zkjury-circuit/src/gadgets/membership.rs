// zkjury/zkjury-circuit/src/gadgets/membership.rs
// Numan Thabit 2025

use halo2_base::{
    gates::{flex_gate::GateChip, GateInstructions},
    AssignedValue, Context,
};
use halo2curves_axiom::bn256::Fr;

use crate::gadgets::{
    merkle::climb_merkle_path,
    poseidon::{hash_single, hash_triple, new_hasher},
};

/// Output cells of the membership core shared by the vote and withdraw
/// relations.
pub struct MembershipCells {
    /// Root recomputed from the witnessed sibling path.
    pub root: AssignedValue<Fr>,
    /// Poseidon hash of the private nullifier.
    pub nullifier_hash: AssignedValue<Fr>,
    /// The committed vote, constrained boolean.
    pub vote: AssignedValue<Fr>,
}

/// Core constraints common to both relations: the vote is a bit, the
/// commitment Poseidon(nullifier, secret, vote) sits at the path's terminal
/// position, and the path climbs to a single root. Callers constrain the
/// returned cells against their public inputs.
pub fn membership_checked(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    secret: AssignedValue<Fr>,
    nullifier: AssignedValue<Fr>,
    vote: AssignedValue<Fr>,
    siblings: &[AssignedValue<Fr>],
    bits: &[AssignedValue<Fr>],
) -> MembershipCells {
    let mut hasher = new_hasher(ctx, gate);

    let vote_sq = gate.mul(ctx, vote, vote);
    ctx.constrain_equal(&vote_sq, &vote);

    let commitment = hash_triple(ctx, gate, &mut hasher, nullifier, secret, vote);
    let nullifier_hash = hash_single(ctx, gate, &mut hasher, nullifier);
    let root = climb_merkle_path(ctx, gate, &mut hasher, commitment, siblings, bits);

    MembershipCells {
        root,
        nullifier_hash,
        vote,
    }
}

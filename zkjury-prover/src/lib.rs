// zkjury/zkjury-prover/src/lib.rs
// Numan Thabit 2025

use std::path::Path;

use anyhow::{Context, Result};
use halo2_proofs_axiom::{
    plonk::{self, create_proof, keygen_pk, keygen_vk, Circuit},
    poly::kzg::{
        commitment::{KZGCommitmentScheme, ParamsKZG},
        multiopen::ProverGWC,
    },
    transcript::{Blake2bWrite, Challenge255, TranscriptWriterBuffer},
};
use halo2curves_axiom::bn256::{Bn256, Fr, G1Affine};
use rand::rngs::OsRng;
use thiserror::Error;

use zkjury_circuit::{
    vote_instances, vote_params, vote_wire_inputs, withdraw_instances, withdraw_params,
    withdraw_wire_inputs, JurorWitness, VoteCircuit, VoteCircuitInput, VotePublicValues,
    WithdrawCircuit, WithdrawCircuitInput, WithdrawPublicValues,
};
use zkjury_common::{
    commitment::{JurorKey, VoteChoice},
    deserialize_params, deserialize_proving_key, fr_from_address, fr_to_bytes, manifest_dir,
    poseidon, read_artifact_file, read_manifest,
    tree::{MembershipTree, MerklePath, TreeError, TREE_DEPTH},
    ArtifactManifest, CodecError, ProofBundle, PublicInputRecord, VotePublicInputs,
    WithdrawPublicInputs,
};

/// Rejections raised before synthesis. Each one corresponds to a witness the
/// relations would leave unsatisfied, surfaced as a typed error instead of a
/// failed proof.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProverError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("commitment is not registered in the membership tree")]
    CommitmentNotRegistered,
    #[error("membership path must carry {expected} siblings and direction bits, got {got}")]
    PathDepth { got: usize, expected: usize },
    #[error("membership path does not reproduce the claimed root")]
    RootMismatch,
    #[error("nullifier hash was not derived from the witness nullifier")]
    NullifierHashMismatch,
    #[error("committed vote does not match the asserted correct answer")]
    AnswerMismatch,
    #[error("recipient does not fit in a 20-byte address")]
    RecipientOutOfRange,
}

pub struct RelationKeys {
    pub vk: plonk::VerifyingKey<G1Affine>,
    pub pk: plonk::ProvingKey<G1Affine>,
}

pub struct ProverParams {
    pub params: ParamsKZG<Bn256>,
    pub vote: RelationKeys,
    pub withdraw: RelationKeys,
}

pub fn setup(k: u32) -> ProverParams {
    let mut rng = OsRng;
    let params = ParamsKZG::<Bn256>::setup(k, &mut rng);
    let vote = relation_keys(&params, &VoteCircuit::default());
    let withdraw = relation_keys(&params, &WithdrawCircuit::default());
    tracing::info!("generated vote and withdraw proving artifacts (k={})", k);
    ProverParams {
        params,
        vote,
        withdraw,
    }
}

fn relation_keys<C: Circuit<Fr>>(params: &ParamsKZG<Bn256>, circuit: &C) -> RelationKeys {
    let vk = keygen_vk(params, circuit).expect("vk");
    let pk = keygen_pk(params, vk.clone(), circuit).expect("pk");
    RelationKeys { vk, pk }
}

pub fn prove_vote(
    params: &ParamsKZG<Bn256>,
    pk: &plonk::ProvingKey<G1Affine>,
    input: VoteCircuitInput,
) -> Result<Vec<u8>, ProverError> {
    prove_vote_with_public_inputs(params, pk, input).map(|(proof, _)| proof)
}

pub fn prove_vote_with_public_inputs(
    params: &ParamsKZG<Bn256>,
    pk: &plonk::ProvingKey<G1Affine>,
    input: VoteCircuitInput,
) -> Result<(Vec<u8>, VotePublicInputs), ProverError> {
    if let Err(err) = validate_vote_input(&input) {
        tracing::warn!("vote witness rejected: {:?}", err);
        return Err(err);
    }
    let public_inputs = vote_wire_inputs(&input.public)?;
    let instances = vote_instances(&input.public);
    let proof = create_proof_bytes(params, pk, VoteCircuit::new(Some(input)), &instances);
    tracing::info!("vote proof generated ({} bytes)", proof.len());
    Ok((proof, public_inputs))
}

pub fn prove_vote_bundle(
    params: &ParamsKZG<Bn256>,
    pk: &plonk::ProvingKey<G1Affine>,
    input: VoteCircuitInput,
) -> Result<ProofBundle, ProverError> {
    let (proof, public_inputs) = prove_vote_with_public_inputs(params, pk, input)?;
    Ok(ProofBundle::new(proof, PublicInputRecord::Vote(public_inputs)))
}

pub fn prove_withdraw(
    params: &ParamsKZG<Bn256>,
    pk: &plonk::ProvingKey<G1Affine>,
    input: WithdrawCircuitInput,
) -> Result<Vec<u8>, ProverError> {
    prove_withdraw_with_public_inputs(params, pk, input).map(|(proof, _)| proof)
}

pub fn prove_withdraw_with_public_inputs(
    params: &ParamsKZG<Bn256>,
    pk: &plonk::ProvingKey<G1Affine>,
    input: WithdrawCircuitInput,
) -> Result<(Vec<u8>, WithdrawPublicInputs), ProverError> {
    if let Err(err) = validate_withdraw_input(&input) {
        tracing::warn!("withdraw witness rejected: {:?}", err);
        return Err(err);
    }
    let public_inputs = withdraw_wire_inputs(&input.public)?;
    let instances = withdraw_instances(&input.public);
    let proof = create_proof_bytes(params, pk, WithdrawCircuit::new(Some(input)), &instances);
    tracing::info!("withdraw proof generated ({} bytes)", proof.len());
    Ok((proof, public_inputs))
}

pub fn prove_withdraw_bundle(
    params: &ParamsKZG<Bn256>,
    pk: &plonk::ProvingKey<G1Affine>,
    input: WithdrawCircuitInput,
) -> Result<ProofBundle, ProverError> {
    let (proof, public_inputs) = prove_withdraw_with_public_inputs(params, pk, input)?;
    Ok(ProofBundle::new(
        proof,
        PublicInputRecord::Withdraw(public_inputs),
    ))
}

/// Checks a vote input against the relation natively, so that unsatisfiable
/// witnesses are refused with a named cause instead of burning proving time.
pub fn validate_vote_input(input: &VoteCircuitInput) -> Result<(), ProverError> {
    let vote = VoteChoice::from_fr(input.public.vote)?;
    validate_path(&input.witness.path)?;
    validate_membership(
        &input.witness,
        vote,
        input.public.root,
        input.public.nullifier_hash,
    )
}

/// Native pre-check of a withdraw input, including the answer gate and the
/// recipient address bound.
pub fn validate_withdraw_input(input: &WithdrawCircuitInput) -> Result<(), ProverError> {
    let vote = VoteChoice::from_fr(input.public.vote)?;
    let answer = VoteChoice::from_fr(input.public.correct_answer)?;
    if vote != answer {
        return Err(ProverError::AnswerMismatch);
    }
    if !recipient_fits_address(&input.public.recipient) {
        return Err(ProverError::RecipientOutOfRange);
    }
    validate_path(&input.witness.path)?;
    validate_membership(
        &input.witness,
        vote,
        input.public.root,
        input.public.nullifier_hash,
    )
}

fn validate_path(path: &MerklePath) -> Result<(), ProverError> {
    if path.siblings.len() != TREE_DEPTH || path.bits.len() != TREE_DEPTH {
        return Err(ProverError::PathDepth {
            got: path.depth(),
            expected: TREE_DEPTH,
        });
    }
    Ok(())
}

fn validate_membership(
    witness: &JurorWitness,
    vote: VoteChoice,
    root: Fr,
    nullifier_hash: Fr,
) -> Result<(), ProverError> {
    if poseidon::hash1(witness.nullifier) != nullifier_hash {
        return Err(ProverError::NullifierHashMismatch);
    }
    let commitment = poseidon::hash3(witness.nullifier, witness.secret, vote.to_fr());
    if witness.path.compute_root(commitment) != root {
        return Err(ProverError::RootMismatch);
    }
    Ok(())
}

fn recipient_fits_address(recipient: &Fr) -> bool {
    fr_to_bytes(recipient)[20..].iter().all(|&b| b == 0)
}

/// Assembles a vote input for a juror whose commitment is already in the
/// tree, using the tree's current root.
pub fn vote_input(
    tree: &MembershipTree,
    key: &JurorKey,
    vote: VoteChoice,
    external_nullifier: Fr,
) -> Result<VoteCircuitInput, ProverError> {
    let (witness, root) = membership_witness(tree, key, vote)?;
    Ok(VoteCircuitInput {
        witness,
        public: VotePublicValues {
            root,
            nullifier_hash: key.nullifier_hash(),
            external_nullifier,
            vote: vote.to_fr(),
        },
    })
}

/// Assembles a withdraw input. The answer gate is deliberately not checked
/// here; `prove_withdraw` rejects mismatches with `AnswerMismatch`.
pub fn withdraw_input(
    tree: &MembershipTree,
    key: &JurorKey,
    vote: VoteChoice,
    correct_answer: VoteChoice,
    recipient: &[u8; 20],
) -> Result<WithdrawCircuitInput, ProverError> {
    let (witness, root) = membership_witness(tree, key, vote)?;
    Ok(WithdrawCircuitInput {
        witness,
        public: WithdrawPublicValues {
            root,
            nullifier_hash: key.nullifier_hash(),
            recipient: fr_from_address(recipient),
            correct_answer: correct_answer.to_fr(),
            vote: vote.to_fr(),
        },
    })
}

fn membership_witness(
    tree: &MembershipTree,
    key: &JurorKey,
    vote: VoteChoice,
) -> Result<(JurorWitness, Fr), ProverError> {
    let commitment = key.commitment(vote);
    let index = tree
        .index_of(commitment)
        .ok_or(ProverError::CommitmentNotRegistered)?;
    let path = tree.path(index)?;
    let witness = JurorWitness {
        secret: key.secret(),
        nullifier: key.nullifier(),
        path,
    };
    Ok((witness, tree.root()))
}

fn create_proof_bytes<C: Circuit<Fr>>(
    params: &ParamsKZG<Bn256>,
    pk: &plonk::ProvingKey<G1Affine>,
    circuit: C,
    instances: &[Vec<Fr>],
) -> Vec<u8> {
    let instance_refs: Vec<&[Fr]> = instances.iter().map(|col| col.as_slice()).collect();

    let mut transcript = Blake2bWrite::<_, G1Affine, Challenge255<_>>::init(vec![]);
    create_proof::<KZGCommitmentScheme<Bn256>, ProverGWC<'_, Bn256>, _, _, _, _>(
        params,
        pk,
        &[circuit],
        &[instance_refs.as_slice()],
        OsRng,
        &mut transcript,
    )
    .expect("proof gen");
    transcript.finalize()
}

pub struct ProverArtifacts {
    pub manifest: ArtifactManifest,
    pub params: ParamsKZG<Bn256>,
    pub vote_pk: plonk::ProvingKey<G1Affine>,
    pub withdraw_pk: plonk::ProvingKey<G1Affine>,
}

/// Loads KZG params and both proving keys named by a manifest, verifying
/// sizes and digests along the way.
pub fn load_prover_artifacts(manifest_path: &Path) -> Result<ProverArtifacts> {
    let manifest = read_manifest(manifest_path)?;
    let base_dir = manifest_dir(manifest_path);

    let params_bytes = read_artifact_file(&base_dir, &manifest.params, "params")?;
    let params = deserialize_params(&params_bytes)?;

    let vote_pk_bytes = read_artifact_file(&base_dir, &manifest.vote_pk, "vote proving key")?;
    let vote_pk = deserialize_proving_key::<VoteCircuit>(&vote_pk_bytes, vote_params())
        .context("vote proving key")?;

    let withdraw_pk_bytes =
        read_artifact_file(&base_dir, &manifest.withdraw_pk, "withdraw proving key")?;
    let withdraw_pk =
        deserialize_proving_key::<WithdrawCircuit>(&withdraw_pk_bytes, withdraw_params())
            .context("withdraw proving key")?;

    Ok(ProverArtifacts {
        manifest,
        params,
        vote_pk,
        withdraw_pk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkjury_common::reduce_le_bytes_to_fr;

    const EXTERNAL_NULLIFIER: [u8; 20] = [0xA1; 20];
    const RECIPIENT: [u8; 20] = [0x42; 20];

    fn juror() -> JurorKey {
        JurorKey::from_bytes([5u8; 31], [6u8; 31]).unwrap()
    }

    fn tree_with(key: &JurorKey, vote: VoteChoice) -> MembershipTree {
        let mut tree = MembershipTree::new();
        tree.insert(key.commitment(vote)).unwrap();
        tree
    }

    fn claim_address() -> Fr {
        fr_from_address(&EXTERNAL_NULLIFIER)
    }

    #[test]
    fn builders_produce_inputs_that_validate() {
        let key = juror();
        let tree = tree_with(&key, VoteChoice::Yes);

        let vote = vote_input(&tree, &key, VoteChoice::Yes, claim_address()).unwrap();
        assert_eq!(validate_vote_input(&vote), Ok(()));

        let withdraw =
            withdraw_input(&tree, &key, VoteChoice::Yes, VoteChoice::Yes, &RECIPIENT).unwrap();
        assert_eq!(validate_withdraw_input(&withdraw), Ok(()));
    }

    #[test]
    fn unregistered_commitments_cannot_build_inputs() {
        let key = juror();
        // Registered with Yes, so the No commitment is absent.
        let tree = tree_with(&key, VoteChoice::Yes);
        assert_eq!(
            vote_input(&tree, &key, VoteChoice::No, claim_address()).unwrap_err(),
            ProverError::CommitmentNotRegistered
        );
    }

    #[test]
    fn validation_rejects_short_paths() {
        let key = juror();
        let tree = tree_with(&key, VoteChoice::Yes);
        let mut input = vote_input(&tree, &key, VoteChoice::Yes, claim_address()).unwrap();
        input.witness.path.siblings.pop();
        input.witness.path.bits.pop();
        assert_eq!(
            validate_vote_input(&input).unwrap_err(),
            ProverError::PathDepth {
                got: TREE_DEPTH - 1,
                expected: TREE_DEPTH
            }
        );
    }

    #[test]
    fn validation_rejects_non_boolean_votes() {
        let key = juror();
        let tree = tree_with(&key, VoteChoice::Yes);
        let mut input = vote_input(&tree, &key, VoteChoice::Yes, claim_address()).unwrap();
        input.public.vote = Fr::from(2u64);
        assert_eq!(
            validate_vote_input(&input).unwrap_err(),
            ProverError::Codec(CodecError::VoteNotBoolean)
        );
    }

    #[test]
    fn validation_rejects_foreign_roots() {
        let key = juror();
        let tree = tree_with(&key, VoteChoice::Yes);
        let mut input = vote_input(&tree, &key, VoteChoice::Yes, claim_address()).unwrap();
        input.public.root += Fr::one();
        assert_eq!(
            validate_vote_input(&input).unwrap_err(),
            ProverError::RootMismatch
        );
    }

    #[test]
    fn validation_rejects_mismatched_nullifier_hashes() {
        let key = juror();
        let tree = tree_with(&key, VoteChoice::Yes);
        let mut input = vote_input(&tree, &key, VoteChoice::Yes, claim_address()).unwrap();
        input.public.nullifier_hash = poseidon::hash1(key.secret());
        assert_eq!(
            validate_vote_input(&input).unwrap_err(),
            ProverError::NullifierHashMismatch
        );
    }

    #[test]
    fn withdraw_validation_enforces_the_answer_gate() {
        let key = juror();
        let tree = tree_with(&key, VoteChoice::No);
        let input =
            withdraw_input(&tree, &key, VoteChoice::No, VoteChoice::Yes, &RECIPIENT).unwrap();
        assert_eq!(
            validate_withdraw_input(&input).unwrap_err(),
            ProverError::AnswerMismatch
        );
    }

    #[test]
    fn withdraw_validation_bounds_the_recipient() {
        let key = juror();
        let tree = tree_with(&key, VoteChoice::Yes);
        let mut input =
            withdraw_input(&tree, &key, VoteChoice::Yes, VoteChoice::Yes, &RECIPIENT).unwrap();
        input.public.recipient = reduce_le_bytes_to_fr(&[0xFF; 21]);
        assert_eq!(
            validate_withdraw_input(&input).unwrap_err(),
            ProverError::RecipientOutOfRange
        );
    }
}

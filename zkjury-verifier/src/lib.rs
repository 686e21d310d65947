// zkjury/zkjury-verifier/src/lib.rs
// Numan Thabit 2025

pub mod board;

use std::path::Path;

use anyhow::{Context, Result};
use halo2_proofs_axiom::{
    plonk::verify_proof,
    poly::kzg::{
        commitment::{KZGCommitmentScheme, ParamsKZG},
        multiopen::VerifierGWC,
        strategy::SingleStrategy,
    },
    transcript::{Blake2bRead, Challenge255, TranscriptReadBuffer},
};
use halo2curves_axiom::bn256::{Bn256, G1Affine};
use zkjury_circuit::{
    vote_instances_from_wire, vote_params, withdraw_instances_from_wire, withdraw_params,
    VoteCircuit, WithdrawCircuit,
};
use zkjury_common::{
    deserialize_params, deserialize_verifying_key, manifest_dir, read_artifact_file,
    read_manifest, ArtifactManifest, VotePublicInputs, WithdrawPublicInputs,
};

pub use board::{BoardError, JuryBoard, SpentSet, VoteReceipt, VoteTally, WithdrawReceipt};

pub fn verify(
    params: &ParamsKZG<Bn256>,
    vk: &halo2_proofs_axiom::plonk::VerifyingKey<G1Affine>,
    proof_bytes: &[u8],
    instances: &[Vec<halo2curves_axiom::bn256::Fr>],
) -> bool {
    let mut transcript = Blake2bRead::<_, G1Affine, Challenge255<_>>::init(proof_bytes);

    let instance_columns: Vec<&[halo2curves_axiom::bn256::Fr]> =
        instances.iter().map(|col| col.as_slice()).collect();
    let prepared_instances = vec![instance_columns.as_slice()];

    verify_proof::<KZGCommitmentScheme<Bn256>, VerifierGWC<'_, Bn256>, _, _, _>(
        params,
        vk,
        SingleStrategy::new(params),
        &prepared_instances,
        &mut transcript,
    )
    .is_ok()
}

/// Checks a vote proof against its wire-encoded public inputs. `Ok(false)`
/// means the proof does not satisfy the relation; `Err` means the inputs
/// could not even be decoded into instance columns.
pub fn verify_vote(
    params: &ParamsKZG<Bn256>,
    vk: &halo2_proofs_axiom::plonk::VerifyingKey<G1Affine>,
    proof_bytes: &[u8],
    public_inputs: &VotePublicInputs,
) -> Result<bool> {
    let instances = vote_instances_from_wire(public_inputs)?;
    Ok(verify(params, vk, proof_bytes, &instances))
}

pub fn verify_withdraw(
    params: &ParamsKZG<Bn256>,
    vk: &halo2_proofs_axiom::plonk::VerifyingKey<G1Affine>,
    proof_bytes: &[u8],
    public_inputs: &WithdrawPublicInputs,
) -> Result<bool> {
    let instances = withdraw_instances_from_wire(public_inputs)?;
    Ok(verify(params, vk, proof_bytes, &instances))
}

/// Everything a verifying node needs: KZG params plus the verifying key for
/// each relation, as described by an on-disk manifest.
pub struct VerifierArtifacts {
    pub manifest: ArtifactManifest,
    pub params: ParamsKZG<Bn256>,
    pub vote_vk: halo2_proofs_axiom::plonk::VerifyingKey<G1Affine>,
    pub withdraw_vk: halo2_proofs_axiom::plonk::VerifyingKey<G1Affine>,
}

pub fn load_verifier_artifacts(manifest_path: &Path) -> Result<VerifierArtifacts> {
    let manifest = read_manifest(manifest_path)?;
    let base_dir = manifest_dir(manifest_path);

    let params_bytes = read_artifact_file(&base_dir, &manifest.params, "params")?;
    let params = deserialize_params(&params_bytes)?;

    let vote_vk_bytes = read_artifact_file(&base_dir, &manifest.vote_vk, "vote verifying key")?;
    let vote_vk = deserialize_verifying_key::<VoteCircuit>(&vote_vk_bytes, vote_params())
        .context("vote verifying key")?;

    let withdraw_vk_bytes =
        read_artifact_file(&base_dir, &manifest.withdraw_vk, "withdraw verifying key")?;
    let withdraw_vk =
        deserialize_verifying_key::<WithdrawCircuit>(&withdraw_vk_bytes, withdraw_params())
            .context("withdraw verifying key")?;

    Ok(VerifierArtifacts {
        manifest,
        params,
        vote_vk,
        withdraw_vk,
    })
}

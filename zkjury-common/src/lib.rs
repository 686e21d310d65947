//! Shared types and encodings for the anonymous juror voting core: field
//! codecs, the commitment scheme, the membership tree, wire-level proof
//! bundles, and artifact manifests for the proving/verifying key material.

pub mod commitment;
pub mod poseidon;
pub mod tree;

use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use halo2_proofs_axiom::{
    plonk::{self, Circuit},
    poly::{commitment::Params, kzg::commitment::ParamsKZG},
    SerdeFormat,
};
use halo2curves_axiom::{
    bn256::{Bn256, Fr, G1Affine},
    ff::PrimeField,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commitment::VoteChoice;

pub const CIRCUIT_VERSION: u32 = 1;
pub const MANIFEST_VERSION: u32 = 1;
pub const MANIFEST_FILE: &str = "manifest.json";

/// Instance-column counts of the two relations.
pub const VOTE_PUBLIC_INPUT_COUNT: usize = 4;
pub const WITHDRAW_PUBLIC_INPUT_COUNT: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("bytes are not a canonical field-element encoding")]
    NonCanonicalFieldBytes,
    #[error("vote bit must be 0 or 1, got {0}")]
    InvalidVoteBit(u8),
    #[error("vote value must be the field encoding of 0 or 1")]
    VoteNotBoolean,
}

/// Which of the two relations a proof was generated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    #[serde(rename = "vote")]
    Vote,
    #[serde(rename = "withdraw")]
    Withdraw,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Vote => "vote",
            RelationKind::Withdraw => "withdraw",
        }
    }
}

/// Public signals of a Vote proof as they travel on the wire. All field
/// values are canonical little-endian 32-byte encodings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePublicInputs {
    pub root: [u8; 32],
    pub nullifier_hash: [u8; 32],
    pub external_nullifier: [u8; 32],
    pub vote: u8,
}

impl VotePublicInputs {
    pub fn from_parts(
        root: Fr,
        nullifier_hash: Fr,
        external_nullifier: Fr,
        vote: VoteChoice,
    ) -> Self {
        Self {
            root: fr_to_bytes(&root),
            nullifier_hash: fr_to_bytes(&nullifier_hash),
            external_nullifier: fr_to_bytes(&external_nullifier),
            vote: vote.bit(),
        }
    }
}

/// Public signals of a Withdraw proof on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawPublicInputs {
    pub root: [u8; 32],
    pub nullifier_hash: [u8; 32],
    pub recipient: [u8; 32],
    pub correct_answer: u8,
    pub vote: u8,
}

impl WithdrawPublicInputs {
    pub fn from_parts(
        root: Fr,
        nullifier_hash: Fr,
        recipient: Fr,
        correct_answer: VoteChoice,
        vote: VoteChoice,
    ) -> Self {
        Self {
            root: fr_to_bytes(&root),
            nullifier_hash: fr_to_bytes(&nullifier_hash),
            recipient: fr_to_bytes(&recipient),
            correct_answer: correct_answer.bit(),
            vote: vote.bit(),
        }
    }
}

/// The tagged union of per-relation public signals carried by a bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "relation")]
pub enum PublicInputRecord {
    #[serde(rename = "vote")]
    Vote(VotePublicInputs),
    #[serde(rename = "withdraw")]
    Withdraw(WithdrawPublicInputs),
}

impl PublicInputRecord {
    pub fn relation(&self) -> RelationKind {
        match self {
            PublicInputRecord::Vote(_) => RelationKind::Vote,
            PublicInputRecord::Withdraw(_) => RelationKind::Withdraw,
        }
    }
}

/// A proof plus everything a verifier needs to check it. Created off-line by
/// the juror, consumed exactly once by the verifying board.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofBundle {
    pub circuit_version: u32,
    pub proof: Vec<u8>,
    pub public_inputs: PublicInputRecord,
}

impl ProofBundle {
    pub fn new(proof: Vec<u8>, public_inputs: PublicInputRecord) -> Self {
        Self {
            circuit_version: CIRCUIT_VERSION,
            proof,
            public_inputs,
        }
    }

    pub fn relation(&self) -> RelationKind {
        self.public_inputs.relation()
    }
}

pub fn serialize_bundle(bundle: &ProofBundle) -> Result<Vec<u8>> {
    serde_json::to_vec(bundle).context("failed to serialize proof bundle")
}

pub fn deserialize_bundle(bytes: &[u8]) -> Result<ProofBundle> {
    serde_json::from_slice(bytes).context("failed to deserialize proof bundle")
}

pub fn hash_bytes_hex(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub fn fr_from_bytes(bytes: &[u8; 32]) -> Result<Fr, CodecError> {
    Fr::from_bytes(bytes)
        .into_option()
        .ok_or(CodecError::NonCanonicalFieldBytes)
}

pub fn fr_to_bytes(fr: &Fr) -> [u8; 32] {
    let repr = fr.to_repr();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(repr.as_ref());
    bytes
}

/// Little-endian Horner accumulation of arbitrary bytes into the field.
/// Exact (reduction-free) for inputs shorter than 32 bytes.
pub fn reduce_le_bytes_to_fr(bytes: &[u8]) -> Fr {
    let base = Fr::from(256);
    let mut acc = Fr::zero();
    for byte in bytes.iter().rev() {
        acc = acc * base + Fr::from(*byte as u64);
    }
    acc
}

/// Embeds a 20-byte address into the field (zero-extended little-endian).
/// Used for external nullifiers derived from claim addresses and for
/// withdraw recipients.
pub fn fr_from_address(address: &[u8; 20]) -> Fr {
    reduce_le_bytes_to_fr(address)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub path: String,
    pub blake3: String,
    pub size: u64,
}

impl ArtifactFile {
    pub fn from_bytes(path: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            path: path.into(),
            blake3: hash_bytes_hex(bytes),
            size: bytes.len() as u64,
        }
    }

    fn resolve_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.path)
    }
}

/// Index of the serialized proving/verifying artifacts for both relations,
/// with BLAKE3 digests for integrity checking at load time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub manifest_version: u32,
    pub circuit_version: u32,
    pub k: u32,
    pub created_at_unix: u64,
    pub params: ArtifactFile,
    pub vote_vk: ArtifactFile,
    pub vote_pk: ArtifactFile,
    pub withdraw_vk: ArtifactFile,
    pub withdraw_pk: ArtifactFile,
}

pub fn write_manifest(path: impl AsRef<Path>, manifest: &ArtifactManifest) -> Result<()> {
    let json = serde_json::to_vec_pretty(manifest).context("failed to serialize manifest")?;
    fs::write(path.as_ref(), json).context("failed to write manifest")
}

pub fn read_manifest(path: impl AsRef<Path>) -> Result<ArtifactManifest> {
    let bytes = fs::read(path.as_ref()).context("failed to read manifest file")?;
    let manifest: ArtifactManifest =
        serde_json::from_slice(&bytes).context("failed to parse manifest json")?;
    ensure_manifest_compat(&manifest)?;
    Ok(manifest)
}

/// Reads one artifact file named by a manifest entry, checking size and
/// BLAKE3 digest against the recorded values.
pub fn read_artifact_file(base_dir: &Path, entry: &ArtifactFile, label: &str) -> Result<Vec<u8>> {
    let path = entry.resolve_path(base_dir);
    let bytes = fs::read(&path)
        .with_context(|| format!("failed to read {} at {}", label, path.display()))?;
    ensure!(
        bytes.len() as u64 == entry.size,
        "{} size mismatch, manifest recorded {} bytes but found {}",
        label,
        entry.size,
        bytes.len(),
    );
    ensure_hash(&bytes, &entry.blake3, label)?;
    Ok(bytes)
}

pub fn manifest_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn ensure_hash(bytes: &[u8], expected_hex: &str, label: &str) -> Result<()> {
    let actual = hash_bytes_hex(bytes);
    ensure!(
        actual == expected_hex,
        "{} hash mismatch, expected {} but computed {}",
        label,
        expected_hex,
        actual
    );
    Ok(())
}

fn ensure_manifest_compat(manifest: &ArtifactManifest) -> Result<()> {
    ensure!(
        manifest.manifest_version == MANIFEST_VERSION,
        "unsupported manifest version {}, expected {}",
        manifest.manifest_version,
        MANIFEST_VERSION
    );
    ensure!(
        manifest.circuit_version == CIRCUIT_VERSION,
        "circuit version mismatch: manifest {} vs crate {}",
        manifest.circuit_version,
        CIRCUIT_VERSION
    );
    Ok(())
}

pub fn serialize_params(params: &ParamsKZG<Bn256>) -> Result<Vec<u8>> {
    let mut buf = vec![];
    params
        .write(&mut buf)
        .context("failed to serialize KZG params")?;
    Ok(buf)
}

pub fn deserialize_params(bytes: &[u8]) -> Result<ParamsKZG<Bn256>> {
    let mut reader = Cursor::new(bytes);
    ParamsKZG::<Bn256>::read(&mut reader).context("failed to deserialize KZG params")
}

pub fn serialize_verifying_key(vk: &plonk::VerifyingKey<G1Affine>) -> Result<Vec<u8>> {
    let mut buf = vec![];
    vk.write(&mut buf, SerdeFormat::Processed)
        .context("failed to serialize verifying key")?;
    Ok(buf)
}

pub fn serialize_proving_key(pk: &plonk::ProvingKey<G1Affine>) -> Result<Vec<u8>> {
    let mut buf = vec![];
    pk.write(&mut buf, SerdeFormat::Processed)
        .context("failed to serialize proving key")?;
    Ok(buf)
}

/// Deserializes a verifying key for a concrete relation circuit. The caller
/// supplies the circuit's shape parameters (they are not self-describing).
pub fn deserialize_verifying_key<C: Circuit<Fr>>(
    bytes: &[u8],
    params: C::Params,
) -> Result<plonk::VerifyingKey<G1Affine>> {
    let mut reader = Cursor::new(bytes);
    plonk::VerifyingKey::read::<_, C>(&mut reader, SerdeFormat::Processed, params)
        .context("failed to deserialize verifying key")
}

pub fn deserialize_proving_key<C: Circuit<Fr>>(
    bytes: &[u8],
    params: C::Params,
) -> Result<plonk::ProvingKey<G1Affine>> {
    let mut reader = Cursor::new(bytes);
    plonk::ProvingKey::read::<_, C>(&mut reader, SerdeFormat::Processed, params)
        .context("failed to deserialize proving key")
}

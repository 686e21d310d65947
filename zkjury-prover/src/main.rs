// zkjury/zkjury-prover/src/main.rs
// Numan Thabit 2025

use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zkjury_circuit::{VoteCircuitInput, WithdrawCircuitInput};
use zkjury_common::{
    serialize_bundle, serialize_params, serialize_proving_key, serialize_verifying_key,
    write_manifest, ArtifactFile, ArtifactManifest, ProofBundle, PublicInputRecord,
    CIRCUIT_VERSION, MANIFEST_FILE, MANIFEST_VERSION,
};
use zkjury_prover::{
    load_prover_artifacts, prove_vote_with_public_inputs, prove_withdraw_with_public_inputs, setup,
};

const DEFAULT_OUTPUT_DIR: &str = "artifacts/local";
const DEFAULT_MANIFEST_PATH: &str = "artifacts/local/manifest.json";
const PARAMS_FILENAME: &str = "params.bin";
const VOTE_VK_FILENAME: &str = "vote_vk.bin";
const VOTE_PK_FILENAME: &str = "vote_pk.bin";
const WITHDRAW_VK_FILENAME: &str = "withdraw_vk.bin";
const WITHDRAW_PK_FILENAME: &str = "withdraw_pk.bin";

#[derive(Parser)]
#[command(
    name = "zkjury-prover",
    about = "Keygen and proving commands for the juror vote/withdraw relations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate KZG params, both relation key pairs, and a manifest.
    Setup(SetupArgs),
    /// Prove the vote relation from a circuit input JSON file.
    ProveVote(ProveArgs),
    /// Prove the withdraw relation from a circuit input JSON file.
    ProveWithdraw(ProveArgs),
}

#[derive(Args)]
struct SetupArgs {
    /// Circuit k parameter (log2 of circuit size).
    #[arg(long, default_value_t = 16)]
    k: u32,
    /// Output directory for artifacts.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,
    /// Circuit version number.
    #[arg(long, default_value_t = CIRCUIT_VERSION)]
    circuit_version: u32,
}

#[derive(Args)]
struct ProveArgs {
    /// Circuit input JSON (witness plus public values).
    #[arg(long)]
    input_json: PathBuf,
    #[arg(long)]
    output_proof: PathBuf,
    #[arg(long, default_value = DEFAULT_MANIFEST_PATH)]
    manifest: PathBuf,
    /// Optional path to write the wire-format public inputs JSON.
    #[arg(long)]
    public_inputs_json: Option<PathBuf>,
    /// Optional path to write a proof bundle (proof + public inputs + circuit version).
    #[arg(long)]
    bundle_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zkjury_prover=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Setup(args) => run_setup(args),
        Commands::ProveVote(args) => run_prove_vote(args),
        Commands::ProveWithdraw(args) => run_prove_withdraw(args),
    }
}

fn run_setup(args: SetupArgs) -> Result<()> {
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;

    println!(
        "Generating vote and withdraw relation artifacts (k={})...",
        args.k
    );
    println!("This may take several minutes...");

    let prover_params = setup(args.k);
    let params_bytes = serialize_params(&prover_params.params)?;
    let vote_vk_bytes = serialize_verifying_key(&prover_params.vote.vk)?;
    let vote_pk_bytes = serialize_proving_key(&prover_params.vote.pk)?;
    let withdraw_vk_bytes = serialize_verifying_key(&prover_params.withdraw.vk)?;
    let withdraw_pk_bytes = serialize_proving_key(&prover_params.withdraw.pk)?;

    write_binary(args.output_dir.join(PARAMS_FILENAME), &params_bytes)?;
    write_binary(args.output_dir.join(VOTE_VK_FILENAME), &vote_vk_bytes)?;
    write_binary(args.output_dir.join(VOTE_PK_FILENAME), &vote_pk_bytes)?;
    write_binary(args.output_dir.join(WITHDRAW_VK_FILENAME), &withdraw_vk_bytes)?;
    write_binary(args.output_dir.join(WITHDRAW_PK_FILENAME), &withdraw_pk_bytes)?;

    let manifest = ArtifactManifest {
        manifest_version: MANIFEST_VERSION,
        circuit_version: args.circuit_version,
        k: args.k,
        created_at_unix: current_unix_timestamp(),
        params: ArtifactFile::from_bytes(PARAMS_FILENAME, &params_bytes),
        vote_vk: ArtifactFile::from_bytes(VOTE_VK_FILENAME, &vote_vk_bytes),
        vote_pk: ArtifactFile::from_bytes(VOTE_PK_FILENAME, &vote_pk_bytes),
        withdraw_vk: ArtifactFile::from_bytes(WITHDRAW_VK_FILENAME, &withdraw_vk_bytes),
        withdraw_pk: ArtifactFile::from_bytes(WITHDRAW_PK_FILENAME, &withdraw_pk_bytes),
    };

    let manifest_path = args.output_dir.join(MANIFEST_FILE);
    write_manifest(&manifest_path, &manifest)?;

    println!(
        "Generated artifacts for circuit v{} (k={}) at {}",
        manifest.circuit_version,
        manifest.k,
        args.output_dir.display()
    );
    print_artifact_summary(&manifest);
    Ok(())
}

fn run_prove_vote(args: ProveArgs) -> Result<()> {
    let json = fs::read_to_string(&args.input_json)
        .with_context(|| format!("failed to read {}", args.input_json.display()))?;
    let input: VoteCircuitInput =
        serde_json::from_str(&json).context("failed to parse vote input json")?;

    let artifacts = load_prover_artifacts(&args.manifest)
        .with_context(|| format!("failed to load manifest {}", args.manifest.display()))?;
    let (proof, public_inputs) =
        prove_vote_with_public_inputs(&artifacts.params, &artifacts.vote_pk, input)?;

    fs::write(&args.output_proof, &proof)
        .with_context(|| format!("failed to write {}", args.output_proof.display()))?;

    if let Some(path) = args.public_inputs_json.as_ref() {
        write_json_pretty(path, &public_inputs, "public inputs")?;
    }

    if let Some(path) = args.bundle_json.as_ref() {
        write_bundle_json(
            path,
            &ProofBundle {
                circuit_version: artifacts.manifest.circuit_version,
                proof: proof.clone(),
                public_inputs: PublicInputRecord::Vote(public_inputs.clone()),
            },
        )?;
    }

    Ok(())
}

fn run_prove_withdraw(args: ProveArgs) -> Result<()> {
    let json = fs::read_to_string(&args.input_json)
        .with_context(|| format!("failed to read {}", args.input_json.display()))?;
    let input: WithdrawCircuitInput =
        serde_json::from_str(&json).context("failed to parse withdraw input json")?;

    let artifacts = load_prover_artifacts(&args.manifest)
        .with_context(|| format!("failed to load manifest {}", args.manifest.display()))?;
    let (proof, public_inputs) =
        prove_withdraw_with_public_inputs(&artifacts.params, &artifacts.withdraw_pk, input)?;

    fs::write(&args.output_proof, &proof)
        .with_context(|| format!("failed to write {}", args.output_proof.display()))?;

    if let Some(path) = args.public_inputs_json.as_ref() {
        write_json_pretty(path, &public_inputs, "public inputs")?;
    }

    if let Some(path) = args.bundle_json.as_ref() {
        write_bundle_json(
            path,
            &ProofBundle {
                circuit_version: artifacts.manifest.circuit_version,
                proof: proof.clone(),
                public_inputs: PublicInputRecord::Withdraw(public_inputs.clone()),
            },
        )?;
    }

    Ok(())
}

fn print_artifact_summary(manifest: &ArtifactManifest) {
    println!("\nArtifact Summary:");
    println!(
        "  {}: {} bytes, blake3: {}",
        manifest.params.path, manifest.params.size, manifest.params.blake3
    );
    println!(
        "  {}: {} bytes, blake3: {}",
        manifest.vote_vk.path, manifest.vote_vk.size, manifest.vote_vk.blake3
    );
    println!(
        "  {}: {} bytes, blake3: {}",
        manifest.vote_pk.path, manifest.vote_pk.size, manifest.vote_pk.blake3
    );
    println!(
        "  {}: {} bytes, blake3: {}",
        manifest.withdraw_vk.path, manifest.withdraw_vk.size, manifest.withdraw_vk.blake3
    );
    println!(
        "  {}: {} bytes, blake3: {}",
        manifest.withdraw_pk.path, manifest.withdraw_pk.size, manifest.withdraw_pk.blake3
    );
}

fn write_binary(path: PathBuf, bytes: &[u8]) -> Result<()> {
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

fn write_json_pretty<T: serde::Serialize>(path: &PathBuf, value: &T, label: &str) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize {}", label))?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn write_bundle_json(path: &PathBuf, bundle: &ProofBundle) -> Result<()> {
    let json = serialize_bundle(bundle)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

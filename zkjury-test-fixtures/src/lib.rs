use std::sync::Arc;

use anyhow::{Context, Result};
use halo2curves_axiom::bn256::Fr;
use once_cell::sync::OnceCell;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use zkjury_common::{
    commitment::{build_commitment, JurorKey, VoteChoice},
    fr_from_address,
    tree::MembershipTree,
    ProofBundle, PublicInputRecord, VotePublicInputs, WithdrawPublicInputs,
};
use zkjury_prover::{
    prove_vote_with_public_inputs, prove_withdraw_with_public_inputs, setup, vote_input,
    withdraw_input, ProverParams,
};
use zkjury_verifier::JuryBoard;

const TEST_K: u32 = 16;
const RNG_SEED: u64 = 7;

/// Scope and payout addresses shared by the prebuilt bundles.
pub const SAMPLE_SCOPE: [u8; 20] = [0xA1; 20];
pub const SAMPLE_RECIPIENT: [u8; 20] = [0x42; 20];

static FIXTURES: OnceCell<TestFixtures> = OnceCell::new();

/// One registered juror: its key material, how it voted, and where its
/// commitment landed in the tree.
pub struct SampleJuror {
    pub key: JurorKey,
    pub vote: VoteChoice,
    pub leaf_index: u64,
}

/// Pre-generated proving artifacts, a populated registration tree, and
/// proof bundles reused across tests.
pub struct TestFixtures {
    prover: Arc<ProverParams>,
    tree: MembershipTree,
    jurors: Vec<SampleJuror>,
    vote_bundle: ProofBundle,
    vote_inputs: VotePublicInputs,
    withdraw_bundle: ProofBundle,
    withdraw_inputs: WithdrawPublicInputs,
}

impl TestFixtures {
    /// Clone the proving artifacts so each test can own an `Arc`.
    pub fn prover(&self) -> Arc<ProverParams> {
        Arc::clone(&self.prover)
    }

    /// The registration tree every prebuilt bundle was proven against.
    pub fn tree(&self) -> &MembershipTree {
        &self.tree
    }

    pub fn jurors(&self) -> &[SampleJuror] {
        &self.jurors
    }

    pub fn juror(&self, index: usize) -> &SampleJuror {
        &self.jurors[index]
    }

    /// External nullifier of the sample vote scope, as a field element.
    pub fn sample_scope(&self) -> Fr {
        fr_from_address(&SAMPLE_SCOPE)
    }

    /// Vote bundle from juror 0 in the sample scope.
    pub fn vote_bundle(&self) -> &ProofBundle {
        &self.vote_bundle
    }

    pub fn vote_inputs(&self) -> &VotePublicInputs {
        &self.vote_inputs
    }

    /// Withdraw bundle from juror 0, claiming to `SAMPLE_RECIPIENT`.
    pub fn withdraw_bundle(&self) -> &ProofBundle {
        &self.withdraw_bundle
    }

    pub fn withdraw_inputs(&self) -> &WithdrawPublicInputs {
        &self.withdraw_inputs
    }

    /// A fresh board loaded with the fixture verifying keys and the same
    /// registrations as `tree()`, so the prebuilt bundles verify against
    /// its current root.
    pub fn board(&self) -> JuryBoard {
        let mut board = JuryBoard::new(
            self.prover.params.clone(),
            self.prover.vote.vk.clone(),
            self.prover.withdraw.vk.clone(),
        );
        for juror in &self.jurors {
            board
                .register_commitment(juror.key.commitment(juror.vote))
                .expect("fixture tree fits the board");
        }
        board
    }
}

/// Return lazily constructed test fixtures shared across tests.
pub fn fixtures() -> &'static TestFixtures {
    FIXTURES.get_or_init(|| build_fixtures().expect("failed to build zkjury test fixtures"))
}

fn build_fixtures() -> Result<TestFixtures> {
    let prover = setup(TEST_K);

    let mut rng = ChaCha20Rng::seed_from_u64(RNG_SEED);
    let ballots = [VoteChoice::Yes, VoteChoice::No, VoteChoice::Yes];
    let mut tree = MembershipTree::new();
    let mut jurors = Vec::with_capacity(ballots.len());
    for vote in ballots {
        let key = JurorKey::random(&mut rng);
        let (commitment, _) = build_commitment(&key, vote);
        let leaf_index = tree.insert(commitment)?;
        jurors.push(SampleJuror {
            key,
            vote,
            leaf_index,
        });
    }

    let scope = fr_from_address(&SAMPLE_SCOPE);
    let lead = &jurors[0];

    let input = vote_input(&tree, &lead.key, lead.vote, scope)?;
    let (proof, vote_inputs) =
        prove_vote_with_public_inputs(&prover.params, &prover.vote.pk, input)
            .context("fixture vote proof")?;
    let vote_bundle = ProofBundle::new(proof, PublicInputRecord::Vote(vote_inputs.clone()));

    let input = withdraw_input(&tree, &lead.key, lead.vote, lead.vote, &SAMPLE_RECIPIENT)?;
    let (proof, withdraw_inputs) =
        prove_withdraw_with_public_inputs(&prover.params, &prover.withdraw.pk, input)
            .context("fixture withdraw proof")?;
    let withdraw_bundle =
        ProofBundle::new(proof, PublicInputRecord::Withdraw(withdraw_inputs.clone()));

    Ok(TestFixtures {
        prover: Arc::new(prover),
        tree,
        jurors,
        vote_bundle,
        vote_inputs,
        withdraw_bundle,
        withdraw_inputs,
    })
}

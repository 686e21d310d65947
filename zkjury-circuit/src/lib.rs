// zkjury/zkjury-circuit/src/lib.rs
// Numan Thabit 2025

pub mod gadgets;

use halo2_base::{
    gates::{
        circuit::builder::BaseCircuitBuilder,
        circuit::{BaseCircuitParams, BaseConfig, CircuitBuilderStage},
        RangeInstructions,
    },
    AssignedValue, Context,
};
use halo2_proofs_axiom::{
    circuit::{Layouter, SimpleFloorPlanner},
    plonk::{Circuit, ConstraintSystem, Error},
};
use halo2curves_axiom::bn256::Fr;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use zkjury_common::{
    commitment::VoteChoice,
    fr_from_bytes,
    tree::{MerklePath, TREE_DEPTH},
    CodecError, VotePublicInputs, WithdrawPublicInputs,
};

const DEFAULT_K: usize = 16;
const DEFAULT_LOOKUP_BITS: usize = 15;
const DEFAULT_ADVICE_PER_PHASE: usize = 4;
const DEFAULT_FIXED_COLUMNS: usize = 1;
const DEFAULT_LOOKUP_ADVICE_PER_PHASE: usize = 1;

pub const VOTE_INSTANCE_COLUMNS: usize = 4;
pub const WITHDRAW_INSTANCE_COLUMNS: usize = 5;

/// Bit width of the recipient address bound into withdraw proofs.
const RECIPIENT_BITS: usize = 160;

pub fn vote_params() -> BaseCircuitParams {
    base_params(VOTE_INSTANCE_COLUMNS)
}

pub fn withdraw_params() -> BaseCircuitParams {
    base_params(WITHDRAW_INSTANCE_COLUMNS)
}

fn base_params(num_instance_columns: usize) -> BaseCircuitParams {
    BaseCircuitParams {
        k: DEFAULT_K,
        num_advice_per_phase: vec![DEFAULT_ADVICE_PER_PHASE],
        num_fixed: DEFAULT_FIXED_COLUMNS,
        num_lookup_advice_per_phase: vec![DEFAULT_LOOKUP_ADVICE_PER_PHASE],
        lookup_bits: Some(DEFAULT_LOOKUP_BITS),
        num_instance_columns,
    }
}

/// Private inputs common to both relations: the juror's key material and the
/// sibling path of their commitment leaf.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JurorWitness {
    pub secret: Fr,
    pub nullifier: Fr,
    pub path: MerklePath,
}

/// Public signals of the vote relation, in instance-column order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VotePublicValues {
    pub root: Fr,
    pub nullifier_hash: Fr,
    pub external_nullifier: Fr,
    pub vote: Fr,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteCircuitInput {
    pub witness: JurorWitness,
    pub public: VotePublicValues,
}

/// Public signals of the withdraw relation, in instance-column order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawPublicValues {
    pub root: Fr,
    pub nullifier_hash: Fr,
    pub recipient: Fr,
    pub correct_answer: Fr,
    pub vote: Fr,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawCircuitInput {
    pub witness: JurorWitness,
    pub public: WithdrawPublicValues,
}

pub fn vote_instances(public: &VotePublicValues) -> Vec<Vec<Fr>> {
    vec![
        vec![public.root],
        vec![public.nullifier_hash],
        vec![public.external_nullifier],
        vec![public.vote],
    ]
}

pub fn withdraw_instances(public: &WithdrawPublicValues) -> Vec<Vec<Fr>> {
    vec![
        vec![public.root],
        vec![public.nullifier_hash],
        vec![public.recipient],
        vec![public.correct_answer],
        vec![public.vote],
    ]
}

/// Converts relation-native public values into their wire encoding.
pub fn vote_wire_inputs(public: &VotePublicValues) -> Result<VotePublicInputs, CodecError> {
    Ok(VotePublicInputs::from_parts(
        public.root,
        public.nullifier_hash,
        public.external_nullifier,
        VoteChoice::from_fr(public.vote)?,
    ))
}

pub fn withdraw_wire_inputs(
    public: &WithdrawPublicValues,
) -> Result<WithdrawPublicInputs, CodecError> {
    Ok(WithdrawPublicInputs::from_parts(
        public.root,
        public.nullifier_hash,
        public.recipient,
        VoteChoice::from_fr(public.correct_answer)?,
        VoteChoice::from_fr(public.vote)?,
    ))
}

/// Rebuilds the instance columns a verifier checks a vote proof against.
pub fn vote_instances_from_wire(inputs: &VotePublicInputs) -> Result<Vec<Vec<Fr>>, CodecError> {
    Ok(vote_instances(&VotePublicValues {
        root: fr_from_bytes(&inputs.root)?,
        nullifier_hash: fr_from_bytes(&inputs.nullifier_hash)?,
        external_nullifier: fr_from_bytes(&inputs.external_nullifier)?,
        vote: VoteChoice::from_bit(inputs.vote)?.to_fr(),
    }))
}

pub fn withdraw_instances_from_wire(
    inputs: &WithdrawPublicInputs,
) -> Result<Vec<Vec<Fr>>, CodecError> {
    Ok(withdraw_instances(&WithdrawPublicValues {
        root: fr_from_bytes(&inputs.root)?,
        nullifier_hash: fr_from_bytes(&inputs.nullifier_hash)?,
        recipient: fr_from_bytes(&inputs.recipient)?,
        correct_answer: VoteChoice::from_bit(inputs.correct_answer)?.to_fr(),
        vote: VoteChoice::from_bit(inputs.vote)?.to_fr(),
    }))
}

#[derive(Clone, Debug)]
pub struct VoteCircuit {
    pub input: Option<VoteCircuitInput>,
    params: BaseCircuitParams,
}

impl Default for VoteCircuit {
    fn default() -> Self {
        Self {
            input: None,
            params: vote_params(),
        }
    }
}

impl VoteCircuit {
    pub fn new(input: Option<VoteCircuitInput>) -> Self {
        Self {
            input,
            params: vote_params(),
        }
    }
}

impl Circuit<Fr> for VoteCircuit {
    type Config = BaseConfig<Fr>;
    type FloorPlanner = SimpleFloorPlanner;
    type Params = BaseCircuitParams;

    fn params(&self) -> Self::Params {
        self.params.clone()
    }

    fn without_witnesses(&self) -> Self {
        Self {
            input: None,
            params: self.params.clone(),
        }
    }

    fn configure_with_params(
        meta: &mut ConstraintSystem<Fr>,
        params: Self::Params,
    ) -> Self::Config {
        BaseConfig::configure(meta, params)
    }

    fn configure(_: &mut ConstraintSystem<Fr>) -> Self::Config {
        unreachable!("VoteCircuit must be configured with explicit parameters")
    }

    fn synthesize(&self, config: Self::Config, layouter: impl Layouter<Fr>) -> Result<(), Error> {
        let stage = if self.input.is_some() {
            CircuitBuilderStage::Mock
        } else {
            CircuitBuilderStage::Keygen
        };

        let input = self.input.as_ref().unwrap_or(&VOTE_SAMPLE_INPUT);

        let mut builder = BaseCircuitBuilder::<Fr>::from_stage(stage)
            .use_params(self.params.clone())
            .use_instance_columns(self.params.num_instance_columns);

        if let Some(bits) = self.params.lookup_bits {
            builder = builder.use_lookup_bits(bits);
        }

        build_vote_constraints(&mut builder, input);
        <BaseCircuitBuilder<Fr> as Circuit<Fr>>::synthesize(&builder, config, layouter)
    }
}

#[derive(Clone, Debug)]
pub struct WithdrawCircuit {
    pub input: Option<WithdrawCircuitInput>,
    params: BaseCircuitParams,
}

impl Default for WithdrawCircuit {
    fn default() -> Self {
        Self {
            input: None,
            params: withdraw_params(),
        }
    }
}

impl WithdrawCircuit {
    pub fn new(input: Option<WithdrawCircuitInput>) -> Self {
        Self {
            input,
            params: withdraw_params(),
        }
    }
}

impl Circuit<Fr> for WithdrawCircuit {
    type Config = BaseConfig<Fr>;
    type FloorPlanner = SimpleFloorPlanner;
    type Params = BaseCircuitParams;

    fn params(&self) -> Self::Params {
        self.params.clone()
    }

    fn without_witnesses(&self) -> Self {
        Self {
            input: None,
            params: self.params.clone(),
        }
    }

    fn configure_with_params(
        meta: &mut ConstraintSystem<Fr>,
        params: Self::Params,
    ) -> Self::Config {
        BaseConfig::configure(meta, params)
    }

    fn configure(_: &mut ConstraintSystem<Fr>) -> Self::Config {
        unreachable!("WithdrawCircuit must be configured with explicit parameters")
    }

    fn synthesize(&self, config: Self::Config, layouter: impl Layouter<Fr>) -> Result<(), Error> {
        let stage = if self.input.is_some() {
            CircuitBuilderStage::Mock
        } else {
            CircuitBuilderStage::Keygen
        };

        let input = self.input.as_ref().unwrap_or(&WITHDRAW_SAMPLE_INPUT);

        let mut builder = BaseCircuitBuilder::<Fr>::from_stage(stage)
            .use_params(self.params.clone())
            .use_instance_columns(self.params.num_instance_columns);

        if let Some(bits) = self.params.lookup_bits {
            builder = builder.use_lookup_bits(bits);
        }

        build_withdraw_constraints(&mut builder, input);
        <BaseCircuitBuilder<Fr> as Circuit<Fr>>::synthesize(&builder, config, layouter)
    }
}

// Keygen-only witness shapes; the values are never proven against.
static VOTE_SAMPLE_INPUT: Lazy<VoteCircuitInput> = Lazy::new(|| VoteCircuitInput {
    witness: sample_witness(),
    public: VotePublicValues {
        root: Fr::zero(),
        nullifier_hash: Fr::zero(),
        external_nullifier: Fr::zero(),
        vote: Fr::zero(),
    },
});

static WITHDRAW_SAMPLE_INPUT: Lazy<WithdrawCircuitInput> = Lazy::new(|| WithdrawCircuitInput {
    witness: sample_witness(),
    public: WithdrawPublicValues {
        root: Fr::zero(),
        nullifier_hash: Fr::zero(),
        recipient: Fr::zero(),
        correct_answer: Fr::zero(),
        vote: Fr::zero(),
    },
});

fn sample_witness() -> JurorWitness {
    JurorWitness {
        secret: Fr::zero(),
        nullifier: Fr::zero(),
        path: MerklePath {
            siblings: vec![Fr::zero(); TREE_DEPTH],
            bits: vec![false; TREE_DEPTH],
        },
    }
}

fn build_vote_constraints(builder: &mut BaseCircuitBuilder<Fr>, input: &VoteCircuitInput) {
    let range = builder.range_chip();
    let gate = range.gate();

    let witness = &input.witness;
    let pub_in = &input.public;

    let ctx = builder.main(0);

    let secret = ctx.load_witness(witness.secret);
    let nullifier = ctx.load_witness(witness.nullifier);
    let vote = ctx.load_witness(pub_in.vote);
    let external_nullifier = ctx.load_witness(pub_in.external_nullifier);
    let (siblings, bits) = assign_path(ctx, &witness.path);

    let cells = gadgets::membership::membership_checked(
        ctx, gate, secret, nullifier, vote, &siblings, &bits,
    );

    let public_root = ctx.load_witness(pub_in.root);
    ctx.constrain_equal(&cells.root, &public_root);

    let public_nullifier_hash = ctx.load_witness(pub_in.nullifier_hash);
    ctx.constrain_equal(&cells.nullifier_hash, &public_nullifier_hash);

    expose_public_inputs(
        builder,
        &[
            public_root,
            public_nullifier_hash,
            external_nullifier,
            cells.vote,
        ],
    );
}

fn build_withdraw_constraints(builder: &mut BaseCircuitBuilder<Fr>, input: &WithdrawCircuitInput) {
    let range = builder.range_chip();
    let gate = range.gate();

    let witness = &input.witness;
    let pub_in = &input.public;

    let ctx = builder.main(0);

    let secret = ctx.load_witness(witness.secret);
    let nullifier = ctx.load_witness(witness.nullifier);
    let vote = ctx.load_witness(pub_in.vote);
    let correct_answer = ctx.load_witness(pub_in.correct_answer);
    let recipient = ctx.load_witness(pub_in.recipient);
    range.range_check(ctx, recipient, RECIPIENT_BITS);

    let (siblings, bits) = assign_path(ctx, &witness.path);

    let cells = gadgets::membership::membership_checked(
        ctx, gate, secret, nullifier, vote, &siblings, &bits,
    );

    // Reward eligibility gate: the committed vote must equal the asserted answer.
    ctx.constrain_equal(&cells.vote, &correct_answer);

    let public_root = ctx.load_witness(pub_in.root);
    ctx.constrain_equal(&cells.root, &public_root);

    let public_nullifier_hash = ctx.load_witness(pub_in.nullifier_hash);
    ctx.constrain_equal(&cells.nullifier_hash, &public_nullifier_hash);

    expose_public_inputs(
        builder,
        &[
            public_root,
            public_nullifier_hash,
            recipient,
            correct_answer,
            cells.vote,
        ],
    );
}

fn assign_path(
    ctx: &mut Context<Fr>,
    path: &MerklePath,
) -> (Vec<AssignedValue<Fr>>, Vec<AssignedValue<Fr>>) {
    assert_eq!(
        path.depth(),
        TREE_DEPTH,
        "membership path depth must match the relation depth"
    );
    let siblings = path
        .siblings
        .iter()
        .map(|sibling| ctx.load_witness(*sibling))
        .collect();
    let bits = path
        .bits
        .iter()
        .map(|bit| ctx.load_witness(if *bit { Fr::one() } else { Fr::zero() }))
        .collect();
    (siblings, bits)
}

fn expose_public_inputs(builder: &mut BaseCircuitBuilder<Fr>, values: &[AssignedValue<Fr>]) {
    for (idx, value) in values.iter().enumerate() {
        builder.assigned_instances[idx].push(*value);
    }
}

// zkjury/zkjury-verifier/src/board.rs
// Numan Thabit 2025

use std::collections::{HashMap, HashSet};

use halo2_proofs_axiom::{plonk::VerifyingKey, poly::kzg::commitment::ParamsKZG};
use halo2curves_axiom::bn256::{Bn256, Fr, G1Affine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use zkjury_circuit::{vote_instances_from_wire, withdraw_instances_from_wire};
use zkjury_common::{
    commitment::VoteChoice,
    fr_from_bytes,
    tree::{MembershipTree, TreeError},
    CodecError, ProofBundle, PublicInputRecord, RelationKind, CIRCUIT_VERSION,
};

use crate::verify;

/// Why the board refused a submission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("bundle was proven against circuit version {got}, this board runs version {expected}")]
    VersionMismatch { got: u32, expected: u32 },
    #[error("bundle carries a {} record, expected {}", got.as_str(), expected.as_str())]
    RelationMismatch {
        expected: RelationKind,
        got: RelationKind,
    },
    #[error("public inputs could not be decoded: {0}")]
    MalformedInputs(#[from] CodecError),
    #[error("proof was produced against a root this board does not recognize")]
    UnknownRoot,
    #[error("proof does not satisfy the relation")]
    InvalidProof,
    #[error("nullifier hash was already spent in this scope")]
    NullifierSpent,
}

/// Nullifier-hash bookkeeping for one spending scope. Purely set semantics;
/// the board decides which scope a submission lands in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpentSet {
    spent: HashSet<[u8; 32]>,
}

impl SpentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, nullifier_hash: &[u8; 32]) -> bool {
        self.spent.contains(nullifier_hash)
    }

    /// Records a hash, returning false if it was already spent.
    pub fn insert(&mut self, nullifier_hash: [u8; 32]) -> bool {
        self.spent.insert(nullifier_hash)
    }

    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }
}

/// Running yes/no counts for one external-nullifier scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub yes: u64,
    pub no: u64,
}

/// Returned to the submitter once a vote is accepted and tallied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub external_nullifier: [u8; 32],
    pub nullifier_hash: [u8; 32],
    pub vote: VoteChoice,
    pub tally: VoteTally,
}

/// Returned once a reward claim is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    pub nullifier_hash: [u8; 32],
    pub recipient: [u8; 32],
    pub vote: VoteChoice,
}

/// In-process verifying collaborator. Owns the registration tree, checks
/// submitted bundles, and burns nullifier hashes so each juror key votes
/// once per scope and claims its reward once globally.
pub struct JuryBoard {
    params: ParamsKZG<Bn256>,
    vote_vk: VerifyingKey<G1Affine>,
    withdraw_vk: VerifyingKey<G1Affine>,
    tree: MembershipTree,
    accept_historical_roots: bool,
    vote_spent: HashMap<[u8; 32], SpentSet>,
    withdraw_spent: SpentSet,
    tallies: HashMap<[u8; 32], VoteTally>,
}

impl JuryBoard {
    pub fn new(
        params: ParamsKZG<Bn256>,
        vote_vk: VerifyingKey<G1Affine>,
        withdraw_vk: VerifyingKey<G1Affine>,
    ) -> Self {
        Self {
            params,
            vote_vk,
            withdraw_vk,
            tree: MembershipTree::new(),
            accept_historical_roots: false,
            vote_spent: HashMap::new(),
            withdraw_spent: SpentSet::new(),
            tallies: HashMap::new(),
        }
    }

    /// When enabled, proofs against any root the tree has ever had are
    /// accepted, not just the current one.
    pub fn accept_historical_roots(mut self, accept: bool) -> Self {
        self.accept_historical_roots = accept;
        self
    }

    /// Appends a juror commitment, returning its leaf index.
    pub fn register_commitment(&mut self, commitment: Fr) -> Result<u64, TreeError> {
        let index = self.tree.insert(commitment)?;
        tracing::info!("juror commitment registered at leaf {}", index);
        Ok(index)
    }

    pub fn tree(&self) -> &MembershipTree {
        &self.tree
    }

    pub fn root(&self) -> Fr {
        self.tree.root()
    }

    /// Current counts for one vote scope. Scopes nobody voted in are empty.
    pub fn tally(&self, external_nullifier: &[u8; 32]) -> VoteTally {
        self.tallies
            .get(external_nullifier)
            .copied()
            .unwrap_or_default()
    }

    pub fn submit_vote(&mut self, bundle: &ProofBundle) -> Result<VoteReceipt, BoardError> {
        match self.check_vote(bundle) {
            Ok(receipt) => {
                tracing::info!(
                    "vote accepted, scope now tallies {} yes / {} no",
                    receipt.tally.yes,
                    receipt.tally.no
                );
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!("vote submission rejected: {:?}", err);
                Err(err)
            }
        }
    }

    pub fn submit_withdraw(&mut self, bundle: &ProofBundle) -> Result<WithdrawReceipt, BoardError> {
        match self.check_withdraw(bundle) {
            Ok(receipt) => {
                tracing::info!("withdrawal accepted, reward released to recipient");
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!("withdrawal submission rejected: {:?}", err);
                Err(err)
            }
        }
    }

    fn check_vote(&mut self, bundle: &ProofBundle) -> Result<VoteReceipt, BoardError> {
        self.check_version(bundle)?;
        let inputs = match &bundle.public_inputs {
            PublicInputRecord::Vote(inputs) => inputs,
            PublicInputRecord::Withdraw(_) => {
                return Err(BoardError::RelationMismatch {
                    expected: RelationKind::Vote,
                    got: RelationKind::Withdraw,
                })
            }
        };

        let instances = vote_instances_from_wire(inputs)?;
        let vote = VoteChoice::from_bit(inputs.vote)?;
        self.check_root(fr_from_bytes(&inputs.root)?)?;

        if !verify(&self.params, &self.vote_vk, &bundle.proof, &instances) {
            return Err(BoardError::InvalidProof);
        }

        // Burn the nullifier hash within its scope only after the proof holds.
        let scope = self
            .vote_spent
            .entry(inputs.external_nullifier)
            .or_default();
        if !scope.insert(inputs.nullifier_hash) {
            return Err(BoardError::NullifierSpent);
        }

        let tally = self.tallies.entry(inputs.external_nullifier).or_default();
        match vote {
            VoteChoice::Yes => tally.yes += 1,
            VoteChoice::No => tally.no += 1,
        }

        Ok(VoteReceipt {
            external_nullifier: inputs.external_nullifier,
            nullifier_hash: inputs.nullifier_hash,
            vote,
            tally: *tally,
        })
    }

    fn check_withdraw(&mut self, bundle: &ProofBundle) -> Result<WithdrawReceipt, BoardError> {
        self.check_version(bundle)?;
        let inputs = match &bundle.public_inputs {
            PublicInputRecord::Withdraw(inputs) => inputs,
            PublicInputRecord::Vote(_) => {
                return Err(BoardError::RelationMismatch {
                    expected: RelationKind::Withdraw,
                    got: RelationKind::Vote,
                })
            }
        };

        let instances = withdraw_instances_from_wire(inputs)?;
        let vote = VoteChoice::from_bit(inputs.vote)?;
        self.check_root(fr_from_bytes(&inputs.root)?)?;

        if !verify(&self.params, &self.withdraw_vk, &bundle.proof, &instances) {
            return Err(BoardError::InvalidProof);
        }

        // Claims burn in a single global scope, independent of vote scopes.
        if !self.withdraw_spent.insert(inputs.nullifier_hash) {
            return Err(BoardError::NullifierSpent);
        }

        Ok(WithdrawReceipt {
            nullifier_hash: inputs.nullifier_hash,
            recipient: inputs.recipient,
            vote,
        })
    }

    fn check_version(&self, bundle: &ProofBundle) -> Result<(), BoardError> {
        if bundle.circuit_version != CIRCUIT_VERSION {
            return Err(BoardError::VersionMismatch {
                got: bundle.circuit_version,
                expected: CIRCUIT_VERSION,
            });
        }
        Ok(())
    }

    fn check_root(&self, root: Fr) -> Result<(), BoardError> {
        let recognized = if self.accept_historical_roots {
            self.tree.is_known_root(root)
        } else {
            root == self.tree.root()
        };
        if !recognized {
            return Err(BoardError::UnknownRoot);
        }
        Ok(())
    }
}

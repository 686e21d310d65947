use halo2_proofs_axiom::{dev::MockProver, plonk::Circuit};
use halo2curves_axiom::{bn256::Fr, ff::Field};
use zkjury_circuit::{
    vote_instances, withdraw_instances, JurorWitness, VoteCircuit, VoteCircuitInput,
    VotePublicValues, WithdrawCircuit, WithdrawCircuitInput, WithdrawPublicValues,
};
use zkjury_common::{
    commitment::{JurorKey, VoteChoice},
    fr_from_address, poseidon, reduce_le_bytes_to_fr,
    tree::MembershipTree,
};

const CLAIM_ADDRESS: [u8; 20] = [0xA1; 20];
const RECIPIENT_ADDRESS: [u8; 20] = [0x42; 20];

#[test]
fn vote_proof_satisfies_for_registered_juror() {
    let key = juror_key(0x11);
    let tree = registered_tree(&[(key, VoteChoice::Yes)]);
    let input = vote_input(&tree, &key, VoteChoice::Yes);
    run_vote_mock(input).assert_satisfied();
}

#[test]
fn vote_proof_satisfies_for_either_vote_value() {
    let yes = juror_key(0x21);
    let no = juror_key(0x22);
    let tree = registered_tree(&[(yes, VoteChoice::Yes), (no, VoteChoice::No)]);
    run_vote_mock(vote_input(&tree, &yes, VoteChoice::Yes)).assert_satisfied();
    run_vote_mock(vote_input(&tree, &no, VoteChoice::No)).assert_satisfied();
}

#[test]
fn announcing_a_vote_other_than_the_committed_one_fails() {
    let key = juror_key(0x31);
    let tree = registered_tree(&[(key, VoteChoice::Yes)]);
    let mut input = vote_input(&tree, &key, VoteChoice::Yes);
    input.public.vote = VoteChoice::No.to_fr();
    assert!(run_vote_mock(input).verify().is_err());
}

#[test]
fn non_binary_vote_fails() {
    let key = juror_key(0x32);
    let tree = registered_tree(&[(key, VoteChoice::Yes)]);
    let mut input = vote_input(&tree, &key, VoteChoice::Yes);
    input.public.vote = Fr::from(2u64);
    assert!(run_vote_mock(input).verify().is_err());
}

#[test]
fn wrong_root_fails() {
    let key = juror_key(0x33);
    let tree = registered_tree(&[(key, VoteChoice::No)]);
    let mut input = vote_input(&tree, &key, VoteChoice::No);
    input.public.root += Fr::ONE;
    assert!(run_vote_mock(input).verify().is_err());
}

#[test]
fn nullifier_hash_of_a_different_value_fails() {
    let key = juror_key(0x34);
    let other = juror_key(0x35);
    let tree = registered_tree(&[(key, VoteChoice::Yes)]);
    let mut input = vote_input(&tree, &key, VoteChoice::Yes);
    input.public.nullifier_hash = poseidon::hash1(other.nullifier());
    assert!(run_vote_mock(input).verify().is_err());
}

#[test]
fn path_of_an_unrelated_leaf_fails() {
    let key = juror_key(0x36);
    let other = juror_key(0x37);
    let tree = registered_tree(&[(key, VoteChoice::Yes), (other, VoteChoice::No)]);

    let mut input = vote_input(&tree, &key, VoteChoice::Yes);
    let other_index = tree
        .index_of(other.commitment(VoteChoice::No))
        .expect("commitment is registered");
    input.witness.path = tree.path(other_index).expect("path for registered leaf");
    assert!(run_vote_mock(input).verify().is_err());
}

#[test]
fn tampered_direction_bits_fail() {
    let key = juror_key(0x38);
    let filler = juror_key(0x39);
    let tree = registered_tree(&[(key, VoteChoice::Yes), (filler, VoteChoice::Yes)]);
    let mut input = vote_input(&tree, &key, VoteChoice::Yes);
    input.witness.path.bits[0] = !input.witness.path.bits[0];
    assert!(run_vote_mock(input).verify().is_err());
}

#[test]
fn path_fetched_before_an_insert_fails_against_the_new_root() {
    let key = juror_key(0x3a);
    let late = juror_key(0x3b);
    let mut tree = registered_tree(&[(key, VoteChoice::Yes)]);

    let mut input = vote_input(&tree, &key, VoteChoice::Yes);
    tree.insert(late.commitment(VoteChoice::No))
        .expect("tree has capacity");
    input.public.root = tree.root();
    assert!(run_vote_mock(input).verify().is_err());
}

#[test]
fn withdraw_proof_satisfies_when_the_answer_matches() {
    let key = juror_key(0x41);
    let tree = registered_tree(&[(key, VoteChoice::Yes)]);
    let input = withdraw_input(&tree, &key, VoteChoice::Yes, VoteChoice::Yes);
    run_withdraw_mock(input).assert_satisfied();
}

#[test]
fn withdraw_fails_when_the_committed_vote_differs_from_the_answer() {
    let key = juror_key(0x42);
    let tree = registered_tree(&[(key, VoteChoice::No)]);
    let input = withdraw_input(&tree, &key, VoteChoice::No, VoteChoice::Yes);
    assert!(run_withdraw_mock(input).verify().is_err());
}

#[test]
fn withdraw_recipient_wider_than_an_address_is_rejected() {
    let key = juror_key(0x43);
    let tree = registered_tree(&[(key, VoteChoice::Yes)]);
    let mut input = withdraw_input(&tree, &key, VoteChoice::Yes, VoteChoice::Yes);
    input.public.recipient = reduce_le_bytes_to_fr(&[0xFF; 21]);

    let outcome = std::panic::catch_unwind(|| {
        let instances = withdraw_instances(&input.public);
        let circuit = WithdrawCircuit::new(Some(input));
        let k = circuit.params().k as u32;
        MockProver::run(k, &circuit, instances).map(|prover| prover.verify().is_err())
    });

    match outcome {
        Ok(run_result) => assert!(
            matches!(run_result, Err(_) | Ok(true)),
            "oversized recipient must not satisfy the relation"
        ),
        // Witness decomposition may panic on values outside the range table.
        Err(_) => {}
    }
}

fn juror_key(tag: u8) -> JurorKey {
    JurorKey::from_bytes([tag; 31], [tag.wrapping_add(1); 31])
        .expect("31-byte key material is in range")
}

fn registered_tree(entries: &[(JurorKey, VoteChoice)]) -> MembershipTree {
    let mut tree = MembershipTree::new();
    for (key, vote) in entries {
        tree.insert(key.commitment(*vote)).expect("tree has capacity");
    }
    tree
}

fn vote_input(tree: &MembershipTree, key: &JurorKey, vote: VoteChoice) -> VoteCircuitInput {
    let (witness, root, nullifier_hash) = juror_witness(tree, key, vote);
    VoteCircuitInput {
        witness,
        public: VotePublicValues {
            root,
            nullifier_hash,
            external_nullifier: fr_from_address(&CLAIM_ADDRESS),
            vote: vote.to_fr(),
        },
    }
}

fn withdraw_input(
    tree: &MembershipTree,
    key: &JurorKey,
    vote: VoteChoice,
    correct_answer: VoteChoice,
) -> WithdrawCircuitInput {
    let (witness, root, nullifier_hash) = juror_witness(tree, key, vote);
    WithdrawCircuitInput {
        witness,
        public: WithdrawPublicValues {
            root,
            nullifier_hash,
            recipient: fr_from_address(&RECIPIENT_ADDRESS),
            correct_answer: correct_answer.to_fr(),
            vote: vote.to_fr(),
        },
    }
}

fn juror_witness(
    tree: &MembershipTree,
    key: &JurorKey,
    vote: VoteChoice,
) -> (JurorWitness, Fr, Fr) {
    let commitment = key.commitment(vote);
    let index = tree.index_of(commitment).expect("commitment is registered");
    let path = tree.path(index).expect("path for registered leaf");
    let witness = JurorWitness {
        secret: key.secret(),
        nullifier: key.nullifier(),
        path,
    };
    (witness, tree.root(), key.nullifier_hash())
}

fn run_vote_mock(input: VoteCircuitInput) -> MockProver<Fr> {
    let instances = vote_instances(&input.public);
    let circuit = VoteCircuit::new(Some(input));
    let k = circuit.params().k as u32;
    match MockProver::run(k, &circuit, instances) {
        Ok(prover) => prover,
        Err(err) => panic!("mock prover run failed: {:?}", err),
    }
}

fn run_withdraw_mock(input: WithdrawCircuitInput) -> MockProver<Fr> {
    let instances = withdraw_instances(&input.public);
    let circuit = WithdrawCircuit::new(Some(input));
    let k = circuit.params().k as u32;
    match MockProver::run(k, &circuit, instances) {
        Ok(prover) => prover,
        Err(err) => panic!("mock prover run failed: {:?}", err),
    }
}

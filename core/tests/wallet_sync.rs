mod common;

use common::{TREE_DEPTH, TestFixture, User, commitments};
use rand::rngs::OsRng;
use shroud_core::joinsplit::JoinSplitOutput;
use shroud_core::{LedgerAddress, ProofSystem, Wallet, WalletError};
use shroud_privacy::{PrivacyError, ShieldedKeys};

fn deposit(fixture: &TestFixture, user: &User, values: &[u64]) {
    let outputs = values
        .iter()
        .map(|v| JoinSplitOutput::new(user.keys.address, *v))
        .collect();
    fixture
        .client
        .deposit(user.wallet.tree(), &user.keys, &user.account, outputs, None, &mut OsRng)
        .unwrap();
}

#[test]
fn test_sync_in_small_chunks() {
    let fixture = TestFixture::new(ProofSystem::Groth16);
    let mut alice = User::with_batch("alice", 1, 1);
    let carol = User::new("carol", 3);

    deposit(&fixture, &alice, &[10, 20]);
    fixture.ledger().mine_empty_block();
    deposit(&fixture, &carol, &[5]);
    fixture.ledger().mine_empty_block();
    deposit(&fixture, &alice, &[30]);

    let summary = alice.wallet.sync(fixture.ledger()).unwrap();
    assert_eq!(summary.blocks_scanned, 5);
    assert_eq!(summary.new_notes.len(), 3);
    assert_eq!(summary.total_notes_seen, 3);
    assert_eq!(summary.commitment_mismatches, 0);
    assert_eq!(alice.wallet.next_block(), 6);
    assert_eq!(alice.wallet.tree().num_entries(), 6);
    assert_eq!(alice.wallet.tree().root().unwrap(), fixture.ledger().root());

    // Nothing new
    let summary = alice.wallet.sync(fixture.ledger()).unwrap();
    assert_eq!(summary.blocks_scanned, 0);
    assert!(summary.new_notes.is_empty());

    let addresses: Vec<u64> = alice.wallet.unspent_notes().unwrap().iter().map(|n| n.address).collect();
    assert_eq!(addresses, vec![0, 1, 4]);
}

#[test]
fn test_state_survives_reopen() {
    let fixture = TestFixture::new(ProofSystem::Pghr13);
    let dir = tempfile::tempdir().unwrap();
    let keys = ShieldedKeys::random(&mut OsRng);
    let account = LedgerAddress([4; 20]);

    let notes = {
        let mut wallet = Wallet::open("dave", keys.clone(), dir.path(), TREE_DEPTH, 10).unwrap();
        let outputs = vec![JoinSplitOutput::new(keys.address, 7), JoinSplitOutput::new(keys.address, 8)];
        fixture
            .client
            .deposit(wallet.tree(), &keys, &account, outputs, None, &mut OsRng)
            .unwrap();
        wallet.sync(fixture.ledger()).unwrap();
        wallet.unspent_notes().unwrap()
    };

    let wallet = Wallet::open("dave", keys.clone(), dir.path(), TREE_DEPTH, 10).unwrap();
    assert_eq!(wallet.next_block(), 2);
    assert_eq!(wallet.state().num_notes, 2);
    assert_eq!(wallet.state().nullifier_map.len(), 2);
    assert_eq!(wallet.tree().root().unwrap(), fixture.ledger().root());
    assert_eq!(commitments(&wallet.unspent_notes().unwrap()), commitments(&notes));
    drop(wallet);

    let err = Wallet::open("dave", keys, dir.path(), TREE_DEPTH + 1, 10).err().unwrap();
    assert!(matches!(err, WalletError::Storage(_)));
}

#[test]
fn test_open_rejects_unsupported_depth() {
    let dir = tempfile::tempdir().unwrap();
    let keys = ShieldedKeys::random(&mut OsRng);
    let path = dir.path().join("erin");

    let err = Wallet::open("erin", keys, &path, 0, 10).err().unwrap();
    assert!(matches!(err, WalletError::Privacy(PrivacyError::InvalidDepth(0))));
    assert!(!path.exists());
}

#[test]
fn test_mismatched_note_is_skipped() {
    let fixture = TestFixture::new(ProofSystem::Groth16);
    let mut alice = User::new("alice", 1);
    deposit(&fixture, &alice, &[10]);
    let forged = fixture.ledger().emit_mismatched_note(&alice.keys.address, 99);

    let summary = alice.wallet.sync(fixture.ledger()).unwrap();
    assert_eq!(summary.commitment_mismatches, 1);
    assert_eq!(summary.new_notes.len(), 1);
    assert_eq!(alice.wallet.state().num_notes, 1);
    assert_eq!(alice.wallet.balance().unwrap(), 10);

    // The commitment still lands in the tree and the roots agree
    assert_eq!(alice.wallet.tree().num_entries(), 3);
    assert_eq!(alice.wallet.tree().get_leaf(2), forged.0);
    assert_eq!(alice.wallet.tree().root().unwrap(), fixture.ledger().root());
}

#[test]
fn test_root_mismatch_is_fatal() {
    let fixture = TestFixture::new(ProofSystem::Groth16);
    let mut alice = User::new("alice", 1);
    deposit(&fixture, &alice, &[10]);
    fixture.ledger().corrupt_last_root();

    let err = alice.wallet.sync(fixture.ledger()).unwrap_err();
    assert!(matches!(err, WalletError::MerkleRootMismatch { block: 1, .. }));
    assert_eq!(alice.wallet.next_block(), 1);
    assert_eq!(alice.wallet.tree().num_entries(), 0);
    assert!(alice.wallet.unspent_notes().unwrap().is_empty());
}

#[test]
fn test_note_queries() {
    let fixture = TestFixture::new(ProofSystem::Groth16);
    let mut alice = User::new("alice", 1);
    deposit(&fixture, &alice, &[40, 25]);
    alice.wallet.sync(fixture.ledger()).unwrap();

    let summaries = alice.wallet.note_summaries().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].address, 0);
    assert_eq!(summaries[0].value, 40);

    let by_address = alice.wallet.find_note("1").unwrap();
    assert_eq!(by_address.value(), 25);
    let by_prefix = alice.wallet.find_note(&summaries[0].short_commitment).unwrap();
    assert_eq!(by_prefix.address, 0);
    assert!(matches!(
        alice.wallet.find_note("zz"),
        Err(WalletError::NoteNotFound(_))
    ));

    assert_eq!(alice.wallet.balance().unwrap(), 65);
    let selected = alice.wallet.select_inputs(50).unwrap();
    assert_eq!(selected.iter().map(|n| n.value()).collect::<Vec<_>>(), vec![40, 25]);
    assert!(matches!(
        alice.wallet.select_inputs(66),
        Err(WalletError::InsufficientFunds {
            needed: 66,
            available: 65,
            max_notes: 2
        })
    ));
}

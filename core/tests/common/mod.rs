#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use shroud_core::contract::{MixOutputEvent, MixResult};
use shroud_core::joinsplit::{SignatureMode, joinsplit_sign_digest};
use shroud_core::{
    ExtendedProof, LedgerAddress, LedgerClient, LedgerError, MixCallArguments, MixerClient,
    MockProver, Proof, ProofSystem, ProverService, PublicInputs, TxReceipt, VerificationKey,
    Wallet,
};
use shroud_privacy::curve::Word;
use shroud_privacy::encryption::encrypt_note;
use shroud_privacy::signing::{self, Signature, SigningVerificationKey};
use shroud_privacy::{
    Commitment, MerkleTree, Note, Nullifier, ShieldedAddress, ShieldedKeys, derive_h_sig,
    from_public_units,
};
use tempfile::TempDir;

pub const TREE_DEPTH: usize = 8;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct LedgerState {
    block: u64,
    tree: MerkleTree,
    roots: HashSet<[u8; 32]>,
    nullifiers: HashSet<Nullifier>,
    results: Vec<MixResult>,
    balance: u128,
    last_value: Option<u128>,
}

/// In-memory mixer contract with one `mix` call per block
///
/// A token mixer expects no value on the transaction and pulls `v_in` from
/// the sender's token balance instead.
pub struct MockLedger {
    vk: VerificationKey,
    token: bool,
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new(vk: VerificationKey, depth: usize, token: bool) -> Self {
        let mut tree = MerkleTree::new(depth);
        let root = tree.recompute_root();
        Self {
            vk,
            token,
            state: Mutex::new(LedgerState {
                block: 0,
                tree,
                roots: HashSet::from([root]),
                nullifiers: HashSet::new(),
                results: Vec::new(),
                balance: 0,
                last_value: None,
            }),
        }
    }

    pub fn is_spent(&self, nullifier: &Nullifier) -> bool {
        self.state.lock().unwrap().nullifiers.contains(nullifier)
    }

    pub fn root(&self) -> [u8; 32] {
        self.state.lock().unwrap().tree.root().unwrap()
    }

    /// Ledger base units currently held by the contract
    pub fn balance(&self) -> u128 {
        self.state.lock().unwrap().balance
    }

    /// Value attached to the last accepted `mix` call
    pub fn last_value(&self) -> Option<u128> {
        self.state.lock().unwrap().last_value
    }

    /// Appends an empty block
    pub fn mine_empty_block(&self) {
        self.state.lock().unwrap().block += 1;
    }

    /// Rewrites the root reported for the last result
    pub fn corrupt_last_root(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(last) = state.results.last_mut() {
            last.new_merkle_root = [0xEE; 32];
        }
    }

    /// Emits an output whose ciphertext opens, for `recipient`, to a note
    /// that does not match the emitted commitment
    pub fn emit_mismatched_note(&self, recipient: &ShieldedAddress, value: u64) -> Commitment {
        let mut rng = rand::rngs::OsRng;
        let sent = Note::new(recipient.a_pk, value, &mut rng);
        let ciphertext = encrypt_note(&sent, &recipient.k_pk, &mut rng).unwrap();
        let commitment = Note::new(recipient.a_pk, value, &mut rng).commitment();

        let mut state = self.state.lock().unwrap();
        state.block += 1;
        let block = state.block;
        state.tree.insert(&commitment).unwrap();
        let new_merkle_root = state.tree.recompute_root();
        state.roots.insert(new_merkle_root);
        state.results.push(MixResult {
            block,
            new_merkle_root,
            nullifiers: Vec::new(),
            output_events: vec![MixOutputEvent {
                commitment,
                ciphertext,
            }],
        });
        commitment
    }

    fn check(&self, sender: &LedgerAddress, args: &MixCallArguments, value: u128) -> Result<PublicInputs, String> {
        let vk_words: [Word; 4] = args
            .signature_vk
            .as_slice()
            .try_into()
            .map_err(|_| "bad signature key".to_string())?;
        let signature_vk = SigningVerificationKey::from_words(&vk_words).map_err(|e| e.to_string())?;
        let proof = Proof::from_contract_parameters(self.vk.system(), &args.proof)
            .map_err(|e| e.to_string())?;
        let extended_proof = ExtendedProof {
            proof,
            inputs: args.public_inputs.clone(),
        };

        let digest = joinsplit_sign_digest(sender, &args.ciphertexts, &extended_proof, SignatureMode::Mix);
        if !signing::verify(&signature_vk, &digest, &Signature::from_word(&args.signature)) {
            return Err("invalid signature".into());
        }

        let public = PublicInputs::unpack(&args.public_inputs).map_err(|e| e.to_string())?;
        if derive_h_sig(&public.nullifiers, &signature_vk) != public.h_sig {
            return Err("h_sig mismatch".into());
        }

        let state = self.state.lock().unwrap();
        if !state.roots.contains(&public.root) {
            return Err("unknown merkle root".into());
        }
        if public.nullifiers[0] == public.nullifiers[1]
            || public.nullifiers.iter().any(|nf| state.nullifiers.contains(nf))
        {
            return Err("nullifier already spent".into());
        }
        drop(state);

        match self.vk.verify(&extended_proof.proof, &extended_proof.inputs) {
            Ok(true) => {}
            Ok(false) => return Err("invalid proof".into()),
            Err(e) => return Err(e.to_string()),
        }
        let expected = if self.token { 0 } else { from_public_units(public.v_in) };
        if value != expected {
            return Err(format!("value {value} does not match v_in {}", public.v_in));
        }
        if args.ciphertexts.len() != public.commitments.len() {
            return Err("ciphertext count mismatch".into());
        }
        Ok(public)
    }
}

impl LedgerClient for MockLedger {
    fn block_number(&self) -> Result<u64, LedgerError> {
        Ok(self.state.lock().unwrap().block)
    }

    fn mix_results(&self, from: u64, to: u64) -> Result<Vec<MixResult>, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .results
            .iter()
            .filter(|r| (from..=to).contains(&r.block))
            .cloned()
            .collect())
    }

    fn submit_mix(
        &self,
        sender: &LedgerAddress,
        args: &MixCallArguments,
        value: u128,
    ) -> Result<TxReceipt, LedgerError> {
        let public = self.check(sender, args, value).map_err(LedgerError::Reverted)?;

        let mut state = self.state.lock().unwrap();
        state.block += 1;
        let block = state.block;
        for nf in &public.nullifiers {
            state.nullifiers.insert(*nf);
        }
        let mut output_events = Vec::new();
        for (cm, ct) in public.commitments.iter().zip(&args.ciphertexts) {
            state
                .tree
                .insert(cm)
                .map_err(|e| LedgerError::Reverted(e.to_string()))?;
            output_events.push(MixOutputEvent {
                commitment: *cm,
                ciphertext: ct.clone(),
            });
        }
        let new_merkle_root = state.tree.recompute_root();
        state.roots.insert(new_merkle_root);
        state.balance = state.balance + from_public_units(public.v_in) - from_public_units(public.v_out);
        state.last_value = Some(value);
        state.results.push(MixResult {
            block,
            new_merkle_root,
            nullifiers: public.nullifiers.to_vec(),
            output_events,
        });

        let tx_hash: [u8; 32] = Sha256::new()
            .chain_update(block.to_be_bytes())
            .chain_update(sender.to_word())
            .finalize()
            .into();
        Ok(TxReceipt { tx_hash, block })
    }
}

/// A user with keys, a wallet database and a ledger account
pub struct User {
    pub keys: ShieldedKeys,
    pub wallet: Wallet,
    pub account: LedgerAddress,
    _dir: TempDir,
}

impl User {
    pub fn new(name: &str, account: u8) -> Self {
        Self::with_batch(name, account, 1000)
    }

    pub fn with_batch(name: &str, account: u8, batch: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let keys = ShieldedKeys::random(&mut rand::rngs::OsRng);
        let wallet = Wallet::open(name, keys.clone(), &dir.path().join(name), TREE_DEPTH, batch).unwrap();
        Self {
            keys,
            wallet,
            account: LedgerAddress([account; 20]),
            _dir: dir,
        }
    }
}

pub struct TestFixture {
    pub client: MixerClient<MockProver, MockLedger>,
}

impl TestFixture {
    pub fn new(system: ProofSystem) -> Self {
        Self::build(system, false)
    }

    /// Fixture whose contract mixes a token rather than the native currency
    pub fn token(system: ProofSystem) -> Self {
        Self::build(system, true)
    }

    fn build(system: ProofSystem, token: bool) -> Self {
        init_logger();
        let prover = MockProver::new(system);
        let vk = prover.verification_key().unwrap();
        let ledger = MockLedger::new(vk, TREE_DEPTH, token);
        Self {
            client: MixerClient::new(prover, ledger),
        }
    }

    pub fn ledger(&self) -> &MockLedger {
        self.client.ledger()
    }
}

pub fn commitments(notes: &[shroud_privacy::NoteDescription]) -> Vec<Commitment> {
    notes.iter().map(|n| n.commitment).collect()
}

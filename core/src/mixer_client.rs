//! Mixer Client
//!
//! Ties a proving service and a ledger together: builds join-splits against
//! the caller's view of the commitment tree and submits them.
//!
//! Join-split values are in public units. Unless the caller overrides it,
//! a `mix` call attaches `v_in` scaled by
//! [`PUBLIC_UNIT_VALUE`](shroud_privacy::PUBLIC_UNIT_VALUE) to the ledger
//! transaction. Token mixers pull funds separately and take an override of 0.

use rand::{CryptoRng, RngCore};
use shroud_privacy::{MerkleTree, ShieldedKeys, from_public_units};

use crate::contract::{LedgerAddress, LedgerClient, TxReceipt};
use crate::error::{MixerError, Result};
use crate::joinsplit::{
    ComputeHSig, JoinSplitBuilder, JoinSplitOutput, MixCallDescription, MixParameters,
};
use crate::prover::ProverService;
use crate::public_inputs::extract_public_values;
use crate::zksnark::VerificationKey;

pub struct MixerClient<P, L> {
    prover: P,
    ledger: L,
}

impl<P: ProverService, L: LedgerClient> MixerClient<P, L> {
    pub fn new(prover: P, ledger: L) -> Self {
        Self { prover, ledger }
    }

    pub fn prover(&self) -> &P {
        &self.prover
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The key to deploy the mixer contract with
    pub fn verification_key(&self) -> Result<VerificationKey> {
        Ok(self.prover.verification_key()?)
    }

    /// Moves `Σ outputs` of public value into the pool
    pub fn deposit<R: RngCore + CryptoRng>(
        &self,
        tree: &MerkleTree,
        keys: &ShieldedKeys,
        sender: &LedgerAddress,
        outputs: Vec<JoinSplitOutput>,
        tx_value: Option<u128>,
        rng: &mut R,
    ) -> Result<TxReceipt> {
        let value = outputs.iter().try_fold(0u64, |acc, o| acc.checked_add(o.value)).ok_or(
            MixerError::ValueNotConserved {
                inputs: 0,
                outputs: outputs.iter().map(|o| o.value as u128).sum(),
            },
        )?;
        log::info!("Depositing {value} into {} notes", outputs.len());
        let description = MixCallDescription::new(vec![], outputs, value, 0)?;
        self.joinsplit(tree, keys, sender, description, tx_value, rng)
    }

    /// Builds, signs and submits a join-split
    pub fn joinsplit<R: RngCore + CryptoRng>(
        &self,
        tree: &MerkleTree,
        keys: &ShieldedKeys,
        sender: &LedgerAddress,
        description: MixCallDescription,
        tx_value: Option<u128>,
        rng: &mut R,
    ) -> Result<TxReceipt> {
        let params = self.create_mix_parameters(tree, keys, sender, description, None, rng)?;
        self.mix(sender, &params, tx_value)
    }

    /// Builds and signs a join-split without submitting it
    pub fn create_mix_parameters<R: RngCore + CryptoRng>(
        &self,
        tree: &MerkleTree,
        keys: &ShieldedKeys,
        sender: &LedgerAddress,
        description: MixCallDescription,
        compute_h_sig: Option<ComputeHSig>,
        rng: &mut R,
    ) -> Result<MixParameters> {
        let mut builder = JoinSplitBuilder::new(&self.prover);
        if let Some(f) = compute_h_sig {
            builder = builder.with_h_sig(f);
        }
        builder.build(tree, &keys.ownership(), sender, description, rng)
    }

    /// Submits a signed bundle
    ///
    /// The transaction carries `tx_value` base units, or `v_in` public units
    /// when no override is given.
    pub fn mix(
        &self,
        sender: &LedgerAddress,
        params: &MixParameters,
        tx_value: Option<u128>,
    ) -> Result<TxReceipt> {
        let (v_in, v_out) = extract_public_values(&params.extended_proof.inputs)?;
        let value = tx_value.unwrap_or_else(|| from_public_units(v_in));
        let receipt = self
            .ledger
            .submit_mix(sender, &params.to_contract_arguments(), value)?;
        log::info!(
            "Mix submitted in block {} (v_in={v_in}, v_out={v_out}, value={value}, tx={})",
            receipt.block,
            hex::encode(receipt.tx_hash)
        );
        Ok(receipt)
    }
}

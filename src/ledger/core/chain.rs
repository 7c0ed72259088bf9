use crate::config::LedgerConfig;
use crate::crypto::Address;
use crate::error::LedgerError;
use crate::transaction::{AssetId, SignedTransaction, SuggestedParams, TxId};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

use super::state::LedgerState;
use super::validation::{validate_group, GroupContext};

pub type Sha256Hash = [u8; 32];

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlockHeader {
    pub round: u64,
    pub timestamp: i64,
    pub previous_hash: Sha256Hash,
    pub txn_root: Sha256Hash,
    pub genesis_id: String,
}

impl BlockHeader {
    pub fn hash(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.round.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.previous_hash);
        hasher.update(self.txn_root);
        hasher.update(self.genesis_id.as_bytes());
        hasher.finalize().into()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<SignedTransaction>,
}

impl Block {
    pub fn hash(&self) -> Sha256Hash {
        self.header.hash()
    }

    pub fn calculate_txn_root(ids: &[TxId]) -> Sha256Hash {
        let mut hasher = Sha256::new();
        for id in ids {
            hasher.update(id.as_bytes());
        }
        hasher.finalize().into()
    }
}

/// Where and with what effect a transaction was committed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfirmedTxn {
    pub txid: TxId,
    pub round: u64,
    pub asset_index: Option<AssetId>,
}

/// A single-node ledger that commits one group per round.
pub struct Ledger {
    pub blocks: Vec<Block>,
    pub state: LedgerState,
    pub genesis_id: String,
    pub genesis_hash: Sha256Hash,
    confirmed: HashMap<TxId, ConfirmedTxn>,
}

impl Ledger {
    /// Builds round 0 with the given allocations already credited.
    pub fn new(
        genesis_id: &str,
        genesis_seed: &str,
        rules: LedgerConfig,
        fee_sink: Address,
        allocations: &[(Address, u64)],
    ) -> Self {
        let genesis_hash: Sha256Hash = Sha256::digest(format!("{}:{}", genesis_id, genesis_seed)).into();

        let mut state = LedgerState::new(rules, fee_sink);
        for (address, amount) in allocations {
            state.credit_genesis(*address, *amount);
        }

        let genesis = Block {
            header: BlockHeader {
                round: 0,
                timestamp: chrono::Utc::now().timestamp(),
                previous_hash: genesis_hash,
                txn_root: Block::calculate_txn_root(&[]),
                genesis_id: genesis_id.to_string(),
            },
            transactions: vec![],
        };

        Ledger {
            blocks: vec![genesis],
            state,
            genesis_id: genesis_id.to_string(),
            genesis_hash,
            confirmed: HashMap::new(),
        }
    }

    pub fn round(&self) -> u64 {
        self.blocks.last().map_or(0, |b| b.header.round)
    }

    pub fn rules(&self) -> &LedgerConfig {
        &self.state.rules
    }

    pub fn suggested_params(&self) -> SuggestedParams {
        let round = self.round();
        SuggestedParams {
            fee: self.rules().fee_per_byte,
            min_fee: self.rules().min_fee,
            flat_fee: false,
            first_valid: round,
            last_valid: round + self.rules().max_txn_life,
            genesis_id: self.genesis_id.clone(),
            genesis_hash: self.genesis_hash,
        }
    }

    pub fn confirmed(&self, txid: &str) -> Option<&ConfirmedTxn> {
        self.confirmed.get(txid)
    }

    /// Validates and applies a group as one unit. On any failure the ledger
    /// is left exactly as it was.
    pub fn apply_group(&mut self, group: &[SignedTransaction]) -> Result<Vec<ConfirmedTxn>, LedgerError> {
        let round = self.round() + 1;
        let ids = validate_group(
            group,
            &GroupContext {
                rules: self.rules(),
                genesis_id: &self.genesis_id,
                genesis_hash: &self.genesis_hash,
                round,
                confirmed: &self.confirmed,
            },
        )?;

        let mut temp_state = self.state.clone();
        let mut confirmations = Vec::with_capacity(group.len());
        for (stx, txid) in group.iter().zip(&ids) {
            let asset_index = temp_state
                .apply_transaction(&stx.txn)
                .map_err(|cause| LedgerError::Rejected {
                    txid: txid.clone(),
                    cause: Box::new(cause),
                })?;
            confirmations.push(ConfirmedTxn {
                txid: txid.clone(),
                round,
                asset_index,
            });
        }

        let previous_hash = self.blocks.last().map_or(self.genesis_hash, |b| b.hash());
        let mut timestamp = chrono::Utc::now().timestamp();
        if let Some(last) = self.blocks.last() {
            timestamp = timestamp.max(last.header.timestamp);
        }
        self.blocks.push(Block {
            header: BlockHeader {
                round,
                timestamp,
                previous_hash,
                txn_root: Block::calculate_txn_root(&ids),
                genesis_id: self.genesis_id.clone(),
            },
            transactions: group.to_vec(),
        });
        self.state = temp_state;
        for confirmation in &confirmations {
            self.confirmed.insert(confirmation.txid.clone(), confirmation.clone());
        }

        debug!("Committed round {} with {} transaction(s)", round, group.len());
        Ok(confirmations)
    }
}

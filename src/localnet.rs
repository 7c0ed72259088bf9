//! In-process development network: one node, one group per round, funded
//! genesis accounts standing in for a local key daemon.

use crate::account::Account;
use crate::client::{AccountInformation, CreatedAsset, LedgerClient, NodeStatus, NodeVersions, PendingTransaction};
use crate::config::Config;
use crate::crypto::{address_to_hex, short_address, Address, KeyPair};
use crate::dispenser::DispenserSource;
use crate::error::{LedgerError, Result};
use crate::ledger::{AssetHolding, Ledger};
use crate::transaction::{AssetId, SignedTransaction, SuggestedParams, TxId};
use async_trait::async_trait;
use base64::Engine;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, info, warn};

/// How long `status_after_block` waits for a new round before giving up.
const ROUND_WAIT: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct LocalNet {
    ledger: Arc<RwLock<Ledger>>,
    pool_errors: Arc<RwLock<HashMap<TxId, String>>>,
    new_round: Arc<Notify>,
    genesis_accounts: Arc<Vec<Account>>,
}

impl LocalNet {
    pub fn new(config: &Config) -> Self {
        let genesis_accounts: Vec<Account> = (0..config.localnet.dispenser_accounts)
            .map(|i| Account::generate(Some(&format!("genesis-{}", i))))
            .collect();
        let allocations: Vec<(Address, u64)> = genesis_accounts
            .iter()
            .map(|a| (a.addr(), config.localnet.dispenser_funds))
            .collect();
        let fee_sink = KeyPair::generate().address();

        let ledger = Ledger::new(
            &config.network.genesis_id,
            &config.network.genesis_seed,
            config.ledger.clone(),
            fee_sink,
            &allocations,
        );
        info!(
            "Started local network {} with {} funded account(s)",
            config.network.genesis_id,
            genesis_accounts.len()
        );

        LocalNet {
            ledger: Arc::new(RwLock::new(ledger)),
            pool_errors: Arc::new(RwLock::new(HashMap::new())),
            new_round: Arc::new(Notify::new()),
            genesis_accounts: Arc::new(genesis_accounts),
        }
    }

    /// Credits an address directly, outside of any transaction.
    pub async fn seed_balance(&self, address: Address, amount: u64) {
        self.ledger.write().await.state.credit_genesis(address, amount);
    }

    /// Opens an empty holding of `asset_id` for `address`, outside of any transaction.
    pub async fn seed_opt_in(&self, address: Address, asset_id: AssetId) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        let state = &mut ledger.state;
        let is_frozen = state
            .assets
            .get(&asset_id)
            .ok_or(LedgerError::AssetNotFound(asset_id))?
            .params
            .default_frozen;
        state
            .accounts
            .entry(address)
            .or_default()
            .assets
            .entry(asset_id)
            .or_insert(AssetHolding {
                asset_id,
                amount: 0,
                is_frozen,
            });
        Ok(())
    }

    pub async fn round(&self) -> u64 {
        self.ledger.read().await.round()
    }
}

#[async_trait]
impl LedgerClient for LocalNet {
    async fn versions(&self) -> Result<NodeVersions> {
        let ledger = self.ledger.read().await;
        Ok(NodeVersions {
            genesis_id: ledger.genesis_id.clone(),
            genesis_hash: base64::engine::general_purpose::STANDARD.encode(ledger.genesis_hash),
            build: format!("asa-walkthrough-localnet {}", env!("CARGO_PKG_VERSION")),
            versions: vec!["v2".to_string()],
        })
    }

    async fn status(&self) -> Result<NodeStatus> {
        let ledger = self.ledger.read().await;
        let last_timestamp = ledger.blocks.last().map_or(0, |b| b.header.timestamp);
        Ok(NodeStatus {
            last_round: ledger.round(),
            time_since_last_round_secs: (chrono::Utc::now().timestamp() - last_timestamp).max(0),
        })
    }

    async fn status_after_block(&self, round: u64) -> Result<NodeStatus> {
        let notified = self.new_round.notified();
        if self.round().await > round {
            return self.status().await;
        }
        let _ = tokio::time::timeout(ROUND_WAIT, notified).await;
        self.status().await
    }

    async fn suggested_params(&self) -> Result<SuggestedParams> {
        Ok(self.ledger.read().await.suggested_params())
    }

    async fn account_information(&self, address: &Address) -> Result<AccountInformation> {
        let ledger = self.ledger.read().await;
        let state = &ledger.state;
        let account = state.account(address).cloned().unwrap_or_default();

        let created_assets: Vec<CreatedAsset> = account
            .created_assets
            .iter()
            .filter_map(|id| state.assets.get(id))
            .map(|record| CreatedAsset {
                index: record.index,
                params: record.params.clone(),
            })
            .collect();

        Ok(AccountInformation {
            address: address_to_hex(address),
            amount: account.amount,
            min_balance: state.min_balance(address),
            round: ledger.round(),
            total_assets_opted_in: account.assets.len(),
            total_created_assets: created_assets.len(),
            assets: account.assets.values().cloned().collect(),
            created_assets,
        })
    }

    async fn account_asset_information(&self, address: &Address, asset_id: AssetId) -> Result<Option<AssetHolding>> {
        let ledger = self.ledger.read().await;
        if !ledger.state.assets.contains_key(&asset_id) {
            return Err(LedgerError::AssetNotFound(asset_id));
        }
        Ok(ledger.state.holding(address, asset_id).cloned())
    }

    async fn send_transactions(&self, group: &[SignedTransaction]) -> Result<TxId> {
        let first = group
            .first()
            .ok_or_else(|| LedgerError::GroupError("empty transaction group".to_string()))?
            .id()?;

        let result = self.ledger.write().await.apply_group(group);
        match result {
            Ok(confirmations) => {
                for confirmation in &confirmations {
                    debug!(
                        "Confirmed {} in round {}",
                        confirmation.txid, confirmation.round
                    );
                }
                self.new_round.notify_waiters();
                Ok(first)
            }
            Err(err) => {
                let message = err.to_string();
                let mut pool_errors = self.pool_errors.write().await;
                for stx in group {
                    pool_errors.insert(stx.id()?, message.clone());
                }
                warn!(
                    "Rejected group of {} from {}: {}",
                    group.len(),
                    short_address(&group[0].txn.header.sender),
                    message
                );
                Err(err)
            }
        }
    }

    async fn pending_transaction_information(&self, txid: &str) -> Result<PendingTransaction> {
        if let Some(confirmed) = self.ledger.read().await.confirmed(txid) {
            return Ok(PendingTransaction {
                txid: confirmed.txid.clone(),
                confirmed_round: Some(confirmed.round),
                asset_index: confirmed.asset_index,
                pool_error: String::new(),
            });
        }
        if let Some(pool_error) = self.pool_errors.read().await.get(txid) {
            return Ok(PendingTransaction {
                txid: txid.to_string(),
                confirmed_round: None,
                asset_index: None,
                pool_error: pool_error.clone(),
            });
        }
        Err(LedgerError::TransactionNotFound(txid.to_string()))
    }
}

#[async_trait]
impl DispenserSource for LocalNet {
    async fn funded_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.genesis_accounts.as_ref().clone())
    }
}

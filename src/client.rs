//! The ledger client contract the walkthrough is written against, plus the
//! response shapes it returns.

use crate::crypto::Address;
use crate::error::Result;
use crate::ledger::AssetHolding;
use crate::transaction::{AssetId, AssetParams, SignedTransaction, SuggestedParams, TxId};
use async_trait::async_trait;
use serde::Serialize;

/// Genesis ids that identify a local development network.
pub const LOCALNET_GENESIS_IDS: [&str; 4] = ["localnet-v1", "devnet-v1", "sandnet-v1", "dockernet-v1"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeVersions {
    pub genesis_id: String,
    /// Base64 genesis hash
    pub genesis_hash: String,
    pub build: String,
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeStatus {
    pub last_round: u64,
    pub time_since_last_round_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreatedAsset {
    pub index: AssetId,
    pub params: AssetParams,
}

/// Account snapshot as of `round`. Unknown addresses read as empty accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AccountInformation {
    pub address: String,
    pub amount: u64,
    pub min_balance: u64,
    pub round: u64,
    pub total_assets_opted_in: usize,
    pub total_created_assets: usize,
    pub assets: Vec<AssetHolding>,
    pub created_assets: Vec<CreatedAsset>,
}

/// What the node knows about a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PendingTransaction {
    pub txid: TxId,
    pub confirmed_round: Option<u64>,
    pub asset_index: Option<AssetId>,
    /// Non-empty once the pool has dropped the transaction
    pub pool_error: String,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn versions(&self) -> Result<NodeVersions>;

    async fn status(&self) -> Result<NodeStatus>;

    /// Resolves once the ledger has moved past `round`, or returns the
    /// current status if it does not advance within a short wait.
    async fn status_after_block(&self, round: u64) -> Result<NodeStatus>;

    async fn suggested_params(&self) -> Result<SuggestedParams>;

    async fn account_information(&self, address: &Address) -> Result<AccountInformation>;

    /// `None` when the account has not opted in to `asset_id`.
    async fn account_asset_information(&self, address: &Address, asset_id: AssetId) -> Result<Option<AssetHolding>>;

    /// Submits `group` as one atomic unit and returns the id of its first transaction.
    async fn send_transactions(&self, group: &[SignedTransaction]) -> Result<TxId>;

    async fn pending_transaction_information(&self, txid: &str) -> Result<PendingTransaction>;
}

/// True when the client talks to a local development network.
pub async fn is_localnet<C: LedgerClient + ?Sized>(client: &C) -> Result<bool> {
    let versions = client.versions().await?;
    Ok(LOCALNET_GENESIS_IDS.contains(&versions.genesis_id.as_str()))
}

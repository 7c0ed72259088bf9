//! Atomic transaction composer: collects intents with their signers, binds
//! them into one group, signs, submits and waits for the commit.

use crate::account::TransactionSigner;
use crate::client::{LedgerClient, PendingTransaction};
use crate::config::MAX_GROUP_SIZE_LIMIT;
use crate::crypto::short_address;
use crate::error::{LedgerError, Result};
use crate::transaction::{assign_group_id, AssetId, SignedTransaction, Transaction, TxId};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComposerStatus {
    Building,
    Built,
    Signed,
    Submitted,
    Committed,
}

#[derive(Debug, Clone)]
pub struct ExecuteResult {
    pub confirmed_round: u64,
    pub tx_ids: Vec<TxId>,
    /// One entry per transaction, in group order
    pub confirmations: Vec<PendingTransaction>,
}

impl ExecuteResult {
    /// First asset created anywhere in the group.
    pub fn asset_index(&self) -> Option<AssetId> {
        self.confirmations.iter().find_map(|c| c.asset_index)
    }
}

pub struct AtomicComposer<'a> {
    status: ComposerStatus,
    txns: Vec<(Transaction, &'a dyn TransactionSigner)>,
    signed: Vec<SignedTransaction>,
    tx_ids: Vec<TxId>,
    max_group_size: usize,
}

impl<'a> Default for AtomicComposer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> AtomicComposer<'a> {
    pub fn new() -> Self {
        Self::with_max_group_size(MAX_GROUP_SIZE_LIMIT)
    }

    pub fn with_max_group_size(max_group_size: usize) -> Self {
        AtomicComposer {
            status: ComposerStatus::Building,
            txns: Vec::new(),
            signed: Vec::new(),
            tx_ids: Vec::new(),
            max_group_size,
        }
    }

    pub fn status(&self) -> ComposerStatus {
        self.status
    }

    pub fn add_transaction(&mut self, txn: Transaction, signer: &'a dyn TransactionSigner) -> Result<()> {
        if self.status != ComposerStatus::Building {
            return Err(LedgerError::ComposerError(
                "transactions can only be added while building".to_string(),
            ));
        }
        if self.txns.len() >= self.max_group_size {
            return Err(LedgerError::ComposerError(format!(
                "group is full ({} transactions)",
                self.max_group_size
            )));
        }
        if txn.header.group.is_some() {
            return Err(LedgerError::ComposerError(
                "cannot add a transaction that already belongs to a group".to_string(),
            ));
        }
        self.txns.push((txn, signer));
        Ok(())
    }

    /// Freezes the group. A lone transaction is left without a group id.
    pub fn build_group(&mut self) -> Result<Vec<TxId>> {
        if self.status >= ComposerStatus::Built {
            return Ok(self.tx_ids.clone());
        }
        if self.txns.is_empty() {
            return Err(LedgerError::ComposerError("no transactions to build".to_string()));
        }

        if self.txns.len() > 1 {
            let mut txns: Vec<Transaction> = self.txns.iter().map(|(txn, _)| txn.clone()).collect();
            assign_group_id(&mut txns)?;
            for ((slot, _), grouped) in self.txns.iter_mut().zip(txns) {
                *slot = grouped;
            }
        }

        self.tx_ids = self
            .txns
            .iter()
            .map(|(txn, _)| txn.id())
            .collect::<Result<Vec<_>>>()?;
        self.status = ComposerStatus::Built;
        Ok(self.tx_ids.clone())
    }

    pub fn gather_signatures(&mut self) -> Result<Vec<SignedTransaction>> {
        if self.status >= ComposerStatus::Signed {
            return Ok(self.signed.clone());
        }
        self.build_group()?;

        let mut signed = Vec::with_capacity(self.txns.len());
        for (i, (txn, signer)) in self.txns.iter().enumerate() {
            if signer.address() != txn.sender() {
                return Err(LedgerError::ComposerError(format!(
                    "signer {} cannot sign transaction {} sent by {}",
                    short_address(&signer.address()),
                    i,
                    short_address(&txn.sender())
                )));
            }
            signed.push(signer.sign_transaction(txn)?);
        }

        self.signed = signed;
        self.status = ComposerStatus::Signed;
        Ok(self.signed.clone())
    }

    pub async fn submit<C: LedgerClient + ?Sized>(&mut self, client: &C) -> Result<Vec<TxId>> {
        if self.status >= ComposerStatus::Submitted {
            return Err(LedgerError::ComposerError("group was already submitted".to_string()));
        }
        let group = self.gather_signatures()?;
        client.send_transactions(&group).await?;
        self.status = ComposerStatus::Submitted;
        let kinds: Vec<&str> = group.iter().map(|stx| stx.txn.type_str()).collect();
        debug!("Submitted group [{}]", kinds.join(", "));
        Ok(self.tx_ids.clone())
    }

    /// Submits the group and waits until it is committed.
    pub async fn execute<C: LedgerClient + ?Sized>(&mut self, client: &C, wait_rounds: u64) -> Result<ExecuteResult> {
        if self.status == ComposerStatus::Committed {
            return Err(LedgerError::ComposerError("group was already executed".to_string()));
        }
        let tx_ids = self.submit(client).await?;

        let first = wait_for_confirmation(client, &tx_ids[0], wait_rounds).await?;
        let confirmed_round = first.confirmed_round.unwrap_or_default();

        let mut confirmations = vec![first];
        for txid in &tx_ids[1..] {
            confirmations.push(client.pending_transaction_information(txid).await?);
        }

        self.status = ComposerStatus::Committed;
        Ok(ExecuteResult {
            confirmed_round,
            tx_ids,
            confirmations,
        })
    }
}

/// Polls the node until `txid` is committed, giving up after `wait_rounds`
/// rounds. A transaction dropped from the pool is an error straight away.
pub async fn wait_for_confirmation<C: LedgerClient + ?Sized>(
    client: &C,
    txid: &str,
    wait_rounds: u64,
) -> Result<PendingTransaction> {
    let start = client.status().await?.last_round + 1;
    let mut current = start;

    while current < start + wait_rounds {
        match client.pending_transaction_information(txid).await {
            Ok(pending) if pending.confirmed_round.is_some() => return Ok(pending),
            Ok(pending) if !pending.pool_error.is_empty() => {
                return Err(LedgerError::ComposerError(format!(
                    "transaction {} rejected from pool: {}",
                    txid, pending.pool_error
                )));
            }
            Ok(_) | Err(LedgerError::TransactionNotFound(_)) => {}
            Err(e) => return Err(e),
        }
        client.status_after_block(current).await?;
        current += 1;
    }

    Err(LedgerError::ConfirmationTimeout {
        txid: txid.to_string(),
        rounds: wait_rounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::config::Config;
    use crate::dispenser::DispenserSource;
    use crate::localnet::LocalNet;

    async fn funded_net() -> (LocalNet, Account) {
        let net = LocalNet::new(&Config::default());
        let genesis = net.funded_accounts().await.unwrap().remove(0);
        (net, genesis)
    }

    #[tokio::test]
    async fn test_single_transaction_has_no_group_id() {
        let (net, genesis) = funded_net().await;
        let alice = Account::generate(Some("Alice"));
        let params = net.suggested_params().await.unwrap();

        let mut composer = AtomicComposer::new();
        composer
            .add_transaction(Transaction::payment(genesis.addr(), alice.addr(), 1_000_000, &params).unwrap(), &genesis)
            .unwrap();
        composer.build_group().unwrap();
        let signed = composer.gather_signatures().unwrap();
        assert!(signed[0].txn.header.group.is_none());

        let result = composer.execute(&net, 4).await.unwrap();
        assert_eq!(result.confirmed_round, 1);
        assert_eq!(composer.status(), ComposerStatus::Committed);
    }

    #[tokio::test]
    async fn test_group_shares_round_and_group_id() {
        let (net, genesis) = funded_net().await;
        let alice = Account::generate(Some("Alice"));
        let bob = Account::generate(Some("Bob"));
        let params = net.suggested_params().await.unwrap();

        let mut composer = AtomicComposer::new();
        composer
            .add_transaction(Transaction::payment(genesis.addr(), alice.addr(), 1_000_000, &params).unwrap(), &genesis)
            .unwrap();
        composer
            .add_transaction(Transaction::payment(genesis.addr(), bob.addr(), 1_000_000, &params).unwrap(), &genesis)
            .unwrap();

        let signed = composer.gather_signatures().unwrap();
        assert!(signed[0].txn.header.group.is_some());
        assert_eq!(signed[0].txn.header.group, signed[1].txn.header.group);

        let result = composer.execute(&net, 4).await.unwrap();
        assert_eq!(result.tx_ids.len(), 2);
        assert!(result.confirmations.iter().all(|c| c.confirmed_round == Some(1)));
    }

    #[tokio::test]
    async fn test_wrong_signer_rejected() {
        let (net, genesis) = funded_net().await;
        let alice = Account::generate(Some("Alice"));
        let params = net.suggested_params().await.unwrap();

        let mut composer = AtomicComposer::new();
        composer
            .add_transaction(Transaction::payment(genesis.addr(), alice.addr(), 1, &params).unwrap(), &alice)
            .unwrap();
        assert!(matches!(composer.gather_signatures(), Err(LedgerError::ComposerError(_))));
    }

    #[tokio::test]
    async fn test_cannot_add_after_build_or_past_limit() {
        let (net, genesis) = funded_net().await;
        let params = net.suggested_params().await.unwrap();
        let txn = Transaction::payment(genesis.addr(), genesis.addr(), 0, &params).unwrap();

        let mut small = AtomicComposer::with_max_group_size(1);
        small.add_transaction(txn.clone(), &genesis).unwrap();
        assert!(small.add_transaction(txn.clone(), &genesis).is_err());

        let mut composer = AtomicComposer::new();
        composer.add_transaction(txn.clone(), &genesis).unwrap();
        composer.build_group().unwrap();
        assert!(composer.add_transaction(txn, &genesis).is_err());
    }

    #[tokio::test]
    async fn test_wait_for_unknown_transaction_times_out() {
        let (net, _) = funded_net().await;
        let err = wait_for_confirmation(&net, "deadbeef", 1).await.unwrap_err();
        assert!(matches!(err, LedgerError::ConfirmationTimeout { rounds: 1, .. }));
    }
}

use crate::config::LedgerConfig;
use crate::crypto::{address_to_hex, Address};
use crate::error::LedgerError;
use crate::transaction::{AssetId, AssetParams, Transaction, TxnKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Asset ids are drawn from the transaction counter, which starts here.
pub const FIRST_ASSET_ID_FLOOR: u64 = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetHolding {
    pub asset_id: AssetId,
    pub amount: u64,
    pub is_frozen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub index: AssetId,
    pub creator: Address,
    pub params: AssetParams,
}

#[derive(Debug, Clone, Default)]
pub struct AccountState {
    pub amount: u64,
    pub assets: BTreeMap<AssetId, AssetHolding>,
    pub created_assets: BTreeSet<AssetId>,
}

impl AccountState {
    pub fn is_empty(&self) -> bool {
        self.amount == 0 && self.assets.is_empty() && self.created_assets.is_empty()
    }
}

/// Balances, holdings and asset definitions.
///
/// `apply_transaction` may leave the state half-updated when it fails, so
/// callers apply onto a scratch copy and keep it only if everything passed.
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub accounts: HashMap<Address, AccountState>,
    pub assets: BTreeMap<AssetId, AssetRecord>,
    pub fee_sink: Address,
    pub txn_counter: u64,
    pub rules: LedgerConfig,
}

impl LedgerState {
    pub fn new(rules: LedgerConfig, fee_sink: Address) -> Self {
        LedgerState {
            accounts: HashMap::new(),
            assets: BTreeMap::new(),
            fee_sink,
            txn_counter: FIRST_ASSET_ID_FLOOR,
            rules,
        }
    }

    pub fn account(&self, address: &Address) -> Option<&AccountState> {
        self.accounts.get(address)
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.accounts.get(address).map_or(0, |a| a.amount)
    }

    pub fn holding(&self, address: &Address, asset_id: AssetId) -> Option<&AssetHolding> {
        self.accounts.get(address).and_then(|a| a.assets.get(&asset_id))
    }

    /// Base reserve plus one asset reserve per holding (creators hold their own asset).
    pub fn min_balance(&self, address: &Address) -> u64 {
        let holdings = self.accounts.get(address).map_or(0, |a| a.assets.len() as u64);
        self.rules.min_balance + self.rules.asset_reserve * holdings
    }

    pub fn credit_genesis(&mut self, address: Address, amount: u64) {
        self.credit(address, amount);
    }

    fn credit(&mut self, address: Address, amount: u64) {
        let account = self.accounts.entry(address).or_default();
        account.amount = account.amount.saturating_add(amount);
    }

    fn debit(&mut self, address: Address, amount: u64) -> Result<(), LedgerError> {
        let available = self.balance(&address);
        if available < amount {
            return Err(LedgerError::Overspend {
                address,
                needed: amount,
                available,
            });
        }
        if let Some(account) = self.accounts.get_mut(&address) {
            account.amount -= amount;
        }
        Ok(())
    }

    /// Applies one transaction. Returns the id of an asset it created, if any.
    pub fn apply_transaction(&mut self, txn: &Transaction) -> Result<Option<AssetId>, LedgerError> {
        self.txn_counter += 1;
        let sender = txn.header.sender;

        self.debit(sender, txn.header.fee)?;
        let fee_sink = self.fee_sink;
        self.credit(fee_sink, txn.header.fee);

        let mut created = None;
        match &txn.kind {
            TxnKind::Payment(pay) => {
                self.debit(sender, pay.amount)?;
                self.credit(pay.receiver, pay.amount);

                if let Some(close_to) = pay.close_remainder_to {
                    self.close_account(sender, close_to)?;
                }
            }
            TxnKind::AssetCreate(create) => {
                let index = self.txn_counter;
                self.assets.insert(
                    index,
                    AssetRecord {
                        index,
                        creator: sender,
                        params: create.params.clone(),
                    },
                );
                let account = self.accounts.entry(sender).or_default();
                account.created_assets.insert(index);
                account.assets.insert(
                    index,
                    AssetHolding {
                        asset_id: index,
                        amount: create.params.total,
                        is_frozen: false,
                    },
                );
                created = Some(index);
            }
            TxnKind::AssetTransfer(xfer) => {
                let record = self
                    .assets
                    .get(&xfer.asset_id)
                    .cloned()
                    .ok_or(LedgerError::AssetNotFound(xfer.asset_id))?;

                if txn.is_opt_in() {
                    let account = self.accounts.entry(sender).or_default();
                    account.assets.entry(xfer.asset_id).or_insert(AssetHolding {
                        asset_id: xfer.asset_id,
                        amount: 0,
                        is_frozen: record.params.default_frozen,
                    });
                } else {
                    self.move_asset(sender, xfer.receiver, xfer.asset_id, xfer.amount)?;

                    if let Some(close_to) = xfer.close_to {
                        self.close_holding(&record, sender, close_to)?;
                    }
                }
            }
        }

        for address in txn.touched_accounts() {
            self.check_min_balance(&address)?;
        }

        Ok(created)
    }

    fn move_asset(
        &mut self,
        from: Address,
        to: Address,
        asset_id: AssetId,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let from_holding = self
            .holding(&from, asset_id)
            .cloned()
            .ok_or(LedgerError::MissingOptIn { asset_id, address: from })?;
        let to_holding = self
            .holding(&to, asset_id)
            .cloned()
            .ok_or(LedgerError::MissingOptIn { asset_id, address: to })?;

        if from_holding.is_frozen {
            return Err(LedgerError::AssetFrozen { asset_id, address: from });
        }
        if to_holding.is_frozen {
            return Err(LedgerError::AssetFrozen { asset_id, address: to });
        }
        if from_holding.amount < amount {
            return Err(LedgerError::InvalidTransaction(format!(
                "underflow on subtracting {} from sender amount {} of asset {}",
                amount, from_holding.amount, asset_id
            )));
        }
        if from == to || amount == 0 {
            return Ok(());
        }

        if let Some(holding) = self.accounts.get_mut(&from).and_then(|a| a.assets.get_mut(&asset_id)) {
            holding.amount -= amount;
        }
        if let Some(holding) = self.accounts.get_mut(&to).and_then(|a| a.assets.get_mut(&asset_id)) {
            holding.amount += amount;
        }
        Ok(())
    }

    fn close_holding(
        &mut self,
        record: &AssetRecord,
        sender: Address,
        close_to: Address,
    ) -> Result<(), LedgerError> {
        if sender == record.creator {
            return Err(LedgerError::InvalidTransaction(format!(
                "cannot close asset {} in its creator account",
                record.index
            )));
        }
        if self.holding(&close_to, record.index).is_none() {
            return Err(LedgerError::MissingOptIn {
                asset_id: record.index,
                address: close_to,
            });
        }

        let remaining = self.holding(&sender, record.index).map_or(0, |h| h.amount);
        self.move_asset(sender, close_to, record.index, remaining)?;

        if let Some(account) = self.accounts.get_mut(&sender) {
            account.assets.remove(&record.index);
        }
        Ok(())
    }

    fn close_account(&mut self, sender: Address, close_to: Address) -> Result<(), LedgerError> {
        let account = self.accounts.get(&sender).cloned().unwrap_or_default();
        if !account.assets.is_empty() || !account.created_assets.is_empty() {
            return Err(LedgerError::InvalidTransaction(format!(
                "cannot close account {} while it still holds assets",
                address_to_hex(&sender)
            )));
        }
        self.debit(sender, account.amount)?;
        self.credit(close_to, account.amount);
        self.accounts.remove(&sender);
        Ok(())
    }

    fn check_min_balance(&self, address: &Address) -> Result<(), LedgerError> {
        let Some(account) = self.accounts.get(address) else {
            return Ok(());
        };
        if account.is_empty() {
            return Ok(());
        }
        let min_balance = self.min_balance(address);
        if account.amount < min_balance {
            return Err(LedgerError::BelowMinimumBalance {
                address: *address,
                balance: account.amount,
                min_balance,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::transaction::SuggestedParams;

    fn params() -> SuggestedParams {
        SuggestedParams {
            fee: 0,
            min_fee: 1000,
            flat_fee: false,
            first_valid: 0,
            last_valid: 1000,
            genesis_id: "localnet-v1".to_string(),
            genesis_hash: [0u8; 32],
        }
    }

    fn funded_state(accounts: &[(Address, u64)]) -> LedgerState {
        let mut state = LedgerState::new(LedgerConfig::default(), [0xfe; 32]);
        for (address, amount) in accounts {
            state.credit_genesis(*address, *amount);
        }
        state
    }

    fn create_asset(state: &mut LedgerState, creator: Address, total: u64) -> AssetId {
        let txn = Transaction::asset_create(creator, AssetParams::new(total, 0, false), &params()).unwrap();
        state.apply_transaction(&txn).unwrap().unwrap()
    }

    #[test]
    fn test_payment_moves_amount_and_fee() {
        let alice = KeyPair::generate().address();
        let bob = KeyPair::generate().address();
        let mut state = funded_state(&[(alice, 10_000_000)]);

        let txn = Transaction::payment(alice, bob, 1_000_000, &params()).unwrap();
        state.apply_transaction(&txn).unwrap();

        assert_eq!(state.balance(&alice), 10_000_000 - 1_000_000 - 1000);
        assert_eq!(state.balance(&bob), 1_000_000);
        assert_eq!(state.balance(&[0xfe; 32]), 1000);
    }

    #[test]
    fn test_payment_leaving_receiver_below_reserve_rejected() {
        let alice = KeyPair::generate().address();
        let bob = KeyPair::generate().address();
        let mut state = funded_state(&[(alice, 10_000_000)]);

        let txn = Transaction::payment(alice, bob, 5, &params()).unwrap();
        let err = state.apply_transaction(&txn).unwrap_err();
        assert!(matches!(err, LedgerError::BelowMinimumBalance { address, .. } if address == bob));
    }

    #[test]
    fn test_overspend_rejected() {
        let alice = KeyPair::generate().address();
        let bob = KeyPair::generate().address();
        let mut state = funded_state(&[(alice, 500_000)]);

        let txn = Transaction::payment(alice, bob, 1_000_000, &params()).unwrap();
        assert!(matches!(
            state.apply_transaction(&txn),
            Err(LedgerError::Overspend { .. })
        ));
    }

    #[test]
    fn test_asset_creation_opts_in_creator() {
        let alice = KeyPair::generate().address();
        let mut state = funded_state(&[(alice, 10_000_000)]);

        let asset_id = create_asset(&mut state, alice, 100);
        assert!(asset_id > FIRST_ASSET_ID_FLOOR);
        assert_eq!(state.holding(&alice, asset_id).unwrap().amount, 100);
        assert_eq!(state.min_balance(&alice), 200_000);
        assert_eq!(state.assets[&asset_id].creator, alice);
    }

    #[test]
    fn test_unfunded_creator_cannot_create_asset() {
        let alice = KeyPair::generate().address();
        let mut state = funded_state(&[(alice, 150_000)]);

        let txn = Transaction::asset_create(alice, AssetParams::new(100, 0, false), &params()).unwrap();
        assert!(matches!(
            state.apply_transaction(&txn),
            Err(LedgerError::BelowMinimumBalance { .. })
        ));
    }

    #[test]
    fn test_transfer_requires_receiver_opt_in() {
        let alice = KeyPair::generate().address();
        let bob = KeyPair::generate().address();
        let mut state = funded_state(&[(alice, 10_000_000), (bob, 10_000_000)]);
        let asset_id = create_asset(&mut state, alice, 100);

        let transfer = Transaction::asset_transfer(alice, bob, asset_id, 1, &params()).unwrap();
        let err = state.clone().apply_transaction(&transfer).unwrap_err();
        assert!(matches!(err, LedgerError::MissingOptIn { address, .. } if address == bob));

        let opt_in = Transaction::asset_opt_in(bob, asset_id, &params()).unwrap();
        state.apply_transaction(&opt_in).unwrap();
        state.apply_transaction(&transfer).unwrap();

        assert_eq!(state.holding(&alice, asset_id).unwrap().amount, 99);
        assert_eq!(state.holding(&bob, asset_id).unwrap().amount, 1);
    }

    #[test]
    fn test_opt_in_to_unknown_asset_rejected() {
        let bob = KeyPair::generate().address();
        let mut state = funded_state(&[(bob, 10_000_000)]);
        let opt_in = Transaction::asset_opt_in(bob, 4242, &params()).unwrap();
        assert!(matches!(
            state.apply_transaction(&opt_in),
            Err(LedgerError::AssetNotFound(4242))
        ));
    }

    #[test]
    fn test_default_frozen_blocks_transfers() {
        let alice = KeyPair::generate().address();
        let bob = KeyPair::generate().address();
        let mut state = funded_state(&[(alice, 10_000_000), (bob, 10_000_000)]);
        let txn = Transaction::asset_create(alice, AssetParams::new(10, 0, true), &params()).unwrap();
        let asset_id = state.apply_transaction(&txn).unwrap().unwrap();

        state
            .apply_transaction(&Transaction::asset_opt_in(bob, asset_id, &params()).unwrap())
            .unwrap();
        assert!(state.holding(&bob, asset_id).unwrap().is_frozen);

        let transfer = Transaction::asset_transfer(alice, bob, asset_id, 1, &params()).unwrap();
        assert!(matches!(
            state.apply_transaction(&transfer),
            Err(LedgerError::AssetFrozen { .. })
        ));
    }

    #[test]
    fn test_close_out_releases_reserve() {
        let alice = KeyPair::generate().address();
        let bob = KeyPair::generate().address();
        let mut state = funded_state(&[(alice, 10_000_000), (bob, 10_000_000)]);
        let asset_id = create_asset(&mut state, alice, 100);
        state
            .apply_transaction(&Transaction::asset_opt_in(bob, asset_id, &params()).unwrap())
            .unwrap();
        state
            .apply_transaction(&Transaction::asset_transfer(alice, bob, asset_id, 3, &params()).unwrap())
            .unwrap();
        let before = state.min_balance(&bob);

        let close = Transaction::asset_close_out(bob, alice, asset_id, alice, &params()).unwrap();
        state.apply_transaction(&close).unwrap();

        assert_eq!(before - state.min_balance(&bob), LedgerConfig::default().asset_reserve);
        assert!(state.holding(&bob, asset_id).is_none());
        assert_eq!(state.holding(&alice, asset_id).unwrap().amount, 100);
    }

    #[test]
    fn test_creator_cannot_close_out() {
        let alice = KeyPair::generate().address();
        let bob = KeyPair::generate().address();
        let mut state = funded_state(&[(alice, 10_000_000), (bob, 10_000_000)]);
        let asset_id = create_asset(&mut state, alice, 100);
        state
            .apply_transaction(&Transaction::asset_opt_in(bob, asset_id, &params()).unwrap())
            .unwrap();

        let close = Transaction::asset_close_out(alice, bob, asset_id, bob, &params()).unwrap();
        assert!(matches!(
            state.apply_transaction(&close),
            Err(LedgerError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_close_out_target_must_be_opted_in() {
        let alice = KeyPair::generate().address();
        let bob = KeyPair::generate().address();
        let carol = KeyPair::generate().address();
        let mut state = funded_state(&[(alice, 10_000_000), (bob, 10_000_000), (carol, 10_000_000)]);
        let asset_id = create_asset(&mut state, alice, 100);
        state
            .apply_transaction(&Transaction::asset_opt_in(bob, asset_id, &params()).unwrap())
            .unwrap();
        state
            .apply_transaction(&Transaction::asset_transfer(alice, bob, asset_id, 3, &params()).unwrap())
            .unwrap();

        let close = Transaction::asset_close_out(bob, alice, asset_id, carol, &params()).unwrap();
        let err = state.clone().apply_transaction(&close).unwrap_err();
        assert!(matches!(err, LedgerError::MissingOptIn { address, .. } if address == carol));
        assert_eq!(state.holding(&bob, asset_id).unwrap().amount, 3);
    }

    #[test]
    fn test_close_remainder_refused_while_holding_assets() {
        let alice = KeyPair::generate().address();
        let bob = KeyPair::generate().address();
        let mut state = funded_state(&[(alice, 10_000_000), (bob, 10_000_000)]);
        let asset_id = create_asset(&mut state, alice, 100);
        state
            .apply_transaction(&Transaction::asset_opt_in(bob, asset_id, &params()).unwrap())
            .unwrap();

        let mut txn = Transaction::payment(bob, alice, 0, &params()).unwrap();
        if let TxnKind::Payment(ref mut pay) = txn.kind {
            pay.close_remainder_to = Some(alice);
        }
        let err = state.apply_transaction(&txn).unwrap_err();
        assert!(err.to_string().contains("still holds assets"));
    }

    #[test]
    fn test_close_remainder_empties_account() {
        let alice = KeyPair::generate().address();
        let bob = KeyPair::generate().address();
        let carol = KeyPair::generate().address();
        let mut state = funded_state(&[(alice, 10_000_000), (carol, 1_000_000)]);

        let mut txn = Transaction::payment(alice, bob, 1_000_000, &params()).unwrap();
        if let TxnKind::Payment(ref mut pay) = txn.kind {
            pay.close_remainder_to = Some(carol);
        }
        state.apply_transaction(&txn).unwrap();

        assert!(state.account(&alice).is_none());
        assert_eq!(state.balance(&bob), 1_000_000);
        assert_eq!(state.balance(&carol), 1_000_000 + 10_000_000 - 1_000_000 - 1000);
    }
}

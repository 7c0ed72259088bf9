//! The asset walkthrough: two accounts, one asset, and every step of its
//! life from creation to close-out, narrated through the log.

use crate::account::{Account, TransactionSigner};
use crate::client::LedgerClient;
use crate::composer::{AtomicComposer, ExecuteResult};
use crate::config::{Config, ScenarioConfig};
use crate::crypto::Address;
use crate::dispenser::{get_dispenser_account, DispenserSource};
use crate::error::{LedgerError, Result};
use crate::ledger::AssetHolding;
use crate::transaction::{format_units, AssetId, AssetParams, Transaction};
use serde::Serialize;
use tracing::{info, warn};

/// What the walkthrough observed, step by step.
#[derive(Debug, Clone, Serialize)]
pub struct WalkthroughReport {
    pub alice: String,
    pub bob: String,
    pub dispenser: String,
    pub asset_id: AssetId,
    /// Message of the transfer attempted before Bob opted in
    pub transfer_error: Option<String>,
    pub alice_holding_after_transfer: u64,
    pub bob_holding_after_transfer: u64,
    pub alice_holding_after_buy_back: u64,
    pub bob_holding_after_buy_back: u64,
    pub bob_min_balance_before_close: u64,
    pub bob_min_balance_after_close: u64,
    pub bob_holding_after_close: Option<AssetHolding>,
    pub final_round: u64,
}

pub struct Walkthrough<'a, C: ?Sized, S: ?Sized> {
    client: &'a C,
    source: &'a S,
    config: &'a Config,
}

impl<'a, C, S> Walkthrough<'a, C, S>
where
    C: LedgerClient + ?Sized,
    S: DispenserSource + ?Sized,
{
    pub fn new(client: &'a C, source: &'a S, config: &'a Config) -> Self {
        Walkthrough { client, source, config }
    }

    fn scenario(&self) -> &ScenarioConfig {
        &self.config.scenario
    }

    pub async fn run(&self) -> Result<WalkthroughReport> {
        // 1. Two fresh local identities
        let alice = Account::generate(Some("Alice"));
        let bob = Account::generate(Some("Bob"));
        info!("Alice's address: {}", alice.address_hex());
        info!("Bob's address: {}", bob.address_hex());

        // 2. What the node and ledger know so far
        info!("Node versions: {}", to_json(&self.client.versions().await?));
        info!(
            "Alice's account: {}",
            to_json(&self.client.account_information(&alice.addr()).await?)
        );

        // 3. Fund Alice
        let dispenser = get_dispenser_account(self.client, self.source, &self.config.dispenser).await?;
        self.fund(&dispenser, &alice).await?;
        info!(
            "Alice's account: {}",
            to_json(&self.client.account_information(&alice.addr()).await?)
        );

        // 4. Alice mints the asset
        let asset_id = self.create_asset(&alice).await?;

        // 5. Bob has not opted in yet, so this has to fail
        let params = self.client.suggested_params().await?;
        let transfer = Transaction::asset_transfer(
            alice.addr(),
            bob.addr(),
            asset_id,
            self.scenario().transfer_amount,
            &params,
        )?;
        let transfer_error = match self.execute_single(transfer.clone(), &alice).await {
            Err(err) if err.is_missing_opt_in() => {
                warn!("Transfer error: {}", err);
                Some(err.to_string())
            }
            Err(err) => return Err(err),
            Ok(result) => {
                warn!(
                    "Transfer to {} succeeded in round {} before opt-in",
                    bob.label(),
                    result.confirmed_round
                );
                None
            }
        };

        // 6. Fund Bob
        self.fund(&dispenser, &bob).await?;

        // 7. Bob opts in
        let params = self.client.suggested_params().await?;
        let opt_in = Transaction::asset_opt_in(bob.addr(), asset_id, &params)?;
        let result = self.execute_single(opt_in, &bob).await?;
        info!("{} opted in to asset {} in round {}", bob.label(), asset_id, result.confirmed_round);

        // 8. The same transfer, now accepted
        if transfer_error.is_some() {
            let result = self.execute_single(transfer, &alice).await?;
            info!("Transfer confirmed in round {}", result.confirmed_round);
        }

        // 9. Holdings after the transfer
        let alice_holding_after_transfer = self.print_holding(&alice, asset_id).await?;
        let bob_holding_after_transfer = self.print_holding(&bob, asset_id).await?;

        // 10. Alice buys the unit back: one payment, one asset transfer, one group
        let result = self.buy_back(&alice, &bob, asset_id).await?;
        info!(
            "Buy-back group of {} transactions confirmed in round {}",
            result.tx_ids.len(),
            result.confirmed_round
        );

        // 11. Holdings and Bob's minimum balance with the holding still open
        let alice_holding_after_buy_back = self.print_holding(&alice, asset_id).await?;
        let bob_holding_after_buy_back = self.print_holding(&bob, asset_id).await?;
        let bob_min_balance_before_close = self.client.account_information(&bob.addr()).await?.min_balance;
        info!("Bob's min balance: {}", bob_min_balance_before_close);

        // 12. Bob closes the holding out to Alice
        let params = self.client.suggested_params().await?;
        let close_out = Transaction::asset_close_out(bob.addr(), alice.addr(), asset_id, alice.addr(), &params)?;
        let result = self.execute_single(close_out, &bob).await?;
        info!("{} closed out asset {} in round {}", bob.label(), asset_id, result.confirmed_round);

        // 13. The reserve for the holding is released
        let bob_info = self.client.account_information(&bob.addr()).await?;
        info!("Bob's min balance: {}", bob_info.min_balance);
        let bob_holding_after_close = self.client.account_asset_information(&bob.addr(), asset_id).await?;

        Ok(WalkthroughReport {
            alice: alice.address_hex(),
            bob: bob.address_hex(),
            dispenser: dispenser.address_hex(),
            asset_id,
            transfer_error,
            alice_holding_after_transfer,
            bob_holding_after_transfer,
            alice_holding_after_buy_back,
            bob_holding_after_buy_back,
            bob_min_balance_before_close,
            bob_min_balance_after_close: bob_info.min_balance,
            bob_holding_after_close,
            final_round: self.client.status().await?.last_round,
        })
    }

    async fn fund(&self, dispenser: &Account, receiver: &Account) -> Result<ExecuteResult> {
        let amount = self.scenario().fund_amount;
        let params = self.client.suggested_params().await?;
        let payment = Transaction::payment(dispenser.addr(), receiver.addr(), amount, &params)?;
        let result = self.execute_single(payment, dispenser).await?;
        info!(
            "Funded {} with {} in round {}",
            receiver.label(),
            format_units(amount),
            result.confirmed_round
        );
        Ok(result)
    }

    async fn create_asset(&self, creator: &Account) -> Result<AssetId> {
        let scenario = self.scenario();
        let mut asset = AssetParams::new(scenario.asset_total, scenario.asset_decimals, scenario.default_frozen);
        asset.unit_name = scenario.unit_name.clone();
        asset.asset_name = scenario.asset_name.clone();

        let params = self.client.suggested_params().await?;
        let create = Transaction::asset_create(creator.addr(), asset, &params)?;
        let result = self.execute_single(create, creator).await?;
        info!("Create result confirmation: {}", to_json(&result.confirmations[0]));

        result.asset_index().ok_or_else(|| {
            LedgerError::ComposerError(format!(
                "confirmation of {} carries no asset index",
                result.tx_ids[0]
            ))
        })
    }

    async fn buy_back(&self, buyer: &Account, seller: &Account, asset_id: AssetId) -> Result<ExecuteResult> {
        let params = self.client.suggested_params().await?;
        let payment = Transaction::payment(buyer.addr(), seller.addr(), self.scenario().buy_back_price, &params)?;
        let transfer = Transaction::asset_transfer(
            seller.addr(),
            buyer.addr(),
            asset_id,
            self.scenario().transfer_amount,
            &params,
        )?;

        let mut composer = AtomicComposer::with_max_group_size(self.config.ledger.max_group_size);
        composer.add_transaction(payment, buyer)?;
        composer.add_transaction(transfer, seller)?;
        composer.execute(self.client, self.scenario().wait_rounds).await
    }

    async fn execute_single(&self, txn: Transaction, signer: &dyn TransactionSigner) -> Result<ExecuteResult> {
        let mut composer = AtomicComposer::new();
        composer.add_transaction(txn, signer)?;
        composer.execute(self.client, self.scenario().wait_rounds).await
    }

    /// Logs the account's holding of `asset_id` and returns its amount.
    async fn print_holding(&self, account: &Account, asset_id: AssetId) -> Result<u64> {
        let holding = self.client.account_asset_information(&account.addr(), asset_id).await?;
        info!("{}'s assets: {}", account.label(), to_json(&holding));
        Ok(holding_amount(holding.as_ref()))
    }
}

fn holding_amount(holding: Option<&AssetHolding>) -> u64 {
    holding.map_or(0, |h| h.amount)
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {}>", e))
}

/// Shortcut for callers holding a plain address rather than an account.
pub async fn asset_balance<C: LedgerClient + ?Sized>(client: &C, address: &Address, asset_id: AssetId) -> Result<u64> {
    Ok(holding_amount(
        client.account_asset_information(address, asset_id).await?.as_ref(),
    ))
}

//! Finding a funded account to pay new accounts from.

use crate::account::Account;
use crate::client::{is_localnet, LedgerClient};
use crate::config::DispenserConfig;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use tracing::{debug, info};

/// Somewhere that holds keys for already-funded accounts, e.g. a local
/// network's genesis wallet.
#[async_trait]
pub trait DispenserSource: Send + Sync {
    async fn funded_accounts(&self) -> Result<Vec<Account>>;
}

/// Resolves the dispenser: an explicitly configured key first, then the
/// richest account the source knows about, local networks only.
pub async fn get_dispenser_account<C, S>(client: &C, source: &S, config: &DispenserConfig) -> Result<Account>
where
    C: LedgerClient + ?Sized,
    S: DispenserSource + ?Sized,
{
    if let Some(secret_key) = &config.secret_key {
        let account = Account::from_secret_hex(Some("dispenser"), secret_key)?;
        info!("Using configured dispenser {}", account.label());
        return Ok(account);
    }

    if !is_localnet(client).await? {
        return Err(LedgerError::DispenserUnavailable(
            "no dispenser key configured and the network is not a local network".to_string(),
        ));
    }

    let mut richest: Option<(u64, Account)> = None;
    for account in source.funded_accounts().await? {
        let amount = client.account_information(&account.addr()).await?.amount;
        debug!("Dispenser candidate {} holds {}", account.label(), amount);
        if richest.as_ref().map_or(true, |(best, _)| amount > *best) {
            richest = Some((amount, account));
        }
    }

    match richest {
        Some((amount, mut account)) if amount > 0 => {
            account.name = Some("dispenser".to_string());
            Ok(account)
        }
        _ => Err(LedgerError::DispenserUnavailable(
            "the local network has no funded accounts".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crypto::KeyPair;
    use crate::localnet::LocalNet;

    struct NoAccounts;

    #[async_trait]
    impl DispenserSource for NoAccounts {
        async fn funded_accounts(&self) -> Result<Vec<Account>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_picks_richest_genesis_account() {
        let net = LocalNet::new(&Config::default());
        let genesis = net.funded_accounts().await.unwrap();
        net.seed_balance(genesis[2].addr(), 5).await;

        let dispenser = get_dispenser_account(&net, &net, &DispenserConfig::default()).await.unwrap();
        assert_eq!(dispenser.addr(), genesis[2].addr());
        assert_eq!(dispenser.label(), "dispenser");
    }

    #[tokio::test]
    async fn test_configured_key_wins() {
        let net = LocalNet::new(&Config::default());
        let keypair = KeyPair::generate();
        let config = DispenserConfig {
            secret_key: Some(keypair.secret_hex()),
        };

        let dispenser = get_dispenser_account(&net, &net, &config).await.unwrap();
        assert_eq!(dispenser.addr(), keypair.address());
    }

    #[tokio::test]
    async fn test_non_local_network_has_no_dispenser() {
        let mut config = Config::default();
        config.network.genesis_id = "testnet-v1.0".to_string();
        let net = LocalNet::new(&config);

        let err = get_dispenser_account(&net, &net, &DispenserConfig::default()).await.unwrap_err();
        assert!(matches!(err, LedgerError::DispenserUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_source_has_no_dispenser() {
        let net = LocalNet::new(&Config::default());
        let err = get_dispenser_account(&net, &NoAccounts, &DispenserConfig::default()).await.unwrap_err();
        assert!(matches!(err, LedgerError::DispenserUnavailable(_)));
    }
}

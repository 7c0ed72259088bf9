//! Configuration management for the walkthrough and the local ledger

use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Hard upper bound of an atomic group, whatever the config says.
pub const MAX_GROUP_SIZE_LIMIT: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub localnet: LocalNetConfig,
    #[serde(default)]
    pub dispenser: DispenserConfig,
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_genesis_id")]
    pub genesis_id: String,
    /// Seed hashed into the genesis hash, so two local networks can be told apart.
    #[serde(default = "default_genesis_seed")]
    pub genesis_seed: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            genesis_id: default_genesis_id(),
            genesis_seed: default_genesis_seed(),
        }
    }
}

/// Consensus parameters enforced by the ledger.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_min_fee")]
    pub min_fee: u64,
    #[serde(default)]
    pub fee_per_byte: u64,
    #[serde(default = "default_min_balance")]
    pub min_balance: u64,
    #[serde(default = "default_asset_reserve")]
    pub asset_reserve: u64,
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
    #[serde(default = "default_max_txn_life")]
    pub max_txn_life: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_fee: default_min_fee(),
            fee_per_byte: 0,
            min_balance: default_min_balance(),
            asset_reserve: default_asset_reserve(),
            max_group_size: default_max_group_size(),
            max_txn_life: default_max_txn_life(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalNetConfig {
    #[serde(default = "default_dispenser_accounts")]
    pub dispenser_accounts: usize,
    #[serde(default = "default_dispenser_funds")]
    pub dispenser_funds: u64,
}

impl Default for LocalNetConfig {
    fn default() -> Self {
        Self {
            dispenser_accounts: default_dispenser_accounts(),
            dispenser_funds: default_dispenser_funds(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispenserConfig {
    /// Hex secret key of an externally funded account. When unset the
    /// dispenser is discovered on the local network.
    #[serde(default)]
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_fund_amount")]
    pub fund_amount: u64,
    #[serde(default = "default_asset_total")]
    pub asset_total: u64,
    #[serde(default)]
    pub asset_decimals: u32,
    #[serde(default)]
    pub default_frozen: bool,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub asset_name: Option<String>,
    #[serde(default = "default_transfer_amount")]
    pub transfer_amount: u64,
    #[serde(default = "default_buy_back_price")]
    pub buy_back_price: u64,
    #[serde(default = "default_wait_rounds")]
    pub wait_rounds: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            fund_amount: default_fund_amount(),
            asset_total: default_asset_total(),
            asset_decimals: 0,
            default_frozen: false,
            unit_name: None,
            asset_name: None,
            transfer_amount: default_transfer_amount(),
            buy_back_price: default_buy_back_price(),
            wait_rounds: default_wait_rounds(),
        }
    }
}

impl Config {
    pub fn from_toml_str(config_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.genesis_id.is_empty() {
            return Err(ConfigError::Invalid("network.genesis_id must not be empty".into()));
        }

        if self.ledger.min_fee == 0 {
            return Err(ConfigError::Invalid("ledger.min_fee must be greater than zero".into()));
        }

        if self.ledger.max_group_size == 0 || self.ledger.max_group_size > MAX_GROUP_SIZE_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "ledger.max_group_size must be between 1 and {}",
                MAX_GROUP_SIZE_LIMIT
            )));
        }

        if self.ledger.max_txn_life == 0 {
            return Err(ConfigError::Invalid("ledger.max_txn_life must be greater than zero".into()));
        }

        if self.scenario.asset_decimals > 19 {
            return Err(ConfigError::Invalid("scenario.asset_decimals must be at most 19".into()));
        }

        if self.scenario.transfer_amount > self.scenario.asset_total {
            return Err(ConfigError::Invalid(
                "scenario.transfer_amount cannot exceed scenario.asset_total".into(),
            ));
        }

        if self.scenario.fund_amount < self.ledger.min_balance {
            return Err(ConfigError::Invalid(format!(
                "scenario.fund_amount ({}) is below ledger.min_balance ({})",
                self.scenario.fund_amount, self.ledger.min_balance
            )));
        }

        if self.scenario.wait_rounds == 0 {
            return Err(ConfigError::Invalid("scenario.wait_rounds must be greater than zero".into()));
        }

        Ok(())
    }
}

/// Loads `config.toml` from the working directory, falling back to defaults
/// when it is absent.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_or_default(DEFAULT_CONFIG_PATH)
}

/// Like `load_config_from`, except that a missing file yields the defaults.
/// Any other read failure is still an error.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(config_str) => Config::from_toml_str(&config_str),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
        Err(source) => Err(ConfigError::Read {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Loads an explicitly named config file; a missing file is an error.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Config::from_toml_str(&config_str)
}

fn default_genesis_id() -> String {
    "localnet-v1".to_string()
}

fn default_genesis_seed() -> String {
    "asa-walkthrough".to_string()
}

fn default_min_fee() -> u64 {
    1_000
}

fn default_min_balance() -> u64 {
    100_000
}

fn default_asset_reserve() -> u64 {
    100_000
}

fn default_max_group_size() -> usize {
    MAX_GROUP_SIZE_LIMIT
}

fn default_max_txn_life() -> u64 {
    1_000
}

fn default_dispenser_accounts() -> usize {
    3
}

fn default_dispenser_funds() -> u64 {
    1_000_000_000_000
}

fn default_fund_amount() -> u64 {
    10_000_000
}

fn default_asset_total() -> u64 {
    100
}

fn default_transfer_amount() -> u64 {
    1
}

fn default_buy_back_price() -> u64 {
    1_000_000
}

fn default_wait_rounds() -> u64 {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_walkthrough_values() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scenario.fund_amount, 10_000_000);
        assert_eq!(config.scenario.asset_total, 100);
        assert_eq!(config.scenario.asset_decimals, 0);
        assert!(!config.scenario.default_frozen);
        assert_eq!(config.scenario.buy_back_price, 1_000_000);
        assert_eq!(config.ledger.min_balance, 100_000);
        assert_eq!(config.ledger.asset_reserve, 100_000);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [scenario]
            asset_total = 500
            unit_name = "WLK"

            [ledger]
            min_fee = 2000
            "#,
        )
        .unwrap();

        assert_eq!(config.scenario.asset_total, 500);
        assert_eq!(config.scenario.unit_name.as_deref(), Some("WLK"));
        assert_eq!(config.scenario.fund_amount, 10_000_000);
        assert_eq!(config.ledger.min_fee, 2000);
        assert_eq!(config.network.genesis_id, "localnet-v1");
    }

    #[test]
    fn test_oversized_group_limit_rejected() {
        let result = Config::from_toml_str("[ledger]\nmax_group_size = 17\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_fund_amount_below_min_balance_rejected() {
        let result = Config::from_toml_str("[scenario]\nfund_amount = 10\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("below ledger.min_balance"));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = Config::from_toml_str("[scenario\nfund_amount = 1");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}

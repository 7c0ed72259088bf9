//! Error types for the ledger, client and walkthrough

use std::fmt;

use crate::crypto::{address_to_hex, Address};
use crate::transaction::AssetId;

#[derive(Debug, Clone)]
pub enum LedgerError {
    InvalidTransaction(String),
    MissingOptIn { asset_id: AssetId, address: Address },
    Overspend { address: Address, needed: u64, available: u64 },
    BelowMinimumBalance { address: Address, balance: u64, min_balance: u64 },
    AssetNotFound(AssetId),
    AssetFrozen { asset_id: AssetId, address: Address },
    CryptoError(String),
    GroupError(String),
    DuplicateTransaction(String),
    Rejected { txid: String, cause: Box<LedgerError> },
    ConfirmationTimeout { txid: String, rounds: u64 },
    TransactionNotFound(String),
    DispenserUnavailable(String),
    ComposerError(String),
    ConfigError(String),
    IoError(String),
    BincodeError(String),
}

impl LedgerError {
    /// Strips `Rejected` wrappers, leaving the rule the ledger actually enforced.
    pub fn root_cause(&self) -> &LedgerError {
        match self {
            LedgerError::Rejected { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    pub fn is_missing_opt_in(&self) -> bool {
        matches!(self.root_cause(), LedgerError::MissingOptIn { .. })
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedgerError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {}", msg),
            LedgerError::MissingOptIn { asset_id, address } => write!(
                f,
                "must optin, asset {} missing from {}",
                asset_id,
                address_to_hex(address)
            ),
            LedgerError::Overspend {
                address,
                needed,
                available,
            } => write!(
                f,
                "overspend: account {} tried to spend {} but holds {}",
                address_to_hex(address),
                needed,
                available
            ),
            LedgerError::BelowMinimumBalance {
                address,
                balance,
                min_balance,
            } => write!(
                f,
                "account {} balance {} below min {}",
                address_to_hex(address),
                balance,
                min_balance
            ),
            LedgerError::AssetNotFound(id) => write!(f, "asset {} does not exist or has been deleted", id),
            LedgerError::AssetFrozen { asset_id, address } => write!(
                f,
                "asset {} frozen in {}",
                asset_id,
                address_to_hex(address)
            ),
            LedgerError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            LedgerError::GroupError(msg) => write!(f, "Group error: {}", msg),
            LedgerError::DuplicateTransaction(txid) => write!(f, "transaction already in ledger: {}", txid),
            LedgerError::Rejected { txid, cause } => write!(f, "transaction {}: {}", txid, cause),
            LedgerError::ConfirmationTimeout { txid, rounds } => write!(
                f,
                "Transaction {} not confirmed after {} rounds",
                txid, rounds
            ),
            LedgerError::TransactionNotFound(txid) => write!(f, "Transaction not found: {}", txid),
            LedgerError::DispenserUnavailable(msg) => write!(f, "Dispenser unavailable: {}", msg),
            LedgerError::ComposerError(msg) => write!(f, "Composer error: {}", msg),
            LedgerError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            LedgerError::IoError(msg) => write!(f, "IO error: {}", msg),
            LedgerError::BincodeError(msg) => write!(f, "Bincode error: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::IoError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for LedgerError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        LedgerError::BincodeError(err.to_string())
    }
}

impl From<crate::config::ConfigError> for LedgerError {
    fn from(err: crate::config::ConfigError) -> Self {
        LedgerError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_nested_rejections() {
        let inner = LedgerError::MissingOptIn {
            asset_id: 1001,
            address: [7u8; 32],
        };
        let err = LedgerError::Rejected {
            txid: "aa".to_string(),
            cause: Box::new(LedgerError::Rejected {
                txid: "bb".to_string(),
                cause: Box::new(inner),
            }),
        };

        assert!(err.is_missing_opt_in());
        assert!(err.to_string().starts_with("transaction aa: transaction bb: must optin"));
    }

    #[test]
    fn test_other_errors_are_not_opt_in_failures() {
        let err = LedgerError::AssetNotFound(5);
        assert!(!err.is_missing_opt_in());
        assert_eq!(err.to_string(), "asset 5 does not exist or has been deleted");
    }
}

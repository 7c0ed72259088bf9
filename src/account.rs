//! Local identities and transaction signers

use crate::crypto::{address_to_hex, short_address, Address, KeyPair};
use crate::error::LedgerError;
use crate::transaction::{SignedTransaction, Transaction};
use std::fmt;

/// Anything that can authorise transactions for one address.
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;

    fn sign_transaction(&self, txn: &Transaction) -> Result<SignedTransaction, LedgerError>;
}

/// An address plus the key that signs for it. Never leaves the process.
#[derive(Clone)]
pub struct Account {
    pub name: Option<String>,
    keypair: KeyPair,
}

impl Account {
    /// Generates a fresh key. No network access.
    pub fn generate(name: Option<&str>) -> Self {
        Account {
            name: name.map(str::to_string),
            keypair: KeyPair::generate(),
        }
    }

    pub fn from_keypair(name: Option<&str>, keypair: KeyPair) -> Self {
        Account {
            name: name.map(str::to_string),
            keypair,
        }
    }

    pub fn from_secret_hex(name: Option<&str>, secret_hex: &str) -> Result<Self, LedgerError> {
        Ok(Self::from_keypair(name, KeyPair::from_secret_hex(secret_hex)?))
    }

    pub fn addr(&self) -> Address {
        self.keypair.address()
    }

    pub fn address_hex(&self) -> String {
        address_to_hex(&self.addr())
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => short_address(&self.addr()),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("address", &self.address_hex())
            .field("keypair", &"[redacted]")
            .finish()
    }
}

impl TransactionSigner for Account {
    fn address(&self) -> Address {
        self.addr()
    }

    fn sign_transaction(&self, txn: &Transaction) -> Result<SignedTransaction, LedgerError> {
        let message = txn.signable_message()?;
        let signature = self.keypair.sign(&message)?;
        Ok(SignedTransaction {
            txn: txn.clone(),
            signature: signature.to_vec(),
            public_key: self.keypair.public_key_bytes().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::SuggestedParams;

    #[test]
    fn test_two_accounts_differ() {
        let alice = Account::generate(Some("Alice"));
        let bob = Account::generate(Some("Bob"));
        assert_ne!(alice.addr(), bob.addr());
        assert_eq!(alice.label(), "Alice");
        assert_eq!(alice.address_hex().len(), 64);
    }

    #[test]
    fn test_debug_hides_key_material() {
        let alice = Account::generate(Some("Alice"));
        let rendered = format!("{:?}", alice);
        assert!(rendered.contains("[redacted]"));
        assert!(rendered.contains(&alice.address_hex()));
    }

    #[test]
    fn test_signed_transaction_verifies_against_sender() {
        let alice = Account::generate(None);
        let params = SuggestedParams {
            fee: 0,
            min_fee: 1000,
            flat_fee: false,
            first_valid: 1,
            last_valid: 1001,
            genesis_id: "localnet-v1".to_string(),
            genesis_hash: [0u8; 32],
        };
        let txn = Transaction::payment(alice.addr(), alice.addr(), 0, &params).unwrap();
        let signed = alice.sign_transaction(&txn).unwrap();
        assert!(signed.verify().is_ok());
        assert_eq!(signed.id().unwrap(), txn.id().unwrap());
    }
}

/// Stateless checks, kept apart from the type definitions
use crate::config::LedgerConfig;
use crate::crypto::{address_from_public_key, address_to_hex, verify_signature, ZERO_ADDRESS};
use crate::error::LedgerError;
use crate::transaction::types::{
    AssetParams, SignedTransaction, Transaction, TxnKind, MAX_ASSET_NAME_LEN, MAX_DECIMALS,
    MAX_NOTE_SIZE, MAX_TRANSACTION_SIZE, MAX_UNIT_NAME_LEN, MAX_URL_LEN,
};

impl Transaction {
    pub fn validate_size(&self) -> Result<(), LedgerError> {
        let size = self.encoded_len()?;
        if size > MAX_TRANSACTION_SIZE {
            return Err(LedgerError::InvalidTransaction(format!(
                "Transaction too large: {} bytes (max: {})",
                size, MAX_TRANSACTION_SIZE
            )));
        }
        Ok(())
    }

    /// Checks everything that does not need ledger state: addresses, fee,
    /// validity window, note and per-kind field limits.
    pub fn validate(&self, rules: &LedgerConfig) -> Result<(), LedgerError> {
        self.validate_size()?;

        if self.header.sender == ZERO_ADDRESS {
            return Err(LedgerError::InvalidTransaction(
                "Sender address cannot be empty".to_string(),
            ));
        }

        if self.header.fee < rules.min_fee {
            return Err(LedgerError::InvalidTransaction(format!(
                "Fee {} below minimum {}",
                self.header.fee, rules.min_fee
            )));
        }

        if self.header.first_valid > self.header.last_valid {
            return Err(LedgerError::InvalidTransaction(format!(
                "First valid round {} is after last valid round {}",
                self.header.first_valid, self.header.last_valid
            )));
        }
        if self.header.last_valid - self.header.first_valid > rules.max_txn_life {
            return Err(LedgerError::InvalidTransaction(format!(
                "Validity window of {} rounds exceeds {}",
                self.header.last_valid - self.header.first_valid,
                rules.max_txn_life
            )));
        }

        if let Some(ref note) = self.header.note {
            if note.len() > MAX_NOTE_SIZE {
                return Err(LedgerError::InvalidTransaction(format!(
                    "Note exceeds maximum length of {} bytes",
                    MAX_NOTE_SIZE
                )));
            }
        }

        match &self.kind {
            TxnKind::Payment(pay) => {
                if pay.receiver == ZERO_ADDRESS && pay.close_remainder_to.is_none() {
                    return Err(LedgerError::InvalidTransaction(
                        "Payment receiver cannot be empty".to_string(),
                    ));
                }
                if pay.close_remainder_to == Some(self.header.sender) {
                    return Err(LedgerError::InvalidTransaction(
                        "Cannot close an account into itself".to_string(),
                    ));
                }
            }
            TxnKind::AssetCreate(create) => validate_asset_params(&create.params)?,
            TxnKind::AssetTransfer(xfer) => {
                if xfer.asset_id == 0 {
                    return Err(LedgerError::InvalidTransaction(
                        "Asset id cannot be zero".to_string(),
                    ));
                }
                if xfer.receiver == ZERO_ADDRESS {
                    return Err(LedgerError::InvalidTransaction(
                        "Asset receiver cannot be empty".to_string(),
                    ));
                }
                if xfer.close_to == Some(self.header.sender) {
                    return Err(LedgerError::InvalidTransaction(
                        "Cannot close an asset holding into the same account".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn validate_asset_params(params: &AssetParams) -> Result<(), LedgerError> {
    if params.decimals > MAX_DECIMALS {
        return Err(LedgerError::InvalidTransaction(format!(
            "Asset decimals {} exceed maximum {}",
            params.decimals, MAX_DECIMALS
        )));
    }
    let limits = [
        (&params.unit_name, MAX_UNIT_NAME_LEN, "unit name"),
        (&params.asset_name, MAX_ASSET_NAME_LEN, "asset name"),
        (&params.url, MAX_URL_LEN, "url"),
    ];
    for (value, max, what) in limits {
        if let Some(value) = value {
            if value.len() > max {
                return Err(LedgerError::InvalidTransaction(format!(
                    "Asset {} exceeds {} bytes",
                    what, max
                )));
            }
        }
    }
    Ok(())
}

impl SignedTransaction {
    /// The public key must derive the sender's address and sign the transaction bytes.
    pub fn verify(&self) -> Result<(), LedgerError> {
        let signer = address_from_public_key(&self.public_key);
        if signer != self.txn.header.sender {
            return Err(LedgerError::CryptoError(format!(
                "Signer {} is not the sender {}",
                address_to_hex(&signer),
                address_to_hex(&self.txn.header.sender)
            )));
        }
        let message = self.txn.signable_message()?;
        verify_signature(&self.public_key, &message, &self.signature)
    }
}

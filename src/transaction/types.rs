/// Transaction intents, network parameters and signed envelopes
use crate::crypto::{Address, ZERO_ADDRESS};
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type AssetId = u64;
/// Hex encoded transaction id
pub type TxId = String;
pub type GroupId = [u8; 32];

/// Maximum encoded transaction size in bytes
pub const MAX_TRANSACTION_SIZE: usize = 100_000;
pub const MAX_NOTE_SIZE: usize = 1024;
pub const MAX_UNIT_NAME_LEN: usize = 8;
pub const MAX_ASSET_NAME_LEN: usize = 32;
pub const MAX_URL_LEN: usize = 96;
pub const MAX_DECIMALS: u32 = 19;

pub const MICRO_UNITS_PER_UNIT: u64 = 1_000_000;

/// Size added to the unsigned encoding when estimating fees.
const SIGNATURE_OVERHEAD: u64 = 64 + 33;

/// Renders a micro-unit amount as whole units with six decimals.
pub fn format_units(micro_units: u64) -> String {
    format!(
        "{}.{:06}",
        micro_units / MICRO_UNITS_PER_UNIT,
        micro_units % MICRO_UNITS_PER_UNIT
    )
}

/// Parameters a client needs to build transactions valid for the current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedParams {
    /// Fee per byte, or the absolute fee when `flat_fee` is set
    pub fee: u64,
    pub min_fee: u64,
    pub flat_fee: bool,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnHeader {
    pub sender: Address,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
    pub note: Option<Vec<u8>>,
    pub group: Option<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTxn {
    pub receiver: Address,
    pub amount: u64,
    pub close_remainder_to: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetParams {
    pub total: u64,
    pub decimals: u32,
    pub default_frozen: bool,
    pub unit_name: Option<String>,
    pub asset_name: Option<String>,
    pub url: Option<String>,
    pub manager: Option<Address>,
    pub reserve: Option<Address>,
    pub freeze: Option<Address>,
    pub clawback: Option<Address>,
}

impl AssetParams {
    pub fn new(total: u64, decimals: u32, default_frozen: bool) -> Self {
        AssetParams {
            total,
            decimals,
            default_frozen,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCreateTxn {
    pub params: AssetParams,
}

/// Moves asset units. Shapes with special meaning:
/// - opt-in: `receiver == sender`, `amount == 0`, no `close_to`
/// - close-out: `close_to` set, the sender's holding is removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTransferTxn {
    pub asset_id: AssetId,
    pub receiver: Address,
    pub amount: u64,
    pub close_to: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnKind {
    Payment(PaymentTxn),
    AssetCreate(AssetCreateTxn),
    AssetTransfer(AssetTransferTxn),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub header: TxnHeader,
    pub kind: TxnKind,
}

impl Transaction {
    fn with_params(sender: Address, kind: TxnKind, params: &SuggestedParams) -> Result<Self, LedgerError> {
        let mut txn = Transaction {
            header: TxnHeader {
                sender,
                fee: 0,
                first_valid: params.first_valid,
                last_valid: params.last_valid,
                genesis_id: params.genesis_id.clone(),
                genesis_hash: params.genesis_hash,
                note: None,
                group: None,
            },
            kind,
        };
        txn.assign_fee(params)?;
        Ok(txn)
    }

    pub fn payment(
        sender: Address,
        receiver: Address,
        amount: u64,
        params: &SuggestedParams,
    ) -> Result<Self, LedgerError> {
        Self::with_params(
            sender,
            TxnKind::Payment(PaymentTxn {
                receiver,
                amount,
                close_remainder_to: None,
            }),
            params,
        )
    }

    pub fn asset_create(
        sender: Address,
        asset: AssetParams,
        params: &SuggestedParams,
    ) -> Result<Self, LedgerError> {
        Self::with_params(sender, TxnKind::AssetCreate(AssetCreateTxn { params: asset }), params)
    }

    pub fn asset_transfer(
        sender: Address,
        receiver: Address,
        asset_id: AssetId,
        amount: u64,
        params: &SuggestedParams,
    ) -> Result<Self, LedgerError> {
        Self::with_params(
            sender,
            TxnKind::AssetTransfer(AssetTransferTxn {
                asset_id,
                receiver,
                amount,
                close_to: None,
            }),
            params,
        )
    }

    /// Zero-amount transfer to self, which the ledger reads as an opt-in.
    pub fn asset_opt_in(
        account: Address,
        asset_id: AssetId,
        params: &SuggestedParams,
    ) -> Result<Self, LedgerError> {
        Self::asset_transfer(account, account, asset_id, 0, params)
    }

    /// Zero-amount transfer that closes the sender's holding into `close_to`.
    pub fn asset_close_out(
        sender: Address,
        receiver: Address,
        asset_id: AssetId,
        close_to: Address,
        params: &SuggestedParams,
    ) -> Result<Self, LedgerError> {
        Self::with_params(
            sender,
            TxnKind::AssetTransfer(AssetTransferTxn {
                asset_id,
                receiver,
                amount: 0,
                close_to: Some(close_to),
            }),
            params,
        )
    }

    fn assign_fee(&mut self, params: &SuggestedParams) -> Result<(), LedgerError> {
        self.header.fee = if params.flat_fee {
            params.fee
        } else {
            let size = self.encoded_len()? as u64 + SIGNATURE_OVERHEAD;
            params.min_fee.max(params.fee.saturating_mul(size))
        };
        Ok(())
    }

    pub fn sender(&self) -> Address {
        self.header.sender
    }

    pub fn type_str(&self) -> &'static str {
        match &self.kind {
            TxnKind::Payment(_) => "pay",
            TxnKind::AssetCreate(_) => "acfg",
            TxnKind::AssetTransfer(_) => "axfer",
        }
    }

    pub fn is_opt_in(&self) -> bool {
        match &self.kind {
            TxnKind::AssetTransfer(t) => {
                t.receiver == self.header.sender && t.amount == 0 && t.close_to.is_none()
            }
            _ => false,
        }
    }

    /// Addresses whose balances this transaction can change (fee sink excluded).
    pub fn touched_accounts(&self) -> Vec<Address> {
        let mut touched = vec![self.header.sender];
        let mut push = |addr: Address| {
            if addr != ZERO_ADDRESS && !touched.contains(&addr) {
                touched.push(addr);
            }
        };
        match &self.kind {
            TxnKind::Payment(p) => {
                push(p.receiver);
                if let Some(close) = p.close_remainder_to {
                    push(close);
                }
            }
            TxnKind::AssetCreate(_) => {}
            TxnKind::AssetTransfer(t) => {
                push(t.receiver);
                if let Some(close) = t.close_to {
                    push(close);
                }
            }
        }
        touched
    }

    pub fn encoded_len(&self) -> Result<usize, LedgerError> {
        Ok(bincode::serialized_size(self)? as usize)
    }

    /// Bytes covered by the signature and the transaction id.
    pub fn signable_message(&self) -> Result<Vec<u8>, LedgerError> {
        let mut message = Vec::new();
        message.extend_from_slice(b"TX");
        message.extend_from_slice(&bincode::serialize(self)?);
        Ok(message)
    }

    pub fn raw_id(&self) -> Result<[u8; 32], LedgerError> {
        Ok(Sha256::digest(self.signable_message()?).into())
    }

    pub fn id(&self) -> Result<TxId, LedgerError> {
        Ok(hex::encode(self.raw_id()?))
    }
}

/// Computes the id binding `txns` into one atomic group. Any group field
/// already present on the inputs is ignored.
pub fn compute_group_id(txns: &[Transaction]) -> Result<GroupId, LedgerError> {
    let mut hasher = Sha256::new();
    hasher.update(b"TG");
    for txn in txns {
        let mut bare = txn.clone();
        bare.header.group = None;
        hasher.update(bare.raw_id()?);
    }
    Ok(hasher.finalize().into())
}

/// Stamps the computed group id onto every transaction.
pub fn assign_group_id(txns: &mut [Transaction]) -> Result<GroupId, LedgerError> {
    let group = compute_group_id(txns)?;
    for txn in txns.iter_mut() {
        txn.header.group = Some(group);
    }
    Ok(group)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub txn: Transaction,
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
}

impl SignedTransaction {
    pub fn id(&self) -> Result<TxId, LedgerError> {
        self.txn.id()
    }
}

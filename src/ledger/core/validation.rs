use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::transaction::{compute_group_id, SignedTransaction, TxId};
use std::collections::{HashMap, HashSet};

use super::chain::ConfirmedTxn;

/// What a group is checked against before any state is touched.
pub struct GroupContext<'a> {
    pub rules: &'a LedgerConfig,
    pub genesis_id: &'a str,
    pub genesis_hash: &'a [u8; 32],
    /// Round the group would be committed in
    pub round: u64,
    pub confirmed: &'a HashMap<TxId, ConfirmedTxn>,
}

/// Stateless and history checks for a whole group: size, group id binding,
/// per-transaction well-formedness, validity window, replay and signatures.
pub fn validate_group(group: &[SignedTransaction], ctx: &GroupContext) -> Result<Vec<TxId>, LedgerError> {
    if group.is_empty() {
        return Err(LedgerError::GroupError("empty transaction group".to_string()));
    }
    if group.len() > ctx.rules.max_group_size {
        return Err(LedgerError::GroupError(format!(
            "group of {} transactions exceeds limit of {}",
            group.len(),
            ctx.rules.max_group_size
        )));
    }

    if group.len() > 1 {
        let txns: Vec<_> = group.iter().map(|stx| stx.txn.clone()).collect();
        let expected_group = compute_group_id(&txns)?;
        for (i, stx) in group.iter().enumerate() {
            if stx.txn.header.group != Some(expected_group) {
                return Err(LedgerError::GroupError(format!(
                    "transaction {} does not carry the group id of its group",
                    i
                )));
            }
        }
    } else if group[0].txn.header.group.is_some() {
        return Err(LedgerError::GroupError(
            "a lone transaction must not carry a group id".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(group.len());
    for stx in group {
        let txid = stx.id()?;
        check_transaction(stx, &txid, ctx).map_err(|cause| LedgerError::Rejected {
            txid: txid.clone(),
            cause: Box::new(cause),
        })?;
        if !seen.insert(txid.clone()) {
            return Err(LedgerError::DuplicateTransaction(txid));
        }
        ids.push(txid);
    }
    Ok(ids)
}

fn check_transaction(stx: &SignedTransaction, txid: &TxId, ctx: &GroupContext) -> Result<(), LedgerError> {
    let header = &stx.txn.header;
    stx.txn.validate(ctx.rules)?;

    if header.genesis_id != ctx.genesis_id || &header.genesis_hash != ctx.genesis_hash {
        return Err(LedgerError::InvalidTransaction(format!(
            "transaction is for network {} but this ledger is {}",
            header.genesis_id, ctx.genesis_id
        )));
    }

    if ctx.round < header.first_valid || ctx.round > header.last_valid {
        return Err(LedgerError::InvalidTransaction(format!(
            "txn dead: round {} outside of {}--{}",
            ctx.round, header.first_valid, header.last_valid
        )));
    }

    if ctx.confirmed.contains_key(txid) {
        return Err(LedgerError::DuplicateTransaction(txid.clone()));
    }

    stx.verify()
}

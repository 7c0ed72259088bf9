// Thin re-export module: the implementation lives in `ledger/core.rs`, split
// into chain bookkeeping, account state and group validation.

pub mod core;
pub use self::core::*;

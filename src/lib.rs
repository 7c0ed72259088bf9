//! ASA walkthrough - mint a fungible asset on a local development ledger and
//! walk it through opt-in, transfer, atomic buy-back and close-out.
//!
//! # Architecture
//!
//! ## Ledger
//! - [`transaction`] - Transaction intents, group ids and stateless checks
//! - [`ledger`] - Account state, minimum balance rules and rounds
//!
//! ## Cryptography
//! - [`crypto`] - Signatures and verification (secp256k1)
//! - [`account`] - Local identities and transaction signers
//!
//! ## Client
//! - [`client`] - The `LedgerClient` contract
//! - [`localnet`] - In-process development network
//! - [`composer`] - Atomic transaction groups
//! - [`dispenser`] - Funding source discovery
//!
//! ## Workflow
//! - [`walkthrough`] - The thirteen-step asset scenario
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`logging`] - Console logging

#![forbid(unsafe_code)]

// ============================================================================
// Ledger
// ============================================================================
pub mod ledger;
pub mod transaction;

// ============================================================================
// Cryptography
// ============================================================================
pub mod account;
pub mod crypto;

// ============================================================================
// Client
// ============================================================================
pub mod client;
pub mod composer;
pub mod dispenser;
pub mod localnet;

// ============================================================================
// Workflow
// ============================================================================
pub mod walkthrough;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
pub mod logging;

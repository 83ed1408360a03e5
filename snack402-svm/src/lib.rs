#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana signers for x402 payments.
//!
//! The Solana `exact` scheme pays with a partially signed transaction: an SPL
//! `transferChecked` of the required amount from the payer's associated token
//! account to the payee's, with the server-designated fee payer left to
//! co-sign and submit it.
//!
//! - [`SolanaSigner`] - a local keypair, with an RPC connection for mint data,
//!   blockhashes and compute estimates
//!
//! # Feature Flags
//!
//! - `client` - Transaction building and signing with the Solana client crates
//! - `telemetry` - Tracing instrumentation

pub mod exact;
pub mod networks;

#[cfg(feature = "client")]
pub mod rpc;

pub use networks::*;

#[cfg(feature = "client")]
pub use exact::client::{SolanaSigner, keypair_from_base58};

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EVM signers for x402 payments.
//!
//! Every signer here authorizes the `exact` scheme: an ERC-3009
//! `transferWithAuthorization` of the required amount to the payee, signed as
//! EIP-712 typed data. They differ only in where the key lives.
//!
//! - [`EvmSigner`] - a local private key
//! - [`remote::RemoteEvmSigner`] - a wallet provider that signs on request and is polled for the result
//!
//! # Feature Flags
//!
//! - `client` - Local key signing with `alloy-signer-local`
//! - `remote` - Remote signing over HTTP with `reqwest`
//! - `telemetry` - Tracing instrumentation

pub mod exact;
pub mod networks;

#[cfg(feature = "remote")]
pub mod remote;

pub use networks::*;

#[cfg(feature = "client")]
pub use exact::client::{EvmSigner, SignerLike};

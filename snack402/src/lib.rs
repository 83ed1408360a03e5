#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for paying HTTP 402 challenges with the x402 protocol.
//!
//! A server that wants to be paid answers a request with `402 Payment Required`
//! and a JSON body listing the payment options it accepts. The client picks one
//! option, asks a [`SigningCapability`](signer::SigningCapability) to authorize
//! it, and retries the request with the encoded authorization attached.
//!
//! This crate is transport-agnostic: it defines the wire types, the selection
//! policies and the signing abstraction. The HTTP flow lives in `snack402-http`
//! and EVM signers in `snack402-evm`.
//!
//! # Modules
//!
//! - [`amount`] - Human-readable amounts and token unit conversion
//! - [`chain`] - CAIP-2 chain identifiers and network name resolution
//! - [`encoding`] - Base64 helpers for header payloads
//! - [`error`] - Challenge and signing errors
//! - [`networks`] - Well-known network names
//! - [`polling`] - Fixed-interval polling for remote signing services
//! - [`proto`] - Wire format types
//! - [`selector`] - Requirement selection policies
//! - [`signer`] - The signing capability trait and signer combinators
//! - [`timestamp`] - Unix timestamps for authorization windows
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod amount;
pub mod chain;
pub mod encoding;
pub mod error;
pub mod networks;
pub mod polling;
pub mod proto;
pub mod selector;
pub mod signer;
pub mod timestamp;

pub use error::{ChallengeError, SigningError};
pub use proto::{PaymentAuthorization, PaymentChallenge, PaymentReceipt, PaymentRequirements};
pub use selector::{FirstCompatible, PaymentSelector};
pub use signer::SigningCapability;

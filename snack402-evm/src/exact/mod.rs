//! The EVM `exact` scheme: ERC-3009 `transferWithAuthorization` signed with EIP-712.

pub mod eip3009;
pub mod types;

#[cfg(feature = "client")]
pub mod client;

pub use eip3009::Eip3009SigningParams;
pub use types::{Eip3009Authorization, ExactEvmPayload, TransferWithAuthorization};

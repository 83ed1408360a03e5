//! The Solana `exact` scheme: a fee-payer-sponsored SPL `transferChecked`.

pub mod types;

#[cfg(feature = "client")]
pub mod client;

pub use types::{ATA_PROGRAM_PUBKEY, ExactSolanaPayload, associated_token_address, fee_payer};

#[cfg(feature = "client")]
pub use types::TransactionInt;

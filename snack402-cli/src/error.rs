//! Errors that end a run with exit code 1.

use alloy_primitives::Address;
use reqwest::StatusCode;
use snack402::amount::MoneyAmount;
use snack402_evm::remote::RemoteServiceError;
use snack402_http::ClientError;
use snack402_http::snack::SnackRequestError;
use snack402_http::thirdweb::ProxyError;

use crate::config::ConfigError;

/// Why a run failed.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The payment flow failed.
    #[error("payment failed: {0}")]
    Payment(#[from] ClientError),

    /// The Snack Money request could not be built.
    #[error(transparent)]
    Request(#[from] SnackRequestError),

    /// The wallet service failed outside of signing.
    #[error("wallet service error: {0}")]
    WalletService(#[from] RemoteServiceError),

    /// The thirdweb proxy could not be reached.
    #[error("thirdweb proxy error: {0}")]
    Proxy(#[from] ProxyError),

    /// The HTTP client could not be built.
    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// The wallet service account is not the configured `WALLET_ADDRESS`.
    #[error("wallet address mismatch: expected {expected}, service returned {actual}")]
    AddressMismatch {
        /// `WALLET_ADDRESS`.
        expected: Address,
        /// Address of the service account.
        actual: Address,
    },

    /// The wallet holds less USDC than the payment.
    #[error("insufficient balance: {balance} USDC available, {required} USDC needed")]
    InsufficientBalance {
        /// Current balance.
        balance: MoneyAmount,
        /// Payment amount.
        required: MoneyAmount,
    },

    /// The proxy could not pay the challenge.
    #[error("thirdweb proxy answered 402 Payment Required")]
    ProxyPaymentRequired,

    /// The proxy answered with an unexpected status.
    #[error("thirdweb proxy answered {status}: {body}")]
    ProxyFailed {
        /// Response status.
        status: StatusCode,
        /// Response body.
        body: String,
    },
}

//! Error types shared by every payment flow.

use std::error::Error as StdError;

/// Boxed error used to carry causes from external collaborators.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A `402 Payment Required` body could not be turned into a usable challenge.
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    /// The body is not JSON, or a requirement lacks a required field.
    #[error("402 body is not a valid payment challenge: {0}")]
    Json(#[from] serde_json::Error),

    /// The `accepts` list is empty.
    #[error("402 challenge offers no payment requirements")]
    NoRequirements,

    /// A requirement parsed but violates an invariant.
    #[error("payment requirement #{index} is invalid: {reason}")]
    InvalidRequirement {
        /// Position of the requirement in `accepts`.
        index: usize,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Errors produced while authorizing a payment requirement.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The signer has no key or account for this network.
    #[error("network '{0}' is not supported by this signer")]
    UnsupportedNetwork(String),

    /// The requirement cannot be expressed for this signer (bad address, amount, ...).
    #[error("payment requirements cannot be signed: {0}")]
    InvalidRequirements(String),

    /// The local signer failed.
    #[error("signer failed: {0}")]
    Signer(#[source] BoxError),

    /// Talking to a remote signing service failed.
    #[error("signing service request failed: {0}")]
    Service(#[source] BoxError),

    /// The remote signing service reported the request as failed.
    #[error("remote signing rejected: {0}")]
    Rejected(String),

    /// The remote signing service never produced a signature.
    #[error("remote signing did not complete after {attempts} attempts")]
    Timeout {
        /// Number of status polls performed.
        attempts: u32,
    },
}

impl SigningError {
    /// Wraps a local signer failure.
    pub fn signer<E: Into<BoxError>>(err: E) -> Self {
        Self::Signer(err.into())
    }

    /// Wraps a remote service failure.
    pub fn service<E: Into<BoxError>>(err: E) -> Self {
        Self::Service(err.into())
    }
}

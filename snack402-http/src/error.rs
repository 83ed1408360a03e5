//! Error types for the HTTP layer.

use snack402::{ChallengeError, SigningError};

/// Errors that can occur during HTTP header encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Base64 decoding failed.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The encoded value cannot be carried in an HTTP header.
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
}

/// Errors returned by [`PaymentClient`](crate::client::PaymentClient) and
/// [`X402Middleware`](crate::middleware::X402Middleware).
///
/// A call fails with at most one of these; an authorization is never sent
/// after any of them.
#[cfg(feature = "client")]
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network, DNS, TLS or timeout failure. Never retried.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    /// The 402 body is not a usable payment challenge.
    #[error(transparent)]
    MalformedChallenge(#[from] ChallengeError),

    /// No offered requirement is supported by the signer and accepted by the selector.
    #[error("no compatible payment requirement (server offered: {})", .offered.join(", "))]
    NoCompatibleRequirement {
        /// Networks the server offered, in order.
        offered: Vec<String>,
    },

    /// The signer failed to authorize the selected requirement.
    #[error("signing failed: {0}")]
    SigningFailed(#[source] SigningError),

    /// A remote signing service reported the request as failed.
    #[error("remote signing rejected: {0}")]
    RemoteSigningRejected(String),

    /// A remote signing service did not finish in time.
    #[error("remote signing timed out after {attempts} attempts")]
    RemoteSigningTimeout {
        /// Number of status polls performed.
        attempts: u32,
    },

    /// The request body is a stream and cannot be sent a second time.
    #[error("request body cannot be cloned for the paid retry")]
    RequestNotCloneable,

    /// The authorization could not be encoded into the `X-PAYMENT` header.
    #[error("cannot encode payment header: {0}")]
    InvalidHeader(#[from] HttpError),

    /// The final response has a non-success status.
    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus {
        /// Status of the final response.
        status: http::StatusCode,
        /// Response body text.
        body: String,
    },
}

#[cfg(feature = "client")]
impl From<SigningError> for ClientError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::Rejected(reason) => Self::RemoteSigningRejected(reason),
            SigningError::Timeout { attempts } => Self::RemoteSigningTimeout { attempts },
            other => Self::SigningFailed(other),
        }
    }
}

#[cfg(feature = "client")]
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.into())
    }
}

#[cfg(all(test, feature = "client"))]
mod tests {
    use super::*;

    #[test]
    fn test_remote_signing_errors_get_dedicated_variants() {
        let rejected = ClientError::from(SigningError::Rejected("denied".into()));
        assert!(matches!(rejected, ClientError::RemoteSigningRejected(ref r) if r == "denied"));

        let timeout = ClientError::from(SigningError::Timeout { attempts: 20 });
        assert!(matches!(timeout, ClientError::RemoteSigningTimeout { attempts: 20 }));

        let other = ClientError::from(SigningError::UnsupportedNetwork("solana".into()));
        assert!(matches!(other, ClientError::SigningFailed(_)));
        assert!(std::error::Error::source(&other).is_some());
    }

    #[test]
    fn test_no_compatible_lists_offered_networks() {
        let err = ClientError::NoCompatibleRequirement {
            offered: vec!["solana".into(), "base".into()],
        };
        assert_eq!(
            err.to_string(),
            "no compatible payment requirement (server offered: solana, base)"
        );
    }
}

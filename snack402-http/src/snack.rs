//! Snack Money `POST /payments/x/pay`: send USDC to a user by their X handle.
//!
//! The endpoint answers the first call with a 402 challenge; pay it with
//! [`PaymentClient`](crate::client::PaymentClient).

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use snack402::amount::MoneyAmount;
use url::Url;

use crate::constants::{DEFAULT_SNACK_MONEY_URL, X_PAY_PATH};

/// Currency every Snack Money payment is denominated in.
pub const USDC: &str = "USDC";

/// Description sent when the caller does not set one.
pub const DEFAULT_DESCRIPTION: &str = "Payment via snack402";

/// Errors building a Snack Money request.
#[derive(Debug, thiserror::Error)]
pub enum SnackRequestError {
    /// The receiver handle is empty.
    #[error("receiver handle is empty")]
    EmptyReceiver,
    /// The base URL cannot be extended with the endpoint path.
    #[error("invalid Snack Money URL: {0}")]
    Url(#[from] url::ParseError),
    /// The body could not be serialized.
    #[error("cannot serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// JSON body of `POST /payments/x/pay`.
///
/// `amount` is in human units and goes over the wire as a JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XPayRequest {
    /// Amount to send, e.g. `0.01`.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// X handle of the recipient, without the leading `@`.
    pub receiver: String,
    /// Free-form note shown to the recipient.
    pub description: String,
}

impl XPayRequest {
    /// A USDC payment of `amount` to `receiver`.
    ///
    /// A leading `@` on the handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SnackRequestError::EmptyReceiver`] if the handle is blank.
    pub fn new(amount: MoneyAmount, receiver: &str) -> Result<Self, SnackRequestError> {
        let receiver = receiver.trim().trim_start_matches('@');
        if receiver.is_empty() {
            return Err(SnackRequestError::EmptyReceiver);
        }
        Ok(Self {
            amount: amount.as_decimal(),
            currency: USDC.to_owned(),
            receiver: receiver.to_owned(),
            description: DEFAULT_DESCRIPTION.to_owned(),
        })
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Location of the Snack Money API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnackMoneyApi {
    base_url: Url,
}

impl Default for SnackMoneyApi {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SNACK_MONEY_URL
                .parse()
                .expect("default Snack Money URL is valid"),
        }
    }
}

impl SnackMoneyApi {
    /// Uses a custom base URL, e.g. a staging deployment.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// The configured base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base_url}/payments/x/pay`, keeping any path prefix of the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if the joined URL is invalid.
    pub fn pay_url(&self) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}{X_PAY_PATH}").parse()
    }

    /// Builds the (cloneable) `POST` request carrying `body`.
    ///
    /// # Errors
    ///
    /// Returns [`SnackRequestError`] if the URL or body cannot be built.
    pub fn pay_request(&self, body: &XPayRequest) -> Result<Request, SnackRequestError> {
        let mut request = Request::new(Method::POST, self.pay_url()?);
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *request.body_mut() = Some(serde_json::to_vec(body)?.into());
        Ok(request)
    }
}

/// The receipt link inside a successful response body (`data.receipt`).
#[must_use]
pub fn receipt_url(body: &serde_json::Value) -> Option<&str> {
    body.pointer("/data/receipt")?.as_str()
}

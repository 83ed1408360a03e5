//! Paying `402 Payment Required` challenges.
//!
//! [`PaymentClient`] sends a request; if the server answers 402 it reads the
//! challenge, lets a [`SigningCapability`] authorize one requirement, and sends
//! the request again with the `X-PAYMENT` header. Exactly one paid retry is
//! made, whatever its outcome.
//!
//! The challenge-to-authorization step lives in [`PaymentHandler`] so the
//! `reqwest-middleware` layer in [`middleware`](crate::middleware) shares it.

use std::sync::Arc;

use reqwest::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use snack402::selector::{self, FirstCompatible, PaymentSelector};
use snack402::signer::SigningCapability;
use snack402::{PaymentAuthorization, PaymentChallenge, PaymentReceipt};
#[cfg(feature = "telemetry")]
use tracing::{debug, info, instrument, trace};

use crate::constants::X_PAYMENT_HEADER;
use crate::error::ClientError;
use crate::headers;
use crate::transport::Transport;

/// Turns a 402 challenge into a paid retry request.
///
/// Holds the signer and the selection policy. Cheap to clone.
#[derive(Clone)]
#[allow(missing_debug_implementations)] // dyn trait objects do not implement Debug
pub struct PaymentHandler {
    signer: Arc<dyn SigningCapability>,
    selector: Arc<dyn PaymentSelector>,
}

impl PaymentHandler {
    /// Creates a handler that pays the first requirement `signer` supports.
    pub fn new<S: SigningCapability + 'static>(signer: S) -> Self {
        Self {
            signer: Arc::new(signer),
            selector: Arc::new(FirstCompatible),
        }
    }

    /// Sets a custom payment selector.
    ///
    /// By default, [`FirstCompatible`] is used.
    #[must_use]
    pub fn with_selector<P: PaymentSelector + 'static>(mut self, selector: P) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    /// The signing capability payments are authorized with.
    #[must_use]
    pub fn signer(&self) -> &dyn SigningCapability {
        self.signer.as_ref()
    }

    /// Pays the challenge in `body` by signing a requirement and attaching
    /// the authorization to `retry`.
    ///
    /// `retry` is a clone of the request that was answered with 402, or `None`
    /// if it could not be cloned. The signer is never called in that case.
    ///
    /// # Errors
    ///
    /// - [`ClientError::MalformedChallenge`] if `body` is not a valid challenge
    /// - [`ClientError::NoCompatibleRequirement`] if nothing can be paid
    /// - [`ClientError::RequestNotCloneable`] if `retry` is `None`
    /// - [`ClientError::SigningFailed`], [`ClientError::RemoteSigningRejected`]
    ///   or [`ClientError::RemoteSigningTimeout`] if the signer fails
    /// - [`ClientError::InvalidHeader`] if the authorization cannot be encoded
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "snack402.http.pay_challenge", skip_all, err)
    )]
    pub async fn pay_challenge(
        &self,
        body: &[u8],
        retry: Option<Request>,
    ) -> Result<(Request, PaymentAuthorization), ClientError> {
        let challenge = PaymentChallenge::from_slice(body)?;
        let selected = selector::select(&challenge, self.signer.as_ref(), self.selector.as_ref())
            .ok_or_else(|| ClientError::NoCompatibleRequirement {
                offered: challenge.networks().into_iter().map(str::to_owned).collect(),
            })?;

        #[cfg(feature = "telemetry")]
        debug!(
            network = %selected.network,
            amount = %selected.max_amount_required,
            pay_to = %selected.pay_to,
            "Selected payment requirement"
        );

        let mut retry = retry.ok_or(ClientError::RequestNotCloneable)?;
        let authorization = self.signer.authorize(selected).await?;
        let value = headers::x_payment_header_value(&authorization)?;
        retry.headers_mut().insert(X_PAYMENT_HEADER, value);
        Ok((retry, authorization))
    }
}

/// The outcome of [`PaymentClient::send`].
#[derive(Debug)]
pub struct PaidResponse {
    /// The final response: the first one if no payment was required,
    /// otherwise the answer to the paid retry.
    pub response: Response,
    /// The authorization that was sent, if a payment was made.
    pub authorization: Option<PaymentAuthorization>,
    /// Settlement receipt decoded from the response headers, if readable.
    pub receipt: Option<PaymentReceipt>,
}

impl PaidResponse {
    fn unpaid(response: Response) -> Self {
        Self {
            response,
            authorization: None,
            receipt: None,
        }
    }

    /// Status of the final response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Whether a payment authorization was sent.
    #[must_use]
    pub const fn was_paid(&self) -> bool {
        self.authorization.is_some()
    }

    /// Fails with [`ClientError::UnexpectedStatus`] unless the final status is
    /// a success.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnexpectedStatus`] carrying the body text, or
    /// [`ClientError::Transport`] if the body cannot be read.
    pub async fn error_for_status(self) -> Result<Self, ClientError> {
        let status = self.response.status();
        if status.is_success() {
            return Ok(self);
        }
        let body = self.response.text().await?;
        Err(ClientError::UnexpectedStatus { status, body })
    }

    /// Reads the final response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the body cannot be read or parsed.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        Ok(self.response.json().await?)
    }

    /// Returns the final response.
    #[must_use]
    pub fn into_response(self) -> Response {
        self.response
    }
}

/// An HTTP client that pays x402 challenges.
///
/// Issues requests through a [`Transport`] (a plain [`reqwest::Client`] by
/// default) and handles at most one 402 per request.
#[allow(missing_debug_implementations)] // PaymentHandler holds dyn trait objects
pub struct PaymentClient<T = reqwest::Client> {
    transport: T,
    handler: PaymentHandler,
}

impl<T: Transport> PaymentClient<T> {
    /// Creates a client paying with `signer` and the default selector.
    pub fn new<S: SigningCapability + 'static>(transport: T, signer: S) -> Self {
        Self::with_handler(transport, PaymentHandler::new(signer))
    }

    /// Creates a client from a configured [`PaymentHandler`].
    pub const fn with_handler(transport: T, handler: PaymentHandler) -> Self {
        Self { transport, handler }
    }

    /// Sets a custom payment selector.
    #[must_use]
    pub fn with_selector<P: PaymentSelector + 'static>(mut self, selector: P) -> Self {
        self.handler = self.handler.with_selector(selector);
        self
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The payment handler.
    pub const fn handler(&self) -> &PaymentHandler {
        &self.handler
    }

    /// Sends `request`, paying a 402 challenge if one comes back.
    ///
    /// Any status other than 402 is returned as-is without touching the
    /// signer. After a payment, the retry's response is returned whatever
    /// its status.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the transport fails, the challenge cannot be
    /// paid, or signing fails. No retry is sent after an error.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "snack402.http.send", skip_all, fields(url = %request.url()), err)
    )]
    pub async fn send(&self, request: Request) -> Result<PaidResponse, ClientError> {
        let retry = request.try_clone();
        let response = self.transport.issue(request).await?;

        if response.status() != StatusCode::PAYMENT_REQUIRED {
            #[cfg(feature = "telemetry")]
            trace!(status = ?response.status(), "No payment required, returning response");
            return Ok(PaidResponse::unpaid(response));
        }

        #[cfg(feature = "telemetry")]
        info!(url = %response.url(), "Received 402 Payment Required, processing payment");

        let body = response.bytes().await?;
        let (retry, authorization) = self.handler.pay_challenge(&body, retry).await?;

        #[cfg(feature = "telemetry")]
        trace!(url = %retry.url(), "Retrying request with payment header");

        let response = self.transport.issue(retry).await?;
        let receipt = headers::receipt_from_headers(response.headers());

        #[cfg(feature = "telemetry")]
        info!(
            status = %response.status(),
            settled = receipt.as_ref().is_some_and(|r| r.success),
            "Paid request completed"
        );

        Ok(PaidResponse {
            response,
            authorization: Some(authorization),
            receipt,
        })
    }
}

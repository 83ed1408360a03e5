//! Reqwest middleware for automatic x402 payment handling.
//!
//! [`X402Middleware`] runs the same flow as
//! [`PaymentClient`](crate::client::PaymentClient) inside a
//! [`reqwest_middleware::ClientWithMiddleware`], so existing reqwest call
//! sites pay transparently:
//!
//! ```no_run
//! # fn build(signer: impl snack402::SigningCapability + 'static) {
//! use snack402_http::client::PaymentHandler;
//! use snack402_http::{ReqwestWithPayments, ReqwestWithPaymentsBuild};
//!
//! let client = reqwest::Client::new()
//!     .with_payments(PaymentHandler::new(signer))
//!     .build();
//! # }
//! ```
//!
//! Failures surface as [`reqwest_middleware::Error::Middleware`] wrapping a
//! [`ClientError`].

use http::{Extensions, StatusCode};
use reqwest::{Client, ClientBuilder, Request, Response};
use reqwest_middleware as rqm;
#[cfg(feature = "telemetry")]
use tracing::{info, instrument, trace};

use crate::client::PaymentHandler;
use crate::error::ClientError;

/// Middleware that pays `402 Payment Required` responses and retries once.
#[derive(Clone)]
#[allow(missing_debug_implementations)] // PaymentHandler holds dyn trait objects
pub struct X402Middleware {
    handler: PaymentHandler,
}

impl X402Middleware {
    /// Wraps a payment handler.
    #[must_use]
    pub const fn new(handler: PaymentHandler) -> Self {
        Self { handler }
    }
}

impl From<PaymentHandler> for X402Middleware {
    fn from(handler: PaymentHandler) -> Self {
        Self::new(handler)
    }
}

/// Runs the next middleware or HTTP client with optional telemetry instrumentation.
#[cfg_attr(
    feature = "telemetry",
    instrument(name = "snack402.reqwest.next", skip_all)
)]
async fn run_next(
    next: rqm::Next<'_>,
    req: Request,
    extensions: &mut Extensions,
) -> rqm::Result<Response> {
    next.run(req, extensions).await
}

fn middleware_error(err: ClientError) -> rqm::Error {
    rqm::Error::Middleware(err.into())
}

#[async_trait::async_trait]
impl rqm::Middleware for X402Middleware {
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "snack402.reqwest.handle", skip_all, err)
    )]
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: rqm::Next<'_>,
    ) -> rqm::Result<Response> {
        let retry_req = req.try_clone();
        let res = run_next(next.clone(), req, extensions).await?;

        if res.status() != StatusCode::PAYMENT_REQUIRED {
            #[cfg(feature = "telemetry")]
            trace!(status = ?res.status(), "No payment required, returning response");
            return Ok(res);
        }

        #[cfg(feature = "telemetry")]
        info!(url = %res.url(), "Received 402 Payment Required, processing payment");

        let body = res.bytes().await?;
        let (retry, _authorization) = self
            .handler
            .pay_challenge(&body, retry_req)
            .await
            .map_err(middleware_error)?;

        #[cfg(feature = "telemetry")]
        trace!(url = %retry.url(), "Retrying request with payment header");

        run_next(next, retry, extensions).await
    }
}

/// Trait for adding x402 payment handling to reqwest clients.
///
/// Implemented on [`Client`] and [`ClientBuilder`].
pub trait ReqwestWithPayments<A> {
    /// Adds the payment middleware to the client or builder.
    fn with_payments(self, handler: PaymentHandler) -> ReqwestWithPaymentsBuilder<A>;
}

impl ReqwestWithPayments<Self> for Client {
    fn with_payments(self, handler: PaymentHandler) -> ReqwestWithPaymentsBuilder<Self> {
        ReqwestWithPaymentsBuilder {
            inner: self,
            middleware: X402Middleware::new(handler),
        }
    }
}

impl ReqwestWithPayments<Self> for ClientBuilder {
    fn with_payments(self, handler: PaymentHandler) -> ReqwestWithPaymentsBuilder<Self> {
        ReqwestWithPaymentsBuilder {
            inner: self,
            middleware: X402Middleware::new(handler),
        }
    }
}

/// Builder for creating a reqwest client with x402 middleware.
#[allow(missing_debug_implementations)] // generic A may not implement Debug
pub struct ReqwestWithPaymentsBuilder<A> {
    inner: A,
    middleware: X402Middleware,
}

/// Trait for building the final client from a [`ReqwestWithPaymentsBuilder`].
pub trait ReqwestWithPaymentsBuild {
    /// The type returned by [`build`](Self::build).
    type BuildResult;
    /// The type returned by [`builder`](Self::builder).
    type BuilderResult;

    /// Builds the client, consuming the builder.
    fn build(self) -> Self::BuildResult;

    /// Returns the underlying middleware client builder with the payment
    /// middleware added, for stacking further middleware.
    fn builder(self) -> Self::BuilderResult;
}

impl ReqwestWithPaymentsBuild for ReqwestWithPaymentsBuilder<Client> {
    type BuildResult = rqm::ClientWithMiddleware;
    type BuilderResult = rqm::ClientBuilder;

    fn build(self) -> Self::BuildResult {
        self.builder().build()
    }

    fn builder(self) -> Self::BuilderResult {
        rqm::ClientBuilder::new(self.inner).with(self.middleware)
    }
}

impl ReqwestWithPaymentsBuild for ReqwestWithPaymentsBuilder<ClientBuilder> {
    type BuildResult = Result<rqm::ClientWithMiddleware, reqwest::Error>;
    type BuilderResult = Result<rqm::ClientBuilder, reqwest::Error>;

    fn build(self) -> Self::BuildResult {
        let builder = self.builder()?;
        Ok(builder.build())
    }

    fn builder(self) -> Self::BuilderResult {
        let client = self.inner.build()?;
        Ok(rqm::ClientBuilder::new(client).with(self.middleware))
    }
}

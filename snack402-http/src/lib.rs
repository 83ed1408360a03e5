#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP side of the x402 payment flow.
//!
//! Provides header encoding/decoding and constants, plus (feature `client`) a
//! challenge-paying client for `reqwest`.
//!
//! # Modules
//!
//! - [`constants`] - HTTP header names and default URLs
//! - [`headers`] - Base64 encoding/decoding for x402 HTTP headers
//! - [`error`] - Header codec and client errors
//! - [`transport`] - The request transport seam (feature: `client`)
//! - [`client`] - [`PaymentClient`](client::PaymentClient): pay one 402 challenge per request (feature: `client`)
//! - [`middleware`] - The same flow as a `reqwest-middleware` layer (feature: `client`)
//! - [`snack`] - Snack Money `POST /payments/x/pay` requests (feature: `client`)
//! - [`thirdweb`] - Payments delegated to a wallet-as-a-service proxy (feature: `client`)
//!
//! # Example
//!
//! ```no_run
//! # async fn pay(signer: impl snack402::SigningCapability + 'static) -> Result<(), Box<dyn std::error::Error>> {
//! use snack402::amount::MoneyAmount;
//! use snack402_http::client::PaymentClient;
//! use snack402_http::snack::{SnackMoneyApi, XPayRequest};
//!
//! let api = SnackMoneyApi::default();
//! let body = XPayRequest::new(MoneyAmount::parse_positive("0.01")?, "jack")?;
//! let client = PaymentClient::new(reqwest::Client::new(), signer);
//! let paid = client.send(api.pay_request(&body)?).await?.error_for_status().await?;
//! println!("{:?}", paid.receipt);
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod headers;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "client")]
pub mod middleware;
#[cfg(feature = "client")]
pub mod snack;
#[cfg(feature = "client")]
pub mod thirdweb;
#[cfg(feature = "client")]
pub mod transport;

#[cfg(feature = "client")]
pub use client::{PaidResponse, PaymentClient};
#[cfg(feature = "client")]
pub use error::ClientError;
pub use error::HttpError;
#[cfg(feature = "client")]
pub use middleware::{ReqwestWithPayments, ReqwestWithPaymentsBuild, X402Middleware};

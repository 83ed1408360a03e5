//! Payments delegated to thirdweb's x402 fetch proxy.
//!
//! Instead of signing locally, the request is handed to
//! `POST {proxy}/v1/payments/x402/fetch`, which calls the target URL, pays any
//! 402 from a server wallet, and relays the final response. This client only
//! reports what came back. If the proxy itself answers 402 (e.g. the wallet
//! cannot pay), the challenge is returned so its first requirement can be
//! shown to the user.

use std::fmt::{self, Display, Formatter};

use reqwest::header::HeaderValue;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use snack402::amount::{USDC_DECIMALS, format_units};
use snack402::proto::TokenAmount;
use snack402::{ChallengeError, PaymentChallenge, PaymentRequirements};
#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};
use url::Url;

use crate::constants::DEFAULT_THIRDWEB_URL;

/// Header carrying the thirdweb secret key.
pub const SECRET_KEY_HEADER: &str = "x-secret-key";

/// Path of the proxy endpoint, relative to the API base.
pub const FETCH_PATH: &str = "v1/payments/x402/fetch";

/// Errors talking to the proxy.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The secret key cannot be sent as a header value.
    #[error("secret key is not a valid header value: {0}")]
    InvalidSecretKey(#[from] reqwest::header::InvalidHeaderValue),
    /// URL construction failed.
    #[error("invalid proxy URL: {0}")]
    Url(#[from] url::ParseError),
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The proxy answered 402 with a body that is not a payment challenge.
    #[error(transparent)]
    MalformedChallenge(#[from] ChallengeError),
}

/// What the proxy answered.
#[derive(Debug)]
pub enum ProxyOutcome {
    /// 2xx: the target was called and paid.
    Paid {
        /// Final status.
        status: StatusCode,
        /// Response body, as JSON if it parses, otherwise as a JSON string.
        body: serde_json::Value,
    },
    /// 402: the payment could not be made by the proxy.
    PaymentRequired {
        /// The challenge relayed by the proxy.
        challenge: PaymentChallenge,
    },
    /// Any other status.
    Failed {
        /// Final status.
        status: StatusCode,
        /// Response body text.
        body: String,
    },
}

/// Client for the x402 fetch proxy, paying from one server wallet.
#[derive(Debug, Clone)]
pub struct ThirdwebProxy {
    client: Client,
    base_url: Url,
    secret_key: HeaderValue,
    from: String,
}

impl ThirdwebProxy {
    /// Creates a proxy client for the wallet `from` at the default API URL.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidSecretKey`] if the key is not a valid
    /// header value.
    pub fn new(client: Client, secret_key: &str, from: impl Into<String>) -> Result<Self, ProxyError> {
        let base_url: Url = DEFAULT_THIRDWEB_URL.parse()?;
        Self::with_base_url(client, base_url, secret_key, from)
    }

    /// Like [`new`](Self::new) with a custom API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidSecretKey`] if the key is not a valid
    /// header value.
    pub fn with_base_url(
        client: Client,
        mut base_url: Url,
        secret_key: &str,
        from: impl Into<String>,
    ) -> Result<Self, ProxyError> {
        let mut secret_key = HeaderValue::from_str(secret_key)?;
        secret_key.set_sensitive(true);
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client,
            base_url,
            secret_key,
            from: from.into(),
        })
    }

    /// The paying wallet address.
    #[must_use]
    pub fn from_address(&self) -> &str {
        &self.from
    }

    /// The proxy URL for one call: target, method and the most the wallet may
    /// pay (`maxValue`, smallest units of `asset`).
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Url`] if the base URL cannot be joined.
    pub fn fetch_url(
        &self,
        target: &Url,
        method: &Method,
        max_value: TokenAmount,
        asset: &str,
    ) -> Result<Url, ProxyError> {
        let mut url = self.base_url.join(FETCH_PATH)?;
        url.query_pairs_mut()
            .append_pair("from", &self.from)
            .append_pair("url", target.as_str())
            .append_pair("method", method.as_str())
            .append_pair("maxValue", &max_value.to_string())
            .append_pair("asset", asset);
        Ok(url)
    }

    /// Asks the proxy to `POST` `body` to `target` and pay for it.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError`] on transport failure or an unreadable 402 body.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "snack402.thirdweb.fetch", skip_all, fields(target = %target), err)
    )]
    pub async fn fetch<B: Serialize + ?Sized>(
        &self,
        target: &Url,
        body: &B,
        max_value: TokenAmount,
        asset: &str,
    ) -> Result<ProxyOutcome, ProxyError> {
        let url = self.fetch_url(target, &Method::POST, max_value, asset)?;
        let response = self
            .client
            .post(url)
            .header(SECRET_KEY_HEADER, self.secret_key.clone())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        #[cfg(feature = "telemetry")]
        debug!(%status, headers = ?response.headers(), "Proxy responded");
        let text = response.text().await?;

        if status == StatusCode::PAYMENT_REQUIRED {
            let challenge = PaymentChallenge::from_slice(text.as_bytes())?;
            return Ok(ProxyOutcome::PaymentRequired { challenge });
        }
        if status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
            return Ok(ProxyOutcome::Paid { status, body });
        }
        Ok(ProxyOutcome::Failed { status, body: text })
    }
}

/// Human-readable view of one payment requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementSummary {
    /// Amount in human units, or the raw smallest-unit value if it cannot be
    /// converted.
    pub amount: String,
    /// Payee address.
    pub pay_to: String,
    /// Authorization timeout in seconds.
    pub timeout_seconds: u64,
    /// Network name.
    pub network: String,
    /// Asset address.
    pub asset: String,
    /// Asset name from `extra`, `"USDC"` if absent.
    pub asset_name: String,
}

impl From<&PaymentRequirements> for RequirementSummary {
    fn from(requirements: &PaymentRequirements) -> Self {
        let decimals = requirements.decimals().unwrap_or(USDC_DECIMALS);
        let amount = format_units(requirements.max_amount_required, decimals).map_or_else(
            || requirements.max_amount_required.to_string(),
            |a| a.to_string(),
        );
        Self {
            amount,
            pay_to: requirements.pay_to.clone(),
            timeout_seconds: requirements.max_timeout_seconds,
            network: requirements.network.clone(),
            asset: requirements.asset.clone(),
            asset_name: requirements.asset_name().unwrap_or("USDC").to_owned(),
        }
    }
}

impl Display for RequirementSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Amount:  {} {}", self.amount, self.asset_name)?;
        writeln!(f, "Pay to:  {}", self.pay_to)?;
        writeln!(f, "Timeout: {}s", self.timeout_seconds)?;
        writeln!(f, "Network: {}", self.network)?;
        write!(f, "Asset:   {} ({})", self.asset, self.asset_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::challenge;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WALLET: &str = "0x00000000000000000000000000000000000000AA";
    const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

    fn proxy(server: &MockServer) -> ThirdwebProxy {
        ThirdwebProxy::with_base_url(Client::new(), server.uri().parse().unwrap(), "sk_live", WALLET)
            .unwrap()
    }

    fn target() -> Url {
        "https://api.snack.money/payments/x/pay".parse().unwrap()
    }

    #[test]
    fn test_fetch_url_encodes_target() {
        let proxy = ThirdwebProxy::new(Client::new(), "sk", WALLET).unwrap();
        let url = proxy
            .fetch_url(&target(), &Method::POST, TokenAmount::from(1_000_000u64), USDC_BASE)
            .unwrap();
        assert_eq!(url.path(), "/v1/payments/x402/fetch");
        assert!(url.as_str().starts_with("https://api.thirdweb.com/"));
        assert!(
            url.query()
                .unwrap()
                .contains("url=https%3A%2F%2Fapi.snack.money%2Fpayments%2Fx%2Fpay")
        );
    }

    #[tokio::test]
    async fn test_request_shape_and_paid_outcome() {
        let server = MockServer::start().await;
        let body = json!({"amount": 0.01, "currency": "USDC", "receiver": "jack", "description": "d"});
        Mock::given(method("POST"))
            .and(path("/v1/payments/x402/fetch"))
            .and(header(SECRET_KEY_HEADER, "sk_live"))
            .and(query_param("from", WALLET))
            .and(query_param("url", target().as_str()))
            .and(query_param("method", "POST"))
            .and(query_param("maxValue", "1000000"))
            .and(query_param("asset", USDC_BASE))
            .and(body_json(&body))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": "sent"})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = proxy(&server)
            .fetch(&target(), &body, TokenAmount::from(1_000_000u64), USDC_BASE)
            .await
            .unwrap();
        match outcome {
            ProxyOutcome::Paid { status, body } => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(body["msg"], "sent");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_402_reports_first_requirement() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402).set_body_json(challenge(&["base", "polygon"])))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = proxy(&server)
            .fetch(&target(), &json!({}), TokenAmount::from(1_000_000u64), USDC_BASE)
            .await
            .unwrap();
        let ProxyOutcome::PaymentRequired { challenge } = outcome else {
            panic!("expected a 402 outcome");
        };
        let summary = RequirementSummary::from(&challenge.accepts[0]);
        assert_eq!(summary.amount, "0.01");
        assert_eq!(summary.network, "base");
        assert_eq!(summary.timeout_seconds, 60);
        assert_eq!(summary.asset_name, "USD Coin");
        assert!(summary.to_string().contains("Pay to:  0x1111111111111111111111111111111111111111"));
    }

    #[tokio::test]
    async fn test_other_status_is_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid secret key"))
            .mount(&server)
            .await;

        let outcome = proxy(&server)
            .fetch(&target(), &json!({}), TokenAmount::from(1u64), USDC_BASE)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            ProxyOutcome::Failed { status: StatusCode::UNAUTHORIZED, ref body } if body == "invalid secret key"
        ));
    }
}

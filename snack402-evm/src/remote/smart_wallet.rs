//! Smart contract wallets signing through a `signatures` API.
//!
//! The wallet provider exposes:
//!
//! - `POST {base}/wallets/{locator}/signatures` with
//!   `{"type": "evm-typed-data", "params": {"typedData": ..., "chain": "base"}}`,
//!   answering `{"id": ...}`
//! - `GET {base}/wallets/{locator}/signatures/{id}`, answering
//!   `{"status": ..., "outputSignature": ...}`
//!
//! Requests carry the API key in `X-API-KEY`. The returned signature is an
//! EIP-1271 (or EIP-6492, for undeployed wallets) signature of arbitrary length.

use alloy_primitives::{Address, Bytes};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use snack402::SigningError;
use snack402::polling::PollStatus;
use snack402::signer::BoxFuture;
use url::Url;

use super::api::{JsonApi, RemoteServiceError};
use super::{SignatureRequest, SignatureService, parse_signature};

/// Header carrying the wallet provider API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// [`SignatureService`] for a smart contract wallet identified by a locator.
#[derive(Debug, Clone)]
pub struct SmartWalletService {
    api: JsonApi,
    locator: String,
    address: Address,
}

#[derive(Debug, Deserialize)]
struct CreatedSignature {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output_signature: Option<String>,
}

impl SmartWalletService {
    /// Production API base URL.
    pub const DEFAULT_BASE_URL: &str = "https://www.crossmint.com/api/2022-06-09/";

    /// Creates a service for the wallet `locator` whose on-chain address is
    /// `address`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError::InvalidApiKey`] if the API key is not a
    /// valid header value.
    pub fn new(
        client: Client,
        base_url: &Url,
        api_key: &str,
        locator: impl Into<String>,
        address: Address,
    ) -> Result<Self, RemoteServiceError> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(api_key)?;
        value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, value);
        Ok(Self {
            api: JsonApi::new(client, base_url, headers),
            locator: locator.into(),
            address,
        })
    }

    /// The wallet locator.
    #[must_use]
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// The API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        self.api.base_url()
    }

    async fn create(&self, request: &SignatureRequest) -> Result<String, RemoteServiceError> {
        let body = json!({
            "type": "evm-typed-data",
            "params": {
                "typedData": request.typed_data,
                "chain": request.network_name(),
            }
        });
        let path = format!("wallets/{}/signatures", self.locator);
        let created: CreatedSignature = self
            .api
            .post_json(&path, "POST /wallets/{locator}/signatures", &body)
            .await?;
        Ok(created.id)
    }

    async fn fetch(&self, id: &str) -> Result<PollStatus<Bytes>, SigningError> {
        let path = format!("wallets/{}/signatures/{id}", self.locator);
        let status: SignatureStatus = self
            .api
            .get_json(&path, "GET /wallets/{locator}/signatures/{id}")
            .await
            .map_err(SigningError::service)?;
        if let Some(signature) = status.output_signature.as_deref() {
            return parse_signature(signature).map(PollStatus::Ready);
        }
        match status.status.as_deref() {
            Some("failed") => Ok(PollStatus::Failed(format!("signature {id} failed"))),
            _ => Ok(PollStatus::Pending),
        }
    }
}

impl SignatureService for SmartWalletService {
    fn address(&self) -> Address {
        self.address
    }

    fn submit<'a>(
        &'a self,
        request: &'a SignatureRequest,
    ) -> BoxFuture<'a, Result<String, SigningError>> {
        Box::pin(async move { self.create(request).await.map_err(SigningError::service) })
    }

    fn status<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<PollStatus<Bytes>, SigningError>> {
        Box::pin(self.fetch(id))
    }
}

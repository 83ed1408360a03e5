//! Custodial (MPC) wallet accounts behind a bearer-authenticated REST API.
//!
//! This is a small, provider-neutral contract, not the native API of any one
//! custodian. Point `CUSTODIAL_API_URL` at a service that speaks it, usually a
//! thin adapter in front of the provider SDK that holds the keys.
//!
//! Every request carries `Authorization: Bearer {api_key}`.
//!
//! - `POST {base}/accounts` with `{"name": ...}` gets or creates a named account
//!   and answers `{"address": ...}`
//! - `POST {base}/accounts/{address}/signatures` with
//!   `{"typedData": <eth_signTypedData_v4 document>, "network": "base"}`
//!   answers `{"id": ...}`
//! - `GET {base}/accounts/{address}/signatures/{id}` answers
//!   `{"status": "pending" | "completed" | "failed", "signature"?: "0x...", "error"?: ...}`
//!
//! A response carrying `signature` is final whatever its `status`. Any other
//! status than `failed` keeps the request pending.

use alloy_primitives::{Address, Bytes};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use snack402::SigningError;
use snack402::polling::PollStatus;
use snack402::signer::BoxFuture;
use url::Url;

use super::api::{JsonApi, RemoteServiceError};
use super::{SignatureRequest, SignatureService, parse_signature};

/// [`SignatureService`] for one account of a custodial wallet provider.
#[derive(Debug, Clone)]
pub struct CustodialWalletService {
    api: JsonApi,
    address: Address,
}

#[derive(Debug, Deserialize)]
struct Account {
    address: Address,
}

#[derive(Debug, Deserialize)]
struct CreatedSignature {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SignatureStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn bearer_headers(api_key: &str) -> Result<HeaderMap, RemoteServiceError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {api_key}"))?;
    value.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

impl CustodialWalletService {
    /// Uses an existing account at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError::InvalidApiKey`] if the API key is not a
    /// valid header value.
    pub fn new(
        client: Client,
        base_url: &Url,
        api_key: &str,
        address: Address,
    ) -> Result<Self, RemoteServiceError> {
        Ok(Self {
            api: JsonApi::new(client, base_url, bearer_headers(api_key)?),
            address,
        })
    }

    /// Gets the account called `name`, creating it if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] if the provider cannot be reached or
    /// answers with an error.
    #[cfg_attr(feature = "telemetry", tracing::instrument(name = "snack402.custodial.account", skip(client, base_url, api_key), err))]
    pub async fn get_or_create_account(
        client: Client,
        base_url: &Url,
        api_key: &str,
        name: &str,
    ) -> Result<Self, RemoteServiceError> {
        let api = JsonApi::new(client, base_url, bearer_headers(api_key)?);
        let account: Account = api
            .post_json("accounts", "POST /accounts", &json!({ "name": name }))
            .await?;
        #[cfg(feature = "telemetry")]
        tracing::info!(address = %account.address, "Custodial account ready");
        Ok(Self {
            api,
            address: account.address,
        })
    }

    /// The account address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    async fn create(&self, request: &SignatureRequest) -> Result<String, RemoteServiceError> {
        let path = format!("accounts/{}/signatures", self.address);
        let body = json!({
            "typedData": request.typed_data,
            "network": request.network_name(),
        });
        let created: CreatedSignature = self
            .api
            .post_json(&path, "POST /accounts/{address}/signatures", &body)
            .await?;
        Ok(created.id)
    }

    async fn fetch(&self, id: &str) -> Result<PollStatus<Bytes>, SigningError> {
        let path = format!("accounts/{}/signatures/{id}", self.address);
        let status: SignatureStatus = self
            .api
            .get_json(&path, "GET /accounts/{address}/signatures/{id}")
            .await
            .map_err(SigningError::service)?;
        if let Some(signature) = status.signature.as_deref() {
            return parse_signature(signature).map(PollStatus::Ready);
        }
        match status.status.as_deref() {
            Some("failed") => Ok(PollStatus::Failed(
                status.error.unwrap_or_else(|| format!("signature {id} failed")),
            )),
            _ => Ok(PollStatus::Pending),
        }
    }
}

impl SignatureService for CustodialWalletService {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::ExactEvmPayload;
    use crate::remote::RemoteEvmSigner;
    use alloy_primitives::address;
    use snack402::polling::PollConfig;
    use snack402::signer::SigningCapability;
    use snack402::{PaymentChallenge, PaymentRequirements};
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACCOUNT: Address = address!("00000000000000000000000000000000000000aa");

    fn base(server: &MockServer) -> Url {
        format!("{}/v1", server.uri()).parse().unwrap()
    }

    fn requirements() -> PaymentRequirements {
        let body = json!({"accepts": [{
            "maxAmountRequired": "5000",
            "payTo": "0x1111111111111111111111111111111111111111",
            "maxTimeoutSeconds": 30,
            "network": "base",
            "asset": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
        }]});
        PaymentChallenge::from_slice(body.to_string().as_bytes())
            .unwrap()
            .accepts
            .remove(0)
    }

    #[tokio::test]
    async fn test_get_or_create_account() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts"))
            .and(header("authorization", "Bearer key_1"))
            .and(body_json(json!({"name": "snack-money-x402"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"address": ACCOUNT})))
            .expect(1)
            .mount(&server)
            .await;

        let service = CustodialWalletService::get_or_create_account(
            Client::new(),
            &base(&server),
            "key_1",
            "snack-money-x402",
        )
        .await
        .unwrap();
        assert_eq!(service.address(), ACCOUNT);
    }

    #[tokio::test]
    async fn test_sign_completes() {
        let server = MockServer::start().await;
        let signatures = format!("/v1/accounts/{ACCOUNT}/signatures");
        Mock::given(method("POST"))
            .and(path(signatures.as_str()))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "req-9"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{signatures}/req-9")))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"status": "completed", "signature": format!("0x{}", "11".repeat(65))}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let service = CustodialWalletService::new(Client::new(), &base(&server), "key_1", ACCOUNT)
            .unwrap();
        let signer = RemoteEvmSigner::new(service);
        let auth = signer.authorize(&requirements()).await.unwrap();
        let payload: ExactEvmPayload = serde_json::from_value(auth.payload).unwrap();
        assert_eq!(payload.signature.len(), 65);
        assert_eq!(payload.authorization.from, ACCOUNT);
    }

    #[tokio::test]
    async fn test_failed_status_carries_reason() {
        let server = MockServer::start().await;
        let signatures = format!("/v1/accounts/{ACCOUNT}/signatures");
        Mock::given(method("POST"))
            .and(path(signatures.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "req-1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{signatures}/req-1")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "failed", "error": "policy denied"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let service = CustodialWalletService::new(Client::new(), &base(&server), "key_1", ACCOUNT)
            .unwrap();
        let signer = RemoteEvmSigner::new(service)
            .with_poll_config(PollConfig::new(Duration::from_millis(5), 3));
        let err = signer.authorize(&requirements()).await.unwrap_err();
        assert!(matches!(err, SigningError::Rejected(ref reason) if reason == "policy denied"));
    }

    #[tokio::test]
    async fn test_signature_request_contract() {
        let server = MockServer::start().await;
        let signatures = format!("/v1/accounts/{ACCOUNT}/signatures");
        Mock::given(method("POST"))
            .and(path(signatures.as_str()))
            .and(header("authorization", "Bearer key_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "req-2"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{signatures}/req-2")))
            .and(header("authorization", "Bearer key_1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "completed", "signature": "0xnothex"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let service = CustodialWalletService::new(Client::new(), &base(&server), "key_1", ACCOUNT)
            .unwrap();
        let err = RemoteEvmSigner::new(service)
            .authorize(&requirements())
            .await
            .unwrap_err();
        assert!(matches!(err, SigningError::Service(_)), "{err:?}");

        let requests = server.received_requests().await.unwrap();
        let submitted: serde_json::Value = requests[0].body_json().unwrap();
        assert_eq!(submitted["network"], "base");
        assert_eq!(submitted["typedData"]["primaryType"], "TransferWithAuthorization");
        assert_eq!(
            submitted["typedData"]["message"]["from"].as_str().unwrap().to_lowercase(),
            ACCOUNT.to_string().to_lowercase()
        );
        assert_eq!(submitted["typedData"]["message"]["value"], "5000");
    }
}

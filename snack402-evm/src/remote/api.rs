//! JSON-over-HTTP plumbing shared by the wallet services.

use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;

/// Errors that can occur while talking to a wallet service.
#[derive(Debug, thiserror::Error)]
pub enum RemoteServiceError {
    /// URL construction failed.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The response was not the expected JSON.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Non-success HTTP status.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// The API key cannot be sent as a header value.
    #[error("API key is not a valid header value: {0}")]
    InvalidApiKey(#[from] reqwest::header::InvalidHeaderValue),
    /// The response parsed but lacks a required value.
    #[error("Unexpected response: {context}: {reason}")]
    UnexpectedResponse {
        /// Human-readable context.
        context: &'static str,
        /// What is missing or wrong.
        reason: String,
    },
}

/// A base URL plus default headers, issuing JSON requests relative to it.
#[derive(Debug, Clone)]
pub(crate) struct JsonApi {
    client: Client,
    base_url: Url,
    headers: HeaderMap,
}

impl JsonApi {
    pub(crate) fn new(client: Client, base_url: &Url, headers: HeaderMap) -> Self {
        // Relative joins drop the last path segment unless it ends with '/'.
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            client,
            base_url,
            headers,
        }
    }

    pub(crate) const fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str, context: &'static str) -> Result<Url, RemoteServiceError> {
        self.base_url
            .join(path)
            .map_err(|source| RemoteServiceError::UrlParse { context, source })
    }

    pub(crate) async fn post_json<T, R>(
        &self,
        path: &str,
        context: &'static str,
        payload: &T,
    ) -> Result<R, RemoteServiceError>
    where
        T: serde::Serialize + Sync + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let url = self.url(path, context)?;
        self.send(self.client.post(url).json(payload), context).await
    }

    pub(crate) async fn get_json<R>(
        &self,
        path: &str,
        context: &'static str,
    ) -> Result<R, RemoteServiceError>
    where
        R: serde::de::DeserializeOwned,
    {
        let url = self.url(path, context)?;
        self.send(self.client.get(url), context).await
    }

    async fn send<R>(
        &self,
        request: RequestBuilder,
        context: &'static str,
    ) -> Result<R, RemoteServiceError>
    where
        R: serde::de::DeserializeOwned,
    {
        let response = request
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|source| RemoteServiceError::Http { context, source })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<R>()
                .await
                .map_err(|source| RemoteServiceError::JsonDeserialization { context, source });
        }
        let body = response
            .text()
            .await
            .map_err(|source| RemoteServiceError::Http { context, source })?;
        #[cfg(feature = "telemetry")]
        tracing::warn!(%status, context, "Wallet service request failed");
        Err(RemoteServiceError::HttpStatus {
            context,
            status,
            body,
        })
    }
}

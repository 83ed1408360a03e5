//! Remote signing through wallet services.
//!
//! Some wallets never expose a private key: a custodial MPC wallet or a smart
//! contract wallet signs on the provider's side. The provider API is always
//! asynchronous: submit a signature request, then poll until the signature is
//! ready. [`RemoteEvmSigner`] drives that exchange for any [`SignatureService`].
//!
//! # Services
//!
//! - [`SmartWalletService`] - smart contract wallets signing typed data through a `signatures` API
//! - [`CustodialWalletService`] - bearer-authenticated custodial accounts

mod api;
mod custodial;
mod smart_wallet;

use alloy_primitives::{Address, Bytes};
use snack402::polling::{PollConfig, PollStatus, poll_until};
use snack402::signer::{BoxFuture, SigningCapability};
use snack402::{PaymentAuthorization, PaymentRequirements, SigningError};

#[cfg(feature = "telemetry")]
use tracing::Instrument;

pub use api::RemoteServiceError;
pub use custodial::CustodialWalletService;
pub use smart_wallet::SmartWalletService;

use crate::exact::eip3009::Eip3009SigningParams;
use crate::exact::types::ExactEvmPayload;
use crate::networks;

/// A typed-data signature request for a remote wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRequest {
    /// Network of the requirement being authorized, as sent by the server.
    pub network: String,
    /// Numeric EIP-155 chain id of that network.
    pub chain_id: networks::ChainId,
    /// The `eth_signTypedData_v4` document.
    pub typed_data: serde_json::Value,
}

impl SignatureRequest {
    /// The V1 network name (`"base"`) of this request, when known.
    ///
    /// Falls back to the network as sent.
    #[must_use]
    pub fn network_name(&self) -> &str {
        snack402::chain::ChainId::resolve(&self.network)
            .and_then(|id| id.network_name())
            .unwrap_or(self.network.as_str())
    }
}

/// A provider API that signs typed data on behalf of a wallet.
pub trait SignatureService: Send + Sync {
    /// The wallet address signatures are produced for.
    fn address(&self) -> Address;

    /// Submits a signature request and returns its provider-side id.
    fn submit<'a>(
        &'a self,
        request: &'a SignatureRequest,
    ) -> BoxFuture<'a, Result<String, SigningError>>;

    /// Reports the status of a submitted request.
    fn status<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<PollStatus<Bytes>, SigningError>>;
}

/// A [`SigningCapability`] that signs through a [`SignatureService`].
///
/// Builds the same ERC-3009 message a local key would sign, submits it as
/// typed data, then polls the service per [`PollConfig`].
#[derive(Debug, Clone)]
pub struct RemoteEvmSigner<S> {
    service: S,
    poll: PollConfig,
}

impl<S: SignatureService> RemoteEvmSigner<S> {
    /// Wraps a service with the default polling configuration.
    pub fn new(service: S) -> Self {
        Self {
            service,
            poll: PollConfig::default(),
        }
    }

    /// Overrides the polling configuration.
    #[must_use]
    pub const fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// The wallet address payments are made from.
    pub fn address(&self) -> Address {
        self.service.address()
    }

    /// The underlying service.
    pub const fn service(&self) -> &S {
        &self.service
    }

    async fn sign(&self, requirements: &PaymentRequirements) -> Result<ExactEvmPayload, SigningError> {
        let params = Eip3009SigningParams::from_requirements(requirements)?;
        let authorization = params.authorization(self.service.address());
        let request = SignatureRequest {
            network: requirements.network.clone(),
            chain_id: params.chain_id,
            typed_data: params.typed_data(&authorization),
        };
        let id = self.service.submit(&request).await?;
        #[cfg(feature = "telemetry")]
        tracing::info!(signature_id = %id, "Signature request submitted, polling");

        let service = &self.service;
        let id = id.as_str();
        let signature = poll_until(self.poll, move |_| service.status(id)).await?;
        Ok(ExactEvmPayload {
            signature,
            authorization,
        })
    }
}

impl<S: SignatureService> SigningCapability for RemoteEvmSigner<S> {
    fn supports_network(&self, network: &str) -> bool {
        networks::evm_chain_id(network).is_some()
    }

    fn authorize<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<PaymentAuthorization, SigningError>> {
        let fut = async move {
            let payload = self.sign(requirements).await?;
            payload.into_authorization(requirements)
        };
        #[cfg(feature = "telemetry")]
        let fut = fut.instrument(tracing::info_span!(
            "snack402.evm.remote_sign",
            network = %requirements.network,
            address = %self.service.address(),
        ));
        Box::pin(fut)
    }
}

/// Parses a hex signature as returned by wallet APIs.
pub(crate) fn parse_signature(raw: &str) -> Result<Bytes, SigningError> {
    raw.parse::<Bytes>().map_err(|e| {
        SigningError::service(format!("service returned an invalid signature '{raw}': {e}"))
    })
}

//! Local-key signing for the EVM `exact` scheme.
//!
//! [`EvmSigner`] holds a key (anything [`SignerLike`]) and signs ERC-3009
//! `transferWithAuthorization` messages itself; no network access is needed.

use std::future::Future;
use std::sync::Arc;

use alloy_primitives::{Address, FixedBytes, Signature};
use alloy_signer_local::PrivateKeySigner;
use snack402::signer::{BoxFuture, SigningCapability};
use snack402::{PaymentAuthorization, PaymentRequirements, SigningError};

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::exact::eip3009::Eip3009SigningParams;
use crate::exact::types::ExactEvmPayload;
use crate::networks;

/// Abstracts over owned and shared signers.
///
/// Alloy's `Signer` trait is not implemented for `Arc<T>`, and
/// `PrivateKeySigner` is not `Clone`, so sharing one key between several
/// signing capabilities goes through this trait.
pub trait SignerLike: Send + Sync {
    /// The address of the key.
    fn address(&self) -> Address;

    /// Signs a 32-byte prehash.
    fn sign_hash(
        &self,
        hash: &FixedBytes<32>,
    ) -> impl Future<Output = Result<Signature, alloy_signer::Error>> + Send;
}

impl SignerLike for PrivateKeySigner {
    fn address(&self) -> Address {
        Self::address(self)
    }

    async fn sign_hash(&self, hash: &FixedBytes<32>) -> Result<Signature, alloy_signer::Error> {
        alloy_signer::Signer::sign_hash(self, hash).await
    }
}

impl<T: SignerLike> SignerLike for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn sign_hash(&self, hash: &FixedBytes<32>) -> Result<Signature, alloy_signer::Error> {
        (**self).sign_hash(hash).await
    }
}

/// Signs an ERC-3009 `TransferWithAuthorization` with a local key.
///
/// # Errors
///
/// Returns [`SigningError::Signer`] if the key fails to sign.
#[cfg_attr(feature = "telemetry", instrument(name = "snack402.evm.sign", skip_all, err, fields(chain_id = params.chain_id)))]
pub async fn sign_erc3009_authorization<S: SignerLike>(
    signer: &S,
    params: &Eip3009SigningParams,
) -> Result<ExactEvmPayload, SigningError> {
    let authorization = params.authorization(signer.address());
    let hash = params.signing_hash(&authorization);
    let signature = signer
        .sign_hash(&hash)
        .await
        .map_err(SigningError::signer)?;
    Ok(ExactEvmPayload {
        signature: signature.as_bytes().into(),
        authorization,
    })
}

/// A [`SigningCapability`] backed by a local EVM key.
///
/// Supports every EVM network that resolves to a chain id. Wrap it in a
/// [`ScopedSigner`](snack402::signer::ScopedSigner) to restrict it further.
#[derive(Debug, Clone)]
pub struct EvmSigner<S> {
    signer: S,
}

impl<S: SignerLike> EvmSigner<S> {
    /// Wraps a key.
    pub const fn new(signer: S) -> Self {
        Self { signer }
    }

    /// The address payments are made from.
    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl<S: SignerLike> SigningCapability for EvmSigner<S> {
    fn supports_network(&self, network: &str) -> bool {
        networks::evm_chain_id(network).is_some()
    }

    fn authorize<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<PaymentAuthorization, SigningError>> {
        Box::pin(async move {
            let params = Eip3009SigningParams::from_requirements(requirements)?;
            let payload = sign_erc3009_authorization(&self.signer, &params).await?;
            payload.into_authorization(requirements)
        })
    }
}

//! The signing capability abstraction.
//!
//! A [`SigningCapability`] turns one [`PaymentRequirements`] into a
//! [`PaymentAuthorization`]. Implementations may sign locally with a private key
//! or delegate to a remote wallet service; callers cannot tell the difference.

use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::SigningError;
use crate::proto::{PaymentAuthorization, PaymentRequirements};

/// Boxed future returned by [`SigningCapability::authorize`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that can authorize x402 payments.
pub trait SigningCapability: Send + Sync {
    /// Returns `true` if this signer can authorize payments on `network`.
    ///
    /// Must not perform I/O.
    fn supports_network(&self, network: &str) -> bool;

    /// Produces a signed authorization for `requirements`.
    ///
    /// Only called with requirements whose network passed
    /// [`supports_network`](Self::supports_network).
    fn authorize<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<PaymentAuthorization, SigningError>>;
}

impl<T: SigningCapability + ?Sized> SigningCapability for Arc<T> {
    fn supports_network(&self, network: &str) -> bool {
        (**self).supports_network(network)
    }

    fn authorize<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<PaymentAuthorization, SigningError>> {
        (**self).authorize(requirements)
    }
}

impl<T: SigningCapability + ?Sized> SigningCapability for Box<T> {
    fn supports_network(&self, network: &str) -> bool {
        (**self).supports_network(network)
    }

    fn authorize<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<PaymentAuthorization, SigningError>> {
        (**self).authorize(requirements)
    }
}

/// Dispatches to the first registered signer that supports a network.
///
/// Signers are consulted in registration order. This is how one client pays on
/// several chains, e.g. a mainnet key and a testnet key side by side.
#[derive(Clone, Default)]
pub struct MultiNetworkSigner {
    signers: Vec<(String, Arc<dyn SigningCapability>)>,
}

impl MultiNetworkSigner {
    /// Creates an empty signer that supports nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a signer under a label used in logs and `Debug` output.
    #[must_use]
    pub fn with<S>(mut self, label: impl Into<String>, signer: S) -> Self
    where
        S: SigningCapability + 'static,
    {
        self.signers.push((label.into(), Arc::new(signer)));
        self
    }

    /// Number of registered signers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signers.len()
    }

    /// Returns `true` if no signer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    fn find(&self, network: &str) -> Option<&(String, Arc<dyn SigningCapability>)> {
        self.signers
            .iter()
            .find(|(_, signer)| signer.supports_network(network))
    }
}

impl Debug for MultiNetworkSigner {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiNetworkSigner")
            .field(
                "signers",
                &self.signers.iter().map(|(l, _)| l).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SigningCapability for MultiNetworkSigner {
    fn supports_network(&self, network: &str) -> bool {
        self.find(network).is_some()
    }

    fn authorize<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<PaymentAuthorization, SigningError>> {
        Box::pin(async move {
            let (label, signer) = self
                .find(&requirements.network)
                .ok_or_else(|| SigningError::UnsupportedNetwork(requirements.network.clone()))?;
            #[cfg(feature = "telemetry")]
            tracing::debug!(signer = %label, network = %requirements.network, "Dispatching authorization");
            #[cfg(not(feature = "telemetry"))]
            let _ = label;
            signer.authorize(requirements).await
        })
    }
}

/// Restricts a signer to an explicit list of networks.
///
/// Useful when one key is valid on many chains but should only be used on some,
/// e.g. a testnet key that must never pay on mainnet.
#[derive(Debug, Clone)]
pub struct ScopedSigner<S> {
    inner: S,
    networks: Vec<String>,
}

impl<S> ScopedSigner<S> {
    /// Wraps `inner`, allowing only the given networks.
    pub fn new<I, N>(inner: S, networks: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self {
            inner,
            networks: networks.into_iter().map(Into::into).collect(),
        }
    }

    /// Networks this signer is allowed to pay on.
    #[must_use]
    pub fn networks(&self) -> &[String] {
        &self.networks
    }
}

impl<S: SigningCapability> SigningCapability for ScopedSigner<S> {
    fn supports_network(&self, network: &str) -> bool {
        self.networks.iter().any(|n| n == network) && self.inner.supports_network(network)
    }

    fn authorize<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<PaymentAuthorization, SigningError>> {
        if self.supports_network(&requirements.network) {
            self.inner.authorize(requirements)
        } else {
            let network = requirements.network.clone();
            Box::pin(async move { Err(SigningError::UnsupportedNetwork(network)) })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::proto::PaymentChallenge;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test signer that records how often it was asked to sign.
    #[derive(Debug, Default)]
    pub(crate) struct StubSigner {
        pub networks: Vec<&'static str>,
        pub tag: &'static str,
        pub calls: AtomicUsize,
    }

    impl StubSigner {
        pub(crate) fn new(tag: &'static str, networks: &[&'static str]) -> Self {
            Self {
                networks: networks.to_vec(),
                tag,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SigningCapability for StubSigner {
        fn supports_network(&self, network: &str) -> bool {
            self.networks.contains(&network)
        }

        fn authorize<'a>(
            &'a self,
            requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, Result<PaymentAuthorization, SigningError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                PaymentAuthorization::new(requirements, &json!({"signedBy": self.tag}))
                    .map_err(SigningError::signer)
            })
        }
    }

    pub(crate) fn requirements(network: &str, amount: u64) -> PaymentRequirements {
        let body = json!({"accepts": [{
            "maxAmountRequired": amount.to_string(),
            "payTo": "0xabc",
            "maxTimeoutSeconds": 60,
            "network": network,
            "asset": "0xusdc"
        }]});
        let mut challenge = PaymentChallenge::from_slice(body.to_string().as_bytes()).unwrap();
        challenge.accepts.remove(0)
    }

    #[tokio::test]
    async fn test_multi_network_dispatches_in_registration_order() {
        let signer = MultiNetworkSigner::new()
            .with("evm", StubSigner::new("evm", &["base", "base-sepolia"]))
            .with("other", StubSigner::new("other", &["base", "polygon"]));

        assert!(signer.supports_network("polygon"));
        assert!(!signer.supports_network("solana"));

        let base = signer.authorize(&requirements("base", 1)).await.unwrap();
        assert_eq!(base.payload["signedBy"], "evm");
        let polygon = signer.authorize(&requirements("polygon", 1)).await.unwrap();
        assert_eq!(polygon.payload["signedBy"], "other");
    }

    #[tokio::test]
    async fn test_multi_network_unsupported_network() {
        let signer = MultiNetworkSigner::new().with("evm", StubSigner::new("evm", &["base"]));
        let err = signer
            .authorize(&requirements("solana", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, SigningError::UnsupportedNetwork(n) if n == "solana"));
    }

    #[test]
    fn test_multi_network_debug_lists_labels() {
        let signer = MultiNetworkSigner::new()
            .with("mainnet", StubSigner::new("a", &["base"]))
            .with("testnet", StubSigner::new("b", &["base-sepolia"]));
        let debug = format!("{signer:?}");
        assert!(debug.contains("mainnet"));
        assert!(debug.contains("testnet"));
        assert_eq!(signer.len(), 2);
    }

    #[tokio::test]
    async fn test_scoped_signer_hides_other_networks() {
        let inner = Arc::new(StubSigner::new("key", &["base", "base-sepolia"]));
        let scoped = ScopedSigner::new(Arc::clone(&inner), ["base-sepolia"]);

        assert!(scoped.supports_network("base-sepolia"));
        assert!(!scoped.supports_network("base"));

        let err = scoped.authorize(&requirements("base", 1)).await.unwrap_err();
        assert!(matches!(err, SigningError::UnsupportedNetwork(_)));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 0);

        scoped
            .authorize(&requirements("base-sepolia", 1))
            .await
            .unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}

//! Policies for choosing one requirement out of a challenge.
//!
//! Selection happens in two steps. First the offered requirements are filtered
//! to those a [`SigningCapability`] supports ([`compatible`]), preserving the
//! server's order. Then a [`PaymentSelector`] picks one of the survivors.

use crate::proto::{PaymentChallenge, PaymentRequirements, TokenAmount};
use crate::signer::SigningCapability;

/// Trait for selecting a payment requirement from the compatible options.
///
/// Implement this trait to customize which option is paid when the server
/// offers several.
pub trait PaymentSelector: Send + Sync {
    /// Picks one of `candidates`, or `None` if none is acceptable.
    fn select<'a>(
        &self,
        candidates: &[&'a PaymentRequirements],
    ) -> Option<&'a PaymentRequirements>;
}

/// Selector that returns the first compatible requirement.
///
/// The default policy: honor the server's preference order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCompatible;

impl PaymentSelector for FirstCompatible {
    fn select<'a>(
        &self,
        candidates: &[&'a PaymentRequirements],
    ) -> Option<&'a PaymentRequirements> {
        candidates.first().copied()
    }
}

/// Selector that prefers networks in priority order.
///
/// Networks are tried in order; the first candidate on a matching network is
/// returned. If none matches, falls back to the first candidate.
#[derive(Debug, Clone, Default)]
pub struct PreferNetwork(Vec<String>);

impl PreferNetwork {
    /// Creates a network preference selector.
    pub fn new<I, N>(networks: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self(networks.into_iter().map(Into::into).collect())
    }

    /// Adds a network with lower priority than the existing ones.
    #[must_use]
    pub fn or_network(mut self, network: impl Into<String>) -> Self {
        self.0.push(network.into());
        self
    }
}

impl PaymentSelector for PreferNetwork {
    fn select<'a>(
        &self,
        candidates: &[&'a PaymentRequirements],
    ) -> Option<&'a PaymentRequirements> {
        self.0
            .iter()
            .find_map(|network| candidates.iter().find(|c| &c.network == network))
            .or_else(|| candidates.first())
            .copied()
    }
}

/// Selector that only accepts requirements up to a maximum amount.
///
/// Amounts are compared in the token's smallest unit. Useful as a spending
/// cap.
#[derive(Debug, Clone, Copy)]
pub struct MaxAmount(pub TokenAmount);

impl PaymentSelector for MaxAmount {
    fn select<'a>(
        &self,
        candidates: &[&'a PaymentRequirements],
    ) -> Option<&'a PaymentRequirements> {
        candidates
            .iter()
            .find(|c| c.max_amount_required <= self.0)
            .copied()
    }
}

/// Requirements of `challenge` whose network `signer` supports, in server order.
#[must_use]
pub fn compatible<'a, S>(challenge: &'a PaymentChallenge, signer: &S) -> Vec<&'a PaymentRequirements>
where
    S: SigningCapability + ?Sized,
{
    challenge
        .accepts
        .iter()
        .filter(|r| signer.supports_network(&r.network))
        .collect()
}

/// Filters `challenge` by signer support, then applies `selector`.
#[must_use]
pub fn select<'a, S, P>(
    challenge: &'a PaymentChallenge,
    signer: &S,
    selector: &P,
) -> Option<&'a PaymentRequirements>
where
    S: SigningCapability + ?Sized,
    P: PaymentSelector + ?Sized,
{
    let candidates = compatible(challenge, signer);
    selector.select(&candidates)
}

//! Wire format types for the x402 V1 payment flow.
//!
//! # Key Types
//!
//! - [`PaymentChallenge`] - Body of a `402 Payment Required` response
//! - [`PaymentRequirements`] - One payment option offered by the server
//! - [`PaymentAuthorization`] - Signed payment sent back in the `X-PAYMENT` header
//! - [`PaymentReceipt`] - Settlement confirmation from the `X-PAYMENT-RESPONSE` header
//!
//! # Wire Format
//!
//! All types serialize to JSON with camelCase field names. Token amounts are
//! decimal strings so that JavaScript clients keep full precision.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ChallengeError;

/// Free-form JSON object used for extension data.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// The only payment scheme this workspace signs.
pub const EXACT_SCHEME: &str = "exact";

/// Version marker that serializes as the integer `1`.
///
/// Deserialization rejects any other value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct X402Version1;

impl X402Version1 {
    /// The numeric protocol version.
    pub const VALUE: u8 = 1;
}

impl Serialize for X402Version1 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(Self::VALUE)
    }
}

impl<'de> Deserialize<'de> for X402Version1 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let version = u8::deserialize(deserializer)?;
        if version == Self::VALUE {
            Ok(Self)
        } else {
            Err(serde::de::Error::custom(format!(
                "expected x402Version {}, got {version}",
                Self::VALUE
            )))
        }
    }
}

/// A non-negative integer amount in the token's smallest unit.
///
/// Serialized as a decimal string (`"10000"`). Deserialization also accepts a
/// plain JSON integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(pub U256);

impl TokenAmount {
    /// Returns the inner value.
    #[must_use]
    pub const fn inner(&self) -> U256 {
        self.0
    }
}

impl From<u64> for TokenAmount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for TokenAmount {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for TokenAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<TokenAmount> for U256 {
    fn from(value: TokenAmount) -> Self {
        value.0
    }
}

/// Failure to parse a [`TokenAmount`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("token amount must be a non-negative decimal integer, got '{0}'")]
pub struct TokenAmountParseError(String);

impl FromStr for TokenAmount {
    type Err = TokenAmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TokenAmountParseError(s.to_owned()));
        }
        U256::from_str_radix(s, 10)
            .map(Self)
            .map_err(|_| TokenAmountParseError(s.to_owned()))
    }
}

impl Display for TokenAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            String(String),
            Number(u64),
        }
        match Raw::deserialize(deserializer)? {
            Raw::String(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Number(n) => Ok(Self::from(n)),
        }
    }
}

/// Token metadata a server may attach to a requirement.
///
/// `name` and `version` form the EIP-712 domain of the token contract. Unknown
/// keys are kept in [`other`](Self::other).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementsExtra {
    /// Token name, e.g. `"USD Coin"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Token contract version, e.g. `"2"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Token decimals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    /// Any other metadata, passed through untouched.
    #[serde(flatten)]
    pub other: Extra,
}

fn default_scheme() -> String {
    EXACT_SCHEME.to_owned()
}

/// One acceptable way to pay, as offered in a [`PaymentChallenge`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Payment scheme; servers that omit it mean `"exact"`.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Network identifier, e.g. `"base"` or `"eip155:8453"`.
    pub network: String,
    /// Maximum amount the server will charge, in the token's smallest unit.
    pub max_amount_required: TokenAmount,
    /// Recipient address.
    pub pay_to: String,
    /// How long an authorization may stay valid, in seconds.
    pub max_timeout_seconds: u64,
    /// Token contract address or symbol.
    pub asset: String,
    /// URL of the resource being paid for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Human-readable description of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Token metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<RequirementsExtra>,
}

impl PaymentRequirements {
    /// Checks the invariants serde cannot express.
    fn check(&self) -> Result<(), &'static str> {
        if self.network.trim().is_empty() {
            return Err("network is empty");
        }
        if self.pay_to.trim().is_empty() {
            return Err("payTo is empty");
        }
        if self.asset.trim().is_empty() {
            return Err("asset is empty");
        }
        if self.max_timeout_seconds == 0 {
            return Err("maxTimeoutSeconds must be positive");
        }
        Ok(())
    }

    /// Token decimals from `extra`, if the server sent them.
    #[must_use]
    pub fn decimals(&self) -> Option<u8> {
        self.extra.as_ref().and_then(|e| e.decimals)
    }

    /// Token name from `extra`, if the server sent it.
    #[must_use]
    pub fn asset_name(&self) -> Option<&str> {
        self.extra.as_ref().and_then(|e| e.name.as_deref())
    }
}

/// The body of a `402 Payment Required` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentChallenge {
    /// Protocol version announced by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x402_version: Option<u8>,
    /// Why payment is required (e.g. a rejected previous payment).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Accepted payment options, in server preference order.
    pub accepts: Vec<PaymentRequirements>,
}

impl PaymentChallenge {
    /// Parses and validates a 402 response body.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError`] if the body is not JSON, `accepts` is missing
    /// or empty, or a requirement is missing a field or has a zero timeout.
    pub fn from_slice(body: &[u8]) -> Result<Self, ChallengeError> {
        let challenge: Self = serde_json::from_slice(body)?;
        challenge.validate()?;
        Ok(challenge)
    }

    /// Validates an already deserialized challenge.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError`] if `accepts` is empty or any requirement
    /// violates an invariant.
    pub fn validate(&self) -> Result<(), ChallengeError> {
        if self.accepts.is_empty() {
            return Err(ChallengeError::NoRequirements);
        }
        for (index, requirements) in self.accepts.iter().enumerate() {
            requirements
                .check()
                .map_err(|reason| ChallengeError::InvalidRequirement { index, reason })?;
        }
        Ok(())
    }

    /// Networks offered by the server, in order, without duplicates.
    #[must_use]
    pub fn networks(&self) -> Vec<&str> {
        let mut networks: Vec<&str> = Vec::with_capacity(self.accepts.len());
        for requirements in &self.accepts {
            if !networks.contains(&requirements.network.as_str()) {
                networks.push(&requirements.network);
            }
        }
        networks
    }
}

/// A signed payment sent to the server in the `X-PAYMENT` header.
///
/// `payload` is scheme- and network-specific. For EVM `exact` payments it holds
/// the signature and the ERC-3009 authorization that was signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAuthorization {
    /// Protocol version (always 1).
    pub x402_version: X402Version1,
    /// Scheme of the requirement that was authorized.
    pub scheme: String,
    /// Network of the requirement that was authorized.
    pub network: String,
    /// Scheme-specific signed payload.
    pub payload: serde_json::Value,
}

impl PaymentAuthorization {
    /// Builds an authorization for `requirements` around a signed payload.
    ///
    /// # Errors
    ///
    /// Returns an error if `payload` cannot be serialized to JSON.
    pub fn new<P: Serialize>(
        requirements: &PaymentRequirements,
        payload: &P,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            x402_version: X402Version1,
            scheme: requirements.scheme.clone(),
            network: requirements.network.clone(),
            payload: serde_json::to_value(payload)?,
        })
    }
}

/// Settlement confirmation returned by the server after a paid request.
///
/// Decoded for display only. Unknown keys are kept in [`other`](Self::other).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// Whether settlement succeeded.
    #[serde(default)]
    pub success: bool,
    /// On-chain transaction hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// Network the payment settled on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Address that paid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    /// Machine-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Anything else the server included.
    #[serde(flatten)]
    pub other: Extra,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCENARIO: &str = r#"{"accepts":[{"maxAmountRequired":"10000","payTo":"0xabc","maxTimeoutSeconds":60,"network":"base","asset":"0xusdc"}]}"#;

    #[test]
    fn test_parse_minimal_challenge() {
        let challenge = PaymentChallenge::from_slice(SCENARIO.as_bytes()).unwrap();
        assert_eq!(challenge.accepts.len(), 1);
        let req = &challenge.accepts[0];
        assert_eq!(req.scheme, "exact");
        assert_eq!(req.network, "base");
        assert_eq!(req.max_amount_required, TokenAmount::from(10_000u64));
        assert_eq!(req.pay_to, "0xabc");
        assert_eq!(req.max_timeout_seconds, 60);
        assert_eq!(req.asset, "0xusdc");
        assert!(req.extra.is_none());
    }

    #[test]
    fn test_parse_full_challenge_keeps_extra() {
        let body = json!({
            "x402Version": 1,
            "error": "X-PAYMENT header is required",
            "accepts": [{
                "scheme": "exact",
                "network": "base-sepolia",
                "maxAmountRequired": "1000",
                "resource": "https://api.snack.money/payments/x/pay",
                "description": "Snack payment",
                "mimeType": "application/json",
                "payTo": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
                "maxTimeoutSeconds": 300,
                "asset": "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
                "extra": {"name": "USDC", "version": "2", "decimals": 6, "feePayer": "x"}
            }]
        });
        let challenge = PaymentChallenge::from_slice(body.to_string().as_bytes()).unwrap();
        assert_eq!(challenge.x402_version, Some(1));
        let req = &challenge.accepts[0];
        assert_eq!(req.decimals(), Some(6));
        assert_eq!(req.asset_name(), Some("USDC"));
        let extra = req.extra.as_ref().unwrap();
        assert_eq!(extra.version.as_deref(), Some("2"));
        assert_eq!(extra.other.get("feePayer"), Some(&json!("x")));
    }

    #[test]
    fn test_missing_accepts_is_malformed() {
        let err = PaymentChallenge::from_slice(br#"{"error":"nope"}"#).unwrap_err();
        assert!(matches!(err, ChallengeError::Json(_)));
    }

    #[test]
    fn test_empty_accepts_is_malformed() {
        let err = PaymentChallenge::from_slice(br#"{"accepts":[]}"#).unwrap_err();
        assert!(matches!(err, ChallengeError::NoRequirements));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let body = br#"{"accepts":[{"maxAmountRequired":"1","maxTimeoutSeconds":60,"network":"base","asset":"0xusdc"}]}"#;
        let err = PaymentChallenge::from_slice(body).unwrap_err();
        assert!(matches!(err, ChallengeError::Json(_)));
    }

    #[test]
    fn test_zero_timeout_is_malformed() {
        let body = br#"{"accepts":[{"maxAmountRequired":"1","payTo":"0xabc","maxTimeoutSeconds":0,"network":"base","asset":"0xusdc"}]}"#;
        let err = PaymentChallenge::from_slice(body).unwrap_err();
        assert!(matches!(
            err,
            ChallengeError::InvalidRequirement { index: 0, .. }
        ));
    }

    #[test]
    fn test_negative_amount_is_malformed() {
        let body = br#"{"accepts":[{"maxAmountRequired":"-5","payTo":"0xabc","maxTimeoutSeconds":60,"network":"base","asset":"0xusdc"}]}"#;
        assert!(PaymentChallenge::from_slice(body).is_err());
    }

    #[test]
    fn test_non_json_body_is_malformed() {
        let err = PaymentChallenge::from_slice(b"<html>Payment Required</html>").unwrap_err();
        assert!(matches!(err, ChallengeError::Json(_)));
    }

    #[test]
    fn test_networks_are_deduplicated_in_order() {
        let body = json!({"accepts": [
            {"maxAmountRequired": "1", "payTo": "a", "maxTimeoutSeconds": 1, "network": "solana", "asset": "x"},
            {"maxAmountRequired": "1", "payTo": "a", "maxTimeoutSeconds": 1, "network": "base", "asset": "x"},
            {"maxAmountRequired": "2", "payTo": "a", "maxTimeoutSeconds": 1, "network": "solana", "asset": "y"}
        ]});
        let challenge = PaymentChallenge::from_slice(body.to_string().as_bytes()).unwrap();
        assert_eq!(challenge.networks(), vec!["solana", "base"]);
    }

    #[test]
    fn test_token_amount_accepts_number_and_serializes_as_string() {
        let amount: TokenAmount = serde_json::from_str("42").unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"42\"");
        assert!("".parse::<TokenAmount>().is_err());
        assert!("1.5".parse::<TokenAmount>().is_err());
        assert!("+1".parse::<TokenAmount>().is_err());
    }

    #[test]
    fn test_authorization_wire_shape() {
        let challenge = PaymentChallenge::from_slice(SCENARIO.as_bytes()).unwrap();
        let auth = PaymentAuthorization::new(&challenge.accepts[0], &json!({"signature": "0x01"}))
            .unwrap();
        let value = serde_json::to_value(&auth).unwrap();
        assert_eq!(
            value,
            json!({
                "x402Version": 1,
                "scheme": "exact",
                "network": "base",
                "payload": {"signature": "0x01"}
            })
        );
    }

    #[test]
    fn test_authorization_rejects_other_versions() {
        let raw = json!({"x402Version": 2, "scheme": "exact", "network": "base", "payload": {}});
        assert!(serde_json::from_value::<PaymentAuthorization>(raw).is_err());
    }

    #[test]
    fn test_receipt_keeps_unknown_fields() {
        let raw = json!({
            "success": true,
            "transaction": "0xdeadbeef",
            "network": "base",
            "payer": "0x1234",
            "settledAt": 1_700_000_000
        });
        let receipt: PaymentReceipt = serde_json::from_value(raw).unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.transaction.as_deref(), Some("0xdeadbeef"));
        assert_eq!(receipt.other.get("settledAt"), Some(&json!(1_700_000_000)));
    }
}

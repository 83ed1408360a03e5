//! Building the EIP-3009 message for a payment requirement.
//!
//! Local and remote signers share everything up to the signature itself: the
//! EIP-712 domain, the validity window and the nonce. Local signers sign
//! [`Eip3009SigningParams::signing_hash`]; remote signers submit
//! [`Eip3009SigningParams::typed_data`] and let the wallet hash it.

use alloy_primitives::{Address, B256, FixedBytes, U256};
use alloy_sol_types::{Eip712Domain, SolStruct, eip712_domain};
use rand::RngExt;
use rand::rng;
use serde_json::json;
use snack402::SigningError;
use snack402::proto::{EXACT_SCHEME, PaymentRequirements};
use snack402::timestamp::AuthorizationWindow;

use crate::exact::types::{Eip3009Authorization, TransferWithAuthorization};
use crate::networks::{self, ChainId, DEFAULT_USDC_NAME, DEFAULT_USDC_VERSION};

/// EIP-712 parameters for one ERC-3009 authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip3009SigningParams {
    /// Numeric EIP-155 chain id.
    pub chain_id: ChainId,
    /// Token contract; the EIP-712 verifying contract.
    pub asset_address: Address,
    /// Recipient.
    pub pay_to: Address,
    /// Amount in the token's smallest unit.
    pub amount: U256,
    /// Length of the validity window after now.
    pub max_timeout_seconds: u64,
    /// EIP-712 domain name of the token.
    pub name: String,
    /// EIP-712 domain version of the token.
    pub version: String,
}

fn parse_address(field: &str, value: &str) -> Result<Address, SigningError> {
    value
        .parse()
        .map_err(|_| SigningError::InvalidRequirements(format!("{field} '{value}' is not an EVM address")))
}

impl Eip3009SigningParams {
    /// Extracts signing parameters from a requirement.
    ///
    /// An `asset` of `"USDC"` resolves to the known deployment on the chain.
    /// The domain name and version come from `extra`, defaulting to USDC's.
    ///
    /// # Errors
    ///
    /// - [`SigningError::UnsupportedNetwork`] for non-EVM or unknown networks
    /// - [`SigningError::InvalidRequirements`] for other schemes or malformed addresses
    pub fn from_requirements(requirements: &PaymentRequirements) -> Result<Self, SigningError> {
        if requirements.scheme != EXACT_SCHEME {
            return Err(SigningError::InvalidRequirements(format!(
                "scheme '{}' is not supported",
                requirements.scheme
            )));
        }
        let chain_id = networks::evm_chain_id(&requirements.network)
            .ok_or_else(|| SigningError::UnsupportedNetwork(requirements.network.clone()))?;
        let asset_address = if requirements.asset.eq_ignore_ascii_case("usdc") {
            networks::usdc_address(chain_id).ok_or_else(|| {
                SigningError::InvalidRequirements(format!("no known USDC on chain {chain_id}"))
            })?
        } else {
            parse_address("asset", &requirements.asset)?
        };
        let pay_to = parse_address("payTo", &requirements.pay_to)?;
        let extra = requirements.extra.as_ref();
        let name = extra
            .and_then(|e| e.name.clone())
            .unwrap_or_else(|| DEFAULT_USDC_NAME.to_owned());
        let version = extra
            .and_then(|e| e.version.clone())
            .unwrap_or_else(|| DEFAULT_USDC_VERSION.to_owned());
        Ok(Self {
            chain_id,
            asset_address,
            pay_to,
            amount: requirements.max_amount_required.into(),
            max_timeout_seconds: requirements.max_timeout_seconds,
            name,
            version,
        })
    }

    /// The EIP-712 domain of the token contract.
    #[must_use]
    pub fn domain(&self) -> Eip712Domain {
        eip712_domain! {
            name: self.name.clone(),
            version: self.version.clone(),
            chain_id: self.chain_id,
            verifying_contract: self.asset_address,
        }
    }

    /// Builds a fresh authorization from `from`, valid from now.
    ///
    /// Every call draws a new random nonce.
    #[must_use]
    pub fn authorization(&self, from: Address) -> Eip3009Authorization {
        self.authorization_in(from, AuthorizationWindow::from_now(self.max_timeout_seconds))
    }

    /// Builds a fresh authorization for an explicit validity window.
    #[must_use]
    pub fn authorization_in(&self, from: Address, window: AuthorizationWindow) -> Eip3009Authorization {
        let nonce: [u8; 32] = rng().random();
        Eip3009Authorization {
            from,
            to: self.pay_to,
            value: self.amount.into(),
            valid_after: window.valid_after,
            valid_before: window.valid_before,
            nonce: FixedBytes(nonce),
        }
    }

    /// The EIP-712 hash a local key signs.
    #[must_use]
    pub fn signing_hash(&self, authorization: &Eip3009Authorization) -> B256 {
        TransferWithAuthorization::from(authorization).eip712_signing_hash(&self.domain())
    }

    /// The `eth_signTypedData_v4` document a remote wallet signs.
    ///
    /// Integers are decimal strings and addresses are checksummed.
    #[must_use]
    pub fn typed_data(&self, authorization: &Eip3009Authorization) -> serde_json::Value {
        json!({
            "types": {
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "version", "type": "string"},
                    {"name": "chainId", "type": "uint256"},
                    {"name": "verifyingContract", "type": "address"}
                ],
                "TransferWithAuthorization": [
                    {"name": "from", "type": "address"},
                    {"name": "to", "type": "address"},
                    {"name": "value", "type": "uint256"},
                    {"name": "validAfter", "type": "uint256"},
                    {"name": "validBefore", "type": "uint256"},
                    {"name": "nonce", "type": "bytes32"}
                ]
            },
            "primaryType": "TransferWithAuthorization",
            "domain": {
                "name": self.name,
                "version": self.version,
                "chainId": self.chain_id,
                "verifyingContract": self.asset_address.to_checksum(None)
            },
            "message": {
                "from": authorization.from.to_checksum(None),
                "to": authorization.to.to_checksum(None),
                "value": authorization.value.to_string(),
                "validAfter": authorization.valid_after.to_string(),
                "validBefore": authorization.valid_before.to_string(),
                "nonce": authorization.nonce.to_string()
            }
        })
    }
}

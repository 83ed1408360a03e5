//! Wire types for EVM `exact` payments.

use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::sol;
use serde::{Deserialize, Serialize};
use snack402::SigningError;
use snack402::proto::{PaymentAuthorization, PaymentRequirements, TokenAmount};
use snack402::timestamp::UnixTimestamp;

/// The ERC-3009 authorization that was signed.
///
/// Travels next to the signature so the settling party can rebuild the
/// EIP-712 message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip3009Authorization {
    /// Token owner authorizing the transfer.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Amount in the token's smallest unit.
    pub value: TokenAmount,
    /// Not valid before this time.
    pub valid_after: UnixTimestamp,
    /// Not valid at or after this time.
    pub valid_before: UnixTimestamp,
    /// Unique 32-byte nonce; replay protection.
    pub nonce: B256,
}

/// Payload of an EVM `exact` [`PaymentAuthorization`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactEvmPayload {
    /// The signature over the EIP-712 hash.
    ///
    /// 65 bytes for an EOA. Smart wallets return longer EIP-1271 or EIP-6492
    /// signatures, which are passed through untouched.
    pub signature: Bytes,
    /// The signed authorization.
    pub authorization: Eip3009Authorization,
}

impl ExactEvmPayload {
    /// Wraps this payload into the authorization sent to the server.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Signer`] if the payload cannot be serialized.
    pub fn into_authorization(
        self,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentAuthorization, SigningError> {
        PaymentAuthorization::new(requirements, &self).map_err(SigningError::signer)
    }
}

sol!(
    /// ERC-3009 `TransferWithAuthorization` as hashed for EIP-712.
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);

impl From<&Eip3009Authorization> for TransferWithAuthorization {
    fn from(authorization: &Eip3009Authorization) -> Self {
        Self {
            from: authorization.from,
            to: authorization.to,
            value: authorization.value.into(),
            validAfter: U256::from(authorization.valid_after.as_secs()),
            validBefore: U256::from(authorization.valid_before.as_secs()),
            nonce: authorization.nonce,
        }
    }
}

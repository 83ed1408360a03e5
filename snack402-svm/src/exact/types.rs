//! Wire types for Solana `exact` payments.

use serde::{Deserialize, Serialize};
use snack402::SigningError;
use snack402::proto::{PaymentAuthorization, PaymentRequirements};
use solana_pubkey::{Pubkey, pubkey};

#[cfg(feature = "client")]
use snack402::encoding::Base64Bytes;
#[cfg(feature = "client")]
use solana_signature::Signature;
#[cfg(feature = "client")]
use solana_signer::Signer;
#[cfg(feature = "client")]
use solana_transaction::versioned::VersionedTransaction;

/// Associated Token Account program public key.
pub const ATA_PROGRAM_PUBKEY: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Key of `extra` naming the account that pays transaction fees.
pub const FEE_PAYER_KEY: &str = "feePayer";

/// Payload of a Solana `exact` [`PaymentAuthorization`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactSolanaPayload {
    /// Base64 of the bincode-serialized, partially signed transaction.
    pub transaction: String,
}

impl ExactSolanaPayload {
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

/// The fee payer designated by the server in `extra.feePayer`.
///
/// # Errors
///
/// Returns [`SigningError::InvalidRequirements`] if it is missing or not a
/// base58 public key.
pub fn fee_payer(requirements: &PaymentRequirements) -> Result<Pubkey, SigningError> {
    let raw = requirements
        .extra
        .as_ref()
        .and_then(|extra| extra.other.get(FEE_PAYER_KEY))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| SigningError::InvalidRequirements("missing feePayer in extra".to_owned()))?;
    raw.parse()
        .map_err(|e| SigningError::InvalidRequirements(format!("invalid feePayer '{raw}': {e}")))
}

/// The associated token account of `owner` for `mint` under `token_program`.
#[must_use]
pub fn associated_token_address(owner: &Pubkey, token_program: &Pubkey, mint: &Pubkey) -> Pubkey {
    let (ata, _) = Pubkey::find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_PUBKEY,
    );
    ata
}

/// The signer is not among the transaction's required signers.
#[cfg(feature = "client")]
#[derive(Debug, thiserror::Error)]
#[error("cannot sign transaction: {0}")]
pub struct TransactionSignError(pub String);

/// The transaction could not be serialized.
#[cfg(feature = "client")]
#[derive(Debug, thiserror::Error)]
#[error("cannot encode transaction: {0}")]
pub struct TransactionToB64Error(#[from] pub bincode::Error);

/// A versioned transaction being signed.
#[cfg(feature = "client")]
#[derive(Debug, Clone)]
pub struct TransactionInt {
    inner: VersionedTransaction,
}

#[cfg(feature = "client")]
impl TransactionInt {
    /// Wraps a transaction.
    #[must_use]
    pub const fn new(transaction: VersionedTransaction) -> Self {
        Self { inner: transaction }
    }

    /// Returns the inner transaction.
    #[must_use]
    pub const fn inner(&self) -> &VersionedTransaction {
        &self.inner
    }

    /// Signs the message with `signer`, leaving other signature slots untouched.
    ///
    /// Missing slots are filled with default signatures for the fee payer to
    /// replace.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionSignError`] if the signer is not in the required signers list.
    pub fn sign_with_keypair<S: Signer + ?Sized>(
        self,
        signer: &S,
    ) -> Result<Self, TransactionSignError> {
        let mut tx = self.inner;
        let msg_bytes = tx.message.serialize();
        let signature = signer
            .try_sign_message(msg_bytes.as_slice())
            .map_err(|e| TransactionSignError(e.to_string()))?;

        let num_required = usize::from(tx.message.header().num_required_signatures);
        let pos = tx.message.static_account_keys()[..num_required]
            .iter()
            .position(|k| *k == signer.pubkey())
            .ok_or_else(|| {
                TransactionSignError(format!("{} is not a required signer", signer.pubkey()))
            })?;

        if tx.signatures.len() < num_required {
            tx.signatures.resize(num_required, Signature::default());
        }
        tx.signatures[pos] = signature;
        Ok(Self { inner: tx })
    }

    /// Encodes the transaction as base64 of its bincode serialization.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionToB64Error`] if serialization fails.
    pub fn as_base64(&self) -> Result<String, TransactionToB64Error> {
        let bytes = bincode::serialize(&self.inner)?;
        Ok(Base64Bytes::encode(bytes).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use snack402::PaymentChallenge;

    fn requirements(extra: serde_json::Value) -> PaymentRequirements {
        let body = json!({"accepts": [{
            "maxAmountRequired": "10000",
            "payTo": "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM",
            "maxTimeoutSeconds": 60,
            "network": "solana",
            "asset": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "extra": extra
        }]});
        PaymentChallenge::from_slice(body.to_string().as_bytes())
            .unwrap()
            .accepts
            .remove(0)
    }

    #[test]
    fn test_fee_payer_from_extra() {
        let req = requirements(json!({"feePayer": "2wKupLR9q6wXYppw8Gr2NvWxKBUqm4PPJKkQfoxHDBg4"}));
        assert_eq!(
            fee_payer(&req).unwrap().to_string(),
            "2wKupLR9q6wXYppw8Gr2NvWxKBUqm4PPJKkQfoxHDBg4"
        );
    }

    #[test]
    fn test_fee_payer_missing_or_invalid() {
        for extra in [json!({}), json!({"feePayer": 7}), json!({"feePayer": "0xnope"})] {
            let err = fee_payer(&requirements(extra)).unwrap_err();
            assert!(matches!(err, SigningError::InvalidRequirements(_)), "{err}");
        }
    }

    #[test]
    fn test_associated_token_address_is_deterministic() {
        let owner = pubkey!("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM");
        let program = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
        let mint = crate::USDC_SOLANA;
        let a = associated_token_address(&owner, &program, &mint);
        assert_eq!(a, associated_token_address(&owner, &program, &mint));
        assert_ne!(a, associated_token_address(&mint, &program, &owner));
    }
}

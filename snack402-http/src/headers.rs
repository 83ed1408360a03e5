//! HTTP header encoding and decoding for x402 V1 messages.
//!
//! Handles base64-encoded JSON payloads in the `X-PAYMENT` request header and
//! the `X-PAYMENT-RESPONSE` (or `PAYMENT-RESPONSE`) response header.

use http::{HeaderMap, HeaderValue};
use snack402::encoding::Base64Bytes;
use snack402::{PaymentAuthorization, PaymentReceipt};

use crate::constants::{PAYMENT_RESPONSE_HEADER, X_PAYMENT_RESPONSE_HEADER};
use crate::error::HttpError;

/// Encodes a [`PaymentAuthorization`] as a base64 string for the `X-PAYMENT`
/// header.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if JSON serialization fails.
pub fn encode_x_payment(authorization: &PaymentAuthorization) -> Result<String, HttpError> {
    let encoded = Base64Bytes::encode_json(authorization)?;
    Ok(encoded.to_string())
}

/// Encodes a [`PaymentAuthorization`] straight into a header value.
///
/// The value is marked sensitive so it stays out of debug output.
///
/// # Errors
///
/// Returns [`HttpError`] if serialization fails or the result is not a valid
/// header value.
pub fn x_payment_header_value(authorization: &PaymentAuthorization) -> Result<HeaderValue, HttpError> {
    let mut value = HeaderValue::from_str(&encode_x_payment(authorization)?)?;
    value.set_sensitive(true);
    Ok(value)
}

/// Decodes an `X-PAYMENT` header value.
///
/// # Errors
///
/// Returns [`HttpError`] on base64 or JSON decode failure.
pub fn decode_x_payment(header_value: &str) -> Result<PaymentAuthorization, HttpError> {
    let bytes = Base64Bytes::from(header_value).decode()?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Decodes an `X-PAYMENT-RESPONSE` header value into a [`PaymentReceipt`].
///
/// # Errors
///
/// Returns [`HttpError`] on base64 or JSON decode failure.
pub fn decode_payment_response(header_value: &str) -> Result<PaymentReceipt, HttpError> {
    let bytes = Base64Bytes::from(header_value).decode()?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Extracts the settlement receipt from response headers, if there is a
/// readable one.
///
/// `X-PAYMENT-RESPONSE` is tried first, then `PAYMENT-RESPONSE`. Missing or
/// malformed headers yield `None`.
#[must_use]
pub fn receipt_from_headers(headers: &HeaderMap) -> Option<PaymentReceipt> {
    [X_PAYMENT_RESPONSE_HEADER, PAYMENT_RESPONSE_HEADER]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| decode_payment_response(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn authorization() -> PaymentAuthorization {
        serde_json::from_value(json!({
            "x402Version": 1,
            "scheme": "exact",
            "network": "base",
            "payload": {"signature": "0x01"}
        }))
        .unwrap()
    }

    #[test]
    fn test_x_payment_is_base64_json() {
        let encoded = encode_x_payment(&authorization()).unwrap();
        let raw: serde_json::Value = Base64Bytes::from(encoded.as_str()).decode_json().unwrap();
        assert_eq!(raw["x402Version"], 1);
        assert_eq!(raw["network"], "base");
        assert_eq!(decode_x_payment(&encoded).unwrap(), authorization());
    }

    #[test]
    fn test_header_value_is_sensitive() {
        let value = x_payment_header_value(&authorization()).unwrap();
        assert!(value.is_sensitive());
    }

    #[test]
    fn test_receipt_from_primary_header() {
        let receipt = Base64Bytes::encode_json(&json!({
            "success": true,
            "transaction": "0xabc",
            "network": "base",
            "payer": "0x42"
        }))
        .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            X_PAYMENT_RESPONSE_HEADER,
            HeaderValue::from_str(&receipt.to_string()).unwrap(),
        );

        let receipt = receipt_from_headers(&headers).unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.transaction.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_receipt_falls_back_to_v2_header() {
        let receipt = Base64Bytes::encode_json(&json!({"success": true, "txId": "7"})).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(X_PAYMENT_RESPONSE_HEADER, HeaderValue::from_static("%%%"));
        headers.insert(
            PAYMENT_RESPONSE_HEADER,
            HeaderValue::from_str(&receipt.to_string()).unwrap(),
        );

        let receipt = receipt_from_headers(&headers).unwrap();
        assert_eq!(receipt.other["txId"], "7");
    }

    #[test]
    fn test_malformed_receipt_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(X_PAYMENT_RESPONSE_HEADER, HeaderValue::from_static("bm90IGpzb24="));
        assert!(receipt_from_headers(&headers).is_none());
        assert!(receipt_from_headers(&HeaderMap::new()).is_none());
        assert!(decode_payment_response("bm90IGpzb24=").is_err());
    }
}

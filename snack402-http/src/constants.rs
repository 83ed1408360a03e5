//! HTTP-specific constants for the x402 V1 flow.

/// Header carrying the base64 payment authorization (client → server).
pub const X_PAYMENT_HEADER: &str = "X-PAYMENT";

/// Header carrying the base64 settlement receipt (server → client).
pub const X_PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

/// V2 name of the settlement receipt header, accepted as a fallback.
pub const PAYMENT_RESPONSE_HEADER: &str = "PAYMENT-RESPONSE";

/// HTTP 402 Payment Required status code.
pub const HTTP_STATUS_PAYMENT_REQUIRED: u16 = 402;

/// Snack Money API base URL.
pub const DEFAULT_SNACK_MONEY_URL: &str = "https://api.snack.money";

/// Path of the pay-an-X-user endpoint.
pub const X_PAY_PATH: &str = "/payments/x/pay";

/// thirdweb API base URL.
pub const DEFAULT_THIRDWEB_URL: &str = "https://api.thirdweb.com";

/// Default timeout for every HTTP request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

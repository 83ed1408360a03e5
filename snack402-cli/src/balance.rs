//! USDC balance lookup through an Alchemy-compatible token API.
//!
//! `GET {base}/getTokenBalances?address={owner}&tokens[]={token}` answers
//! `{"tokenBalances": [{"contractAddress": ..., "tokenBalance": "0x..."}]}`
//! with hex-encoded smallest-unit balances.

use alloy_primitives::{Address, U256};
use reqwest::Client;
use serde::Deserialize;
use snack402::amount::{MoneyAmount, USDC_DECIMALS, format_units};
use snack402::proto::TokenAmount;
use url::Url;

/// Public Base mainnet endpoint.
pub const DEFAULT_BALANCE_URL: &str = "https://base-mainnet.g.alchemy.com/v2/demo";

/// Errors fetching a balance.
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    /// The request failed or the response is not the expected JSON.
    #[error("balance request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The balance is not a hex integer.
    #[error("unreadable token balance '{0}'")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalances {
    #[serde(default)]
    token_balances: Vec<TokenBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalance {
    #[serde(default)]
    token_balance: Option<String>,
}

fn parse_hex_units(raw: &str) -> Result<TokenAmount, BalanceError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Ok(TokenAmount::default());
    }
    U256::from_str_radix(digits, 16)
        .map(TokenAmount)
        .map_err(|_| BalanceError::Malformed(raw.to_owned()))
}

/// Fetches the `token` balance of `owner`, in USDC units.
///
/// An absent entry counts as zero.
///
/// # Errors
///
/// Returns [`BalanceError`] if the API cannot be reached or answers garbage.
pub async fn usdc_balance(
    client: &Client,
    base_url: &Url,
    owner: Address,
    token: Address,
) -> Result<MoneyAmount, BalanceError> {
    let mut url = base_url.clone();
    let path = format!("{}/getTokenBalances", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.query_pairs_mut()
        .append_pair("address", &owner.to_string())
        .append_pair("tokens[]", &token.to_string());

    let balances: TokenBalances = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let units = match balances
        .token_balances
        .first()
        .and_then(|b| b.token_balance.as_deref())
    {
        Some(raw) => parse_hex_units(raw)?,
        None => TokenAmount::default(),
    };
    format_units(units, USDC_DECIMALS).ok_or_else(|| BalanceError::Malformed(units.to_string()))
}

//! Human-readable output on stdout.
//!
//! Logs go to stderr through `tracing`; this module prints the results a user
//! runs the tool for.

#![allow(clippy::print_stdout)] // user-facing output

use alloy_primitives::Address;
use snack402::PaymentReceipt;
use snack402_http::thirdweb::RequirementSummary;

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {e}>"))
}

/// Prints a successful payment: response body, receipt, receipt link.
pub fn payment_success(body: &serde_json::Value, receipt: Option<&PaymentReceipt>) {
    println!("Payment successful!");
    println!("\nResponse:\n{}", pretty(body));
    if let Some(receipt) = receipt {
        println!("\nPayment response details:\n{}", pretty(receipt));
    }
    if let Some(url) = snack402_http::snack::receipt_url(body) {
        println!("\nReceipt: {url}");
    }
}

/// Prints first-run instructions for a freshly created custodial account.
pub fn new_custodial_wallet(address: Address) {
    println!("New custodial wallet created!");
    println!("Wallet address: {address}");
    println!("\nSave this address to your .env file:");
    println!("  WALLET_ADDRESS={address}");
    println!("\nNext steps:");
    println!("  1. Copy the wallet address above");
    println!("  2. Paste it in your .env file as WALLET_ADDRESS");
    println!("  3. Fund this wallet with USDC on Base");
    println!("  4. Run the command again to make a payment");
}

/// Prints how to fund `address` with USDC `token` on Base.
pub fn funding_instructions(address: Address, token: Address) {
    println!("How to fund your wallet ({address}):");
    println!("  - Bridge USDC to Base: https://bridge.base.org");
    println!("  - Buy USDC on an exchange and withdraw to the Base network");
    println!("  - Send from another wallet: network Base Mainnet, token USDC ({token}), to {address}");
}

/// Prints the requirement a proxy could not pay.
pub fn unpaid_requirement(summary: &RequirementSummary) {
    println!("Payment required (402)");
    println!("\nPayment requirements:\n{summary}");
}

/// Prints the body a proxy relayed after paying.
pub fn proxy_success(status: u16, body: &serde_json::Value) {
    println!("Payment successful! (status {status})");
    println!("\nResponse:\n{}", pretty(body));
}

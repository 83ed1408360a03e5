//! Command-line client for Snack Money X payments.
//!
//! Sends USDC to an X user through `POST /payments/x/pay`, paying the HTTP 402
//! challenge with the wallet chosen on the command line.
//!
//! # Modules
//!
//! - [`config`] - Flags, environment variables and their validation
//! - [`commands`] - The payment flow for each wallet backend
//! - [`balance`] - USDC balance lookup for custodial accounts
//! - [`report`] - Results printed to stdout
//! - [`error`] - Run failures

pub mod balance;
pub mod commands;
pub mod config;
pub mod error;
pub mod report;

pub use config::{AppConfig, Cli};
pub use error::CliError;

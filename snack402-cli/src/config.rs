//! Command-line and environment configuration.
//!
//! Every setting can be given as a flag or through the environment (a `.env`
//! file in the working directory is loaded first). [`Cli::into_config`] turns
//! the raw strings into a validated [`AppConfig`] before anything touches the
//! network.
//!
//! # Environment Variables
//!
//! - `RECEIVER` - X handle to pay (required)
//! - `AMOUNT` - USDC amount (default: `0.01`)
//! - `SNACK_MONEY_URL` - API base URL (default: `https://api.snack.money`)
//! - `REQUEST_TIMEOUT_SECS` - Per-request HTTP timeout (default: `30`)
//! - `PRIVATE_KEY`, `NETWORK` - `private-key` wallet; hex for EVM networks,
//!   a base58 keypair for `solana` and `solana-devnet`
//! - `EVM_PRIVATE_KEY`, `EVM_TESTNET_PRIVATE_KEY`, `SVM_PRIVATE_KEY`, `SVM_NETWORK` -
//!   `multi-network` wallet
//! - `SOLANA_RPC_URL` - Solana JSON-RPC endpoint (default: the cluster's public endpoint)
//! - `CUSTODIAL_API_KEY`, `CUSTODIAL_API_URL`, `WALLET_ADDRESS` - `custodial` wallet; the URL
//!   must serve the provider-neutral contract documented on
//!   `snack402_evm::remote::CustodialWalletService`
//! - `CROSSMINT_API_KEY`, `WALLET_LOCATOR`, `SMART_WALLET_ADDRESS` - `smart-wallet` wallet
//! - `THIRDWEB_SECRET_KEY`, `WALLET_ADDRESS` - `thirdweb` proxy
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::fmt::{self, Debug, Formatter};
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use clap::{Args, Parser, Subcommand};
use snack402::amount::{MoneyAmount, MoneyAmountError, USDC_DECIMALS};
use snack402::proto::TokenAmount;
use snack402_evm::networks;
use snack402_evm::remote::SmartWalletService;
use snack402_http::constants::{
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SNACK_MONEY_URL, DEFAULT_THIRDWEB_URL,
};
use snack402_http::snack::{SnackMoneyApi, SnackRequestError, XPayRequest};
use snack402_svm::SolanaCluster;
use solana_keypair::Keypair;
use solana_signer::Signer;
use url::Url;

use crate::balance::DEFAULT_BALANCE_URL;

/// Name of the custodial account created on first use.
pub const DEFAULT_ACCOUNT_NAME: &str = "snack-money-x402";

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "snack402")]
#[command(about = "Send USDC to an X user through Snack Money, paying the HTTP 402 challenge")]
pub struct Cli {
    /// Payment settings.
    #[command(flatten)]
    pub payment: PaymentArgs,

    /// Wallet backend.
    #[command(subcommand)]
    pub wallet: WalletCommand,
}

/// What to pay and where.
#[derive(Args, Debug)]
pub struct PaymentArgs {
    /// X handle of the recipient
    #[arg(long, env = "RECEIVER", global = true)]
    pub receiver: Option<String>,

    /// Amount in USDC
    #[arg(long, env = "AMOUNT", default_value = "0.01", global = true)]
    pub amount: String,

    /// Note attached to the payment
    #[arg(long, global = true)]
    pub description: Option<String>,

    /// Snack Money API base URL
    #[arg(long, env = "SNACK_MONEY_URL", default_value = DEFAULT_SNACK_MONEY_URL, global = true)]
    pub snack_money_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, global = true)]
    pub request_timeout_secs: u64,
}

/// Which wallet pays.
#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    /// Sign locally with one private key
    PrivateKey {
        /// Hex private key, or a base58 keypair on Solana
        #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
        private_key: Option<String>,

        /// Network to pay on
        #[arg(long, env = "NETWORK", default_value = "base")]
        network: String,

        /// Solana JSON-RPC endpoint
        #[arg(long, env = "SOLANA_RPC_URL")]
        solana_rpc_url: Option<String>,
    },
    /// Sign with a mainnet key and a testnet key, whichever the server accepts
    MultiNetwork {
        /// Hex private key used on mainnets
        #[arg(long, env = "EVM_PRIVATE_KEY", hide_env_values = true)]
        evm_private_key: Option<String>,

        /// Hex private key used on testnets
        #[arg(long, env = "EVM_TESTNET_PRIVATE_KEY", hide_env_values = true)]
        evm_testnet_private_key: Option<String>,

        /// Base58 Solana keypair
        #[arg(long, env = "SVM_PRIVATE_KEY", hide_env_values = true)]
        svm_private_key: Option<String>,

        /// Solana cluster the keypair pays on
        #[arg(long, env = "SVM_NETWORK", default_value = "solana")]
        svm_network: String,

        /// Solana JSON-RPC endpoint
        #[arg(long, env = "SOLANA_RPC_URL")]
        solana_rpc_url: Option<String>,

        /// Networks to prefer when the server offers several, highest priority first
        #[arg(long = "prefer-network")]
        prefer: Vec<String>,
    },
    /// Sign through a custodial wallet service account
    Custodial {
        /// Service API key
        #[arg(long, env = "CUSTODIAL_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Base URL of a service implementing the custodial signing contract
        /// (`/accounts`, `/accounts/{address}/signatures`), usually an
        /// adapter in front of the custodian's own API
        #[arg(long, env = "CUSTODIAL_API_URL")]
        api_url: Option<String>,

        /// Address of the account created on a previous run
        #[arg(long, env = "WALLET_ADDRESS")]
        wallet_address: Option<String>,

        /// Account name to get or create
        #[arg(long, default_value = DEFAULT_ACCOUNT_NAME)]
        account_name: String,

        /// Token balance API (Alchemy-compatible)
        #[arg(long, env = "BALANCE_API_URL", default_value = DEFAULT_BALANCE_URL)]
        balance_url: String,
    },
    /// Sign through a smart contract wallet provider
    SmartWallet {
        /// Provider API key
        #[arg(long, env = "CROSSMINT_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Wallet locator
        #[arg(long, env = "WALLET_LOCATOR")]
        locator: Option<String>,

        /// On-chain address of the smart wallet
        #[arg(long, env = "SMART_WALLET_ADDRESS")]
        address: Option<String>,

        /// Provider API base URL
        #[arg(long, env = "CROSSMINT_API_URL", default_value = SmartWalletService::DEFAULT_BASE_URL)]
        api_url: String,
    },
    /// Let the thirdweb x402 proxy pay from a server wallet
    Thirdweb {
        /// thirdweb secret key
        #[arg(long, env = "THIRDWEB_SECRET_KEY", hide_env_values = true)]
        secret_key: Option<String>,

        /// Server wallet address
        #[arg(long, env = "WALLET_ADDRESS")]
        wallet_address: Option<String>,

        /// Most the proxy may pay, in USDC
        #[arg(long, default_value = "1")]
        max_value: String,

        /// thirdweb API base URL
        #[arg(long, env = "THIRDWEB_API_URL", default_value = DEFAULT_THIRDWEB_URL)]
        api_url: String,
    },
}

/// Invalid or missing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required setting is absent or blank.
    #[error("missing required setting {0}")]
    Missing(&'static str),
    /// A setting does not parse.
    #[error("invalid {name}: {reason}")]
    Invalid {
        /// Environment variable or flag name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// The amount is not a positive USDC value.
    #[error("invalid AMOUNT: {0}")]
    Amount(#[from] MoneyAmountError),
    /// The Snack Money request cannot be built.
    #[error(transparent)]
    Request(#[from] SnackRequestError),
    /// The network is neither an EVM network nor a Solana cluster.
    #[error("network '{0}' is not a supported EVM or Solana network")]
    UnsupportedNetwork(String),
}

/// Validated configuration.
#[derive(Debug)]
pub struct AppConfig {
    /// The payment to make.
    pub payment: PaymentConfig,
    /// The wallet paying it.
    pub wallet: WalletConfig,
}

/// The payment request.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Where to send it.
    pub api: SnackMoneyApi,
    /// What to send.
    pub request: XPayRequest,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

/// A Solana keypair and where it pays.
pub struct SolanaKeyConfig {
    /// The keypair.
    pub keypair: Keypair,
    /// The cluster it pays on.
    pub cluster: SolanaCluster,
    /// JSON-RPC endpoint of that cluster.
    pub rpc_url: Url,
}

impl Debug for SolanaKeyConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaKeyConfig")
            .field("pubkey", &self.keypair.pubkey())
            .field("cluster", &self.cluster)
            .field("rpc_url", &self.rpc_url.as_str())
            .finish_non_exhaustive()
    }
}

/// A local key for one chain family.
#[derive(Debug)]
pub enum LocalKey {
    /// An EVM private key.
    Evm(PrivateKeySigner),
    /// A Solana keypair.
    Solana(SolanaKeyConfig),
}

/// A validated wallet.
#[derive(Debug)]
pub enum WalletConfig {
    /// One local key on one network.
    PrivateKey {
        /// The key.
        signer: LocalKey,
        /// Network name, e.g. `base`.
        network: String,
    },
    /// Mainnet and testnet EVM keys, and a Solana keypair.
    MultiNetwork {
        /// EVM key for mainnets.
        mainnet: Option<PrivateKeySigner>,
        /// EVM key for testnets.
        testnet: Option<PrivateKeySigner>,
        /// Solana keypair.
        solana: Option<SolanaKeyConfig>,
        /// Preferred networks.
        prefer: Vec<String>,
    },
    /// Custodial account.
    Custodial(CustodialConfig),
    /// Smart contract wallet.
    SmartWallet(SmartWalletConfig),
    /// thirdweb proxy.
    Thirdweb(ThirdwebConfig),
}

/// Custodial wallet settings.
#[derive(Debug, Clone)]
pub struct CustodialConfig {
    /// Service API key.
    pub api_key: String,
    /// Service base URL.
    pub api_url: Url,
    /// Account name to get or create.
    pub account_name: String,
    /// Expected account address; `None` on first run.
    pub wallet_address: Option<Address>,
    /// Token balance API.
    pub balance_url: Url,
}

/// Smart wallet settings.
#[derive(Debug, Clone)]
pub struct SmartWalletConfig {
    /// Provider API key.
    pub api_key: String,
    /// Provider base URL.
    pub api_url: Url,
    /// Wallet locator.
    pub locator: String,
    /// Wallet address.
    pub address: Address,
}

/// thirdweb proxy settings.
#[derive(Debug, Clone)]
pub struct ThirdwebConfig {
    /// Secret key.
    pub secret_key: String,
    /// API base URL.
    pub api_url: Url,
    /// Server wallet address.
    pub wallet_address: Address,
    /// Most the proxy may pay, in USDC smallest units.
    pub max_value: TokenAmount,
    /// USDC contract the proxy pays with.
    pub asset: Address,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse<T>(value: &str, name: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn private_key(value: Option<String>, name: &'static str) -> Result<PrivateKeySigner, ConfigError> {
    let key = required(value, name)?;
    // Never echo the key itself.
    PrivateKeySigner::from_str(&key).map_err(|_| ConfigError::Invalid {
        name,
        reason: "not a 32-byte hex private key".to_owned(),
    })
}

fn optional_private_key(
    value: Option<String>,
    name: &'static str,
) -> Result<Option<PrivateKeySigner>, ConfigError> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => private_key(Some(v), name).map(Some),
        None => Ok(None),
    }
}

fn solana_key(
    value: Option<String>,
    name: &'static str,
    cluster: SolanaCluster,
    rpc_url: Option<String>,
) -> Result<SolanaKeyConfig, ConfigError> {
    let key = required(value, name)?;
    let keypair = snack402_svm::keypair_from_base58(&key).map_err(|_| ConfigError::Invalid {
        name,
        reason: "not a base58 Solana keypair".to_owned(),
    })?;
    let rpc_url = rpc_url
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| cluster.default_rpc_url().to_owned());
    Ok(SolanaKeyConfig {
        keypair,
        cluster,
        rpc_url: parse(&rpc_url, "SOLANA_RPC_URL")?,
    })
}

impl PaymentArgs {
    fn into_config(self) -> Result<PaymentConfig, ConfigError> {
        let receiver = required(self.receiver, "RECEIVER")?;
        let amount = MoneyAmount::parse_positive(&self.amount)?;
        // Reject amounts USDC cannot represent before anything is signed.
        amount.to_token_units(USDC_DECIMALS)?;
        let mut request = XPayRequest::new(amount, &receiver)?;
        if let Some(description) = self.description {
            request = request.with_description(description);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "REQUEST_TIMEOUT_SECS",
                reason: "must be positive".to_owned(),
            });
        }
        Ok(PaymentConfig {
            api: SnackMoneyApi::new(parse(&self.snack_money_url, "SNACK_MONEY_URL")?),
            request,
            timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

impl WalletCommand {
    fn into_config(self) -> Result<WalletConfig, ConfigError> {
        match self {
            Self::PrivateKey {
                private_key: key,
                network,
                solana_rpc_url,
            } => {
                let network = network.trim().to_owned();
                let signer = if networks::evm_chain_id(&network).is_some() {
                    LocalKey::Evm(private_key(key, "PRIVATE_KEY")?)
                } else if let Some(cluster) = SolanaCluster::from_network(&network) {
                    LocalKey::Solana(solana_key(key, "PRIVATE_KEY", cluster, solana_rpc_url)?)
                } else {
                    return Err(ConfigError::UnsupportedNetwork(network));
                };
                Ok(WalletConfig::PrivateKey { signer, network })
            }
            Self::MultiNetwork {
                evm_private_key,
                evm_testnet_private_key,
                svm_private_key,
                svm_network,
                solana_rpc_url,
                prefer,
            } => {
                let mainnet = optional_private_key(evm_private_key, "EVM_PRIVATE_KEY")?;
                let testnet = optional_private_key(evm_testnet_private_key, "EVM_TESTNET_PRIVATE_KEY")?;
                let solana = match svm_private_key.filter(|v| !v.trim().is_empty()) {
                    Some(key) => {
                        let cluster = SolanaCluster::from_network(svm_network.trim())
                            .ok_or_else(|| ConfigError::UnsupportedNetwork(svm_network.clone()))?;
                        Some(solana_key(Some(key), "SVM_PRIVATE_KEY", cluster, solana_rpc_url)?)
                    }
                    None => None,
                };
                if mainnet.is_none() && testnet.is_none() && solana.is_none() {
                    return Err(ConfigError::Missing("EVM_PRIVATE_KEY or SVM_PRIVATE_KEY"));
                }
                Ok(WalletConfig::MultiNetwork {
                    mainnet,
                    testnet,
                    solana,
                    prefer,
                })
            }
            Self::Custodial {
                api_key,
                api_url,
                wallet_address,
                account_name,
                balance_url,
            } => {
                let wallet_address = wallet_address
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| parse(&v, "WALLET_ADDRESS"))
                    .transpose()?;
                Ok(WalletConfig::Custodial(CustodialConfig {
                    api_key: required(api_key, "CUSTODIAL_API_KEY")?,
                    api_url: parse(&required(api_url, "CUSTODIAL_API_URL")?, "CUSTODIAL_API_URL")?,
                    account_name,
                    wallet_address,
                    balance_url: parse(&balance_url, "BALANCE_API_URL")?,
                }))
            }
            Self::SmartWallet {
                api_key,
                locator,
                address,
                api_url,
            } => Ok(WalletConfig::SmartWallet(SmartWalletConfig {
                api_key: required(api_key, "CROSSMINT_API_KEY")?,
                api_url: parse(&api_url, "CROSSMINT_API_URL")?,
                locator: required(locator, "WALLET_LOCATOR")?,
                address: parse(&required(address, "SMART_WALLET_ADDRESS")?, "SMART_WALLET_ADDRESS")?,
            })),
            Self::Thirdweb {
                secret_key,
                wallet_address,
                max_value,
                api_url,
            } => Ok(WalletConfig::Thirdweb(ThirdwebConfig {
                secret_key: required(secret_key, "THIRDWEB_SECRET_KEY")?,
                api_url: parse(&api_url, "THIRDWEB_API_URL")?,
                wallet_address: parse(&required(wallet_address, "WALLET_ADDRESS")?, "WALLET_ADDRESS")?,
                max_value: MoneyAmount::parse_positive(&max_value)?.to_token_units(USDC_DECIMALS)?,
                asset: networks::USDC_BASE,
            })),
        }
    }
}

impl Cli {
    /// Validates every setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first missing or invalid setting.
    pub fn into_config(self) -> Result<AppConfig, ConfigError> {
        Ok(AppConfig {
            payment: self.payment.into_config()?,
            wallet: self.wallet.into_config()?,
        })
    }
}

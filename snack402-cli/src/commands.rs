//! One payment per run, with the wallet picked on the command line.

use alloy_signer_local::PrivateKeySigner;
use reqwest::Client;
use snack402::amount::MoneyAmount;
use snack402::networks::{KNOWN_NETWORKS, is_testnet};
use snack402::selector::PreferNetwork;
use snack402::signer::{MultiNetworkSigner, ScopedSigner};
use snack402_evm::EvmSigner;
use snack402_evm::networks::{self, USDC_BASE};
use snack402_evm::remote::{CustodialWalletService, RemoteEvmSigner, SmartWalletService};
use snack402_http::client::{PaymentClient, PaymentHandler};
use snack402_http::snack::SnackRequestError;
use snack402_http::thirdweb::{ProxyOutcome, RequirementSummary, ThirdwebProxy};
use snack402_svm::SolanaSigner;
use snack402_svm::rpc::RpcClient;
use solana_keypair::Keypair;
use tracing::{info, warn};

use crate::balance;
use crate::config::{
    AppConfig, CustodialConfig, LocalKey, PaymentConfig, SolanaKeyConfig, ThirdwebConfig,
    WalletConfig,
};
use crate::error::CliError;
use crate::report;

/// Runs the configured payment.
///
/// Returns `Ok` after a successful payment, or after printing onboarding
/// instructions for a new custodial account.
///
/// # Errors
///
/// Returns [`CliError`] if any step fails.
pub async fn run(config: AppConfig) -> Result<(), CliError> {
    let AppConfig { payment, wallet } = config;
    let http = Client::builder().timeout(payment.timeout).build()?;

    match wallet {
        WalletConfig::PrivateKey {
            signer: LocalKey::Evm(key),
            network,
        } => {
            let signer = EvmSigner::new(key);
            info!(address = %signer.address(), %network, "Created signer");
            let mut scope = vec![network.clone()];
            scope.extend(networks::evm_chain_id(&network).map(networks::caip2));
            let signer = ScopedSigner::new(signer, scope);
            pay(http, &payment, PaymentHandler::new(signer)).await
        }
        WalletConfig::PrivateKey {
            signer: LocalKey::Solana(solana),
            network,
        } => {
            let signer = solana_signer(solana);
            info!(pubkey = %signer.pubkey(), %network, "Created signer");
            pay(http, &payment, PaymentHandler::new(signer)).await
        }
        WalletConfig::MultiNetwork {
            mainnet,
            testnet,
            solana,
            prefer,
        } => {
            let signer = multi_network_signer(mainnet, testnet, solana);
            info!(?signer, "Created multi-network signer");
            let mut handler = PaymentHandler::new(signer);
            if !prefer.is_empty() {
                handler = handler.with_selector(PreferNetwork::new(prefer));
            }
            pay(http, &payment, handler).await
        }
        WalletConfig::Custodial(custodial) => pay_custodial(http, &payment, custodial).await,
        WalletConfig::SmartWallet(smart) => {
            info!(address = %smart.address, locator = %smart.locator, "Using smart wallet");
            let service = SmartWalletService::new(
                http.clone(),
                &smart.api_url,
                &smart.api_key,
                smart.locator,
                smart.address,
            )?;
            let signer = RemoteEvmSigner::new(service);
            pay(http, &payment, PaymentHandler::new(signer)).await
        }
        WalletConfig::Thirdweb(thirdweb) => pay_through_proxy(http, &payment, thirdweb).await,
    }
}

/// EVM networks (names and CAIP-2 ids) on mainnet or testnet.
fn evm_networks(testnet: bool) -> Vec<String> {
    KNOWN_NETWORKS
        .iter()
        .filter(|n| n.namespace == "eip155" && is_testnet(n.name) == testnet)
        .flat_map(|n| [n.name.to_owned(), n.chain_id().to_string()])
        .collect()
}

fn solana_signer(solana: SolanaKeyConfig) -> SolanaSigner<Keypair, RpcClient> {
    SolanaSigner::with_rpc_url(solana.keypair, solana.rpc_url, solana.cluster)
}

fn multi_network_signer(
    mainnet: Option<PrivateKeySigner>,
    testnet: Option<PrivateKeySigner>,
    solana: Option<SolanaKeyConfig>,
) -> MultiNetworkSigner {
    let mut signer = MultiNetworkSigner::new();
    if let Some(key) = mainnet {
        signer = signer.with("mainnet", ScopedSigner::new(EvmSigner::new(key), evm_networks(false)));
    }
    if let Some(key) = testnet {
        signer = signer.with("testnet", ScopedSigner::new(EvmSigner::new(key), evm_networks(true)));
    }
    if let Some(solana) = solana {
        signer = signer.with(solana.cluster.network_name(), solana_signer(solana));
    }
    signer
}

async fn pay(http: Client, payment: &PaymentConfig, handler: PaymentHandler) -> Result<(), CliError> {
    let request = payment.api.pay_request(&payment.request)?;
    info!(
        amount = %payment.request.amount,
        receiver = %payment.request.receiver,
        "Sending USDC to X user"
    );

    let client = PaymentClient::with_handler(http, handler);
    let mut paid = client.send(request).await?.error_for_status().await?;
    let receipt = paid.receipt.take();
    let body: serde_json::Value = paid.json().await?;
    report::payment_success(&body, receipt.as_ref());
    Ok(())
}

async fn pay_custodial(
    http: Client,
    payment: &PaymentConfig,
    custodial: CustodialConfig,
) -> Result<(), CliError> {
    let service = CustodialWalletService::get_or_create_account(
        http.clone(),
        &custodial.api_url,
        &custodial.api_key,
        &custodial.account_name,
    )
    .await?;
    let address = service.address();

    let Some(expected) = custodial.wallet_address else {
        report::new_custodial_wallet(address);
        return Ok(());
    };
    if expected != address {
        return Err(CliError::AddressMismatch {
            expected,
            actual: address,
        });
    }
    info!(%address, "Custodial wallet connected");

    let balance = match balance::usdc_balance(&http, &custodial.balance_url, address, USDC_BASE).await {
        Ok(balance) => balance,
        Err(e) => {
            warn!(error = %e, "Could not fetch balance, assuming zero");
            MoneyAmount::default()
        }
    };
    info!(%balance, "Current USDC balance");

    let required = MoneyAmount::from(payment.request.amount);
    if balance < required {
        report::funding_instructions(address, USDC_BASE);
        return Err(CliError::InsufficientBalance { balance, required });
    }

    let signer = RemoteEvmSigner::new(service);
    pay(http, payment, PaymentHandler::new(signer)).await
}

async fn pay_through_proxy(
    http: Client,
    payment: &PaymentConfig,
    thirdweb: ThirdwebConfig,
) -> Result<(), CliError> {
    let proxy = ThirdwebProxy::with_base_url(
        http,
        thirdweb.api_url,
        &thirdweb.secret_key,
        thirdweb.wallet_address.to_string(),
    )?;
    let target = payment
        .api
        .pay_url()
        .map_err(SnackRequestError::from)?;
    info!(
        wallet = %thirdweb.wallet_address,
        amount = %payment.request.amount,
        receiver = %payment.request.receiver,
        "Paying through thirdweb proxy"
    );

    let outcome = proxy
        .fetch(
            &target,
            &payment.request,
            thirdweb.max_value,
            &thirdweb.asset.to_string(),
        )
        .await?;
    match outcome {
        ProxyOutcome::Paid { status, body } => {
            report::proxy_success(status.as_u16(), &body);
            Ok(())
        }
        ProxyOutcome::PaymentRequired { challenge } => {
            if let Some(first) = challenge.accepts.first() {
                report::unpaid_requirement(&RequirementSummary::from(first));
            }
            Err(CliError::ProxyPaymentRequired)
        }
        ProxyOutcome::Failed { status, body } => Err(CliError::ProxyFailed { status, body }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmartWalletConfig;
    use alloy_primitives::{Address, address};
    use serde_json::json;
    use snack402::encoding::Base64Bytes;
    use snack402::signer::SigningCapability;
    use snack402_http::snack::{SnackMoneyApi, XPayRequest};
    use snack402_svm::SolanaCluster;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{header_exists, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACCOUNT: Address = address!("00000000000000000000000000000000000000aa");
    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn payment(server: &MockServer, amount: &str) -> PaymentConfig {
        PaymentConfig {
            api: SnackMoneyApi::new(server.uri().parse().unwrap()),
            request: XPayRequest::new(MoneyAmount::parse_positive(amount).unwrap(), "jack").unwrap(),
            timeout: Duration::from_secs(5),
        }
    }

    fn custodial(server: &MockServer, wallet_address: Option<Address>) -> CustodialConfig {
        CustodialConfig {
            api_key: "key".into(),
            api_url: format!("{}/wallets", server.uri()).parse().unwrap(),
            account_name: "snack-money-x402".into(),
            wallet_address,
            balance_url: format!("{}/balances", server.uri()).parse().unwrap(),
        }
    }

    fn challenge() -> serde_json::Value {
        json!({"accepts": [{
            "maxAmountRequired": "10000",
            "payTo": "0x1111111111111111111111111111111111111111",
            "maxTimeoutSeconds": 60,
            "network": "base",
            "asset": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
            "extra": {"name": "USD Coin", "version": "2"}
        }]})
    }

    async fn mount_account(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/wallets/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"address": ACCOUNT})))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_balance(server: &MockServer, hex: &str) {
        Mock::given(method("GET"))
            .and(path("/balances/getTokenBalances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"tokenBalances": [{"tokenBalance": hex}]}),
            ))
            .mount(server)
            .await;
    }

    async fn mount_snack_money(server: &MockServer) {
        let receipt = Base64Bytes::encode_json(&json!({"success": true, "transaction": "0xfeed"})).unwrap();
        Mock::given(method("POST"))
            .and(path("/payments/x/pay"))
            .and(header_exists("X-PAYMENT"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-PAYMENT-RESPONSE", receipt.to_string())
                    .set_body_json(json!({"msg": "sent", "data": {"receipt": "https://snack.money/r/1"}})),
            )
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/payments/x/pay"))
            .respond_with(ResponseTemplate::new(402).set_body_json(challenge()))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_network_scopes() {
        let mainnets = evm_networks(false);
        assert!(mainnets.contains(&"base".to_owned()));
        assert!(mainnets.contains(&"eip155:8453".to_owned()));
        assert!(!mainnets.contains(&"base-sepolia".to_owned()));
        assert!(!mainnets.iter().any(|n| n.starts_with("solana")));

        let testnets = evm_networks(true);
        assert!(testnets.contains(&"base-sepolia".to_owned()));
        assert!(testnets.contains(&"eip155:84532".to_owned()));
        assert!(!testnets.contains(&"base".to_owned()));
    }

    #[test]
    fn test_testnet_key_never_pays_mainnet() {
        let key: PrivateKeySigner = KEY.parse().unwrap();
        let signer = multi_network_signer(None, Some(key), None);
        assert!(signer.supports_network("base-sepolia"));
        assert!(!signer.supports_network("base"));
    }

    #[test]
    fn test_solana_key_joins_multi_network() {
        let solana = SolanaKeyConfig {
            keypair: Keypair::new_from_array([5; 32]),
            cluster: SolanaCluster::Devnet,
            rpc_url: "http://127.0.0.1:8899".parse().unwrap(),
        };
        let signer = multi_network_signer(Some(KEY.parse().unwrap()), None, Some(solana));
        assert!(signer.supports_network("base"));
        assert!(signer.supports_network("solana-devnet"));
        assert!(signer.supports_network("solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1"));
        assert!(!signer.supports_network("solana"));
        assert!(!signer.supports_network("base-sepolia"));
    }

    #[tokio::test]
    async fn test_solana_key_cannot_pay_evm_challenge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402).set_body_json(challenge()))
            .expect(1)
            .mount(&server)
            .await;

        let config = AppConfig {
            payment: payment(&server, "0.01"),
            wallet: WalletConfig::PrivateKey {
                signer: LocalKey::Solana(SolanaKeyConfig {
                    keypair: Keypair::new_from_array([5; 32]),
                    cluster: SolanaCluster::Mainnet,
                    rpc_url: format!("{}/rpc", server.uri()).parse().unwrap(),
                }),
                network: "solana".into(),
            },
        };
        let err = run(config).await.unwrap_err();
        assert!(matches!(
            err,
            CliError::Payment(snack402_http::ClientError::NoCompatibleRequirement { .. })
        ));
    }

    #[tokio::test]
    async fn test_private_key_payment() {
        let server = MockServer::start().await;
        mount_snack_money(&server).await;

        let config = AppConfig {
            payment: payment(&server, "0.01"),
            wallet: WalletConfig::PrivateKey {
                signer: LocalKey::Evm(KEY.parse().unwrap()),
                network: "base".into(),
            },
        };
        run(config).await.unwrap();
    }

    #[tokio::test]
    async fn test_private_key_on_other_network_finds_nothing_to_pay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402).set_body_json(challenge()))
            .expect(1)
            .mount(&server)
            .await;

        let config = AppConfig {
            payment: payment(&server, "0.01"),
            wallet: WalletConfig::PrivateKey {
                signer: LocalKey::Evm(KEY.parse().unwrap()),
                network: "polygon".into(),
            },
        };
        let err = run(config).await.unwrap_err();
        assert!(matches!(
            err,
            CliError::Payment(snack402_http::ClientError::NoCompatibleRequirement { .. })
        ));
    }

    #[tokio::test]
    async fn test_custodial_onboarding_stops_before_paying() {
        let server = MockServer::start().await;
        mount_account(&server).await;

        let http = Client::new();
        pay_custodial(http, &payment(&server, "0.01"), custodial(&server, None))
            .await
            .unwrap();
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn test_custodial_address_mismatch() {
        let server = MockServer::start().await;
        mount_account(&server).await;

        let other = address!("00000000000000000000000000000000000000bb");
        let err = pay_custodial(Client::new(), &payment(&server, "0.01"), custodial(&server, Some(other)))
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::AddressMismatch { expected, actual } if expected == other && actual == ACCOUNT));
    }

    #[tokio::test]
    async fn test_custodial_insufficient_balance() {
        let server = MockServer::start().await;
        mount_account(&server).await;
        // 0.005 USDC
        mount_balance(&server, "0x1388").await;

        let err = pay_custodial(Client::new(), &payment(&server, "0.01"), custodial(&server, Some(ACCOUNT)))
            .await
            .unwrap_err();
        match err {
            CliError::InsufficientBalance { balance, required } => {
                assert_eq!(balance.to_string(), "0.005");
                assert_eq!(required.to_string(), "0.01");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_custodial_payment() {
        let server = MockServer::start().await;
        mount_account(&server).await;
        mount_balance(&server, "0xf4240").await;
        Mock::given(method("POST"))
            .and(path(format!("/wallets/accounts/{ACCOUNT}/signatures")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "sig-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/wallets/accounts/0x[0-9a-fA-F]+/signatures/sig-1$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"status": "completed", "signature": format!("0x{}", "22".repeat(65))}),
            ))
            .expect(1)
            .mount(&server)
            .await;
        mount_snack_money(&server).await;

        pay_custodial(Client::new(), &payment(&server, "0.01"), custodial(&server, Some(ACCOUNT)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_smart_wallet_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payments/x/pay"))
            .respond_with(ResponseTemplate::new(402).set_body_json(challenge()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/api/wallets/.+/signatures$"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .expect(1)
            .mount(&server)
            .await;

        let config = AppConfig {
            payment: payment(&server, "0.01"),
            wallet: WalletConfig::SmartWallet(SmartWalletConfig {
                api_key: "sk".into(),
                api_url: format!("{}/api/", server.uri()).parse().unwrap(),
                locator: "email:payer@example.com:evm-smart-wallet".into(),
                address: ACCOUNT,
            }),
        };
        let err = run(config).await.unwrap_err();
        assert!(matches!(
            err,
            CliError::Payment(snack402_http::ClientError::SigningFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_proxy_402_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payments/x402/fetch"))
            .respond_with(ResponseTemplate::new(402).set_body_json(challenge()))
            .expect(1)
            .mount(&server)
            .await;

        let thirdweb = ThirdwebConfig {
            secret_key: "sk".into(),
            api_url: server.uri().parse::<Url>().unwrap(),
            wallet_address: ACCOUNT,
            max_value: 1_000_000u64.into(),
            asset: USDC_BASE,
        };
        let err = pay_through_proxy(Client::new(), &payment(&server, "0.01"), thirdweb)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::ProxyPaymentRequired));
    }
}

//! Local-keypair signing for the Solana `exact` scheme.
//!
//! [`SolanaSigner`] builds the transfer transaction, signs it as the token
//! owner and leaves the fee payer's slot empty for the server to fill:
//!
//! 1. `SetComputeUnitLimit`, from a simulation of the transaction
//! 2. `SetComputeUnitPrice`, the lowest recent nonzero priority fee
//! 3. `TransferChecked` between associated token accounts
//!
//! SPL Token and Token-2022 mints are both supported.

use std::fmt::{self, Debug, Display, Formatter};

use snack402::proto::EXACT_SCHEME;
use snack402::signer::{BoxFuture, SigningCapability};
use snack402::{PaymentAuthorization, PaymentRequirements, SigningError};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_keypair::Keypair;
use solana_message::v0::Message as MessageV0;
use solana_message::{Hash, VersionedMessage};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;
use solana_transaction::Instruction;
use solana_transaction::versioned::VersionedTransaction;
use spl_token::solana_program::program_pack::Pack;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::exact::types::{ExactSolanaPayload, TransactionInt, associated_token_address, fee_payer};
use crate::networks::SolanaCluster;
use crate::rpc::RpcClientLike;

/// Compute unit limit used while simulating, before the real one is known.
const SIMULATION_COMPUTE_UNIT_LIMIT: u32 = 100_000;

/// Discriminator byte of `SetComputeUnitLimit`.
const SET_COMPUTE_UNIT_LIMIT_TAG: u8 = 2;

/// Mint information for SPL tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mint {
    /// Standard SPL Token mint.
    Token {
        /// Number of decimal places.
        decimals: u8,
    },
    /// SPL Token-2022 mint.
    Token2022 {
        /// Number of decimal places.
        decimals: u8,
    },
}

impl Mint {
    /// Returns the SPL Token program ID for this mint.
    #[must_use]
    pub fn token_program(&self) -> Pubkey {
        match self {
            Self::Token { .. } => spl_token::id(),
            Self::Token2022 { .. } => spl_token_2022::id(),
        }
    }

    /// Number of decimal places.
    #[must_use]
    pub const fn decimals(&self) -> u8 {
        match self {
            Self::Token { decimals } | Self::Token2022 { decimals } => *decimals,
        }
    }

    /// A `transferChecked` of `amount` from `source` to `destination` by `authority`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Signer`] if the token program rejects the arguments.
    pub fn transfer_checked(
        &self,
        mint: &Pubkey,
        source: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<Instruction, SigningError> {
        let program = self.token_program();
        match self {
            Self::Token { decimals } => spl_token::instruction::transfer_checked(
                &program,
                source,
                mint,
                destination,
                authority,
                &[],
                amount,
                *decimals,
            )
            .map_err(SigningError::signer),
            Self::Token2022 { decimals } => spl_token_2022::instruction::transfer_checked(
                &program,
                source,
                mint,
                destination,
                authority,
                &[],
                amount,
                *decimals,
            )
            .map_err(SigningError::signer),
        }
    }
}

/// Fetch mint information from the cluster.
///
/// # Errors
///
/// Returns [`SigningError::Service`] if the account cannot be fetched, and
/// [`SigningError::InvalidRequirements`] if it is not a token mint.
pub async fn fetch_mint<R: RpcClientLike>(mint: &Pubkey, rpc_client: &R) -> Result<Mint, SigningError> {
    let account = rpc_client
        .get_account(mint)
        .await
        .map_err(|e| SigningError::service(format!("failed to fetch mint {mint}: {e}")))?;
    if account.owner == spl_token::id() {
        let state =
            spl_token::state::Mint::unpack(&account.data).map_err(|e| unpack_error(mint, e))?;
        Ok(Mint::Token {
            decimals: state.decimals,
        })
    } else if account.owner == spl_token_2022::id() {
        let state = spl_token_2022::state::Mint::unpack(&account.data)
            .map_err(|e| unpack_error(mint, e))?;
        Ok(Mint::Token2022 {
            decimals: state.decimals,
        })
    } else {
        Err(SigningError::InvalidRequirements(format!(
            "{mint} is not a token mint (owner {})",
            account.owner
        )))
    }
}

fn unpack_error(mint: &Pubkey, err: impl Display) -> SigningError {
    SigningError::InvalidRequirements(format!("failed to unpack mint {mint}: {err}"))
}

/// The lowest nonzero recent priority fee, or 1 micro-lamport when there is none.
///
/// # Errors
///
/// Returns [`SigningError::Service`] if fee retrieval fails.
pub async fn get_priority_fee_micro_lamports<R: RpcClientLike>(
    rpc_client: &R,
    writeable_accounts: &[Pubkey],
) -> Result<u64, SigningError> {
    let recent_fees = rpc_client
        .get_recent_prioritization_fees(writeable_accounts)
        .await
        .map_err(SigningError::service)?;
    Ok(recent_fees
        .into_iter()
        .filter(|fee| *fee > 0)
        .min()
        .unwrap_or(1))
}

/// Update the first `set_compute_unit_limit` ix if it exists, else append a new one.
pub fn update_or_append_set_compute_unit_limit(ixs: &mut Vec<Instruction>, units: u32) {
    let new_ix = ComputeBudgetInstruction::set_compute_unit_limit(units);
    let existing = ixs.iter_mut().find(|ix| {
        ix.program_id == solana_compute_budget_interface::ID
            && ix.data.first().copied() == Some(SET_COMPUTE_UNIT_LIMIT_TAG)
    });
    if let Some(ix) = existing {
        *ix = new_ix;
    } else {
        ixs.push(new_ix);
    }
}

fn compile(
    fee_payer: &Pubkey,
    instructions: &[Instruction],
    recent_blockhash: Hash,
) -> Result<MessageV0, SigningError> {
    MessageV0::try_compile(fee_payer, instructions, &[], recent_blockhash)
        .map_err(|e| SigningError::signer(format!("cannot compile message: {e:?}")))
}

/// Estimate compute units by simulating `instructions` under a provisional limit.
///
/// # Errors
///
/// Returns [`SigningError::Service`] if simulation fails or reports no units.
pub async fn estimate_compute_units<R: RpcClientLike>(
    rpc_client: &R,
    fee_payer: &Pubkey,
    instructions: &[Instruction],
    recent_blockhash: Hash,
) -> Result<u32, SigningError> {
    let mut provisional = instructions.to_vec();
    update_or_append_set_compute_unit_limit(&mut provisional, SIMULATION_COMPUTE_UNIT_LIMIT);
    let message = VersionedMessage::V0(compile(fee_payer, &provisional, recent_blockhash)?);
    let tx = VersionedTransaction {
        signatures: vec![
            Signature::default();
            usize::from(message.header().num_required_signatures)
        ],
        message,
    };
    let units = rpc_client
        .simulate_compute_units(&tx)
        .await
        .map_err(SigningError::service)?
        .ok_or_else(|| SigningError::service("simulation returned no units consumed"))?;
    u32::try_from(units)
        .map_err(|_| SigningError::service(format!("simulation consumed {units} compute units")))
}

/// What a transfer pays: `amount` of `mint` to the token account of `pay_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferParams {
    /// Account that pays transaction fees and submits the transaction.
    pub fee_payer: Pubkey,
    /// Recipient wallet.
    pub pay_to: Pubkey,
    /// Token mint.
    pub mint: Pubkey,
    /// Amount in the token's smallest unit.
    pub amount: u64,
}

impl TransferParams {
    /// Extracts transfer parameters from requirements on a Solana cluster.
    ///
    /// An `asset` of `"usdc"` (any case) means the cluster's USDC mint.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::UnsupportedNetwork`] for non-Solana networks and
    /// [`SigningError::InvalidRequirements`] for malformed fields.
    pub fn from_requirements(requirements: &PaymentRequirements) -> Result<Self, SigningError> {
        if requirements.scheme != EXACT_SCHEME {
            return Err(SigningError::InvalidRequirements(format!(
                "scheme '{}' is not supported",
                requirements.scheme
            )));
        }
        let cluster = SolanaCluster::from_network(&requirements.network)
            .ok_or_else(|| SigningError::UnsupportedNetwork(requirements.network.clone()))?;
        let mint = if requirements.asset.eq_ignore_ascii_case("usdc") {
            cluster.usdc()
        } else {
            parse_pubkey("asset", &requirements.asset)?
        };
        let amount = u64::try_from(requirements.max_amount_required.0).map_err(|_| {
            SigningError::InvalidRequirements(format!(
                "amount {} does not fit an SPL token transfer",
                requirements.max_amount_required.0
            ))
        })?;
        Ok(Self {
            fee_payer: fee_payer(requirements)?,
            pay_to: parse_pubkey("payTo", &requirements.pay_to)?,
            mint,
            amount,
        })
    }
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, SigningError> {
    value
        .parse()
        .map_err(|e| SigningError::InvalidRequirements(format!("invalid {field} '{value}': {e}")))
}

/// Build and sign a Solana token transfer transaction.
///
/// Returns the base64-encoded transaction, signed by `signer` only.
///
/// # Errors
///
/// Returns [`SigningError`] if an RPC call fails or the transaction cannot be
/// built or signed.
#[cfg_attr(feature = "telemetry", instrument(name = "snack402.svm.build_transfer", skip_all, err, fields(mint = %params.mint, amount = params.amount)))]
pub async fn build_signed_transfer_transaction<S: Signer + Sync, R: RpcClientLike>(
    signer: &S,
    rpc_client: &R,
    params: &TransferParams,
) -> Result<String, SigningError> {
    let mint = fetch_mint(&params.mint, rpc_client).await?;
    let token_program = mint.token_program();
    let owner = signer.pubkey();
    let source_ata = associated_token_address(&owner, &token_program, &params.mint);
    let destination_ata = associated_token_address(&params.pay_to, &token_program, &params.mint);
    let transfer =
        mint.transfer_checked(&params.mint, &source_ata, &destination_ata, &owner, params.amount)?;

    let recent_blockhash = rpc_client
        .get_latest_blockhash()
        .await
        .map_err(SigningError::service)?;
    let fee = get_priority_fee_micro_lamports(
        rpc_client,
        &[params.fee_payer, destination_ata, source_ata],
    )
    .await?;

    let priced = vec![ComputeBudgetInstruction::set_compute_unit_price(fee), transfer];
    let units =
        estimate_compute_units(rpc_client, &params.fee_payer, &priced, recent_blockhash).await?;
    #[cfg(feature = "telemetry")]
    tracing::debug!(units, priority_fee = fee, "Compute budget estimated");

    let mut instructions = Vec::with_capacity(priced.len() + 1);
    instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(units));
    instructions.extend(priced);
    let message = compile(&params.fee_payer, &instructions, recent_blockhash)?;

    let tx = TransactionInt::new(VersionedTransaction {
        signatures: vec![],
        message: VersionedMessage::V0(message),
    });
    tx.sign_with_keypair(signer)
        .map_err(SigningError::signer)?
        .as_base64()
        .map_err(SigningError::signer)
}

/// Parses a base58 keypair as exported by Solana wallets (64 bytes: secret then public key).
///
/// # Errors
///
/// Returns [`SigningError::Signer`] if the text is not base58 or not a keypair.
/// The key material is never included in the message.
pub fn keypair_from_base58(encoded: &str) -> Result<Keypair, SigningError> {
    let bytes = bs58::decode(encoded.trim())
        .into_vec()
        .map_err(|_| SigningError::signer("private key is not valid base58"))?;
    Keypair::try_from(bytes.as_slice()).map_err(|_| {
        SigningError::signer(format!(
            "private key must be a 64-byte keypair, got {} bytes",
            bytes.len()
        ))
    })
}

/// A [`SigningCapability`] backed by a local Solana keypair.
///
/// Serves one cluster, the one its RPC endpoint belongs to.
pub struct SolanaSigner<S, R> {
    signer: S,
    rpc_client: R,
    cluster: SolanaCluster,
}

impl<S: Signer, R> Debug for SolanaSigner<S, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaSigner")
            .field("pubkey", &self.signer.pubkey())
            .field("cluster", &self.cluster)
            .finish_non_exhaustive()
    }
}

impl<S: Signer + Send + Sync, R: RpcClientLike> SolanaSigner<S, R> {
    /// Pays on `cluster`, reading chain state through `rpc_client`.
    pub const fn new(signer: S, rpc_client: R, cluster: SolanaCluster) -> Self {
        Self {
            signer,
            rpc_client,
            cluster,
        }
    }

    /// The wallet payments are made from.
    pub fn pubkey(&self) -> Pubkey {
        self.signer.pubkey()
    }

    /// The cluster this signer pays on.
    pub const fn cluster(&self) -> SolanaCluster {
        self.cluster
    }
}

impl<S: Signer + Send + Sync> SolanaSigner<S, RpcClient> {
    /// Pays on `cluster` through the JSON-RPC endpoint at `rpc_url`.
    ///
    /// No request is made until the first payment.
    pub fn with_rpc_url(signer: S, rpc_url: impl Into<String>, cluster: SolanaCluster) -> Self {
        Self::new(signer, RpcClient::new(rpc_url.into()), cluster)
    }
}

impl<S: Signer + Send + Sync, R: RpcClientLike> SigningCapability for SolanaSigner<S, R> {
    fn supports_network(&self, network: &str) -> bool {
        SolanaCluster::from_network(network) == Some(self.cluster)
    }

    fn authorize<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<PaymentAuthorization, SigningError>> {
        Box::pin(async move {
            if !self.supports_network(&requirements.network) {
                return Err(SigningError::UnsupportedNetwork(requirements.network.clone()));
            }
            let params = TransferParams::from_requirements(requirements)?;
            let transaction =
                build_signed_transfer_transaction(&self.signer, &self.rpc_client, &params).await?;
            ExactSolanaPayload { transaction }.into_authorization(requirements)
        })
    }
}

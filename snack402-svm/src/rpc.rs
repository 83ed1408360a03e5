//! The slice of Solana JSON-RPC a payer needs.
//!
//! [`RpcClientLike`] is implemented for the nonblocking [`RpcClient`] and for
//! `Arc`s of any implementation, so one connection can back several signers.

use std::future::Future;
use std::sync::Arc;

use solana_account::Account;
pub use solana_client::client_error::ClientError;
pub use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_message::Hash;
use solana_pubkey::Pubkey;
use solana_transaction::versioned::VersionedTransaction;

/// Read-only RPC calls used to build a payment transaction.
pub trait RpcClientLike: Send + Sync {
    /// Fetches an account.
    fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Account, ClientError>> + Send;

    /// The latest blockhash.
    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, ClientError>> + Send;

    /// Recent prioritization fees, in micro-lamports per compute unit, paid
    /// by transactions locking `addresses`.
    fn get_recent_prioritization_fees(
        &self,
        addresses: &[Pubkey],
    ) -> impl Future<Output = Result<Vec<u64>, ClientError>> + Send;

    /// Simulates an unsigned transaction and reports the compute units it consumed.
    ///
    /// Signatures are not verified and the blockhash is replaced, so the
    /// transaction may carry default signatures.
    fn simulate_compute_units(
        &self,
        transaction: &VersionedTransaction,
    ) -> impl Future<Output = Result<Option<u64>, ClientError>> + Send;
}

impl RpcClientLike for RpcClient {
    fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Account, ClientError>> + Send {
        Self::get_account(self, pubkey)
    }

    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, ClientError>> + Send {
        Self::get_latest_blockhash(self)
    }

    async fn get_recent_prioritization_fees(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<u64>, ClientError> {
        let fees = Self::get_recent_prioritization_fees(self, addresses).await?;
        Ok(fees.into_iter().map(|f| f.prioritization_fee).collect())
    }

    async fn simulate_compute_units(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Option<u64>, ClientError> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            ..RpcSimulateTransactionConfig::default()
        };
        let simulation = self
            .simulate_transaction_with_config(transaction, config)
            .await?;
        Ok(simulation.value.units_consumed)
    }
}

impl<T: RpcClientLike> RpcClientLike for Arc<T> {
    fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Account, ClientError>> + Send {
        (**self).get_account(pubkey)
    }

    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, ClientError>> + Send {
        (**self).get_latest_blockhash()
    }

    fn get_recent_prioritization_fees(
        &self,
        addresses: &[Pubkey],
    ) -> impl Future<Output = Result<Vec<u64>, ClientError>> + Send {
        (**self).get_recent_prioritization_fees(addresses)
    }

    fn simulate_compute_units(
        &self,
        transaction: &VersionedTransaction,
    ) -> impl Future<Output = Result<Option<u64>, ClientError>> + Send {
        (**self).simulate_compute_units(transaction)
    }
}

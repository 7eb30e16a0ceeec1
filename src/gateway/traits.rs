//! Gateway Layer - Core Traits
//!
//! Abstract interfaces to the ledger and to the signing capability.
//! Implementations: REST node client, in-memory ledger.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::AccountAddress;

use super::error::{GatewayResult, SignError};
use super::payload::{
    AccountResource, CommittedTransaction, EntryFunctionPayload, PendingTransaction,
    SignedTransaction, TableItemRequest,
};

/// Read-only access to account resources and table entries
#[async_trait]
pub trait ReadGateway: Send + Sync {
    /// Fetch a typed resource stored under `account`
    async fn get_account_resource(
        &self,
        account: &AccountAddress,
        resource_type: &str,
    ) -> GatewayResult<AccountResource>;

    /// Point-lookup of one table entry
    async fn get_table_item(
        &self,
        handle: &str,
        request: &TableItemRequest,
    ) -> GatewayResult<Value>;
}

/// Submission of signed operations and the finality wait
#[async_trait]
pub trait WriteGateway: Send + Sync {
    async fn submit(&self, txn: &SignedTransaction) -> GatewayResult<PendingTransaction>;

    /// Resolves once the ledger has committed or rejected the transaction.
    /// No timeout: callers cancel by dropping the future.
    async fn wait_for_transaction(
        &self,
        pending: &PendingTransaction,
    ) -> GatewayResult<CommittedTransaction>;
}

/// An already-authenticated wallet
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Identity every signed transaction is sent from
    fn account(&self) -> &AccountAddress;

    async fn sign(&self, payload: &EntryFunctionPayload) -> Result<SignedTransaction, SignError>;
}

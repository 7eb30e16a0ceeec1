//! Gateway Layer
//!
//! Everything that crosses the ledger boundary: reads, writes,
//! the signing capability, and the operation descriptors sent along.

mod error;
mod payload;
mod traits;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod rest;

pub use error::{GatewayError, GatewayResult, SignError};
#[cfg(any(test, feature = "memory"))]
pub use memory::{InMemoryLedger, MemorySigner};
pub use payload::{
    AccountResource, CommittedTransaction, EntryFunctionPayload, PendingTransaction,
    SignedTransaction, TableItemRequest, TodoCall, TodoModule, DEFAULT_MODULE_NAME,
};
pub use rest::RestGateway;
pub use traits::{ReadGateway, TransactionSigner, WriteGateway};

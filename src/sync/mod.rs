//! Synchronization Layer
//!
//! - list_sync: reads the ledger into the local snapshot
//! - mutation: confirmed writes and their local application

mod list_sync;
mod mutation;


pub use list_sync::{ListSynchronizer, SyncError};
pub use mutation::{MutationCoordinator, MutationError};

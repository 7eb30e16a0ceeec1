//! Ledger Todo Client
//!
//! Keeps a local view of an account's todo list stored on a ledger and
//! changes it only through signed, confirmed transactions.
//!
//! Layered architecture:
//! - domain: Core entities and wire encodings
//! - gateway: Ledger read/write access and the signing capability
//! - store: Shared snapshot, session and busy flag
//! - sync: List synchronizer and mutation coordinator
//! - commands: Entry points for the presentation layer

use std::sync::Arc;

use tokio::sync::Mutex;

pub mod commands;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod store;
pub mod sync;

use config::{ClientConfig, ConfigError};
use domain::TodoList;
use gateway::{ReadGateway, RestGateway, TodoModule, TransactionSigner, WriteGateway};
use store::ListStore;
use sync::{ListSynchronizer, MutationCoordinator, SyncError};

/// Application state shared across commands
pub struct AppState {
    pub store: Arc<ListStore>,
    pub synchronizer: ListSynchronizer,
    pub coordinator: MutationCoordinator,
    /// Text typed for the next task, kept until an add is confirmed
    pub draft: Mutex<String>,
}

impl AppState {
    pub fn new(
        read: Arc<dyn ReadGateway>,
        write: Arc<dyn WriteGateway>,
        module: TodoModule,
    ) -> Self {
        let store = Arc::new(ListStore::new());
        Self {
            synchronizer: ListSynchronizer::new(read, module.clone(), store.clone()),
            coordinator: MutationCoordinator::new(write, module, store.clone()),
            store,
            draft: Mutex::new(String::new()),
        }
    }

    /// State backed by a fullnode's REST API
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let module = config.module()?;
        let gateway = Arc::new(RestGateway::from_config(config));
        Ok(Self::new(gateway.clone(), gateway, module))
    }

    /// Make `signer`'s account the active identity and load its list
    pub async fn connect(&self, signer: Arc<dyn TransactionSigner>) -> Result<TodoList, SyncError> {
        let owner = signer.account().clone();
        self.store.switch_session(Some(signer)).await;
        self.draft.lock().await.clear();
        log::info!("connected {}", owner);
        self.synchronizer.refresh(&owner).await
    }

    /// Drop the active identity; pending confirmations are abandoned
    pub async fn disconnect(&self) {
        self.store.switch_session(None).await;
        self.draft.lock().await.clear();
        log::info!("disconnected");
    }
}

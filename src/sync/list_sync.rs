//! List Synchronizer
//!
//! Builds the authoritative snapshot of an account's list: one resource
//! read for existence and the task counter, then one table point-lookup per
//! task id in increasing order. The ledger has no range scan, so the read is
//! a bounded loop over `1..=task_counter`.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{u64_string, AccountAddress, Task, TodoList};
use crate::gateway::{GatewayError, ReadGateway, TableItemRequest, TodoModule};
use crate::store::{ListStore, Publish};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Failed to read list resource of {owner}: {source}")]
    Resource {
        owner: AccountAddress,
        #[source]
        source: GatewayError,
    },
    #[error("Failed to read task {task_id} of {owner}: {source}")]
    TableLookup {
        owner: AccountAddress,
        task_id: u64,
        #[source]
        source: GatewayError,
    },
    #[error("Malformed list data for {owner}: {message}")]
    Decode { owner: AccountAddress, message: String },
    #[error("Session changed while refreshing {owner}")]
    Superseded { owner: AccountAddress },
}

/// `data` of the TodoList resource; other fields are ignored
#[derive(Debug, Deserialize)]
struct ListResourceData {
    tasks: TableRef,
    #[serde(with = "u64_string")]
    task_counter: u64,
}

#[derive(Debug, Deserialize)]
struct TableRef {
    handle: String,
}

pub struct ListSynchronizer {
    read: Arc<dyn ReadGateway>,
    module: TodoModule,
    store: Arc<ListStore>,
}

impl ListSynchronizer {
    pub fn new(read: Arc<dyn ReadGateway>, module: TodoModule, store: Arc<ListStore>) -> Self {
        Self {
            read,
            module,
            store,
        }
    }

    /// Read `owner`'s list from the ledger without touching the store.
    ///
    /// A missing resource is the normal "no list yet" state. Any failure
    /// after the resource was found fails the whole read.
    pub async fn fetch(&self, owner: &AccountAddress) -> Result<TodoList, SyncError> {
        let resource_type = self.module.list_resource_type();
        let resource = match self.read.get_account_resource(owner, &resource_type).await {
            Ok(resource) => resource,
            Err(e) if e.is_not_found() => {
                log::info!("no todo list under {}", owner);
                return Ok(TodoList::absent(owner.clone()));
            }
            Err(source) => {
                return Err(SyncError::Resource {
                    owner: owner.clone(),
                    source,
                })
            }
        };

        let header: ListResourceData =
            serde_json::from_value(resource.data).map_err(|e| SyncError::Decode {
                owner: owner.clone(),
                message: e.to_string(),
            })?;

        let mut tasks = Vec::new();
        for task_id in 1..=header.task_counter {
            let request = TableItemRequest::task(&self.module, task_id);
            log::debug!("reading task {} of {}", task_id, owner);

            let value = self
                .read
                .get_table_item(&header.tasks.handle, &request)
                .await
                .map_err(|source| SyncError::TableLookup {
                    owner: owner.clone(),
                    task_id,
                    source,
                })?;

            let task: Task = serde_json::from_value(value).map_err(|e| SyncError::Decode {
                owner: owner.clone(),
                message: format!("task {}: {}", task_id, e),
            })?;
            if task.task_id != task_id {
                return Err(SyncError::Decode {
                    owner: owner.clone(),
                    message: format!("key {} holds task {}", task_id, task.task_id),
                });
            }
            tasks.push(task);
        }

        Ok(TodoList {
            owner: owner.clone(),
            exists: true,
            task_counter: header.task_counter,
            tasks,
        })
    }

    /// Fetch `owner`'s list and publish it as the current snapshot.
    ///
    /// `owner` must be the active account, and still be when the read
    /// completes; otherwise nothing is published. A mutation confirmed while
    /// the read was in flight makes the read outdated, and the list is read
    /// again. On error the previous snapshot stays in place.
    pub async fn refresh(&self, owner: &AccountAddress) -> Result<TodoList, SyncError> {
        loop {
            let stamp = self.store.stamp().await;
            if self.store.session().account() != Some(owner) {
                return Err(SyncError::Superseded {
                    owner: owner.clone(),
                });
            }

            let list = match self.fetch(owner).await {
                Ok(list) => list,
                Err(e) => {
                    log::warn!("refresh of {} failed, keeping last snapshot: {}", owner, e);
                    return Err(e);
                }
            };

            match self.store.publish(stamp, list.clone()).await {
                Publish::Published => {
                    log::info!(
                        "refreshed {}: exists={} tasks={}",
                        owner,
                        list.exists,
                        list.tasks.len()
                    );
                    return Ok(list);
                }
                Publish::Outdated => {
                    log::debug!("mutation confirmed during refresh of {}, reading again", owner);
                }
                Publish::SessionChanged => {
                    log::info!("discarding refresh of {}: session changed", owner);
                    return Err(SyncError::Superseded {
                        owner: owner.clone(),
                    });
                }
            }
        }
    }

    /// Refresh whichever account is active; `None` when disconnected
    pub async fn refresh_active(&self) -> Result<Option<TodoList>, SyncError> {
        let owner = match self.store.session().account() {
            Some(owner) => owner.clone(),
            None => return Ok(None),
        };
        self.refresh(&owner).await.map(Some)
    }
}

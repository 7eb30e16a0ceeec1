//! List Commands
//!
//! Snapshot access, refresh, busy flag and list creation.

use serde::{Deserialize, Serialize};

use crate::domain::TodoList;
use crate::AppState;

/// Display-ready row for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRow {
    pub task_id: u64,
    pub content: String,
    pub completed: bool,
    /// Abbreviated owner address
    pub owner_label: String,
}

/// Current snapshot (`None` while disconnected)
pub async fn get_list(state: &AppState) -> Result<Option<TodoList>, String> {
    Ok(state.store.snapshot().await)
}

/// Rows in task id order; empty when there is no list
pub async fn list_rows(state: &AppState) -> Result<Vec<TaskRow>, String> {
    let rows = state
        .store
        .snapshot()
        .await
        .map(|list| {
            list.tasks
                .into_iter()
                .map(|task| TaskRow {
                    task_id: task.task_id,
                    owner_label: task.owner.abbreviated(),
                    content: task.content,
                    completed: task.completed,
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(rows)
}

/// Whether the active account has a list
pub async fn has_list(state: &AppState) -> Result<bool, String> {
    Ok(state.store.snapshot().await.map(|l| l.exists).unwrap_or(false))
}

/// Re-read the active account's list from the ledger
pub async fn refresh_list(state: &AppState) -> Result<Option<TodoList>, String> {
    state
        .synchronizer
        .refresh_active()
        .await
        .map_err(|e| e.to_string())
}

/// True while a transaction is awaiting confirmation
pub fn is_busy(state: &AppState) -> bool {
    state.store.is_busy()
}

/// Create the active account's list
pub async fn create_list(state: &AppState) -> Result<(), String> {
    state
        .coordinator
        .create_list()
        .await
        .map_err(|e| e.to_string())
}

//! Task Commands
//!
//! Adding and completing tasks, plus the pending draft text.

use crate::domain::Task;
use crate::AppState;

/// Add a task with the given content
pub async fn add_task(state: &AppState, content: String) -> Result<Task, String> {
    state
        .coordinator
        .add_task(&content)
        .await
        .map_err(|e| e.to_string())
}

/// Complete a task; the id arrives as the decimal string the list shows
pub async fn complete_task(state: &AppState, task_id: String) -> Result<(), String> {
    let task_id = task_id
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("Invalid task id {:?}: {}", task_id, e))?;
    state
        .coordinator
        .complete_task(task_id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn set_draft(state: &AppState, text: String) -> Result<(), String> {
    *state.draft.lock().await = text;
    Ok(())
}

pub async fn get_draft(state: &AppState) -> Result<String, String> {
    Ok(state.draft.lock().await.clone())
}

/// Add the draft as a task; the draft is cleared only once confirmed
pub async fn submit_draft(state: &AppState) -> Result<Task, String> {
    let content = state.draft.lock().await.clone();
    let task = add_task(state, content.clone()).await?;

    let mut draft = state.draft.lock().await;
    // Keep anything typed while the transaction was pending
    if *draft == content {
        draft.clear();
    }
    Ok(task)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::commands::{
        connect_wallet, create_list, get_account, has_list, is_busy, list_rows,
    };
    use crate::domain::AccountAddress;
    use crate::gateway::{InMemoryLedger, MemorySigner, TodoModule, DEFAULT_MODULE_NAME};

    fn module() -> TodoModule {
        TodoModule::new(AccountAddress::parse("0x7").unwrap(), DEFAULT_MODULE_NAME)
    }

    async fn setup() -> (AppState, Arc<MemorySigner>) {
        let ledger = Arc::new(InMemoryLedger::new(module()));
        let state = AppState::new(ledger.clone(), ledger, module());
        let signer = Arc::new(MemorySigner::new(AccountAddress::parse("0xa11ce").unwrap()));
        connect_wallet(&state, signer.clone()).await.unwrap();
        (state, signer)
    }

    #[tokio::test]
    async fn test_full_flow_through_commands() {
        let (state, _) = setup().await;
        assert!(get_account(&state).is_some());
        assert!(!has_list(&state).await.unwrap());

        create_list(&state).await.unwrap();
        assert!(has_list(&state).await.unwrap());

        add_task(&state, "buy milk".to_string()).await.unwrap();
        complete_task(&state, "1".to_string()).await.unwrap();

        let rows = list_rows(&state).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content, "buy milk");
        assert!(rows[0].completed);
        assert!(rows[0].owner_label.starts_with("0x0000"));
        assert!(!is_busy(&state));
    }

    #[tokio::test]
    async fn test_draft_cleared_only_on_success() {
        let (state, signer) = setup().await;
        create_list(&state).await.unwrap();
        set_draft(&state, "walk dog".to_string()).await.unwrap();

        signer.decline_next();
        assert!(submit_draft(&state).await.is_err());
        assert_eq!(get_draft(&state).await.unwrap(), "walk dog");

        let task = submit_draft(&state).await.unwrap();
        assert_eq!(task.content, "walk dog");
        assert_eq!(get_draft(&state).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_bad_task_id_is_rejected() {
        let (state, _) = setup().await;
        create_list(&state).await.unwrap();
        let err = complete_task(&state, "abc".to_string()).await.unwrap_err();
        assert!(err.contains("Invalid task id"));
    }

    #[tokio::test]
    async fn test_errors_are_displayed() {
        let (state, _) = setup().await;
        let err = add_task(&state, "x".to_string()).await.unwrap_err();
        assert!(err.contains("has no todo list"));
    }
}

//! Session Commands
//!
//! Wallet connection changes.

use std::sync::Arc;

use crate::domain::{AccountAddress, TodoList};
use crate::gateway::TransactionSigner;
use crate::AppState;

/// Switch to the wallet's account and load its list
pub async fn connect_wallet(
    state: &AppState,
    signer: Arc<dyn TransactionSigner>,
) -> Result<TodoList, String> {
    state.connect(signer).await.map_err(|e| e.to_string())
}

pub async fn disconnect_wallet(state: &AppState) -> Result<(), String> {
    state.disconnect().await;
    Ok(())
}

/// Currently connected account, if any
pub fn get_account(state: &AppState) -> Option<AccountAddress> {
    state.store.session().account().cloned()
}

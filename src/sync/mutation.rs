//! Mutation Coordinator
//!
//! Runs the three state-changing intents (create list, add task, complete
//! task) with one protocol:
//!
//! 1. guard: connected identity, advisory preconditions on the snapshot
//! 2. set the busy flag (cleared on every exit path)
//! 3. build the entry-function payload
//! 4. sign, submit
//! 5. wait for finality, abandoning the wait if the session changes
//! 6. on success only, apply the change to the local snapshot
//!
//! Nothing is written locally before the ledger confirms, so a failed
//! intent leaves the snapshot exactly as it was.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use crate::domain::{AccountAddress, Task, TodoList};
use crate::gateway::{
    CommittedTransaction, GatewayError, PendingTransaction, SignError, TodoCall, TodoModule,
    WriteGateway,
};
use crate::store::{ListStore, Session};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("No account connected")]
    NotConnected,
    #[error("Account {0} has no todo list")]
    ListMissing(AccountAddress),
    #[error("Account {0} already has a todo list")]
    ListAlreadyExists(AccountAddress),
    #[error("Task {0} does not exist")]
    UnknownTask(u64),
    #[error("Task {0} is already completed")]
    AlreadyCompleted(u64),
    #[error("Another transaction is in progress")]
    Busy,
    #[error("Signing failed: {0}")]
    Signing(#[from] SignError),
    #[error("Submission failed: {0}")]
    Submission(GatewayError),
    #[error("Ledger rejected {hash}: {vm_status}")]
    Rejected { hash: String, vm_status: String },
    #[error("Session changed before {0} was confirmed")]
    Abandoned(String),
}

impl MutationError {
    /// Failures the ledger or the user produced, as opposed to local guards
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            MutationError::Signing(_)
                | MutationError::Submission(_)
                | MutationError::Rejected { .. }
        )
    }
}

impl From<GatewayError> for MutationError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Rejected { hash, vm_status } => {
                MutationError::Rejected { hash, vm_status }
            }
            other => MutationError::Submission(other),
        }
    }
}

/// The snapshot must belong to the account that is about to sign
fn check_owner(list: &TodoList, signer: &AccountAddress) -> Result<(), MutationError> {
    if list.owner == *signer {
        Ok(())
    } else {
        Err(MutationError::NotConnected)
    }
}

/// Advisory client-side checks; the ledger still validates everything
fn check_preconditions(list: &TodoList, call: &TodoCall) -> Result<(), MutationError> {
    match call {
        TodoCall::CreateList if list.exists => {
            Err(MutationError::ListAlreadyExists(list.owner.clone()))
        }
        TodoCall::CreateList => Ok(()),
        _ if !list.exists => Err(MutationError::ListMissing(list.owner.clone())),
        TodoCall::CreateTask { .. } => Ok(()),
        TodoCall::CompleteTask { task_id } => match list.find(*task_id) {
            None => Err(MutationError::UnknownTask(*task_id)),
            Some(task) if task.completed => Err(MutationError::AlreadyCompleted(*task_id)),
            Some(_) => Ok(()),
        },
    }
}

/// Resolves once the session epoch moves past `epoch`
async fn session_changed(rx: &mut watch::Receiver<Session>, epoch: u64) {
    let changed = rx.wait_for(|s| s.epoch != epoch).await.is_ok();
    if !changed {
        // Store dropped: the session can no longer change
        std::future::pending::<()>().await;
    }
}

pub struct MutationCoordinator {
    write: Arc<dyn WriteGateway>,
    module: TodoModule,
    store: Arc<ListStore>,
}

impl MutationCoordinator {
    pub fn new(write: Arc<dyn WriteGateway>, module: TodoModule, store: Arc<ListStore>) -> Self {
        Self {
            write,
            module,
            store,
        }
    }

    /// Initialize the connected account's list
    pub async fn create_list(&self) -> Result<(), MutationError> {
        self.run(TodoCall::CreateList, |list| list.exists = true).await
    }

    /// Append a task; returns it with the locally synthesized id
    pub async fn add_task(&self, content: &str) -> Result<Task, MutationError> {
        let content = content.to_string();
        let call = TodoCall::CreateTask {
            content: content.clone(),
        };
        self.run(call, move |list| list.push_confirmed(content)).await
    }

    /// Mark a task completed
    pub async fn complete_task(&self, task_id: u64) -> Result<(), MutationError> {
        self.run(TodoCall::CompleteTask { task_id }, move |list| {
            if let Some(task) = list.find_mut(task_id) {
                task.complete();
            }
        })
        .await
    }

    async fn run<R>(
        &self,
        call: TodoCall,
        apply: impl FnOnce(&mut TodoList) -> R,
    ) -> Result<R, MutationError> {
        let (session, list) = self.store.view().await;
        let signer = session.signer.clone().ok_or(MutationError::NotConnected)?;
        let list = list.ok_or(MutationError::NotConnected)?;
        check_owner(&list, signer.account())?;
        check_preconditions(&list, &call)?;

        let _busy = self.store.try_begin_mutation().ok_or(MutationError::Busy)?;
        let entry = call.entry_function();

        let payload = call.to_payload(&self.module);
        let signed = match signer.sign(&payload).await {
            Ok(signed) => signed,
            Err(e) => {
                log::warn!("{} not signed: {}", entry, e);
                return Err(e.into());
            }
        };

        let pending = self.write.submit(&signed).await.map_err(|e| {
            log::warn!("{} submission failed: {}", entry, e);
            MutationError::from(e)
        })?;
        log::info!("{} submitted as {}", entry, pending.hash);

        let committed = self.await_finality(session.epoch, &pending).await?;

        match self.store.apply(session.epoch, apply).await {
            Some(result) => {
                log::info!("{} confirmed at version {}", entry, committed.version);
                Ok(result)
            }
            None => {
                log::info!("{} confirmed after session change, not applied", entry);
                Err(MutationError::Abandoned(committed.hash))
            }
        }
    }

    async fn await_finality(
        &self,
        epoch: u64,
        pending: &PendingTransaction,
    ) -> Result<CommittedTransaction, MutationError> {
        let mut session_rx = self.store.subscribe_session();
        tokio::select! {
            result = self.write.wait_for_transaction(pending) => result.map_err(|e| {
                log::warn!("{} failed: {}", pending.hash, e);
                MutationError::from(e)
            }),
            _ = session_changed(&mut session_rx, epoch) => {
                log::info!("abandoning wait for {}: session changed", pending.hash);
                Err(MutationError::Abandoned(pending.hash.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> AccountAddress {
        AccountAddress::parse("0xc0ffee").unwrap()
    }

    #[test]
    fn test_create_list_requires_absence() {
        let absent = TodoList::absent(owner());
        let existing = TodoList::empty(owner());
        assert!(check_preconditions(&absent, &TodoCall::CreateList).is_ok());
        assert_eq!(
            check_preconditions(&existing, &TodoCall::CreateList),
            Err(MutationError::ListAlreadyExists(owner()))
        );
    }

    #[test]
    fn test_task_intents_require_list() {
        let absent = TodoList::absent(owner());
        let call = TodoCall::CreateTask {
            content: "x".to_string(),
        };
        assert_eq!(
            check_preconditions(&absent, &call),
            Err(MutationError::ListMissing(owner()))
        );
        assert_eq!(
            check_preconditions(&absent, &TodoCall::CompleteTask { task_id: 1 }),
            Err(MutationError::ListMissing(owner()))
        );
    }

    #[test]
    fn test_complete_requires_open_task() {
        let mut list = TodoList::empty(owner());
        list.push_confirmed("a".to_string());

        assert!(check_preconditions(&list, &TodoCall::CompleteTask { task_id: 1 }).is_ok());
        assert_eq!(
            check_preconditions(&list, &TodoCall::CompleteTask { task_id: 2 }),
            Err(MutationError::UnknownTask(2))
        );

        list.find_mut(1).unwrap().complete();
        assert_eq!(
            check_preconditions(&list, &TodoCall::CompleteTask { task_id: 1 }),
            Err(MutationError::AlreadyCompleted(1))
        );
    }

    #[test]
    fn test_snapshot_of_other_account_is_refused() {
        let list = TodoList::empty(owner());
        let other = AccountAddress::parse("0xbeef").unwrap();
        assert!(check_owner(&list, &owner()).is_ok());
        assert_eq!(check_owner(&list, &other), Err(MutationError::NotConnected));
    }

    #[test]
    fn test_rejection_maps_from_gateway() {
        let err = MutationError::from(GatewayError::Rejected {
            hash: "0x1".to_string(),
            vm_status: "abort".to_string(),
        });
        assert!(matches!(err, MutationError::Rejected { .. }));
        assert!(err.is_remote());

        let err = MutationError::from(GatewayError::Transport("reset".to_string()));
        assert!(matches!(err, MutationError::Submission(_)));
        assert!(!MutationError::Busy.is_remote());
    }
}

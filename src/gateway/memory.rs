//! In-Memory Ledger
//!
//! Executes the todolist module's rules against process-local state and
//! implements both gateways, so the synchronizer and coordinator can run
//! without a node. Transactions commit at submission; the finality wait
//! only observes the stored outcome and can be held back for tests.
//! Faults (submission errors, table lookup failures) can be injected.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{watch, Mutex};

use crate::domain::{AccountAddress, Task};

use super::error::{GatewayError, GatewayResult, SignError};
use super::payload::{
    AccountResource, CommittedTransaction, EntryFunctionPayload, PendingTransaction,
    SignedTransaction, TableItemRequest, TodoCall, TodoModule,
};
use super::traits::{ReadGateway, TransactionSigner, WriteGateway};

const E_NOT_INITIALIZED: (&str, u64) = ("E_NOT_INITIALIZED", 1);
const ETASK_DOESNT_EXIST: (&str, u64) = ("ETASK_DOESNT_EXIST", 2);
const ETASK_IS_COMPLETED: (&str, u64) = ("ETASK_IS_COMPLETED", 3);

struct ListRecord {
    handle: String,
    task_counter: u64,
    tasks: BTreeMap<u64, Task>,
}

#[derive(Default)]
struct LedgerState {
    lists: HashMap<AccountAddress, ListRecord>,
    outcomes: HashMap<String, Result<CommittedTransaction, String>>,
    failing_lookups: HashSet<(AccountAddress, u64)>,
    next_submit_error: Option<GatewayError>,
    next_handle: u64,
    next_hash: u64,
    version: u64,
}

impl LedgerState {
    fn abort(module: &TodoModule, (name, code): (&str, u64)) -> String {
        format!("Move abort in {}::{}: {}(0x{:x}): ", module.address, module.name, name, code)
    }

    /// Run one entry function as `sender`, returning the vm status on failure
    fn execute(
        &mut self,
        module: &TodoModule,
        sender: &AccountAddress,
        call: &TodoCall,
    ) -> Result<(), String> {
        match call {
            TodoCall::CreateList => {
                if self.lists.contains_key(sender) {
                    return Err(format!(
                        "Failed to move resource into {}: RESOURCE_ALREADY_EXISTS",
                        sender
                    ));
                }
                self.next_handle += 1;
                self.lists.insert(
                    sender.clone(),
                    ListRecord {
                        handle: format!("0x{:064x}", 0xab00_0000_u64 + self.next_handle),
                        task_counter: 0,
                        tasks: BTreeMap::new(),
                    },
                );
            }
            TodoCall::CreateTask { content } => {
                let list = self
                    .lists
                    .get_mut(sender)
                    .ok_or_else(|| Self::abort(module, E_NOT_INITIALIZED))?;
                list.task_counter += 1;
                let task = Task::new(sender.clone(), list.task_counter, content.clone());
                list.tasks.insert(task.task_id, task);
            }
            TodoCall::CompleteTask { task_id } => {
                let list = self
                    .lists
                    .get_mut(sender)
                    .ok_or_else(|| Self::abort(module, E_NOT_INITIALIZED))?;
                let task = list
                    .tasks
                    .get_mut(task_id)
                    .ok_or_else(|| Self::abort(module, ETASK_DOESNT_EXIST))?;
                if !task.complete() {
                    return Err(Self::abort(module, ETASK_IS_COMPLETED));
                }
            }
        }
        Ok(())
    }
}

pub struct InMemoryLedger {
    module: TodoModule,
    state: Mutex<LedgerState>,
    finality_held: watch::Sender<bool>,
    table_lookups: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new(module: TodoModule) -> Self {
        Self {
            module,
            state: Mutex::new(LedgerState::default()),
            finality_held: watch::Sender::new(false),
            table_lookups: AtomicUsize::new(0),
        }
    }

    pub fn module(&self) -> &TodoModule {
        &self.module
    }

    /// Commit a call on behalf of `sender` without going through a signer,
    /// as another client session would
    pub async fn execute_as(&self, sender: &AccountAddress, call: TodoCall) -> Result<(), String> {
        let mut state = self.state.lock().await;
        state.execute(&self.module, sender, &call)
    }

    /// Make the next `submit` fail with `error`
    pub async fn fail_next_submit(&self, error: GatewayError) {
        self.state.lock().await.next_submit_error = Some(error);
    }

    /// Make lookups of `owner`'s task `task_id` fail until cleared
    pub async fn fail_table_lookup(&self, owner: &AccountAddress, task_id: u64) {
        self.state
            .lock()
            .await
            .failing_lookups
            .insert((owner.clone(), task_id));
    }

    pub async fn clear_lookup_failures(&self) {
        self.state.lock().await.failing_lookups.clear();
    }

    /// Block every finality wait until `release_finality`
    pub fn hold_finality(&self) {
        self.finality_held.send_replace(true);
    }

    pub fn release_finality(&self) {
        self.finality_held.send_replace(false);
    }

    /// Number of table point-lookups served so far
    pub fn table_lookups(&self) -> usize {
        self.table_lookups.load(Ordering::SeqCst)
    }

    /// Ledger-side view of one task
    pub async fn task(&self, owner: &AccountAddress, task_id: u64) -> Option<Task> {
        let state = self.state.lock().await;
        state
            .lists
            .get(owner)
            .and_then(|l| l.tasks.get(&task_id))
            .cloned()
    }
}

#[async_trait]
impl ReadGateway for InMemoryLedger {
    async fn get_account_resource(
        &self,
        account: &AccountAddress,
        resource_type: &str,
    ) -> GatewayResult<AccountResource> {
        let state = self.state.lock().await;
        let list = state
            .lists
            .get(account)
            .filter(|_| resource_type == self.module.list_resource_type())
            .ok_or_else(|| GatewayError::NotFound(format!("{} under {}", resource_type, account)))?;

        Ok(AccountResource {
            resource_type: resource_type.to_string(),
            data: json!({
                "set_task_event": { "counter": list.task_counter.to_string() },
                "task_counter": list.task_counter.to_string(),
                "tasks": { "handle": list.handle },
            }),
        })
    }

    async fn get_table_item(
        &self,
        handle: &str,
        request: &TableItemRequest,
    ) -> GatewayResult<Value> {
        self.table_lookups.fetch_add(1, Ordering::SeqCst);

        if request.key_type != "u64" || request.value_type != self.module.task_type() {
            return Err(GatewayError::Api {
                status: 400,
                message: format!(
                    "unexpected table types {} -> {}",
                    request.key_type, request.value_type
                ),
            });
        }
        let key = request
            .key
            .as_str()
            .and_then(|k| k.parse::<u64>().ok())
            .ok_or_else(|| GatewayError::Api {
                status: 400,
                message: format!("bad u64 key {}", request.key),
            })?;

        let state = self.state.lock().await;
        let (owner, list) = state
            .lists
            .iter()
            .find(|(_, l)| l.handle == handle)
            .ok_or_else(|| GatewayError::NotFound(format!("table {}", handle)))?;

        if state.failing_lookups.contains(&(owner.clone(), key)) {
            return Err(GatewayError::Transport(format!(
                "connection reset reading {} key {}",
                handle, key
            )));
        }

        let task = list
            .tasks
            .get(&key)
            .ok_or_else(|| GatewayError::NotFound(format!("table item {} in {}", key, handle)))?;
        serde_json::to_value(task).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl WriteGateway for InMemoryLedger {
    async fn submit(&self, txn: &SignedTransaction) -> GatewayResult<PendingTransaction> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.next_submit_error.take() {
            return Err(error);
        }

        let call = TodoCall::from_payload(&self.module, &txn.payload)?;

        state.next_hash += 1;
        state.version += 1;
        let hash = format!("0x{:064x}", state.next_hash);
        let version = state.version;

        let outcome = match state.execute(&self.module, &txn.sender, &call) {
            Ok(()) => Ok(CommittedTransaction {
                hash: hash.clone(),
                version,
                vm_status: "Executed successfully".to_string(),
            }),
            Err(vm_status) => Err(vm_status),
        };
        state.outcomes.insert(hash.clone(), outcome);

        Ok(PendingTransaction { hash })
    }

    async fn wait_for_transaction(
        &self,
        pending: &PendingTransaction,
    ) -> GatewayResult<CommittedTransaction> {
        let mut held = self.finality_held.subscribe();
        // Sender lives as long as self, so this only returns once released
        let _ = held.wait_for(|h| !*h).await;

        let state = self.state.lock().await;
        match state.outcomes.get(&pending.hash) {
            Some(Ok(committed)) => Ok(committed.clone()),
            Some(Err(vm_status)) => Err(GatewayError::Rejected {
                hash: pending.hash.clone(),
                vm_status: vm_status.clone(),
            }),
            None => Err(GatewayError::NotFound(format!("transaction {}", pending.hash))),
        }
    }
}

/// Wallet stand-in: signs everything unless told to decline
pub struct MemorySigner {
    account: AccountAddress,
    decline_next: AtomicBool,
    sequence_number: AtomicU64,
}

impl MemorySigner {
    pub fn new(account: AccountAddress) -> Self {
        Self {
            account,
            decline_next: AtomicBool::new(false),
            sequence_number: AtomicU64::new(0),
        }
    }

    /// The next `sign` call behaves as if the user dismissed the prompt
    pub fn decline_next(&self) {
        self.decline_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransactionSigner for MemorySigner {
    fn account(&self) -> &AccountAddress {
        &self.account
    }

    async fn sign(&self, payload: &EntryFunctionPayload) -> Result<SignedTransaction, SignError> {
        if self.decline_next.swap(false, Ordering::SeqCst) {
            return Err(SignError::UserRejected);
        }
        let sequence_number = self.sequence_number.fetch_add(1, Ordering::SeqCst);

        Ok(SignedTransaction {
            sender: self.account.clone(),
            payload: payload.clone(),
            body: json!({
                "sender": self.account,
                "sequence_number": sequence_number.to_string(),
                "payload": payload,
                "signature": { "type": "in_memory_signature" },
            }),
        })
    }
}

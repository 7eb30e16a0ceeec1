//! Operation Descriptors
//!
//! Entry-function payloads for the todolist module and the wire types
//! that travel with a submission.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::{u64_string, AccountAddress};

use super::error::{GatewayError, GatewayResult};

pub const DEFAULT_MODULE_NAME: &str = "todolist";

/// Address + name of the on-ledger todolist module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoModule {
    pub address: AccountAddress,
    pub name: String,
}

impl TodoModule {
    pub fn new(address: AccountAddress, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
        }
    }

    fn qualify(&self, member: &str) -> String {
        format!("{}::{}::{}", self.address, self.name, member)
    }

    /// `<addr>::todolist::TodoList`
    pub fn list_resource_type(&self) -> String {
        self.qualify("TodoList")
    }

    /// `<addr>::todolist::Task`
    pub fn task_type(&self) -> String {
        self.qualify("Task")
    }

    pub fn function(&self, entry: &str) -> String {
        self.qualify(entry)
    }
}

/// One of the three state-changing entry points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoCall {
    CreateList,
    CreateTask { content: String },
    CompleteTask { task_id: u64 },
}

impl TodoCall {
    pub fn entry_function(&self) -> &'static str {
        match self {
            TodoCall::CreateList => "create_list",
            TodoCall::CreateTask { .. } => "create_task",
            TodoCall::CompleteTask { .. } => "complete_task",
        }
    }

    /// Ordered arguments; u64 travels as its decimal string
    pub fn arguments(&self) -> Vec<Value> {
        match self {
            TodoCall::CreateList => Vec::new(),
            TodoCall::CreateTask { content } => vec![json!(content)],
            TodoCall::CompleteTask { task_id } => vec![json!(task_id.to_string())],
        }
    }

    pub fn to_payload(&self, module: &TodoModule) -> EntryFunctionPayload {
        EntryFunctionPayload {
            function: module.function(self.entry_function()),
            type_arguments: Vec::new(),
            arguments: self.arguments(),
        }
    }

    /// Inverse of `to_payload`, used by ledger-side execution
    pub fn from_payload(
        module: &TodoModule,
        payload: &EntryFunctionPayload,
    ) -> GatewayResult<Self> {
        let malformed = |why: &str| GatewayError::Api {
            status: 400,
            message: format!("malformed payload for {}: {}", payload.function, why),
        };

        let call = if payload.function == module.function("create_list") {
            TodoCall::CreateList
        } else if payload.function == module.function("create_task") {
            let content = payload
                .arguments
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("expected content string"))?;
            TodoCall::CreateTask {
                content: content.to_string(),
            }
        } else if payload.function == module.function("complete_task") {
            let task_id = payload
                .arguments
                .first()
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| malformed("expected string-encoded u64 task id"))?;
            TodoCall::CompleteTask { task_id }
        } else {
            return Err(malformed("unknown entry function"));
        };

        if payload.arguments.len() != call.arguments().len() || !payload.type_arguments.is_empty() {
            return Err(malformed("wrong argument count"));
        }
        Ok(call)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "entry_function_payload")]
pub struct EntryFunctionPayload {
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
}

/// Signer output: the exact JSON body to submit plus what it carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub sender: AccountAddress,
    pub payload: EntryFunctionPayload,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedTransaction {
    pub hash: String,
    #[serde(with = "u64_string")]
    pub version: u64,
    pub vm_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub data: Value,
}

/// Body of a table point-lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableItemRequest {
    pub key_type: String,
    pub value_type: String,
    pub key: Value,
}

impl TableItemRequest {
    /// Lookup of one task by id (`u64` key, decimal string)
    pub fn task(module: &TodoModule, task_id: u64) -> Self {
        Self {
            key_type: "u64".to_string(),
            value_type: module.task_type(),
            key: json!(task_id.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> TodoModule {
        TodoModule::new(AccountAddress::parse("0x42").unwrap(), DEFAULT_MODULE_NAME)
    }

    #[test]
    fn test_payload_shape() {
        let payload = TodoCall::CompleteTask { task_id: 3 }.to_payload(&module());
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["type"], json!("entry_function_payload"));
        assert!(value["function"].as_str().unwrap().ends_with("::todolist::complete_task"));
        assert_eq!(value["arguments"], json!(["3"]));
        assert_eq!(value["type_arguments"], json!([]));
    }

    #[test]
    fn test_create_list_has_no_arguments() {
        let payload = TodoCall::CreateList.to_payload(&module());
        assert!(payload.arguments.is_empty());
    }

    #[test]
    fn test_payload_parses_back() {
        let m = module();
        for call in [
            TodoCall::CreateList,
            TodoCall::CreateTask { content: "buy milk".to_string() },
            TodoCall::CompleteTask { task_id: 9 },
        ] {
            assert_eq!(TodoCall::from_payload(&m, &call.to_payload(&m)).unwrap(), call);
        }
    }

    #[test]
    fn test_foreign_module_is_malformed() {
        let other = TodoModule::new(AccountAddress::parse("0x43").unwrap(), DEFAULT_MODULE_NAME);
        let payload = TodoCall::CreateList.to_payload(&other);
        assert!(matches!(
            TodoCall::from_payload(&module(), &payload),
            Err(GatewayError::Api { status: 400, .. })
        ));
    }

    #[test]
    fn test_task_lookup_request() {
        let req = TableItemRequest::task(&module(), 12);
        assert_eq!(req.key_type, "u64");
        assert_eq!(req.key, json!("12"));
        assert!(req.value_type.ends_with("::todolist::Task"));
    }
}

//! Task Entity
//!
//! One entry of an account's todo list, as stored in the ledger table.
//! Field names and encodings match the table value exactly:
//! `{ address, completed, content, task_id }` with `task_id` string-encoded.

use serde::{Deserialize, Serialize};

use super::address::AccountAddress;
use super::entity::Entity;

/// A todo entry keyed by its ledger-assigned sequence id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Owner of the list this task belongs to
    #[serde(rename = "address")]
    pub owner: AccountAddress,
    /// Monotone: never goes back to false
    pub completed: bool,
    pub content: String,
    /// 1-based, contiguous within the owner's list
    #[serde(with = "u64_string")]
    pub task_id: u64,
}

impl Task {
    /// A freshly created, incomplete task
    pub fn new(owner: AccountAddress, task_id: u64, content: String) -> Self {
        Self {
            owner,
            completed: false,
            content,
            task_id,
        }
    }

    /// Mark completed. Returns false if it already was.
    pub fn complete(&mut self) -> bool {
        let changed = !self.completed;
        self.completed = true;
        changed
    }
}

impl Entity for Task {
    type Id = u64;

    fn id(&self) -> Self::Id {
        self.task_id
    }
}

/// Ledger JSON encodes u64 as decimal strings; accept bare numbers too
pub(crate) mod u64_string {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        struct U64Visitor;

        impl<'de> Visitor<'de> for U64Visitor {
            type Value = u64;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an unsigned integer or its decimal string form")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
                Ok(v)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
                v.parse::<u64>().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(U64Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owner() -> AccountAddress {
        AccountAddress::parse("0xa11ce").unwrap()
    }

    #[test]
    fn test_task_creation() {
        let task = Task::new(owner(), 1, "buy milk".to_string());
        assert_eq!(task.id(), 1);
        assert!(!task.completed);
    }

    #[test]
    fn test_complete_is_one_way() {
        let mut task = Task::new(owner(), 1, "buy milk".to_string());
        assert!(task.complete());
        assert!(!task.complete());
        assert!(task.completed);
    }

    #[test]
    fn test_decodes_table_value() {
        let value = json!({
            "address": "0xa11ce",
            "completed": true,
            "content": "walk dog",
            "task_id": "7"
        });
        let task: Task = serde_json::from_value(value).unwrap();
        assert_eq!(task.task_id, 7);
        assert_eq!(task.owner, owner());
        assert!(task.completed);
    }

    #[test]
    fn test_encodes_task_id_as_string() {
        let task = Task::new(owner(), 12, "x".to_string());
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["task_id"], json!("12"));
        assert_eq!(value["address"], json!(owner().as_str()));
    }

    #[test]
    fn test_rejects_non_numeric_id() {
        let value = json!({
            "address": "0x1",
            "completed": false,
            "content": "x",
            "task_id": "one"
        });
        assert!(serde_json::from_value::<Task>(value).is_err());
    }
}

//! Domain Layer
//!
//! Entities of the ledger-backed todo list and their wire encodings.
//! No I/O lives here.

mod address;
mod entity;
mod task;
mod todo_list;

pub use address::AccountAddress;
pub use entity::{DomainError, DomainResult, Entity};
pub use task::Task;
pub use todo_list::TodoList;

pub(crate) use task::u64_string;

//! Todo List
//!
//! Local projection of one account's list: the resource header
//! (existence + counter) and the tasks read out of the backing table.

use serde::{Deserialize, Serialize};

use super::address::AccountAddress;
use super::entity::Entity;
use super::task::Task;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    pub owner: AccountAddress,
    /// Whether the owner has created a list on the ledger
    pub exists: bool,
    /// Highest assigned task id
    pub task_counter: u64,
    /// Ordered by task id, 1..=task_counter
    pub tasks: Vec<Task>,
}

impl TodoList {
    /// The normal state of an account that never created a list
    pub fn absent(owner: AccountAddress) -> Self {
        Self {
            owner,
            exists: false,
            task_counter: 0,
            tasks: Vec::new(),
        }
    }

    /// An existing list with no tasks yet
    pub fn empty(owner: AccountAddress) -> Self {
        Self {
            exists: true,
            ..Self::absent(owner)
        }
    }

    pub fn find(&self, task_id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == task_id)
    }

    pub fn find_mut(&mut self, task_id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id() == task_id)
    }

    /// Id the ledger is expected to assign to the next task
    pub fn next_task_id(&self) -> u64 {
        let max_local = self.tasks.iter().map(|t| t.task_id).max().unwrap_or(0);
        max_local.max(self.task_counter) + 1
    }

    /// Append a confirmed task under the locally synthesized id
    pub fn push_confirmed(&mut self, content: String) -> Task {
        let task = Task::new(self.owner.clone(), self.next_task_id(), content);
        self.task_counter = task.task_id;
        self.tasks.push(task.clone());
        task
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> AccountAddress {
        AccountAddress::parse("0xb0b").unwrap()
    }

    #[test]
    fn test_absent_list() {
        let list = TodoList::absent(owner());
        assert!(!list.exists);
        assert!(list.tasks.is_empty());
        assert_eq!(list.next_task_id(), 1);
    }

    #[test]
    fn test_push_confirmed_assigns_contiguous_ids() {
        let mut list = TodoList::empty(owner());
        let first = list.push_confirmed("a".to_string());
        let second = list.push_confirmed("b".to_string());

        assert_eq!(first.task_id, 1);
        assert_eq!(second.task_id, 2);
        assert_eq!(list.task_counter, 2);
        assert_eq!(second.owner, owner());
    }

    #[test]
    fn test_next_id_follows_counter() {
        let mut list = TodoList::empty(owner());
        list.task_counter = 4;
        assert_eq!(list.next_task_id(), 5);
    }

    #[test]
    fn test_find_and_pending_count() {
        let mut list = TodoList::empty(owner());
        list.push_confirmed("a".to_string());
        list.push_confirmed("b".to_string());
        list.find_mut(1).unwrap().complete();

        assert!(list.find(1).unwrap().completed);
        assert!(list.find(3).is_none());
        assert_eq!(list.pending_count(), 1);
    }
}

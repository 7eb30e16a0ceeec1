//! Shared List Store
//!
//! The one piece of state shared between the synchronizer, the mutation
//! coordinator and the presentation layer: the current snapshot, the active
//! session and the busy flag.
//!
//! Every session change bumps an epoch. Writers capture the epoch before
//! suspending and only publish if it is still current, so results that
//! arrive after an account switch are dropped.
//!
//! Every confirmed mutation applied to the snapshot bumps a generation. A
//! refresh captures it together with the epoch and may only publish over the
//! snapshot it started from.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::domain::{AccountAddress, TodoList};
use crate::gateway::TransactionSigner;

/// Active identity and the capability that signs for it
#[derive(Clone, Default)]
pub struct Session {
    pub signer: Option<Arc<dyn TransactionSigner>>,
    pub epoch: u64,
}

impl Session {
    pub fn account(&self) -> Option<&AccountAddress> {
        self.signer.as_ref().map(|s| s.account())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account())
            .field("epoch", &self.epoch)
            .finish()
    }
}

/// Point in the store's history a read started from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub epoch: u64,
    pub generation: u64,
}

/// Result of [`ListStore::publish`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    Published,
    /// The session switched since the stamp was taken
    SessionChanged,
    /// A confirmed mutation was applied since the stamp was taken
    Outdated,
}

#[derive(Default)]
struct Slot {
    list: Option<TodoList>,
    generation: u64,
}

pub struct ListStore {
    list: RwLock<Slot>,
    session: watch::Sender<Session>,
    busy: watch::Sender<bool>,
}

impl Default for ListStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ListStore {
    pub fn new() -> Self {
        Self {
            list: RwLock::new(Slot::default()),
            session: watch::Sender::new(Session::default()),
            busy: watch::Sender::new(false),
        }
    }

    // ========================
    // Snapshot
    // ========================

    /// Current snapshot, `None` while no account is connected
    pub async fn snapshot(&self) -> Option<TodoList> {
        self.list.read().await.list.clone()
    }

    /// Session and snapshot as seen together. A session switch holds the
    /// snapshot lock, so the two always belong to the same account.
    pub async fn view(&self) -> (Session, Option<TodoList>) {
        let guard = self.list.read().await;
        (self.session(), guard.list.clone())
    }

    /// Capture the current epoch and generation before reading the ledger
    pub async fn stamp(&self) -> Stamp {
        let guard = self.list.read().await;
        Stamp {
            epoch: self.epoch(),
            generation: guard.generation,
        }
    }

    /// Replace the snapshot if nothing happened to it since `stamp`
    pub async fn publish(&self, stamp: Stamp, list: TodoList) -> Publish {
        let mut guard = self.list.write().await;
        if self.epoch() != stamp.epoch {
            return Publish::SessionChanged;
        }
        if guard.generation != stamp.generation {
            return Publish::Outdated;
        }
        guard.list = Some(list);
        Publish::Published
    }

    /// Mutate the snapshot in place if `epoch` is still current
    pub async fn apply<R>(&self, epoch: u64, f: impl FnOnce(&mut TodoList) -> R) -> Option<R> {
        let mut guard = self.list.write().await;
        if self.epoch() != epoch {
            return None;
        }
        let result = guard.list.as_mut().map(f);
        if result.is_some() {
            guard.generation += 1;
        }
        result
    }

    // ========================
    // Session
    // ========================

    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn epoch(&self) -> u64 {
        self.session.borrow().epoch
    }

    pub fn subscribe_session(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Switch to a new identity (or none). The snapshot resets to the new
    /// owner's "no list" state until a refresh says otherwise.
    pub async fn switch_session(&self, signer: Option<Arc<dyn TransactionSigner>>) -> u64 {
        let mut guard = self.list.write().await;
        guard.list = signer.as_ref().map(|s| TodoList::absent(s.account().clone()));

        let mut epoch = 0;
        self.session.send_modify(|session| {
            session.epoch += 1;
            session.signer = signer;
            epoch = session.epoch;
        });
        epoch
    }

    // ========================
    // Busy flag
    // ========================

    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    pub fn subscribe_busy(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    /// Set the busy flag unless already set. The flag clears when the
    /// returned guard drops, including when the mutation future is dropped.
    pub fn try_begin_mutation(&self) -> Option<BusyGuard<'_>> {
        let acquired = self.busy.send_if_modified(|busy| {
            if *busy {
                false
            } else {
                *busy = true;
                true
            }
        });
        acquired.then(|| BusyGuard { busy: &self.busy })
    }
}

pub struct BusyGuard<'a> {
    busy: &'a watch::Sender<bool>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.send_replace(false);
    }
}

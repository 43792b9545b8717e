//! Listener bookkeeping and one-shot cleanup
//!
//! Transient UI (the preview modal) registers its listeners here instead of
//! on the document directly. Whatever tears the UI down calls the attached
//! [`Disposer`], which releases those registrations exactly once no matter
//! how many close paths race to it.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerKind {
    Keydown,
}

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next: u64,
    active: BTreeMap<ListenerId, ListenerKind>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ListenerKind) -> ListenerId {
        self.next += 1;
        let id = ListenerId(self.next);
        self.active.insert(id, kind);
        id
    }

    /// Returns false if the listener was already gone
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        self.active.remove(&id).is_some()
    }

    pub fn is_active(&self, id: ListenerId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn active_count(&self, kind: ListenerKind) -> usize {
        self.active.values().filter(|k| **k == kind).count()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

type DisposeFn = Box<dyn FnOnce(&mut ListenerRegistry)>;

/// Cleanup attached to a transient instance at creation time
pub struct Disposer {
    action: Option<DisposeFn>,
}

impl Disposer {
    pub fn new(action: impl FnOnce(&mut ListenerRegistry) + 'static) -> Self {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// Run the cleanup if it has not run yet. Returns whether it ran.
    pub fn dispose(&mut self, registry: &mut ListenerRegistry) -> bool {
        match self.action.take() {
            Some(action) => {
                action(registry);
                true
            }
            None => false,
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.action.is_none()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

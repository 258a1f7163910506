//! Single owner of the chat state.
//!
//! All mutation funnels through [`ChatStore::dispatch`], which applies the
//! reducer under the channel's write lock, so transitions land one at a time
//! no matter how many tasks resolve concurrently. Readers take snapshots or
//! subscribe to change notifications.

use std::sync::Arc;

use tokio::sync::watch;

use crate::state::{reduce, ChatAction, ChatState};

#[derive(Debug, Clone)]
pub struct ChatStore {
    tx: Arc<watch::Sender<ChatState>>,
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ChatState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn dispatch(&self, action: ChatAction) {
        self.dispatch_with(|_| action);
    }

    /// Build an action from the current state and apply it in one step.
    ///
    /// Updates that depend on existing values (score increments, list
    /// appends) go through here so they never read a stale state.
    pub fn dispatch_with<F>(&self, build: F)
    where
        F: FnOnce(&ChatState) -> ChatAction,
    {
        self.tx.send_modify(|state| {
            let action = build(state);
            tracing::trace!(?action, "dispatch");
            let current = std::mem::take(state);
            *state = reduce(current, action);
        });
    }

    pub fn snapshot(&self) -> ChatState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.tx.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().is_loading
    }

    pub fn voice_enabled(&self) -> bool {
        self.tx.borrow().voice_enabled
    }
}

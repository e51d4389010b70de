//! Runtime readiness signal
//!
//! Some targets only exist while a game session is running (their owning
//! objects are created on connect and destroyed on disconnect). The session
//! signal tells subscribers when that environment appears and disappears.
//! Callbacks are stored in a slotmap like every other listener registry in
//! this workspace and invoked synchronously.

use std::sync::Arc;

use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};

use crate::environment::Environment;
use crate::error::EnvironmentError;

new_key_type! {
    /// Key for a session subscription, used for removal
    pub struct SubscriptionKey;
}

/// Notification delivered to session subscribers
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session environment became available
    Started(Arc<Environment>),
    /// The session environment went away
    Ended,
}

type SessionCallback = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Broadcasts session start/end to subscribers
pub struct SessionSignal {
    subscribers: RwLock<SlotMap<SubscriptionKey, SessionCallback>>,
    active: RwLock<Option<Arc<Environment>>>,
}

impl Default for SessionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSignal {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(SlotMap::with_key()),
            active: RwLock::new(None),
        }
    }

    /// Subscribe to session events
    ///
    /// If a session is already running the callback receives `Started`
    /// immediately, so late subscribers never miss the current session.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionKey
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let callback: SessionCallback = Arc::new(callback);
        let key = self.subscribers.write().insert(callback.clone());

        let active = self.active.read().clone();
        if let Some(env) = active {
            callback(&SessionEvent::Started(env));
        }

        key
    }

    /// Remove a subscription
    ///
    /// # Returns
    /// `true` if the subscription was found and removed
    pub fn unsubscribe(&self, key: SubscriptionKey) -> bool {
        self.subscribers.write().remove(key).is_some()
    }

    /// Announce that a session started
    pub fn start(&self, env: Arc<Environment>) -> Result<(), EnvironmentError> {
        {
            let mut active = self.active.write();
            if active.is_some() {
                return Err(EnvironmentError::SessionAlreadyActive);
            }
            *active = Some(env.clone());
        }

        tracing::info!("Session started");
        self.fire(&SessionEvent::Started(env));
        Ok(())
    }

    /// Announce that the session ended
    ///
    /// # Returns
    /// `false` if no session was active
    pub fn end(&self) -> bool {
        if self.active.write().take().is_none() {
            return false;
        }

        tracing::info!("Session ended");
        self.fire(&SessionEvent::Ended);
        true
    }

    /// Environment of the running session
    pub fn current(&self) -> Option<Arc<Environment>> {
        self.active.read().clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.read().is_some()
    }

    /// Number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn fire(&self, event: &SessionEvent) {
        // Snapshot so callbacks may subscribe or unsubscribe while firing
        let callbacks: Vec<SessionCallback> =
            self.subscribers.read().values().cloned().collect();

        for callback in callbacks {
            callback(event);
        }
    }
}

/// Edge reported by [`SessionTracker::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    Started,
    Ended,
}

/// Turns a per-tick "in game" flag into start/end edges
#[derive(Debug, Default)]
pub struct SessionTracker {
    in_game: bool,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current in-game state, returning the edge if it changed
    pub fn poll(&mut self, in_game: bool) -> Option<SessionTransition> {
        if in_game == self.in_game {
            return None;
        }

        self.in_game = in_game;
        Some(if in_game {
            SessionTransition::Started
        } else {
            SessionTransition::Ended
        })
    }

    pub fn in_game(&self) -> bool {
        self.in_game
    }
}

//! Session Store Collaborator
//!
//! The pipeline never owns session persistence; it talks to the host's
//! store through [`SessionStore`]. Flash messages follow the classic
//! one-hop contract: queued messages are delivered to the next request
//! and dropped after it, unless `keep_flash` re-arms them across one
//! more redirect.

use crate::model::UserId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Severity of a flash message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashKind {
    /// Informational
    Notice,
    /// Something the user should act on
    Warning,
    /// A failure the user must see
    Error,
}

/// A message carried across at most one redirect hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    /// Severity
    pub kind: FlashKind,
    /// Translation key of the message text
    pub text: String,
}

impl FlashMessage {
    /// Warning flash
    pub fn warning(text: &str) -> Self {
        Self {
            kind: FlashKind::Warning,
            text: text.to_string(),
        }
    }

    /// Error flash
    pub fn error(text: &str) -> Self {
        Self {
            kind: FlashKind::Error,
            text: text.to_string(),
        }
    }
}

/// External session store interface
pub trait SessionStore: Send + Sync {
    /// Signed-in user, if any
    fn identity(&self) -> Option<UserId>;

    /// Establish a session identity
    fn set_identity(&self, user_id: UserId);

    /// Drop the session identity
    fn clear_identity(&self);

    /// Queue a flash message for the next request
    fn push_flash(&self, message: FlashMessage);

    /// Messages delivered to the current request
    fn current_flash(&self) -> Vec<FlashMessage>;

    /// Re-queue the current messages so they survive one more redirect
    fn keep_flash(&self);

    /// Called by the host at request start: promote queued messages to
    /// current and drop the previous generation
    fn rotate_flash(&self);

    /// Remember a pending invitation code across the join redirect
    fn set_invitation_code(&self, code: &str);

    /// Take (and clear) the pending invitation code
    fn take_invitation_code(&self) -> Option<String>;

    /// Park an analytics event for the next page load
    fn set_analytics_event(&self, event: serde_json::Value);

    /// Take (and clear) the parked analytics event
    fn take_analytics_event(&self) -> Option<serde_json::Value>;
}

#[derive(Default)]
struct SessionState {
    identity: Option<UserId>,
    queued_flash: Vec<FlashMessage>,
    current_flash: Vec<FlashMessage>,
    invitation_code: Option<String>,
    analytics_event: Option<serde_json::Value>,
}

/// In-memory session, one per simulated client
#[derive(Default)]
pub struct MemorySession {
    state: Mutex<SessionState>,
}

impl MemorySession {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySession {
    fn identity(&self) -> Option<UserId> {
        self.state.lock().identity
    }

    fn set_identity(&self, user_id: UserId) {
        self.state.lock().identity = Some(user_id);
    }

    fn clear_identity(&self) {
        self.state.lock().identity = None;
    }

    fn push_flash(&self, message: FlashMessage) {
        self.state.lock().queued_flash.push(message);
    }

    fn current_flash(&self) -> Vec<FlashMessage> {
        self.state.lock().current_flash.clone()
    }

    fn keep_flash(&self) {
        let mut state = self.state.lock();
        let kept = state.current_flash.clone();
        state.queued_flash.extend(kept);
    }

    fn rotate_flash(&self) {
        let mut state = self.state.lock();
        state.current_flash = std::mem::take(&mut state.queued_flash);
    }

    fn set_invitation_code(&self, code: &str) {
        self.state.lock().invitation_code = Some(code.to_string());
    }

    fn take_invitation_code(&self) -> Option<String> {
        self.state.lock().invitation_code.take()
    }

    fn set_analytics_event(&self, event: serde_json::Value) {
        self.state.lock().analytics_event = Some(event);
    }

    fn take_analytics_event(&self) -> Option<serde_json::Value> {
        self.state.lock().analytics_event.take()
    }
}

//! Transient user-facing notifications.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { level, title: title.into(), description: description.into() }
    }

    pub fn signed_in() -> Self {
        Self::new(NotificationLevel::Success, "Success to sign in!", "Now you can use the insect identifier system!")
    }
    pub fn sign_in_failed() -> Self {
        Self::new(NotificationLevel::Error, "Failed to sign in!", "Please check your user email or password!")
    }
    pub fn signed_up() -> Self {
        Self::new(NotificationLevel::Success, "Success to sign up a new account!", "Now you can go to sign in by this account!")
    }
    pub fn sign_up_failed() -> Self {
        Self::new(NotificationLevel::Error, "Failed to sign up a new account!", "Please check your inputs!")
    }
    pub fn signed_out() -> Self {
        Self::new(NotificationLevel::Info, "Success to sign out!", "Now you should sign in to use the insect identifier system!")
    }
    pub fn token_expired() -> Self {
        Self::new(NotificationLevel::Error, "Your Token Expired!", "You should sign in again!")
    }
    pub fn admin_added() -> Self {
        Self::new(NotificationLevel::Success, "Success to sign up a new admin!", "Now you can go to sign in by this administrator!")
    }
    pub fn feedback_submitted() -> Self {
        Self::new(NotificationLevel::Success, "Succeeded to submit feedback!", "Thank you very much for your precious feedback!")
    }
    pub fn ssh_started() -> Self {
        Self::new(NotificationLevel::Success, "Start WebSSH Server Success!", "You could use the web-based terminal!")
    }
    pub fn network_error() -> Self {
        Self::new(NotificationLevel::Error, "Network Error!", "You could try it again later!")
    }

    /// Generic mapping used when the caller has no more specific wording.
    pub fn from_error(err: &ClientError) -> Self {
        match err {
            ClientError::Validation { message, .. } => Self::new(NotificationLevel::Error, "Invalid Input!", message.clone()),
            ClientError::Authentication { .. } => Self::sign_in_failed(),
            ClientError::Authorization { .. } => Self::token_expired(),
            ClientError::Network { .. } => Self::network_error(),
            ClientError::Guard { message, .. } => Self::new(NotificationLevel::Error, "Forbidden Operation!", message.clone()),
            ClientError::Internal { message, .. } => Self::new(NotificationLevel::Error, "Unexpected Response!", message.clone()),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            NotificationLevel::Error => error!(target: "notify", "{} {}", n.title, n.description),
            _ => info!(target: "notify", "{} {}", n.title, n.description),
        }
    }
}

/// Keeps every notification until drained.
#[derive(Debug, Default, Clone)]
pub struct MemoryNotifier {
    items: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self { Self::default() }
    pub fn snapshot(&self) -> Vec<Notification> { self.items.lock().clone() }
    pub fn drain(&self) -> Vec<Notification> { std::mem::take(&mut *self.items.lock()) }
    pub fn titles(&self) -> Vec<String> { self.items.lock().iter().map(|n| n.title.clone()).collect() }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.items.lock().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_mapping() {
        assert_eq!(Notification::from_error(&ClientError::authorization("a", "b")), Notification::token_expired());
        assert_eq!(Notification::from_error(&ClientError::network("a", "b")), Notification::network_error());
        assert_eq!(Notification::from_error(&ClientError::authentication("a", "b")), Notification::sign_in_failed());
        let g = Notification::from_error(&ClientError::guard("already_signed_in", "You have signed in!"));
        assert_eq!(g.title, "Forbidden Operation!");
        assert_eq!(g.description, "You have signed in!");
        assert_eq!(g.level, NotificationLevel::Error);
    }

    #[test]
    fn memory_notifier_collects_and_drains() {
        let n = MemoryNotifier::new();
        let shared = n.clone();
        shared.notify(Notification::signed_in());
        shared.notify(Notification::signed_out());
        assert_eq!(n.titles(), vec!["Success to sign in!", "Success to sign out!"]);
        assert_eq!(n.drain().len(), 2);
        assert!(n.snapshot().is_empty());
    }

    #[test]
    fn sinks_are_interchangeable() {
        let memory = MemoryNotifier::new();
        let sinks: Vec<Arc<dyn Notifier>> = vec![Arc::new(TracingNotifier), Arc::new(memory.clone())];
        for s in &sinks {
            s.notify(Notification::token_expired());
        }
        assert_eq!(memory.snapshot(), vec![Notification::token_expired()]);
    }
}

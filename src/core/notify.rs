//! User-facing notifications for failed remote writes
//!
//! The store never fails an optimistic mutation outright. When the remote
//! write behind it fails, the user is told through a [`Notifier`].

use console::style;

/// Receives blocking, user-visible failure messages
pub trait Notifier: Send + Sync {
    /// Present a message to the user
    fn notify(&self, message: &str);
}

/// Writes notifications to stderr
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), style(message).red().bold());
    }
}

/// Keeps every notification in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages received so far
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

//! # Tracking Session
//!
//! Per-editor tracking state: the `enabled` flag and the active author.
//!
//! The interceptor reads it on every batch through [`TrackingSession::attribution`];
//! it changes only through explicit commands. Listeners registered with
//! [`TrackingSession::on_status_change`] hear the current status once and then
//! every flip, so a toolbar toggle can stay in sync.

use crate::annotation::{Attribution, Author};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::info;

type StatusListener = Box<dyn FnMut(bool) + Send>;

pub struct TrackingSession {
    enabled: bool,
    author: Author,
    listeners: Vec<StatusListener>,
}

impl TrackingSession {
    pub fn new(author: Author, enabled: bool) -> Self {
        Self {
            enabled,
            author,
            listeners: Vec::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    /// Set the flag; listeners fire only when it actually flips.
    ///
    /// Returns whether the status changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled == enabled {
            return false;
        }
        self.enabled = enabled;
        info!(enabled, author = %self.author.id, "Track changes status changed");
        for listener in &mut self.listeners {
            listener(enabled);
        }
        true
    }

    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    pub fn update_author(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.author = Author::new(id, name);
    }

    /// Register a status listener; it is called right away with the current status
    pub fn on_status_change(&mut self, mut listener: impl FnMut(bool) + Send + 'static) {
        listener(self.enabled);
        self.listeners.push(Box::new(listener));
    }

    /// Attributes for annotations created at `now`, or `None` when tracking is off
    pub fn attribution(&self, now: DateTime<Utc>) -> Option<Attribution> {
        self.enabled.then(|| self.author.attribution(now))
    }
}

impl fmt::Debug for TrackingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingSession")
            .field("enabled", &self.enabled)
            .field("author", &self.author)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<bool>>>, impl FnMut(bool) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |status| sink.lock().unwrap().push(status))
    }

    #[test]
    fn test_listener_hears_current_status_then_flips() {
        let mut session = TrackingSession::new(Author::new("u1", "Ada"), false);
        let (seen, listener) = recorder();
        session.on_status_change(listener);

        assert!(session.set_enabled(true));
        assert!(!session.set_enabled(true));
        session.toggle();

        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
    }

    #[test]
    fn test_attribution_only_when_enabled() {
        let mut session = TrackingSession::new(Author::new("u1", "Ada"), false);
        assert!(session.attribution(Utc::now()).is_none());

        session.set_enabled(true);
        session.update_author("u2", "Grace");
        let attribution = session.attribution(Utc::now()).unwrap();
        assert_eq!(attribution.author_id, "u2");
        assert_eq!(attribution.author_name, "Grace");
    }
}

use std::path::PathBuf;

use serde::Deserialize;

use crate::homework::Homework;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub deck: Option<Homework>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest pending timer of the open deck.
    pub fn next_deadline(&self) -> Option<i64> {
        self.deck.as_ref().and_then(Homework::next_deadline)
    }

    /// Fire due timers. Failures are logged; there is no request to answer.
    pub fn tick(&mut self) {
        if let Some(deck) = self.deck.as_mut() {
            if let Err(e) = deck.tick() {
                tracing::warn!(error = %e, "timer flush failed");
            }
        }
    }

    /// Write everything pending. Called on shutdown.
    pub fn flush(&mut self) {
        if let Some(deck) = self.deck.as_mut() {
            if let Err(e) = deck.flush_all() {
                tracing::warn!(error = %e, "final flush failed");
            }
        }
    }
}

//! Listener that records every event it receives.

use std::sync::Mutex;

use async_trait::async_trait;
use moonlink::{ClientError, ClientListener, ConnectionState};
use serde_json::Value;

#[derive(Debug, Default)]
pub struct RecordingListener {
    states: Mutex<Vec<ConnectionState>>,
    notifications: Mutex<Vec<(String, Value)>>,
    errors: Mutex<Vec<ClientError>>,
}

impl RecordingListener {
    pub fn states(&self) -> Vec<ConnectionState> {
        self.states.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<(String, Value)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<ClientError> {
        self.errors.lock().unwrap().clone()
    }

    /// How many times `state` was entered.
    pub fn entered(&self, state: ConnectionState) -> usize {
        self.states
            .lock()
            .unwrap()
            .iter()
            .filter(|seen| **seen == state)
            .count()
    }
}

#[async_trait]
impl ClientListener for RecordingListener {
    async fn state_changed(&self, state: ConnectionState) {
        self.states.lock().unwrap().push(state);
    }

    async fn on_notification(&self, method: &str, params: Value) {
        self.notifications
            .lock()
            .unwrap()
            .push((method.to_string(), params));
    }

    async fn on_exception(&self, error: ClientError) {
        self.errors.lock().unwrap().push(error);
    }
}

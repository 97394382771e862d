//! Printer administration.
//!
//! Thin wrappers over the administrative printer methods, plus a record of
//! the printer objects the server supports. The object list arrives as the
//! reply to the connection greeting (`printer.objects.list`), which no caller
//! waits on, so it is picked up by a [`MessageHandler`].

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::client::{Client, MessageHandler};
use crate::error::{ClientResult, LockResultExt};
use crate::protocol::Reply;

/// Handler recording the `objects` list of uncorrelated replies.
#[derive(Debug, Default)]
pub struct SupportedObjects {
    objects: Mutex<Vec<String>>,
}

impl SupportedObjects {
    pub fn get(&self) -> Vec<String> {
        self.objects
            .lock()
            .recover_poison("SupportedObjects::get")
            .clone()
    }
}

impl MessageHandler for SupportedObjects {
    fn handle(&self, message: &Value) -> bool {
        let Some(objects) = message
            .get("result")
            .and_then(|result| result.get("objects"))
            .and_then(Value::as_array)
        else {
            return false;
        };
        if objects.is_empty() {
            return false;
        }

        let names: Vec<String> = objects
            .iter()
            .filter_map(|object| object.as_str().map(str::to_string))
            .collect();
        log::debug!(
            target: "moonlink::admin",
            "Server supports {} printer objects",
            names.len()
        );
        *self.objects.lock().recover_poison("SupportedObjects::handle") = names;
        true
    }
}

/// Administrative operations on the printer behind a [`Client`].
#[derive(Debug, Clone)]
pub struct PrinterAdministration {
    client: Client,
    objects: Arc<SupportedObjects>,
}

impl PrinterAdministration {
    /// Attach to a client, registering the object-list handler on it.
    pub fn attach(client: &Client) -> Self {
        let objects = Arc::new(SupportedObjects::default());
        client.add_handler(objects.clone());
        Self {
            client: client.clone(),
            objects,
        }
    }

    /// Printer objects reported by the server, empty until the greeting
    /// reply arrives.
    pub fn supported_objects(&self) -> Vec<String> {
        self.objects.get()
    }

    /// `printer.restart`
    pub async fn restart(&self) -> ClientResult<Reply> {
        self.client.call_method("printer.restart", None).await
    }

    /// `printer.info`
    pub async fn info(&self) -> ClientResult<Reply> {
        self.client.call_method("printer.info", None).await
    }

    /// `printer.emergency_stop`
    pub async fn emergency_stop(&self) -> ClientResult<Reply> {
        self.client.call_method("printer.emergency_stop", None).await
    }

    /// `printer.firmware_restart`
    pub async fn firmware_restart(&self) -> ClientResult<Reply> {
        self.client.call_method("printer.firmware_restart", None).await
    }
}

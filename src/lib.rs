pub mod admin;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;

pub use admin::{PrinterAdministration, SupportedObjects};
pub use client::{
    CallHandle, CallOutcome, Client, ClientBuilder, ClientListener, ConnectionState,
    MessageHandler, NoopListener, ScopedRequest, Session, Transport, TungsteniteTransport,
};
pub use config::{ClientSettings, SettingsFile, load_settings};
pub use error::{ClientError, ClientResult, ConfigError};
pub use protocol::{Params, Reply, RequestId};

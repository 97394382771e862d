use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use moonlink::{
    Client, ClientError, ClientListener, ConfigError, ConnectionState, Params, Reply,
    SettingsFile, load_settings,
};
use serde_json::Value;
use thiserror::Error;

/// Command-line client for a Moonraker-style printer API over websocket
#[derive(Parser)]
#[command(name = "moonlink")]
#[command(version)]
#[command(about = "Command-line client for a Moonraker-style printer API over websocket")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server host (overrides the config file)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Server port (overrides the config file)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Connect with wss:// instead of ws://
    #[arg(long, global = true)]
    ssl: bool,

    /// API key sent in the X-Api-Key header
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Settings file layered over the user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a method and print its reply
    Call {
        /// Method name (e.g., printer.info, server.websocket.id)
        method: String,

        /// Keyword arguments as a JSON object
        #[arg(long)]
        params: Option<String>,
    },
    /// Print state changes and notifications until interrupted
    Watch,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Client(#[from] ClientError),

    #[error("--params must be a JSON object: {0}")]
    Params(String),

    #[error("server returned an error: {0}")]
    Remote(Value),

    #[error("failed to wait for Ctrl-C: {0}")]
    Signal(#[from] std::io::Error),
}

/// Listener printing every event to stdout.
struct Printer;

#[async_trait]
impl ClientListener for Printer {
    async fn state_changed(&self, state: ConnectionState) {
        println!("state: {}", state);
    }

    async fn on_notification(&self, method: &str, params: Value) {
        println!("{} {}", method, params);
    }

    async fn on_exception(&self, error: ClientError) {
        eprintln!("connection error: {}", error);
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let overrides = SettingsFile {
        host: cli.host,
        port: cli.port,
        ssl: cli.ssl.then_some(true),
        api_key: cli.api_key,
        ..SettingsFile::default()
    };
    let settings = load_settings(cli.config.as_deref(), Some(overrides))?;

    match cli.command {
        Commands::Call { method, params } => {
            let params = params.as_deref().map(parse_params).transpose()?;
            let client = Client::new(settings)?;
            client.connect().await?;

            let outcome = client.call_method(&method, params.as_ref()).await;
            client.disconnect().await;

            match outcome? {
                Reply::Result(result) => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string())
                    );
                    Ok(())
                }
                Reply::Error(error) => Err(CliError::Remote(error)),
            }
        }
        Commands::Watch => {
            let client = Client::builder(settings)
                .listener(Arc::new(Printer))
                .build()?;
            client.start()?;
            tokio::signal::ctrl_c().await?;
            client.disconnect().await;
            Ok(())
        }
    }
}

fn parse_params(raw: &str) -> Result<Params, CliError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(params)) => Ok(params),
        Ok(other) => Err(CliError::Params(format!("got {}", other))),
        Err(e) => Err(CliError::Params(e.to_string())),
    }
}

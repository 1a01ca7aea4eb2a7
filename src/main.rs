//! CLI for the PopSub client
//!
//! Subcommands:
//! - `listen`: subscribe to topics and log every routed frame until Ctrl-C
//! - `publish`: publish one JSON payload
//! - `request`: send a request and print the response

use std::time::Duration;

use clap::{Parser, Subcommand};
use popsub_client::config::load_config;
use popsub_client::utils::logging;
use popsub_client::{Client, Message, PublishOptions, RequestOptions, SubscriptionAction};
use serde_json::Value;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "popsub-client")]
struct Cli {
    /// Broker URL; overrides the configured one
    #[arg(long)]
    url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Subscribe to one or more topics and log what arrives
    Listen {
        #[arg(required = true)]
        topics: Vec<String>,
        /// publish, request, response or all
        #[arg(long, default_value = "all")]
        action: SubscriptionAction,
        #[arg(long, default_value_t = 0)]
        priority: i32,
    },
    /// Publish a JSON payload
    Publish { topic: String, payload: String },
    /// Send a request and print the response payload
    Request {
        topic: String,
        payload: String,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    if let Err(e) = run(cli).await {
        error!("Client failed: {}", e);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = load_config()?;
    if let Some(url) = cli.url {
        settings.url = url;
    }

    let client = Client::new(settings)?;
    client.events().connected.add(|_| info!("Session connected"));
    client.events().disconnected.add(|_| warn!("Session disconnected"));
    client
        .events()
        .error
        .add(|e| warn!("Session error: {e}"));
    client.connect().await?;

    match cli.command {
        Command::Listen {
            topics,
            action,
            priority,
        } => {
            for topic in &topics {
                client
                    .subscribe(action, topic, priority, |msg: Message| {
                        info!("{} {}", msg.header, msg.payload);
                    })
                    .await?;
            }
            info!("Listening on {} topic(s); Ctrl-C to stop", topics.len());
            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received. Exiting gracefully.");
        }
        Command::Publish { topic, payload } => {
            let payload: Value = serde_json::from_str(&payload)?;
            client
                .publish(&topic, &payload, PublishOptions::default())
                .await?;
            info!("Published to {topic}");
        }
        Command::Request {
            topic,
            payload,
            timeout_ms,
        } => {
            let payload: Value = serde_json::from_str(&payload)?;
            let options = RequestOptions {
                timeout: timeout_ms.map(Duration::from_millis),
                ..Default::default()
            };
            let response = client.request(&topic, &payload, options).await?;
            println!("{}", response.payload);
        }
    }

    client.close().await?;
    Ok(())
}

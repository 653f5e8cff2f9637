//! Accord bot runner
//!
//! Run with:
//! ```bash
//! ACCORD_TOKEN=... cargo run -p accord-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use accord_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use accord_gateway::{Client, ClientOptions, Encoding};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let tracing_config = if config.log_json {
        TracingConfig::production()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = try_init_tracing_with_config(tracing_config) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Gateway client failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting accord gateway client...");

    let encoding: Encoding = config.encoding.parse()?;
    let mut options = ClientOptions::new(config.token)
        .load_all_members(config.load_all_members)
        .disabled_events(config.disabled_events)
        .encoding(encoding);
    if let (Some(shard_id), Some(shard_count)) = (config.shard_id, config.shard_count) {
        options = options.shard(shard_id, shard_count);
    }

    let mut client = Client::new(options)?;

    // Log the lifecycle events as they stream by
    let mut events = client.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match event.name.as_str() {
                    "ready" => info!("Bot is ready"),
                    "reconnected" => info!("Session reconnected"),
                    "error" => error!(message = %event.data["message"], "Gateway error"),
                    _ => {}
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    tokio::select! {
        result = client.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}

//! HTTP front end for the `redpacket` engine.
//!
//! ```bash
//! curl "http://localhost:8080/set?uid=1&money=100&num=100"
//! curl "http://localhost:8080/get?id=1162763031&uid=1"
//! curl "http://localhost:8080/"
//! ```

mod server;

use clap::Parser;
use redpacket::PacketService;
use server::config::{CliArgs, ServerConfig};
use server::routes::router;
use server::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry(&config)?;

    let service = PacketService::new(config.service.clone())?;
    let listener = TcpListener::bind(&config.server_addr).await?;
    log_startup_info(&config);

    let served = axum::serve(listener, router(service.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Claims already queued on a shard are served before it stops.
    if let Err(_e) = service.shutdown().await {
        #[cfg(feature = "tracing")]
        tracing::error!("Error during service shutdown: {:?}", _e);
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Service shut down successfully");

    providers.shutdown();
    served?;
    Ok(())
}

fn log_startup_info(_config: &ServerConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting red packet service on {} with full config: {:#?}",
            _config.server_addr,
            _config
        );
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting red packet service on {} with {} shards",
            _config.server_addr,
            _config.service.num_shards
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Shutdown signal received, terminating gracefully...");
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tr_server::bootstrap::{self, RuntimeConfig};
use tr_server::config::AppConfig;
use tr_server::handler::{self, AppState};
use tr_server::logging;

#[derive(Parser)]
#[command(name = "tr", about = "turnrate annotation server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Validate configuration file and exit.
    Validate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let runtime = match load_runtime(&cli.config) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Config invalid: {e:#}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Command::Validate) => {
            println!("Config valid: {}", cli.config.display());
        }
        None => {
            if let Err(e) = serve(runtime).await {
                eprintln!("Server error: {e:#}");
                std::process::exit(1);
            }
        }
    }
}

fn load_runtime(path: &Path) -> Result<RuntimeConfig, anyhow::Error> {
    let config = AppConfig::from_file(path)?;
    bootstrap::into_runtime(config)
}

async fn serve(runtime: RuntimeConfig) -> Result<(), anyhow::Error> {
    logging::init_tracing(&runtime.log_level, &runtime.log_format)?;

    let store = runtime.storage.open()?;
    let state = Arc::new(AppState {
        store,
        catalog: Arc::new(runtime.catalog),
    });
    let app = handler::router(state);

    let listener = tokio::net::TcpListener::bind(runtime.listen_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

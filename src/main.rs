use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use transfer_desk::{build_router, build_state, config::AppConfig};

#[derive(Parser)]
#[command(name = "transfer-desk")]
#[command(about = "Ground-transfer tracking service with CRM deal lookup")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Overrides TD_BIND_ADDR
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Insert the demo transfers on start-up
        #[arg(long)]
        seed_demo: bool,
    },
    /// Load the configuration, report problems, and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve {
        bind: None,
        seed_demo: false,
    }) {
        Command::Serve { bind, seed_demo } => serve(config, bind, seed_demo).await,
        Command::CheckConfig => {
            check_config(&config);
            Ok(())
        }
    }
}

async fn serve(mut config: AppConfig, bind: Option<SocketAddr>, seed_demo: bool) -> Result<()> {
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    config.seed_demo |= seed_demo;
    check_config(&config);

    let state = build_state(&config)
        .await
        .context("failed to initialize services")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(
        bind_addr = %config.bind_addr,
        public_base_url = %config.public_base_url,
        transfer_store = ?config.transfer_store,
        token_store = ?config.token_store,
        "transfer desk started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("transfer desk stopped");
    Ok(())
}

fn check_config(config: &AppConfig) {
    for key in config.insecure_defaults() {
        warn!(key, "using development default; set it before deploying");
    }
    if !config.crm.is_configured() {
        warn!("CRM_CLIENT_ID / CRM_CLIENT_SECRET not set; CRM login and refresh will fail");
    }
    info!(
        data_dir = %config.data_dir.display(),
        token_file = %config.token_file.display(),
        crm_redirect_uri = %config.crm.redirect_uri,
        "configuration loaded"
    );
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("transfer_desk=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install ctrl+c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

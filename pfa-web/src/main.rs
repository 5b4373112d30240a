//! pfa-web - personal finance administration service
//!
//! Serves the JSON API and the embedded single-page UI for pensions, bank
//! accounts, payslips, expenses, tax returns and documents.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pfa_common::config::{self, RootFolder, TomlConfig};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pfa_web::services::{DisabledAnalyzer, DocumentAnalyzer, GeminiClient, SmtpMailer, UploadStore};
use pfa_web::{build_router, AppState};

/// Command-line arguments for pfa-web
#[derive(Parser, Debug)]
#[command(name = "pfa-web")]
#[command(about = "Personal finance administration web service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = config::ENV_CONFIG)]
    config: Option<PathBuf>,

    /// Folder holding the database and uploaded files
    #[arg(short, long, env = config::ENV_ROOT_FOLDER)]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "PFA_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides the config file)
    #[arg(short, long, env = "PFA_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::config_file_path(args.config.as_deref());
    let toml_config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?
        .apply_env_overrides();

    init_tracing(&toml_config.logging.level);

    info!(
        "Starting pfa-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Configuration: {}", config_path.display());

    let root = RootFolder::new(config::resolve_root_folder(args.root_folder.as_deref(), &toml_config));
    root.ensure_directories()
        .with_context(|| format!("Failed to initialize root folder {}", root.path().display()))?;
    info!("Root folder: {}", root.path().display());

    let db_path = root.database_path();
    let pool = match pfa_common::db::init_database(&db_path).await {
        Ok(pool) => {
            info!("Database ready: {}", db_path.display());
            pool
        }
        Err(e) => {
            error!("Failed to open database {}: {}", db_path.display(), e);
            return Err(e.into());
        }
    };

    let ai_configured = toml_config.ai.is_configured();
    let analyzer: Arc<dyn DocumentAnalyzer> = if ai_configured {
        info!(model = %toml_config.ai.model, "Document extraction enabled");
        Arc::new(GeminiClient::new(&toml_config.ai).context("Failed to build AI client")?)
    } else {
        warn!("No AI API key configured; payslip and receipt uploads will fail extraction");
        Arc::new(DisabledAnalyzer)
    };

    if toml_config.smtp.is_configured() {
        info!(host = %toml_config.smtp.host, "Email delivery enabled");
    } else {
        info!("SMTP not configured; report emailing disabled");
    }
    let mailer = Arc::new(SmtpMailer::new(toml_config.smtp.clone()));

    let state = AppState::new(pool, UploadStore::new(root.uploads_dir()), analyzer, mailer, ai_configured)
        .with_max_upload_bytes(toml_config.max_upload_bytes);
    let app = build_router(state);

    let bind = args.bind.unwrap_or_else(|| toml_config.bind.clone());
    let port = args.port.unwrap_or(toml_config.port);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("Invalid bind address {bind}:{port}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("pfa-web listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level applies to our crates
fn init_tracing(level: &str) {
    let directives = if level.contains('=') {
        level.to_string()
    } else {
        format!("pfa_web={level},pfa_common={level},tower_http={level}")
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directives))
        .unwrap_or_else(|_| EnvFilter::new("pfa_web=info,pfa_common=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

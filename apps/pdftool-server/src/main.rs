//! pdftool HTTP server
//!
//! Upload-and-download PDF utilities over a small REST API:
//!
//! - Merge PDFs, resize PDF pages, lock and unlock with a password
//! - Overlay text edits at fixed coordinates
//! - Resize raster images
//! - DOC→PDF, HTML→PDF and PDF→HTML through an external conversion API
//!
//! Every successful operation is appended to a per-user activity log.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod convert;
mod error;
mod history;
mod state;
mod upload;

use convert::ConversionClient;
use history::HistoryLog;
use state::AppState;

/// Command-line arguments for the pdftool server
#[derive(Parser, Debug)]
#[command(name = "pdftool-server")]
#[command(about = "HTTP service for merging, resizing, locking, editing and converting PDFs")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "PDFTOOL_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Base URL of the document conversion API
    #[arg(long, env = "CONVERSION_API_URL", default_value = "https://api.cloudmersive.com")]
    conversion_api_url: String,

    /// API key for the conversion API; conversions are disabled without it
    #[arg(long, env = "CONVERSION_API_KEY", hide_env_values = true)]
    conversion_api_key: Option<String>,

    /// File the per-user activity log is appended to
    #[arg(long, env = "PDFTOOL_HISTORY_LOG", default_value = "user-history-log.txt")]
    history_log: PathBuf,

    /// User name logged when a request has no X-User header
    #[arg(long, env = "PDFTOOL_DEFAULT_USER", default_value = "anonymous")]
    default_user: String,

    /// Maximum upload size in megabytes
    #[arg(long, env = "PDFTOOL_MAX_UPLOAD_MB", default_value = "50")]
    max_upload_mb: usize,

    /// Processing timeout in milliseconds
    #[arg(long, env = "PDFTOOL_TIMEOUT_MS", default_value = "30000")]
    timeout_ms: u64,

    /// Rate limit: requests per second per IP
    #[arg(long, env = "PDFTOOL_RATE_LIMIT", default_value = "10")]
    rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Build the application router (without rate limiting)
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let pdf_routes = Router::new()
        .route("/merge", post(api::handle_merge))
        .route("/resize-image", post(api::handle_resize_image))
        .route("/resize-pdf", post(api::handle_resize_pdf))
        .route("/lock-pdf", post(api::handle_lock_pdf))
        .route("/unlock-pdf", post(api::handle_unlock_pdf))
        .route("/convert-doc-to-pdf", post(api::handle_convert_doc_to_pdf))
        .route("/edit-pdf", post(api::handle_edit_pdf))
        .route("/html-to-pdf", post(api::handle_html_to_pdf))
        .route("/pdf-to-html", post(api::handle_pdf_to_html));

    Router::new()
        .route("/health", get(api::handle_health))
        .nest("/api/pdf", pdf_routes)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pdftool server on {}:{}", args.host, args.port);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit.saturating_mul(2))
            .finish()
            .context("Rate limit must be a positive number of requests per second")?,
    );

    let converter = match args.conversion_api_key.filter(|key| !key.is_empty()) {
        Some(key) => Some(
            ConversionClient::new(&args.conversion_api_url, key)
                .context("Failed to build conversion API client")?,
        ),
        None => {
            warn!("CONVERSION_API_KEY is not set; conversion endpoints are disabled");
            None
        }
    };

    let state = AppState {
        timeout_ms: args.timeout_ms,
        max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
        default_user: args.default_user.into(),
        history: HistoryLog::new(args.history_log),
        converter,
    };
    info!("History log: {}", state.history.path().display());

    let app = build_router(state).layer(GovernorLayer {
        config: governor_conf,
    });

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!("Processing timeout: {}ms", args.timeout_ms);
    info!("Upload limit: {}MB", args.max_upload_mb);

    // The governor keys requests by peer address
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

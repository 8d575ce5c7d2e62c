mod audit;
mod auth;
mod cases;
mod config;
mod db;
mod documents;
mod errors;
mod fees;
mod layout;
mod models;
mod routes;
mod state;
mod template;
mod variables;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::audit::{AuditSink, PgAuditSink, TracingAuditSink};
use crate::config::{AuditBackend, Config};
use crate::db::create_pool;
use crate::documents::S3PayloadStore;
use crate::fees::PgFeeRepository;
use crate::layout::{default_page_config, DocumentAssets};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Receptor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket {})", config.s3_bucket);

    // Decode signature / seal rasters once
    let assets = DocumentAssets::load(
        config.signature_image_path.as_deref(),
        config.signature_width_pt,
        config.seal_image_path.as_deref(),
        config.seal_width_pt,
    )?;

    let page_config = default_page_config();
    info!(
        "Layout page config: {}x{}pt, body {:?} {}pt",
        page_config.page_width_pt,
        page_config.page_height_pt,
        page_config.body_font,
        page_config.body_font_size_pt
    );

    let audit: Arc<dyn AuditSink> = match config.audit_backend {
        AuditBackend::Database => Arc::new(PgAuditSink::new(db.clone())),
        AuditBackend::Log => Arc::new(TracingAuditSink),
    };
    info!("Audit sink: {:?}", config.audit_backend);

    let state = AppState {
        payloads: Arc::new(S3PayloadStore::new(s3, config.s3_bucket.clone())),
        fees: Arc::new(PgFeeRepository::new(db.clone())),
        audit,
        db,
        page_config,
        assets,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "receptor-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not by virtual host.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}

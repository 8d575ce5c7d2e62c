use std::sync::Arc;

use sqlx::PgPool;

use crate::audit::AuditSink;
use crate::documents::PayloadStore;
use crate::fees::FeeRepository;
use crate::layout::{DocumentAssets, PageConfig};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Rendered PDFs (S3 / MinIO).
    pub payloads: Arc<dyn PayloadStore>,
    pub fees: Arc<dyn FeeRepository>,
    pub audit: Arc<dyn AuditSink>,
    /// Page geometry and fonts for every generated document.
    pub page_config: PageConfig,
    /// Signature and seal rasters, decoded once at start-up.
    pub assets: DocumentAssets,
}

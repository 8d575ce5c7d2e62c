// Document layout: fixed header, greedy wrap, pagination, inline rasters, PDF output.
// Layout and rendering are CPU-bound and run inside tokio::task::spawn_blocking.

pub mod assets;
pub mod font_metrics;
pub mod header;
pub mod paginate;
pub mod pdf;

pub use assets::DocumentAssets;
pub use font_metrics::{default_page_config, PageConfig};
pub use header::HeaderBlock;
pub use paginate::layout_document;
pub use pdf::render_pdf;

use crate::errors::AppError;

/// A rendered document ready for storage.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub pdf: Vec<u8>,
    pub page_count: usize,
}

/// Lays out and renders in one step.
pub fn render_document(
    header: Option<&HeaderBlock>,
    body: &str,
    config: &PageConfig,
    assets: &DocumentAssets,
) -> Result<RenderedDocument, AppError> {
    let laid_out = layout_document(header, body, config, assets)?;
    let pdf = render_pdf(&laid_out, config, assets)?;
    Ok(RenderedDocument {
        page_count: laid_out.page_count(),
        pdf,
    })
}

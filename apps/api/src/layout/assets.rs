//! The two fixed rasters a document may embed: the officer's signature and the office seal.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Marker that embeds the signature image inside a body line.
pub const SIGNATURE_MARKER: &str = "[[firma]]";
/// Marker that embeds the seal image inside a body line.
pub const SEAL_MARKER: &str = "[[timbre]]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageKind {
    Signature,
    Seal,
}

impl ImageKind {
    pub fn marker(&self) -> &'static str {
        match self {
            ImageKind::Signature => SIGNATURE_MARKER,
            ImageKind::Seal => SEAL_MARKER,
        }
    }

    /// XObject resource name used in content streams.
    pub fn resource_name(&self) -> &'static str {
        match self {
            ImageKind::Signature => "Im1",
            ImageKind::Seal => "Im2",
        }
    }
}

/// A decoded RGB raster plus the size it is drawn at.
#[derive(Debug, Clone)]
pub struct RasterAsset {
    pub width_px: u32,
    pub height_px: u32,
    /// Packed 8-bit RGB samples, row-major, `width_px * height_px * 3` bytes.
    pub rgb: Vec<u8>,
    pub draw_width_pt: f32,
    pub draw_height_pt: f32,
}

impl RasterAsset {
    /// Wraps raw RGB samples; the draw height follows the aspect ratio.
    pub fn from_rgb(width_px: u32, height_px: u32, rgb: Vec<u8>, draw_width_pt: f32) -> Self {
        let aspect = if width_px == 0 {
            1.0
        } else {
            height_px as f32 / width_px as f32
        };
        RasterAsset {
            width_px,
            height_px,
            rgb,
            draw_width_pt,
            draw_height_pt: draw_width_pt * aspect,
        }
    }

    /// Decodes a PNG or JPEG file.
    pub fn load(path: &Path, draw_width_pt: f32) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?
            .to_rgb8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgb(width, height, img.into_raw(), draw_width_pt))
    }
}

/// Rasters available to the layout engine. Either may be absent; only documents
/// that reference a missing one fail.
#[derive(Debug, Clone, Default)]
pub struct DocumentAssets {
    pub signature: Option<Arc<RasterAsset>>,
    pub seal: Option<Arc<RasterAsset>>,
}

impl DocumentAssets {
    pub fn get(&self, kind: ImageKind) -> Option<&RasterAsset> {
        match kind {
            ImageKind::Signature => self.signature.as_deref(),
            ImageKind::Seal => self.seal.as_deref(),
        }
    }

    /// Loads whichever rasters are configured.
    pub fn load(
        signature: Option<&Path>,
        signature_width_pt: f32,
        seal: Option<&Path>,
        seal_width_pt: f32,
    ) -> Result<Self> {
        let signature = match signature {
            Some(path) => {
                let asset = RasterAsset::load(path, signature_width_pt)?;
                info!("Loaded signature image {}x{}", asset.width_px, asset.height_px);
                Some(Arc::new(asset))
            }
            None => None,
        };
        let seal = match seal {
            Some(path) => {
                let asset = RasterAsset::load(path, seal_width_pt)?;
                info!("Loaded seal image {}x{}", asset.width_px, asset.height_px);
                Some(Arc::new(asset))
            }
            None => None,
        };
        Ok(DocumentAssets { signature, seal })
    }
}

//! Serializes a [`LaidOutDocument`] into PDF bytes.
//!
//! Fonts are the standard Type1 Helvetica faces with WinAnsiEncoding, so no font
//! program is embedded. Rasters become one DeviceRGB image XObject each, shared by
//! every page that draws them.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::errors::AppError;
use crate::layout::assets::{DocumentAssets, ImageKind};
use crate::layout::font_metrics::{FontFamily, PageConfig};
use crate::layout::paginate::{DrawOp, LaidOutDocument, PageLayout};

const FONTS: [FontFamily; 2] = [FontFamily::Helvetica, FontFamily::HelveticaBold];
const IMAGES: [ImageKind; 2] = [ImageKind::Signature, ImageKind::Seal];

/// Writes every page of `laid_out` into a single PDF.
pub fn render_pdf(
    laid_out: &LaidOutDocument,
    config: &PageConfig,
    assets: &DocumentAssets,
) -> Result<Vec<u8>, AppError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in FONTS {
        fonts.set(
            font.resource_name(),
            dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            },
        );
    }
    let fonts_id = doc.add_object(fonts);

    let mut xobjects = Dictionary::new();
    for kind in IMAGES {
        if let Some(asset) = assets.get(kind) {
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => asset.width_px as i64,
                    "Height" => asset.height_px as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                },
                asset.rgb.clone(),
            ));
            xobjects.set(kind.resource_name(), image_id);
        }
    }

    let mut resources = dictionary! { "Font" => fonts_id };
    if !xobjects.is_empty() {
        resources.set("XObject", xobjects);
    }
    let resources_id = doc.add_object(resources);

    let mut kids: Vec<Object> = Vec::with_capacity(laid_out.pages.len());
    for page in &laid_out.pages {
        let content = Content {
            operations: page_operations(page, assets)?,
        };
        let encoded = content
            .encode()
            .map_err(|e| AppError::Render(format!("failed to encode page content: {e}")))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.0_f32.into(),
                0.0_f32.into(),
                config.page_width_pt.into(),
                config.page_height_pt.into(),
            ],
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| AppError::Render(format!("failed to write PDF: {e}")))?;
    Ok(bytes)
}

fn page_operations(page: &PageLayout, assets: &DocumentAssets) -> Result<Vec<Operation>, AppError> {
    let mut ops = Vec::new();
    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                font,
                size,
                text,
            } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![font.resource_name().into(), (*size).into()],
                ));
                ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            DrawOp::Image {
                kind,
                x,
                y,
                width,
                height,
            } => {
                if assets.get(*kind).is_none() {
                    return Err(AppError::Render(format!("no {kind:?} image is configured")));
                }
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "cm",
                    vec![
                        (*width).into(),
                        0.0_f32.into(),
                        0.0_f32.into(),
                        (*height).into(),
                        (*x).into(),
                        (*y).into(),
                    ],
                ));
                ops.push(Operation::new("Do", vec![kind.resource_name().into()]));
                ops.push(Operation::new("Q", vec![]));
            }
        }
    }
    Ok(ops)
}

/// Maps text to WinAnsiEncoding bytes. Latin-1 is identity; a few typographic
/// characters live in 0x80..0x9F; anything else becomes `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::assets::tests::test_assets;
    use crate::layout::font_metrics::default_page_config;
    use crate::layout::paginate::layout_document;

    fn operators(doc: &Document, page_id: ObjectId) -> Vec<String> {
        let bytes = doc.get_page_content(page_id).unwrap();
        Content::decode(&bytes)
            .unwrap()
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect()
    }

    #[test]
    fn test_page_count_matches_layout() {
        let config = default_page_config();
        let body = "Certifico haber notificado a la parte demandada.\n".repeat(120);
        let laid_out = layout_document(None, &body, &config, &DocumentAssets::default()).unwrap();
        assert!(laid_out.page_count() > 1);

        let bytes = render_pdf(&laid_out, &config, &DocumentAssets::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), laid_out.page_count());
    }

    #[test]
    fn test_images_are_drawn_as_xobjects() {
        let config = default_page_config();
        let assets = test_assets();
        let laid_out =
            layout_document(None, "Firma [[firma]] y timbre [[timbre]]", &config, &assets).unwrap();
        let bytes = render_pdf(&laid_out, &config, &assets).unwrap();

        let mut doc = Document::load_mem(&bytes).unwrap();
        doc.decompress();
        let pages = doc.get_pages();
        let first = *pages.get(&1).unwrap();
        let ops = operators(&doc, first);
        assert_eq!(ops.iter().filter(|op| *op == "Do").count(), 2);
        assert_eq!(ops.iter().filter(|op| *op == "Tj").count(), 2);
    }

    #[test]
    fn test_image_op_without_asset_fails() {
        let config = default_page_config();
        let laid_out = LaidOutDocument {
            pages: vec![PageLayout {
                ops: vec![DrawOp::Image {
                    kind: ImageKind::Seal,
                    x: 50.0,
                    y: 50.0,
                    width: 10.0,
                    height: 10.0,
                }],
            }],
        };
        let result = render_pdf(&laid_out, &config, &DocumentAssets::default());
        assert!(matches!(result, Err(AppError::Render(_))));
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Pérez"), vec![b'P', 0xE9, b'r', b'e', b'z']);
        assert_eq!(encode_win_ansi("1º — “x”"), vec![b'1', 0xBA, b' ', 0x97, b' ', 0x93, b'x', 0x94]);
        assert_eq!(encode_win_ansi("漢"), vec![b'?']);
    }
}

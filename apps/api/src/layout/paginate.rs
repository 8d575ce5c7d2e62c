//! Text layout: greedy word wrap and pagination of a substituted template.
//!
//! # Algorithm
//! 1. The body is split into lines. A line that is empty after trimming is the
//!    blank-line marker and advances the cursor by one body line.
//! 2. Every other line is a paragraph. Words are packed greedily until the next
//!    one would cross the right margin.
//! 3. A vertical cursor walks down the page; when the next line box would cross
//!    the bottom margin a new page starts. Page 1 starts below the header block,
//!    which is drawn on page 1 only.
//! 4. `[[firma]]` / `[[timbre]]` inside a paragraph are inline boxes the size of
//!    the raster. [`take_line`] places them like words and hands back the
//!    remaining tokens, so text continues to the right of (or below) the image.
//! 5. A raster wider than the text column, or a line box or header taller than
//!    the page body, is a render error; nothing is drawn outside the margins.

use serde::Serialize;

use crate::errors::AppError;
use crate::layout::assets::{DocumentAssets, ImageKind, SEAL_MARKER, SIGNATURE_MARKER};
use crate::layout::font_metrics::{get_metrics, FontFamily, FontMetricTable, PageConfig};
use crate::layout::header::HeaderBlock;

/// Distance from the bottom of a line box to the text baseline, in font sizes.
const DESCENT_FACTOR: f32 = 0.25;

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// One drawing instruction in PDF user space (origin bottom-left, points).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawOp {
    Text {
        x: f32,
        /// Baseline.
        y: f32,
        font: FontFamily,
        size: f32,
        text: String,
    },
    Image {
        kind: ImageKind,
        x: f32,
        /// Bottom edge.
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageLayout {
    pub ops: Vec<DrawOp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaidOutDocument {
    pub pages: Vec<PageLayout>,
}

impl LaidOutDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All text drawn on a page, in drawing order, one op per line.
    #[cfg(test)]
    pub fn page_text(&self, index: usize) -> Vec<&str> {
        self.pages
            .get(index)
            .map(|page| {
                page.ops
                    .iter()
                    .filter_map(|op| match op {
                        DrawOp::Text { text, .. } => Some(text.as_str()),
                        DrawOp::Image { .. } => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tokens and single-line pass
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Piece<'a> {
    Word(&'a str),
    Image(ImageKind),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Token<'a> {
    pub piece: Piece<'a>,
    /// Whether whitespace separated this token from the previous one.
    pub space_before: bool,
}

/// Horizontal content of one placed line, offsets relative to the left margin.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LineItem {
    Text { x_offset: f32, text: String },
    Image { kind: ImageKind, x_offset: f32, width: f32, height: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlacedLine {
    pub items: Vec<LineItem>,
    pub width: f32,
    /// Height of the line box: the body line height, or taller if an image is on it.
    pub height: f32,
}

/// Splits a paragraph into words and image markers.
pub(crate) fn tokenize(paragraph: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for chunk in paragraph.split_whitespace() {
        let mut rest = chunk;
        let mut space_before = true;
        while !rest.is_empty() {
            match next_marker(rest) {
                None => {
                    tokens.push(Token {
                        piece: Piece::Word(rest),
                        space_before,
                    });
                    break;
                }
                Some((pos, kind)) => {
                    if pos > 0 {
                        tokens.push(Token {
                            piece: Piece::Word(&rest[..pos]),
                            space_before,
                        });
                        space_before = false;
                    }
                    tokens.push(Token {
                        piece: Piece::Image(kind),
                        space_before,
                    });
                    space_before = false;
                    rest = &rest[pos + kind.marker().len()..];
                }
            }
        }
    }
    tokens
}

fn next_marker(s: &str) -> Option<(usize, ImageKind)> {
    let signature = s.find(SIGNATURE_MARKER).map(|p| (p, ImageKind::Signature));
    let seal = s.find(SEAL_MARKER).map(|p| (p, ImageKind::Seal));
    match (signature, seal) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Places as many tokens as fit on one line of `max_width` points.
///
/// Returns the placed line and the residual tokens. At least one token is always
/// consumed, so a word wider than the line overflows instead of looping forever.
pub(crate) fn take_line<'t, 'a>(
    tokens: &'t [Token<'a>],
    metrics: &FontMetricTable,
    size: f32,
    max_width: f32,
    line_height: f32,
    assets: &DocumentAssets,
) -> Result<(PlacedLine, &'t [Token<'a>]), AppError> {
    let space_w = metrics.space_width * size;
    let mut items = Vec::new();
    let mut run: Option<(f32, String)> = None;
    let mut x = 0.0_f32;
    let mut height = line_height;
    let mut consumed = 0;

    for token in tokens {
        let gap = if consumed > 0 && token.space_before {
            space_w
        } else {
            0.0
        };
        let (w, h) = match token.piece {
            Piece::Word(word) => (metrics.measure_pt(word, size), 0.0),
            Piece::Image(kind) => {
                let asset = assets.get(kind).ok_or_else(|| {
                    AppError::Render(format!(
                        "template uses {} but no {kind:?} image is configured",
                        kind.marker()
                    ))
                })?;
                if asset.draw_width_pt > max_width {
                    return Err(AppError::Render(format!(
                        "{} is {:.1}pt wide, text column holds {max_width:.1}pt",
                        kind.marker(),
                        asset.draw_width_pt
                    )));
                }
                (asset.draw_width_pt, asset.draw_height_pt)
            }
        };

        if consumed > 0 && x + gap + w > max_width {
            break;
        }

        match token.piece {
            Piece::Word(word) => match run.as_mut() {
                Some((_, text)) => {
                    if gap > 0.0 {
                        text.push(' ');
                    }
                    text.push_str(word);
                }
                None => run = Some((x + gap, word.to_string())),
            },
            Piece::Image(kind) => {
                if let Some((x_offset, text)) = run.take() {
                    items.push(LineItem::Text { x_offset, text });
                }
                items.push(LineItem::Image {
                    kind,
                    x_offset: x + gap,
                    width: w,
                    height: h,
                });
                height = height.max(h);
            }
        }
        x += gap + w;
        consumed += 1;
    }

    if let Some((x_offset, text)) = run.take() {
        items.push(LineItem::Text { x_offset, text });
    }

    Ok((
        PlacedLine {
            items,
            width: x,
            height,
        },
        &tokens[consumed..],
    ))
}

/// Greedy word wrap of plain text (no image markers) into line strings.
pub(crate) fn wrap_words(
    text: &str,
    metrics: &FontMetricTable,
    size: f32,
    max_width: f32,
) -> Vec<String> {
    let space_w = metrics.space_width * size;
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for word in text.split_whitespace() {
        let word_w = metrics.measure_pt(word, size);
        if current.is_empty() {
            current.push_str(word);
            current_width = word_w;
        } else if current_width + space_w + word_w > max_width {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_w;
        } else {
            current.push(' ');
            current.push_str(word);
            current_width += space_w + word_w;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ────────────────────────────────────────────────────────────────────────────
// Pagination
// ────────────────────────────────────────────────────────────────────────────

struct Paginator<'c> {
    config: &'c PageConfig,
    pages: Vec<PageLayout>,
    current: PageLayout,
    cursor_y: f32,
    /// Nothing has been placed on the current page yet.
    fresh: bool,
}

impl<'c> Paginator<'c> {
    fn new(config: &'c PageConfig) -> Self {
        Paginator {
            config,
            pages: Vec::new(),
            current: PageLayout::default(),
            cursor_y: config.top_pt(),
            fresh: true,
        }
    }

    fn start_new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.cursor_y = self.config.top_pt();
        self.fresh = true;
    }

    fn fits(&self, height: f32) -> bool {
        self.cursor_y - height >= self.config.bottom_pt()
    }

    fn body_height(&self) -> f32 {
        self.config.top_pt() - self.config.bottom_pt()
    }

    fn place_header(&mut self, header: &HeaderBlock) -> Result<(), AppError> {
        let (ops, extent) = header.layout(self.config);
        if extent > self.body_height() {
            return Err(AppError::Render(format!(
                "header block is {extent:.1}pt tall, page body holds {:.1}pt",
                self.body_height()
            )));
        }
        self.current.ops.extend(ops);
        self.cursor_y -= extent;
        self.fresh = false;
        Ok(())
    }

    fn blank_line(&mut self) {
        let height = self.config.body_line_height_pt();
        if self.fits(height) {
            self.cursor_y -= height;
            self.fresh = false;
        } else {
            // The gap is absorbed by the page break.
            self.start_new_page();
        }
    }

    fn place_line(&mut self, line: PlacedLine) -> Result<(), AppError> {
        if line.height > self.body_height() {
            return Err(AppError::Render(format!(
                "line box is {:.1}pt tall, page body holds {:.1}pt",
                line.height,
                self.body_height()
            )));
        }
        if !self.fits(line.height) && !self.fresh {
            self.start_new_page();
        }
        let size = self.config.body_font_size_pt;
        let left = self.config.margin_pt;
        let bottom = self.cursor_y - line.height;
        let baseline = bottom + DESCENT_FACTOR * size;

        for item in line.items {
            let op = match item {
                LineItem::Text { x_offset, text } => DrawOp::Text {
                    x: left + x_offset,
                    y: baseline,
                    font: self.config.body_font,
                    size,
                    text,
                },
                LineItem::Image {
                    kind,
                    x_offset,
                    width,
                    height,
                } => DrawOp::Image {
                    kind,
                    x: left + x_offset,
                    y: bottom,
                    width,
                    height,
                },
            };
            self.current.ops.push(op);
        }
        self.cursor_y = bottom;
        self.fresh = false;
        Ok(())
    }

    fn finish(mut self) -> LaidOutDocument {
        if !self.current.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        LaidOutDocument { pages: self.pages }
    }
}

/// Lays out an optional header and a substituted body onto fixed-size pages.
pub fn layout_document(
    header: Option<&HeaderBlock>,
    body: &str,
    config: &PageConfig,
    assets: &DocumentAssets,
) -> Result<LaidOutDocument, AppError> {
    let metrics = get_metrics(&config.body_font);
    let size = config.body_font_size_pt;
    let max_width = config.text_width_pt();
    let line_height = config.body_line_height_pt();

    let mut paginator = Paginator::new(config);
    if let Some(header) = header {
        paginator.place_header(header)?;
    }

    for raw_line in body.lines() {
        if raw_line.trim().is_empty() {
            paginator.blank_line();
            continue;
        }
        let tokens = tokenize(raw_line);
        let mut rest: &[Token<'_>] = &tokens;
        while !rest.is_empty() {
            let (line, residual) = take_line(rest, metrics, size, max_width, line_height, assets)?;
            paginator.place_line(line)?;
            rest = residual;
        }
    }

    Ok(paginator.finish())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::layout::assets::tests::{solid_asset, test_assets};
    use crate::layout::font_metrics::default_page_config;
    use crate::layout::header::HeaderLine;

    fn header() -> HeaderBlock {
        HeaderBlock {
            lines: vec![
                HeaderLine {
                    label: "Rol".to_string(),
                    value: "C-1234-2024".to_string(),
                },
                HeaderLine {
                    label: "Tribunal".to_string(),
                    value: "1º Juzgado Civil".to_string(),
                },
            ],
        }
    }

    fn long_body(paragraphs: usize) -> String {
        (0..paragraphs)
            .map(|i| {
                format!(
                    "Párrafo {i}: certifico haber notificado personalmente a la parte demandada \
                     en su domicilio, entregándole copia íntegra de la demanda y de lo proveído."
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_tokenize_splits_markers_inside_words() {
        let tokens = tokenize("Firma:[[firma]] y [[timbre]]fin");
        let pieces: Vec<Piece<'_>> = tokens.iter().map(|t| t.piece).collect();
        assert_eq!(
            pieces,
            vec![
                Piece::Word("Firma:"),
                Piece::Image(ImageKind::Signature),
                Piece::Word("y"),
                Piece::Image(ImageKind::Seal),
                Piece::Word("fin"),
            ]
        );
        assert!(!tokens[1].space_before);
        assert!(tokens[3].space_before);
        assert!(!tokens[4].space_before);
    }

    #[test]
    fn test_take_line_returns_residual_tokens() {
        let config = default_page_config();
        let metrics = get_metrics(&config.body_font);
        let text = "palabra ".repeat(100);
        let tokens = tokenize(&text);
        let (line, rest) = take_line(
            &tokens,
            metrics,
            config.body_font_size_pt,
            config.text_width_pt(),
            config.body_line_height_pt(),
            &DocumentAssets::default(),
        )
        .unwrap();
        assert!(line.width <= config.text_width_pt());
        assert!(!rest.is_empty());
        assert!(rest.len() < tokens.len());
    }

    #[test]
    fn test_oversized_word_still_consumed() {
        let config = default_page_config();
        let metrics = get_metrics(&config.body_font);
        let word = "x".repeat(500);
        let tokens = tokenize(&word);
        let (line, rest) = take_line(&tokens, metrics, 12.0, 100.0, 16.8, &DocumentAssets::default())
            .unwrap();
        assert!(rest.is_empty());
        assert!(line.width > 100.0);
    }

    #[test]
    fn test_image_advances_x_and_text_continues_after_it() {
        let config = default_page_config();
        let assets = test_assets();
        let doc = layout_document(None, "Firma [[firma]] Receptor", &config, &assets).unwrap();
        let ops = &doc.pages[0].ops;
        assert_eq!(ops.len(), 3);

        let image_x = match &ops[1] {
            DrawOp::Image { x, width, height, .. } => {
                assert!((width - 100.0).abs() < 1e-3);
                assert!((height - 50.0).abs() < 1e-3);
                *x
            }
            other => panic!("expected image, got {other:?}"),
        };
        match &ops[2] {
            DrawOp::Text { x, text, .. } => {
                assert_eq!(text, "Receptor");
                assert!(*x > image_x + 100.0);
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_image_line_is_taller_than_text_line() {
        let config = default_page_config();
        let assets = test_assets();
        let doc = layout_document(None, "[[firma]]\nsiguiente", &config, &assets).unwrap();
        let ops = &doc.pages[0].ops;
        let image_bottom = match &ops[0] {
            DrawOp::Image { y, .. } => *y,
            other => panic!("expected image, got {other:?}"),
        };
        assert!((config.top_pt() - image_bottom - 50.0).abs() < 1e-3);
        match &ops[1] {
            DrawOp::Text { y, .. } => assert!(*y < image_bottom),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_image_is_render_error() {
        let config = default_page_config();
        let result = layout_document(None, "[[timbre]]", &config, &DocumentAssets::default());
        assert!(matches!(result, Err(AppError::Render(_))));
    }

    #[test]
    fn test_image_taller_than_page_body_is_render_error() {
        let config = default_page_config();
        // 10x100 px drawn 100pt wide is 1000pt tall.
        let assets = DocumentAssets {
            signature: Some(Arc::new(solid_asset(10, 100, 100.0))),
            seal: None,
        };
        let result = layout_document(None, "Firma [[firma]]", &config, &assets);
        assert!(matches!(result, Err(AppError::Render(_))));
    }

    #[test]
    fn test_image_wider_than_text_column_is_render_error() {
        let config = default_page_config();
        let assets = DocumentAssets {
            signature: None,
            seal: Some(Arc::new(solid_asset(10, 1, config.text_width_pt() + 1.0))),
        };
        let result = layout_document(None, "[[timbre]]", &config, &assets);
        assert!(matches!(result, Err(AppError::Render(_))));
    }

    #[test]
    fn test_header_taller_than_page_body_is_render_error() {
        let config = default_page_config();
        let header = HeaderBlock {
            lines: vec![HeaderLine {
                label: "Carátula".to_string(),
                value: "Banco de Chile con Pérez Soto ".repeat(400),
            }],
        };
        let result = layout_document(Some(&header), "cuerpo", &config, &DocumentAssets::default());
        assert!(matches!(result, Err(AppError::Render(_))));
    }

    #[test]
    fn test_image_just_under_page_body_fits_on_one_page() {
        let config = default_page_config();
        // 10x100 px drawn 74pt wide is 740pt tall; the body holds 742pt.
        let assets = DocumentAssets {
            signature: Some(Arc::new(solid_asset(10, 100, 74.0))),
            seal: None,
        };
        let doc = layout_document(None, "[[firma]]", &config, &assets).unwrap();
        assert_eq!(doc.page_count(), 1);
        match &doc.pages[0].ops[0] {
            DrawOp::Image { y, .. } => assert!(*y >= config.bottom_pt()),
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_line_adds_vertical_space() {
        let config = default_page_config();
        let assets = DocumentAssets::default();
        let tight = layout_document(None, "uno\ndos", &config, &assets).unwrap();
        let spaced = layout_document(None, "uno\n\ndos", &config, &assets).unwrap();

        let second_y = |doc: &LaidOutDocument| match &doc.pages[0].ops[1] {
            DrawOp::Text { y, .. } => *y,
            other => panic!("expected text, got {other:?}"),
        };
        let delta = second_y(&tight) - second_y(&spaced);
        assert!((delta - config.body_line_height_pt()).abs() < 1e-3);
    }

    #[test]
    fn test_short_line_is_not_a_blank_line() {
        let config = default_page_config();
        let doc = layout_document(None, "a\n.\nb", &config, &DocumentAssets::default()).unwrap();
        assert_eq!(doc.page_text(0), vec!["a", ".", "b"]);
    }

    #[test]
    fn test_empty_body_yields_one_page() {
        let config = default_page_config();
        let doc = layout_document(None, "", &config, &DocumentAssets::default()).unwrap();
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn test_overflowing_body_paginates_and_header_only_on_first_page() {
        let config = default_page_config();
        let doc = layout_document(
            Some(&header()),
            &long_body(40),
            &config,
            &DocumentAssets::default(),
        )
        .unwrap();
        assert!(doc.page_count() >= 2, "expected ≥2 pages, got {}", doc.page_count());

        let header_hits: Vec<usize> = (0..doc.page_count())
            .filter(|&i| doc.page_text(i).contains(&"Rol:"))
            .collect();
        assert_eq!(header_hits, vec![0]);
    }

    #[test]
    fn test_nothing_drawn_below_bottom_margin() {
        let config = default_page_config();
        let doc = layout_document(
            Some(&header()),
            &long_body(60),
            &config,
            &DocumentAssets::default(),
        )
        .unwrap();
        for page in &doc.pages {
            for op in &page.ops {
                let y = match op {
                    DrawOp::Text { y, .. } => *y,
                    DrawOp::Image { y, .. } => *y,
                };
                assert!(y >= config.bottom_pt(), "op below margin: {op:?}");
            }
        }
    }

    #[test]
    fn test_header_pushes_first_body_line_down() {
        let config = default_page_config();
        let assets = DocumentAssets::default();
        let without = layout_document(None, "texto", &config, &assets).unwrap();
        let with = layout_document(Some(&header()), "texto", &config, &assets).unwrap();

        let body_y = |doc: &LaidOutDocument| {
            doc.pages[0]
                .ops
                .iter()
                .find_map(|op| match op {
                    DrawOp::Text { y, text, .. } if text == "texto" => Some(*y),
                    _ => None,
                })
                .unwrap()
        };
        let (_, extent) = header().layout(&config);
        assert!((body_y(&without) - body_y(&with) - extent).abs() < 1e-3);
    }

    #[test]
    fn test_wrap_words_respects_width() {
        let config = default_page_config();
        let metrics = get_metrics(&config.body_font);
        let lines = wrap_words(&"notificación ".repeat(30), metrics, 12.0, 200.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(metrics.measure_pt(line, 12.0) <= 200.0);
        }
    }
}

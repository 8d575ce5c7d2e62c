//! Fixed header block drawn once, at the top of page 1.

use serde::Serialize;

use crate::layout::font_metrics::{get_metrics, PageConfig};
use crate::layout::paginate::{wrap_words, DrawOp};
use crate::variables::resolver::{
    BANCO, CARATULA, DEMANDADO_NOMBRE, OFICINA, ROL, TRIBUNAL,
};
use crate::variables::Variables;

/// Space left between the header and the first body line, in body lines.
const HEADER_GAP_LINES: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderLine {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderBlock {
    pub lines: Vec<HeaderLine>,
}

impl HeaderBlock {
    /// Office, court, docket number, caption (or bank) and, when known, the opposing party.
    pub fn from_variables(vars: &Variables) -> Self {
        let caption = match vars.get(CARATULA) {
            "" => vars.get(BANCO),
            caption => caption,
        };
        let mut lines = vec![
            line("Oficina", vars.get(OFICINA)),
            line("Tribunal", vars.get(TRIBUNAL)),
            line("Rol", vars.get(ROL)),
            line("Carátula", caption),
        ];
        let party = vars.get(DEMANDADO_NOMBRE);
        if !party.is_empty() {
            lines.push(line("Demandado", party));
        }
        HeaderBlock { lines }
    }

    /// Draw operations for the header starting at the top margin, and the vertical
    /// extent consumed (including the gap before the body).
    pub fn layout(&self, config: &PageConfig) -> (Vec<DrawOp>, f32) {
        let label_metrics = get_metrics(&config.label_font);
        let value_metrics = get_metrics(&config.body_font);
        let size = config.header_font_size_pt;
        let line_height = config.header_line_height_pt();
        let left = config.margin_pt;

        let mut ops = Vec::new();
        let mut cursor = config.top_pt();

        for header_line in &self.lines {
            let label = format!("{}:", header_line.label);
            let value_x = left + label_metrics.measure_pt(&label, size) + value_metrics.space_width * size;
            let value_width = (config.margin_pt + config.text_width_pt() - value_x).max(size);

            let mut wrapped = wrap_words(&header_line.value, value_metrics, size, value_width);
            if wrapped.is_empty() {
                wrapped.push(String::new());
            }

            for (i, text) in wrapped.into_iter().enumerate() {
                let baseline = cursor - size;
                if i == 0 {
                    ops.push(DrawOp::Text {
                        x: left,
                        y: baseline,
                        font: config.label_font,
                        size,
                        text: label.clone(),
                    });
                }
                if !text.is_empty() {
                    ops.push(DrawOp::Text {
                        x: value_x,
                        y: baseline,
                        font: config.body_font,
                        size,
                        text,
                    });
                }
                cursor -= line_height;
            }
        }

        let extent = config.top_pt() - cursor + HEADER_GAP_LINES * config.body_line_height_pt();
        (ops, extent)
    }
}

fn line(label: &str, value: &str) -> HeaderLine {
    HeaderLine {
        label: label.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::default_page_config;

    fn header_vars() -> Variables {
        [
            (OFICINA, "Receptoría Santiago"),
            (TRIBUNAL, "1º Juzgado Civil"),
            (ROL, "C-1234-2024"),
            (CARATULA, ""),
            (BANCO, "Banco X"),
            (DEMANDADO_NOMBRE, "Juan Pérez"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_caption_falls_back_to_bank() {
        let block = HeaderBlock::from_variables(&header_vars());
        let caption = block.lines.iter().find(|l| l.label == "Carátula").unwrap();
        assert_eq!(caption.value, "Banco X");
    }

    #[test]
    fn test_party_line_only_when_resolvable() {
        let mut vars = header_vars();
        assert_eq!(HeaderBlock::from_variables(&vars).lines.len(), 5);
        vars.insert(DEMANDADO_NOMBRE, "");
        let block = HeaderBlock::from_variables(&vars);
        assert_eq!(block.lines.len(), 4);
        assert!(block.lines.iter().all(|l| l.label != "Demandado"));
    }

    #[test]
    fn test_extent_covers_every_line_plus_gap() {
        let config = default_page_config();
        let block = HeaderBlock::from_variables(&header_vars());
        let (ops, extent) = block.layout(&config);
        let expected = 5.0 * config.header_line_height_pt() + config.body_line_height_pt();
        assert!((extent - expected).abs() < 1e-3, "extent {extent} != {expected}");
        // one label + one value per line
        assert_eq!(ops.len(), 10);
    }

    #[test]
    fn test_long_value_wraps_and_grows_extent() {
        let config = default_page_config();
        let mut vars = header_vars();
        vars.insert(CARATULA, "Banco X con Pérez y otros ".repeat(12));
        let block = HeaderBlock::from_variables(&vars);
        let (_, extent) = block.layout(&config);
        let single = 5.0 * config.header_line_height_pt() + config.body_line_height_pt();
        assert!(extent > single);
    }
}

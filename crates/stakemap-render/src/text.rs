pub mod wrap;

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

pub use wrap::wrap_text_lines;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: f64,
    pub font_weight: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: 16.0,
            font_weight: None,
        }
    }
}

impl TextStyle {
    pub fn bold(font_size: f64) -> Self {
        Self {
            font_family: None,
            font_size,
            font_weight: Some("bold".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub line_count: usize,
}

pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;

    fn line_height(&self, style: &TextStyle) -> f64 {
        self.measure("M", style).height
    }
}

/// Font-free measurer: every terminal column is `char_width_factor` em wide.
///
/// East Asian wide characters count as two columns, which keeps CJK names from being
/// underestimated.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
}

impl DeterministicTextMeasurer {
    pub fn normalized_text_lines(text: &str) -> Vec<String> {
        let out = text
            .replace("\r\n", "\n")
            .split('\n')
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        if out.is_empty() {
            return vec!["".to_string()];
        }
        out
    }

    pub fn char_width_factor(&self) -> f64 {
        if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        }
    }

    pub fn line_height_factor(&self) -> f64 {
        if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        }
    }

    pub fn line_width(&self, line: &str, font_size: f64) -> f64 {
        UnicodeWidthStr::width(line) as f64 * font_size.max(1.0) * self.char_width_factor()
    }
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let lines = Self::normalized_text_lines(text);
        let font_size = style.font_size.max(1.0);
        let bold_factor = if style.font_weight.as_deref() == Some("bold") {
            1.1
        } else {
            1.0
        };
        let width = lines
            .iter()
            .map(|line| self.line_width(line, font_size) * bold_factor)
            .fold(0.0, f64::max);
        let height = lines.len() as f64 * font_size * self.line_height_factor();
        TextMetrics {
            width,
            height,
            line_count: lines.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_measurer_counts_columns() {
        let m = DeterministicTextMeasurer::default();
        let style = TextStyle::default();
        let metrics = m.measure("abcd", &style);
        assert_eq!(metrics.width, 4.0 * 16.0 * 0.6);
        assert_eq!(metrics.line_count, 1);
        assert!((metrics.height - 19.2).abs() < 1e-9);

        // Two lines: the wider one wins, height doubles.
        let metrics = m.measure("ab\nabcdef", &style);
        assert_eq!(metrics.width, 6.0 * 16.0 * 0.6);
        assert_eq!(metrics.line_count, 2);
    }

    #[test]
    fn wide_characters_take_two_columns() {
        let m = DeterministicTextMeasurer::default();
        let style = TextStyle::default();
        assert_eq!(
            m.measure("株式", &style).width,
            m.measure("abcd", &style).width
        );
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::Color;

/// Tunables for one editor session. Every field has a default so a partial
/// `[editor]` table in the config file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Quiet period after the last edit before the autosave signal fires.
    pub autosave_delay_ms: u64,
    pub base_font_size: f32,
    /// Font size multipliers for heading levels 1 to 6.
    pub heading_scales: [f32; 6],
    /// Head indent added per list depth level.
    pub list_indent: f32,
    pub quote_indent: f32,
    /// Horizontal padding on each side of a table cell.
    pub table_cell_inset: f32,
    /// Width of one terminal column, used by the default text measurer.
    pub char_advance: f32,
    pub glyphs: Glyphs,
    pub theme: Theme,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            autosave_delay_ms: 800,
            base_font_size: 16.0,
            heading_scales: [2.0, 1.6, 1.35, 1.2, 1.1, 1.0],
            list_indent: 24.0,
            quote_indent: 16.0,
            table_cell_inset: 8.0,
            char_advance: 8.0,
            glyphs: Glyphs::default(),
            theme: Theme::default(),
        }
    }
}

impl EngineOptions {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn heading_size(&self, level: u8) -> f32 {
        let idx = usize::from(level.clamp(1, 6)) - 1;
        self.base_font_size * self.heading_scales[idx]
    }
}

/// Synthetic marker text shown on inactive lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Glyphs {
    pub bullet: String,
    pub unchecked: String,
    pub checked: String,
    pub quote: String,
    pub rule: String,
}

impl Default for Glyphs {
    fn default() -> Self {
        Self {
            bullet: "•".to_string(),
            unchecked: "☐".to_string(),
            checked: "☑".to_string(),
            quote: "┃".to_string(),
            rule: "⎯⎯⎯".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub text: Color,
    pub secondary: Color,
    pub accent: Color,
    pub marker: Color,
    pub code_foreground: Color,
    pub code_background: Color,
    pub quote_foreground: Color,
    pub quote_background: Color,
    pub table_header: Color,
    pub table_row: Color,
    pub table_row_alt: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text: Color::rgb(0x1d, 0x1d, 0x1f),
            secondary: Color::rgb(0x8e, 0x8e, 0x93),
            accent: Color::rgb(0x00, 0x7a, 0xff),
            marker: Color::rgb(0x63, 0x63, 0x66),
            code_foreground: Color::rgb(0xc4, 0x1a, 0x16),
            code_background: Color::rgba(0x8e, 0x8e, 0x93, 0x26),
            quote_foreground: Color::rgb(0x48, 0x48, 0x4a),
            quote_background: Color::rgba(0x00, 0x7a, 0xff, 0x0d),
            table_header: Color::rgba(0x8e, 0x8e, 0x93, 0x40),
            table_row: Color::rgba(0x8e, 0x8e, 0x93, 0x0d),
            table_row_alt: Color::rgba(0x8e, 0x8e, 0x93, 0x1f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_autosave_delay_is_800ms() {
        assert_eq!(
            EngineOptions::default().autosave_delay(),
            Duration::from_millis(800)
        );
    }

    #[test]
    fn heading_size_scales_from_base() {
        let options = EngineOptions::default();
        assert_eq!(options.heading_size(1), 32.0);
        assert_eq!(options.heading_size(6), 16.0);
        assert_eq!(options.heading_size(0), options.heading_size(1));
    }
}

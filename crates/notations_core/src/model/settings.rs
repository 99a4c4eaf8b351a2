//! Typography and paper settings carried in the state snapshot.
//!
//! # Responsibility
//! - Define the settings shape persisted alongside the tree.
//! - Normalize loaded values (clamped font size, finite margins).
//!
//! # Invariants
//! - Unknown snapshot fields round-trip unchanged through `extra`.
//! - Unrecognized preset names fall back to defaults instead of failing.

use crate::model::node::Margins;
use serde::{Deserialize, Serialize};

pub const FONT_SIZE_MIN: u32 = 10;
pub const FONT_SIZE_MAX: u32 = 100;
pub const FONT_SIZE_STEP: u32 = 2;

const DEFAULT_FONT_SIZE: u32 = 18;
const DEFAULT_LINE_HEIGHT: f64 = 1.5;

/// Paper preset selector. Geometry lives with the print layer, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaperSize {
    Letter,
    A4,
}

impl PaperSize {
    pub fn key(self) -> &'static str {
        match self {
            PaperSize::Letter => "letter",
            PaperSize::A4 => "a4",
        }
    }
}

impl From<String> for PaperSize {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "a4" => PaperSize::A4,
            _ => PaperSize::Letter,
        }
    }
}

impl From<PaperSize> for String {
    fn from(value: PaperSize) -> Self {
        value.key().to_string()
    }
}

/// Font preset selector; concrete font stacks live with the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FontFamily {
    Monospace,
    Sans,
    Serif,
}

impl FontFamily {
    pub fn key(self) -> &'static str {
        match self {
            FontFamily::Monospace => "monospace",
            FontFamily::Sans => "sans",
            FontFamily::Serif => "serif",
        }
    }
}

impl From<String> for FontFamily {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "sans" => FontFamily::Sans,
            "serif" => FontFamily::Serif,
            _ => FontFamily::Monospace,
        }
    }
}

impl From<FontFamily> for String {
    fn from(value: FontFamily) -> Self {
        value.key().to_string()
    }
}

/// Snaps a font size to the supported range and step grid.
pub fn normalize_font_size(value: u32) -> u32 {
    let clamped = value.clamp(FONT_SIZE_MIN, FONT_SIZE_MAX);
    let stepped = ((clamped + FONT_SIZE_STEP / 2) / FONT_SIZE_STEP) * FONT_SIZE_STEP;
    stepped.clamp(FONT_SIZE_MIN, FONT_SIZE_MAX)
}

/// Editor-wide settings persisted in the snapshot.
///
/// Fields this build does not recognize are captured in `extra` and written
/// back verbatim on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub paper_size: PaperSize,
    pub font_family: FontFamily,
    pub font_size: u32,
    pub line_height: f64,
    pub margins: Margins,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Settings {
    /// Clamps every field to its supported range.
    pub fn normalize(&mut self) {
        self.font_size = normalize_font_size(self.font_size);
        if !self.line_height.is_finite() || self.line_height <= 0.0 {
            self.line_height = DEFAULT_LINE_HEIGHT;
        }
        self.margins = self.margins.normalized(&Margins::DEFAULT);
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            paper_size: PaperSize::Letter,
            font_family: FontFamily::Monospace,
            font_size: DEFAULT_FONT_SIZE,
            line_height: DEFAULT_LINE_HEIGHT,
            margins: Margins::DEFAULT,
            extra: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_font_size, FontFamily, PaperSize, Settings};

    #[test]
    fn font_size_snaps_to_step_grid() {
        assert_eq!(normalize_font_size(18), 18);
        assert_eq!(normalize_font_size(19), 20);
        assert_eq!(normalize_font_size(3), 10);
        assert_eq!(normalize_font_size(999), 100);
    }

    #[test]
    fn unknown_presets_fall_back_to_defaults() {
        assert_eq!(PaperSize::from("tabloid".to_string()), PaperSize::Letter);
        assert_eq!(FontFamily::from("wingdings".to_string()), FontFamily::Monospace);
        assert_eq!(PaperSize::from(" A4 ".to_string()), PaperSize::A4);
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = r#"{"paperSize":"a4","fontSize":19,"theme":"sepia","colophon":{"year":2024}}"#;
        let mut settings: Settings = serde_json::from_str(raw).unwrap();
        settings.normalize();

        assert_eq!(settings.paper_size, PaperSize::A4);
        assert_eq!(settings.font_size, 20);

        let out = serde_json::to_value(&settings).unwrap();
        assert_eq!(out["theme"], "sepia");
        assert_eq!(out["colophon"]["year"], 2024);
    }
}

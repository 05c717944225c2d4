use serde::{Deserialize, Serialize};

use crate::scan::RiskLevel;

/// RGB colour triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor(pub u8, pub u8, pub u8);

impl RgbColor {
    /// CSS hex notation (`#rrggbb`)
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Components scaled to 0.0..=1.0 for PDF colour operators
    pub fn unit(&self) -> (f32, f32, f32) {
        (
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        )
    }
}

/// Report colour palette shared by the chart, PDF and HTML renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub primary: RgbColor,
    pub secondary: RgbColor,
    pub neutral: RgbColor,
    pub background: RgbColor,
    pub dark: RgbColor,
    pub high_risk: RgbColor,
    pub medium_risk: RgbColor,
    pub low_risk: RgbColor,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: RgbColor(66, 99, 147),
            secondary: RgbColor(214, 188, 250),
            neutral: RgbColor(142, 145, 150),
            background: RgbColor(241, 240, 251),
            dark: RgbColor(34, 31, 38),
            high_risk: RgbColor(239, 83, 80),
            medium_risk: RgbColor(255, 167, 38),
            low_risk: RgbColor(102, 187, 106),
        }
    }
}

impl Palette {
    /// Colour used for a risk tier
    pub fn risk(&self, level: RiskLevel) -> RgbColor {
        match level {
            RiskLevel::High => self.high_risk,
            RiskLevel::Medium => self.medium_risk,
            RiskLevel::Low => self.low_risk,
        }
    }

    /// Slice colours for proportion charts, cycled when there are more slices
    pub fn series(&self) -> [RgbColor; 5] {
        [
            self.primary,
            self.secondary,
            self.neutral,
            self.dark,
            self.background,
        ]
    }
}

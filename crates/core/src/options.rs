//! Per-image processing options.

use serde::{Deserialize, Serialize};

/// Largest possible Euclidean distance between two RGB triples.
pub const MAX_RGB_DISTANCE: f64 = 441.672_955_930_063_7;

/// Default chroma distance below which a pixel counts as background.
pub const DEFAULT_BG_TOLERANCE: f64 = 35.0;

/// Strategy for estimating the background color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BgSample {
    /// Three pixels at each of the four corners.
    #[default]
    Corners,
    /// Evenly spaced points along all four edges.
    Border,
}

impl BgSample {
    pub fn as_str(self) -> &'static str {
        match self {
            BgSample::Corners => "corners",
            BgSample::Border => "border",
        }
    }

    /// Parse the persisted form, `None` for anything unrecognised.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "corners" => Some(BgSample::Corners),
            "border" => Some(BgSample::Border),
            _ => None,
        }
    }
}

/// Options controlling background removal for one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProcessOptions {
    #[serde(default = "default_true")]
    pub remove_bg: bool,
    #[serde(default = "default_tolerance")]
    pub bg_tolerance: f64,
    #[serde(default)]
    pub bg_sample: BgSample,
}

fn default_true() -> bool {
    true
}

fn default_tolerance() -> f64 {
    DEFAULT_BG_TOLERANCE
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self { remove_bg: true, bg_tolerance: DEFAULT_BG_TOLERANCE, bg_sample: BgSample::Corners }
    }
}

impl ProcessOptions {
    /// Build options from optional per-item overrides, filling defaults field by field.
    ///
    /// Non-finite tolerances fall back to the default; the rest are clamped
    /// to `[0, MAX_RGB_DISTANCE]`.
    pub fn from_parts(remove_bg: Option<bool>, bg_tolerance: Option<f64>, bg_sample: Option<BgSample>) -> Self {
        let bg_tolerance = match bg_tolerance {
            Some(t) if t.is_finite() => t.clamp(0.0, MAX_RGB_DISTANCE),
            _ => DEFAULT_BG_TOLERANCE,
        };

        Self { remove_bg: remove_bg.unwrap_or(true), bg_tolerance, bg_sample: bg_sample.unwrap_or_default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ProcessOptions::default();
        assert!(opts.remove_bg);
        assert_eq!(opts.bg_tolerance, 35.0);
        assert_eq!(opts.bg_sample, BgSample::Corners);
        assert_eq!(ProcessOptions::from_parts(None, None, None), opts);
    }

    #[test]
    fn test_from_parts_clamps_tolerance() {
        assert_eq!(ProcessOptions::from_parts(None, Some(-3.0), None).bg_tolerance, 0.0);
        assert_eq!(ProcessOptions::from_parts(None, Some(1000.0), None).bg_tolerance, MAX_RGB_DISTANCE);
        assert_eq!(ProcessOptions::from_parts(None, Some(f64::NAN), None).bg_tolerance, 35.0);
    }

    #[test]
    fn test_deserialize_partial() {
        let opts: ProcessOptions = serde_json::from_str(r#"{"bg_sample":"border"}"#).unwrap();
        assert!(opts.remove_bg);
        assert_eq!(opts.bg_tolerance, 35.0);
        assert_eq!(opts.bg_sample, BgSample::Border);
    }

    #[test]
    fn test_bg_sample_parse() {
        assert_eq!(BgSample::parse("Border"), Some(BgSample::Border));
        assert_eq!(BgSample::parse("corners"), Some(BgSample::Corners));
        assert_eq!(BgSample::parse("diagonal"), None);
    }
}

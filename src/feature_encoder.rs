//! Structured design → 14 quality features in [0, 1].

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::QualityCatalog;
use crate::color::{normalize_hex, Rgb};
use crate::design_input::StructuredInput;

pub const FEATURE_COUNT: usize = 14;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "palette_quality",
    "font_quality",
    "layout_score",
    "spacing_score",
    "contrast_score",
    "palette_size",
    "font_count",
    "has_white_or_black",
    "has_light_and_dark",
    "palette_x_contrast",
    "font_x_layout",
    "spacing_x_layout",
    "typography_balance",
    "structure_balance",
];

const NEUTRAL_SCORE: f64 = 0.5;
const NEUTRAL_SPACING_SCORE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_f32(&self) -> [f32; FEATURE_COUNT] {
        self.0.map(|v| v as f32)
    }
}

/// The five categorical sub-scores, exposed for explanations and reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub palette: f64,
    pub font: f64,
    pub layout: f64,
    pub spacing: f64,
    pub contrast: f64,
}

pub struct FeatureEncoder {
    catalog: Arc<QualityCatalog>,
    good_palettes: Vec<Vec<String>>,
    bad_palettes: Vec<Vec<String>>,
}

impl FeatureEncoder {
    pub fn new(catalog: Arc<QualityCatalog>) -> Self {
        let good_palettes = catalog.good_palettes.iter().map(|p| palette_key(p)).collect();
        let bad_palettes = catalog.bad_palettes.iter().map(|p| palette_key(p)).collect();
        Self {
            catalog,
            good_palettes,
            bad_palettes,
        }
    }

    pub fn encode(&self, input: &StructuredInput) -> FeatureVector {
        let scores = self.scores(input);
        let palette = &input.palette;

        let palette_size = (palette.len() as f64 / 5.0).min(1.0);
        let font_count = (input.fonts.len() as f64 / 3.0).min(1.0);

        let parsed: Vec<Rgb> = palette.iter().filter_map(|c| Rgb::parse(c)).collect();
        let has_white_or_black = flag(parsed.iter().any(|c| c.is_white() || c.is_black()));
        let has_light_and_dark = flag(has_light_and_dark(&parsed));

        let values = [
            scores.palette,
            scores.font,
            scores.layout,
            scores.spacing,
            scores.contrast,
            palette_size,
            font_count,
            has_white_or_black,
            has_light_and_dark,
            scores.palette * scores.contrast,
            scores.font * scores.layout,
            scores.spacing * scores.layout,
            (scores.palette + scores.font) / 2.0,
            (scores.layout + scores.spacing + scores.contrast) / 3.0,
        ];
        FeatureVector(values.map(|v| v.clamp(0.0, 1.0)))
    }

    pub fn scores(&self, input: &StructuredInput) -> QualityScores {
        let catalog = &self.catalog;
        QualityScores {
            palette: self.palette_quality(&input.palette),
            font: self.font_quality(&input.fonts),
            layout: categorical(
                input.layout.as_deref(),
                &catalog.good_layouts,
                &[],
                &catalog.bad_layouts,
            ),
            spacing: categorical(
                input.spacing.as_deref(),
                &catalog.good_spacing,
                &catalog.neutral_spacing,
                &catalog.bad_spacing,
            ),
            contrast: categorical(
                input.contrast.as_deref(),
                &catalog.good_contrast,
                &[],
                &catalog.bad_contrast,
            ),
        }
    }

    pub fn palette_quality(&self, palette: &[String]) -> f64 {
        if palette.is_empty() {
            return 0.0;
        }

        let key = palette_key(palette);
        if self.good_palettes.contains(&key) {
            return 1.0;
        }
        if self.bad_palettes.contains(&key) {
            return 0.0;
        }

        let parsed: Vec<Rgb> = palette.iter().filter_map(|c| Rgb::parse(c)).collect();
        let mut score = NEUTRAL_SCORE;
        if has_light_and_dark(&parsed) {
            score += 0.2;
        }
        if (3..=5).contains(&palette.len()) {
            score += 0.1;
        }
        if parsed.iter().filter(|c| c.is_highly_saturated()).count() >= 3 {
            score -= 0.2;
        }
        score.clamp(0.0, 1.0)
    }

    pub fn font_quality(&self, fonts: &[String]) -> f64 {
        if fonts.is_empty() {
            return 0.0;
        }

        let matches = |font: &str, list: &[String]| {
            let font = font.to_lowercase();
            list.iter().any(|known| font.contains(&known.to_lowercase()))
        };
        let good = fonts
            .iter()
            .filter(|f| matches(f, &self.catalog.good_fonts))
            .count();
        let bad = fonts
            .iter()
            .filter(|f| matches(f, &self.catalog.bad_fonts))
            .count();

        match (good, bad) {
            (g, 0) if g > 0 => 1.0,
            (0, b) if b > 0 => 0.0,
            (g, b) if g > b => 0.7,
            (g, b) if b > g => 0.3,
            _ => NEUTRAL_SCORE,
        }
    }
}

/// Order-independent comparison key for catalog palette matching.
fn palette_key(palette: &[String]) -> Vec<String> {
    let mut key: Vec<String> = palette.iter().map(|c| normalize_hex(c)).collect();
    key.sort();
    key
}

fn has_light_and_dark(colors: &[Rgb]) -> bool {
    colors.iter().any(Rgb::is_light) && colors.iter().any(|c| !c.is_light())
}

fn categorical(value: Option<&str>, good: &[String], neutral: &[String], bad: &[String]) -> f64 {
    let Some(value) = value else {
        return NEUTRAL_SCORE;
    };
    let value = value.trim().to_lowercase();
    let contains = |list: &[String]| list.iter().any(|item| item.eq_ignore_ascii_case(&value));

    if contains(good) {
        1.0
    } else if contains(bad) {
        0.0
    } else if contains(neutral) {
        NEUTRAL_SPACING_SCORE
    } else {
        NEUTRAL_SCORE
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> FeatureEncoder {
        FeatureEncoder::new(Arc::new(QualityCatalog::default()))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_curated_palettes_score_at_extremes() {
        let encoder = encoder();
        assert_eq!(encoder.palette_quality(&strings(&["#000000", "#FFFFFF", "#3498DB"])), 1.0);
        assert_eq!(encoder.palette_quality(&strings(&["#FF00FF", "#FFFF00", "#00FFFF"])), 0.0);
    }

    #[test]
    fn test_palette_match_ignores_order_and_case() {
        let encoder = encoder();
        assert_eq!(encoder.palette_quality(&strings(&["#3498db", "#fff", "#000"])), 1.0);
    }

    #[test]
    fn test_heuristic_palette_score() {
        let encoder = encoder();
        // light + dark, size 3, no saturation penalty
        let score = encoder.palette_quality(&strings(&["#FFFFFF", "#1E293B", "#64748B"]));
        assert!((score - 0.8).abs() < 1e-9);

        // single dark color: no light/dark bonus, no size bonus
        let score = encoder.palette_quality(&strings(&["#1E293B"]));
        assert!((score - 0.5).abs() < 1e-9);

        // three saturated colors, none light-and-dark
        let score = encoder.palette_quality(&strings(&["#FF0000", "#CC0000", "#0000FF"]));
        assert!((score - 0.4).abs() < 1e-9);

        assert_eq!(encoder.palette_quality(&[]), 0.0);
    }

    #[test]
    fn test_font_quality() {
        let encoder = encoder();
        assert_eq!(encoder.font_quality(&strings(&["Roboto", "Open Sans"])), 1.0);
        assert_eq!(encoder.font_quality(&strings(&["Comic Sans MS", "Papyrus"])), 0.0);
        assert_eq!(encoder.font_quality(&strings(&["Roboto", "Lato", "Papyrus"])), 0.7);
        assert_eq!(encoder.font_quality(&strings(&["Roboto", "Papyrus"])), 0.5);
        assert_eq!(encoder.font_quality(&strings(&["Unknown Grotesk"])), 0.5);
        assert_eq!(encoder.font_quality(&[]), 0.0);
    }

    #[test]
    fn test_categorical_scores() {
        let encoder = encoder();
        let input = StructuredInput {
            layout: Some("grid".into()),
            spacing: Some("compact".into()),
            contrast: Some("low".into()),
            ..Default::default()
        };
        let scores = encoder.scores(&input);
        assert_eq!(scores.layout, 1.0);
        assert_eq!(scores.spacing, 0.6);
        assert_eq!(scores.contrast, 0.0);

        let scores = encoder.scores(&StructuredInput::default());
        assert_eq!(scores.layout, 0.5);
        assert_eq!(scores.spacing, 0.5);
        assert_eq!(scores.contrast, 0.5);
    }

    #[test]
    fn test_vector_layout() {
        let encoder = encoder();
        let input = StructuredInput {
            palette: strings(&["#000000", "#FFFFFF", "#3498DB"]),
            fonts: strings(&["Roboto", "Open Sans"]),
            layout: Some("grid".into()),
            spacing: Some("medium".into()),
            contrast: Some("high".into()),
        };
        let vector = encoder.encode(&input);
        let v = vector.as_slice();

        assert_eq!(v.len(), FEATURE_COUNT);
        assert_eq!(&v[..5], &[1.0, 1.0, 1.0, 1.0, 1.0]);
        assert!((v[5] - 0.6).abs() < 1e-9);
        assert!((v[6] - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(v[7], 1.0);
        assert_eq!(v[8], 1.0);
        assert_eq!(&v[9..], &[1.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(encoder.encode(&input), vector);
    }

    #[test]
    fn test_unparseable_colors_are_neutral() {
        let encoder = encoder();
        let input = StructuredInput {
            palette: strings(&["teal", "not-a-color"]),
            ..Default::default()
        };
        let vector = encoder.encode(&input);
        assert_eq!(vector.as_slice()[7], 0.0);
        assert_eq!(vector.as_slice()[8], 0.0);
        assert!(vector.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    }
}

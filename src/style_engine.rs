//! Input → analysis → style package.
//!
//! `StyleEngine` wires the encoder, keyword analyzer and selector over one
//! pair of catalogs. Narrative briefs are normalized to a structured design
//! first so both input shapes produce the same 14-feature encoding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::{QualityCatalog, StyleCatalog};
use crate::color::Rgb;
use crate::design_input::{DesignInput, InputKind, StructuredInput};
use crate::errors::AdvisorResult;
use crate::feature_encoder::{FeatureEncoder, FeatureVector, QualityScores};
use crate::keyword_analyzer::{KeywordAnalyzer, StyleCategory, StyleProfile};
use crate::style_selector::{StyleAssignment, StyleSelector};

const DEFAULT_BACKGROUND: &str = "#FFFFFF";
const DEFAULT_TEXT: &str = "#1E293B";

/// Palettes rendered on a dark surface: background and text roles swap.
const DARK_SURFACE_PALETTES: [&str; 2] = ["dark_true_crime", "cyberpunk"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub kind: InputKind,
    pub structured: StructuredInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<StyleProfile>,
    pub keywords: Vec<String>,
    pub sector: Option<String>,
    pub assignment: StyleAssignment,
    pub scores: QualityScores,
    pub features: FeatureVector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRoles {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
}

impl ColorRoles {
    fn from_assignment(assignment: &StyleAssignment) -> Self {
        let pick = |i: usize, fallback: &str| {
            assignment
                .palette
                .get(i)
                .cloned()
                .unwrap_or_else(|| fallback.to_string())
        };
        let mut roles = Self {
            primary: pick(0, DEFAULT_TEXT),
            secondary: pick(1, DEFAULT_TEXT),
            accent: pick(2, DEFAULT_TEXT),
            background: DEFAULT_BACKGROUND.to_string(),
            text: DEFAULT_TEXT.to_string(),
        };

        if DARK_SURFACE_PALETTES.contains(&assignment.color_style.as_str()) {
            let by_luminance = |darkest: bool| {
                assignment
                    .palette
                    .iter()
                    .filter_map(|c| Rgb::parse(c).map(|rgb| (rgb.luminance(), c)))
                    .reduce(|a, b| if (b.0 < a.0) == darkest { b } else { a })
                    .map(|(_, c)| c.clone())
            };
            if let (Some(dark), Some(light)) = (by_luminance(true), by_luminance(false)) {
                roles.background = dark;
                roles.text = light;
            }
        }
        roles
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignTokens {
    pub spacing: BTreeMap<String, String>,
    pub font_size: BTreeMap<String, String>,
    pub radii: BTreeMap<String, String>,
    pub shadows: BTreeMap<String, String>,
}

impl DesignTokens {
    fn from_assignment(assignment: &StyleAssignment) -> Self {
        let scale = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        let components = &assignment.components;
        Self {
            spacing: scale(&[
                ("xs", "4px"),
                ("sm", "8px"),
                ("md", "16px"),
                ("lg", "24px"),
                ("xl", "32px"),
            ]),
            font_size: scale(&[
                ("xs", "12px"),
                ("sm", "14px"),
                ("md", "16px"),
                ("lg", "20px"),
                ("xl", "24px"),
                ("xxl", "32px"),
            ]),
            radii: scale(&[
                ("none", "0"),
                ("button", components.button_radius.as_str()),
                ("card", components.card_radius.as_str()),
                ("input", components.input_radius.as_str()),
                ("base", components.border_radius.as_str()),
                ("full", "9999px"),
            ]),
            shadows: scale(&[
                ("sm", "0 1px 2px rgba(0, 0, 0, 0.05)"),
                ("md", "0 4px 6px -1px rgba(0, 0, 0, 0.1)"),
                ("lg", "0 10px 15px -3px rgba(0, 0, 0, 0.1)"),
                ("component", components.shadow.as_str()),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylePackage {
    pub input_kind: InputKind,
    #[serde(flatten)]
    pub assignment: StyleAssignment,
    pub colors: ColorRoles,
    pub tokens: DesignTokens,
    pub keywords: Vec<String>,
    pub features: FeatureVector,
    pub confidence: f64,
    pub explanation: String,
}

pub struct StyleEngine {
    encoder: FeatureEncoder,
    analyzer: KeywordAnalyzer,
    selector: StyleSelector,
}

impl Default for StyleEngine {
    fn default() -> Self {
        Self::new(QualityCatalog::default(), StyleCatalog::default())
    }
}

impl StyleEngine {
    pub fn new(quality: QualityCatalog, styles: StyleCatalog) -> Self {
        let styles = Arc::new(styles);
        Self {
            encoder: FeatureEncoder::new(Arc::new(quality)),
            analyzer: KeywordAnalyzer::new(&styles),
            selector: StyleSelector::new(styles),
        }
    }

    pub fn analyze(&self, input: &DesignInput) -> AdvisorResult<Analysis> {
        let (structured, profile, keywords, sector, assignment) = match input {
            DesignInput::Structured(structured) => {
                let assignment = self.selector.select_structured(structured)?;
                (structured.clone(), None, Vec::new(), None, assignment)
            }
            DesignInput::Narrative(narrative) => {
                let text = narrative.free_text();
                let profile = self.analyzer.analyze(&text);
                let assignment = self.selector.select(&profile, &narrative.sector)?;
                let structured = normalize_narrative(&profile, &assignment);
                let sector = Some(narrative.sector.trim().to_lowercase()).filter(|s| !s.is_empty());
                let keywords = self.analyzer.matched_keywords(&text);
                (structured, Some(profile), keywords, sector, assignment)
            }
        };

        Ok(Analysis {
            kind: input.kind(),
            scores: self.encoder.scores(&structured),
            features: self.encoder.encode(&structured),
            structured,
            profile,
            keywords,
            sector,
            assignment,
        })
    }

    /// Feature vector only; what dataset preparation needs.
    pub fn encode(&self, input: &DesignInput) -> AdvisorResult<FeatureVector> {
        match input {
            DesignInput::Structured(structured) => Ok(self.encoder.encode(structured)),
            DesignInput::Narrative(narrative) => {
                let profile = self.analyzer.analyze(&narrative.free_text());
                let assignment = self.selector.select(&profile, &narrative.sector)?;
                Ok(self.encoder.encode(&normalize_narrative(&profile, &assignment)))
            }
        }
    }

    pub fn package(&self, analysis: Analysis, confidence: f64) -> StylePackage {
        let explanation = explain(&analysis, confidence);
        StylePackage {
            input_kind: analysis.kind,
            colors: ColorRoles::from_assignment(&analysis.assignment),
            tokens: DesignTokens::from_assignment(&analysis.assignment),
            assignment: analysis.assignment,
            keywords: analysis.keywords,
            features: analysis.features,
            confidence,
            explanation,
        }
    }
}

/// Structured stand-in for a narrative brief.
pub fn normalize_narrative(profile: &StyleProfile, assignment: &StyleAssignment) -> StructuredInput {
    use StyleCategory::*;

    let fonts: [&str; 2] = if profile.any(&[Luxury, Professional]) {
        ["Georgia", "Helvetica"]
    } else if profile.is(Creative) {
        ["Montserrat", "Poppins"]
    } else if profile.is(Modern) {
        ["Inter", "Roboto"]
    } else {
        ["Roboto", "Open Sans"]
    };

    let pick = |on: bool, yes: &str, no: &str| Some((if on { yes } else { no }).to_string());

    StructuredInput {
        palette: assignment.palette.iter().take(3).cloned().collect(),
        fonts: fonts.iter().map(|f| f.to_string()).collect(),
        layout: pick(profile.is(Modern), "grid", "flex"),
        spacing: pick(profile.is(Creative), "wide", "medium"),
        contrast: pick(profile.is(Professional), "high", "medium-high"),
    }
}

fn explain(analysis: &Analysis, confidence: f64) -> String {
    let assignment = &analysis.assignment;
    let reason = match analysis.kind {
        InputKind::Structured => "the submitted design".to_string(),
        InputKind::Narrative if !analysis.keywords.is_empty() => {
            format!("keywords {}", analysis.keywords.join(", "))
        }
        InputKind::Narrative => match &analysis.sector {
            Some(sector) => format!("sector '{sector}'"),
            None => "no matching keywords or sector".to_string(),
        },
    };

    let mut text = format!(
        "Palette '{}' chosen from {}. Typography {} / {} ({}), {} components",
        assignment.color_style,
        reason,
        assignment.fonts.primary,
        assignment.fonts.secondary,
        assignment.font_style,
        assignment.component_style,
    );
    if let Some(texture) = &assignment.texture {
        text.push_str(&format!(", {texture} texture"));
    }
    text.push_str(&format!(". Predicted approval {:.0}%.", confidence * 100.0));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn narrative(value: serde_json::Value) -> DesignInput {
        DesignInput::from_value(&value).unwrap()
    }

    #[test]
    fn test_narrative_normalization() {
        let engine = StyleEngine::default();
        let analysis = engine
            .analyze(&narrative(json!({
                "name": "Aurum",
                "mission": "Joyería de lujo para clientes exclusivos",
                "sector": "retail"
            })))
            .unwrap();

        assert_eq!(analysis.kind, InputKind::Narrative);
        assert_eq!(analysis.assignment.color_style, "luxury");
        assert_eq!(analysis.structured.palette, vec!["#7C3AED", "#1F2937", "#F9FAFB"]);
        assert_eq!(analysis.structured.fonts, vec!["Georgia", "Helvetica"]);
        assert_eq!(analysis.structured.layout.as_deref(), Some("flex"));
        assert_eq!(analysis.structured.contrast.as_deref(), Some("medium-high"));
        assert!(analysis.keywords.contains(&"lujo".to_string()));
    }

    #[test]
    fn test_encode_matches_analysis() {
        let engine = StyleEngine::default();
        let input = narrative(json!({"mission": "Tecnología e innovación", "sector": "tecnología"}));
        let analysis = engine.analyze(&input).unwrap();
        assert_eq!(engine.encode(&input).unwrap(), analysis.features);
    }

    #[test]
    fn test_dark_surface_swaps_roles() {
        let engine = StyleEngine::default();
        let analysis = engine
            .analyze(&narrative(json!({"mission": "Podcast de true crime y misterio"})))
            .unwrap();
        let package = engine.package(analysis, 0.8);

        assert_eq!(package.colors.background, "#0D0D0D");
        assert_eq!(package.colors.text, "#D9D4C7");
        assert!(package.explanation.contains("aged_paper"));
        assert!(package.explanation.contains("80%"));
    }

    #[test]
    fn test_structured_package() {
        let engine = StyleEngine::default();
        let input = DesignInput::from_value(&json!({
            "palette": ["#2C3E50", "#ECF0F1", "#E74C3C"],
            "fonts": ["Inter", "Roboto"],
            "layout": "grid"
        }))
        .unwrap();
        let package = engine.package(engine.analyze(&input).unwrap(), 0.5);

        assert_eq!(package.colors.primary, "#2C3E50");
        assert_eq!(package.colors.background, "#FFFFFF");
        assert_eq!(package.tokens.spacing["md"], "16px");
        assert_eq!(package.tokens.radii["card"], "16px");
        assert!(package.keywords.is_empty());
    }
}

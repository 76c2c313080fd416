//! Style profile → concrete palette, typography, components and texture.
//!
//! Three facets are resolved by independent first-match cascades. The
//! palette cascade is authoritative for color; its themed steps (dark, true
//! crime, vintage, cyberpunk, luxury, professional) may also bundle a font or
//! component choice, and any facet left unbundled falls through to its own
//! cascade. A brief that is both luxurious and corporate therefore gets the
//! luxury palette, elegant type and corporate components.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::{ComponentStyle, FontPairing, StyleCatalog};
use crate::color::normalize_hex;
use crate::design_input::StructuredInput;
use crate::errors::AdvisorResult;
use crate::keyword_analyzer::{StyleCategory, StyleProfile};

use StyleCategory::*;

/// Provenance tag for facets taken verbatim from a structured request.
pub const FROM_INPUT: &str = "input";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleAssignment {
    pub palette: Vec<String>,
    pub fonts: FontPairing,
    pub components: ComponentStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    pub color_style: String,
    pub font_style: String,
    pub component_style: String,
}

struct PaletteRule {
    when: &'static [StyleCategory],
    palette: &'static str,
    font: Option<&'static str>,
    component: Option<&'static str>,
    texture: Option<&'static str>,
}

const PALETTE_CASCADE: &[PaletteRule] = &[
    PaletteRule {
        when: &[Dark, TrueCrime],
        palette: "dark_true_crime",
        font: Some("true_crime"),
        component: Some("true_crime"),
        texture: Some("aged_paper"),
    },
    PaletteRule {
        when: &[Vintage],
        palette: "vintage",
        font: Some("vintage"),
        component: Some("vintage"),
        texture: Some("vintage_grain"),
    },
    PaletteRule {
        when: &[Cyberpunk],
        palette: "cyberpunk",
        font: Some("cyberpunk"),
        component: Some("modern"),
        texture: None,
    },
    PaletteRule {
        when: &[Luxury],
        palette: "luxury",
        font: Some("elegant"),
        component: None,
        texture: None,
    },
    PaletteRule {
        when: &[Eco],
        palette: "eco_friendly",
        font: None,
        component: None,
        texture: None,
    },
    PaletteRule {
        when: &[Creative],
        palette: "creative_vibrant",
        font: None,
        component: None,
        texture: None,
    },
    PaletteRule {
        when: &[Professional],
        palette: "professional",
        font: None,
        component: Some("corporate"),
        texture: None,
    },
];

const FONT_CASCADE: &[(&[StyleCategory], &str)] = &[
    (&[Luxury, Vintage], "elegant"),
    (&[Creative], "creative"),
    (&[Professional], "professional"),
    (&[Friendly], "soft"),
    (&[TrueCrime, Dark], "true_crime"),
    (&[Cyberpunk], "cyberpunk"),
    (&[Minimalist], "minimal"),
];
const DEFAULT_FONT: &str = "modern";

const COMPONENT_CASCADE: &[(&[StyleCategory], &str)] = &[
    (&[Professional], "corporate"),
    (&[Friendly, Creative], "soft"),
    (&[TrueCrime, Dark], "true_crime"),
    (&[Vintage], "vintage"),
    (&[Cyberpunk, Modern], "modern"),
];
const DEFAULT_COMPONENT: &str = "minimal";

pub struct StyleSelector {
    catalog: Arc<StyleCatalog>,
}

impl StyleSelector {
    pub fn new(catalog: Arc<StyleCatalog>) -> Self {
        Self { catalog }
    }

    pub fn select(&self, profile: &StyleProfile, sector: &str) -> AdvisorResult<StyleAssignment> {
        let theme = PALETTE_CASCADE.iter().find(|rule| profile.any(rule.when));

        let palette_id = match theme {
            Some(rule) => rule.palette,
            None => self.catalog.palette_for_sector(sector),
        };
        let font_id = theme
            .and_then(|rule| rule.font)
            .unwrap_or_else(|| first_match(FONT_CASCADE, profile).unwrap_or(DEFAULT_FONT));
        let component_id = theme.and_then(|rule| rule.component).unwrap_or_else(|| {
            first_match(COMPONENT_CASCADE, profile).unwrap_or(DEFAULT_COMPONENT)
        });

        Ok(StyleAssignment {
            palette: self.catalog.palette(palette_id)?.to_vec(),
            fonts: self.catalog.font(font_id)?.clone(),
            components: self.catalog.component(component_id)?.clone(),
            texture: theme.and_then(|rule| rule.texture).map(str::to_string),
            color_style: palette_id.to_string(),
            font_style: font_id.to_string(),
            component_style: component_id.to_string(),
        })
    }

    /// Structured requests keep their own choices; gaps are filled from the
    /// default palette and the modern font pairing.
    pub fn select_structured(&self, input: &StructuredInput) -> AdvisorResult<StyleAssignment> {
        let default_palette = self.catalog.palette(&self.catalog.default_palette)?;
        let mut palette: Vec<String> = Vec::with_capacity(5);
        for color in input.palette.iter().map(|c| normalize_hex(c)) {
            if !palette.contains(&color) && palette.len() < 5 {
                palette.push(color);
            }
        }
        for color in default_palette {
            if palette.len() == 5 {
                break;
            }
            if !palette.contains(color) {
                palette.push(color.clone());
            }
        }

        let default_fonts = self.catalog.font(DEFAULT_FONT)?;
        let fonts = match input.fonts.as_slice() {
            [] => default_fonts.clone(),
            [only] => FontPairing::new(only, &default_fonts.secondary),
            [primary, secondary, ..] => FontPairing::new(primary, secondary),
        };
        let font_style = if input.fonts.is_empty() {
            DEFAULT_FONT
        } else {
            FROM_INPUT
        };

        let component_id = match input.spacing.as_deref() {
            Some("wide") | Some("comfortable") => "soft",
            Some("compact") | Some("cramped") | Some("none") => "minimal",
            _ => "modern",
        };

        Ok(StyleAssignment {
            palette,
            fonts,
            components: self.catalog.component(component_id)?.clone(),
            texture: None,
            color_style: FROM_INPUT.to_string(),
            font_style: font_style.to_string(),
            component_style: component_id.to_string(),
        })
    }
}

fn first_match(
    cascade: &'static [(&'static [StyleCategory], &'static str)],
    profile: &StyleProfile,
) -> Option<&'static str> {
    cascade
        .iter()
        .find(|(when, _)| profile.any(when))
        .map(|(_, id)| *id)
}

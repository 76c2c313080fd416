//! Curated style knowledge as immutable, injectable data.
//!
//! `QualityCatalog` holds the good/bad reference sets the feature encoder
//! scores against; `StyleCatalog` holds everything the selector can hand
//! out (palettes, font pairings, component styles, textures, the sector
//! table and keyword lists). Both are plain values: construct them once and
//! share them behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::{AdvisorError, AdvisorResult};

/// Palette ids the selector's cascade can name; a catalog override must
/// provide all of them.
pub const REQUIRED_PALETTES: [&str; 13] = [
    "tech_modern",
    "creative_vibrant",
    "professional",
    "eco_friendly",
    "luxury",
    "health",
    "finance",
    "education",
    "entertainment",
    "minimal",
    "dark_true_crime",
    "vintage",
    "cyberpunk",
];

pub const REQUIRED_FONTS: [&str; 10] = [
    "tech",
    "creative",
    "professional",
    "elegant",
    "modern",
    "minimal",
    "soft",
    "true_crime",
    "vintage",
    "cyberpunk",
];

pub const REQUIRED_COMPONENTS: [&str; 6] = [
    "modern",
    "minimal",
    "soft",
    "corporate",
    "true_crime",
    "vintage",
];

pub const REQUIRED_TEXTURES: [&str; 2] = ["aged_paper", "vintage_grain"];

/// Reference sets used to score a structured design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCatalog {
    pub good_palettes: Vec<Vec<String>>,
    pub bad_palettes: Vec<Vec<String>>,
    pub good_fonts: Vec<String>,
    pub bad_fonts: Vec<String>,
    pub good_layouts: Vec<String>,
    pub bad_layouts: Vec<String>,
    pub good_spacing: Vec<String>,
    pub neutral_spacing: Vec<String>,
    pub bad_spacing: Vec<String>,
    pub good_contrast: Vec<String>,
    pub bad_contrast: Vec<String>,
}

impl Default for QualityCatalog {
    fn default() -> Self {
        Self {
            good_palettes: palettes(&[
                &["#000000", "#FFFFFF", "#3498DB"],
                &["#2C3E50", "#ECF0F1", "#E74C3C"],
                &["#1ABC9C", "#FFFFFF", "#34495E"],
                &["#F39C12", "#FFFFFF", "#2C3E50"],
                &["#9B59B6", "#FFFFFF", "#2C3E50"],
            ]),
            bad_palettes: palettes(&[
                &["#FF00FF", "#FFFF00", "#00FFFF"],
                &["#FF0000", "#00FF00", "#0000FF"],
                &["#8B4513", "#556B2F", "#2F4F4F"],
                &["#FFC0CB", "#FFB6C1", "#FFE4E1"],
                &["#000000", "#111111", "#222222"],
            ]),
            good_fonts: strings(&[
                "Roboto",
                "Open Sans",
                "Montserrat",
                "Lato",
                "Inter",
                "Source Sans Pro",
                "Poppins",
                "Nunito",
                "Work Sans",
                "IBM Plex Sans",
                "Georgia",
                "Helvetica",
                "Arial",
            ]),
            bad_fonts: strings(&[
                "Comic Sans MS",
                "Papyrus",
                "Curlz MT",
                "Jokerman",
                "Impact",
                "Courier New",
                "Brush Script",
            ]),
            good_layouts: strings(&["grid", "flex", "masonry", "card-based", "sidebar"]),
            bad_layouts: strings(&["table", "frame", "absolute", "inline"]),
            good_spacing: strings(&["medium", "wide", "comfortable", "standard"]),
            neutral_spacing: strings(&["compact"]),
            bad_spacing: strings(&["none", "cramped", "excessive"]),
            good_contrast: strings(&["high", "medium-high", "accessible"]),
            bad_contrast: strings(&["low", "none", "inverted"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontPairing {
    pub primary: String,
    pub secondary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_url: Option<String>,
}

impl FontPairing {
    pub fn new(primary: &str, secondary: &str) -> Self {
        Self {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            import_url: Some(google_fonts_url(primary, secondary)),
        }
    }
}

/// Google Fonts stylesheet reference loading both families.
pub fn google_fonts_url(primary: &str, secondary: &str) -> String {
    let family = |name: &str| format!("family={}", name.trim().replace(' ', "+"));
    if primary.eq_ignore_ascii_case(secondary) {
        return format!("https://fonts.googleapis.com/css2?{}&display=swap", family(primary));
    }
    format!(
        "https://fonts.googleapis.com/css2?{}&{}&display=swap",
        family(primary),
        family(secondary)
    )
}

/// Radius, shadow and spacing tokens for one component family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStyle {
    pub border_radius: String,
    pub button_style: String,
    pub button_radius: String,
    pub card_radius: String,
    pub input_radius: String,
    pub shadow_size: String,
    pub shadow: String,
    pub spacing: String,
}

impl ComponentStyle {
    #[allow(clippy::too_many_arguments)]
    fn new(
        border_radius: &str,
        button_style: &str,
        button_radius: &str,
        card_radius: &str,
        input_radius: &str,
        shadow_size: &str,
        shadow: &str,
        spacing: &str,
    ) -> Self {
        Self {
            border_radius: border_radius.into(),
            button_style: button_style.into(),
            button_radius: button_radius.into(),
            card_radius: card_radius.into(),
            input_radius: input_radius.into(),
            shadow_size: shadow_size.into(),
            shadow: shadow.into(),
            spacing: spacing.into(),
        }
    }
}

/// Everything the selector can assign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleCatalog {
    pub default_palette: String,
    pub palettes: BTreeMap<String, Vec<String>>,
    pub fonts: BTreeMap<String, FontPairing>,
    pub components: BTreeMap<String, ComponentStyle>,
    pub textures: BTreeMap<String, String>,
    pub sector_palettes: BTreeMap<String, String>,
    /// Style category name to the substrings that signal it.
    pub keywords: BTreeMap<String, Vec<String>>,
}

impl Default for StyleCatalog {
    fn default() -> Self {
        let palettes = [
            ("tech_modern", ["#2DD4BF", "#0F172A", "#1E293B", "#F8FAFC", "#64748B"]),
            ("creative_vibrant", ["#F43F5E", "#8B5CF6", "#FCD34D", "#FFFFFF", "#1F2937"]),
            ("professional", ["#1E40AF", "#FFFFFF", "#F3F4F6", "#111827", "#6B7280"]),
            ("eco_friendly", ["#10B981", "#065F46", "#D1FAE5", "#FFFFFF", "#374151"]),
            ("luxury", ["#7C3AED", "#1F2937", "#F9FAFB", "#D4AF37", "#000000"]),
            ("health", ["#3B82F6", "#DBEAFE", "#FFFFFF", "#1E3A8A", "#60A5FA"]),
            ("finance", ["#059669", "#064E3B", "#ECFDF5", "#1F2937", "#10B981"]),
            ("education", ["#F59E0B", "#FBBF24", "#FEF3C7", "#78350F", "#FFFFFF"]),
            ("entertainment", ["#EC4899", "#BE185D", "#FCE7F3", "#831843", "#F472B6"]),
            ("minimal", ["#000000", "#FFFFFF", "#F5F5F5", "#737373", "#E5E5E5"]),
            ("dark_true_crime", ["#8B0000", "#0D0D0D", "#1A1A1A", "#D9D4C7", "#5C5C5C"]),
            ("vintage", ["#8B5E3C", "#2F4F4F", "#C19A6B", "#F4E9D8", "#A0522D"]),
            ("cyberpunk", ["#FF00A0", "#00F0FF", "#7B2CBF", "#0A0A1F", "#F5F500"]),
        ]
        .into_iter()
        .map(|(id, colors)| (id.to_string(), strings(&colors)))
        .collect();

        let fonts = [
            ("tech", FontPairing::new("Inter", "Roboto Mono")),
            ("creative", FontPairing::new("Poppins", "Montserrat")),
            ("professional", FontPairing::new("Roboto", "Open Sans")),
            ("elegant", FontPairing::new("Playfair Display", "Lato")),
            ("modern", FontPairing::new("Work Sans", "Space Grotesk")),
            ("minimal", FontPairing::new("IBM Plex Sans", "Source Sans Pro")),
            ("soft", FontPairing::new("Nunito", "Quicksand")),
            ("true_crime", FontPairing::new("Special Elite", "Libre Baskerville")),
            ("vintage", FontPairing::new("Abril Fatface", "Lora")),
            ("cyberpunk", FontPairing::new("Orbitron", "Share Tech Mono")),
        ]
        .into_iter()
        .map(|(id, pairing)| (id.to_string(), pairing))
        .collect();

        let components = [
            (
                "modern",
                ComponentStyle::new(
                    "12px",
                    "rounded",
                    "12px",
                    "16px",
                    "12px",
                    "medium",
                    "0 4px 6px -1px rgba(0, 0, 0, 0.1)",
                    "spacious",
                ),
            ),
            (
                "minimal",
                ComponentStyle::new("4px", "sharp", "4px", "8px", "4px", "none", "none", "compact"),
            ),
            (
                "soft",
                ComponentStyle::new(
                    "24px",
                    "pill",
                    "24px",
                    "20px",
                    "24px",
                    "soft",
                    "0 2px 8px rgba(0, 0, 0, 0.08)",
                    "comfortable",
                ),
            ),
            (
                "corporate",
                ComponentStyle::new(
                    "6px",
                    "solid",
                    "6px",
                    "8px",
                    "6px",
                    "small",
                    "0 1px 3px rgba(0, 0, 0, 0.12)",
                    "standard",
                ),
            ),
            (
                "true_crime",
                ComponentStyle::new(
                    "2px",
                    "stamped",
                    "2px",
                    "4px",
                    "2px",
                    "heavy",
                    "0 8px 24px rgba(0, 0, 0, 0.6)",
                    "dense",
                ),
            ),
            (
                "vintage",
                ComponentStyle::new(
                    "8px",
                    "outlined",
                    "8px",
                    "10px",
                    "6px",
                    "offset",
                    "2px 2px 0 rgba(60, 40, 20, 0.25)",
                    "comfortable",
                ),
            ),
        ]
        .into_iter()
        .map(|(id, style)| (id.to_string(), style))
        .collect();

        let textures = [
            ("aged_paper", "Aged paper grain with evidence-board overlay"),
            ("vintage_grain", "Warm film grain with faded print edges"),
        ]
        .into_iter()
        .map(|(id, description)| (id.to_string(), description.to_string()))
        .collect();

        let sector_palettes = [
            ("tecnología", "tech_modern"),
            ("tecnologia", "tech_modern"),
            ("technology", "tech_modern"),
            ("tech", "tech_modern"),
            ("salud", "health"),
            ("health", "health"),
            ("healthcare", "health"),
            ("finanzas", "finance"),
            ("finance", "finance"),
            ("educación", "education"),
            ("educacion", "education"),
            ("education", "education"),
            ("entretenimiento", "entertainment"),
            ("entertainment", "entertainment"),
        ]
        .into_iter()
        .map(|(sector, palette)| (sector.to_string(), palette.to_string()))
        .collect();

        let keywords = [
            (
                "modern",
                &[
                    "modern", "innovación", "innovacion", "innovation", "tecnología",
                    "tecnologia", "technology", "digital", "futuro", "future",
                    "inteligencia artificial", "artificial intelligence",
                ][..],
            ),
            (
                "professional",
                &[
                    "profesional", "professional", "confianza", "trust", "calidad",
                    "quality", "excelencia", "excellence", "serio", "corporativo",
                    "corporate",
                ][..],
            ),
            (
                "creative",
                &[
                    "creativo", "creativa", "creative", "arte", "artistic", "diseño",
                    "design", "único", "unique", "original",
                ][..],
            ),
            (
                "friendly",
                &[
                    "amigable", "friendly", "cercano", "cálido", "warm", "comunidad",
                    "community", "diversión", "divertido", "familia", "family",
                ][..],
            ),
            (
                "luxury",
                &[
                    "lujo", "lujoso", "luxury", "premium", "exclusivo", "exclusive",
                    "élite", "elite", "sofisticado", "sophisticated", "elegancia",
                    "elegant",
                ][..],
            ),
            (
                "eco",
                &[
                    "sostenible", "sustainable", "eco", "verde", "green", "natural",
                    "orgánico", "organico", "organic", "medio ambiente", "environment",
                ][..],
            ),
            (
                "dark",
                &[
                    "oscuro", "dark", "noir", "misterio", "misterioso", "mystery",
                    "sombrío", "gótico", "gothic",
                ][..],
            ),
            (
                "true_crime",
                &[
                    "true crime", "crimen", "crime", "forense", "forensic", "evidencia",
                    "evidence", "archivo policial", "detective", "asesinato",
                ][..],
            ),
            (
                "vintage",
                &[
                    "vintage", "retro", "clásico", "clasico", "nostalgia", "antiguo",
                    "años 80", "80s",
                ][..],
            ),
            (
                "cyberpunk",
                &["cyberpunk", "neón", "neon", "glitch", "synthwave", "hacker"][..],
            ),
            (
                "minimalist",
                &["minimalista", "minimalist", "minimal", "simple", "limpio", "clean"][..],
            ),
        ]
        .into_iter()
        .map(|(category, words)| (category.to_string(), strings(words)))
        .collect();

        Self {
            default_palette: "tech_modern".to_string(),
            palettes,
            fonts,
            components,
            textures,
            sector_palettes,
            keywords,
        }
    }
}

impl StyleCatalog {
    /// Load a full catalog replacement from TOML and check it is complete.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AdvisorResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| AdvisorError::io(format!("reading catalog {}", path.display()), e))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> AdvisorResult<Self> {
        let catalog: StyleCatalog = toml::from_str(contents)
            .map_err(|e| AdvisorError::config(format!("invalid style catalog: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> AdvisorResult<()> {
        for id in REQUIRED_PALETTES {
            let colors = self.palette(id)?;
            if colors.len() != 5 {
                return Err(AdvisorError::config(format!(
                    "palette '{id}' must have exactly 5 colors, found {}",
                    colors.len()
                )));
            }
        }
        for id in REQUIRED_FONTS {
            self.font(id)?;
        }
        for id in REQUIRED_COMPONENTS {
            self.component(id)?;
        }
        for id in REQUIRED_TEXTURES {
            if !self.textures.contains_key(id) {
                return Err(AdvisorError::config(format!("catalog is missing texture '{id}'")));
            }
        }
        for palette_id in self.sector_palettes.values() {
            self.palette(palette_id)?;
        }
        self.palette(&self.default_palette)?;
        Ok(())
    }

    pub fn palette(&self, id: &str) -> AdvisorResult<&[String]> {
        self.palettes
            .get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| AdvisorError::config(format!("catalog is missing palette '{id}'")))
    }

    pub fn font(&self, id: &str) -> AdvisorResult<&FontPairing> {
        self.fonts
            .get(id)
            .ok_or_else(|| AdvisorError::config(format!("catalog is missing font pairing '{id}'")))
    }

    pub fn component(&self, id: &str) -> AdvisorResult<&ComponentStyle> {
        self.components
            .get(id)
            .ok_or_else(|| AdvisorError::config(format!("catalog is missing component style '{id}'")))
    }

    /// Palette id for a sector, or the default palette id when unrecognized.
    pub fn palette_for_sector(&self, sector: &str) -> &str {
        let key = sector.trim().to_lowercase();
        self.sector_palettes
            .get(&key)
            .map(String::as_str)
            .unwrap_or(&self.default_palette)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn palettes(items: &[&[&str]]) -> Vec<Vec<String>> {
    items.iter().map(|p| strings(p)).collect()
}

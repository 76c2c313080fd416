//! Free-text brief → style profile by keyword substring matching.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::StyleCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleCategory {
    Modern,
    Professional,
    Creative,
    Friendly,
    Luxury,
    Eco,
    Dark,
    TrueCrime,
    Vintage,
    Cyberpunk,
    Minimalist,
}

impl StyleCategory {
    pub const ALL: [StyleCategory; 11] = [
        StyleCategory::Modern,
        StyleCategory::Professional,
        StyleCategory::Creative,
        StyleCategory::Friendly,
        StyleCategory::Luxury,
        StyleCategory::Eco,
        StyleCategory::Dark,
        StyleCategory::TrueCrime,
        StyleCategory::Vintage,
        StyleCategory::Cyberpunk,
        StyleCategory::Minimalist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleCategory::Modern => "modern",
            StyleCategory::Professional => "professional",
            StyleCategory::Creative => "creative",
            StyleCategory::Friendly => "friendly",
            StyleCategory::Luxury => "luxury",
            StyleCategory::Eco => "eco",
            StyleCategory::Dark => "dark",
            StyleCategory::TrueCrime => "true_crime",
            StyleCategory::Vintage => "vintage",
            StyleCategory::Cyberpunk => "cyberpunk",
            StyleCategory::Minimalist => "minimalist",
        }
    }
}

/// Which style categories a brief expresses. Every category is present in
/// the map; absent keys read as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleProfile(BTreeMap<StyleCategory, bool>);

impl StyleProfile {
    pub fn from_active(active: &[StyleCategory]) -> Self {
        let mut profile = Self::default();
        for category in StyleCategory::ALL {
            profile.set(category, active.contains(&category));
        }
        profile
    }

    pub fn is(&self, category: StyleCategory) -> bool {
        self.0.get(&category).copied().unwrap_or(false)
    }

    pub fn any(&self, categories: &[StyleCategory]) -> bool {
        categories.iter().any(|c| self.is(*c))
    }

    pub fn set(&mut self, category: StyleCategory, value: bool) {
        self.0.insert(category, value);
    }

    pub fn active(&self) -> Vec<StyleCategory> {
        self.0
            .iter()
            .filter(|(_, on)| **on)
            .map(|(category, _)| *category)
            .collect()
    }
}

/// Substring matcher over the catalog's keyword lists.
pub struct KeywordAnalyzer {
    keywords: Vec<(StyleCategory, Vec<String>)>,
}

impl KeywordAnalyzer {
    pub fn new(catalog: &StyleCatalog) -> Self {
        let keywords = StyleCategory::ALL
            .iter()
            .map(|category| {
                let words = catalog
                    .keywords
                    .get(category.as_str())
                    .map(|words| {
                        words
                            .iter()
                            .map(|w| w.trim().to_lowercase())
                            .filter(|w| !w.is_empty())
                            .collect()
                    })
                    .unwrap_or_default();
                (*category, words)
            })
            .collect();
        Self { keywords }
    }

    pub fn analyze(&self, text: &str) -> StyleProfile {
        let text = text.to_lowercase();
        let mut profile = StyleProfile::default();
        for (category, words) in &self.keywords {
            let hit = words.iter().any(|word| text.contains(word.as_str()));
            profile.set(*category, hit);
        }
        profile
    }

    /// The keywords that fired, in category order, for explanations.
    pub fn matched_keywords(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .flat_map(|(_, words)| words.iter())
            .filter(|word| text.contains(word.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> KeywordAnalyzer {
        KeywordAnalyzer::new(&StyleCatalog::default())
    }

    #[test]
    fn test_every_category_reported() {
        let profile = analyzer().analyze("");
        assert_eq!(profile.active(), Vec::<StyleCategory>::new());
        for category in StyleCategory::ALL {
            assert!(!profile.is(category));
        }
    }

    #[test]
    fn test_multiple_categories_can_fire() {
        let profile = analyzer().analyze("Relojes de LUJO, exclusivos y sostenibles");
        assert!(profile.is(StyleCategory::Luxury));
        assert!(profile.is(StyleCategory::Eco));
        assert!(!profile.is(StyleCategory::Creative));
    }

    #[test]
    fn test_multi_word_keywords() {
        let profile = analyzer().analyze("A true crime podcast about forensic evidence");
        assert!(profile.is(StyleCategory::TrueCrime));
        assert!(!profile.is(StyleCategory::Dark));
    }

    /// "ia" (inteligencia artificial) is left out of the modern keyword
    /// list on purpose: as a substring it fires inside ordinary Spanish
    /// words such as "confianza" and "media". Briefs about AI match through
    /// "inteligencia artificial" or "tecnología" instead.
    #[test]
    fn test_modern_ignores_ia_inside_words() {
        let profile = analyzer().analyze("confianza y calidad");
        assert!(profile.is(StyleCategory::Professional));
        assert!(!profile.is(StyleCategory::Modern));

        let profile = analyzer().analyze("consultora de inteligencia artificial");
        assert!(profile.is(StyleCategory::Modern));
    }

    #[test]
    fn test_profile_serializes_by_name() {
        let profile = StyleProfile::from_active(&[StyleCategory::TrueCrime]);
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["true_crime"], true);
        assert_eq!(json["luxury"], false);
    }

    #[test]
    fn test_matched_keywords() {
        let words = analyzer().matched_keywords("Diseño vintage y retro");
        assert!(words.contains(&"diseño".to_string()));
        assert!(words.contains(&"retro".to_string()));
    }
}

//! The two shapes a design request can take.
//!
//! Structured input names concrete design choices (palette, fonts, layout,
//! spacing, contrast). Narrative input describes a brand in free text and is
//! normalized to the structured form before encoding. Records on disk keep
//! the raw JSON; `DesignInput::from_value` is the single place that decides
//! which shape a value is.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::errors::{AdvisorError, AdvisorResult};

pub const STRUCTURED_KEYS: [&str; 5] = ["palette", "fonts", "layout", "spacing", "contrast"];
pub const NARRATIVE_KEYS: [&str; 5] = ["name", "mission", "values", "sector", "audience"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredInput {
    #[serde(default)]
    pub palette: Vec<String>,
    #[serde(default)]
    pub fonts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mission: String,
    #[serde(default)]
    pub values: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub audience: String,
}

impl NarrativeInput {
    /// Lowercased mission and values, the text keyword analysis runs on.
    pub fn free_text(&self) -> String {
        format!("{} {}", self.mission, self.values).to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DesignInput {
    Structured(StructuredInput),
    Narrative(NarrativeInput),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Structured,
    Narrative,
}

impl DesignInput {
    pub fn kind(&self) -> InputKind {
        match self {
            DesignInput::Structured(_) => InputKind::Structured,
            DesignInput::Narrative(_) => InputKind::Narrative,
        }
    }

    /// Classify a raw JSON value. Any structured key wins over narrative
    /// keys; a mapping with neither is rejected.
    pub fn from_value(value: &Value) -> AdvisorResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| AdvisorError::input("design input must be a JSON object"))?;

        if STRUCTURED_KEYS.iter().any(|k| map.contains_key(*k)) {
            return Ok(DesignInput::Structured(StructuredInput {
                palette: string_list(map, "palette")?,
                fonts: string_list(map, "fonts")?,
                layout: choice(map, "layout")?,
                spacing: choice(map, "spacing")?,
                contrast: choice(map, "contrast")?,
            }));
        }

        if NARRATIVE_KEYS.iter().any(|k| map.contains_key(*k)) {
            return Ok(DesignInput::Narrative(NarrativeInput {
                name: text(map, "name")?,
                mission: text(map, "mission")?,
                values: text(map, "values")?,
                sector: text(map, "sector")?,
                audience: text(map, "audience")?,
            }));
        }

        Err(AdvisorError::input(format!(
            "design input has none of the recognized fields ({} or {})",
            STRUCTURED_KEYS.join(", "),
            NARRATIVE_KEYS.join(", ")
        )))
    }

    pub fn to_value(&self) -> AdvisorResult<Value> {
        serde_json::to_value(self)
            .map_err(|e| AdvisorError::serialization("encoding design input", e))
    }
}

impl Serialize for DesignInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DesignInput::Structured(input) => input.serialize(serializer),
            DesignInput::Narrative(input) => input.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for DesignInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        DesignInput::from_value(&value).map_err(serde::de::Error::custom)
    }
}

fn string_list(map: &Map<String, Value>, key: &str) -> AdvisorResult<Vec<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| AdvisorError::input(format!("'{key}' must contain only strings")))
            })
            .collect(),
        Some(_) => Err(AdvisorError::input(format!("'{key}' must be a list of strings"))),
    }
}

fn choice(map: &Map<String, Value>, key: &str) -> AdvisorResult<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_lowercase())),
        Some(_) => Err(AdvisorError::input(format!("'{key}' must be a string"))),
    }
}

/// Narrative fields are free text; a list of strings is joined so that
/// `values: ["trust", "quality"]` reads the same as `"trust, quality"`.
fn text(map: &Map<String, Value>, key: &str) -> AdvisorResult<String> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Array(_)) => Ok(string_list(map, key)?.join(", ")),
        Some(_) => Err(AdvisorError::input(format!("'{key}' must be text"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_detection() {
        let input = DesignInput::from_value(&json!({
            "palette": ["#000000", "#FFFFFF"],
            "fonts": ["Roboto"],
            "layout": "Grid"
        }))
        .unwrap();

        match input {
            DesignInput::Structured(s) => {
                assert_eq!(s.palette.len(), 2);
                assert_eq!(s.layout.as_deref(), Some("grid"));
                assert_eq!(s.spacing, None);
            }
            other => panic!("expected structured input, got {other:?}"),
        }
    }

    #[test]
    fn test_structured_keys_take_precedence() {
        let input = DesignInput::from_value(&json!({
            "mission": "Luxury watches",
            "layout": "flex"
        }))
        .unwrap();
        assert_eq!(input.kind(), InputKind::Structured);
    }

    #[test]
    fn test_narrative_detection_joins_value_lists() {
        let input = DesignInput::from_value(&json!({
            "name": "Verde",
            "values": ["sostenible", "natural"]
        }))
        .unwrap();

        match input {
            DesignInput::Narrative(n) => {
                assert_eq!(n.values, "sostenible, natural");
                assert!(n.free_text().contains("sostenible"));
            }
            other => panic!("expected narrative input, got {other:?}"),
        }
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            DesignInput::from_value(&json!(["#000000"])),
            Err(AdvisorError::Input { .. })
        ));
        assert!(matches!(
            DesignInput::from_value(&json!({"colour": "red"})),
            Err(AdvisorError::Input { .. })
        ));
        assert!(matches!(
            DesignInput::from_value(&json!({"palette": "#000000"})),
            Err(AdvisorError::Input { .. })
        ));
    }

    #[test]
    fn test_serde_goes_through_classification() {
        let parsed: DesignInput =
            serde_json::from_str(r#"{"sector": "salud", "mission": "Cuidar"}"#).unwrap();
        assert_eq!(parsed.kind(), InputKind::Narrative);

        let value = parsed.to_value().unwrap();
        assert_eq!(value["sector"], "salud");
        assert_eq!(DesignInput::from_value(&value).unwrap(), parsed);
    }
}

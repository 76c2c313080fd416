//! Renderers for a generated style package.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::style_engine::StylePackage;

/// `:root { --color-primary: ...; }` block for direct inclusion in a stylesheet.
pub fn to_css(package: &StylePackage) -> String {
    let colors = &package.colors;
    let fonts = &package.assignment.fonts;
    let tokens = &package.tokens;

    let mut lines = Vec::new();
    if let Some(url) = &fonts.import_url {
        lines.push(format!("@import url('{url}');"));
        lines.push(String::new());
    }
    lines.push(":root {".to_string());
    for (role, value) in [
        ("primary", &colors.primary),
        ("secondary", &colors.secondary),
        ("accent", &colors.accent),
        ("background", &colors.background),
        ("text", &colors.text),
    ] {
        lines.push(format!("  --color-{role}: {value};"));
    }
    for (i, color) in package.assignment.palette.iter().enumerate() {
        lines.push(format!("  --palette-{}: {color};", i + 1));
    }
    lines.push(format!("  --font-primary: '{}', sans-serif;", fonts.primary));
    lines.push(format!("  --font-secondary: '{}', sans-serif;", fonts.secondary));
    for (prefix, scale) in [
        ("spacing", &tokens.spacing),
        ("font-size", &tokens.font_size),
        ("radius", &tokens.radii),
        ("shadow", &tokens.shadows),
    ] {
        lines.extend(scale_lines(prefix, scale));
    }
    lines.push("}".to_string());

    let mut css = lines.join("\n");
    css.push('\n');
    css
}

fn scale_lines<'a>(
    prefix: &'a str,
    scale: &'a BTreeMap<String, String>,
) -> impl Iterator<Item = String> + 'a {
    scale
        .iter()
        .map(move |(name, value)| format!("  --{prefix}-{name}: {value};"))
}

/// Design-token document grouped the way token tooling expects:
/// each leaf is `{ "value": ..., "type": ... }`.
pub fn to_token_document(package: &StylePackage) -> Value {
    let colors = &package.colors;
    let fonts = &package.assignment.fonts;
    let tokens = &package.tokens;

    let color = group(
        [
            ("primary", &colors.primary),
            ("secondary", &colors.secondary),
            ("accent", &colors.accent),
            ("background", &colors.background),
            ("text", &colors.text),
        ],
        "color",
    );
    let font_family = group(
        [("primary", &fonts.primary), ("secondary", &fonts.secondary)],
        "fontFamily",
    );

    json!({
        "color": color,
        "fontFamily": font_family,
        "fontSize": group(tokens.font_size.iter().map(|(k, v)| (k.as_str(), v)), "dimension"),
        "spacing": group(tokens.spacing.iter().map(|(k, v)| (k.as_str(), v)), "dimension"),
        "radii": group(tokens.radii.iter().map(|(k, v)| (k.as_str(), v)), "borderRadius"),
        "shadow": group(tokens.shadows.iter().map(|(k, v)| (k.as_str(), v)), "boxShadow"),
        "$metadata": {
            "colorStyle": package.assignment.color_style,
            "fontStyle": package.assignment.font_style,
            "componentStyle": package.assignment.component_style,
            "texture": package.assignment.texture,
        },
    })
}

fn group<'a>(entries: impl IntoIterator<Item = (&'a str, &'a String)>, kind: &str) -> Value {
    let map: Map<String, Value> = entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), json!({ "value": value, "type": kind })))
        .collect();
    Value::Object(map)
}

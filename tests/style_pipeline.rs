//! Integration tests for input classification, encoding, selection and the
//! on-disk dataset formats.

use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

use style_advisor::catalog::{QualityCatalog, StyleCatalog};
use style_advisor::dataset_store::{DatasetStore, TrainingRecord, SCHEMA_VERSION};
use style_advisor::design_input::{DesignInput, StructuredInput};
use style_advisor::feature_encoder::{FeatureEncoder, FEATURE_COUNT};
use style_advisor::keyword_analyzer::{StyleCategory, StyleProfile};
use style_advisor::style_engine::StyleEngine;
use style_advisor::style_selector::StyleSelector;

fn structured(
    palette: &[&str],
    fonts: &[&str],
    layout: &str,
    spacing: &str,
    contrast: &str,
) -> StructuredInput {
    let choice = |s: &str| (!s.is_empty()).then(|| s.to_string());
    StructuredInput {
        palette: palette.iter().map(|c| c.to_string()).collect(),
        fonts: fonts.iter().map(|f| f.to_string()).collect(),
        layout: choice(layout),
        spacing: choice(spacing),
        contrast: choice(contrast),
    }
}

#[test]
fn test_encoder_output_is_bounded_and_deterministic() {
    let encoder = FeatureEncoder::new(Arc::new(QualityCatalog::default()));
    let palettes: [&[&str]; 5] = [
        &[],
        &["#FFF"],
        &["#000000", "#FFFFFF", "#3498DB"],
        &["#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF"],
        &["#zzzzzz", "#8B4513"],
    ];
    let fonts: [&[&str]; 4] = [
        &[],
        &["Inter"],
        &["Comic Sans MS", "Roboto", "Papyrus", "Lato"],
        &["A", "B", "C", "D"],
    ];
    let layouts = ["", "grid", "table", "holographic"];
    let spacings = ["", "compact", "cramped", "wide"];
    let contrasts = ["", "high", "inverted"];

    for palette in palettes {
        for font in fonts {
            for (i, layout) in layouts.iter().enumerate() {
                let input = structured(
                    palette,
                    font,
                    layout,
                    spacings[i % spacings.len()],
                    contrasts[i % contrasts.len()],
                );
                let vector = encoder.encode(&input);
                assert_eq!(vector.as_slice().len(), FEATURE_COUNT);
                assert!(
                    vector.as_slice().iter().all(|v| (0.0..=1.0).contains(v)),
                    "out of range for {input:?}: {vector:?}"
                );
                assert_eq!(encoder.encode(&input), vector);
            }
        }
    }
}

#[test]
fn test_curated_scores() {
    let encoder = FeatureEncoder::new(Arc::new(QualityCatalog::default()));
    let good = structured(
        &["#000000", "#FFFFFF", "#3498DB"],
        &["Roboto", "Open Sans"],
        "",
        "",
        "",
    );
    let bad = structured(
        &["#FF00FF", "#FFFF00", "#00FFFF"],
        &["Comic Sans MS", "Papyrus"],
        "",
        "",
        "",
    );

    let good_scores = encoder.scores(&good);
    assert_eq!(good_scores.palette, 1.0);
    assert_eq!(good_scores.font, 1.0);

    let bad_scores = encoder.scores(&bad);
    assert_eq!(bad_scores.palette, 0.0);
    assert_eq!(bad_scores.font, 0.0);
}

#[test]
fn test_earliest_flag_wins_for_every_pair() {
    let selector = StyleSelector::new(Arc::new(StyleCatalog::default()));
    let cascade = [
        (StyleCategory::Dark, "dark_true_crime"),
        (StyleCategory::Vintage, "vintage"),
        (StyleCategory::Cyberpunk, "cyberpunk"),
        (StyleCategory::Luxury, "luxury"),
        (StyleCategory::Eco, "eco_friendly"),
        (StyleCategory::Creative, "creative_vibrant"),
        (StyleCategory::Professional, "professional"),
    ];

    for (i, (earlier, expected)) in cascade.iter().enumerate() {
        for (later, _) in &cascade[i + 1..] {
            let profile = StyleProfile::from_active(&[*later, *earlier]);
            let assignment = selector.select(&profile, "salud").unwrap();
            assert_eq!(
                assignment.color_style, *expected,
                "{earlier:?} should win over {later:?}"
            );
        }
    }

    let assignment = selector
        .select(
            &StyleProfile::from_active(&[StyleCategory::Luxury, StyleCategory::Eco]),
            "",
        )
        .unwrap();
    assert_eq!(assignment.color_style, "luxury");
}

#[test]
fn test_narrative_and_structured_share_encoding_path() {
    let engine = StyleEngine::default();
    let narrative = DesignInput::from_value(&json!({
        "name": "Ecovida",
        "mission": "Productos orgánicos y sostenibles",
        "values": "comunidad, cercanía",
        "sector": "salud",
        "audience": "familias"
    }))
    .unwrap();

    let analysis = engine.analyze(&narrative).unwrap();
    assert_eq!(analysis.assignment.color_style, "eco_friendly");
    assert_eq!(analysis.assignment.font_style, "soft");

    let as_structured = DesignInput::Structured(analysis.structured.clone());
    assert_eq!(engine.encode(&as_structured).unwrap(), analysis.features);
}

#[test]
fn test_legacy_array_file_loads_as_training() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    let records: Vec<_> = (0..7)
        .map(|i| json!({"input": {"layout": "grid"}, "rating": i as f64 / 10.0, "feedback": ""}))
        .collect();
    fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

    let store = DatasetStore::open(&path).unwrap();
    let dataset = store.load().unwrap();
    assert_eq!(dataset.training.len(), 7);
    assert!(dataset.used_feedback.is_empty());
    assert!(dataset.pending_feedback.is_empty());

    // The first write upgrades the file to the versioned layout.
    let input = DesignInput::from_value(&json!({"layout": "flex"})).unwrap();
    store
        .append_feedback(TrainingRecord::new(&input, 0.9, "").unwrap())
        .unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["schema_version"], SCHEMA_VERSION);
    assert_eq!(written["training_data"].as_array().unwrap().len(), 7);
    assert_eq!(written["feedback_data"].as_array().unwrap().len(), 0);
    assert_eq!(written["pending_feedback"].as_array().unwrap().len(), 1);
}

#[test]
fn test_feedback_from_separate_stores_is_not_lost() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    let input = DesignInput::from_value(&json!({"layout": "grid"})).unwrap();

    // Each thread opens its own store, as separate CLI processes would.
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let path = path.clone();
            let input = input.clone();
            std::thread::spawn(move || {
                let store = DatasetStore::open(&path).unwrap();
                for i in 0..25 {
                    let record =
                        TrainingRecord::new(&input, 0.5, format!("store {t} record {i}")).unwrap();
                    store.append_feedback(record).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let dataset = DatasetStore::open(&path).unwrap().load().unwrap();
    assert_eq!(dataset.pending_feedback.len(), 100);
    assert!(dataset.training.is_empty());
}

//! Library root for the `style_advisor` crate

// Core error handling
pub mod errors;

// Configuration & CLI
pub mod cli;
pub mod config_loader;

// Curated style knowledge
pub mod catalog;
pub mod color;

// Design analysis
pub mod design_input;
pub mod feature_encoder;
pub mod keyword_analyzer;
pub mod style_engine;
pub mod style_selector;
pub mod exports;

// Feedback corpus & training lifecycle
pub mod dataset_store;
pub mod mlp_predictor;
pub mod predictor;
pub mod training_orchestrator;

// Service facade
pub mod advisor_service;

pub use advisor_service::{AdvisorService, AdvisorStats};
pub use design_input::DesignInput;
pub use errors::{AdvisorError, AdvisorResult};

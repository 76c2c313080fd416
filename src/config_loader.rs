use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{AdvisorError, AdvisorResult};

const DEFAULT_CONFIG_FILE: &str = "style_advisor.toml";
const ENV_PREFIX: &str = "STYLE_ADVISOR_";

/// Knobs for the training lifecycle: gating, labeling, splitting and the
/// optimizer schedule of the neural predictor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrainingConfig {
    pub retrain_threshold: usize,
    pub min_training_examples: usize,
    pub positive_rating_threshold: f64,
    pub validation_fraction: f64,
    pub split_seed: u64,
    pub full_epochs: usize,
    pub retrain_epochs: usize,
    pub incremental_epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub early_stopping_patience: usize,
    pub lr_plateau_patience: usize,
    pub lr_plateau_factor: f64,
    pub min_learning_rate: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            retrain_threshold: 5,
            min_training_examples: 10,
            positive_rating_threshold: 0.7,
            validation_fraction: 0.2,
            split_seed: 42,
            full_epochs: 100,
            retrain_epochs: 50,
            incremental_epochs: 30,
            batch_size: 32,
            learning_rate: 0.001,
            early_stopping_patience: 15,
            lr_plateau_patience: 5,
            lr_plateau_factor: 0.5,
            min_learning_rate: 1e-5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdvisorConfig {
    pub dataset_path: PathBuf,
    pub model_path: PathBuf,
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub training: TrainingConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/combined_training_data.json"),
            model_path: PathBuf::from("data/models/style_advisor_model.safetensors"),
            catalog_path: None,
            log_level: default_log_level(),
            training: TrainingConfig::default(),
        }
    }
}

impl AdvisorConfig {
    /// Reject values that would make the training lifecycle meaningless.
    pub fn validate(&self) -> AdvisorResult<()> {
        if self.dataset_path.as_os_str().is_empty() {
            return Err(AdvisorError::config("dataset_path must be set"));
        }
        if self.model_path.as_os_str().is_empty() {
            return Err(AdvisorError::config("model_path must be set"));
        }

        let t = &self.training;
        if !(0.0..=1.0).contains(&t.positive_rating_threshold) {
            return Err(AdvisorError::config(
                "training.positive_rating_threshold must be within [0, 1]",
            ));
        }
        if !(t.validation_fraction > 0.0 && t.validation_fraction < 1.0) {
            return Err(AdvisorError::config(
                "training.validation_fraction must be strictly between 0 and 1",
            ));
        }
        if t.retrain_threshold == 0 {
            return Err(AdvisorError::config("training.retrain_threshold must be positive"));
        }
        if t.batch_size == 0 {
            return Err(AdvisorError::config("training.batch_size must be positive"));
        }
        if t.learning_rate <= 0.0 || t.min_learning_rate <= 0.0 {
            return Err(AdvisorError::config("learning rates must be positive"));
        }
        if !(t.lr_plateau_factor > 0.0 && t.lr_plateau_factor < 1.0) {
            return Err(AdvisorError::config(
                "training.lr_plateau_factor must be strictly between 0 and 1",
            ));
        }
        Ok(())
    }
}

/// Layered configuration: built-in defaults, then the TOML file, then
/// `STYLE_ADVISOR_*` environment variables (`__` separates nested keys).
pub fn load_config(path: Option<&Path>) -> AdvisorResult<AdvisorConfig> {
    let file = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let figment = Figment::from(Serialized::defaults(AdvisorConfig::default()))
        .merge(Toml::file(&file))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    extract(figment)
}

fn extract(figment: Figment) -> AdvisorResult<AdvisorConfig> {
    let config: AdvisorConfig = figment
        .extract()
        .map_err(|e| AdvisorError::config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

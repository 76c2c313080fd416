//! Request-level operations over the engine, store and training lifecycle.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::{QualityCatalog, StyleCatalog};
use crate::config_loader::AdvisorConfig;
use crate::dataset_store::{DatasetReport, DatasetStore, TrainingRecord};
use crate::design_input::DesignInput;
use crate::errors::AdvisorResult;
use crate::mlp_predictor::MlpPredictor;
use crate::predictor::PredictorModel;
use crate::style_engine::{Analysis, StyleEngine, StylePackage};
use crate::training_orchestrator::{TrainingOrchestrator, TrainingReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorStats {
    pub training_count: usize,
    pub used_feedback_count: usize,
    pub pending_count: usize,
    pub retrain_threshold: usize,
    pub ready_for_retrain: bool,
    pub model_exists: bool,
}

pub struct AdvisorService<P: PredictorModel> {
    engine: Arc<StyleEngine>,
    store: Arc<DatasetStore>,
    orchestrator: TrainingOrchestrator<P>,
    config: AdvisorConfig,
}

impl AdvisorService<MlpPredictor> {
    /// Wire everything from configuration and load the saved model, if any.
    pub fn from_config(config: AdvisorConfig) -> AdvisorResult<Self> {
        let styles = match &config.catalog_path {
            Some(path) => {
                info!("Loading style catalog from {}", path.display());
                StyleCatalog::load_from_file(path)?
            }
            None => StyleCatalog::default(),
        };
        let engine = StyleEngine::new(QualityCatalog::default(), styles);
        let store = DatasetStore::open(&config.dataset_path)?;
        let predictor = MlpPredictor::new(&config.model_path, &config.training)?;

        let service = Self::new(config, engine, store, predictor);
        service.orchestrator.load_model()?;
        Ok(service)
    }
}

impl<P: PredictorModel> AdvisorService<P> {
    pub fn new(config: AdvisorConfig, engine: StyleEngine, store: DatasetStore, predictor: P) -> Self {
        let engine = Arc::new(engine);
        let store = Arc::new(store);
        let orchestrator = TrainingOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&engine),
            predictor,
            config.training.clone(),
        );
        Self {
            engine,
            store,
            orchestrator,
            config,
        }
    }

    pub fn orchestrator(&self) -> &TrainingOrchestrator<P> {
        &self.orchestrator
    }

    /// Classify and analyze without consulting the predictor.
    pub fn analyze(&self, input: &Value) -> AdvisorResult<Analysis> {
        self.engine.analyze(&DesignInput::from_value(input)?)
    }

    pub fn generate(&self, input: &Value) -> AdvisorResult<StylePackage> {
        let analysis = self.analyze(input)?;
        let confidence = self.orchestrator.confidence(&analysis.features)?;
        info!(
            "Generated {} style (confidence {:.3})",
            analysis.assignment.color_style, confidence
        );
        Ok(self.engine.package(analysis, confidence))
    }

    /// Record a rated outcome; returns the pending count.
    pub fn submit_feedback(&self, input: &Value, rating: f64, feedback: &str) -> AdvisorResult<usize> {
        let design = DesignInput::from_value(input)?;
        let record = TrainingRecord::new(&design, rating, feedback)?;
        let pending = self.store.append_feedback(record)?;
        if pending >= self.config.training.retrain_threshold {
            info!("{} feedback records pending; ready to retrain", pending);
        }
        Ok(pending)
    }

    pub fn retrain(&self) -> AdvisorResult<TrainingReport> {
        self.orchestrator.retrain().inspect_err(|e| {
            if let Some(pending) = e.pending_count() {
                warn!("Retrain not started: only {} pending", pending);
            } else if e.is_retryable() {
                warn!("Retrain not started: {}", e);
            }
        })
    }

    pub fn train(&self, incremental: bool) -> AdvisorResult<TrainingReport> {
        self.orchestrator.run(incremental)
    }

    pub fn stats(&self) -> AdvisorResult<AdvisorStats> {
        let counts = self.store.counts()?;
        let threshold = self.config.training.retrain_threshold;
        Ok(AdvisorStats {
            training_count: counts.training,
            used_feedback_count: counts.used_feedback,
            pending_count: counts.pending_feedback,
            retrain_threshold: threshold,
            ready_for_retrain: counts.pending_feedback >= threshold,
            model_exists: self.orchestrator.model_exists()?,
        })
    }

    pub fn report(&self) -> AdvisorResult<DatasetReport> {
        self.store
            .report(self.config.training.positive_rating_threshold)
    }
}

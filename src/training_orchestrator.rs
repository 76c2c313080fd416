//! Dataset snapshot → labeled matrix → split → train → persist → promote.
//!
//! Pending feedback is promoted only after the model has trained,
//! evaluated and saved. Any failure before that point leaves the dataset
//! untouched and the in-memory predictor reloaded from its last artifact.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::config_loader::TrainingConfig;
use crate::dataset_store::{Dataset, DatasetStore};
use crate::errors::{AdvisorError, AdvisorResult, SafeLock};
use crate::feature_encoder::FeatureVector;
use crate::predictor::{EvaluationMetrics, Label, PredictorModel, TrainingHistory};
use crate::style_engine::StyleEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    /// Fresh model over the whole corpus.
    Full,
    /// Continue from the saved artifact over the whole corpus.
    Incremental,
    /// Gated on pending feedback; continues from the saved artifact.
    Retrain,
}

impl TrainingMode {
    fn starts_from_artifact(self) -> bool {
        !matches!(self, TrainingMode::Full)
    }

    fn epochs(self, config: &TrainingConfig) -> usize {
        match self {
            TrainingMode::Full => config.full_epochs,
            TrainingMode::Incremental => config.incremental_epochs,
            TrainingMode::Retrain => config.retrain_epochs,
        }
    }
}

/// Binary label for a rating: approved at or above the threshold.
pub fn label_for(rating: f64, threshold: f64) -> Label {
    if rating >= threshold {
        1
    } else {
        0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledMatrix {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<Label>,
    pub skipped: usize,
}

impl LabeledMatrix {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|l| **l == 1).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSplit {
    pub x_train: Vec<FeatureVector>,
    pub y_train: Vec<Label>,
    pub x_val: Vec<FeatureVector>,
    pub y_val: Vec<Label>,
    pub stratified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub mode: TrainingMode,
    pub loaded_existing_model: bool,
    pub history: TrainingHistory,
    pub metrics: EvaluationMetrics,
    pub total_samples: usize,
    pub train_samples: usize,
    pub validation_samples: usize,
    pub skipped_records: usize,
    pub stratified: bool,
    pub promoted_feedback: usize,
    pub dataset_fingerprint: String,
    pub completed_at: DateTime<Utc>,
}

pub struct TrainingOrchestrator<P: PredictorModel> {
    store: Arc<DatasetStore>,
    engine: Arc<StyleEngine>,
    predictor: Mutex<P>,
    config: TrainingConfig,
}

impl<P: PredictorModel> TrainingOrchestrator<P> {
    pub fn new(
        store: Arc<DatasetStore>,
        engine: Arc<StyleEngine>,
        predictor: P,
        config: TrainingConfig,
    ) -> Self {
        Self {
            store,
            engine,
            predictor: Mutex::new(predictor),
            config,
        }
    }

    /// Load the saved artifact into the predictor, if there is one.
    pub fn load_model(&self) -> AdvisorResult<bool> {
        self.predictor.safe_lock("predictor")?.load()
    }

    pub fn model_exists(&self) -> AdvisorResult<bool> {
        Ok(self.predictor.safe_lock("predictor")?.artifact_exists())
    }

    /// Approval probability for one encoded design.
    pub fn confidence(&self, features: &FeatureVector) -> AdvisorResult<f64> {
        let predictor = self.predictor.safe_lock("predictor")?;
        let probabilities = predictor.predict(std::slice::from_ref(features))?;
        probabilities
            .first()
            .copied()
            .ok_or_else(|| AdvisorError::model("predict", "predictor returned no output"))
    }

    /// Encode every record of every partition; records that cannot be
    /// encoded are logged and skipped.
    pub fn prepare_matrix(&self, dataset: &Dataset) -> LabeledMatrix {
        let mut matrix = LabeledMatrix::default();
        for (i, record) in dataset.all_records().enumerate() {
            if !record.rating.is_finite() {
                warn!("Skipping record {}: rating is not a number", i);
                matrix.skipped += 1;
                continue;
            }
            match record
                .design_input()
                .and_then(|input| self.engine.encode(&input))
            {
                Ok(features) => {
                    matrix.features.push(features);
                    matrix
                        .labels
                        .push(label_for(record.rating, self.config.positive_rating_threshold));
                }
                Err(e) => {
                    warn!("Skipping record {}: {}", i, e);
                    matrix.skipped += 1;
                }
            }
        }
        info!(
            "Prepared {} labeled examples ({} positive, {} skipped)",
            matrix.len(),
            matrix.positives(),
            matrix.skipped
        );
        matrix
    }

    /// Pending count, if it meets the retrain threshold.
    pub fn retrain_gate(&self, dataset: &Dataset) -> AdvisorResult<usize> {
        let pending = dataset.pending_feedback.len();
        let required = self.config.retrain_threshold;
        if pending < required {
            info!("Retrain refused: {} pending, {} required", pending, required);
            return Err(AdvisorError::insufficient_feedback(pending, required));
        }
        Ok(pending)
    }

    /// Seeded train/validation split, stratified when both classes have
    /// more than one example.
    pub fn split(&self, matrix: LabeledMatrix) -> AdvisorResult<DataSplit> {
        let total = matrix.len();
        let required = self.config.min_training_examples.max(2);
        if total < required {
            return Err(AdvisorError::degenerate_dataset(total, required));
        }

        let fraction = self.config.validation_fraction;
        let mut rng = StdRng::seed_from_u64(self.config.split_seed);

        let positives: Vec<usize> = (0..total).filter(|i| matrix.labels[*i] == 1).collect();
        let negatives: Vec<usize> = (0..total).filter(|i| matrix.labels[*i] == 0).collect();
        let stratified = positives.len() > 1 && negatives.len() > 1;

        let (mut train_idx, mut val_idx) = if stratified {
            let (pos_train, pos_val) = split_indices(positives, fraction, &mut rng);
            let (neg_train, neg_val) = split_indices(negatives, fraction, &mut rng);
            (
                [pos_train, neg_train].concat(),
                [pos_val, neg_val].concat(),
            )
        } else {
            info!("Too few examples of one class to stratify; using a plain split");
            split_indices((0..total).collect(), fraction, &mut rng)
        };
        train_idx.shuffle(&mut rng);
        val_idx.shuffle(&mut rng);

        let pick = |indices: &[usize]| -> (Vec<FeatureVector>, Vec<Label>) {
            indices
                .iter()
                .map(|i| (matrix.features[*i], matrix.labels[*i]))
                .unzip()
        };
        let (x_train, y_train) = pick(&train_idx);
        let (x_val, y_val) = pick(&val_idx);
        Ok(DataSplit {
            x_train,
            y_train,
            x_val,
            y_val,
            stratified,
        })
    }

    /// Train on the whole corpus; `incremental` continues from the saved
    /// artifact. Pending feedback in the snapshot is promoted on success.
    pub fn run(&self, incremental: bool) -> AdvisorResult<TrainingReport> {
        let mode = if incremental {
            TrainingMode::Incremental
        } else {
            TrainingMode::Full
        };
        self.execute(mode)
    }

    /// Gated retrain on accumulated feedback.
    pub fn retrain(&self) -> AdvisorResult<TrainingReport> {
        self.execute(TrainingMode::Retrain)
    }

    fn execute(&self, mode: TrainingMode) -> AdvisorResult<TrainingReport> {
        // Held until the run returns; other processes training on the same
        // dataset get RetrainInProgress.
        let _run = self.store.lock_training()?;

        let dataset = self.store.load()?;
        if mode == TrainingMode::Retrain {
            self.retrain_gate(&dataset)?;
        }
        let pending_snapshot = dataset.pending_feedback.len();
        let fingerprint = dataset.fingerprint()?;

        let matrix = self.prepare_matrix(&dataset);
        let total_samples = matrix.len();
        let skipped_records = matrix.skipped;
        let split = self.split(matrix)?;

        info!(
            "Starting {:?} training: {} train / {} validation samples",
            mode,
            split.x_train.len(),
            split.x_val.len()
        );

        let mut predictor = self.predictor.safe_lock("predictor")?;
        let loaded_existing_model = if mode.starts_from_artifact() {
            predictor.load()?
        } else {
            predictor.build()?;
            false
        };

        let outcome = train_and_save(&mut *predictor, &split, mode.epochs(&self.config));
        let (history, metrics) = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!("Training failed, pending feedback left in place: {}", e);
                if let Err(reload) = predictor.load() {
                    warn!("Could not restore previous model after failure: {}", reload);
                }
                return Err(e);
            }
        };
        drop(predictor);

        let promoted_feedback = self.store.promote_first(pending_snapshot)?;
        info!(
            "Training complete: loss={:.4} accuracy={:.3} auc={:.3}, promoted {} feedback records",
            metrics.loss, metrics.accuracy, metrics.auc, promoted_feedback
        );

        Ok(TrainingReport {
            mode,
            loaded_existing_model,
            history,
            metrics,
            total_samples,
            train_samples: split.x_train.len(),
            validation_samples: split.x_val.len(),
            skipped_records,
            stratified: split.stratified,
            promoted_feedback,
            dataset_fingerprint: fingerprint,
            completed_at: Utc::now(),
        })
    }
}

fn train_and_save<P: PredictorModel + ?Sized>(
    predictor: &mut P,
    split: &DataSplit,
    epochs: usize,
) -> AdvisorResult<(TrainingHistory, EvaluationMetrics)> {
    let history = predictor.train(
        &split.x_train,
        &split.y_train,
        &split.x_val,
        &split.y_val,
        epochs,
    )?;
    let metrics = predictor.evaluate(&split.x_val, &split.y_val)?;
    predictor.save()?;
    Ok((history, metrics))
}

/// Shuffle `indices` and hold out `fraction` of them (at least one, never
/// all) for validation.
fn split_indices(
    mut indices: Vec<usize>,
    fraction: f64,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    indices.shuffle(rng);
    let n = indices.len();
    let held_out = ((n as f64 * fraction).round() as usize).clamp(1, n.saturating_sub(1).max(1));
    let val = indices.split_off(n - held_out.min(n));
    (indices, val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset_store::TrainingRecord;
    use crate::design_input::DesignInput;
    use serde_json::json;
    use tempfile::tempdir;

    struct ConstantPredictor;

    impl PredictorModel for ConstantPredictor {
        fn build(&mut self) -> AdvisorResult<()> {
            Ok(())
        }
        fn train(
            &mut self,
            _: &[FeatureVector],
            _: &[Label],
            _: &[FeatureVector],
            _: &[Label],
            _: usize,
        ) -> AdvisorResult<TrainingHistory> {
            Ok(TrainingHistory::default())
        }
        fn predict(&self, x: &[FeatureVector]) -> AdvisorResult<Vec<f64>> {
            Ok(vec![0.5; x.len()])
        }
        fn save(&self) -> AdvisorResult<()> {
            Ok(())
        }
        fn load(&mut self) -> AdvisorResult<bool> {
            Ok(false)
        }
        fn artifact_exists(&self) -> bool {
            false
        }
    }

    fn orchestrator(dir: &std::path::Path) -> TrainingOrchestrator<ConstantPredictor> {
        let store = Arc::new(DatasetStore::open(dir.join("data.json")).unwrap());
        TrainingOrchestrator::new(
            store,
            Arc::new(StyleEngine::default()),
            ConstantPredictor,
            TrainingConfig::default(),
        )
    }

    fn record(rating: f64) -> TrainingRecord {
        let input = DesignInput::from_value(&json!({"palette": ["#FFFFFF", "#000000"]})).unwrap();
        TrainingRecord::new(&input, rating, "").unwrap()
    }

    fn matrix(labels: &[Label]) -> LabeledMatrix {
        LabeledMatrix {
            features: labels
                .iter()
                .map(|l| FeatureVector::new([*l as f64; 14]))
                .collect(),
            labels: labels.to_vec(),
            skipped: 0,
        }
    }

    #[test]
    fn test_label_threshold() {
        assert_eq!(label_for(0.69, 0.7), 0);
        assert_eq!(label_for(0.70, 0.7), 1);
        assert_eq!(label_for(1.0, 0.7), 1);
    }

    #[test]
    fn test_prepare_matrix_skips_bad_records() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());
        let mut dataset = Dataset::default();
        dataset.training.push(record(0.9));
        dataset.used_feedback.push(record(0.2));
        let mut broken = record(0.8);
        broken.input = json!("not a mapping");
        dataset.pending_feedback.push(broken);

        let matrix = orchestrator.prepare_matrix(&dataset);
        assert_eq!(matrix.labels, vec![1, 0]);
        assert_eq!(matrix.skipped, 1);
    }

    #[test]
    fn test_gate_threshold() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());
        let mut dataset = Dataset::default();
        for _ in 0..4 {
            dataset.pending_feedback.push(record(0.5));
        }
        let err = orchestrator.retrain_gate(&dataset).unwrap_err();
        assert_eq!(err.pending_count(), Some(4));

        dataset.pending_feedback.push(record(0.5));
        assert_eq!(orchestrator.retrain_gate(&dataset).unwrap(), 5);
    }

    #[test]
    fn test_stratified_split_keeps_both_classes() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());
        let labels: Vec<Label> = (0..20).map(|i| (i < 6) as Label).collect();
        let split = orchestrator.split(matrix(&labels)).unwrap();

        assert!(split.stratified);
        assert_eq!(split.x_train.len() + split.x_val.len(), 20);
        assert_eq!(split.x_val.len(), 4);
        assert!(split.y_val.contains(&1) && split.y_val.contains(&0));
        assert!(split.y_train.contains(&1) && split.y_train.contains(&0));
        for (x, y) in split.x_val.iter().zip(&split.y_val) {
            assert_eq!(x.as_slice()[0], *y as f64);
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());
        let labels: Vec<Label> = (0..15).map(|i| (i % 3 == 0) as Label).collect();
        let a = orchestrator.split(matrix(&labels)).unwrap();
        let b = orchestrator.split(matrix(&labels)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_class_falls_back_to_plain_split() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());
        let mut labels = vec![0; 11];
        labels.push(1);
        let split = orchestrator.split(matrix(&labels)).unwrap();
        assert!(!split.stratified);
        assert_eq!(split.x_train.len() + split.x_val.len(), 12);
    }

    #[test]
    fn test_too_few_examples_refused() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());
        let result = orchestrator.split(matrix(&[0, 1, 0, 1, 0, 1, 0, 1, 0]));
        assert!(matches!(
            result,
            Err(AdvisorError::DegenerateDataset { usable: 9, required: 10 })
        ));
    }

    #[test]
    fn test_second_run_rejected_while_in_flight() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());
        let _held = orchestrator.store.lock_training().unwrap();
        assert!(matches!(
            orchestrator.run(false),
            Err(AdvisorError::RetrainInProgress)
        ));
    }

    #[test]
    fn test_training_slot_released_after_failure() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());
        assert!(matches!(
            orchestrator.retrain(),
            Err(AdvisorError::InsufficientFeedback { .. })
        ));
        assert!(orchestrator.store.lock_training().is_ok());
    }
}

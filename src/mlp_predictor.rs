//! Feed-forward approval predictor on candle.
//!
//! 14 → 64 → 32 → 16 → 1 with ReLU and dropout between hidden layers,
//! trained with AdamW on logits. Weights persist as one safetensors file
//! carrying an `artifact_version` tensor; an artifact from another version
//! is treated as unreadable.

use candle_core::{DType, Device, Tensor};
use candle_nn::{linear, AdamW, Dropout, Linear, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config_loader::TrainingConfig;
use crate::errors::{AdvisorError, AdvisorResult, SafeLock};
use crate::feature_encoder::{FeatureVector, FEATURE_COUNT};
use crate::predictor::{EpochRecord, Label, PredictorModel, TrainingHistory};

pub const ARTIFACT_VERSION: u32 = 1;
const VERSION_KEY: &str = "artifact_version";

const HIDDEN: [usize; 3] = [64, 32, 16];
const DROPOUT: f32 = 0.3;
const MIN_DELTA: f64 = 1e-6;

/// Optimizer and stopping knobs, taken from `[training]`.
#[derive(Debug, Clone)]
pub struct TrainingSchedule {
    pub batch_size: usize,
    pub learning_rate: f64,
    pub early_stopping_patience: usize,
    pub lr_plateau_patience: usize,
    pub lr_plateau_factor: f64,
    pub min_learning_rate: f64,
    pub shuffle_seed: u64,
}

impl From<&TrainingConfig> for TrainingSchedule {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            learning_rate: config.learning_rate,
            early_stopping_patience: config.early_stopping_patience,
            lr_plateau_patience: config.lr_plateau_patience,
            lr_plateau_factor: config.lr_plateau_factor,
            min_learning_rate: config.min_learning_rate,
            shuffle_seed: config.split_seed,
        }
    }
}

struct Network {
    fc1: Linear,
    fc2: Linear,
    fc3: Linear,
    out: Linear,
    dropout: Dropout,
}

impl Network {
    fn new(vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            fc1: linear(FEATURE_COUNT, HIDDEN[0], vb.pp("fc1"))?,
            fc2: linear(HIDDEN[0], HIDDEN[1], vb.pp("fc2"))?,
            fc3: linear(HIDDEN[1], HIDDEN[2], vb.pp("fc3"))?,
            out: linear(HIDDEN[2], 1, vb.pp("out"))?,
            dropout: Dropout::new(DROPOUT),
        })
    }

    /// Raw logits, shape `(n, 1)`.
    fn forward(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let xs = self.fc1.forward(xs)?.relu()?;
        let xs = self.dropout.forward(&xs, train)?;
        let xs = self.fc2.forward(&xs)?.relu()?;
        let xs = self.dropout.forward(&xs, train)?;
        let xs = self.fc3.forward(&xs)?.relu()?;
        self.out.forward(&xs)
    }
}

/// Mean of `max(x, 0) - x*y + ln(1 + e^-|x|)`, the overflow-free form of
/// sigmoid cross-entropy.
fn bce_with_logits(logits: &Tensor, targets: &Tensor) -> candle_core::Result<Tensor> {
    let positive = logits.relu()?;
    let cross = (logits * targets)?;
    let softplus = (logits.abs()?.neg()?.exp()? + 1.0)?.log()?;
    ((positive - cross)? + softplus)?.mean_all()
}

pub struct MlpPredictor {
    artifact_path: PathBuf,
    schedule: TrainingSchedule,
    device: Device,
    varmap: VarMap,
    network: Network,
}

impl MlpPredictor {
    pub fn new<P: AsRef<Path>>(artifact_path: P, config: &TrainingConfig) -> AdvisorResult<Self> {
        let device = Device::Cpu;
        let (varmap, network) = fresh(&device)?;
        Ok(Self {
            artifact_path: artifact_path.as_ref().to_path_buf(),
            schedule: TrainingSchedule::from(config),
            device,
            varmap,
            network,
        })
    }

    fn features(&self, x: &[FeatureVector]) -> candle_core::Result<Tensor> {
        let flat: Vec<f32> = x.iter().flat_map(|row| row.to_f32()).collect();
        Tensor::from_vec(flat, (x.len(), FEATURE_COUNT), &self.device)
    }

    fn labels(&self, y: &[Label]) -> candle_core::Result<Tensor> {
        let flat: Vec<f32> = y.iter().map(|label| *label as f32).collect();
        Tensor::from_vec(flat, (y.len(), 1), &self.device)
    }

    fn snapshot(&self) -> AdvisorResult<HashMap<String, Tensor>> {
        let vars = self.varmap.data().safe_lock("predictor weights")?;
        vars.iter()
            .map(|(name, var)| -> AdvisorResult<(String, Tensor)> {
                Ok((name.clone(), var.as_tensor().copy()?))
            })
            .collect()
    }

    fn restore(&self, weights: &HashMap<String, Tensor>) -> AdvisorResult<()> {
        let vars = self.varmap.data().safe_lock("predictor weights")?;
        for (name, var) in vars.iter() {
            let tensor = weights.get(name).ok_or_else(|| {
                AdvisorError::model("restore", format!("no tensor for parameter '{name}'"))
            })?;
            var.set(tensor)?;
        }
        Ok(())
    }

    fn read_artifact(&mut self) -> AdvisorResult<()> {
        let tensors = candle_core::safetensors::load(&self.artifact_path, &self.device)?;
        let version = tensors
            .get(VERSION_KEY)
            .ok_or_else(|| AdvisorError::model("load", "artifact has no version tag"))?
            .to_vec1::<u32>()?;
        if version != [ARTIFACT_VERSION] {
            return Err(AdvisorError::model(
                "load",
                format!("artifact version {version:?}, expected {ARTIFACT_VERSION}"),
            ));
        }

        self.build()?;
        self.restore(&tensors)
    }
}

fn fresh(device: &Device) -> AdvisorResult<(VarMap, Network)> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let network = Network::new(vb)?;
    Ok((varmap, network))
}

impl PredictorModel for MlpPredictor {
    fn build(&mut self) -> AdvisorResult<()> {
        let (varmap, network) = fresh(&self.device)?;
        self.varmap = varmap;
        self.network = network;
        Ok(())
    }

    fn train(
        &mut self,
        x_train: &[FeatureVector],
        y_train: &[Label],
        x_val: &[FeatureVector],
        y_val: &[Label],
        epochs: usize,
    ) -> AdvisorResult<TrainingHistory> {
        if x_train.is_empty() || x_train.len() != y_train.len() || x_val.len() != y_val.len() {
            return Err(AdvisorError::model(
                "train",
                format!(
                    "bad shapes: {} x {} train, {} x {} validation",
                    x_train.len(),
                    y_train.len(),
                    x_val.len(),
                    y_val.len()
                ),
            ));
        }

        let xs = self.features(x_train)?;
        let ys = self.labels(y_train)?;
        let schedule = self.schedule.clone();

        let mut optimizer = AdamW::new(
            self.varmap.all_vars(),
            ParamsAdamW {
                lr: schedule.learning_rate,
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;
        let mut rng = StdRng::seed_from_u64(schedule.shuffle_seed);
        let mut order: Vec<u32> = (0..x_train.len() as u32).collect();

        let mut history = TrainingHistory::default();
        let mut best_loss = f64::INFINITY;
        let mut best_weights = self.snapshot()?;
        let mut since_best = 0;
        let mut since_lr_change = 0;
        let mut learning_rate = schedule.learning_rate;

        for epoch in 1..=epochs {
            order.shuffle(&mut rng);
            for batch in order.chunks(schedule.batch_size) {
                let index = Tensor::from_slice(batch, batch.len(), &self.device)?;
                let logits = self.network.forward(&xs.index_select(&index, 0)?, true)?;
                let loss = bce_with_logits(&logits, &ys.index_select(&index, 0)?)?;
                optimizer.backward_step(&loss)?;
            }

            let train_metrics = self.evaluate(x_train, y_train)?;
            let val_metrics = if x_val.is_empty() {
                train_metrics
            } else {
                self.evaluate(x_val, y_val)?
            };
            if !val_metrics.loss.is_finite() {
                return Err(AdvisorError::model(
                    "train",
                    format!("loss diverged at epoch {epoch}"),
                ));
            }

            debug!(
                "epoch {}/{}: loss={:.4} acc={:.3} val_loss={:.4} val_acc={:.3} lr={:.1e}",
                epoch,
                epochs,
                train_metrics.loss,
                train_metrics.accuracy,
                val_metrics.loss,
                val_metrics.accuracy,
                learning_rate
            );
            history.epochs.push(EpochRecord {
                epoch,
                loss: train_metrics.loss,
                accuracy: train_metrics.accuracy,
                val_loss: val_metrics.loss,
                val_accuracy: val_metrics.accuracy,
                learning_rate,
            });

            if val_metrics.loss < best_loss - MIN_DELTA {
                best_loss = val_metrics.loss;
                best_weights = self.snapshot()?;
                history.best_epoch = Some(epoch);
                since_best = 0;
                since_lr_change = 0;
                continue;
            }

            since_best += 1;
            since_lr_change += 1;
            if since_lr_change >= schedule.lr_plateau_patience
                && learning_rate > schedule.min_learning_rate
            {
                learning_rate =
                    (learning_rate * schedule.lr_plateau_factor).max(schedule.min_learning_rate);
                optimizer.set_learning_rate(learning_rate);
                since_lr_change = 0;
                info!("Validation loss plateaued; learning rate now {:.1e}", learning_rate);
            }
            if since_best >= schedule.early_stopping_patience {
                history.stopped_early = true;
                info!(
                    "Early stopping at epoch {} (best epoch {:?})",
                    epoch, history.best_epoch
                );
                break;
            }
        }

        self.restore(&best_weights)?;
        Ok(history)
    }

    fn predict(&self, x: &[FeatureVector]) -> AdvisorResult<Vec<f64>> {
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let logits = self.network.forward(&self.features(x)?, false)?;
        let probabilities = candle_nn::ops::sigmoid(&logits)?
            .flatten_all()?
            .to_vec1::<f32>()?;
        Ok(probabilities.into_iter().map(f64::from).collect())
    }

    fn save(&self) -> AdvisorResult<()> {
        if let Some(parent) = self.artifact_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AdvisorError::io("creating model directory", e))?;
        }

        let mut tensors = self.snapshot()?;
        tensors.insert(
            VERSION_KEY.to_string(),
            Tensor::new(&[ARTIFACT_VERSION], &self.device)?,
        );

        let mut tmp_name = self
            .artifact_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = self.artifact_path.with_file_name(tmp_name);

        candle_core::safetensors::save(&tensors, &tmp)?;
        fs::rename(&tmp, &self.artifact_path)
            .map_err(|e| AdvisorError::io("replacing model artifact", e))?;
        info!("Model artifact saved to {}", self.artifact_path.display());
        Ok(())
    }

    fn load(&mut self) -> AdvisorResult<bool> {
        if !self.artifact_exists() {
            info!(
                "No model artifact at {}; starting from a fresh model",
                self.artifact_path.display()
            );
            self.build()?;
            return Ok(false);
        }

        match self.read_artifact() {
            Ok(()) => {
                info!("Loaded model artifact from {}", self.artifact_path.display());
                Ok(true)
            }
            Err(e) => {
                let err = AdvisorError::model_load(
                    self.artifact_path.display().to_string(),
                    e.to_string(),
                );
                warn!("{}; starting from a fresh model", err);
                self.build()?;
                Ok(false)
            }
        }
    }

    fn artifact_exists(&self) -> bool {
        self.artifact_path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn separable(n: usize) -> (Vec<FeatureVector>, Vec<Label>) {
        (0..n)
            .map(|i| {
                let label = (i % 2) as Label;
                let base = if label == 1 { 0.9 } else { 0.1 };
                let jitter = (i % 7) as f64 * 0.01;
                (FeatureVector::new([base + jitter - 0.03; FEATURE_COUNT]), label)
            })
            .unzip()
    }

    fn config() -> TrainingConfig {
        TrainingConfig {
            learning_rate: 0.01,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_predictions_are_probabilities() {
        let dir = tempdir().unwrap();
        let model = MlpPredictor::new(dir.path().join("model.safetensors"), &config()).unwrap();
        let (x, _) = separable(6);
        let probs = model.predict(&x).unwrap();
        assert_eq!(probs.len(), 6);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(model.predict(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_train_records_history() {
        let dir = tempdir().unwrap();
        let mut model = MlpPredictor::new(dir.path().join("model.safetensors"), &config()).unwrap();
        let (x, y) = separable(40);
        let history = model.train(&x[..32], &y[..32], &x[32..], &y[32..], 5).unwrap();

        assert!(!history.epochs.is_empty());
        assert!(history.epochs.len() <= 5);
        assert!(history.best_epoch.is_some());
        assert!(history.epochs.iter().all(|e| e.loss.is_finite()));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models").join("model.safetensors");
        let mut model = MlpPredictor::new(&path, &config()).unwrap();
        let (x, y) = separable(20);
        model.train(&x, &y, &[], &[], 3).unwrap();
        model.save().unwrap();
        assert!(model.artifact_exists());

        let mut reloaded = MlpPredictor::new(&path, &config()).unwrap();
        assert!(reloaded.load().unwrap());
        let before = model.predict(&x).unwrap();
        let after = reloaded.predict(&x).unwrap();
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_or_corrupt_artifact_builds_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        let mut model = MlpPredictor::new(&path, &config()).unwrap();
        assert!(!model.load().unwrap());

        fs::write(&path, b"not a safetensors file").unwrap();
        assert!(!model.load().unwrap());
        assert_eq!(model.predict(&separable(2).0).unwrap().len(), 2);
    }

    #[test]
    fn test_version_mismatch_is_unreadable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        let model = MlpPredictor::new(&path, &config()).unwrap();

        let mut tensors = model.snapshot().unwrap();
        tensors.insert(
            VERSION_KEY.to_string(),
            Tensor::new(&[ARTIFACT_VERSION + 1], &Device::Cpu).unwrap(),
        );
        candle_core::safetensors::save(&tensors, &path).unwrap();

        let mut reloaded = MlpPredictor::new(&path, &config()).unwrap();
        assert!(!reloaded.load().unwrap());
    }
}

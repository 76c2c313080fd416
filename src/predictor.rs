//! Approval predictor contract and the metrics every backend reports.

use serde::{Deserialize, Serialize};

use crate::errors::{AdvisorError, AdvisorResult};
use crate::feature_encoder::FeatureVector;

/// Binary approval label: 1 = approved design.
pub type Label = u8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochRecord>,
    pub best_epoch: Option<usize>,
    pub stopped_early: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub loss: f64,
    pub accuracy: f64,
    pub auc: f64,
}

/// A binary classifier over 14-feature design vectors. The training
/// lifecycle only ever talks to this trait.
pub trait PredictorModel: Send {
    /// Replace any current state with a freshly initialized model.
    fn build(&mut self) -> AdvisorResult<()>;

    fn train(
        &mut self,
        x_train: &[FeatureVector],
        y_train: &[Label],
        x_val: &[FeatureVector],
        y_val: &[Label],
        epochs: usize,
    ) -> AdvisorResult<TrainingHistory>;

    /// Approval probability in [0, 1] for each row.
    fn predict(&self, x: &[FeatureVector]) -> AdvisorResult<Vec<f64>>;

    fn evaluate(&self, x: &[FeatureVector], y: &[Label]) -> AdvisorResult<EvaluationMetrics> {
        let probabilities = self.predict(x)?;
        metrics(&probabilities, y)
    }

    /// Persist to the configured artifact path, replacing what was there.
    fn save(&self) -> AdvisorResult<()>;

    /// `true` if an artifact was found and loaded; `false` if a fresh
    /// model was built in its place.
    fn load(&mut self) -> AdvisorResult<bool>;

    fn artifact_exists(&self) -> bool;
}

pub fn metrics(probabilities: &[f64], labels: &[Label]) -> AdvisorResult<EvaluationMetrics> {
    if probabilities.len() != labels.len() {
        return Err(AdvisorError::model(
            "evaluate",
            format!(
                "{} predictions for {} labels",
                probabilities.len(),
                labels.len()
            ),
        ));
    }
    if labels.is_empty() {
        return Err(AdvisorError::model("evaluate", "no examples to evaluate"));
    }
    Ok(EvaluationMetrics {
        loss: binary_cross_entropy(probabilities, labels),
        accuracy: accuracy(probabilities, labels),
        auc: roc_auc(probabilities, labels),
    })
}

const EPSILON: f64 = 1e-7;

pub fn binary_cross_entropy(probabilities: &[f64], labels: &[Label]) -> f64 {
    let total: f64 = probabilities
        .iter()
        .zip(labels)
        .map(|(p, y)| {
            let p = p.clamp(EPSILON, 1.0 - EPSILON);
            if *y == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / labels.len().max(1) as f64
}

pub fn accuracy(probabilities: &[f64], labels: &[Label]) -> f64 {
    let correct = probabilities
        .iter()
        .zip(labels)
        .filter(|(p, y)| (**p >= 0.5) == (**y == 1))
        .count();
    correct as f64 / labels.len().max(1) as f64
}

/// Area under the ROC curve via the rank-sum statistic, averaging ranks
/// over ties. A single-class set has no ranking to measure and scores 0.5.
pub fn roc_auc(probabilities: &[f64], labels: &[Label]) -> f64 {
    let positives = labels.iter().filter(|y| **y == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|a, b| probabilities[*a].total_cmp(&probabilities[*b]));

    let mut ranks = vec![0.0; order.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && probabilities[order[j + 1]] == probabilities[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = ranks
        .iter()
        .zip(labels)
        .filter(|(_, y)| **y == 1)
        .map(|(r, _)| r)
        .sum();
    let p = positives as f64;
    (positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_ranking() {
        let probs = [0.1, 0.2, 0.8, 0.9];
        let labels = [0, 0, 1, 1];
        assert_eq!(roc_auc(&probs, &labels), 1.0);
        assert_eq!(accuracy(&probs, &labels), 1.0);
    }

    #[test]
    fn test_inverted_and_tied_ranking() {
        assert_eq!(roc_auc(&[0.9, 0.1], &[0, 1]), 0.0);
        assert_eq!(roc_auc(&[0.5, 0.5, 0.5, 0.5], &[0, 1, 0, 1]), 0.5);
        assert_eq!(roc_auc(&[0.3, 0.7], &[1, 1]), 0.5);
    }

    #[test]
    fn test_cross_entropy() {
        let loss = binary_cross_entropy(&[0.5, 0.5], &[0, 1]);
        assert!((loss - std::f64::consts::LN_2).abs() < 1e-9);
        assert!(binary_cross_entropy(&[1.0], &[0]).is_finite());
    }

    #[test]
    fn test_metrics_reject_mismatched_lengths() {
        assert!(metrics(&[0.5], &[0, 1]).is_err());
        assert!(metrics(&[], &[]).is_err());
    }
}

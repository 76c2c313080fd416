//! Persisted feedback corpus.
//!
//! The dataset file holds three ordered partitions: curated `training_data`,
//! `feedback_data` already folded into a trained model, and
//! `pending_feedback` awaiting the next retrain. Every access holds an
//! exclusive OS lock on the sibling `<dataset>.lock` file, so separate
//! processes (and separate store instances) never interleave a
//! read-modify-write. Writes go to a sibling temp file that is then renamed
//! over the original. Training runs hold a second lock, `<dataset>.train.lock`,
//! for their whole duration.
//!
//! On-disk versions:
//! - v0: a bare JSON array of records (all treated as training data)
//! - v1: an object with the three partition keys, no version tag
//! - v2: v1 plus `"schema_version": 2` (what this store writes)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::design_input::DesignInput;
use crate::errors::{AdvisorError, AdvisorResult};

pub const SCHEMA_VERSION: u32 = 2;

const DEFAULT_RATING: f64 = 0.5;

/// One rated outcome. `input` stays raw JSON so a single record with an
/// unrecognizable design never prevents the rest of the file from loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub input: Value,
    #[serde(default = "default_rating")]
    pub rating: f64,
    #[serde(default)]
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    /// Fields written by other tools are carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_rating() -> f64 {
    DEFAULT_RATING
}

impl TrainingRecord {
    pub fn new(input: &DesignInput, rating: f64, feedback: impl Into<String>) -> AdvisorResult<Self> {
        if !(0.0..=1.0).contains(&rating) {
            return Err(AdvisorError::input(format!(
                "rating must be within [0, 1], got {rating}"
            )));
        }
        Ok(Self {
            input: input.to_value()?,
            rating,
            feedback: feedback.into(),
            recorded_at: Some(Utc::now()),
            extra: Map::new(),
        })
    }

    pub fn design_input(&self) -> AdvisorResult<DesignInput> {
        DesignInput::from_value(&self.input)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub training: Vec<TrainingRecord>,
    pub used_feedback: Vec<TrainingRecord>,
    pub pending_feedback: Vec<TrainingRecord>,
}

impl Dataset {
    /// Training corpus order: training, then used, then pending.
    pub fn all_records(&self) -> impl Iterator<Item = &TrainingRecord> {
        self.training
            .iter()
            .chain(self.used_feedback.iter())
            .chain(self.pending_feedback.iter())
    }

    pub fn len(&self) -> usize {
        self.training.len() + self.used_feedback.len() + self.pending_feedback.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// SHA-256 over the serialized snapshot; identifies what a model was
    /// trained on.
    pub fn fingerprint(&self) -> AdvisorResult<String> {
        let bytes = serde_json::to_vec(&DatasetFile::from(self))
            .map_err(|e| AdvisorError::serialization("fingerprinting dataset", e))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[derive(Debug, Serialize)]
struct DatasetFile<'a> {
    schema_version: u32,
    training_data: &'a [TrainingRecord],
    feedback_data: &'a [TrainingRecord],
    pending_feedback: &'a [TrainingRecord],
}

impl<'a> From<&'a Dataset> for DatasetFile<'a> {
    fn from(dataset: &'a Dataset) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            training_data: &dataset.training,
            feedback_data: &dataset.used_feedback,
            pending_feedback: &dataset.pending_feedback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    LegacyList,
    Partitioned,
    Versioned(u32),
}

/// Decide which on-disk layout a parsed document uses.
pub fn detect_schema(document: &Value) -> Result<SchemaVersion, String> {
    match document {
        Value::Array(_) => Ok(SchemaVersion::LegacyList),
        Value::Object(map) => match map.get("schema_version") {
            None => Ok(SchemaVersion::Partitioned),
            Some(v) => match v.as_u64() {
                Some(n) if (1..=SCHEMA_VERSION as u64).contains(&n) => {
                    Ok(SchemaVersion::Versioned(n as u32))
                }
                Some(n) => Err(format!("unsupported schema_version {n}")),
                None => Err("schema_version must be an integer".to_string()),
            },
        },
        _ => Err("dataset must be a JSON array or object".to_string()),
    }
}

/// Lift any supported layout to the current in-memory form.
pub fn upgrade(document: Value) -> Result<Dataset, String> {
    let schema = detect_schema(&document)?;
    match (schema, document) {
        (SchemaVersion::LegacyList, Value::Array(items)) => {
            info!("Upgrading legacy list dataset ({} records)", items.len());
            Ok(Dataset {
                training: records(items, "training_data"),
                ..Dataset::default()
            })
        }
        (_, Value::Object(mut map)) => {
            let mut take = |key: &str| -> Result<Vec<TrainingRecord>, String> {
                match map.remove(key) {
                    None | Some(Value::Null) => Ok(Vec::new()),
                    Some(Value::Array(items)) => Ok(records(items, key)),
                    Some(_) => Err(format!("'{key}' must be an array")),
                }
            };
            Ok(Dataset {
                training: take("training_data")?,
                used_feedback: take("feedback_data")?,
                pending_feedback: take("pending_feedback")?,
            })
        }
        (schema, _) => Err(format!("document does not match detected schema {schema:?}")),
    }
}

fn records(items: Vec<Value>, partition: &str) -> Vec<TrainingRecord> {
    let total = items.len();
    let parsed: Vec<TrainingRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed record {} in {}: {}", i, partition, e);
                None
            }
        })
        .collect();
    if parsed.len() < total {
        warn!(
            "Loaded {} of {} records from {}",
            parsed.len(),
            total,
            partition
        );
    }
    parsed
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionCounts {
    pub training: usize,
    pub used_feedback: usize,
    pub pending_feedback: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingBucket {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub counts: PartitionCounts,
    pub ratings: Option<RatingStats>,
    pub buckets: Vec<RatingBucket>,
    pub positive: usize,
    pub negative: usize,
    pub warnings: Vec<String>,
}

const MIN_RATING_STD: f64 = 0.1;
const MIN_CLASS_EXAMPLES: usize = 5;

impl DatasetReport {
    pub fn build(dataset: &Dataset, positive_threshold: f64) -> Self {
        let counts = PartitionCounts {
            training: dataset.training.len(),
            used_feedback: dataset.used_feedback.len(),
            pending_feedback: dataset.pending_feedback.len(),
        };
        let mut ratings: Vec<f64> = dataset
            .all_records()
            .map(|r| r.rating)
            .filter(|r| r.is_finite())
            .collect();
        ratings.sort_by(|a, b| a.total_cmp(b));

        let bounds = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];
        let buckets = bounds
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let last = i == bounds.len() - 2;
                let count = ratings
                    .iter()
                    .filter(|r| **r >= w[0] && (**r < w[1] || (last && **r <= w[1])))
                    .count();
                let close = if last { ']' } else { ')' };
                RatingBucket {
                    label: format!("[{:.1}, {:.1}{}", w[0], w[1], close),
                    count,
                }
            })
            .collect();

        let positive = ratings.iter().filter(|r| **r >= positive_threshold).count();
        let negative = ratings.len() - positive;

        let stats = rating_stats(&ratings);
        let mut warnings = Vec::new();
        if let Some(stats) = &stats {
            if stats.std_dev < MIN_RATING_STD {
                warnings.push(format!(
                    "low rating variability (std {:.3}); the model has little to separate",
                    stats.std_dev
                ));
            }
        }
        if positive < MIN_CLASS_EXAMPLES || negative < MIN_CLASS_EXAMPLES {
            warnings.push(format!(
                "class imbalance: {positive} positive and {negative} negative examples \
                 (want at least {MIN_CLASS_EXAMPLES} of each)"
            ));
        }

        Self {
            counts,
            ratings: stats,
            buckets,
            positive,
            negative,
            warnings,
        }
    }
}

/// `sorted` must be ascending.
fn rating_stats(sorted: &[f64]) -> Option<RatingStats> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let variance = sorted.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    Some(RatingStats {
        min: sorted[0],
        max: sorted[n - 1],
        mean,
        median,
        std_dev: variance.sqrt(),
    })
}

/// Exclusive advisory lock on a file next to the dataset. Released when
/// dropped, or by the OS if the holding process dies.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    fn open(path: PathBuf) -> AdvisorResult<File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AdvisorError::io("creating dataset directory", e))?;
        }
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| AdvisorError::io(format!("opening lock file {}", path.display()), e))
    }

    /// Block until the lock is held.
    fn acquire(path: PathBuf) -> AdvisorResult<Self> {
        let file = Self::open(path.clone())?;
        file.lock()
            .map_err(|e| AdvisorError::io(format!("locking {}", path.display()), e))?;
        Ok(Self { file, path })
    }

    /// `None` if another holder has it.
    fn try_acquire(path: PathBuf) -> AdvisorResult<Option<Self>> {
        let file = Self::open(path.clone())?;
        match file.try_lock() {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Error(e)) => Err(AdvisorError::io(
                format!("locking {}", path.display()),
                e,
            )),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

pub struct DatasetStore {
    path: PathBuf,
}

impl DatasetStore {
    /// Open the store, creating an empty dataset file if none exists.
    pub fn open<P: AsRef<Path>>(path: P) -> AdvisorResult<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        store.load()?;
        Ok(store)
    }

    pub fn load(&self) -> AdvisorResult<Dataset> {
        let _lock = self.lock()?;
        self.read_or_create()
    }

    /// Claim the training slot for this dataset, across processes.
    /// Fails with `RetrainInProgress` while another run holds it.
    pub fn lock_training(&self) -> AdvisorResult<FileLock> {
        FileLock::try_acquire(self.sibling("train.lock"))?.ok_or(AdvisorError::RetrainInProgress)
    }

    /// Append to `pending_feedback`; returns the new pending count.
    pub fn append_feedback(&self, record: TrainingRecord) -> AdvisorResult<usize> {
        let _lock = self.lock()?;
        let mut dataset = self.read_for_update()?;
        dataset.pending_feedback.push(record);
        self.write(&dataset)?;

        let pending = dataset.pending_feedback.len();
        info!("Feedback recorded; {} pending", pending);
        Ok(pending)
    }

    /// Move every pending record into `feedback_data`.
    pub fn promote_pending(&self) -> AdvisorResult<usize> {
        self.promote_first(usize::MAX)
    }

    /// Move the oldest `count` pending records into `feedback_data`, keeping
    /// anything appended after a training snapshot was taken.
    pub fn promote_first(&self, count: usize) -> AdvisorResult<usize> {
        let _lock = self.lock()?;
        let mut dataset = self.read_for_update()?;

        let available = dataset.pending_feedback.len();
        if count != usize::MAX && count > available {
            warn!(
                "Asked to promote {} pending records but only {} exist",
                count, available
            );
        }
        let moved = count.min(available);
        if moved == 0 {
            return Ok(0);
        }

        let promoted: Vec<TrainingRecord> = dataset.pending_feedback.drain(..moved).collect();
        dataset.used_feedback.extend(promoted);
        self.write(&dataset)?;

        info!(
            "Promoted {} pending records to used feedback ({} still pending)",
            moved,
            dataset.pending_feedback.len()
        );
        Ok(moved)
    }

    pub fn counts(&self) -> AdvisorResult<PartitionCounts> {
        let dataset = self.load()?;
        Ok(PartitionCounts {
            training: dataset.training.len(),
            used_feedback: dataset.used_feedback.len(),
            pending_feedback: dataset.pending_feedback.len(),
        })
    }

    pub fn report(&self, positive_threshold: f64) -> AdvisorResult<DatasetReport> {
        Ok(DatasetReport::build(&self.load()?, positive_threshold))
    }

    fn lock(&self) -> AdvisorResult<FileLock> {
        FileLock::acquire(self.sibling("lock"))
    }

    fn read_or_create(&self) -> AdvisorResult<Dataset> {
        match self.read()? {
            Some(Ok(dataset)) => Ok(dataset),
            Some(Err(message)) => {
                warn!(
                    "{}; continuing with empty partitions",
                    AdvisorError::corrupt_dataset(self.path.display().to_string(), message)
                );
                Ok(Dataset::default())
            }
            None => {
                info!("Creating empty dataset at {}", self.path.display());
                let dataset = Dataset::default();
                self.write(&dataset)?;
                Ok(dataset)
            }
        }
    }

    /// Like `read_or_create`, but a corrupt file is moved aside before the
    /// caller overwrites it.
    fn read_for_update(&self) -> AdvisorResult<Dataset> {
        match self.read()? {
            Some(Ok(dataset)) => Ok(dataset),
            Some(Err(message)) => {
                let stamp = Utc::now().format("%Y%m%dT%H%M%S");
                let backup = self.sibling(&format!("corrupt-{stamp}"));
                warn!(
                    "{}; moving it to {} and starting fresh",
                    AdvisorError::corrupt_dataset(self.path.display().to_string(), message),
                    backup.display()
                );
                fs::rename(&self.path, &backup)
                    .map_err(|e| AdvisorError::io("preserving corrupt dataset", e))?;
                Ok(Dataset::default())
            }
            None => Ok(Dataset::default()),
        }
    }

    /// `None` when the file is absent; `Some(Err)` when it cannot be parsed.
    fn read(&self) -> AdvisorResult<Option<Result<Dataset, String>>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AdvisorError::io(format!("reading {}", self.path.display()), e)),
        };
        if contents.trim().is_empty() {
            return Ok(Some(Err("file is empty".to_string())));
        }

        let parsed = serde_json::from_str::<Value>(&contents)
            .map_err(|e| e.to_string())
            .and_then(upgrade);
        if let Ok(dataset) = &parsed {
            debug!(
                "Loaded dataset: {} training, {} used, {} pending",
                dataset.training.len(),
                dataset.used_feedback.len(),
                dataset.pending_feedback.len()
            );
        }
        Ok(Some(parsed))
    }

    fn write(&self, dataset: &Dataset) -> AdvisorResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AdvisorError::io("creating dataset directory", e))?;
        }

        let bytes = serde_json::to_vec_pretty(&DatasetFile::from(dataset))
            .map_err(|e| AdvisorError::serialization("encoding dataset", e))?;
        let tmp = self.sibling("tmp");
        fs::write(&tmp, bytes).map_err(|e| AdvisorError::io("writing dataset temp file", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| AdvisorError::io("replacing dataset file", e))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{suffix}"));
        self.path.with_file_name(name)
    }
}

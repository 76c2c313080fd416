//! Error handling for the style advisor
//!
//! One crate-wide error enum covers input validation, dataset lifecycle,
//! retrain gating and the predictor backend. Conditions that are recovered
//! locally (corrupt dataset, unreadable model artifact) still have variants
//! so they can be logged and reported uniformly.

use thiserror::Error;

/// Main error type for the style advisor
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Invalid design input: {message}")]
    Input { message: String },

    #[error("Not enough pending feedback to retrain: have {pending}, need at least {required}")]
    InsufficientFeedback { pending: usize, required: usize },

    #[error("Dataset file is corrupt: {path} - {message}")]
    CorruptDataset { path: String, message: String },

    #[error("Model artifact could not be loaded: {path} - {message}")]
    ModelLoad { path: String, message: String },

    #[error("Too few usable examples to train: have {usable}, need at least {required}")]
    DegenerateDataset { usable: usize, required: usize },

    #[error("A training run is already in progress")]
    RetrainInProgress,

    #[error("Model operation failed: {operation} - {message}")]
    Model { operation: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Mutex lock failed: {resource}")]
    MutexPoisoned { resource: String },
}

/// Type alias for Result with AdvisorError
pub type AdvisorResult<T> = Result<T, AdvisorError>;

impl AdvisorError {
    /// Create an input validation error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Create a retrain gate refusal
    pub fn insufficient_feedback(pending: usize, required: usize) -> Self {
        Self::InsufficientFeedback { pending, required }
    }

    pub fn corrupt_dataset(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CorruptDataset {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn model_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a degenerate dataset error
    pub fn degenerate_dataset(usable: usize, required: usize) -> Self {
        Self::DegenerateDataset { usable, required }
    }

    /// Create a predictor backend error
    pub fn model(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Pending feedback count carried by a gate refusal, if this is one.
    pub fn pending_count(&self) -> Option<usize> {
        match self {
            Self::InsufficientFeedback { pending, .. } => Some(*pending),
            _ => None,
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFeedback { .. } | Self::RetrainInProgress
        )
    }
}

/// Helper trait for safe mutex operations
///
/// Returns `MutexPoisoned` instead of panicking when a previous holder
/// panicked while holding the lock.
pub trait SafeLock<T: ?Sized> {
    fn safe_lock(&self, resource: &str) -> AdvisorResult<std::sync::MutexGuard<'_, T>>;
}

impl<T: ?Sized> SafeLock<T> for std::sync::Mutex<T> {
    fn safe_lock(&self, resource: &str) -> AdvisorResult<std::sync::MutexGuard<'_, T>> {
        self.lock().map_err(|_| AdvisorError::MutexPoisoned {
            resource: resource.to_string(),
        })
    }
}

/// Convert from serde_json errors
impl From<serde_json::Error> for AdvisorError {
    fn from(err: serde_json::Error) -> Self {
        AdvisorError::serialization("json_operation", err)
    }
}

/// Convert from std::io errors
impl From<std::io::Error> for AdvisorError {
    fn from(err: std::io::Error) -> Self {
        AdvisorError::io("io_operation", err)
    }
}

/// Convert from candle errors
impl From<candle_core::Error> for AdvisorError {
    fn from(err: candle_core::Error) -> Self {
        AdvisorError::model("candle_operation", err.to_string())
    }
}

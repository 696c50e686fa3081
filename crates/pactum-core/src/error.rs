//! Error types for pactum operations.
//!
//! Every variant carries a stable [`ErrorCode`] so that callers (and the REST
//! layer) can react programmatically without matching on message text.

use pactum_extractors::IngestError;
use thiserror::Error;

use crate::types::JobStatus;

/// Result type alias for pactum operations.
pub type PactumResult<T> = Result<T, PactumError>;

/// Main error type for all pactum operations.
#[derive(Error, Debug)]
pub enum PactumError {
    /// The uploaded document could not be turned into a `RawDocument`.
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    /// A single extraction strategy failed. Recovered by the orchestrator.
    #[error("Strategy '{strategy}' failed: {message}")]
    Strategy {
        strategy: String,
        message: String,
        code: ErrorCode,
    },

    /// A candidate field could not be consolidated.
    #[error("Consolidation error: {message}")]
    Consolidation { message: String, code: ErrorCode },

    /// Job or record storage failed.
    #[error("Persistence error: {message}")]
    Persistence {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A job lifecycle transition was refused.
    #[error("Invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// Job not found.
    #[error("Job not found: {job_id}")]
    NotFound { job_id: String, code: ErrorCode },

    /// Result requested for a job that has not finished yet.
    #[error("Job {job_id} is not ready (status: {status})")]
    NotReady { job_id: String, status: JobStatus },

    /// Result requested for a job that failed.
    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        suggestion: Option<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A shared model could not be loaded or invoked.
    #[error("Model error: {message}")]
    Model { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Ingestion (ING_xxx)
    IngUnsupportedType,
    IngUnreadable,
    IngEmptyContent,

    // Strategy (STR_xxx)
    StrFailed,
    StrTimeout,
    StrPanicked,

    // Consolidation (CON_xxx)
    ConMalformedCandidate,

    // Persistence (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,
    DbCorrupted,

    // Job lifecycle (JOB_xxx)
    JobInvalidTransition,
    JobNotFound,
    JobNotReady,
    JobFailed,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValUnsupportedType,
    ValEmptyUpload,

    // Configuration (CFG_xxx)
    CfgInvalid,

    // Models (MDL_xxx)
    MdlLoadFailed,
    MdlInferenceFailed,

    // Serialization (PARSE_xxx)
    ParseInvalidJson,

    // IO
    Io,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IngUnsupportedType => "ING_001",
            ErrorCode::IngUnreadable => "ING_002",
            ErrorCode::IngEmptyContent => "ING_003",
            ErrorCode::StrFailed => "STR_001",
            ErrorCode::StrTimeout => "STR_002",
            ErrorCode::StrPanicked => "STR_003",
            ErrorCode::ConMalformedCandidate => "CON_001",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::DbCorrupted => "DB_003",
            ErrorCode::JobInvalidTransition => "JOB_001",
            ErrorCode::JobNotFound => "JOB_002",
            ErrorCode::JobNotReady => "JOB_003",
            ErrorCode::JobFailed => "JOB_004",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValUnsupportedType => "VAL_002",
            ErrorCode::ValEmptyUpload => "VAL_003",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::MdlLoadFailed => "MDL_001",
            ErrorCode::MdlInferenceFailed => "MDL_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::Io => "IO_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl PactumError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create an error for an upload without content.
    pub fn empty_upload() -> Self {
        Self::Validation {
            message: "Uploaded file is empty".to_string(),
            code: ErrorCode::ValEmptyUpload,
            suggestion: Some("Attach a non-empty PDF or plain-text contract".to_string()),
        }
    }

    /// Create an error for an upload whose content type is not accepted.
    pub fn unsupported_type(content_type: impl Into<String>) -> Self {
        Self::Validation {
            message: format!("Unsupported content type: {}", content_type.into()),
            code: ErrorCode::ValUnsupportedType,
            suggestion: Some("Upload a PDF or plain-text contract".to_string()),
        }
    }

    /// Create a not found error.
    pub fn not_found(job_id: impl Into<String>) -> Self {
        Self::NotFound {
            job_id: job_id.into(),
            code: ErrorCode::JobNotFound,
        }
    }

    /// Create a strategy failure.
    pub fn strategy(strategy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Strategy {
            strategy: strategy.into(),
            message: message.into(),
            code: ErrorCode::StrFailed,
        }
    }

    /// Create a strategy timeout.
    pub fn strategy_timeout(strategy: impl Into<String>, secs: u64) -> Self {
        Self::Strategy {
            strategy: strategy.into(),
            message: format!("timed out after {}s", secs),
            code: ErrorCode::StrTimeout,
        }
    }

    /// Create an error for a strategy task that panicked.
    pub fn strategy_panicked(strategy: impl Into<String>) -> Self {
        Self::Strategy {
            strategy: strategy.into(),
            message: "task panicked".to_string(),
            code: ErrorCode::StrPanicked,
        }
    }

    /// Create a consolidation error.
    pub fn consolidation(message: impl Into<String>) -> Self {
        Self::Consolidation {
            message: message.into(),
            code: ErrorCode::ConMalformedCandidate,
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create a model error.
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
            code: ErrorCode::MdlInferenceFailed,
        }
    }

    /// Create a model loading error.
    pub fn model_load(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
            code: ErrorCode::MdlLoadFailed,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Ingest(e) => match e {
                IngestError::UnsupportedType(_) => ErrorCode::IngUnsupportedType,
                IngestError::EmptyContent => ErrorCode::IngEmptyContent,
                _ => ErrorCode::IngUnreadable,
            },
            Self::Strategy { code, .. } => *code,
            Self::Consolidation { code, .. } => *code,
            Self::Persistence { code, .. } => *code,
            Self::InvalidTransition { .. } => ErrorCode::JobInvalidTransition,
            Self::NotFound { code, .. } => *code,
            Self::NotReady { .. } => ErrorCode::JobNotReady,
            Self::JobFailed { .. } => ErrorCode::JobFailed,
            Self::Validation { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            Self::Model { code, .. } => *code,
            Self::Io(_) => ErrorCode::Io,
            Self::Serialization(_) => ErrorCode::ParseInvalidJson,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::NotFound { .. } => Some("Please check the job ID and ensure it exists"),
            Self::NotReady { .. } => Some("Poll the job status until it is completed"),
            Self::JobFailed { .. } => Some("Resubmit the contract to start a new job"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Ingest(IngestError::EmptyContent) => {
                Some("The document has no text layer; scanned images are not supported")
            }
            Self::Model { .. } => Some("Please check the models configuration"),
            _ => None,
        }
    }

    /// Short message stored on a failed job.
    ///
    /// Keeps the human-readable part and drops nested source chains.
    pub fn job_message(&self) -> String {
        match self {
            Self::Ingest(e) => format!("Document could not be processed: {}", e),
            Self::Persistence { message, .. } => format!("Failed to save results: {}", message),
            other => other.to_string(),
        }
    }
}

impl From<rusqlite::Error> for PactumError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Persistence {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

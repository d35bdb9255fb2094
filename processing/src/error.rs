use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncoderError {
    #[error("unknown category '{category}' for {encoder} encoder")]
    UnknownCategory { encoder: String, category: String },

    #[error("invalid code {code} for {encoder} encoder with {len} categories")]
    InvalidCode { encoder: String, code: u32, len: usize },

    #[error("cannot fit {encoder} encoder on an empty category list")]
    EmptyFit { encoder: String },

    #[error("duplicate category '{category}' in persisted {encoder} encoder")]
    DuplicateCategory { encoder: String, category: String },

    #[error("expected the {expected} encoder, found {found}")]
    NameMismatch { expected: String, found: String },

    #[error("{encoder} encoder has {found} categories, manifest records {expected}")]
    CategoryCountMismatch { encoder: String, expected: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("ride distance must be a finite non-negative number, got {0}")]
    InvalidDistance(f64),

    #[error("booking hour must be in 0..=23, got {0}")]
    HourOutOfRange(i64),

    #[error("ride distance '{0}' is not a number")]
    UnparsableDistance(String),

    #[error("booking hour '{0}' is not an integer")]
    UnparsableHour(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("cannot train on an empty dataset")]
    EmptyTrainingSet,

    #[error("feature rows ({features}) and labels ({labels}) differ in length")]
    LengthMismatch { features: usize, labels: usize },

    #[error("label {0} is not a binary label")]
    InvalidLabel(u8),

    #[error("invalid model parameters: {0}")]
    InvalidParams(String),

    #[error("cannot evaluate on an empty dataset")]
    EmptyEvaluationSet,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset is missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("dataset has unexpected columns: {0:?}")]
    UnexpectedColumns(Vec<String>),

    #[error("dataset contains no rows")]
    Empty,

    #[error("invalid row at line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize artifact {path}: {source}")]
    Serde {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no published artifact set under {0}")]
    MissingPointer(String),

    #[error("artifact blob {0} is missing")]
    MissingBlob(String),

    #[error("artifact {blob} has version {found}, expected {expected}")]
    VersionMismatch {
        blob: String,
        expected: String,
        found: String,
    },

    #[error("artifact {blob} is inconsistent: {source}")]
    InvalidEncoder {
        blob: String,
        #[source]
        source: EncoderError,
    },

    #[error("artifact {0} holds a malformed model")]
    InvalidModel(String),
}

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("dataset of {rows} rows is too small to split with test fraction {test_fraction}")]
    SplitTooSmall { rows: usize, test_fraction: f64 },

    #[error("holdout accuracy {accuracy:.4} is below the required minimum {min_accuracy:.4}")]
    AccuracyBelowThreshold { accuracy: f64, min_accuracy: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("encoding failed after category resolution: {0}")]
    Encoding(#[from] EncoderError),
}

#[derive(Debug, Error)]
pub enum CleaningError {
    #[error("cleaning io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("raw dataset is missing required columns: {0:?}")]
    MissingColumns(Vec<String>),
}

use respack_api::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RespackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("Glob error: {0}")]
    Glob(#[from] globset::Error),
    #[error("Class file error: {0}")]
    ClassFile(#[from] ristretto_classfile::Error),
    #[error("Manifest error in {path}: {message}")]
    Manifest { path: String, message: String },
    #[error("Failed to {phase}: {}", .failures.join("; "))]
    Load {
        phase: &'static str,
        failures: Vec<String>,
    },
    #[error(
        "Unrecognized splits: requested {unmatched_requested:?} were not produced, \
         produced {unmatched_produced:?} were not requested"
    )]
    UnrecognizedSplits {
        unmatched_requested: Vec<String>,
        unmatched_produced: Vec<String>,
    },
    #[error("Worker pool error: {0}")]
    Pool(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RespackError {
    pub fn manifest(path: &std::path::Path, message: impl ToString) -> Self {
        RespackError::Manifest {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RespackError>;

pub mod artifacts;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod kubernetes;
pub mod metrics;
pub mod notify;
pub mod remediation;
pub mod server;
pub mod sources;

use thiserror::Error;

pub use artifacts::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] kube::Error),
    #[error("Lookup error: {0}")]
    Lookup(String),
    #[error("Capture command error: {0}")]
    CaptureCommand(String),
    #[error("Upload failed after {attempts} attempts")]
    UploadExhausted { attempts: u32 },
    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),
    #[error("Remediation error: {0}")]
    Remediation(String),
    #[error("Notification error: {0}")]
    Notification(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

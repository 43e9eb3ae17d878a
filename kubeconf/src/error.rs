use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] IoError),
    #[error("Reading {path}: {source}")]
    Read { path: PathBuf, source: IoError },
    #[error("Writing {path}: {source}")]
    Write { path: PathBuf, source: IoError },
    #[error("Yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Home directory could not be determined")]
    NoHomeDir,

    #[error("No active Kubernetes context")]
    NoCurrentContext,
    #[error("Context {0:?} not found")]
    UnknownContext(String),
    #[error("Only one context ({0}) - nothing deleted - delete the whole file")]
    LastContext(String),

    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("Watching certificate signing request failed: {0}")]
    Watch(#[from] kube::runtime::wait::Error),
    #[error("OpenSSL error: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),
    #[error("Expiration of {0} days is out of range (1..={max})", max = crate::csr::MAX_DAYS)]
    InvalidExpiry(u32),
    #[error("Certificate signing request {name} was {condition}: {reason}")]
    CertificateRejected {
        name: String,
        condition: String,
        reason: String,
    },
    #[error("Timed out after {secs}s waiting for certificate signing request {name}")]
    Timeout { name: String, secs: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid version: {0}")]
    Version(#[from] semver::Error),
    #[error("Release repository must look like owner/repo, got {0:?}")]
    InvalidRepo(String),
    #[error("can not update - {0} is write protected")]
    WriteProtected(PathBuf),
    #[error("Replacing executable failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

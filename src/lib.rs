//! Drag - content-addressed image sync for compose projects
//!
//! Every buildable service gets an image tag derived from the git tree hash
//! of its build context. `drag sync` pulls that image when the registry
//! already has it, and builds (and optionally pushes) it otherwise.

pub mod cli;
pub mod engine;
pub mod image;
pub mod project;
pub mod sync;

use thiserror::Error;

/// Main error type for Drag operations
#[derive(Error, Debug)]
pub enum DragError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No such service: {0}")]
    NoSuchService(String),

    #[error("Invalid image reference: {0}")]
    InvalidImageRef(String),

    #[error("Could not get subtree hash of {path}")]
    HashUnavailable { path: String },

    #[error("Could not fetch tags for {repository} repository: {reason}")]
    RegistryQueryFailed { repository: String, reason: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Pull of {image} failed: {reason}")]
    PullFailed { image: String, reason: String },

    #[error("Service '{service}' failed to build: {reason}")]
    BuildFailed { service: String, reason: String },

    #[error("Push of {image} failed: {reason}")]
    PushFailed { image: String, reason: String },

    #[error("Tagging {source_image} as {target} failed: {reason}")]
    TagFailed {
        source_image: String,
        target: String,
        reason: String,
    },

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("{0}")]
    SyncFailure(String),
}

pub type Result<T> = std::result::Result<T, DragError>;

// ABOUTME: Application-wide error types for refit.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;

use thiserror::Error;

use crate::runtime::ClientError;
use crate::update::UpdateError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("runtime client error: {0}")]
    Client(#[from] ClientError),

    #[error("update pass failed: {0}")]
    Update(#[from] UpdateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// ABOUTME: Validated container name newtype following runtime naming rules.
// ABOUTME: First character alphanumeric, then alphanumeric plus _ . - up to 255 chars.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerNameError {
    #[error("container name cannot be empty")]
    Empty,

    #[error("container name exceeds maximum length of 255 characters")]
    TooLong,

    #[error("container name must start with an alphanumeric character")]
    InvalidStart,

    #[error("invalid character in container name: '{0}'")]
    InvalidChar(char),
}

/// A container name as the runtime reports it, without the leading slash.
///
/// Names are unique across the local runtime, which is what makes them
/// usable as dependency-link targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerName(String);

impl ContainerName {
    pub fn new(value: &str) -> Result<Self, ContainerNameError> {
        if value.is_empty() {
            return Err(ContainerNameError::Empty);
        }

        if value.len() > 255 {
            return Err(ContainerNameError::TooLong);
        }

        let mut chars = value.chars();
        let first = chars.next().expect("non-empty string has a first char");
        if !first.is_ascii_alphanumeric() {
            return Err(ContainerNameError::InvalidStart);
        }

        for c in chars {
            if !c.is_ascii_alphanumeric() && c != '_' && c != '.' && c != '-' {
                return Err(ContainerNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

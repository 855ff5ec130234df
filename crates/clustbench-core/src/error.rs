// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors raised by the benchmark core and by clustering capabilities.
///
/// `Configuration` and `DataShape` are fatal and surface before any clustering
/// attempt runs. `NumericalIssue` and `InvalidInput` returned from a
/// [`Clusterer`](crate::Clusterer) are absorbed by the runners as failed
/// attempts.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BenchError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("data shape error: {0}")]
    DataShape(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("cancelled")]
    Cancelled,
}

impl BenchError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn data_shape(msg: impl Into<String>) -> Self {
        Self::DataShape(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    pub fn cancelled() -> Self {
        Self::Cancelled
    }

    /// Stable machine-readable code for structured error output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::DataShape(_) => "data_shape_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
            Self::NotSupported(_) => "not_supported",
            Self::Cancelled => "cancelled",
        }
    }

    /// True for errors that must abort a run before any output is written.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::DataShape(_) | Self::Cancelled
        )
    }
}

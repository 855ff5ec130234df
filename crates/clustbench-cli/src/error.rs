// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use clustbench_core::BenchError;
use std::fmt;

/// Errors surfaced by the command-line runner.
#[derive(Debug)]
pub enum CliError {
    Bench(BenchError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    /// Rejected command line.
    Usage(String),
}

impl CliError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Bench(err) => err.code(),
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
            Self::Usage(_) => "configuration_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bench(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::Usage(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bench(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Usage(_) => None,
        }
    }
}

impl From<BenchError> for CliError {
    fn from(value: BenchError) -> Self {
        Self::Bench(value)
    }
}

#[cfg(test)]
mod tests {
    use super::CliError;
    use clustbench_core::BenchError;
    use std::error::Error;

    #[test]
    fn codes_delegate_to_the_core_error() {
        let err = CliError::from(BenchError::configuration("unknown algorithm family 'x'"));
        assert_eq!(err.code(), "configuration_error");
        assert!(err.source().is_some());

        let err = CliError::from(BenchError::data_shape("ragged"));
        assert_eq!(err.code(), "data_shape_error");
    }

    #[test]
    fn io_errors_keep_their_context() {
        let err = CliError::io(
            "failed to read /tmp/missing.gz",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.code(), "io_error");
        assert_eq!(err.to_string(), "failed to read /tmp/missing.gz: no such file");
        assert_eq!(CliError::usage("--method is required").code(), "configuration_error");
    }
}

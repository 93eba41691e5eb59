use std::path::PathBuf;
use thiserror::Error;

/// Failure categories of an export generation run.
///
/// These travel inside `anyhow::Error`; use `downcast_ref::<GenerateError>()`
/// to tell them apart.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Invalid options, malformed mappings JSON
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing packages directory or unknown package
    #[error("{0}")]
    Discovery(String),

    /// Missing or structurally invalid package.json
    #[error("Invalid package.json at {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("Failed to scan package at {}", .0.display())]
    Scan(PathBuf),

    /// Generated exports map without "." or with a malformed entry
    #[error("Generated exports validation failed for {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = GenerateError::Manifest {
            path: PathBuf::from("pkg/package.json"),
            reason: "missing name or version".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid package.json at pkg/package.json: missing name or version");
        assert_eq!(
            GenerateError::Validation("@scope/a".to_string()).to_string(),
            "Generated exports validation failed for @scope/a"
        );
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = GenerateError::Config("bad".to_string()).into();
        let err = err.context("while generating");
        assert!(matches!(err.downcast_ref::<GenerateError>(), Some(GenerateError::Config(_))));
    }
}

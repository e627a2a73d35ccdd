//! Error types for schema resolution and field composition.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while turning an abstract schema fragment into a concrete one,
/// or while loading the documents a form is built from.
#[derive(Debug, Error)]
pub enum ResolveError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Schema errors (exit code 2)
    #[error("could not find a definition for {reference}")]
    UnresolvedReference { reference: String },

    #[error("circular reference through {reference}")]
    CircularReference { reference: String },

    #[error("invalid error schema at {path}: expected {expected}, got {actual}")]
    InvalidErrorSchema {
        path: String,
        expected: &'static str,
        actual: String,
    },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileNotFound { .. } | ResolveError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors that abort the composition of a subtree.
///
/// Unknown field types are not errors: they render as a placeholder.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("schema nesting at {id} exceeds the limit of {limit} levels")]
    DepthExceeded { id: String, limit: usize },

    #[error("field {name} failed: {message}")]
    Field { name: String, message: String },
}

impl RenderError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RenderError::Resolve(e) => e.exit_code(),
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_error_exit_codes() {
        let err = ResolveError::FileNotFound {
            path: PathBuf::from("schema.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = ResolveError::UnresolvedReference {
            reference: "#/definitions/address".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn render_error_inherits_resolve_exit_code() {
        let err = RenderError::from(ResolveError::FileNotFound {
            path: PathBuf::from("ui.json"),
        });
        assert_eq!(err.exit_code(), 3);

        let err = RenderError::DepthExceeded {
            id: "root_a_b".into(),
            limit: 2,
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unresolved_reference_display() {
        let err = ResolveError::UnresolvedReference {
            reference: "#/definitions/missing".into(),
        };
        assert_eq!(
            err.to_string(),
            "could not find a definition for #/definitions/missing"
        );
    }
}

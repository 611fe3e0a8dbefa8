use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, aligning or querying jet fields.
#[derive(Debug, Error)]
pub enum FieldError {
    /// Caller input outside its domain (case id, phase, amplitude, window).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Catalog lookup for a case id outside `[1, case_count]`.
    #[error("case {case_id} not found (valid cases are 1..={case_count})")]
    NotFound { case_id: i64, case_count: usize },

    /// Expected on-disk record missing or malformed.
    #[error("storage error at '{}': {reason}", path.display())]
    Storage { path: PathBuf, reason: String },

    /// Query or interpolation outside the loaded data's domain.
    #[error("value {value} outside the covered range [{min}, {max}]")]
    Range { value: f64, min: f64, max: f64 },

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl FieldError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        FieldError::InvalidArgument(msg.into())
    }

    pub fn storage(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        FieldError::Storage {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// I/O and parse failures are storage failures from the caller's point of view.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            FieldError::Storage { .. } | FieldError::Io { .. } | FieldError::Parse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_and_parse_count_as_storage() {
        let io = FieldError::Io {
            path: "info.dat".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let parse = FieldError::Parse {
            path: "Mach.dat".into(),
            line: 3,
            reason: "expected 2 columns".into(),
        };
        assert!(io.is_storage());
        assert!(parse.is_storage());
        assert!(!FieldError::invalid("bad").is_storage());
        assert_eq!(parse.to_string(), "Mach.dat:3: expected 2 columns");
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for cuttlefish operations
#[derive(Error, Debug)]
pub enum CuttlefishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{file}: line {line}: malformed record: {message}")]
    Parse {
        file: PathBuf,
        line: u64,
        message: String,
    },

    #[error("truncated varbyte codeword at byte {offset}")]
    TruncatedCodeword { offset: usize },

    #[error("varbyte codeword exceeds 32 bits at byte {offset}")]
    CodewordOverflow { offset: usize },

    #[error("corrupt run {file}: {message}")]
    CorruptRun { file: PathBuf, message: String },

    #[error("corrupt index: {0}")]
    CorruptIndex(String),
}

/// Result type alias for cuttlefish operations
pub type Result<T> = std::result::Result<T, CuttlefishError>;

impl CuttlefishError {
    /// Check if this error indicates on-disk corruption rather than an
    /// environmental (I/O) failure
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            CuttlefishError::Parse { .. }
                | CuttlefishError::TruncatedCodeword { .. }
                | CuttlefishError::CodewordOverflow { .. }
                | CuttlefishError::CorruptRun { .. }
                | CuttlefishError::CorruptIndex(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CuttlefishError::TruncatedCodeword { offset: 17 };
        assert_eq!(err.to_string(), "truncated varbyte codeword at byte 17");

        let err = CuttlefishError::CorruptIndex("lexicon offset 9 is not a block boundary".into());
        assert_eq!(
            err.to_string(),
            "corrupt index: lexicon offset 9 is not a block boundary"
        );
    }

    #[test]
    fn test_corruption_classification() {
        assert!(CuttlefishError::TruncatedCodeword { offset: 0 }.is_corruption());
        assert!(CuttlefishError::CorruptIndex("x".into()).is_corruption());
        // A malformed sidecar line is on-disk corruption too
        assert!(CuttlefishError::Parse {
            file: PathBuf::from("lexicon.txt"),
            line: 2,
            message: "bad offset".into(),
        }
        .is_corruption());
        let io = CuttlefishError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!io.is_corruption());
    }
}

//! Error types for LUMA

use thiserror::Error;

/// Core LUMA errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LumaError {
    // Memory errors
    #[error("Guest memory exhausted: requested {requested} bytes, {available} bytes left to grow")]
    OutOfMemory { requested: usize, available: usize },

    #[error("Invalid guest range: address {address:#x}, length {length}")]
    InvalidRange { address: u32, length: u32 },

    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Invalid frame geometry: {width}x{height} needs {expected} bytes, got {actual}")]
    InvalidGeometry {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    // Capability errors
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Invalid parameter for {filter}: {value}")]
    InvalidParameter { filter: String, value: String },

    #[error("Guest export missing: {0}")]
    MissingExport(&'static str),

    // Source errors
    #[error("Frame source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Display sink error: {0}")]
    DisplayError(String),

    // Loop errors
    #[error("Capture loop already running")]
    AlreadyRunning,

    #[error("Capture loop not running")]
    NotRunning,
}

impl LumaError {
    /// Errors that abort the current pipeline run.
    ///
    /// Exhaustion is final because the growable-memory ceiling is fixed when
    /// the guest is instantiated. An out-of-range access is a guest trap.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LumaError::OutOfMemory { .. } | LumaError::InvalidRange { .. }
        )
    }

    /// Errors the pipeline reports and then keeps serving other requests.
    pub fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }
}

/// Result type for LUMA operations
pub type LumaResult<T> = Result<T, LumaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let oom = LumaError::OutOfMemory {
            requested: 1 << 20,
            available: 0,
        };
        assert!(oom.is_fatal());
        assert!(!oom.is_recoverable());

        assert!(LumaError::UnsupportedFilter("emboss".into()).is_recoverable());
        assert!(LumaError::MissingExport("blur").is_recoverable());
        assert!(LumaError::SourceUnavailable("no camera".into()).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = LumaError::UnsupportedFilter("emboss".into());
        assert_eq!(err.to_string(), "Unsupported filter: emboss");
    }
}

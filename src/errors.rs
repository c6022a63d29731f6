// Error taxonomy for the redaction pipeline
// Every boundary failure maps to one stable code; the pipeline fails closed

use thiserror::Error;

/// Errors surfaced at the `redact` boundary
#[derive(Debug, Error)]
pub enum RedactionError {
    #[error("POLICY_LOAD_ERROR: {0}")]
    PolicyLoad(String),

    #[error("POLICY_VALIDATION_ERROR: {0}")]
    PolicyValidation(String),

    #[error("INPUT_TOO_LARGE: input is {actual} bytes, limit is {limit} bytes")]
    InputTooLarge { actual: usize, limit: usize },

    #[error("INPUT_INVALID: {0}")]
    InputInvalid(String),

    #[error("CONTEXT_INVALID: {0}")]
    ContextInvalid(String),

    #[error("DETECTOR_ERROR: {0}")]
    Detector(#[from] DetectorError),

    #[error("PLUGIN_TIMEOUT: plugin '{plugin}' exceeded {timeout_ms} ms in {hook}")]
    PluginTimeout {
        plugin: String,
        hook: String,
        timeout_ms: u64,
    },

    #[error("PLUGIN_ERROR: plugin '{plugin}' failed in {hook}: {message}")]
    Plugin {
        plugin: String,
        hook: String,
        message: String,
    },

    #[error("INTERNAL_ERROR: Redaction failed: {0}. Request blocked for security.")]
    Internal(String),
}

impl RedactionError {
    /// Stable error code for logs and API surfaces
    pub fn code(&self) -> &'static str {
        match self {
            RedactionError::PolicyLoad(_) => "POLICY_LOAD_ERROR",
            RedactionError::PolicyValidation(_) => "POLICY_VALIDATION_ERROR",
            RedactionError::InputTooLarge { .. } => "INPUT_TOO_LARGE",
            RedactionError::InputInvalid(_) => "INPUT_INVALID",
            RedactionError::ContextInvalid(_) => "CONTEXT_INVALID",
            RedactionError::Detector(_) => "DETECTOR_ERROR",
            RedactionError::PluginTimeout { .. } => "PLUGIN_TIMEOUT",
            RedactionError::Plugin { .. } => "PLUGIN_ERROR",
            RedactionError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Failure inside a single detector; isolated by the orchestrator so one
/// broken detector never aborts the request.
#[derive(Debug, Error)]
#[error("detector '{detector}' failed: {message}")]
pub struct DetectorError {
    pub detector: String,
    pub message: String,
}

impl DetectorError {
    pub fn new(detector: impl Into<String>, message: impl Into<String>) -> Self {
        DetectorError {
            detector: detector.into(),
            message: message.into(),
        }
    }
}

/// Errors from dictionary and bloom-filter loading
#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("INVALID_BLOOM_FILTER: {0}")]
    InvalidBloomFilter(String),

    #[error("dictionary io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dictionary metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let e = RedactionError::InputTooLarge {
            actual: 500_001,
            limit: 500_000,
        };
        assert_eq!(e.code(), "INPUT_TOO_LARGE");
        assert!(e.to_string().contains("500001"));
        assert!(e.to_string().contains("500000"));
    }

    #[test]
    fn test_internal_error_message_shape() {
        let e = RedactionError::Internal("detector panic".to_string());
        assert_eq!(
            e.to_string(),
            "INTERNAL_ERROR: Redaction failed: detector panic. Request blocked for security."
        );
    }

    #[test]
    fn test_detector_error_converts() {
        let d = DetectorError::new("ssn", "bad pattern");
        let e: RedactionError = d.into();
        assert_eq!(e.code(), "DETECTOR_ERROR");
    }
}

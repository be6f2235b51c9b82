//! Error types for rarexsec

use thiserror::Error;

/// rarexsec error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or incomplete manifest entry (unknown kind or slice, empty
    /// file list, slice on a non-MC sample).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A required column is absent or has the wrong shape, or a derived
    /// column could not be declared.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The event source could not supply columns for a sample.
    #[error("Event source error: {0}")]
    Source(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_category() {
        let e = Error::Configuration("numi/run1/sample#0: unknown kind 'foo'".into());
        assert_eq!(e.to_string(), "Configuration error: numi/run1/sample#0: unknown kind 'foo'");

        let e = Error::Schema("missing column: 'nu_pdg'".into());
        assert!(e.to_string().starts_with("Schema error"));
    }

    #[test]
    fn json_errors_convert() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: Error = err.into();
        assert!(matches!(e, Error::Json(_)));
    }
}

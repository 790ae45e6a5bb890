//! Error types for Erlay operations.
//!
//! Layout itself is total over well-formed input: unknown relationship
//! endpoints are skipped and cycles are resolved, never reported. The
//! [`ErlayError`] variants cover input that is not well-formed and invalid
//! configuration. Loading inputs from disk is left to front ends.

use thiserror::Error;

/// The main error type for Erlay operations.
#[derive(Debug, Error)]
pub enum ErlayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Duplicate entity name: {0}")]
    DuplicateEntity(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_value() {
        assert_eq!(
            ErlayError::DuplicateEntity("users".to_string()).to_string(),
            "Duplicate entity name: users"
        );
        assert_eq!(
            ErlayError::Config("entity_width must be positive".to_string()).to_string(),
            "Configuration error: entity_width must be positive"
        );
    }
}

//! Error types for the copy engine and its configuration

/// Deep-copy errors
///
/// Both variants are fatal: a copy that hits one is aborted and no partial
/// result is handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CopyError {
    /// A value whose runtime type has no place in the closed category set
    #[error("Cannot copy a value of type `{type_name}`: no copy category exists for it")]
    UnsupportedCategory {
        /// Name of the offending runtime type
        type_name: String,
    },

    /// Internal contract broken (bad field index, stale handle, wrong object kind, ...)
    #[error("Contract violation: {0}")]
    ContractViolation(String),
}

impl CopyError {
    /// Shorthand for an unsupported runtime type
    pub fn unsupported(type_name: impl Into<String>) -> Self {
        CopyError::UnsupportedCategory {
            type_name: type_name.into(),
        }
    }

    /// Shorthand for a contract violation
    pub fn contract(message: impl Into<String>) -> Self {
        CopyError::ContractViolation(message.into())
    }
}

/// Deep-copy result
pub type CopyResult<T> = Result<T, CopyError>;

/// Errors raised while loading [`EngineOptions`](crate::config::EngineOptions)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid TOML or does not match the options schema
    #[error("Invalid options document: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed but holds a value the engine cannot use
    #[error("Invalid option `{key}`: {reason}")]
    InvalidValue {
        /// Dotted option key
        key: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_message_names_type() {
        let err = CopyError::unsupported("Socket");
        assert_eq!(
            err.to_string(),
            "Cannot copy a value of type `Socket`: no copy category exists for it"
        );
    }

    #[test]
    fn test_contract_message() {
        let err = CopyError::contract("field index 3 out of bounds");
        assert_eq!(err.to_string(), "Contract violation: field index 3 out of bounds");
    }
}

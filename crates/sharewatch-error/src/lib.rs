use thiserror::Error;

/// Contract violations detected by the sharewatch harness.
///
/// These are programming errors at the call site: they are surfaced
/// immediately and never retried. Failures of the monitored target are not
/// represented here; they pass through the harness untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    // === Description Errors ===
    /// The operation is not declared by the described capability surface.
    #[error("operation {operation} is not declared by capability {capability}")]
    UnknownOperation {
        capability: &'static str,
        operation: String,
    },

    /// The operation's result is not declared as a capability instance.
    #[error("operation {operation} does not return a capability instance and cannot be dependent")]
    NotDependent { operation: String },

    /// The child description describes a different capability than the
    /// operation returns.
    #[error("operation {operation} returns {expected}, but the dependent description describes {actual}")]
    IncompatibleDependent {
        operation: String,
        expected: &'static str,
        actual: &'static str,
    },

    // === Harness Errors ===
    /// An equality policy re-entered the equality test of the monitored
    /// instance it is comparing.
    #[error("equality policy {policy} for {capability} re-entered the equality test of a monitored instance")]
    ReentrantEquality {
        capability: &'static str,
        policy: &'static str,
    },

    // === Configuration Errors ===
    /// Recorder configuration is out of range.
    #[error("invalid recorder configuration: {detail}")]
    InvalidConfig { detail: String },
}

impl UsageError {
    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::UnknownOperation { .. } => {
                Some("Use one of the operation constants declared next to the capability trait")
            }
            Self::NotDependent { .. } => {
                Some("Only operations declared with `returning(..)` can propagate monitoring")
            }
            Self::IncompatibleDependent { .. } => {
                Some("Register a description of the capability the operation returns")
            }
            Self::ReentrantEquality { .. } => Some(
                "Compare through capability operations (size, element access) instead of `==` on the arguments",
            ),
            Self::InvalidConfig { .. } => None,
        }
    }

    /// Whether the error stems from building a capability description.
    pub const fn is_description_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownOperation { .. }
                | Self::NotDependent { .. }
                | Self::IncompatibleDependent { .. }
        )
    }
}

/// Result type alias using [`UsageError`].
pub type Result<T, E = UsageError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unknown_operation() {
        let err = UsageError::UnknownOperation {
            capability: "List",
            operation: "Set::insert(T)".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "operation Set::insert(T) is not declared by capability List"
        );
    }

    #[test]
    fn error_display_incompatible_dependent() {
        let err = UsageError::IncompatibleDependent {
            operation: "List::iter()".to_owned(),
            expected: "Cursor",
            actual: "Set",
        };
        assert_eq!(
            err.to_string(),
            "operation List::iter() returns Cursor, but the dependent description describes Set"
        );
    }

    #[test]
    fn description_errors_are_classified() {
        assert!(
            UsageError::NotDependent {
                operation: "List::len()".to_owned()
            }
            .is_description_error()
        );
        assert!(
            !UsageError::InvalidConfig {
                detail: "max_frames".to_owned()
            }
            .is_description_error()
        );
    }

    #[test]
    fn suggestions() {
        let err = UsageError::ReentrantEquality {
            capability: "List",
            policy: "custom",
        };
        assert!(err.suggestion().is_some());
        assert!(
            UsageError::InvalidConfig {
                detail: String::new()
            }
            .suggestion()
            .is_none()
        );
    }
}

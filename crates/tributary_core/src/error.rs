//! Core error types for tributary.

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
///
/// Every variant carries the component, stream or field names needed for
/// a user to locate the problem in the plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Plan is structurally invalid
    #[error("Invalid configuration for {component}: {reason}")]
    Configuration {
        /// Offending component (or plan section)
        component: String,
        /// What is wrong with it
        reason: String,
    },

    /// Declared parallelism is not a positive integer
    #[error("Invalid parallelism for {component}: {value:?}")]
    InvalidParallelism {
        /// Offending component
        component: String,
        /// Raw declared value
        value: String,
    },

    /// Serialized plan could not be read
    #[error("Parse error: {message}")]
    Parse {
        /// Parser message
        message: String,
    },

    /// Stream definition text could not be resolved to a schema
    #[error("Invalid stream definition {definition:?}: {reason}")]
    InvalidStreamDefinition {
        /// Definition text as declared
        definition: String,
        /// Why it was rejected
        reason: String,
    },

    /// A consumed stream has no eligible producer in the plan
    #[error("No producer for stream {stream} consumed by {consumer}")]
    StreamResolution {
        /// Consuming component
        consumer: String,
        /// Unresolved stream name
        stream: String,
    },

    /// A partition field is not an attribute of the partitioned stream
    #[error("Partition field {field} of {component} is not an attribute of stream {stream}")]
    PartitionField {
        /// Component declaring the partition
        component: String,
        /// Partitioned input stream
        stream: String,
        /// Declared field
        field: String,
    },

    /// Execution runtime rejected a registration
    #[error("Runtime rejected {operation}: {message}")]
    Runtime {
        /// Registration call that failed
        operation: String,
        /// Runtime message
        message: String,
    },
}

impl CoreError {
    /// Shorthand for a configuration error
    #[must_use]
    pub fn configuration(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while resolving or validating the graph,
    /// as opposed to errors in the plan document itself
    #[must_use]
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, Self::StreamResolution { .. } | Self::PartitionField { .. })
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::StreamResolution {
            consumer: "D".to_string(),
            stream: "s9".to_string(),
        };
        assert_eq!(format!("{}", err), "No producer for stream s9 consumed by D");

        let err = CoreError::configuration("P", "missing attribute 'name'");
        assert_eq!(
            format!("{}", err),
            "Invalid configuration for P: missing attribute 'name'"
        );
    }

    #[test]
    fn test_partition_field_error_names_everything() {
        let err = CoreError::PartitionField {
            component: "C".to_string(),
            stream: "s2".to_string(),
            field: "userId".to_string(),
        };
        let s = format!("{}", err);
        assert!(s.contains("C"));
        assert!(s.contains("s2"));
        assert!(s.contains("userId"));
    }

    #[test]
    fn test_invalid_parallelism_quotes_value() {
        let err = CoreError::InvalidParallelism {
            component: "P".to_string(),
            value: "two".to_string(),
        };
        assert_eq!(format!("{}", err), "Invalid parallelism for P: \"two\"");
    }

    #[test]
    fn test_resolution_failure_classification() {
        assert!(CoreError::StreamResolution {
            consumer: "a".to_string(),
            stream: "b".to_string(),
        }
        .is_resolution_failure());
        assert!(!CoreError::Parse {
            message: "eof".to_string()
        }
        .is_resolution_failure());
    }

    #[test]
    fn test_error_equality() {
        let err1 = CoreError::configuration("a", "b");
        let err2 = CoreError::configuration("a", "b");
        assert_eq!(err1, err2);
        assert_ne!(err1, CoreError::configuration("a", "c"));
    }
}

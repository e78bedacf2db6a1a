//! Partition field validation against stream schemas.

use tributary_core::{Component, CoreError, CoreResult, SchemaResolver};

/// Checks that declared partition fields exist on their streams
pub struct PartitionValidator<'r, R: SchemaResolver> {
    resolver: &'r R,
}

impl<'r, R: SchemaResolver> PartitionValidator<'r, R> {
    /// Create a validator backed by a schema resolver
    #[must_use]
    pub fn new(resolver: &'r R) -> Self {
        Self { resolver }
    }

    /// Check one partition field of `component`'s input `stream` against
    /// the stream's definition
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PartitionField`] if the stream has no such
    /// attribute, or the resolver's error if the definition is unreadable
    pub fn validate(&self, component: &str, stream: &str, definition: &str, field: &str) -> CoreResult<()> {
        let schema = self.resolver.resolve(definition)?;
        if schema.has_attribute(field) {
            Ok(())
        } else {
            Err(CoreError::PartitionField {
                component: component.to_string(),
                stream: stream.to_string(),
                field: field.to_string(),
            })
        }
    }

    /// Check every partitioned input of a component, in input order
    ///
    /// # Errors
    ///
    /// Returns the first failure
    pub fn validate_component(&self, component: &Component) -> CoreResult<()> {
        for (stream, input) in &component.inputs {
            if let Some(field) = &input.partition {
                self.validate(&component.name, stream, &input.definition, field)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tributary_core::{StreamDefinitionParser, StreamSchema};

    const S2: &str = "define stream s2 (userId string, total double);";

    #[test]
    fn test_validate_present_field() {
        let parser = StreamDefinitionParser::new();
        let validator = PartitionValidator::new(&parser);
        assert!(validator.validate("C", "s2", S2, "userId").is_ok());
    }

    #[test]
    fn test_validate_missing_field() {
        let parser = StreamDefinitionParser::new();
        let validator = PartitionValidator::new(&parser);

        assert_eq!(
            validator.validate("C", "s2", S2, "sessionId"),
            Err(CoreError::PartitionField {
                component: "C".to_string(),
                stream: "s2".to_string(),
                field: "sessionId".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_field_name_is_case_sensitive() {
        let parser = StreamDefinitionParser::new();
        let validator = PartitionValidator::new(&parser);
        assert!(validator.validate("C", "s2", S2, "userid").is_err());
    }

    #[test]
    fn test_validate_unreadable_definition() {
        let parser = StreamDefinitionParser::new();
        let validator = PartitionValidator::new(&parser);

        assert!(matches!(
            validator.validate("C", "s2", "s2", "userId"),
            Err(CoreError::InvalidStreamDefinition { .. })
        ));
    }

    #[test]
    fn test_validate_component_skips_unpartitioned() {
        let parser = StreamDefinitionParser::new();
        let validator = PartitionValidator::new(&parser);
        // The unpartitioned input's definition is never parsed.
        let c = Component::sink("C")
            .with_input("raw", "not a definition")
            .with_partitioned_input("s2", S2, "userId");

        assert!(validator.validate_component(&c).is_ok());
    }

    struct FixedSchema;

    impl SchemaResolver for FixedSchema {
        fn resolve(&self, _definition: &str) -> CoreResult<StreamSchema> {
            Ok(StreamSchema {
                id: "fixed".to_string(),
                attributes: Vec::new(),
            })
        }
    }

    #[test]
    fn test_validate_uses_injected_resolver() {
        let resolver = FixedSchema;
        let validator = PartitionValidator::new(&resolver);

        assert!(matches!(
            validator.validate("C", "s2", S2, "userId"),
            Err(CoreError::PartitionField { stream, .. }) if stream == "s2"
        ));
    }

    #[test]
    fn test_validate_component_reports_declared_stream() {
        let parser = StreamDefinitionParser::new();
        let validator = PartitionValidator::new(&parser);
        let c = Component::sink("C").with_partitioned_input(
            "s2",
            "define stream other (userId string);",
            "total",
        );

        assert_eq!(
            validator.validate_component(&c),
            Err(CoreError::PartitionField {
                component: "C".to_string(),
                stream: "s2".to_string(),
                field: "total".to_string(),
            })
        );
    }
}

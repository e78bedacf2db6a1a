//! Plan descriptors.
//!
//! A plan is a flat list of components. Components never reference each
//! other directly; they only list the streams they read and write, and the
//! graph is derived later from shared stream names.

use crate::error::{CoreError, CoreResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Declared number of parallel instances of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parallelism(NonZeroU32);

impl Parallelism {
    /// A single instance
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create from a count, `None` for zero
    #[must_use]
    pub fn new(count: u32) -> Option<Self> {
        NonZeroU32::new(count).map(Self)
    }

    /// Parse a declared parallelism value
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidParallelism`] unless the value is a
    /// positive integer
    pub fn parse(component: &str, raw: &str) -> CoreResult<Self> {
        raw.trim()
            .parse::<NonZeroU32>()
            .map(Self)
            .map_err(|_| CoreError::InvalidParallelism {
                component: component.to_string(),
                value: raw.to_string(),
            })
    }

    /// Instance count
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Parallelism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Component kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKind {
    /// Ingestion point, emits the streams it imports
    Source,
    /// Applies a query to its input streams
    Processor {
        /// Query text, table definitions first
        query: String,
    },
    /// Forwards its input streams out of the system
    Sink {
        /// Optional query applied before publishing
        query: Option<String>,
    },
    /// Timer-driven generator
    Trigger {
        /// Trigger name as declared in the plan
        name: String,
        /// Trigger definition text
        definition: String,
    },
}

impl ComponentKind {
    /// Short human-readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Processor { .. } => "processor",
            Self::Sink { .. } => "sink",
            Self::Trigger { .. } => "trigger",
        }
    }

    /// Whether this component reads streams produced inside the plan.
    /// Sources and triggers have nothing to resolve.
    #[must_use]
    pub fn consumes_streams(&self) -> bool {
        match self {
            Self::Source | Self::Trigger { .. } => false,
            Self::Processor { .. } | Self::Sink { .. } => true,
        }
    }

    /// Whether this component's outputs may feed other components.
    /// Sink outputs leave the system and never loop back.
    #[must_use]
    pub fn feeds_internal_streams(&self) -> bool {
        match self {
            Self::Sink { .. } => false,
            Self::Source | Self::Processor { .. } | Self::Trigger { .. } => true,
        }
    }
}

/// A consumed stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStream {
    /// Definition text as declared in the plan
    pub definition: String,
    /// Field to partition incoming events by, if any
    pub partition: Option<String>,
}

/// A produced stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputStream {
    /// Definition text, absent for bare stream names
    pub definition: Option<String>,
}

/// One component of an execution plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Unique name within the plan
    pub name: String,
    /// Component kind
    pub kind: ComponentKind,
    /// Declared parallelism
    pub parallelism: Parallelism,
    /// Cap the runtime at exactly the declared parallelism
    pub enforce_parallelism: bool,
    /// Consumed streams by name, in declaration order
    pub inputs: IndexMap<String, InputStream>,
    /// Produced streams by name, in declaration order
    pub outputs: IndexMap<String, OutputStream>,
}

impl Component {
    /// Create a component with no streams
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parallelism: Parallelism::ONE,
            enforce_parallelism: false,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Create a source
    #[must_use]
    pub fn source(name: impl Into<String>) -> Self {
        Self::new(name, ComponentKind::Source)
    }

    /// Create a processor
    #[must_use]
    pub fn processor(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(name, ComponentKind::Processor { query: query.into() })
    }

    /// Create a sink without a query
    #[must_use]
    pub fn sink(name: impl Into<String>) -> Self {
        Self::new(name, ComponentKind::Sink { query: None })
    }

    /// Create a trigger component for the declared trigger `trigger`
    #[must_use]
    pub fn trigger(
        name: impl Into<String>,
        trigger: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            ComponentKind::Trigger {
                name: trigger.into(),
                definition: definition.into(),
            },
        )
    }

    /// Set parallelism
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Request the runtime cap at the declared parallelism
    #[must_use]
    pub fn enforced(mut self) -> Self {
        self.enforce_parallelism = true;
        self
    }

    /// Add a consumed stream, replacing any earlier declaration
    #[must_use]
    pub fn with_input(mut self, stream: impl Into<String>, definition: impl Into<String>) -> Self {
        self.inputs.insert(
            stream.into(),
            InputStream {
                definition: definition.into(),
                partition: None,
            },
        );
        self
    }

    /// Add a consumed stream partitioned by `field`
    #[must_use]
    pub fn with_partitioned_input(
        mut self,
        stream: impl Into<String>,
        definition: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.inputs.insert(
            stream.into(),
            InputStream {
                definition: definition.into(),
                partition: Some(field.into()),
            },
        );
        self
    }

    /// Add a produced stream, replacing any earlier declaration
    #[must_use]
    pub fn with_output(mut self, stream: impl Into<String>) -> Self {
        self.outputs.insert(stream.into(), OutputStream::default());
        self
    }

    /// Add a consumed stream
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or already consumed
    pub fn add_input(&mut self, stream: String, input: InputStream) -> CoreResult<()> {
        self.check_stream_name(&stream)?;
        if self.inputs.contains_key(&stream) {
            return Err(CoreError::configuration(
                &self.name,
                format!("input stream {} declared twice", stream),
            ));
        }
        self.inputs.insert(stream, input);
        Ok(())
    }

    /// Add a produced stream
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or already produced
    pub fn add_output(&mut self, stream: String, output: OutputStream) -> CoreResult<()> {
        self.check_stream_name(&stream)?;
        if self.outputs.contains_key(&stream) {
            return Err(CoreError::configuration(
                &self.name,
                format!("output stream {} declared twice", stream),
            ));
        }
        self.outputs.insert(stream, output);
        Ok(())
    }

    /// Partition field declared for a consumed stream
    #[must_use]
    pub fn partition_field(&self, stream: &str) -> Option<&str> {
        self.inputs.get(stream).and_then(|i| i.partition.as_deref())
    }

    /// Query text, if this kind carries one
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        match &self.kind {
            ComponentKind::Processor { query } => Some(query),
            ComponentKind::Sink { query } => query.as_deref(),
            ComponentKind::Source | ComponentKind::Trigger { .. } => None,
        }
    }

    /// Check descriptor invariants
    ///
    /// # Errors
    ///
    /// Returns error if the name or a stream name is empty, a partition
    /// field is empty, or a source/trigger declares inputs
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::configuration("<unnamed>", "component name is empty"));
        }
        for stream in self.inputs.keys().chain(self.outputs.keys()) {
            self.check_stream_name(stream)?;
        }
        if let Some((stream, _)) = self
            .inputs
            .iter()
            .find(|(_, i)| i.partition.as_deref().is_some_and(|p| p.trim().is_empty()))
        {
            return Err(CoreError::configuration(
                &self.name,
                format!("empty partition field on stream {}", stream),
            ));
        }
        if let ComponentKind::Trigger { name, .. } = &self.kind
            && name.trim().is_empty()
        {
            return Err(CoreError::configuration(&self.name, "trigger name is empty"));
        }
        if !self.kind.consumes_streams() && !self.inputs.is_empty() {
            return Err(CoreError::configuration(
                &self.name,
                format!("a {} has no input streams", self.kind.label()),
            ));
        }
        Ok(())
    }

    fn check_stream_name(&self, stream: &str) -> CoreResult<()> {
        if stream.trim().is_empty() {
            return Err(CoreError::configuration(&self.name, "stream name is empty"));
        }
        Ok(())
    }
}

/// A validated, ordered list of components.
///
/// Serialized as the bare component list; deserializing goes through
/// [`ExecutionPlan::new`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Component>", into = "Vec<Component>")]
pub struct ExecutionPlan {
    components: Vec<Component>,
}

impl ExecutionPlan {
    /// Create a plan, preserving component order
    ///
    /// # Errors
    ///
    /// Returns error if a component is invalid or two components share a name
    pub fn new(components: Vec<Component>) -> CoreResult<Self> {
        let mut seen = indexmap::IndexSet::new();
        for component in &components {
            component.validate()?;
            if !seen.insert(component.name.as_str()) {
                return Err(CoreError::configuration(
                    &component.name,
                    "component name is not unique",
                ));
            }
        }
        Ok(Self { components })
    }

    /// Components in declaration order
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Look up a component by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Components whose inputs must be resolved, in declaration order
    pub fn consumers(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| c.kind.consumes_streams())
    }

    /// Number of components
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if plan is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl TryFrom<Vec<Component>> for ExecutionPlan {
    type Error = CoreError;

    fn try_from(components: Vec<Component>) -> CoreResult<Self> {
        Self::new(components)
    }
}

impl From<ExecutionPlan> for Vec<Component> {
    fn from(plan: ExecutionPlan) -> Self {
        plan.components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallelism_parse() {
        assert_eq!(Parallelism::parse("P", " 4 ").unwrap().get(), 4);
        assert!(matches!(
            Parallelism::parse("P", "0"),
            Err(CoreError::InvalidParallelism { .. })
        ));
        assert!(matches!(
            Parallelism::parse("P", "-1"),
            Err(CoreError::InvalidParallelism { .. })
        ));
        assert!(matches!(
            Parallelism::parse("P", "two"),
            Err(CoreError::InvalidParallelism { .. })
        ));
    }

    #[test]
    fn test_kind_routing_roles() {
        assert!(!ComponentKind::Source.consumes_streams());
        assert!(!ComponentKind::Trigger {
            name: "t".to_string(),
            definition: String::new(),
        }
        .consumes_streams());
        assert!(ComponentKind::Processor { query: String::new() }.consumes_streams());
        assert!(ComponentKind::Sink { query: None }.consumes_streams());

        assert!(!ComponentKind::Sink { query: None }.feeds_internal_streams());
        assert!(ComponentKind::Source.feeds_internal_streams());
    }

    #[test]
    fn test_component_builder() {
        let c = Component::processor("B", "from s1 select * insert into s2;")
            .with_parallelism(Parallelism::new(2).unwrap())
            .enforced()
            .with_partitioned_input("s1", "define stream s1 (k string);", "k")
            .with_output("s2");

        assert_eq!(c.parallelism.get(), 2);
        assert!(c.enforce_parallelism);
        assert_eq!(c.partition_field("s1"), Some("k"));
        assert_eq!(c.partition_field("s2"), None);
        assert_eq!(c.query(), Some("from s1 select * insert into s2;"));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_add_input_rejects_duplicate() {
        let mut c = Component::sink("C");
        let input = InputStream {
            definition: "define stream s (a int);".to_string(),
            partition: None,
        };
        c.add_input("s".to_string(), input.clone()).unwrap();
        assert!(c.add_input("s".to_string(), input).is_err());
    }

    #[test]
    fn test_add_output_rejects_empty_name() {
        let mut c = Component::source("A");
        assert!(c.add_output(" ".to_string(), OutputStream::default()).is_err());
    }

    #[test]
    fn test_validate_source_with_inputs() {
        let c = Component::source("A").with_input("s", "define stream s (a int);");
        assert!(matches!(c.validate(), Err(CoreError::Configuration { .. })));
    }

    #[test]
    fn test_plan_rejects_duplicate_names() {
        let result = ExecutionPlan::new(vec![Component::source("A"), Component::sink("A")]);
        assert!(matches!(result, Err(CoreError::Configuration { .. })));
    }

    #[test]
    fn test_plan_consumers_in_order() {
        let plan = ExecutionPlan::new(vec![
            Component::source("A"),
            Component::processor("B", ""),
            Component::trigger("T", "T", "define trigger T at every 1 sec;"),
            Component::sink("C"),
        ])
        .unwrap();

        let names: Vec<_> = plan.consumers().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
        assert_eq!(plan.len(), 4);
        assert!(plan.get("T").is_some());
    }

    #[test]
    fn test_plan_deserialize_validates() {
        let plan = ExecutionPlan::new(vec![Component::source("A").with_output("s1")]).unwrap();
        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(serde_json::from_str::<ExecutionPlan>(&json).unwrap(), plan);

        let duplicate = serde_json::to_string(&vec![Component::source("A"), Component::sink("A")]).unwrap();
        assert!(serde_json::from_str::<ExecutionPlan>(&duplicate).is_err());

        let fed_source = serde_json::to_string(&vec![Component::source("A").with_input("s1", "define stream s1 (a int);")]).unwrap();
        assert!(serde_json::from_str::<ExecutionPlan>(&fed_source).is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_parallelism_parse_accepts_positive(n in 1u32..=u32::MAX) {
            let parsed = Parallelism::parse("P", &n.to_string()).unwrap();
            proptest::prop_assert_eq!(parsed.get(), n);
            proptest::prop_assert_eq!(parsed.to_string(), n.to_string());
        }

        #[test]
        fn prop_parallelism_parse_rejects_non_positive(n in i64::MIN..=0i64) {
            let is_invalid = matches!(
                Parallelism::parse("P", &n.to_string()),
                Err(CoreError::InvalidParallelism { .. })
            );
            proptest::prop_assert!(is_invalid);
        }
    }
}

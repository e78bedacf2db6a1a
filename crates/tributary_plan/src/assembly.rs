//! Topology assembly.
//!
//! Assembly runs in two phases. Wiring is pure: index the producers,
//! validate partition fields and resolve every consumer's edges. Only when
//! the whole plan wires cleanly are nodes and edges registered with the
//! runtime, so a failing plan never reaches it.

use crate::index::StreamProducerIndex;
use crate::partition::PartitionValidator;
use crate::resolve::{EdgeInstruction, resolve};
use crate::runtime::{BehaviorSpec, GeneratorSpec, TopologyBuilder};
use crate::xml;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tributary_core::{
    Component, ComponentKind, CoreError, CoreResult, DeploymentConfig, ExecutionPlan,
    SchemaResolver, StreamDefinitionParser,
};

/// Every edge of a plan, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wiring {
    /// Resolved edges, grouped by consumer in plan order
    pub edges: Vec<EdgeInstruction>,
}

impl Wiring {
    /// Edges feeding the named consumer
    pub fn edges_into<'a>(&'a self, consumer: &'a str) -> impl Iterator<Item = &'a EdgeInstruction> {
        self.edges.iter().filter(move |e| e.consumer == consumer)
    }

    /// Get total edge count
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Check if there are no edges
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Turns execution plans into runtime topologies
pub struct TopologyAssembler<R: SchemaResolver = StreamDefinitionParser> {
    config: DeploymentConfig,
    resolver: R,
}

impl TopologyAssembler {
    /// Create an assembler using the default stream definition parser
    #[must_use]
    pub fn new(config: DeploymentConfig) -> Self {
        Self::with_resolver(config, StreamDefinitionParser::new())
    }
}

impl<R: SchemaResolver> TopologyAssembler<R> {
    /// Create an assembler with a custom schema resolver
    #[must_use]
    pub fn with_resolver(config: DeploymentConfig, resolver: R) -> Self {
        Self { config, resolver }
    }

    /// Deployment config stamped on every node
    #[must_use]
    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    /// Resolve every edge of a plan without touching a runtime
    ///
    /// # Errors
    ///
    /// Returns the first partition field or stream resolution failure
    pub fn wire(&self, plan: &ExecutionPlan) -> CoreResult<Wiring> {
        let index = StreamProducerIndex::build(plan.components());
        let validator = PartitionValidator::new(&self.resolver);

        let mut edges = Vec::new();
        for consumer in plan.consumers() {
            validator.validate_component(consumer)?;
            edges.extend(resolve(consumer, &index)?);
        }

        Ok(Wiring { edges })
    }

    /// Register a plan's nodes and edges with a runtime.
    ///
    /// The builder is returned only when every registration succeeded.
    ///
    /// # Errors
    ///
    /// Returns the first wiring failure, or the first registration the
    /// runtime rejected
    pub fn assemble<B: TopologyBuilder>(&self, plan: &ExecutionPlan, mut builder: B) -> CoreResult<B> {
        let wiring = self.wire(plan)?;

        let mut handles: IndexMap<&str, B::Handle> = IndexMap::with_capacity(plan.len());
        for component in plan.components() {
            let handle = self.register(component, &mut builder)?;
            handles.insert(component.name.as_str(), handle);
        }

        for edge in &wiring.edges {
            let (producer, consumer) = match (
                handles.get(edge.producer.as_str()),
                handles.get(edge.consumer.as_str()),
            ) {
                (Some(p), Some(c)) => (p, c),
                _ => {
                    return Err(CoreError::Runtime {
                        operation: format!("connect {}", edge),
                        message: "endpoint was never registered".to_string(),
                    });
                }
            };
            builder.connect(producer, consumer, &edge.stream, &edge.routing)?;
            debug!(
                consumer = %edge.consumer,
                stream = %edge.stream,
                producer = %edge.producer,
                routing = %edge.routing,
                "connected components"
            );
        }

        info!(
            plan = %self.config.execution_plan_name,
            nodes = plan.len(),
            edges = wiring.len(),
            "assembled topology"
        );
        Ok(builder)
    }

    /// Parse an XML plan document and assemble it
    ///
    /// # Errors
    ///
    /// Returns any parse, wiring or registration failure
    pub fn assemble_xml<B: TopologyBuilder>(&self, document: &str, builder: B) -> CoreResult<B> {
        let plan = xml::parse_plan(document, &self.resolver)?;
        self.assemble(&plan, builder)
    }

    fn register<B: TopologyBuilder>(&self, component: &Component, builder: &mut B) -> CoreResult<B::Handle> {
        let name = component.name.as_str();
        let inputs: Vec<String> = component.inputs.values().map(|i| i.definition.clone()).collect();
        let outputs: Vec<String> = component
            .outputs
            .iter()
            .map(|(stream, o)| o.definition.clone().unwrap_or_else(|| stream.clone()))
            .collect();
        let deployment = self.config.clone();

        let handle = match &component.kind {
            ComponentKind::Source => builder.register_source(
                name,
                GeneratorSpec::EventReceiver {
                    streams: outputs,
                    deployment,
                },
                component.parallelism,
            )?,
            ComponentKind::Trigger {
                name: trigger,
                definition,
            } => builder.register_source(
                name,
                GeneratorSpec::Trigger {
                    name: trigger.clone(),
                    definition: definition.clone(),
                    deployment,
                },
                component.parallelism,
            )?,
            ComponentKind::Processor { query } => builder.register_processing_node(
                name,
                BehaviorSpec::Query {
                    inputs,
                    query: query.clone(),
                    outputs,
                    deployment,
                },
                component.parallelism,
            )?,
            ComponentKind::Sink { query } => builder.register_processing_node(
                name,
                BehaviorSpec::Publisher {
                    inputs,
                    outputs,
                    query: query.clone(),
                    deployment,
                },
                component.parallelism,
            )?,
        };

        if component.enforce_parallelism && component.kind.consumes_streams() {
            builder.cap_parallelism(&handle, component.parallelism)?;
        }

        debug!(
            component = name,
            kind = component.kind.label(),
            parallelism = component.parallelism.get(),
            "registered node"
        );
        Ok(handle)
    }
}

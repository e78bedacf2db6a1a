//! Edge resolution: which producers feed each consumed stream, and how.

use crate::index::StreamProducerIndex;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use tributary_core::{Component, CoreError, CoreResult};

/// How events on an edge are spread over the consumer's instances
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Routing {
    /// Load-balance across instances
    Shuffle,
    /// Events with equal `field` values reach the same instance
    FieldPartitioned {
        /// Partition attribute
        field: String,
    },
}

impl Routing {
    /// Routing policy for one consumed stream of `consumer`.
    ///
    /// Chosen per (consumer, stream), so every producer of that stream is
    /// connected the same way.
    #[must_use]
    pub fn for_input(consumer: &Component, stream: &str) -> Self {
        match consumer.partition_field(stream) {
            Some(field) => Self::FieldPartitioned {
                field: field.to_string(),
            },
            None => Self::Shuffle,
        }
    }
}

impl fmt::Display for Routing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shuffle => write!(f, "shuffle"),
            Self::FieldPartitioned { field } => write!(f, "fields({})", field),
        }
    }
}

/// A connection to register with the runtime
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeInstruction {
    /// Producing component
    pub producer: String,
    /// Consuming component
    pub consumer: String,
    /// Stream carried by the edge
    pub stream: String,
    /// Routing policy
    pub routing: Routing,
}

impl fmt::Display for EdgeInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -[{}: {}]-> {}",
            self.producer, self.stream, self.routing, self.consumer
        )
    }
}

/// Resolve the incoming edges of one consumer.
///
/// Producers are visited in index order. Sinks are never producers, and a
/// component never feeds itself.
///
/// # Errors
///
/// Returns [`CoreError::StreamResolution`] for the first consumed stream
/// left without an eligible producer
pub fn resolve(consumer: &Component, index: &StreamProducerIndex<'_>) -> CoreResult<Vec<EdgeInstruction>> {
    let mut edges = Vec::new();
    let mut seen: IndexSet<(&str, &str)> = IndexSet::new();

    for stream in consumer.inputs.keys() {
        let unresolved = || CoreError::StreamResolution {
            consumer: consumer.name.clone(),
            stream: stream.clone(),
        };

        let producers = index.producers(stream).ok_or_else(unresolved)?;
        let routing = Routing::for_input(consumer, stream);
        let before = edges.len();

        for producer in producers {
            if !producer.kind.feeds_internal_streams() || producer.name == consumer.name {
                continue;
            }
            if !seen.insert((producer.name.as_str(), stream.as_str())) {
                continue;
            }
            edges.push(EdgeInstruction {
                producer: producer.name.clone(),
                consumer: consumer.name.clone(),
                stream: stream.clone(),
                routing: routing.clone(),
            });
        }

        if edges.len() == before {
            return Err(unresolved());
        }
    }

    Ok(edges)
}

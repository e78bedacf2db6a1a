//! Index from stream name to the components that produce it.

use indexmap::IndexMap;
use tributary_core::Component;

/// Producers of every stream declared as an output somewhere in a plan.
///
/// Built once over the full component list and read-only afterwards.
/// Producers are kept in component declaration order so that edge
/// resolution is deterministic. A stream nobody produces has no entry.
#[derive(Debug, Clone, Default)]
pub struct StreamProducerIndex<'p> {
    producers: IndexMap<&'p str, Vec<&'p Component>>,
}

impl<'p> StreamProducerIndex<'p> {
    /// Index every output stream of `components`
    #[must_use]
    pub fn build(components: &'p [Component]) -> Self {
        let mut producers: IndexMap<&'p str, Vec<&'p Component>> = IndexMap::new();
        for component in components {
            for stream in component.outputs.keys() {
                producers.entry(stream.as_str()).or_default().push(component);
            }
        }
        Self { producers }
    }

    /// Producers of a stream, `None` if the stream is never produced
    #[must_use]
    pub fn producers(&self, stream: &str) -> Option<&[&'p Component]> {
        self.producers.get(stream).map(Vec::as_slice)
    }

    /// Indexed stream names in first-declaration order
    pub fn streams(&self) -> impl Iterator<Item = &'p str> + '_ {
        self.producers.keys().copied()
    }

    /// Number of indexed streams
    #[must_use]
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// Check if nothing is produced
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}

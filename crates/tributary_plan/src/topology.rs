//! In-memory topology that records every registration it receives.
//!
//! `Topology` implements [`TopologyBuilder`] without running anything. It
//! is what the CLI prints, and what tests inspect to check wiring.

use crate::resolve::Routing;
use crate::runtime::{BehaviorSpec, GeneratorSpec, TopologyBuilder};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tributary_core::{CoreError, CoreResult, Parallelism};

/// A recorded topology
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// All nodes, in registration order
    pub nodes: IndexMap<String, TopologyNode>,
    /// All edges, in registration order
    pub edges: Vec<TopologyEdge>,
}

impl Topology {
    /// Create a new empty topology
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn add_node(&mut self, node: TopologyNode) -> CoreResult<usize> {
        if self.nodes.contains_key(&node.name) {
            return Err(CoreError::Runtime {
                operation: format!("register {}", node.name),
                message: "node already registered".to_string(),
            });
        }
        let (index, _) = self.nodes.insert_full(node.name.clone(), node);
        Ok(index)
    }

    fn node_at(&self, handle: usize, operation: &str) -> CoreResult<&TopologyNode> {
        self.nodes
            .get_index(handle)
            .map(|(_, node)| node)
            .ok_or_else(|| CoreError::Runtime {
                operation: operation.to_string(),
                message: format!("unknown node handle {}", handle),
            })
    }

    /// Validate the topology structure
    ///
    /// # Errors
    ///
    /// Returns error if an edge references a missing node or feeds a
    /// generating node
    pub fn validate(&self) -> CoreResult<()> {
        for edge in &self.edges {
            if !self.nodes.contains_key(&edge.from) {
                return Err(CoreError::Runtime {
                    operation: "validate".to_string(),
                    message: format!("edge from unknown node {}", edge.from),
                });
            }
            match self.nodes.get(&edge.to) {
                None => {
                    return Err(CoreError::Runtime {
                        operation: "validate".to_string(),
                        message: format!("edge into unknown node {}", edge.to),
                    });
                }
                Some(node) if node.is_generator() => {
                    return Err(CoreError::Runtime {
                        operation: "validate".to_string(),
                        message: format!("edge into generating node {}", edge.to),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Get node by name
    #[must_use]
    pub fn get_node(&self, name: &str) -> Option<&TopologyNode> {
        self.nodes.get(name)
    }

    /// Generating nodes, in registration order
    pub fn entry_nodes(&self) -> impl Iterator<Item = &TopologyNode> {
        self.nodes.values().filter(|n| n.is_generator())
    }

    /// Nodes fed by the given node
    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.from == name)
            .map(|e| e.to.as_str())
            .collect()
    }

    /// Nodes feeding the given node
    #[must_use]
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.to == name)
            .map(|e| e.from.as_str())
            .collect()
    }

    /// Get total node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get total edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check if topology is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl TopologyBuilder for Topology {
    type Handle = usize;

    fn register_source(
        &mut self,
        name: &str,
        spec: GeneratorSpec,
        parallelism: Parallelism,
    ) -> CoreResult<usize> {
        self.add_node(TopologyNode {
            name: name.to_string(),
            role: NodeRole::Generator(spec),
            parallelism,
            max_tasks: None,
        })
    }

    fn register_processing_node(
        &mut self,
        name: &str,
        spec: BehaviorSpec,
        parallelism: Parallelism,
    ) -> CoreResult<usize> {
        self.add_node(TopologyNode {
            name: name.to_string(),
            role: NodeRole::Processing(spec),
            parallelism,
            max_tasks: None,
        })
    }

    fn connect(
        &mut self,
        producer: &usize,
        consumer: &usize,
        stream: &str,
        routing: &Routing,
    ) -> CoreResult<()> {
        let from = self.node_at(*producer, "connect")?.name.clone();
        let to = self.node_at(*consumer, "connect")?;
        if to.is_generator() {
            return Err(CoreError::Runtime {
                operation: "connect".to_string(),
                message: format!("{} generates events and takes no input", to.name),
            });
        }
        let to = to.name.clone();

        self.edges.push(TopologyEdge {
            from,
            to,
            stream: stream.to_string(),
            routing: routing.clone(),
        });
        Ok(())
    }

    fn cap_parallelism(&mut self, handle: &usize, max_tasks: Parallelism) -> CoreResult<()> {
        let (_, node) = self
            .nodes
            .get_index_mut(*handle)
            .ok_or_else(|| CoreError::Runtime {
                operation: "cap parallelism".to_string(),
                message: format!("unknown node handle {}", handle),
            })?;
        node.max_tasks = Some(max_tasks);
        Ok(())
    }
}

/// A node in the topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyNode {
    /// Unique node name
    pub name: String,
    /// What the node runs
    pub role: NodeRole,
    /// Declared parallelism
    pub parallelism: Parallelism,
    /// Task cap, when enforced
    pub max_tasks: Option<Parallelism>,
}

impl TopologyNode {
    /// Check whether the node has no upstream
    #[must_use]
    pub fn is_generator(&self) -> bool {
        matches!(self.role, NodeRole::Generator(_))
    }
}

/// Node role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Generating node
    Generator(GeneratorSpec),
    /// Processing node
    Processing(BehaviorSpec),
}

/// An edge between nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopologyEdge {
    /// Producing node
    pub from: String,
    /// Consuming node
    pub to: String,
    /// Stream carried
    pub stream: String,
    /// Routing policy
    pub routing: Routing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tributary_core::DeploymentConfig;

    fn receiver() -> GeneratorSpec {
        GeneratorSpec::EventReceiver {
            streams: vec!["define stream s1 (a int);".to_string()],
            deployment: DeploymentConfig::default(),
        }
    }

    fn publisher() -> BehaviorSpec {
        BehaviorSpec::Publisher {
            inputs: vec!["define stream s1 (a int);".to_string()],
            outputs: Vec::new(),
            query: None,
            deployment: DeploymentConfig::default(),
        }
    }

    #[test]
    fn test_topology_new() {
        let topology = Topology::new();
        assert!(topology.is_empty());
        assert_eq!(topology.node_count(), 0);
        assert_eq!(topology.edge_count(), 0);
    }

    #[test]
    fn test_topology_register_and_connect() {
        let mut topology = Topology::new();
        let a = topology.register_source("A", receiver(), Parallelism::ONE).unwrap();
        let c = topology
            .register_processing_node("C", publisher(), Parallelism::ONE)
            .unwrap();
        topology.connect(&a, &c, "s1", &Routing::Shuffle).unwrap();

        assert_eq!(topology.edge_count(), 1);
        assert_eq!(topology.dependents("A"), vec!["C"]);
        assert_eq!(topology.dependencies("C"), vec!["A"]);
        assert_eq!(
            topology.entry_nodes().map(|n| n.name.as_str()).collect::<Vec<_>>(),
            vec!["A"]
        );
        assert!(topology.validate().is_ok());
    }

    #[test]
    fn test_topology_register_duplicate() {
        let mut topology = Topology::new();
        topology.register_source("A", receiver(), Parallelism::ONE).unwrap();
        let result = topology.register_processing_node("A", publisher(), Parallelism::ONE);

        assert!(matches!(result, Err(CoreError::Runtime { .. })));
    }

    #[test]
    fn test_topology_connect_into_generator() {
        let mut topology = Topology::new();
        let a = topology.register_source("A", receiver(), Parallelism::ONE).unwrap();
        let b = topology.register_source("B", receiver(), Parallelism::ONE).unwrap();

        assert!(topology.connect(&a, &b, "s1", &Routing::Shuffle).is_err());
        assert_eq!(topology.edge_count(), 0);
    }

    #[test]
    fn test_topology_connect_unknown_handle() {
        let mut topology = Topology::new();
        let a = topology.register_source("A", receiver(), Parallelism::ONE).unwrap();

        assert!(topology.connect(&a, &7, "s1", &Routing::Shuffle).is_err());
    }

    #[test]
    fn test_topology_cap_parallelism() {
        let mut topology = Topology::new();
        let c = topology
            .register_processing_node("C", publisher(), Parallelism::new(3).unwrap())
            .unwrap();
        topology.cap_parallelism(&c, Parallelism::new(3).unwrap()).unwrap();

        assert_eq!(topology.get_node("C").unwrap().max_tasks, Parallelism::new(3));
    }

    #[test]
    fn test_topology_validate_missing_node() {
        let mut topology = Topology::new();
        topology.register_source("A", receiver(), Parallelism::ONE).unwrap();
        topology.edges.push(TopologyEdge {
            from: "A".to_string(),
            to: "ghost".to_string(),
            stream: "s1".to_string(),
            routing: Routing::Shuffle,
        });

        assert!(topology.validate().is_err());
    }

    #[test]
    fn test_topology_serializes_to_json() {
        let mut topology = Topology::new();
        topology.register_source("A", receiver(), Parallelism::ONE).unwrap();

        let json = serde_json::to_value(&topology).unwrap();
        assert_eq!(json["nodes"]["A"]["parallelism"], 1);
        assert_eq!(json["nodes"]["A"]["role"]["generator"]["type"], "event_receiver");
    }
}

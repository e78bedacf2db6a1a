//! Tributary Planner
//!
//! Turns a flat execution plan into a wired topology. Components only name
//! the streams they read and write; this crate derives which component
//! feeds which, picks a routing policy for every edge and registers the
//! result with an execution runtime.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assembly;
pub mod index;
pub mod partition;
pub mod resolve;
pub mod runtime;
pub mod topology;
pub mod xml;

pub use assembly::{TopologyAssembler, Wiring};
pub use index::StreamProducerIndex;
pub use partition::PartitionValidator;
pub use resolve::{EdgeInstruction, Routing, resolve};
pub use runtime::{BehaviorSpec, GeneratorSpec, TopologyBuilder};
pub use topology::{NodeRole, Topology, TopologyEdge, TopologyNode};
pub use xml::parse_plan;

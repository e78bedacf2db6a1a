//! Interface to the execution runtime that runs an assembled topology.
//!
//! The assembler never executes anything. It hands node and edge
//! registrations to a [`TopologyBuilder`], which stands for whichever
//! distributed engine schedules and moves the data.

use crate::resolve::Routing;
use serde::{Deserialize, Serialize};
use tributary_core::{CoreResult, DeploymentConfig, Parallelism};

/// What a generating node (no upstream) runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorSpec {
    /// Imports events from outside into the declared streams
    EventReceiver {
        /// Definitions of the imported streams
        streams: Vec<String>,
        /// Deployment the node belongs to
        deployment: DeploymentConfig,
    },
    /// Emits timer events
    Trigger {
        /// Trigger name as declared
        name: String,
        /// Trigger definition text
        definition: String,
        /// Deployment the node belongs to
        deployment: DeploymentConfig,
    },
}

/// What a processing node runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BehaviorSpec {
    /// Runs a query over its inputs
    Query {
        /// Input stream definitions
        inputs: Vec<String>,
        /// Query text
        query: String,
        /// Output stream definitions
        outputs: Vec<String>,
        /// Deployment the node belongs to
        deployment: DeploymentConfig,
    },
    /// Publishes its inputs outside the system
    Publisher {
        /// Input stream definitions
        inputs: Vec<String>,
        /// Output stream definitions
        outputs: Vec<String>,
        /// Optional query applied before publishing
        query: Option<String>,
        /// Deployment the node belongs to
        deployment: DeploymentConfig,
    },
}

/// Registration handle on the execution runtime.
///
/// Implementations accumulate state across a whole build. Each call may
/// fail if the runtime rejects the registration.
pub trait TopologyBuilder {
    /// Handle identifying a registered node
    type Handle;

    /// Register a node with no upstream
    ///
    /// # Errors
    ///
    /// Returns error if the runtime rejects the node
    fn register_source(
        &mut self,
        name: &str,
        spec: GeneratorSpec,
        parallelism: Parallelism,
    ) -> CoreResult<Self::Handle>;

    /// Register a node that consumes streams
    ///
    /// # Errors
    ///
    /// Returns error if the runtime rejects the node
    fn register_processing_node(
        &mut self,
        name: &str,
        spec: BehaviorSpec,
        parallelism: Parallelism,
    ) -> CoreResult<Self::Handle>;

    /// Feed `stream` from `producer` into `consumer`
    ///
    /// # Errors
    ///
    /// Returns error if the runtime rejects the edge
    fn connect(
        &mut self,
        producer: &Self::Handle,
        consumer: &Self::Handle,
        stream: &str,
        routing: &Routing,
    ) -> CoreResult<()>;

    /// Cap the number of tasks a node may run.
    /// Runtimes without task caps can ignore this.
    ///
    /// # Errors
    ///
    /// Returns error if the runtime rejects the cap
    fn cap_parallelism(&mut self, _handle: &Self::Handle, _max_tasks: Parallelism) -> CoreResult<()> {
        Ok(())
    }
}

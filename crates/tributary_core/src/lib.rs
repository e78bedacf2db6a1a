//! Tributary Core Types
//!
//! This crate contains pure types and logic with no I/O: the structured
//! descriptors of an execution plan, stream schemas, deployment
//! configuration and the error taxonomy shared by every other crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod component;
pub mod config;
pub mod error;
pub mod stream;

// Re-exports
pub use component::{Component, ComponentKind, ExecutionPlan, InputStream, OutputStream, Parallelism};
pub use config::DeploymentConfig;
pub use error::{CoreError, CoreResult};
pub use stream::{Attribute, AttributeType, SchemaResolver, StreamDefinitionParser, StreamSchema};

//! Deployment configuration handed to every node of an assembled topology.

use serde::{Deserialize, Serialize};

/// Deployment configuration
///
/// Identifies the execution plan a topology belongs to. Every generator and
/// behavior spec registered with the runtime carries a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Execution plan name
    pub execution_plan_name: String,
    /// Owning tenant
    pub tenant_id: i32,
    /// Management heartbeat interval in milliseconds
    pub management_heartbeat_interval_ms: u64,
}

impl DeploymentConfig {
    /// Create a config for a named plan
    #[must_use]
    pub fn new(execution_plan_name: impl Into<String>) -> Self {
        Self {
            execution_plan_name: execution_plan_name.into(),
            tenant_id: -1234,
            management_heartbeat_interval_ms: 10000,
        }
    }

    /// Set tenant id
    #[must_use]
    pub fn with_tenant_id(mut self, tenant_id: i32) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Set heartbeat interval
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval_ms: u64) -> Self {
        self.management_heartbeat_interval_ms = interval_ms;
        self
    }

    /// Load a config from JSON
    ///
    /// # Errors
    ///
    /// Returns error if the JSON does not describe a config
    pub fn from_json(json: &str) -> crate::CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self::new("ExecutionPlan")
    }
}

use agentic_core::{Agent, AgenticError, AgenticResult, ConnectorKind};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Categories probed by [`AgentRegistry::list_connectors`] to describe what
/// each agent handles.
pub const KNOWN_CATEGORIES: &[&str] = &[
    "llm",
    "embedding",
    "vm",
    "container",
    "infrastructure",
    "kubernetes",
    "k8s",
    "cluster",
    "docker",
    "podman",
    "nix",
    "nixos",
    "flake",
    "reproducible",
    "gpu",
    "nvidia",
    "cuda",
    "hardware",
];

/// Ordered collection of agents. Resolution is first-match in registration order.
///
/// Lookups take a shared lock and never block each other; registration takes
/// the exclusive lock. Registering an agent whose name is already present adds
/// a second, independent entry.
pub struct AgentRegistry {
    agents: RwLock<Vec<Arc<dyn Agent>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(Vec::new()),
        }
    }

    /// Append an agent. Earlier registrations take precedence.
    pub fn register(&self, agent: Arc<dyn Agent>) {
        let mut agents = self.agents.write();
        info!(agent = %agent.name(), position = agents.len(), "Registered agent");
        agents.push(agent);
    }

    /// Resolve the first agent whose `supports(category)` is true.
    pub fn select(&self, category: &str) -> AgenticResult<Arc<dyn Agent>> {
        let agents = self.agents.read();
        let agent = agents
            .iter()
            .find(|a| a.supports(category))
            .cloned()
            .ok_or_else(|| AgenticError::NoCapableAgent {
                category: category.to_string(),
            })?;
        debug!(category = %category, agent = %agent.name(), "Selected agent");
        Ok(agent)
    }

    /// Names of all registered agents, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.agents
            .read()
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }

    /// Describe every registered agent, probing [`KNOWN_CATEGORIES`].
    pub fn list_connectors(&self) -> Vec<ConnectorInfo> {
        self.agents
            .read()
            .iter()
            .map(|agent| ConnectorInfo {
                name: agent.name().to_string(),
                kind: agent.kind(),
                status: "available".to_string(),
                supported_tasks: KNOWN_CATEGORIES
                    .iter()
                    .filter(|c| agent.supports(c))
                    .map(|c| (*c).to_string())
                    .collect(),
            })
            .collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a registered connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ConnectorKind,
    pub status: String,
    pub supported_tasks: Vec<String>,
}

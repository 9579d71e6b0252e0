//! Built-in agents for the Agentic orchestration layer.
//!
//! Provides ready-to-use capability providers: an echo agent for wiring
//! checks and process-exec connectors for Docker/Podman, Kubernetes and Nix.
//!
//! # Main entry points
//!
//! - [`register_builtins()`] — Register every enabled connector from a [`ConnectorsConfig`].
//! - [`CommandAgent`] — Generic process-exec connector the presets are built on.
//! - [`EchoAgent`] — Returns the task payload as output.

/// Generic process-exec connector.
pub mod command;
/// Connector configuration and environment overrides.
pub mod config;
/// Docker, Kubernetes and Nix presets.
pub mod connectors;
/// Echo agent.
pub mod echo;

pub use command::{action_invocation, CommandAgent, Invocation, InvocationBuilder};
pub use config::{ConnectorsConfig, DockerConfig, KubernetesConfig, NixConfig};
pub use connectors::{
    docker_agent, kubernetes_agent, nix_agent, DOCKER_CATEGORIES, KUBERNETES_CATEGORIES,
    NIX_CATEGORIES,
};
pub use echo::EchoAgent;

use agentic_orchestrator::AgentRegistry;
use std::sync::Arc;
use tracing::info;

/// Register the enabled built-in connectors, in order: docker, kubernetes,
/// nix, then echo. Returns how many were registered.
pub fn register_builtins(registry: &AgentRegistry, config: &ConnectorsConfig) -> usize {
    let before = registry.len();

    if config.docker.enabled {
        registry.register(Arc::new(docker_agent(&config.docker)));
    }
    if config.kubernetes.enabled {
        registry.register(Arc::new(kubernetes_agent(&config.kubernetes)));
    }
    if config.nix.enabled {
        registry.register(Arc::new(nix_agent(&config.nix)));
    }
    if config.echo {
        registry.register(Arc::new(EchoAgent::new()));
    }

    let count = registry.len() - before;
    info!(count, "Built-in agents registered");
    count
}

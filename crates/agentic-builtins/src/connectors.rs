//! Infrastructure connectors built on [`CommandAgent`].
//!
//! Each preset maps a task payload onto the backend's CLI. Actions without a
//! dedicated mapping are passed through as `<action> <args...>`.

use crate::command::{optional_str, required_str, string_list, CommandAgent, Invocation};
use crate::config::{DockerConfig, KubernetesConfig, NixConfig};
use agentic_core::{ConnectorKind, Payload};
use serde_json::Value;
use std::time::Duration;

/// Categories served by the Docker / Podman connector.
pub const DOCKER_CATEGORIES: &[&str] = &["container", "docker", "podman"];
/// Categories served by the Kubernetes connector.
pub const KUBERNETES_CATEGORIES: &[&str] = &["kubernetes", "k8s", "cluster"];
/// Categories served by the Nix connector.
pub const NIX_CATEGORIES: &[&str] = &["nix", "nixos", "flake", "reproducible"];

/// Docker / Podman connector.
///
/// `run` accepts `image`, `name`, `ports`, `volumes`, `env`, `network`,
/// `detach`, `remove` and `command`; `pull`/`push` take `image`;
/// `stop`/`start`/`rm`/`logs`/`inspect` take `name`.
pub fn docker_agent(config: &DockerConfig) -> CommandAgent {
    let mut agent = CommandAgent::new("docker", config.engine.as_str())
        .with_categories(DOCKER_CATEGORIES.iter().copied())
        .with_kind(ConnectorKind::Infrastructure)
        .with_timeout(Duration::from_secs(config.timeout_secs))
        .with_invocation(docker_invocation);
    if let Some(host) = &config.host {
        agent = agent.with_env("DOCKER_HOST", host.as_str());
    }
    if config.tls {
        agent = agent.with_env("DOCKER_TLS_VERIFY", "1");
        if let Some(cert_path) = &config.cert_path {
            agent = agent.with_env("DOCKER_CERT_PATH", cert_path.as_str());
        }
    }
    agent
}

fn docker_invocation(payload: &Payload) -> Result<Invocation, String> {
    let action = match required_str(payload, "action")? {
        "remove" => "rm",
        "list" => "ps",
        other => other,
    };
    let mut args = vec![action.to_string()];

    match action {
        "run" => {
            if flag(payload, "detach") {
                args.push("-d".into());
            }
            if flag(payload, "remove") {
                args.push("--rm".into());
            }
            if let Some(name) = optional_str(payload, "name") {
                args.extend(["--name".to_string(), name.to_string()]);
            }
            for port in string_list(payload, "ports")? {
                args.extend(["-p".to_string(), port]);
            }
            for volume in string_list(payload, "volumes")? {
                args.extend(["-v".to_string(), volume]);
            }
            for (key, value) in string_map(payload, "env")? {
                args.extend(["-e".to_string(), format!("{key}={value}")]);
            }
            if let Some(network) = optional_str(payload, "network") {
                args.extend(["--network".to_string(), network.to_string()]);
            }
            args.push(required_str(payload, "image")?.to_string());
            args.extend(string_list(payload, "command")?);
        }
        "pull" | "push" => args.push(required_str(payload, "image")?.to_string()),
        "stop" | "start" | "rm" | "logs" | "inspect" => {
            args.push(required_str(payload, "name")?.to_string())
        }
        _ => {}
    }

    args.extend(string_list(payload, "args")?);
    Ok(Invocation::new(args))
}

/// Kubernetes connector.
///
/// `apply` takes an inline `manifest` (piped on stdin) or a `file`;
/// `scale` takes `resource`, `name` and `replicas`; other actions take an
/// optional `resource` and `name`. `namespace` falls back to the configured
/// default.
pub fn kubernetes_agent(config: &KubernetesConfig) -> CommandAgent {
    let mut global_args = Vec::new();
    if matches!(config.engine.as_str(), "microk8s" | "k3s") {
        global_args.push("kubectl".to_string());
    }
    if let Some(context) = &config.context {
        global_args.extend(["--context".to_string(), context.clone()]);
    }

    let default_namespace = config.namespace.clone();
    let mut agent = CommandAgent::new("kubernetes", config.engine.as_str())
        .with_categories(KUBERNETES_CATEGORIES.iter().copied())
        .with_kind(ConnectorKind::Infrastructure)
        .with_global_args(global_args)
        .with_timeout(Duration::from_secs(config.timeout_secs))
        .with_invocation(move |payload| kubernetes_invocation(payload, default_namespace.as_deref()));
    if let Some(kubeconfig) = &config.kubeconfig {
        agent = agent.with_env("KUBECONFIG", kubeconfig.as_str());
    }
    agent
}

fn kubernetes_invocation(
    payload: &Payload,
    default_namespace: Option<&str>,
) -> Result<Invocation, String> {
    let action = required_str(payload, "action")?;
    let mut args = vec![action.to_string()];
    let mut stdin = None;

    if action != "cluster-info" {
        if let Some(ns) = optional_str(payload, "namespace").or(default_namespace) {
            args.extend(["-n".to_string(), ns.to_string()]);
        }
    }

    match action {
        "apply" => {
            if let Some(manifest) = optional_str(payload, "manifest") {
                args.extend(["-f".to_string(), "-".to_string()]);
                stdin = Some(manifest.to_string());
            } else if let Some(file) = optional_str(payload, "file") {
                args.extend(["-f".to_string(), file.to_string()]);
            } else {
                return Err("either 'manifest' or 'file' must be specified".to_string());
            }
        }
        "scale" => {
            args.push(required_str(payload, "resource")?.to_string());
            args.push(required_str(payload, "name")?.to_string());
            let replicas = payload
                .get("replicas")
                .and_then(Value::as_u64)
                .ok_or_else(|| "missing required parameter 'replicas'".to_string())?;
            args.push(format!("--replicas={replicas}"));
        }
        _ => {
            if let Some(resource) = optional_str(payload, "resource") {
                args.push(resource.to_string());
            }
            if let Some(name) = optional_str(payload, "name") {
                args.push(name.to_string());
            }
        }
    }

    args.extend(string_list(payload, "args")?);
    let invocation = Invocation::new(args);
    Ok(match stdin {
        Some(manifest) => invocation.with_stdin(manifest),
        None => invocation,
    })
}

/// Nix connector.
///
/// `build` takes a `flake_ref` (with optional `attribute`) or an
/// `expression`, plus an optional `system`.
pub fn nix_agent(config: &NixConfig) -> CommandAgent {
    let mut agent = CommandAgent::new("nix", config.binary.as_str())
        .with_categories(NIX_CATEGORIES.iter().copied())
        .with_kind(ConnectorKind::Infrastructure)
        .with_timeout(Duration::from_secs(config.timeout_secs))
        .with_invocation(nix_invocation);
    if config.flakes_enabled {
        agent = agent.with_global_args(["--extra-experimental-features", "nix-command flakes"]);
    }
    if let Some(nix_path) = &config.nix_path {
        agent = agent.with_env("NIX_PATH", nix_path.as_str());
    }
    agent
}

fn nix_invocation(payload: &Payload) -> Result<Invocation, String> {
    let action = required_str(payload, "action")?;
    let mut args = vec![action.to_string()];

    if action == "build" {
        if let Some(flake_ref) = optional_str(payload, "flake_ref") {
            args.push(match optional_str(payload, "attribute") {
                Some(attr) => format!("{flake_ref}#{attr}"),
                None => flake_ref.to_string(),
            });
        } else if let Some(expression) = optional_str(payload, "expression") {
            args.extend(["-E".to_string(), expression.to_string()]);
        } else {
            return Err("either 'flake_ref' or 'expression' must be specified".to_string());
        }
        if let Some(system) = optional_str(payload, "system") {
            args.extend(["--system".to_string(), system.to_string()]);
        }
    }

    args.extend(string_list(payload, "args")?);
    Ok(Invocation::new(args))
}

fn flag(payload: &Payload, key: &str) -> bool {
    payload.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn string_map(payload: &Payload, key: &str) -> Result<Vec<(String, String)>, String> {
    match payload.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()),
        Some(other) => Err(format!("parameter '{key}' must be an object, got {other}")),
    }
}

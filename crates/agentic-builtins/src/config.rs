use serde::{Deserialize, Serialize};

/// Which built-in connectors to register and how to reach their backends.
///
/// Every section is optional; a missing section falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorsConfig {
    /// Register the echo agent (category `echo`).
    #[serde(default)]
    pub echo: bool,
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
    #[serde(default)]
    pub nix: NixConfig,
}

/// Docker / Podman connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `docker` or `podman`, or a path to either.
    #[serde(default = "default_engine")]
    pub engine: String,
    /// Daemon address, passed to the child as `DOCKER_HOST`.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub tls: bool,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: default_engine(),
            host: None,
            tls: false,
            cert_path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Kubernetes connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `kubectl`, `microk8s` or `k3s`. The latter two run their bundled kubectl.
    #[serde(default = "default_kubectl")]
    pub engine: String,
    #[serde(default)]
    pub kubeconfig: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    /// Used when a task does not name a namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: default_kubectl(),
            kubeconfig: None,
            context: None,
            namespace: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Nix / NixOS connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NixConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_nix")]
    pub binary: String,
    #[serde(default)]
    pub nix_path: Option<String>,
    /// Pass `--extra-experimental-features "nix-command flakes"`.
    #[serde(default)]
    pub flakes_enabled: bool,
    /// Defaults to 30 minutes.
    #[serde(default = "default_nix_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NixConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: default_nix(),
            nix_path: None,
            flakes_enabled: false,
            timeout_secs: default_nix_timeout_secs(),
        }
    }
}

impl ConnectorsConfig {
    /// Override backend locations from the process environment.
    ///
    /// Reads `DOCKER_HOST`, `DOCKER_CERT_PATH`, `KUBECONFIG`, `KUBE_CONTEXT`,
    /// `KUBE_NAMESPACE` and `NIX_PATH`. Unset or empty variables leave the
    /// configured value alone.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with a custom lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = get("DOCKER_HOST") {
            self.docker.host = Some(host);
        }
        if let Some(cert_path) = get("DOCKER_CERT_PATH") {
            self.docker.cert_path = Some(cert_path);
        }
        if let Some(kubeconfig) = get("KUBECONFIG") {
            self.kubernetes.kubeconfig = Some(kubeconfig);
        }
        if let Some(context) = get("KUBE_CONTEXT") {
            self.kubernetes.context = Some(context);
        }
        if let Some(namespace) = get("KUBE_NAMESPACE") {
            self.kubernetes.namespace = Some(namespace);
        }
        if let Some(nix_path) = get("NIX_PATH") {
            self.nix.nix_path = Some(nix_path);
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_engine() -> String {
    "docker".to_string()
}
fn default_kubectl() -> String {
    "kubectl".to_string()
}
fn default_nix() -> String {
    "nix".to_string()
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_nix_timeout_secs() -> u64 {
    1800
}

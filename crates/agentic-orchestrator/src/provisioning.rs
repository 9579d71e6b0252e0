use crate::workflow::{Workflow, WorkflowStep};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// Declarative input for [`create_vm_workflow`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmWorkflowConfig {
    pub name: String,
    #[serde(default)]
    pub vmid: u32,
    #[serde(default)]
    pub cpu: u32,
    /// Memory in MiB.
    #[serde(default)]
    pub memory: u32,
    /// Provision and start a VM before deploying anything else.
    #[serde(default)]
    pub use_proxmox: bool,
    #[serde(default)]
    pub proxmox_node: String,
    #[serde(default)]
    pub containers: Vec<ContainerConfig>,
    #[serde(default)]
    pub kubernetes_manifests: Vec<K8sManifestConfig>,
}

/// A container to deploy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

/// A Kubernetes manifest to apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct K8sManifestConfig {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    pub yaml: String,
}

/// Build the step list for provisioning a VM and the workloads on it.
///
/// Step order: `create-vm`, `start-vm` (both only with `use_proxmox`), one
/// `deploy-container-N` per container, one `deploy-k8s-N` per manifest.
/// Container steps depend on `start-vm` only when a VM is provisioned.
/// Nothing is executed here.
pub fn create_vm_workflow(config: &VmWorkflowConfig) -> Workflow {
    let mut workflow = Workflow::new(
        format!("vm-provision-{}", config.name),
        format!("Provision VM: {}", config.name),
    )
    .with_description("Complete VM provisioning workflow with container setup");

    if config.use_proxmox {
        workflow.add_step(
            WorkflowStep::new("create-vm", "Create Virtual Machine", "vm")
                .with_param("action", "create")
                .with_param("vm_type", "qemu")
                .with_param("node", config.proxmox_node.as_str())
                .with_param(
                    "config",
                    json!({
                        "cores": config.cpu,
                        "memory": config.memory,
                        "scsihw": "virtio-scsi-pci",
                        "net0": "virtio,bridge=vmbr0",
                    }),
                ),
        );
        workflow.add_step(
            WorkflowStep::new("start-vm", "Start Virtual Machine", "vm")
                .depends_on(["create-vm"])
                .with_param("action", "start")
                .with_param("vm_type", "qemu")
                .with_param("node", config.proxmox_node.as_str())
                .with_param("vmid", config.vmid),
        );
    }

    for (i, container) in config.containers.iter().enumerate() {
        let deps: &[&str] = if config.use_proxmox { &["start-vm"] } else { &[] };
        workflow.add_step(
            WorkflowStep::new(
                format!("deploy-container-{}", i + 1),
                format!("Deploy Container: {}", container.name),
                "container",
            )
            .depends_on(deps.iter().copied())
            .with_param("action", "run")
            .with_param("image", container.image.as_str())
            .with_param("name", container.name.as_str())
            .with_param("ports", container.ports.clone())
            .with_param("volumes", container.volumes.clone())
            .with_param("env", json!(container.environment))
            .with_param("detach", true),
        );
    }

    for (i, manifest) in config.kubernetes_manifests.iter().enumerate() {
        workflow.add_step(
            WorkflowStep::new(
                format!("deploy-k8s-{}", i + 1),
                format!("Deploy K8s: {}", manifest.name),
                "kubernetes",
            )
            .with_param("action", "apply")
            .with_param("manifest", manifest.yaml.as_str())
            .with_param("namespace", manifest.namespace.as_str()),
        );
    }

    workflow
}

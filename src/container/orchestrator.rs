//! Container queries and lifecycle calls.
//!
//! [`ContainerOrchestrator`] is the Docker-backed [`ContainerRuntime`]. It maps
//! bollard's response models onto the smaller summary types the tools format.

use crate::container::{
    ContainerClient, ContainerClientConfig, ContainerError, ContainerRuntime, ContainerState,
    ExecConfig, ExecOutput, Result, executor,
};
use async_trait::async_trait;
use bollard::query_parameters::{
    InspectContainerOptions, ListContainersOptionsBuilder, LogsOptions,
    RestartContainerOptionsBuilder, StartContainerOptions, StopContainerOptionsBuilder,
};
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Container orchestrator configuration.
#[derive(Debug, Clone)]
pub struct ContainerOrchestratorConfig {
    /// Default stop timeout in seconds
    pub stop_timeout: i32,
}

impl Default for ContainerOrchestratorConfig {
    fn default() -> Self {
        Self { stop_timeout: 10 }
    }
}

/// Docker-backed container runtime.
pub struct ContainerOrchestrator {
    client: ContainerClient,
    config: ContainerOrchestratorConfig,
}

impl ContainerOrchestrator {
    /// Create a new orchestrator with default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if connection to container runtime fails.
    pub async fn new() -> Result<Self> {
        let client = ContainerClient::new().await?;
        Ok(Self::with_client(client, ContainerOrchestratorConfig::default()))
    }

    /// Connect using explicit client settings.
    ///
    /// # Errors
    ///
    /// Returns error if connection to container runtime fails.
    pub async fn connect(
        client_config: ContainerClientConfig,
        config: ContainerOrchestratorConfig,
    ) -> Result<Self> {
        let client = ContainerClient::with_config(client_config).await?;
        Ok(Self::with_client(client, config))
    }

    /// Create an orchestrator with an existing client.
    pub fn with_client(client: ContainerClient, config: ContainerOrchestratorConfig) -> Self {
        Self { client, config }
    }

    /// Get the underlying client.
    pub fn client(&self) -> &ContainerClient {
        &self.client
    }

    async fn inspect_raw(
        &self,
        name_or_id: &str,
    ) -> Result<bollard::models::ContainerInspectResponse> {
        self.client
            .docker()
            .inspect_container(name_or_id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| ContainerError::from_api(name_or_id, e))
    }
}

#[async_trait]
impl ContainerRuntime for ContainerOrchestrator {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let options = ListContainersOptionsBuilder::new().all(all).build();

        let containers = self
            .client
            .docker()
            .list_containers(Some(options))
            .await?;

        debug!("Listed {} containers (all: {})", containers.len(), all);

        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: c.id.unwrap_or_default(),
                names: c.names.unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                state: c.state.map(|s| s.to_string()).unwrap_or_default(),
                status: c.status.unwrap_or_default(),
                created: c.created.and_then(|secs| DateTime::from_timestamp(secs, 0)),
            })
            .collect())
    }

    async fn inspect_container(&self, name_or_id: &str) -> Result<ContainerDetails> {
        let inspect = self.inspect_raw(name_or_id).await?;
        Ok(ContainerDetails::from_inspect(inspect))
    }

    async fn container_state(&self, name_or_id: &str) -> Result<ContainerState> {
        self.client.container_state(name_or_id).await
    }

    async fn start_container(&self, name_or_id: &str) -> Result<()> {
        debug!("Starting container: {}", name_or_id);

        self.client
            .docker()
            .start_container(name_or_id, None::<StartContainerOptions>)
            .await
            .map_err(|e| ContainerError::from_api(name_or_id, e))?;

        info!("Started container: {}", name_or_id);
        Ok(())
    }

    async fn stop_container(&self, name_or_id: &str, timeout_secs: Option<i32>) -> Result<()> {
        debug!("Stopping container: {}", name_or_id);

        let t = timeout_secs.unwrap_or(self.config.stop_timeout);
        self.client
            .docker()
            .stop_container(name_or_id, Some(StopContainerOptionsBuilder::new().t(t).build()))
            .await
            .map_err(|e| ContainerError::from_api(name_or_id, e))?;

        info!("Stopped container: {}", name_or_id);
        Ok(())
    }

    async fn restart_container(&self, name_or_id: &str, timeout_secs: Option<i32>) -> Result<()> {
        debug!("Restarting container: {}", name_or_id);

        let t = timeout_secs.unwrap_or(self.config.stop_timeout);
        self.client
            .docker()
            .restart_container(
                name_or_id,
                Some(RestartContainerOptionsBuilder::new().t(t).build()),
            )
            .await
            .map_err(|e| ContainerError::from_api(name_or_id, e))?;

        info!("Restarted container: {}", name_or_id);
        Ok(())
    }

    async fn logs(&self, name_or_id: &str, tail: Option<u64>) -> Result<String> {
        let options = LogsOptions {
            stdout: true,
            stderr: true,
            tail: tail.map(|n| n.to_string()).unwrap_or_else(|| "all".to_string()),
            ..Default::default()
        };

        let mut stream = self.client.docker().logs(name_or_id, Some(options));
        let mut output = String::new();

        while let Some(result) = stream.next().await {
            match result {
                Ok(log) => output.push_str(&log.to_string()),
                Err(e) => return Err(ContainerError::from_api(name_or_id, e)),
            }
        }

        Ok(output)
    }

    async fn exec(&self, name_or_id: &str, config: &ExecConfig) -> Result<ExecOutput> {
        executor::execute(self.client.docker(), name_or_id, config).await
    }
}

/// Container summary information.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerSummary {
    /// Container ID
    pub id: String,
    /// Container names (Docker prefixes them with `/`)
    pub names: Vec<String>,
    /// Image name
    pub image: String,
    /// Container state
    pub state: String,
    /// Human-readable status
    pub status: String,
    /// Creation time
    pub created: Option<DateTime<Utc>>,
}

impl ContainerSummary {
    /// First 12 characters of the ID.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    /// Primary name without the leading `/`.
    pub fn name(&self) -> &str {
        self.names
            .first()
            .map(|n| n.trim_start_matches('/'))
            .unwrap_or("")
    }
}

/// Mount information from an inspect response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MountSummary {
    /// Host path or volume name
    pub source: String,
    /// Path inside the container
    pub destination: String,
    /// Whether the mount is writable
    pub read_write: bool,
}

/// Published port from an inspect response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortSummary {
    /// Container port with protocol, e.g. `80/tcp`
    pub container_port: String,
    /// Host binding as `ip:port`, `None` if exposed but unpublished
    pub host_binding: Option<String>,
}

/// Inspected container details.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerDetails {
    /// Container ID
    pub id: String,
    /// Name without the leading `/`
    pub name: String,
    /// Image reference from the container config
    pub image: String,
    /// Status string (`running`, `exited`, ...)
    pub status: String,
    /// Whether the container is running
    pub running: bool,
    /// Main process ID
    pub pid: Option<i64>,
    /// Last exit code
    pub exit_code: Option<i64>,
    /// Start time as reported by the daemon
    pub started_at: Option<String>,
    /// Finish time as reported by the daemon
    pub finished_at: Option<String>,
    /// Number of restarts
    pub restart_count: i64,
    /// Working directory of the main process
    pub working_dir: Option<String>,
    /// Command of the main process
    pub cmd: Vec<String>,
    /// Labels
    pub labels: BTreeMap<String, String>,
    /// Mounts
    pub mounts: Vec<MountSummary>,
    /// Ports
    pub ports: Vec<PortSummary>,
    /// Network name to IP address
    pub networks: BTreeMap<String, String>,
}

impl ContainerDetails {
    fn from_inspect(inspect: bollard::models::ContainerInspectResponse) -> Self {
        let state = inspect.state.unwrap_or_default();
        let config = inspect.config.unwrap_or_default();
        let network_settings = inspect.network_settings.unwrap_or_default();

        let mounts = inspect
            .mounts
            .unwrap_or_default()
            .into_iter()
            .map(|m| MountSummary {
                source: m.source.or(m.name).unwrap_or_default(),
                destination: m.destination.unwrap_or_default(),
                read_write: m.rw.unwrap_or(false),
            })
            .collect();

        let mut ports: Vec<PortSummary> = network_settings
            .ports
            .unwrap_or_default()
            .into_iter()
            .flat_map(|(container_port, bindings)| {
                match bindings.filter(|b| !b.is_empty()) {
                    Some(bindings) => bindings
                        .into_iter()
                        .map(|b| PortSummary {
                            container_port: container_port.clone(),
                            host_binding: Some(format!(
                                "{}:{}",
                                b.host_ip.unwrap_or_else(|| "0.0.0.0".to_string()),
                                b.host_port.unwrap_or_default()
                            )),
                        })
                        .collect::<Vec<_>>(),
                    None => vec![PortSummary {
                        container_port,
                        host_binding: None,
                    }],
                }
            })
            .collect();
        ports.sort_by(|a, b| a.container_port.cmp(&b.container_port));

        let networks = network_settings
            .networks
            .unwrap_or_default()
            .into_iter()
            .map(|(name, endpoint)| (name, endpoint.ip_address.unwrap_or_default()))
            .collect();

        Self {
            id: inspect.id.unwrap_or_default(),
            name: inspect
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: config.image.unwrap_or_default(),
            status: state.status.map(|s| s.to_string()).unwrap_or_default(),
            running: state.running.unwrap_or(false),
            pid: state.pid,
            exit_code: state.exit_code,
            started_at: state.started_at,
            finished_at: state.finished_at,
            restart_count: inspect.restart_count.unwrap_or(0),
            working_dir: config.working_dir.filter(|d| !d.is_empty()),
            cmd: config.cmd.unwrap_or_default(),
            labels: config.labels.unwrap_or_default().into_iter().collect(),
            mounts,
            ports,
            networks,
        }
    }

    /// First 12 characters of the ID.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    /// Look up a label value.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{
        ContainerConfig, ContainerInspectResponse, EndpointSettings, MountPoint,
        NetworkSettings, PortBinding,
    };
    use std::collections::HashMap;

    #[test]
    fn test_summary_name_and_short_id() {
        let summary = ContainerSummary {
            id: "0123456789abcdef0123".to_string(),
            names: vec!["/web".to_string(), "/alias".to_string()],
            ..Default::default()
        };

        assert_eq!(summary.short_id(), "0123456789ab");
        assert_eq!(summary.name(), "web");
        assert_eq!(ContainerSummary::default().name(), "");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_details_from_inspect() {
        let mut labels = HashMap::new();
        labels.insert(
            "com.docker.compose.project".to_string(),
            "shop".to_string(),
        );

        let mut ports = HashMap::new();
        ports.insert(
            "80/tcp".to_string(),
            Some(vec![PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some("8080".to_string()),
            }]),
        );
        ports.insert("443/tcp".to_string(), None);

        let mut networks = HashMap::new();
        networks.insert(
            "bridge".to_string(),
            EndpointSettings {
                ip_address: Some("172.17.0.2".to_string()),
                ..Default::default()
            },
        );

        let inspect = ContainerInspectResponse {
            id: Some("feedfacecafebeef".to_string()),
            name: Some("/shop-web-1".to_string()),
            restart_count: Some(2),
            config: Some(ContainerConfig {
                image: Some("nginx:alpine".to_string()),
                working_dir: Some(String::new()),
                cmd: Some(vec!["nginx".to_string(), "-g".to_string()]),
                labels: Some(labels),
                ..Default::default()
            }),
            mounts: Some(vec![MountPoint {
                source: Some("/srv/html".to_string()),
                destination: Some("/usr/share/nginx/html".to_string()),
                rw: Some(false),
                ..Default::default()
            }]),
            network_settings: Some(NetworkSettings {
                ports: Some(ports),
                networks: Some(networks),
                ..Default::default()
            }),
            ..Default::default()
        };

        let details = ContainerDetails::from_inspect(inspect);

        assert_eq!(details.name, "shop-web-1");
        assert_eq!(details.short_id(), "feedfacecafe");
        assert_eq!(details.image, "nginx:alpine");
        assert!(!details.running);
        assert_eq!(details.restart_count, 2);
        assert_eq!(details.working_dir, None);
        assert_eq!(details.cmd, vec!["nginx", "-g"]);
        assert_eq!(details.label("com.docker.compose.project"), Some("shop"));
        assert_eq!(details.mounts.len(), 1);
        assert!(!details.mounts[0].read_write);
        assert_eq!(
            details.ports,
            vec![
                PortSummary {
                    container_port: "443/tcp".to_string(),
                    host_binding: None,
                },
                PortSummary {
                    container_port: "80/tcp".to_string(),
                    host_binding: Some("0.0.0.0:8080".to_string()),
                },
            ]
        );
        assert_eq!(details.networks.get("bridge").map(String::as_str), Some("172.17.0.2"));
    }

    #[tokio::test]
    #[ignore] // Requires Docker/Podman
    async fn test_orchestrator_lists_containers() {
        let orchestrator = ContainerOrchestrator::new().await.unwrap();
        let containers = orchestrator.list_containers(true).await.unwrap();
        println!("Found {} containers", containers.len());
    }
}

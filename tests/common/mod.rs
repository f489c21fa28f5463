//! In-memory container runtime for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use dockbridge::container::{
    ContainerDetails, ContainerError, ContainerRuntime, ContainerState, ContainerSummary,
    ExecConfig, ExecOutput, Result,
};
use dockbridge::{ServerConfig, ToolContext, build_server};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Box<dyn Fn(&ExecConfig) -> ExecOutput + Send + Sync>;

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub state: ContainerState,
    pub image: String,
    pub labels: BTreeMap<String, String>,
    pub logs: String,
}

/// Records every exec and answers with a configurable responder.
pub struct FakeRuntime {
    containers: Mutex<BTreeMap<String, FakeContainer>>,
    execs: Mutex<Vec<(String, ExecConfig)>>,
    responder: Responder,
    exec_delay: Option<Duration>,
}

impl FakeRuntime {
    /// One running container named `web`; every command succeeds silently.
    pub fn new() -> Self {
        let runtime = Self {
            containers: Mutex::new(BTreeMap::new()),
            execs: Mutex::new(Vec::new()),
            responder: Box::new(|_: &ExecConfig| ok("")),
            exec_delay: None,
        };
        runtime.with_container("web", ContainerState::Running, &[])
    }

    pub fn with_container(
        self,
        name: &str,
        state: ContainerState,
        labels: &[(&str, &str)],
    ) -> Self {
        self.containers.lock().unwrap().insert(
            name.to_string(),
            FakeContainer {
                state,
                image: format!("{}:latest", name),
                labels: labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                logs: format!("{} started\n{} ready\n", name, name),
            },
        );
        self
    }

    pub fn respond_with<F>(mut self, responder: F) -> Self
    where
        F: Fn(&ExecConfig) -> ExecOutput + Send + Sync + 'static,
    {
        self.responder = Box::new(responder);
        self
    }

    pub fn with_exec_delay(mut self, delay: Duration) -> Self {
        self.exec_delay = Some(delay);
        self
    }

    /// Recorded `(container, config)` pairs in call order.
    pub fn execs(&self) -> Vec<(String, ExecConfig)> {
        self.execs.lock().unwrap().clone()
    }

    /// Shell script of the last exec.
    pub fn last_script(&self) -> Option<String> {
        self.execs
            .lock()
            .unwrap()
            .last()
            .and_then(|(_, c)| c.shell_script().map(str::to_string))
    }

    pub fn state_of(&self, name: &str) -> Option<ContainerState> {
        self.containers.lock().unwrap().get(name).map(|c| c.state)
    }

    fn get(&self, name: &str) -> Result<FakeContainer> {
        self.containers
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))
    }

    fn set_state(&self, name: &str, state: ContainerState) -> Result<()> {
        let mut containers = self.containers.lock().unwrap();
        let container = containers
            .get_mut(name)
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))?;
        container.state = state;
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let containers = self.containers.lock().unwrap();
        Ok(containers
            .iter()
            .filter(|(_, c)| all || c.state == ContainerState::Running)
            .enumerate()
            .map(|(i, (name, c))| ContainerSummary {
                id: format!("{:0>12}{}", i, "f".repeat(52)),
                names: vec![format!("/{}", name)],
                image: c.image.clone(),
                state: c.state.to_string(),
                status: if c.state == ContainerState::Running {
                    "Up 5 minutes".to_string()
                } else {
                    "Exited (0) 1 minute ago".to_string()
                },
                created: None,
            })
            .collect())
    }

    async fn inspect_container(&self, name_or_id: &str) -> Result<ContainerDetails> {
        let c = self.get(name_or_id)?;
        Ok(ContainerDetails {
            id: "0123456789abcdef".to_string(),
            name: name_or_id.to_string(),
            image: c.image,
            status: c.state.to_string(),
            running: c.state == ContainerState::Running,
            labels: c.labels,
            ..Default::default()
        })
    }

    async fn container_state(&self, name_or_id: &str) -> Result<ContainerState> {
        Ok(self.get(name_or_id)?.state)
    }

    async fn start_container(&self, name_or_id: &str) -> Result<()> {
        self.set_state(name_or_id, ContainerState::Running)
    }

    async fn stop_container(&self, name_or_id: &str, _timeout_secs: Option<i32>) -> Result<()> {
        self.set_state(name_or_id, ContainerState::Stopped)
    }

    async fn restart_container(&self, name_or_id: &str, _timeout_secs: Option<i32>) -> Result<()> {
        self.set_state(name_or_id, ContainerState::Running)
    }

    async fn logs(&self, name_or_id: &str, tail: Option<u64>) -> Result<String> {
        let logs = self.get(name_or_id)?.logs;
        let lines: Vec<&str> = logs.lines().collect();
        let keep = tail.map_or(lines.len(), |n| (n as usize).min(lines.len()));
        Ok(lines[lines.len() - keep..]
            .iter()
            .map(|l| format!("{}\n", l))
            .collect())
    }

    async fn exec(&self, name_or_id: &str, config: &ExecConfig) -> Result<ExecOutput> {
        self.execs
            .lock()
            .unwrap()
            .push((name_or_id.to_string(), config.clone()));
        if let Some(delay) = self.exec_delay {
            tokio::time::sleep(delay).await;
        }
        Ok((self.responder)(config))
    }
}

pub fn ok(stdout: &str) -> ExecOutput {
    ExecOutput {
        stdout: stdout.to_string(),
        exit_code: Some(0),
        ..Default::default()
    }
}

pub fn exit(code: i64, stdout: &str, stderr: &str) -> ExecOutput {
    ExecOutput {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        exit_code: Some(code),
        ..Default::default()
    }
}

/// Tool context over `runtime` with `web` as the default container.
pub fn context(runtime: Arc<FakeRuntime>) -> ToolContext {
    ToolContext::new(runtime).with_default_container(Some("web".to_string()))
}

/// Server over `runtime` with `web` as the default container.
pub fn server(runtime: Arc<FakeRuntime>) -> dockbridge::McpServer {
    let config = ServerConfig {
        container: Some("web".to_string()),
        ..Default::default()
    };
    build_server(&config, runtime)
}

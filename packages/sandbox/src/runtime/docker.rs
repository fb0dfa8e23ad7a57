// ABOUTME: Docker runtime implementation for build sandboxes
// ABOUTME: Uses bollard to create, run, inspect and remove one container per build job

use super::{ArchiveStream, ContainerRuntime, SandboxSpec};
use crate::error::{Result, RuntimeError};
use crate::logs::{encode_frame, StreamType};
use async_trait::async_trait;
use bollard::{
    container::{
        Config, CreateContainerOptions, DownloadFromContainerOptions, LogOutput, LogsOptions,
        RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
        WaitContainerOptions,
    },
    errors::Error as BollardError,
    models::{HostConfig, RestartPolicy, RestartPolicyNameEnum},
    Docker,
};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, error, info};

pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    /// Connect using the platform defaults (`DOCKER_HOST` or the local socket)
    pub fn new() -> Result<Self> {
        let client = Docker::connect_with_defaults()
            .map_err(|e| RuntimeError::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Docker) -> Self {
        Self { client }
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        match self.client.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(RuntimeError::Connection(e.to_string())),
        }
    }
}

/// Convert a sandbox spec to bollard's container config
pub(crate) fn to_bollard_config(spec: &SandboxSpec) -> Config<String> {
    let binds: Vec<String> = spec
        .volumes
        .iter()
        .map(|v| {
            format!(
                "{}:{}:{}",
                v.host_path,
                v.container_path,
                if v.readonly { "ro" } else { "rw" }
            )
        })
        .collect();

    let mut env: Vec<String> = spec
        .env_vars
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    env.sort();

    let host_config = HostConfig {
        binds: Some(binds),
        memory: Some(spec.limits.memory_bytes),
        // Same value as memory: no swap on top of the ceiling
        memory_swap: Some(spec.limits.memory_bytes),
        cpu_period: Some(spec.limits.cpu_period_us),
        cpu_quota: Some(spec.limits.cpu_quota_us),
        restart_policy: Some(RestartPolicy {
            name: Some(RestartPolicyNameEnum::NO),
            maximum_retry_count: Some(0),
        }),
        cap_drop: Some(vec!["ALL".to_string()]),
        security_opt: Some(vec!["no-new-privileges".to_string()]),
        privileged: Some(false),
        ..Default::default()
    };

    Config {
        image: Some(spec.image.clone()),
        cmd: Some(spec.command.clone()),
        env: Some(env),
        working_dir: spec.working_dir.clone(),
        labels: Some(spec.labels.clone()),
        host_config: Some(host_config),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        tty: Some(false),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<()> {
        self.client
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| RuntimeError::Connection(e.to_string()))
    }

    async fn create(&self, spec: &SandboxSpec) -> Result<String> {
        debug!("Creating container {} with image {}", spec.name, spec.image);

        // Images are built ahead of time; a missing one is an operator error
        if !self.image_exists(&spec.image).await? {
            error!("Build image {} is not available locally", spec.image);
            return Err(RuntimeError::ImageNotFound(spec.image.clone()));
        }

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let response = self
            .client
            .create_container(Some(options), to_bollard_config(spec))
            .await
            .map_err(|e| RuntimeError::Container(e.to_string()))?;

        info!("Created container {} ({})", response.id, spec.name);
        Ok(response.id)
    }

    async fn start(&self, id: &str) -> Result<()> {
        debug!("Starting container {}", id);

        self.client
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| RuntimeError::Container(e.to_string()))
    }

    async fn wait(&self, id: &str) -> Result<i64> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut stream = self.client.wait_container(id, Some(options));

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as an error carrying the code
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(RuntimeError::Container(e.to_string())),
            None => Err(RuntimeError::Container(format!(
                "Wait stream for container {} ended without a status",
                id
            ))),
        }
    }

    async fn logs(&self, id: &str) -> Result<Vec<u8>> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            ..Default::default()
        };

        let mut stream = self.client.logs(id, Some(options));
        let mut framed = Vec::new();

        // bollard splits the frames for us; re-frame so callers always see the
        // engine's wire format regardless of client library
        while let Some(chunk) = stream.next().await {
            let (stream_type, message) = match chunk {
                Ok(LogOutput::StdOut { message }) => (StreamType::Stdout, message),
                Ok(LogOutput::StdErr { message }) => (StreamType::Stderr, message),
                Ok(LogOutput::Console { message }) => (StreamType::Stdout, message),
                Ok(LogOutput::StdIn { message }) => (StreamType::Stdin, message),
                Err(e) => return Err(RuntimeError::Container(e.to_string())),
            };
            framed.extend(encode_frame(stream_type, &message));
        }

        Ok(framed)
    }

    fn get_archive<'a>(&'a self, id: &'a str, path: &'a str) -> ArchiveStream<'a> {
        debug!("Downloading {} from container {}", path, id);

        let options = DownloadFromContainerOptions {
            path: path.to_string(),
        };

        self.client
            .download_from_container(id, Some(options))
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| RuntimeError::Archive(e.to_string()))
            })
            .boxed()
    }

    async fn stop(&self, id: &str, grace: Duration) -> Result<()> {
        info!("Stopping container {} (grace: {:?})", id, grace);

        let options = StopContainerOptions {
            t: grace.as_secs() as i64,
        };

        match self.client.stop_container(id, Some(options)).await {
            Ok(_) => Ok(()),
            // Already stopped
            Err(BollardError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(RuntimeError::Container(e.to_string())),
        }
    }

    async fn remove(&self, id: &str, force: bool) -> Result<()> {
        debug!("Removing container {} (force={})", id, force);

        let options = RemoveContainerOptions {
            force,
            v: true, // Remove anonymous volumes
            ..Default::default()
        };

        match self.client.remove_container(id, Some(options)).await {
            Ok(_) => {
                info!("Removed container {}", id);
                Ok(())
            }
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                debug!("Container {} already removed", id);
                Ok(())
            }
            Err(e) => Err(RuntimeError::Container(e.to_string())),
        }
    }
}

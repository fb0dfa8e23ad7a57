// ABOUTME: Container runtime capability consumed by the job controller
// ABOUTME: Defines the sandbox specification and the async create/start/wait/logs/archive/remove interface

use crate::error::Result;
use crate::policy::ResourceLimits;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::time::Duration;

pub mod docker;

pub use docker::DockerRuntime;

/// Chunks of a tar archive streamed out of a sandbox
pub type ArchiveStream<'a> = BoxStream<'a, Result<Vec<u8>>>;

/// Everything the engine needs to create one sandbox
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub working_dir: Option<String>,
    pub env_vars: HashMap<String, String>,
    pub volumes: Vec<VolumeMount>,
    pub limits: ResourceLimits,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeMount {
    pub host_path: String,
    pub container_path: String,
    pub readonly: bool,
}

/// Sandbox backend. One implementation per container engine.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check the engine is reachable
    async fn ping(&self) -> Result<()>;

    /// Create (but do not start) a sandbox, returning its id
    async fn create(&self, spec: &SandboxSpec) -> Result<String>;

    async fn start(&self, id: &str) -> Result<()>;

    /// Block until the sandbox exits, returning its exit status
    async fn wait(&self, id: &str) -> Result<i64>;

    /// Full stdout/stderr log in multiplexed framing (see [`crate::logs`])
    async fn logs(&self, id: &str) -> Result<Vec<u8>>;

    /// Stream a tar archive of `path` inside the sandbox
    fn get_archive<'a>(&'a self, id: &'a str, path: &'a str) -> ArchiveStream<'a>;

    /// Ask the sandbox to stop, killing it after `grace`
    async fn stop(&self, id: &str, grace: Duration) -> Result<()>;

    async fn remove(&self, id: &str, force: bool) -> Result<()>;
}

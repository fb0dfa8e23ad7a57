// ABOUTME: Sandboxed framework build orchestration for Buildbox
// ABOUTME: Turns submitted component source into a bounded container build and collects its output

pub mod artifacts;
pub mod error;
pub mod framework;
pub mod job;
pub mod logs;
pub mod normalizer;
pub mod policy;
pub mod runtime;
pub mod service;

pub use artifacts::{ArtifactSet, OUTPUT_EXTENSIONS};
pub use error::{Result, RuntimeError, ValidationError};
pub use framework::{Framework, FrameworkProfile, ProfileRegistry, ProfileSettings};
pub use job::{BuildJob, BuildOutcome, ErrorKind, JobController, JobState, COMPLETION_MARKER};
pub use normalizer::NormalizedSource;
pub use policy::{BuildDefaults, LimitOverrides, ResolvedLimits, ResourceLimits};
pub use runtime::{ArchiveStream, ContainerRuntime, DockerRuntime, SandboxSpec, VolumeMount};
pub use service::{CompileRequest, CompileResult, CompileService, ServiceSettings};

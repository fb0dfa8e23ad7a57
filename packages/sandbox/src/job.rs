// ABOUTME: Build job state machine and sandbox lifecycle controller
// ABOUTME: Runs one build per sandbox under a deadline and guarantees the sandbox is removed

use crate::artifacts::{self, ArtifactSet};
use crate::error::RuntimeError;
use crate::framework::{Framework, FrameworkProfile, ProfileRegistry};
use crate::logs::demultiplex;
use crate::normalizer::NormalizedSource;
use crate::policy::{ResolvedLimits, ResourceLimits};
use crate::runtime::{ContainerRuntime, SandboxSpec, VolumeMount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Printed by the build command only after the build step succeeded
pub const COMPLETION_MARKER: &str = "__BUILDBOX_BUILD_COMPLETE__";

pub const LABEL_MANAGED: &str = "buildbox.managed";
pub const LABEL_JOB_ID: &str = "buildbox.job_id";
pub const LABEL_FRAMEWORK: &str = "buildbox.framework";

/// Lifecycle of a single build job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Running,
    Success,
    BuildFailed,
    TimedOut,
    Errored,
    CleanedUp,
}

impl JobState {
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Created, Running)
                | (Created, Errored)
                | (Running, Success)
                | (Running, BuildFailed)
                | (Running, TimedOut)
                | (Running, Errored)
                | (Success, CleanedUp)
                | (BuildFailed, CleanedUp)
                | (TimedOut, CleanedUp)
                | (Errored, CleanedUp)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Success | JobState::BuildFailed | JobState::TimedOut | JobState::Errored
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::Running => "running",
            JobState::Success => "success",
            JobState::BuildFailed => "build_failed",
            JobState::TimedOut => "timed_out",
            JobState::Errored => "errored",
            JobState::CleanedUp => "cleaned_up",
        };
        f.write_str(s)
    }
}

/// Classified failure reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    BuildFailed,
    Timeout,
    InternalError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Success {
        files: ArtifactSet,
        duration_ms: u64,
    },
    Failure {
        error_kind: ErrorKind,
        message: String,
        /// Present for build failures only
        transcript: Option<String>,
    },
}

impl BuildOutcome {
    fn internal(err: &RuntimeError) -> Self {
        Self::internal_message(err.to_string())
    }

    fn internal_message(message: String) -> Self {
        BuildOutcome::Failure {
            error_kind: ErrorKind::InternalError,
            message,
            transcript: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            BuildOutcome::Success { .. } => None,
            BuildOutcome::Failure { error_kind, .. } => Some(*error_kind),
        }
    }
}

/// One request's build. Lives only for the duration of [`JobController::run`].
#[derive(Debug)]
pub struct BuildJob {
    pub id: String,
    pub framework: Framework,
    pub source: NormalizedSource,
    pub limits: ResourceLimits,
    pub timeout: Duration,
    state: JobState,
    started_at: Option<Instant>,
    transcript: String,
    files: ArtifactSet,
}

impl BuildJob {
    pub fn new(framework: Framework, source: NormalizedSource, resolved: ResolvedLimits) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            framework,
            source,
            limits: resolved.limits,
            timeout: resolved.timeout,
            state: JobState::Created,
            started_at: None,
            transcript: String::new(),
            files: ArtifactSet::new(),
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn transition(&mut self, next: JobState) {
        if self.state.can_transition_to(next) {
            debug!(job_id = %self.id, from = %self.state, to = %next, "Job state transition");
            self.state = next;
        } else {
            warn!(job_id = %self.id, from = %self.state, to = %next, "Refusing invalid job state transition");
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started_at
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Shell script run inside the sandbox: write the source, then build.
///
/// The source only ever appears base64-encoded, so nothing in it can escape
/// the single quotes.
pub fn build_script(profile: &FrameworkProfile, source: &NormalizedSource) -> String {
    let mut steps = vec![format!("cd {}", profile.work_dir)];
    if !profile.conflicting_files.is_empty() {
        steps.push(format!("rm -f {}", profile.conflicting_files.join(" ")));
    }
    steps.push(format!(
        "echo '{}' | base64 -d > {}",
        source.encoded, profile.source_path
    ));
    // Refresh mtime so watch-based tooling sees the change
    steps.push(format!("touch {}", profile.source_path));
    steps.push("sync".to_string());
    steps.push(profile.build_command.to_string());
    steps.push(format!("echo {}", COMPLETION_MARKER));
    steps.join(" && ")
}

pub fn sandbox_spec(job: &BuildJob, profile: &FrameworkProfile) -> SandboxSpec {
    let labels = HashMap::from([
        (LABEL_MANAGED.to_string(), "true".to_string()),
        (LABEL_JOB_ID.to_string(), job.id.clone()),
        (LABEL_FRAMEWORK.to_string(), job.framework.to_string()),
    ]);

    let env_vars = HashMap::from([
        ("CI".to_string(), "true".to_string()),
        ("NG_CLI_ANALYTICS".to_string(), "false".to_string()),
    ]);

    SandboxSpec {
        name: format!("buildbox-{}", job.id),
        image: profile.image.clone(),
        command: vec![
            "sh".to_string(),
            "-c".to_string(),
            build_script(profile, &job.source),
        ],
        working_dir: Some(profile.work_dir.to_string()),
        env_vars,
        volumes: vec![VolumeMount {
            host_path: profile.host_cache_dir.to_string_lossy().into_owned(),
            container_path: profile.sandbox_cache_dir.to_string(),
            readonly: false,
        }],
        limits: job.limits,
        labels,
    }
}

/// Owns a created sandbox and removes it exactly once.
///
/// [`SandboxGuard::release`] is the normal path. If the guard is dropped
/// before release finished, removal is handed to the async runtime instead.
struct SandboxGuard {
    runtime: Arc<dyn ContainerRuntime>,
    id: String,
    armed: bool,
}

impl SandboxGuard {
    async fn create(
        runtime: Arc<dyn ContainerRuntime>,
        spec: &SandboxSpec,
    ) -> Result<Self, RuntimeError> {
        let id = runtime.create(spec).await?;
        Ok(Self {
            runtime,
            id,
            armed: true,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    async fn release(mut self) {
        remove_quietly(self.runtime.as_ref(), &self.id).await;
        self.armed = false;
    }
}

impl Drop for SandboxGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        let runtime = self.runtime.clone();
        let id = std::mem::take(&mut self.id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    remove_quietly(runtime.as_ref(), &id).await;
                });
            }
            Err(_) => {
                error!(container_id = %id, "No async runtime available to remove sandbox");
            }
        }
    }
}

/// Cleanup failures are logged and never surface to the caller
async fn remove_quietly(runtime: &dyn ContainerRuntime, id: &str) {
    if let Err(e) = runtime.remove(id, true).await {
        warn!(container_id = %id, error = %e, "Failed to remove sandbox");
    }
}

/// What ended the wait on a running sandbox
enum Settled {
    Exited(Result<(i64, String), RuntimeError>),
    DeadlineElapsed,
    Abandoned,
}

#[derive(Clone)]
pub struct JobController {
    runtime: Arc<dyn ContainerRuntime>,
    profiles: Arc<ProfileRegistry>,
    /// Graceful stop before forced removal on timeout. `None` keeps forced removal only.
    stop_grace: Option<Duration>,
}

impl JobController {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, profiles: Arc<ProfileRegistry>) -> Self {
        Self {
            runtime,
            profiles,
            stop_grace: None,
        }
    }

    pub fn with_stop_grace(mut self, grace: Option<Duration>) -> Self {
        self.stop_grace = grace.filter(|g| !g.is_zero());
        self
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    /// Run a job to a terminal state and clean up its sandbox.
    ///
    /// Exactly one sandbox is created and, once created, exactly one removal
    /// is attempted.
    pub async fn run(&self, job: BuildJob) -> BuildOutcome {
        self.run_until(job, std::future::pending()).await
    }

    /// Like [`JobController::run`], but on a task of its own.
    ///
    /// Dropping the returned future abandons the build: a create still in
    /// flight completes, the sandbox is removed and a removal already under
    /// way is not interrupted.
    pub async fn run_detached(&self, job: BuildJob) -> BuildOutcome {
        let job_id = job.id.clone();
        let (abandon_tx, abandon_rx) = oneshot::channel::<()>();
        let controller = self.clone();
        let task = tokio::spawn(async move {
            let abandoned = async {
                // Resolves once the sender is dropped
                let _ = abandon_rx.await;
            };
            controller.run_until(job, abandoned).await
        });

        let joined = task.await;
        drop(abandon_tx);
        match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Build task did not complete");
                BuildOutcome::internal_message(format!("Build task failed: {}", e))
            }
        }
    }

    async fn run_until<C>(&self, mut job: BuildJob, abandoned: C) -> BuildOutcome
    where
        C: Future<Output = ()>,
    {
        let profile = self.profiles.get(job.framework);
        let spec = sandbox_spec(&job, profile);

        info!(
            job_id = %job.id,
            framework = %job.framework,
            image = %spec.image,
            timeout_ms = job.timeout.as_millis() as u64,
            "Creating build sandbox"
        );

        let sandbox = match SandboxGuard::create(self.runtime.clone(), &spec).await {
            Ok(sandbox) => sandbox,
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Failed to create build sandbox");
                job.transition(JobState::Errored);
                return BuildOutcome::internal(&e);
            }
        };

        let outcome = self.drive(&mut job, sandbox.id(), profile, abandoned).await;

        sandbox.release().await;
        job.transition(JobState::CleanedUp);

        info!(
            job_id = %job.id,
            error_kind = ?outcome.error_kind(),
            elapsed_ms = job.elapsed_ms(),
            "Build job finished"
        );
        outcome
    }

    async fn drive<C>(
        &self,
        job: &mut BuildJob,
        container_id: &str,
        profile: &FrameworkProfile,
        abandoned: C,
    ) -> BuildOutcome
    where
        C: Future<Output = ()>,
    {
        if let Err(e) = self.runtime.start(container_id).await {
            error!(job_id = %job.id, container_id, error = %e, "Failed to start build sandbox");
            job.transition(JobState::Errored);
            return BuildOutcome::internal(&e);
        }
        job.transition(JobState::Running);
        job.started_at = Some(Instant::now());

        let runtime = self.runtime.as_ref();
        let completion = async {
            let status = runtime.wait(container_id).await?;
            let raw = runtime.logs(container_id).await?;
            Ok::<_, RuntimeError>((status, demultiplex(&raw)))
        };

        // Whichever settles first decides; the others are dropped here
        let settled = tokio::select! {
            biased;
            _ = abandoned => Settled::Abandoned,
            result = completion => Settled::Exited(result),
            _ = tokio::time::sleep(job.timeout) => Settled::DeadlineElapsed,
        };

        match settled {
            Settled::Abandoned => {
                info!(job_id = %job.id, container_id, "Build abandoned by caller");
                job.transition(JobState::Errored);
                BuildOutcome::internal_message("Build abandoned".to_string())
            }
            Settled::DeadlineElapsed => {
                job.transition(JobState::TimedOut);
                warn!(job_id = %job.id, container_id, "Build deadline elapsed");
                if let Some(grace) = self.stop_grace {
                    if let Err(e) = self.runtime.stop(container_id, grace).await {
                        warn!(job_id = %job.id, error = %e, "Graceful stop failed");
                    }
                }
                BuildOutcome::Failure {
                    error_kind: ErrorKind::Timeout,
                    message: format!("Build timed out after {} ms", job.timeout.as_millis()),
                    transcript: None,
                }
            }
            Settled::Exited(Err(e)) => {
                error!(job_id = %job.id, container_id, error = %e, "Lost track of build sandbox");
                job.transition(JobState::Errored);
                BuildOutcome::internal(&e)
            }
            Settled::Exited(Ok((status, transcript))) => {
                job.transcript = transcript;
                let completed = job.transcript.contains(COMPLETION_MARKER);

                if status == 0 && completed {
                    job.transition(JobState::Success);
                    job.files = artifacts::collect(
                        self.runtime.get_archive(container_id, profile.output_dir),
                    )
                    .await;
                    if job.files.is_empty() {
                        warn!(job_id = %job.id, "Build succeeded but produced no artifacts");
                    }
                    BuildOutcome::Success {
                        files: std::mem::take(&mut job.files),
                        duration_ms: job.elapsed_ms(),
                    }
                } else {
                    job.transition(JobState::BuildFailed);
                    let message = if status != 0 {
                        format!("Build exited with status {}", status)
                    } else {
                        "Build exited without reporting completion".to_string()
                    };
                    info!(job_id = %job.id, status, "Build failed");
                    BuildOutcome::Failure {
                        error_kind: ErrorKind::BuildFailed,
                        message,
                        transcript: Some(std::mem::take(&mut job.transcript)),
                    }
                }
            }
        }
    }
}

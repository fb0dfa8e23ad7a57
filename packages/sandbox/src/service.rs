// ABOUTME: Compile operation exposed to the HTTP layer
// ABOUTME: Validates a request, normalizes its source and runs it through the job controller

use crate::error::ValidationError;
use crate::framework::{Framework, ProfileRegistry, ProfileSettings};
use crate::job::{BuildJob, BuildOutcome, JobController};
use crate::normalizer::{normalize, validate_source};
use crate::policy::{resolve, BuildDefaults, LimitOverrides};
use crate::runtime::ContainerRuntime;
use buildbox_config::defaults::{DEFAULT_MAX_SOURCE_BYTES, DEFAULT_STOP_GRACE_SECS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Inbound compile request in its wire form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    #[serde(default)]
    pub source_code: Option<String>,
    /// Kept loose so a non-string value is reported against `framework`
    #[serde(default)]
    pub framework: Option<serde_json::Value>,
    #[serde(flatten)]
    pub limits: LimitOverrides,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileResult {
    pub framework: Framework,
    pub outcome: BuildOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub profiles: ProfileSettings,
    pub max_source_bytes: usize,
    pub stop_grace_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            profiles: ProfileSettings::default(),
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            stop_grace_secs: DEFAULT_STOP_GRACE_SECS,
        }
    }
}

pub struct CompileService {
    controller: JobController,
    max_source_bytes: usize,
}

impl CompileService {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, settings: &ServiceSettings) -> Self {
        let profiles = Arc::new(ProfileRegistry::new(&settings.profiles));
        let controller = JobController::new(runtime, profiles)
            .with_stop_grace(Some(Duration::from_secs(settings.stop_grace_secs)));
        Self {
            controller,
            max_source_bytes: settings.max_source_bytes,
        }
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        self.controller.runtime()
    }

    /// Validate everything a request carries. Nothing here touches the runtime.
    pub fn prepare(
        &self,
        request: &CompileRequest,
        defaults: &BuildDefaults,
    ) -> Result<BuildJob, ValidationError> {
        let framework: Framework = match &request.framework {
            Some(serde_json::Value::String(key)) => key.parse()?,
            None | Some(serde_json::Value::Null) => {
                return Err(ValidationError::UnknownFramework(String::new()))
            }
            Some(other) => return Err(ValidationError::UnknownFramework(other.to_string())),
        };

        let source = request.source_code.as_deref().unwrap_or_default();
        validate_source(source, self.max_source_bytes)?;

        let resolved = resolve(&request.limits, defaults)?;
        let normalized = normalize(framework, source);

        debug!(
            framework = %framework,
            source_bytes = source.len(),
            normalized_bytes = normalized.text.len(),
            "Prepared build job"
        );

        Ok(BuildJob::new(framework, normalized, resolved))
    }

    /// Run one compile request end to end.
    ///
    /// `defaults` is a snapshot taken by the caller for this request only.
    /// The build runs detached, so a caller that goes away never leaves a
    /// sandbox behind.
    pub async fn compile(
        &self,
        request: CompileRequest,
        defaults: BuildDefaults,
    ) -> Result<CompileResult, ValidationError> {
        let job = self.prepare(&request, &defaults)?;
        let framework = job.framework;
        info!(job_id = %job.id, framework = %framework, "Accepted compile request");

        let outcome = self.controller.run_detached(job).await;
        Ok(CompileResult { framework, outcome })
    }
}

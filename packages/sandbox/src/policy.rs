// ABOUTME: Resource and timeout policy for build jobs
// ABOUTME: Validates per-request numeric overrides and merges them over process-wide defaults

use crate::error::ValidationError;
use buildbox_config::defaults::{
    DEFAULT_CPU_PERIOD_US, DEFAULT_CPU_QUOTA_US, DEFAULT_MEMORY_BYTES, DEFAULT_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const FIELD_MEMORY: &str = "memory";
pub const FIELD_CPU_PERIOD: &str = "cpuPeriod";
pub const FIELD_CPU_QUOTA: &str = "cpuQuota";
pub const FIELD_TIMEOUT: &str = "timeoutMs";

/// Hard ceilings applied to one sandbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub memory_bytes: i64,
    pub cpu_period_us: i64,
    pub cpu_quota_us: i64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_bytes: DEFAULT_MEMORY_BYTES,
            cpu_period_us: DEFAULT_CPU_PERIOD_US,
            cpu_quota_us: DEFAULT_CPU_QUOTA_US,
        }
    }
}

/// Process-wide defaults. Handed to each request as an immutable snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDefaults {
    pub limits: ResourceLimits,
    pub timeout_ms: u64,
}

impl Default for BuildDefaults {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Optional per-request overrides, still in their raw wire form.
///
/// Values may arrive as JSON numbers or numeric strings; anything else is
/// rejected by [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOverrides {
    #[serde(default)]
    pub memory: Option<Value>,
    #[serde(default)]
    pub cpu_period: Option<Value>,
    #[serde(default)]
    pub cpu_quota: Option<Value>,
    #[serde(default)]
    pub timeout_ms: Option<Value>,
}

/// Fully populated limits for one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLimits {
    pub limits: ResourceLimits,
    pub timeout: Duration,
}

/// Merge overrides over `defaults`, rejecting the first invalid field.
pub fn resolve(
    overrides: &LimitOverrides,
    defaults: &BuildDefaults,
) -> Result<ResolvedLimits, ValidationError> {
    let memory_bytes = override_or(FIELD_MEMORY, &overrides.memory, defaults.limits.memory_bytes)?;
    let cpu_period_us = override_or(
        FIELD_CPU_PERIOD,
        &overrides.cpu_period,
        defaults.limits.cpu_period_us,
    )?;
    let cpu_quota_us = override_or(
        FIELD_CPU_QUOTA,
        &overrides.cpu_quota,
        defaults.limits.cpu_quota_us,
    )?;
    let timeout_ms = match &overrides.timeout_ms {
        Some(value) => parse_positive(FIELD_TIMEOUT, value)?.ceil() as u64,
        None => defaults.timeout_ms,
    };

    Ok(ResolvedLimits {
        limits: ResourceLimits {
            memory_bytes,
            cpu_period_us,
            cpu_quota_us,
        },
        timeout: Duration::from_millis(timeout_ms),
    })
}

/// Apply a partial update to the defaults with the same rules as [`resolve`].
pub fn update_defaults(
    current: &BuildDefaults,
    update: &LimitOverrides,
) -> Result<BuildDefaults, ValidationError> {
    let resolved = resolve(update, current)?;
    Ok(BuildDefaults {
        limits: resolved.limits,
        timeout_ms: resolved.timeout.as_millis() as u64,
    })
}

/// Check a defaults record loaded from configuration.
pub fn validate_defaults(defaults: &BuildDefaults) -> Result<(), ValidationError> {
    let checks: [(&'static str, f64); 4] = [
        (FIELD_MEMORY, defaults.limits.memory_bytes as f64),
        (FIELD_CPU_PERIOD, defaults.limits.cpu_period_us as f64),
        (FIELD_CPU_QUOTA, defaults.limits.cpu_quota_us as f64),
        (FIELD_TIMEOUT, defaults.timeout_ms as f64),
    ];
    for (field, value) in checks {
        check_positive(field, value)?;
    }
    Ok(())
}

fn override_or(
    field: &'static str,
    value: &Option<Value>,
    default: i64,
) -> Result<i64, ValidationError> {
    match value {
        // `as` saturates at i64::MAX for oversized values
        Some(value) => Ok(parse_positive(field, value)?.ceil() as i64),
        None => Ok(default),
    }
}

fn parse_positive(field: &'static str, value: &Value) -> Result<f64, ValidationError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ValidationError::InvalidLimit {
        field,
        reason: format!("expected a number, got {}", value),
    })?;

    check_positive(field, number)?;
    Ok(number)
}

fn check_positive(field: &'static str, number: f64) -> Result<(), ValidationError> {
    if !number.is_finite() {
        return Err(ValidationError::InvalidLimit {
            field,
            reason: "must be a finite number".to_string(),
        });
    }
    if number <= 0.0 {
        return Err(ValidationError::InvalidLimit {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

use buildbox_config::constants::*;
use buildbox_config::defaults::*;
use buildbox_sandbox::policy::validate_defaults;
use buildbox_sandbox::{BuildDefaults, ProfileSettings, ResourceLimits, ServiceSettings, ValidationError};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::num::ParseIntError;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Invalid host address: {0}")]
    InvalidHost(String),
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
    #[error("Invalid build default: {0}")]
    InvalidDefault(#[from] ValidationError),
}

#[derive(Debug)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Unset disables the CORS layer
    pub cors_origin: Option<String>,
    pub defaults: BuildDefaults,
    pub service: ServiceSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env::var(BUILDBOX_PORT)
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse::<u16>()?;

        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let host_str = env::var(BUILDBOX_HOST).unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let host = host_str
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(host_str.clone()))?;

        let cors_origin = env::var(BUILDBOX_CORS_ORIGIN)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let defaults = BuildDefaults {
            limits: ResourceLimits {
                memory_bytes: parse_var(BUILDBOX_DEFAULT_MEMORY, DEFAULT_MEMORY_BYTES)?,
                cpu_period_us: parse_var(BUILDBOX_DEFAULT_CPU_PERIOD, DEFAULT_CPU_PERIOD_US)?,
                cpu_quota_us: parse_var(BUILDBOX_DEFAULT_CPU_QUOTA, DEFAULT_CPU_QUOTA_US)?,
            },
            timeout_ms: parse_var(BUILDBOX_DEFAULT_TIMEOUT_MS, DEFAULT_TIMEOUT_MS)?,
        };
        validate_defaults(&defaults)?;

        let profiles = ProfileSettings {
            cache_root: env::var(BUILDBOX_CACHE_ROOT)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_ROOT)),
            angular_image: env::var(BUILDBOX_IMAGE_ANGULAR)
                .unwrap_or_else(|_| DEFAULT_IMAGE_ANGULAR.to_string()),
            react_image: env::var(BUILDBOX_IMAGE_REACT)
                .unwrap_or_else(|_| DEFAULT_IMAGE_REACT.to_string()),
            vue_image: env::var(BUILDBOX_IMAGE_VUE)
                .unwrap_or_else(|_| DEFAULT_IMAGE_VUE.to_string()),
        };

        let max_source_bytes: usize =
            parse_var(BUILDBOX_MAX_SOURCE_BYTES, DEFAULT_MAX_SOURCE_BYTES)?;
        if max_source_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                var: BUILDBOX_MAX_SOURCE_BYTES,
                value: "0".to_string(),
            });
        }

        Ok(Config {
            host,
            port,
            cors_origin,
            defaults,
            service: ServiceSettings {
                profiles,
                max_source_bytes,
                stop_grace_secs: parse_var(BUILDBOX_STOP_GRACE_SECS, DEFAULT_STOP_GRACE_SECS)?,
            },
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Read an optional numeric variable, keeping `default` when unset
fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(default),
    }
}

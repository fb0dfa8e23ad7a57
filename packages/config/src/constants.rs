// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Buildbox

// Server Configuration
pub const BUILDBOX_PORT: &str = "BUILDBOX_PORT";
pub const BUILDBOX_HOST: &str = "BUILDBOX_HOST";
pub const BUILDBOX_CORS_ORIGIN: &str = "BUILDBOX_CORS_ORIGIN";

// Default Resource Limits
pub const BUILDBOX_DEFAULT_MEMORY: &str = "BUILDBOX_DEFAULT_MEMORY";
pub const BUILDBOX_DEFAULT_CPU_PERIOD: &str = "BUILDBOX_DEFAULT_CPU_PERIOD";
pub const BUILDBOX_DEFAULT_CPU_QUOTA: &str = "BUILDBOX_DEFAULT_CPU_QUOTA";
pub const BUILDBOX_DEFAULT_TIMEOUT_MS: &str = "BUILDBOX_DEFAULT_TIMEOUT_MS";

// Sandbox Configuration
pub const BUILDBOX_CACHE_ROOT: &str = "BUILDBOX_CACHE_ROOT";
pub const BUILDBOX_IMAGE_ANGULAR: &str = "BUILDBOX_IMAGE_ANGULAR";
pub const BUILDBOX_IMAGE_REACT: &str = "BUILDBOX_IMAGE_REACT";
pub const BUILDBOX_IMAGE_VUE: &str = "BUILDBOX_IMAGE_VUE";
pub const BUILDBOX_STOP_GRACE_SECS: &str = "BUILDBOX_STOP_GRACE_SECS";
pub const BUILDBOX_MAX_SOURCE_BYTES: &str = "BUILDBOX_MAX_SOURCE_BYTES";

// Logging
pub const RUST_LOG: &str = "RUST_LOG";

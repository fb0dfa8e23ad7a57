// ABOUTME: Built-in default values used when no environment override is present
// ABOUTME: Shared by the server binary and the sandbox package

pub const DEFAULT_PORT: u16 = 4100;
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// 1 GiB
pub const DEFAULT_MEMORY_BYTES: i64 = 1024 * 1024 * 1024;
/// Docker's standard CFS period
pub const DEFAULT_CPU_PERIOD_US: i64 = 100_000;
/// One full core at the default period
pub const DEFAULT_CPU_QUOTA_US: i64 = 100_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

pub const DEFAULT_CACHE_ROOT: &str = "/var/cache/buildbox";
pub const DEFAULT_IMAGE_ANGULAR: &str = "buildbox/angular:latest";
pub const DEFAULT_IMAGE_REACT: &str = "buildbox/react:latest";
pub const DEFAULT_IMAGE_VUE: &str = "buildbox/vue:latest";

/// 0 disables the graceful stop on timeout
pub const DEFAULT_STOP_GRACE_SECS: u64 = 0;
/// The encoded source travels inside a single `sh -c` argument, which the
/// kernel caps at 128 KiB; base64 grows it by a third.
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 64 * 1024;

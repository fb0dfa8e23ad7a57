// ABOUTME: Shared configuration surface for Buildbox packages
// ABOUTME: Exposes environment variable names and built-in default values

pub mod constants;
pub mod defaults;

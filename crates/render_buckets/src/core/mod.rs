//! # Core Module
//!
//! Shared configuration for the bucket renderer and re-exports of the
//! foundation layer it builds on.

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    BucketConfig,
    Config,
    ConfigError,
    ConfigFormat,
};

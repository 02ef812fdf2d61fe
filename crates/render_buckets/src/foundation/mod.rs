//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and the camera transform
//! - Slot keys and unique identifiers
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;

//! Specialized collection types

use std::sync::atomic::{AtomicU64, Ordering};

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable key of a mesh slot inside its owning material bucket
    pub struct MeshSlotKey;
}

/// Slot storage owned by a material bucket
pub type SlotStore<T> = SlotMap<MeshSlotKey, T>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Next process-unique identifier.
///
/// Identifiers increase monotonically, so a later allocation always compares
/// greater than an earlier one. They stand in for object identity wherever
/// ordering must not depend on memory addresses.
pub fn next_unique_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

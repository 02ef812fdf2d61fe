//! Error types for bucket rendering

use thiserror::Error;

use crate::foundation::collections::MeshSlotKey;
use crate::render::buckets::BucketId;
use crate::render::mesh_slot::MeshSlotId;

/// Errors raised while rendering buckets
///
/// Skipped passes are not errors: a material that refuses to activate just
/// draws nothing. These variants mean the bucket graph was left in a state
/// that upstream lifecycle code should never produce.
#[derive(Error, Debug)]
pub enum BucketError {
    /// A slot key was used with a bucket that does not own it
    #[error("Mesh slot {key:?} is not owned by bucket {bucket:?}")]
    UnknownMeshSlot {
        /// Key that failed to resolve
        key: MeshSlotKey,
        /// Bucket that was searched
        bucket: BucketId,
    },

    /// An active slot has no display array to draw from
    #[error("Mesh slot {0:?} has no display array bucket")]
    MissingDisplayArray(MeshSlotId),

    /// The drawing device failed to issue a draw
    #[error("Device error: {0}")]
    Device(String),
}

/// Result type for bucket operations
pub type BucketResult<T> = Result<T, BucketError>;

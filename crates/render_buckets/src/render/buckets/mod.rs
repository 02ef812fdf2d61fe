//! # Render Buckets
//!
//! Groups renderable slots by material and owns the per-frame draw order.
//!
//! - **BucketManager**: every material bucket of a scene, solid and alpha
//! - **MaterialBucket**: the slots drawn with one material
//! - **DisplayArrayBucketHandle**: counted handle to shared slot geometry
//! - **SortedMeshSlot**: depth-keyed entry used while ordering a pass

pub mod bucket_manager;
pub mod display_array_bucket;
pub mod material_bucket;
pub mod stats;

pub use bucket_manager::{BucketManager, SortedMeshSlot};
pub use display_array_bucket::DisplayArrayBucketHandle;
pub use material_bucket::{BucketId, MaterialBucket};
pub use stats::FrameStats;

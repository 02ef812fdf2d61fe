//! # Render Buckets
//!
//! Material bucketing and draw ordering for a real-time 3D rasterizer.
//!
//! ## Features
//!
//! - **Material Buckets**: slots grouped by material, one bucket per distinct material
//! - **Transparency Ordering**: alpha slots from every bucket drawn far to near
//! - **Shared Geometry**: reference-counted display arrays shared by replicated slots
//! - **Display-List Caching**: static slots recorded once and replayed until their mesh changes
//! - **Headless Device**: a recording rasterizer for inspecting frame command streams
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use render_buckets::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut manager = BucketManager::new();
//!     let glass = StandardMaterial::transparent("glass").into_ref();
//!     let mesh = Rc::new(MeshObject::new("pane"));
//!
//!     let (bucket, _created) = manager.find_bucket(&glass);
//!     let key = bucket.add_mesh(mesh);
//!     let geometry = bucket.new_display_array_bucket(DisplayArray::new(
//!         vec![
//!             Vertex::new([0.0, 0.0, 0.0]),
//!             Vertex::new([1.0, 0.0, 0.0]),
//!             Vertex::new([0.0, 1.0, 0.0]),
//!         ],
//!         vec![0, 1, 2],
//!     ));
//!     if let Some(slot) = bucket.mesh_slot_mut(key) {
//!         slot.set_display_array_bucket(Some(geometry));
//!     }
//!     bucket.activate_mesh(key)?;
//!
//!     let mut device = RecordingDevice::new();
//!     let ctx = RenderContext::new(CameraTransform::identity(), DrawingMode::Textured);
//!     let stats = manager.render_buckets(&ctx, &mut device)?;
//!     assert_eq!(stats.alpha_slots, 1);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Configuration layer
pub mod config;
pub mod core;

// Shared utilities
pub mod foundation;

// Bucket renderer
pub mod render;

/// Common imports for bucket users
pub mod prelude {
    pub use crate::{
        core::config::{BucketConfig, Config},
        foundation::math::{CameraTransform, Mat4, Vec3, Vec4},
        render::{
            BucketError, BucketManager, BucketResult, DisplayArray, DisplayArrayBucketHandle,
            DrawingMode, FrameStats, MaterialBucket, MaterialFlags, MaterialRef, MeshObject,
            MeshSlot, PolyMaterial, RasterizerDevice, RecordingDevice, RenderContext,
            StandardMaterial, Vertex,
        },
    };
}

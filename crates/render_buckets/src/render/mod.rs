//! # Bucket Rendering
//!
//! Draws a scene as a set of material buckets against an abstract
//! rasterizer device.
//!
//! ## Architecture
//!
//! - **Buckets**: material buckets, geometry buckets and the manager that orders them
//! - **Device**: the rasterizer capability set the buckets drive
//! - **Material / Mesh**: what the buckets need from materials, meshes and deformers
//! - **Context**: camera and drawing mode handed down every render call
//!
//! ## Frame Order
//!
//! Opaque buckets are drawn first in insertion order with depth writes on.
//! Transparent slots from all alpha buckets are then merged and drawn back
//! to front with depth writes off.

pub mod buckets;
pub mod context;
pub mod device;
pub mod error;
pub mod material;
pub mod mesh;
pub mod mesh_slot;
pub mod recording;

pub use buckets::{
    BucketId, BucketManager, DisplayArrayBucketHandle, FrameStats, MaterialBucket, SortedMeshSlot,
};
pub use context::{DepthMask, DrawingMode, RenderContext};
pub use device::{ClientObjectId, DisplayListId, DisplayListOp, DrawRequest, RasterizerDevice};
pub use error::{BucketError, BucketResult};
pub use material::{same_instance, MaterialFlags, MaterialRef, PolyMaterial, StandardMaterial};
pub use mesh::{Deformer, DisplayArray, DisplayArrayId, MeshModified, MeshObject, Vertex};
pub use mesh_slot::{DisplayList, DisplayListState, MeshSlot, MeshSlotId};
pub use recording::{DeviceCommand, RecordingDevice};

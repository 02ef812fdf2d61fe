//! Drawing device abstraction
//!
//! This module defines the trait a rasterizer backend implements so that
//! buckets can drive it without knowing which graphics API sits underneath.

use crate::foundation::math::{CameraTransform, Mat4, Vec4};
use crate::render::context::DepthMask;
use crate::render::error::BucketResult;
use crate::render::material::{MaterialFlags, PolyMaterial};
use crate::render::mesh::DisplayArray;
use crate::render::mesh_slot::MeshSlotId;

/// Opaque per-object identifier forwarded to the device before each slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientObjectId(pub u64);

/// Handle to a compiled display list owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayListId(pub u32);

/// How a draw request uses the display-list cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayListOp {
    /// Draw directly without caching
    Immediate,
    /// Record into the given new list while drawing
    Compile(DisplayListId),
    /// Replay an up-to-date list
    Replay(DisplayListId),
}

/// Everything the device needs to draw one mesh slot
#[derive(Debug)]
pub struct DrawRequest<'a> {
    /// Slot being drawn
    pub slot: MeshSlotId,
    /// Geometry bound for the slot
    pub array: &'a DisplayArray,
    /// Display-list usage
    pub display_list: DisplayListOp,
}

/// Rasterizer capability set consumed by the bucket renderer
///
/// Calls arrive in strict order for each slot: bind geometry, set client
/// object, material activation loop, transform and draw, unbind.
pub trait RasterizerDevice {
    /// Bind vertex and index buffers
    fn bind_primitives(&mut self, array: &DisplayArray);

    /// Unbind buffers bound by [`Self::bind_primitives`]
    fn unbind_primitives(&mut self, array: &DisplayArray);

    /// Save the current model matrix
    fn push_matrix(&mut self);

    /// Restore the last saved model matrix
    fn pop_matrix(&mut self);

    /// Multiply the world transform of a slot onto the model matrix
    fn apply_transform(&mut self, transform: &Mat4, flags: MaterialFlags);

    /// Bind a material for the next pass
    ///
    /// Multi-pass materials are drawn by calling this until it returns
    /// `false`; a device also returns `false` when it cannot bind the
    /// material at all.
    fn set_material(&mut self, material: &dyn PolyMaterial) -> bool;

    /// Enable or disable lighting for the bound material
    fn process_lighting(&mut self, use_lights: bool, camera: &CameraTransform);

    /// Toggle depth writes
    fn set_depth_mask(&mut self, mask: DepthMask);

    /// Forget cached material and texture state at the start of a frame
    fn clear_caching_info(&mut self);

    /// Set or clear the per-object client identifier
    fn set_client_object(&mut self, client: Option<ClientObjectId>);

    /// Per-object color override for materials that use it
    fn set_object_color(&mut self, _color: &Vec4) {}

    /// Whether the device can compile display lists
    fn supports_display_lists(&self) -> bool {
        false
    }

    /// Allocate a new display list handle
    fn create_display_list(&mut self) -> DisplayListId;

    /// Free a display list
    fn release_display_list(&mut self, list: DisplayListId);

    /// Issue an indexed draw
    fn index_primitives(&mut self, draw: &DrawRequest<'_>) -> BucketResult<()>;

    /// Issue an indexed draw for a face-text material
    fn index_primitives_3d_text(
        &mut self,
        draw: &DrawRequest<'_>,
        material: &dyn PolyMaterial,
    ) -> BucketResult<()>;
}

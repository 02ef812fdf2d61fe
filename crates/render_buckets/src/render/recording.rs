//! Headless recording device
//!
//! [`RecordingDevice`] implements [`RasterizerDevice`] by appending every
//! call to a command log instead of talking to a GPU. It is used to inspect
//! the exact command stream a frame produces, to diff frames while
//! debugging, and as the device in tests.

use std::collections::HashSet;

use crate::foundation::math::{CameraTransform, Mat4, Vec4};
use crate::render::context::DepthMask;
use crate::render::device::{ClientObjectId, DisplayListId, DisplayListOp, DrawRequest, RasterizerDevice};
use crate::render::error::{BucketError, BucketResult};
use crate::render::material::{MaterialFlags, PolyMaterial};
use crate::render::mesh::{DisplayArray, DisplayArrayId};
use crate::render::mesh_slot::MeshSlotId;

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// `clear_caching_info`
    ClearCachingInfo,
    /// `set_depth_mask`
    SetDepthMask(DepthMask),
    /// `set_client_object`
    SetClientObject(Option<ClientObjectId>),
    /// `bind_primitives`
    BindPrimitives(DisplayArrayId),
    /// `unbind_primitives`
    UnbindPrimitives(DisplayArrayId),
    /// `push_matrix`
    PushMatrix,
    /// `pop_matrix`
    PopMatrix,
    /// `apply_transform`
    ApplyTransform(Mat4),
    /// Accepted `set_material` call, with the 1-based pass number
    SetMaterial {
        /// Material name
        name: String,
        /// Pass number
        pass: u32,
    },
    /// `process_lighting`
    ProcessLighting(bool),
    /// `set_object_color`
    SetObjectColor(Vec4),
    /// `create_display_list`
    CreateDisplayList(DisplayListId),
    /// `release_display_list`
    ReleaseDisplayList(DisplayListId),
    /// Indexed draw
    Draw {
        /// Slot drawn
        slot: MeshSlotId,
        /// Geometry drawn
        array: DisplayArrayId,
        /// Display-list usage
        list: DisplayListOp,
        /// Whether the face-text path was used
        text: bool,
    },
}

/// Device that records calls instead of drawing
#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: Vec<DeviceCommand>,
    display_lists: bool,
    next_list: u32,
    live_lists: HashSet<DisplayListId>,
    current_pass: u32,
    rejected: HashSet<String>,
    failing_draws: bool,
    matrix_depth: usize,
}

impl RecordingDevice {
    /// Device without display-list support
    pub fn new() -> Self {
        Self::default()
    }

    /// Device that supports display lists
    pub fn with_display_lists() -> Self {
        Self {
            display_lists: true,
            ..Self::default()
        }
    }

    /// Refuse to bind the named material
    pub fn reject_material(&mut self, name: impl Into<String>) {
        self.rejected.insert(name.into());
    }

    /// Make every draw call fail
    pub fn fail_draws(&mut self, fail: bool) {
        self.failing_draws = fail;
    }

    /// Recorded commands in call order
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the log empty
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Slots drawn, in draw order
    pub fn drawn_slots(&self) -> Vec<MeshSlotId> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DeviceCommand::Draw { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect()
    }

    /// Display lists created and not yet released
    pub fn live_display_lists(&self) -> usize {
        self.live_lists.len()
    }

    /// Current push/pop nesting
    pub fn matrix_depth(&self) -> usize {
        self.matrix_depth
    }

    fn draw(&mut self, draw: &DrawRequest<'_>, text: bool) -> BucketResult<()> {
        if self.failing_draws {
            return Err(BucketError::Device(format!("draw of slot {:?} refused", draw.slot)));
        }
        self.commands.push(DeviceCommand::Draw {
            slot: draw.slot,
            array: draw.array.id(),
            list: draw.display_list,
            text,
        });
        Ok(())
    }
}

impl RasterizerDevice for RecordingDevice {
    fn bind_primitives(&mut self, array: &DisplayArray) {
        self.commands.push(DeviceCommand::BindPrimitives(array.id()));
    }

    fn unbind_primitives(&mut self, array: &DisplayArray) {
        self.commands.push(DeviceCommand::UnbindPrimitives(array.id()));
    }

    fn push_matrix(&mut self) {
        self.matrix_depth += 1;
        self.commands.push(DeviceCommand::PushMatrix);
    }

    fn pop_matrix(&mut self) {
        self.matrix_depth = self.matrix_depth.saturating_sub(1);
        self.commands.push(DeviceCommand::PopMatrix);
    }

    fn apply_transform(&mut self, transform: &Mat4, _flags: MaterialFlags) {
        self.commands.push(DeviceCommand::ApplyTransform(*transform));
    }

    fn set_material(&mut self, material: &dyn PolyMaterial) -> bool {
        if self.rejected.contains(material.name()) {
            return false;
        }
        if self.current_pass >= material.pass_count() {
            self.current_pass = 0;
            return false;
        }
        self.current_pass += 1;
        self.commands.push(DeviceCommand::SetMaterial {
            name: material.name().to_string(),
            pass: self.current_pass,
        });
        true
    }

    fn process_lighting(&mut self, use_lights: bool, _camera: &CameraTransform) {
        self.commands.push(DeviceCommand::ProcessLighting(use_lights));
    }

    fn set_depth_mask(&mut self, mask: DepthMask) {
        self.commands.push(DeviceCommand::SetDepthMask(mask));
    }

    fn clear_caching_info(&mut self) {
        self.current_pass = 0;
        self.commands.push(DeviceCommand::ClearCachingInfo);
    }

    fn set_client_object(&mut self, client: Option<ClientObjectId>) {
        self.commands.push(DeviceCommand::SetClientObject(client));
    }

    fn set_object_color(&mut self, color: &Vec4) {
        self.commands.push(DeviceCommand::SetObjectColor(*color));
    }

    fn supports_display_lists(&self) -> bool {
        self.display_lists
    }

    fn create_display_list(&mut self) -> DisplayListId {
        self.next_list += 1;
        let id = DisplayListId(self.next_list);
        self.live_lists.insert(id);
        self.commands.push(DeviceCommand::CreateDisplayList(id));
        id
    }

    fn release_display_list(&mut self, list: DisplayListId) {
        self.live_lists.remove(&list);
        self.commands.push(DeviceCommand::ReleaseDisplayList(list));
    }

    fn index_primitives(&mut self, draw: &DrawRequest<'_>) -> BucketResult<()> {
        self.draw(draw, false)
    }

    fn index_primitives_3d_text(
        &mut self,
        draw: &DrawRequest<'_>,
        _material: &dyn PolyMaterial,
    ) -> BucketResult<()> {
        self.draw(draw, true)
    }
}

//! Per-frame bucket rendering statistics

use std::ops::AddAssign;

use crate::render::device::DisplayListOp;

/// Counters collected while rendering one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Slots drawn in the solid pass
    pub solid_slots: usize,

    /// Slots drawn in the alpha pass
    pub alpha_slots: usize,

    /// Material passes issued across all slots
    pub material_passes: usize,

    /// Display lists recorded this frame
    pub display_lists_compiled: usize,

    /// Display lists replayed this frame
    pub display_lists_replayed: usize,

    /// Meshes whose modified flag was cleared at the end of the frame
    pub meshes_reset: usize,
}

impl FrameStats {
    /// Count one drawn material pass
    pub fn record_pass(&mut self, op: DisplayListOp) {
        self.material_passes += 1;
        match op {
            DisplayListOp::Immediate => {}
            DisplayListOp::Compile(_) => self.display_lists_compiled += 1,
            DisplayListOp::Replay(_) => self.display_lists_replayed += 1,
        }
    }

    /// Slots drawn in both passes
    pub fn total_slots(&self) -> usize {
        self.solid_slots + self.alpha_slots
    }

    /// Share of passes served from a display list
    pub fn replay_ratio(&self) -> f32 {
        if self.material_passes == 0 {
            0.0
        } else {
            self.display_lists_replayed as f32 / self.material_passes as f32
        }
    }
}

impl AddAssign for FrameStats {
    fn add_assign(&mut self, other: Self) {
        self.solid_slots += other.solid_slots;
        self.alpha_slots += other.alpha_slots;
        self.material_passes += other.material_passes;
        self.display_lists_compiled += other.display_lists_compiled;
        self.display_lists_replayed += other.display_lists_replayed;
        self.meshes_reset += other.meshes_reset;
    }
}

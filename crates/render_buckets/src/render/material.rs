//! Material capability interface
//!
//! Buckets only see materials through [`PolyMaterial`]. Concrete material
//! types live with the engine; [`StandardMaterial`] is the plain
//! parameter-driven implementation.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::foundation::math::Vec4;
use crate::render::context::DrawingMode;
use crate::render::device::RasterizerDevice;
use crate::render::mesh_slot::MeshSlot;

bitflags! {
    /// Render behavior flags of a material
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFlags: u32 {
        /// Alpha blended, drawn in the transparent pass
        const ALPHA = 1 << 0;
        /// Polygons need per-frame depth sorting
        const ZSORT = 1 << 1;
        /// Rendered into shadow maps
        const CASTS_SHADOWS = 1 << 2;
        /// Only rendered into shadow maps
        const ONLY_SHADOW = 1 << 3;
        /// Honors per-object color overrides
        const OBJECT_COLOR = 1 << 4;
        /// Face-text material
        const TEXT_3D = 1 << 5;
        /// Lit by scene lights
        const USE_LIGHTING = 1 << 6;
    }
}

/// Capability set the bucket renderer needs from a material
pub trait PolyMaterial: fmt::Debug {
    /// Name for debugging
    fn name(&self) -> &str;

    /// Behavior flags
    fn flags(&self) -> MaterialFlags;

    /// Value equality with another material of any concrete type
    fn same_material(&self, other: &dyn PolyMaterial) -> bool;

    /// Concrete type access for [`Self::same_material`]
    fn as_any(&self) -> &dyn Any;

    /// Whether scene lights apply in the given pass
    fn uses_lighting(&self, mode: DrawingMode) -> bool {
        self.flags().contains(MaterialFlags::USE_LIGHTING) && !mode.is_shadow()
    }

    /// Number of passes the device should draw with this material
    fn pass_count(&self) -> u32 {
        1
    }

    /// Bind slot-specific shader inputs before a slot is drawn
    fn activate_mesh_slot(&self, slot: &MeshSlot, device: &mut dyn RasterizerDevice) {
        if self.uses_object_color() {
            if let Some(color) = slot.object_color() {
                device.set_object_color(color);
            }
        }
    }

    /// Free GPU-side material resources
    fn release_material(&self) {}

    /// Alpha blended
    fn is_alpha(&self) -> bool {
        self.flags().contains(MaterialFlags::ALPHA)
    }

    /// Polygon depth sorting required
    fn is_zsort(&self) -> bool {
        self.flags().contains(MaterialFlags::ZSORT)
    }

    /// Drawn into shadow maps
    fn casts_shadows(&self) -> bool {
        self.flags().contains(MaterialFlags::CASTS_SHADOWS)
    }

    /// Drawn only into shadow maps
    fn only_shadow(&self) -> bool {
        self.flags().contains(MaterialFlags::ONLY_SHADOW)
    }

    /// Honors per-object color
    fn uses_object_color(&self) -> bool {
        self.flags().contains(MaterialFlags::OBJECT_COLOR)
    }

    /// Face-text material
    fn is_text(&self) -> bool {
        self.flags().contains(MaterialFlags::TEXT_3D)
    }
}

/// Shared material reference; buckets never own the material
pub type MaterialRef = Rc<dyn PolyMaterial>;

/// Identity comparison between material references
pub fn same_instance(a: &MaterialRef, b: &MaterialRef) -> bool {
    Rc::ptr_eq(a, b)
}

/// Parameter-driven material
#[derive(Debug, Clone)]
pub struct StandardMaterial {
    /// Optional name for debugging
    pub name: String,
    /// Behavior flags
    pub flags: MaterialFlags,
    /// Base color (RGBA)
    pub base_color: Vec4,
    /// Number of draw passes
    pub passes: u32,
    releases: Cell<u32>,
}

impl StandardMaterial {
    /// Opaque, lit, shadow-casting material
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: MaterialFlags::USE_LIGHTING | MaterialFlags::CASTS_SHADOWS,
            base_color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            passes: 1,
            releases: Cell::new(0),
        }
    }

    /// Alpha-blended variant
    pub fn transparent(name: impl Into<String>) -> Self {
        Self::new(name).with_flags(MaterialFlags::ALPHA | MaterialFlags::USE_LIGHTING)
    }

    /// Replace the flags
    pub fn with_flags(mut self, flags: MaterialFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the base color
    pub fn with_color(mut self, r: f32, g: f32, b: f32, a: f32) -> Self {
        self.base_color = Vec4::new(r, g, b, a);
        self
    }

    /// Set the number of passes (at least one)
    pub fn with_passes(mut self, passes: u32) -> Self {
        self.passes = passes.max(1);
        self
    }

    /// Wrap into a shared reference
    pub fn into_ref(self) -> MaterialRef {
        Rc::new(self)
    }

    /// How many times [`PolyMaterial::release_material`] was called
    pub fn release_count(&self) -> u32 {
        self.releases.get()
    }
}

impl PartialEq for StandardMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.flags == other.flags
            && self.base_color == other.base_color
            && self.passes == other.passes
    }
}

impl PolyMaterial for StandardMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> MaterialFlags {
        self.flags
    }

    fn same_material(&self, other: &dyn PolyMaterial) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn pass_count(&self) -> u32 {
        self.passes
    }

    fn release_material(&self) {
        self.releases.set(self.releases.get() + 1);
        log::debug!("Released material resources for '{}'", self.name);
    }
}

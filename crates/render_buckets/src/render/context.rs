//! Per-pass render context
//!
//! The drawing mode travels with every render call instead of being read
//! back from device state.

use crate::foundation::math::CameraTransform;

/// Kind of pass being drawn, ordered from cheapest to richest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DrawingMode {
    /// Bounding boxes only
    BoundingBox,
    /// Wireframe
    Wireframe,
    /// Flat solid shading
    Solid,
    /// Lit shading
    Shaded,
    /// Fully textured
    #[default]
    Textured,
    /// Shadow-map generation
    Shadow,
}

impl DrawingMode {
    /// Whether this is a shadow-map pass
    pub fn is_shadow(self) -> bool {
        self == Self::Shadow
    }

    /// Whether per-polygon depth sorting applies in this mode
    pub fn sorts_polygons(self) -> bool {
        self >= Self::Solid && !self.is_shadow()
    }
}

/// Depth buffer write state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthMask {
    /// Depth writes on
    Enabled,
    /// Depth writes off
    Disabled,
}

/// Camera and pass state handed down the render call chain
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderContext {
    /// World-to-camera transform
    pub camera: CameraTransform,
    /// Pass being drawn
    pub mode: DrawingMode,
}

impl RenderContext {
    /// Create a context for one pass
    pub fn new(camera: CameraTransform, mode: DrawingMode) -> Self {
        Self { camera, mode }
    }

    /// Whether this context draws a shadow map
    pub fn is_shadow_pass(&self) -> bool {
        self.mode.is_shadow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_sorting_modes() {
        assert!(!DrawingMode::Wireframe.sorts_polygons());
        assert!(DrawingMode::Solid.sorts_polygons());
        assert!(DrawingMode::Textured.sorts_polygons());
        assert!(!DrawingMode::Shadow.sorts_polygons());
    }

    #[test]
    fn test_default_context_is_textured() {
        let ctx = RenderContext::default();
        assert_eq!(ctx.mode, DrawingMode::Textured);
        assert!(!ctx.is_shadow_pass());
    }
}

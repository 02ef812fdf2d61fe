//! Math utilities and types
//!
//! Provides the matrix and vector aliases used by the bucket renderer, and
//! the camera transform that defines the view-depth axis for sorting.

pub use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type (colors are RGBA in this form)
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Translation stored in the last column of a world matrix
pub fn translation_of(matrix: &Mat4) -> Point3 {
    Point3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)])
}

/// World-to-camera transform: a rotation/scale basis plus an origin.
///
/// The third row of `basis` is the camera's view direction. Projecting a
/// world position onto it yields the depth used to order transparent
/// geometry; the constant plane offset is left out since it never changes
/// the ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    /// Rotation and scale part
    pub basis: Mat3,
    /// Translation part
    pub origin: Vec3,
}

impl Default for CameraTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl CameraTransform {
    /// Identity camera: view axis is world +Z
    pub fn identity() -> Self {
        Self {
            basis: Mat3::identity(),
            origin: Vec3::zeros(),
        }
    }

    /// Create a camera transform from its parts
    pub fn new(basis: Mat3, origin: Vec3) -> Self {
        Self { basis, origin }
    }

    /// Homogeneous 4x4 form
    pub fn to_matrix(&self) -> Mat4 {
        let mut matrix = self.basis.to_homogeneous();
        matrix[(0, 3)] = self.origin.x;
        matrix[(1, 3)] = self.origin.y;
        matrix[(2, 3)] = self.origin.z;
        matrix
    }

    /// View direction: the third row of the basis
    pub fn view_axis(&self) -> Vec3 {
        self.basis.row(2).transpose()
    }

    /// Depth of a world-space point along the view axis
    pub fn depth_of(&self, point: &Point3) -> f32 {
        self.view_axis().dot(&point.coords)
    }

    /// Combined model-view matrix for an object placed with `world`
    pub fn model_view(&self, world: &Mat4) -> Mat4 {
        self.to_matrix() * world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_translation_of_reads_last_column() {
        let matrix = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(translation_of(&matrix), Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_identity_camera_depth_is_z() {
        let camera = CameraTransform::identity();
        assert_relative_eq!(camera.depth_of(&Point3::new(4.0, -2.0, 7.5)), 7.5, epsilon = EPSILON);
    }

    #[test]
    fn test_view_axis_is_third_basis_row() {
        let basis = Mat3::new(
            1.0, 0.0, 0.0,
            0.0, 0.0, 1.0,
            0.0, 1.0, 0.0,
        );
        let camera = CameraTransform::new(basis, Vec3::zeros());
        assert_relative_eq!(camera.view_axis(), Vec3::new(0.0, 1.0, 0.0), epsilon = EPSILON);
        assert_relative_eq!(camera.depth_of(&Point3::new(9.0, 3.0, -4.0)), 3.0, epsilon = EPSILON);
    }

    #[test]
    fn test_model_view_applies_world_then_camera() {
        let camera = CameraTransform::new(Mat3::identity(), Vec3::new(0.0, 0.0, -5.0));
        let world = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));

        let in_view = camera.model_view(&world).transform_point(&Point3::origin());
        assert_relative_eq!(in_view, Point3::new(1.0, 2.0, -2.0), epsilon = EPSILON);
    }
}

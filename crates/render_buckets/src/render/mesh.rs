//! Mesh data consumed by the buckets
//!
//! [`MeshObject`] is the shared mesh a slot instantiates, [`DisplayArray`]
//! the vertex/index buffer drawn for it, and [`Deformer`] the optional
//! skinning or shape-key stage applied before drawing.

use std::cell::Cell;
use std::fmt;

use bitflags::bitflags;

use crate::foundation::collections::next_unique_id;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::material::PolyMaterial;

bitflags! {
    /// Change tracking flags of a mesh object
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MeshModified: u32 {
        /// Geometry changed since the last completed frame
        const MESH_MODIFIED = 1 << 0;
    }
}

/// Shared mesh referenced by any number of slots
#[derive(Debug)]
pub struct MeshObject {
    name: String,
    modified: Cell<MeshModified>,
}

impl MeshObject {
    /// New meshes start modified so their first draw builds fresh caches
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modified: Cell::new(MeshModified::MESH_MODIFIED),
        }
    }

    /// Mesh name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current change flags
    pub fn modified_flag(&self) -> MeshModified {
        self.modified.get()
    }

    /// Replace the change flags
    pub fn set_modified_flag(&self, flags: MeshModified) {
        self.modified.set(flags);
    }

    /// Whether geometry changed since the last completed frame
    pub fn is_modified(&self) -> bool {
        self.modified.get().contains(MeshModified::MESH_MODIFIED)
    }

    /// Flag the geometry as changed
    pub fn mark_modified(&self) {
        self.modified.set(self.modified.get() | MeshModified::MESH_MODIFIED);
    }
}

/// Vertex layout of a display array
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Object-space normal
    pub normal: [f32; 3],
    /// Texture coordinates
    pub uv: [f32; 2],
    /// Vertex color (RGBA)
    pub color: [f32; 4],
}

impl Vertex {
    /// Vertex with only a position; normal points up +Z, color is white
    pub fn new(position: [f32; 3]) -> Self {
        Self {
            position,
            normal: [0.0, 0.0, 1.0],
            uv: [0.0, 0.0],
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Identity of a display array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayArrayId(u64);

/// Vertex and triangle index buffer
///
/// Arrays are not `Clone`: every copy is a distinct buffer with its own id,
/// made through [`DisplayArray::duplicate`].
#[derive(Debug, PartialEq)]
pub struct DisplayArray {
    id: DisplayArrayId,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl DisplayArray {
    /// Create an array from vertices and triangle indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            id: DisplayArrayId(next_unique_id()),
            vertices,
            indices,
        }
    }

    /// Identity of this buffer
    pub fn id(&self) -> DisplayArrayId {
        self.id
    }

    /// Vertex data
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Triangle indices, three per triangle
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of complete triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Deep copy under a new identity
    pub fn duplicate(&self) -> Self {
        Self::new(self.vertices.clone(), self.indices.clone())
    }

    /// Reorder triangles back-to-front for the given model-view matrix.
    ///
    /// Depth is the triangle centroid projected on the third row of
    /// `model_view`, matching the convention of the bucket ordering. Equal
    /// depths keep their previous relative order. A trailing partial
    /// triangle is left in place.
    pub fn sort_polygons(&mut self, model_view: &Mat4) {
        let row = Vec3::new(model_view[(2, 0)], model_view[(2, 1)], model_view[(2, 2)]);
        let complete = self.triangle_count() * 3;

        let mut triangles: Vec<(f32, [u32; 3])> = self.indices[..complete]
            .chunks_exact(3)
            .map(|tri| {
                let centroid = tri
                    .iter()
                    .filter_map(|&index| self.vertices.get(index as usize))
                    .map(|vertex| Vec3::from(vertex.position))
                    .sum::<Vec3>()
                    / 3.0;
                (row.dot(&centroid), [tri[0], tri[1], tri[2]])
            })
            .collect();

        triangles.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (slot, (_, tri)) in self.indices[..complete].chunks_exact_mut(3).zip(triangles) {
            slot.copy_from_slice(&tri);
        }
    }
}

/// Vertex deformation stage attached to a mesh slot
pub trait Deformer: fmt::Debug {
    /// Update deformed vertices for drawing with `material`
    ///
    /// Returns whether vertices changed.
    fn apply(&self, material: &dyn PolyMaterial) -> bool;

    /// Whether the deformation changes every frame
    fn is_dynamic(&self) -> bool;

    /// Whether vertices are already in world space
    fn skip_vertex_transform(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_at_depths(near: f32, far: f32) -> DisplayArray {
        let vertices = vec![
            Vertex::new([0.0, 0.0, near]),
            Vertex::new([1.0, 0.0, near]),
            Vertex::new([0.0, 1.0, near]),
            Vertex::new([0.0, 0.0, far]),
            Vertex::new([1.0, 0.0, far]),
            Vertex::new([0.0, 1.0, far]),
        ];
        DisplayArray::new(vertices, vec![0, 1, 2, 3, 4, 5])
    }

    #[test]
    fn test_mesh_starts_modified() {
        let mesh = MeshObject::new("cube");
        assert!(mesh.is_modified());

        mesh.set_modified_flag(MeshModified::empty());
        assert!(!mesh.is_modified());

        mesh.mark_modified();
        assert_eq!(mesh.modified_flag(), MeshModified::MESH_MODIFIED);
    }

    #[test]
    fn test_duplicate_has_new_identity() {
        let array = quad_at_depths(1.0, 2.0);
        let copy = array.duplicate();
        assert_ne!(array.id(), copy.id());
        assert_eq!(array.vertices(), copy.vertices());
        assert_eq!(array.indices(), copy.indices());
    }

    #[test]
    fn test_sort_polygons_back_to_front() {
        let mut array = quad_at_depths(1.0, 5.0);
        array.sort_polygons(&Mat4::identity());
        assert_eq!(array.indices(), &[3, 4, 5, 0, 1, 2]);
    }

    #[test]
    fn test_sort_polygons_uses_model_view() {
        // Mirror Z: the triangle at z = 1 is now the farther one
        let mut array = quad_at_depths(1.0, 5.0);
        let mirror = Mat4::new_nonuniform_scaling(&Vec3::new(1.0, 1.0, -1.0));
        array.sort_polygons(&mirror);
        assert_eq!(array.indices(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_sort_keeps_partial_triangle() {
        let mut array = DisplayArray::new(
            vec![
                Vertex::new([0.0, 0.0, 0.0]),
                Vertex::new([0.0, 0.0, 3.0]),
            ],
            vec![0, 0, 0, 1, 1, 1, 0],
        );
        array.sort_polygons(&Mat4::identity());
        assert_eq!(array.indices(), &[1, 1, 1, 0, 0, 0, 0]);
    }
}

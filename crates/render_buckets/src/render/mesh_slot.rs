//! Mesh slots: one placed instance of a mesh
//!
//! A slot is owned by exactly one material bucket. It carries the world
//! transform, references to the shared mesh and geometry, and the per-slot
//! display-list cache.

use std::rc::Rc;

use crate::foundation::collections::next_unique_id;
use crate::foundation::math::{translation_of, Mat4, Point3, Vec4};
use crate::render::buckets::DisplayArrayBucketHandle;
use crate::render::device::{ClientObjectId, DisplayListId, DisplayListOp, RasterizerDevice};
use crate::render::mesh::{Deformer, MeshObject};

/// Process-unique slot identity; later slots compare greater
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshSlotId(u64);

impl MeshSlotId {
    fn next() -> Self {
        Self(next_unique_id())
    }
}

/// Display list cached for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayList {
    /// Device handle
    pub id: DisplayListId,
    /// Set once the source mesh changed after compilation
    pub modified: bool,
}

/// Where a slot stands in the display-list cache cycle
///
/// `NoList → Eligible → Cached → Stale → Eligible`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayListState {
    /// Slot may not be cached this frame
    NoList,
    /// Slot may be cached but has no list yet
    Eligible,
    /// Up-to-date list available for replay
    Cached,
    /// List exists but the mesh changed since it was compiled
    Stale,
}

/// One renderable instance
#[derive(Debug)]
pub struct MeshSlot {
    id: MeshSlotId,
    transform: Mat4,
    mesh: Rc<MeshObject>,
    deformer: Option<Rc<dyn Deformer>>,
    display_array_bucket: Option<DisplayArrayBucketHandle>,
    display_list: Option<DisplayList>,
    use_display_list: bool,
    culled: bool,
    object_color: Option<Vec4>,
    derived_mesh: bool,
    client_object: Option<ClientObjectId>,
}

impl MeshSlot {
    pub(crate) fn new(mesh: Rc<MeshObject>) -> Self {
        Self {
            id: MeshSlotId::next(),
            transform: Mat4::identity(),
            mesh,
            deformer: None,
            display_array_bucket: None,
            display_list: None,
            use_display_list: true,
            culled: true,
            object_color: None,
            derived_mesh: false,
            client_object: None,
        }
    }

    /// Copy for instance replication.
    ///
    /// The copy gets its own id, takes another reference on the display
    /// array bucket, and starts without a display list.
    pub(crate) fn replicate(&self) -> Self {
        Self {
            id: MeshSlotId::next(),
            transform: self.transform,
            mesh: Rc::clone(&self.mesh),
            deformer: self.deformer.clone(),
            display_array_bucket: self.display_array_bucket.as_ref().map(DisplayArrayBucketHandle::add_ref),
            display_list: None,
            use_display_list: true,
            culled: self.culled,
            object_color: self.object_color,
            derived_mesh: self.derived_mesh,
            client_object: self.client_object,
        }
    }

    /// Slot identity
    pub fn id(&self) -> MeshSlotId {
        self.id
    }

    /// World transform (column-major, translation in the last column)
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// Set the world transform
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    /// World position used for depth ordering
    pub fn world_position(&self) -> Point3 {
        translation_of(&self.transform)
    }

    /// Mesh this slot instantiates
    pub fn mesh(&self) -> &Rc<MeshObject> {
        &self.mesh
    }

    /// Attached deformer
    pub fn deformer(&self) -> Option<&Rc<dyn Deformer>> {
        self.deformer.as_ref()
    }

    /// Attach or detach a deformer
    pub fn set_deformer(&mut self, deformer: Option<Rc<dyn Deformer>>) {
        self.deformer = deformer;
    }

    /// Geometry bucket this slot draws from
    pub fn display_array_bucket(&self) -> Option<&DisplayArrayBucketHandle> {
        self.display_array_bucket.as_ref()
    }

    /// Replace the geometry bucket, returning the previous handle
    pub fn set_display_array_bucket(
        &mut self,
        bucket: Option<DisplayArrayBucketHandle>,
    ) -> Option<DisplayArrayBucketHandle> {
        std::mem::replace(&mut self.display_array_bucket, bucket)
    }

    /// Cached display list
    pub fn display_list(&self) -> Option<&DisplayList> {
        self.display_list.as_ref()
    }

    /// Position in the display-list cycle
    pub fn display_list_state(&self) -> DisplayListState {
        if !self.use_display_list {
            return DisplayListState::NoList;
        }
        match self.display_list {
            None => DisplayListState::Eligible,
            Some(list) if list.modified || self.mesh.is_modified() => DisplayListState::Stale,
            Some(_) => DisplayListState::Cached,
        }
    }

    /// Whether culling left this slot out of the current frame
    pub fn is_culled(&self) -> bool {
        self.culled
    }

    /// Set the culled flag
    pub fn set_culled(&mut self, culled: bool) {
        self.culled = culled;
    }

    /// Per-object color override
    pub fn object_color(&self) -> Option<&Vec4> {
        self.object_color.as_ref()
    }

    /// Set or clear the per-object color override
    pub fn set_object_color(&mut self, color: Option<Vec4>) {
        self.object_color = color;
    }

    /// Whether the geometry is derived outside the display array
    pub fn is_derived_mesh(&self) -> bool {
        self.derived_mesh
    }

    /// Mark the geometry as derived
    pub fn set_derived_mesh(&mut self, derived: bool) {
        self.derived_mesh = derived;
    }

    /// Client identifier forwarded to the device
    pub fn client_object(&self) -> Option<ClientObjectId> {
        self.client_object
    }

    /// Set the client identifier
    pub fn set_client_object(&mut self, client: Option<ClientObjectId>) {
        self.client_object = client;
    }

    /// Advance the display-list cache for one draw and pick the draw path
    pub(crate) fn prepare_display_list(
        &mut self,
        eligible: bool,
        device: &mut dyn RasterizerDevice,
    ) -> DisplayListOp {
        self.use_display_list = eligible;
        // Mesh changes count against the list even on immediate-mode frames
        if let Some(list) = self.display_list.as_mut() {
            list.modified |= self.mesh.is_modified();
        }
        if !eligible || !device.supports_display_lists() {
            return DisplayListOp::Immediate;
        }

        match self.display_list {
            Some(list) if !list.modified => DisplayListOp::Replay(list.id),
            stale => {
                if let Some(list) = stale {
                    device.release_display_list(list.id);
                }
                let id = device.create_display_list();
                self.display_list = Some(DisplayList { id, modified: false });
                DisplayListOp::Compile(id)
            }
        }
    }

    /// Drop the cached list, returning its handle
    pub(crate) fn take_display_list(&mut self) -> Option<DisplayListId> {
        self.display_list.take().map(|list| list.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::buckets::display_array_bucket::DisplayArrayRegistry;
    use crate::render::mesh::{DisplayArray, MeshModified, Vertex};
    use crate::render::recording::RecordingDevice;

    fn slot_with_geometry(registry: &Rc<DisplayArrayRegistry>) -> MeshSlot {
        let mut slot = MeshSlot::new(Rc::new(MeshObject::new("mesh")));
        let array = DisplayArray::new(vec![Vertex::new([0.0, 0.0, 0.0])], vec![0, 0, 0]);
        slot.set_display_array_bucket(Some(DisplayArrayBucketHandle::new(registry, array)));
        slot
    }

    #[test]
    fn test_new_slot_defaults() {
        let slot = MeshSlot::new(Rc::new(MeshObject::new("mesh")));
        assert!(slot.is_culled());
        assert_eq!(slot.transform(), &Mat4::identity());
        assert!(slot.display_array_bucket().is_none());
        assert_eq!(slot.display_list_state(), DisplayListState::Eligible);
    }

    #[test]
    fn test_replicate_shares_geometry_not_lists() {
        let registry = Rc::new(DisplayArrayRegistry::default());
        let mut slot = slot_with_geometry(&registry);
        slot.set_transform(Mat4::new_translation(&Vec3::new(0.0, 0.0, 2.0)));
        slot.set_client_object(Some(ClientObjectId(7)));

        let mut device = RecordingDevice::with_display_lists();
        assert!(matches!(slot.prepare_display_list(true, &mut device), DisplayListOp::Compile(_)));

        let copy = slot.replicate();
        assert!(copy.id() > slot.id());
        assert!(copy.display_list().is_none());
        assert_eq!(copy.world_position(), slot.world_position());
        assert_eq!(copy.client_object(), Some(ClientObjectId(7)));
        assert!(Rc::ptr_eq(copy.mesh(), slot.mesh()));

        let shared = copy.display_array_bucket().map(DisplayArrayBucketHandle::ref_count);
        assert_eq!(shared, Some(2));
    }

    #[test]
    fn test_device_without_lists_draws_immediately() {
        let registry = Rc::new(DisplayArrayRegistry::default());
        let mut slot = slot_with_geometry(&registry);
        let mut device = RecordingDevice::new();

        assert_eq!(slot.prepare_display_list(true, &mut device), DisplayListOp::Immediate);
        assert!(slot.display_list().is_none());
        assert_eq!(device.live_display_lists(), 0);
    }

    #[test]
    fn test_ineligible_slot_keeps_cached_list() {
        let registry = Rc::new(DisplayArrayRegistry::default());
        let mut slot = slot_with_geometry(&registry);
        let mut device = RecordingDevice::with_display_lists();

        slot.prepare_display_list(true, &mut device);
        slot.mesh().set_modified_flag(MeshModified::empty());
        assert_eq!(slot.prepare_display_list(false, &mut device), DisplayListOp::Immediate);
        assert_eq!(slot.display_list_state(), DisplayListState::NoList);

        // Becoming eligible again replays the list recorded earlier
        assert!(matches!(slot.prepare_display_list(true, &mut device), DisplayListOp::Replay(_)));
        assert_eq!(slot.take_display_list(), Some(DisplayListId(1)));
    }

    #[test]
    fn test_change_while_ineligible_recompiles() {
        let registry = Rc::new(DisplayArrayRegistry::default());
        let mut slot = slot_with_geometry(&registry);
        let mut device = RecordingDevice::with_display_lists();

        assert_eq!(
            slot.prepare_display_list(true, &mut device),
            DisplayListOp::Compile(DisplayListId(1))
        );
        slot.mesh().set_modified_flag(MeshModified::empty());

        // The mesh changes in a frame that draws immediately
        slot.mesh().mark_modified();
        assert_eq!(slot.prepare_display_list(false, &mut device), DisplayListOp::Immediate);
        slot.mesh().set_modified_flag(MeshModified::empty());

        assert_eq!(
            slot.prepare_display_list(true, &mut device),
            DisplayListOp::Compile(DisplayListId(2))
        );
        assert_eq!(device.live_display_lists(), 1);
        assert_eq!(slot.display_list_state(), DisplayListState::Cached);
    }
}

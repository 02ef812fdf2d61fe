//! Reference-counted geometry buckets
//!
//! A [`DisplayArrayBucketHandle`] binds one [`DisplayArray`] to the material
//! bucket that created it. Mesh slots hold strong handles; the material
//! bucket only keeps weak entries in its [`DisplayArrayRegistry`], so no
//! reference cycle exists between a bucket and its slots.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use crate::foundation::collections::MeshSlotKey;
use crate::render::mesh::{DisplayArray, DisplayArrayId};

use super::BucketId;

/// Weak list of the display array buckets a material bucket knows about
#[derive(Debug, Default)]
pub(crate) struct DisplayArrayRegistry {
    entries: RefCell<Vec<Weak<DisplayArrayBucketInner>>>,
}

impl DisplayArrayRegistry {
    fn register(&self, inner: &Rc<DisplayArrayBucketInner>) -> bool {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|entry| entry.strong_count() > 0);
        if entries.iter().any(|entry| std::ptr::eq(entry.as_ptr(), Rc::as_ptr(inner))) {
            return false;
        }
        entries.push(Rc::downgrade(inner));
        true
    }

    fn unregister(&self, inner: &Rc<DisplayArrayBucketInner>) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|entry| !std::ptr::eq(entry.as_ptr(), Rc::as_ptr(inner)));
        before != entries.len()
    }

    fn prune(&self) {
        // Skipped when the registry is already borrowed; dead entries are
        // filtered on every read anyway.
        if let Ok(mut entries) = self.entries.try_borrow_mut() {
            entries.retain(|entry| entry.strong_count() > 0);
        }
    }

    /// Add an existing bucket; returns false if it was already present
    pub(crate) fn add(&self, handle: &DisplayArrayBucketHandle) -> bool {
        self.register(&handle.0)
    }

    /// Remove a bucket; returns false if it was not present
    pub(crate) fn remove(&self, handle: &DisplayArrayBucketHandle) -> bool {
        self.unregister(&handle.0)
    }

    /// Strong handles to every live bucket, in registration order
    pub(crate) fn live(&self) -> Vec<DisplayArrayBucketHandle> {
        self.entries
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .map(DisplayArrayBucketHandle)
            .collect()
    }

    /// Handle to the live bucket wrapping the array with `id`
    pub(crate) fn find(&self, id: DisplayArrayId) -> Option<DisplayArrayBucketHandle> {
        self.entries
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .find(|inner| inner.display_array.borrow().id() == id)
            .map(DisplayArrayBucketHandle)
    }

    /// Number of live buckets
    pub(crate) fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }
}

#[derive(Debug)]
struct DisplayArrayBucketInner {
    registry: Weak<DisplayArrayRegistry>,
    display_array: RefCell<DisplayArray>,
    active_mesh_slots: RefCell<Vec<(BucketId, MeshSlotKey)>>,
}

impl Drop for DisplayArrayBucketInner {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.prune();
        }
        log::trace!(
            "Destroyed display array bucket for array {:?}",
            self.display_array.get_mut().id()
        );
    }
}

/// Counted handle to a display array bucket
///
/// Every handle is one reference. [`Self::add_ref`] makes another,
/// [`Self::release`] (or dropping) gives one up; the geometry is freed with
/// the last handle, after the bucket has left its parent registry.
#[derive(Debug)]
pub struct DisplayArrayBucketHandle(Rc<DisplayArrayBucketInner>);

impl DisplayArrayBucketHandle {
    /// Create with one reference and register in `registry`
    pub(crate) fn new(registry: &Rc<DisplayArrayRegistry>, display_array: DisplayArray) -> Self {
        let inner = Rc::new(DisplayArrayBucketInner {
            registry: Rc::downgrade(registry),
            display_array: RefCell::new(display_array),
            active_mesh_slots: RefCell::new(Vec::new()),
        });
        registry.register(&inner);
        log::trace!(
            "Created display array bucket for array {:?}",
            inner.display_array.borrow().id()
        );
        Self(inner)
    }

    /// Take another reference
    pub fn add_ref(&self) -> Self {
        Self(Rc::clone(&self.0))
    }

    /// Give up this reference, returning how many remain
    ///
    /// A result of zero means the bucket and its geometry were destroyed.
    pub fn release(self) -> usize {
        let remaining = Rc::strong_count(&self.0) - 1;
        drop(self);
        remaining
    }

    /// Number of live handles
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Independent copy for object duplication
    ///
    /// The copy has one reference, an empty active set and its own deep
    /// copy of the geometry, and is registered with the same parent.
    pub fn replica(&self) -> Self {
        let display_array = self.0.display_array.borrow().duplicate();
        let inner = Rc::new(DisplayArrayBucketInner {
            registry: Weak::clone(&self.0.registry),
            display_array: RefCell::new(display_array),
            active_mesh_slots: RefCell::new(Vec::new()),
        });
        if let Some(registry) = inner.registry.upgrade() {
            registry.register(&inner);
        }
        Self(inner)
    }

    /// Queue a slot of `bucket` for drawing this frame
    pub fn activate_mesh(&self, bucket: BucketId, key: MeshSlotKey) {
        self.0.active_mesh_slots.borrow_mut().push((bucket, key));
    }

    /// Drop a slot from the queue
    pub fn deactivate_mesh(&self, bucket: BucketId, key: MeshSlotKey) {
        self.0
            .active_mesh_slots
            .borrow_mut()
            .retain(|&entry| entry != (bucket, key));
    }

    /// Slots of `bucket` queued this frame, in activation order
    pub fn active_mesh_slots(&self, bucket: BucketId) -> Vec<MeshSlotKey> {
        self.0
            .active_mesh_slots
            .borrow()
            .iter()
            .filter(|(owner, _)| *owner == bucket)
            .map(|&(_, key)| key)
            .collect()
    }

    /// Number of queued slots across all buckets
    pub fn num_active_mesh_slots(&self) -> usize {
        self.0.active_mesh_slots.borrow().len()
    }

    /// Clear the queue
    pub fn remove_active_mesh_slots(&self) {
        self.0.active_mesh_slots.borrow_mut().clear();
    }

    /// Drain the slots of `bucket` from the queue
    pub(crate) fn take_active_mesh_slots(&self, bucket: BucketId) -> Vec<MeshSlotKey> {
        let mut active = self.0.active_mesh_slots.borrow_mut();
        let mut taken = Vec::new();
        active.retain(|&(owner, key)| {
            if owner == bucket {
                taken.push(key);
                false
            } else {
                true
            }
        });
        taken
    }

    /// Borrow the geometry
    pub fn display_array(&self) -> Ref<'_, DisplayArray> {
        self.0.display_array.borrow()
    }

    pub(crate) fn display_array_mut(&self) -> RefMut<'_, DisplayArray> {
        self.0.display_array.borrow_mut()
    }

    /// Identity of the wrapped geometry
    pub fn id(&self) -> DisplayArrayId {
        self.0.display_array.borrow().id()
    }

    /// Whether both handles refer to the same bucket
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::SlotStore;
    use crate::render::mesh::Vertex;

    fn triangle() -> DisplayArray {
        DisplayArray::new(
            vec![
                Vertex::new([0.0, 0.0, 0.0]),
                Vertex::new([1.0, 0.0, 0.0]),
                Vertex::new([0.0, 1.0, 0.0]),
            ],
            vec![0, 1, 2],
        )
    }

    fn keys(count: usize) -> Vec<MeshSlotKey> {
        let mut store: SlotStore<()> = SlotStore::with_key();
        (0..count).map(|_| store.insert(())).collect()
    }

    #[test]
    fn test_destroyed_on_last_release_only() {
        let registry = Rc::new(DisplayArrayRegistry::default());
        let first = DisplayArrayBucketHandle::new(&registry, triangle());
        let weak = Rc::downgrade(&first.0);

        let extra: Vec<_> = (0..4).map(|_| first.add_ref()).collect();
        assert_eq!(first.ref_count(), 5);

        let mut remaining = Vec::new();
        for handle in extra {
            remaining.push(handle.release());
            assert!(weak.upgrade().is_some());
            assert_eq!(registry.len(), 1);
        }
        assert_eq!(remaining, vec![4, 3, 2, 1]);

        assert_eq!(first.release(), 0);
        assert!(weak.upgrade().is_none());
        assert_eq!(registry.len(), 0);
        assert!(registry.entries.borrow().is_empty());
    }

    #[test]
    fn test_replica_is_independent() {
        let registry = Rc::new(DisplayArrayRegistry::default());
        let bucket_id = BucketId::next();
        let original = DisplayArrayBucketHandle::new(&registry, triangle());
        let shared = original.add_ref();
        for key in keys(2) {
            original.activate_mesh(bucket_id, key);
        }

        let replica = original.replica();
        assert_eq!(replica.ref_count(), 1);
        assert_eq!(replica.num_active_mesh_slots(), 0);
        assert_ne!(replica.id(), original.id());
        assert_eq!(replica.display_array().indices(), original.display_array().indices());
        assert_eq!(registry.len(), 2);

        // Releasing the replica leaves the original untouched
        assert_eq!(replica.release(), 0);
        assert_eq!(registry.len(), 1);
        assert_eq!(original.num_active_mesh_slots(), 2);
        assert_eq!(shared.release(), 1);
    }

    #[test]
    fn test_active_set_is_scoped_per_bucket() {
        let registry = Rc::new(DisplayArrayRegistry::default());
        let handle = DisplayArrayBucketHandle::new(&registry, triangle());
        let (a, b) = (BucketId::next(), BucketId::next());
        let slots = keys(3);

        handle.activate_mesh(a, slots[0]);
        handle.activate_mesh(b, slots[1]);
        handle.activate_mesh(a, slots[2]);
        assert_eq!(handle.num_active_mesh_slots(), 3);
        assert_eq!(handle.active_mesh_slots(a), vec![slots[0], slots[2]]);

        assert_eq!(handle.take_active_mesh_slots(a), vec![slots[0], slots[2]]);
        assert_eq!(handle.active_mesh_slots(b), vec![slots[1]]);

        handle.deactivate_mesh(b, slots[1]);
        assert_eq!(handle.num_active_mesh_slots(), 0);

        handle.activate_mesh(a, slots[0]);
        handle.remove_active_mesh_slots();
        assert_eq!(handle.num_active_mesh_slots(), 0);
    }

    #[test]
    fn test_registry_lookup_and_removal() {
        let registry = Rc::new(DisplayArrayRegistry::default());
        let handle = DisplayArrayBucketHandle::new(&registry, triangle());

        let found = registry.find(handle.id()).map(|found| found.ptr_eq(&handle));
        assert_eq!(found, Some(true));

        assert!(!registry.add(&handle));
        assert!(registry.remove(&handle));
        assert!(!registry.remove(&handle));
        assert!(registry.find(handle.id()).is_none());
        assert!(registry.live().is_empty());
    }

    #[test]
    fn test_survives_parent_registry() {
        let registry = Rc::new(DisplayArrayRegistry::default());
        let handle = DisplayArrayBucketHandle::new(&registry, triangle());
        drop(registry);

        let replica = handle.replica();
        assert_eq!(replica.release(), 0);
        assert_eq!(handle.release(), 0);
    }
}

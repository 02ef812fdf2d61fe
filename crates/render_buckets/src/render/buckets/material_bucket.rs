//! Material buckets
//!
//! A [`MaterialBucket`] owns every mesh slot drawn with one material and
//! knows the geometry buckets those slots draw from. It binds the material,
//! applies per-slot state and issues the draw for each queued slot.

use std::rc::Rc;

use crate::foundation::collections::{next_unique_id, MeshSlotKey, SlotStore};
use crate::render::context::RenderContext;
use crate::render::device::{DisplayListOp, DrawRequest, RasterizerDevice};
use crate::render::error::{BucketError, BucketResult};
use crate::render::material::{MaterialRef, PolyMaterial};
use crate::render::mesh::{DisplayArray, DisplayArrayId, MeshObject};
use crate::render::mesh_slot::MeshSlot;

use super::display_array_bucket::{DisplayArrayBucketHandle, DisplayArrayRegistry};
use super::stats::FrameStats;

/// Process-unique identity of a material bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketId(u64);

impl BucketId {
    pub(crate) fn next() -> Self {
        Self(next_unique_id())
    }
}

pub(crate) fn unknown_slot(bucket: BucketId, key: MeshSlotKey) -> BucketError {
    log::warn!("Mesh slot {:?} requested from bucket {:?} that does not own it", key, bucket);
    BucketError::UnknownMeshSlot { key, bucket }
}

/// All mesh slots sharing one material
#[derive(Debug)]
pub struct MaterialBucket {
    id: BucketId,
    material: MaterialRef,
    mesh_slots: SlotStore<MeshSlot>,
    display_arrays: Rc<DisplayArrayRegistry>,
    display_lists_enabled: bool,
}

impl MaterialBucket {
    /// Create an empty bucket for `material`
    pub fn new(material: MaterialRef) -> Self {
        Self {
            id: BucketId::next(),
            material,
            mesh_slots: SlotStore::with_key(),
            display_arrays: Rc::new(DisplayArrayRegistry::default()),
            display_lists_enabled: true,
        }
    }

    /// Allow or forbid display-list caching for this bucket
    pub fn with_display_lists(mut self, enabled: bool) -> Self {
        self.display_lists_enabled = enabled;
        self
    }

    /// Bucket identity
    pub fn id(&self) -> BucketId {
        self.id
    }

    /// Material all slots are drawn with
    pub fn material(&self) -> &MaterialRef {
        &self.material
    }

    /// Whether the material is alpha blended
    pub fn is_alpha(&self) -> bool {
        self.material.is_alpha()
    }

    /// Whether the material needs polygon sorting
    pub fn is_zsort(&self) -> bool {
        self.material.is_zsort()
    }

    /// Add a slot for `mesh` and return its key
    ///
    /// The slot starts culled, at the identity transform and without
    /// geometry; finish it through [`Self::mesh_slot_mut`].
    pub fn add_mesh(&mut self, mesh: Rc<MeshObject>) -> MeshSlotKey {
        self.mesh_slots.insert(MeshSlot::new(mesh))
    }

    /// Duplicate an existing slot of this bucket
    pub fn copy_mesh(&mut self, key: MeshSlotKey) -> Option<MeshSlotKey> {
        let copy = self.mesh_slots.get(key)?.replicate();
        Some(self.mesh_slots.insert(copy))
    }

    /// Remove and destroy a slot; returns false if the key is unknown
    pub fn remove_mesh(&mut self, key: MeshSlotKey) -> bool {
        let Some(slot) = self.mesh_slots.remove(key) else {
            return false;
        };
        if let Some(display_array_bucket) = slot.display_array_bucket() {
            display_array_bucket.deactivate_mesh(self.id, key);
        }
        log::trace!("Removed mesh slot {:?} from bucket {:?}", slot.id(), self.id);
        true
    }

    /// Slot by key
    pub fn mesh_slot(&self, key: MeshSlotKey) -> Option<&MeshSlot> {
        self.mesh_slots.get(key)
    }

    /// Mutable slot by key
    pub fn mesh_slot_mut(&mut self, key: MeshSlotKey) -> Option<&mut MeshSlot> {
        self.mesh_slots.get_mut(key)
    }

    /// Every slot with its key
    pub fn mesh_slots(&self) -> impl Iterator<Item = (MeshSlotKey, &MeshSlot)> + '_ {
        self.mesh_slots.iter()
    }

    /// Number of slots
    pub fn mesh_slot_count(&self) -> usize {
        self.mesh_slots.len()
    }

    /// Queue a slot for drawing this frame and clear its culled flag
    pub fn activate_mesh(&mut self, key: MeshSlotKey) -> BucketResult<()> {
        let bucket = self.id;
        let Some(slot) = self.mesh_slots.get_mut(key) else {
            return Err(unknown_slot(bucket, key));
        };
        let display_array_bucket = slot
            .display_array_bucket()
            .ok_or(BucketError::MissingDisplayArray(slot.id()))?;

        // Slots may point at geometry registered elsewhere; the pass only
        // walks this registry.
        self.display_arrays.add(display_array_bucket);
        display_array_bucket.activate_mesh(bucket, key);
        slot.set_culled(false);
        Ok(())
    }

    /// Another reference to the geometry bucket wrapping array `id`
    pub fn find_display_array_bucket(&self, id: DisplayArrayId) -> Option<DisplayArrayBucketHandle> {
        self.display_arrays.find(id)
    }

    /// Wrap `display_array` in a new geometry bucket registered here
    pub fn new_display_array_bucket(&self, display_array: DisplayArray) -> DisplayArrayBucketHandle {
        DisplayArrayBucketHandle::new(&self.display_arrays, display_array)
    }

    /// Register an existing geometry bucket; no-op if already present
    pub fn add_display_array_bucket(&self, display_array_bucket: &DisplayArrayBucketHandle) {
        self.display_arrays.add(display_array_bucket);
    }

    /// Unregister a geometry bucket; unknown buckets are ignored
    pub fn remove_display_array_bucket(&self, display_array_bucket: &DisplayArrayBucketHandle) {
        self.display_arrays.remove(display_array_bucket);
    }

    /// Live geometry buckets, in registration order
    pub fn display_array_buckets(&self) -> Vec<DisplayArrayBucketHandle> {
        self.display_arrays.live()
    }

    /// Number of live geometry buckets
    pub fn display_array_bucket_count(&self) -> usize {
        self.display_arrays.len()
    }

    /// Bind the material for the next pass
    ///
    /// Returns false when the material does not take part in this pass or
    /// the device refuses it; multi-pass materials return true once per
    /// pass.
    pub fn activate_material(&self, ctx: &RenderContext, device: &mut dyn RasterizerDevice) -> bool {
        let material = self.material.as_ref();
        if ctx.is_shadow_pass() {
            if !material.casts_shadows() {
                return false;
            }
        } else if material.only_shadow() {
            return false;
        }

        if !device.set_material(material) {
            return false;
        }
        device.process_lighting(material.uses_lighting(ctx.mode), &ctx.camera);
        true
    }

    /// Draw one slot with the currently bound material
    pub fn render_mesh_slot(
        &mut self,
        ctx: &RenderContext,
        device: &mut dyn RasterizerDevice,
        key: MeshSlotKey,
    ) -> BucketResult<DisplayListOp> {
        let bucket = self.id;
        let material = Rc::clone(&self.material);
        let Some(slot) = self.mesh_slots.get_mut(key) else {
            return Err(unknown_slot(bucket, key));
        };
        let display_array_bucket = slot
            .display_array_bucket()
            .map(DisplayArrayBucketHandle::add_ref)
            .ok_or(BucketError::MissingDisplayArray(slot.id()))?;

        material.activate_mesh_slot(slot, device);
        if let Some(deformer) = slot.deformer() {
            deformer.apply(material.as_ref());
        }

        if material.is_zsort() && ctx.mode.sorts_polygons() {
            let model_view = ctx.camera.model_view(slot.transform());
            display_array_bucket.display_array_mut().sort_polygons(&model_view);
        }

        device.push_matrix();
        if !slot.deformer().is_some_and(|deformer| deformer.skip_vertex_transform()) {
            device.apply_transform(slot.transform(), material.flags());
        }

        let eligible =
            Self::display_list_eligible(material.as_ref(), self.display_lists_enabled, ctx, slot);
        let op = slot.prepare_display_list(eligible, device);

        let display_array = display_array_bucket.display_array();
        let request = DrawRequest {
            slot: slot.id(),
            array: &display_array,
            display_list: op,
        };
        let drawn = if material.is_text() {
            device.index_primitives_3d_text(&request, material.as_ref())
        } else {
            device.index_primitives(&request)
        };
        device.pop_matrix();
        drawn?;

        Ok(op)
    }

    fn display_list_eligible(
        material: &dyn PolyMaterial,
        enabled: bool,
        ctx: &RenderContext,
        slot: &MeshSlot,
    ) -> bool {
        if !enabled || material.is_zsort() || slot.is_derived_mesh() {
            return false;
        }
        if slot.deformer().is_some_and(|deformer| deformer.is_dynamic()) {
            return false;
        }
        if ctx.is_shadow_pass() && slot.display_list().is_none() {
            return false;
        }
        !(material.uses_object_color() && slot.object_color().is_some())
    }

    /// Merge nearby slots into shared geometry; currently a no-op
    pub fn optimize(&mut self, distance: f32) {
        log::trace!(
            "Bucket {:?} ({} slots) left unmerged at distance {}",
            self.id,
            self.mesh_slots.len(),
            distance
        );
    }

    /// Release every cached display list on `device`
    pub fn release_display_lists(&mut self, device: &mut dyn RasterizerDevice) -> usize {
        let mut released = 0;
        for (_, slot) in self.mesh_slots.iter_mut() {
            if let Some(list) = slot.take_display_list() {
                device.release_display_list(list);
                released += 1;
            }
        }
        released
    }

    /// Free the material's resources
    pub fn release_material(&self) {
        self.material.release_material();
    }

    /// Run every material pass for one slot
    fn render_passes(
        &mut self,
        ctx: &RenderContext,
        device: &mut dyn RasterizerDevice,
        key: MeshSlotKey,
        stats: &mut FrameStats,
    ) -> BucketResult<()> {
        while self.activate_material(ctx, device) {
            let op = self.render_mesh_slot(ctx, device, key)?;
            stats.record_pass(op);
        }
        if let Some(slot) = self.mesh_slots.get_mut(key) {
            slot.set_culled(true);
        }
        Ok(())
    }

    fn render_bound_slots(
        &mut self,
        ctx: &RenderContext,
        device: &mut dyn RasterizerDevice,
        keys: &[MeshSlotKey],
        stats: &mut FrameStats,
    ) -> BucketResult<()> {
        for &key in keys {
            let client = self
                .mesh_slots
                .get(key)
                .map(MeshSlot::client_object)
                .ok_or_else(|| unknown_slot(self.id, key))?;
            device.set_client_object(client);
            self.render_passes(ctx, device, key, stats)?;
            stats.solid_slots += 1;
        }
        Ok(())
    }

    /// Solid pass: draw every queued slot, geometry bucket by geometry bucket
    pub(crate) fn render_active_slots(
        &mut self,
        ctx: &RenderContext,
        device: &mut dyn RasterizerDevice,
        stats: &mut FrameStats,
    ) -> BucketResult<()> {
        for display_array_bucket in self.display_arrays.live() {
            let keys = display_array_bucket.take_active_mesh_slots(self.id);
            if keys.is_empty() {
                continue;
            }

            device.bind_primitives(&display_array_bucket.display_array());
            let drawn = self.render_bound_slots(ctx, device, &keys, stats);
            device.unbind_primitives(&display_array_bucket.display_array());
            drawn?;
        }
        Ok(())
    }

    /// Alpha pass: draw one sorted slot with its own geometry binding
    pub(crate) fn render_sorted_slot(
        &mut self,
        ctx: &RenderContext,
        device: &mut dyn RasterizerDevice,
        key: MeshSlotKey,
        stats: &mut FrameStats,
    ) -> BucketResult<()> {
        let slot = self
            .mesh_slots
            .get(key)
            .ok_or_else(|| unknown_slot(self.id, key))?;
        let client = slot.client_object();
        let display_array_bucket = slot
            .display_array_bucket()
            .map(DisplayArrayBucketHandle::add_ref)
            .ok_or(BucketError::MissingDisplayArray(slot.id()))?;

        device.set_client_object(client);
        device.bind_primitives(&display_array_bucket.display_array());
        let drawn = self.render_passes(ctx, device, key, stats);
        device.unbind_primitives(&display_array_bucket.display_array());
        drawn?;

        stats.alpha_slots += 1;
        Ok(())
    }

    /// Drain the queued slot keys of every geometry bucket
    pub(crate) fn take_active_slots(&self) -> Vec<MeshSlotKey> {
        self.display_arrays
            .live()
            .iter()
            .flat_map(|display_array_bucket| display_array_bucket.take_active_mesh_slots(self.id))
            .collect()
    }

    /// Drop every slot queued in this bucket without drawing it
    pub fn clear_active_slots(&self) -> usize {
        self.take_active_slots().len()
    }
}

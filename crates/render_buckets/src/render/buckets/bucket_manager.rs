//! # Bucket Manager
//!
//! Owns every material bucket of a scene and drives the per-frame render
//! sequence:
//!
//! 1. clear the device caching hints
//! 2. solid pass: buckets in insertion order, slots grouped by geometry
//! 3. alpha pass: all transparent slots sorted far to near
//! 4. reset the modified flag of every drawn mesh
//!
//! Solid buckets and alpha buckets are kept apart; a material (compared by
//! value) lives in exactly one of the two lists.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::rc::Rc;

use crate::core::config::BucketConfig;
use crate::foundation::collections::MeshSlotKey;
use crate::foundation::math::CameraTransform;
use crate::render::context::{DepthMask, RenderContext};
use crate::render::device::RasterizerDevice;
use crate::render::error::BucketResult;
use crate::render::material::{same_instance, MaterialRef};
use crate::render::mesh::{MeshModified, MeshObject};
use crate::render::mesh_slot::MeshSlotId;

use super::material_bucket::{unknown_slot, BucketId, MaterialBucket};
use super::stats::FrameStats;

/// Depth-keyed slot reference built while ordering a pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortedMeshSlot {
    /// Distance along the camera view axis
    pub depth: f32,
    /// Slot key inside its bucket
    pub key: MeshSlotKey,
    /// Slot identity, used to break depth ties
    pub slot_id: MeshSlotId,
    /// Index of the owning bucket in the list that was ordered
    pub bucket: usize,
}

impl SortedMeshSlot {
    /// Far to near; equal depths keep the older slot first
    fn back_to_front(a: &Self, b: &Self) -> Ordering {
        b.depth.total_cmp(&a.depth).then(a.slot_id.cmp(&b.slot_id))
    }

    /// Near to far; equal depths put the newer slot first
    fn front_to_back(a: &Self, b: &Self) -> Ordering {
        a.depth.total_cmp(&b.depth).then(b.slot_id.cmp(&a.slot_id))
    }
}

/// `None` selects every bucket, `Some` only the buckets holding that instance
fn selects(material: Option<&MaterialRef>, bucket: &MaterialBucket) -> bool {
    match material {
        Some(material) => same_instance(bucket.material(), material),
        None => true,
    }
}

/// Material buckets of one scene
#[derive(Debug)]
pub struct BucketManager {
    solid_buckets: Vec<MaterialBucket>,
    alpha_buckets: Vec<MaterialBucket>,
    config: BucketConfig,
}

impl BucketManager {
    /// Create an empty manager with default settings
    pub fn new() -> Self {
        Self::with_config(BucketConfig::default())
    }

    /// Create an empty manager with custom settings
    pub fn with_config(config: BucketConfig) -> Self {
        log::debug!(
            "Creating bucket manager (display lists: {}, optimize distance: {})",
            config.display_lists,
            config.optimize_distance
        );
        Self {
            solid_buckets: Vec::with_capacity(config.initial_bucket_capacity),
            alpha_buckets: Vec::with_capacity(config.initial_bucket_capacity),
            config,
        }
    }

    /// Active settings
    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    /// Bucket for `material`, created on first use
    ///
    /// Lookup compares materials by value. The flag is true when the bucket
    /// was created by this call.
    pub fn find_bucket(&mut self, material: &MaterialRef) -> (&mut MaterialBucket, bool) {
        let matches = |bucket: &MaterialBucket| bucket.material().same_material(material.as_ref());
        if let Some(index) = self.solid_buckets.iter().position(matches) {
            return (&mut self.solid_buckets[index], false);
        }
        if let Some(index) = self.alpha_buckets.iter().position(matches) {
            return (&mut self.alpha_buckets[index], false);
        }

        let bucket = MaterialBucket::new(Rc::clone(material)).with_display_lists(self.config.display_lists);
        log::debug!(
            "Created {} bucket {:?} for material '{}'",
            if bucket.is_alpha() { "alpha" } else { "solid" },
            bucket.id(),
            material.name()
        );

        let buckets = if bucket.is_alpha() {
            &mut self.alpha_buckets
        } else {
            &mut self.solid_buckets
        };
        let index = buckets.len();
        buckets.push(bucket);
        (&mut buckets[index], true)
    }

    /// Flatten and order the queued slots of `buckets`
    ///
    /// Every active set of the given buckets is consumed. Depth is the slot
    /// position projected on the camera view axis. Alpha ordering is far to
    /// near with ties going to the lower slot id; otherwise near to far with
    /// ties going to the higher slot id.
    pub fn order_buckets(
        camera: &CameraTransform,
        buckets: &[MaterialBucket],
        alpha: bool,
    ) -> BucketResult<Vec<SortedMeshSlot>> {
        let mut sorted = Vec::new();
        for (index, bucket) in buckets.iter().enumerate() {
            for key in bucket.take_active_slots() {
                let slot = bucket
                    .mesh_slot(key)
                    .ok_or_else(|| unknown_slot(bucket.id(), key))?;
                sorted.push(SortedMeshSlot {
                    depth: camera.depth_of(&slot.world_position()),
                    key,
                    slot_id: slot.id(),
                    bucket: index,
                });
            }
        }

        if alpha {
            sorted.sort_by(SortedMeshSlot::back_to_front);
        } else {
            sorted.sort_by(SortedMeshSlot::front_to_back);
        }
        Ok(sorted)
    }

    /// Draw every queued slot of the solid buckets
    pub fn render_solid_buckets(
        &mut self,
        ctx: &RenderContext,
        device: &mut dyn RasterizerDevice,
    ) -> BucketResult<FrameStats> {
        let mut stats = FrameStats::default();
        device.set_depth_mask(DepthMask::Enabled);
        for bucket in &mut self.solid_buckets {
            bucket.render_active_slots(ctx, device, &mut stats)?;
        }
        Ok(stats)
    }

    /// Draw every queued slot of the alpha buckets, far to near
    ///
    /// Depth writes are off for the pass unless it draws a shadow map, and
    /// are always switched back on afterwards.
    pub fn render_alpha_buckets(
        &mut self,
        ctx: &RenderContext,
        device: &mut dyn RasterizerDevice,
    ) -> BucketResult<FrameStats> {
        let mut stats = FrameStats::default();
        if !ctx.is_shadow_pass() {
            device.set_depth_mask(DepthMask::Disabled);
        }

        let drawn = Self::order_buckets(&ctx.camera, &self.alpha_buckets, true).and_then(|sorted| {
            sorted.iter().try_for_each(|entry| {
                self.alpha_buckets[entry.bucket].render_sorted_slot(ctx, device, entry.key, &mut stats)
            })
        });

        device.set_depth_mask(DepthMask::Enabled);
        drawn?;
        Ok(stats)
    }

    /// Draw one frame
    ///
    /// On error every queued slot is dropped and the client object cleared,
    /// so the next frame starts from empty queues.
    pub fn render_buckets(
        &mut self,
        ctx: &RenderContext,
        device: &mut dyn RasterizerDevice,
    ) -> BucketResult<FrameStats> {
        device.clear_caching_info();

        let frame = self.render_solid_buckets(ctx, device).and_then(|mut stats| {
            stats += self.render_alpha_buckets(ctx, device)?;
            Ok(stats)
        });
        let mut stats = match frame {
            Ok(stats) => stats,
            Err(error) => {
                let dropped = self.clear_active_slots();
                device.set_client_object(None);
                log::warn!("{:?} pass aborted, {} queued slot(s) dropped: {}", ctx.mode, dropped, error);
                return Err(error);
            }
        };

        if !ctx.is_shadow_pass() {
            stats.meshes_reset = self.reset_modified_meshes();
        }
        device.set_client_object(None);

        log::trace!(
            "Rendered {:?} pass: {} solid, {} alpha slots, {} material passes",
            ctx.mode,
            stats.solid_slots,
            stats.alpha_slots,
            stats.material_passes
        );
        Ok(stats)
    }

    /// Drop the queued slots of every bucket, returning how many were dropped
    pub fn clear_active_slots(&self) -> usize {
        self.buckets().map(MaterialBucket::clear_active_slots).sum()
    }

    /// Clear the modified flag once per distinct mesh
    fn reset_modified_meshes(&self) -> usize {
        let mut seen: HashSet<*const MeshObject> = HashSet::new();
        let mut reset = 0;
        for bucket in self.buckets() {
            for (_, slot) in bucket.mesh_slots() {
                let mesh = slot.mesh();
                if !seen.insert(Rc::as_ptr(mesh)) {
                    continue;
                }
                if mesh.is_modified() {
                    mesh.set_modified_flag(MeshModified::empty());
                    reset += 1;
                }
            }
        }
        reset
    }

    /// Remove every bucket holding exactly this material instance
    ///
    /// Buckets whose material is equal but a different instance are kept.
    pub fn remove_material(&mut self, material: &MaterialRef) -> usize {
        let before = self.bucket_count();
        self.solid_buckets
            .retain(|bucket| !same_instance(bucket.material(), material));
        self.alpha_buckets
            .retain(|bucket| !same_instance(bucket.material(), material));

        let removed = before - self.bucket_count();
        if removed > 0 {
            log::debug!("Removed {} bucket(s) for material '{}'", removed, material.name());
        }
        removed
    }

    /// Release cached display lists of all buckets, or only of the buckets
    /// holding `material`
    pub fn release_display_lists(
        &mut self,
        material: Option<&MaterialRef>,
        device: &mut dyn RasterizerDevice,
    ) -> usize {
        let mut released = 0;
        for bucket in self.buckets_mut() {
            if selects(material, bucket) {
                released += bucket.release_display_lists(device);
            }
        }
        log::debug!("Released {} display list(s)", released);
        released
    }

    /// Release material resources of all buckets, or only of the buckets
    /// holding `material`
    pub fn release_materials(&self, material: Option<&MaterialRef>) -> usize {
        let mut released = 0;
        for bucket in self.buckets() {
            if selects(material, bucket) {
                bucket.release_material();
                released += 1;
            }
        }
        released
    }

    /// Move every bucket of `other` into this manager
    ///
    /// `other` is left empty. Buckets are appended as-is, so an equal
    /// material may end up with one bucket from each side.
    pub fn merge_bucket_manager(&mut self, other: &mut BucketManager) {
        log::debug!(
            "Merging {} solid and {} alpha bucket(s)",
            other.solid_buckets.len(),
            other.alpha_buckets.len()
        );
        self.solid_buckets.append(&mut other.solid_buckets);
        self.alpha_buckets.append(&mut other.alpha_buckets);
    }

    /// Run slot merging on every bucket at the configured distance
    pub fn optimize_buckets(&mut self) {
        let distance = self.config.optimize_distance;
        for bucket in self.buckets_mut() {
            bucket.optimize(distance);
        }
    }

    /// Solid buckets in insertion order
    pub fn solid_buckets(&self) -> &[MaterialBucket] {
        &self.solid_buckets
    }

    /// Alpha buckets in insertion order
    pub fn alpha_buckets(&self) -> &[MaterialBucket] {
        &self.alpha_buckets
    }

    /// Number of buckets of both kinds
    pub fn bucket_count(&self) -> usize {
        self.solid_buckets.len() + self.alpha_buckets.len()
    }

    /// Bucket by id
    pub fn bucket(&self, id: BucketId) -> Option<&MaterialBucket> {
        self.buckets().find(|bucket| bucket.id() == id)
    }

    /// Mutable bucket by id
    pub fn bucket_mut(&mut self, id: BucketId) -> Option<&mut MaterialBucket> {
        self.buckets_mut().find(|bucket| bucket.id() == id)
    }

    fn buckets(&self) -> impl Iterator<Item = &MaterialBucket> {
        self.solid_buckets.iter().chain(&self.alpha_buckets)
    }

    fn buckets_mut(&mut self) -> impl Iterator<Item = &mut MaterialBucket> {
        self.solid_buckets.iter_mut().chain(&mut self.alpha_buckets)
    }
}

impl Default for BucketManager {
    fn default() -> Self {
        Self::new()
    }
}

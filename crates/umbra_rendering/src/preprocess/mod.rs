//! # Mesh Preprocessing
//!
//! One invocation per work item. Each invocation decides visibility and,
//! if visible, writes the fully expanded per-draw record into a slot it
//! owns.
//!
//! ```text
//! invocation i
//!   ├─ i ≥ work items?                 → exit
//!   ├─ occlusion && visibility[i]?     → skip (drawn by the early pass)
//!   ├─ unpack world_from_local
//!   ├─ frustum test                    → culled
//!   ├─ occlusion test                  → culled
//!   ├─ visibility[i] = 1               (occlusion only)
//!   ├─ previous transform via previous_input_index (sentinel = stationary)
//!   ├─ inverse-transpose, pack
//!   ├─ main output: claim slot, write
//!   └─ prepass output: claim slot, write   (occlusion only)
//! ```
//!
//! Invocations never wait on each other. The only shared mutable state is
//! the batch counters and the visibility bits, both atomic.

mod bindings;
mod key;
mod stats;

pub use bindings::{PreprocessBindings, PreprocessView};
pub use key::PreprocessPipelineKey;
pub use stats::{InvocationOutcome, PreprocessStats};

use rayon::prelude::*;
use tracing::{debug, info};
use umbra_shared::{unpack_affine, OutputMeshRecord, PackedInverseTranspose, WORKGROUP_SIZE};

use crate::config::PreprocessSettings;
use crate::culling::{CullResult, CullingEngine, OcclusionCuller};
use crate::error::PreprocessResult;

/// Runs the preprocessing stage for one pipeline variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshPreprocessor {
    key: PreprocessPipelineKey,
    workgroup_size: u32,
}

impl MeshPreprocessor {
    /// Creates a preprocessor for `key` with the default workgroup size.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` names no pipeline variant.
    pub fn new(key: PreprocessPipelineKey) -> PreprocessResult<Self> {
        key.validate()?;
        Ok(Self {
            key,
            workgroup_size: WORKGROUP_SIZE,
        })
    }

    /// Creates the preprocessor selected by configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid.
    pub fn from_settings(settings: &PreprocessSettings) -> PreprocessResult<Self> {
        settings.validate()?;
        let key = settings.pipeline_key();
        info!(
            variant = key.variant_name(),
            indirect = key.indirect_draw(),
            workgroup_size = settings.workgroup_size,
            "mesh preprocessing pipeline selected"
        );
        Ok(Self {
            key,
            workgroup_size: settings.workgroup_size,
        })
    }

    /// The pipeline variant.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> PreprocessPipelineKey {
        self.key
    }

    /// Invocations per workgroup.
    #[inline]
    #[must_use]
    pub const fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    /// Workgroups needed to cover `work_items` invocations, saturating at
    /// `u32::MAX`.
    #[must_use]
    pub fn workgroup_count(&self, work_items: usize) -> u32 {
        u32::try_from(work_items.div_ceil(self.workgroup_size as usize)).unwrap_or(u32::MAX)
    }

    /// Validates `bindings` and runs one invocation per work item across
    /// the rayon pool, one task per workgroup.
    ///
    /// # Errors
    ///
    /// Returns a [`PreprocessError`](crate::PreprocessError) if the bindings
    /// violate a precondition. Nothing is written in that case.
    pub fn dispatch(&self, bindings: &PreprocessBindings<'_>) -> PreprocessResult<PreprocessStats> {
        bindings.validate(self.key)?;

        let culling = self.culling_engine(bindings);
        let workgroup_size = self.workgroup_size;
        let stats = (0..self.workgroup_count(bindings.work_items.len()))
            .into_par_iter()
            .map(|workgroup| {
                let first = workgroup * workgroup_size;
                let mut stats = PreprocessStats::default();
                for invocation in first..first.saturating_add(workgroup_size) {
                    stats.record(self.run_invocation(bindings, &culling, invocation));
                }
                stats
            })
            .reduce(PreprocessStats::default, |a, b| a + b);

        debug!(
            pass = bindings.label,
            variant = self.key.variant_name(),
            work_items = stats.work_items,
            visible = stats.visible,
            frustum_culled = stats.frustum_culled,
            occlusion_culled = stats.occlusion_culled,
            skipped = stats.skipped,
            written = stats.written,
            "mesh preprocessing dispatch complete"
        );
        Ok(stats)
    }

    /// Runs the invocation `global_invocation_id` on its own.
    ///
    /// Performs no validation: call [`PreprocessBindings::validate`] first.
    /// An index past the work list is a no-op.
    pub fn process(&self, bindings: &PreprocessBindings<'_>, global_invocation_id: u32) -> InvocationOutcome {
        let culling = self.culling_engine(bindings);
        self.run_invocation(bindings, &culling, global_invocation_id)
    }

    fn culling_engine<'a>(&self, bindings: &PreprocessBindings<'a>) -> CullingEngine<'a> {
        let view = if self.key.frustum_culling() {
            bindings.view
        } else {
            None
        };
        let occlusion = match (self.key.occlusion_culling(), view, bindings.depth_pyramid) {
            (true, Some(view), Some(pyramid)) => {
                Some(OcclusionCuller::new(view.clip_from_world, pyramid))
            }
            _ => None,
        };
        CullingEngine::new(view.map(|view| &view.frustum), occlusion)
    }

    fn run_invocation(
        &self,
        bindings: &PreprocessBindings<'_>,
        culling: &CullingEngine<'_>,
        invocation: u32,
    ) -> InvocationOutcome {
        let Some(item) = bindings.work_items.get(invocation as usize) else {
            return InvocationOutcome::OutOfRange;
        };
        let visibility = if self.key.occlusion_culling() {
            bindings.visibility
        } else {
            None
        };

        if visibility.is_some_and(|visibility| visibility.is_visible(invocation)) {
            return InvocationOutcome::Skipped;
        }

        let input = &bindings.current_input[item.input_index as usize];
        let world_from_local = unpack_affine(&input.world_from_local);

        if !culling.is_disabled() {
            match culling.cull(
                &world_from_local,
                &bindings.culling_data[item.input_index as usize],
            ) {
                CullResult::Visible => {}
                CullResult::FrustumCulled => return InvocationOutcome::FrustumCulled,
                CullResult::OcclusionCulled => return InvocationOutcome::OcclusionCulled,
            }
        }

        if let Some(visibility) = visibility {
            visibility.mark_visible(invocation);
        }

        let previous_world_from_local = input
            .previous_index()
            .map_or(input.world_from_local, |previous| {
                bindings.previous_input[previous as usize].world_from_local
            });
        let inverse_transpose = PackedInverseTranspose::from_affine(&world_from_local);

        let record = OutputMeshRecord {
            world_from_local: input.world_from_local,
            previous_world_from_local,
            local_from_world_transpose_a: inverse_transpose.a,
            local_from_world_transpose_b: inverse_transpose.b,
            flags: input.flags,
            lightmap_uv_rect: input.lightmap_uv_rect,
        };

        let slot = bindings.output.write(item, &record);
        let prepass_slot = if self.key.occlusion_culling() {
            bindings.prepass.map(|prepass| prepass.write(item, &record))
        } else {
            None
        };

        InvocationOutcome::Written { slot, prepass_slot }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Affine3A, Mat4, UVec2, Vec3};
    use umbra_core::{IndirectParametersBuffer, RecordBuffer, VisibilityBitmask};
    use umbra_shared::{
        pack_affine, DrawIndexedIndirectArgs, MeshCullingData, MeshFlags, MeshInputRecord,
        WorkItem,
    };

    use crate::culling::{DepthPyramid, Frustum, Plane};
    use crate::error::{ConfigError, PreprocessError};
    use crate::indirect::OutputTarget;

    fn input_at(translation: Vec3, previous: Option<u32>) -> MeshInputRecord {
        MeshInputRecord::new(
            &Affine3A::from_translation(translation),
            [0, 0],
            MeshFlags::SHADOW_RECEIVER,
            previous,
        )
    }

    /// Every culled plane 10 units from the origin along the view axes.
    fn box_view() -> PreprocessView {
        PreprocessView::new(Mat4::IDENTITY, UVec2::new(64, 64)).with_frustum(Frustum::from_planes([
            Plane::new(1.0, 0.0, 0.0, 10.0),
            Plane::new(-1.0, 0.0, 0.0, 10.0),
            Plane::new(0.0, 1.0, 0.0, 10.0),
            Plane::new(0.0, -1.0, 0.0, 10.0),
            Plane::new(0.0, 0.0, -1.0, 10.0),
            Plane::default(),
        ]))
    }

    fn frustum_indirect() -> MeshPreprocessor {
        MeshPreprocessor::new(
            PreprocessPipelineKey::FRUSTUM_CULLING | PreprocessPipelineKey::INDIRECT_DRAW,
        )
        .unwrap()
    }

    #[test]
    fn test_frustum_scenario() {
        let inputs = [input_at(Vec3::ZERO, None), input_at(Vec3::new(1000.0, 0.0, 0.0), None)];
        let culling = [MeshCullingData::new(Vec3::ZERO, Vec3::ONE); 2];
        let work_items = [WorkItem::new(0, 0), WorkItem::new(1, 0)];
        let view = box_view();
        let records = RecordBuffer::new(4).unwrap();
        let parameters = IndirectParametersBuffer::new([DrawIndexedIndirectArgs::new(36, 0, 0, 0)]);

        let bindings = PreprocessBindings::new(
            &work_items,
            &inputs,
            &[],
            OutputTarget::indirect(&records, &parameters),
        )
        .with_culling(&culling, &view);
        let stats = frustum_indirect().dispatch(&bindings).unwrap();

        assert_eq!(stats.visible, 1);
        assert_eq!(stats.frustum_culled, 1);
        assert_eq!(parameters.instance_count(0), 1);
        assert_eq!(records.write_count(), 1);
        assert_eq!(records.read(0).world_from_local, inputs[0].world_from_local);
    }

    #[test]
    fn test_sentinel_previous_means_zero_motion() {
        let previous = [input_at(Vec3::new(5.0, 0.0, 0.0), None)];
        let inputs = [input_at(Vec3::ONE, None), input_at(Vec3::ONE, Some(0))];
        let work_items = [WorkItem::new(0, 0), WorkItem::new(1, 1)];
        let records = RecordBuffer::new(2).unwrap();
        let preprocessor = MeshPreprocessor::new(PreprocessPipelineKey::empty()).unwrap();

        let bindings =
            PreprocessBindings::new(&work_items, &inputs, &previous, OutputTarget::direct(&records));
        preprocessor.dispatch(&bindings).unwrap();

        let stationary = records.read(0);
        assert_eq!(stationary.previous_world_from_local, stationary.world_from_local);
        let moving = records.read(1);
        assert_eq!(
            moving.previous_world_from_local,
            pack_affine(&Affine3A::from_translation(Vec3::new(5.0, 0.0, 0.0)))
        );
    }

    #[test]
    fn test_direct_mode_writes_output_index() {
        let inputs = [input_at(Vec3::ZERO, None)];
        let work_items = [WorkItem::new(0, 3)];
        let records = RecordBuffer::new(4).unwrap();
        let preprocessor = MeshPreprocessor::new(PreprocessPipelineKey::empty()).unwrap();
        let bindings =
            PreprocessBindings::new(&work_items, &inputs, &[], OutputTarget::direct(&records));

        assert_eq!(
            preprocessor.process(&bindings, 0),
            InvocationOutcome::Written {
                slot: 3,
                prepass_slot: None
            }
        );
        assert_eq!(records.read(3).flags, inputs[0].flags);
        assert_eq!(preprocessor.process(&bindings, 1), InvocationOutcome::OutOfRange);
    }

    #[test]
    fn test_output_record_carries_inverse_transpose() {
        let world_from_local = Affine3A::from_scale(Vec3::new(2.0, 4.0, 8.0));
        let inputs = [MeshInputRecord::new(&world_from_local, [7, 9], MeshFlags::empty(), None)];
        let work_items = [WorkItem::new(0, 0)];
        let records = RecordBuffer::new(1).unwrap();
        let preprocessor = MeshPreprocessor::new(PreprocessPipelineKey::empty()).unwrap();
        let bindings =
            PreprocessBindings::new(&work_items, &inputs, &[], OutputTarget::direct(&records));
        preprocessor.process(&bindings, 0);

        let record = records.read(0);
        let normal_matrix = record.inverse_transpose().unpack();
        assert!((normal_matrix.x_axis.x - 0.5).abs() < 1.0e-6);
        assert!((normal_matrix.z_axis.z - 0.125).abs() < 1.0e-6);
        assert_eq!(record.lightmap_uv_rect, [7, 9]);
    }

    #[test]
    fn test_occlusion_skip_is_idempotent() {
        let inputs = [input_at(Vec3::new(0.0, 0.0, -5.0), None)];
        let culling = [MeshCullingData::new(Vec3::ZERO, Vec3::ONE)];
        let work_items = [WorkItem::new(0, 0)];
        let view = PreprocessView::new(
            Mat4::perspective_infinite_reverse_rh(1.0, 1.0, 0.1),
            UVec2::new(8, 8),
        );
        let pyramid = DepthPyramid::cleared(UVec2::new(8, 8)).unwrap();
        let visibility = VisibilityBitmask::new(1);
        let records = RecordBuffer::new(1).unwrap();
        let prepass_records = RecordBuffer::new(1).unwrap();
        let parameters = IndirectParametersBuffer::new([DrawIndexedIndirectArgs::new(3, 0, 0, 0)]);
        let prepass_parameters =
            IndirectParametersBuffer::new([DrawIndexedIndirectArgs::new(3, 0, 0, 0)]);

        let bindings = PreprocessBindings::new(
            &work_items,
            &inputs,
            &[],
            OutputTarget::indirect(&records, &parameters),
        )
        .with_culling(&culling, &view)
        .with_occlusion(
            &pyramid,
            &visibility,
            OutputTarget::indirect(&prepass_records, &prepass_parameters),
        );
        let preprocessor = MeshPreprocessor::new(PreprocessPipelineKey::all()).unwrap();

        let first = preprocessor.dispatch(&bindings).unwrap();
        assert_eq!(first.written, 2);
        assert_eq!(prepass_parameters.instance_count(0), 1);
        assert!(visibility.is_visible(0));

        let second = preprocessor.dispatch(&bindings).unwrap();
        assert_eq!(second.skipped, 1);
        assert_eq!(second.written, 0);
        assert_eq!(parameters.instance_count(0), 1);
        assert_eq!(records.write_count(), 1);
    }

    #[test]
    fn test_validation_rejects_missing_bindings() {
        let inputs = [input_at(Vec3::ZERO, None)];
        let work_items = [WorkItem::new(0, 0)];
        let records = RecordBuffer::new(1).unwrap();
        let bindings =
            PreprocessBindings::new(&work_items, &inputs, &[], OutputTarget::direct(&records));

        assert!(matches!(
            frustum_indirect().dispatch(&bindings),
            Err(PreprocessError::MissingView)
        ));

        let indirect_only = MeshPreprocessor::new(PreprocessPipelineKey::INDIRECT_DRAW).unwrap();
        assert!(matches!(
            indirect_only.dispatch(&bindings),
            Err(PreprocessError::MissingIndirectParameters)
        ));

        let out_of_range = [WorkItem::new(4, 0)];
        let bindings =
            PreprocessBindings::new(&out_of_range, &inputs, &[], OutputTarget::direct(&records));
        assert!(matches!(
            MeshPreprocessor::new(PreprocessPipelineKey::empty()).unwrap().dispatch(&bindings),
            Err(PreprocessError::InputIndexOutOfRange { input_index: 4, .. })
        ));
        assert_eq!(records.write_count(), 0);
    }

    #[test]
    fn test_validation_rejects_small_output() {
        let inputs = [input_at(Vec3::ZERO, None)];
        let work_items = [WorkItem::new(0, 0), WorkItem::new(0, 0)];
        let records = RecordBuffer::new(1).unwrap();
        let parameters = IndirectParametersBuffer::new([DrawIndexedIndirectArgs::new(3, 0, 0, 0)]);
        let bindings = PreprocessBindings::new(
            &work_items,
            &inputs,
            &[],
            OutputTarget::indirect(&records, &parameters),
        );
        let preprocessor = MeshPreprocessor::new(PreprocessPipelineKey::INDIRECT_DRAW).unwrap();

        assert!(matches!(
            preprocessor.dispatch(&bindings),
            Err(PreprocessError::OutputTooSmall { required: 2, capacity: 1 })
        ));
    }

    #[test]
    fn test_workgroup_count() {
        let preprocessor = MeshPreprocessor::new(PreprocessPipelineKey::empty()).unwrap();
        assert_eq!(preprocessor.workgroup_count(0), 0);
        assert_eq!(preprocessor.workgroup_count(64), 1);
        assert_eq!(preprocessor.workgroup_count(65), 2);
        assert_eq!(preprocessor.workgroup_count(usize::MAX), u32::MAX);
    }

    #[test]
    fn test_from_settings_rejects_oversized_workgroup() {
        let settings = PreprocessSettings {
            workgroup_size: u32::MAX,
            ..PreprocessSettings::default()
        };
        assert!(matches!(
            MeshPreprocessor::from_settings(&settings),
            Err(PreprocessError::Config(ConfigError::InvalidWorkgroupSize(u32::MAX)))
        ));
    }

    #[test]
    fn test_from_settings_rejects_occlusion_without_frustum() {
        let settings = PreprocessSettings {
            frustum_culling: false,
            occlusion_culling: true,
            ..PreprocessSettings::default()
        };
        assert!(matches!(
            MeshPreprocessor::from_settings(&settings),
            Err(PreprocessError::Config(_))
        ));
    }
}

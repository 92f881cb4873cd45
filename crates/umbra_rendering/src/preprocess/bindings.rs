//! Buffers bound to one dispatch.
//!
//! Everything a dispatch reads or writes is passed in here and owned by the
//! orchestrator. Nothing persists inside the preprocessor between calls.

use std::collections::HashMap;

use glam::{Mat4, UVec2};
use umbra_core::VisibilityBitmask;
use umbra_shared::{MeshCullingData, MeshInputRecord, WorkItem};

use super::PreprocessPipelineKey;
use crate::culling::{DepthPyramid, Frustum};
use crate::error::{PreprocessError, PreprocessResult};
use crate::indirect::{IndirectSlotAllocator, OutputTarget};

/// Per-view uniform data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessView {
    /// World to clip space (reverse-Z).
    pub clip_from_world: Mat4,
    /// Culling planes, normally extracted from `clip_from_world`.
    pub frustum: Frustum,
    /// Render target size in pixels.
    pub viewport_size: UVec2,
}

impl PreprocessView {
    /// Creates a view, extracting its frustum from `clip_from_world`.
    #[must_use]
    pub fn new(clip_from_world: Mat4, viewport_size: UVec2) -> Self {
        Self {
            clip_from_world,
            frustum: Frustum::from_view_projection(&clip_from_world),
            viewport_size,
        }
    }

    /// Replaces the culling planes.
    #[must_use]
    pub const fn with_frustum(mut self, frustum: Frustum) -> Self {
        self.frustum = frustum;
        self
    }
}

/// Every buffer one dispatch touches.
#[derive(Debug, Clone, Copy)]
pub struct PreprocessBindings<'a> {
    /// Label for logs.
    pub label: &'a str,
    /// One entry per invocation.
    pub work_items: &'a [WorkItem],
    /// This frame's inputs.
    pub current_input: &'a [MeshInputRecord],
    /// Last frame's inputs, indexed by `previous_input_index`.
    pub previous_input: &'a [MeshInputRecord],
    /// Model-space bounds, index-aligned with `current_input`.
    pub culling_data: &'a [MeshCullingData],
    /// View for frustum and occlusion tests.
    pub view: Option<&'a PreprocessView>,
    /// Depth pyramid for the occlusion test.
    pub depth_pyramid: Option<&'a DepthPyramid>,
    /// Per-work-item visibility bits for this frame.
    pub visibility: Option<&'a VisibilityBitmask>,
    /// Main pass output.
    pub output: OutputTarget<'a>,
    /// Prepass output, written alongside the main output under occlusion culling.
    pub prepass: Option<OutputTarget<'a>>,
}

impl<'a> PreprocessBindings<'a> {
    /// Binds the buffers every variant needs.
    #[must_use]
    pub const fn new(
        work_items: &'a [WorkItem],
        current_input: &'a [MeshInputRecord],
        previous_input: &'a [MeshInputRecord],
        output: OutputTarget<'a>,
    ) -> Self {
        Self {
            label: "",
            work_items,
            current_input,
            previous_input,
            culling_data: &[],
            view: None,
            depth_pyramid: None,
            visibility: None,
            output,
            prepass: None,
        }
    }

    /// Sets the log label.
    #[must_use]
    pub const fn with_label(mut self, label: &'a str) -> Self {
        self.label = label;
        self
    }

    /// Binds the frustum-culling inputs.
    #[must_use]
    pub const fn with_culling(
        mut self,
        culling_data: &'a [MeshCullingData],
        view: &'a PreprocessView,
    ) -> Self {
        self.culling_data = culling_data;
        self.view = Some(view);
        self
    }

    /// Binds the occlusion-culling inputs and the prepass output.
    #[must_use]
    pub const fn with_occlusion(
        mut self,
        depth_pyramid: &'a DepthPyramid,
        visibility: &'a VisibilityBitmask,
        prepass: OutputTarget<'a>,
    ) -> Self {
        self.depth_pyramid = Some(depth_pyramid);
        self.visibility = Some(visibility);
        self.prepass = Some(prepass);
        self
    }

    /// Checks the bindings satisfy every precondition of `key`.
    ///
    /// The dispatch itself performs no checks; this is where contract
    /// violations are caught.
    ///
    /// # Errors
    ///
    /// Returns the first violated precondition.
    pub fn validate(&self, key: PreprocessPipelineKey) -> PreprocessResult<()> {
        self.validate_inputs()?;

        if key.frustum_culling() {
            if self.view.is_none() {
                return Err(PreprocessError::MissingView);
            }
            if self.culling_data.len() != self.current_input.len() {
                return Err(PreprocessError::CullingDataMismatch {
                    inputs: self.current_input.len(),
                    culling: self.culling_data.len(),
                });
            }
        }

        if !key.occlusion_culling() {
            return validate_target(&self.output, self.work_items.iter().enumerate(), key);
        }

        let pyramid = self.depth_pyramid.ok_or(PreprocessError::MissingDepthPyramid)?;
        if let Some(view) = self.view {
            if pyramid.view_size() != view.viewport_size {
                return Err(PreprocessError::PyramidSizeMismatch {
                    pyramid: pyramid.view_size(),
                    view: view.viewport_size,
                });
            }
        }
        let visibility = self.visibility.ok_or(PreprocessError::MissingVisibilityBitmask)?;
        if visibility.len() < self.work_items.len() {
            return Err(PreprocessError::VisibilityBitmaskTooSmall {
                required: self.work_items.len(),
                actual: visibility.len(),
            });
        }
        let prepass = self.prepass.ok_or(PreprocessError::MissingPrepassTarget)?;

        // Work items already marked visible are skipped and write nothing.
        let pending = || {
            self.work_items
                .iter()
                .enumerate()
                .zip(0u32..)
                .filter(|&(_, invocation)| !visibility.is_visible(invocation))
                .map(|(entry, _)| entry)
        };
        validate_target(&self.output, pending(), key)?;
        validate_target(&prepass, pending(), key)
    }

    fn validate_inputs(&self) -> PreprocessResult<()> {
        if u32::try_from(self.work_items.len()).is_err() {
            return Err(PreprocessError::TooManyWorkItems(self.work_items.len()));
        }
        for (work_item, item) in self.work_items.iter().enumerate() {
            if item.input_index as usize >= self.current_input.len() {
                return Err(PreprocessError::InputIndexOutOfRange {
                    work_item,
                    input_index: item.input_index,
                    inputs: self.current_input.len(),
                });
            }
        }
        for (input, record) in self.current_input.iter().enumerate() {
            if let Some(previous_index) = record.previous_index() {
                if previous_index as usize >= self.previous_input.len() {
                    return Err(PreprocessError::PreviousIndexOutOfRange {
                        input,
                        previous_index,
                        previous: self.previous_input.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Checks one output can absorb every write the dispatch may make.
fn validate_target<'w>(
    target: &OutputTarget<'_>,
    work_items: impl Iterator<Item = (usize, &'w WorkItem)>,
    key: PreprocessPipelineKey,
) -> PreprocessResult<()> {
    let capacity = target.records.capacity();

    match (key.indirect_draw(), target.slots) {
        (true, IndirectSlotAllocator::Direct) => Err(PreprocessError::MissingIndirectParameters),
        (false, IndirectSlotAllocator::Indirect(_)) => {
            Err(PreprocessError::UnexpectedIndirectParameters)
        }
        (false, IndirectSlotAllocator::Direct) => {
            let required = work_items
                .map(|(_, item)| item.output_index as usize + 1)
                .max()
                .unwrap_or(0);
            if required > capacity {
                return Err(PreprocessError::OutputTooSmall { required, capacity });
            }
            Ok(())
        }
        (true, IndirectSlotAllocator::Indirect(parameters)) => {
            let mut per_batch: HashMap<u32, usize> = HashMap::new();
            for (work_item, item) in work_items {
                if parameters.get(item.output_index).is_none() {
                    return Err(PreprocessError::BatchOutOfRange {
                        work_item,
                        batch: item.output_index,
                        batches: parameters.len(),
                    });
                }
                *per_batch.entry(item.output_index).or_default() += 1;
            }
            for (batch, items) in per_batch {
                let Some(batch) = parameters.get(batch) else {
                    continue;
                };
                let required =
                    batch.first_instance as usize + batch.instance_count() as usize + items;
                if required > capacity {
                    return Err(PreprocessError::OutputTooSmall { required, capacity });
                }
            }
            Ok(())
        }
    }
}

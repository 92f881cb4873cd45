//! Dispatch statistics.

use std::ops::{Add, AddAssign};

/// What one invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Invocation index past the work list (last workgroup padding).
    OutOfRange,
    /// Already marked visible this frame.
    Skipped,
    /// Outside the frustum.
    FrustumCulled,
    /// Hidden behind the depth pyramid.
    OcclusionCulled,
    /// Record written.
    Written {
        /// Main output slot.
        slot: u32,
        /// Prepass output slot, when occlusion culling is on.
        prepass_slot: Option<u32>,
    },
}

/// Statistics from one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessStats {
    /// Work items in range.
    pub work_items: u32,
    /// Work items that passed culling.
    pub visible: u32,
    /// Work items rejected by the frustum test.
    pub frustum_culled: u32,
    /// Work items rejected by the occlusion test.
    pub occlusion_culled: u32,
    /// Work items skipped as already visible.
    pub skipped: u32,
    /// Records written, prepass included.
    pub written: u32,
}

impl PreprocessStats {
    /// Counts one invocation.
    pub fn record(&mut self, outcome: InvocationOutcome) {
        match outcome {
            InvocationOutcome::OutOfRange => return,
            InvocationOutcome::Skipped => self.skipped += 1,
            InvocationOutcome::FrustumCulled => self.frustum_culled += 1,
            InvocationOutcome::OcclusionCulled => self.occlusion_culled += 1,
            InvocationOutcome::Written { prepass_slot, .. } => {
                self.visible += 1;
                self.written += 1 + u32::from(prepass_slot.is_some());
            }
        }
        self.work_items += 1;
    }

    /// Work items rejected by either test.
    #[must_use]
    pub const fn culled(&self) -> u32 {
        self.frustum_culled + self.occlusion_culled
    }

    /// Fraction of work items culled.
    #[must_use]
    pub fn cull_rate(&self) -> f64 {
        if self.work_items > 0 {
            f64::from(self.culled()) / f64::from(self.work_items)
        } else {
            0.0
        }
    }
}

impl Add for PreprocessStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            work_items: self.work_items + rhs.work_items,
            visible: self.visible + rhs.visible,
            frustum_culled: self.frustum_culled + rhs.frustum_culled,
            occlusion_culled: self.occlusion_culled + rhs.occlusion_culled,
            skipped: self.skipped + rhs.skipped,
            written: self.written + rhs.written,
        }
    }
}

impl AddAssign for PreprocessStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

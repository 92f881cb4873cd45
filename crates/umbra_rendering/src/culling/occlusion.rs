//! Hierarchical depth pyramid occlusion culling.
//!
//! Depth is reverse-Z: 1 is the near plane, 0 is infinitely far. Every
//! pyramid texel keeps the minimum (farthest) depth of the texels below it,
//! so a single sample bounds every occluder in its footprint.
//!
//! ```text
//! depth buffer (W × H)
//!        │ 2×2 min
//!        ▼
//! mip 0 (⌈W/2⌉ × ⌈H/2⌉) ──► mip 1 (⌈W/4⌉ × ⌈H/4⌉) ──► ... ──► mip N-1
//! ```
//!
//! The test is conservative: it may keep an occluded object, never the
//! other way round.

use glam::{Affine3A, Mat4, UVec2, Vec2, Vec3};

use crate::error::{PreprocessError, PreprocessResult};

/// Upper bound on pyramid mip levels.
pub const MAX_DEPTH_PYRAMID_MIPS: u32 = 12;

/// One pyramid level.
#[derive(Debug, Clone)]
struct PyramidMip {
    size: UVec2,
    texels: Vec<f32>,
}

impl PyramidMip {
    fn load(&self, texel: UVec2) -> f32 {
        let texel = texel.min(self.size - UVec2::ONE);
        self.texels[(texel.y * self.size.x + texel.x) as usize]
    }

    /// 2×2 minimum downsample. Odd edges reuse the last row/column.
    fn reduce(&self) -> Self {
        let size = ((self.size + UVec2::ONE) / 2).max(UVec2::ONE);
        let mut texels = Vec::with_capacity((size.x * size.y) as usize);
        for y in 0..size.y {
            for x in 0..size.x {
                let base = UVec2::new(x, y) * 2;
                let depth = [UVec2::ZERO, UVec2::X, UVec2::Y, UVec2::ONE]
                    .into_iter()
                    .map(|offset| self.load(base + offset))
                    .fold(f32::INFINITY, f32::min);
                texels.push(depth);
            }
        }
        Self { size, texels }
    }
}

/// Hierarchical minimum-depth pyramid, half the view resolution at mip 0.
///
/// Built by the orchestrator between dispatches and bound read-only.
#[derive(Debug, Clone)]
pub struct DepthPyramid {
    /// Size of the depth buffer the pyramid was built from.
    view_size: UVec2,
    mips: Vec<PyramidMip>,
}

impl DepthPyramid {
    /// Builds the full pyramid from a row-major reverse-Z depth buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PreprocessError::EmptyView`] for a zero-sized view and
    /// [`PreprocessError::DepthBufferSizeMismatch`] if `depth` does not hold
    /// exactly `view_size.x * view_size.y` texels.
    pub fn from_depth_buffer(view_size: UVec2, depth: &[f32]) -> PreprocessResult<Self> {
        if view_size.x == 0 || view_size.y == 0 {
            return Err(PreprocessError::EmptyView);
        }
        let expected = view_size.x as usize * view_size.y as usize;
        if depth.len() != expected {
            return Err(PreprocessError::DepthBufferSizeMismatch {
                expected,
                actual: depth.len(),
            });
        }

        let source = PyramidMip {
            size: view_size,
            texels: depth.to_vec(),
        };
        let base = source.reduce();
        let mip_count = (base.size.max_element().ilog2() + 1).min(MAX_DEPTH_PYRAMID_MIPS);

        let mut mips = Vec::with_capacity(mip_count as usize);
        mips.push(base);
        while mips.len() < mip_count as usize {
            let next = mips[mips.len() - 1].reduce();
            mips.push(next);
        }

        Ok(Self { view_size, mips })
    }

    /// A pyramid that occludes nothing (every texel at the far plane).
    ///
    /// Bound for the first frame, before any depth exists.
    ///
    /// # Errors
    ///
    /// Returns [`PreprocessError::EmptyView`] for a zero-sized view.
    pub fn cleared(view_size: UVec2) -> PreprocessResult<Self> {
        let texels = vec![0.0; view_size.x as usize * view_size.y as usize];
        Self::from_depth_buffer(view_size, &texels)
    }

    /// Size of the depth buffer the pyramid was built from.
    #[inline]
    #[must_use]
    pub const fn view_size(&self) -> UVec2 {
        self.view_size
    }

    /// Number of mip levels.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // at most MAX_DEPTH_PYRAMID_MIPS levels
    pub fn mip_count(&self) -> u32 {
        self.mips.len() as u32
    }

    /// Size of mip `mip`, clamped to the last level.
    #[must_use]
    pub fn mip_size(&self, mip: u32) -> UVec2 {
        self.mip(mip).size
    }

    fn mip(&self, mip: u32) -> &PyramidMip {
        &self.mips[(mip as usize).min(self.mips.len() - 1)]
    }

    /// Loads one texel. Coordinates and mip are clamped.
    #[must_use]
    pub fn load(&self, mip: u32, texel: UVec2) -> f32 {
        self.mip(mip).load(texel)
    }

    /// Mip level whose texels cover a UV rectangle in about one texel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // log2 of a footprint > 1
    pub fn footprint_mip(&self, uv_min: Vec2, uv_max: Vec2) -> u32 {
        let extent = (uv_max - uv_min) * self.mips[0].size.as_vec2();
        let footprint = extent.max_element();
        if footprint <= 1.0 {
            0
        } else {
            (footprint.log2().ceil() as u32).min(self.mip_count() - 1)
        }
    }

    /// Farthest occluder depth over a UV rectangle.
    ///
    /// The rectangle is mapped to depth buffer pixels first, then to the
    /// texels of its footprint mip covering those pixels, so odd view sizes
    /// never shift the sampled region. The result is the minimum over all of
    /// them, at most 2×2 texels below the last mip.
    #[must_use]
    pub fn occluder_depth(&self, uv_min: Vec2, uv_max: Vec2) -> f32 {
        let uv_min = uv_min.clamp(Vec2::ZERO, Vec2::ONE);
        let uv_max = uv_max.clamp(Vec2::ZERO, Vec2::ONE);
        let level = self.footprint_mip(uv_min, uv_max);
        let mip = self.mip(level);

        // Texel k of mip m covers pixels [k << (m + 1), (k + 1) << (m + 1)).
        let view = self.view_size.as_vec2();
        let last_pixel = self.view_size - UVec2::ONE;
        let to_texel = |uv: Vec2| {
            let pixel = (uv * view).floor().as_uvec2().min(last_pixel);
            UVec2::new(pixel.x >> (level + 1), pixel.y >> (level + 1))
        };
        let lo = to_texel(uv_min);
        let hi = to_texel(uv_max);

        (lo.y..=hi.y)
            .flat_map(|y| (lo.x..=hi.x).map(move |x| UVec2::new(x, y)))
            .map(|texel| mip.load(texel))
            .fold(f32::INFINITY, f32::min)
    }
}

/// Occlusion test of one view against its depth pyramid.
#[derive(Debug, Clone, Copy)]
pub struct OcclusionCuller<'a> {
    clip_from_world: Mat4,
    pyramid: &'a DepthPyramid,
}

impl<'a> OcclusionCuller<'a> {
    /// Creates a culler for a view.
    #[must_use]
    pub const fn new(clip_from_world: Mat4, pyramid: &'a DepthPyramid) -> Self {
        Self {
            clip_from_world,
            pyramid,
        }
    }

    /// Returns true unless the box is certainly hidden behind the pyramid.
    ///
    /// All eight corners are projected; their screen bounds select the
    /// pyramid mip and their nearest depth is compared against the
    /// occluder depth there. A box crossing the camera plane is visible.
    #[must_use]
    pub fn is_visible(
        &self,
        world_from_local: &Affine3A,
        aabb_center: Vec3,
        aabb_half_extents: Vec3,
    ) -> bool {
        let clip_from_local = self.clip_from_world * Mat4::from(*world_from_local);

        let mut uv_min = Vec2::splat(f32::INFINITY);
        let mut uv_max = Vec2::splat(f32::NEG_INFINITY);
        let mut nearest_depth = f32::NEG_INFINITY;

        for corner in 0..8u32 {
            let sign = Vec3::new(
                if corner & 1 == 0 { -1.0 } else { 1.0 },
                if corner & 2 == 0 { -1.0 } else { 1.0 },
                if corner & 4 == 0 { -1.0 } else { 1.0 },
            );
            let clip = clip_from_local * (aabb_center + sign * aabb_half_extents).extend(1.0);
            if clip.w <= 0.0 {
                return true;
            }

            let ndc = clip.truncate() / clip.w;
            let uv = ndc.truncate() * Vec2::new(0.5, -0.5) + Vec2::splat(0.5);
            uv_min = uv_min.min(uv);
            uv_max = uv_max.max(uv);
            nearest_depth = nearest_depth.max(ndc.z);
        }

        nearest_depth >= self.pyramid.occluder_depth(uv_min, uv_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn camera() -> Mat4 {
        Mat4::perspective_infinite_reverse_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1)
    }

    #[test]
    fn test_pyramid_dimensions() {
        let pyramid = DepthPyramid::cleared(UVec2::new(65, 33)).unwrap();

        assert_eq!(pyramid.mip_size(0), UVec2::new(33, 17));
        // floor(log2(33)) + 1
        assert_eq!(pyramid.mip_count(), 6);
        assert_eq!(pyramid.mip_size(5), UVec2::new(2, 1));
        assert_eq!(pyramid.mip_size(9), UVec2::new(2, 1));
        assert_eq!(pyramid.view_size(), UVec2::new(65, 33));
    }

    #[test]
    fn test_pyramid_keeps_farthest_depth() {
        let mut depth = vec![1.0; 16];
        depth[5] = 0.25;
        let pyramid = DepthPyramid::from_depth_buffer(UVec2::new(4, 4), &depth).unwrap();

        assert_eq!(pyramid.load(0, UVec2::new(0, 0)), 0.25);
        assert_eq!(pyramid.load(0, UVec2::new(1, 1)), 1.0);
        assert_eq!(pyramid.load(1, UVec2::ZERO), 0.25);
    }

    #[test]
    fn test_rejects_bad_depth_buffer() {
        assert!(matches!(
            DepthPyramid::from_depth_buffer(UVec2::new(2, 2), &[1.0; 3]),
            Err(PreprocessError::DepthBufferSizeMismatch { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            DepthPyramid::from_depth_buffer(UVec2::new(0, 2), &[]),
            Err(PreprocessError::EmptyView)
        ));
    }

    #[test]
    fn test_footprint_mip() {
        let pyramid = DepthPyramid::cleared(UVec2::new(256, 256)).unwrap();
        // mip 0 is 128 texels wide
        assert_eq!(pyramid.footprint_mip(Vec2::ZERO, Vec2::splat(0.5 / 128.0)), 0);
        assert_eq!(pyramid.footprint_mip(Vec2::ZERO, Vec2::splat(4.0 / 128.0)), 2);
        assert_eq!(pyramid.footprint_mip(Vec2::ZERO, Vec2::splat(5.0 / 128.0)), 3);
        assert_eq!(pyramid.footprint_mip(Vec2::ZERO, Vec2::ONE), 7);
    }

    /// Minimum source depth over the pixels a UV rectangle touches.
    fn brute_force_min(view_size: UVec2, depth: &[f32], uv_min: Vec2, uv_max: Vec2) -> f32 {
        let last = view_size - UVec2::ONE;
        let lo = (uv_min * view_size.as_vec2()).floor().as_uvec2().min(last);
        let hi = (uv_max * view_size.as_vec2()).floor().as_uvec2().min(last);
        let mut min = f32::INFINITY;
        for y in lo.y..=hi.y {
            for x in lo.x..=hi.x {
                min = min.min(depth[(y * view_size.x + x) as usize]);
            }
        }
        min
    }

    #[test]
    fn test_occluder_depth_on_odd_view_sees_hole_across_texel_boundary() {
        // 6×6 view: wall at 0.9 everywhere except a far column at x = 3.
        let mut depth = vec![0.9; 36];
        for y in 0..6 {
            depth[y * 6 + 3] = 0.0;
        }
        let pyramid = DepthPyramid::from_depth_buffer(UVec2::new(6, 6), &depth).unwrap();

        // Covers pixel columns 3..=5.
        let occluder = pyramid.occluder_depth(Vec2::new(0.51, 0.1), Vec2::new(0.9, 0.3));
        assert_eq!(occluder, 0.0);
        // Columns 4..=5 only.
        let occluder = pyramid.occluder_depth(Vec2::new(0.7, 0.1), Vec2::new(0.9, 0.3));
        assert_eq!(occluder, 0.9);
    }

    #[test]
    fn test_occluder_depth_never_exceeds_covered_pixels() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xD3_97);
        for view_size in [
            UVec2::new(6, 6),
            UVec2::new(5, 3),
            UVec2::new(7, 13),
            UVec2::new(1920, 1080),
        ] {
            let depth: Vec<f32> = (0..view_size.x * view_size.y)
                .map(|_| rng.gen_range(0.0..1.0))
                .collect();
            let pyramid = DepthPyramid::from_depth_buffer(view_size, &depth).unwrap();

            for _ in 0..48 {
                let a = Vec2::new(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0));
                // Footprints from sub-pixel to whole screen.
                let extent = Vec2::splat(rng.gen_range(0.0f32..1.0).powi(4));
                let (uv_min, uv_max) = (a, (a + extent).min(Vec2::ONE));

                let expected = brute_force_min(view_size, &depth, uv_min, uv_max);
                let occluder = pyramid.occluder_depth(uv_min, uv_max);
                assert!(
                    occluder <= expected,
                    "{view_size}: {uv_min}..{uv_max} sampled {occluder} over pixels at {expected}"
                );
            }
        }
    }

    #[test]
    fn test_box_in_front_of_hole_is_never_culled() {
        let distance = 50.0;
        // Box centres project to UV (0.7, 0.7).
        let center = Vec3::new(0.4 * distance, -0.4 * distance, -distance);

        for view_size in [UVec2::new(6, 6), UVec2::new(5, 3), UVec2::new(1920, 1080)] {
            let hole = (Vec2::splat(0.7) * view_size.as_vec2()).floor().as_uvec2();
            let mut depth = vec![0.9; (view_size.x * view_size.y) as usize];
            depth[(hole.y * view_size.x + hole.x) as usize] = 0.0;
            let pyramid = DepthPyramid::from_depth_buffer(view_size, &depth).unwrap();
            let culler = OcclusionCuller::new(camera(), &pyramid);

            let mut half_extent = 0.01;
            while half_extent < 20.0 {
                assert!(
                    culler.is_visible(
                        &Affine3A::from_translation(center),
                        Vec3::ZERO,
                        Vec3::splat(half_extent)
                    ),
                    "{view_size}: box of half extent {half_extent} culled over the hole"
                );
                half_extent *= 1.5;
            }

            // Away from the hole the wall still hides a small box.
            let elsewhere =
                Affine3A::from_translation(Vec3::new(-0.6 * distance, 0.6 * distance, -distance));
            assert!(!culler.is_visible(&elsewhere, Vec3::ZERO, Vec3::splat(0.01)));
        }
    }

    #[test]
    fn test_small_far_box_behind_wall_is_occluded() {
        // Wall at view depth ~0.11 covering the whole screen.
        let pyramid =
            DepthPyramid::from_depth_buffer(UVec2::new(64, 64), &[0.9; 64 * 64]).unwrap();
        let culler = OcclusionCuller::new(camera(), &pyramid);
        let behind = Affine3A::from_translation(Vec3::new(0.0, 0.0, -50.0));

        assert!(!culler.is_visible(&behind, Vec3::ZERO, Vec3::splat(0.1)));
    }

    #[test]
    fn test_box_in_front_of_wall_is_visible() {
        let pyramid =
            DepthPyramid::from_depth_buffer(UVec2::new(64, 64), &[0.001; 64 * 64]).unwrap();
        let culler = OcclusionCuller::new(camera(), &pyramid);
        let near = Affine3A::from_translation(Vec3::new(0.0, 0.0, -5.0));

        assert!(culler.is_visible(&near, Vec3::ZERO, Vec3::ONE));
    }

    #[test]
    fn test_box_crossing_camera_plane_is_visible() {
        let pyramid = DepthPyramid::from_depth_buffer(UVec2::new(8, 8), &[1.0; 64]).unwrap();
        let culler = OcclusionCuller::new(camera(), &pyramid);

        assert!(culler.is_visible(&Affine3A::IDENTITY, Vec3::ZERO, Vec3::ONE));
    }
}

//! Packed transform codec.
//!
//! Instances carry their world transform as a transposed 3×4 affine matrix
//! (three rows of `[f32; 4]`, translation in `w`). The preprocessing stage
//! expands it to a full matrix, and packs the inverse-transpose of its 3×3
//! part into nine floats for normal transformation.

use glam::{Affine3A, DMat3, Mat3, Vec2, Vec3, Vec3A, Vec4};

/// Transposed 3×4 affine transform: row `i` is `(m[0][i], m[1][i], m[2][i], t[i])`.
pub type PackedAffine3 = [[f32; 4]; 3];

/// Packs an affine transform into its transposed 3×4 form.
#[must_use]
pub fn pack_affine(affine: &Affine3A) -> PackedAffine3 {
    let rows = Mat3::from(affine.matrix3).transpose();
    let t = affine.translation;
    [
        rows.x_axis.extend(t.x).to_array(),
        rows.y_axis.extend(t.y).to_array(),
        rows.z_axis.extend(t.z).to_array(),
    ]
}

/// Expands a transposed 3×4 form back to a full affine transform.
#[inline]
#[must_use]
pub fn unpack_affine(packed: &PackedAffine3) -> Affine3A {
    let [r0, r1, r2] = *packed;
    Affine3A::from_cols(
        Vec3A::new(r0[0], r1[0], r2[0]),
        Vec3A::new(r0[1], r1[1], r2[1]),
        Vec3A::new(r0[2], r1[2], r2[2]),
        Vec3A::new(r0[3], r1[3], r2[3]),
    )
}

/// Inverse-transpose of a world transform's 3×3 part, packed as a 2×4
/// matrix plus one scalar.
///
/// Layout (column-major source matrix `m`):
///
/// ```text
/// a[0] = (m.x.x, m.x.y, m.x.z, m.y.x)
/// a[1] = (m.y.y, m.y.z, m.z.x, m.z.y)
/// b    =  m.z.z
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PackedInverseTranspose {
    /// First eight entries.
    pub a: [[f32; 4]; 2],
    /// Last entry.
    pub b: f32,
}

impl PackedInverseTranspose {
    /// Computes and packs the inverse-transpose of `world_from_local`.
    ///
    /// The inversion runs in double precision so that near-singular (but
    /// still invertible) scales survive the round trip. Non-invertible input
    /// produces non-finite entries.
    #[must_use]
    pub fn from_affine(world_from_local: &Affine3A) -> Self {
        let m: DMat3 = Mat3::from(world_from_local.matrix3).as_dmat3();
        Self::pack(m.inverse().transpose().as_mat3())
    }

    /// Packs an already computed 3×3 matrix.
    #[must_use]
    pub fn pack(m: Mat3) -> Self {
        Self {
            a: [
                [m.x_axis.x, m.x_axis.y, m.x_axis.z, m.y_axis.x],
                [m.y_axis.y, m.y_axis.z, m.z_axis.x, m.z_axis.y],
            ],
            b: m.z_axis.z,
        }
    }

    /// Unpacks to the full 3×3 matrix.
    #[must_use]
    pub fn unpack(&self) -> Mat3 {
        let [a0, a1] = self.a;
        Mat3::from_cols(
            Vec3::new(a0[0], a0[1], a0[2]),
            Vec3::new(a0[3], a1[0], a1[1]),
            Vec3::new(a1[2], a1[3], self.b),
        )
    }
}

/// Lightmap UV sub-rectangle in normalized texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightmapUvRect {
    /// Minimum corner.
    pub min: Vec2,
    /// Maximum corner.
    pub max: Vec2,
}

impl LightmapUvRect {
    /// Creates a new rectangle.
    #[must_use]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }
}

/// Quantizes a lightmap rectangle to 16-bit unorm pairs.
///
/// `x` holds `min.x | min.y << 16`, `y` holds `max.x | max.y << 16`.
/// `None` (no lightmap) packs to zeros.
#[must_use]
pub fn pack_lightmap_uv_rect(rect: Option<LightmapUvRect>) -> [u32; 2] {
    match rect {
        Some(rect) => {
            let q = (Vec4::new(rect.min.x, rect.min.y, rect.max.x, rect.max.y)
                .clamp(Vec4::ZERO, Vec4::ONE)
                * 65535.0)
                .round()
                .as_uvec4();
            [q.x | (q.y << 16), q.z | (q.w << 16)]
        }
        None => [0, 0],
    }
}

/// Inverse of [`pack_lightmap_uv_rect`], up to quantization.
#[must_use]
pub fn unpack_lightmap_uv_rect(packed: [u32; 2]) -> LightmapUvRect {
    #[allow(clippy::cast_precision_loss)]
    let unorm = |v: u32| (v & 0xFFFF) as f32 / 65535.0;
    LightmapUvRect {
        min: Vec2::new(unorm(packed[0]), unorm(packed[0] >> 16)),
        max: Vec2::new(unorm(packed[1]), unorm(packed[1] >> 16)),
    }
}

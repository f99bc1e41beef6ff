//! Conversions between voxel, world and absolute coordinates.
//!
//! World space is reached from the voxel grid through a signed axis
//! permutation plus an integer offset, so it never needs resampling.
//! Absolute space is reached through the full millimetre affine and lands on
//! fractional voxel coordinates.

use nalgebra::{Matrix4, Vector3, Vector4};

use crate::error::{Result, VolumeError};

/// Homogeneous 4x4 affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine(pub Matrix4<f64>);

impl Affine {
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// Axis-aligned voxel-to-millimetre transform with the given spacing.
    pub fn from_spacing(pixdim: [f64; 3]) -> Self {
        Self(Matrix4::new_nonuniform_scaling(&Vector3::from(pixdim)))
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    #[inline]
    pub fn apply(&self, point: [f64; 3]) -> [f64; 3] {
        let v = self.0 * Vector4::new(point[0], point[1], point[2], 1.0);
        [v.x, v.y, v.z]
    }

    pub fn inverse(&self) -> Result<Self> {
        self.0
            .try_inverse()
            .map(Self)
            .ok_or(VolumeError::SingularAffine)
    }

    /// Millimetre-to-voxel transform for coordinates centred on the volume.
    ///
    /// Absolute coordinate `[0, 0, 0]` lands on voxel coordinate `dim / 2`.
    pub fn centred_mm_to_voxel(voxel_to_mm: &Affine, dim: [usize; 3]) -> Result<Self> {
        let inverse = voxel_to_mm.inverse()?;
        let centre = voxel_to_mm.apply([
            dim[0] as f64 / 2.0,
            dim[1] as f64 / 2.0,
            dim[2] as f64 / 2.0,
        ]);
        let shift = Matrix4::new_translation(&Vector3::from(centre));
        Ok(Self(inverse.0 * shift))
    }
}

/// Signed permutation from world axes to native voxel axes.
///
/// For world axis `w`: `voxel[axes[w]] = offsets[w] + signs[w] * world[w]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMapping {
    axes: [usize; 3],
    signs: [i64; 3],
    offsets: [i64; 3],
}

impl AxisMapping {
    pub fn identity() -> Self {
        Self {
            axes: [0, 1, 2],
            signs: [1, 1, 1],
            offsets: [0, 0, 0],
        }
    }

    /// Build a mapping, rejecting axis assignments that are not a permutation.
    pub fn new(axes: [usize; 3], signs: [i64; 3], offsets: [i64; 3]) -> Result<Self> {
        let mut seen = [false; 3];
        for &axis in &axes {
            if axis > 2 || seen[axis] {
                return Err(VolumeError::DegenerateAxes);
            }
            seen[axis] = true;
        }
        if signs.iter().any(|s| s.abs() != 1) {
            return Err(VolumeError::DegenerateAxes);
        }
        Ok(Self {
            axes,
            signs,
            offsets,
        })
    }

    /// Derive the mapping from a voxel-to-millimetre matrix.
    ///
    /// Each world axis takes the unused native axis whose direction has the
    /// largest component along it. Flipped axes start counting from the far
    /// end of the grid so that world coordinates stay non-negative.
    pub fn from_affine(voxel_to_mm: &Affine, dim: [usize; 3]) -> Result<Self> {
        let m = voxel_to_mm.matrix();
        let mut axes = [0; 3];
        let mut signs = [1; 3];
        let mut offsets = [0; 3];
        let mut used = [false; 3];

        for world in 0..3 {
            let (native, component) = (0..3)
                .filter(|&native| !used[native])
                .map(|native| (native, m[(world, native)]))
                .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
                .ok_or(VolumeError::DegenerateAxes)?;
            if component == 0.0 || !component.is_finite() {
                return Err(VolumeError::DegenerateAxes);
            }
            used[native] = true;
            axes[world] = native;
            if component < 0.0 {
                signs[world] = -1;
                offsets[world] = dim[native] as i64 - 1;
            }
        }

        Self::new(axes, signs, offsets)
    }

    pub fn axes(&self) -> [usize; 3] {
        self.axes
    }

    pub fn signs(&self) -> [i64; 3] {
        self.signs
    }

    pub fn offsets(&self) -> [i64; 3] {
        self.offsets
    }

    /// Extents of the grid as seen along the world axes.
    pub fn world_extents(&self, dim: [usize; 3]) -> [usize; 3] {
        self.axes.map(|native| dim[native])
    }

    /// Spacing along the world axes.
    pub fn world_spacing(&self, pixdim: [f64; 3]) -> [f64; 3] {
        self.axes.map(|native| pixdim[native])
    }

    /// World coordinate to voxel coordinate. No bounds check.
    #[inline]
    pub fn world_to_voxel(&self, s: [i64; 3]) -> [i64; 3] {
        let mut v = [0; 3];
        for world in 0..3 {
            v[self.axes[world]] = self.offsets[world] + self.signs[world] * s[world];
        }
        v
    }

    /// Voxel coordinate to world coordinate.
    #[inline]
    pub fn voxel_to_world(&self, v: [i64; 3]) -> [i64; 3] {
        let mut s = [0; 3];
        for world in 0..3 {
            // signs are +-1, so multiplying inverts them
            s[world] = self.signs[world] * (v[self.axes[world]] - self.offsets[world]);
        }
        s
    }

    /// Flat buffer index of a world coordinate. No bounds check: the result
    /// may be negative or past the end for coordinates outside the grid.
    pub fn world_to_voxel_index(&self, s: [i64; 3], dim: [usize; 3]) -> i64 {
        let v = self.world_to_voxel(s);
        let (d0, d1) = (dim[0] as i64, dim[1] as i64);
        v[0] + v[1] * d0 + v[2] * d0 * d1
    }
}

/// Checked conversion of a signed coordinate into grid indices.
#[inline]
pub fn voxel_in_bounds(v: [i64; 3], dim: [usize; 3]) -> Option<[usize; 3]> {
    let mut out = [0; 3];
    for axis in 0..3 {
        let c = usize::try_from(v[axis]).ok()?;
        if c >= dim[axis] {
            return None;
        }
        out[axis] = c;
    }
    Some(out)
}

/// Floor a fractional voxel coordinate, `None` when it falls off the grid.
#[inline]
pub fn floor_in_bounds(coord: [f64; 3], dim: [usize; 3]) -> Option<[usize; 3]> {
    if coord.iter().any(|c| !c.is_finite()) {
        return None;
    }
    voxel_in_bounds(coord.map(|c| c.floor() as i64), dim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn flipped_affine() -> Affine {
        // voxel axis 0 -> -y, axis 1 -> +z, axis 2 -> +x
        #[rustfmt::skip]
        let m = Matrix4::new(
            0.0, 0.0, 2.0, 0.0,
            -1.0, 0.0, 0.0, 0.0,
            0.0, 3.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        Affine(m)
    }

    #[test]
    fn test_identity_mapping_from_diagonal() {
        let mapping = AxisMapping::from_affine(&Affine::from_spacing([1.0, 2.0, 3.0]), [4, 5, 6])
            .unwrap();
        assert_eq!(mapping, AxisMapping::identity());
    }

    #[test]
    fn test_permuted_mapping() {
        let mapping = AxisMapping::from_affine(&flipped_affine(), [4, 5, 6]).unwrap();
        assert_eq!(mapping.axes(), [2, 0, 1]);
        assert_eq!(mapping.signs(), [1, -1, 1]);
        assert_eq!(mapping.offsets(), [0, 3, 0]);
        assert_eq!(mapping.world_extents([4, 5, 6]), [6, 4, 5]);
        assert_eq!(mapping.world_spacing([2.0, 3.0, 1.0]), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_world_voxel_round_trip() {
        let dim = [4, 5, 6];
        let mapping = AxisMapping::from_affine(&flipped_affine(), dim).unwrap();
        let extents = mapping.world_extents(dim);
        for i in 0..extents[0] as i64 {
            for j in 0..extents[1] as i64 {
                for k in 0..extents[2] as i64 {
                    let s = [i, j, k];
                    let v = mapping.world_to_voxel(s);
                    assert!(voxel_in_bounds(v, dim).is_some(), "{s:?} -> {v:?}");
                    assert_eq!(mapping.voxel_to_world(v), s);
                }
            }
        }
    }

    #[test]
    fn test_world_to_voxel_index() {
        let dim = [4, 5, 6];
        let mapping = AxisMapping::from_affine(&flipped_affine(), dim).unwrap();
        // world (0, 0, 0) -> voxel (3, 0, 0)
        assert_eq!(mapping.world_to_voxel_index([0, 0, 0], dim), 3);
        // world (2, 1, 4) -> voxel (2, 4, 2)
        assert_eq!(mapping.world_to_voxel_index([2, 1, 4], dim), 2 + 4 * 4 + 2 * 20);
    }

    #[test]
    fn test_rejects_repeated_axis() {
        assert_eq!(
            AxisMapping::new([0, 0, 2], [1, 1, 1], [0, 0, 0]),
            Err(VolumeError::DegenerateAxes)
        );
    }

    #[test]
    fn test_centred_mm_to_voxel() {
        let v2m = Affine::from_spacing([2.0, 2.0, 2.0]);
        let m2v = Affine::centred_mm_to_voxel(&v2m, [4, 6, 8]).unwrap();
        let centre = m2v.apply([0.0, 0.0, 0.0]);
        assert_abs_diff_eq!(centre[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(centre[1], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(centre[2], 4.0, epsilon = 1e-12);
        let step = m2v.apply([2.0, 0.0, -4.0]);
        assert_abs_diff_eq!(step[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(step[2], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(voxel_in_bounds([0, 0, 0], [1, 1, 1]), Some([0, 0, 0]));
        assert_eq!(voxel_in_bounds([-1, 0, 0], [4, 4, 4]), None);
        assert_eq!(voxel_in_bounds([0, 4, 0], [4, 4, 4]), None);
        assert_eq!(floor_in_bounds([3.99, 0.0, 0.5], [4, 4, 4]), Some([3, 0, 0]));
        assert_eq!(floor_in_bounds([-0.01, 0.0, 0.0], [4, 4, 4]), None);
        assert_eq!(floor_in_bounds([f64::NAN, 0.0, 0.0], [4, 4, 4]), None);
    }
}

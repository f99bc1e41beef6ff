//! Raster geometry for every (space, plane) pair.

use crate::config::DEFAULT_CUBE_SCALE;
use crate::enums::{Plane, Space};
use crate::volume::Volume;

/// Raster size and pixel spacing of one plane in one space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpaceDescriptor {
    pub width: usize,
    pub height: usize,
    /// Number of slices along the viewing axis.
    pub depth: usize,
    /// Millimetres per pixel along the raster width.
    pub width_spacing: f64,
    /// Millimetres per pixel along the raster height.
    pub height_spacing: f64,
}

impl SpaceDescriptor {
    fn from_axes(plane: Plane, extents: [usize; 3], spacing: [f64; 3]) -> Self {
        let (w, h, d) = plane.axes();
        Self {
            width: extents[w],
            height: extents[h],
            depth: extents[d],
            width_spacing: spacing[w],
            height_spacing: spacing[h],
        }
    }

    pub fn max_slice(&self) -> usize {
        self.depth.saturating_sub(1)
    }

    pub fn mid_slice(&self) -> usize {
        self.max_slice() / 2
    }

    /// On-screen height that restores the physical aspect ratio.
    pub fn display_height(&self) -> usize {
        let height = self.height as f64 * self.height_spacing / self.width_spacing;
        (height.round() as usize).max(1)
    }
}

/// Per-space extents and spacing of a volume, resolved once at load.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceResolver {
    voxel_extents: [usize; 3],
    voxel_spacing: [f64; 3],
    world_extents: [usize; 3],
    world_spacing: [f64; 3],
    cube_edge: usize,
    cube_pitch: f64,
}

impl SpaceResolver {
    /// Resolve the geometry of `volume`.
    ///
    /// A `cube_scale` that is not a positive finite number falls back to
    /// [`DEFAULT_CUBE_SCALE`].
    pub fn new(volume: &Volume, cube_scale: f64) -> Self {
        let cube_scale = if cube_scale.is_finite() && cube_scale > 0.0 {
            cube_scale
        } else {
            tracing::warn!(cube_scale, "invalid cube scale, using default");
            DEFAULT_CUBE_SCALE
        };
        let dim = volume.dim();
        let pixdim = volume.pixdim();
        let mapping = volume.axis_mapping();
        let world_extents = mapping.world_extents(dim);
        let world_spacing = mapping.world_spacing(pixdim);

        let mut sorted = pixdim;
        sorted.sort_unstable_by(f64::total_cmp);
        let cube_pitch = sorted[1];

        let largest = (0..3)
            .map(|axis| world_extents[axis] as f64 * world_spacing[axis] / cube_pitch)
            .fold(0.0_f64, f64::max);
        // rasters are addressed with u32 coordinates
        let cube_edge = ((cube_scale * largest).round() as usize).clamp(1, u32::MAX as usize);

        Self {
            voxel_extents: dim,
            voxel_spacing: pixdim,
            world_extents,
            world_spacing,
            cube_edge,
            cube_pitch,
        }
    }

    /// Edge length in pixels of the absolute-space cube.
    pub fn cube_edge(&self) -> usize {
        self.cube_edge
    }

    /// Millimetres per pixel in absolute space (median voxel spacing).
    pub fn cube_pitch(&self) -> f64 {
        self.cube_pitch
    }

    pub fn resolve(&self, space: Space, plane: Plane) -> SpaceDescriptor {
        match space {
            Space::Voxel => {
                SpaceDescriptor::from_axes(plane, self.voxel_extents, self.voxel_spacing)
            }
            Space::World => {
                SpaceDescriptor::from_axes(plane, self.world_extents, self.world_spacing)
            }
            Space::Absolute => SpaceDescriptor::from_axes(
                plane,
                [self.cube_edge; 3],
                [self.cube_pitch; 3],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Affine;
    use crate::volume::VoxelData;
    use nalgebra::Matrix4;

    fn volume(dim: [usize; 3], pixdim: [f64; 3]) -> Volume {
        let n = dim[0] * dim[1] * dim[2];
        Volume::from_flat(dim, pixdim, 1, vec![0.0; n]).unwrap()
    }

    #[test]
    fn test_voxel_planes() {
        let resolver = SpaceResolver::new(&volume([10, 20, 30], [1.0, 2.0, 3.0]), 1.5);
        let sag = resolver.resolve(Space::Voxel, Plane::Sagittal);
        assert_eq!((sag.width, sag.height, sag.depth), (20, 30, 10));
        assert_eq!((sag.width_spacing, sag.height_spacing), (2.0, 3.0));
        let cor = resolver.resolve(Space::Voxel, Plane::Coronal);
        assert_eq!((cor.width, cor.height, cor.depth), (10, 30, 20));
        let axi = resolver.resolve(Space::Voxel, Plane::Axial);
        assert_eq!((axi.width, axi.height, axi.depth), (10, 20, 30));
        assert_eq!(axi.display_height(), 40);
    }

    #[test]
    fn test_world_planes_follow_mapping() {
        // voxel axes (0, 1, 2) run along world (z, x, y)
        #[rustfmt::skip]
        let m = Matrix4::new(
            0.0, 2.0, 0.0, 0.0,
            0.0, 0.0, 3.0, 0.0,
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let data = VoxelData::from_flat([10, 20, 30], 1, vec![0.0; 6000]).unwrap();
        let volume = Volume::new(data, [1.0, 2.0, 3.0], Affine(m)).unwrap();
        let resolver = SpaceResolver::new(&volume, 1.5);
        let axi = resolver.resolve(Space::World, Plane::Axial);
        assert_eq!((axi.width, axi.height, axi.depth), (20, 30, 10));
        assert_eq!((axi.width_spacing, axi.height_spacing), (2.0, 3.0));
    }

    #[test]
    fn test_absolute_cube_is_shared() {
        let resolver = SpaceResolver::new(&volume([10, 20, 30], [1.0, 2.0, 3.0]), 1.5);
        // largest physical extent 90 mm over a 2 mm pitch, scaled by 1.5
        assert_eq!(resolver.cube_edge(), 68);
        assert_eq!(resolver.cube_pitch(), 2.0);
        for plane in Plane::ALL {
            let d = resolver.resolve(Space::Absolute, plane);
            assert_eq!((d.width, d.height, d.depth), (68, 68, 68));
            assert_eq!(d.display_height(), 68);
        }
    }

    #[test]
    fn test_invalid_cube_scale_falls_back() {
        let volume = volume([10, 20, 30], [1.0, 2.0, 3.0]);
        let expected = SpaceResolver::new(&volume, DEFAULT_CUBE_SCALE).cube_edge();
        for scale in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.0, -2.0] {
            assert_eq!(SpaceResolver::new(&volume, scale).cube_edge(), expected, "{scale}");
        }
        assert_eq!(SpaceResolver::new(&volume, 1e300).cube_edge(), u32::MAX as usize);
    }

    #[test]
    fn test_extents_are_permutations() {
        let resolver = SpaceResolver::new(&volume([5, 7, 9], [1.0, 1.0, 1.0]), 1.5);
        for space in [Space::Voxel, Space::World] {
            for plane in Plane::ALL {
                let d = resolver.resolve(space, plane);
                let mut extents = [d.width, d.height, d.depth];
                extents.sort_unstable();
                assert_eq!(extents, [5, 7, 9]);
            }
        }
    }

    #[test]
    fn test_mid_slice() {
        let resolver = SpaceResolver::new(&volume([4, 5, 1], [1.0, 1.0, 1.0]), 1.5);
        assert_eq!(resolver.resolve(Space::Voxel, Plane::Sagittal).mid_slice(), 1);
        assert_eq!(resolver.resolve(Space::Voxel, Plane::Coronal).mid_slice(), 2);
        assert_eq!(resolver.resolve(Space::Voxel, Plane::Axial).mid_slice(), 0);
    }
}

//! Slice rasterization.
//!
//! Every output pixel is mapped back into the volume through the active
//! space. Pixels that land outside the grid are painted with a sentinel
//! colour specific to the space instead of failing.

use image::{Rgba, RgbaImage};

use crate::config::{Crosshair, ViewerConfig};
use crate::enums::{Plane, Space};
use crate::interpolator::Interpolator;
use crate::normalizer::DisplayCeiling;
use crate::space::{SpaceDescriptor, SpaceResolver};
use crate::transform::{floor_in_bounds, voxel_in_bounds};
use crate::volume::{Sample, Volume, VoxelData};

/// Voxel-space pixel outside the grid.
pub const VOXEL_SENTINEL: [u8; 4] = [0, 0, 255, 255];
/// World-space pixel outside the grid.
pub const WORLD_SENTINEL: [u8; 4] = [0, 255, 0, 255];
/// Absolute-space pixel outside the grid.
pub const ABSOLUTE_SENTINEL: [u8; 4] = [0, 0, 0, 100];

/// One (space, plane, slice) pass over a volume.
pub struct SliceRasterizer<'a> {
    volume: &'a Volume,
    ceiling: DisplayCeiling,
    crosshair: Option<Crosshair>,
    space: Space,
    plane: Plane,
    slice: usize,
    descriptor: SpaceDescriptor,
    cube_half: f64,
    cube_pitch: f64,
}

impl<'a> SliceRasterizer<'a> {
    pub fn new(
        volume: &'a Volume,
        resolver: &SpaceResolver,
        ceiling: DisplayCeiling,
        config: &ViewerConfig,
        space: Space,
        plane: Plane,
        slice: usize,
    ) -> Self {
        Self {
            volume,
            ceiling,
            crosshair: config.crosshair,
            space,
            plane,
            slice,
            descriptor: resolver.resolve(space, plane),
            cube_half: resolver.cube_edge() as f64 / 2.0,
            cube_pitch: resolver.cube_pitch(),
        }
    }

    pub fn descriptor(&self) -> &SpaceDescriptor {
        &self.descriptor
    }

    /// Position of pixel `(x, y)` in the active plane's axis order, `None`
    /// outside the raster.
    #[inline]
    fn axis_tuple(&self, x: usize, y: usize) -> Option<[usize; 3]> {
        if x >= self.descriptor.width {
            return None;
        }
        let row = self.descriptor.height.checked_sub(y.checked_add(1)?)?;
        Some(self.plane.to_axis_order(x, row, self.slice))
    }

    /// Raw volume value behind pixel `(x, y)`, `None` off the grid or
    /// outside the raster.
    pub fn sample(&self, x: usize, y: usize) -> Option<Sample> {
        let t = self.axis_tuple(x, y)?;
        let dim = self.volume.dim();
        match self.space {
            Space::Voxel => {
                let v = voxel_in_bounds(t.map(|c| c as i64), dim)?;
                Some(self.volume.voxel(v))
            }
            Space::World => {
                let s = t.map(|c| c as i64);
                let v = voxel_in_bounds(self.volume.axis_mapping().world_to_voxel(s), dim)?;
                Some(self.volume.voxel(v))
            }
            Space::Absolute => {
                let a = t.map(|c| (c as f64 - self.cube_half) * self.cube_pitch);
                let coord = self.volume.absolute_to_voxel_coord(a);
                let v = floor_in_bounds(coord, dim)?;
                match self.volume.data() {
                    VoxelData::Scalar(data) => Some(Sample::Scalar(
                        Interpolator::trilinear_interpolate(
                            &data.view(),
                            coord[0],
                            coord[1],
                            coord[2],
                        ),
                    )),
                    // vector data is never interpolated
                    VoxelData::Vector3(_) => Some(self.volume.voxel(v)),
                }
            }
        }
    }

    /// Display colour of a sample.
    #[inline]
    pub fn shade(&self, sample: Sample) -> [u8; 4] {
        match sample {
            Sample::Scalar(value) => {
                let v = self.ceiling.scale(value);
                [v, v, v, 255]
            }
            Sample::Vector([r, g, b]) => [
                self.ceiling.scale(r),
                self.ceiling.scale(g),
                self.ceiling.scale(b),
                255,
            ],
        }
    }

    fn sentinel(&self) -> [u8; 4] {
        match self.space {
            Space::Voxel => VOXEL_SENTINEL,
            Space::World => WORLD_SENTINEL,
            Space::Absolute => ABSOLUTE_SENTINEL,
        }
    }

    /// Final colour of pixel `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let color = self
            .sample(x, y)
            .map_or_else(|| self.sentinel(), |sample| self.shade(sample));

        match (self.space, self.crosshair) {
            (Space::Absolute, Some(crosshair))
                if x == self.descriptor.width / 2 || y == self.descriptor.height / 2 =>
            {
                blend(color, crosshair)
            }
            _ => color,
        }
    }

    /// Fill a `W x H` RGBA raster, row-major from the top row.
    pub fn rasterize(&self) -> RgbaImage {
        let (width, height) = (self.descriptor.width, self.descriptor.height);
        RgbaImage::from_fn(width as u32, height as u32, |x, y| {
            Rgba(self.pixel(x as usize, y as usize))
        })
    }
}

/// Blend a colour toward the crosshair accent.
#[inline]
fn blend(color: [u8; 4], crosshair: Crosshair) -> [u8; 4] {
    let alpha = crosshair.opacity.clamp(0.0, 1.0);
    let [r, g, b] = crosshair.color;
    let accent = [r, g, b, 255];
    let mut out = [0; 4];
    for channel in 0..4 {
        let mixed =
            f32::from(color[channel]) * (1.0 - alpha) + f32::from(accent[channel]) * alpha;
        out[channel] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_volume() -> Volume {
        let data: Vec<f32> = (0..64).map(|i| i as f32).collect();
        Volume::from_flat([4, 4, 4], [1.0, 1.0, 1.0], 1, data).unwrap()
    }

    fn rasterizer<'a>(
        volume: &'a Volume,
        resolver: &SpaceResolver,
        config: &ViewerConfig,
        space: Space,
        plane: Plane,
        slice: usize,
    ) -> SliceRasterizer<'a> {
        let ceiling = DisplayCeiling::from_volume(volume);
        SliceRasterizer::new(volume, resolver, ceiling, config, space, plane, slice)
    }

    #[test]
    fn test_voxel_axial_sample() {
        let volume = ramp_volume();
        let resolver = SpaceResolver::new(&volume, 1.5);
        let config = ViewerConfig::default();
        let r = rasterizer(&volume, &resolver, &config, Space::Voxel, Plane::Axial, 2);
        // screen (1, 1) is voxel (1, 2, 2)
        assert_eq!(r.sample(1, 1), Some(Sample::Scalar(41.0)));
        let v = (255.0 * 41.0 / 63.0) as u8;
        assert_eq!(r.pixel(1, 1), [v, v, v, 255]);
    }

    #[test]
    fn test_sagittal_rows_are_flipped() {
        let volume = ramp_volume();
        let resolver = SpaceResolver::new(&volume, 1.5);
        let config = ViewerConfig::default();
        let r = rasterizer(&volume, &resolver, &config, Space::Voxel, Plane::Sagittal, 3);
        // top row is the highest z
        assert_eq!(r.sample(0, 0), Some(Sample::Scalar(48.0 + 3.0)));
        assert_eq!(r.sample(2, 3), Some(Sample::Scalar(8.0 + 3.0)));
    }

    #[test]
    fn test_world_matches_voxel_for_aligned_volume() {
        let volume = ramp_volume();
        let resolver = SpaceResolver::new(&volume, 1.5);
        let config = ViewerConfig::default();
        let voxel = rasterizer(&volume, &resolver, &config, Space::Voxel, Plane::Coronal, 1);
        let world = rasterizer(&volume, &resolver, &config, Space::World, Plane::Coronal, 1);
        assert_eq!(voxel.rasterize(), world.rasterize());
        // voxel index 0 is a real sample in world space
        let axial = rasterizer(&volume, &resolver, &config, Space::World, Plane::Axial, 0);
        assert_eq!(axial.sample(0, 3), Some(Sample::Scalar(0.0)));
    }

    #[test]
    fn test_absolute_outside_is_sentinel() {
        let volume = ramp_volume();
        let resolver = SpaceResolver::new(&volume, 1.5);
        let config = ViewerConfig::default();
        let r = rasterizer(&volume, &resolver, &config, Space::Absolute, Plane::Axial, 0);
        assert_eq!(r.descriptor().width, 6);
        assert_eq!(r.sample(0, 0), None);
        assert_eq!(r.pixel(0, 0), ABSOLUTE_SENTINEL);
    }

    #[test]
    fn test_outside_raster_is_sentinel() {
        let volume = ramp_volume();
        let resolver = SpaceResolver::new(&volume, 1.5);
        let config = ViewerConfig::default().without_crosshair();
        let r = rasterizer(&volume, &resolver, &config, Space::Voxel, Plane::Axial, 0);
        assert_eq!(r.sample(0, 4), None);
        assert_eq!(r.pixel(0, 4), VOXEL_SENTINEL);
        assert_eq!(r.sample(4, 0), None);
        assert_eq!(r.sample(0, usize::MAX), None);

        let r = rasterizer(&volume, &resolver, &config, Space::Absolute, Plane::Axial, 3);
        assert_eq!(r.pixel(6, 2), ABSOLUTE_SENTINEL);
        assert_eq!(r.pixel(3, 6), ABSOLUTE_SENTINEL);
    }

    #[test]
    fn test_absolute_centre_hits_lattice() {
        let volume = ramp_volume();
        let resolver = SpaceResolver::new(&volume, 1.5);
        let config = ViewerConfig::default().without_crosshair();
        let r = rasterizer(&volume, &resolver, &config, Space::Absolute, Plane::Axial, 3);
        // cube pixel (3, 5 - 3, 3) sits on absolute origin, voxel (2, 2, 2)
        assert_eq!(r.sample(3, 2), Some(Sample::Scalar(42.0)));
    }

    #[test]
    fn test_crosshair_blends_centre_lines() {
        let volume = ramp_volume();
        let resolver = SpaceResolver::new(&volume, 1.5);
        let config = ViewerConfig::default();
        let r = rasterizer(&volume, &resolver, &config, Space::Absolute, Plane::Axial, 0);
        // (3, 0) is on the vertical centre line and outside the volume
        assert_eq!(r.pixel(3, 0), [77, 0, 0, 147]);
        assert_eq!(r.pixel(0, 3), [77, 0, 0, 147]);
    }

    #[test]
    fn test_crosshair_only_in_absolute_space() {
        let volume = ramp_volume();
        let resolver = SpaceResolver::new(&volume, 1.5);
        let config = ViewerConfig::default();
        let r = rasterizer(&volume, &resolver, &config, Space::Voxel, Plane::Axial, 0);
        let v = r.shade(r.sample(2, 2).unwrap());
        assert_eq!(r.pixel(2, 2), v);
    }

    #[test]
    fn test_vector_volume_is_rgb() {
        let n = 8;
        let mut data = vec![0.0_f32; n * 3];
        data[..n].fill(10.0);
        data[n..2 * n].fill(5.0);
        let volume = Volume::from_flat([2, 2, 2], [1.0, 1.0, 1.0], 3, data).unwrap();
        let resolver = SpaceResolver::new(&volume, 1.5);
        let config = ViewerConfig::default();
        let r = rasterizer(&volume, &resolver, &config, Space::Voxel, Plane::Axial, 0);
        assert_eq!(r.pixel(0, 0), [255, 127, 0, 255]);
    }

    #[test]
    fn test_rasterize_is_idempotent() {
        let volume = ramp_volume();
        let resolver = SpaceResolver::new(&volume, 1.5);
        let config = ViewerConfig::default();
        let r = rasterizer(&volume, &resolver, &config, Space::Absolute, Plane::Sagittal, 2);
        let image = r.rasterize();
        assert_eq!(image.dimensions(), (6, 6));
        assert_eq!(image, r.rasterize());
    }
}

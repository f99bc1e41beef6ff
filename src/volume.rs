use crate::error::{Result, VolumeError};
use crate::transform::{Affine, AxisMapping};

use ndarray::{Array3, Array4, ArrayView3, Axis};

/// Voxel values, tagged by channel count.
///
/// Arrays are indexed `[z, y, x]` (and `[c, z, y, x]` for vectors) so that the
/// standard memory order matches the flat layout `z*dim1*dim0 + y*dim0 + x`,
/// with channel `c` following at `c*dim0*dim1*dim2`.
#[derive(Debug, Clone)]
pub enum VoxelData {
    /// One value per voxel, e.g. anatomy.
    Scalar(Array3<f32>),
    /// Three values per voxel, e.g. directional data shown as RGB.
    Vector3(Array4<f32>),
}

impl VoxelData {
    /// Wrap a flat buffer of `data_dim` planes of `dim0*dim1*dim2` values.
    pub fn from_flat(dim: [usize; 3], data_dim: usize, data: Vec<f32>) -> Result<Self> {
        if dim.contains(&0) {
            return Err(VolumeError::ZeroDimension(dim));
        }
        if data_dim != 1 && data_dim != 3 {
            return Err(VolumeError::ChannelMismatch(data_dim));
        }
        let expected = dim
            .iter()
            .try_fold(data_dim, |acc, &d| acc.checked_mul(d))
            .ok_or(VolumeError::ShapeOverflow(dim))?;
        if data.len() != expected {
            return Err(VolumeError::DataLengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        let shape = (dim[2], dim[1], dim[0]);
        let voxels = if data_dim == 1 {
            Array3::from_shape_vec(shape, data).map(VoxelData::Scalar)
        } else {
            Array4::from_shape_vec((3, shape.0, shape.1, shape.2), data).map(VoxelData::Vector3)
        };
        // length and element count were both checked above
        voxels.map_err(|_| VolumeError::ShapeOverflow(dim))
    }

    /// Number of values per voxel.
    pub fn data_dim(&self) -> usize {
        match self {
            VoxelData::Scalar(_) => 1,
            VoxelData::Vector3(_) => 3,
        }
    }

    /// Grid extents in native axis order `[dim0, dim1, dim2]`.
    pub fn dim(&self) -> [usize; 3] {
        let (z, y, x) = self.primary().dim();
        [x, y, z]
    }

    /// First channel of the data.
    pub fn primary(&self) -> ArrayView3<'_, f32> {
        match self {
            VoxelData::Scalar(data) => data.view(),
            VoxelData::Vector3(data) => data.index_axis(Axis(0), 0),
        }
    }
}

/// Value read from a single voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Scalar(f64),
    Vector([f64; 3]),
}

/// A loaded volume and its geometry. Immutable once built.
#[derive(Debug, Clone)]
pub struct Volume {
    data: VoxelData,
    dim: [usize; 3],
    pixdim: [f64; 3],
    voxel_to_mm: Affine,
    absolute_to_voxel: Affine,
    axis_mapping: AxisMapping,
}

impl Volume {
    /// Build a volume from voxel data, spacing and its voxel-to-millimetre
    /// matrix as found in the image header.
    pub fn new(data: VoxelData, pixdim: [f64; 3], voxel_to_mm: Affine) -> Result<Self> {
        let data = match data {
            VoxelData::Scalar(a) => VoxelData::Scalar(a.as_standard_layout().into_owned()),
            VoxelData::Vector3(a) => {
                if a.len_of(Axis(0)) != 3 {
                    return Err(VolumeError::ChannelMismatch(a.len_of(Axis(0))));
                }
                VoxelData::Vector3(a.as_standard_layout().into_owned())
            }
        };
        let dim = data.dim();
        if dim.contains(&0) {
            return Err(VolumeError::ZeroDimension(dim));
        }
        if pixdim.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(VolumeError::InvalidSpacing(pixdim));
        }

        let axis_mapping = AxisMapping::from_affine(&voxel_to_mm, dim)?;
        let absolute_to_voxel = Affine::centred_mm_to_voxel(&voxel_to_mm, dim)?;

        tracing::info!(
            ?dim,
            ?pixdim,
            data_dim = data.data_dim(),
            axes = ?axis_mapping.axes(),
            signs = ?axis_mapping.signs(),
            "volume ready"
        );

        Ok(Self {
            data,
            dim,
            pixdim,
            voxel_to_mm,
            absolute_to_voxel,
            axis_mapping,
        })
    }

    /// Build an axis-aligned volume from a flat buffer.
    pub fn from_flat(
        dim: [usize; 3],
        pixdim: [f64; 3],
        data_dim: usize,
        data: Vec<f32>,
    ) -> Result<Self> {
        let data = VoxelData::from_flat(dim, data_dim, data)?;
        Self::new(data, pixdim, Affine::from_spacing(pixdim))
    }

    /// Get the dimensions of the volume in native axis order
    pub fn dim(&self) -> [usize; 3] {
        self.dim
    }

    /// Voxel spacing in millimetres along each native axis
    pub fn pixdim(&self) -> [f64; 3] {
        self.pixdim
    }

    pub fn data_dim(&self) -> usize {
        self.data.data_dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &VoxelData {
        &self.data
    }

    pub fn voxel_to_mm(&self) -> &Affine {
        &self.voxel_to_mm
    }

    pub fn axis_mapping(&self) -> &AxisMapping {
        &self.axis_mapping
    }

    pub fn voxel_count(&self) -> usize {
        self.dim[0] * self.dim[1] * self.dim[2]
    }

    /// Flat index of a voxel in the primary channel.
    #[inline]
    pub fn flat_index(&self, v: [usize; 3]) -> usize {
        v[2] * self.dim[1] * self.dim[0] + v[1] * self.dim[0] + v[0]
    }

    /// Flat index of a world coordinate, see [`AxisMapping::world_to_voxel_index`].
    pub fn world_to_voxel_index(&self, s: [i64; 3]) -> i64 {
        self.axis_mapping.world_to_voxel_index(s, self.dim)
    }

    /// Fractional voxel coordinate of an absolute-space point in millimetres.
    #[inline]
    pub fn absolute_to_voxel_coord(&self, a: [f64; 3]) -> [f64; 3] {
        self.absolute_to_voxel.apply(a)
    }

    /// Voxel containing an absolute-space point, `None` outside the grid.
    pub fn absolute_to_voxel_index(&self, a: [f64; 3]) -> Option<usize> {
        crate::transform::floor_in_bounds(self.absolute_to_voxel_coord(a), self.dim)
            .map(|v| self.flat_index(v))
    }

    /// Value at an in-bounds voxel. Callers check bounds first.
    #[inline]
    pub fn voxel(&self, v: [usize; 3]) -> Sample {
        let [x, y, z] = v;
        match &self.data {
            VoxelData::Scalar(data) => Sample::Scalar(f64::from(data[[z, y, x]])),
            VoxelData::Vector3(data) => Sample::Vector([
                f64::from(data[[0, z, y, x]]),
                f64::from(data[[1, z, y, x]]),
                f64::from(data[[2, z, y, x]]),
            ]),
        }
    }
}

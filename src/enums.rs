use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Anatomical viewing plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Plane {
    #[default]
    Sagittal,
    Coronal,
    Axial,
}

impl Plane {
    pub const ALL: [Plane; 3] = [Plane::Sagittal, Plane::Coronal, Plane::Axial];

    /// Axes shown as (width, height, depth) for this plane.
    ///
    /// The same convention holds in every space: sagittal looks down axis 0,
    /// coronal down axis 1 and axial down axis 2.
    pub fn axes(self) -> (usize, usize, usize) {
        match self {
            Plane::Sagittal => (1, 2, 0),
            Plane::Coronal => (0, 2, 1),
            Plane::Axial => (0, 1, 2),
        }
    }

    /// Place screen column, flipped screen row and slice into axis order.
    ///
    /// `row` must already be inverted (`H - 1 - y`) so that row 0 of the
    /// display is the superior side.
    #[inline]
    pub fn to_axis_order<T: Copy>(self, column: T, row: T, slice: T) -> [T; 3] {
        let (w, h, d) = self.axes();
        let mut tuple = [column; 3];
        tuple[w] = column;
        tuple[h] = row;
        tuple[d] = slice;
        tuple
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plane::Sagittal => write!(f, "sagittal"),
            Plane::Coronal => write!(f, "coronal"),
            Plane::Axial => write!(f, "axial"),
        }
    }
}

impl FromStr for Plane {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sag" | "sagittal" => Ok(Plane::Sagittal),
            "cor" | "coronal" => Ok(Plane::Coronal),
            "axi" | "axial" => Ok(Plane::Axial),
            other => Err(format!("unknown plane '{other}'")),
        }
    }
}

/// Coordinate space a view samples the volume in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Space {
    /// Native voxel grid, no resampling.
    Voxel,
    /// Scanner axes, a signed permutation of the voxel grid.
    World,
    /// Isotropic display cube, resampled through the full affine.
    #[default]
    Absolute,
}

impl Space {
    pub const ALL: [Space; 3] = [Space::Voxel, Space::World, Space::Absolute];
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Space::Voxel => write!(f, "voxel"),
            Space::World => write!(f, "world"),
            Space::Absolute => write!(f, "absolute"),
        }
    }
}

impl FromStr for Space {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "voxel" => Ok(Space::Voxel),
            "world" => Ok(Space::World),
            "absolute" => Ok(Space::Absolute),
            other => Err(format!("unknown space '{other}'")),
        }
    }
}

#[derive(Default)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

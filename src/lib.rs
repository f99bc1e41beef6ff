//! # MRI slicer library
//!
//! This crate renders 2D slices of 3D medical volumes for interactive
//! inspection along the three anatomical planes:
//!  - Sagittal
//!  - Coronal
//!  - Axial
//!
//! Every plane can be shown in three coordinate spaces:
//!  - Voxel space: the native voxel grid, sampled as is
//!  - World space: the scanner axes, a signed permutation of the grid
//!  - Absolute space: an isotropic display cube, resampled through the
//!    millimetre affine with trilinear interpolation
//!
//! Intensities are scaled to `0..=255` against a display ceiling taken from
//! the 99.99th percentile of a strided sample of the volume. Pixels that fall
//! outside the volume never fail, they are painted with a colour specific to
//! the active space.
//!
//! Volumes can be built from flat buffers or loaded from a DICOM series with
//! [`VolumeLoader`]. If the environment supports it the DICOM files are
//! opened and decoded in parallel using rayon.
//!
//! # Examples
//!
//! ## Viewing a synthetic volume
//!
//! ```
//! # use std::sync::Arc;
//! # use mri_slicer::{Plane, SliceViewer, Space, Volume, ViewerConfig};
//! let data = (0..64).map(|i| i as f32).collect();
//! let volume = Volume::from_flat([4, 4, 4], [1.0, 1.0, 1.0], 1, data)
//!     .expect("buffer matches the dimensions");
//! let mut viewer = SliceViewer::initialize(Arc::new(volume), ViewerConfig::default());
//! viewer.set_space(Space::Voxel);
//! viewer.set_plane(Plane::Axial);
//! viewer.set_slice(2);
//! assert_eq!(viewer.frame().caption(), "voxel axial 2/3");
//! ```
//!
//! ## Reading multiple DICOM files into a volume
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use mri_slicer::{SliceViewer, SortBy, ViewerConfig, VolumeLoader};
//! let volume = VolumeLoader::load_from_directory("dicom", SortBy::InstanceNumber)
//!     .expect("should have loaded files from directory");
//! let viewer = SliceViewer::initialize(Arc::new(volume), ViewerConfig::default());
//! viewer
//!     .frame()
//!     .to_display_image()
//!     .save("result.png")
//!     .expect("should have written the slice");
//! ```

pub mod config;
pub mod enums;
pub mod error;
mod interpolator;
pub mod normalizer;
pub mod rasterizer;
pub mod space;
pub mod transform;
pub mod view;
pub mod volume;
pub mod volume_loader;

pub use config::{Crosshair, DEFAULT_CUBE_SCALE, ViewerConfig};
pub use enums::{Plane, SortBy, Space};
pub use error::VolumeError;
pub use interpolator::Interpolator;
pub use normalizer::DisplayCeiling;
pub use rasterizer::SliceRasterizer;
pub use space::{SpaceDescriptor, SpaceResolver};
pub use transform::{Affine, AxisMapping};
pub use view::{Frame, FrameSink, SliceViewer, ViewState};
pub use volume::{Sample, Volume, VoxelData};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};

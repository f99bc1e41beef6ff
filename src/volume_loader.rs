use crate::{
    enums::SortBy,
    error::VolumeError,
    transform::Affine,
    volume::{Volume, VoxelData},
};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use nalgebra::{Matrix4, Vector3};
use ndarray::{Array2, Array3, Axis, s};
use rayon::prelude::*;
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Invalid volume: {0}")]
    Volume(#[from] VolumeError),
}

/// One decoded frame with the header values needed to place it.
struct DecodedSlice {
    order: Option<f32>,
    position: Option<[f64; 3]>,
    image: Array2<u16>,
}

/// Builds [`Volume`]s from DICOM series.
pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found, dimensions are inconsistent or
    /// the header geometry cannot be inverted
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let mut slices: Vec<_> = dicom_objects
            .par_iter()
            .filter_map(|dicom_object| Self::decode_slice(dicom_object, &sort_by))
            .collect();

        if slices.len() < dicom_objects.len() {
            tracing::warn!(
                skipped = dicom_objects.len() - slices.len(),
                "skipped DICOM objects without decodable pixel data"
            );
        }
        if slices.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::sort_slices(&mut slices, sort_by);
        Self::validate_dimensions(&slices)?;

        let header_pixdim =
            Self::get_spacing(dicom_objects).ok_or(VolumeLoaderError::MissingSpacing)?;
        let positions: Vec<_> = slices.iter().map(|slice| slice.position).collect();
        let pixdim = Self::resolve_spacing(header_pixdim, &positions);
        let orientation = dicom_objects.iter().find_map(Self::get_orientation);
        let voxel_to_mm = Self::voxel_to_mm(orientation, &positions, pixdim);

        let data = Self::build_volume_array(&slices);
        let volume = Volume::new(VoxelData::Scalar(data), pixdim, voxel_to_mm)?;

        tracing::info!(slices = slices.len(), dim = ?volume.dim(), "loaded DICOM series");
        Ok(volume)
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path> + Sync],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> = paths
            .par_iter()
            .map(|path| open_file(path.as_ref()))
            .collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::load_from_file_paths(&paths, sort_by)
    }

    fn decode_slice(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<DecodedSlice> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let image = Self::decode_image(dicom_object)?;
        Some(DecodedSlice {
            order,
            position: Self::get_position(dicom_object),
            image,
        })
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    fn get_position(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<[f64; 3]> {
        let pos = dicom_object
            .element(tags::IMAGE_POSITION_PATIENT)
            .ok()?
            .to_multi_float64()
            .ok()?;
        match pos.as_slice() {
            [x, y, z, ..] => Some([*x, *y, *z]),
            _ => None,
        }
    }

    fn get_orientation(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<[f64; 6]> {
        let cosines = dicom_object
            .element(tags::IMAGE_ORIENTATION_PATIENT)
            .ok()?
            .to_multi_float64()
            .ok()?;
        cosines.get(..6)?.try_into().ok()
    }

    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<u16>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
        pixel_data
            .to_ndarray_with_options::<u16>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_slices(slices: &mut [DecodedSlice], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            slices.sort_by(|a, b| {
                a.order
                    .partial_cmp(&b.order)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        if matches!(sort_by, SortBy::ImagePositionPatient) {
            slices.reverse();
        }
    }

    fn validate_dimensions(slices: &[DecodedSlice]) -> Result<(), VolumeLoaderError> {
        let first_dim = slices[0].image.dim();
        if slices.iter().any(|slice| slice.image.dim() != first_dim) {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(slices: &[DecodedSlice]) -> Array3<f32> {
        let (height, width) = slices[0].image.dim();
        let depth = slices.len();
        let mut volume = Array3::<f32>::zeros((depth, height, width));

        volume
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(slices.par_iter())
            .for_each(|(mut plane, slice)| plane.assign(&slice.image.mapv(f32::from)));

        volume
    }

    /// Spacing as `[column spacing, row spacing, slice thickness]`.
    fn get_spacing(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> Option<[f64; 3]> {
        dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float64()
                .ok()?;

            let slice_thickness = dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()?
                .to_float64()
                .ok()?;

            Self::spacing_from_header(&pixel_spacing, slice_thickness)
        })
    }

    /// `PixelSpacing` lists the row spacing first, i.e. the step along y.
    pub(crate) fn spacing_from_header(pixel_spacing: &[f64], thickness: f64) -> Option<[f64; 3]> {
        match pixel_spacing {
            [row, column, ..] => Some([*column, *row, thickness]),
            _ => None,
        }
    }

    /// Offset between the first two slices, when both positions are known
    /// and distinct.
    pub(crate) fn slice_step(positions: &[Option<[f64; 3]>]) -> Option<Vector3<f64>> {
        let first = positions.first().copied().flatten()?;
        let second = positions.get(1).copied().flatten()?;
        let step = Vector3::from(second) - Vector3::from(first);
        (step.norm() > 0.0).then_some(step)
    }

    /// Replace the slice spacing with the measured distance between slice
    /// positions. `SliceThickness` is only used when positions are missing.
    pub(crate) fn resolve_spacing(pixdim: [f64; 3], positions: &[Option<[f64; 3]>]) -> [f64; 3] {
        let Some(step) = Self::slice_step(positions) else {
            return pixdim;
        };
        let spacing = step.norm();
        if (spacing - pixdim[2]).abs() > 1e-3 {
            tracing::warn!(
                thickness = pixdim[2],
                spacing,
                "slice spacing differs from slice thickness, using spacing"
            );
        }
        [pixdim[0], pixdim[1], spacing]
    }

    /// Voxel-to-patient matrix from the orientation cosines and the slice
    /// positions, in stacking order.
    ///
    /// Columns step along the image rows and columns, the slice step is
    /// taken from the first two positions when both are known and from the
    /// orientation normal otherwise.
    pub(crate) fn voxel_to_mm(
        orientation: Option<[f64; 6]>,
        positions: &[Option<[f64; 3]>],
        pixdim: [f64; 3],
    ) -> Affine {
        let Some(cosines) = orientation else {
            tracing::warn!("no image orientation, assuming axis-aligned geometry");
            return Affine::from_spacing(pixdim);
        };

        let row = Vector3::new(cosines[0], cosines[1], cosines[2]);
        let column = Vector3::new(cosines[3], cosines[4], cosines[5]);
        let first = positions.first().copied().flatten();
        let step =
            Self::slice_step(positions).unwrap_or_else(|| row.cross(&column) * pixdim[2]);
        let origin = first.map_or_else(Vector3::zeros, Vector3::from);

        let x = row * pixdim[0];
        let y = column * pixdim[1];
        #[rustfmt::skip]
        let m = Matrix4::new(
            x.x, y.x, step.x, origin.x,
            x.y, y.y, step.y, origin.y,
            x.z, y.z, step.z, origin.z,
            0.0, 0.0, 0.0, 1.0,
        );
        Affine(m)
    }
}

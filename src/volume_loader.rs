use crate::volume::{SpacingError, Volume, VoxelSpacing};

use ndarray::{Array3, ShapeError};
use nifti::{IntoNdArray, NiftiError, NiftiObject, ReaderOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use web_time::Instant;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("failed to read NIfTI file {}: {source}", path.display())]
    Nifti {
        path: PathBuf,
        #[source]
        source: NiftiError,
    },

    #[error("{} is not a 3D volume (shape {shape:?})", path.display())]
    UnsupportedDimensionality { path: PathBuf, shape: Vec<usize> },

    #[error("{} has invalid voxel spacing: {source}", path.display())]
    InvalidSpacing {
        path: PathBuf,
        #[source]
        source: SpacingError,
    },

    #[error("Inconsistent image dimensions: {0}")]
    InconsistentDimensions(#[from] ShapeError),
}

/// Turns a file into an array plus voxel spacing.
pub trait VolumeDecoder {
    fn decode_intensity(&self, path: &Path) -> Result<Volume<f32>, VolumeLoaderError>;

    fn decode_labels(&self, path: &Path) -> Result<Volume<u8>, VolumeLoaderError>;
}

/// Decoder for `.nii` and `.nii.gz` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct NiftiDecoder;

impl VolumeDecoder for NiftiDecoder {
    fn decode_intensity(&self, path: &Path) -> Result<Volume<f32>, VolumeLoaderError> {
        let (data, spacing) = Self::read_samples(path)?;
        Ok(Volume::new(data, spacing))
    }

    /// Samples are rounded and saturated into `0..=255`.
    fn decode_labels(&self, path: &Path) -> Result<Volume<u8>, VolumeLoaderError> {
        let (data, spacing) = Self::read_samples(path)?;
        Ok(Volume::new(data.mapv(Self::to_label), spacing))
    }
}

impl NiftiDecoder {
    fn read_samples(path: &Path) -> Result<(Array3<f32>, VoxelSpacing), VolumeLoaderError> {
        let started = Instant::now();
        let object = ReaderOptions::new()
            .read_file(path)
            .map_err(|source| Self::nifti_error(path, source))?;

        let spacing = Self::get_spacing(&object.header().pixdim).map_err(|source| {
            VolumeLoaderError::InvalidSpacing {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let array = object
            .into_volume()
            .into_ndarray::<f32>()
            .map_err(|source| Self::nifti_error(path, source))?;
        let shape = array.shape().to_vec();
        let dim = Self::spatial_dim(&shape).ok_or_else(|| {
            VolumeLoaderError::UnsupportedDimensionality {
                path: path.to_path_buf(),
                shape: shape.clone(),
            }
        })?;

        // Logical iteration is x-major, so trailing unit axes drop out.
        let samples: Vec<f32> = array.iter().copied().collect();
        let data = Array3::from_shape_vec(dim, samples)?;

        info!(
            path = %path.display(),
            dim = ?dim,
            spacing = ?spacing.as_tuple(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "decoded volume"
        );
        Ok((data, spacing))
    }

    fn nifti_error(path: &Path, source: NiftiError) -> VolumeLoaderError {
        VolumeLoaderError::Nifti {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Collapse a NIfTI shape to `(nx, ny, nz)`.
    ///
    /// 2D images become a single slice; extra axes are accepted only when
    /// they have length one.
    pub(crate) fn spatial_dim(shape: &[usize]) -> Option<(usize, usize, usize)> {
        match shape {
            [nx, ny] => Some((*nx, *ny, 1)),
            [nx, ny, nz, rest @ ..] if rest.iter().all(|&n| n == 1) => Some((*nx, *ny, *nz)),
            _ => None,
        }
    }

    fn get_spacing(pixdim: &[f32; 8]) -> Result<VoxelSpacing, SpacingError> {
        debug!(?pixdim, "reading voxel spacing");
        VoxelSpacing::new(
            pixdim[1].abs() as f64,
            pixdim[2].abs() as f64,
            pixdim[3].abs() as f64,
        )
    }

    #[inline]
    fn to_label(value: f32) -> u8 {
        value.round().clamp(0.0, 255.0) as u8
    }
}

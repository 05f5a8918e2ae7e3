use ndarray::Array3;
use serde::Serialize;
use thiserror::Error;

/// Tolerance (in mm) when comparing the spacing of two co-registered volumes.
const SPACING_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Error, PartialEq)]
pub enum SpacingError {
    #[error("voxel spacing must be positive and finite, got ({0}, {1}, {2})")]
    NonPositive(f64, f64, f64),
}

/// Physical size of one voxel along (x, y, z), in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoxelSpacing {
    x: f64,
    y: f64,
    z: f64,
}

impl VoxelSpacing {
    pub fn new(x: f64, y: f64, z: f64) -> Result<Self, SpacingError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(x) && valid(y) && valid(z) {
            Ok(Self { x, y, z })
        } else {
            Err(SpacingError::NonPositive(x, y, z))
        }
    }

    pub fn isotropic(size: f64) -> Result<Self, SpacingError> {
        Self::new(size, size, size)
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// Volume of a single voxel in mm³.
    pub fn voxel_volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    pub fn approx_eq(&self, other: &VoxelSpacing) -> bool {
        (self.x - other.x).abs() <= SPACING_TOLERANCE
            && (self.y - other.y).abs() <= SPACING_TOLERANCE
            && (self.z - other.z).abs() <= SPACING_TOLERANCE
    }
}

/// A decoded scalar volume indexed `[x, y, z]`.
#[derive(Debug, Clone)]
pub struct Volume<T> {
    pub data: Array3<T>,
    pub spacing: VoxelSpacing,
}

impl<T> Volume<T> {
    pub fn new(data: Array3<T>, spacing: VoxelSpacing) -> Self {
        Self { data, spacing }
    }

    /// Get the dimensions of the volume (nx, ny, nz)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying data
    pub fn data_mut(&mut self) -> &mut Array3<T> {
        &mut self.data
    }

    pub fn voxel_count(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PairingError {
    #[error("image shape {image:?} does not match label shape {label:?}")]
    ShapeMismatch {
        image: (usize, usize, usize),
        label: (usize, usize, usize),
    },

    #[error("volume of shape {0:?} has no voxels")]
    EmptyVolume((usize, usize, usize)),

    #[error("image spacing {image:?} does not match label spacing {label:?}")]
    SpacingMismatch {
        image: (f64, f64, f64),
        label: (f64, f64, f64),
    },
}

/// An intensity scan together with its co-registered segmentation.
#[derive(Debug, Clone)]
pub struct VolumePair {
    pub image: Volume<f32>,
    pub label: Volume<u8>,
}

impl VolumePair {
    /// Pair two volumes, rejecting them unless shape and spacing agree and
    /// there is at least one voxel.
    pub fn new(image: Volume<f32>, label: Volume<u8>) -> Result<Self, PairingError> {
        if image.dim() != label.dim() {
            return Err(PairingError::ShapeMismatch {
                image: image.dim(),
                label: label.dim(),
            });
        }
        if image.voxel_count() == 0 {
            return Err(PairingError::EmptyVolume(image.dim()));
        }
        if !image.spacing.approx_eq(&label.spacing) {
            return Err(PairingError::SpacingMismatch {
                image: image.spacing.as_tuple(),
                label: label.spacing.as_tuple(),
            });
        }
        Ok(Self { image, label })
    }

    pub fn spacing(&self) -> VoxelSpacing {
        self.image.spacing
    }

    pub fn dim(&self) -> (usize, usize, usize) {
        self.image.dim()
    }
}

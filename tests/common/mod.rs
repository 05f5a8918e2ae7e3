#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use nifti_volume::{Volume, VolumeDecoder, VolumeLoaderError, VoxelSpacing};

/// In-memory decoder keyed by path.
#[derive(Default)]
pub struct FakeDecoder {
    images: HashMap<PathBuf, Volume<f32>>,
    labels: HashMap<PathBuf, Volume<u8>>,
}

impl FakeDecoder {
    pub fn with_image(mut self, path: impl Into<PathBuf>, volume: Volume<f32>) -> Self {
        self.images.insert(path.into(), volume);
        self
    }

    pub fn with_labels(mut self, path: impl Into<PathBuf>, volume: Volume<u8>) -> Self {
        self.labels.insert(path.into(), volume);
        self
    }
}

fn unreadable(path: &Path) -> VolumeLoaderError {
    VolumeLoaderError::UnsupportedDimensionality {
        path: path.to_path_buf(),
        shape: Vec::new(),
    }
}

impl VolumeDecoder for FakeDecoder {
    fn decode_intensity(&self, path: &Path) -> Result<Volume<f32>, VolumeLoaderError> {
        self.images.get(path).cloned().ok_or_else(|| unreadable(path))
    }

    fn decode_labels(&self, path: &Path) -> Result<Volume<u8>, VolumeLoaderError> {
        self.labels.get(path).cloned().ok_or_else(|| unreadable(path))
    }
}

/// A dataset directory with `imagesTr/` and `labelsTr/` siblings.
pub struct Dataset {
    pub root: tempfile::TempDir,
}

impl Dataset {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("imagesTr")).unwrap();
        fs::create_dir_all(root.path().join("labelsTr")).unwrap();
        Self { root }
    }

    pub fn image(&self, name: &str) -> PathBuf {
        self.root.path().join("imagesTr").join(name)
    }

    pub fn label(&self, name: &str) -> PathBuf {
        self.root.path().join("labelsTr").join(name)
    }

    /// Create placeholder files so that label resolution succeeds.
    pub fn touch_pair(&self, name: &str) -> (PathBuf, PathBuf) {
        let (image, label) = (self.image(name), self.label(name));
        fs::write(&image, b"").unwrap();
        fs::write(&label, b"").unwrap();
        (image, label)
    }
}

pub fn spacing(x: f64, y: f64, z: f64) -> VoxelSpacing {
    VoxelSpacing::new(x, y, z).unwrap()
}

/// The `{0,0,1,1,2,0,0,0}` label volume on a 2x2x2 grid.
pub fn sample_labels(spacing: VoxelSpacing) -> Volume<u8> {
    Volume::new(
        Array3::from_shape_vec((2, 2, 2), vec![0, 0, 1, 1, 2, 0, 0, 0]).unwrap(),
        spacing,
    )
}

pub fn ramp_image(spacing: VoxelSpacing) -> Volume<f32> {
    Volume::new(
        Array3::from_shape_fn((2, 2, 2), |(x, y, z)| (x + 2 * y + 4 * z) as f32 * 10.0),
        spacing,
    )
}

/// Write an uncompressed little-endian NIfTI-1 file. `values` are in
/// x-fastest order; `datatype` is 2 (u8) or 16 (f32).
pub fn write_nifti(path: &Path, dim: [i16; 3], pixdim: [f32; 3], datatype: i16, values: &[f32]) {
    let mut header = vec![0u8; 352];
    header[0..4].copy_from_slice(&348i32.to_le_bytes());
    let dims = [3, dim[0], dim[1], dim[2], 1, 1, 1, 1];
    for (i, d) in dims.iter().enumerate() {
        header[40 + 2 * i..42 + 2 * i].copy_from_slice(&d.to_le_bytes());
    }
    let bitpix: i16 = if datatype == 2 { 8 } else { 32 };
    header[70..72].copy_from_slice(&datatype.to_le_bytes());
    header[72..74].copy_from_slice(&bitpix.to_le_bytes());
    let pixdims = [1.0f32, pixdim[0], pixdim[1], pixdim[2], 1.0, 1.0, 1.0, 1.0];
    for (i, p) in pixdims.iter().enumerate() {
        header[76 + 4 * i..80 + 4 * i].copy_from_slice(&p.to_le_bytes());
    }
    header[108..112].copy_from_slice(&352.0f32.to_le_bytes());
    header[112..116].copy_from_slice(&1.0f32.to_le_bytes());
    header[344..348].copy_from_slice(b"n+1\0");

    let mut bytes = header;
    for v in values {
        if datatype == 2 {
            bytes.push(*v as u8);
        } else {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
    fs::write(path, bytes).unwrap();
}

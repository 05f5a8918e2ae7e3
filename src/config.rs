use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enums::DegeneratePolicy;
use crate::pair_resolver::{DEFAULT_IMAGE_MARKER, DEFAULT_LABEL_MARKER, VolumePairResolver};
use crate::renderer::VolumeStyle;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Viewer settings. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub image_marker: String,
    pub label_marker: String,
    pub screenshot_dir: PathBuf,
    pub degenerate_policy: DegeneratePolicy,
    pub intensity_style: VolumeStyle,
    pub label_style: VolumeStyle,
    pub background: [u8; 3],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            image_marker: DEFAULT_IMAGE_MARKER.to_owned(),
            label_marker: DEFAULT_LABEL_MARKER.to_owned(),
            screenshot_dir: PathBuf::from("."),
            degenerate_policy: DegeneratePolicy::default(),
            intensity_style: VolumeStyle::intensity(),
            label_style: VolumeStyle::label_overlay(),
            background: [0xf0, 0xf0, 0xf0],
        }
    }
}

impl ViewerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), |path| Self::from_file(path))
    }

    pub fn resolver(&self) -> VolumePairResolver {
        VolumePairResolver::new(&self.image_marker, &self.label_marker)
    }
}

use std::path::{Path, PathBuf};

use tracing::debug;

pub const DEFAULT_IMAGE_MARKER: &str = "imagesTr";
pub const DEFAULT_LABEL_MARKER: &str = "labelsTr";

/// Outcome of looking up the segmentation that belongs to an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PathBuf),
    /// The derived label path does not exist. Carries the path that was tried.
    NotFound { attempted: PathBuf },
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    /// The label path, whether or not it exists.
    pub fn path(&self) -> &Path {
        match self {
            Resolution::Found(path) => path,
            Resolution::NotFound { attempted } => attempted,
        }
    }
}

/// Locates a label file from its image file by swapping a directory token,
/// e.g. `dataset/imagesTr/case001.nii.gz` -> `dataset/labelsTr/case001.nii.gz`.
#[derive(Debug, Clone)]
pub struct VolumePairResolver {
    image_marker: String,
    label_marker: String,
}

impl Default for VolumePairResolver {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_MARKER, DEFAULT_LABEL_MARKER)
    }
}

impl VolumePairResolver {
    pub fn new(image_marker: impl Into<String>, label_marker: impl Into<String>) -> Self {
        Self {
            image_marker: image_marker.into(),
            label_marker: label_marker.into(),
        }
    }

    /// Whether the image marker occurs in the directory part of `image_path`.
    pub fn has_marker(&self, image_path: impl AsRef<Path>) -> bool {
        if self.image_marker.is_empty() {
            return false;
        }
        image_path
            .as_ref()
            .parent()
            .and_then(Path::to_str)
            .is_some_and(|dir| dir.contains(&self.image_marker))
    }

    /// Derive the expected label path without touching the filesystem.
    ///
    /// Every occurrence of the image marker in the parent directory is
    /// replaced. The file name itself is never rewritten.
    pub fn derive_label_path(&self, image_path: impl AsRef<Path>) -> PathBuf {
        let image_path = image_path.as_ref();
        let parent = image_path.parent().unwrap_or_else(|| Path::new(""));
        let label_dir = match parent.to_str() {
            Some(dir) if !self.image_marker.is_empty() => {
                PathBuf::from(dir.replace(&self.image_marker, &self.label_marker))
            }
            _ => parent.to_path_buf(),
        };
        match image_path.file_name() {
            Some(name) => label_dir.join(name),
            None => label_dir,
        }
    }

    /// Derive the label path and check that it exists.
    ///
    /// An image outside a marker directory is never paired: its derived
    /// label path would be the image itself.
    pub fn resolve(&self, image_path: impl AsRef<Path>) -> Resolution {
        let attempted = self.derive_label_path(image_path.as_ref());
        if !self.has_marker(image_path.as_ref()) {
            debug!(image = %image_path.as_ref().display(), marker = %self.image_marker, "image is outside a marker directory");
            return Resolution::NotFound { attempted };
        }
        if attempted.is_file() {
            debug!(image = %image_path.as_ref().display(), label = %attempted.display(), "resolved label file");
            Resolution::Found(attempted)
        } else {
            debug!(attempted = %attempted.display(), "label file not found");
            Resolution::NotFound { attempted }
        }
    }
}

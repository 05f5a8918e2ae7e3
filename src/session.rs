//! Viewer session: the `Empty -> Loaded -> Loaded` state machine behind the
//! open / toggle-overlay / screenshot actions.
//!
//! All operations run synchronously on the caller's thread. A load is atomic:
//! both files are decoded and both grids built before the renderer is touched,
//! so a failed load leaves the previous scene on screen.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use thiserror::Error;
use tracing::{info, warn};
use web_time::Instant;

use crate::config::ViewerConfig;
use crate::grid::VoxelGridBuilder;
use crate::normalizer::{IntensityNormalizer, NormalizeError};
use crate::pair_resolver::{Resolution, VolumePairResolver};
use crate::renderer::{ActorHandle, RenderError, VolumeRenderer, VolumeStyle};
use crate::stats::{LabelVolumeStats, VolumeStatsAggregator};
use crate::volume::{PairingError, VolumePair, VoxelSpacing};
use crate::volume_loader::{VolumeDecoder, VolumeLoaderError};

pub const EMPTY_REPORT_HTML: &str = "<b>体积统计信息：</b>";
pub const HIDE_OVERLAY_TEXT: &str = "隐藏标签";
pub const SHOW_OVERLAY_TEXT: &str = "显示标签";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Decode(#[from] VolumeLoaderError),

    #[error("cannot pair volumes: {0}")]
    Misregistered(#[from] PairingError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("no volume pair is loaded")]
    NotLoaded,
}

/// Result of a file selection that did not fail outright.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    Loaded(LoadSummary),
    /// The dialog was dismissed.
    Cancelled,
    LabelNotFound { attempted: PathBuf },
}

impl SelectOutcome {
    /// Transient status-bar text, if any.
    pub fn status_message(&self) -> Option<String> {
        match self {
            SelectOutcome::LabelNotFound { attempted } => {
                Some(format!("未找到标签文件：{}", attempted.display()))
            }
            SelectOutcome::Loaded(_) | SelectOutcome::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub image_path: PathBuf,
    pub label_path: PathBuf,
    pub dim: (usize, usize, usize),
    pub spacing: VoxelSpacing,
    pub stats: LabelVolumeStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedScene {
    pub summary: LoadSummary,
    pub image_actor: ActorHandle,
    pub label_actor: ActorHandle,
    pub label_visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Empty,
    Loaded(LoadedScene),
}

pub struct Session<D, R> {
    decoder: D,
    renderer: R,
    resolver: VolumePairResolver,
    normalizer: IntensityNormalizer,
    intensity_style: VolumeStyle,
    label_style: VolumeStyle,
    screenshot_dir: PathBuf,
    state: SessionState,
}

impl<D: VolumeDecoder, R: VolumeRenderer> Session<D, R> {
    pub fn new(decoder: D, renderer: R, config: &ViewerConfig) -> Self {
        Self {
            decoder,
            renderer,
            resolver: config.resolver(),
            normalizer: IntensityNormalizer::new(config.degenerate_policy),
            intensity_style: config.intensity_style.clone(),
            label_style: config.label_style.clone(),
            screenshot_dir: config.screenshot_dir.clone(),
            state: SessionState::Empty,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, SessionState::Loaded(_))
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn stats(&self) -> Option<&LabelVolumeStats> {
        match &self.state {
            SessionState::Loaded(scene) => Some(&scene.summary.stats),
            SessionState::Empty => None,
        }
    }

    pub fn label_visible(&self) -> Option<bool> {
        match &self.state {
            SessionState::Loaded(scene) => Some(scene.label_visible),
            SessionState::Empty => None,
        }
    }

    /// Statistics panel contents.
    pub fn report_html(&self) -> String {
        self.stats()
            .map_or_else(|| EMPTY_REPORT_HTML.to_owned(), LabelVolumeStats::to_html)
    }

    /// Caption of the overlay toggle: offers to hide while visible.
    pub fn overlay_button_text(&self) -> &'static str {
        match self.label_visible() {
            Some(false) => SHOW_OVERLAY_TEXT,
            _ => HIDE_OVERLAY_TEXT,
        }
    }

    /// Handle a file-dialog result. `None` means the user cancelled.
    pub fn select_files(&mut self, image_path: Option<&Path>) -> Result<SelectOutcome, SessionError> {
        let Some(image_path) = image_path else {
            return Ok(SelectOutcome::Cancelled);
        };

        match self.resolver.resolve(image_path) {
            Resolution::Found(label_path) => {
                let summary = self.load_pair(image_path, &label_path)?;
                Ok(SelectOutcome::Loaded(summary))
            }
            Resolution::NotFound { attempted } => {
                warn!(image = %image_path.display(), attempted = %attempted.display(), "no label file for image");
                Ok(SelectOutcome::LabelNotFound { attempted })
            }
        }
    }

    /// Decode, pair, normalize and display both volumes, replacing any
    /// previous scene.
    pub fn load_pair(&mut self, image_path: &Path, label_path: &Path) -> Result<LoadSummary, SessionError> {
        let started = Instant::now();
        let image = self.decoder.decode_intensity(image_path)?;
        let label = self.decoder.decode_labels(label_path)?;
        let VolumePair { mut image, label } = VolumePair::new(image, label)?;
        let spacing = image.spacing;
        let dim = image.dim();

        self.normalizer.normalize_in_place(image.data_mut())?;
        let image_grid = VoxelGridBuilder::from_volume(&image, self.intensity_style.scalars.as_str());
        drop(image);
        let label_grid = VoxelGridBuilder::from_volume(&label, self.label_style.scalars.as_str());
        let stats = VolumeStatsAggregator::aggregate(label.data(), spacing);
        drop(label);

        self.renderer.clear();
        self.state = SessionState::Empty;
        let image_actor = self.renderer.add_volume(&image_grid, &self.intensity_style)?;
        let label_actor = self.renderer.add_volume(&label_grid, &self.label_style)?;

        let summary = LoadSummary {
            image_path: image_path.to_path_buf(),
            label_path: label_path.to_path_buf(),
            dim,
            spacing,
            stats,
        };
        info!(
            image = %image_path.display(),
            label = %label_path.display(),
            labels = summary.stats.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded volume pair"
        );
        self.state = SessionState::Loaded(LoadedScene {
            summary: summary.clone(),
            image_actor,
            label_actor,
            label_visible: true,
        });
        Ok(summary)
    }

    /// Flip the label overlay. Returns the new visibility.
    pub fn toggle_overlay(&mut self) -> Result<bool, SessionError> {
        let SessionState::Loaded(scene) = &mut self.state else {
            return Err(SessionError::NotLoaded);
        };
        let visible = !scene.label_visible;
        self.renderer.set_visible(scene.label_actor, visible)?;
        scene.label_visible = visible;
        info!(visible, "toggled label overlay");
        Ok(visible)
    }

    /// Save the current frame as `screenshot_<yyyyMMdd_HHmmss>.png`.
    pub fn export_screenshot(&mut self) -> Result<PathBuf, SessionError> {
        self.export_screenshot_at(Local::now())
    }

    pub fn export_screenshot_at<Tz: TimeZone>(&mut self, at: DateTime<Tz>) -> Result<PathBuf, SessionError>
    where
        Tz::Offset: std::fmt::Display,
    {
        let path = self.screenshot_dir.join(screenshot_file_name(&at));
        self.export_screenshot_to(&path)?;
        Ok(path)
    }

    pub fn export_screenshot_to(&mut self, path: &Path) -> Result<(), SessionError> {
        if !self.is_loaded() {
            return Err(SessionError::NotLoaded);
        }
        self.renderer.capture(path)?;
        Ok(())
    }
}

pub fn screenshot_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("screenshot_{}.png", at.format("%Y%m%d_%H%M%S"))
}

/// Status-bar text after a screenshot.
pub fn screenshot_message(path: &Path) -> String {
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    format!("已保存截图为 {name}")
}

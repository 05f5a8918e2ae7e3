use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::config::{ConfigError, ViewerConfig};
use crate::enums::DegeneratePolicy;
use crate::pair_resolver::Resolution;
use crate::renderer::SoftwareRenderer;
use crate::session::{SelectOutcome, Session, SessionError, screenshot_message};
use crate::shell::run_shell;
use crate::stats::VolumeStatsAggregator;
use crate::volume_loader::{NiftiDecoder, VolumeDecoder, VolumeLoaderError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Decode(#[from] VolumeLoaderError),

    #[error("label file not found: {}", .0.display())]
    LabelNotFound(PathBuf),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "nifti-volume")]
#[command(version, about = "View co-registered NIfTI image/label pairs and measure label volumes", long_about = None)]
pub struct Cli {
    /// JSON file with viewer settings.
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Directory token that marks image folders (overrides the config).
    #[arg(long, global = true)]
    image_marker: Option<String>,

    /// Token substituted for the image marker to find label folders.
    #[arg(long, global = true)]
    label_marker: Option<String>,

    /// Handling of constant-intensity volumes.
    #[arg(long, value_enum, global = true)]
    degenerate: Option<DegeneratePolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the label file that belongs to an image.
    Resolve(ResolveArgs),
    /// Print per-label physical volumes.
    Stats(StatsArgs),
    /// Load a pair and save a rendered frame.
    Render(RenderArgs),
    /// Interactive session reading commands from stdin.
    Shell,
}

#[derive(Args, Debug)]
struct ResolveArgs {
    image: PathBuf,
}

#[derive(Args, Debug)]
struct StatsArgs {
    image: PathBuf,
    /// Use this label file instead of deriving it from the image path.
    #[arg(long, short)]
    label: Option<PathBuf>,
    /// Emit JSON instead of the text report.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct RenderArgs {
    image: PathBuf,
    /// Output PNG; defaults to a timestamped file in the screenshot directory.
    #[arg(long, short)]
    out: Option<PathBuf>,
    /// Render without the label overlay.
    #[arg(long)]
    hide_labels: bool,
}

impl Cli {
    pub fn viewer_config(&self) -> Result<ViewerConfig, ConfigError> {
        let mut config = ViewerConfig::load(self.config.as_deref())?;
        if let Some(marker) = &self.image_marker {
            config.image_marker = marker.clone();
        }
        if let Some(marker) = &self.label_marker {
            config.label_marker = marker.clone();
        }
        if let Some(policy) = self.degenerate {
            config.degenerate_policy = policy;
        }
        Ok(config)
    }

    pub fn run_program(&self) -> Result<(), CliError> {
        let config = self.viewer_config()?;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        match &self.command {
            Commands::Resolve(args) => match config.resolver().resolve(&args.image) {
                Resolution::Found(path) => writeln!(out, "{}", path.display())?,
                Resolution::NotFound { attempted } => return Err(CliError::LabelNotFound(attempted)),
            },
            Commands::Stats(args) => {
                let label_path = match &args.label {
                    Some(path) => path.clone(),
                    None => match config.resolver().resolve(&args.image) {
                        Resolution::Found(path) => path,
                        Resolution::NotFound { attempted } => {
                            return Err(CliError::LabelNotFound(attempted));
                        }
                    },
                };
                let labels = NiftiDecoder.decode_labels(&label_path)?;
                let stats = VolumeStatsAggregator::aggregate(labels.data(), labels.spacing);
                if args.json {
                    serde_json::to_writer_pretty(&mut out, &stats)?;
                    writeln!(out)?;
                } else {
                    writeln!(out, "{stats}")?;
                }
            }
            Commands::Render(args) => {
                let mut session = Self::session(&config);
                match session.select_files(Some(args.image.as_path()))? {
                    SelectOutcome::Loaded(summary) => writeln!(out, "{}", summary.stats)?,
                    SelectOutcome::LabelNotFound { attempted } => {
                        return Err(CliError::LabelNotFound(attempted));
                    }
                    SelectOutcome::Cancelled => return Ok(()),
                }
                if args.hide_labels {
                    session.toggle_overlay()?;
                }
                let path = match &args.out {
                    Some(path) => {
                        session.export_screenshot_to(path)?;
                        path.clone()
                    }
                    None => session.export_screenshot()?,
                };
                writeln!(out, "{}", screenshot_message(&path))?;
            }
            Commands::Shell => {
                let mut session = Self::session(&config);
                run_shell(&mut session, io::stdin().lock(), out)?;
            }
        }
        Ok(())
    }

    fn session(config: &ViewerConfig) -> Session<NiftiDecoder, SoftwareRenderer> {
        Session::new(NiftiDecoder, SoftwareRenderer::new(config.background), config)
    }
}

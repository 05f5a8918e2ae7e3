//! # NIfTI-volume library
//!
//! This crate pairs an intensity scan with its segmentation, prepares both
//! for volume rendering and measures the physical volume of every label.
//!
//! The pipeline for one load:
//!  - [`VolumePairResolver`] derives the label path from the image path by
//!    swapping a directory token (`imagesTr` -> `labelsTr`)
//!  - a [`VolumeDecoder`] (by default [`NiftiDecoder`]) reads both files into
//!    arrays indexed `[x, y, z]` with their voxel spacing
//!  - [`IntensityNormalizer`] rescales the scan into `[0, 1]`
//!  - [`VoxelGridBuilder`] turns each array into a cell-centred
//!    [`GridDescription`] with column-major scalars
//!  - a [`VolumeRenderer`] (by default [`SoftwareRenderer`]) draws the grids
//!  - [`VolumeStatsAggregator`] reports label volumes in mm³
//!
//! [`Session`] ties these together behind the open / toggle overlay /
//! screenshot actions.
//!
//! # Examples
//!
//! ## Measuring label volumes
//!
//! ```no_run
//! # use nifti_volume::{NiftiDecoder, VolumeDecoder, VolumePairResolver, Resolution, VolumeStatsAggregator};
//! let resolver = VolumePairResolver::default();
//! let Resolution::Found(label_path) = resolver.resolve("Task03_Liver/imagesTr/liver_0.nii.gz") else {
//!     panic!("no label file");
//! };
//! let labels = NiftiDecoder
//!     .decode_labels(&label_path)
//!     .expect("should have decoded label volume");
//! let stats = VolumeStatsAggregator::aggregate(labels.data(), labels.spacing);
//! println!("{stats}");
//! ```

pub mod cli;
mod colormap;
pub mod config;
pub mod enums;
pub mod grid;
mod interpolator;
pub mod normalizer;
pub mod pair_resolver;
pub mod renderer;
pub mod session;
pub mod shell;
pub mod stats;
pub mod telemetry;
pub mod volume;
pub mod volume_loader;

pub use config::ViewerConfig;
pub use enums::{Colormap, DegeneratePolicy, OpacityCurve, OpacityTransfer};
pub use grid::{GridDescription, ScalarField, VoxelGridBuilder};
pub use normalizer::{IntensityNormalizer, NormalizeError};
pub use pair_resolver::{Resolution, VolumePairResolver};
pub use renderer::{ActorHandle, RenderError, SoftwareRenderer, VolumeRenderer, VolumeStyle};
pub use session::{SelectOutcome, Session, SessionError, SessionState};
pub use stats::{LabelVolumeStats, VolumeStatsAggregator};
pub use volume::{PairingError, Volume, VolumePair, VoxelSpacing};
pub use volume_loader::{NiftiDecoder, VolumeDecoder, VolumeLoaderError};

use std::collections::BTreeMap;
use std::fmt;

use ndarray::Array3;
use ndarray::parallel::prelude::*;
use serde::Serialize;

use crate::volume::VoxelSpacing;

pub const BACKGROUND_LABEL: u8 = 0;
pub const REPORT_HEADER: &str = "体积统计（单位：mm³）";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelVolume {
    pub voxels: usize,
    pub volume_mm3: f64,
}

/// Physical volume per non-background label, ordered by label id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelVolumeStats {
    pub voxel_volume_mm3: f64,
    pub labels: BTreeMap<u8, LabelVolume>,
}

impl LabelVolumeStats {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, label: u8) -> Option<&LabelVolume> {
        self.labels.get(&label)
    }

    pub fn volume_mm3(&self, label: u8) -> Option<f64> {
        self.get(label).map(|l| l.volume_mm3)
    }

    /// Labels in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &LabelVolume)> {
        self.labels.iter().map(|(&label, volume)| (label, volume))
    }

    pub fn total_volume_mm3(&self) -> f64 {
        self.labels.values().map(|l| l.volume_mm3).sum()
    }

    pub fn report_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(label, volume)| format!("标签 {label}: {:.2} mm³", volume.volume_mm3))
            .collect()
    }

    /// Report as an HTML fragment: bold header, one `<br>`-separated line per label.
    pub fn to_html(&self) -> String {
        std::iter::once(format!("<b>{REPORT_HEADER}</b>"))
            .chain(self.report_lines())
            .collect::<Vec<_>>()
            .join("<br>")
    }
}

impl fmt::Display for LabelVolumeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{REPORT_HEADER}")?;
        for line in self.report_lines() {
            write!(f, "\n{line}")?;
        }
        Ok(())
    }
}

pub struct VolumeStatsAggregator;

impl VolumeStatsAggregator {
    /// Count voxels per label value in parallel.
    pub fn histogram(labels: &Array3<u8>) -> [usize; 256] {
        labels
            .par_iter()
            .fold(
                || [0usize; 256],
                |mut counts, &label| {
                    counts[label as usize] += 1;
                    counts
                },
            )
            .reduce(
                || [0usize; 256],
                |mut a, b| {
                    for (acc, n) in a.iter_mut().zip(b) {
                        *acc += n;
                    }
                    a
                },
            )
    }

    /// Per-label physical volume. The background label is never reported.
    pub fn aggregate(labels: &Array3<u8>, spacing: VoxelSpacing) -> LabelVolumeStats {
        let voxel_volume = spacing.voxel_volume();
        let labels = Self::histogram(labels)
            .iter()
            .enumerate()
            .filter(|&(label, &voxels)| label != BACKGROUND_LABEL as usize && voxels > 0)
            .map(|(label, &voxels)| {
                (
                    label as u8,
                    LabelVolume {
                        voxels,
                        volume_mm3: voxels as f64 * voxel_volume,
                    },
                )
            })
            .collect();
        LabelVolumeStats {
            voxel_volume_mm3: voxel_volume,
            labels,
        }
    }
}

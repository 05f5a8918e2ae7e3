use ndarray::Array3;
use ndarray::parallel::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use crate::enums::DegeneratePolicy;

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("intensity range is degenerate: every finite sample equals {value}")]
    DegenerateIntensityRange { value: f32 },

    #[error("intensity volume contains no finite samples")]
    NoFiniteSamples,
}

/// Global min/max of the finite samples, `None` if there are none.
pub fn finite_range(data: &Array3<f32>) -> Option<(f32, f32)> {
    let (min, max) = data
        .par_iter()
        .fold(
            || (f32::INFINITY, f32::NEG_INFINITY),
            |(lo, hi), &v| {
                if v.is_finite() {
                    (lo.min(v), hi.max(v))
                } else {
                    (lo, hi)
                }
            },
        )
        .reduce(
            || (f32::INFINITY, f32::NEG_INFINITY),
            |(lo_a, hi_a), (lo_b, hi_b)| (lo_a.min(lo_b), hi_a.max(hi_b)),
        );
    (min <= max).then_some((min, max))
}

/// Rescales intensities into `[0, 1]` using the global min and max.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntensityNormalizer {
    policy: DegeneratePolicy,
}

impl IntensityNormalizer {
    pub fn new(policy: DegeneratePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DegeneratePolicy {
        self.policy
    }

    pub fn normalize(&self, data: &Array3<f32>) -> Result<Array3<f32>, NormalizeError> {
        let mut out = data.to_owned();
        self.normalize_in_place(&mut out)?;
        Ok(out)
    }

    /// Same as [`normalize`](Self::normalize) but reuses the input buffer.
    ///
    /// Non-finite samples are written as 0. On error the data is left untouched.
    pub fn normalize_in_place(&self, data: &mut Array3<f32>) -> Result<(), NormalizeError> {
        match finite_range(data) {
            Some((min, max)) if max > min => {
                let range = max - min;
                debug!(min, max, "normalizing intensity volume");
                data.par_mapv_inplace(|v| {
                    if v.is_finite() {
                        ((v - min) / range).clamp(0.0, 1.0)
                    } else {
                        0.0
                    }
                });
                Ok(())
            }
            range => {
                let err = match range {
                    Some((value, _)) => NormalizeError::DegenerateIntensityRange { value },
                    None => NormalizeError::NoFiniteSamples,
                };
                match self.policy {
                    DegeneratePolicy::Reject => Err(err),
                    DegeneratePolicy::Zero => {
                        warn!("{err}; substituting a zero field");
                        data.par_mapv_inplace(|_| 0.0);
                        Ok(())
                    }
                }
            }
        }
    }
}

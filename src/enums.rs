use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// What to do when an intensity volume has a single constant value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Emit a field of zeros.
    #[default]
    Zero,
    /// Fail with `NormalizeError::DegenerateIntensityRange`.
    Reject,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Bone,
    Gray,
    Reds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpacityCurve {
    Linear,
    Sigmoid,
}

/// Scalar-to-opacity mapping over the actor's scalar range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpacityTransfer {
    Curve(OpacityCurve),
    /// Opacity values spread evenly over the scalar range and linearly interpolated.
    Explicit(Vec<f32>),
}

impl Default for OpacityTransfer {
    fn default() -> Self {
        OpacityTransfer::Curve(OpacityCurve::Sigmoid)
    }
}

impl OpacityTransfer {
    /// Opacity at position `t` in `[0, 1]` of the scalar range.
    pub fn opacity_at(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            OpacityTransfer::Curve(OpacityCurve::Linear) => t,
            OpacityTransfer::Curve(OpacityCurve::Sigmoid) => 1.0 / (1.0 + (-10.0 * (t - 0.5)).exp()),
            OpacityTransfer::Explicit(points) => match points.len() {
                0 => 0.0,
                1 => points[0].clamp(0.0, 1.0),
                n => {
                    let pos = t * (n - 1) as f32;
                    let i0 = (pos.floor() as usize).min(n - 2);
                    let frac = pos - i0 as f32;
                    let v = points[i0].mul_add(1.0 - frac, points[i0 + 1] * frac);
                    v.clamp(0.0, 1.0)
                }
            },
        }
    }
}

use crate::enums::Colormap;

// Anchor points (position, value) of the piecewise-linear channel curves.
const BONE_RED: &[(f32, f32)] = &[(0.0, 0.0), (0.746_032, 0.652_778), (1.0, 1.0)];
const BONE_GREEN: &[(f32, f32)] = &[
    (0.0, 0.0),
    (0.365_079, 0.319_444),
    (0.746_032, 0.777_778),
    (1.0, 1.0),
];
const BONE_BLUE: &[(f32, f32)] = &[(0.0, 0.0), (0.365_079, 0.444_444), (1.0, 1.0)];

const REDS: [[u8; 3]; 5] = [
    [255, 245, 240],
    [252, 187, 161],
    [251, 106, 74],
    [203, 24, 29],
    [103, 0, 13],
];

impl Colormap {
    /// Colour at position `t` in `[0, 1]`.
    pub fn rgb(self, t: f32) -> [u8; 3] {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        match self {
            Colormap::Gray => {
                let v = to_u8(t);
                [v, v, v]
            }
            Colormap::Bone => [
                to_u8(piecewise(BONE_RED, t)),
                to_u8(piecewise(BONE_GREEN, t)),
                to_u8(piecewise(BONE_BLUE, t)),
            ],
            Colormap::Reds => {
                let pos = t * (REDS.len() - 1) as f32;
                let i0 = (pos.floor() as usize).min(REDS.len() - 2);
                let frac = pos - i0 as f32;
                let (a, b) = (REDS[i0], REDS[i0 + 1]);
                [
                    lerp_u8(a[0], b[0], frac),
                    lerp_u8(a[1], b[1], frac),
                    lerp_u8(a[2], b[2], frac),
                ]
            }
        }
    }
}

fn piecewise(anchors: &[(f32, f32)], t: f32) -> f32 {
    for pair in anchors.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if t <= x1 {
            let frac = if x1 > x0 { (t - x0) / (x1 - x0) } else { 0.0 };
            return y0 + (y1 - y0) * frac;
        }
    }
    anchors.last().map_or(0.0, |&(_, y)| y)
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline]
fn lerp_u8(a: u8, b: u8, frac: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * frac).round().clamp(0.0, 255.0) as u8
}

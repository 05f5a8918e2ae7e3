use std::path::Path;

use image::RgbImage;
use ndarray::{Array2, Axis, Array3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::enums::{Colormap, OpacityCurve, OpacityTransfer};
use crate::grid::{GridDescription, Scalar};
use crate::interpolator::Interpolator;
use crate::volume::VoxelSpacing;

/// Accumulated opacity at which a ray stops marching.
const EARLY_TERMINATION: f32 = 0.995;
const AMBIENT: f32 = 0.3;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("grid has no scalar field named `{expected}` (found `{found}`)")]
    MissingScalars { expected: String, found: String },

    #[error("grid has no cells (dimensions {0:?})")]
    EmptyGrid([usize; 3]),

    #[error("scalar field holds {actual} values but the grid has {expected} cells")]
    FieldSizeMismatch { expected: usize, actual: usize },

    #[error("unknown actor {0:?}")]
    UnknownActor(ActorHandle),

    #[error("nothing to capture: no actors in the scene")]
    EmptyScene,

    #[error("failed to assemble frame of {0}x{1} pixels")]
    Frame(usize, usize),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Opaque reference to a volume added to a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorHandle(u64);

/// How a grid is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeStyle {
    /// Name of the scalar field to draw.
    pub scalars: String,
    pub colormap: Colormap,
    pub opacity: OpacityTransfer,
    pub shade: bool,
}

impl VolumeStyle {
    pub fn intensity() -> Self {
        Self {
            scalars: "values".to_owned(),
            colormap: Colormap::Bone,
            opacity: OpacityTransfer::Curve(OpacityCurve::Sigmoid),
            shade: true,
        }
    }

    pub fn label_overlay() -> Self {
        Self {
            scalars: "label".to_owned(),
            colormap: Colormap::Reds,
            opacity: OpacityTransfer::Explicit(vec![0.0, 0.0, 0.1, 0.4, 0.6, 0.8, 1.0]),
            shade: false,
        }
    }
}

/// Volumetric display surface.
pub trait VolumeRenderer {
    fn add_volume<T: Scalar>(
        &mut self,
        grid: &GridDescription<T>,
        style: &VolumeStyle,
    ) -> Result<ActorHandle, RenderError>;

    fn set_visible(&mut self, actor: ActorHandle, visible: bool) -> Result<(), RenderError>;

    /// Remove every actor.
    fn clear(&mut self);

    /// Write the current frame as a PNG file.
    fn capture(&mut self, path: &Path) -> Result<(), RenderError>;
}

struct Actor {
    handle: ActorHandle,
    style: VolumeStyle,
    cells: [usize; 3],
    spacing: VoxelSpacing,
    scalars: Vec<f32>,
    range: (f32, f32),
    visible: bool,
}

impl Actor {
    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.cells[0] * (y + self.cells[1] * z)
    }

    /// Position of a cell scalar within the actor's range.
    #[inline]
    fn normalized(&self, x: usize, y: usize, z: usize) -> f32 {
        let (min, max) = self.range;
        let v = self.scalars[self.index(x, y, z)];
        if max > min && v.is_finite() {
            ((v - min) / (max - min)).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Lambertian term with the light along the viewing axis.
    fn shading(&self, x: usize, y: usize, z: usize) -> f32 {
        let [nx, ny, nz] = self.cells;
        let diff = |lo: f32, hi: f32, span: usize, step: f64| {
            if span > 0 { (hi - lo) / (span as f64 * step) as f32 } else { 0.0 }
        };
        let (x0, x1) = (x.saturating_sub(1), (x + 1).min(nx - 1));
        let (y0, y1) = (y.saturating_sub(1), (y + 1).min(ny - 1));
        let (z0, z1) = (z.saturating_sub(1), (z + 1).min(nz - 1));
        let gx = diff(self.normalized(x0, y, z), self.normalized(x1, y, z), x1 - x0, self.spacing.x());
        let gy = diff(self.normalized(x, y0, z), self.normalized(x, y1, z), y1 - y0, self.spacing.y());
        let gz = diff(self.normalized(x, y, z0), self.normalized(x, y, z1), z1 - z0, self.spacing.z());
        let norm = (gx * gx + gy * gy + gz * gz).sqrt();
        if norm > f32::EPSILON {
            AMBIENT + (1.0 - AMBIENT) * (gz / norm).abs()
        } else {
            1.0
        }
    }

    /// Front-to-back compositing along -z. Returns premultiplied RGBA planes
    /// shaped `(ny, nx)`.
    fn composite(&self) -> [Array2<f32>; 4] {
        let [nx, ny, nz] = self.cells;
        let pixels: Vec<[f32; 4]> = (0..ny)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..nx).map(move |x| {
                    let mut rgba = [0.0f32; 4];
                    for z in (0..nz).rev() {
                        let t = self.normalized(x, y, z);
                        let alpha = self.style.opacity.opacity_at(t);
                        if alpha <= 0.0 {
                            continue;
                        }
                        let light = if self.style.shade { self.shading(x, y, z) } else { 1.0 };
                        let color = self.style.colormap.rgb(t);
                        let weight = (1.0 - rgba[3]) * alpha;
                        for c in 0..3 {
                            rgba[c] += weight * light * color[c] as f32 / 255.0;
                        }
                        rgba[3] += weight;
                        if rgba[3] >= EARLY_TERMINATION {
                            break;
                        }
                    }
                    rgba
                })
            })
            .collect();

        let planes = Array3::from_shape_fn((4, ny, nx), |(c, y, x)| pixels[x + nx * y][c]);
        [0, 1, 2, 3].map(|c| planes.index_axis(Axis(0), c).to_owned())
    }
}

/// CPU ray compositor. Looks down the z axis; later actors draw over earlier ones.
pub struct SoftwareRenderer {
    actors: Vec<Actor>,
    background: [u8; 3],
    next_id: u64,
}

impl Default for SoftwareRenderer {
    fn default() -> Self {
        Self::new([0xf0, 0xf0, 0xf0])
    }
}

impl SoftwareRenderer {
    pub fn new(background: [u8; 3]) -> Self {
        Self {
            actors: Vec::new(),
            background,
            next_id: 0,
        }
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn is_visible(&self, actor: ActorHandle) -> Option<bool> {
        self.actors
            .iter()
            .find(|a| a.handle == actor)
            .map(|a| a.visible)
    }

    /// Composite every visible actor over the background.
    ///
    /// The frame takes the in-plane size of the first actor, stretched to
    /// an isotropic aspect ratio, even when that actor is hidden.
    pub fn render(&self) -> Result<RgbImage, RenderError> {
        let first = self.actors.first().ok_or(RenderError::EmptyScene)?;
        let (width, height) = Interpolator::get_isotropic_dimensions(
            first.spacing,
            (first.cells[0], first.cells[1]),
        );

        let background = self.background.map(|c| c as f32 / 255.0);
        let mut frame = [0, 1, 2].map(|c| Array2::from_elem((height, width), background[c]));

        for actor in self.actors.iter().filter(|a| a.visible) {
            let layer = actor
                .composite()
                .map(|plane| Interpolator::resample(&plane.view(), width, height));
            let alpha = &layer[3];
            for (c, channel) in frame.iter_mut().enumerate() {
                ndarray::Zip::from(channel)
                    .and(&layer[c])
                    .and(alpha)
                    .for_each(|dst, &src, &a| *dst = src + (1.0 - a) * *dst);
            }
        }

        let mut bytes = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                for channel in &frame {
                    bytes.push((channel[[y, x]] * 255.0).round().clamp(0.0, 255.0) as u8);
                }
            }
        }
        RgbImage::from_raw(width as u32, height as u32, bytes)
            .ok_or(RenderError::Frame(width, height))
    }

    fn actor_mut(&mut self, actor: ActorHandle) -> Result<&mut Actor, RenderError> {
        self.actors
            .iter_mut()
            .find(|a| a.handle == actor)
            .ok_or(RenderError::UnknownActor(actor))
    }
}

impl VolumeRenderer for SoftwareRenderer {
    fn add_volume<T: Scalar>(
        &mut self,
        grid: &GridDescription<T>,
        style: &VolumeStyle,
    ) -> Result<ActorHandle, RenderError> {
        if grid.scalar_name() != style.scalars {
            return Err(RenderError::MissingScalars {
                expected: style.scalars.clone(),
                found: grid.scalar_name().to_owned(),
            });
        }
        let cells = grid.cell_dimensions();
        if cells.contains(&0) {
            return Err(RenderError::EmptyGrid(grid.dimensions));
        }
        if grid.cells.values.len() != grid.cell_count() {
            return Err(RenderError::FieldSizeMismatch {
                expected: grid.cell_count(),
                actual: grid.cells.values.len(),
            });
        }

        let scalars: Vec<f32> = grid.cells.values.par_iter().map(|v| v.to_f32()).collect();
        let range = scalars
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        let handle = ActorHandle(self.next_id);
        self.next_id += 1;
        debug!(?handle, scalars = %style.scalars, ?cells, ?range, "added volume actor");
        self.actors.push(Actor {
            handle,
            style: style.clone(),
            cells,
            spacing: grid.spacing,
            scalars,
            range,
            visible: true,
        });
        Ok(handle)
    }

    fn set_visible(&mut self, actor: ActorHandle, visible: bool) -> Result<(), RenderError> {
        self.actor_mut(actor)?.visible = visible;
        Ok(())
    }

    fn clear(&mut self) {
        self.actors.clear();
    }

    fn capture(&mut self, path: &Path) -> Result<(), RenderError> {
        let frame = self.render()?;
        frame.save(path)?;
        info!(path = %path.display(), width = frame.width(), height = frame.height(), "saved screenshot");
        Ok(())
    }
}

use ndarray::Array3;

use crate::volume::{Volume, VoxelSpacing};

/// Scalars a grid can carry. Renderers read every sample as `f32`.
pub trait Scalar: Copy + Send + Sync + 'static {
    fn to_f32(self) -> f32;
}

impl Scalar for f32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

impl Scalar for u8 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

/// A named per-cell scalar attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField<T> {
    pub name: String,
    pub values: Vec<T>,
}

/// Renderer-agnostic image grid with cell-associated scalars.
///
/// `dimensions` counts grid points, so a volume of `N` voxels along an
/// axis has `N + 1` points. `cells.values` is in column-major order: the
/// x index varies fastest, then y, then z.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDescription<T> {
    pub dimensions: [usize; 3],
    pub spacing: VoxelSpacing,
    pub origin: [f64; 3],
    pub cells: ScalarField<T>,
}

impl<T: Scalar> GridDescription<T> {
    /// Number of cells along each axis.
    pub fn cell_dimensions(&self) -> [usize; 3] {
        self.dimensions.map(|d| d.saturating_sub(1))
    }

    pub fn cell_count(&self) -> usize {
        self.cell_dimensions().iter().product()
    }

    #[inline]
    pub fn cell_index(&self, x: usize, y: usize, z: usize) -> usize {
        let [nx, ny, _] = self.cell_dimensions();
        x + nx * (y + ny * z)
    }

    #[inline]
    pub fn cell(&self, x: usize, y: usize, z: usize) -> T {
        self.cells.values[self.cell_index(x, y, z)]
    }

    pub fn scalar_name(&self) -> &str {
        &self.cells.name
    }
}

pub struct VoxelGridBuilder;

impl VoxelGridBuilder {
    /// Attach `data` (indexed `[x, y, z]`) to a point grid with origin at zero.
    pub fn build<T: Scalar>(
        data: &Array3<T>,
        spacing: VoxelSpacing,
        scalar_name: impl Into<String>,
    ) -> GridDescription<T> {
        let (nx, ny, nz) = data.dim();
        // Reversing the axes makes logical iteration order x-fastest.
        let values: Vec<T> = data.t().iter().copied().collect();
        GridDescription {
            dimensions: [nx + 1, ny + 1, nz + 1],
            spacing,
            origin: [0.0, 0.0, 0.0],
            cells: ScalarField {
                name: scalar_name.into(),
                values,
            },
        }
    }

    pub fn from_volume<T: Scalar>(
        volume: &Volume<T>,
        scalar_name: impl Into<String>,
    ) -> GridDescription<T> {
        Self::build(volume.data(), volume.spacing, scalar_name)
    }
}

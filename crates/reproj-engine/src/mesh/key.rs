use std::fmt;

use crate::coords::Point;

/// Identifies meshes that can share texture coordinates.
///
/// Two meshes with equal keys have the same lattice layout, so the texture
/// coordinate of their `k`-th vertex is the same.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MeshKey {
    horizontal_divisions: u32,
    vertical_divisions: u32,
    /// Sampler-specific bucket (e.g. source resolution class).
    discriminator: u64,
}

impl MeshKey {
    /// Largest division count; keeps `strip_len` within `u32`.
    pub const MAX_DIVISIONS: u32 = u32::MAX / 2 - 1;

    /// Division counts are clamped to `1..=MAX_DIVISIONS`.
    pub fn new(horizontal_divisions: u32, vertical_divisions: u32, discriminator: u64) -> Self {
        Self {
            horizontal_divisions: horizontal_divisions.clamp(1, Self::MAX_DIVISIONS),
            vertical_divisions: vertical_divisions.clamp(1, Self::MAX_DIVISIONS),
            discriminator,
        }
    }

    #[inline]
    pub fn horizontal_divisions(&self) -> u32 {
        self.horizontal_divisions
    }

    #[inline]
    pub fn vertical_divisions(&self) -> u32 {
        self.vertical_divisions
    }

    #[inline]
    pub fn discriminator(&self) -> u64 {
        self.discriminator
    }

    /// Mesh cells, as a float for threshold math.
    #[inline]
    pub fn division_count(&self) -> f64 {
        f64::from(self.horizontal_divisions) * f64::from(self.vertical_divisions)
    }

    /// Points in one triangle strip: two lattice rows of `h + 1` columns.
    #[inline]
    pub fn strip_len(&self) -> u32 {
        2 * (self.horizontal_divisions + 1)
    }

    /// Texture coordinate of point `j` of strip `strip`.
    ///
    /// Point `j` sits at lattice column `j / 2` and row `strip + j % 2`.
    pub fn tex_coord(&self, strip: u32, j: u32) -> Point {
        Point::new(
            f64::from(j / 2) / f64::from(self.horizontal_divisions),
            f64::from(strip + j % 2) / f64::from(self.vertical_divisions),
        )
    }
}

impl fmt::Display for MeshKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}/{}",
            self.horizontal_divisions, self.vertical_divisions, self.discriminator
        )
    }
}

use std::sync::Arc;

use crate::coords::{Affine2, Point};

use super::{MapProjection, TransformError};

/// A single-point transform between two coordinate spaces.
pub trait PointTransform: Send + Sync {
    fn transform(&self, p: Point) -> Result<Point, TransformError>;
}

/// A pixel grid placed in a projected CRS.
///
/// Used for both the source data grid and the target map. Immutable; a change
/// of resolution or projection means a new geometry.
#[derive(Debug, Clone)]
pub struct GridGeometry {
    width: u32,
    height: u32,
    /// Pixel centers to CRS coordinates.
    grid_to_crs: Affine2,
    projection: Arc<dyn MapProjection>,
}

impl GridGeometry {
    pub fn new(
        width: u32,
        height: u32,
        grid_to_crs: Affine2,
        projection: Arc<dyn MapProjection>,
    ) -> Self {
        Self {
            width,
            height,
            grid_to_crs,
            projection,
        }
    }

    /// North-up grid whose outer pixel edges span `min..max` in CRS units.
    pub fn covering(
        width: u32,
        height: u32,
        min: Point,
        max: Point,
        projection: Arc<dyn MapProjection>,
    ) -> Self {
        let dx = (max.x - min.x) / f64::from(width.max(1));
        let dy = (max.y - min.y) / f64::from(height.max(1));
        let origin = Point::new(min.x + dx / 2.0, max.y - dy / 2.0);
        Self::new(
            width,
            height,
            Affine2::from_origin_and_step(origin, dx, -dy),
            projection,
        )
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total pixel count as a float; products of pixel counts overflow integers.
    #[inline]
    pub fn pixel_count(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }

    #[inline]
    pub fn grid_to_crs(&self) -> Affine2 {
        self.grid_to_crs
    }

    #[inline]
    pub fn projection(&self) -> &Arc<dyn MapProjection> {
        &self.projection
    }

    /// Derives the grid pixel to longitude/latitude transform.
    pub fn to_lat_lon(&self) -> Result<GridToLatLon, TransformError> {
        if !self.grid_to_crs.determinant().is_finite() {
            return Err(TransformError::Failed(format!(
                "{} grid-to-crs transform is not finite",
                self.projection.name()
            )));
        }
        Ok(GridToLatLon {
            grid_to_crs: self.grid_to_crs,
            projection: Arc::clone(&self.projection),
        })
    }

    /// Derives the longitude/latitude to grid pixel transform.
    pub fn from_lat_lon(&self) -> Result<LatLonToGrid, TransformError> {
        let crs_to_grid = self.grid_to_crs.inverse().ok_or_else(|| {
            TransformError::NotInvertible(format!(
                "{} grid-to-crs transform is singular",
                self.projection.name()
            ))
        })?;
        Ok(LatLonToGrid {
            projection: Arc::clone(&self.projection),
            crs_to_grid,
        })
    }
}

/// Grid pixel -> CRS -> longitude/latitude.
#[derive(Debug, Clone)]
pub struct GridToLatLon {
    grid_to_crs: Affine2,
    projection: Arc<dyn MapProjection>,
}

impl PointTransform for GridToLatLon {
    fn transform(&self, p: Point) -> Result<Point, TransformError> {
        self.projection.unproject(self.grid_to_crs.apply(p))
    }
}

/// Longitude/latitude -> CRS -> grid pixel.
#[derive(Debug, Clone)]
pub struct LatLonToGrid {
    projection: Arc<dyn MapProjection>,
    crs_to_grid: Affine2,
}

impl PointTransform for LatLonToGrid {
    fn transform(&self, p: Point) -> Result<Point, TransformError> {
        Ok(self.crs_to_grid.apply(self.projection.project(p)?))
    }
}

use core::fmt;

use crate::coords::Point;

use super::TransformError;

/// Forward/inverse map projection between longitude/latitude (degrees) and a
/// projected CRS.
///
/// Implementations wrap whatever math library the host uses. They must be
/// callable from the mesh calculation workers.
pub trait MapProjection: Send + Sync + fmt::Debug {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Longitude/latitude to projected CRS coordinates.
    fn project(&self, lon_lat: Point) -> Result<Point, TransformError>;

    /// Projected CRS coordinates to longitude/latitude.
    fn unproject(&self, crs: Point) -> Result<Point, TransformError>;

    /// Central meridian in degrees, or `None` when the projection does not
    /// define one (wrap checking is then disabled).
    fn central_meridian(&self) -> Option<f64> {
        Some(0.0)
    }

    /// Latitude of origin in degrees, used to place wrap probes.
    fn latitude_of_origin(&self) -> f64 {
        0.0
    }
}

/// Rolls a longitude offset into `[-180, 180)`.
#[inline]
pub fn roll_longitude(lon: f64) -> f64 {
    lon - 360.0 * (lon / 360.0 + 0.5).floor()
}

/// Equidistant cylindrical projection in degree units.
///
/// `x = lon - central_meridian` (rolled into `[-180, 180)` unless the central
/// meridian is zero), `y = lat`. With a zero central meridian this is the plain
/// geographic lat/lon grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equirectangular {
    central_meridian: f64,
}

impl Equirectangular {
    pub const fn new(central_meridian: f64) -> Self {
        Self { central_meridian }
    }

    /// Geographic lat/lon, central meridian 0.
    pub const fn geographic() -> Self {
        Self { central_meridian: 0.0 }
    }
}

impl Default for Equirectangular {
    fn default() -> Self {
        Self::geographic()
    }
}

impl MapProjection for Equirectangular {
    fn name(&self) -> &str {
        "equirectangular"
    }

    fn project(&self, lon_lat: Point) -> Result<Point, TransformError> {
        if !lon_lat.is_finite() || lon_lat.y.abs() > 90.0 + 1e-9 {
            return Err(TransformError::OutOfDomain {
                transform: "equirectangular",
                x: lon_lat.x,
                y: lon_lat.y,
            });
        }
        // Longitude is only rolled for a non-zero central meridian.
        let x = if self.central_meridian == 0.0 {
            lon_lat.x
        } else {
            roll_longitude(lon_lat.x - self.central_meridian)
        };
        Ok(Point::new(x, lon_lat.y))
    }

    fn unproject(&self, crs: Point) -> Result<Point, TransformError> {
        if !crs.is_finite() {
            return Err(TransformError::OutOfDomain {
                transform: "equirectangular inverse",
                x: crs.x,
                y: crs.y,
            });
        }
        Ok(Point::new(crs.x + self.central_meridian, crs.y))
    }

    fn central_meridian(&self) -> Option<f64> {
        Some(self.central_meridian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_longitude_range() {
        assert_eq!(roll_longitude(0.0), 0.0);
        assert_eq!(roll_longitude(190.0), -170.0);
        assert_eq!(roll_longitude(-190.0), 170.0);
        assert_eq!(roll_longitude(180.0), -180.0);
    }

    #[test]
    fn geographic_does_not_roll() {
        let p = Equirectangular::geographic().project(Point::new(190.0, 10.0)).unwrap();
        assert_eq!(p, Point::new(190.0, 10.0));
    }

    #[test]
    fn centered_projection_rolls_around_its_meridian() {
        let proj = Equirectangular::new(180.0);
        assert_eq!(proj.project(Point::new(170.0, 0.0)).unwrap().x, -10.0);
        assert_eq!(proj.project(Point::new(-170.0, 0.0)).unwrap().x, 10.0);
    }

    #[test]
    fn latitude_outside_domain_fails() {
        let err = Equirectangular::geographic().project(Point::new(0.0, 91.0));
        assert!(matches!(err, Err(TransformError::OutOfDomain { .. })));
    }
}

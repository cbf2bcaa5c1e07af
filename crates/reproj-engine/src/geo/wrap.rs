use crate::coords::Point;

use super::{GridGeometry, MapProjection, PointTransform, TransformError};

/// Answers "does the segment between two longitudes cross the antimeridian of
/// the target projection".
pub trait WrapCheck: Send + Sync {
    /// True when the line between the two longitudes wraps around the world.
    fn crosses_wrap(&self, lon_a: f64, lon_b: f64) -> bool;

    /// Shifts a longitude by whole turns into the projection's valid range.
    fn to_projection_range(&self, lon: f64) -> f64;

    /// Longitude exactly 180° below the central meridian.
    fn low_meridian(&self) -> f64;

    /// Longitude exactly 180° above the central meridian.
    fn high_meridian(&self) -> f64;
}

/// Wrap checker derived from a target map projection.
///
/// The *ideal* inverse central meridians sit exactly 180° from the central
/// meridian. The *actual* ones are where the projection really starts placing
/// points on the other side of the map; floating point makes them differ from
/// the ideal by a few ULPs, and that difference decides which side a point on
/// the cut lands on. Longitudes are normalized against the actual values.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldWrapChecker {
    ideal_low: f64,
    ideal_high: f64,
    actual_low: f64,
    actual_high: f64,
    check_for_wrapping: bool,
}

impl WorldWrapChecker {
    /// Builds the checker for the projection of a target grid.
    pub fn new(target: &GridGeometry) -> Self {
        Self::for_projection(target.projection().as_ref())
    }

    pub fn for_projection(projection: &dyn MapProjection) -> Self {
        let Some(central_meridian) = projection.central_meridian() else {
            log::warn!(
                "{} defines no central meridian; world wrap checking disabled",
                projection.name()
            );
            return Self::disabled();
        };
        let latitude_of_origin = projection.latitude_of_origin();

        let ideal_high = central_meridian + 180.0;
        let ideal_low = central_meridian - 180.0;

        let mut checker = Self {
            ideal_low,
            ideal_high,
            actual_low: ideal_low,
            actual_high: ideal_high,
            check_for_wrapping: false,
        };

        match probe(projection, central_meridian, latitude_of_origin) {
            Ok([outer_high, inner_high, inner_low, outer_low]) => {
                let further = inner_high.distance(inner_low);
                let closer = outer_high.distance(outer_low);
                checker.check_for_wrapping = closer > further;

                // A zero central meridian is never rolled, actual == ideal.
                if checker.check_for_wrapping && central_meridian != 0.0 {
                    let low = find_actual_meridian(
                        projection,
                        ideal_low,
                        latitude_of_origin,
                        -0.1,
                        outer_low.x,
                    );
                    let high = find_actual_meridian(
                        projection,
                        ideal_high,
                        latitude_of_origin,
                        0.1,
                        outer_high.x,
                    );
                    match (low, high) {
                        (Ok(low), Ok(high)) => {
                            checker.actual_low = low;
                            checker.actual_high = high;
                        }
                        (Err(e), _) | (_, Err(e)) => {
                            log::warn!("error determining inverse central meridian: {e}");
                        }
                    }
                }
            }
            Err(e) => {
                log::warn!("error determining world wrap checking: {e}");
            }
        }

        checker
    }

    /// A checker that never reports a crossing.
    pub fn disabled() -> Self {
        Self {
            ideal_low: f64::NAN,
            ideal_high: f64::NAN,
            actual_low: f64::NAN,
            actual_high: f64::NAN,
            check_for_wrapping: false,
        }
    }

    #[inline]
    pub fn needs_checking(&self) -> bool {
        self.check_for_wrapping
    }

    #[inline]
    pub fn actual_low_meridian(&self) -> f64 {
        self.actual_low
    }

    #[inline]
    pub fn actual_high_meridian(&self) -> f64 {
        self.actual_high
    }
}

impl WrapCheck for WorldWrapChecker {
    fn crosses_wrap(&self, lon_a: f64, lon_b: f64) -> bool {
        if !self.check_for_wrapping {
            return false;
        }
        let a = self.to_projection_range(lon_a);
        let b = self.to_projection_range(lon_b);
        (a - b).abs() > 180.0
    }

    fn to_projection_range(&self, lon: f64) -> f64 {
        if !lon.is_finite() {
            return lon;
        }
        // Shift one way only: the actual range may be wider than 360°.
        if lon < self.actual_low {
            let turns = ((self.actual_low - lon) / 360.0).ceil();
            lon + turns * 360.0
        } else if lon > self.actual_high {
            let turns = ((lon - self.actual_high) / 360.0).ceil();
            lon - turns * 360.0
        } else {
            lon
        }
    }

    fn low_meridian(&self) -> f64 {
        self.ideal_low
    }

    fn high_meridian(&self) -> f64 {
        self.ideal_high
    }
}

/// Projects the four probe longitudes just inside each side of the cut:
/// `cm + 179.9`, `cm + 179.8`, `cm - 179.8`, `cm - 179.9`.
fn probe(
    projection: &dyn MapProjection,
    central_meridian: f64,
    latitude_of_origin: f64,
) -> Result<[Point; 4], TransformError> {
    let lons = [179.9, 179.8, -179.8, -179.9];
    let mut out = [Point::default(); 4];
    for (slot, offset) in out.iter_mut().zip(lons) {
        *slot = projection.project(Point::new(central_meridian + offset, latitude_of_origin))?;
    }
    Ok(out)
}

/// Binary search for the longitude nearest `ideal` (within `ideal ± diff`)
/// that still projects onto the same side of the map as `sample_x`.
///
/// `diff` is positive when searching the high meridian, negative for the low.
/// The search stops once the step no longer changes the candidate.
fn find_actual_meridian(
    projection: &dyn MapProjection,
    ideal: f64,
    latitude_of_origin: f64,
    mut diff: f64,
    sample_x: f64,
) -> Result<f64, TransformError> {
    let sign = sample_x.signum();
    let mut result = ideal;
    let mut test = ideal;
    let mut last = f64::NAN;
    while test != last {
        last = test;
        let projected = projection.project(Point::new(test, latitude_of_origin))?;
        if projected.x.signum() == sign {
            result = test;
            test += diff;
        } else {
            test -= diff;
        }
        diff /= 2.0;
    }
    Ok(result)
}

/// Number of source columns after which a grid repeats the globe, if it does.
///
/// A global 1° grid that is 360 pixels wide returns `Some(360)`; a regional
/// grid returns `None`. Meshes whose source wraps at exactly its width repeat
/// the texture horizontally instead of clamping.
pub fn source_wrap_columns(source: &GridGeometry) -> Option<u32> {
    let to_lat_lon = source.to_lat_lon().ok()?;
    let row = f64::from(source.height().saturating_sub(1)) / 2.0;

    let first = to_lat_lon.transform(Point::new(0.0, row)).ok()?;
    let second = to_lat_lon.transform(Point::new(1.0, row)).ok()?;
    let step = super::roll_longitude(second.x - first.x);
    if !step.is_finite() || step.abs() < 1e-9 {
        return None;
    }

    let columns = 360.0 / step.abs();
    let rounded = columns.round();
    if (columns - rounded).abs() > 1e-6 * rounded.max(1.0) || rounded > f64::from(u32::MAX) {
        return None;
    }

    // The column one turn away must land back on the first longitude.
    let repeat = to_lat_lon.transform(Point::new(rounded, row)).ok()?;
    if super::roll_longitude(repeat.x - first.x).abs() > 1e-6 {
        return None;
    }
    Some(rounded as u32)
}

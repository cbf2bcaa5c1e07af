use crate::coords::Point;
use crate::geo::WrapCheck;

/// Offset of the synthetic cut points from the inverse central meridian.
const CUT_EPSILON: f64 = 0.00001;

/// Which vertex of a strip triangle sits alone on its side of the cut.
///
/// Selected by which two of the three edges cross the wrap boundary.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WrapTopology {
    /// `next` is cut off from `prev1` and `prev2`.
    Next,
    /// `prev1` is cut off from `prev2` and `next`.
    Prev1,
    /// `prev2` is cut off from `next` and `prev1`.
    Prev2,
    /// Any other combination, e.g. a pole inside the triangle.
    Unsupported,
}

impl WrapTopology {
    pub fn classify(prev1_next: bool, prev2_next: bool, prev1_prev2: bool) -> Self {
        match (prev1_next, prev2_next, prev1_prev2) {
            (true, true, false) => WrapTopology::Next,
            (true, false, true) => WrapTopology::Prev1,
            (false, true, true) => WrapTopology::Prev2,
            _ => WrapTopology::Unsupported,
        }
    }
}

/// Pieces replacing one triangle that straddles the cut, in lon/lat.
///
/// The triangle keeps the lone vertex `a`; the quad keeps `b` and `c`. Both
/// end on the meridian at the same interpolated latitudes.
#[derive(Debug, Clone, PartialEq)]
pub struct WrapCorrection {
    pub triangle: [Point; 3],
    pub triangle_tex: [Point; 3],
    pub quad: [Point; 4],
    pub quad_tex: [Point; 4],
}

/// Splits strip triangles that cross the antimeridian.
pub struct WrapCorrector<'a> {
    checker: &'a dyn WrapCheck,
}

impl<'a> WrapCorrector<'a> {
    pub fn new(checker: &'a dyn WrapCheck) -> Self {
        Self { checker }
    }

    /// Corrects triangle `(prev2, prev1, next)` given as lon/lat points with
    /// matching texture coordinates.
    ///
    /// Returns `None` when the crossing pattern is not exactly two edges.
    pub fn correct(&self, world: [Point; 3], tex: [Point; 3]) -> Option<WrapCorrection> {
        let [p2, p1, n] = world;
        let [tp2, tp1, tn] = tex;
        let wwc = self.checker;

        let topology = WrapTopology::classify(
            wwc.crosses_wrap(p1.x, n.x),
            wwc.crosses_wrap(p2.x, n.x),
            wwc.crosses_wrap(p1.x, p2.x),
        );
        let ((a, ta), (b, tb), (c, tc)) = match topology {
            WrapTopology::Next => ((n, tn), (p1, tp1), (p2, tp2)),
            WrapTopology::Prev1 => ((p1, tp1), (p2, tp2), (n, tn)),
            WrapTopology::Prev2 => ((p2, tp2), (n, tn), (p1, tp1)),
            WrapTopology::Unsupported => {
                log::trace!("skipping wrap correction for unsupported triangle {world:?}");
                return None;
            }
        };

        let ax = wwc.to_projection_range(a.x);
        let bx = wwc.to_projection_range(b.x);
        let cx = wwc.to_projection_range(c.x);

        // Longitudinal distances measured across the cut.
        let ab_dist = 360.0 - (ax - bx).abs();
        let ac_dist = 360.0 - (ax - cx).abs();
        // An edge spanning the full turn has no crossing point to interpolate.
        if ab_dist <= 0.0 || ac_dist <= 0.0 {
            log::trace!("skipping wrap correction for full-turn triangle {world:?}");
            return None;
        }
        let mut am_dist = ax - wwc.low_meridian();
        if am_dist > 360.0 {
            am_dist -= 360.0;
        }

        // `tx` stays on a's side of the cut, `qx` on the b/c side.
        let mut tx = wwc.low_meridian() + CUT_EPSILON;
        let mut qx = wwc.high_meridian() - CUT_EPSILON;
        if am_dist > 180.0 {
            am_dist = 360.0 - am_dist;
            std::mem::swap(&mut tx, &mut qx);
        }

        let ab_t = am_dist / ab_dist;
        let ac_t = am_dist / ac_dist;
        let ab_y = a.y + ab_t * (b.y - a.y);
        let ac_y = a.y + ac_t * (c.y - a.y);
        if !ab_y.is_finite() || !ac_y.is_finite() {
            log::trace!("skipping wrap correction with non-finite cut at {a:?}");
            return None;
        }
        let ab_tex = ta.lerp(tb, ab_t);
        let ac_tex = ta.lerp(tc, ac_t);

        log::trace!("wrap correction {topology:?} at {a:?}");
        Some(WrapCorrection {
            triangle: [a, Point::new(tx, ab_y), Point::new(tx, ac_y)],
            triangle_tex: [ta, ab_tex, ac_tex],
            quad: [b, c, Point::new(qx, ab_y), Point::new(qx, ac_y)],
            quad_tex: [tb, tc, ab_tex, ac_tex],
        })
    }
}

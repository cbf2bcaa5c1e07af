use super::Point;

/// 2D affine transform `(x, y) -> (a*x + b*y + c, d*x + e*y + f)`.
///
/// Grid geometries use it to map pixel centers to projected CRS coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine2 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine2 {
    pub const IDENTITY: Affine2 = Affine2 { a: 1.0, b: 0.0, c: 0.0, d: 0.0, e: 1.0, f: 0.0 };

    #[inline]
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Axis-aligned grid: pixel `(0, 0)` center lands on `origin`, each pixel
    /// step moves by `(dx, dy)`. A north-up grid has a negative `dy`.
    #[inline]
    pub const fn from_origin_and_step(origin: Point, dx: f64, dy: f64) -> Self {
        Self { a: dx, b: 0.0, c: origin.x, d: 0.0, e: dy, f: origin.y }
    }

    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.b * p.y + self.c,
            self.d * p.x + self.e * p.y + self.f,
        )
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// Returns the inverse transform, or `None` when the matrix is singular
    /// or not finite.
    pub fn inverse(&self) -> Option<Affine2> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let a = self.e / det;
        let b = -self.b / det;
        let d = -self.d / det;
        let e = self.a / det;
        let c = -(a * self.c + b * self.f);
        let f = -(d * self.c + e * self.f);
        Some(Affine2 { a, b, c, d, e, f })
    }
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

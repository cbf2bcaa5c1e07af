use crate::coords::Point;
use crate::geo::{GridGeometry, PointTransform, WrapCheck};
use crate::geometry::GeometryBuffer;

use super::{LargeTriangleFilter, MeshError, WorldLattice, WrapCorrection, WrapCorrector};

/// Triangles and quads rebuilt on both sides of the antimeridian, each with
/// its own texture coordinates.
#[derive(Debug)]
pub(crate) struct WrapFill<B> {
    pub vertices: GeometryBuffer<B>,
    pub tex_coords: GeometryBuffer<B>,
}

impl<B> WrapFill<B> {
    fn new() -> Self {
        Self {
            vertices: GeometryBuffer::vertices("wrap fill vertices"),
            tex_coords: GeometryBuffer::tex_coords("wrap fill texture coordinates"),
        }
    }

    pub fn dispose(&mut self) {
        self.vertices.dispose();
        self.tex_coords.dispose();
    }
}

/// CPU-side result of one calculation.
#[derive(Debug)]
pub(crate) struct MeshGeometry<B> {
    pub primary: GeometryBuffer<B>,
    /// Present only if at least one triangle was wrap-corrected.
    pub wrap_fill: Option<WrapFill<B>>,
}

impl<B> MeshGeometry<B> {
    pub fn dispose(&mut self) {
        self.primary.dispose();
        if let Some(fill) = &mut self.wrap_fill {
            fill.dispose();
        }
    }
}

/// Inputs of a calculation, all read-only.
pub(crate) struct Calculation<'a> {
    pub lattice: &'a WorldLattice,
    pub source: &'a GridGeometry,
    pub target: &'a GridGeometry,
    pub to_target: &'a dyn PointTransform,
    pub wrap_check: &'a dyn WrapCheck,
}

impl Calculation<'_> {
    /// Walks every strip of the lattice into primary and wrap-fill geometry.
    ///
    /// A point that fails to project fails the whole calculation.
    pub fn run<B>(&self) -> Result<MeshGeometry<B>, MeshError> {
        let key = self.lattice.key();
        let filter = LargeTriangleFilter::new(key, self.target, self.source);
        let corrector = WrapCorrector::new(self.wrap_check);

        let mut primary = GeometryBuffer::vertices("mesh vertices");
        primary.allocate(key.strip_len() as usize * self.lattice.strip_count() as usize);
        let mut wrap_fill: Option<WrapFill<B>> = None;

        let mut segment: Vec<Point> = Vec::with_capacity(key.strip_len() as usize);
        for r in 0..self.lattice.strip_count() {
            let mut prev1: Option<Point> = None;
            let mut prev2: Option<Point> = None;

            for (j, next) in self.lattice.strip(r).enumerate() {
                let j = j as u32;
                let wrap1 = prev1.is_some_and(|p| self.wrap_check.crosses_wrap(p.x, next.x));
                let wrap2 = prev2.is_some_and(|p| self.wrap_check.crosses_wrap(p.x, next.x));

                if wrap1 || wrap2 {
                    if let (Some(p2), Some(p1)) = (prev2, prev1) {
                        let tex = [
                            key.tex_coord(r, j - 2),
                            key.tex_coord(r, j - 1),
                            key.tex_coord(r, j),
                        ];
                        if let Some(fix) = corrector.correct([p2, p1, next], tex) {
                            let fill = wrap_fill.get_or_insert_with(WrapFill::new);
                            self.emit(fix, fill)?;
                        }
                    }
                    if wrap1 || segment.len() > 1 {
                        filter.add_segment(&segment, &mut primary)?;
                        segment.clear();
                    }
                }
                segment.push(self.to_target.transform(next)?);

                prev2 = prev1;
                prev1 = Some(next);
            }

            filter.add_segment(&segment, &mut primary)?;
            segment.clear();
        }

        Ok(MeshGeometry { primary, wrap_fill })
    }

    fn emit<B>(&self, fix: WrapCorrection, fill: &mut WrapFill<B>) -> Result<(), MeshError> {
        let project = |points: &[Point]| -> Result<Vec<Point>, MeshError> {
            points
                .iter()
                .map(|&p| self.to_target.transform(p).map_err(MeshError::from))
                .collect()
        };
        let triangle = project(&fix.triangle)?;
        let quad = project(&fix.quad)?;

        fill.vertices.add_segment(&triangle)?;
        fill.tex_coords.add_segment(&fix.triangle_tex)?;
        fill.vertices.add_segment(&quad)?;
        fill.tex_coords.add_segment(&fix.quad_tex)?;
        Ok(())
    }
}

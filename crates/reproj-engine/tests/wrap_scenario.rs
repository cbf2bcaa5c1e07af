//! Antimeridian handling on a small lattice reprojected onto a
//! prime-meridian-centered world map.

mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use common::{FixedLattice, Harness, lat_lon_grid, uniform_sampler, world_grid};
use reproj_engine::device::{DrawPass, RecordingPainter};
use reproj_engine::mesh::{MeshState, PaintStatus};

const CROSSING: [f64; 4] = [170.0, 175.0, -175.0, -170.0];
const EAST_ONLY: [f64; 4] = [160.0, 165.0, 170.0, 175.0];

fn source() -> reproj_engine::geo::GridGeometry {
    lat_lon_grid(40, 40, (160.0, 0.0), (200.0, 40.0))
}

// ── geometry ──────────────────────────────────────────────────────────────

#[test]
fn crossing_rows_split_between_the_middle_columns() {
    let h = Harness::new();
    let mesh = h.mesh(
        source(),
        world_grid(),
        Arc::new(FixedLattice::rows(&CROSSING, 4, 30.0, 10.0)),
    );
    h.scheduler.run_pending();
    assert_eq!(mesh.state(), MeshState::Calculated);

    let snapshot = mesh.geometry_snapshot().unwrap();
    // Each of the three strips breaks once, at 175° -> -175°.
    assert_eq!(snapshot.primary.len(), 6);
    for (i, segment) in snapshot.primary.iter().enumerate() {
        assert_eq!(segment.len(), 4);
        let east = i % 2 == 0;
        for p in segment {
            // Target pixel x = lon + 179.5.
            if east {
                assert!(p.x > 340.0, "{p:?}");
            } else {
                assert!(p.x < 20.0, "{p:?}");
            }
        }
    }
}

#[test]
fn crossing_triangles_are_rebuilt_on_both_sides() {
    let h = Harness::new();
    let mesh = h.mesh(
        source(),
        world_grid(),
        Arc::new(FixedLattice::rows(&CROSSING, 4, 30.0, 10.0)),
    );
    h.scheduler.run_pending();
    let snapshot = mesh.geometry_snapshot().unwrap();

    // Two straddling triangles per strip, each a triangle plus a quad.
    assert_eq!(snapshot.wrap_fill.len(), 3 * 4);
    for pair in snapshot.wrap_fill.chunks(2) {
        assert_eq!(pair[0].len(), 3);
        assert_eq!(pair[1].len(), 4);
    }
    let points: usize = snapshot.wrap_fill.iter().map(Vec::len).sum();
    assert_eq!(snapshot.wrap_fill_tex.len(), points);

    // Every piece reaches a map edge, never across it.
    for segment in &snapshot.wrap_fill {
        let on_edge = segment
            .iter()
            .filter(|p| (p.x + 0.5).abs() < 1e-3 || (p.x - 359.5).abs() < 1e-3)
            .count();
        assert_eq!(on_edge, 2, "{segment:?}");
        let span = segment.iter().map(|p| p.x).fold(f64::NAN, f64::max)
            - segment.iter().map(|p| p.x).fold(f64::NAN, f64::min);
        assert!(span < 20.0, "{segment:?}");
    }
    for t in &snapshot.wrap_fill_tex {
        assert!((0.0..=1.0).contains(&t.x) && (0.0..=1.0).contains(&t.y), "{t:?}");
    }
}

#[test]
fn cut_points_sit_halfway_in_latitude() {
    let h = Harness::new();
    let mesh = h.mesh(
        source(),
        world_grid(),
        Arc::new(FixedLattice::rows(&CROSSING, 2, 10.0, 10.0)),
    );
    h.scheduler.run_pending();
    let snapshot = mesh.geometry_snapshot().unwrap();

    // First correction: lone vertex at (-175°, 10°), the cut is 5° from it
    // and from the 175° column, so it lands midway along each edge.
    let triangle = &snapshot.wrap_fill[0];
    assert_relative_eq!(triangle[0].x, 4.5, epsilon = 1e-9);
    assert_relative_eq!(triangle[1].x, -0.5, epsilon = 1e-3);
    // Latitudes 5° and 10° map to pixel rows 84.5 and 79.5.
    assert_relative_eq!(triangle[1].y, 84.5, epsilon = 1e-9);
    assert_relative_eq!(triangle[2].y, 79.5, epsilon = 1e-9);
}

#[test]
fn rows_without_sign_change_get_no_fill() {
    let h = Harness::new();
    let mesh = h.mesh(
        source(),
        world_grid(),
        Arc::new(FixedLattice::rows(&EAST_ONLY, 4, 30.0, 10.0)),
    );
    h.scheduler.run_pending();
    let snapshot = mesh.geometry_snapshot().unwrap();

    assert_eq!(snapshot.primary.len(), 3);
    assert!(snapshot.wrap_fill.is_empty());
    assert!(snapshot.wrap_fill_tex.is_empty());
}

#[test]
fn single_division_global_mesh_skips_full_turn_triangles() {
    let h = Harness::new();
    // One division spanning -180..180: both straddling triangles have an
    // edge a full turn long and no crossing point.
    let mesh = h.mesh(
        lat_lon_grid(4, 2, (-180.0, -90.0), (180.0, 90.0)),
        world_grid(),
        uniform_sampler(4.0),
    );
    h.scheduler.run_pending();
    assert_eq!(mesh.state(), MeshState::Calculated);
    assert_eq!(mesh.key().unwrap().to_string(), "1x1/0");

    let snapshot = mesh.geometry_snapshot().unwrap();
    assert!(snapshot.wrap_fill.is_empty());
    let points: usize = snapshot.primary.iter().map(Vec::len).sum();
    assert_eq!(points, 4);
    for p in snapshot.primary.concat() {
        assert!(p.is_finite(), "{p:?}");
    }

    let mut painter = RecordingPainter::new(&h.device);
    assert_eq!(h.calculate_and_paint(&mesh, &mut painter), PaintStatus::Painted);
}

// ── drawing ───────────────────────────────────────────────────────────────

#[test]
fn wrap_fill_is_drawn_as_a_second_pass() {
    let h = Harness::new();
    let mesh = h.mesh(
        source(),
        world_grid(),
        Arc::new(FixedLattice::rows(&CROSSING, 4, 30.0, 10.0)),
    );
    let mut painter = RecordingPainter::new(&h.device);
    assert_eq!(h.calculate_and_paint(&mesh, &mut painter), PaintStatus::Painted);

    let draws = painter.draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].pass, DrawPass::Primary);
    assert_eq!(draws[0].strips.len(), 6);
    assert_eq!(draws[1].pass, DrawPass::WrapFill);
    assert_eq!(draws[1].strips.len(), 12);
    // Fill pieces carry their own texture coordinates.
    assert_ne!(draws[0].tex_coord_buffer, draws[1].tex_coord_buffer);
    assert_eq!(draws[0].wrap, draws[1].wrap);
}

#[test]
fn unwrapped_mesh_draws_one_pass() {
    let h = Harness::new();
    let mesh = h.mesh(
        source(),
        world_grid(),
        Arc::new(FixedLattice::rows(&EAST_ONLY, 4, 30.0, 10.0)),
    );
    let mut painter = RecordingPainter::new(&h.device);
    h.calculate_and_paint(&mesh, &mut painter);
    assert_eq!(painter.draws().len(), 1);
    assert_eq!(painter.draws()[0].strips.len(), 3);
}

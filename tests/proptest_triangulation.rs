//! Property-based tests for triangulation invariants.
//!
//! ## Invariants Tested
//!
//! - **Orientation** - every triangle is counter-clockwise with positive area
//! - **Adjacency** - neighbor links are mutual and agree on the shared edge
//! - **Empty circumcircle** - no vertex lies inside a triangle's circumcircle
//! - **Euler characteristic** - `V - E + T = 1` for the triangulated region
//! - **Hull coverage** - `T = 2n - 2 - h`, with `h` counted by an independent
//!   monotone-chain hull, for uniform, elongated and nearly collinear clouds
//! - **Divide and conquer** - both merges produce well-formed triangles

use delaunay_refine::prelude::*;
use proptest::prelude::*;

// =============================================================================
// TEST CONFIGURATION
// =============================================================================

/// Minimum pairwise distance between generated points.
const MIN_SEPARATION: f64 = 1e-2;

/// In-circle tolerance for random inputs in `[-10, 10]²`.
const CIRCLE_TOLERANCE: f64 = 1e-6;

fn coordinate() -> impl Strategy<Value = f64> {
    -10.0..10.0
}

fn well_separated(points: &[[f64; 2]]) -> bool {
    points.iter().enumerate().all(|(i, p)| {
        points[i + 1..]
            .iter()
            .all(|q| (p[0] - q[0]).hypot(p[1] - q[1]) > MIN_SEPARATION)
    })
}

/// Point clouds of 3 to `max` separated points.
fn point_cloud(max: usize) -> impl Strategy<Value = Vec<[f64; 2]>> {
    prop::collection::vec(prop::array::uniform2(coordinate()), 3..=max)
        .prop_filter("points must be separated", |pts| well_separated(pts))
}

/// Points in `[0, 1000] x [0, 1]`.
fn elongated_cloud(max: usize) -> impl Strategy<Value = Vec<[f64; 2]>> {
    prop::collection::vec((0.0..1000.0, 0.0..1.0).prop_map(|(x, y)| [x, y]), 3..=max)
        .prop_filter("points must be separated", |pts| well_separated(pts))
}

/// Points in a band of height `0.05` along `[-10, 10]`.
fn band_cloud(max: usize) -> impl Strategy<Value = Vec<[f64; 2]>> {
    prop::collection::vec((coordinate(), 0.0..0.05).prop_map(|(x, y)| [x, y]), 3..=max)
        .prop_filter("points must be separated", |pts| well_separated(pts))
}

/// Vertex count of the strict convex hull (collinear boundary points
/// excluded), by Andrew's monotone chain on the raw coordinates.
fn convex_hull_size(points: &[[f64; 2]]) -> usize {
    let mut sorted = points.to_vec();
    sorted.sort_by(|p, q| p[0].total_cmp(&q[0]).then(p[1].total_cmp(&q[1])));
    let cross = |o: [f64; 2], a: [f64; 2], b: [f64; 2]| {
        (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
    };

    let mut hull: Vec<[f64; 2]> = Vec::with_capacity(points.len() + 1);
    for chain in [sorted.clone(), sorted.into_iter().rev().collect()] {
        let start = hull.len();
        for p in chain {
            while hull.len() >= start + 2
                && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
            {
                hull.pop();
            }
            hull.push(p);
        }
        hull.pop();
    }
    hull.len()
}

/// Checks `T = 2n - 2 - h` for the default build of `points`.
fn check_hull_coverage(points: &[[f64; 2]]) -> Result<(), TestCaseError> {
    let h = convex_hull_size(points);
    prop_assume!(h >= 3);
    let set = PointSet::from_points(points.iter().copied()).unwrap();
    let tri = Triangulation::new(&set).unwrap();
    let n = points.len();
    prop_assert_eq!(tri.build_stats().inserted, n);
    prop_assert_eq!(
        tri.mesh().number_of_triangles(),
        2 * n - 2 - h,
        "n={} h={}",
        n,
        h
    );
    prop_assert!(tri.mesh().is_valid().is_ok());
    Ok(())
}

/// Distinct undirected edges of the non-auxiliary triangles.
fn edge_count(mesh: &Mesh) -> usize {
    let mut edges = FastHashSet::default();
    for (_, tri) in mesh.real_triangles() {
        for i in 0..3 {
            edges.insert(tri.edge(i));
        }
    }
    edges.len()
}

/// Vertices used by at least one non-auxiliary triangle.
fn used_vertex_count(mesh: &Mesh) -> usize {
    let mut used = FastHashSet::default();
    for (_, tri) in mesh.real_triangles() {
        used.extend(tri.vertices());
    }
    used.len()
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_incremental_mesh_is_well_formed(points in point_cloud(40)) {
        let set = PointSet::from_points(points.iter().copied()).unwrap();
        let tri = Triangulation::new(&set).unwrap();
        let mesh = tri.mesh();

        prop_assert!(mesh.validate_triangles().is_ok());
        prop_assert!(mesh.validate_neighbors().is_ok());
        prop_assert_eq!(mesh.statistics().auxiliary_vertices, 0);
        prop_assert_eq!(mesh.statistics().auxiliary_triangles, 0);
    }

    #[test]
    fn prop_incremental_mesh_is_delaunay(points in point_cloud(40)) {
        let set = PointSet::from_points(points.iter().copied()).unwrap();
        let tri = Triangulation::new(&set).unwrap();
        let violations = tri.mesh().find_delaunay_violations(CIRCLE_TOLERANCE);
        prop_assert!(violations.is_empty(), "violations: {:?}", violations);
    }

    #[test]
    fn prop_euler_characteristic(points in point_cloud(24)) {
        let set = PointSet::from_points(points.iter().copied()).unwrap();
        let tri = Triangulation::new(&set).unwrap();
        let mesh = tri.mesh();
        let t = mesh.number_of_triangles();
        prop_assume!(t > 0);

        let v = used_vertex_count(mesh);
        let e = edge_count(mesh);
        prop_assert_eq!(v, points.len());
        prop_assert_eq!(v + t, e + 1, "V={} E={} T={}", v, e, t);

        // Every interior edge is counted twice, every hull edge once.
        let hull = convex_hull_size(&points);
        prop_assert_eq!(3 * t, 2 * e - hull);
    }

    #[test]
    fn prop_uniform_cloud_covers_hull(points in point_cloud(60)) {
        check_hull_coverage(&points)?;
    }

    #[test]
    fn prop_elongated_cloud_covers_hull(points in elongated_cloud(60)) {
        check_hull_coverage(&points)?;
    }

    #[test]
    fn prop_band_cloud_covers_hull(points in band_cloud(40)) {
        check_hull_coverage(&points)?;
    }

    #[test]
    fn prop_divide_and_conquer_is_well_formed(
        points in point_cloud(30),
        advancing in any::<bool>(),
    ) {
        let strategy = if advancing {
            MergeStrategy::AdvancingFront
        } else {
            MergeStrategy::NearestNeighbor
        };
        let set = PointSet::from_points(points.iter().copied()).unwrap();
        let options = TriangulationOptions::default()
            .with_construction(Construction::DivideAndConquer(strategy));
        let tri = Triangulation::with_options(&set, options).unwrap();
        let mesh = tri.mesh();

        prop_assert!(mesh.is_valid().is_ok());
        let eps = mesh.tolerances().degeneracy;
        for (key, _) in mesh.triangles() {
            let [a, b, c] = mesh.triangle_points(key).unwrap();
            prop_assert!(area(a, b, c) > eps);
        }
    }

    #[test]
    fn prop_output_matches_mesh(points in point_cloud(30)) {
        let set = PointSet::from_points(points.iter().copied()).unwrap();
        let tri = Triangulation::new(&set).unwrap();
        let output = tri.output();

        prop_assert_eq!(output.vertices.len(), points.len());
        prop_assert_eq!(output.triangles.len(), tri.mesh().number_of_triangles());
        for window in output.vertices.windows(2) {
            prop_assert!(window[0].index < window[1].index);
        }
        for triple in &output.triangles {
            let [a, b, c] = triple.map(|i| {
                let v = &output.vertices[usize::try_from(i).unwrap()];
                Point::new(v.x, v.y)
            });
            prop_assert!(orientation(a, b, c) > 0.0);
        }
    }
}

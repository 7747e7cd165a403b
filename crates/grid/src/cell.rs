//! Single-cell geometry
//!
//! Corner ordering follows the file format convention: within each depth
//! layer the four corners run (i-,j-), (i+,j-), (i-,j+), (i+,j+), with the
//! top layer first.
//!
//! ```text
//!     2 --- 3        top corners 0..4
//!     |     |        bottom corners 4..8 in the same pattern
//!     0 --- 1
//! ```

// external crates
use nalgebra::{Point3, Vector3};

/// Corner indices of the six cell faces, outward-oriented quads
///
/// Used to evaluate the cell volume as a divergence sum over the boundary.
const FACES: [[usize; 4]; 6] = [
    [0, 1, 3, 2],
    [4, 6, 7, 5],
    [4, 5, 1, 0],
    [6, 2, 3, 7],
    [4, 0, 2, 6],
    [5, 7, 3, 1],
];

/// One corner-point cell
///
/// Fully collapsed cells (all corners coincident in depth, representing
/// pinched-out layers) are valid geometry; their volume is simply zero.
/// Collapse and the active flag are independent properties, a collapsed
/// cell is usually inactive but does not have to be.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// The 8 corner positions, top 4 then bottom 4
    pub corners: [Point3<f64>; 8],
    /// Participation in the compacted active index space
    pub active: bool,
}

impl Cell {
    /// Volume of the (possibly skewed, possibly collapsed) hexahedron
    ///
    /// Divergence sum over the triangulated boundary, so degenerate corners
    /// contribute nothing rather than failing.
    pub fn volume(&self) -> f64 {
        let mut six_volumes = 0.0;
        for face in &FACES {
            let quad = [
                self.corners[face[0]].coords,
                self.corners[face[1]].coords,
                self.corners[face[2]].coords,
                self.corners[face[3]].coords,
            ];
            six_volumes += signed_tetra(quad[0], quad[1], quad[2]);
            six_volumes += signed_tetra(quad[0], quad[2], quad[3]);
        }
        (six_volumes / 6.0).abs()
    }

    /// True when the cell has collapsed to zero volume
    pub fn is_collapsed(&self) -> bool {
        self.volume() < 1e-12
    }

    /// The top-face footprint projected onto the xy plane, in loop order
    pub fn footprint(&self) -> [(f64, f64); 4] {
        // corner indices 0,1,3,2 walk the top quad as a closed loop
        [
            (self.corners[0].x, self.corners[0].y),
            (self.corners[1].x, self.corners[1].y),
            (self.corners[3].x, self.corners[3].y),
            (self.corners[2].x, self.corners[2].y),
        ]
    }

    /// Exact point-in-footprint test
    ///
    /// Ray casting over the projected top face, which stays correct for the
    /// concave quads a skewed corner-point cell can project to. A degenerate
    /// (zero-area) footprint contains nothing and never errors.
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        let polygon = self.footprint();
        let mut inside = false;
        let mut previous = polygon[polygon.len() - 1];
        for &current in &polygon {
            let (x1, y1) = previous;
            let (x2, y2) = current;
            if (y1 > y) != (y2 > y) {
                let x_cross = x1 + (y - y1) / (y2 - y1) * (x2 - x1);
                if x < x_cross {
                    inside = !inside;
                }
            }
            previous = current;
        }
        inside
    }
}

fn signed_tetra(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> f64 {
    a.dot(&b.cross(&c))
}

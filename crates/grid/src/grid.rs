//! Module for the structured corner-point grid model
//!
//! A [GridGeometry] owns every cell of one structured grid plus the
//! bookkeeping layered on top of the raw geometry: the compacted active
//! index space, local grid refinements, coarse groups and non-neighbor
//! connections.
//!
//! Refinements form a tree (a refinement may itself be refined), stored as
//! an arena of entries referenced by integer [RefinementId]. Parent/child
//! relationships are id references, never pointers, so ownership stays with
//! the grid.

// standard library
use std::collections::{HashMap, HashSet};

// crate modules
use crate::cell::Cell;
use crate::error::{Error, Result};

// ecltools modules
use ecltools_utils::{f, ValueExt};

// external crates
use serde::Serialize;

/// Grid extent in cells along each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridDims {
    /// Cells in i
    pub nx: usize,
    /// Cells in j
    pub ny: usize,
    /// Cells in k
    pub nz: usize,
}

impl GridDims {
    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Flattened global index, i running fastest
    pub fn global_index(&self, i: usize, j: usize, k: usize) -> Result<usize> {
        if i >= self.nx || j >= self.ny || k >= self.nz {
            return Err(Error::IndexOutOfRange {
                index: i.max(j).max(k),
                limit: self.nx.max(self.ny).max(self.nz),
            });
        }
        Ok(i + j * self.nx + k * self.nx * self.ny)
    }

    /// Inverse of [GridDims::global_index]
    pub fn ijk(&self, global: usize) -> Result<(usize, usize, usize)> {
        if global >= self.cell_count() {
            return Err(Error::IndexOutOfRange {
                index: global,
                limit: self.cell_count(),
            });
        }
        let i = global % self.nx;
        let j = (global / self.nx) % self.ny;
        let k = global / (self.nx * self.ny);
        Ok((i, j, k))
    }
}

impl std::fmt::Display for GridDims {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.nx, self.ny, self.nz)
    }
}

/// Id of one local refinement in the grid's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefinementId(pub usize);

/// Id of one coarse group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupId(pub usize);

/// Inclusive (i, j, k) cell range within a parent grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    /// Inclusive i bounds
    pub i: (usize, usize),
    /// Inclusive j bounds
    pub j: (usize, usize),
    /// Inclusive k bounds
    pub k: (usize, usize),
}

impl CellRange {
    fn intersects(&self, other: &CellRange) -> bool {
        fn overlap(a: (usize, usize), b: (usize, usize)) -> bool {
            a.0 <= b.1 && b.0 <= a.1
        }
        overlap(self.i, other.i) && overlap(self.j, other.j) && overlap(self.k, other.k)
    }

    fn within(&self, dims: GridDims) -> bool {
        self.i.0 <= self.i.1
            && self.j.0 <= self.j.1
            && self.k.0 <= self.k.1
            && self.i.1 < dims.nx
            && self.j.1 < dims.ny
            && self.k.1 < dims.nz
    }
}

/// One local grid refinement
///
/// Replaces the parent cells in `range` with a finer `dims` local grid.
/// `parent` is `None` for refinements of the main grid, or the id of the
/// refinement being further refined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRefinement {
    /// Arena id of this refinement
    pub id: RefinementId,
    /// Refined grid, or `None` for the main grid
    pub parent: Option<RefinementId>,
    /// Parent cells replaced by the local grid
    pub range: CellRange,
    /// Local grid extent
    pub dims: GridDims,
}

/// One coarse group: many fine cells treated as a single lookup unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoarseGroup {
    /// Id of this group
    pub id: GroupId,
    /// Member cells by global index
    pub cells: Vec<usize>,
}

/// Which geometry aspects participate in a structural comparison
#[derive(Debug, Clone, Copy)]
pub struct CompareOptions {
    /// Compare corner x/y positions
    pub coordinates: bool,
    /// Compare active flags
    pub actnum: bool,
    /// Compare corner depths
    pub depth: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        CompareOptions {
            coordinates: true,
            actnum: true,
            depth: true,
        }
    }
}

/// Structured corner-point grid with active-cell compaction
#[derive(Debug, Clone)]
pub struct GridGeometry {
    dims: GridDims,
    cells: Vec<Cell>,
    // global -> active, None for inactive cells
    active_of_global: Vec<Option<usize>>,
    // active -> global, total over [0, num_active_cells)
    global_of_active: Vec<usize>,
    refinements: Vec<LocalRefinement>,
    coarse_groups: Vec<CoarseGroup>,
    group_of_cell: HashMap<usize, GroupId>,
    nnc_seen: HashSet<(usize, usize)>,
    nncs: Vec<(usize, usize)>,
}

impl GridGeometry {
    /// A grid from its dimensions and a full cell list
    ///
    /// The cell list length must match the dimensions exactly; a partially
    /// built grid is never returned.
    pub fn new(dims: GridDims, cells: Vec<Cell>) -> Result<Self> {
        if cells.len() != dims.cell_count() {
            return Err(Error::InconsistentDimensions {
                keyword: "cells".to_string(),
                expected: dims.cell_count(),
                found: cells.len(),
            });
        }
        let mut grid = GridGeometry {
            dims,
            cells,
            active_of_global: Vec::new(),
            global_of_active: Vec::new(),
            refinements: Vec::new(),
            coarse_groups: Vec::new(),
            group_of_cell: HashMap::new(),
            nnc_seen: HashSet::new(),
            nncs: Vec::new(),
        };
        grid.rebuild_active_maps();
        Ok(grid)
    }

    /// Recompute the compacted index maps from the cell flags
    ///
    /// Keeps the bijection invariant: the map is monotonic in global index
    /// and its inverse is total over `[0, num_active_cells)`.
    fn rebuild_active_maps(&mut self) {
        self.active_of_global.clear();
        self.global_of_active.clear();
        for (global, cell) in self.cells.iter().enumerate() {
            if cell.active {
                self.active_of_global.push(Some(self.global_of_active.len()));
                self.global_of_active.push(global);
            } else {
                self.active_of_global.push(None);
            }
        }
    }

    /// Grid dimensions
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// The cell at (i, j, k)
    pub fn cell(&self, i: usize, j: usize, k: usize) -> Result<&Cell> {
        Ok(&self.cells[self.dims.global_index(i, j, k)?])
    }

    /// The cell at a flattened global index
    pub fn cell_by_global(&self, global: usize) -> Result<&Cell> {
        self.cells.get(global).ok_or(Error::IndexOutOfRange {
            index: global,
            limit: self.cells.len(),
        })
    }

    /// Number of cells participating in the active index space
    pub fn num_active_cells(&self) -> usize {
        self.global_of_active.len()
    }

    /// Compacted active index of a global cell, `None` when inactive
    pub fn global_to_active(&self, global: usize) -> Result<Option<usize>> {
        self.active_of_global
            .get(global)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index: global,
                limit: self.active_of_global.len(),
            })
    }

    /// Global index of an active cell
    ///
    /// Total over `[0, num_active_cells)`, anything else is out of range.
    pub fn active_to_global(&self, active: usize) -> Result<usize> {
        self.global_of_active
            .get(active)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index: active,
                limit: self.global_of_active.len(),
            })
    }

    /// Flip one cell's active flag and recompact the index maps
    pub fn set_active(&mut self, global: usize, active: bool) -> Result<()> {
        let limit = self.cells.len();
        let cell = self
            .cells
            .get_mut(global)
            .ok_or(Error::IndexOutOfRange {
                index: global,
                limit,
            })?;
        if cell.active != active {
            cell.active = active;
            self.rebuild_active_maps();
        }
        Ok(())
    }

    /// Register a local refinement of `parent` (or the main grid)
    ///
    /// Fails with [Error::OutOfBounds] if the parent range exceeds the
    /// parent's dimensions and [Error::OverlappingRefinement] if it
    /// intersects a sibling under the same parent, regardless of insertion
    /// order.
    pub fn add_refinement(
        &mut self,
        parent: Option<RefinementId>,
        range: CellRange,
        dims: GridDims,
    ) -> Result<RefinementId> {
        let parent_dims = match parent {
            None => self.dims,
            Some(id) => {
                self.refinement(id)
                    .ok_or(Error::IndexOutOfRange {
                        index: id.0,
                        limit: self.refinements.len(),
                    })?
                    .dims
            }
        };
        if !range.within(parent_dims) {
            return Err(Error::OutOfBounds);
        }
        if let Some(sibling) = self
            .refinements
            .iter()
            .find(|r| r.parent == parent && r.range.intersects(&range))
        {
            return Err(Error::OverlappingRefinement {
                existing: sibling.id.0,
            });
        }

        let id = RefinementId(self.refinements.len());
        self.refinements.push(LocalRefinement {
            id,
            parent,
            range,
            dims,
        });
        Ok(id)
    }

    /// One refinement by id
    pub fn refinement(&self, id: RefinementId) -> Option<&LocalRefinement> {
        self.refinements.get(id.0)
    }

    /// All refinements in insertion order
    pub fn refinements(&self) -> &[LocalRefinement] {
        &self.refinements
    }

    /// Aggregate cells into a coarse group
    ///
    /// A cell belongs to at most one group; [Error::CellAlreadyGrouped]
    /// otherwise.
    pub fn add_coarse_group(&mut self, cells: &[usize]) -> Result<GroupId> {
        for &cell in cells {
            if cell >= self.cells.len() {
                return Err(Error::IndexOutOfRange {
                    index: cell,
                    limit: self.cells.len(),
                });
            }
            if let Some(group) = self.group_of_cell.get(&cell) {
                return Err(Error::CellAlreadyGrouped {
                    cell,
                    group: group.0,
                });
            }
        }

        let id = GroupId(self.coarse_groups.len());
        for &cell in cells {
            self.group_of_cell.insert(cell, id);
        }
        self.coarse_groups.push(CoarseGroup {
            id,
            cells: cells.to_vec(),
        });
        Ok(id)
    }

    /// The coarse group a cell belongs to, if any
    pub fn coarse_group_of(&self, global: usize) -> Option<GroupId> {
        self.group_of_cell.get(&global).copied()
    }

    /// All coarse groups in insertion order
    pub fn coarse_groups(&self) -> &[CoarseGroup] {
        &self.coarse_groups
    }

    /// Flag two non-adjacent cells as connected
    ///
    /// The pair is unordered: (a, b) and (b, a) are the same connection, and
    /// inserting a duplicate in either orientation is an idempotent no-op.
    pub fn add_nnc(&mut self, a: usize, b: usize) {
        let pair = (a.min(b), a.max(b));
        if self.nnc_seen.insert(pair) {
            self.nncs.push(pair);
        }
    }

    /// All non-neighbor connections as normalised pairs, insertion order
    pub fn nncs(&self) -> &[(usize, usize)] {
        &self.nncs
    }

    /// Order-independent connection query
    pub fn has_nnc(&self, a: usize, b: usize) -> bool {
        self.nnc_seen.contains(&(a.min(b), a.max(b)))
    }

    /// Structural equality with per-aspect toggles
    ///
    /// Used for round-trip verification: dimensions always participate,
    /// corner x/y, active flags and corner depths each only when enabled.
    pub fn matches(&self, other: &GridGeometry, options: CompareOptions) -> bool {
        if self.dims != other.dims {
            return false;
        }
        self.cells.iter().zip(other.cells.iter()).all(|(a, b)| {
            if options.actnum && a.active != b.active {
                return false;
            }
            a.corners.iter().zip(b.corners.iter()).all(|(ca, cb)| {
                let xy_ok =
                    !options.coordinates || (ca.x == cb.x && ca.y == cb.y);
                let z_ok = !options.depth || ca.z == cb.z;
                xy_ok && z_ok
            })
        })
    }

    /// The (i, j) cells of layer `k` whose footprint contains (x, y)
    ///
    /// Exact point-in-polygon against each projected footprint; skewed cells
    /// can overlap in projection, so more than one hit is possible.
    pub fn cells_containing_xy(&self, x: f64, y: f64, k: usize) -> Result<Vec<(usize, usize)>> {
        if k >= self.dims.nz {
            return Err(Error::IndexOutOfRange {
                index: k,
                limit: self.dims.nz,
            });
        }
        let mut hits = Vec::new();
        for j in 0..self.dims.ny {
            for i in 0..self.dims.nx {
                if self.cells[self.dims.global_index(i, j, k)?].contains_xy(x, y) {
                    hits.push((i, j));
                }
            }
        }
        Ok(hits)
    }
}

impl std::fmt::Display for GridGeometry {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        let total_volume: f64 = self.cells.iter().map(Cell::volume).sum();
        write!(
            fmt,
            "{}",
            f!(
                "{} grid, {}/{} active, {} refinements, {} nncs, bulk volume {}",
                self.dims,
                self.num_active_cells(),
                self.dims.cell_count(),
                self.refinements.len(),
                self.nncs.len(),
                total_volume.sci(4, 2)
            )
        )
    }
}

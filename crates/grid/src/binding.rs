//! Binding between keyword file sessions and [GridGeometry]
//!
//! The geometry of a grid file lives in a handful of keyword records:
//! `GRIDHEAD` (dimensions), `COORD` (pillar line endpoints), `ZCORN` (corner
//! depths along those pillars), an optional `ACTNUM` activity array and the
//! optional `NNC1`/`NNC2` connection pairs. Reading interpolates each corner
//! position along its pillar at the recorded depth; writing emits the
//! equivalent records so that a read of the written file reproduces the same
//! geometry.

// standard library
use std::io::Write;

// crate modules
use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::grid::{GridDims, GridGeometry};

// ecltools modules
use ecltools_eclio::{EclFile, KeywordData, KeywordRecord};

// external crates
use itertools::iproduct;
use log::debug;
use nalgebra::Point3;
use serde::Serialize;

/// Entries 1..=3 of the 100-integer `GRIDHEAD` record hold the dimensions
const GRIDHEAD_LEN: usize = 100;

/// Read the geometry records of a session into a [GridGeometry]
///
/// Construction is all-or-nothing: any missing record or array length that
/// disagrees with the declared dimensions aborts with
/// [Error::InconsistentDimensions] and no grid is returned.
pub fn read_grid(file: &EclFile) -> Result<GridGeometry> {
    let head = file.read_keyword("GRIDHEAD", 0)?;
    let head = head.ints()?;
    if head.len() < 4 {
        return Err(Error::InconsistentDimensions {
            keyword: "GRIDHEAD".to_string(),
            expected: 4,
            found: head.len(),
        });
    }
    let dims = GridDims {
        nx: usize::try_from(head[1]).unwrap_or(0),
        ny: usize::try_from(head[2]).unwrap_or(0),
        nz: usize::try_from(head[3]).unwrap_or(0),
    };
    if dims.cell_count() == 0 {
        return Err(Error::InconsistentDimensions {
            keyword: "GRIDHEAD".to_string(),
            expected: 4,
            found: head.len(),
        });
    }

    let coord = file.read_keyword("COORD", 0)?;
    let coord = coord.reals()?;
    let pillar_values = (dims.nx + 1) * (dims.ny + 1) * 6;
    if coord.len() != pillar_values {
        return Err(Error::InconsistentDimensions {
            keyword: "COORD".to_string(),
            expected: pillar_values,
            found: coord.len(),
        });
    }

    let zcorn = file.read_keyword("ZCORN", 0)?;
    let zcorn = zcorn.reals()?;
    if zcorn.len() != 8 * dims.cell_count() {
        return Err(Error::InconsistentDimensions {
            keyword: "ZCORN".to_string(),
            expected: 8 * dims.cell_count(),
            found: zcorn.len(),
        });
    }

    let actnum = if file.index().count("ACTNUM") > 0 {
        let record = file.read_keyword("ACTNUM", 0)?;
        let flags = record.ints()?.to_vec();
        if flags.len() != dims.cell_count() {
            return Err(Error::InconsistentDimensions {
                keyword: "ACTNUM".to_string(),
                expected: dims.cell_count(),
                found: flags.len(),
            });
        }
        Some(flags)
    } else {
        None
    };

    let mut cells = Vec::with_capacity(dims.cell_count());
    for (k, j, i) in iproduct!(0..dims.nz, 0..dims.ny, 0..dims.nx) {
        let mut corners = [Point3::origin(); 8];
        for (c, corner) in corners.iter_mut().enumerate() {
            let (io, jo, ko) = (c % 2, (c % 4) / 2, c / 4);
            let depth = zcorn[zcorn_slot(dims, i, j, k, io, jo, ko)] as f64;
            let pillar = ((j + jo) * (dims.nx + 1) + (i + io)) * 6;
            *corner = point_on_pillar(&coord[pillar..pillar + 6], depth);
        }
        let global = i + j * dims.nx + k * dims.nx * dims.ny;
        let active = actnum.as_ref().map_or(true, |flags| flags[global] != 0);
        cells.push(Cell { corners, active });
    }

    let mut grid = GridGeometry::new(dims, cells)?;
    read_nncs(file, &mut grid)?;
    debug!("loaded {grid}");
    Ok(grid)
}

/// `NNC1`/`NNC2` hold 1-based global indices of each connection's two ends
fn read_nncs(file: &EclFile, grid: &mut GridGeometry) -> Result<()> {
    if file.index().count("NNC1") == 0 {
        return Ok(());
    }
    let nnc1 = file.read_keyword("NNC1", 0)?;
    let nnc1 = nnc1.ints()?;
    let nnc2 = file.read_keyword("NNC2", 0)?;
    let nnc2 = nnc2.ints()?;
    if nnc1.len() != nnc2.len() {
        return Err(Error::InconsistentDimensions {
            keyword: "NNC2".to_string(),
            expected: nnc1.len(),
            found: nnc2.len(),
        });
    }
    for (&a, &b) in nnc1.iter().zip(nnc2.iter()) {
        let limit = grid.dims().cell_count();
        let a = usize::try_from(i64::from(a) - 1)
            .map_err(|_| Error::IndexOutOfRange { index: 0, limit })?;
        let b = usize::try_from(i64::from(b) - 1)
            .map_err(|_| Error::IndexOutOfRange { index: 0, limit })?;
        grid.add_nnc(a, b);
    }
    Ok(())
}

/// Write the geometry of a grid as the equivalent keyword records
///
/// Emits `GRIDHEAD`, `COORD`, `ZCORN`, `ACTNUM`, the `NNC1`/`NNC2` pairs
/// when any connections exist, and a terminating `ENDGRID`. Reading the
/// written session back reproduces a grid that [matches](GridGeometry::matches)
/// this one under every comparison flag.
pub fn write_grid(grid: &GridGeometry, file: &mut EclFile) -> Result<()> {
    let dims = grid.dims();

    let mut head = vec![0i32; GRIDHEAD_LEN];
    head[0] = 1;
    head[1] = dims.nx as i32;
    head[2] = dims.ny as i32;
    head[3] = dims.nz as i32;
    append(file, "GRIDHEAD", KeywordData::Int(head))?;

    // pillar endpoints recovered from the top and bottom corner sheets
    let mut coord = Vec::with_capacity((dims.nx + 1) * (dims.ny + 1) * 6);
    for (pj, pi) in iproduct!(0..=dims.ny, 0..=dims.nx) {
        let (i, io) = if pi == dims.nx { (pi - 1, 1) } else { (pi, 0) };
        let (j, jo) = if pj == dims.ny { (pj - 1, 1) } else { (pj, 0) };
        let top = grid.cell(i, j, 0)?.corners[2 * jo + io];
        let bottom = grid.cell(i, j, dims.nz - 1)?.corners[4 + 2 * jo + io];
        coord.extend([
            top.x as f32,
            top.y as f32,
            top.z as f32,
            bottom.x as f32,
            bottom.y as f32,
            bottom.z as f32,
        ]);
    }
    append(file, "COORD", KeywordData::Real(coord))?;

    let mut zcorn = vec![0f32; 8 * dims.cell_count()];
    for (k, j, i) in iproduct!(0..dims.nz, 0..dims.ny, 0..dims.nx) {
        let cell = grid.cell(i, j, k)?;
        for (c, corner) in cell.corners.iter().enumerate() {
            let (io, jo, ko) = (c % 2, (c % 4) / 2, c / 4);
            zcorn[zcorn_slot(dims, i, j, k, io, jo, ko)] = corner.z as f32;
        }
    }
    append(file, "ZCORN", KeywordData::Real(zcorn))?;

    let actnum: Vec<i32> = (0..dims.cell_count())
        .map(|g| i32::from(grid.cell_by_global(g).map(|c| c.active).unwrap_or(false)))
        .collect();
    append(file, "ACTNUM", KeywordData::Int(actnum))?;

    if !grid.nncs().is_empty() {
        let nnc1: Vec<i32> = grid.nncs().iter().map(|&(a, _)| a as i32 + 1).collect();
        let nnc2: Vec<i32> = grid.nncs().iter().map(|&(_, b)| b as i32 + 1).collect();
        append(file, "NNC1", KeywordData::Int(nnc1))?;
        append(file, "NNC2", KeywordData::Int(nnc2))?;
    }

    append(file, "ENDGRID", KeywordData::Int(Vec::new()))?;
    Ok(())
}

fn append(file: &mut EclFile, name: &str, data: KeywordData) -> Result<()> {
    let record = KeywordRecord::new(name, data)?;
    file.append_keyword(&record)?;
    Ok(())
}

/// Position in the `ZCORN` array of one cell corner depth
///
/// The array runs i fastest with doubled indices: two depth entries per cell
/// per direction, top sheet before bottom sheet for each layer.
fn zcorn_slot(
    dims: GridDims,
    i: usize,
    j: usize,
    k: usize,
    io: usize,
    jo: usize,
    ko: usize,
) -> usize {
    ((2 * k + ko) * 2 * dims.ny + (2 * j + jo)) * 2 * dims.nx + (2 * i + io)
}

/// A corner position at `depth` along a pillar line
///
/// Collapsed pillars (equal endpoint depths) pin x/y to the top endpoint
/// rather than dividing by zero.
fn point_on_pillar(pillar: &[f32], depth: f64) -> Point3<f64> {
    let (x1, y1, z1) = (pillar[0] as f64, pillar[1] as f64, pillar[2] as f64);
    let (x2, y2, z2) = (pillar[3] as f64, pillar[4] as f64, pillar[5] as f64);
    if (z2 - z1).abs() < f64::EPSILON {
        return Point3::new(x1, y1, depth);
    }
    let t = (depth - z1) / (z2 - z1);
    Point3::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1), depth)
}

/// JSON view of the headline grid numbers
#[derive(Debug, Serialize)]
struct GridSummary {
    dims: GridDims,
    cell_count: usize,
    active_cells: usize,
    refinements: usize,
    coarse_groups: usize,
    nncs: usize,
}

/// Write a JSON summary of a grid for inspection or analysis
pub fn write_summary_json<W: Write>(grid: &GridGeometry, writer: W) -> Result<()> {
    let summary = GridSummary {
        dims: grid.dims(),
        cell_count: grid.dims().cell_count(),
        active_cells: grid.num_active_cells(),
        refinements: grid.refinements().len(),
        coarse_groups: grid.coarse_groups().len(),
        nncs: grid.nncs().len(),
    };
    serde_json::to_writer_pretty(writer, &summary)?;
    Ok(())
}

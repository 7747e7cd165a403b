//! Integration tests for grid file round trips

use ecltools_eclio::{ByteOrder, EclFile, FileFormat, KeywordData, KeywordRecord, OpenMode};
use ecltools_grid::{
    read_grid, write_grid, write_summary_json, Cell, CompareOptions, Error, GridDims, GridGeometry,
};
use nalgebra::Point3;
use rstest::rstest;
use std::path::Path;

/// A dims-sized grid of 100m x 100m x 10m cells on vertical pillars
fn block_grid(nx: usize, ny: usize, nz: usize) -> GridGeometry {
    let dims = GridDims { nx, ny, nz };
    let mut cells = Vec::with_capacity(dims.cell_count());
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let (x0, y0, z0) = (i as f64 * 100.0, j as f64 * 100.0, 2000.0 + k as f64 * 10.0);
                let corner = |io: f64, jo: f64, ko: f64| {
                    Point3::new(x0 + io * 100.0, y0 + jo * 100.0, z0 + ko * 10.0)
                };
                cells.push(Cell {
                    corners: [
                        corner(0.0, 0.0, 0.0),
                        corner(1.0, 0.0, 0.0),
                        corner(0.0, 1.0, 0.0),
                        corner(1.0, 1.0, 0.0),
                        corner(0.0, 0.0, 1.0),
                        corner(1.0, 0.0, 1.0),
                        corner(0.0, 1.0, 1.0),
                        corner(1.0, 1.0, 1.0),
                    ],
                    active: true,
                });
            }
        }
    }
    GridGeometry::new(dims, cells).unwrap()
}

fn round_trip(grid: &GridGeometry, path: &Path, format: FileFormat, order: ByteOrder) -> GridGeometry {
    let mut out = EclFile::open(path, OpenMode::Write, format, order).unwrap();
    write_grid(grid, &mut out).unwrap();
    drop(out);

    let session = EclFile::open(path, OpenMode::Read, format, order).unwrap();
    read_grid(&session).unwrap()
}

#[rstest]
#[case(FileFormat::Binary, ByteOrder::BigEndian)] // case 1
#[case(FileFormat::Binary, ByteOrder::LittleEndian)] // case 2
#[case(FileFormat::Formatted, ByteOrder::BigEndian)] // case 3
fn geometry_survives_a_round_trip(#[case] format: FileFormat, #[case] order: ByteOrder) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CASE.EGRID");

    let mut grid = block_grid(4, 3, 2);
    grid.set_active(5, false).unwrap();
    grid.set_active(17, false).unwrap();
    grid.add_nnc(2, 20);
    grid.add_nnc(7, 11);

    let reread = round_trip(&grid, &path, format, order);
    assert!(grid.matches(&reread, CompareOptions::default()));
    assert_eq!(reread.num_active_cells(), grid.num_active_cells());
    assert!(reread.has_nnc(20, 2));
    assert!(reread.has_nnc(7, 11));
    assert_eq!(reread.nncs().len(), 2);
}

#[test]
fn copies_compare_per_flag() {
    let dir = tempfile::tempdir().unwrap();
    let grid = block_grid(3, 3, 3);

    // two grids loaded from the same source compare equal on all flags
    let first = round_trip(
        &grid,
        &dir.path().join("A.EGRID"),
        FileFormat::Binary,
        ByteOrder::BigEndian,
    );
    let second = round_trip(
        &grid,
        &dir.path().join("B.EGRID"),
        FileFormat::Binary,
        ByteOrder::BigEndian,
    );
    assert!(first.matches(&second, CompareOptions::default()));

    // flip one x coordinate in a copy
    let mut cells: Vec<Cell> = (0..second.dims().cell_count())
        .map(|g| second.cell_by_global(g).unwrap().clone())
        .collect();
    cells[13].corners[2].x += 1.0;
    let bent = GridGeometry::new(second.dims(), cells).unwrap();

    assert!(!first.matches(&bent, CompareOptions::default()));
    assert!(first.matches(
        &bent,
        CompareOptions {
            coordinates: false,
            actnum: true,
            depth: true,
        }
    ));
}

#[test]
fn wrong_zcorn_length_aborts_construction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("BROKEN.EGRID");
    let dims = GridDims {
        nx: 2,
        ny: 2,
        nz: 1,
    };

    let mut out = EclFile::open(
        &path,
        OpenMode::Write,
        FileFormat::Binary,
        ByteOrder::BigEndian,
    )
    .unwrap();
    let mut head = vec![0i32; 100];
    head[0] = 1;
    head[1] = dims.nx as i32;
    head[2] = dims.ny as i32;
    head[3] = dims.nz as i32;
    for (name, data) in [
        ("GRIDHEAD", KeywordData::Int(head)),
        (
            "COORD",
            KeywordData::Real(vec![0.0; (dims.nx + 1) * (dims.ny + 1) * 6]),
        ),
        // one depth short
        (
            "ZCORN",
            KeywordData::Real(vec![0.0; 8 * dims.cell_count() - 1]),
        ),
    ] {
        out.append_keyword(&KeywordRecord::new(name, data).unwrap())
            .unwrap();
    }
    drop(out);

    let session = EclFile::open(&path, OpenMode::Read, FileFormat::Binary, ByteOrder::BigEndian)
        .unwrap();
    assert!(matches!(
        read_grid(&session),
        Err(Error::InconsistentDimensions {
            expected: 32,
            found: 31,
            ..
        })
    ));
}

#[test]
fn missing_actnum_means_fully_active() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CASE.EGRID");
    let grid = block_grid(3, 2, 2);

    // write, then strip the file down to a copy without ACTNUM
    let mut out = EclFile::open(
        &path,
        OpenMode::Write,
        FileFormat::Binary,
        ByteOrder::BigEndian,
    )
    .unwrap();
    write_grid(&grid, &mut out).unwrap();
    drop(out);

    let source = EclFile::open(&path, OpenMode::Read, FileFormat::Binary, ByteOrder::BigEndian)
        .unwrap();
    let stripped_path = dir.path().join("STRIPPED.EGRID");
    let mut stripped = EclFile::open(
        &stripped_path,
        OpenMode::Write,
        FileFormat::Binary,
        ByteOrder::BigEndian,
    )
    .unwrap();
    for name in ["GRIDHEAD", "COORD", "ZCORN"] {
        stripped
            .append_keyword(&source.read_keyword(name, 0).unwrap())
            .unwrap();
    }
    drop(stripped);

    let session = EclFile::open(
        &stripped_path,
        OpenMode::Read,
        FileFormat::Binary,
        ByteOrder::BigEndian,
    )
    .unwrap();
    let reread = read_grid(&session).unwrap();
    assert_eq!(reread.num_active_cells(), grid.dims().cell_count());
}

#[test]
fn summary_reports_headline_numbers() {
    let mut grid = block_grid(4, 3, 2);
    grid.set_active(0, false).unwrap();
    grid.add_nnc(1, 9);
    grid.add_coarse_group(&[2, 3]).unwrap();

    let mut buffer = Vec::new();
    write_summary_json(&grid, &mut buffer).unwrap();
    let summary: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

    assert_eq!(summary["dims"]["nx"], 4);
    assert_eq!(summary["cell_count"], 24);
    assert_eq!(summary["active_cells"], 23);
    assert_eq!(summary["nncs"], 1);
    assert_eq!(summary["coarse_groups"], 1);
}

#[test]
fn round_trip_preserves_cell_volumes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CASE.EGRID");
    let grid = block_grid(2, 2, 2);

    let reread = round_trip(&grid, &path, FileFormat::Binary, ByteOrder::BigEndian);
    for g in 0..grid.dims().cell_count() {
        let volume = reread.cell_by_global(g).unwrap().volume();
        assert!((volume - 100_000.0).abs() < 1e-3);
    }
}

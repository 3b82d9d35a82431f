//! FILENAME: tests/common/mod.rs
//! Shared fixtures for gridcalc engine integration tests.

#![allow(dead_code)]

use gridcalc_engine::{CellValue, Position, Sheet};

/// Parses A1 notation, panicking on malformed input.
pub fn pos(a1: &str) -> Position {
    a1.parse().unwrap_or_else(|e| panic!("bad position {}: {}", a1, e))
}

/// Builds a sheet from (A1, text) pairs, in order.
pub fn sheet_with(entries: &[(&str, &str)]) -> Sheet {
    let mut sheet = Sheet::new();
    for (a1, text) in entries {
        sheet
            .set_cell(pos(a1), text)
            .unwrap_or_else(|e| panic!("set {} = {:?} failed: {}", a1, text, e));
    }
    sheet
}

pub fn value_of(sheet: &Sheet, a1: &str) -> CellValue {
    sheet
        .get_value(pos(a1))
        .unwrap()
        .unwrap_or_else(|| panic!("no cell at {}", a1))
}

pub fn text_of(sheet: &Sheet, a1: &str) -> String {
    sheet
        .get_cell(pos(a1))
        .unwrap()
        .map(|cell| cell.get_text())
        .unwrap_or_default()
}

/// Checks that every forward edge has its backward twin and vice versa,
/// and that every in-bounds referenced position has a cell record.
pub fn assert_edges_symmetric(sheet: &Sheet) {
    for (from, cell) in sheet.cells() {
        for &to in cell.get_forward_references() {
            if !to.is_valid() {
                continue;
            }
            let target = sheet
                .get_cell(to)
                .unwrap()
                .unwrap_or_else(|| panic!("{} references {} but it has no record", from, to));
            assert!(
                target.get_backward_references().contains(&from),
                "{} -> {} has no backward edge",
                from,
                to
            );
        }
        for &reader in cell.get_backward_references() {
            let reader_cell = sheet
                .get_cell(reader)
                .unwrap()
                .unwrap_or_else(|| panic!("{} lists missing reader {}", from, reader));
            assert!(
                reader_cell.get_forward_references().contains(&from),
                "{} lists {} as reader but {} does not reference it",
                from,
                reader,
                reader
            );
        }
    }
}

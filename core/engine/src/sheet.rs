//! FILENAME: core/engine/src/sheet.rs
//! PURPOSE: Owns every cell and mediates all structural edits.
//! CONTEXT: The Sheet is the arena for the cell graph. Cells are keyed by
//! `Position` and refer to each other only through those keys. Every edit
//! goes through `set_cell` / `clear_cell`, which keep the forward and
//! backward edge sets symmetric, reject formulas that would close a cycle,
//! and invalidate cached values downstream of the edited cell.
//!
//! EDIT PROTOCOL (set_cell):
//! 1. Validate the position, short-circuit identical text.
//! 2. Build the candidate cell off-graph (may fail to parse).
//! 3. Probe for a cycle through the current graph.
//! 4. Only then mutate: invalidate, unhook old edges, carry readers over,
//!    hook new edges (materializing placeholders), install, resize.

use std::io::{self, Write};

use log::{debug, trace, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::error::{Result, SheetError};
use crate::position::{Position, Size};
use crate::value::CellValue;
use crate::COLUMN_DELIMITER;

/// Counters describing how much work the cache layer has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetStats {
    /// Formula evaluations actually performed (cache misses).
    pub evaluations: u64,
    /// Cached values dropped by invalidation.
    pub invalidations: u64,
}

/// A sparse grid of cells with automatic dependency tracking.
#[derive(Debug, Default)]
pub struct Sheet {
    cells: FxHashMap<Position, Cell>,
    printable_size: Size,
    evaluations: std::cell::Cell<u64>,
    invalidations: u64,
}

impl Sheet {
    /// Creates a new, empty Sheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the content of the cell at `pos` from user text.
    ///
    /// Fails with `InvalidPosition`, `FormulaParse` or `CircularDependency`;
    /// in every failure case the sheet is left untouched. Writing the text
    /// a cell already holds is a no-op and invalidates nothing.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<()> {
        ensure_valid(pos)?;

        if let Some(existing) = self.cells.get(&pos) {
            if existing.get_text() == text {
                trace!("set_cell {}: text unchanged, skipping", pos);
                return Ok(());
            }
        }

        let mut candidate = Cell::new();
        candidate.set(text)?;

        if self.would_create_cycle(pos, &candidate) {
            warn!("set_cell {}: rejected circular formula {:?}", pos, text);
            return Err(SheetError::CircularDependency(pos));
        }

        // Nothing below can fail.
        let mut old_was_visible = false;
        if self.cells.contains_key(&pos) {
            self.invalidate_dependents(pos);
            if let Some(mut old) = self.cells.remove(&pos) {
                old_was_visible = !old.is_empty();
                self.detach_forward_edges(pos, &old);
                candidate.set_backward_references(old.take_backward_references());
            }
        }
        self.attach_forward_edges(pos, &candidate);

        let visible = !candidate.is_empty();
        self.cells.insert(pos, candidate);

        if visible {
            self.grow_printable_size(pos);
        } else if old_was_visible {
            self.shrink_printable_size();
        }

        debug!("set_cell {} <- {:?}", pos, text);
        Ok(())
    }

    /// Returns the cell at `pos`, or `None` if nothing is stored there.
    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>> {
        ensure_valid(pos)?;
        Ok(self.cells.get(&pos))
    }

    /// Drops the cached value at `pos` together with every cached value
    /// downstream of it. The next read recomputes them.
    pub fn invalidate_cell(&mut self, pos: Position) -> Result<()> {
        ensure_valid(pos)?;
        self.invalidate_dependents(pos);
        Ok(())
    }

    /// Convenience read of a cell's value; `None` if no cell is stored.
    pub fn get_value(&self, pos: Position) -> Result<Option<CellValue>> {
        Ok(self.get_cell(pos)?.map(|cell| cell.get_value(self)))
    }

    /// Clears the cell at `pos`.
    ///
    /// Readers of the cell are invalidated and will see zero from now on.
    /// A cell that is still read by other formulas stays behind as an
    /// empty placeholder so later writes keep invalidating its readers;
    /// an unreferenced cell is removed outright.
    pub fn clear_cell(&mut self, pos: Position) -> Result<()> {
        ensure_valid(pos)?;

        let in_printable_area =
            pos.row < self.printable_size.rows && pos.col < self.printable_size.cols;
        if !in_printable_area || !self.cells.contains_key(&pos) {
            return Ok(());
        }

        self.invalidate_dependents(pos);
        if let Some(mut old) = self.cells.remove(&pos) {
            self.detach_forward_edges(pos, &old);
            let readers = old.take_backward_references();
            if !readers.is_empty() {
                let mut placeholder = Cell::new();
                placeholder.set_backward_references(readers);
                self.cells.insert(pos, placeholder);
            }
        }

        self.shrink_printable_size();
        debug!("clear_cell {}", pos);
        Ok(())
    }

    /// Smallest rectangle anchored at A1 holding every non-empty cell.
    pub fn get_printable_size(&self) -> Size {
        self.printable_size
    }

    /// Writes the values of the printable area, tab-separated, one row per line.
    pub fn print_values<W: Write>(&self, output: &mut W) -> io::Result<()> {
        self.print_cells(output, |out, cell| write!(out, "{}", cell.get_value(self)))
    }

    /// Writes the texts of the printable area, tab-separated, one row per line.
    pub fn print_texts<W: Write>(&self, output: &mut W) -> io::Result<()> {
        self.print_cells(output, |out, cell| out.write_all(cell.get_text().as_bytes()))
    }

    /// Iterates over every stored cell, placeholders included, in no particular order.
    pub fn cells(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.cells.iter().map(|(&pos, cell)| (pos, cell))
    }

    /// Snapshot of the evaluation and invalidation counters.
    pub fn stats(&self) -> SheetStats {
        SheetStats {
            evaluations: self.evaluations.get(),
            invalidations: self.invalidations,
        }
    }

    pub(crate) fn cell_at(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(&pos)
    }

    /// Caches the values of `roots` and of every uncached cell they read,
    /// dependencies first. Uses an explicit stack, so chain length is not
    /// bounded by the call stack.
    pub(crate) fn fill_caches(&self, roots: &[Position]) {
        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        let mut stack: Vec<(Position, bool)> = roots.iter().rev().map(|&pos| (pos, false)).collect();

        while let Some((pos, expanded)) = stack.pop() {
            if expanded {
                order.push(pos);
                continue;
            }
            let Some(cell) = self.cells.get(&pos) else {
                continue;
            };
            if cell.has_cache() || !visited.insert(pos) {
                continue;
            }
            stack.push((pos, true));
            stack.extend(
                cell.get_forward_references()
                    .iter()
                    .rev()
                    .filter(|dep| !visited.contains(*dep))
                    .map(|&dep| (dep, false)),
            );
        }

        if order.len() > 1 {
            trace!("filling {} cached value(s) in dependency order", order.len());
        }
        for pos in order {
            if let Some(cell) = self.cells.get(&pos) {
                cell.get_value(self);
            }
        }
    }

    pub(crate) fn record_evaluation(&self) {
        self.evaluations.set(self.evaluations.get() + 1);
    }

    fn print_cells<W, F>(&self, output: &mut W, mut print_cell: F) -> io::Result<()>
    where
        W: Write,
        F: FnMut(&mut W, &Cell) -> io::Result<()>,
    {
        let Size { rows, cols } = self.printable_size;
        for row in 0..rows {
            for col in 0..cols {
                if col > 0 {
                    write!(output, "{}", COLUMN_DELIMITER)?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    if !cell.is_empty() {
                        print_cell(output, cell)?;
                    }
                }
            }
            writeln!(output)?;
        }
        Ok(())
    }

    fn would_create_cycle(&self, pos: Position, candidate: &Cell) -> bool {
        let mut visited = FxHashSet::default();
        candidate.has_cycle(self, pos, &mut visited)
    }

    /// Drops the cached value at `pos` and every cached value that
    /// transitively reads it. The walk stops at cells with no cached value:
    /// nothing downstream of them can be cached either, so each stale cell
    /// is visited once per call even on diamond-shaped graphs.
    fn invalidate_dependents(&mut self, pos: Position) {
        let mut stack = Vec::new();
        let mut dropped = 0u64;

        if let Some(cell) = self.cells.get_mut(&pos) {
            if cell.invalidate_cache() {
                dropped += 1;
            }
            stack.extend(cell.get_backward_references().iter().copied());
        }

        while let Some(current) = stack.pop() {
            if let Some(cell) = self.cells.get_mut(&current) {
                if cell.invalidate_cache() {
                    dropped += 1;
                    stack.extend(cell.get_backward_references().iter().copied());
                }
            }
        }

        if dropped > 0 {
            trace!("invalidated {} cached value(s) downstream of {}", dropped, pos);
        }
        self.invalidations += dropped;
    }

    /// Removes `pos` from the reader sets of everything `cell` references.
    fn detach_forward_edges(&mut self, pos: Position, cell: &Cell) {
        for target in cell.get_forward_references() {
            if let Some(referenced) = self.cells.get_mut(target) {
                referenced.remove_backward_reference(pos);
            }
        }
    }

    /// Registers `pos` as a reader of everything `cell` references,
    /// creating empty placeholders for absent in-bounds positions.
    fn attach_forward_edges(&mut self, pos: Position, cell: &Cell) {
        for &target in cell.get_forward_references() {
            if !target.is_valid() {
                continue;
            }
            self.cells
                .entry(target)
                .or_default()
                .add_backward_reference(pos);
        }
    }

    fn grow_printable_size(&mut self, pos: Position) {
        self.printable_size.rows = self.printable_size.rows.max(pos.row + 1);
        self.printable_size.cols = self.printable_size.cols.max(pos.col + 1);
    }

    /// Recomputes the printable area from scratch.
    fn shrink_printable_size(&mut self) {
        let mut size = Size::default();
        for (pos, cell) in &self.cells {
            if !cell.is_empty() {
                size.rows = size.rows.max(pos.row + 1);
                size.cols = size.cols.max(pos.col + 1);
            }
        }
        self.printable_size = size;
    }
}

fn ensure_valid(pos: Position) -> Result<()> {
    if pos.is_valid() {
        Ok(())
    } else {
        Err(SheetError::InvalidPosition(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{MAX_COLS, MAX_ROWS};
    use crate::value::FormulaError;

    fn pos(a1: &str) -> Position {
        a1.parse().unwrap()
    }

    fn value(sheet: &Sheet, a1: &str) -> CellValue {
        sheet.get_value(pos(a1)).unwrap().unwrap()
    }

    fn backward(sheet: &Sheet, a1: &str) -> Vec<Position> {
        let mut refs: Vec<Position> = sheet
            .get_cell(pos(a1))
            .unwrap()
            .unwrap()
            .get_backward_references()
            .iter()
            .copied()
            .collect();
        refs.sort();
        refs
    }

    #[test]
    fn test_rejects_invalid_positions() {
        let mut sheet = Sheet::new();
        let bad = [
            Position::new(-1, 0),
            Position::new(0, -1),
            Position::new(MAX_ROWS, 0),
            Position::new(0, MAX_COLS),
        ];

        for p in bad {
            assert_eq!(sheet.set_cell(p, "x"), Err(SheetError::InvalidPosition(p)));
            assert!(matches!(sheet.get_cell(p), Err(SheetError::InvalidPosition(_))));
            assert!(matches!(sheet.clear_cell(p), Err(SheetError::InvalidPosition(_))));
        }
        assert_eq!(sheet.cells().count(), 0);
    }

    #[test]
    fn test_absent_cell_is_none() {
        let sheet = Sheet::new();
        assert!(sheet.get_cell(pos("C3")).unwrap().is_none());
        assert!(sheet.get_value(pos("C3")).unwrap().is_none());
    }

    #[test]
    fn test_invalidate_cell_cascades_downstream() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "1").unwrap();
        sheet.set_cell(pos("B1"), "=A1").unwrap();
        sheet.set_cell(pos("C1"), "=B1").unwrap();
        assert_eq!(value(&sheet, "C1"), CellValue::Number(1.0));

        sheet.invalidate_cell(pos("B1")).unwrap();
        assert!(!sheet.get_cell(pos("B1")).unwrap().unwrap().has_cache());
        assert!(!sheet.get_cell(pos("C1")).unwrap().unwrap().has_cache());
        assert!(sheet.get_cell(pos("A1")).unwrap().unwrap().has_cache());

        // The root edit must still reach the tail
        sheet.set_cell(pos("A1"), "2").unwrap();
        assert_eq!(value(&sheet, "B1"), CellValue::Number(2.0));
        assert_eq!(value(&sheet, "C1"), CellValue::Number(2.0));

        assert!(sheet.invalidate_cell(pos("Z9")).is_ok());
        assert_eq!(
            sheet.invalidate_cell(Position::NONE),
            Err(SheetError::InvalidPosition(Position::NONE))
        );
    }

    #[test]
    fn test_reads_fill_dependencies_first() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "2").unwrap();
        sheet.set_cell(pos("B1"), "=A1*3").unwrap();
        sheet.set_cell(pos("C1"), "=B1+A1").unwrap();
        sheet.set_cell(pos("D1"), "=C1-B1").unwrap();

        assert_eq!(value(&sheet, "D1"), CellValue::Number(2.0));
        for a1 in ["A1", "B1", "C1", "D1"] {
            assert!(sheet.get_cell(pos(a1)).unwrap().unwrap().has_cache(), "{}", a1);
        }
        assert_eq!(sheet.stats().evaluations, 3);
    }

    #[test]
    fn test_placeholders_materialized_for_references() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1+C2").unwrap();

        for a1 in ["B1", "C2"] {
            let cell = sheet.get_cell(pos(a1)).unwrap().unwrap();
            assert!(cell.is_empty());
            assert_eq!(backward(&sheet, a1), vec![pos("A1")]);
        }
        // Placeholders do not widen the printable area
        assert_eq!(sheet.get_printable_size(), Size { rows: 1, cols: 1 });
    }

    #[test]
    fn test_replacement_rewires_forward_edges() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.set_cell(pos("A1"), "=C1").unwrap();

        // B1 persists as an unreferenced placeholder
        assert!(backward(&sheet, "B1").is_empty());
        assert_eq!(backward(&sheet, "C1"), vec![pos("A1")]);
    }

    #[test]
    fn test_replacement_keeps_readers() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("B1"), "=A1").unwrap();
        sheet.set_cell(pos("A1"), "5").unwrap();
        assert_eq!(value(&sheet, "B1"), CellValue::Number(5.0));

        sheet.set_cell(pos("A1"), "7").unwrap();
        assert_eq!(backward(&sheet, "A1"), vec![pos("B1")]);
        assert_eq!(value(&sheet, "B1"), CellValue::Number(7.0));
    }

    #[test]
    fn test_out_of_bounds_reference_yields_ref_error() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=XFE1+1").unwrap();

        assert_eq!(value(&sheet, "A1"), CellValue::Error(FormulaError::Ref));
        // No placeholder for a position that cannot exist
        assert_eq!(sheet.cells().count(), 1);
    }

    #[test]
    fn test_cycle_rejection_leaves_sheet_untouched() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.set_cell(pos("B1"), "2").unwrap();

        let err = sheet.set_cell(pos("B1"), "=A1").unwrap_err();
        assert_eq!(err, SheetError::CircularDependency(pos("B1")));

        let b1 = sheet.get_cell(pos("B1")).unwrap().unwrap();
        assert_eq!(b1.get_text(), "2");
        assert!(b1.get_forward_references().is_empty());
        assert_eq!(backward(&sheet, "B1"), vec![pos("A1")]);
        assert!(backward(&sheet, "A1").is_empty());
    }

    #[test]
    fn test_long_cycle_detected() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.set_cell(pos("B1"), "=C1+E1").unwrap();
        sheet.set_cell(pos("C1"), "=D1").unwrap();

        assert!(matches!(
            sheet.set_cell(pos("D1"), "=5+A1"),
            Err(SheetError::CircularDependency(_))
        ));
        assert!(matches!(
            sheet.set_cell(pos("E1"), "=C1*B1"),
            Err(SheetError::CircularDependency(_))
        ));
        // A reader of the chain is fine
        sheet.set_cell(pos("F1"), "=A1+D1").unwrap();
    }

    #[test]
    fn test_parse_error_leaves_sheet_untouched() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();

        let err = sheet.set_cell(pos("A1"), "=B1+").unwrap_err();
        assert!(matches!(err, SheetError::FormulaParse(_)));
        assert_eq!(sheet.get_cell(pos("A1")).unwrap().unwrap().get_text(), "=B1");
        assert_eq!(backward(&sheet, "B1"), vec![pos("A1")]);
    }

    #[test]
    fn test_diamond_invalidation_visits_each_cell_once() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "1").unwrap();
        sheet.set_cell(pos("B1"), "=A1").unwrap();
        sheet.set_cell(pos("C1"), "=A1").unwrap();
        sheet.set_cell(pos("D1"), "=B1+C1").unwrap();

        assert_eq!(value(&sheet, "D1"), CellValue::Number(2.0));
        assert_eq!(sheet.stats().evaluations, 3);

        sheet.set_cell(pos("A1"), "2").unwrap();
        // A1, B1, C1 and D1 each dropped exactly once
        assert_eq!(sheet.stats().invalidations, 4);

        assert_eq!(value(&sheet, "D1"), CellValue::Number(4.0));
        assert_eq!(sheet.stats().evaluations, 6);
    }

    #[test]
    fn test_uncached_dependents_are_not_walked() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "1").unwrap();
        sheet.set_cell(pos("B1"), "=A1").unwrap();
        sheet.set_cell(pos("C1"), "=B1").unwrap();

        // Nothing has been read, so nothing is cached
        sheet.set_cell(pos("A1"), "2").unwrap();
        assert_eq!(sheet.stats().invalidations, 0);
        assert_eq!(value(&sheet, "C1"), CellValue::Number(2.0));
    }

    #[test]
    fn test_clear_referenced_cell_leaves_placeholder() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "5").unwrap();
        sheet.set_cell(pos("B1"), "=A1*2").unwrap();
        assert_eq!(value(&sheet, "B1"), CellValue::Number(10.0));

        sheet.clear_cell(pos("A1")).unwrap();
        assert!(sheet.get_cell(pos("A1")).unwrap().unwrap().is_empty());
        assert_eq!(backward(&sheet, "A1"), vec![pos("B1")]);
        assert_eq!(value(&sheet, "B1"), CellValue::Number(0.0));

        sheet.set_cell(pos("A1"), "3").unwrap();
        assert_eq!(value(&sheet, "B1"), CellValue::Number(6.0));
    }

    #[test]
    fn test_clear_formula_unhooks_its_references() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.clear_cell(pos("A1")).unwrap();

        assert!(sheet.get_cell(pos("A1")).unwrap().is_none());
        assert!(backward(&sheet, "B1").is_empty());
    }

    #[test]
    fn test_clear_absent_cell_is_noop() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("B2"), "x").unwrap();
        sheet.clear_cell(pos("A1")).unwrap();
        sheet.clear_cell(pos("Z100")).unwrap();
        assert_eq!(sheet.get_printable_size(), Size { rows: 2, cols: 2 });
    }

    #[test]
    fn test_printable_size_tracks_visible_cells() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=J10").unwrap();
        assert_eq!(sheet.get_printable_size(), Size { rows: 1, cols: 1 });

        sheet.set_cell(pos("C3"), "x").unwrap();
        assert_eq!(sheet.get_printable_size(), Size { rows: 3, cols: 3 });

        // Emptying a visible cell by text shrinks like a clear does
        sheet.set_cell(pos("C3"), "").unwrap();
        assert_eq!(sheet.get_printable_size(), Size { rows: 1, cols: 1 });

        sheet.clear_cell(pos("A1")).unwrap();
        assert_eq!(sheet.get_printable_size(), Size::default());
    }

    #[test]
    fn test_value_errors_propagate() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "abc").unwrap();
        sheet.set_cell(pos("B1"), "=A1+1").unwrap();
        sheet.set_cell(pos("C1"), "=B1*0").unwrap();
        sheet.set_cell(pos("D1"), "=1/0").unwrap();
        sheet.set_cell(pos("E1"), "=D1+A1").unwrap();
        sheet.set_cell(pos("F1"), "'12").unwrap();
        sheet.set_cell(pos("G1"), "=F1/4").unwrap();

        assert_eq!(value(&sheet, "B1"), CellValue::Error(FormulaError::Value));
        assert_eq!(value(&sheet, "C1"), CellValue::Error(FormulaError::Value));
        assert_eq!(value(&sheet, "E1"), CellValue::Error(FormulaError::Div0));
        assert_eq!(value(&sheet, "G1"), CellValue::Number(3.0));
    }

    #[test]
    fn test_print_values_and_texts() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=1 + 2").unwrap();
        sheet.set_cell(pos("B1"), "'=x").unwrap();
        sheet.set_cell(pos("A2"), "hi").unwrap();
        sheet.set_cell(pos("C2"), "=A1/0").unwrap();

        let mut values = Vec::new();
        sheet.print_values(&mut values).unwrap();
        assert_eq!(String::from_utf8(values).unwrap(), "3\t=x\t\nhi\t\t#DIV/0!\n");

        let mut texts = Vec::new();
        sheet.print_texts(&mut texts).unwrap();
        assert_eq!(String::from_utf8(texts).unwrap(), "=1+2\t'=x\t\nhi\t\t=A1/0\n");
    }

    #[test]
    fn test_print_empty_sheet() {
        let sheet = Sheet::new();
        let mut out = Vec::new();
        sheet.print_values(&mut out).unwrap();
        assert!(out.is_empty());
    }
}

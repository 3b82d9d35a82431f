//! FILENAME: core/engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single spreadsheet cell.
//! CONTEXT: A `Cell` pairs its content (empty, text, or formula) with a
//! lazily filled value cache and both directions of the reference graph.
//! Cells never point at each other; they hold `Position` keys that are
//! resolved through the owning `Sheet` on demand. Keeping the edge sets
//! symmetric is the Sheet's job; a Cell only stores them.

use std::cell::OnceCell;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::error::Result;
use crate::formula::{coerce_text, Formula};
use crate::position::Position;
use crate::sheet::Sheet;
use crate::value::{CellValue, FormulaError};
use crate::{ESCAPE_SIGN, FORMULA_SIGN};

/// What a cell holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellContent {
    #[default]
    Empty,
    /// Raw text as entered, escape sigil included.
    Text(String),
    Formula(Formula),
}

/// The atomic unit of the spreadsheet.
#[derive(Debug, Default)]
pub struct Cell {
    content: CellContent,
    /// Last computed value. Unset until first read, cleared by invalidation.
    cache: OnceCell<CellValue>,
    /// Positions this cell's formula reads (empty unless a formula).
    forward_refs: SmallVec<[Position; 4]>,
    /// Positions of cells whose formulas read this cell.
    backward_refs: FxHashSet<Position>,
}

impl Cell {
    /// Creates an empty cell that is not attached to any sheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the content of this cell.
    ///
    /// Text starting with the formula sigil (and longer than the sigil
    /// alone) is parsed as a formula; other non-empty text becomes a text
    /// cell; empty text empties the cell. The graph is not consulted, so a
    /// cell can be built speculatively and thrown away. On a parse error
    /// the cell is left untouched.
    pub fn set(&mut self, text: &str) -> Result<()> {
        let content = match text.strip_prefix(FORMULA_SIGN) {
            Some(expression) if !expression.is_empty() => {
                CellContent::Formula(Formula::parse(expression)?)
            }
            _ if !text.is_empty() => CellContent::Text(text.to_string()),
            _ => CellContent::Empty,
        };

        self.forward_refs = match &content {
            CellContent::Formula(formula) => formula.referenced_cells().iter().copied().collect(),
            _ => SmallVec::new(),
        };
        self.content = content;
        self.cache = OnceCell::new();
        Ok(())
    }

    /// Returns the cell's value, computing and caching it on first read.
    ///
    /// Formula references are resolved through `sheet`: an out-of-bound
    /// position is `#REF!`, an absent cell is zero, text is coerced to a
    /// number or `#VALUE!`, and an error value is propagated as-is.
    ///
    /// Uncached cells this formula reads are filled first, leaves before
    /// readers, so evaluation never nests deeper than one formula.
    pub fn get_value(&self, sheet: &Sheet) -> CellValue {
        if let Some(value) = self.cache.get() {
            return value.clone();
        }
        if let CellContent::Formula(formula) = &self.content {
            sheet.fill_caches(formula.referenced_cells());
        }
        self.cache.get_or_init(|| self.compute_value(sheet)).clone()
    }

    fn compute_value(&self, sheet: &Sheet) -> CellValue {
        match &self.content {
            CellContent::Empty => CellValue::Number(0.0),
            CellContent::Text(text) => {
                CellValue::Text(text.strip_prefix(ESCAPE_SIGN).unwrap_or(text).to_string())
            }
            CellContent::Formula(formula) => {
                sheet.record_evaluation();
                match formula.evaluate(|pos| resolve_number(sheet, pos)) {
                    Ok(n) => n.into(),
                    Err(err) => err.into(),
                }
            }
        }
    }

    /// Returns the text that would recreate this cell. Formulas come back in
    /// canonical form, which may differ from what was typed.
    pub fn get_text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(text) => text.clone(),
            CellContent::Formula(formula) => format!("{}{}", FORMULA_SIGN, formula.expression()),
        }
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    pub fn get_forward_references(&self) -> &[Position] {
        &self.forward_refs
    }

    pub fn get_backward_references(&self) -> &FxHashSet<Position> {
        &self.backward_refs
    }

    pub(crate) fn add_backward_reference(&mut self, pos: Position) {
        self.backward_refs.insert(pos);
    }

    pub(crate) fn remove_backward_reference(&mut self, pos: Position) {
        self.backward_refs.remove(&pos);
    }

    pub(crate) fn take_backward_references(&mut self) -> FxHashSet<Position> {
        std::mem::take(&mut self.backward_refs)
    }

    pub(crate) fn set_backward_references(&mut self, refs: FxHashSet<Position>) {
        self.backward_refs = refs;
    }

    /// Drops this cell's cached value only. Returns true if a value was cached.
    /// Dependents are the Sheet's concern.
    pub fn invalidate_cache(&mut self) -> bool {
        self.cache.take().is_some()
    }

    pub fn has_cache(&self) -> bool {
        self.cache.get().is_some()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }

    /// Reachability probe over the existing forward-reference graph.
    ///
    /// Starting from this cell's references, follows the forward edges of
    /// the cells stored in `sheet` and reports whether `target` can be
    /// reached. This cell itself need not be in the sheet. Every position
    /// pushed onto `visited` is expanded at most once, so the probe is
    /// linear in the size of the reachable subgraph and finds `target`
    /// whatever order the branches are explored in.
    pub fn has_cycle(&self, sheet: &Sheet, target: Position, visited: &mut FxHashSet<Position>) -> bool {
        let mut stack: Vec<Position> = self.forward_refs.iter().copied().collect();

        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(cell) = sheet.cell_at(current) {
                stack.extend(
                    cell.forward_refs
                        .iter()
                        .copied()
                        .filter(|pos| !visited.contains(pos)),
                );
            }
        }

        false
    }
}

fn resolve_number(sheet: &Sheet, pos: Position) -> std::result::Result<f64, FormulaError> {
    if !pos.is_valid() {
        return Err(FormulaError::Ref);
    }
    let Some(cell) = sheet.cell_at(pos) else {
        return Ok(0.0);
    };
    match cell.get_value(sheet) {
        CellValue::Number(n) => Ok(n),
        CellValue::Text(text) => coerce_text(&text),
        CellValue::Error(err) => Err(err),
    }
}

use bitflags::bitflags;

use crate::runtime::value::{Cell, Value};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ArrayFlags: u8 {
        /// A line break follows the last element when rendered.
        const NEWLINE_AT_TAIL = 1 << 0;
        /// Splicing into the array fails.
        const READ_ONLY = 1 << 1;
    }
}

/// Growable sequence of cells backing every ANY-ARRAY! value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Array {
    cells: Vec<Cell>,
    flags: ArrayFlags,
}

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
            flags: ArrayFlags::empty(),
        }
    }

    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self::from_cells(values.into_iter().map(Cell::new).collect())
    }

    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            flags: ArrayFlags::empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cells.capacity()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Cells from `index` to the tail; empty if `index` is past the tail.
    pub fn cells_at(&self, index: usize) -> &[Cell] {
        self.cells.get(index..).unwrap_or(&[])
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.cells.iter().map(|cell| &cell.value)
    }

    pub fn push(&mut self, value: Value) {
        self.cells.push(Cell::new(value));
    }

    pub fn push_cell(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    /// Opens a gap of `count` blank cells at `index`.
    pub fn expand_at(&mut self, index: usize, count: usize) {
        self.cells.splice(
            index..index,
            std::iter::repeat_n(Cell::new(Value::Blank), count),
        );
    }

    /// Removes up to `count` cells starting at `index`.
    pub fn remove_at(&mut self, index: usize, count: usize) {
        let end = (index + count).min(self.cells.len());
        if index < end {
            self.cells.drain(index..end);
        }
    }

    /// Shallow copy of the cells from `index` onward, with room for `extra`
    /// more. Cell flags are kept; array flags are not.
    pub fn copy_at_extra(&self, index: usize, extra: usize) -> Array {
        let source = self.cells_at(index);
        let mut cells = Vec::with_capacity(source.len() + extra);
        cells.extend_from_slice(source);
        Array::from_cells(cells)
    }

    pub fn flags(&self) -> ArrayFlags {
        self.flags
    }

    pub fn has_flag(&self, flag: ArrayFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn set_flag(&mut self, flag: ArrayFlags, on: bool) {
        self.flags.set(flag, on);
    }

    pub fn is_read_only(&self) -> bool {
        self.has_flag(ArrayFlags::READ_ONLY)
    }

    pub(crate) fn cells_vec_mut(&mut self) -> &mut Vec<Cell> {
        &mut self.cells
    }
}

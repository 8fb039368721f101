//! I/O modules for locating, reading and writing raster layers

pub mod catalog;
pub mod history;
pub mod memory;
pub mod raster;

pub use catalog::LayerCatalog;
pub use history::History;
pub use memory::{MemoryLayer, MemoryMask};
pub use raster::{GdalLayer, GdalMaskWriter};

use crate::types::{LayerHeader, MaskCell, RowBuffer, WaterError, WaterResult};

/// Input raster layer read one row at a time
pub trait LayerSource {
    fn header(&self) -> &LayerHeader;

    /// Overwrite `buffer` with row `row`. The buffer's encoding matches the header's cell type.
    fn read_row(&mut self, row: usize, buffer: &mut RowBuffer) -> WaterResult<()>;
}

/// Output mask written sequentially, one complete row at a time
pub trait MaskSink {
    /// (rows, cols) of the output
    fn extent(&self) -> (usize, usize);

    fn write_row(&mut self, row: usize, cells: &[MaskCell]) -> WaterResult<()>;

    /// Attach provenance metadata once all rows are written
    fn write_history(&mut self, history: &History) -> WaterResult<()>;
}

/// Tracks the next row a sink accepts so every row is written exactly once, in order
#[derive(Debug, Clone)]
pub struct RowCursor {
    layer: String,
    rows: usize,
    cols: usize,
    next: usize,
}

impl RowCursor {
    pub fn new(layer: impl Into<String>, rows: usize, cols: usize) -> Self {
        Self {
            layer: layer.into(),
            rows,
            cols,
            next: 0,
        }
    }

    /// Accept `row` with `cells` values, or fail if it is out of order or mis-sized
    pub fn advance(&mut self, row: usize, cells: usize) -> WaterResult<()> {
        if row >= self.rows {
            return Err(WaterError::Write {
                layer: self.layer.clone(),
                row,
                reason: format!("layer has only {} rows", self.rows),
            });
        }
        if row != self.next {
            return Err(WaterError::RowOrder {
                layer: self.layer.clone(),
                row,
                expected: self.next,
            });
        }
        if cells != self.cols {
            return Err(WaterError::Write {
                layer: self.layer.clone(),
                row,
                reason: format!("row has {} cells, layer has {} columns", cells, self.cols),
            });
        }

        self.next += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.next
    }

    pub fn is_complete(&self) -> bool {
        self.next == self.rows
    }
}

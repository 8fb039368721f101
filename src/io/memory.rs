//! In-memory raster layers backed by ndarray grids

use ndarray::Array2;

use super::{History, LayerSource, MaskSink, RowCursor};
use crate::types::{CellType, LayerHeader, MaskCell, RowBuffer, WaterError, WaterResult, MASK_NULL};

/// Grid in one of the supported storage encodings
#[derive(Debug, Clone)]
enum MemoryGrid {
    Integer(Array2<i32>),
    Single(Array2<f32>),
    Double(Array2<f64>),
}

/// Read-only raster layer held in memory
#[derive(Debug, Clone)]
pub struct MemoryLayer {
    header: LayerHeader,
    grid: MemoryGrid,
}

impl MemoryLayer {
    pub fn integer(name: &str, data: Array2<i32>) -> Self {
        Self::build(name, CellType::Integer, MemoryGrid::Integer(data))
    }

    pub fn single(name: &str, data: Array2<f32>) -> Self {
        Self::build(name, CellType::Single, MemoryGrid::Single(data))
    }

    pub fn double(name: &str, data: Array2<f64>) -> Self {
        Self::build(name, CellType::Double, MemoryGrid::Double(data))
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.header.nodata = Some(nodata);
        self
    }

    fn build(name: &str, cell_type: CellType, grid: MemoryGrid) -> Self {
        let (rows, cols) = match &grid {
            MemoryGrid::Integer(a) => a.dim(),
            MemoryGrid::Single(a) => a.dim(),
            MemoryGrid::Double(a) => a.dim(),
        };

        Self {
            header: LayerHeader::new(name, rows, cols, cell_type),
            grid,
        }
    }
}

fn fill_row<T: Copy>(dst: &mut Vec<T>, src: &Array2<T>, row: usize) {
    dst.clear();
    dst.extend(src.row(row).iter().copied());
}

impl LayerSource for MemoryLayer {
    fn header(&self) -> &LayerHeader {
        &self.header
    }

    fn read_row(&mut self, row: usize, buffer: &mut RowBuffer) -> WaterResult<()> {
        if row >= self.header.rows {
            return Err(WaterError::Read {
                layer: self.header.name.clone(),
                row,
                reason: format!("layer has only {} rows", self.header.rows),
            });
        }

        match (&self.grid, buffer) {
            (MemoryGrid::Integer(a), RowBuffer::Integer(v)) => fill_row(v, a, row),
            (MemoryGrid::Single(a), RowBuffer::Single(v)) => fill_row(v, a, row),
            (MemoryGrid::Double(a), RowBuffer::Double(v)) => fill_row(v, a, row),
            (_, other) => {
                return Err(WaterError::Read {
                    layer: self.header.name.clone(),
                    row,
                    reason: format!(
                        "{} buffer for a {} layer",
                        other.cell_type(),
                        self.header.cell_type
                    ),
                })
            }
        }

        Ok(())
    }
}

/// Output mask held in memory. Unwritten cells stay null.
#[derive(Debug, Clone)]
pub struct MemoryMask {
    cells: Array2<MaskCell>,
    cursor: RowCursor,
    history: Option<History>,
}

impl MemoryMask {
    pub fn new(name: &str, rows: usize, cols: usize) -> Self {
        Self {
            cells: Array2::from_elem((rows, cols), MASK_NULL),
            cursor: RowCursor::new(name, rows, cols),
            history: None,
        }
    }

    pub fn cells(&self) -> &Array2<MaskCell> {
        &self.cells
    }

    pub fn into_cells(self) -> Array2<MaskCell> {
        self.cells
    }

    pub fn rows_written(&self) -> usize {
        self.cursor.rows_written()
    }

    pub fn is_complete(&self) -> bool {
        self.cursor.is_complete()
    }

    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }
}

impl MaskSink for MemoryMask {
    fn extent(&self) -> (usize, usize) {
        self.cells.dim()
    }

    fn write_row(&mut self, row: usize, cells: &[MaskCell]) -> WaterResult<()> {
        self.cursor.advance(row, cells.len())?;
        self.cells
            .row_mut(row)
            .iter_mut()
            .zip(cells)
            .for_each(|(dst, &src)| *dst = src);
        Ok(())
    }

    fn write_history(&mut self, history: &History) -> WaterResult<()> {
        self.history = Some(history.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_memory_layer_reads_rows() {
        let mut layer =
            MemoryLayer::integer("ref7", array![[1, 2, 3], [4, 5, 6]]).with_nodata(-1.0);
        assert_eq!(layer.header().extent(), (2, 3));
        assert_eq!(layer.header().nodata, Some(-1.0));

        let mut buffer = RowBuffer::allocate(CellType::Integer, 3);
        layer.read_row(1, &mut buffer).unwrap();
        assert_eq!(buffer, RowBuffer::Integer(vec![4, 5, 6]));

        assert!(layer.read_row(2, &mut buffer).is_err());
    }

    #[test]
    fn test_memory_layer_rejects_wrong_encoding() {
        let mut layer = MemoryLayer::single("ndvi", array![[0.1f32, 0.2]]);
        let mut buffer = RowBuffer::allocate(CellType::Double, 2);
        assert!(matches!(layer.read_row(0, &mut buffer), Err(WaterError::Read { .. })));
    }

    #[test]
    fn test_memory_mask_writes_in_order() {
        let mut mask = MemoryMask::new("water", 2, 2);
        mask.write_row(0, &[1, 0]).unwrap();
        assert!(mask.write_row(0, &[1, 0]).is_err());
        mask.write_row(1, &[0, MASK_NULL]).unwrap();

        assert!(mask.is_complete());
        assert_eq!(mask.into_cells(), array![[1, 0], [0, MASK_NULL]]);
    }
}

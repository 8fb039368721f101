use ndarray::Array2;

use super::classifier::{WaterClassifier, WaterThresholds};
use crate::io::{LayerSource, MaskSink, MemoryLayer, MemoryMask};
use crate::types::{ClassificationMode, MaskCell, RowBuffer, WaterError, WaterResult, MASK_NULL};

/// Row driver parameters
#[derive(Debug, Clone)]
pub struct DetectionParams {
    /// Rows read and classified together before being written out
    pub block_rows: usize,
    /// Progress is logged every this many percent of rows
    pub progress_step_percent: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            block_rows: 64,
            progress_step_percent: 2,
        }
    }
}

/// Input and output buffers for one row of a block
#[derive(Debug)]
struct RowSlot {
    ndvi: RowBuffer,
    secondary: RowBuffer,
    output: Vec<MaskCell>,
}

/// Logs row progress at fixed percentage steps
struct Progress {
    total: usize,
    step: usize,
    next: usize,
}

impl Progress {
    fn new(total: usize, step: usize) -> Self {
        let step = step.max(1);
        Self {
            total,
            step,
            next: step,
        }
    }

    fn update(&mut self, done: usize) {
        let percent = done * 100 / self.total.max(1);
        if percent >= self.next {
            log::info!("Processed {}% ({} of {} rows)", percent, done, self.total);
            while self.next <= percent {
                self.next += self.step;
            }
        }
    }
}

/// Applies a pixel classifier to aligned NDVI and secondary rows and writes the mask
pub struct WaterDetector<C = WaterThresholds> {
    classifier: C,
    params: DetectionParams,
}

impl WaterDetector<WaterThresholds> {
    /// Detector with the pinned thresholds and default parameters
    pub fn standard() -> Self {
        Self::new(WaterThresholds::default(), DetectionParams::default())
    }
}

impl<C: WaterClassifier> WaterDetector<C> {
    pub fn new(classifier: C, params: DetectionParams) -> Self {
        Self { classifier, params }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Classify every cell of the NDVI extent and write the rows to `sink` in order.
    ///
    /// A cell is null when its NDVI or secondary value is null. Otherwise the
    /// classifier matching `mode` decides between water and not water.
    pub fn detect<N, S, W>(
        &self,
        mode: ClassificationMode,
        ndvi: &mut N,
        secondary: &mut S,
        sink: &mut W,
    ) -> WaterResult<()>
    where
        N: LayerSource + ?Sized,
        S: LayerSource + ?Sized,
        W: MaskSink + ?Sized,
    {
        if self.params.block_rows == 0 {
            return Err(WaterError::Config("block_rows must be at least 1".to_string()));
        }

        let ndvi_header = ndvi.header().clone();
        let secondary_header = secondary.header().clone();
        ndvi_header.ensure_same_extent(&secondary_header)?;

        let (rows, cols) = ndvi_header.extent();
        if sink.extent() != (rows, cols) {
            let (sink_rows, sink_cols) = sink.extent();
            return Err(WaterError::Config(format!(
                "output is {}x{} but inputs are {}x{}",
                sink_rows, sink_cols, rows, cols
            )));
        }

        log::info!(
            "Detecting water in {}x{} cells from <{}> and <{}> ({} mode)",
            rows,
            cols,
            ndvi_header.name,
            secondary_header.name,
            mode
        );

        let block_rows = self.params.block_rows.min(rows).max(1);
        let mut slots: Vec<RowSlot> = (0..block_rows)
            .map(|_| RowSlot {
                ndvi: RowBuffer::allocate(ndvi_header.cell_type, cols),
                secondary: RowBuffer::allocate(secondary_header.cell_type, cols),
                output: vec![MASK_NULL; cols],
            })
            .collect();

        let mut progress = Progress::new(rows, self.params.progress_step_percent);
        let mut start = 0;

        while start < rows {
            let end = (start + block_rows).min(rows);
            let block = &mut slots[..end - start];

            for (row, slot) in (start..end).zip(block.iter_mut()) {
                ndvi.read_row(row, &mut slot.ndvi)?;
                secondary.read_row(row, &mut slot.secondary)?;
            }

            self.classify_block(mode, block, ndvi_header.nodata, secondary_header.nodata);

            for (row, slot) in (start..end).zip(block.iter()) {
                sink.write_row(row, &slot.output)?;
                progress.update(row + 1);
            }

            start = end;
        }

        log::info!("Water detection completed for {} rows", rows);
        Ok(())
    }

    /// Classify in-memory NDVI and secondary grids; NaN cells are null
    pub fn classify_arrays(
        &self,
        mode: ClassificationMode,
        ndvi: &Array2<f64>,
        secondary: &Array2<f64>,
    ) -> WaterResult<Array2<MaskCell>> {
        let mut ndvi = MemoryLayer::double("ndvi", ndvi.clone());
        let mut secondary = MemoryLayer::double(mode.secondary_key(), secondary.clone());
        let (rows, cols) = ndvi.header().extent();
        let mut mask = MemoryMask::new("water", rows, cols);

        self.detect(mode, &mut ndvi, &mut secondary, &mut mask)?;
        Ok(mask.into_cells())
    }

    #[cfg(feature = "parallel")]
    fn classify_block(
        &self,
        mode: ClassificationMode,
        block: &mut [RowSlot],
        ndvi_nodata: Option<f64>,
        secondary_nodata: Option<f64>,
    ) {
        use rayon::prelude::*;

        block
            .par_iter_mut()
            .for_each(|slot| self.classify_row(mode, slot, ndvi_nodata, secondary_nodata));
    }

    #[cfg(not(feature = "parallel"))]
    fn classify_block(
        &self,
        mode: ClassificationMode,
        block: &mut [RowSlot],
        ndvi_nodata: Option<f64>,
        secondary_nodata: Option<f64>,
    ) {
        block
            .iter_mut()
            .for_each(|slot| self.classify_row(mode, slot, ndvi_nodata, secondary_nodata));
    }

    fn classify_row(
        &self,
        mode: ClassificationMode,
        slot: &mut RowSlot,
        ndvi_nodata: Option<f64>,
        secondary_nodata: Option<f64>,
    ) {
        for (col, out) in slot.output.iter_mut().enumerate() {
            let ndvi = slot.ndvi.cell(col, ndvi_nodata);
            let secondary = slot.secondary.cell(col, secondary_nodata);

            // null is absorbing
            *out = match (ndvi, secondary) {
                (Some(ndvi), Some(value)) => match mode {
                    ClassificationMode::Albedo => self.classifier.water(value, ndvi),
                    ClassificationMode::Modis => self.classifier.water_modis(value, ndvi),
                },
                _ => MASK_NULL,
            };
        }
    }
}

//! GDAL-backed raster layers

use std::path::{Path, PathBuf};

use gdal::errors::GdalError;
use gdal::raster::{Buffer, GdalDataType, GdalType, RasterBand};
use gdal::{Dataset, DriverManager, Metadata};

use super::{History, LayerSource, MaskSink, RowCursor};
use crate::types::{
    CellType, GeoTransform, LayerHeader, MaskCell, RowBuffer, WaterError, WaterResult, MASK_NULL,
};

/// Input layer read row by row from band 1 of a GDAL dataset
pub struct GdalLayer {
    path: PathBuf,
    dataset: Dataset,
    header: LayerHeader,
}

impl GdalLayer {
    /// Open layer `name` stored at `path` and read its header
    pub fn open<P: AsRef<Path>>(name: &str, path: P) -> WaterResult<Self> {
        log::info!("Opening raster layer <{}> from {}", name, path.as_ref().display());

        let dataset = Dataset::open(path.as_ref()).map_err(|e| WaterError::Open {
            layer: name.to_string(),
            reason: e.to_string(),
        })?;
        let header = read_header(name, &dataset)?;

        log::debug!(
            "Layer <{}>: {}x{} {} cells, nodata {:?}",
            name,
            header.rows,
            header.cols,
            header.cell_type,
            header.nodata
        );

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            dataset,
            header,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_header(name: &str, dataset: &Dataset) -> WaterResult<LayerHeader> {
    let header_error = |reason: String| WaterError::Header {
        layer: name.to_string(),
        reason,
    };

    if dataset.raster_count() < 1 {
        return Err(header_error("dataset has no raster bands".to_string()));
    }

    let band = dataset.rasterband(1).map_err(|e| header_error(e.to_string()))?;
    let cell_type = match band.band_type() {
        GdalDataType::Float32 => CellType::Single,
        GdalDataType::Float64 => CellType::Double,
        GdalDataType::Unknown => {
            return Err(header_error("unknown band data type".to_string()));
        }
        // values beyond i32 would saturate, missing their nodata sentinel
        GdalDataType::UInt32 => CellType::Double,
        wide if wide.bits() > 32 => CellType::Double,
        _ => CellType::Integer,
    };

    let (cols, rows) = dataset.raster_size();
    let projection = dataset.projection();

    Ok(LayerHeader {
        name: name.to_string(),
        rows,
        cols,
        cell_type,
        nodata: band.no_data_value(),
        geo_transform: dataset.geo_transform().ok().map(GeoTransform::from_gdal),
        projection: if projection.is_empty() {
            None
        } else {
            Some(projection)
        },
    })
}

fn read_row_into<T: Copy + GdalType>(
    band: &RasterBand,
    row: usize,
    values: &mut [T],
) -> Result<(), GdalError> {
    let cols = values.len();
    band.read_into_slice::<T>((0, row as isize), (cols, 1), (cols, 1), values, None)
}

impl LayerSource for GdalLayer {
    fn header(&self) -> &LayerHeader {
        &self.header
    }

    fn read_row(&mut self, row: usize, buffer: &mut RowBuffer) -> WaterResult<()> {
        let read_error = |e: GdalError| WaterError::Read {
            layer: self.header.name.clone(),
            row,
            reason: e.to_string(),
        };

        if buffer.len() != self.header.cols {
            return Err(WaterError::Read {
                layer: self.header.name.clone(),
                row,
                reason: format!(
                    "buffer holds {} cells, row has {}",
                    buffer.len(),
                    self.header.cols
                ),
            });
        }

        let band = self.dataset.rasterband(1).map_err(read_error)?;
        match buffer {
            RowBuffer::Integer(v) => read_row_into(&band, row, v.as_mut_slice()),
            RowBuffer::Single(v) => read_row_into(&band, row, v.as_mut_slice()),
            RowBuffer::Double(v) => read_row_into(&band, row, v.as_mut_slice()),
        }
        .map_err(read_error)
    }
}

/// Single-band byte GeoTIFF receiving the water mask
pub struct GdalMaskWriter {
    name: String,
    path: PathBuf,
    dataset: Dataset,
    cursor: RowCursor,
}

impl GdalMaskWriter {
    /// Create the output with the extent and georeferencing of `template`.
    ///
    /// The band's nodata value is `MASK_NULL`.
    pub fn create<P: AsRef<Path>>(
        name: &str,
        path: P,
        template: &LayerHeader,
    ) -> WaterResult<Self> {
        log::info!("Creating output mask <{}> at {}", name, path.as_ref().display());

        let open_error = |e: GdalError| WaterError::Open {
            layer: name.to_string(),
            reason: e.to_string(),
        };

        let driver = DriverManager::get_driver_by_name("GTiff").map_err(open_error)?;
        let mut dataset = driver
            .create_with_band_type::<u8, _>(
                path.as_ref(),
                template.cols as isize,
                template.rows as isize,
                1,
            )
            .map_err(open_error)?;

        if let Some(transform) = &template.geo_transform {
            dataset.set_geo_transform(&transform.to_gdal())?;
        }
        if let Some(projection) = &template.projection {
            dataset.set_projection(projection)?;
        }

        {
            let mut band = dataset.rasterband(1)?;
            band.set_no_data_value(Some(f64::from(MASK_NULL)))?;
        }

        Ok(Self {
            name: name.to_string(),
            path: path.as_ref().to_path_buf(),
            dataset,
            cursor: RowCursor::new(name, template.rows, template.cols),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.cursor.rows_written()
    }
}

impl MaskSink for GdalMaskWriter {
    fn extent(&self) -> (usize, usize) {
        let (cols, rows) = self.dataset.raster_size();
        (rows, cols)
    }

    fn write_row(&mut self, row: usize, cells: &[MaskCell]) -> WaterResult<()> {
        self.cursor.advance(row, cells.len())?;

        let write_error = |e: GdalError| WaterError::Write {
            layer: self.name.clone(),
            row,
            reason: e.to_string(),
        };

        let mut band = self.dataset.rasterband(1).map_err(write_error)?;
        let buffer = Buffer::new((cells.len(), 1), cells.to_vec());
        band.write((0, row as isize), (cells.len(), 1), &buffer)
            .map_err(write_error)?;

        Ok(())
    }

    fn write_history(&mut self, history: &History) -> WaterResult<()> {
        if !self.cursor.is_complete() {
            log::warn!(
                "Writing history for <{}> after only {} rows",
                self.name,
                self.cursor.rows_written()
            );
        }

        for (key, value) in history.metadata_items() {
            self.dataset.set_metadata_item(&key, &value, "")?;
        }
        Ok(())
    }
}

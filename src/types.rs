use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

/// Output mask cell (0 = not water, 1 = water, 255 = null)
pub type MaskCell = u8;

/// Mask value for a pixel classified as not water
pub const NOT_WATER: MaskCell = 0;

/// Mask value for a pixel classified as water
pub const WATER: MaskCell = 1;

/// Mask value for a pixel with incomplete input data; also the output band's nodata value
pub const MASK_NULL: MaskCell = 255;

/// Storage encoding of an input raster layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    /// Integer band whose values fit in 32-bit signed integers
    Integer,
    /// Single precision float band
    Single,
    /// Double precision float band, also used for wider integer bands
    Double,
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellType::Integer => write!(f, "integer"),
            CellType::Single => write!(f, "float32"),
            CellType::Double => write!(f, "float64"),
        }
    }
}

/// One row of an input layer in its native encoding.
///
/// Buffers are allocated once per layer and overwritten for every row read.
#[derive(Debug, Clone, PartialEq)]
pub enum RowBuffer {
    Integer(Vec<i32>),
    Single(Vec<f32>),
    Double(Vec<f64>),
}

impl RowBuffer {
    /// Allocate a zeroed buffer of `cols` cells in the given encoding
    pub fn allocate(cell_type: CellType, cols: usize) -> Self {
        match cell_type {
            CellType::Integer => RowBuffer::Integer(vec![0; cols]),
            CellType::Single => RowBuffer::Single(vec![0.0; cols]),
            CellType::Double => RowBuffer::Double(vec![0.0; cols]),
        }
    }

    pub fn cell_type(&self) -> CellType {
        match self {
            RowBuffer::Integer(_) => CellType::Integer,
            RowBuffer::Single(_) => CellType::Single,
            RowBuffer::Double(_) => CellType::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RowBuffer::Integer(v) => v.len(),
            RowBuffer::Single(v) => v.len(),
            RowBuffer::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell value widened to `f64`, without any null interpretation
    pub fn value(&self, col: usize) -> f64 {
        match self {
            RowBuffer::Integer(v) => widen(v, col),
            RowBuffer::Single(v) => widen(v, col),
            RowBuffer::Double(v) => widen(v, col),
        }
    }

    /// Cell value widened to `f64`, or `None` when the cell holds the layer's
    /// nodata value (compared in the native encoding) or NaN.
    pub fn cell(&self, col: usize, nodata: Option<f64>) -> Option<f64> {
        let is_null = match self {
            RowBuffer::Integer(v) => nodata.map_or(false, |nd| f64::from(v[col]) == nd),
            RowBuffer::Single(v) => {
                v[col].is_nan() || nodata.map_or(false, |nd| v[col] == nd as f32)
            }
            RowBuffer::Double(v) => v[col].is_nan() || nodata.map_or(false, |nd| v[col] == nd),
        };

        if is_null {
            None
        } else {
            Some(self.value(col))
        }
    }
}

fn widen<T: AsPrimitive<f64>>(values: &[T], col: usize) -> f64 {
    values[col].as_()
}

/// Geospatial transformation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }
}

/// Header of one raster layer, read independently for every layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerHeader {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub cell_type: CellType,
    pub nodata: Option<f64>,
    pub geo_transform: Option<GeoTransform>,
    pub projection: Option<String>,
}

impl LayerHeader {
    /// Header of an ungeoreferenced layer
    pub fn new(name: impl Into<String>, rows: usize, cols: usize, cell_type: CellType) -> Self {
        Self {
            name: name.into(),
            rows,
            cols,
            cell_type,
            nodata: None,
            geo_transform: None,
            projection: None,
        }
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn extent(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Fail unless `other` covers the same rows and columns
    pub fn ensure_same_extent(&self, other: &LayerHeader) -> WaterResult<()> {
        if self.extent() != other.extent() {
            return Err(WaterError::ExtentMismatch {
                expected: self.name.clone(),
                expected_rows: self.rows,
                expected_cols: self.cols,
                found: other.name.clone(),
                found_rows: other.rows,
                found_cols: other.cols,
            });
        }
        Ok(())
    }
}

/// Which secondary input drives the classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationMode {
    /// NDVI + broadband albedo
    Albedo,
    /// NDVI + MODIS band 7 surface reflectance
    Modis,
}

impl ClassificationMode {
    /// Option name of the secondary layer for this mode
    pub fn secondary_key(&self) -> &'static str {
        match self {
            ClassificationMode::Albedo => "albedo",
            ClassificationMode::Modis => "Modref7",
        }
    }
}

impl std::fmt::Display for ClassificationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassificationMode::Albedo => write!(f, "albedo"),
            ClassificationMode::Modis => write!(f, "modis"),
        }
    }
}

/// Error types for water detection
#[derive(Debug, thiserror::Error)]
pub enum WaterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Raster layer <{0}> not found")]
    LayerNotFound(String),

    #[error("Output layer <{0}> already exists (use --overwrite to replace it)")]
    OutputExists(String),

    #[error("Cannot open raster layer <{layer}>: {reason}")]
    Open { layer: String, reason: String },

    #[error("Cannot read file header of <{layer}>: {reason}")]
    Header { layer: String, reason: String },

    #[error(
        "<{found}> is {found_rows}x{found_cols}, <{expected}> is {expected_rows}x{expected_cols}"
    )]
    ExtentMismatch {
        expected: String,
        expected_rows: usize,
        expected_cols: usize,
        found: String,
        found_rows: usize,
        found_cols: usize,
    },

    #[error("Could not read row {row} from <{layer}>: {reason}")]
    Read { layer: String, row: usize, reason: String },

    #[error("Cannot write row {row} to <{layer}>: {reason}")]
    Write { layer: String, row: usize, reason: String },

    #[error("Row {row} written out of order to <{layer}> (expected row {expected})")]
    RowOrder { layer: String, row: usize, expected: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for water detection operations
pub type WaterResult<T> = Result<T, WaterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_buffer_coercion() {
        let ints = RowBuffer::Integer(vec![-3, 7]);
        let singles = RowBuffer::Single(vec![0.5, -0.25]);
        let doubles = RowBuffer::Double(vec![0.125, 2.0]);

        assert_eq!(ints.value(0), -3.0);
        assert_eq!(ints.value(1), 7.0);
        assert_eq!(singles.value(0), 0.5);
        assert_eq!(singles.value(1), -0.25);
        assert_eq!(doubles.value(0), 0.125);
        assert_eq!(doubles.cell_type(), CellType::Double);
    }

    #[test]
    fn test_null_detection_per_encoding() {
        let ints = RowBuffer::Integer(vec![-9999, 4]);
        assert_eq!(ints.cell(0, Some(-9999.0)), None);
        assert_eq!(ints.cell(1, Some(-9999.0)), Some(4.0));
        assert_eq!(ints.cell(0, None), Some(-9999.0));

        // nodata compared in float32, not after widening
        let singles = RowBuffer::Single(vec![0.1, f32::NAN, 0.2]);
        assert_eq!(singles.cell(0, Some(0.1)), None);
        assert_eq!(singles.cell(1, None), None);
        assert!(singles.cell(2, Some(0.1)).is_some());

        let doubles = RowBuffer::Double(vec![f64::NAN, -1.0]);
        assert_eq!(doubles.cell(0, Some(-1.0)), None);
        assert_eq!(doubles.cell(1, Some(-1.0)), None);
        assert_eq!(doubles.cell(1, Some(f64::NAN)), Some(-1.0));
    }

    #[test]
    fn test_allocate_matches_cell_type() {
        for cell_type in [CellType::Integer, CellType::Single, CellType::Double] {
            let buffer = RowBuffer::allocate(cell_type, 5);
            assert_eq!(buffer.cell_type(), cell_type);
            assert_eq!(buffer.len(), 5);
        }
        assert!(RowBuffer::allocate(CellType::Single, 0).is_empty());
    }

    #[test]
    fn test_extent_check() {
        let ndvi = LayerHeader::new("ndvi", 10, 20, CellType::Single);
        let albedo = LayerHeader::new("albedo", 10, 20, CellType::Double);
        let short = LayerHeader::new("ref7", 9, 20, CellType::Integer);

        assert!(ndvi.ensure_same_extent(&albedo).is_ok());
        match ndvi.ensure_same_extent(&short) {
            Err(WaterError::ExtentMismatch { found, found_rows, .. }) => {
                assert_eq!(found, "ref7");
                assert_eq!(found_rows, 9);
            }
            other => panic!("expected extent mismatch, got {:?}", other),
        }
    }
}

use std::path::Path;

use gdal::raster::{Buffer, GdalType};
use gdal::{Dataset, DriverManager, Metadata};
use tempfile::TempDir;
use waterdetect::{
    DetectionConfig, LayerCatalog, RunOptions, WaterError, MASK_NULL, NOT_WATER, WATER,
};

const GEO_TRANSFORM: [f64; 6] = [300000.0, 250.0, 0.0, 5000000.0, 0.0, -250.0];

fn write_layer<T: Copy + GdalType>(
    dir: &Path,
    name: &str,
    (rows, cols): (usize, usize),
    data: Vec<T>,
    nodata: Option<f64>,
) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<T, _>(
            dir.join(format!("{}.tif", name)),
            cols as isize,
            rows as isize,
            1,
        )
        .unwrap();
    dataset.set_geo_transform(&GEO_TRANSFORM).unwrap();

    let mut band = dataset.rasterband(1).unwrap();
    band.set_no_data_value(nodata).unwrap();
    band.write((0, 0), (cols, rows), &Buffer::new((cols, rows), data))
        .unwrap();
}

fn read_mask(path: &Path) -> (Vec<u8>, Option<f64>, Dataset) {
    let dataset = Dataset::open(path).unwrap();
    let (cols, rows) = dataset.raster_size();
    let band = dataset.rasterband(1).unwrap();
    let nodata = band.no_data_value();
    let data = band
        .read_as::<u8>((0, 0), (cols, rows), (cols, rows), None)
        .unwrap()
        .data;
    drop(band);
    (data, nodata, dataset)
}

fn scenario_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_layer::<f32>(dir.path(), "ndvi", (2, 2), vec![0.08, -0.2, 0.05, 0.3], None);
    write_layer::<f64>(
        dir.path(),
        "albedo",
        (2, 2),
        vec![-9999.0, 0.4, 0.02, 0.5],
        Some(-9999.0),
    );
    write_layer::<i16>(dir.path(), "ref7", (2, 2), vec![0, 1, 0, 0], None);
    dir
}

#[test]
fn test_albedo_run_writes_mask_and_history() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = scenario_dir();
    let catalog = LayerCatalog::new(dir.path());

    let config = DetectionConfig::albedo("ndvi", "albedo", "water");
    let output = waterdetect::run(&config, &catalog, &RunOptions::default()).unwrap();
    assert_eq!(output, dir.path().join("water.tif"));

    let (data, nodata, dataset) = read_mask(&output);
    assert_eq!(data, vec![MASK_NULL, NOT_WATER, WATER, NOT_WATER]);
    assert_eq!(nodata, Some(f64::from(MASK_NULL)));
    assert_eq!(dataset.geo_transform().unwrap(), GEO_TRANSFORM);

    assert_eq!(
        dataset.metadata_item("WATER_MODE", "").as_deref(),
        Some("albedo")
    );
    assert_eq!(
        dataset.metadata_item("WATER_SOURCE_ALBEDO", "").as_deref(),
        Some("albedo")
    );
    assert_eq!(
        dataset.metadata_item("WATER_SOURCE_NDVI", "").as_deref(),
        Some("ndvi")
    );
}

#[test]
fn test_modis_run_with_integer_reflectance() {
    let dir = scenario_dir();
    let catalog = LayerCatalog::new(dir.path());

    let config = DetectionConfig::modis("ndvi", "ref7", "water_modis");
    let output = waterdetect::run(&config, &catalog, &RunOptions::default()).unwrap();

    // integer reflectance of 1 is above the band 7 bound
    let (data, _, dataset) = read_mask(&output);
    assert_eq!(data, vec![WATER, NOT_WATER, WATER, NOT_WATER]);
    assert_eq!(
        dataset.metadata_item("WATER_MODE", "").as_deref(),
        Some("modis")
    );
}

#[test]
fn test_existing_output_requires_overwrite() {
    let dir = scenario_dir();
    let catalog = LayerCatalog::new(dir.path());
    let config = DetectionConfig::albedo("ndvi", "albedo", "water");

    waterdetect::run(&config, &catalog, &RunOptions::default()).unwrap();
    assert!(matches!(
        waterdetect::run(&config, &catalog, &RunOptions::default()),
        Err(WaterError::OutputExists(_))
    ));

    let options = RunOptions {
        overwrite: true,
        ..RunOptions::default()
    };
    waterdetect::run(&config, &catalog, &options).unwrap();
}

#[test]
fn test_missing_layer_is_fatal() {
    let dir = scenario_dir();
    let catalog = LayerCatalog::new(dir.path());
    let config = DetectionConfig::albedo("ndvi", "no_such_albedo", "water");

    match waterdetect::run(&config, &catalog, &RunOptions::default()) {
        Err(WaterError::LayerNotFound(name)) => assert_eq!(name, "no_such_albedo"),
        other => panic!("expected LayerNotFound, got {:?}", other),
    }
    assert!(!dir.path().join("water.tif").exists());
}

#[test]
fn test_extent_mismatch_is_fatal() {
    let dir = scenario_dir();
    write_layer::<f32>(dir.path(), "albedo_small", (1, 2), vec![0.01, 0.01], None);
    let catalog = LayerCatalog::new(dir.path());
    let config = DetectionConfig::albedo("ndvi", "albedo_small", "water");

    assert!(matches!(
        waterdetect::run(&config, &catalog, &RunOptions::default()),
        Err(WaterError::ExtentMismatch { .. })
    ));
    assert!(!dir.path().join("water.tif").exists());
}

#[test]
fn test_output_naming_an_input_is_rejected() {
    let dir = scenario_dir();
    let catalog = LayerCatalog::new(dir.path());
    let config = DetectionConfig::albedo("ndvi", "albedo", "ndvi");
    let options = RunOptions {
        overwrite: true,
        ..RunOptions::default()
    };

    assert!(matches!(
        waterdetect::run(&config, &catalog, &options),
        Err(WaterError::Config(_))
    ));

    let ndvi = Dataset::open(dir.path().join("ndvi.tif")).unwrap();
    assert_eq!(ndvi.raster_size(), (2, 2));
}

#[test]
fn test_failed_overwrite_keeps_previous_output() {
    let dir = scenario_dir();
    write_layer::<f32>(dir.path(), "albedo_small", (1, 2), vec![0.01, 0.01], None);
    let catalog = LayerCatalog::new(dir.path());
    let options = RunOptions {
        overwrite: true,
        ..RunOptions::default()
    };

    let output = waterdetect::run(
        &DetectionConfig::albedo("ndvi", "albedo", "water"),
        &catalog,
        &options,
    )
    .unwrap();
    assert!(!dir.path().join(".water.tif.partial").exists());

    assert!(matches!(
        waterdetect::run(
            &DetectionConfig::albedo("ndvi", "albedo_small", "water"),
            &catalog,
            &options,
        ),
        Err(WaterError::ExtentMismatch { .. })
    ));

    let (data, _, _) = read_mask(&output);
    assert_eq!(data, vec![MASK_NULL, NOT_WATER, WATER, NOT_WATER]);
    assert!(!dir.path().join(".water.tif.partial").exists());
}

#[test]
fn test_uint32_nodata_gives_null_cells() {
    let dir = scenario_dir();
    write_layer::<u32>(
        dir.path(),
        "albedo_counts",
        (2, 2),
        vec![u32::MAX, 3_000_000_000, 0, u32::MAX],
        Some(f64::from(u32::MAX)),
    );
    let catalog = LayerCatalog::new(dir.path());
    let config = DetectionConfig::albedo("ndvi", "albedo_counts", "water");

    let output = waterdetect::run(&config, &catalog, &RunOptions::default()).unwrap();

    let (data, _, _) = read_mask(&output);
    assert_eq!(data, vec![MASK_NULL, NOT_WATER, WATER, MASK_NULL]);
}

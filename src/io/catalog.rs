use std::path::{Path, PathBuf};

use crate::types::{WaterError, WaterResult};

/// Extensions tried when a layer name has none
const RASTER_EXTENSIONS: [&str; 2] = ["tif", "tiff"];

/// Resolves layer names to raster files inside a search directory
#[derive(Debug, Clone)]
pub struct LayerCatalog {
    search_dir: PathBuf,
}

impl Default for LayerCatalog {
    fn default() -> Self {
        Self::new(".")
    }
}

impl LayerCatalog {
    pub fn new(search_dir: impl Into<PathBuf>) -> Self {
        Self {
            search_dir: search_dir.into(),
        }
    }

    pub fn search_dir(&self) -> &Path {
        &self.search_dir
    }

    /// Find the file holding layer `name`.
    ///
    /// Names carrying a directory are taken as paths. Bare names are looked up in
    /// the search directory as given, then with each raster extension appended.
    pub fn locate(&self, name: &str) -> WaterResult<PathBuf> {
        let candidates = self.candidates(name);
        log::debug!("Looking up layer <{}> in {:?}", name, candidates);

        candidates
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| WaterError::LayerNotFound(name.to_string()))
    }

    /// Where output layer `name` is created; bare names get a `.tif` extension
    pub fn output_path(&self, name: &str) -> PathBuf {
        let mut path = self.base_path(name);
        if path.extension().is_none() {
            path.set_extension(RASTER_EXTENSIONS[0]);
        }
        path
    }

    /// Output path for `name`, refusing an existing file unless `overwrite` is set.
    ///
    /// Nothing is removed here; an existing output is only replaced once the new
    /// mask has been written completely.
    pub fn prepare_output(&self, name: &str, overwrite: bool) -> WaterResult<PathBuf> {
        let path = self.output_path(name);
        if path.exists() {
            if !overwrite {
                return Err(WaterError::OutputExists(name.to_string()));
            }
            log::warn!("Existing output {} will be replaced", path.display());
        }
        Ok(path)
    }

    /// Sibling of `output` the mask is written to before being renamed into place
    pub fn staging_path(output: &Path) -> PathBuf {
        let file_name = output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        output.with_file_name(format!(".{}.partial", file_name))
    }

    fn base_path(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() || path.parent().map_or(false, |p| !p.as_os_str().is_empty()) {
            path.to_path_buf()
        } else {
            self.search_dir.join(path)
        }
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let base = self.base_path(name);
        let mut candidates = vec![base.clone()];
        if base.extension().is_none() {
            candidates.extend(RASTER_EXTENSIONS.iter().map(|ext| base.with_extension(ext)));
        }
        candidates
    }
}

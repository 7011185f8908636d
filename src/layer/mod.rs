//! Layer file naming, placement and lifecycle.

mod patch;

pub use patch::{patch_data_connection, PatchOutcome};

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::engine::{GisEngine, MapLayer};
use crate::error::{CrawlError, Result};
use crate::model::{geodatabase_component, DatasetDescriptor};

/// Suffix of the folder receiving layer files of geodatabase datasets.
pub const GDB_LAYERS_SUFFIX: &str = ".gdb_layers";

/// The two layer files written for a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerArtifacts {
    /// Copy next to the dataset, or in the `.gdb_layers` folder beside its
    /// geodatabase.
    pub working: PathBuf,
    /// Copy in the publish folder with a self-contained data connection.
    pub published: PathBuf,
    pub patch: PatchOutcome,
}

impl LayerArtifacts {
    /// Metadata sidecar written beside the published layer file.
    pub fn sidecar_path(&self) -> PathBuf {
        let mut name = self.published.clone().into_os_string();
        name.push(".xml");
        PathBuf::from(name)
    }

    pub fn published_file_name(&self) -> String {
        self.published
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Working layer file path for a dataset.
///
/// `roads/Roads.shp` maps to `roads/Roads_shp.lyrx`. Datasets stored in a
/// `.gdb` or `.sde` container map to `<container>.gdb_layers/<name>_fc.lyrx`
/// beside the container, since nothing may be written inside it. Feature
/// class names are unique across a geodatabase, so feature datasets need no
/// sub-folder.
pub fn working_layer_path(dataset_path: &Path) -> PathBuf {
    if let Some(gdb_folder) = gdb_layers_folder(dataset_path) {
        let name = dataset_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return gdb_folder.join(format!("{name}_fc.lyrx"));
    }

    let stem = dataset_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = dataset_path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    dataset_path.with_file_name(format!("{stem}_{ext}.lyrx"))
}

/// Folder beside the enclosing geodatabase that receives its layer files.
pub fn gdb_layers_folder(dataset_path: &Path) -> Option<PathBuf> {
    let depth = geodatabase_component(dataset_path)?;
    let container: PathBuf = dataset_path.components().take(depth + 1).collect();
    let stem = container.file_stem()?.to_string_lossy().into_owned();
    Some(container.with_file_name(format!("{stem}{GDB_LAYERS_SUFFIX}")))
}

/// Creates and refreshes layer files for datasets.
#[derive(Debug, Clone)]
pub struct LayerArtifactManager {
    publish_folder: PathBuf,
    overwrite: bool,
}

impl LayerArtifactManager {
    pub fn new(publish_folder: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            publish_folder: publish_folder.into(),
            overwrite,
        }
    }

    /// Writes the working and published layer files of `dataset`.
    ///
    /// Returns `Ok(None)` when the engine cannot create a layer for the
    /// dataset; the layer is removed from the map on every path.
    pub fn materialize<E: GisEngine>(
        &self,
        engine: &mut E,
        dataset: &DatasetDescriptor,
    ) -> Result<Option<LayerArtifacts>> {
        info!("Parsing = {}", dataset.name);

        let layer = match MapLayer::add(engine, dataset) {
            Ok(layer) => layer,
            Err(CrawlError::LayerCreation(path, reason)) => {
                warn!("Cannot create layer for {}: {reason}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let working = working_layer_path(&dataset.path);
        if let Some(parent) = working.parent() {
            if !parent.exists() {
                debug!("Creating folder {}", parent.display());
                fs::create_dir_all(parent).map_err(CrawlError::io(parent))?;
            }
        }

        if working.exists() {
            if self.overwrite {
                fs::remove_file(&working).map_err(CrawlError::io(&working))?;
                layer.save_a_copy(&working)?;
            } else {
                debug!("Reusing existing layer file {}", working.display());
            }
        } else {
            layer.save_a_copy(&working)?;
        }
        debug!("Working layer file = {}", working.display());

        let file_name = working
            .file_name()
            .ok_or_else(|| CrawlError::LayerSave(working.clone(), "no file name".to_string()))?;
        let published = self.publish_folder.join(file_name);
        if published.exists() {
            fs::remove_file(&published).map_err(CrawlError::io(&published))?;
        }
        let published = layer.save_a_copy(&published)?;
        let patch = patch_data_connection(&published, dataset)?;

        Ok(Some(LayerArtifacts {
            working,
            published,
            patch,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_dataset_layer_path() {
        assert_eq!(
            working_layer_path(Path::new("/data/USA/roads/Roads.shp")),
            Path::new("/data/USA/roads/Roads_shp.lyrx")
        );
        assert_eq!(
            working_layer_path(Path::new("/data/elev/dem.tif")),
            Path::new("/data/elev/dem_tif.lyrx")
        );
        assert_eq!(
            working_layer_path(Path::new("/data/grids/elev")),
            Path::new("/data/grids/elev_.lyrx")
        );
    }

    #[test]
    fn test_geodatabase_layer_path() {
        assert_eq!(
            working_layer_path(Path::new("/data/base.gdb/Streams")),
            Path::new("/data/base.gdb_layers/Streams_fc.lyrx")
        );
        assert_eq!(
            working_layer_path(Path::new("/data/base.gdb/Hydro/Streams")),
            Path::new("/data/base.gdb_layers/Streams_fc.lyrx")
        );
        assert_eq!(
            working_layer_path(Path::new("/conn/prod.sde/GIS.Parcels")),
            Path::new("/conn/prod.gdb_layers/GIS.Parcels_fc.lyrx")
        );
    }

    #[test]
    fn test_geodatabase_layers_never_inside_container() {
        for path in [
            "/a/b.gdb/c",
            "/a/b.gdb/fd/c",
            "/a/B.GDB/c.d",
            "/x/y.sde/z",
        ] {
            let layer = working_layer_path(Path::new(path));
            let folder = layer.parent().unwrap();
            assert!(folder.to_string_lossy().ends_with("_layers"), "{path}");
            assert!(geodatabase_component(folder).is_none(), "{path}");
        }
    }

    #[test]
    fn test_sidecar_path() {
        let artifacts = LayerArtifacts {
            working: PathBuf::from("/data/roads/Roads_shp.lyrx"),
            published: PathBuf::from("/lyrx/Roads_shp.lyrx"),
            patch: PatchOutcome::Patched,
        };
        assert_eq!(
            artifacts.sidecar_path(),
            Path::new("/lyrx/Roads_shp.lyrx.xml")
        );
        assert_eq!(artifacts.published_file_name(), "Roads_shp.lyrx");
    }
}

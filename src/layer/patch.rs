use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CrawlError, Result};
use crate::model::DatasetDescriptor;
use crate::model::DatasetKind;

/// Result of rewriting the data connection of a published layer file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched,
    /// The layer file was left as written by the engine.
    Unpatched,
}

/// Rewrites the workspace connection string of a published layer file so it
/// points at the dataset's source folder, or at the enclosing geodatabase
/// for geodatabase members.
pub fn patch_data_connection(layer_file: &Path, dataset: &DatasetDescriptor) -> Result<PatchOutcome> {
    let pointer = match &dataset.kind {
        DatasetKind::FeatureClass(_) => {
            "/layerDefinitions/0/featureTable/dataConnection/workspaceConnectionString"
        }
        DatasetKind::Raster(_) | DatasetKind::PointCloud(_) => {
            "/layerDefinitions/0/dataConnection/workspaceConnectionString"
        }
        DatasetKind::FeatureDataset | DatasetKind::Unsupported { .. } => {
            warn!(
                "Unknown data type {} for {}, data connection left unchanged",
                dataset.kind,
                layer_file.display()
            );
            return Ok(PatchOutcome::Unpatched);
        }
    };

    let content = fs::read_to_string(layer_file).map_err(CrawlError::io(layer_file))?;
    let mut document: Value =
        serde_json::from_str(&content).map_err(|e| CrawlError::LayerJson(e, layer_file.into()))?;

    let Some(connection) = document.pointer_mut(pointer) else {
        warn!(
            "Layer file {} has no {pointer}, data connection left unchanged",
            layer_file.display()
        );
        return Ok(PatchOutcome::Unpatched);
    };
    *connection = Value::String(format!("DATABASE={}", dataset.source_workspace().display()));
    debug!("Patched {} -> {connection}", layer_file.display());

    let content =
        serde_json::to_string(&document).map_err(|e| CrawlError::LayerJson(e, layer_file.into()))?;
    fs::write(layer_file, content).map_err(CrawlError::io(layer_file))?;
    Ok(PatchOutcome::Patched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RasterInfo, VectorStorage};
    use serde_json::json;
    use tempfile::TempDir;

    fn write_layer(dir: &TempDir, name: &str, document: &Value) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, document.to_string()).unwrap();
        path
    }

    fn connection(path: &Path, pointer: &str) -> Option<String> {
        let document: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        document.pointer(pointer).and_then(Value::as_str).map(str::to_string)
    }

    #[test]
    fn test_patch_feature_class() {
        let dir = TempDir::new().unwrap();
        let path = write_layer(
            &dir,
            "Roads_shp.lyrx",
            &json!({"layerDefinitions": [{"featureTable": {"dataConnection": {
                "workspaceConnectionString": "DATABASE=.", "dataset": "Roads.shp"}}}]}),
        );
        let dataset = DatasetDescriptor::new(
            Path::new("/data/USA/roads"),
            "Roads.shp",
            DatasetKind::FeatureClass(VectorStorage::Shapefile),
        );

        let outcome = patch_data_connection(&path, &dataset).unwrap();
        assert_eq!(outcome, PatchOutcome::Patched);
        assert_eq!(
            connection(
                &path,
                "/layerDefinitions/0/featureTable/dataConnection/workspaceConnectionString"
            )
            .as_deref(),
            Some("DATABASE=/data/USA/roads")
        );
        assert_eq!(
            connection(&path, "/layerDefinitions/0/featureTable/dataConnection/dataset").as_deref(),
            Some("Roads.shp")
        );
    }

    #[test]
    fn test_patch_feature_dataset_member_targets_geodatabase() {
        let dir = TempDir::new().unwrap();
        let path = write_layer(
            &dir,
            "Streams_fc.lyrx",
            &json!({"layerDefinitions": [{"featureTable": {"dataConnection": {
                "workspaceConnectionString": "DATABASE=../base.gdb", "dataset": "Streams"}}}]}),
        );
        let dataset = DatasetDescriptor::new(
            Path::new("/data/base.gdb/Hydro"),
            "Streams",
            DatasetKind::FeatureClass(VectorStorage::Geodatabase),
        );

        assert_eq!(
            patch_data_connection(&path, &dataset).unwrap(),
            PatchOutcome::Patched
        );
        assert_eq!(
            connection(
                &path,
                "/layerDefinitions/0/featureTable/dataConnection/workspaceConnectionString"
            )
            .as_deref(),
            Some("DATABASE=/data/base.gdb")
        );
    }

    #[test]
    fn test_patch_raster() {
        let dir = TempDir::new().unwrap();
        let path = write_layer(
            &dir,
            "dem_tif.lyrx",
            &json!({"layerDefinitions": [{"dataConnection": {"workspaceConnectionString": "DATABASE=."}}]}),
        );
        let dataset = DatasetDescriptor::new(
            Path::new("/data/elev"),
            "dem.tif",
            DatasetKind::Raster(RasterInfo {
                band_count: 1,
                width: 10,
                height: 10,
            }),
        );

        assert_eq!(
            patch_data_connection(&path, &dataset).unwrap(),
            PatchOutcome::Patched
        );
        assert_eq!(
            connection(&path, "/layerDefinitions/0/dataConnection/workspaceConnectionString")
                .as_deref(),
            Some("DATABASE=/data/elev")
        );
    }

    #[test]
    fn test_unknown_kind_is_left_unchanged() {
        let dir = TempDir::new().unwrap();
        let document = json!({"layerDefinitions": [{"dataConnection": {"workspaceConnectionString": "DATABASE=."}}]});
        let path = write_layer(&dir, "odd.lyrx", &document);
        let dataset = DatasetDescriptor::new(
            Path::new("/data"),
            "odd.xyz",
            DatasetKind::Unsupported {
                data_type: "Toolbox".to_string(),
            },
        );

        assert_eq!(
            patch_data_connection(&path, &dataset).unwrap(),
            PatchOutcome::Unpatched
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), document.to_string());
    }

    #[test]
    fn test_missing_connection_field_is_left_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = write_layer(&dir, "bare.lyrx", &json!({"layerDefinitions": []}));
        let dataset = DatasetDescriptor::new(
            Path::new("/data"),
            "bare.shp",
            DatasetKind::FeatureClass(VectorStorage::Shapefile),
        );
        assert_eq!(
            patch_data_connection(&path, &dataset).unwrap(),
            PatchOutcome::Unpatched
        );
    }
}

//! Portable layer documents (`.lyrx`) in the CIM JSON layout.

use std::path::Path;

use serde_json::{json, Value};

use crate::model::{DatasetDescriptor, DatasetKind, VectorStorage};

/// Connection string of a layer file placed in `layer_dir` that refers to
/// data in `source_folder`: relative when the layer sits in the folder itself
/// or in a sibling of it, absolute otherwise.
pub fn connection_string(layer_dir: &Path, source_folder: &Path) -> String {
    if layer_dir == source_folder {
        return "DATABASE=.".to_string();
    }
    match (layer_dir.parent(), source_folder.parent(), source_folder.file_name()) {
        (Some(a), Some(b), Some(name)) if a == b => {
            format!("DATABASE=../{}", name.to_string_lossy())
        }
        _ => format!("DATABASE={}", source_folder.display()),
    }
}

/// Builds the layer document for `dataset` as saved at `target`.
pub fn layer_document(dataset: &DatasetDescriptor, target: &Path) -> Value {
    let layer_dir = target.parent().unwrap_or(Path::new(""));
    let connection = connection_string(layer_dir, &dataset.source_workspace());
    let uri = format!("CIMPATH=map/{}.xml", dataset.base_name.to_lowercase());

    let definition = match &dataset.kind {
        DatasetKind::FeatureClass(storage) => {
            let factory = match storage {
                VectorStorage::Shapefile => "Shapefile",
                VectorStorage::Geodatabase => "FileGDB",
            };
            json!({
                "type": "CIMFeatureLayer",
                "name": dataset.base_name,
                "uRI": uri,
                "visibility": true,
                "featureTable": {
                    "type": "CIMFeatureTable",
                    "displayField": "",
                    "dataConnection": {
                        "type": "CIMStandardDataConnection",
                        "workspaceConnectionString": connection,
                        "workspaceFactory": factory,
                        "dataset": dataset.name,
                        "datasetType": "esriDTFeatureClass"
                    }
                }
            })
        }
        DatasetKind::Raster(_) => json!({
            "type": "CIMRasterLayer",
            "name": dataset.base_name,
            "uRI": uri,
            "visibility": true,
            "dataConnection": {
                "type": "CIMStandardDataConnection",
                "workspaceConnectionString": connection,
                "workspaceFactory": "Raster",
                "dataset": dataset.name,
                "datasetType": "esriDTRasterDataset"
            }
        }),
        DatasetKind::PointCloud(_) => json!({
            "type": "CIMLASDatasetLayer",
            "name": dataset.base_name,
            "uRI": uri,
            "visibility": true,
            "dataConnection": {
                "type": "CIMStandardDataConnection",
                "workspaceConnectionString": connection,
                "workspaceFactory": "LASDataset",
                "dataset": dataset.name,
                "datasetType": "esriDTLasDataset"
            }
        }),
        DatasetKind::FeatureDataset | DatasetKind::Unsupported { .. } => json!({
            "type": "CIMGroupLayer",
            "name": dataset.base_name,
            "uRI": uri,
            "visibility": true
        }),
    };

    json!({
        "type": "CIMLayerDocument",
        "version": "2.7.0",
        "build": 26828,
        "layers": [uri],
        "layerDefinitions": [definition]
    })
}

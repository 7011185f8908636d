//! Boundary to the GIS toolkit that reads datasets, builds map layers and
//! reprojects geometry.

#[cfg(feature = "gdal")]
pub mod gdal;
pub mod las;
pub mod lyrx;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::{DatasetDescriptor, Extent, Workspace};

/// Reprojects extents between coordinate systems.
pub trait Reprojector {
    /// Projects the diagonal of `extent` from `from_wkid` into `to_wkid` and
    /// returns the extent of the projected geometry.
    fn project_extent(&self, extent: &Extent, from_wkid: i32, to_wkid: i32) -> Result<Extent>;
}

pub trait GisEngine: Reprojector {
    /// Handle of a layer resident in the working map.
    type Layer;

    fn describe(&self, workspace: &Workspace, name: &str) -> Result<DatasetDescriptor>;

    /// Adds the dataset to the working map. Fails with
    /// [`CrawlError::LayerCreation`](crate::CrawlError::LayerCreation) when
    /// the toolkit cannot build a layer for it.
    fn add_layer(&mut self, dataset: &DatasetDescriptor) -> Result<Self::Layer>;

    /// Writes the layer as a portable layer file and returns the path written.
    fn save_layer(&self, layer: &Self::Layer, target: &Path) -> Result<PathBuf>;

    fn remove_layer(&mut self, layer: &Self::Layer);

    /// Metadata document already attached to the dataset, if any.
    fn read_metadata(&self, dataset: &DatasetDescriptor) -> Result<Option<String>>;

    fn list_feature_classes(&self, workspace: &Workspace) -> Result<Vec<String>>;

    fn list_feature_datasets(&self, workspace: &Workspace) -> Result<Vec<String>>;

    fn list_rasters(&self, workspace: &Workspace) -> Result<Vec<String>>;
}

/// A dataset resident in the working map.
///
/// The layer is removed from the map when the guard drops, whichever way
/// processing of the dataset ends.
pub struct MapLayer<'a, E: GisEngine> {
    engine: &'a mut E,
    layer: E::Layer,
}

impl<'a, E: GisEngine> MapLayer<'a, E> {
    pub fn add(engine: &'a mut E, dataset: &DatasetDescriptor) -> Result<Self> {
        let layer = engine.add_layer(dataset)?;
        Ok(Self { engine, layer })
    }

    pub fn save_a_copy(&self, target: &Path) -> Result<PathBuf> {
        self.engine.save_layer(&self.layer, target)
    }
}

impl<E: GisEngine> Drop for MapLayer<'_, E> {
    fn drop(&mut self) {
        self.engine.remove_layer(&self.layer);
    }
}

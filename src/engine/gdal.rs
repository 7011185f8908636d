//! GIS engine backed by GDAL.
//!
//! Folders expose shapefiles as feature classes, GDAL-readable rasters and
//! LAS files. File geodatabases expose their layers as feature classes;
//! GDAL flattens feature datasets, so none are reported.

use std::fs;
use std::path::{Path, PathBuf};

use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::vector::LayerAccess;
use gdal::{Dataset, Metadata};
use tracing::debug;

use super::las::LasHeader;
use super::lyrx::layer_document;
use super::{GisEngine, Reprojector};
use crate::error::{CrawlError, Result};
use crate::model::{
    geodatabase_root, DatasetDescriptor, DatasetKind, Extent, RasterInfo, VectorStorage,
    Workspace, WorkspaceKind,
};

/// Extensions listed as rasters. ArcReader, CityEngine and font files are
/// listed too so the crawler can report them as unsupported; LAS files are
/// left to the point cloud scan.
const RASTER_EXTENSIONS: [&str; 19] = [
    "tif", "tiff", "img", "jp2", "sid", "ecw", "dem", "dt0", "dt1", "dt2", "asc", "bil", "png",
    "jpg", "jpeg", "nc", "pmf", "cej", "ttf",
];

/// Domain holding ArcGIS metadata on geodatabase layers.
const DOCUMENTATION_DOMAIN: &str = "xml:documentation";

/// A dataset added to the working map.
#[derive(Debug)]
pub struct GdalLayer {
    id: usize,
    dataset: DatasetDescriptor,
}

#[derive(Debug, Default)]
pub struct GdalEngine {
    next_id: usize,
    resident: Vec<usize>,
}

impl GdalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers currently in the working map.
    pub fn resident_layers(&self) -> usize {
        self.resident.len()
    }
}

fn spatial_ref(wkid: i32) -> Result<SpatialRef> {
    let failed = |reason: String| CrawlError::Reprojection {
        from: wkid,
        to: wkid,
        reason,
    };
    let code = u32::try_from(wkid).map_err(|e| failed(e.to_string()))?;
    let mut srs = SpatialRef::from_epsg(code)
        .or_else(|_| SpatialRef::from_definition(&format!("ESRI:{wkid}")))
        .map_err(|e| failed(e.to_string()))?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

fn auth_code(srs: Option<SpatialRef>) -> Option<i32> {
    srs.and_then(|s| s.auth_code().ok())
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

fn list_files(folder: &Path, extensions: &[&str]) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(folder).map_err(CrawlError::io(folder))? {
        let entry = entry.map_err(CrawlError::io(folder))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_file() && has_extension(&name, extensions) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn describe_geodatabase_layer(workspace: &Workspace, name: &str) -> Result<DatasetDescriptor> {
    let root = geodatabase_root(&workspace.path)
        .ok_or_else(|| CrawlError::Describe(workspace.path.join(name), "no geodatabase".into()))?;
    let dataset = Dataset::open(&root)?;
    let layer = dataset.layer_by_name(name)?;
    let envelope = layer.get_extent()?;

    Ok(DatasetDescriptor::new(
        &workspace.path,
        name,
        DatasetKind::FeatureClass(VectorStorage::Geodatabase),
    )
    .with_wkid(auth_code(layer.spatial_ref()))
    .with_extent(Extent::new(
        envelope.MinX,
        envelope.MinY,
        envelope.MaxX,
        envelope.MaxY,
    )))
}

fn describe_file(workspace: &Workspace, name: &str) -> Result<DatasetDescriptor> {
    let path = workspace.path.join(name);

    if has_extension(name, &["las"]) {
        let header = LasHeader::read(&path)?;
        return Ok(DatasetDescriptor::new(
            &workspace.path,
            name,
            DatasetKind::PointCloud(header.point_cloud_info()),
        )
        .with_extent(header.extent));
    }

    let dataset = Dataset::open(&path)?;
    if dataset.raster_count() > 0 {
        let (width, height) = dataset.raster_size();
        let extent = match dataset.geo_transform() {
            Ok(gt) => {
                let x = [gt[0], gt[0] + width as f64 * gt[1]];
                let y = [gt[3], gt[3] + height as f64 * gt[5]];
                Extent::new(x[0].min(x[1]), y[0].min(y[1]), x[0].max(x[1]), y[0].max(y[1]))
            }
            Err(_) => Extent::default(),
        };
        let kind = DatasetKind::Raster(RasterInfo {
            band_count: dataset.raster_count(),
            width,
            height,
        });
        return Ok(DatasetDescriptor::new(&workspace.path, name, kind)
            .with_wkid(auth_code(dataset.spatial_ref().ok()))
            .with_extent(extent));
    }

    if dataset.layer_count() > 0 {
        let layer = dataset.layer(0)?;
        let extent = layer
            .get_extent()
            .map(|e| Extent::new(e.MinX, e.MinY, e.MaxX, e.MaxY))
            .unwrap_or_default();
        return Ok(DatasetDescriptor::new(
            &workspace.path,
            name,
            DatasetKind::FeatureClass(VectorStorage::Shapefile),
        )
        .with_wkid(auth_code(layer.spatial_ref()))
        .with_extent(extent));
    }

    Ok(DatasetDescriptor::new(
        &workspace.path,
        name,
        DatasetKind::Unsupported {
            data_type: dataset.driver().short_name(),
        },
    ))
}

impl Reprojector for GdalEngine {
    fn project_extent(&self, extent: &Extent, from_wkid: i32, to_wkid: i32) -> Result<Extent> {
        let failed = |reason: String| CrawlError::Reprojection {
            from: from_wkid,
            to: to_wkid,
            reason,
        };
        let ((x0, y0), (x1, y1)) = extent
            .corners()
            .ok_or_else(|| failed("incomplete extent".to_string()))?;

        let transform = CoordTransform::new(&spatial_ref(from_wkid)?, &spatial_ref(to_wkid)?)
            .map_err(|e| failed(e.to_string()))?;
        let mut xs = [x0, x1];
        let mut ys = [y0, y1];
        let mut zs = [0.0, 0.0];
        transform
            .transform_coords(&mut xs, &mut ys, &mut zs)
            .map_err(|e| failed(e.to_string()))?;

        Ok(Extent::new(
            xs[0].min(xs[1]),
            ys[0].min(ys[1]),
            xs[0].max(xs[1]),
            ys[0].max(ys[1]),
        ))
    }
}

impl GisEngine for GdalEngine {
    type Layer = GdalLayer;

    fn describe(&self, workspace: &Workspace, name: &str) -> Result<DatasetDescriptor> {
        let described = match workspace.kind {
            WorkspaceKind::Folder => describe_file(workspace, name),
            WorkspaceKind::Geodatabase | WorkspaceKind::FeatureDataset => {
                describe_geodatabase_layer(workspace, name)
            }
        };
        described.map_err(|e| match e {
            e @ CrawlError::Describe(..) => e,
            e => CrawlError::Describe(workspace.path.join(name), e.to_string()),
        })
    }

    fn add_layer(&mut self, dataset: &DatasetDescriptor) -> Result<GdalLayer> {
        if let DatasetKind::Unsupported { data_type } = &dataset.kind {
            return Err(CrawlError::LayerCreation(
                dataset.path.clone(),
                format!("unsupported data type {data_type}"),
            ));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.resident.push(id);
        Ok(GdalLayer {
            id,
            dataset: dataset.clone(),
        })
    }

    fn save_layer(&self, layer: &GdalLayer, target: &Path) -> Result<PathBuf> {
        let document = layer_document(&layer.dataset, target);
        let content = serde_json::to_string_pretty(&document)
            .map_err(|e| CrawlError::LayerJson(e, target.to_path_buf()))?;
        fs::write(target, content).map_err(CrawlError::io(target))?;
        Ok(target.to_path_buf())
    }

    fn remove_layer(&mut self, layer: &GdalLayer) {
        self.resident.retain(|id| *id != layer.id);
    }

    fn read_metadata(&self, dataset: &DatasetDescriptor) -> Result<Option<String>> {
        if let DatasetKind::FeatureClass(VectorStorage::Geodatabase) = dataset.kind {
            let Some(root) = geodatabase_root(&dataset.folder) else {
                return Ok(None);
            };
            let gdb = Dataset::open(&root)?;
            let layer = gdb.layer_by_name(&dataset.name)?;
            return Ok(layer
                .metadata_domain(DOCUMENTATION_DOMAIN)
                .map(|lines| lines.concat())
                .filter(|xml| !xml.trim().is_empty()));
        }

        let mut sidecar = dataset.path.clone().into_os_string();
        sidecar.push(".xml");
        let sidecar = PathBuf::from(sidecar);
        if !sidecar.is_file() {
            return Ok(None);
        }
        debug!("Reading existing metadata {}", sidecar.display());
        fs::read_to_string(&sidecar)
            .map(Some)
            .map_err(CrawlError::io(&sidecar))
    }

    fn list_feature_classes(&self, workspace: &Workspace) -> Result<Vec<String>> {
        match workspace.kind {
            WorkspaceKind::Folder => list_files(&workspace.path, &["shp"]),
            WorkspaceKind::Geodatabase => {
                let dataset = Dataset::open(&workspace.path)?;
                let mut names: Vec<String> = dataset.layers().map(|l| l.name()).collect();
                names.sort();
                Ok(names)
            }
            WorkspaceKind::FeatureDataset => Ok(Vec::new()),
        }
    }

    fn list_feature_datasets(&self, _workspace: &Workspace) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn list_rasters(&self, workspace: &Workspace) -> Result<Vec<String>> {
        match workspace.kind {
            WorkspaceKind::Folder => list_files(&workspace.path, &RASTER_EXTENSIONS),
            WorkspaceKind::Geodatabase | WorkspaceKind::FeatureDataset => Ok(Vec::new()),
        }
    }
}

use std::fmt;
use std::path::{Path, PathBuf};

/// Geographic coordinate system every bounding box is published in.
pub const WGS84_WKID: i32 = 4326;

/// Extent of a dataset in its native units. Any bound may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Extent {
    pub x_min: Option<f64>,
    pub y_min: Option<f64>,
    pub x_max: Option<f64>,
    pub y_max: Option<f64>,
}

impl Extent {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min: Some(x_min),
            y_min: Some(y_min),
            x_max: Some(x_max),
            y_max: Some(y_max),
        }
    }

    /// Returns the two diagonal corners when all four bounds are known.
    pub fn corners(&self) -> Option<((f64, f64), (f64, f64))> {
        Some((
            (self.x_min?, self.y_min?),
            (self.x_max?, self.y_max?),
        ))
    }
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub const WORLD: Self = Self {
        west: -180.0,
        south: -90.0,
        east: 180.0,
        north: 90.0,
    };
}

/// How a vector feature class is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorStorage {
    Shapefile,
    Geodatabase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub band_count: usize,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudInfo {
    pub constraint_count: u32,
    pub file_count: u32,
    pub has_statistics: bool,
    pub needs_update_statistics: bool,
    pub point_count: u64,
}

/// Classification of a dataset, carrying only the facts relevant to it.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetKind {
    FeatureClass(VectorStorage),
    FeatureDataset,
    Raster(RasterInfo),
    PointCloud(PointCloudInfo),
    Unsupported { data_type: String },
}

impl DatasetKind {
    /// Data type name as published in keywords and abstracts.
    pub fn data_type(&self) -> &str {
        match self {
            Self::FeatureClass(VectorStorage::Shapefile) => "ShapeFile",
            Self::FeatureClass(VectorStorage::Geodatabase) => "FeatureClass",
            Self::FeatureDataset => "FeatureDataset",
            Self::Raster(_) => "RasterDataset",
            Self::PointCloud(_) => "LasDataset",
            Self::Unsupported { data_type } => data_type,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.data_type())
    }
}

/// Everything the crawl needs to know about one dataset.
///
/// Read fresh from storage for each dataset and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescriptor {
    /// Full path of the dataset, `folder` joined with `name`.
    pub path: PathBuf,
    /// Container the dataset was listed in.
    pub folder: PathBuf,
    /// Name as listed in the container, including any extension.
    pub name: String,
    /// Name without extension.
    pub base_name: String,
    pub kind: DatasetKind,
    /// Native coordinate system identifier, `None` when unknown.
    pub wkid: Option<i32>,
    pub extent: Extent,
}

impl DatasetDescriptor {
    pub fn new(folder: &Path, name: &str, kind: DatasetKind) -> Self {
        let path = folder.join(name);
        // Geodatabase members have no extension; `owner.table` names keep
        // their dot.
        let in_geodatabase = matches!(kind, DatasetKind::FeatureClass(VectorStorage::Geodatabase))
            || geodatabase_component(folder).is_some();
        let base_name = if in_geodatabase {
            name.to_string()
        } else {
            Path::new(name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(name)
                .to_string()
        };
        Self {
            path,
            folder: folder.to_path_buf(),
            name: name.to_string(),
            base_name,
            kind,
            wkid: None,
            extent: Extent::default(),
        }
    }

    pub fn with_wkid(mut self, wkid: Option<i32>) -> Self {
        self.wkid = wkid;
        self
    }

    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    /// Workspace a layer connects to: the enclosing geodatabase for its
    /// members, since feature datasets are not workspaces, else the folder.
    pub fn source_workspace(&self) -> PathBuf {
        geodatabase_root(&self.folder).unwrap_or_else(|| self.folder.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkspaceKind {
    Folder,
    /// A `.gdb` or `.sde` container.
    Geodatabase,
    /// A feature dataset nested inside a geodatabase.
    FeatureDataset,
}

/// A storage container being scanned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Workspace {
    pub path: PathBuf,
    pub kind: WorkspaceKind,
}

impl Workspace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = match geodatabase_component(&path) {
            None => WorkspaceKind::Folder,
            Some(depth) if depth + 1 == path.components().count() => WorkspaceKind::Geodatabase,
            Some(_) => WorkspaceKind::FeatureDataset,
        };
        Self { path, kind }
    }
}

/// Returns true when the name ends in a geodatabase extension.
pub fn is_geodatabase_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".gdb") || lower.ends_with(".sde")
}

/// Index of the first path component naming a geodatabase.
pub(crate) fn geodatabase_component(path: &Path) -> Option<usize> {
    path.components()
        .position(|c| c.as_os_str().to_str().is_some_and(is_geodatabase_name))
}

/// Path of the geodatabase enclosing `path`, or `path` itself.
pub(crate) fn geodatabase_root(path: &Path) -> Option<PathBuf> {
    let depth = geodatabase_component(path)?;
    Some(path.components().take(depth + 1).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_classification() {
        assert_eq!(Workspace::new("/data/roads").kind, WorkspaceKind::Folder);
        assert_eq!(
            Workspace::new("/data/base.gdb").kind,
            WorkspaceKind::Geodatabase
        );
        assert_eq!(
            Workspace::new("/data/prod.SDE").kind,
            WorkspaceKind::Geodatabase
        );
        assert_eq!(
            Workspace::new("/data/base.gdb/Hydro").kind,
            WorkspaceKind::FeatureDataset
        );
    }

    #[test]
    fn test_workspaces_deduplicate_in_sets() {
        let mut seen = std::collections::HashSet::new();
        assert!(seen.insert(Workspace::new("/data/base.gdb/Hydro")));
        assert!(!seen.insert(Workspace::new("/data/base.gdb/Hydro")));
        assert!(seen.insert(Workspace::new("/data/base.gdb")));
    }

    #[test]
    fn test_descriptor_base_name() {
        let desc = DatasetDescriptor::new(
            Path::new("/data/roads"),
            "Roads.shp",
            DatasetKind::FeatureClass(VectorStorage::Shapefile),
        );
        assert_eq!(desc.base_name, "Roads");
        assert_eq!(desc.path, Path::new("/data/roads/Roads.shp"));
        assert_eq!(desc.kind.data_type(), "ShapeFile");
    }

    #[test]
    fn test_geodatabase_member_keeps_dotted_name() {
        let parcels = DatasetDescriptor::new(
            Path::new("/conn/prod.sde"),
            "GIS.Parcels",
            DatasetKind::FeatureClass(VectorStorage::Geodatabase),
        );
        assert_eq!(parcels.base_name, "GIS.Parcels");

        let streams = DatasetDescriptor::new(
            Path::new("/data/base.gdb/Hydro"),
            "Streams.v2",
            DatasetKind::FeatureClass(VectorStorage::Geodatabase),
        );
        assert_eq!(streams.base_name, "Streams.v2");

        let raster = DatasetDescriptor::new(
            Path::new("/data/base.gdb"),
            "elev.dem",
            DatasetKind::Raster(RasterInfo {
                band_count: 1,
                width: 1,
                height: 1,
            }),
        );
        assert_eq!(raster.base_name, "elev.dem");
    }

    #[test]
    fn test_source_workspace_is_geodatabase_root() {
        let streams = DatasetDescriptor::new(
            Path::new("/data/base.gdb/Hydro"),
            "Streams",
            DatasetKind::FeatureClass(VectorStorage::Geodatabase),
        );
        assert_eq!(streams.source_workspace(), Path::new("/data/base.gdb"));

        let roads = DatasetDescriptor::new(
            Path::new("/data/roads"),
            "Roads.shp",
            DatasetKind::FeatureClass(VectorStorage::Shapefile),
        );
        assert_eq!(roads.source_workspace(), Path::new("/data/roads"));
    }

    #[test]
    fn test_extent_corners_require_all_bounds() {
        let mut extent = Extent::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(extent.corners(), Some(((1.0, 2.0), (3.0, 4.0))));
        extent.y_max = None;
        assert_eq!(extent.corners(), None);
    }
}

//! Depth-first crawl over workspaces, driving layer, metadata and publish
//! steps for every dataset found.

use std::collections::HashSet;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, error, info, info_span, warn};

use crate::config::{CrawlConfig, MergeStrategy};
use crate::engine::GisEngine;
use crate::error::{CrawlError, Result};
use crate::extent::normalize_extent;
use crate::hierarchy::hierarchy_token;
use crate::layer::{LayerArtifactManager, LayerArtifacts, GDB_LAYERS_SUFFIX};
use crate::metadata::{merge, merge_legacy, synthesize, Element, MetadataFacts};
use crate::model::{is_geodatabase_name, DatasetDescriptor, Workspace, WorkspaceKind};
use crate::publish::Publisher;

/// Raster formats the layer engine cannot display.
const UNSUPPORTED_RASTERS: [(&str, &str); 3] = [
    ("pmf", "ArcReader files not supported"),
    ("cej", "CityEngine files not supported"),
    ("ttf", "Font files not supported"),
];

const POINT_CLOUD_EXTENSION: &str = "las";

/// Scan performed on a workspace, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    FeatureClasses,
    FeatureDatasets,
    Rasters,
    PointClouds,
}

/// Stack of active workspaces; the last entry is the one being scanned.
#[derive(Debug, Clone)]
pub struct CrawlState {
    stack: Vec<Workspace>,
}

impl CrawlState {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            stack: vec![workspace],
        }
    }

    pub fn active(&self) -> &Workspace {
        &self.stack[self.stack.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Makes `workspace` active until the returned scope drops.
    pub fn enter(&mut self, workspace: Workspace) -> WorkspaceScope<'_> {
        self.stack.push(workspace);
        WorkspaceScope { state: self }
    }
}

/// Restores the parent workspace when dropped.
pub struct WorkspaceScope<'a> {
    state: &'a mut CrawlState,
}

impl Deref for WorkspaceScope<'_> {
    type Target = CrawlState;

    fn deref(&self) -> &CrawlState {
        self.state
    }
}

impl DerefMut for WorkspaceScope<'_> {
    fn deref_mut(&mut self) -> &mut CrawlState {
        self.state
    }
}

impl Drop for WorkspaceScope<'_> {
    fn drop(&mut self) {
        self.state.stack.pop();
    }
}

/// Counters reported at the end of a crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub workspaces: usize,
    pub datasets: usize,
    pub published: usize,
    pub unsupported: usize,
    pub layer_failures: usize,
    pub failed: usize,
    pub publish_failures: usize,
}

/// Lists every directory below `root`, `root` first, in walk order.
///
/// Geodatabases are listed but not descended into. Hidden directories,
/// generated `.gdb_layers` folders and `skip` are left out.
pub fn enumerate_workspaces(root: &Path, skip: &Path) -> Result<Vec<PathBuf>> {
    let mut workspaces = Vec::new();
    let mut it = walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = it.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(CrawlError::Walk(e, root.to_path_buf())),
            Err(e) => {
                warn!("Skipping unreadable entry below {}: {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if entry.depth() > 0
            && (name.starts_with('.') || name.ends_with(GDB_LAYERS_SUFFIX) || entry.path() == skip)
        {
            it.skip_current_dir();
            continue;
        }
        let is_gdb = is_geodatabase_name(&name);
        workspaces.push(entry.into_path());
        if is_gdb {
            it.skip_current_dir();
        }
    }
    Ok(workspaces)
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

pub struct Crawler<'a, E: GisEngine, P: Publisher> {
    config: &'a CrawlConfig,
    engine: &'a mut E,
    publisher: &'a P,
    layers: LayerArtifactManager,
    visited: HashSet<PathBuf>,
    summary: CrawlSummary,
}

impl<'a, E: GisEngine, P: Publisher> Crawler<'a, E, P> {
    pub fn new(config: &'a CrawlConfig, engine: &'a mut E, publisher: &'a P) -> Self {
        Self {
            layers: LayerArtifactManager::new(&config.publish_folder, config.overwrite_layers),
            config,
            engine,
            publisher,
            visited: HashSet::new(),
            summary: CrawlSummary::default(),
        }
    }

    pub fn summary(&self) -> &CrawlSummary {
        &self.summary
    }

    /// Crawls every workspace below the configured root.
    pub fn run(mut self) -> Result<CrawlSummary> {
        let workspaces = enumerate_workspaces(&self.config.root, &self.config.publish_folder)?;
        info!("Found {} workspaces below {}", workspaces.len(), self.config.root.display());

        for path in workspaces {
            let mut state = CrawlState::new(Workspace::new(path));
            self.crawl_workspace(&mut state)?;
        }
        Ok(self.summary)
    }

    /// Runs all scans on the active workspace of `state`, recursing into
    /// feature datasets. A workspace is crawled at most once per crawler.
    pub fn crawl_workspace(&mut self, state: &mut CrawlState) -> Result<()> {
        let workspace = state.active().clone();
        if !self.visited.insert(workspace.path.clone()) {
            debug!("Workspace {} already crawled", workspace.path.display());
            return Ok(());
        }
        self.summary.workspaces += 1;
        let _span = info_span!("workspace", path = %workspace.path.display()).entered();
        info!("workspace = {}", workspace.path.display());

        for phase in [
            ScanPhase::FeatureClasses,
            ScanPhase::FeatureDatasets,
            ScanPhase::Rasters,
            ScanPhase::PointClouds,
        ] {
            self.scan(state, &workspace, phase)?;
        }
        Ok(())
    }

    fn scan(&mut self, state: &mut CrawlState, workspace: &Workspace, phase: ScanPhase) -> Result<()> {
        let _span = info_span!("scan", ?phase).entered();
        match phase {
            ScanPhase::FeatureClasses => {
                for name in self.list(workspace, phase) {
                    self.process_dataset(workspace, &name);
                }
            }
            ScanPhase::FeatureDatasets => {
                for name in self.list(workspace, phase) {
                    info!("Crawling feature dataset {name}");
                    let mut scope = state.enter(Workspace::new(workspace.path.join(&name)));
                    self.crawl_workspace(&mut scope)?;
                }
            }
            ScanPhase::Rasters => {
                for name in self.list(workspace, phase) {
                    let ext = extension_of(&name);
                    if let Some((_, alert)) = UNSUPPORTED_RASTERS
                        .iter()
                        .find(|(e, _)| ext.as_deref() == Some(*e))
                    {
                        warn!("ALERT: {alert}: {name}");
                        self.summary.unsupported += 1;
                        continue;
                    }
                    if ext.as_deref() == Some(POINT_CLOUD_EXTENSION) {
                        info!("LAS file {name} listed as raster");
                    }
                    self.process_dataset(workspace, &name);
                }
            }
            ScanPhase::PointClouds => {
                for name in self.list(workspace, phase) {
                    info!("LAS file {name}");
                    self.process_dataset(workspace, &name);
                }
            }
        }
        Ok(())
    }

    fn list(&self, workspace: &Workspace, phase: ScanPhase) -> Vec<String> {
        let listed = match phase {
            ScanPhase::FeatureClasses => self.engine.list_feature_classes(workspace),
            ScanPhase::FeatureDatasets => self.engine.list_feature_datasets(workspace),
            ScanPhase::Rasters => self.engine.list_rasters(workspace),
            ScanPhase::PointClouds => list_point_clouds(workspace),
        };
        match listed {
            Ok(names) => names,
            Err(e) => {
                error!("Cannot list {phase:?} of {}: {e}", workspace.path.display());
                Vec::new()
            }
        }
    }

    /// Runs the per-dataset pipeline, logging instead of propagating failures.
    fn process_dataset(&mut self, workspace: &Workspace, name: &str) {
        self.summary.datasets += 1;
        if let Err(e) = self.try_process_dataset(workspace, name) {
            error!("Failed to process {name} in {}: {e}", workspace.path.display());
            self.summary.failed += 1;
        }
    }

    fn try_process_dataset(&mut self, workspace: &Workspace, name: &str) -> Result<()> {
        let dataset = self.engine.describe(workspace, name)?;
        debug!("dataset.dataType = {}", dataset.kind);

        let Some(artifacts) = self.layers.materialize(self.engine, &dataset)? else {
            self.summary.layer_failures += 1;
            return Ok(());
        };

        let document = self.build_metadata(&dataset, &artifacts)?;
        let sidecar = artifacts.sidecar_path();
        fs::write(&sidecar, &document).map_err(CrawlError::io(&sidecar))?;
        debug!("Metadata written to {}", sidecar.display());

        if document.is_empty() {
            return Ok(());
        }
        match self.publisher.publish(&document) {
            Ok(response) => {
                info!("{} - {}", response.status, response.body);
                if response.is_success() {
                    self.summary.published += 1;
                } else {
                    self.summary.publish_failures += 1;
                }
            }
            Err(e) => {
                error!("Publishing metadata of {} failed: {e}", dataset.path.display());
                self.summary.publish_failures += 1;
            }
        }
        Ok(())
    }

    fn build_metadata(&self, dataset: &DatasetDescriptor, artifacts: &LayerArtifacts) -> Result<String> {
        let extent = normalize_extent(
            &*self.engine,
            &dataset.extent,
            dataset.wkid,
            self.config.default_wkid,
        );
        let hierarchy = hierarchy_token(&self.config.root, &dataset.folder);
        let public_url = self.config.public_url(&artifacts.published_file_name());
        let file_url = format!("file://{}", dataset.path.display());

        let facts = MetadataFacts {
            dataset,
            bbox: extent.bbox,
            hierarchy: &hierarchy,
            public_url: &public_url,
            file_url: &file_url,
            now: Local::now().naive_local(),
        };
        let template = synthesize(&facts, &self.config.contact)?;

        let prior = match self.engine.read_metadata(dataset) {
            Ok(Some(xml)) => match Element::parse(&xml) {
                Ok(prior) => Some(prior),
                Err(e) => {
                    warn!("Ignoring unreadable metadata of {}: {e}", dataset.path.display());
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Cannot read metadata of {}: {e}", dataset.path.display());
                None
            }
        };

        let document = match (prior, self.config.merge_strategy) {
            (None, _) => template,
            (Some(prior), MergeStrategy::Combine) => merge(&template, &prior),
            (Some(prior), MergeStrategy::Legacy) => merge_legacy(&prior, &template),
        };
        document.to_xml()
    }
}

/// Point cloud files directly inside a folder workspace.
fn list_point_clouds(workspace: &Workspace) -> Result<Vec<String>> {
    if workspace.kind != WorkspaceKind::Folder {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(&workspace.path).map_err(CrawlError::io(&workspace.path))? {
        let entry = entry.map_err(CrawlError::io(&workspace.path))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_file() && extension_of(&name).as_deref() == Some(POINT_CLOUD_EXTENSION) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scope_restores_parent_workspace() {
        let mut state = CrawlState::new(Workspace::new("/data/base.gdb"));
        {
            let mut scope = state.enter(Workspace::new("/data/base.gdb/Hydro"));
            assert_eq!(scope.active().kind, WorkspaceKind::FeatureDataset);
            {
                let scope = scope.enter(Workspace::new("/data/base.gdb/Hydro/Inner"));
                assert_eq!(scope.depth(), 3);
            }
            assert_eq!(scope.active().path, Path::new("/data/base.gdb/Hydro"));
        }
        assert_eq!(state.active().path, Path::new("/data/base.gdb"));
        assert_eq!(state.depth(), 1);
    }

    #[test]
    fn test_enumerate_workspaces() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for sub in [
            "USA/roads",
            "USA/base.gdb",
            "USA/base.gdb_layers",
            ".hidden",
            "lyrx",
        ] {
            fs::create_dir_all(root.join(sub)).unwrap();
        }
        fs::write(root.join("USA/base.gdb/a00000001.gdbtable"), b"").unwrap();
        fs::create_dir_all(root.join("USA/base.gdb/inner")).unwrap();

        let workspaces = enumerate_workspaces(root, &root.join("lyrx")).unwrap();
        assert_eq!(
            workspaces,
            vec![
                root.to_path_buf(),
                root.join("USA"),
                root.join("USA/base.gdb"),
                root.join("USA/roads"),
            ]
        );
    }

    #[test]
    fn test_missing_root_aborts() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            enumerate_workspaces(&missing, dir.path()),
            Err(CrawlError::Walk(_, _))
        ));
    }

    #[test]
    fn test_point_cloud_listing() {
        let dir = TempDir::new().unwrap();
        for name in ["b.las", "a.LAS", "c.lasd", "d.las.xml"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let names = list_point_clouds(&Workspace::new(dir.path())).unwrap();
        assert_eq!(names, vec!["a.LAS", "b.las"]);
    }
}

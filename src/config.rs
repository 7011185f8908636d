use std::path::PathBuf;
use std::time::Duration;

use crate::model::WGS84_WKID;

/// How a synthesized document is reconciled with metadata already attached
/// to the dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Tag-keyed recursive merge, existing values win.
    #[default]
    Combine,
    /// Append the template to the existing document and strip FGDC sections.
    Legacy,
}

/// Publisher contact written into every metadata record.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub name: String,
    pub organization: String,
    pub city: String,
    pub admin_area: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

impl Default for Contact {
    fn default() -> Self {
        Self {
            name: "Jenny".to_string(),
            organization: String::new(),
            city: "Example Town".to_string(),
            admin_area: String::new(),
            postal_code: "00000".to_string(),
            country: "US".to_string(),
            phone: "(000) 867-5309".to_string(),
        }
    }
}

/// Process-wide settings fixed before a crawl starts.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Top of the directory tree to crawl.
    pub root: PathBuf,
    /// Flat folder served over HTTP that receives published layer files.
    pub publish_folder: PathBuf,
    /// URL under which `publish_folder` is served.
    pub public_base_url: String,
    /// Assumed when a dataset has no usable coordinate system.
    pub default_wkid: i32,
    /// Replace existing working layer files instead of reusing them.
    pub overwrite_layers: bool,
    pub merge_strategy: MergeStrategy,
    pub contact: Contact,
}

impl CrawlConfig {
    pub fn new(root: impl Into<PathBuf>, publish_folder: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            publish_folder: publish_folder.into(),
            public_base_url: String::new(),
            default_wkid: WGS84_WKID,
            overwrite_layers: true,
            merge_strategy: MergeStrategy::default(),
            contact: Contact::default(),
        }
    }

    /// Public URL of a file placed in the publish folder.
    pub fn public_url(&self, file_name: &str) -> String {
        let file_name = file_name.rsplit(':').next().unwrap_or(file_name);
        if self.public_base_url.is_empty() || self.public_base_url.ends_with('/') {
            format!("{}{file_name}", self.public_base_url)
        } else {
            format!("{}/{file_name}", self.public_base_url)
        }
    }
}

/// Catalog endpoint receiving metadata records.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl CatalogConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
}

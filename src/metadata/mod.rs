//! ArcGIS metadata records: synthesis from dataset facts and reconciliation
//! with metadata already attached to a dataset.

mod merge;
mod template;
mod tree;

pub use merge::{merge, merge_legacy, strip_fgdc_sections, FGDC_SECTIONS};
pub use template::{describe, synthesize, title_from_name, MetadataFacts};
pub use tree::Element;

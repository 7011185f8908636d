//! Reprojection of dataset extents into clamped geographic bounding boxes.

use tracing::{debug, warn};

use crate::engine::Reprojector;
use crate::model::{BoundingBox, Extent, WGS84_WKID};

/// Where a normalized bounding box came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtentSource {
    /// Reprojected from the given coordinate system and clamped.
    Reprojected { from_wkid: i32 },
    /// Reprojection was impossible, the whole world is used instead.
    WorldFallback { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedExtent {
    pub bbox: BoundingBox,
    pub source: ExtentSource,
}

impl NormalizedExtent {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ExtentSource::WorldFallback { .. })
    }
}

/// Resolves the identifier to reproject from, substituting `default_wkid`
/// for missing or non-positive identifiers.
pub fn effective_wkid(wkid: Option<i32>, default_wkid: i32) -> i32 {
    match wkid {
        Some(wkid) if wkid > 0 => wkid,
        _ => default_wkid,
    }
}

/// Reprojects `extent` into WGS84 and clamps it to valid geographic bounds.
///
/// Never fails: any reprojection error yields the world bounding box,
/// flagged as [`ExtentSource::WorldFallback`].
pub fn normalize_extent<R: Reprojector + ?Sized>(
    reprojector: &R,
    extent: &Extent,
    wkid: Option<i32>,
    default_wkid: i32,
) -> NormalizedExtent {
    let from_wkid = effective_wkid(wkid, default_wkid);
    debug!("Source wkid = {from_wkid}, converting to {WGS84_WKID} for bounding box");

    if extent.corners().is_none() {
        return fallback("source extent is incomplete".to_string());
    }

    match reprojector.project_extent(extent, from_wkid, WGS84_WKID) {
        Ok(projected) => NormalizedExtent {
            bbox: clamp_to_world(&projected),
            source: ExtentSource::Reprojected { from_wkid },
        },
        Err(e) => {
            warn!("Reprojection failed, using world extent: {e}");
            fallback(e.to_string())
        }
    }
}

fn fallback(reason: String) -> NormalizedExtent {
    NormalizedExtent {
        bbox: BoundingBox::WORLD,
        source: ExtentSource::WorldFallback { reason },
    }
}

/// Clamps each bound independently; unknown or non-finite bounds take the
/// matching world bound.
pub fn clamp_to_world(extent: &Extent) -> BoundingBox {
    let bound = |value: Option<f64>, default: f64, limit: f64| {
        value
            .filter(|v| v.is_finite())
            .unwrap_or(default)
            .clamp(-limit, limit)
    };
    BoundingBox {
        west: bound(extent.x_min, -180.0, 180.0),
        south: bound(extent.y_min, -90.0, 90.0),
        east: bound(extent.x_max, 180.0, 180.0),
        north: bound(extent.y_max, 90.0, 90.0),
    }
}

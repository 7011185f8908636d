//! Reads the public header block of LAS point cloud files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{CrawlError, Result};
use crate::model::{Extent, PointCloudInfo};

const SIGNATURE: &[u8; 4] = b"LASF";
/// Bytes needed to reach the end of the LAS 1.2 header fields we read.
const HEADER_1_2_LEN: usize = 227;
/// LAS 1.4 headers carry a 64-bit point count at this offset.
const EXTENDED_COUNT_OFFSET: usize = 247;

/// Facts from a LAS header.
#[derive(Debug, Clone, PartialEq)]
pub struct LasHeader {
    pub version: (u8, u8),
    pub point_count: u64,
    pub extent: Extent,
}

impl LasHeader {
    pub fn read(path: &Path) -> Result<Self> {
        let mut buf = Vec::with_capacity(EXTENDED_COUNT_OFFSET + 8);
        File::open(path)
            .map_err(CrawlError::io(path))?
            .take((EXTENDED_COUNT_OFFSET + 8) as u64)
            .read_to_end(&mut buf)
            .map_err(CrawlError::io(path))?;
        Self::parse(&buf).map_err(|reason| CrawlError::Describe(path.to_path_buf(), reason))
    }

    pub fn parse(buf: &[u8]) -> Result<Self, String> {
        if buf.len() < HEADER_1_2_LEN {
            return Err(format!("LAS header too short: {} bytes", buf.len()));
        }
        if &buf[0..4] != SIGNATURE {
            return Err("not a LAS file".to_string());
        }
        let version = (buf[24], buf[25]);

        let legacy_count = u64::from(read_u32(buf, 107));
        let point_count = if version >= (1, 4) && buf.len() >= EXTENDED_COUNT_OFFSET + 8 {
            match read_u64(buf, EXTENDED_COUNT_OFFSET) {
                0 => legacy_count,
                count => count,
            }
        } else {
            legacy_count
        };

        let extent = Extent {
            x_max: Some(read_f64(buf, 179)),
            x_min: Some(read_f64(buf, 187)),
            y_max: Some(read_f64(buf, 195)),
            y_min: Some(read_f64(buf, 203)),
        };

        Ok(Self {
            version,
            point_count,
            extent,
        })
    }

    /// Statistics of a single LAS file, as a one-file point cloud.
    pub fn point_cloud_info(&self) -> PointCloudInfo {
        PointCloudInfo {
            constraint_count: 0,
            file_count: 1,
            has_statistics: false,
            needs_update_statistics: true,
            point_count: self.point_count,
        }
    }
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

fn read_f64(buf: &[u8], at: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    f64::from_le_bytes(bytes)
}

//! sectors.bin - uniform spatial grid over the network bounding box.
//!
//! Payload: bounding box as four Q28.4 i32 (min_e, min_n, max_e, max_n),
//! then 128x128 6-byte records in row-major order (west-to-east, then
//! south-to-north):
//!
//!   bytes 0..4: u32, id of the sector's first node
//!   bytes 4..6: u16, number of nodes in the sector
//!
//! Node ids are assigned so that each sector covers a contiguous id range;
//! proximity queries resolve candidate sectors from bounding-box arithmetic
//! alone.

use std::path::Path;

use crate::error::LoadError;
use crate::fixed::q28_4;
use crate::formats::{read_framed, read_i32, read_u16, read_u32, write_framed};
use crate::geo::Point;

const MAGIC: u32 = 0x564C_5343; // "VLSC"

pub const SECTORS_FILE: &str = "sectors.bin";

/// Sectors per axis; the grid has `GRID_SIDE * GRID_SIDE` cells.
pub const GRID_SIDE: u32 = 128;

const SECTOR_BYTES: usize = 6;
const SECTOR_COUNT: usize = (GRID_SIDE * GRID_SIDE) as usize;
const BBOX_BYTES: usize = 16;

/// A grid cell's contiguous node-id range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sector {
    pub start_node_id: u32,
    pub end_node_id: u32,
}

impl Sector {
    /// Iterate the node ids in the sector.
    pub fn node_ids(self) -> std::ops::Range<u32> {
        self.start_node_id..self.end_node_id
    }
}

/// Read-only decoder over the packed sector grid.
#[derive(Debug)]
pub struct SectorIndex {
    data: Vec<u8>,
    min: Point,
    sector_width: f64,
    sector_height: f64,
}

impl SectorIndex {
    /// Wrap a packed grid with its bounding box.
    pub fn from_parts(data: Vec<u8>, min: Point, max: Point) -> Result<Self, LoadError> {
        if data.len() != SECTOR_COUNT * SECTOR_BYTES {
            return Err(LoadError::Corrupt(format!(
                "sector grid is {} bytes (expected {})",
                data.len(),
                SECTOR_COUNT * SECTOR_BYTES
            )));
        }
        if !(max.e > min.e && max.n > min.n) {
            return Err(LoadError::Corrupt(format!(
                "degenerate sector bounding box ({}, {}) .. ({}, {})",
                min.e, min.n, max.e, max.n
            )));
        }
        Ok(Self {
            data,
            min,
            sector_width: (max.e - min.e) / f64::from(GRID_SIDE),
            sector_height: (max.n - min.n) / f64::from(GRID_SIDE),
        })
    }

    #[inline]
    fn sector_at(&self, x: u32, y: u32) -> Sector {
        let base = (y * GRID_SIDE + x) as usize * SECTOR_BYTES;
        let start = read_u32(&self.data, base);
        let count = u32::from(read_u16(&self.data, base + 4));
        Sector {
            start_node_id: start,
            end_node_id: start.saturating_add(count),
        }
    }

    #[inline]
    fn clamp_cell(&self, offset: f64, cell_size: f64) -> u32 {
        ((offset / cell_size).floor().max(0.0) as u32).min(GRID_SIDE - 1)
    }

    /// Every sector whose cell intersects the axis-aligned square of the
    /// given half-width centered on `center`. Resolved purely by index
    /// arithmetic over the grid; cells are never scanned.
    pub fn sectors_in_area(&self, center: Point, half_width: f64) -> Vec<Sector> {
        assert!(half_width >= 0.0, "negative search half-width");
        let x_min = self.clamp_cell(center.e - half_width - self.min.e, self.sector_width);
        let x_max = self.clamp_cell(center.e + half_width - self.min.e, self.sector_width);
        let y_min = self.clamp_cell(center.n - half_width - self.min.n, self.sector_height);
        let y_max = self.clamp_cell(center.n + half_width - self.min.n, self.sector_height);

        let mut sectors =
            Vec::with_capacity(((x_max - x_min + 1) * (y_max - y_min + 1)) as usize);
        for y in y_min..=y_max {
            for x in x_min..=x_max {
                sectors.push(self.sector_at(x, y));
            }
        }
        sectors
    }

    /// Check that every sector's node range stays inside `[0, node_count)`.
    pub(crate) fn validate_node_ranges(&self, node_count: u32) -> Result<(), LoadError> {
        for y in 0..GRID_SIDE {
            for x in 0..GRID_SIDE {
                let s = self.sector_at(x, y);
                if s.end_node_id > node_count {
                    return Err(LoadError::Corrupt(format!(
                        "sector ({x}, {y}) covers nodes [{}, {}) but the graph has {node_count}",
                        s.start_node_id, s.end_node_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Write the grid to `dir` as sectors.bin.
    pub fn write(&self, dir: &Path) -> std::io::Result<()> {
        let max = Point {
            e: self.min.e + self.sector_width * f64::from(GRID_SIDE),
            n: self.min.n + self.sector_height * f64::from(GRID_SIDE),
        };
        let mut payload = Vec::with_capacity(BBOX_BYTES + self.data.len());
        for v in [self.min.e, self.min.n, max.e, max.n] {
            payload.extend_from_slice(&((v * 16.0).round() as i32).to_le_bytes());
        }
        payload.extend_from_slice(&self.data);
        write_framed(&dir.join(SECTORS_FILE), MAGIC, &payload)
    }

    /// Read sectors.bin from `dir`.
    pub fn read(dir: &Path) -> Result<Self, LoadError> {
        let path = dir.join(SECTORS_FILE);
        let payload = read_framed(&path, MAGIC)?;
        if payload.len() != BBOX_BYTES + SECTOR_COUNT * SECTOR_BYTES {
            return Err(LoadError::Corrupt(format!(
                "{}: {} payload bytes (expected {})",
                path.display(),
                payload.len(),
                BBOX_BYTES + SECTOR_COUNT * SECTOR_BYTES
            )));
        }
        let min = Point {
            e: q28_4::as_double(read_i32(&payload, 0)),
            n: q28_4::as_double(read_i32(&payload, 4)),
        };
        let max = Point {
            e: q28_4::as_double(read_i32(&payload, 8)),
            n: q28_4::as_double(read_i32(&payload, 12)),
        };
        Self::from_parts(payload[BBOX_BYTES..].to_vec(), min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Grid over [0, 128) x [0, 128): one 1 m x 1 m cell per sector.
    fn unit_grid(cells: &[(u32, u32, u32, u16)]) -> SectorIndex {
        let mut data = vec![0u8; SECTOR_COUNT * SECTOR_BYTES];
        for &(x, y, start, count) in cells {
            let base = (y * GRID_SIDE + x) as usize * SECTOR_BYTES;
            data[base..base + 4].copy_from_slice(&start.to_le_bytes());
            data[base + 4..base + 6].copy_from_slice(&count.to_le_bytes());
        }
        SectorIndex::from_parts(data, Point::new(0.0, 0.0), Point::new(128.0, 128.0)).unwrap()
    }

    #[test]
    fn test_single_cell_query() {
        let index = unit_grid(&[(2, 3, 10, 4)]);
        let sectors = index.sectors_in_area(Point::new(2.5, 3.5), 0.4);
        assert_eq!(sectors.len(), 1);
        assert_eq!(
            sectors[0],
            Sector {
                start_node_id: 10,
                end_node_id: 14
            }
        );
        assert_eq!(sectors[0].node_ids().collect::<Vec<_>>(), vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_square_spans_neighboring_cells() {
        let index = unit_grid(&[(1, 1, 0, 1), (2, 1, 1, 2), (1, 2, 3, 1), (2, 2, 4, 5)]);
        let sectors = index.sectors_in_area(Point::new(2.0, 2.0), 0.5);
        // The square [1.5, 2.5]^2 touches exactly cells (1..=2, 1..=2)
        assert_eq!(sectors.len(), 4);
        assert_eq!(sectors[0].start_node_id, 0);
        assert_eq!(sectors[3].end_node_id, 9);
    }

    #[test]
    fn test_query_clamps_to_grid() {
        let index = unit_grid(&[(0, 0, 0, 2), (127, 127, 99, 1)]);
        // Far south-west of the bounding box: clamps to cell (0, 0)
        let sw = index.sectors_in_area(Point::new(-50.0, -50.0), 10.0);
        assert_eq!(sw.len(), 1);
        assert_eq!(sw[0].start_node_id, 0);
        // Beyond the north-east corner
        let ne = index.sectors_in_area(Point::new(500.0, 500.0), 1.0);
        assert_eq!(ne.len(), 1);
        assert_eq!(ne[0].start_node_id, 99);
    }

    #[test]
    fn test_huge_radius_covers_whole_grid() {
        let index = unit_grid(&[]);
        let sectors = index.sectors_in_area(Point::new(64.0, 64.0), 1_000.0);
        assert_eq!(sectors.len(), SECTOR_COUNT);
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let index = unit_grid(&[(5, 9, 42, 3)]);
        index.write(dir.path()).unwrap();
        let back = SectorIndex::read(dir.path()).unwrap();
        let sectors = back.sectors_in_area(Point::new(5.5, 9.5), 0.25);
        assert_eq!(sectors.len(), 1);
        assert_eq!(sectors[0].start_node_id, 42);
        assert_eq!(sectors[0].end_node_id, 45);
    }

    #[test]
    fn test_rejects_degenerate_bbox() {
        let data = vec![0u8; SECTOR_COUNT * SECTOR_BYTES];
        assert!(matches!(
            SectorIndex::from_parts(data, Point::new(3.0, 0.0), Point::new(3.0, 10.0)),
            Err(LoadError::Corrupt(_))
        ));
    }
}

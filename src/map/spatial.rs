use crate::geo::{Bounds, LngLat};
use std::collections::HashMap;

/// Spatial index over source bounding boxes using conservative approximation.
/// Each box is indexed into every cell it overlaps, so a point query never
/// misses a source whose box contains it; callers confirm candidates with an
/// exact point-in-polygon test.
///
/// Boxes spanning more than `MAX_CELLS_PER_SOURCE` cells skip the grid and
/// are returned by every query instead.
pub struct SourceGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// Sources too large to index cell by cell
    oversized: Vec<usize>,
    /// Cell size in degrees
    cell_size: f64,
}

pub const MAX_CELLS_PER_SOURCE: i64 = 256;

impl SourceGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            oversized: Vec::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from per-source bounds; the index of each item is its position
    /// in the iterator. Empty bounds are not indexed.
    pub fn build<'a>(bounds: impl Iterator<Item = &'a Bounds>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, b) in bounds.enumerate() {
            if b.is_empty() {
                continue;
            }
            let min_cell = grid.to_cell(b.min_lon, b.min_lat);
            let max_cell = grid.to_cell(b.max_lon, b.max_lat);
            let span = (max_cell.0 as i64 - min_cell.0 as i64 + 1)
                * (max_cell.1 as i64 - min_cell.1 as i64 + 1);
            if span > MAX_CELLS_PER_SOURCE {
                grid.oversized.push(idx);
                continue;
            }
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Indices of sources whose cell covers the point, followed by every
    /// oversized source
    pub fn query_point(&self, (lon, lat): LngLat) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .get(&self.to_cell(lon, lat))
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .chain(&self.oversized)
            .copied()
    }

    /// Number of populated cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(min: LngLat, max: LngLat) -> Bounds {
        let mut b = Bounds::EMPTY;
        b.extend(min);
        b.extend(max);
        b
    }

    #[test]
    fn test_point_query_finds_overlapping_boxes() {
        let boxes = [
            bbox((-72.26, -45.34), (-72.25, -45.33)),
            bbox((-72.251, -45.335), (-72.24, -45.32)),
            Bounds::EMPTY,
        ];
        let grid = SourceGrid::build(boxes.iter(), 0.005);

        let hits: Vec<usize> = grid.query_point((-72.2505, -45.3345)).collect();
        assert!(hits.contains(&0));
        assert!(hits.contains(&1));
        assert!(!hits.contains(&2));

        assert_eq!(grid.query_point((10.0, 10.0)).count(), 0);
    }

    #[test]
    fn test_wide_box_kept_out_of_cells() {
        let boxes = [
            bbox((-80.0, -50.0), (-70.0, -40.0)),
            bbox((-72.26, -45.34), (-72.25, -45.33)),
        ];
        let grid = SourceGrid::build(boxes.iter(), 0.01);

        // Only the small parcel was spread over cells
        assert!(grid.cell_count() <= 9);

        let hits: Vec<usize> = grid.query_point((-72.255, -45.335)).collect();
        assert_eq!(hits, vec![1, 0]);
        let hits: Vec<usize> = grid.query_point((-75.0, -42.0)).collect();
        assert_eq!(hits, vec![0]);
    }
}

//! Logical-to-physical addressing engine.
//!
//! Builds a flat lookup table from the segment topology and line remap:
//! `(map, row, x)` resolves to a pixel index in the global frame buffer, or
//! to nothing when the cell does not exist. The table is always rebuilt from
//! scratch so no stale entries can survive a topology change.

use crate::topology::{LINE_COUNT, LINE_PIXELS, LineRemap, MAX_ROWS, TopologyStore};

/// Sentinel for cells with no physical pixel.
pub const ABSENT: u16 = u16::MAX;

const CELLS: usize = LINE_COUNT * MAX_ROWS * LINE_PIXELS;

/// Cached `(map, row, x)` to frame-buffer index table.
///
/// A flat array with computed offsets; all queries are bounds-checked before
/// indexing. Rebuilding is O(total pixels) and idempotent.
pub struct LookupTable {
    cells: [u16; CELLS],
}

impl Default for LookupTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LookupTable {
    pub const fn new() -> Self {
        Self {
            cells: [ABSENT; CELLS],
        }
    }

    const fn cell_index(map: usize, row: usize, x: usize) -> usize {
        (map * MAX_ROWS + row) * LINE_PIXELS + x
    }

    /// Recompute the whole table from the current topology and remap.
    ///
    /// Rows lay out consecutive pixel offsets along their physical line in
    /// segment order. Even rows (0-based) run x in increasing physical order
    /// and odd rows in decreasing order; `flip_x` swaps that assignment.
    /// Rows that would overrun the line's pixel budget are truncated, the
    /// overhanging cells stay absent.
    pub fn rebuild(&mut self, topology: &TopologyStore, remap: &LineRemap) {
        self.cells.fill(ABSENT);

        for (map, map_topology) in topology.maps().iter().enumerate() {
            let Some(line) = remap.line_of(map) else {
                continue;
            };
            let base = line as usize * LINE_PIXELS;

            let mut consumed = 0usize;
            for (row, segment) in map_topology.segments.iter().enumerate() {
                let len = segment.len as usize;
                let available = LINE_PIXELS.saturating_sub(consumed);
                let laid_out = len.min(available);

                let reverse = (row % 2 == 1) != map_topology.flip_x;
                for offset in 0..laid_out {
                    let x = if reverse { len - 1 - offset } else { offset };
                    #[allow(clippy::cast_possible_truncation)]
                    let index = (base + consumed + offset) as u16;
                    self.cells[Self::cell_index(map, row, x)] = index;
                }

                consumed += laid_out;
            }
        }
    }

    /// Resolve one cell to its frame-buffer index.
    ///
    /// Out-of-range map, row, or x returns `None`; no side effects.
    pub fn resolve(&self, map: usize, row: usize, x: usize) -> Option<u16> {
        if map >= LINE_COUNT || row >= MAX_ROWS || x >= LINE_PIXELS {
            return None;
        }
        let value = self.cells[Self::cell_index(map, row, x)];
        (value != ABSENT).then_some(value)
    }
}

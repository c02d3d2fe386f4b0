//! Strip planning for grids taller than one dispatch.
//!
//! A dispatch only sees the rows of its own window, so the first and last row
//! of a window are computed against an artificial boundary. Windows therefore
//! advance by `strip_rows - 2`: consecutive windows share two rows, every
//! non-first window drops its first row and every non-last window drops its
//! last row. The kept ranges are contiguous and cover each grid row exactly
//! once, always from a window where that row has its full neighborhood.
//!
//! ```text
//! rows   0 1 2 3 4 5 6 7 8 9 ...
//! win 0  K K K K x                 strip_rows = 5, advance = 3
//! win 1        x K K K x
//! win 2              x K K K x
//! ```
//!
//! Heights and velocities stitched this way match a whole-grid pass. Normals
//! are reconstructed inside each dispatch, so the first kept row of a
//! non-first window and the last kept row of a non-last window read a
//! discarded neighbor row. Those seam rows carry approximate normals.

use std::ops::Range;

use crate::config::BatchConfig;
use crate::constants::{MIN_STRIP_ROWS, STRIP_OVERLAP_ROWS};
use crate::error::SurfaceResult;

/// Rows covered by one dispatch and the subset written back to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripWindow {
    /// First grid row uploaded.
    pub start: usize,
    /// One past the last grid row uploaded.
    pub end: usize,
    /// First grid row kept from this dispatch.
    pub keep_start: usize,
    /// One past the last grid row kept from this dispatch.
    pub keep_end: usize,
}

impl StripWindow {
    #[inline]
    pub fn rows(&self) -> usize {
        self.end - self.start
    }

    /// Kept rows in grid coordinates.
    #[inline]
    pub fn kept(&self) -> Range<usize> {
        self.keep_start..self.keep_end
    }

    /// Kept rows relative to the window start.
    #[inline]
    pub fn local_kept(&self) -> Range<usize> {
        (self.keep_start - self.start)..(self.keep_end - self.start)
    }
}

/// Ordered windows covering a grid of `total_rows` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripPlan {
    total_rows: usize,
    strip_rows: usize,
    windows: Vec<StripWindow>,
}

impl StripPlan {
    pub fn new(total_rows: usize, config: &BatchConfig) -> SurfaceResult<Self> {
        config.validate()?;

        if total_rows <= config.max_batch_rows {
            return Ok(Self {
                total_rows,
                strip_rows: total_rows,
                windows: vec![StripWindow {
                    start: 0,
                    end: total_rows,
                    keep_start: 0,
                    keep_end: total_rows,
                }],
            });
        }

        let strip_rows = (total_rows / config.strip_count).clamp(MIN_STRIP_ROWS, config.max_batch_rows);
        let advance = strip_rows - STRIP_OVERLAP_ROWS;

        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + strip_rows).min(total_rows);
            let first = start == 0;
            let last = end == total_rows;
            windows.push(StripWindow {
                start,
                end,
                keep_start: if first { start } else { start + 1 },
                keep_end: if last { end } else { end - 1 },
            });
            if last {
                break;
            }
            start += advance;
        }

        log::debug!(
            "Strip plan for {} rows: {} windows of up to {} rows",
            total_rows,
            windows.len(),
            strip_rows
        );

        Ok(Self {
            total_rows,
            strip_rows,
            windows,
        })
    }

    pub fn windows(&self) -> &[StripWindow] {
        &self.windows
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Nominal window height.
    pub fn strip_rows(&self) -> usize {
        self.strip_rows
    }

    /// Tallest window, which sizes the dispatch arena.
    pub fn max_window_rows(&self) -> usize {
        self.windows.iter().map(StripWindow::rows).max().unwrap_or(0)
    }

    #[inline]
    pub fn is_single(&self) -> bool {
        self.windows.len() == 1
    }

    /// Rows whose normals were reconstructed next to a discarded row.
    pub fn seam_rows(&self) -> Vec<usize> {
        let last = self.windows.len().saturating_sub(1);
        let mut rows = Vec::new();
        for (i, window) in self.windows.iter().enumerate() {
            if i > 0 {
                rows.push(window.keep_start);
            }
            if i < last {
                rows.push(window.keep_end - 1);
            }
        }
        rows.dedup();
        rows
    }
}

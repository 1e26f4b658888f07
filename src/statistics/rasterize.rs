//! Polygon rasterization onto a north-up grid
//!
//! Polygons are moved into pixel space first, where cell `(row, col)` is the
//! unit square `[col, col + 1) x [row, row + 1)`. Two inclusion rules are
//! supported:
//!
//! - [`InclusionRule::Centre`]: even-odd scanline fill evaluated at row
//!   centres, so a cell is selected when its centre lies inside the polygon and
//!   outside its holes.
//! - [`InclusionRule::AllTouched`]: the centre cells plus every cell crossed or
//!   touched by a ring edge.

use crate::raster::GridGeometry;
use geo::MultiPolygon;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Which cells count as belonging to a polygon
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionRule {
    /// Cell centre inside the polygon
    #[default]
    Centre,
    /// Any cell the polygon touches
    AllTouched,
}

/// A rectangular block of cells, in absolute grid indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelWindow {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl PixelWindow {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

/// Cells of one grid selected for one polygon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coverage {
    window: PixelWindow,
    mask: Array2<bool>,
}

type Ring = Vec<(f64, f64)>;

impl Coverage {
    /// A coverage selecting nothing
    #[must_use]
    pub fn empty() -> Self {
        Self {
            window: PixelWindow::default(),
            mask: Array2::from_elem((0, 0), false),
        }
    }

    /// Rasterize a polygon onto a grid.
    ///
    /// Cells outside the grid extent are never selected.
    #[must_use]
    pub fn compute(polygon: &MultiPolygon<f64>, grid: &GridGeometry, rule: InclusionRule) -> Self {
        let parts: Vec<Vec<Ring>> = polygon
            .0
            .iter()
            .map(|part| {
                std::iter::once(part.exterior())
                    .chain(part.interiors())
                    .map(|ring| {
                        ring.coords()
                            .map(|c| grid.world_to_pixel(c.x, c.y))
                            .collect::<Ring>()
                    })
                    .filter(|ring| ring.len() >= 2)
                    .collect()
            })
            .collect();

        let Some(window) = clip_window(&parts, grid) else {
            return Self::empty();
        };

        let mut coverage = Self {
            window,
            mask: Array2::from_elem((window.rows, window.cols), false),
        };

        for rings in &parts {
            coverage.fill_centres(rings);
        }

        if rule == InclusionRule::AllTouched {
            for ring in parts.iter().flatten() {
                for edge in ring.windows(2) {
                    coverage.mark_segment(edge[0], edge[1]);
                }
            }
        }

        coverage
    }

    #[must_use]
    pub const fn window(&self) -> &PixelWindow {
        &self.window
    }

    /// Number of selected cells
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.mask.iter().filter(|&&selected| selected).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// Whether an absolute `(row, col)` cell is selected
    #[must_use]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        if row < self.window.row || col < self.window.col {
            return false;
        }
        self.mask
            .get((row - self.window.row, col - self.window.col))
            .copied()
            .unwrap_or(false)
    }

    /// Selected cells as absolute `(row, col)` indices, row-major
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (row0, col0) = (self.window.row, self.window.col);
        self.mask
            .indexed_iter()
            .filter(|&(_, &selected)| selected)
            .map(move |((r, c), _)| (row0 + r, col0 + c))
    }

    /// Even-odd fill of one polygon (exterior plus holes) at row centres
    fn fill_centres(&mut self, rings: &[Ring]) {
        let mut crossings = Vec::new();

        for r in 0..self.window.rows {
            let y = (self.window.row + r) as f64 + 0.5;
            crossings.clear();

            for ring in rings {
                for edge in ring.windows(2) {
                    let ((x0, y0), (x1, y1)) = (edge[0], edge[1]);
                    if (y0 <= y && y1 > y) || (y1 <= y && y0 > y) {
                        crossings.push(x0 + (y - y0) * (x1 - x0) / (y1 - y0));
                    }
                }
            }

            crossings.sort_by(f64::total_cmp);

            for span in crossings.chunks_exact(2) {
                // Columns whose centre c + 0.5 lies in [span[0], span[1])
                let first = (span[0] - 0.5).ceil();
                let last = (span[1] - 0.5).ceil() - 1.0;
                self.mark_columns(r, first, last);
            }
        }
    }

    /// Mark every cell the segment passes through or touches
    fn mark_segment(&mut self, (x0, y0): (f64, f64), (x1, y1): (f64, f64)) {
        let (y_lo, y_hi) = (y0.min(y1), y0.max(y1));
        let row_first = (y_lo.floor() as i64).max(self.window.row as i64);
        let row_last = (y_hi.floor() as i64).min((self.window.row + self.window.rows) as i64 - 1);

        for row in row_first..=row_last {
            let band_lo = y_lo.max(row as f64);
            let band_hi = y_hi.min(row as f64 + 1.0);

            let (xa, xb) = if y1 == y0 {
                (x0.min(x1), x0.max(x1))
            } else {
                let at = |y: f64| x0 + (y - y0) * (x1 - x0) / (y1 - y0);
                let (a, b) = (at(band_lo), at(band_hi));
                (a.min(b), a.max(b))
            };

            let r = (row - self.window.row as i64) as usize;
            self.mark_columns(r, xa.floor(), xb.floor());
        }
    }

    /// Mark absolute columns `first..=last` on window row `r`, clipped to the window
    fn mark_columns(&mut self, r: usize, first: f64, last: f64) {
        let lo = (first as i64).max(self.window.col as i64);
        let hi = (last as i64).min((self.window.col + self.window.cols) as i64 - 1);
        for col in lo..=hi {
            self.mask[[r, (col - self.window.col as i64) as usize]] = true;
        }
    }
}

/// Pixel-space bounding box of all rings, clipped to the grid
fn clip_window(parts: &[Vec<Ring>], grid: &GridGeometry) -> Option<PixelWindow> {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(x, y) in parts.iter().flatten().flatten() {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
        return None;
    }

    let col_first = (min_x.floor() as i64).max(0);
    let col_last = (max_x.floor() as i64).min(grid.width as i64 - 1);
    let row_first = (min_y.floor() as i64).max(0);
    let row_last = (max_y.floor() as i64).min(grid.height as i64 - 1);

    if col_last < col_first || row_last < row_first {
        return None;
    }

    Some(PixelWindow {
        row: row_first as usize,
        col: col_first as usize,
        rows: (row_last - row_first + 1) as usize,
        cols: (col_last - col_first + 1) as usize,
    })
}

//! Arranges a post's images into an N-column table.

use crate::pdf::element::{Border, Cell, ImageElement, Placement, Table};
use crate::pdf::image::PdfImage;
use crate::style::Color;
use serde::Serialize;
use tracing::debug;

/// Padding inside every grid cell, in points.
pub const CELL_PADDING: f32 = 10.0;
/// Extra width taken off each cell before images are scaled to it.
pub const CELL_SLACK: f32 = 50.0;
/// Space above the grid.
pub const SPACING_BEFORE: f32 = 18.0;

/// A composed grid ready to be appended to a chapter.
#[derive(Debug, Clone)]
pub struct GridElement {
    pub table: Table,
    pub cell_width: f32,
    pub images_placed: usize,
    pub blank_cells: usize,
}

impl GridElement {
    pub fn rows(&self) -> usize {
        self.table.row_count()
    }

    pub fn summary(&self) -> GridSummary {
        GridSummary {
            columns: self.table.columns,
            rows: self.rows(),
            images_placed: self.images_placed,
            blank_cells: self.blank_cells,
        }
    }
}

/// Shape of a rendered grid, reported per chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridSummary {
    pub columns: usize,
    pub rows: usize,
    pub images_placed: usize,
    pub blank_cells: usize,
}

/// Builds image grids with a fixed border/background style.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageGridComposer {
    image_border: Option<Border>,
    background: Option<Color>,
}

impl ImageGridComposer {
    pub fn new(image_border: Option<Border>, background: Option<Color>) -> Self {
        Self {
            image_border,
            background,
        }
    }

    /// Width images are scaled down to:
    /// `total_width / columns − 2 × cell_padding − CELL_SLACK`.
    pub fn cell_width(columns: usize, cell_padding: f32, total_width: f32) -> f32 {
        total_width / columns.max(1) as f32 - 2.0 * cell_padding - CELL_SLACK
    }

    /// Lay `images` out in `columns` columns, in input order.
    ///
    /// `None` entries are images that could not be loaded; they get no
    /// cell. When the requested image count is not a multiple of `columns`
    /// exactly one blank cell is appended, whatever the remainder.
    pub fn compose(
        &self,
        images: Vec<Option<PdfImage>>,
        columns: usize,
        cell_padding: f32,
        total_width: f32,
    ) -> GridElement {
        let columns = columns.max(1);
        let requested = images.len();
        let cell_width = Self::cell_width(columns, cell_padding, total_width);

        let mut table = Table::new(columns);
        table.spacing_before = SPACING_BEFORE;

        let mut images_placed = 0;
        for image in images.into_iter().flatten() {
            let mut element =
                ImageElement::new(image, Placement::Centered).with_border(self.image_border);
            let natural = element.width();
            if cell_width < natural && cell_width > 0.0 {
                element.scale = cell_width / natural;
            }
            let mut cell = Cell::image(element, cell_padding);
            cell.background = self.background;
            table.add_cell(cell);
            images_placed += 1;
        }

        let mut blank_cells = 0;
        if requested % columns != 0 {
            table.add_cell(Cell::blank(cell_padding));
            blank_cells = 1;
        }

        debug!(
            "Composed grid: {} of {} images, {} columns, cell width {:.1}",
            images_placed, requested, columns, cell_width
        );
        GridElement {
            table,
            cell_width,
            images_placed,
            blank_cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn load(dir: &Path, name: &str, w: u32, h: u32) -> Option<PdfImage> {
        let path = dir.join(name);
        image::RgbImage::from_pixel(w, h, image::Rgb([0, 128, 0]))
            .save(&path)
            .unwrap();
        PdfImage::load(&path).ok()
    }

    #[test]
    fn cell_width_formula() {
        // 523 / 2 − 20 − 50
        assert!((ImageGridComposer::cell_width(2, 10.0, 523.0) - 191.5).abs() < 1e-4);
    }

    #[test]
    fn three_images_two_columns_pads_second_row() {
        let dir = tempfile::tempdir().unwrap();
        let images = (0..3).map(|i| load(dir.path(), &format!("{i}.png"), 50, 40)).collect();
        let grid = ImageGridComposer::default().compose(images, 2, CELL_PADDING, 523.0);
        assert_eq!(grid.rows(), 2);
        let rows = grid.table.rows();
        assert_eq!(rows[1].len(), 2);
        assert!(rows[1][1].is_blank());
        assert_eq!(grid.blank_cells, 1);
    }

    #[test]
    fn exact_multiple_has_no_blank_cell() {
        let dir = tempfile::tempdir().unwrap();
        let images = (0..4).map(|i| load(dir.path(), &format!("{i}.png"), 50, 40)).collect();
        let grid = ImageGridComposer::default().compose(images, 2, CELL_PADDING, 523.0);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.blank_cells, 0);
    }

    #[test]
    fn rows_are_ceil_of_count_over_columns() {
        let dir = tempfile::tempdir().unwrap();
        for (n, c) in [(2usize, 2usize), (3, 2), (5, 3), (4, 3), (7, 4), (2, 5)] {
            let images = (0..n)
                .map(|i| load(dir.path(), &format!("{n}-{c}-{i}.png"), 8, 8))
                .collect();
            let grid = ImageGridComposer::default().compose(images, c, CELL_PADDING, 523.0);
            assert_eq!(grid.rows(), n.div_ceil(c), "n={n} c={c}");
            assert_eq!(grid.blank_cells, usize::from(n % c != 0), "n={n} c={c}");
        }
    }

    #[test]
    fn large_remainder_still_gets_one_blank_cell() {
        let dir = tempfile::tempdir().unwrap();
        let images = (0..5).map(|i| load(dir.path(), &format!("{i}.png"), 8, 8)).collect();
        let grid = ImageGridComposer::default().compose(images, 4, CELL_PADDING, 523.0);
        assert_eq!(grid.table.cells.len(), 6);
        assert_eq!(grid.blank_cells, 1);
    }

    #[test]
    fn wide_images_are_scaled_down_never_up() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![
            load(dir.path(), "wide.png", 400, 200),
            load(dir.path(), "small.png", 20, 20),
        ];
        let grid = ImageGridComposer::default().compose(images, 2, CELL_PADDING, 523.0);
        let widths: Vec<f32> = grid
            .table
            .cells
            .iter()
            .filter_map(|c| c.image.as_ref().map(|i| i.width()))
            .collect();
        assert!((widths[0] - 191.5).abs() < 1e-3);
        assert_eq!(widths[1], 20.0);
    }

    #[test]
    fn missing_images_get_no_cell() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![load(dir.path(), "a.png", 8, 8), None, load(dir.path(), "b.png", 8, 8)];
        let grid = ImageGridComposer::default().compose(images, 2, CELL_PADDING, 523.0);
        assert_eq!(grid.images_placed, 2);
        // requested count 3 is odd, so one blank cell follows the two images
        assert_eq!(grid.table.cells.len(), 3);
    }

    #[test]
    fn background_and_border_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let border = Border {
            width: 10.0,
            color: Color::LIGHT_GRAY,
        };
        let composer = ImageGridComposer::new(Some(border), Some(Color::BLACK));
        let grid = composer.compose(vec![load(dir.path(), "a.png", 8, 8)], 2, CELL_PADDING, 523.0);
        let cell = &grid.table.cells[0];
        assert_eq!(cell.background, Some(Color::BLACK));
        assert_eq!(cell.image.as_ref().unwrap().border, Some(border));
    }
}

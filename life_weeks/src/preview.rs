//! Static illustrative grid used for the link-unfurl image. It is not bound
//! to any user's data.

use crate::{CellFill, Color, UNLIVED_COLOR, UNLIVED_OPACITY, WEEKS_PER_YEAR};

pub const PREVIEW_WIDTH: u32 = 1200;
pub const PREVIEW_HEIGHT: u32 = 630;
pub const PREVIEW_BACKGROUND: Color = Color::rgb(0xFA, 0xFA, 0xFA);
pub const PREVIEW_TITLE_COLOR: Color = Color::rgb(0x11, 0x11, 0x11);
pub const PREVIEW_CAPTION_COLOR: Color = Color::rgb(0x9C, 0xA3, 0xAF);

const PALETTE: [Color; 5] = [
    Color::rgb(0xFD, 0xE6, 0x8A),
    Color::rgb(0xA7, 0xF3, 0xD0),
    Color::rgb(0x93, 0xC5, 0xFD),
    Color::rgb(0xC4, 0xB5, 0xFD),
    Color::rgb(0xF9, 0xA8, 0xD4),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewCell {
    pub row: u32,
    pub col: u32,
    pub x: f64,
    pub y: f64,
    pub fill: CellFill,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreviewGrid {
    pub rows: u32,
    pub cols: u32,
    pub lived: u32,
    pub cell: f64,
    pub gap: f64,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub footer: &'static str,
    pub title_size: f64,
    pub subtitle_size: f64,
    pub footer_size: f64,
}

impl Default for PreviewGrid {
    fn default() -> Self {
        Self {
            rows: 20,
            cols: WEEKS_PER_YEAR as u32,
            lived: 15 * WEEKS_PER_YEAR as u32,
            cell: 8.0,
            gap: 2.0,
            title: "Life in Weeks",
            subtitle: "Your entire life, visualized as ~4,000 tiny boxes",
            footer: "Each box = one week of your life",
            title_size: 52.0,
            subtitle_size: 22.0,
            footer_size: 16.0,
        }
    }
}

impl PreviewGrid {
    pub fn grid_width(&self) -> f64 {
        self.cols as f64 * self.cell + self.cols.saturating_sub(1) as f64 * self.gap
    }

    pub fn grid_height(&self) -> f64 {
        self.rows as f64 * self.cell + self.rows.saturating_sub(1) as f64 * self.gap
    }

    fn block_height(&self) -> f64 {
        self.title_size + 8.0 + self.subtitle_size + 32.0 + self.grid_height()
    }

    fn block_top(&self) -> f64 {
        ((PREVIEW_HEIGHT as f64 - self.block_height()) / 2.0).max(0.0)
    }

    /// Top edge of the title line.
    pub fn title_y(&self) -> f64 {
        self.block_top()
    }

    pub fn subtitle_y(&self) -> f64 {
        self.title_y() + self.title_size + 8.0
    }

    /// Upper-left corner of the grid, centred horizontally.
    pub fn grid_origin(&self) -> (f64, f64) {
        (
            ((PREVIEW_WIDTH as f64 - self.grid_width()) / 2.0).max(0.0),
            self.subtitle_y() + self.subtitle_size + 32.0,
        )
    }

    /// Top edge of the footer line, 40 px above the bottom.
    pub fn footer_y(&self) -> f64 {
        PREVIEW_HEIGHT as f64 - 40.0 - self.footer_size
    }

    pub fn cell_fill(&self, row: u32, col: u32) -> CellFill {
        let index = row * self.cols + col;
        if index < self.lived {
            CellFill {
                color: PALETTE[(row / 4) as usize % PALETTE.len()],
                opacity: 1.0,
            }
        } else {
            CellFill {
                color: UNLIVED_COLOR,
                opacity: UNLIVED_OPACITY,
            }
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = PreviewCell> + '_ {
        let (x0, y0) = self.grid_origin();
        let pitch = self.cell + self.gap;
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).map(move |col| PreviewCell {
                row,
                col,
                x: x0 + col as f64 * pitch,
                y: y0 + row as f64 * pitch,
                fill: self.cell_fill(row, col),
            })
        })
    }
}

//! The minimal drawing interface a host provides to the layout engine.
//!
//! A layout only ever emits three primitives: a styled text run, an image and a filled
//! rectangle. Coordinates are absolute screen cells; the layout has already applied its scroll
//! offset and clipped everything to [`Surface::area`].

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Style;

use crate::render;

/// Read access to decoded pixels, independent of the image library that produced them.
pub trait RasterImage {
    /// Pixel dimensions `(width, height)` of the stored raster.
    fn dimensions(&self) -> (u32, u32);

    /// RGBA value at `(x, y)`; callers stay within [`RasterImage::dimensions`].
    fn pixel(&self, x: u32, y: u32) -> [u8; 4];
}

/// Where an image lands on screen.
///
/// `area` is the visible part. `full_rows` is the image height in rows before clipping and
/// `first_row` is how many of those rows were scrolled off above `area`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImagePlacement {
    pub area: Rect,
    pub full_rows: u32,
    pub first_row: u32,
}

pub trait Surface {
    /// The drawable region in screen cells.
    fn area(&self) -> Rect;

    /// Draws `text` starting at `(x, y)`, clipped to `max_cols` columns.
    fn draw_text(&mut self, x: u16, y: u16, text: &str, max_cols: u16, style: Style);

    fn draw_image(&mut self, image: &dyn RasterImage, placement: ImagePlacement);

    fn fill(&mut self, area: Rect, style: Style);
}

/// A [`Surface`] backed by a ratatui [`Buffer`].
///
/// Images are drawn with the upper-half-block glyph: each cell shows two vertically stacked
/// pixels (foreground = top, background = bottom), sampled nearest-neighbour from the raster.
pub struct BufferSurface<'a> {
    buf: &'a mut Buffer,
    area: Rect,
}

impl<'a> BufferSurface<'a> {
    pub fn new(buf: &'a mut Buffer, area: Rect) -> Self {
        let area = area.intersection(buf.area);
        Self { buf, area }
    }
}

impl Surface for BufferSurface<'_> {
    fn area(&self) -> Rect {
        self.area
    }

    fn draw_text(&mut self, x: u16, y: u16, text: &str, max_cols: u16, style: Style) {
        if y < self.area.y || y >= self.area.bottom() || x >= self.area.right() {
            return;
        }
        let max_cols = max_cols.min(self.area.right().saturating_sub(x));
        render::render_str_clipped(x, y, max_cols, self.buf, text, style);
    }

    fn draw_image(&mut self, image: &dyn RasterImage, placement: ImagePlacement) {
        let area = placement.area.intersection(self.area);
        let (px_w, px_h) = image.dimensions();
        if area.is_empty() || px_w == 0 || px_h == 0 || placement.full_rows == 0 {
            return;
        }

        let sub_rows = placement.full_rows as u64 * 2;
        let skip = placement.first_row as u64 + (area.y - placement.area.y) as u64;
        let left = (area.x - placement.area.x) as u64;
        let cols = placement.area.width.max(1) as u64;

        for dy in 0..area.height {
            let row = skip + dy as u64;
            let top_y = ((row * 2) * px_h as u64 / sub_rows).min(px_h as u64 - 1) as u32;
            let bot_y = ((row * 2 + 1) * px_h as u64 / sub_rows).min(px_h as u64 - 1) as u32;
            for dx in 0..area.width {
                let col = left + dx as u64;
                let px = (col * px_w as u64 / cols).min(px_w as u64 - 1) as u32;
                let top = to_color(image.pixel(px, top_y));
                let bottom = to_color(image.pixel(px, bot_y));
                if let Some(cell) = self.buf.cell_mut((area.x + dx, area.y + dy)) {
                    cell.set_symbol("▀");
                    cell.set_style(Style::default().fg(top).bg(bottom));
                }
            }
        }
    }

    fn fill(&mut self, area: Rect, style: Style) {
        let area = area.intersection(self.area);
        self.buf.set_style(area, style);
    }
}

fn to_color([r, g, b, a]: [u8; 4]) -> Color {
    if a == 0 {
        return Color::Reset;
    }
    // Premultiply against a black terminal background.
    let blend = |c: u8| ((c as u16 * a as u16) / 255) as u8;
    Color::Rgb(blend(r), blend(g), blend(b))
}

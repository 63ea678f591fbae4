use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use unicode_width::UnicodeWidthChar;

use crate::viewport::ViewportState;

pub const TAB_WIDTH: usize = 4;

pub fn render_scrollbar(area: Rect, buf: &mut Buffer, state: &ViewportState, style: Style) {
    buf.set_style(area, style);
    if area.height == 0 {
        return;
    }
    if !state.is_overflowing() || state.content_h == 0 {
        for dy in 0..area.height {
            buf.set_stringn(area.x, area.y + dy, " ", 1, style);
        }
        return;
    }

    let track_h = area.height as f64;
    let thumb_h = ((state.viewport_h as f64 / state.content_h as f64) * track_h)
        .round()
        .clamp(1.0, track_h) as u16;

    let max_y = state.max_y().max(1) as f64;
    let thumb_top = ((state.y as f64 / max_y) * (track_h - thumb_h as f64))
        .round()
        .clamp(0.0, (track_h - thumb_h as f64).max(0.0)) as u16;

    for dy in 0..area.height {
        let ch = if dy >= thumb_top && dy < thumb_top + thumb_h {
            "█"
        } else {
            "│"
        };
        buf.set_stringn(area.x, area.y + dy, ch, 1, style);
    }
}

/// Writes `input` at `(x, y)`, stopping before `max_cols` columns are exceeded.
///
/// Tabs expand to [`TAB_WIDTH`] spaces, zero-width chars are dropped, and a wide char that would
/// straddle the limit is not drawn. Returns the number of columns written.
pub fn render_str_clipped(
    x: u16,
    y: u16,
    max_cols: u16,
    buf: &mut Buffer,
    input: &str,
    style: Style,
) -> u16 {
    let max_cols = max_cols as usize;
    let mut out_cols = 0usize;
    let mut tmp = [0u8; 4];

    for ch in input.chars() {
        if ch == '\t' {
            for _ in 0..TAB_WIDTH {
                if out_cols + 1 > max_cols {
                    return out_cols as u16;
                }
                put(buf, x, y, out_cols, " ", style);
                out_cols += 1;
            }
            continue;
        }

        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if w == 0 {
            continue;
        }
        if out_cols + w > max_cols {
            return out_cols as u16;
        }

        put(buf, x, y, out_cols, ch.encode_utf8(&mut tmp), style);
        out_cols += 1;
        if w == 2 {
            put(buf, x, y, out_cols, "", style);
            out_cols += 1;
        }
    }
    out_cols as u16
}

fn put(buf: &mut Buffer, x: u16, y: u16, dx: usize, symbol: &str, style: Style) {
    let Ok(dx) = u16::try_from(dx) else {
        return;
    };
    if let Some(cell) = buf.cell_mut((x.saturating_add(dx), y)) {
        cell.set_style(style);
        cell.set_symbol(symbol);
    }
}

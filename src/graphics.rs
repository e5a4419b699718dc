use std::hash::Hasher;
use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{
    Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use rustc_hash::FxHasher;

use crate::math::{lerp, smoothstep, wrap_degrees, ViewTransform, OFFSET_PX_PER_DEGREE};
use crate::tour::Hotspot;

/// Pointer units covered by one terminal cell
pub const CELL_WIDTH_PX: f64 = 8.0;
pub const CELL_HEIGHT_PX: f64 = 16.0;

/// Skyline control points around the full circle
const SKYLINE_KNOTS: usize = 24;

/// One character cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
}

impl Cell {
    const BLANK: Cell = Cell {
        ch: ' ',
        fg: Color::Reset,
        bg: Color::Reset,
        bold: false,
    };
}

/// Rectangle in cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }

    pub fn contains(&self, col: u16, row: u16) -> bool {
        col >= self.x && col < self.right() && row >= self.y && row < self.bottom()
    }

    /// Shrinks the rectangle by `dx` columns and `dy` rows on every side
    pub fn inset(&self, dx: u16, dy: u16) -> Rect {
        Rect {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            width: self.width.saturating_sub(dx.saturating_mul(2)),
            height: self.height.saturating_sub(dy.saturating_mul(2)),
        }
    }
}

/// Off-screen character buffer, flushed to the terminal in one pass
pub struct Canvas {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Canvas {
    pub fn new(width: u16, height: u16) -> Self {
        Canvas {
            width,
            height,
            cells: vec![Cell::BLANK; usize::from(width) * usize::from(height)],
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        if (width, height) != (self.width, self.height) {
            *self = Canvas::new(width, height);
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn offset(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| usize::from(y) * usize::from(self.width) + usize::from(x))
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.offset(x, y).map(|i| &self.cells[i])
    }

    /// Writes a cell; positions outside the canvas are dropped
    pub fn put(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(i) = self.offset(x, y) {
            self.cells[i] = cell;
        }
    }

    /// Draws `text` starting at `(x, y)` and returns the column after its last character
    pub fn draw_text(
        &mut self,
        x: u16,
        y: u16,
        text: &str,
        fg: Color,
        bg: Color,
        bold: bool,
    ) -> u16 {
        let mut col = x;
        for ch in text.chars() {
            self.put(col, y, Cell { ch, fg, bg, bold });
            col = col.saturating_add(1);
        }
        col
    }

    pub fn fill(&mut self, rect: Rect, ch: char, fg: Color, bg: Color) {
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                self.put(
                    x,
                    y,
                    Cell {
                        ch,
                        fg,
                        bg,
                        bold: false,
                    },
                );
            }
        }
    }

    /// Draws a single-line border just outside `rect`
    pub fn draw_frame(&mut self, rect: Rect, color: Color) {
        let cell = |ch| Cell {
            ch,
            fg: color,
            bg: Color::Reset,
            bold: false,
        };
        let (left, top) = (rect.x.wrapping_sub(1), rect.y.wrapping_sub(1));
        let (right, bottom) = (rect.right(), rect.bottom());
        for x in rect.x..rect.right() {
            self.put(x, top, cell('─'));
            self.put(x, bottom, cell('─'));
        }
        for y in rect.y..rect.bottom() {
            self.put(left, y, cell('│'));
            self.put(right, y, cell('│'));
        }
        self.put(left, top, cell('┌'));
        self.put(right, top, cell('┐'));
        self.put(left, bottom, cell('└'));
        self.put(right, bottom, cell('┘'));
    }

    #[cfg(test)]
    pub fn row_text(&self, y: u16) -> String {
        (0..self.width)
            .filter_map(|x| self.get(x, y))
            .map(|cell| cell.ch)
            .collect()
    }

    /// Writes every cell to `out`, switching colors only where they change
    pub fn flush(&self, out: &mut impl Write) -> io::Result<()> {
        let mut style: Option<(Color, Color, bool)> = None;
        for y in 0..self.height {
            queue!(out, MoveTo(0, y))?;
            for x in 0..self.width {
                let Some(cell) = self.get(x, y) else {
                    continue;
                };
                let wanted = (cell.fg, cell.bg, cell.bold);
                if style != Some(wanted) {
                    queue!(
                        out,
                        SetAttribute(Attribute::Reset),
                        SetForegroundColor(cell.fg),
                        SetBackgroundColor(cell.bg)
                    )?;
                    if cell.bold {
                        queue!(out, SetAttribute(Attribute::Bold))?;
                    }
                    style = Some(wanted);
                }
                queue!(out, Print(cell.ch))?;
            }
        }
        queue!(out, SetAttribute(Attribute::Reset))?;
        out.flush()
    }
}

/// Procedural stand-in for a panorama image: building heights around the
/// full circle, plus a tint, both derived from the image reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Skyline {
    knots: [f64; SKYLINE_KNOTS],
    tint: (u8, u8, u8),
}

impl Skyline {
    pub fn for_image(image: &str) -> Self {
        let sample = |salt: u64| {
            let mut hasher = FxHasher::default();
            hasher.write(image.as_bytes());
            hasher.write_u64(salt);
            hasher.finish()
        };

        let mut knots = [0.0; SKYLINE_KNOTS];
        for (i, knot) in knots.iter_mut().enumerate() {
            let unit = (sample(i as u64) >> 11) as f64 / (1u64 << 53) as f64;
            *knot = 0.25 + 0.6 * unit;
        }
        let tint = sample(u64::MAX).to_le_bytes();
        Skyline {
            knots,
            tint: (120 + tint[0] % 100, 100 + tint[1] % 100, 80 + tint[2] % 100),
        }
    }

    /// Fraction of the view height covered by structures at `angle` degrees
    pub fn height_at(&self, angle: f64) -> f64 {
        let span = 360.0 / SKYLINE_KNOTS as f64;
        let position = wrap_degrees(angle) / span;
        let i = (position.floor() as usize) % SKYLINE_KNOTS;
        let next = (i + 1) % SKYLINE_KNOTS;
        lerp(self.knots[i], self.knots[next], smoothstep(position.fract()))
    }

    fn color(&self, shade: f64) -> Color {
        let (r, g, b) = self.tint;
        let scale = |c: u8| (f64::from(c) * shade).clamp(0.0, 255.0) as u8;
        Color::Rgb {
            r: scale(r),
            g: scale(g),
            b: scale(b),
        }
    }
}

/// Panorama angle shown at horizontal pixel `x` of a view centred on `center_x`
pub fn panorama_angle(x: f64, center_x: f64, transform: &ViewTransform) -> f64 {
    let image_x = (x - center_x) / transform.magnification + center_x - transform.offset_x;
    wrap_degrees(image_x / OFFSET_PX_PER_DEGREE)
}

/// Paints the scene backdrop into `rect`
pub fn draw_panorama(
    canvas: &mut Canvas,
    rect: Rect,
    skyline: &Skyline,
    transform: &ViewTransform,
) {
    let sky = Color::Rgb { r: 18, g: 24, b: 48 };
    let ground_rows = (rect.height / 6).max(1);
    let center_x = f64::from(rect.width) * CELL_WIDTH_PX / 2.0;
    let usable = f64::from(rect.height.saturating_sub(ground_rows));
    let reach = transform.magnification.sqrt();

    for col in 0..rect.width {
        let x = (f64::from(col) + 0.5) * CELL_WIDTH_PX;
        let angle = panorama_angle(x, center_x, transform);
        let rows = ((skyline.height_at(angle) * reach).min(1.0) * usable).round() as u16;
        let pillar = (angle * 4.0 / transform.magnification).floor() as i64 % 9 == 0;

        for row in 0..rect.height {
            let from_bottom = rect.height - row;
            let cell = if from_bottom <= ground_rows {
                Cell {
                    ch: '░',
                    fg: skyline.color(0.5),
                    bg: Color::Rgb { r: 30, g: 26, b: 20 },
                    bold: false,
                }
            } else if from_bottom - ground_rows <= rows {
                Cell {
                    ch: if pillar { '█' } else { '▓' },
                    fg: skyline.color(if pillar { 1.0 } else { 0.8 }),
                    bg: sky,
                    bold: false,
                }
            } else {
                Cell {
                    ch: ' ',
                    fg: Color::Reset,
                    bg: sky,
                    bold: false,
                }
            };
            canvas.put(rect.x + col, rect.y + row, cell);
        }
    }
}

/// Cell where a hotspot marker lands, or `None` when it is outside `rect`
pub fn hotspot_cell(
    rect: Rect,
    hotspot: &Hotspot,
    transform: &ViewTransform,
) -> Option<(u16, u16)> {
    let col = f64::from(rect.x)
        + hotspot.x / 100.0 * f64::from(rect.width)
        + transform.hotspot_shift_x / CELL_WIDTH_PX;
    let row = f64::from(rect.y) + hotspot.y / 100.0 * f64::from(rect.height);
    let (col, row) = (col.floor(), row.floor());
    if col < f64::from(rect.x)
        || col >= f64::from(rect.right())
        || row >= f64::from(rect.bottom())
    {
        return None;
    }
    Some((col as u16, row as u16))
}

/// Draws marker `index` (shown one-based) at `(col, row)`
pub fn draw_hotspot(canvas: &mut Canvas, col: u16, row: u16, index: usize, hotspot: &Hotspot) {
    let (glyph, color) = match hotspot.target {
        Some(_) => ('◆', Color::Yellow),
        None => ('●', Color::Cyan),
    };
    let label = format!("{glyph}{}", index + 1);
    canvas.draw_text(col, row, &label, color, Color::Black, true);
}

/// Title and description in a box above the marker, kept inside `rect`
pub fn draw_tooltip(canvas: &mut Canvas, rect: Rect, col: u16, row: u16, hotspot: &Hotspot) {
    let width = hotspot
        .title
        .chars()
        .count()
        .max(hotspot.description.chars().count())
        .min(usize::from(rect.width.saturating_sub(2))) as u16
        + 2;
    let x = col
        .saturating_sub(width / 2)
        .clamp(rect.x, rect.right().saturating_sub(width).max(rect.x));
    let y = if row >= rect.y + 2 { row - 2 } else { row + 1 };

    let bg = Color::Rgb { r: 0, g: 0, b: 0 };
    canvas.fill(Rect::new(x, y, width, 2), ' ', Color::White, bg);
    let clip = |text: &str| text.chars().take(usize::from(width - 2)).collect::<String>();
    canvas.draw_text(x + 1, y, &clip(&hotspot.title), Color::White, bg, true);
    canvas.draw_text(x + 1, y + 1, &clip(&hotspot.description), Color::Grey, bg, false);
}

//! Raster primitives used by the drawing builtins.
//!
//! All coordinates arrive as script integers and may be anywhere in the
//! `i32` range. Work is always bounded by the visible screen, so a single
//! call with extreme arguments cannot stall a run.

use crate::framebuffer::{PixelBuffer, HEIGHT, WIDTH};
use embedded_graphics::mono_font::ascii::{FONT_4X6, FONT_5X7, FONT_8X13};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{Drawable, Point};
use embedded_graphics::text::{Baseline, Text};

/// Lines longer than this along their major axis are clipped before rasterizing.
const MAX_UNCLIPPED_LINE: i64 = 1 << 14;

/// Outlines with a larger radius use the screen-scan fallback instead of
/// the midpoint walk.
const MAX_MIDPOINT_RADIUS: i64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSize {
    Small,
    Medium,
    Large,
}

impl FontSize {
    /// Script font index; out-of-range values clamp to the nearest font.
    pub fn from_index(index: i32) -> Self {
        match index {
            i32::MIN..=0 => FontSize::Small,
            1 => FontSize::Medium,
            _ => FontSize::Large,
        }
    }

    pub fn mono_font(self) -> &'static MonoFont<'static> {
        match self {
            FontSize::Small => &FONT_4X6,
            FontSize::Medium => &FONT_5X7,
            FontSize::Large => &FONT_8X13,
        }
    }
}

/// Stamps a square brush spanning `half` pixels on each side of (cx, cy).
pub fn apply_brush(pixels: &mut PixelBuffer, cx: i64, cy: i64, half: i64, on: bool) {
    let y_from = (cy - half).max(0);
    let y_to = (cy + half).min(HEIGHT as i64 - 1);
    let x_from = (cx - half).max(0);
    let x_to = (cx + half).min(WIDTH as i64 - 1);

    for y in y_from..=y_to {
        for x in x_from..=x_to {
            pixels.set(x, y, on);
        }
    }
}

/// Bresenham line from (x0, y0) to (x1, y1) drawn with a square brush.
pub fn draw_line(
    pixels: &mut PixelBuffer,
    (x0, y0): (i64, i64),
    (x1, y1): (i64, i64),
    thickness: i32,
    on: bool,
) {
    let half = (thickness.max(1) / 2) as i64;

    // Nothing within brush reach of the screen
    if x0.max(x1) + half < 0
        || y0.max(y1) + half < 0
        || x0.min(x1) - half >= WIDTH as i64
        || y0.min(y1) - half >= HEIGHT as i64
    {
        return;
    }

    let ((x0, y0), (x1, y1)) = if (x1 - x0).abs().max((y1 - y0).abs()) > MAX_UNCLIPPED_LINE {
        let margin = half as f64 + 1.0;
        match clip_segment(
            (x0 as f64, y0 as f64),
            (x1 as f64, y1 as f64),
            (-margin, -margin),
            (WIDTH as f64 - 1.0 + margin, HEIGHT as f64 - 1.0 + margin),
        ) {
            Some(clipped) => clipped,
            None => return,
        }
    } else {
        ((x0, y0), (x1, y1))
    };

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut cx, mut cy) = (x0, y0);

    loop {
        apply_brush(pixels, cx, cy, half, on);
        if cx == x1 && cy == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            cx += sx;
        }
        if e2 <= dx {
            err += dx;
            cy += sy;
        }
    }
}

/// Liang-Barsky clip of a segment against an axis-aligned box, rounded
/// back to integer endpoints.
fn clip_segment(
    (x0, y0): (f64, f64),
    (x1, y1): (f64, f64),
    (min_x, min_y): (f64, f64),
    (max_x, max_y): (f64, f64),
) -> Option<((i64, i64), (i64, i64))> {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;

    for (p, q) in [
        (-dx, x0 - min_x),
        (dx, max_x - x0),
        (-dy, y0 - min_y),
        (dy, max_y - y0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let start = ((x0 + t0 * dx).round() as i64, (y0 + t0 * dy).round() as i64);
    let end = ((x0 + t1 * dx).round() as i64, (y0 + t1 * dy).round() as i64);
    Some((start, end))
}

/// Rectangle covering x..x+w-1 by y..y+h-1. Outlines only set pixels on
/// the rectangle's own edges, even when those edges are off screen.
pub fn draw_rect(
    pixels: &mut PixelBuffer,
    (x, y): (i64, i64),
    (w, h): (i64, i64),
    filled: bool,
    on: bool,
) {
    if w <= 0 || h <= 0 {
        return;
    }
    let (left, top) = (x, y);
    let (right, bottom) = (x + w - 1, y + h - 1);

    for py in top.max(0)..=bottom.min(HEIGHT as i64 - 1) {
        for px in left.max(0)..=right.min(WIDTH as i64 - 1) {
            if filled || px == left || px == right || py == top || py == bottom {
                pixels.set(px, py, on);
            }
        }
    }
}

/// Axis-aligned ellipse centered on (cx, cy) with radii (rx, ry).
///
/// Filled ellipses test every covered screen pixel against
/// `x²·ry² + y²·rx² <= rx²·ry²`; outlines use the midpoint algorithm.
pub fn draw_ellipse(
    pixels: &mut PixelBuffer,
    (cx, cy): (i64, i64),
    (rx, ry): (i64, i64),
    filled: bool,
    on: bool,
) {
    if rx == 0 && ry == 0 {
        pixels.set(cx, cy, on);
        return;
    }

    if filled {
        fill_ellipse(pixels, (cx, cy), (rx, ry), on);
    } else if rx.abs().max(ry.abs()) <= MAX_MIDPOINT_RADIUS {
        outline_ellipse_midpoint(pixels, (cx, cy), (rx, ry), on);
    } else {
        outline_ellipse_scan(pixels, (cx, cy), (rx, ry), on);
    }
}

fn fill_ellipse(pixels: &mut PixelBuffer, (cx, cy): (i64, i64), (rx, ry): (i64, i64), on: bool) {
    let rx2 = rx as i128 * rx as i128;
    let ry2 = ry as i128 * ry as i128;

    // Offsets from the center, limited to the screen
    let y_from = (-ry).max(-cy);
    let y_to = ry.min(HEIGHT as i64 - 1 - cy);
    let x_from = (-rx).max(-cx);
    let x_to = rx.min(WIDTH as i64 - 1 - cx);

    for y in y_from..=y_to {
        for x in x_from..=x_to {
            let inside = if rx2 > 0 && ry2 > 0 {
                let (x, y) = (x as i128, y as i128);
                x * x * ry2 + y * y * rx2 <= rx2 * ry2
            } else if rx == 0 {
                x == 0
            } else {
                y == 0
            };
            if inside {
                pixels.set(cx + x, cy + y, on);
            }
        }
    }
}

fn outline_ellipse_midpoint(
    pixels: &mut PixelBuffer,
    (cx, cy): (i64, i64),
    (rx, ry): (i64, i64),
    on: bool,
) {
    let rx2 = (rx * rx) as f64;
    let ry2 = (ry * ry) as f64;

    let mut plot = |px: i64, py: i64| {
        pixels.set(cx + px, cy + py, on);
        pixels.set(cx - px, cy + py, on);
        pixels.set(cx + px, cy - py, on);
        pixels.set(cx - px, cy - py, on);
    };

    let mut x: i64 = 0;
    let mut y: i64 = ry;

    // Region 1: slope shallower than -1
    let mut d1 = ry2 - rx2 * ry as f64 + 0.25 * rx2;
    while ry2 * (x as f64) < rx2 * (y as f64) {
        plot(x, y);
        if d1 < 0.0 {
            d1 += ry2 * (2 * x + 3) as f64;
        } else {
            d1 += ry2 * (2 * x + 3) as f64 + rx2 * (-2 * y + 2) as f64;
            y -= 1;
        }
        x += 1;
    }

    // Region 2
    let (xf, yf) = (x as f64, y as f64);
    let mut d2 = ry2 * (xf + 0.5) * (xf + 0.5) + rx2 * (yf - 1.0) * (yf - 1.0) - rx2 * ry2;
    while y >= 0 {
        plot(x, y);
        if d2 > 0.0 {
            d2 += rx2 * (-2 * y + 3) as f64;
        } else {
            d2 += ry2 * (2 * x + 2) as f64 + rx2 * (-2 * y + 3) as f64;
            x += 1;
        }
        y -= 1;
    }
}

/// Outline for very large radii: every on-screen pixel inside the ellipse
/// with a 4-neighbour outside it.
fn outline_ellipse_scan(
    pixels: &mut PixelBuffer,
    (cx, cy): (i64, i64),
    (rx, ry): (i64, i64),
    on: bool,
) {
    if rx <= 0 || ry <= 0 {
        return;
    }
    let (rx, ry) = (rx as f64, ry as f64);
    let inside = |x: i64, y: i64| {
        let nx = (x - cx) as f64 / rx;
        let ny = (y - cy) as f64 / ry;
        nx * nx + ny * ny <= 1.0
    };

    for y in 0..HEIGHT as i64 {
        for x in 0..WIDTH as i64 {
            if inside(x, y)
                && (!inside(x - 1, y)
                    || !inside(x + 1, y)
                    || !inside(x, y - 1)
                    || !inside(x, y + 1))
            {
                pixels.set(x, y, on);
            }
        }
    }
}

/// Renders `text` with its top-left corner at (x, y). Only glyph pixels
/// are touched; there is no background fill.
pub fn draw_text(pixels: &mut PixelBuffer, text: &str, (x, y): (i64, i64), font: FontSize, on: bool) {
    if text.is_empty() {
        return;
    }
    let mono = font.mono_font();
    let advance = (mono.character_size.width + mono.character_spacing) as i64;
    let line_height = mono.character_size.height as i64;

    let longest_line = text.split('\n').map(|l| l.chars().count()).max().unwrap_or(0) as i64;
    let line_count = text.split('\n').count() as i64;

    if x >= WIDTH as i64
        || y >= HEIGHT as i64
        || x + longest_line * advance <= 0
        || y + line_count * line_height <= 0
    {
        return;
    }

    let color = if on { BinaryColor::On } else { BinaryColor::Off };
    let style = MonoTextStyle::new(mono, color);
    // Within the culling bounds above both coordinates fit in i32.
    let origin = Point::new(x as i32, y as i32);
    // Drawing into a PixelBuffer is infallible.
    let _ = Text::with_baseline(text, origin, style, Baseline::Top).draw(pixels);
}

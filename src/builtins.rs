//! The fixed set of functions scripts can call.

use crate::drawing::{self, FontSize};
use crate::framebuffer::PixelBuffer;
use crate::value::Arg;
use std::ops::RangeInclusive;
use tracing::trace;

pub const STRING_BUFFER_SLOTS: usize = 256;

/// Scratch area for the legacy `putc_oled` / `puts_oled` idiom: scripts
/// store character codes slot by slot, then print a prefix of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringBuffer {
    slots: [i32; STRING_BUFFER_SLOTS],
}

impl StringBuffer {
    pub fn new() -> Self {
        Self {
            slots: [0; STRING_BUFFER_SLOTS],
        }
    }

    /// Slots outside the buffer are ignored.
    pub fn put(&mut self, slot: i32, code: i32) {
        if let Ok(slot) = usize::try_from(slot) {
            if let Some(cell) = self.slots.get_mut(slot) {
                *cell = code;
            }
        }
    }

    /// The first `length` slots as text. Empty slots and slots past the end
    /// of the buffer read as spaces.
    pub fn text(&self, length: i32) -> String {
        let length = usize::try_from(length).unwrap_or(0).min(STRING_BUFFER_SLOTS);
        self.slots[..length]
            .iter()
            .map(|&code| match code {
                0 => ' ',
                // Codes behave like UTF-16 units; lone surrogates have no char.
                code => char::from_u32(code as u32 & 0xFFFF).unwrap_or('?'),
            })
            .collect()
    }
}

impl Default for StringBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cls,
    Pixel,
    Line,
    Rect,
    Circle,
    Putc,
    Puts,
    Text,
    Abs,
    Min,
    Max,
}

impl Builtin {
    pub const ALL: [Builtin; 11] = [
        Builtin::Cls,
        Builtin::Pixel,
        Builtin::Line,
        Builtin::Rect,
        Builtin::Circle,
        Builtin::Putc,
        Builtin::Puts,
        Builtin::Text,
        Builtin::Abs,
        Builtin::Min,
        Builtin::Max,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Cls => "cls_oled",
            Builtin::Pixel => "pixel_oled",
            Builtin::Line => "line_oled",
            Builtin::Rect => "rect_oled",
            Builtin::Circle => "circle_oled",
            Builtin::Putc => "putc_oled",
            Builtin::Puts => "puts_oled",
            Builtin::Text => "text_oled",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
        }
    }

    pub fn arity(self) -> RangeInclusive<usize> {
        match self {
            Builtin::Cls | Builtin::Abs => 1..=1,
            Builtin::Putc | Builtin::Min | Builtin::Max => 2..=2,
            Builtin::Pixel => 3..=3,
            Builtin::Puts => 4..=5,
            Builtin::Circle | Builtin::Text => 5..=5,
            Builtin::Line | Builtin::Rect => 6..=6,
        }
    }

    pub fn usage(self) -> &'static str {
        match self {
            Builtin::Cls => "cls_oled(color)",
            Builtin::Pixel => "pixel_oled(x, y, color)",
            Builtin::Line => "line_oled(x, y, tox, toy, thickness, color)",
            Builtin::Rect => "rect_oled(x, y, width, height, fill, color)",
            Builtin::Circle => "circle_oled(x, y, radius, fill, color)",
            Builtin::Putc => "putc_oled(position, ascii)",
            Builtin::Puts => "puts_oled(x, y, font, length_or_\"text\", color)",
            Builtin::Text => "text_oled(x, y, font, color, \"text\")",
            Builtin::Abs => "abs(value)",
            Builtin::Min => "min(a, b)",
            Builtin::Max => "max(a, b)",
        }
    }

    /// Human readable argument count for error messages.
    pub fn arity_description(self) -> String {
        let arity = self.arity();
        let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
        if arity.start() == arity.end() {
            format!("{} {}", arity.start(), plural(*arity.start()))
        } else {
            format!("{} or {} arguments", arity.start(), arity.end())
        }
    }

    /// Runs the builtin. `args` must already satisfy [`Builtin::arity`].
    pub fn call(self, args: &[Arg], pixels: &mut PixelBuffer, strings: &mut StringBuffer) -> i32 {
        trace!(builtin = self.name(), args = args.len(), "builtin call");
        let num = |i: usize| args.get(i).map_or(0, Arg::as_number) as i64;
        let flag = |i: usize| args.get(i).is_some_and(Arg::is_truthy);

        match self {
            Builtin::Cls => {
                pixels.fill(flag(0));
                0
            }
            Builtin::Pixel => {
                pixels.set(num(0), num(1), flag(2));
                0
            }
            Builtin::Line => {
                drawing::draw_line(
                    pixels,
                    (num(0), num(1)),
                    (num(2), num(3)),
                    num(4) as i32,
                    flag(5),
                );
                0
            }
            Builtin::Rect => {
                drawing::draw_rect(pixels, (num(0), num(1)), (num(2), num(3)), flag(4), flag(5));
                0
            }
            Builtin::Circle => {
                let radius = num(2);
                drawing::draw_ellipse(pixels, (num(0), num(1)), (radius, radius), flag(3), flag(4));
                0
            }
            Builtin::Putc => {
                strings.put(num(0) as i32, num(1) as i32);
                0
            }
            Builtin::Puts => {
                let font = FontSize::from_index(num(2) as i32);
                let on = if args.len() >= 5 { flag(4) } else { true };
                let text = match args.get(3).and_then(Arg::as_text) {
                    Some(literal) => literal.to_string(),
                    None => strings.text(num(3) as i32),
                };
                drawing::draw_text(pixels, &text, (num(0), num(1)), font, on);
                0
            }
            Builtin::Text => {
                let font = FontSize::from_index(num(2) as i32);
                // A non-string fifth argument draws nothing.
                let text = args.get(4).and_then(Arg::as_text).unwrap_or("");
                drawing::draw_text(pixels, text, (num(0), num(1)), font, flag(3));
                0
            }
            Builtin::Abs => (num(0) as i32).wrapping_abs(),
            Builtin::Min => num(0).min(num(1)) as i32,
            Builtin::Max => num(0).max(num(1)) as i32,
        }
    }
}

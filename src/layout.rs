//! Word wrapping for quotes and translation of text offsets into screen
//! coordinates.
//!
//! All lengths and offsets are counted in `char`s. A wrapped line never
//! contains the separator it was broken at: one space (or newline) is
//! consumed between consecutive lines, so for any non-empty text
//! `sum(lengths) + lengths.len() - 1 == text.chars().count()`.

use std::ops::Range;

/// Returns the lengths of the lines `text` wraps into when printed `width`
/// columns wide.
///
/// Lines break at the last space at or before the width boundary, and always
/// at a newline. A word that is longer than `width` is kept whole on a single
/// overflowing line.
pub fn word_wrap(text: &str, width: usize) -> Vec<usize> {
    let chars: Vec<char> = text.chars().collect();
    wrap_chars(&chars, width)
}

fn is_separator(c: char) -> bool {
    c == ' ' || c == '\n'
}

fn wrap_chars(chars: &[char], width: usize) -> Vec<usize> {
    let width = width.max(1);
    let mut lengths = Vec::new();

    if chars.is_empty() {
        return lengths;
    }

    let mut rest = chars;
    loop {
        let window = &rest[..rest.len().min(width + 1)];

        if let Some(newline) = window.iter().position(|&c| c == '\n') {
            lengths.push(newline);
            rest = &rest[newline + 1..];
            continue;
        }

        if rest.len() <= width {
            break;
        }

        match window.iter().rposition(|&c| c == ' ') {
            Some(end) => {
                lengths.push(end);
                rest = &rest[end + 1..];
            }
            None => {
                // No place to break inside the window: the whole word overflows.
                let end = rest
                    .iter()
                    .position(|&c| is_separator(c))
                    .unwrap_or(rest.len());
                lengths.push(end);
                if end == rest.len() {
                    return lengths;
                }
                rest = &rest[end + 1..];
            }
        }
    }

    // Text ending in a separator still gets its (empty) last line, which keeps
    // the trailing cursor position addressable.
    lengths.push(rest.len());
    lengths
}

/// Translates a text offset into `(column, row)` for the wrapped line lengths.
///
/// An offset equal to a line's length addresses the separator slot at the end
/// of that line. Offsets past the end of the text stay on the last row.
pub fn screen_coords(lengths: &[usize], offset: usize) -> (usize, usize) {
    let mut offset = offset;
    let mut row = 0;

    for (y, &length) in lengths.iter().enumerate() {
        row = y;
        if offset <= length || y + 1 == lengths.len() {
            break;
        }
        offset -= length + 1;
    }

    (offset, row)
}

/// Wrapped layout of one quote at a given width, with the screen coordinate
/// of every offset precomputed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuoteLayout {
    width: usize,
    line_lengths: Vec<usize>,
    coords: Vec<(usize, usize)>,
}

impl QuoteLayout {
    pub fn new(text: &str, width: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let line_lengths = wrap_chars(&chars, width);
        let coords = (0..=chars.len())
            .map(|offset| screen_coords(&line_lengths, offset))
            .collect();

        Self {
            width,
            line_lengths,
            coords,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn line_lengths(&self) -> &[usize] {
        &self.line_lengths
    }

    /// Number of screen rows the quote occupies.
    pub fn height(&self) -> usize {
        self.line_lengths.len()
    }

    /// Screen coordinate of `offset`, clamped to the end of the text.
    pub fn coords(&self, offset: usize) -> (usize, usize) {
        match self.coords.get(offset) {
            Some(&coord) => coord,
            None => self.coords.last().copied().unwrap_or((0, 0)),
        }
    }

    /// Whether `offset` is the space or newline dropped where a line breaks.
    pub fn is_line_break(&self, offset: usize) -> bool {
        if offset + 1 >= self.coords.len() {
            return false;
        }
        let (x, y) = self.coords(offset);
        self.line_lengths.get(y) == Some(&x)
    }

    /// Character ranges of each wrapped line, in row order.
    pub fn lines(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.line_lengths.iter().scan(0, |start, &length| {
            let range = *start..*start + length;
            *start += length + 1;
            Some(range)
        })
    }
}

//! Logical key tokens and their decoding from crossterm events or raw bytes.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

const ESC: u8 = 0x1b;
const CTRL_C: u8 = 0x03;
const BS: u8 = 0x08;
const DEL: u8 = 0x7f;

/// Non-printable keys the race reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SpecialKey {
    ArrowLeft,
    ArrowRight,
    Backspace,
    Escape,
    Resize,
    Interrupt,
}

/// A single logical keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A typed character. Enter arrives as `'\n'` and tab as `'\t'`.
    Printable(char),
    Special(SpecialKey),
}

/// Translates a crossterm event, returning `None` for anything we ignore.
pub fn from_event(event: &Event) -> Option<Key> {
    match event {
        Event::Key(key) => from_key_event(key),
        Event::Resize(_, _) => Some(Key::Special(SpecialKey::Resize)),
        _ => None,
    }
}

pub fn from_key_event(key: &KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Key::Special(SpecialKey::Interrupt)),
            KeyCode::Char('h') => Some(Key::Special(SpecialKey::Backspace)),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char(c) => Some(Key::Printable(c)),
        KeyCode::Enter => Some(Key::Printable('\n')),
        KeyCode::Tab => Some(Key::Printable('\t')),
        KeyCode::Backspace => Some(Key::Special(SpecialKey::Backspace)),
        KeyCode::Left => Some(Key::Special(SpecialKey::ArrowLeft)),
        KeyCode::Right => Some(Key::Special(SpecialKey::ArrowRight)),
        KeyCode::Esc => Some(Key::Special(SpecialKey::Escape)),
        _ => None,
    }
}

/// Result of decoding the head of a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A key made of the first `usize` bytes.
    Key(Key, usize),
    /// The first `usize` bytes form nothing we understand and should be dropped.
    Discard(usize),
    /// More bytes are needed before anything can be decided.
    Incomplete,
}

/// Decodes raw terminal input bytes into keys.
///
/// Multi-byte UTF-8 sequences are reassembled into one `Printable`, and the
/// usual escape sequences for the arrow keys are recognised. `at_end` tells
/// the decoder that no further bytes will arrive for now, which resolves a
/// lone ESC into `Escape` and drops a truncated UTF-8 sequence.
pub fn decode(bytes: &[u8], at_end: bool) -> Decoded {
    let Some(&first) = bytes.first() else {
        return Decoded::Incomplete;
    };

    match first {
        ESC => decode_escape(bytes, at_end),
        CTRL_C => Decoded::Key(Key::Special(SpecialKey::Interrupt), 1),
        BS | DEL => Decoded::Key(Key::Special(SpecialKey::Backspace), 1),
        b'\r' | b'\n' => Decoded::Key(Key::Printable('\n'), 1),
        b'\t' => Decoded::Key(Key::Printable('\t'), 1),
        0x00..=0x1f => Decoded::Discard(1),
        0x20..=0x7e => Decoded::Key(Key::Printable(first as char), 1),
        _ => decode_utf8(bytes, at_end),
    }
}

fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

fn decode_utf8(bytes: &[u8], at_end: bool) -> Decoded {
    let Some(width) = utf8_width(bytes[0]) else {
        return Decoded::Discard(1);
    };

    // Stop at the first byte that is not a continuation byte.
    let available = bytes.len().min(width);
    if let Some(bad) = bytes[1..available].iter().position(|b| b & 0xc0 != 0x80) {
        return Decoded::Discard(1 + bad);
    }

    if available < width {
        return if at_end {
            Decoded::Discard(available)
        } else {
            Decoded::Incomplete
        };
    }

    match std::str::from_utf8(&bytes[..width])
        .ok()
        .and_then(|s| s.chars().next())
    {
        Some(c) => Decoded::Key(Key::Printable(c), width),
        None => Decoded::Discard(width),
    }
}

fn decode_escape(bytes: &[u8], at_end: bool) -> Decoded {
    match bytes.get(1) {
        None if at_end => Decoded::Key(Key::Special(SpecialKey::Escape), 1),
        None => Decoded::Incomplete,
        Some(b'[') | Some(b'O') => decode_sequence(bytes, at_end),
        // ESC followed by anything else is a lone escape press.
        Some(_) => Decoded::Key(Key::Special(SpecialKey::Escape), 1),
    }
}

fn decode_sequence(bytes: &[u8], at_end: bool) -> Decoded {
    // Parameters and intermediates run until a final byte in 0x40..=0x7e.
    let Some(end) = bytes[2..].iter().position(|b| (0x40..=0x7e).contains(b)) else {
        return if at_end {
            Decoded::Discard(bytes.len())
        } else {
            Decoded::Incomplete
        };
    };

    let len = 2 + end + 1;
    let key = match (&bytes[2..len - 1], bytes[len - 1]) {
        ([], b'D') | (b"1", b'D') => Some(SpecialKey::ArrowLeft),
        ([], b'C') | (b"1", b'C') => Some(SpecialKey::ArrowRight),
        _ => None,
    };

    match key {
        Some(special) => Decoded::Key(Key::Special(special), len),
        None => Decoded::Discard(len),
    }
}

/// Buffers raw bytes between reads and hands out complete keys.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    pending: Vec<u8>,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns the next complete key, skipping over bytes that decode to
    /// nothing.
    pub fn next_key(&mut self, at_end: bool) -> Option<Key> {
        loop {
            match decode(&self.pending, at_end) {
                Decoded::Key(key, len) => {
                    self.pending.drain(..len);
                    return Some(key);
                }
                Decoded::Discard(len) => {
                    self.pending.drain(..len);
                }
                Decoded::Incomplete => return None,
            }
        }
    }
}

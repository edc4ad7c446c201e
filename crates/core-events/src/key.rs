//! Logical key identities.
//!
//! `Key::Rune` is the printable path: the grapheme travels in
//! [`KeyEvent::text`](crate::KeyEvent). Everything else is a named key with
//! empty text. C0 control chords surface as `Key::Ctrl(base)` where `base`
//! is the uppercase letter (or punctuation) of the chord, with
//! [`ModMask::CTRL`](crate::ModMask) set, except Tab, Enter and Backspace,
//! which keep their named forms because terminals report them as such.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable input; the grapheme cluster is carried by the event text.
    Rune,
    /// A C0 control chord: `Ctrl('A')` for 0x01 through `Ctrl('Z')` for
    /// 0x1A, and the punctuation chords (`Ctrl('[')` is reported as `Esc`).
    Ctrl(char),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Enter,
    Tab,
    Backtab,
    Backspace,
    Esc,
    /// Function key, 1-based (`F(1)` ..= `F(64)`).
    F(u8),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Rune => write!(f, "Rune"),
            Key::Ctrl(c) => write!(f, "Ctrl-{c}"),
            Key::F(n) => write!(f, "F{n}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(Key::Ctrl('C').to_string(), "Ctrl-C");
        assert_eq!(Key::F(12).to_string(), "F12");
        assert_eq!(Key::PageUp.to_string(), "PageUp");
    }
}

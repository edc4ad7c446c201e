//! Cell style: colors, attribute mask, underline sub-style, hyperlink.
//!
//! `Style` is a value type; every mutator consumes and returns a new value
//! so styles can be chained and shared freely. The hyperlink spills to an
//! `Arc` so the common (unlinked) case stays two words of color plus a mask.

use std::sync::Arc;

use crate::color::Color;

bitflags::bitflags! {
    /// Boolean text attributes. Underline is not a flag here: it carries a
    /// sub-style and an optional color of its own.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct AttrMask: u16 {
        const BOLD          = 1 << 0;
        const BLINK         = 1 << 1;
        const REVERSE       = 1 << 2;
        const DIM           = 1 << 3;
        const ITALIC        = 1 << 4;
        const STRIKETHROUGH = 1 << 5;
    }
}

/// Underline sub-style (SGR 4, or `4:n` on terminals with styled
/// underlines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    Double,
    Curly,
    Dotted,
    Dashed,
}

impl UnderlineStyle {
    /// The `n` of `SGR 4:n`.
    pub fn sgr_param(self) -> u8 {
        match self {
            UnderlineStyle::None => 0,
            UnderlineStyle::Single => 1,
            UnderlineStyle::Double => 2,
            UnderlineStyle::Curly => 3,
            UnderlineStyle::Dotted => 4,
            UnderlineStyle::Dashed => 5,
        }
    }
}

/// OSC 8 hyperlink target. An empty `id` lets the terminal group cells by
/// URI alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hyperlink {
    pub uri: String,
    pub id: String,
}

/// Complete display style of one cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: AttrMask,
    pub underline: UnderlineStyle,
    pub underline_color: Color,
    pub link: Option<Arc<Hyperlink>>,
}

impl Style {
    pub fn foreground(mut self, c: Color) -> Self {
        self.fg = c;
        self
    }

    pub fn background(mut self, c: Color) -> Self {
        self.bg = c;
        self
    }

    fn set_attr(mut self, attr: AttrMask, on: bool) -> Self {
        self.attrs.set(attr, on);
        self
    }

    pub fn bold(self, on: bool) -> Self {
        self.set_attr(AttrMask::BOLD, on)
    }

    pub fn blink(self, on: bool) -> Self {
        self.set_attr(AttrMask::BLINK, on)
    }

    pub fn reverse(self, on: bool) -> Self {
        self.set_attr(AttrMask::REVERSE, on)
    }

    pub fn dim(self, on: bool) -> Self {
        self.set_attr(AttrMask::DIM, on)
    }

    pub fn italic(self, on: bool) -> Self {
        self.set_attr(AttrMask::ITALIC, on)
    }

    pub fn strikethrough(self, on: bool) -> Self {
        self.set_attr(AttrMask::STRIKETHROUGH, on)
    }

    pub fn underline(mut self, style: UnderlineStyle) -> Self {
        self.underline = style;
        self
    }

    pub fn underline_color(mut self, c: Color) -> Self {
        self.underline_color = c;
        self
    }

    /// Attach a hyperlink. An empty URI detaches.
    pub fn link(mut self, uri: &str, id: &str) -> Self {
        self.link = if uri.is_empty() {
            None
        } else {
            Some(Arc::new(Hyperlink {
                uri: uri.to_string(),
                id: id.to_string(),
            }))
        };
        self
    }
}

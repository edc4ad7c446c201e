//! Terminal color model.
//!
//! Design invariants:
//! * `Color::Default` is the zero value and renders as the terminal-default
//!   SGR (39 / 49).
//! * `Color::Inherit` is not a color: it instructs the renderer to keep
//!   whatever the channel already resolved to. It never reaches the wire.
//! * `Color::Reset` forces a full SGR 0 before any other attribute of the
//!   style that carries it.
//! * Palette indices 0–15 follow ECMA/ANSI ordering; 16–231 are the XTerm
//!   6×6×6 cube; 232–255 the grayscale ramp.

use crate::palette::palette_rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default for the channel (SGR 39 / 49).
    #[default]
    Default,
    /// Revert every attribute to terminal defaults (SGR 0) first.
    Reset,
    /// Keep whatever the channel currently has; resolved by the renderer
    /// against the previously emitted value.
    Inherit,
    /// 256-color palette index.
    Palette(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Concrete RGB components, resolving palette entries through the XTerm
    /// table. The sentinels (`Default`, `Reset`, `Inherit`) have none.
    pub fn rgb_components(self) -> Option<(u8, u8, u8)> {
        match self {
            Color::Palette(idx) => Some(palette_rgb(idx)),
            Color::Rgb(r, g, b) => Some((r, g, b)),
            _ => None,
        }
    }

    /// True for values the wire can express directly (palette or RGB).
    pub fn is_concrete(self) -> bool {
        matches!(self, Color::Palette(_) | Color::Rgb(..))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero_value() {
        assert_eq!(Color::default(), Color::Default);
    }

    #[test]
    fn palette_resolves_through_table() {
        // ANSI red.
        assert_eq!(Color::Palette(1).rgb_components(), Some((205, 0, 0)));
        // Cube corner: index 16 is black, 231 is white.
        assert_eq!(Color::Palette(16).rgb_components(), Some((0, 0, 0)));
        assert_eq!(Color::Palette(231).rgb_components(), Some((255, 255, 255)));
    }

    #[test]
    fn sentinels_have_no_components() {
        assert_eq!(Color::Default.rgb_components(), None);
        assert_eq!(Color::Reset.rgb_components(), None);
        assert_eq!(Color::Inherit.rgb_components(), None);
    }
}

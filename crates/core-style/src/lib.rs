//! Color and style value types shared by the cell buffer and the renderer.

mod color;
mod palette;
mod style;

pub use color::Color;
pub use palette::{NearestPalette, palette_rgb};
pub use style::{AttrMask, Hyperlink, Style, UnderlineStyle};

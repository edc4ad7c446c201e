//! termgrid: a cell-based terminal UI core.
//!
//! The screen is a two-dimensional grid of styled character cells (wide
//! East-Asian characters and combining marks included) rendered to the
//! terminal as a minimal escape-sequence delta; input bytes are parsed into
//! typed key, mouse, focus, paste and resize events delivered over a
//! bounded channel.
//!
//! The concrete terminal transport is injected behind the [`Tty`] trait;
//! [`sim::SimTty`] ships in-process for tests and headless use.
//!
//! ```
//! use std::sync::Arc;
//! use termgrid::{Screen, ScreenConfig, Style, Color, Tty, sim::SimTty};
//!
//! let tty = Arc::new(SimTty::new(80, 24));
//! let screen = Screen::new(tty.clone() as Arc<dyn Tty>, ScreenConfig::default());
//! screen.init().expect("terminal available");
//!
//! let style = Style::default().foreground(Color::Palette(2)).bold(true);
//! screen.put_str_styled(2, 1, "hello, 世界", &style);
//! screen.show();
//!
//! assert!(tty.row_text(1).contains("hello, 世界"));
//! screen.fini();
//! ```

pub use core_cellbuf::{Cell, CellBuffer, WidthPolicy, grapheme};
pub use core_events::{
    ButtonMask, ClipboardEvent, ErrorEvent, Event, FocusEvent, InterruptEvent, Key, KeyEvent,
    ModMask, MouseEvent, PasteEvent, ResizeEvent, TermError,
};
pub use core_input::InputParser;
pub use core_screen::{
    ColorDepth, CursorStyle, MouseFlags, Screen, ScreenConfig, Tty, WindowSize, sim,
};
pub use core_style::{AttrMask, Color, Hyperlink, Style, UnderlineStyle};

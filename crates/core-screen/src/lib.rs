//! Screen lifecycle, differential rendering and the Tty contract.
//!
//! The [`Screen`] turns a byte-level terminal (any [`Tty`] implementation)
//! into a grid of styled cells with typed input events. Applications write
//! cells through the screen's accessors, call [`Screen::show`] to flush the
//! minimal escape-sequence delta, and consume [`core_events::Event`]s from
//! the channel returned by [`Screen::events`].

mod config;
mod screen;
mod sgr;
mod tty;

pub mod sim;

pub use config::{ColorDepth, ScreenConfig};
pub use screen::{CursorStyle, MouseFlags, RenderMetrics, RenderMetricsSnapshot, Screen};
pub use tty::{Tty, WindowSize};

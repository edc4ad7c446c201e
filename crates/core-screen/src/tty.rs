//! The terminal transport contract.
//!
//! The screen core never touches a file descriptor or console API directly:
//! it borrows a [`Tty`] and speaks bytes. Concrete transports (termios,
//! Windows console VT, an in-process simulator) live behind this trait and
//! are internally synchronized; every method takes `&self` so the input
//! reader can block in [`Tty::read`] while the renderer writes.

use std::io;

use crossbeam_channel::Sender;

/// Reported terminal dimensions. Pixel fields are zero when the transport
/// cannot measure them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowSize {
    pub cols: u16,
    pub rows: u16,
    pub pixel_width: u16,
    pub pixel_height: u16,
}

/// A raw-mode byte transport plus the OS-side controls the screen needs.
///
/// Contract notes:
/// * `read` blocks for at most a short polling interval; `Ok(0)` or an
///   error of kind `TimedOut`/`WouldBlock` means "no bytes this interval;
///   check shutdown and retry".
/// * `start`/`stop` enter and leave raw mode and are idempotent.
/// * `notify_resize` registers a channel that receives one message per size
///   change; the screen reads the new geometry back via `window_size`.
/// * `drain` wakes any blocked `read` so a shutting-down reader can observe
///   its stop flag.
pub trait Tty: Send + Sync {
    fn start(&self) -> io::Result<()>;
    fn stop(&self) -> io::Result<()>;
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&self, bytes: &[u8]) -> io::Result<()>;
    fn flush(&self) -> io::Result<()>;
    fn window_size(&self) -> io::Result<WindowSize>;
    fn notify_resize(&self, tx: Sender<()>);
    fn drain(&self);
    fn close(&self) -> io::Result<()>;
}

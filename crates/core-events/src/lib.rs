//! Core event types, error taxonomy and channel policy for termgrid.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use thiserror::Error;

mod key;
pub use key::Key;

// -------------------------------------------------------------------------------------------------
// Channel Policy
// -------------------------------------------------------------------------------------------------
// The screen publishes events on a bounded crossbeam channel sized by `EVENT_CHANNEL_CAP`. The
// producers (input reader, resize watcher) never block on a slow consumer: posting uses `try_send`,
// and when the queue is full the event is dropped, the drop is counted, and a single
// `TermError::EventQueueFull` error event is offered in its place. Bursts well beyond what an
// interactive consumer can absorb therefore degrade to lossy delivery instead of stalling the
// read path behind an unread queue.
// -------------------------------------------------------------------------------------------------
pub const EVENT_CHANNEL_CAP: usize = 1024;

// Telemetry counters (relaxed atomics, no locking). Inspected by tests and periodically logged;
// they are cumulative across all screens in the process.
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static EVENTS_DROPPED: AtomicU64 = AtomicU64::new(0);

/// Errors surfaced by screen construction and, wrapped in [`ErrorEvent`], by
/// the running screen.
#[derive(Debug, Error)]
pub enum TermError {
    /// No usable terminal is attached (headless environment, refused Tty).
    #[error("no usable terminal")]
    NoScreen,
    /// The locale charset is neither UTF-8 nor one this library supports.
    #[error("unsupported locale charset: {0}")]
    NoCharset(String),
    /// Posting an event would block; the event was dropped.
    #[error("event queue full; event dropped")]
    EventQueueFull,
    /// Underlying terminal read/write failure.
    #[error("terminal i/o: {0}")]
    TtyIo(#[from] std::io::Error),
}

bitflags::bitflags! {
    /// Keyboard modifier mask attached to key and mouse events.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ModMask: u16 {
        const SHIFT = 1 << 0;
        const CTRL  = 1 << 1;
        const ALT   = 1 << 2;
        const META  = 1 << 3;
        const HYPER = 1 << 4;
        const SUPER = 1 << 5;
    }
}

bitflags::bitflags! {
    /// Mouse button mask. Wheel "buttons" are impulses and never latch in a
    /// reported mask beyond the event that carries them.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ButtonMask: u16 {
        const BUTTON1 = 1 << 0;
        const BUTTON2 = 1 << 1;
        const BUTTON3 = 1 << 2;
        const BUTTON4 = 1 << 3;
        const BUTTON5 = 1 << 4;
        const BUTTON6 = 1 << 5;
        const BUTTON7 = 1 << 6;
        const BUTTON8 = 1 << 7;
        const WHEEL_UP    = 1 << 8;
        const WHEEL_DOWN  = 1 << 9;
        const WHEEL_LEFT  = 1 << 10;
        const WHEEL_RIGHT = 1 << 11;
    }
}

impl ButtonMask {
    /// Mask covering every wheel impulse bit.
    pub const WHEEL: ButtonMask = ButtonMask::WHEEL_UP
        .union(ButtonMask::WHEEL_DOWN)
        .union(ButtonMask::WHEEL_LEFT)
        .union(ButtonMask::WHEEL_RIGHT);
}

/// A keyboard event. `key == Key::Rune` carries exactly one grapheme cluster
/// in `text`; named keys carry an empty `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub time: Instant,
    pub key: Key,
    pub text: String,
    pub mods: ModMask,
}

impl KeyEvent {
    /// Printable input: one grapheme cluster plus modifiers.
    pub fn rune(text: impl Into<String>, mods: ModMask) -> Self {
        Self {
            time: Instant::now(),
            key: Key::Rune,
            text: text.into(),
            mods,
        }
    }

    /// A named (non-printable) key.
    pub fn named(key: Key, mods: ModMask) -> Self {
        Self {
            time: Instant::now(),
            key,
            text: String::new(),
            mods,
        }
    }
}

/// A pointer event. Coordinates are 0-based cell positions already clipped to
/// the screen; `buttons` is the full held-down mask after this transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub time: Instant,
    pub x: u16,
    pub y: u16,
    pub buttons: ButtonMask,
    pub mods: ModMask,
}

impl MouseEvent {
    pub fn new(x: u16, y: u16, buttons: ButtonMask, mods: ModMask) -> Self {
        Self {
            time: Instant::now(),
            x,
            y,
            buttons,
            mods,
        }
    }
}

/// Terminal size change. Pixel dimensions are zero when the transport does
/// not report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    pub time: Instant,
    pub cols: u16,
    pub rows: u16,
    pub pixel_width: u16,
    pub pixel_height: u16,
}

impl ResizeEvent {
    pub fn new(cols: u16, rows: u16, pixel_width: u16, pixel_height: u16) -> Self {
        Self {
            time: Instant::now(),
            cols,
            rows,
            pixel_width,
            pixel_height,
        }
    }
}

/// Bracketed-paste delimiter. The pasted content itself arrives as ordinary
/// key events between the `start == true` and `start == false` markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasteEvent {
    pub time: Instant,
    pub start: bool,
}

impl PasteEvent {
    pub fn new(start: bool) -> Self {
        Self {
            time: Instant::now(),
            start,
        }
    }
}

/// Terminal focus report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusEvent {
    pub time: Instant,
    pub focused: bool,
}

impl FocusEvent {
    pub fn new(focused: bool) -> Self {
        Self {
            time: Instant::now(),
            focused,
        }
    }
}

/// Clipboard contents delivered in response to an OSC 52 query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEvent {
    pub time: Instant,
    pub data: Vec<u8>,
}

impl ClipboardEvent {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            time: Instant::now(),
            data,
        }
    }
}

/// A non-fatal failure surfaced to the consumer instead of an event it would
/// otherwise have received.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub time: Instant,
    pub error: Arc<TermError>,
}

impl ErrorEvent {
    pub fn new(error: TermError) -> Self {
        Self {
            time: Instant::now(),
            error: Arc::new(error),
        }
    }
}

/// Application-injected wakeup carrying an optional opaque payload.
#[derive(Clone)]
pub struct InterruptEvent {
    pub time: Instant,
    pub payload: Option<Arc<dyn std::any::Any + Send + Sync>>,
}

impl InterruptEvent {
    pub fn new(payload: Option<Arc<dyn std::any::Any + Send + Sync>>) -> Self {
        Self {
            time: Instant::now(),
            payload,
        }
    }
}

impl fmt::Debug for InterruptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptEvent")
            .field("time", &self.time)
            .field("payload", &self.payload.as_ref().map(|_| "<opaque>"))
            .finish()
    }
}

/// Top-level event enum consumed from the screen's event channel.
#[derive(Debug, Clone)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(ResizeEvent),
    Paste(PasteEvent),
    Focus(FocusEvent),
    Clipboard(ClipboardEvent),
    Error(ErrorEvent),
    Interrupt(InterruptEvent),
}

impl Event {
    /// Timestamp of the underlying occurrence.
    pub fn time(&self) -> Instant {
        match self {
            Event::Key(e) => e.time,
            Event::Mouse(e) => e.time,
            Event::Resize(e) => e.time,
            Event::Paste(e) => e.time,
            Event::Focus(e) => e.time,
            Event::Clipboard(e) => e.time,
            Event::Error(e) => e.time,
            Event::Interrupt(e) => e.time,
        }
    }
}

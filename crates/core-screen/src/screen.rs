//! Screen orchestration: lifecycle, mode negotiation, the event pipeline
//! and differential rendering.
//!
//! Concurrency model:
//! * One mutex guards the cell buffer, renderer wire-state and the output
//!   side of the Tty; every public method that touches either takes it, so
//!   mode toggles can never interleave with a frame being emitted.
//! * The input reader thread blocks on `Tty::read` (bounded by the
//!   transport's polling interval) and never takes the screen mutex; it
//!   shares only the parser and the event sender.
//! * The resize watcher selects on the Tty's resize channel and the
//!   shutdown channel.
//! * Event posting is `try_send`: a full queue drops the event, counts it,
//!   and offers a queue-full error event instead. The read path never
//!   blocks behind a slow consumer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering::Relaxed};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select, unbounded};

use core_cellbuf::CellBuffer;
use core_events::{
    CHANNEL_SEND_FAILURES, ErrorEvent, EVENTS_DROPPED, Event, ResizeEvent, TermError,
};
use core_input::InputParser;
use core_style::{Color, Hyperlink, NearestPalette, Style};

use crate::config::{ColorDepth, ScreenConfig};
use crate::sgr;
use crate::tty::Tty;

bitflags::bitflags! {
    /// Which classes of mouse reports to request from the terminal.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct MouseFlags: u8 {
        /// Button presses and releases (DEC 1000).
        const BUTTON = 1 << 0;
        /// Motion while a button is held (DEC 1002).
        const DRAG = 1 << 1;
        /// All motion (DEC 1003).
        const MOTION = 1 << 2;
    }
}

/// `CSI Ps SP q` cursor shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Default,
    BlinkingBlock,
    SteadyBlock,
    BlinkingUnderline,
    SteadyUnderline,
    BlinkingBar,
    SteadyBar,
}

impl CursorStyle {
    fn ps(self) -> u8 {
        match self {
            CursorStyle::Default => 0,
            CursorStyle::BlinkingBlock => 1,
            CursorStyle::SteadyBlock => 2,
            CursorStyle::BlinkingUnderline => 3,
            CursorStyle::SteadyUnderline => 4,
            CursorStyle::BlinkingBar => 5,
            CursorStyle::SteadyBar => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimpleMode {
    Paste,
    Focus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Initialized,
    Suspended,
    Finalized,
}

/// Cumulative renderer counters (relaxed atomics; diagnostics and tests).
#[derive(Default)]
pub struct RenderMetrics {
    pub frames: AtomicU64,
    pub cells_emitted: AtomicU64,
    pub bytes_written: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderMetricsSnapshot {
    pub frames: u64,
    pub cells_emitted: u64,
    pub bytes_written: u64,
}

impl RenderMetrics {
    fn snapshot(&self) -> RenderMetricsSnapshot {
        RenderMetricsSnapshot {
            frames: self.frames.load(Relaxed),
            cells_emitted: self.cells_emitted.load(Relaxed),
            bytes_written: self.bytes_written.load(Relaxed),
        }
    }
}

struct Core {
    lifecycle: Lifecycle,
    config: ScreenConfig,
    buf: CellBuffer,
    // Renderer wire state.
    wire_style: Option<Style>,
    wire_link: Option<Arc<Hyperlink>>,
    out_cursor: Option<(u16, u16)>,
    resolved_fg: Color,
    resolved_bg: Color,
    resolved_ul: Color,
    nearest: NearestPalette,
    need_full_repaint: bool,
    // Cursor.
    cursor_visible: bool,
    cursor_pos: (u16, u16),
    cursor_style: CursorStyle,
    cursor_color: Option<Color>,
    cursor_style_dirty: bool,
    // Negotiated modes, re-applied on resume.
    mouse_flags: MouseFlags,
    paste_enabled: bool,
    focus_enabled: bool,
    // Worker threads.
    reader: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
    quit_tx: Option<Sender<()>>,
}

struct Shared {
    tty: Arc<dyn Tty>,
    core: Mutex<Core>,
    parser: Mutex<InputParser>,
    events_tx: Mutex<Option<Sender<Event>>>,
    events_rx: Receiver<Event>,
    quitting: AtomicBool,
    metrics: RenderMetrics,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn post(&self, ev: Event) {
        let guard = lock(&self.events_tx);
        let Some(tx) = guard.as_ref() else { return };
        match tx.try_send(ev) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                EVENTS_DROPPED.fetch_add(1, Relaxed);
                tracing::warn!(target: "screen.lifecycle", "event queue full; dropping");
                let _ = tx.try_send(Event::Error(ErrorEvent::new(TermError::EventQueueFull)));
            }
            Err(TrySendError::Disconnected(_)) => {
                CHANNEL_SEND_FAILURES.fetch_add(1, Relaxed);
            }
        }
    }

    /// Re-read the geometry after a resize notification.
    fn handle_resize(&self) {
        if self.quitting.load(Relaxed) {
            return;
        }
        let Ok(ws) = self.tty.window_size() else {
            return;
        };
        {
            let mut core = lock(&self.core);
            if core.lifecycle != Lifecycle::Initialized {
                return;
            }
            core.buf.resize(usize::from(ws.cols), usize::from(ws.rows));
            core.buf.invalidate();
            core.out_cursor = None;
        }
        lock(&self.parser).set_size(ws.cols, ws.rows);
        tracing::debug!(target: "screen.resize", cols = ws.cols, rows = ws.rows, "resized");
        self.post(Event::Resize(ResizeEvent::new(
            ws.cols,
            ws.rows,
            ws.pixel_width,
            ws.pixel_height,
        )));
    }
}

/// The screen: owns the cell buffer and parser, borrows a [`Tty`].
///
/// Cloning is cheap and shares the same screen; all methods are safe to call
/// from any thread.
#[derive(Clone)]
pub struct Screen {
    shared: Arc<Shared>,
}

impl Screen {
    pub fn new(tty: Arc<dyn Tty>, config: ScreenConfig) -> Self {
        let (events_tx, events_rx) = bounded(config.event_capacity);
        let buf = CellBuffer::new(0, 0, config.width_policy);
        Self {
            shared: Arc::new(Shared {
                tty,
                core: Mutex::new(Core {
                    lifecycle: Lifecycle::Created,
                    config,
                    buf,
                    wire_style: None,
                    wire_link: None,
                    out_cursor: None,
                    resolved_fg: Color::Default,
                    resolved_bg: Color::Default,
                    resolved_ul: Color::Default,
                    nearest: NearestPalette::new(),
                    need_full_repaint: false,
                    cursor_visible: false,
                    cursor_pos: (0, 0),
                    cursor_style: CursorStyle::Default,
                    cursor_color: None,
                    cursor_style_dirty: false,
                    mouse_flags: MouseFlags::empty(),
                    paste_enabled: false,
                    focus_enabled: false,
                    reader: None,
                    watcher: None,
                    quit_tx: None,
                }),
                parser: Mutex::new(InputParser::new()),
                events_tx: Mutex::new(Some(events_tx)),
                events_rx,
                quitting: AtomicBool::new(false),
                metrics: RenderMetrics::default(),
            }),
        }
    }

    /// The receiver the application consumes events from. Closed (all
    /// senders gone) only after `fini` has joined the worker threads.
    pub fn events(&self) -> Receiver<Event> {
        self.shared.events_rx.clone()
    }

    pub fn render_metrics(&self) -> RenderMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Acquire the terminal: raw mode, alt screen, keypad transmit, hidden
    /// cursor, initial geometry, worker threads.
    pub fn init(&self) -> Result<(), TermError> {
        let mut core = lock(&self.shared.core);
        match core.lifecycle {
            Lifecycle::Created | Lifecycle::Suspended => {}
            Lifecycle::Initialized | Lifecycle::Finalized => return Ok(()),
        }
        let tty = &self.shared.tty;
        tty.start()?;

        let mut out: Vec<u8> = Vec::new();
        out.extend_from_slice(b"\x1b[?1049h\x1b[?1h\x1b=\x1b[?25l\x1b[2J\x1b[H");
        // Re-apply modes that survived a suspension.
        append_mouse_enable(&mut out, core.mouse_flags);
        if core.paste_enabled {
            out.extend_from_slice(b"\x1b[?2004h");
        }
        if core.focus_enabled {
            out.extend_from_slice(b"\x1b[?1004h");
        }
        tty.write(&out)?;
        tty.flush()?;

        let ws = tty.window_size()?;
        let (cols, rows) = core
            .config
            .size_override
            .filter(|_| core.lifecycle == Lifecycle::Created)
            .unwrap_or((ws.cols, ws.rows));
        core.buf.resize(usize::from(cols), usize::from(rows));
        core.buf.invalidate();
        core.wire_style = None;
        core.wire_link = None;
        core.out_cursor = None;
        core.need_full_repaint = false;

        self.shared.quitting.store(false, Relaxed);
        {
            let mut parser = lock(&self.shared.parser);
            parser.reset();
            parser.set_size(cols, rows);
        }

        let (quit_tx, quit_rx) = unbounded::<()>();
        let (resize_tx, resize_rx) = unbounded::<()>();
        tty.notify_resize(resize_tx);

        let shared = Arc::clone(&self.shared);
        let esc_timeout = core.config.esc_timeout;
        let reader = std::thread::Builder::new()
            .name("termgrid-input".to_string())
            .spawn(move || reader_loop(shared, esc_timeout))
            .map_err(TermError::TtyIo)?;
        let shared = Arc::clone(&self.shared);
        let watcher = match std::thread::Builder::new()
            .name("termgrid-resize".to_string())
            .spawn(move || watcher_loop(shared, resize_rx, quit_rx))
        {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.quitting.store(true, Relaxed);
                self.shared.tty.drain();
                let _ = reader.join();
                return Err(TermError::TtyIo(e));
            }
        };

        core.reader = Some(reader);
        core.watcher = Some(watcher);
        core.quit_tx = Some(quit_tx);
        core.lifecycle = Lifecycle::Initialized;
        drop(core);

        tracing::info!(target: "screen.lifecycle", cols, rows, "screen initialized");
        self.shared.post(Event::Resize(ResizeEvent::new(
            cols,
            rows,
            ws.pixel_width,
            ws.pixel_height,
        )));
        Ok(())
    }

    /// Release the terminal and close the event channel. Idempotent; safe
    /// from any thread.
    pub fn fini(&self) {
        self.teardown(Lifecycle::Finalized);
        *lock(&self.shared.events_tx) = None;
        tracing::info!(target: "screen.lifecycle", "screen finalized");
    }

    /// Restore the terminal but keep the cell buffer and negotiated modes
    /// for a later [`resume`](Self::resume).
    pub fn suspend(&self) {
        self.teardown(Lifecycle::Suspended);
        tracing::info!(target: "screen.lifecycle", "screen suspended");
    }

    /// Re-acquire the terminal after [`suspend`](Self::suspend).
    pub fn resume(&self) -> Result<(), TermError> {
        self.init()
    }

    fn teardown(&self, target: Lifecycle) {
        let (reader, watcher, quit_tx) = {
            let mut core = lock(&self.shared.core);
            match core.lifecycle {
                Lifecycle::Initialized => {}
                Lifecycle::Created | Lifecycle::Suspended => {
                    core.lifecycle = target;
                    return;
                }
                Lifecycle::Finalized => return,
            }
            core.lifecycle = target;
            self.shared.quitting.store(true, Relaxed);

            let mut out: Vec<u8> = Vec::new();
            if core.wire_link.is_some() {
                out.extend_from_slice(b"\x1b]8;;\x07");
                core.wire_link = None;
            }
            out.extend_from_slice(b"\x1b[0m\x1b[0 q");
            append_mouse_disable(&mut out);
            if core.paste_enabled {
                out.extend_from_slice(b"\x1b[?2004l");
            }
            if core.focus_enabled {
                out.extend_from_slice(b"\x1b[?1004l");
            }
            out.extend_from_slice(b"\x1b[?25h\x1b[?1049l\x1b[?1l\x1b>");
            let _ = self.shared.tty.write(&out);
            let _ = self.shared.tty.flush();

            core.wire_style = None;
            core.out_cursor = None;
            (core.reader.take(), core.watcher.take(), core.quit_tx.take())
        };

        drop(quit_tx);
        self.shared.tty.drain();
        if let Some(h) = reader {
            let _ = h.join();
        }
        if let Some(h) = watcher {
            let _ = h.join();
        }
        let _ = self.shared.tty.stop();
    }

    // -----------------------------------------------------------------
    // Cell access
    // -----------------------------------------------------------------

    /// Write one grapheme cluster; returns the display width taken.
    pub fn put(&self, x: usize, y: usize, text: &str, style: &Style) -> u8 {
        let mut core = lock(&self.shared.core);
        if core.lifecycle == Lifecycle::Finalized {
            return 0;
        }
        core.buf.put(x, y, text, style).1
    }

    /// Alias of [`put`](Self::put) for single-cell updates.
    pub fn set_content(&self, x: usize, y: usize, text: &str, style: &Style) {
        self.put(x, y, text, style);
    }

    /// Write a whole string left-to-right starting at `(x, y)`.
    pub fn put_str_styled(&self, x: usize, y: usize, text: &str, style: &Style) {
        let mut core = lock(&self.shared.core);
        if core.lifecycle == Lifecycle::Finalized {
            return;
        }
        let mut cx = x;
        let mut rest = text;
        while !rest.is_empty() {
            let (next, width) = core.buf.put(cx, y, rest, style);
            if next.len() == rest.len() {
                break;
            }
            rest = next;
            cx += usize::from(width.max(1));
        }
    }

    pub fn put_str(&self, x: usize, y: usize, text: &str) {
        self.put_str_styled(x, y, text, &Style::default());
    }

    pub fn get(&self, x: usize, y: usize) -> (String, Style, u8) {
        lock(&self.shared.core).buf.get(x, y)
    }

    pub fn fill(&self, ch: char, style: &Style) {
        let mut core = lock(&self.shared.core);
        if core.lifecycle == Lifecycle::Finalized {
            return;
        }
        core.buf.fill(ch, style);
    }

    pub fn clear(&self) {
        self.fill(' ', &Style::default());
    }

    pub fn lock_cell(&self, x: usize, y: usize) {
        lock(&self.shared.core).buf.lock_cell(x, y);
    }

    pub fn unlock_cell(&self, x: usize, y: usize) {
        lock(&self.shared.core).buf.unlock_cell(x, y);
    }

    pub fn size(&self) -> (u16, u16) {
        let core = lock(&self.shared.core);
        let (w, h) = core.buf.size();
        (w as u16, h as u16)
    }

    // -----------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------

    /// Flush dirty cells to the terminal.
    pub fn show(&self) {
        let mut core = lock(&self.shared.core);
        self.render(&mut core, false);
    }

    /// Full repaint: invalidate everything, clear, then flush.
    pub fn sync(&self) {
        let mut core = lock(&self.shared.core);
        self.render(&mut core, true);
    }

    fn render(&self, core: &mut Core, full: bool) {
        if core.lifecycle != Lifecycle::Initialized {
            return;
        }
        let mut out: Vec<u8> = Vec::new();
        // Cursor stays hidden while cells are painted.
        out.extend_from_slice(b"\x1b[?25l");
        let prelude = out.len();

        if full || core.need_full_repaint {
            core.buf.invalidate();
            core.need_full_repaint = false;
        }
        if full {
            out.extend_from_slice(b"\x1b[2J");
            core.out_cursor = None;
            core.wire_style = None;
        }

        let (w, h) = core.buf.size();
        let mut cells = 0u64;
        for y in 0..h {
            for x in 0..w {
                let Some(cell) = core.buf.cell(x, y) else {
                    continue;
                };
                if !cell.is_dirty() || cell.is_locked() {
                    continue;
                }
                let width = cell.width();
                if width == 0 {
                    core.buf.set_dirty(x, y, false);
                    continue;
                }
                let content = cell.content().to_string();
                let style = cell.style().clone();
                core.buf.set_dirty(x, y, false);

                if core.out_cursor != Some((x as u16, y as u16)) {
                    out.extend_from_slice(format!("\x1b[{};{}H", y + 1, x + 1).as_bytes());
                }

                let resolved = resolve_style(core, &style);
                if core.wire_style.as_ref() != Some(&resolved) {
                    sgr::emit_sgr(&mut out, core.wire_style.as_ref(), &resolved);
                    let mut stored = resolved.clone();
                    if stored.fg == Color::Reset {
                        stored.fg = Color::Default;
                    }
                    if stored.bg == Color::Reset {
                        stored.bg = Color::Default;
                    }
                    if stored.underline_color == Color::Reset {
                        stored.underline_color = Color::Default;
                    }
                    core.wire_style = Some(stored);
                }
                if core.wire_link != resolved.link {
                    emit_link(&mut out, resolved.link.as_deref());
                    core.wire_link = resolved.link.clone();
                }

                let advance = if width == 2 && x == w - 1 {
                    // A wide leader cannot straddle the right edge; paint a
                    // styled space and keep the cell logically wide.
                    out.push(b' ');
                    1u16
                } else {
                    out.extend_from_slice(content.as_bytes());
                    u16::from(width)
                };
                let nx = x as u16 + advance;
                core.out_cursor = if usize::from(nx) < w {
                    Some((nx, y as u16))
                } else {
                    None
                };
                cells += 1;
            }
        }

        if core.cursor_style_dirty {
            out.extend_from_slice(format!("\x1b[{} q", core.cursor_style.ps()).as_bytes());
            match core.cursor_color.and_then(Color::rgb_components) {
                Some((r, g, b)) => out.extend_from_slice(
                    format!("\x1b]12;#{r:02x}{g:02x}{b:02x}\x07").as_bytes(),
                ),
                None => out.extend_from_slice(b"\x1b]112\x07"),
            }
            core.cursor_style_dirty = false;
        }
        if core.cursor_visible {
            out.extend_from_slice(
                format!("\x1b[{};{}H", core.cursor_pos.1 + 1, core.cursor_pos.0 + 1).as_bytes(),
            );
            out.extend_from_slice(b"\x1b[?25h");
            core.out_cursor = Some(core.cursor_pos);
        }

        // A frame with no dirty cells and no cursor work still carries the
        // hide prefix; skip the write entirely in that case.
        if cells == 0 && out.len() == prelude && !core.cursor_visible {
            return;
        }

        match self
            .shared
            .tty
            .write(&out)
            .and_then(|()| self.shared.tty.flush())
        {
            Ok(()) => {
                self.shared.metrics.frames.fetch_add(1, Relaxed);
                self.shared.metrics.cells_emitted.fetch_add(cells, Relaxed);
                self.shared
                    .metrics
                    .bytes_written
                    .fetch_add(out.len() as u64, Relaxed);
                tracing::trace!(
                    target: "screen.render",
                    cells,
                    bytes = out.len(),
                    full,
                    "frame flushed"
                );
            }
            Err(e) => {
                // Next show retries with a full invalidation.
                core.need_full_repaint = true;
                core.wire_style = None;
                core.out_cursor = None;
                self.shared
                    .post(Event::Error(ErrorEvent::new(TermError::TtyIo(e))));
            }
        }
    }

    // -----------------------------------------------------------------
    // Cursor
    // -----------------------------------------------------------------

    pub fn show_cursor(&self, x: u16, y: u16) {
        let mut core = lock(&self.shared.core);
        core.cursor_visible = true;
        core.cursor_pos = (x, y);
    }

    pub fn hide_cursor(&self) {
        let mut core = lock(&self.shared.core);
        core.cursor_visible = false;
        if core.lifecycle == Lifecycle::Initialized {
            let _ = self.shared.tty.write(b"\x1b[?25l");
            let _ = self.shared.tty.flush();
        }
    }

    pub fn set_cursor_style(&self, style: CursorStyle, color: Option<Color>) {
        let mut core = lock(&self.shared.core);
        core.cursor_style = style;
        core.cursor_color = color;
        core.cursor_style_dirty = true;
    }

    // -----------------------------------------------------------------
    // Mode negotiation
    // -----------------------------------------------------------------

    pub fn enable_mouse(&self, flags: MouseFlags) {
        let mut core = lock(&self.shared.core);
        if core.lifecycle == Lifecycle::Finalized {
            return;
        }
        core.mouse_flags = flags;
        if core.lifecycle == Lifecycle::Initialized {
            let mut out = Vec::new();
            append_mouse_disable(&mut out);
            append_mouse_enable(&mut out, flags);
            let _ = self.shared.tty.write(&out);
            let _ = self.shared.tty.flush();
        }
    }

    pub fn disable_mouse(&self) {
        self.enable_mouse(MouseFlags::empty());
    }

    pub fn enable_paste(&self) {
        self.set_simple_mode(SimpleMode::Paste, true, b"\x1b[?2004h");
    }

    pub fn disable_paste(&self) {
        self.set_simple_mode(SimpleMode::Paste, false, b"\x1b[?2004l");
    }

    pub fn enable_focus(&self) {
        self.set_simple_mode(SimpleMode::Focus, true, b"\x1b[?1004h");
    }

    pub fn disable_focus(&self) {
        self.set_simple_mode(SimpleMode::Focus, false, b"\x1b[?1004l");
    }

    fn set_simple_mode(&self, which: SimpleMode, on: bool, seq: &[u8]) {
        let mut core = lock(&self.shared.core);
        if core.lifecycle == Lifecycle::Finalized {
            return;
        }
        match which {
            SimpleMode::Paste => core.paste_enabled = on,
            SimpleMode::Focus => core.focus_enabled = on,
        }
        if core.lifecycle == Lifecycle::Initialized {
            let _ = self.shared.tty.write(seq);
            let _ = self.shared.tty.flush();
        }
    }

    // -----------------------------------------------------------------
    // Terminal extras
    // -----------------------------------------------------------------

    /// OSC 52 set.
    pub fn set_clipboard(&self, data: &[u8]) {
        let payload = BASE64.encode(data);
        self.write_when_live(format!("\x1b]52;c;{payload}\x07").as_bytes());
    }

    /// OSC 52 query; the reply arrives as an [`Event::Clipboard`].
    pub fn get_clipboard(&self) {
        self.write_when_live(b"\x1b]52;c;?\x07");
    }

    pub fn set_title(&self, title: &str) {
        self.write_when_live(format!("\x1b]0;{title}\x07").as_bytes());
    }

    pub fn beep(&self) {
        self.write_when_live(&[0x07]);
    }

    /// Cooperative resize request; terminals are free to ignore it. The
    /// authoritative geometry arrives via the resize channel.
    pub fn set_size(&self, cols: u16, rows: u16) {
        self.write_when_live(format!("\x1b[8;{rows};{cols}t").as_bytes());
    }

    fn write_when_live(&self, bytes: &[u8]) {
        let core = lock(&self.shared.core);
        if core.lifecycle != Lifecycle::Initialized {
            return;
        }
        let _ = self.shared.tty.write(bytes);
        let _ = self.shared.tty.flush();
    }

    /// Wake the event consumer with an application-defined payload.
    pub fn interrupt(&self, payload: Option<Arc<dyn std::any::Any + Send + Sync>>) {
        self.shared
            .post(Event::Interrupt(core_events::InterruptEvent::new(payload)));
    }
}

fn resolve_style(core: &mut Core, style: &Style) -> Style {
    let mut s = style.clone();
    if s.fg == Color::Inherit {
        s.fg = core.resolved_fg;
    }
    if s.bg == Color::Inherit {
        s.bg = core.resolved_bg;
    }
    if s.underline_color == Color::Inherit {
        s.underline_color = core.resolved_ul;
    }
    s.fg = reduce_color(core, s.fg);
    s.bg = reduce_color(core, s.bg);
    s.underline_color = reduce_color(core, s.underline_color);
    core.resolved_fg = normalize(s.fg);
    core.resolved_bg = normalize(s.bg);
    core.resolved_ul = normalize(s.underline_color);
    s
}

fn normalize(c: Color) -> Color {
    if c == Color::Reset { Color::Default } else { c }
}

fn reduce_color(core: &mut Core, c: Color) -> Color {
    match (core.config.color_depth, c) {
        (ColorDepth::Mono, Color::Palette(_) | Color::Rgb(..)) => Color::Default,
        (ColorDepth::Ansi16, Color::Rgb(r, g, b)) => {
            Color::Palette(core.nearest.nearest(r, g, b, 16))
        }
        (ColorDepth::Ansi16, Color::Palette(n)) if n > 15 => {
            let (r, g, b) = core_style::palette_rgb(n);
            Color::Palette(core.nearest.nearest(r, g, b, 16))
        }
        (ColorDepth::Ansi256, Color::Rgb(r, g, b)) => {
            Color::Palette(core.nearest.nearest(r, g, b, 256))
        }
        (_, c) => c,
    }
}

fn emit_link(out: &mut Vec<u8>, link: Option<&Hyperlink>) {
    match link {
        Some(l) => {
            out.extend_from_slice(b"\x1b]8;");
            if !l.id.is_empty() {
                out.extend_from_slice(format!("id={}", l.id).as_bytes());
            }
            out.push(b';');
            out.extend_from_slice(l.uri.as_bytes());
            out.push(0x07);
        }
        None => out.extend_from_slice(b"\x1b]8;;\x07"),
    }
}

fn append_mouse_enable(out: &mut Vec<u8>, flags: MouseFlags) {
    if flags.contains(MouseFlags::BUTTON) {
        out.extend_from_slice(b"\x1b[?1000h");
    }
    if flags.contains(MouseFlags::DRAG) {
        out.extend_from_slice(b"\x1b[?1002h");
    }
    if flags.contains(MouseFlags::MOTION) {
        out.extend_from_slice(b"\x1b[?1003h");
    }
    if !flags.is_empty() {
        out.extend_from_slice(b"\x1b[?1006h");
    }
}

fn append_mouse_disable(out: &mut Vec<u8>) {
    out.extend_from_slice(b"\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l");
}

/// Input reader: block on the Tty's polling read, feed the parser, publish
/// events, and resolve pending escapes after the disambiguation timeout.
fn reader_loop(shared: Arc<Shared>, esc_timeout: std::time::Duration) {
    let mut chunk = [0u8; 4096];
    let mut events: Vec<Event> = Vec::new();
    let mut waiting_since: Option<Instant> = None;
    loop {
        if shared.quitting.load(Relaxed) {
            break;
        }
        match shared.tty.read(&mut chunk) {
            // Idle tick: transports surface it either as a zero-length read
            // or as a timeout-class error. Both mean "no bytes this
            // interval", so both must resolve an escape that has sat past
            // the disambiguation window.
            Ok(0) => {
                resolve_pending_escape(&shared, &mut waiting_since, esc_timeout, &mut events);
            }
            Ok(n) => {
                let mut parser = lock(&shared.parser);
                parser.scan_utf8(&chunk[..n], &mut events);
                waiting_since = parser.waiting().then(Instant::now);
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::Interrupted
                ) =>
            {
                resolve_pending_escape(&shared, &mut waiting_since, esc_timeout, &mut events);
            }
            Err(e) => {
                tracing::error!(target: "screen.lifecycle", error = %e, "tty read failed");
                shared.post(Event::Error(ErrorEvent::new(TermError::TtyIo(e))));
                break;
            }
        }
        for ev in events.drain(..) {
            shared.post(ev);
        }
    }
    tracing::debug!(target: "screen.lifecycle", "input reader exited");
}

/// Force-resolve a lone ESC (or sequence prefix) once it has been pending
/// longer than the disambiguation timeout.
fn resolve_pending_escape(
    shared: &Shared,
    waiting_since: &mut Option<Instant>,
    esc_timeout: std::time::Duration,
    events: &mut Vec<Event>,
) {
    if let Some(t0) = *waiting_since
        && t0.elapsed() >= esc_timeout
    {
        let mut parser = lock(&shared.parser);
        parser.scan(events);
        *waiting_since = None;
    }
}

/// Resize watcher: one message per size change, shutdown via the quit
/// channel disconnecting.
fn watcher_loop(shared: Arc<Shared>, resize_rx: Receiver<()>, quit_rx: Receiver<()>) {
    loop {
        select! {
            recv(resize_rx) -> msg => {
                if msg.is_err() {
                    break;
                }
                shared.handle_resize();
            }
            recv(quit_rx) -> _ => break,
        }
    }
    tracing::debug!(target: "screen.lifecycle", "resize watcher exited");
}

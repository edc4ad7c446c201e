//! In-process terminal for tests.
//!
//! `SimTty` implements the [`Tty`](crate::Tty) contract entirely in memory:
//! the write side runs a minimal emulator that parses the screen's output
//! back into a grid of drawn cells (with decoded styles), and the read side
//! is a byte queue driven by raw injection or the canonical wire encoders
//! below. Inspection covers the cursor, cells, bells, title, DEC private
//! modes and OSC 52 traffic.
//!
//! The encoders produce the same wire forms the parser consumes, which is
//! what the event round-trip suites lean on.

use std::collections::{BTreeSet, VecDeque};
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use crossbeam_channel::Sender;

use core_cellbuf::WidthPolicy;
use core_cellbuf::grapheme;
use core_events::{ButtonMask, Key, ModMask};
use core_input::encode_mods;
use core_style::{AttrMask, Color, Hyperlink, Style, UnderlineStyle};

use crate::tty::{Tty, WindowSize};

const READ_POLL: Duration = Duration::from_millis(5);

/// One drawn cell as the emulator understood it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimCell {
    pub content: String,
    pub style: Style,
}

impl Default for SimCell {
    fn default() -> Self {
        Self {
            content: " ".to_string(),
            style: Style::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrKind {
    Osc,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmuState {
    Ground,
    Esc,
    Csi,
    Str(StrKind),
    StrEsc(StrKind),
}

struct Emulator {
    cols: usize,
    rows: usize,
    cells: Vec<SimCell>,
    cursor: (usize, usize),
    cursor_visible: bool,
    cursor_shape: u8,
    style: Style,
    link: Option<Arc<Hyperlink>>,
    bells: usize,
    title: String,
    modes: BTreeSet<u16>,
    clipboard_sets: Vec<Vec<u8>>,
    clipboard_queries: usize,
    size_request: Option<(u16, u16)>,
    state: EmuState,
    params: Vec<u8>,
    inters: Vec<u8>,
    private: Option<u8>,
    text: Vec<u8>,
    utf8: Vec<u8>,
    run: String,
    last_placed: Option<(usize, usize)>,
}

impl Emulator {
    fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![SimCell::default(); cols * rows],
            cursor: (0, 0),
            cursor_visible: true,
            cursor_shape: 0,
            style: Style::default(),
            link: None,
            bells: 0,
            title: String::new(),
            modes: BTreeSet::new(),
            clipboard_sets: Vec::new(),
            clipboard_queries: 0,
            size_request: None,
            state: EmuState::Ground,
            params: Vec::new(),
            inters: Vec::new(),
            private: None,
            text: Vec::new(),
            utf8: Vec::new(),
            run: String::new(),
            last_placed: None,
        }
    }

    fn resize(&mut self, cols: usize, rows: usize) {
        self.cols = cols;
        self.rows = rows;
        self.cells = vec![SimCell::default(); cols * rows];
        self.cursor = (0, 0);
    }

    fn clear_grid(&mut self) {
        for cell in &mut self.cells {
            *cell = SimCell::default();
        }
    }

    fn process(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.step(b);
        }
        self.flush_run();
    }

    fn step(&mut self, b: u8) {
        match self.state {
            EmuState::Ground => match b {
                0x07 => {
                    self.flush_run();
                    self.bells += 1;
                }
                0x1b => {
                    self.flush_run();
                    self.state = EmuState::Esc;
                }
                0x0d => {
                    self.flush_run();
                    self.cursor.0 = 0;
                }
                0x0a => {
                    self.flush_run();
                    self.cursor.1 = (self.cursor.1 + 1).min(self.rows.saturating_sub(1));
                }
                0x00..=0x1f => {
                    self.flush_run();
                }
                _ => self.push_printable(b),
            },
            EmuState::Esc => match b {
                b'[' => {
                    self.params.clear();
                    self.inters.clear();
                    self.private = None;
                    self.state = EmuState::Csi;
                }
                b']' => {
                    self.text.clear();
                    self.state = EmuState::Str(StrKind::Osc);
                }
                b'P' | b'X' | b'^' | b'_' => {
                    self.text.clear();
                    self.state = EmuState::Str(StrKind::Other);
                }
                _ => self.state = EmuState::Ground,
            },
            EmuState::Csi => match b {
                0x30..=0x3f => {
                    if matches!(b, b'<' | b'=' | b'>' | b'?')
                        && self.params.is_empty()
                        && self.private.is_none()
                    {
                        self.private = Some(b);
                    } else {
                        self.params.push(b);
                    }
                }
                0x20..=0x2f => self.inters.push(b),
                0x40..=0x7e => {
                    self.dispatch_csi(b);
                    self.state = EmuState::Ground;
                }
                _ => self.state = EmuState::Ground,
            },
            EmuState::Str(kind) => match b {
                0x07 => {
                    self.finish_string(kind);
                    self.state = EmuState::Ground;
                }
                0x1b => self.state = EmuState::StrEsc(kind),
                _ => self.text.push(b),
            },
            EmuState::StrEsc(kind) => {
                if b == b'\\' {
                    self.finish_string(kind);
                    self.state = EmuState::Ground;
                } else {
                    self.text.push(0x1b);
                    self.text.push(b);
                    self.state = EmuState::Str(kind);
                }
            }
        }
    }

    fn push_printable(&mut self, b: u8) {
        if b < 0x80 {
            self.utf8.clear();
            self.run.push(b as char);
            return;
        }
        self.utf8.push(b);
        if let Ok(s) = std::str::from_utf8(&self.utf8)
            && let Some(c) = s.chars().next()
        {
            self.run.push(c);
            self.utf8.clear();
        } else if self.utf8.len() >= 4 {
            self.utf8.clear();
        }
    }

    fn flush_run(&mut self) {
        if self.run.is_empty() {
            return;
        }
        let run = std::mem::take(&mut self.run);
        for cluster in grapheme::clusters(&run) {
            let width = grapheme::cluster_width(cluster, WidthPolicy::Narrow) as usize;
            if width == 0 {
                // Combining input attaches to the previously drawn cell.
                if let Some((px, py)) = self.last_placed {
                    let idx = py * self.cols + px;
                    if let Some(cell) = self.cells.get_mut(idx) {
                        cell.content.push_str(cluster);
                    }
                }
                continue;
            }
            let (x, y) = self.cursor;
            if x >= self.cols || y >= self.rows {
                continue;
            }
            let mut style = self.style.clone();
            style.link = self.link.clone();
            let idx = y * self.cols + x;
            self.cells[idx] = SimCell {
                content: cluster.to_string(),
                style,
            };
            if width == 2 && x + 1 < self.cols {
                let cont_style = self.cells[idx].style.clone();
                self.cells[idx + 1] = SimCell {
                    content: String::new(),
                    style: cont_style,
                };
            }
            self.last_placed = Some((x, y));
            self.cursor.0 = (x + width).min(self.cols);
        }
    }

    fn parsed_params(&self) -> Vec<Vec<u16>> {
        let s = std::str::from_utf8(&self.params).unwrap_or("");
        if s.is_empty() {
            return Vec::new();
        }
        s.split(';')
            .map(|part| {
                part.split(':')
                    .map(|p| p.parse::<u16>().unwrap_or(0))
                    .collect()
            })
            .collect()
    }

    fn dispatch_csi(&mut self, final_byte: u8) {
        let params = self.parsed_params();
        let p = |i: usize, default: u16| -> u16 {
            params
                .get(i)
                .and_then(|v| v.first())
                .copied()
                .filter(|&n| n != 0)
                .unwrap_or(default)
        };
        match (self.private, final_byte) {
            (None, b'H') | (None, b'f') => {
                let row = usize::from(p(0, 1)).saturating_sub(1);
                let col = usize::from(p(1, 1)).saturating_sub(1);
                self.cursor = (
                    col.min(self.cols.saturating_sub(1)),
                    row.min(self.rows.saturating_sub(1)),
                );
            }
            (None, b'm') => self.apply_sgr(&params),
            (None, b'J') => {
                if p(0, 0) == 2 || params.is_empty() {
                    self.clear_grid();
                }
            }
            (Some(b'?'), b'h') | (Some(b'?'), b'l') => {
                let set = final_byte == b'h';
                for group in &params {
                    let Some(&mode) = group.first() else { continue };
                    if set {
                        self.modes.insert(mode);
                        if mode == 1049 {
                            self.clear_grid();
                        }
                        if mode == 25 {
                            self.cursor_visible = true;
                        }
                    } else {
                        self.modes.remove(&mode);
                        if mode == 25 {
                            self.cursor_visible = false;
                        }
                    }
                }
            }
            (None, b'q') if self.inters == b" " => {
                self.cursor_shape = p(0, 0) as u8;
            }
            (None, b't') => {
                if p(0, 0) == 8 {
                    self.size_request = Some((p(2, 0), p(1, 0)));
                }
            }
            _ => {}
        }
    }

    fn apply_sgr(&mut self, params: &[Vec<u16>]) {
        if params.is_empty() {
            self.style = Style::default();
            return;
        }
        let mut i = 0usize;
        while i < params.len() {
            let group = &params[i];
            let code = group.first().copied().unwrap_or(0);
            match code {
                0 => self.style = Style::default(),
                1 => self.style.attrs |= AttrMask::BOLD,
                2 => self.style.attrs |= AttrMask::DIM,
                3 => self.style.attrs |= AttrMask::ITALIC,
                4 => {
                    self.style.underline = match group.get(1).copied().unwrap_or(1) {
                        0 => UnderlineStyle::None,
                        2 => UnderlineStyle::Double,
                        3 => UnderlineStyle::Curly,
                        4 => UnderlineStyle::Dotted,
                        5 => UnderlineStyle::Dashed,
                        _ => UnderlineStyle::Single,
                    };
                }
                5 => self.style.attrs |= AttrMask::BLINK,
                7 => self.style.attrs |= AttrMask::REVERSE,
                9 => self.style.attrs |= AttrMask::STRIKETHROUGH,
                22 => self.style.attrs -= AttrMask::BOLD | AttrMask::DIM,
                23 => self.style.attrs -= AttrMask::ITALIC,
                24 => self.style.underline = UnderlineStyle::None,
                25 => self.style.attrs -= AttrMask::BLINK,
                27 => self.style.attrs -= AttrMask::REVERSE,
                29 => self.style.attrs -= AttrMask::STRIKETHROUGH,
                30..=37 => self.style.fg = Color::Palette((code - 30) as u8),
                39 => self.style.fg = Color::Default,
                40..=47 => self.style.bg = Color::Palette((code - 40) as u8),
                49 => self.style.bg = Color::Default,
                90..=97 => self.style.fg = Color::Palette((code - 90 + 8) as u8),
                100..=107 => self.style.bg = Color::Palette((code - 100 + 8) as u8),
                38 | 48 | 58 => {
                    let (color, consumed) = decode_extended_color(params, i);
                    if let Some(color) = color {
                        match code {
                            38 => self.style.fg = color,
                            48 => self.style.bg = color,
                            _ => self.style.underline_color = color,
                        }
                    }
                    i += consumed;
                    continue;
                }
                59 => self.style.underline_color = Color::Default,
                _ => {}
            }
            i += 1;
        }
    }

    fn finish_string(&mut self, kind: StrKind) {
        if kind != StrKind::Osc {
            self.text.clear();
            return;
        }
        let text = std::mem::take(&mut self.text);
        let s = String::from_utf8_lossy(&text);
        let mut parts = s.splitn(3, ';');
        match parts.next().unwrap_or("") {
            "0" | "2" => self.title = parts.next().unwrap_or("").to_string(),
            "8" => {
                let params = parts.next().unwrap_or("");
                let uri = parts.next().unwrap_or("");
                self.link = if uri.is_empty() {
                    None
                } else {
                    let id = params
                        .split(':')
                        .find_map(|kv| kv.strip_prefix("id="))
                        .unwrap_or("");
                    Some(Arc::new(Hyperlink {
                        uri: uri.to_string(),
                        id: id.to_string(),
                    }))
                };
            }
            "52" => {
                let payload = parts.nth(1).unwrap_or("");
                if payload == "?" {
                    self.clipboard_queries += 1;
                } else if let Ok(data) = BASE64.decode(payload.as_bytes()) {
                    self.clipboard_sets.push(data);
                }
            }
            _ => {}
        }
    }
}

/// Decode `38/48/58` extended color in either colon or semicolon form.
/// Returns the color and how many parameter groups were consumed.
fn decode_extended_color(params: &[Vec<u16>], i: usize) -> (Option<Color>, usize) {
    let group = &params[i];
    if group.len() > 1 {
        // Colon form: 38:5:n or 38:2[:cs]:r:g:b.
        let color = match group.get(1) {
            Some(5) => group.get(2).map(|&n| Color::Palette(n as u8)),
            Some(2) => {
                let tail = &group[2..];
                let rgb: Vec<u16> = tail.iter().rev().take(3).rev().copied().collect();
                match rgb.as_slice() {
                    [r, g, b] => Some(Color::Rgb(*r as u8, *g as u8, *b as u8)),
                    _ => None,
                }
            }
            _ => None,
        };
        return (color, 1);
    }
    // Semicolon form: 38;5;n or 38;2;r;g;b.
    let flat = |j: usize| params.get(j).and_then(|v| v.first()).copied();
    match flat(i + 1) {
        Some(5) => (flat(i + 2).map(|n| Color::Palette(n as u8)), 3),
        Some(2) => {
            match (flat(i + 2), flat(i + 3), flat(i + 4)) {
                (Some(r), Some(g), Some(b)) => {
                    (Some(Color::Rgb(r as u8, g as u8, b as u8)), 5)
                }
                _ => (None, 5),
            }
        }
        _ => (None, 2),
    }
}

struct SimInner {
    started: bool,
    closed: bool,
    draining: bool,
    input: VecDeque<u8>,
    raw: Vec<u8>,
    size: WindowSize,
    resize_tx: Option<Sender<()>>,
    emu: Emulator,
    fail_next_write: bool,
}

/// The in-process terminal.
pub struct SimTty {
    inner: Mutex<SimInner>,
    cv: Condvar,
}

fn lock(m: &Mutex<SimInner>) -> MutexGuard<'_, SimInner> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimTty {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            inner: Mutex::new(SimInner {
                started: false,
                closed: false,
                draining: false,
                input: VecDeque::new(),
                raw: Vec::new(),
                size: WindowSize {
                    cols,
                    rows,
                    pixel_width: 0,
                    pixel_height: 0,
                },
                resize_tx: None,
                emu: Emulator::new(usize::from(cols), usize::from(rows)),
                fail_next_write: false,
            }),
            cv: Condvar::new(),
        }
    }

    // -- injection ----------------------------------------------------

    /// Raw byte injection (the fuzz entrypoint).
    pub fn send_raw(&self, bytes: &[u8]) {
        let mut inner = lock(&self.inner);
        inner.input.extend(bytes.iter().copied());
        self.cv.notify_all();
    }

    pub fn inject_key(&self, key: Key, text: &str, mods: ModMask) {
        self.send_raw(&encode_key(key, text, mods));
    }

    pub fn inject_mouse_press(&self, x: u16, y: u16, button: ButtonMask, mods: ModMask) {
        self.send_raw(&encode_mouse(x, y, button, mods, true));
    }

    pub fn inject_mouse_release(&self, x: u16, y: u16, button: ButtonMask, mods: ModMask) {
        self.send_raw(&encode_mouse(x, y, button, mods, false));
    }

    pub fn inject_focus(&self, focused: bool) {
        self.send_raw(if focused { b"\x1b[I" } else { b"\x1b[O" });
    }

    pub fn inject_paste_marker(&self, start: bool) {
        self.send_raw(if start { b"\x1b[200~" } else { b"\x1b[201~" });
    }

    /// Change the reported geometry and fire the resize notification.
    pub fn set_window_size(&self, cols: u16, rows: u16) {
        let tx = {
            let mut inner = lock(&self.inner);
            inner.size.cols = cols;
            inner.size.rows = rows;
            inner.emu.resize(usize::from(cols), usize::from(rows));
            inner.resize_tx.clone()
        };
        if let Some(tx) = tx {
            let _ = tx.send(());
        }
    }

    /// Make the next `write` fail, for error-path tests.
    pub fn fail_next_write(&self) {
        lock(&self.inner).fail_next_write = true;
    }

    // -- inspection ---------------------------------------------------

    pub fn cell(&self, x: u16, y: u16) -> Option<SimCell> {
        let inner = lock(&self.inner);
        let emu = &inner.emu;
        if usize::from(x) >= emu.cols || usize::from(y) >= emu.rows {
            return None;
        }
        Some(emu.cells[usize::from(y) * emu.cols + usize::from(x)].clone())
    }

    /// Concatenated contents of one row (continuation cells contribute
    /// nothing).
    pub fn row_text(&self, y: u16) -> String {
        let inner = lock(&self.inner);
        let emu = &inner.emu;
        let mut out = String::new();
        if usize::from(y) >= emu.rows {
            return out;
        }
        for x in 0..emu.cols {
            out.push_str(&emu.cells[usize::from(y) * emu.cols + x].content);
        }
        out
    }

    pub fn pos(&self) -> (u16, u16) {
        let inner = lock(&self.inner);
        (inner.emu.cursor.0 as u16, inner.emu.cursor.1 as u16)
    }

    pub fn cursor_visible(&self) -> bool {
        lock(&self.inner).emu.cursor_visible
    }

    pub fn cursor_shape(&self) -> u8 {
        lock(&self.inner).emu.cursor_shape
    }

    pub fn bells(&self) -> usize {
        lock(&self.inner).emu.bells
    }

    pub fn title(&self) -> String {
        lock(&self.inner).emu.title.clone()
    }

    /// Whether a DEC private mode is currently set.
    pub fn mode(&self, mode: u16) -> bool {
        lock(&self.inner).emu.modes.contains(&mode)
    }

    pub fn clipboard_sets(&self) -> Vec<Vec<u8>> {
        lock(&self.inner).emu.clipboard_sets.clone()
    }

    pub fn clipboard_queries(&self) -> usize {
        lock(&self.inner).emu.clipboard_queries
    }

    pub fn size_request(&self) -> Option<(u16, u16)> {
        lock(&self.inner).emu.size_request
    }

    /// Drain and return all raw bytes written since the last call.
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut lock(&self.inner).raw)
    }
}

impl Tty for SimTty {
    fn start(&self) -> io::Result<()> {
        let mut inner = lock(&self.inner);
        if inner.closed {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        inner.started = true;
        inner.draining = false;
        Ok(())
    }

    fn stop(&self) -> io::Result<()> {
        lock(&self.inner).started = false;
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = lock(&self.inner);
        if inner.input.is_empty() && !inner.draining && !inner.closed {
            let (guard, _) = self
                .cv
                .wait_timeout(inner, READ_POLL)
                .unwrap_or_else(PoisonError::into_inner);
            inner = guard;
        }
        if inner.input.is_empty() {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        }
        let n = buf.len().min(inner.input.len());
        for slot in buf.iter_mut().take(n) {
            *slot = inner.input.pop_front().unwrap_or(0);
        }
        Ok(n)
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let mut inner = lock(&self.inner);
        if inner.closed {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        if inner.fail_next_write {
            inner.fail_next_write = false;
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        inner.raw.extend_from_slice(bytes);
        inner.emu.process(bytes);
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    fn window_size(&self) -> io::Result<WindowSize> {
        Ok(lock(&self.inner).size)
    }

    fn notify_resize(&self, tx: Sender<()>) {
        lock(&self.inner).resize_tx = Some(tx);
    }

    fn drain(&self) {
        lock(&self.inner).draining = true;
        self.cv.notify_all();
    }

    fn close(&self) -> io::Result<()> {
        let mut inner = lock(&self.inner);
        inner.closed = true;
        self.cv.notify_all();
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Canonical wire encoders
// ---------------------------------------------------------------------

fn csi_u(codepoint: u32, mods: ModMask) -> Vec<u8> {
    format!("\x1b[{};{}u", codepoint, encode_mods(mods)).into_bytes()
}

fn cursor_key(letter: char, mods: ModMask) -> Vec<u8> {
    if mods.is_empty() {
        format!("\x1b[{letter}").into_bytes()
    } else {
        format!("\x1b[1;{}{letter}", encode_mods(mods)).into_bytes()
    }
}

fn tilde_key(code: u16, mods: ModMask) -> Vec<u8> {
    if mods.is_empty() {
        format!("\x1b[{code}~").into_bytes()
    } else {
        format!("\x1b[{code};{}~", encode_mods(mods)).into_bytes()
    }
}

fn f_key_tilde_code(n: u8) -> u16 {
    match u16::from(n) {
        m @ 1..=5 => m + 10,
        m @ 6..=10 => m + 11,
        m @ 11..=14 => m + 12,
        m @ (15 | 16) => m + 13,
        m => m + 14,
    }
}

/// Canonical wire form of a key event. Keys beyond the XTerm repertoire
/// (e.g. `F(21)` and up) return an empty vector.
pub fn encode_key(key: Key, text: &str, mods: ModMask) -> Vec<u8> {
    let plainish = mods - ModMask::SHIFT == ModMask::empty();
    let altish = mods - (ModMask::SHIFT | ModMask::ALT) == ModMask::empty();
    match key {
        Key::Rune => {
            if plainish {
                text.as_bytes().to_vec()
            } else if altish {
                let mut out = vec![0x1b];
                out.extend_from_slice(text.as_bytes());
                out
            } else {
                match text.chars().next() {
                    Some(c) => csi_u(c as u32, mods),
                    None => Vec::new(),
                }
            }
        }
        Key::Ctrl(c) => {
            let byte = (c as u8) & 0x1f;
            if mods.contains(ModMask::ALT) {
                vec![0x1b, byte]
            } else {
                vec![byte]
            }
        }
        Key::Enter => {
            if plainish {
                vec![0x0d]
            } else {
                csi_u(13, mods)
            }
        }
        Key::Tab => {
            if plainish {
                vec![0x09]
            } else {
                csi_u(9, mods)
            }
        }
        Key::Backspace => {
            if plainish {
                vec![0x7f]
            } else {
                csi_u(127, mods)
            }
        }
        Key::Esc => {
            if plainish {
                vec![0x1b]
            } else {
                csi_u(27, mods)
            }
        }
        Key::Backtab => cursor_key('Z', mods),
        Key::Up => cursor_key('A', mods),
        Key::Down => cursor_key('B', mods),
        Key::Right => cursor_key('C', mods),
        Key::Left => cursor_key('D', mods),
        Key::Home => cursor_key('H', mods),
        Key::End => cursor_key('F', mods),
        Key::Insert => tilde_key(2, mods),
        Key::Delete => tilde_key(3, mods),
        Key::PageUp => tilde_key(5, mods),
        Key::PageDown => tilde_key(6, mods),
        Key::F(n @ 1..=4) => {
            if mods.is_empty() {
                vec![0x1b, b'O', b'O' + n] // P, Q, R, S
            } else {
                cursor_key((b'O' + n) as char, mods)
            }
        }
        Key::F(n @ 5..=20) => tilde_key(f_key_tilde_code(n), mods),
        Key::F(_) => Vec::new(),
    }
}

fn button_bits(button: ButtonMask) -> u32 {
    static WIRE: &[(ButtonMask, u32)] = &[
        (ButtonMask::BUTTON1, 0),
        (ButtonMask::BUTTON3, 1),
        (ButtonMask::BUTTON2, 2),
        (ButtonMask::BUTTON4, 0x80),
        (ButtonMask::BUTTON5, 0x81),
        (ButtonMask::BUTTON6, 0x82),
        (ButtonMask::BUTTON7, 0x83),
        (ButtonMask::WHEEL_UP, 0x40),
        (ButtonMask::WHEEL_DOWN, 0x41),
        (ButtonMask::WHEEL_LEFT, 0x42),
        (ButtonMask::WHEEL_RIGHT, 0x43),
    ];
    WIRE.iter()
        .find(|(b, _)| *b == button)
        .map(|(_, bits)| *bits)
        .unwrap_or(3)
}

/// SGR mouse report for a single button transition at 0-based `(x, y)`.
pub fn encode_mouse(x: u16, y: u16, button: ButtonMask, mods: ModMask, press: bool) -> Vec<u8> {
    let mut bb = button_bits(button);
    if mods.contains(ModMask::SHIFT) {
        bb |= 0x04;
    }
    if mods.contains(ModMask::ALT) {
        bb |= 0x08;
    }
    if mods.contains(ModMask::CTRL) {
        bb |= 0x10;
    }
    let fin = if press { 'M' } else { 'm' };
    format!("\x1b[<{};{};{}{}", bb, x + 1, y + 1, fin).into_bytes()
}

//! The escape-sequence state machine.
//!
//! Design invariants:
//! * One byte is consumed exactly once; a byte that aborts a sequence is
//!   replayed into the machine as fresh input so nothing is lost.
//! * Accumulators (`params`, `inters`, `text`, the UTF-8 rune buffer) are
//!   cleared when their sequence completes or is discarded, never between
//!   bytes of one sequence.
//! * The `buttons_down` mouse mask survives across `scan_utf8`/`scan` calls:
//!   wire-level mouse reports are not self-contained.
//! * Payload bytes are never logged; discard diagnostics carry lengths and
//!   reasons only.

use std::sync::atomic::Ordering::Relaxed;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use core_events::{
    ButtonMask, ClipboardEvent, Event, FocusEvent, Key, KeyEvent, ModMask, MouseEvent, PasteEvent,
};

use crate::PARSE_DISCARDS;
use crate::table;

// Accumulator caps; anything beyond these is hostile or garbage.
const MAX_PARAM_BYTES: usize = 64;
const MAX_INTER_BYTES: usize = 8;
const MAX_STRING_BYTES: usize = 64 * 1024;
const MAX_SEQ_BYTES: usize = 128;
const MAX_WIN32_REPEAT: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Utf8,
    Esc,
    Csi,
    Ss2,
    Ss3,
    Osc,
    Dcs,
    Sos,
    Pm,
    Apc,
    /// Inside a string state, ESC seen: the next byte decides ST vs abort.
    StPending,
    /// `ESC [ [`, the Linux console F1..F5 prefix.
    Lnx,
    /// Legacy X10 mouse report: collecting the three data bytes.
    X10,
}

pub struct InputParser {
    state: State,
    /// Raw bytes of the current sequence starting at the introducer ESC,
    /// kept so a timed-out prefix can replay as literal input.
    seq: Vec<u8>,
    // UTF-8 accumulation.
    rune: [u8; 4],
    rune_len: usize,
    rune_need: usize,
    // CSI / SS3 accumulation.
    params: Vec<u8>,
    inters: Vec<u8>,
    private: Option<u8>,
    // String payload (OSC/DCS/SOS/PM/APC) and its owning state.
    text: Vec<u8>,
    st_return: State,
    // X10 mouse data bytes.
    x10: [u8; 3],
    x10_len: usize,
    /// Alt pending for the next key (double-ESC or ESC-prefixed rune).
    alt: bool,
    /// Wire mouse state: buttons currently held down.
    buttons_down: ButtonMask,
    // Screen size for mouse clipping; 0 = unknown.
    cols: u16,
    rows: u16,
}

impl Default for InputParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InputParser {
    pub fn new() -> Self {
        Self {
            state: State::Init,
            seq: Vec::new(),
            rune: [0; 4],
            rune_len: 0,
            rune_need: 0,
            params: Vec::new(),
            inters: Vec::new(),
            private: None,
            text: Vec::new(),
            st_return: State::Osc,
            x10: [0; 3],
            x10_len: 0,
            alt: false,
            buttons_down: ButtonMask::empty(),
            cols: 0,
            rows: 0,
        }
    }

    /// Update the screen dimensions used to clip mouse coordinates.
    pub fn set_size(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
    }

    /// True when the machine sits between states: bytes were ingested that
    /// do not yet resolve to an event (typically a lone ESC). The caller
    /// should arm a short timeout and then call [`scan`](Self::scan).
    pub fn waiting(&self) -> bool {
        self.state != State::Init
    }

    /// Drop all parse state, including the mouse button mask.
    pub fn reset(&mut self) {
        *self = Self {
            cols: self.cols,
            rows: self.rows,
            ..Self::new()
        };
    }

    /// Feed raw terminal bytes; completed events append to `out` in source
    /// order.
    pub fn scan_utf8(&mut self, bytes: &[u8], out: &mut Vec<Event>) {
        for &b in bytes {
            self.step(b, out);
        }
    }

    /// Force a resolution of pending input after the disambiguation
    /// timeout: a lone ESC becomes `Key::Esc`; the bytes of an unfinished
    /// sequence replay as literal input behind it; an unfinished rune or
    /// string is discarded.
    pub fn scan(&mut self, out: &mut Vec<Event>) {
        match self.state {
            State::Init => {}
            State::Esc => {
                let mods = self.take_alt();
                self.to_init();
                out.push(Event::Key(KeyEvent::named(Key::Esc, mods)));
            }
            State::Csi | State::Ss2 | State::Ss3 | State::Lnx => {
                let seq = std::mem::take(&mut self.seq);
                self.state = State::Init;
                out.push(Event::Key(KeyEvent::named(Key::Esc, ModMask::empty())));
                for &b in seq.iter().skip(1) {
                    self.step(b, out);
                }
            }
            _ => self.discard("unterminated at timeout"),
        }
    }

    fn to_init(&mut self) {
        self.state = State::Init;
        self.seq.clear();
    }

    fn discard(&mut self, why: &'static str) {
        PARSE_DISCARDS.fetch_add(1, Relaxed);
        tracing::trace!(
            target: "input.parse",
            reason = why,
            seq_len = self.seq.len(),
            "sequence discarded"
        );
        self.to_init();
    }

    fn take_alt(&mut self) -> ModMask {
        if self.alt {
            self.alt = false;
            ModMask::ALT
        } else {
            ModMask::empty()
        }
    }

    fn step(&mut self, b: u8, out: &mut Vec<Event>) {
        // Prefix states record raw bytes for timeout replay.
        if matches!(
            self.state,
            State::Esc | State::Csi | State::Ss2 | State::Ss3 | State::Lnx
        ) {
            if self.seq.len() >= MAX_SEQ_BYTES {
                self.discard("sequence too long");
                return;
            }
            self.seq.push(b);
        }
        match self.state {
            State::Init => self.step_init(b, out),
            State::Utf8 => self.step_utf8(b, out),
            State::Esc => self.step_esc(b, out),
            State::Csi => self.step_csi(b, out),
            State::Ss2 => {
                // Single shift 2: consume the shifted byte, nothing mapped.
                self.discard("ss2");
            }
            State::Ss3 => self.step_ss3(b, out),
            State::Osc | State::Dcs | State::Sos | State::Pm | State::Apc => {
                self.step_string(b, out)
            }
            State::StPending => self.step_st_pending(b, out),
            State::Lnx => self.step_lnx(b, out),
            State::X10 => self.step_x10(b, out),
        }
    }

    // ---------------------------------------------------------------------
    // Ground state
    // ---------------------------------------------------------------------

    fn step_init(&mut self, b: u8, out: &mut Vec<Event>) {
        match b {
            0x1b => {
                self.seq.clear();
                self.seq.push(b);
                self.state = State::Esc;
            }
            0x00..=0x1f | 0x7f => {
                let mods = self.take_alt();
                self.emit_c0(b, mods, out);
            }
            0x20..=0x7e => {
                let mods = self.take_alt();
                let mut text = String::new();
                text.push(b as char);
                out.push(Event::Key(KeyEvent::rune(text, mods)));
            }
            _ => match utf8_need(b) {
                Some(need) => {
                    self.rune[0] = b;
                    self.rune_len = 1;
                    self.rune_need = need;
                    self.state = State::Utf8;
                }
                None => {
                    self.discard("invalid utf8 lead byte");
                }
            },
        }
    }

    /// C0 controls: Tab/Enter/Backspace keep their named keys, NUL is
    /// Ctrl-Space, everything else is a Ctrl chord on the 0x40-offset
    /// character.
    fn emit_c0(&mut self, b: u8, extra: ModMask, out: &mut Vec<Event>) {
        let ev = match b {
            0x00 => KeyEvent::rune(" ", extra | ModMask::CTRL),
            0x08 | 0x7f => KeyEvent::named(Key::Backspace, extra),
            0x09 => KeyEvent::named(Key::Tab, extra),
            0x0a | 0x0d => KeyEvent::named(Key::Enter, extra),
            0x1b => KeyEvent::named(Key::Esc, extra),
            _ => KeyEvent::named(Key::Ctrl((b + 0x40) as char), extra | ModMask::CTRL),
        };
        out.push(Event::Key(ev));
    }

    // ---------------------------------------------------------------------
    // UTF-8 accumulation
    // ---------------------------------------------------------------------

    fn step_utf8(&mut self, b: u8, out: &mut Vec<Event>) {
        if b & 0xc0 != 0x80 {
            self.discard("truncated utf8 rune");
            self.step(b, out);
            return;
        }
        self.rune[self.rune_len] = b;
        self.rune_len += 1;
        if self.rune_len < self.rune_need {
            return;
        }
        let mods = self.take_alt();
        match std::str::from_utf8(&self.rune[..self.rune_need]) {
            Ok(s) => out.push(Event::Key(KeyEvent::rune(s, mods))),
            Err(_) => {
                PARSE_DISCARDS.fetch_add(1, Relaxed);
                tracing::trace!(target: "input.parse", reason = "invalid utf8 rune", "sequence discarded");
            }
        }
        self.to_init();
    }

    // ---------------------------------------------------------------------
    // ESC dispatch
    // ---------------------------------------------------------------------

    fn step_esc(&mut self, b: u8, out: &mut Vec<Event>) {
        match b {
            b'[' => {
                self.params.clear();
                self.inters.clear();
                self.private = None;
                self.state = State::Csi;
            }
            b'O' => {
                self.params.clear();
                self.state = State::Ss3;
            }
            b'N' => self.state = State::Ss2,
            b']' => self.enter_string(State::Osc),
            b'P' => self.enter_string(State::Dcs),
            b'X' => self.enter_string(State::Sos),
            b'_' => self.enter_string(State::Apc),
            b'^' => self.enter_string(State::Pm),
            b'\\' => {
                // Orphaned string terminator.
                self.to_init();
            }
            0x1b => {
                // Double ESC: alt-modify the next key; the pending ESC
                // remains the one we are waiting on.
                self.alt = true;
                self.seq.clear();
                self.seq.push(0x1b);
            }
            _ => {
                // ESC-prefixed byte: alt-modify and replay as fresh input.
                self.alt = true;
                self.to_init();
                self.step(b, out);
            }
        }
    }

    fn enter_string(&mut self, kind: State) {
        self.text.clear();
        self.st_return = kind;
        self.state = kind;
    }

    // ---------------------------------------------------------------------
    // CSI
    // ---------------------------------------------------------------------

    fn step_csi(&mut self, b: u8, out: &mut Vec<Event>) {
        match b {
            0x30..=0x3f => {
                if matches!(b, b'<' | b'=' | b'>' | b'?')
                    && self.params.is_empty()
                    && self.private.is_none()
                {
                    self.private = Some(b);
                } else if self.params.len() < MAX_PARAM_BYTES {
                    self.params.push(b);
                } else {
                    self.discard("csi params too long");
                }
            }
            0x20..=0x2f => {
                if self.inters.len() < MAX_INTER_BYTES {
                    self.inters.push(b);
                } else {
                    self.discard("csi intermediates too long");
                }
            }
            b'[' if self.params.is_empty() && self.inters.is_empty() && self.private.is_none() => {
                self.state = State::Lnx;
            }
            0x40..=0x7e => self.dispatch_csi(b, out),
            0x1b => {
                self.discard("csi interrupted by esc");
                self.step(b, out);
            }
            _ => {
                self.discard("control byte inside csi");
                self.step(b, out);
            }
        }
    }

    fn parsed_params(&self) -> Vec<Vec<u32>> {
        let s = std::str::from_utf8(&self.params).unwrap_or("");
        if s.is_empty() {
            return Vec::new();
        }
        s.split(';')
            .map(|part| {
                part.split(':')
                    .map(|p| p.parse::<u32>().unwrap_or(0))
                    .collect()
            })
            .collect()
    }

    fn dispatch_csi(&mut self, final_byte: u8, out: &mut Vec<Event>) {
        let params = self.parsed_params();
        let private = self.private;
        let p = |i: usize| -> u32 {
            params
                .get(i)
                .and_then(|v| v.first())
                .copied()
                .unwrap_or(0)
        };
        match private {
            Some(b'<') if final_byte == b'M' || final_byte == b'm' => {
                self.to_init();
                self.emit_mouse(p(0), p(1), p(2), final_byte == b'M', out);
                return;
            }
            Some(_) => {
                // DEC private replies (DA, DECRPM, ...): internal only.
                tracing::debug!(
                    target: "input.parse",
                    final_byte = final_byte as char as u32,
                    "private csi reply swallowed"
                );
                self.to_init();
                return;
            }
            None => {}
        }

        match final_byte {
            b'M' if params.is_empty() && self.inters.is_empty() => {
                // Legacy X10 mouse: three data bytes follow.
                self.x10_len = 0;
                self.state = State::X10;
            }
            b'~' => {
                self.to_init();
                match p(0) {
                    200 => out.push(Event::Paste(PasteEvent::new(true))),
                    201 => out.push(Event::Paste(PasteEvent::new(false))),
                    27 => {
                        // modifyOtherKeys: 27 ; mods ; codepoint.
                        let mods = table::decode_mods(p(1)) | self.take_alt();
                        if let Some(c) = char::from_u32(p(2)) {
                            if (c as u32) < 0x20 || c as u32 == 0x7f {
                                self.emit_c0(c as u8, mods, out);
                            } else {
                                out.push(Event::Key(KeyEvent {
                                    mods,
                                    ..KeyEvent::rune(c.to_string(), ModMask::empty())
                                }));
                            }
                        } else {
                            self.count_discard("modifyOtherKeys codepoint");
                        }
                    }
                    n => {
                        let mods = table::decode_mods(p(1)) | self.take_alt();
                        match table::lookup_csi(b'~', Some(n as u16)) {
                            Some(key) => out.push(Event::Key(KeyEvent::named(key, mods))),
                            None => self.count_discard("unknown tilde key"),
                        }
                    }
                }
            }
            b'u' => {
                self.to_init();
                self.dispatch_csi_u(&params, out);
            }
            b'_' => {
                self.to_init();
                self.dispatch_win32(&params, out);
            }
            b'I' => {
                self.to_init();
                out.push(Event::Focus(FocusEvent::new(true)));
            }
            b'O' => {
                self.to_init();
                out.push(Event::Focus(FocusEvent::new(false)));
            }
            b'R' if params.len() >= 2 && p(0) != 1 => {
                // Cursor position report; internal only.
                self.to_init();
            }
            b't' | b'y' => {
                // Window ops / mode reports; internal only.
                self.to_init();
            }
            _ => {
                self.to_init();
                match table::lookup_csi(final_byte, None) {
                    Some(key) => {
                        let mods = table::decode_mods(p(1)) | self.take_alt();
                        out.push(Event::Key(KeyEvent::named(key, mods)));
                    }
                    None => self.count_discard("unknown csi final"),
                }
            }
        }
    }

    fn count_discard(&mut self, why: &'static str) {
        PARSE_DISCARDS.fetch_add(1, Relaxed);
        tracing::trace!(target: "input.parse", reason = why, "sequence discarded");
    }

    /// Kitty CSI-u: `codepoint[:alternates] ; mods[:event-type] u`.
    fn dispatch_csi_u(&mut self, params: &[Vec<u32>], out: &mut Vec<Event>) {
        let codepoint = params.first().and_then(|v| v.first()).copied().unwrap_or(0);
        let mods_param = params.get(1).and_then(|v| v.first()).copied().unwrap_or(1);
        let event_type = params.get(1).and_then(|v| v.get(1)).copied().unwrap_or(1);
        if event_type == 3 {
            // Key release; only presses and repeats surface.
            return;
        }
        let mods = table::decode_mods(mods_param) | self.take_alt();
        match codepoint {
            9 => out.push(Event::Key(KeyEvent::named(Key::Tab, mods))),
            10 | 13 => out.push(Event::Key(KeyEvent::named(Key::Enter, mods))),
            27 => out.push(Event::Key(KeyEvent::named(Key::Esc, mods))),
            127 => out.push(Event::Key(KeyEvent::named(Key::Backspace, mods))),
            0xe000..=0xf8ff => {
                // Kitty functional-key private-use block without a mapping.
                self.count_discard("unmapped csi-u functional key");
            }
            cp => match char::from_u32(cp) {
                Some(c) if !c.is_control() => out.push(Event::Key(KeyEvent {
                    mods,
                    ..KeyEvent::rune(c.to_string(), ModMask::empty())
                })),
                _ => self.count_discard("csi-u codepoint"),
            },
        }
    }

    /// Win32 input mode: `Vk ; Sc ; Uc ; Kd ; Cs ; Rc _`.
    fn dispatch_win32(&mut self, params: &[Vec<u32>], out: &mut Vec<Event>) {
        let p = |i: usize| params.get(i).and_then(|v| v.first()).copied().unwrap_or(0);
        let vk = p(0);
        let uc = p(2);
        let kd = p(3);
        let cs = p(4);
        let rc = p(5).clamp(1, MAX_WIN32_REPEAT);
        if kd == 0 {
            return;
        }
        let mut mods = ModMask::empty();
        if cs & 0x10 != 0 {
            mods |= ModMask::SHIFT;
        }
        if cs & 0x03 != 0 {
            mods |= ModMask::ALT;
        }
        if cs & 0x0c != 0 {
            mods |= ModMask::CTRL;
        }
        for _ in 0..rc {
            if uc != 0 {
                match char::from_u32(uc) {
                    Some(c) if (c as u32) < 0x20 || c as u32 == 0x7f => {
                        self.emit_c0(c as u8, mods, out)
                    }
                    Some(c) => out.push(Event::Key(KeyEvent {
                        mods,
                        ..KeyEvent::rune(c.to_string(), ModMask::empty())
                    })),
                    None => self.count_discard("win32 codepoint"),
                }
            } else if let Some(key) = win32_vk_key(vk) {
                out.push(Event::Key(KeyEvent::named(key, mods)));
            } else {
                // Bare modifier or unmapped virtual key.
                return;
            }
        }
    }

    // ---------------------------------------------------------------------
    // SS3
    // ---------------------------------------------------------------------

    fn step_ss3(&mut self, b: u8, out: &mut Vec<Event>) {
        match b {
            0x30..=0x3b => {
                if self.params.len() < MAX_PARAM_BYTES {
                    self.params.push(b);
                } else {
                    self.discard("ss3 params too long");
                }
            }
            0x40..=0x7e => {
                let params = self.parsed_params();
                let mods_param = params.get(1).and_then(|v| v.first()).copied().unwrap_or(0);
                self.to_init();
                match table::lookup_ss3(b) {
                    Some(key) => {
                        let mods = table::decode_mods(mods_param) | self.take_alt();
                        out.push(Event::Key(KeyEvent::named(key, mods)));
                    }
                    None => self.count_discard("unknown ss3 final"),
                }
            }
            _ => {
                self.discard("control byte inside ss3");
                self.step(b, out);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Linux console function keys: ESC [ [ A..E
    // ---------------------------------------------------------------------

    fn step_lnx(&mut self, b: u8, out: &mut Vec<Event>) {
        match b {
            b'A'..=b'E' => {
                let mods = self.take_alt();
                self.to_init();
                out.push(Event::Key(KeyEvent::named(Key::F(b - b'A' + 1), mods)));
            }
            _ => {
                self.discard("unknown linux console key");
                self.step(b, out);
            }
        }
    }

    // ---------------------------------------------------------------------
    // String states (OSC / DCS / SOS / PM / APC)
    // ---------------------------------------------------------------------

    fn step_string(&mut self, b: u8, out: &mut Vec<Event>) {
        match b {
            0x07 => {
                self.finish_string(out);
            }
            0x1b => {
                self.state = State::StPending;
            }
            0x18 | 0x1a => {
                // CAN / SUB abort.
                self.discard("string aborted");
            }
            _ => {
                if self.text.len() >= MAX_STRING_BYTES {
                    self.discard("string too long");
                } else {
                    self.text.push(b);
                }
            }
        }
    }

    fn step_st_pending(&mut self, b: u8, out: &mut Vec<Event>) {
        if b == b'\\' {
            self.finish_string(out);
        } else {
            // ESC inside a string that is not ST: drop the string and treat
            // the ESC as the start of a new sequence.
            self.discard("string interrupted by esc");
            self.step(0x1b, out);
            self.step(b, out);
        }
    }

    fn finish_string(&mut self, out: &mut Vec<Event>) {
        let kind = self.st_return;
        let text = std::mem::take(&mut self.text);
        self.to_init();
        match kind {
            State::Osc => self.dispatch_osc(&text, out),
            State::Dcs => {
                // Device attribute / XTVERSION style replies: internal only.
                tracing::debug!(
                    target: "input.parse",
                    len = text.len(),
                    "dcs reply swallowed"
                );
            }
            _ => {
                tracing::trace!(
                    target: "input.parse",
                    kind = ?kind,
                    len = text.len(),
                    "string swallowed"
                );
            }
        }
    }

    fn dispatch_osc(&mut self, text: &[u8], out: &mut Vec<Event>) {
        let s = String::from_utf8_lossy(text);
        let mut parts = s.splitn(3, ';');
        let selector = parts.next().unwrap_or("");
        if selector != "52" {
            tracing::trace!(target: "input.parse", selector = selector, "osc swallowed");
            return;
        }
        let _clipboard = parts.next().unwrap_or("");
        let payload = parts.next().unwrap_or("");
        if payload == "?" {
            return;
        }
        match BASE64.decode(payload.as_bytes()) {
            Ok(data) => out.push(Event::Clipboard(ClipboardEvent::new(data))),
            Err(_) => self.count_discard("osc 52 payload"),
        }
    }

    // ---------------------------------------------------------------------
    // Mouse
    // ---------------------------------------------------------------------

    fn step_x10(&mut self, b: u8, out: &mut Vec<Event>) {
        self.x10[self.x10_len] = b;
        self.x10_len += 1;
        if self.x10_len < 3 {
            return;
        }
        let bb = u32::from(self.x10[0]).saturating_sub(32);
        let x = u32::from(self.x10[1]).saturating_sub(32);
        let y = u32::from(self.x10[2]).saturating_sub(32);
        self.to_init();
        if bb & 0x43 == 0x03 {
            // Release; the wire does not say which button went up.
            if self.buttons_down.is_empty() && bb & 0x20 == 0 {
                return;
            }
            if bb & 0x20 == 0 {
                self.buttons_down = ButtonMask::empty();
            }
            let (cx, cy) = self.clip_mouse(x, y);
            out.push(Event::Mouse(MouseEvent::new(
                cx,
                cy,
                self.buttons_down,
                mouse_mods(bb),
            )));
            return;
        }
        self.emit_mouse(bb, x, y, true, out);
    }

    /// Shared SGR/X10 button report handling. `x`/`y` are 1-based wire
    /// coordinates; `press` distinguishes `M` from `m` finals.
    fn emit_mouse(&mut self, bb: u32, x: u32, y: u32, press: bool, out: &mut Vec<Event>) {
        let mods = mouse_mods(bb);
        let button = mouse_button(bb);
        let (cx, cy) = self.clip_mouse(x, y);

        if button.intersects(ButtonMask::WHEEL) {
            if !press {
                return;
            }
            // Wheel impulses are reported but never latch.
            out.push(Event::Mouse(MouseEvent::new(
                cx,
                cy,
                self.buttons_down | button,
                mods,
            )));
            return;
        }
        if button.is_empty() {
            // Motion with no button transition: report the held mask.
            out.push(Event::Mouse(MouseEvent::new(cx, cy, self.buttons_down, mods)));
            return;
        }
        if press {
            self.buttons_down |= button;
        } else {
            if !self.buttons_down.contains(button) {
                // Release without a matching press.
                return;
            }
            self.buttons_down.remove(button);
        }
        out.push(Event::Mouse(MouseEvent::new(cx, cy, self.buttons_down, mods)));
    }

    fn clip_mouse(&self, x: u32, y: u32) -> (u16, u16) {
        let mut cx = x.saturating_sub(1).min(u32::from(u16::MAX)) as u16;
        let mut cy = y.saturating_sub(1).min(u32::from(u16::MAX)) as u16;
        if self.cols > 0 {
            cx = cx.min(self.cols - 1);
        }
        if self.rows > 0 {
            cy = cy.min(self.rows - 1);
        }
        (cx, cy)
    }
}

fn mouse_mods(bb: u32) -> ModMask {
    let mut mods = ModMask::empty();
    if bb & 0x04 != 0 {
        mods |= ModMask::SHIFT;
    }
    if bb & 0x08 != 0 {
        mods |= ModMask::ALT;
    }
    if bb & 0x10 != 0 {
        mods |= ModMask::CTRL;
    }
    mods
}

/// Wire button bits to mask, with the physical-right / logical-2 remap.
fn mouse_button(bb: u32) -> ButtonMask {
    if bb & 0x40 != 0 {
        match bb & 0x03 {
            0 => ButtonMask::WHEEL_UP,
            1 => ButtonMask::WHEEL_DOWN,
            2 => ButtonMask::WHEEL_LEFT,
            _ => ButtonMask::WHEEL_RIGHT,
        }
    } else if bb & 0x80 != 0 {
        match bb & 0x03 {
            0 => ButtonMask::BUTTON4,
            1 => ButtonMask::BUTTON5,
            2 => ButtonMask::BUTTON6,
            _ => ButtonMask::BUTTON7,
        }
    } else {
        match bb & 0x03 {
            0 => ButtonMask::BUTTON1,
            1 => ButtonMask::BUTTON3,
            2 => ButtonMask::BUTTON2,
            _ => ButtonMask::empty(),
        }
    }
}

fn utf8_need(b: u8) -> Option<usize> {
    match b {
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

fn win32_vk_key(vk: u32) -> Option<Key> {
    Some(match vk {
        0x08 => Key::Backspace,
        0x09 => Key::Tab,
        0x0d => Key::Enter,
        0x1b => Key::Esc,
        0x21 => Key::PageUp,
        0x22 => Key::PageDown,
        0x23 => Key::End,
        0x24 => Key::Home,
        0x25 => Key::Left,
        0x26 => Key::Up,
        0x27 => Key::Right,
        0x28 => Key::Down,
        0x2d => Key::Insert,
        0x2e => Key::Delete,
        0x70..=0x87 => Key::F((vk - 0x6f) as u8),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(p: &mut InputParser, bytes: &[u8]) -> Vec<Event> {
        let mut out = Vec::new();
        p.scan_utf8(bytes, &mut out);
        out
    }

    fn keys(events: &[Event]) -> Vec<(Key, String, ModMask)> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Key(k) => Some((k.key, k.text.clone(), k.mods)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn plain_runes_in_order() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"abc");
        let ks = keys(&out);
        assert_eq!(ks.len(), 3);
        assert_eq!(ks[0], (Key::Rune, "a".into(), ModMask::empty()));
        assert_eq!(ks[1].1, "b");
        assert_eq!(ks[2].1, "c");
        assert!(!p.waiting());
    }

    #[test]
    fn multibyte_rune() {
        let mut p = InputParser::new();
        let out = feed(&mut p, "é".as_bytes());
        assert_eq!(keys(&out), vec![(Key::Rune, "é".into(), ModMask::empty())]);
    }

    #[test]
    fn nul_is_ctrl_space() {
        let mut p = InputParser::new();
        let out = feed(&mut p, &[0x00]);
        assert_eq!(keys(&out), vec![(Key::Rune, " ".into(), ModMask::CTRL)]);
    }

    #[test]
    fn c0_controls_are_ctrl_chords() {
        let mut p = InputParser::new();
        let out = feed(&mut p, &[0x01, 0x1a]);
        let ks = keys(&out);
        assert_eq!(ks[0], (Key::Ctrl('A'), String::new(), ModMask::CTRL));
        assert_eq!(ks[1], (Key::Ctrl('Z'), String::new(), ModMask::CTRL));
    }

    #[test]
    fn named_c0_keep_their_keys() {
        let mut p = InputParser::new();
        let out = feed(&mut p, &[0x09, 0x0d, 0x08, 0x7f]);
        let ks = keys(&out);
        assert_eq!(ks[0].0, Key::Tab);
        assert_eq!(ks[1].0, Key::Enter);
        assert_eq!(ks[2].0, Key::Backspace);
        assert_eq!(ks[3].0, Key::Backspace);
        assert!(ks.iter().all(|k| k.2.is_empty()));
    }

    #[test]
    fn csi_arrow() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[A");
        assert_eq!(keys(&out), vec![(Key::Up, String::new(), ModMask::empty())]);
    }

    #[test]
    fn csi_arrow_with_ctrl() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[1;5A");
        assert_eq!(keys(&out), vec![(Key::Up, String::new(), ModMask::CTRL)]);
    }

    #[test]
    fn ss3_function_keys() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1bOP\x1bOS");
        let ks = keys(&out);
        assert_eq!(ks[0].0, Key::F(1));
        assert_eq!(ks[1].0, Key::F(4));
    }

    #[test]
    fn ss3_modified_arrow() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1bO1;3B");
        assert_eq!(keys(&out), vec![(Key::Down, String::new(), ModMask::ALT)]);
    }

    #[test]
    fn tilde_keys() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[5~\x1b[24~");
        let ks = keys(&out);
        assert_eq!(ks[0].0, Key::PageUp);
        assert_eq!(ks[1].0, Key::F(12));
    }

    #[test]
    fn linux_console_function_keys() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[[A\x1b[[E");
        let ks = keys(&out);
        assert_eq!(ks[0].0, Key::F(1));
        assert_eq!(ks[1].0, Key::F(5));
    }

    #[test]
    fn alt_prefixed_rune() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b\x1bx");
        assert_eq!(keys(&out), vec![(Key::Rune, "x".into(), ModMask::ALT)]);
    }

    #[test]
    fn esc_then_rune_is_alt_rune() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1bq");
        assert_eq!(keys(&out), vec![(Key::Rune, "q".into(), ModMask::ALT)]);
    }

    #[test]
    fn lone_esc_waits_then_scan_flushes() {
        let mut p = InputParser::new();
        let out = feed(&mut p, &[0x1b]);
        assert!(out.is_empty());
        assert!(p.waiting());
        let mut out = Vec::new();
        p.scan(&mut out);
        assert_eq!(keys(&out), vec![(Key::Esc, String::new(), ModMask::empty())]);
        assert!(!p.waiting());
    }

    #[test]
    fn timed_out_csi_prefix_replays_as_text() {
        let mut p = InputParser::new();
        feed(&mut p, b"\x1b[1");
        assert!(p.waiting());
        let mut out = Vec::new();
        p.scan(&mut out);
        let ks = keys(&out);
        assert_eq!(ks[0].0, Key::Esc);
        assert_eq!(ks[1], (Key::Rune, "[".into(), ModMask::empty()));
        assert_eq!(ks[2], (Key::Rune, "1".into(), ModMask::empty()));
        assert!(!p.waiting());
    }

    #[test]
    fn paste_markers_bracket_runes() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[200~hi\x1b[201~");
        assert_eq!(out.len(), 4);
        assert!(matches!(out[0], Event::Paste(PasteEvent { start: true, .. })));
        assert!(matches!(&out[1], Event::Key(k) if k.text == "h"));
        assert!(matches!(&out[2], Event::Key(k) if k.text == "i"));
        assert!(matches!(
            out[3],
            Event::Paste(PasteEvent { start: false, .. })
        ));
    }

    #[test]
    fn focus_reports() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[I\x1b[O");
        assert!(matches!(out[0], Event::Focus(FocusEvent { focused: true, .. })));
        assert!(matches!(
            out[1],
            Event::Focus(FocusEvent { focused: false, .. })
        ));
    }

    #[test]
    fn sgr_mouse_press_release() {
        let mut p = InputParser::new();
        p.set_size(80, 24);
        let out = feed(&mut p, b"\x1b[<0;10;5M\x1b[<0;10;5m");
        assert_eq!(out.len(), 2);
        match &out[0] {
            Event::Mouse(m) => {
                assert_eq!((m.x, m.y), (9, 4));
                assert_eq!(m.buttons, ButtonMask::BUTTON1);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &out[1] {
            Event::Mouse(m) => {
                assert_eq!((m.x, m.y), (9, 4));
                assert!(m.buttons.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sgr_right_button_remaps_to_button2() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[<2;1;1M");
        match &out[0] {
            Event::Mouse(m) => assert_eq!(m.buttons, ButtonMask::BUTTON2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn wheel_never_latches() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[<64;3;3M\x1b[<35;4;4M");
        match &out[0] {
            Event::Mouse(m) => assert_eq!(m.buttons, ButtonMask::WHEEL_UP),
            other => panic!("unexpected {other:?}"),
        }
        // Subsequent motion report carries no latched wheel bit.
        match &out[1] {
            Event::Mouse(m) => assert!(m.buttons.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn release_without_press_is_dropped() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[<0;2;2m");
        assert!(out.is_empty());
    }

    #[test]
    fn drag_keeps_button_held() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[<0;1;1M\x1b[<32;2;2M\x1b[<0;3;3m");
        assert_eq!(out.len(), 3);
        match &out[1] {
            Event::Mouse(m) => {
                assert_eq!(m.buttons, ButtonMask::BUTTON1);
                assert_eq!((m.x, m.y), (1, 1));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &out[2] {
            Event::Mouse(m) => assert!(m.buttons.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mouse_coordinates_clip_to_screen() {
        let mut p = InputParser::new();
        p.set_size(10, 5);
        let out = feed(&mut p, b"\x1b[<0;500;500M");
        match &out[0] {
            Event::Mouse(m) => assert_eq!((m.x, m.y), (9, 4)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn x10_mouse_press_release() {
        let mut p = InputParser::new();
        // b=32 (button1 press), x=33 (col 0), y=34 (row 1); then release 35.
        let out = feed(&mut p, &[0x1b, b'[', b'M', 32, 33, 34, 0x1b, b'[', b'M', 35, 33, 34]);
        assert_eq!(out.len(), 2);
        match &out[0] {
            Event::Mouse(m) => {
                assert_eq!(m.buttons, ButtonMask::BUTTON1);
                assert_eq!((m.x, m.y), (0, 1));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &out[1] {
            Event::Mouse(m) => assert!(m.buttons.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn osc52_clipboard_decodes() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b]52;c;aGVsbG8=\x07");
        match &out[0] {
            Event::Clipboard(c) => assert_eq!(c.data, b"hello"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn osc52_with_st_terminator() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b]52;c;aGk=\x1b\\");
        match &out[0] {
            Event::Clipboard(c) => assert_eq!(c.data, b"hi"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn osc52_query_reply_placeholder_ignored() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b]52;c;?\x07");
        assert!(out.is_empty());
    }

    #[test]
    fn other_osc_swallowed() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b]0;title\x07");
        assert!(out.is_empty());
        assert!(!p.waiting());
    }

    #[test]
    fn dcs_reply_swallowed() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1bP>|kitty 0.32\x1b\\");
        assert!(out.is_empty());
        assert!(!p.waiting());
    }

    #[test]
    fn da_reply_swallowed() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[?64;1;2c");
        assert!(out.is_empty());
        assert!(!p.waiting());
    }

    #[test]
    fn modify_other_keys() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[27;5;113~");
        assert_eq!(keys(&out), vec![(Key::Rune, "q".into(), ModMask::CTRL)]);
    }

    #[test]
    fn csi_u_basic_and_named() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[97;5u\x1b[13;2u");
        let ks = keys(&out);
        assert_eq!(ks[0], (Key::Rune, "a".into(), ModMask::CTRL));
        assert_eq!(ks[1], (Key::Enter, String::new(), ModMask::SHIFT));
    }

    #[test]
    fn csi_u_release_ignored() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[97;1:3u");
        assert!(out.is_empty());
    }

    #[test]
    fn win32_input_mode_key() {
        let mut p = InputParser::new();
        // Vk 0x41 ('A'), Uc 97 ('a'), key down, no control state.
        let out = feed(&mut p, b"\x1b[65;30;97;1;0;1_");
        assert_eq!(keys(&out), vec![(Key::Rune, "a".into(), ModMask::empty())]);
    }

    #[test]
    fn win32_key_up_ignored() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[65;30;97;0;0;1_");
        assert!(out.is_empty());
    }

    #[test]
    fn win32_named_key_with_repeat() {
        let mut p = InputParser::new();
        // VK_DOWN (0x28 = 40), no unicode char, repeat 3.
        let out = feed(&mut p, b"\x1b[40;80;0;1;0;3_");
        let ks = keys(&out);
        assert_eq!(ks.len(), 3);
        assert!(ks.iter().all(|k| k.0 == Key::Down));
    }

    #[test]
    fn malformed_csi_discards_without_event() {
        let mut p = InputParser::new();
        let out = feed(&mut p, b"\x1b[999\xc2\xa7");
        // The CSI is aborted; the § replays as a rune.
        let ks = keys(&out);
        assert!(ks.iter().all(|k| k.0 == Key::Rune));
        assert!(!p.waiting());
    }

    #[test]
    fn reset_clears_mouse_state() {
        let mut p = InputParser::new();
        feed(&mut p, b"\x1b[<0;1;1M");
        p.reset();
        let out = feed(&mut p, b"\x1b[<0;1;1m");
        assert!(out.is_empty(), "release after reset must be dropped");
    }
}

//! End-to-end input: bytes injected into the Tty travel through the reader
//! thread and parser and come out as typed events; the canonical encoders
//! round-trip every key and mouse form they can express.

use std::sync::Arc;
use std::time::Duration;

use core_events::{ButtonMask, Event, Key, ModMask};
use core_screen::sim::{SimTty, encode_key};
use core_screen::{Screen, ScreenConfig, Tty};
use crossbeam_channel::Receiver;

fn start(cols: u16, rows: u16) -> (Screen, Arc<SimTty>, Receiver<Event>) {
    let tty = Arc::new(SimTty::new(cols, rows));
    let config = ScreenConfig::default().with_esc_timeout(Duration::from_millis(25));
    let screen = Screen::new(tty.clone() as Arc<dyn Tty>, config);
    screen.init().expect("init");
    let events = screen.events();
    let ev = events
        .recv_timeout(Duration::from_secs(2))
        .expect("initial resize");
    assert!(matches!(ev, Event::Resize(_)));
    (screen, tty, events)
}

fn next(events: &Receiver<Event>) -> Event {
    events
        .recv_timeout(Duration::from_secs(2))
        .expect("event within deadline")
}

#[test]
fn plain_text_arrives_in_order() {
    let (screen, tty, events) = start(80, 24);
    tty.send_raw(b"abc");
    for expected in ["a", "b", "c"] {
        match next(&events) {
            Event::Key(k) => {
                assert_eq!(k.key, Key::Rune);
                assert_eq!(k.text, expected);
                assert!(k.mods.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    screen.fini();
}

#[test]
fn named_keys_round_trip_with_modifiers() {
    let (screen, tty, events) = start(80, 24);
    let keys = [
        Key::Up,
        Key::Down,
        Key::Left,
        Key::Right,
        Key::Home,
        Key::End,
        Key::PageUp,
        Key::PageDown,
        Key::Insert,
        Key::Delete,
        Key::Backtab,
        Key::Enter,
        Key::Tab,
        Key::Backspace,
        Key::F(1),
        Key::F(4),
        Key::F(5),
        Key::F(12),
        Key::F(20),
    ];
    let mod_sets = [
        ModMask::empty(),
        ModMask::CTRL,
        ModMask::ALT,
        ModMask::SHIFT | ModMask::CTRL,
        ModMask::CTRL | ModMask::ALT,
    ];
    for key in keys {
        for mods in mod_sets {
            tty.inject_key(key, "", mods);
            match next(&events) {
                Event::Key(k) => {
                    assert_eq!(k.key, key, "key {key:?} mods {mods:?}");
                    assert_eq!(k.mods, mods, "key {key:?} mods {mods:?}");
                    assert!(k.text.is_empty());
                }
                other => panic!("unexpected {other:?} for {key:?}+{mods:?}"),
            }
        }
    }
    screen.fini();
}

#[test]
fn rune_round_trips_through_every_encoding() {
    let (screen, tty, events) = start(80, 24);
    for mods in [
        ModMask::empty(),
        ModMask::ALT,
        ModMask::CTRL,
        ModMask::CTRL | ModMask::SHIFT,
    ] {
        tty.inject_key(Key::Rune, "g", mods);
        match next(&events) {
            Event::Key(k) => {
                assert_eq!(k.key, Key::Rune, "mods {mods:?}");
                assert_eq!(k.text, "g");
                assert_eq!(k.mods, mods);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    screen.fini();
}

#[test]
fn ctrl_chords_round_trip() {
    let (screen, tty, events) = start(80, 24);
    tty.inject_key(Key::Ctrl('A'), "", ModMask::CTRL);
    match next(&events) {
        Event::Key(k) => {
            assert_eq!(k.key, Key::Ctrl('A'));
            assert_eq!(k.mods, ModMask::CTRL);
        }
        other => panic!("unexpected {other:?}"),
    }
    tty.inject_key(Key::Ctrl('X'), "", ModMask::CTRL | ModMask::ALT);
    match next(&events) {
        Event::Key(k) => {
            assert_eq!(k.key, Key::Ctrl('X'));
            assert_eq!(k.mods, ModMask::CTRL | ModMask::ALT);
        }
        other => panic!("unexpected {other:?}"),
    }
    screen.fini();
}

#[test]
fn lone_escape_resolves_after_timeout() {
    let (screen, tty, events) = start(80, 24);
    tty.send_raw(&[0x1b]);
    match next(&events) {
        Event::Key(k) => {
            assert_eq!(k.key, Key::Esc);
            assert!(k.mods.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
    screen.fini();
}

#[test]
fn escape_with_modifiers_uses_csi_u() {
    let (screen, tty, events) = start(80, 24);
    tty.inject_key(Key::Esc, "", ModMask::CTRL);
    match next(&events) {
        Event::Key(k) => {
            assert_eq!(k.key, Key::Esc);
            assert_eq!(k.mods, ModMask::CTRL);
        }
        other => panic!("unexpected {other:?}"),
    }
    screen.fini();
}

#[test]
fn mouse_press_drag_release() {
    let (screen, tty, events) = start(80, 24);
    tty.inject_mouse_press(9, 4, ButtonMask::BUTTON1, ModMask::empty());
    match next(&events) {
        Event::Mouse(m) => {
            assert_eq!((m.x, m.y), (9, 4));
            assert_eq!(m.buttons, ButtonMask::BUTTON1);
        }
        other => panic!("unexpected {other:?}"),
    }
    tty.inject_mouse_release(9, 4, ButtonMask::BUTTON1, ModMask::empty());
    match next(&events) {
        Event::Mouse(m) => {
            assert_eq!((m.x, m.y), (9, 4));
            assert!(m.buttons.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
    screen.fini();
}

#[test]
fn wheel_and_upper_buttons() {
    let (screen, tty, events) = start(80, 24);
    tty.inject_mouse_press(0, 0, ButtonMask::WHEEL_DOWN, ModMask::CTRL);
    match next(&events) {
        Event::Mouse(m) => {
            assert_eq!(m.buttons, ButtonMask::WHEEL_DOWN);
            assert_eq!(m.mods, ModMask::CTRL);
        }
        other => panic!("unexpected {other:?}"),
    }
    tty.inject_mouse_press(3, 3, ButtonMask::BUTTON4, ModMask::empty());
    match next(&events) {
        Event::Mouse(m) => assert_eq!(m.buttons, ButtonMask::BUTTON4),
        other => panic!("unexpected {other:?}"),
    }
    screen.fini();
}

#[test]
fn focus_and_paste_markers() {
    let (screen, tty, events) = start(80, 24);
    tty.inject_focus(true);
    assert!(matches!(next(&events), Event::Focus(f) if f.focused));
    tty.inject_focus(false);
    assert!(matches!(next(&events), Event::Focus(f) if !f.focused));

    tty.inject_paste_marker(true);
    tty.send_raw(b"hi");
    tty.inject_paste_marker(false);
    assert!(matches!(next(&events), Event::Paste(p) if p.start));
    assert!(matches!(next(&events), Event::Key(k) if k.text == "h"));
    assert!(matches!(next(&events), Event::Key(k) if k.text == "i"));
    assert!(matches!(next(&events), Event::Paste(p) if !p.start));
    screen.fini();
}

#[test]
fn clipboard_reply_surfaces_as_event() {
    let (screen, tty, events) = start(80, 24);
    screen.get_clipboard();
    assert_eq!(tty.clipboard_queries(), 1);
    tty.send_raw(b"\x1b]52;c;cm91bmQtdHJpcA==\x07");
    match next(&events) {
        Event::Clipboard(c) => assert_eq!(c.data, b"round-trip"),
        other => panic!("unexpected {other:?}"),
    }
    screen.fini();
}

#[test]
fn resize_notification_updates_geometry() {
    let (screen, tty, events) = start(40, 12);
    assert_eq!(screen.size(), (40, 12));
    tty.set_window_size(100, 30);
    match next(&events) {
        Event::Resize(r) => {
            assert_eq!((r.cols, r.rows), (100, 30));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(screen.size(), (100, 30));
    screen.fini();
}

#[test]
fn encoder_rejects_out_of_repertoire_keys() {
    assert!(encode_key(Key::F(21), "", ModMask::empty()).is_empty());
}

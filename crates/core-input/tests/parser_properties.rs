//! Byte-level robustness properties for the input parser.
//!
//! The parser sits directly on the terminal read path, so arbitrary byte
//! soup must never panic, wedge the state machine, or fabricate events with
//! out-of-range coordinates.

use core_events::{Event, Key};
use core_input::InputParser;
use proptest::prelude::*;

/// Force-resolve anything pending, as the screen's timeout driver would.
fn settle(parser: &mut InputParser, out: &mut Vec<Event>) {
    for _ in 0..8 {
        if !parser.waiting() {
            return;
        }
        parser.scan(out);
    }
    assert!(!parser.waiting(), "parser failed to settle");
}

#[test]
fn every_single_byte_is_at_most_one_event_and_returns_to_ground() {
    for b in 0..=255u8 {
        let mut parser = InputParser::new();
        let mut out = Vec::new();
        parser.scan_utf8(&[b], &mut out);
        settle(&mut parser, &mut out);
        assert!(
            out.len() <= 1,
            "byte {b:#04x} produced {} events: {out:?}",
            out.len()
        );
        assert!(!parser.waiting(), "byte {b:#04x} left the parser waiting");
    }
}

#[test]
fn control_bytes_map_to_ctrl_chords() {
    for b in 0x01..=0x1au8 {
        let mut parser = InputParser::new();
        let mut out = Vec::new();
        parser.scan_utf8(&[b], &mut out);
        settle(&mut parser, &mut out);
        let Some(Event::Key(key)) = out.first() else {
            panic!("byte {b:#04x} produced no key event");
        };
        match b {
            0x08 => assert_eq!(key.key, Key::Backspace),
            0x09 => assert_eq!(key.key, Key::Tab),
            0x0a | 0x0d => assert_eq!(key.key, Key::Enter),
            _ => {
                assert_eq!(key.key, Key::Ctrl((b + 0x40) as char), "byte {b:#04x}");
                assert!(key.mods.contains(core_events::ModMask::CTRL));
                assert!(key.text.is_empty());
            }
        }
    }
}

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic_and_always_settle(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut parser = InputParser::new();
        parser.set_size(80, 24);
        let mut out = Vec::new();
        parser.scan_utf8(&bytes, &mut out);
        settle(&mut parser, &mut out);
        prop_assert!(!parser.waiting());
        for ev in &out {
            if let Event::Mouse(m) = ev {
                prop_assert!(m.x < 80 && m.y < 24, "unclipped mouse event {m:?}");
            }
        }
    }

    #[test]
    fn chunk_boundaries_do_not_change_events(bytes in proptest::collection::vec(any::<u8>(), 0..256), split in 0usize..256) {
        let split = split.min(bytes.len());

        let mut whole = Vec::new();
        let mut parser = InputParser::new();
        parser.scan_utf8(&bytes, &mut whole);
        settle(&mut parser, &mut whole);

        let mut halves = Vec::new();
        let mut parser = InputParser::new();
        parser.scan_utf8(&bytes[..split], &mut halves);
        parser.scan_utf8(&bytes[split..], &mut halves);
        settle(&mut parser, &mut halves);

        prop_assert_eq!(whole.len(), halves.len());
        for (a, b) in whole.iter().zip(halves.iter()) {
            if let (Event::Key(a), Event::Key(b)) = (a, b) {
                prop_assert_eq!(a.key, b.key);
                prop_assert_eq!(&a.text, &b.text);
                prop_assert_eq!(a.mods, b.mods);
            }
        }
    }
}

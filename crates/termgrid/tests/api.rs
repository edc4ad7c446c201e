//! Facade smoke test: a full session through the public surface only.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use termgrid::sim::SimTty;
use termgrid::{
    ButtonMask, Color, Event, Key, ModMask, MouseFlags, Screen, ScreenConfig, Style, Tty,
};

#[test]
fn full_session_through_the_facade() -> Result<()> {
    let tty = Arc::new(SimTty::new(40, 10));
    let screen = Screen::new(
        tty.clone() as Arc<dyn Tty>,
        ScreenConfig::default().with_esc_timeout(Duration::from_millis(25)),
    );
    screen.init()?;
    let events = screen.events();
    // Startup publishes the initial geometry.
    match events.recv_timeout(Duration::from_secs(2))? {
        Event::Resize(r) => assert_eq!((r.cols, r.rows), (40, 10)),
        other => panic!("unexpected {other:?}"),
    }

    screen.enable_mouse(MouseFlags::BUTTON);
    screen.enable_paste();
    screen.put_str_styled(
        0,
        0,
        "status: ok",
        &Style::default().foreground(Color::Palette(2)),
    );
    screen.show();
    assert_eq!(tty.row_text(0).trim_end(), "status: ok");

    tty.inject_key(Key::Enter, "", ModMask::empty());
    match events.recv_timeout(Duration::from_secs(2))? {
        Event::Key(k) => assert_eq!(k.key, Key::Enter),
        other => panic!("unexpected {other:?}"),
    }

    tty.inject_mouse_press(5, 5, ButtonMask::BUTTON1, ModMask::empty());
    match events.recv_timeout(Duration::from_secs(2))? {
        Event::Mouse(m) => assert_eq!((m.x, m.y, m.buttons), (5, 5, ButtonMask::BUTTON1)),
        other => panic!("unexpected {other:?}"),
    }

    screen.fini();
    Ok(())
}

//! Minimal-delta SGR emission.
//!
//! The renderer hands this module the previously emitted style and the next
//! one; it appends the smallest SGR sequence that transforms the former into
//! the latter. Attribute *removal* cannot be expressed incrementally across
//! terminals, so any removed attribute (or a `Color::Reset` request) falls
//! back to `SGR 0` followed by a full rebuild; additions and color switches
//! emit only the changed parameters.
//!
//! Colors arriving here are already resolved: no `Inherit`, and RGB only
//! when the terminal depth allows it.

use core_style::{AttrMask, Color, Style, UnderlineStyle};

const ATTR_PARAMS: &[(AttrMask, &str)] = &[
    (AttrMask::BOLD, "1"),
    (AttrMask::DIM, "2"),
    (AttrMask::ITALIC, "3"),
    (AttrMask::BLINK, "5"),
    (AttrMask::REVERSE, "7"),
    (AttrMask::STRIKETHROUGH, "9"),
];

fn push_attrs(attrs: AttrMask, params: &mut Vec<String>) {
    for (mask, code) in ATTR_PARAMS {
        if attrs.contains(*mask) {
            params.push((*code).to_string());
        }
    }
}

fn underline_param(style: UnderlineStyle) -> String {
    match style {
        UnderlineStyle::Single => "4".to_string(),
        other => format!("4:{}", other.sgr_param()),
    }
}

/// Foreground color parameters; `base` is 3 for fg, 4 for bg.
fn push_color(color: Color, base: u8, params: &mut Vec<String>) {
    match color {
        Color::Default => params.push(format!("{base}9")),
        Color::Palette(n @ 0..=7) => params.push(format!("{}{}", base, n)),
        Color::Palette(n @ 8..=15) => {
            let bright = if base == 3 { 90 } else { 100 };
            params.push(format!("{}", bright + u16::from(n) - 8));
        }
        Color::Palette(n) => params.push(format!("{base}8;5;{n}")),
        Color::Rgb(r, g, b) => params.push(format!("{base}8;2;{r};{g};{b}")),
        // Reset is satisfied by the leading SGR 0; Inherit never reaches
        // the wire.
        Color::Reset | Color::Inherit => {}
    }
}

fn push_underline_color(color: Color, params: &mut Vec<String>) {
    match color {
        Color::Default => params.push("59".to_string()),
        Color::Palette(n) => params.push(format!("58;5;{n}")),
        Color::Rgb(r, g, b) => params.push(format!("58;2;{r};{g};{b}")),
        Color::Reset | Color::Inherit => {}
    }
}

/// Append the SGR delta taking `last` to `next`. `last == None` means the
/// wire state is unknown and forces a rebuild.
pub(crate) fn emit_sgr(out: &mut Vec<u8>, last: Option<&Style>, next: &Style) {
    let removed = match last {
        None => true,
        Some(l) => {
            !(l.attrs - next.attrs).is_empty()
                || (l.underline != UnderlineStyle::None
                    && next.underline == UnderlineStyle::None)
        }
    };
    let force = removed
        || next.fg == Color::Reset
        || next.bg == Color::Reset
        || next.underline_color == Color::Reset;

    let mut params: Vec<String> = Vec::new();
    if force {
        params.push("0".to_string());
        push_attrs(next.attrs, &mut params);
        if next.underline != UnderlineStyle::None {
            params.push(underline_param(next.underline));
        }
        // SGR 0 already leaves both channels at terminal default.
        if next.fg != Color::Default {
            push_color(next.fg, 3, &mut params);
        }
        if next.bg != Color::Default {
            push_color(next.bg, 4, &mut params);
        }
        if next.underline != UnderlineStyle::None && next.underline_color != Color::Default {
            push_underline_color(next.underline_color, &mut params);
        }
    } else if let Some(l) = last {
        push_attrs(next.attrs - l.attrs, &mut params);
        if next.underline != l.underline {
            params.push(underline_param(next.underline));
        }
        if next.fg != l.fg {
            push_color(next.fg, 3, &mut params);
        }
        if next.bg != l.bg {
            push_color(next.bg, 4, &mut params);
        }
        if next.underline != UnderlineStyle::None && next.underline_color != l.underline_color {
            push_underline_color(next.underline_color, &mut params);
        }
    }

    if params.is_empty() {
        return;
    }
    out.extend_from_slice(b"\x1b[");
    out.extend_from_slice(params.join(";").as_bytes());
    out.push(b'm');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sgr(last: Option<&Style>, next: &Style) -> String {
        let mut out = Vec::new();
        emit_sgr(&mut out, last, next);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn unknown_state_forces_reset_rebuild() {
        let next = Style::default().bold(true).foreground(Color::Palette(1));
        assert_eq!(sgr(None, &next), "\x1b[0;1;31m");
    }

    #[test]
    fn identical_styles_emit_nothing() {
        let s = Style::default().bold(true);
        assert_eq!(sgr(Some(&s), &s), "");
    }

    #[test]
    fn color_switch_is_minimal() {
        let a = Style::default().foreground(Color::Palette(1));
        let b = Style::default().foreground(Color::Palette(2));
        assert_eq!(sgr(Some(&a), &b), "\x1b[32m");
    }

    #[test]
    fn added_attr_is_incremental() {
        let a = Style::default().bold(true);
        let b = Style::default().bold(true).italic(true);
        assert_eq!(sgr(Some(&a), &b), "\x1b[3m");
    }

    #[test]
    fn removed_attr_forces_reset() {
        let a = Style::default().bold(true).italic(true);
        let b = Style::default().italic(true);
        assert_eq!(sgr(Some(&a), &b), "\x1b[0;3m");
    }

    #[test]
    fn bright_palette_uses_aixterm_codes() {
        let next = Style::default()
            .foreground(Color::Palette(9))
            .background(Color::Palette(12));
        assert_eq!(sgr(None, &next), "\x1b[0;91;104m");
    }

    #[test]
    fn extended_palette_and_rgb_forms() {
        let next = Style::default()
            .foreground(Color::Palette(100))
            .background(Color::Rgb(1, 2, 3));
        assert_eq!(sgr(None, &next), "\x1b[0;38;5;100;48;2;1;2;3m");
    }

    #[test]
    fn default_colors_emit_39_49_on_change() {
        let a = Style::default()
            .foreground(Color::Palette(1))
            .background(Color::Palette(2));
        let b = Style::default();
        assert_eq!(sgr(Some(&a), &b), "\x1b[39;49m");
    }

    #[test]
    fn reset_sentinel_forces_sgr0() {
        let a = Style::default().foreground(Color::Palette(1));
        let b = Style::default().foreground(Color::Reset);
        assert_eq!(sgr(Some(&a), &b), "\x1b[0m");
    }

    #[test]
    fn reset_underline_color_forces_sgr0() {
        let a = Style::default()
            .underline(UnderlineStyle::Single)
            .underline_color(Color::Palette(5));
        let b = Style::default()
            .underline(UnderlineStyle::Single)
            .underline_color(Color::Reset);
        assert_eq!(sgr(Some(&a), &b), "\x1b[0;4m");
    }

    #[test]
    fn curly_underline_with_color() {
        let next = Style::default()
            .underline(UnderlineStyle::Curly)
            .underline_color(Color::Palette(196));
        assert_eq!(sgr(None, &next), "\x1b[0;4:3;58;5;196m");
    }

    #[test]
    fn underline_style_switch_is_incremental() {
        let a = Style::default().underline(UnderlineStyle::Single);
        let b = Style::default().underline(UnderlineStyle::Double);
        assert_eq!(sgr(Some(&a), &b), "\x1b[4:2m");
    }
}

//! Screen configuration derived from the environment.
//!
//! The environment is advisory: everything detected here can be overridden
//! through the builder methods before the screen is constructed. Detection
//! is kept in pure functions over a lookup closure so tests never mutate
//! process-global environment state.

use std::time::Duration;

use core_cellbuf::WidthPolicy;
use core_events::{EVENT_CHANNEL_CAP, TermError};

/// How many colors the renderer may assume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    /// No color at all (NO_COLOR, `TERM=dumb`); attributes still render.
    Mono,
    /// The 16 ECMA/ANSI entries.
    Ansi16,
    /// The full 256-entry palette.
    Ansi256,
    /// Direct 24-bit RGB.
    TrueColor,
}

#[derive(Debug, Clone)]
pub struct ScreenConfig {
    pub term: String,
    pub color_depth: ColorDepth,
    pub width_policy: WidthPolicy,
    pub event_capacity: usize,
    /// How long a lone ESC may sit unresolved before it becomes a key.
    pub esc_timeout: Duration,
    /// COLUMNS/LINES initial-size override; the resize channel supersedes it.
    pub size_override: Option<(u16, u16)>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            term: "xterm-256color".to_string(),
            color_depth: ColorDepth::Ansi256,
            width_policy: WidthPolicy::Narrow,
            event_capacity: EVENT_CHANNEL_CAP,
            esc_timeout: Duration::from_millis(50),
            size_override: None,
        }
    }
}

impl ScreenConfig {
    /// Detect from the process environment. Fails with `NoScreen` when TERM
    /// is absent and `NoCharset` when the locale names a non-UTF-8 charset.
    pub fn from_env() -> Result<Self, TermError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, TermError> {
        let term = get("TERM").unwrap_or_default();
        if term.is_empty() {
            return Err(TermError::NoScreen);
        }

        let locale = get("LC_ALL")
            .filter(|v| !v.is_empty())
            .or_else(|| get("LC_CTYPE").filter(|v| !v.is_empty()))
            .or_else(|| get("LANG").filter(|v| !v.is_empty()))
            .unwrap_or_default();
        check_charset(&locale)?;

        let size_override = match (parse_dim(get("COLUMNS")), parse_dim(get("LINES"))) {
            (Some(cols), Some(rows)) => Some((cols, rows)),
            _ => None,
        };

        Ok(Self {
            color_depth: detect_color_depth(&term, get("COLORTERM"), get("NO_COLOR")),
            width_policy: detect_width_policy(&locale),
            event_capacity: EVENT_CHANNEL_CAP,
            esc_timeout: Duration::from_millis(50),
            size_override,
            term,
        })
    }

    pub fn with_color_depth(mut self, depth: ColorDepth) -> Self {
        self.color_depth = depth;
        self
    }

    pub fn with_width_policy(mut self, policy: WidthPolicy) -> Self {
        self.width_policy = policy;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn with_esc_timeout(mut self, timeout: Duration) -> Self {
        self.esc_timeout = timeout;
        self
    }
}

fn parse_dim(v: Option<String>) -> Option<u16> {
    v.and_then(|s| s.trim().parse::<u16>().ok()).filter(|&n| n > 0)
}

/// The locale charset must be UTF-8 (or unstated, which defaults to UTF-8).
fn check_charset(locale: &str) -> Result<(), TermError> {
    let Some(dot) = locale.find('.') else {
        return Ok(());
    };
    let charset = locale[dot + 1..]
        .split('@')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
        .replace('-', "");
    match charset.as_str() {
        "" | "utf8" => Ok(()),
        other => Err(TermError::NoCharset(other.to_string())),
    }
}

/// CJK locales resolve ambiguous-width scalars as wide.
fn detect_width_policy(locale: &str) -> WidthPolicy {
    let lang = locale.split(['.', '_', '@']).next().unwrap_or("");
    match lang {
        "ja" | "ko" | "zh" => WidthPolicy::Wide,
        _ => WidthPolicy::Narrow,
    }
}

fn detect_color_depth(
    term: &str,
    colorterm: Option<String>,
    no_color: Option<String>,
) -> ColorDepth {
    if no_color.is_some_and(|v| !v.is_empty()) {
        return ColorDepth::Mono;
    }
    if let Some(ct) = colorterm {
        let ct = ct.to_ascii_lowercase();
        if ct.contains("truecolor") || ct.contains("24bit") {
            return ColorDepth::TrueColor;
        }
    }
    if term == "dumb" {
        return ColorDepth::Mono;
    }
    if term.contains("direct") || term.contains("truecolor") {
        return ColorDepth::TrueColor;
    }
    if term.contains("256color") {
        return ColorDepth::Ansi256;
    }
    ColorDepth::Ansi16
}

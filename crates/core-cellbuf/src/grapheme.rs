//! Grapheme Cluster Display Width Engine.
//!
//! A single authoritative function `cluster_width` returns the terminal
//! column width for one extended grapheme cluster (EGC). All width decisions
//! in the workspace flow through here; no other crate consults
//! `unicode_width` directly.
//!
//! Width rules:
//! * A cluster is wide (2) when any scalar is East-Asian Wide/Fullwidth or
//!   the cluster carries emoji presentation: regional-indicator pairs,
//!   keycaps, ZWJ pictographic sequences, skin-tone modifiers, or a lone
//!   pictographic base.
//! * A cluster consisting only of zero-width scalars (combining marks, ZWJ,
//!   variation selectors) measures 0; the cell buffer stores such input as a
//!   space with the combiners appended.
//! * Everything else is narrow (1). Ambiguous East-Asian scalars resolve
//!   through the `WidthPolicy` chosen once at screen construction from the
//!   locale.
//!
//! The classifier is biased toward over-estimation for pictographic
//! composites: an extra blank cell is harmless, while under-estimation
//! causes rendering drift.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

/// Resolution of ambiguous East-Asian width scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidthPolicy {
    /// Ambiguous scalars occupy one cell (non-CJK locales).
    #[default]
    Narrow,
    /// Ambiguous scalars occupy two cells (CJK locales).
    Wide,
}

const ZWJ: char = '\u{200D}';
const VS16: char = '\u{FE0F}';
const KEYCAP: char = '\u{20E3}';

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

fn is_skin_tone_modifier(c: char) -> bool {
    ('\u{1F3FB}'..='\u{1F3FF}').contains(&c)
}

// Heuristic Extended Pictographic coverage: the primary emoji planes plus
// the Misc Symbols / Dingbats blocks where legacy emoji live.
fn is_pictographic(c: char) -> bool {
    ('\u{1F300}'..='\u{1FAFF}').contains(&c) || ('\u{2600}'..='\u{27BF}').contains(&c)
}

fn scalar_width(c: char, policy: WidthPolicy) -> usize {
    match policy {
        WidthPolicy::Narrow => UnicodeWidthChar::width(c).unwrap_or(0),
        WidthPolicy::Wide => UnicodeWidthChar::width_cjk(c).unwrap_or(0),
    }
}

/// Split off the first extended grapheme cluster: `(cluster, rest)`.
/// The cluster is empty only for empty input.
pub fn first_cluster(s: &str) -> (&str, &str) {
    match s.grapheme_indices(true).next() {
        Some((_, g)) => (g, &s[g.len()..]),
        None => ("", s),
    }
}

/// Iterate extended grapheme clusters.
pub fn clusters(s: &str) -> impl Iterator<Item = &str> {
    s.graphemes(true)
}

/// Display column width (0, 1 or 2) of one grapheme cluster.
pub fn cluster_width(egc: &str, policy: WidthPolicy) -> u8 {
    if egc.is_empty() {
        return 0;
    }

    let mut count_pictographic = 0usize;
    let mut count_ri = 0usize;
    let mut has_zwj = false;
    let mut has_skin = false;
    let mut ends_with_keycap = false;
    let mut any_wide = false;
    let mut all_zero = true;
    let mut chars_total = 0usize;

    for c in egc.chars() {
        chars_total += 1;
        if is_pictographic(c) {
            count_pictographic += 1;
        }
        if is_regional_indicator(c) {
            count_ri += 1;
        }
        if c == ZWJ {
            has_zwj = true;
        }
        if is_skin_tone_modifier(c) {
            has_skin = true;
        }
        if c == KEYCAP {
            ends_with_keycap = true;
        } else if c != VS16 {
            ends_with_keycap = false;
        }
        let w = scalar_width(c, policy);
        if w == 2 {
            any_wide = true;
        }
        if w > 0 && c != VS16 {
            all_zero = false;
        }
    }

    // Pure zero-width cluster: combining marks without a base.
    if all_zero && count_pictographic == 0 && count_ri == 0 {
        return 0;
    }

    // Keycap: base + optional VS16 + U+20E3.
    if ends_with_keycap {
        return 2;
    }
    // Flag: a regional-indicator pair.
    if count_ri == 2 && chars_total == 2 {
        return 2;
    }
    // ZWJ sequence joining pictographic bases, or emoji + skin tone.
    if (has_zwj && count_pictographic >= 2) || (count_pictographic >= 1 && has_skin) {
        return 2;
    }
    // Any pictographic signal widens (conservative; see module note).
    if count_pictographic > 0 || count_ri > 0 {
        return 2;
    }
    if any_wide {
        return 2;
    }
    1
}

//! XTerm 256-color palette tables and nearest-color reduction.
//!
//! The reduction converts both endpoints to CIE Lab (via linearized sRGB and
//! D65 XYZ) and takes the smallest CIE76 distance. Results are memoized in a
//! bounded LRU cache keyed by the packed RGB value; a render pass over a
//! screenful of true-color cells touches few distinct colors, so the cache
//! absorbs nearly all lookups after the first frame.

use std::num::NonZeroUsize;

use lru::LruCache;

/// XTerm default values for the 16 ECMA/ANSI entries.
const BASE16: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (205, 0, 0),
    (0, 205, 0),
    (205, 205, 0),
    (0, 0, 238),
    (205, 0, 205),
    (0, 205, 205),
    (229, 229, 229),
    (127, 127, 127),
    (255, 0, 0),
    (0, 255, 0),
    (255, 255, 0),
    (92, 92, 255),
    (255, 0, 255),
    (0, 255, 255),
    (255, 255, 255),
];

/// Tabulated RGB value of a 256-color palette index.
pub fn palette_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0..=15 => BASE16[index as usize],
        16..=231 => {
            let n = index as u16 - 16;
            let level = |v: u16| -> u8 {
                if v == 0 { 0 } else { (55 + 40 * v) as u8 }
            };
            (
                level(n / 36),
                level((n / 6) % 6),
                level(n % 6),
            )
        }
        232..=255 => {
            let gray = 8 + 10 * (index as u16 - 232);
            (gray as u8, gray as u8, gray as u8)
        }
    }
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = f32::from(c) / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn lab_f(t: f32) -> f32 {
    if t > 0.008856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

/// CIE Lab coordinates from 8-bit sRGB, D65 white point.
fn lab(rgb: (u8, u8, u8)) -> (f32, f32, f32) {
    let r = srgb_to_linear(rgb.0);
    let g = srgb_to_linear(rgb.1);
    let b = srgb_to_linear(rgb.2);

    let x = 0.4124 * r + 0.3576 * g + 0.1805 * b;
    let y = 0.2126 * r + 0.7152 * g + 0.0722 * b;
    let z = 0.0193 * r + 0.1192 * g + 0.9505 * b;

    let fx = lab_f(x / 0.95047);
    let fy = lab_f(y);
    let fz = lab_f(z / 1.08883);

    (116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

fn delta_e_sq(a: (f32, f32, f32), b: (f32, f32, f32)) -> f32 {
    let dl = a.0 - b.0;
    let da = a.1 - b.1;
    let db = a.2 - b.2;
    dl * dl + da * da + db * db
}

const CACHE_CAP: usize = 4096;

/// Memoized RGB → palette-index reduction.
pub struct NearestPalette {
    cache: LruCache<u32, u8>,
}

impl Default for NearestPalette {
    fn default() -> Self {
        Self::new()
    }
}

impl NearestPalette {
    pub fn new() -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(CACHE_CAP).unwrap()),
        }
    }

    /// Nearest palette index to `(r, g, b)` among the first `limit` entries
    /// (16 for ANSI-only terminals, 256 otherwise).
    pub fn nearest(&mut self, r: u8, g: u8, b: u8, limit: u16) -> u8 {
        let limit = limit.clamp(2, 256);
        let key = (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b) | ((limit as u32) << 24);
        if let Some(&idx) = self.cache.get(&key) {
            return idx;
        }
        let target = lab((r, g, b));
        let mut best = 0u8;
        let mut best_d = f32::MAX;
        for idx in 0..limit {
            let d = delta_e_sq(target, lab(palette_rgb(idx as u8)));
            if d < best_d {
                best_d = d;
                best = idx as u8;
            }
        }
        self.cache.put(key, best);
        best
    }
}

//! Streaming escape-sequence parser: terminal bytes in, typed events out.
//!
//! The parser is synchronous and single-threaded relative to any one screen.
//! The screen's input reader feeds raw reads through
//! [`InputParser::scan_utf8`]; when the parser reports [`waiting`]
//! (typically a lone ESC that may or may not open a sequence), the reader
//! arms a ~50 ms timeout and on expiry calls [`InputParser::scan`] to force
//! a resolution. Malformed or unrecognized sequences are discarded without
//! an event: fuzzed input must never crash or wedge a consumer.
//!
//! [`waiting`]: InputParser::waiting

mod parser;
mod table;

pub use parser::InputParser;
pub use table::encode_mods;

use std::sync::atomic::AtomicU64;

// Malformed-sequence discards, cumulative per process. Diagnostics only;
// discards are invisible to consumers by design.
pub static PARSE_DISCARDS: AtomicU64 = AtomicU64::new(0);

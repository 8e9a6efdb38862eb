//! Value extraction primitives
//!
//! Evaluates one selector rule against a parsed page and returns the raw
//! strings it matched.

mod css_extractor;

pub use css_extractor::*;

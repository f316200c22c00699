//! # Processing Module
//!
//! Decode, reassemble and re-encode stages of a single restore.

pub mod descramble;

pub use descramble::{Canvas, RawImage, reassemble};

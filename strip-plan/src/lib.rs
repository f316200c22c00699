// SPDX-License-Identifier: MIT
//! # strip-plan: Band Reassembly for Strip-Scrambled Images
//!
//! Some image hosts cut every page into full-width horizontal strips and serve
//! them in reversed vertical order, so a hotlinked copy renders as garbage. This
//! crate recovers the original layout.
//!
//! ## Architecture Overview
//!
//! The crate is split the same way the work is:
//! 1. **Resolve**: derive the strip count from the page key (content id + segment)
//! 2. **Plan**: turn `(height, strip_count)` into a list of source/destination bands
//! 3. **Copy**: move whole rows from the scrambled buffer into a fresh canvas
//!
//! ## Key Components
//!
//! - [`resolver`]: keyed MD5 strip-count derivation
//! - [`plan`]: band geometry with the integer-division remainder folded into band 0
//! - [`cpu`]: stride-aware row copier for restoring (and re-scrambling) buffers
//! - [`error`]: the shared [`StripError`](error::StripError) type
//!
//! ## Usage Example
//!
//! ```rust
//! use strip_plan::{cpu::restore_rows, plan::{build_plan, Size}, resolver::resolve_strip_count};
//!
//! let strips = resolve_strip_count("300000", "00005")?;
//! let size = Size { w: 4, h: 101 };
//! let plan = build_plan(size, strips)?;
//!
//! let scrambled = vec![0u8; 4 * 101 * 3];
//! let mut restored = vec![0u8; scrambled.len()];
//! restore_rows(&scrambled, size, 3, None, &plan, &mut restored)?;
//! # Ok::<(), strip_plan::error::StripError>(())
//! ```

pub mod cpu;
pub mod error;
pub mod plan;
pub mod resolver;

pub use error::StripError;
pub use plan::{build_plan, Band, Size, StripPlan};
pub use resolver::resolve_strip_count;

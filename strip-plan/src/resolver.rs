// SPDX-License-Identifier: MIT
//! # Strip-Count Resolution
//!
//! The host derives the number of strips from the page key:
//!
//! 1. `key = content_id + segment_index` (plain string concatenation, leading zeros kept)
//! 2. `digest = md5(key)` rendered as lowercase hex
//! 3. `v = ord(last hex char)` (`'0'..='9'` → 48..=57, `'a'..='f'` → 97..=102)
//! 4. reduce `v` by the content id range:
//!    - `268850..=421925` → `v % 10`
//!    - `421926..`        → `v % 8`
//!    - anything lower    → left as is
//! 5. `v <= 9` → `2 + 2v` strips, otherwise [`DEFAULT_STRIP_COUNT`]
//!
//! Ids below the first range keep the raw ordinal, which is never a single digit,
//! so those pages fall back to the default count.

use std::num::IntErrorKind;

use crate::error::StripError;

/// First content id whose hash ordinal is reduced modulo 10.
pub const MOD10_FIRST_ID: i64 = 268_850;
/// Last content id whose hash ordinal is reduced modulo 10.
pub const MOD10_LAST_ID: i64 = 421_925;
/// First content id whose hash ordinal is reduced modulo 8.
pub const MOD8_FIRST_ID: i64 = 421_926;
/// Strip count used whenever the reduced ordinal is not a single digit.
pub const DEFAULT_STRIP_COUNT: u32 = 10;

/// Which reduction a content id falls under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IdRange {
    Unreduced,
    Mod10,
    Mod8,
}

/// Compute the number of strips a page was cut into.
///
/// Content ids are arbitrary-precision integers: values beyond `i64` are still
/// valid and land in the open-ended ranges at either end.
///
/// # Errors
/// [`StripError::InvalidContentId`] if `content_id` is not an integer.
pub fn resolve_strip_count(content_id: &str, segment_index: &str) -> Result<u32, StripError> {
    let range = id_range(content_id)?;

    let ordinal = u32::from(last_hex_char(content_id, segment_index));
    let reduced = match range {
        IdRange::Mod10 => ordinal % 10,
        IdRange::Mod8 => ordinal % 8,
        IdRange::Unreduced => ordinal,
    };

    Ok(strip_count_for(reduced))
}

fn id_range(content_id: &str) -> Result<IdRange, StripError> {
    let id = match content_id.trim().parse::<i64>() {
        Ok(id) => id,
        Err(e) => {
            return match e.kind() {
                IntErrorKind::PosOverflow => Ok(IdRange::Mod8),
                IntErrorKind::NegOverflow => Ok(IdRange::Unreduced),
                _ => Err(StripError::InvalidContentId(content_id.to_string())),
            };
        }
    };

    Ok(if (MOD10_FIRST_ID..=MOD10_LAST_ID).contains(&id) {
        IdRange::Mod10
    } else if id >= MOD8_FIRST_ID {
        IdRange::Mod8
    } else {
        IdRange::Unreduced
    })
}

/// Lowercase hex MD5 of the concatenated key.
pub fn key_digest(content_id: &str, segment_index: &str) -> String {
    format!("{:x}", digest(content_id, segment_index))
}

fn digest(content_id: &str, segment_index: &str) -> md5::Digest {
    let mut ctx = md5::Context::new();
    ctx.consume(content_id.as_bytes());
    ctx.consume(segment_index.as_bytes());
    ctx.compute()
}

/// The final character of the hex digest is the low nibble of the last byte.
fn last_hex_char(content_id: &str, segment_index: &str) -> u8 {
    let nibble = digest(content_id, segment_index).0[15] & 0x0f;
    if nibble < 10 {
        b'0' + nibble
    } else {
        b'a' + (nibble - 10)
    }
}

#[inline]
fn strip_count_for(reduced: u32) -> u32 {
    if reduced <= 9 {
        2 + 2 * reduced
    } else {
        DEFAULT_STRIP_COUNT
    }
}

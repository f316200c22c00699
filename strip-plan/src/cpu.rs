// SPDX-License-Identifier: MIT
// CPU band copier. Any packed pixel format in, same format out, written straight
// into a caller-provided destination buffer. Only whole rows move.

use crate::error::StripError;
use crate::plan::{Size, StripPlan};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    /// scrambled -> original
    Restore,
    /// original -> scrambled
    Scramble,
}

/// Undo the strip permutation.
///
/// `src_stride_bytes`: bytes per source row. `None` means tightly packed.
/// `dst` must hold at least `src.w * src.h * bytes_per_pixel` bytes and is always
/// written tightly packed.
pub fn restore_rows(
    src_pixels: &[u8],
    src: Size,
    bytes_per_pixel: usize,
    src_stride_bytes: Option<usize>,
    plan: &StripPlan,
    dst: &mut [u8],
) -> Result<(), StripError> {
    copy_bands(
        src_pixels,
        src,
        bytes_per_pixel,
        src_stride_bytes,
        plan,
        dst,
        Direction::Restore,
    )
}

/// Apply the forward permutation the host uses, the exact inverse of
/// [`restore_rows`]. Handy for fixtures and for checking a plan by eye.
pub fn scramble_rows(
    src_pixels: &[u8],
    src: Size,
    bytes_per_pixel: usize,
    src_stride_bytes: Option<usize>,
    plan: &StripPlan,
    dst: &mut [u8],
) -> Result<(), StripError> {
    copy_bands(
        src_pixels,
        src,
        bytes_per_pixel,
        src_stride_bytes,
        plan,
        dst,
        Direction::Scramble,
    )
}

fn copy_bands(
    src_pixels: &[u8],
    src: Size,
    bytes_per_pixel: usize,
    src_stride_bytes: Option<usize>,
    plan: &StripPlan,
    dst: &mut [u8],
    direction: Direction,
) -> Result<(), StripError> {
    if plan.input != src {
        return Err(StripError::PlanMismatch {
            plan_h: plan.input.h,
            image_h: src.h,
        });
    }

    let row_bytes = (src.w as usize) * bytes_per_pixel;
    let pitch = src_stride_bytes.unwrap_or(row_bytes);
    if pitch < row_bytes {
        return Err(StripError::StrideTooSmall {
            stride: pitch,
            row_bytes,
        });
    }

    let rows = src.h as usize;
    if plan.strip_count == 0 {
        return Err(StripError::ZeroStrips);
    }
    if rows == 0 {
        return Err(StripError::EmptyImage);
    }
    let src_needed = pitch * (rows - 1) + row_bytes;
    if src_pixels.len() < src_needed {
        return Err(StripError::BufferTooSmall {
            needed: src_needed,
            got: src_pixels.len(),
        });
    }
    let dst_needed = row_bytes * rows;
    if dst.len() < dst_needed {
        return Err(StripError::BufferTooSmall {
            needed: dst_needed,
            got: dst.len(),
        });
    }

    for band in plan.bands() {
        let (from, to) = match direction {
            Direction::Restore => (band.src_y, band.dst_y),
            Direction::Scramble => (band.dst_y, band.src_y),
        };
        copy_rows(
            src_pixels,
            pitch,
            from as usize,
            dst,
            row_bytes,
            to as usize,
            band.height as usize,
        );
    }

    Ok(())
}

#[inline]
fn copy_rows(
    src: &[u8],
    src_pitch: usize,
    src_row: usize,
    dst: &mut [u8],
    row_bytes: usize,
    dst_row: usize,
    rows: usize,
) {
    if rows == 0 {
        return;
    }
    if src_pitch == row_bytes {
        // Tightly packed: the whole band is one contiguous run.
        let len = rows * row_bytes;
        let s = src_row * row_bytes;
        let d = dst_row * row_bytes;
        dst[d..d + len].copy_from_slice(&src[s..s + len]);
        return;
    }
    for r in 0..rows {
        let s = (src_row + r) * src_pitch;
        let d = (dst_row + r) * row_bytes;
        dst[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::build_plan;

    const BPP: usize = 3;

    /// Every row gets a unique, position-dependent fill so misplaced rows show up.
    fn pattern(size: Size) -> Vec<u8> {
        let row_bytes = size.w as usize * BPP;
        let mut data = vec![0u8; row_bytes * size.h as usize];
        for y in 0..size.h as usize {
            for (x, byte) in data[y * row_bytes..(y + 1) * row_bytes].iter_mut().enumerate() {
                *byte = ((y * 31 + x * 7 + y / 256) % 251) as u8;
            }
        }
        data
    }

    fn round_trip(size: Size, strips: u32) {
        let plan = build_plan(size, strips).unwrap();
        let original = pattern(size);
        let mut scrambled = vec![0u8; original.len()];
        let mut restored = vec![0u8; original.len()];

        scramble_rows(&original, size, BPP, None, &plan, &mut scrambled).unwrap();
        restore_rows(&scrambled, size, BPP, None, &plan, &mut restored).unwrap();

        assert_eq!(restored, original, "size={:?} strips={}", size, strips);
    }

    #[test]
    fn test_round_trip_all_strip_counts() {
        for strips in (2..=20).step_by(2) {
            for h in [7, 20, 64, 101, 257, 1000, 1203] {
                round_trip(Size { w: 5, h }, strips);
            }
        }
    }

    #[test]
    fn test_round_trip_awkward_heights() {
        round_trip(Size { w: 3, h: 101 }, 10);
        round_trip(Size { w: 3, h: 7 }, 2);
        round_trip(Size { w: 3, h: 1 }, 10);
        round_trip(Size { w: 3, h: 9 }, 20);
    }

    #[test]
    fn test_scrambled_layout_puts_remainder_band_at_bottom() {
        // 7 rows, 2 strips: base 3, rem 1. Restored rows 0..4 come from scrambled 3..7.
        let size = Size { w: 1, h: 7 };
        let plan = build_plan(size, 2).unwrap();
        let scrambled: Vec<u8> = (0..7u8).flat_map(|y| [y, y, y]).collect();
        let mut restored = vec![0u8; scrambled.len()];

        restore_rows(&scrambled, size, BPP, None, &plan, &mut restored).unwrap();

        let rows: Vec<u8> = restored.chunks_exact(BPP).map(|px| px[0]).collect();
        assert_eq!(rows, vec![3, 4, 5, 6, 0, 1, 2]);
    }

    #[test]
    fn test_strided_source() {
        let size = Size { w: 4, h: 13 };
        let plan = build_plan(size, 4).unwrap();
        let tight = pattern(size);
        let row_bytes = 4 * BPP;
        let pitch = row_bytes + 5;

        let mut padded = vec![0xEE; pitch * 13];
        for y in 0..13 {
            padded[y * pitch..y * pitch + row_bytes]
                .copy_from_slice(&tight[y * row_bytes..(y + 1) * row_bytes]);
        }

        let mut from_tight = vec![0u8; tight.len()];
        let mut from_padded = vec![0u8; tight.len()];
        restore_rows(&tight, size, BPP, None, &plan, &mut from_tight).unwrap();
        restore_rows(&padded, size, BPP, Some(pitch), &plan, &mut from_padded).unwrap();
        assert_eq!(from_tight, from_padded);
    }

    #[test]
    fn test_rejects_bad_buffers() {
        let size = Size { w: 4, h: 10 };
        let plan = build_plan(size, 2).unwrap();
        let src = vec![0u8; 4 * 10 * BPP];
        let mut short = vec![0u8; 10];
        assert!(matches!(
            restore_rows(&src, size, BPP, None, &plan, &mut short),
            Err(StripError::BufferTooSmall { .. })
        ));

        let mut dst = vec![0u8; src.len()];
        assert!(matches!(
            restore_rows(&src, size, BPP, Some(4), &plan, &mut dst),
            Err(StripError::StrideTooSmall { .. })
        ));

        let other = Size { w: 4, h: 9 };
        assert!(matches!(
            restore_rows(&src, other, BPP, None, &plan, &mut dst),
            Err(StripError::PlanMismatch { .. })
        ));
    }
}

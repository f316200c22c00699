// SPDX-License-Identifier: MIT
//! # Strip Plans
//!
//! A [`StripPlan`] fixes the geometry of one reassembly: how tall the bands are and
//! where each one is read from and written to.
//!
//! With `H` rows, `N` strips, `base = H / N` and `rem = H % N`, destination band `m`
//! (counting from the top of the canvas) is:
//!
//! | band  | height       | source row             | destination row     |
//! |-------|--------------|------------------------|---------------------|
//! | `0`   | `base + rem` | `H - base - rem`       | `0`                 |
//! | `m>0` | `base`       | `H - base·(m+1) - rem` | `base·m + rem`      |
//!
//! The canvas is filled top to bottom with bands taken bottom to top from the
//! scrambled image. The whole remainder lives in band 0, which is the bottom-most
//! band of the scrambled image and the top-most band of the restored one. Source
//! and destination bands both tile `[0, H)` exactly once.

use crate::error::StripError;

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// One full-width horizontal band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Band {
    /// Destination order, 0 is the top of the restored canvas.
    pub index: u32,
    /// First row of the band in the scrambled image.
    pub src_y: u32,
    /// First row of the band in the restored canvas.
    pub dst_y: u32,
    /// Number of rows in the band (may be 0 when `H < N`).
    pub height: u32,
}

impl Band {
    /// Source rows covered by this band.
    pub fn src_rows(&self) -> std::ops::Range<u32> {
        self.src_y..self.src_y + self.height
    }

    /// Destination rows covered by this band.
    pub fn dst_rows(&self) -> std::ops::Range<u32> {
        self.dst_y..self.dst_y + self.height
    }
}

/// Complete reassembly plan for one image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StripPlan {
    /// Dimensions of the scrambled image (and of the canvas).
    pub input: Size,
    /// Number of strips the image was cut into.
    pub strip_count: u32,
    /// `input.h / strip_count`
    pub base_height: u32,
    /// `input.h % strip_count`, always folded into band 0.
    pub remainder: u32,
}

/// Build the plan for an image of `input` size cut into `strip_count` strips.
///
/// # Errors
/// [`StripError::ZeroStrips`] for `strip_count == 0`, [`StripError::EmptyImage`]
/// when the image has no rows or no columns. Neither happens with a resolved
/// strip count and a decoded image.
pub fn build_plan(input: Size, strip_count: u32) -> Result<StripPlan, StripError> {
    if strip_count == 0 {
        return Err(StripError::ZeroStrips);
    }
    if input.h == 0 || input.w == 0 {
        return Err(StripError::EmptyImage);
    }
    Ok(StripPlan {
        input,
        strip_count,
        base_height: input.h / strip_count,
        remainder: input.h % strip_count,
    })
}

impl StripPlan {
    /// Geometry of destination band `m`. `m` must be below `strip_count`.
    pub fn band(&self, m: u32) -> Band {
        debug_assert!(m < self.strip_count);
        let (base, rem) = (self.base_height, self.remainder);
        let src_y = self.input.h - base * (m + 1) - rem;
        if m == 0 {
            Band {
                index: 0,
                src_y,
                dst_y: 0,
                height: base + rem,
            }
        } else {
            Band {
                index: m,
                src_y,
                dst_y: base * m + rem,
                height: base,
            }
        }
    }

    /// All bands in destination order (top of the canvas first).
    pub fn bands(&self) -> impl Iterator<Item = Band> {
        let plan = *self;
        (0..plan.strip_count).map(move |m| plan.band(m))
    }
}

//! # Descramble Pipeline Stages
//!
//! CPU-bound stages of one restore, in order:
//! 1. **RawImage**: decode the scrambled download into an RGB8 buffer
//! 2. **reassemble**: build a `StripPlan` and copy the bands into a [`Canvas`]
//! 3. **Canvas::encode_jpeg**: re-encode the restored canvas
//!
//! None of these yield. They run on a blocking worker and finish once started.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageReader, RgbImage};
use strip_plan::StripError;
use strip_plan::cpu::restore_rows;
use strip_plan::plan::{Size, build_plan};
use tracing::debug;

use crate::error::{RestoreError, RestoreResult};

const RGB_BYTES_PER_PIXEL: usize = 3;

/// Decoded scrambled image. Consumed by [`reassemble`].
#[derive(Debug, Clone)]
pub struct RawImage {
    pub pixels: RgbImage,
    /// Size of the encoded download in bytes.
    pub byte_len: usize,
}

impl RawImage {
    /// Decode an in-memory image, sniffing the format from its magic bytes.
    pub fn decode(bytes: &[u8]) -> RestoreResult<Self> {
        let pixels = image::load_from_memory(bytes)
            .map_err(RestoreError::decode_source)?
            .to_rgb8();
        Ok(Self {
            pixels,
            byte_len: bytes.len(),
        })
    }

    /// Decode an image file. The format is sniffed, not taken from the extension.
    pub fn open(path: &Path) -> RestoreResult<Self> {
        let file = File::open(path).map_err(|e| RestoreError::io_at("open download", path, e))?;
        let byte_len = file
            .metadata()
            .map_err(|e| RestoreError::io_at("stat download", path, e))?
            .len() as usize;
        let pixels = ImageReader::new(BufReader::new(file))
            .with_guessed_format()
            .map_err(|e| RestoreError::io_at("sniff download format", path, e))?
            .decode()
            .map_err(RestoreError::decode_source)?
            .to_rgb8();
        Ok(Self { pixels, byte_len })
    }

    pub fn size(&self) -> Size {
        Size {
            w: self.pixels.width(),
            h: self.pixels.height(),
        }
    }
}

/// Restored output. Same dimensions as the [`RawImage`] it came from.
#[derive(Debug, Clone)]
pub struct Canvas {
    pub pixels: RgbImage,
}

impl Canvas {
    pub fn size(&self) -> Size {
        Size {
            w: self.pixels.width(),
            h: self.pixels.height(),
        }
    }

    /// Encode as baseline JPEG at `quality` (1-100).
    pub fn encode_jpeg(&self, quality: u8) -> RestoreResult<Vec<u8>> {
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode_image(&self.pixels)
            .map_err(|e| RestoreError::encode_failed("jpeg", e.to_string()))?;
        Ok(out)
    }
}

/// Undo the strip permutation of `image`, which was cut into `strip_count` strips.
///
/// Fails with `InvalidPlan` before touching any pixels when `strip_count` or the
/// image height is zero.
pub fn reassemble(image: RawImage, strip_count: u32) -> RestoreResult<Canvas> {
    let size = image.size();
    let plan_error = |e: StripError| {
        RestoreError::invalid_plan(strip_count, size.h, e.to_string()).with_operation("reassemble")
    };
    let plan = build_plan(size, strip_count).map_err(plan_error)?;
    debug!(
        width = size.w,
        height = size.h,
        strips = plan.strip_count,
        base = plan.base_height,
        remainder = plan.remainder,
        "strip plan"
    );

    let mut canvas = RgbImage::new(size.w, size.h);
    restore_rows(
        image.pixels.as_raw(),
        size,
        RGB_BYTES_PER_PIXEL,
        None,
        &plan,
        &mut canvas,
    )
    .map_err(plan_error)?;

    Ok(Canvas { pixels: canvas })
}

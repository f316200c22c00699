//! Common test utilities for the strip restore integration tests
//!
//! Synthetic pages are built in their original layout, one flat gray level per
//! band, then scrambled with the forward permutation and PNG-encoded, so a
//! correct restore is checkable by sampling one row per band.

#![allow(dead_code)]

/// Synthetic page builders
pub mod fixtures {
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use strip_plan::cpu::scramble_rows;
    use strip_plan::plan::{Size, StripPlan, build_plan};

    pub const WIDTH: u32 = 48;
    pub const BAND_HEIGHT: u32 = 32;

    /// A page in original layout plus its scrambled, PNG-encoded form.
    pub struct ScrambledPage {
        pub original: RgbImage,
        pub scrambled_png: Vec<u8>,
        pub plan: StripPlan,
        /// Gray level of each band, indexed by band (top to bottom in the original).
        pub levels: Vec<u8>,
    }

    /// Gray level for band `m` of `n`, spread over 8..=248.
    pub fn band_level(m: u32, n: u32) -> u8 {
        (8 + m * (240 / n.max(1))) as u8
    }

    /// Build a page of `strip_count` bands with `extra_rows` of remainder.
    pub fn page(strip_count: u32, extra_rows: u32) -> ScrambledPage {
        let size = Size {
            w: WIDTH,
            h: strip_count * BAND_HEIGHT + extra_rows,
        };
        let plan = build_plan(size, strip_count).expect("valid plan");
        let levels: Vec<u8> = (0..strip_count).map(|m| band_level(m, strip_count)).collect();

        let mut original = RgbImage::new(size.w, size.h);
        for band in plan.bands() {
            let level = levels[band.index as usize];
            for y in band.dst_rows() {
                for x in 0..size.w {
                    original.put_pixel(x, y, Rgb([level, level, level]));
                }
            }
        }

        let mut scrambled = RgbImage::new(size.w, size.h);
        scramble_rows(original.as_raw(), size, 3, None, &plan, &mut scrambled)
            .expect("scramble fixture");

        ScrambledPage {
            original,
            scrambled_png: encode_png(&scrambled),
            plan,
            levels,
        }
    }

    pub fn encode_png(image: &RgbImage) -> Vec<u8> {
        let mut out = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .expect("encode png");
        out
    }
}

/// Fetcher doubles
pub mod fetchers {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use strip_restore::{Fetcher, RestoreError, RestoreResult};

    /// Serves the same body for every URL and counts calls.
    pub struct CountingFetcher {
        body: Vec<u8>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        pub fn new(body: Vec<u8>) -> Self {
            Self {
                body,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        /// Hold every fetch for `delay` so concurrent requests overlap.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> RestoreResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.body.clone())
        }
    }

    /// Answers every URL with a fixed HTTP status.
    pub struct FailingFetcher {
        pub status: u16,
    }

    #[async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(&self, url: &str) -> RestoreResult<Vec<u8>> {
            Err(RestoreError::fetch_failed(
                url,
                Some(self.status),
                "canned failure",
            ))
        }
    }
}

/// Assertions over restored output
pub mod assertions {
    use image::RgbImage;
    use strip_plan::plan::StripPlan;

    /// Max per-channel deviation tolerated after JPEG re-encoding of flat bands.
    pub const JPEG_TOLERANCE: u8 = 6;

    pub fn decode_jpeg(bytes: &[u8]) -> RgbImage {
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "output is not a JPEG");
        image::load_from_memory(bytes).expect("decode output").to_rgb8()
    }

    /// Sample the middle row of every band and compare with its expected level.
    pub fn assert_bands_restored(restored: &RgbImage, plan: &StripPlan, levels: &[u8]) {
        assert_eq!(restored.height(), plan.input.h);
        assert_eq!(restored.width(), plan.input.w);

        for band in plan.bands() {
            let y = band.dst_y + band.height / 2;
            let expected = levels[band.index as usize];
            for x in [0, restored.width() / 2, restored.width() - 1] {
                let pixel = restored.get_pixel(x, y);
                for channel in pixel.0 {
                    assert!(
                        channel.abs_diff(expected) <= JPEG_TOLERANCE,
                        "band {} at ({}, {}): got {:?}, expected ~{}",
                        band.index,
                        x,
                        y,
                        pixel.0,
                        expected
                    );
                }
            }
        }
    }

    pub fn dir_entries(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

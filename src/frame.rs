//! Raster frames delivered by frame sources.
//!
//! Frames carry packed BGR24 pixels, the byte order most capture devices
//! deliver. Detectors and preview sinks that want RGB call `to_rgb()`.

use anyhow::{anyhow, Result};
use std::time::Instant;

/// Pixel layouts a source may hand over for conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Bgr24,
    Rgb24,
}

/// One captured frame.
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    /// Monotonic capture instant.
    captured_at: Instant,
    /// Per-source frame counter, starting at 1.
    sequence: u64,
}

impl Frame {
    /// Wrap packed BGR24 pixels. Fails if the length does not match.
    pub fn from_bgr(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = packed_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "BGR frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            captured_at: Instant::now(),
            sequence,
        })
    }

    /// Convert pixels in `format` into a BGR frame.
    pub fn from_pixels(
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
    ) -> Result<Self> {
        match format {
            PixelFormat::Bgr24 => Self::from_bgr(pixels.to_vec(), width, height, sequence),
            PixelFormat::Rgb24 => Self::from_bgr(swap_red_blue(pixels), width, height, sequence),
        }
    }

    /// Convert pixels whose rows are `stride` bytes apart (row padding, as
    /// many capture drivers deliver) into a packed BGR frame. Trailing bytes
    /// after the last row are ignored.
    pub fn from_strided(
        pixels: &[u8],
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
        sequence: u64,
    ) -> Result<Self> {
        let packed = pack_rows(pixels, width, height, stride)?;
        match format {
            PixelFormat::Bgr24 => Self::from_bgr(packed, width, height, sequence),
            PixelFormat::Rgb24 => Self::from_bgr(swap_red_blue(&packed), width, height, sequence),
        }
    }

    /// All-black frame, used for model warm-up.
    pub fn blank(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize) * 3;
        Self {
            data: vec![0u8; len],
            width,
            height,
            captured_at: Instant::now(),
            sequence: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Packed BGR24 bytes, row-major.
    pub fn bgr(&self) -> &[u8] {
        &self.data
    }

    /// Packed RGB24 copy of the frame.
    pub fn to_rgb(&self) -> Vec<u8> {
        swap_red_blue(&self.data)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// Byte length of a packed 3-byte-per-pixel image. Zero-sized and
/// overflowing dimensions are rejected.
pub(crate) fn packed_len(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(anyhow!("frame dimensions must be non-zero ({}x{})", width, height));
    }
    width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(3))
        .map(|v| v as usize)
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

fn pack_rows(pixels: &[u8], width: u32, height: u32, stride: usize) -> Result<Vec<u8>> {
    let row_len = packed_len(width, 1)?;
    let total = packed_len(width, height)?;
    if stride < row_len {
        return Err(anyhow!(
            "row stride {} is shorter than a {}-pixel row",
            stride,
            width
        ));
    }
    let needed = stride * (height as usize - 1) + row_len;
    if pixels.len() < needed {
        return Err(anyhow!(
            "strided frame too short: expected at least {}, got {}",
            needed,
            pixels.len()
        ));
    }
    if stride == row_len {
        return Ok(pixels[..total].to_vec());
    }
    let mut packed = Vec::with_capacity(total);
    for row in pixels.chunks(stride).take(height as usize) {
        packed.extend_from_slice(&row[..row_len]);
    }
    Ok(packed)
}

fn swap_red_blue(pixels: &[u8]) -> Vec<u8> {
    let mut out = pixels.to_vec();
    for px in out.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(Frame::from_bgr(vec![0u8; 11], 2, 2, 1).is_err());
        assert!(Frame::from_bgr(vec![0u8; 12], 2, 2, 1).is_ok());
    }

    #[test]
    fn rgb_conversion_swaps_channels() -> Result<()> {
        let frame = Frame::from_bgr(vec![1, 2, 3, 4, 5, 6], 2, 1, 7)?;
        assert_eq!(frame.to_rgb(), vec![3, 2, 1, 6, 5, 4]);
        assert_eq!(frame.sequence(), 7);

        let from_rgb = Frame::from_pixels(&[3, 2, 1], 1, 1, PixelFormat::Rgb24, 1)?;
        assert_eq!(from_rgb.bgr(), &[1, 2, 3]);
        Ok(())
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(Frame::from_bgr(Vec::new(), 0, 0, 1).is_err());
        assert!(Frame::from_bgr(Vec::new(), 4, 0, 1).is_err());
        assert!(packed_len(70_000, 70_000).is_err());
    }

    #[test]
    fn strided_rows_are_repacked() -> Result<()> {
        // 2x2 BGR with 2 bytes of padding per row, plus slack at the end.
        let pixels = [
            1, 2, 3, 4, 5, 6, 0xAA, 0xAA, //
            7, 8, 9, 10, 11, 12, 0xAA, 0xAA, //
            0xFF, 0xFF,
        ];
        let frame = Frame::from_strided(&pixels, 2, 2, 8, PixelFormat::Bgr24, 3)?;
        assert_eq!(frame.bgr(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);

        let rgb = Frame::from_strided(&pixels[..14], 2, 2, 8, PixelFormat::Rgb24, 4)?;
        assert_eq!(&rgb.bgr()[..6], &[3, 2, 1, 6, 5, 4]);

        let packed = Frame::from_strided(&pixels[..12], 2, 2, 6, PixelFormat::Bgr24, 5)?;
        assert_eq!(packed.bgr().len(), 12);
        Ok(())
    }

    #[test]
    fn strided_input_must_cover_every_row() {
        assert!(Frame::from_strided(&[0u8; 13], 2, 2, 8, PixelFormat::Bgr24, 1).is_err());
        assert!(Frame::from_strided(&[0u8; 16], 2, 2, 4, PixelFormat::Bgr24, 1).is_err());
    }

    #[test]
    fn capture_instant_is_stamped_on_construction() -> Result<()> {
        let before = Instant::now();
        let frame = Frame::from_bgr(vec![0u8; 3], 1, 1, 1)?;
        assert!(frame.captured_at() >= before);
        assert!(frame.captured_at() <= Instant::now());
        Ok(())
    }

    #[test]
    fn blank_frame_has_expected_size() {
        let frame = Frame::blank(4, 3);
        assert_eq!(frame.bgr().len(), 36);
        assert_eq!((frame.width(), frame.height()), (4, 3));
    }
}

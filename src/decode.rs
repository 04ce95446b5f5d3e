// decode.rs — Raw byte buffers to Sample.
//
// Two source layouts:
//   packed    sensor output at half resolution, two 4-bit samples per byte
//             (high nibble = left pixel, low nibble = right pixel)
//   unpacked  one byte per pixel, as read from a BMP-like file
//
// Nibbles are expanded to 8 bits with n·17, so 0x0 → 0 and 0xF → 255.

use tracing::debug;

use crate::error::{FingerprintError, Result};
use crate::image::Image;

/// Default sensor frame size.
pub const DEFAULT_WIDTH: usize = 256;
pub const DEFAULT_HEIGHT: usize = 288;

/// A decoded grayscale fingerprint sample. Read-only once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    image: Image<u8>,
}

impl Sample {
    /// Wrap an already decoded intensity grid.
    pub fn from_image(image: Image<u8>) -> Self {
        Sample { image }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.image.height()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.image.get(x, y)
    }

    pub fn image(&self) -> &Image<u8> {
        &self.image
    }

    /// Mean intensity, 0.0 for an empty sample.
    pub fn mean(&self) -> f32 {
        if self.image.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.image.as_slice().iter().map(|&v| v as u64).sum();
        sum as f32 / self.image.len() as f32
    }

    /// True when every pixel has the same value (no ridge information).
    pub fn is_uniform(&self) -> bool {
        match self.image.as_slice().split_first() {
            Some((first, rest)) => rest.iter().all(|v| v == first),
            None => true,
        }
    }
}

/// Expand one packed byte into its (left, right) 8-bit intensities.
#[inline]
pub fn unpack_byte(b: u8) -> (u8, u8) {
    ((b >> 4) * 17, (b & 0x0F) * 17)
}

/// Decode a raw buffer into a `width × height` Sample.
///
/// With `packed`, the buffer must hold exactly `width·height/2` bytes (and
/// `width·height` must be even); otherwise exactly `width·height` bytes.
pub fn decode(buffer: &[u8], width: usize, height: usize, packed: bool) -> Result<Sample> {
    if width == 0 || height == 0 {
        return Err(FingerprintError::MalformedInput(format!(
            "empty sample dimensions {width}×{height}"
        )));
    }
    let pixels = width * height;

    let data = if packed {
        if pixels % 2 != 0 || buffer.len() != pixels / 2 {
            return Err(FingerprintError::MalformedInput(format!(
                "packed buffer of {} bytes does not cover {width}×{height} (expected {})",
                buffer.len(),
                pixels / 2,
            )));
        }
        let mut data = Vec::with_capacity(pixels);
        for &b in buffer {
            let (hi, lo) = unpack_byte(b);
            data.push(hi);
            data.push(lo);
        }
        data
    } else {
        if buffer.len() != pixels {
            return Err(FingerprintError::MalformedInput(format!(
                "buffer of {} bytes does not cover {width}×{height} (expected {pixels})",
                buffer.len(),
            )));
        }
        buffer.to_vec()
    };

    debug!("Decoded {}×{} sample (packed: {})", width, height, packed);
    Ok(Sample {
        image: Image::from_vec(width, height, data),
    })
}

/// Convert a u8 image to f32 preserving raw values (u8 42 → 42.0).
pub fn to_f32_raw(src: &Image<u8>) -> Image<f32> {
    src.map(|v| v as f32)
}

//! Color decontamination: un-mix the white backdrop from partially transparent pixels

use crate::types::PixelBuffer;

/// Pixels at or above this alpha are treated as opaque and left alone
pub const OPAQUE_ALPHA_CUTOFF: u8 = 250;

const MIN_ALPHA_FRACTION: f64 = 0.01;

/// Recover a color channel assuming it was composited over white at `alpha`
#[inline]
#[must_use]
pub fn unmix_from_white(channel: u8, alpha: f64) -> u8 {
    let unmixed = (f64::from(channel) - (1.0 - alpha) * 255.0) / alpha.max(MIN_ALPHA_FRACTION);
    unmixed.round().clamp(0.0, 255.0) as u8
}

/// Rewrite RGB of every pixel with `0 < alpha < 250`; alpha is unchanged
///
/// Returns the number of pixels rewritten.
pub fn decontaminate(buffer: &mut PixelBuffer) -> usize {
    let mut rewritten = 0;
    for pixel in buffer.as_raw_mut().chunks_exact_mut(PixelBuffer::CHANNELS) {
        let a = pixel[3];
        if a == 0 || a >= OPAQUE_ALPHA_CUTOFF {
            continue;
        }
        let alpha = f64::from(a) / 255.0;
        for channel in &mut pixel[..3] {
            *channel = unmix_from_white(*channel, alpha);
        }
        rewritten += 1;
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmix_half_alpha() {
        // 50% red over white is (255, 128, 128)
        let alpha = 128.0 / 255.0;
        assert_eq!(unmix_from_white(255, alpha), 255);
        assert_eq!(unmix_from_white(128, alpha), 2);
    }

    #[test]
    fn test_unmix_clamps() {
        assert_eq!(unmix_from_white(0, 0.5), 0);
        assert_eq!(unmix_from_white(255, 1.0 / 255.0), 255);
    }

    #[test]
    fn test_skips_opaque_and_transparent() {
        let mut data = Vec::new();
        data.extend_from_slice(&[200, 200, 200, 0]);
        data.extend_from_slice(&[200, 200, 200, 250]);
        data.extend_from_slice(&[200, 200, 200, 255]);
        let mut buffer = PixelBuffer::new(3, 1, data.clone()).unwrap();

        assert_eq!(decontaminate(&mut buffer), 0);
        assert_eq!(buffer.as_raw(), data.as_slice());
    }

    #[test]
    fn test_rewrites_partial_alpha_keeping_alpha() {
        let mut buffer = PixelBuffer::from_pixel(1, 1, [240, 240, 240, 120]);
        assert_eq!(decontaminate(&mut buffer), 1);

        let [r, g, b, a] = buffer.pixel_at(0);
        assert_eq!(a, 120);
        assert!(r < 240 && r == g && g == b);
    }
}

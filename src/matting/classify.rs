//! Per-pixel background and feather classification

use crate::config::LevelProfile;

/// Pixels below this alpha are background regardless of color
pub const TRANSPARENT_ALPHA_FLOOR: u8 = 12;

/// Brightness (max channel) and saturation (max - min channel) of an RGB triple
#[inline]
#[must_use]
pub fn brightness_and_saturation(r: u8, g: u8, b: u8) -> (u8, u8) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    (max, max - min)
}

/// Whether a pixel reads as the light, near-neutral backdrop
#[inline]
#[must_use]
pub fn is_background(pixel: [u8; 4], profile: &LevelProfile) -> bool {
    let [r, g, b, a] = pixel;
    if a < TRANSPARENT_ALPHA_FLOOR {
        return true;
    }
    let (brightness, saturation) = brightness_and_saturation(r, g, b);
    brightness >= profile.bg_min_brightness && saturation <= profile.bg_max_saturation
}

/// Whether a pixel next to the background is light and neutral enough to soften
#[inline]
#[must_use]
pub fn is_feather_candidate(pixel: [u8; 4], profile: &LevelProfile) -> bool {
    let (brightness, saturation) = brightness_and_saturation(pixel[0], pixel[1], pixel[2]);
    brightness >= profile.feather_min_brightness && saturation <= profile.feather_max_saturation
}

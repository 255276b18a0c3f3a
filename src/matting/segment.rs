//! Border-seeded flood fill that finds the connected backdrop

use super::classify::is_background;
use crate::{config::LevelProfile, types::PixelBuffer, types::SegmentationMask};
use std::collections::VecDeque;

/// Mark every background pixel 4-connected to the image border
///
/// Background-colored regions fully enclosed by the subject are left alone.
#[must_use]
pub fn segment_background(buffer: &PixelBuffer, profile: &LevelProfile) -> SegmentationMask {
    let (width, height) = buffer.dimensions();
    let mut mask = SegmentationMask::empty(width, height);
    if width == 0 || height == 0 {
        return mask;
    }

    let w = width as usize;
    let h = height as usize;
    let mut visited = vec![false; w * h];
    let mut queue = VecDeque::with_capacity(2 * (w + h));

    let mut visit = |x: usize, y: usize, queue: &mut VecDeque<(usize, usize)>| {
        let index = y * w + x;
        if visited[index] {
            return;
        }
        visited[index] = true;
        if is_background(buffer.pixel_at(index), profile) {
            mask.mark(index);
            queue.push_back((x, y));
        }
    };

    for x in 0..w {
        visit(x, 0, &mut queue);
        visit(x, h - 1, &mut queue);
    }
    for y in 1..h.saturating_sub(1) {
        visit(0, y, &mut queue);
        visit(w - 1, y, &mut queue);
    }

    while let Some((x, y)) = queue.pop_front() {
        if x + 1 < w {
            visit(x + 1, y, &mut queue);
        }
        if x > 0 {
            visit(x - 1, y, &mut queue);
        }
        if y + 1 < h {
            visit(x, y + 1, &mut queue);
        }
        if y > 0 {
            visit(x, y - 1, &mut queue);
        }
    }

    mask
}

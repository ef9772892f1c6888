//! Neighbourhood filters
//!
//! Both filters sample a 3x3 window. Coordinates outside the frame are
//! clamped to the nearest edge pixel, so border pixels see their own
//! values repeated rather than zeros.

use luma_core::{luma, BYTES_PER_PIXEL};

#[inline]
fn clamp_coord(v: i64, max: u32) -> usize {
    v.clamp(0, max as i64 - 1) as usize
}

fn luma_plane(pixels: &[u8], count: usize) -> Vec<u8> {
    pixels
        .chunks_exact(BYTES_PER_PIXEL)
        .take(count)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect()
}

/// Sobel gradient magnitude of luma, written to R, G and B
pub fn edge_detect(pixels: &mut [u8], width: u32, height: u32) {
    let count = width as usize * height as usize;
    if count == 0 {
        return;
    }
    let plane = luma_plane(pixels, count);
    let at = |x: i64, y: i64| -> i32 {
        plane[clamp_coord(y, height) * width as usize + clamp_coord(x, width)] as i32
    };

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let gx = at(x + 1, y - 1) + 2 * at(x + 1, y) + at(x + 1, y + 1)
                - at(x - 1, y - 1)
                - 2 * at(x - 1, y)
                - at(x - 1, y + 1);
            let gy = at(x - 1, y + 1) + 2 * at(x, y + 1) + at(x + 1, y + 1)
                - at(x - 1, y - 1)
                - 2 * at(x, y - 1)
                - at(x + 1, y - 1);
            let magnitude = ((gx * gx + gy * gy) as f32).sqrt().min(255.0) as u8;

            let i = (y as usize * width as usize + x as usize) * BYTES_PER_PIXEL;
            pixels[i] = magnitude;
            pixels[i + 1] = magnitude;
            pixels[i + 2] = magnitude;
        }
    }
}

const GAUSSIAN: [[u32; 3]; 3] = [[1, 2, 1], [2, 4, 2], [1, 2, 1]];

/// 3x3 Gaussian blur of R, G and B
pub fn blur(pixels: &mut [u8], width: u32, height: u32) {
    let count = width as usize * height as usize;
    if count == 0 {
        return;
    }
    let source = pixels[..count * BYTES_PER_PIXEL].to_vec();

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let mut sums = [0u32; 3];
            for (dy, row) in GAUSSIAN.iter().enumerate() {
                for (dx, weight) in row.iter().enumerate() {
                    let sx = clamp_coord(x + dx as i64 - 1, width);
                    let sy = clamp_coord(y + dy as i64 - 1, height);
                    let j = (sy * width as usize + sx) * BYTES_PER_PIXEL;
                    for (c, sum) in sums.iter_mut().enumerate() {
                        *sum += source[j + c] as u32 * weight;
                    }
                }
            }

            let i = (y as usize * width as usize + x as usize) * BYTES_PER_PIXEL;
            for (c, sum) in sums.iter().enumerate() {
                pixels[i + c] = ((sum + 8) / 16) as u8;
            }
        }
    }
}

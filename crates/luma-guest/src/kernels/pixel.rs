//! Pixelwise filters

use luma_core::{luma, BYTES_PER_PIXEL};

use super::to_channel;

/// Decoded 3x3 colour matrix, row-major, applied to (R, G, B)
pub type Matrix3 = [f32; 9];

/// Sepia tone coefficients
pub const SEPIA: Matrix3 = [
    0.393, 0.769, 0.189, //
    0.349, 0.686, 0.168, //
    0.272, 0.534, 0.131,
];

/// Decode one quantized matrix sample: `coef = (sample - 128) / 64`
#[inline]
pub fn decode_coefficient(sample: u8) -> f32 {
    (sample as f32 - 128.0) / 64.0
}

pub fn decode_matrix(samples: &[u8; 9]) -> Matrix3 {
    let mut matrix = [0.0; 9];
    for (m, s) in matrix.iter_mut().zip(samples) {
        *m = decode_coefficient(*s);
    }
    matrix
}

pub fn grayscale(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
        let y = luma(px[0], px[1], px[2]);
        px[0] = y;
        px[1] = y;
        px[2] = y;
    }
}

/// Invert RGB; alpha is kept so the operation is an involution on all four channels
pub fn invert(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
        px[0] = 255 - px[0];
        px[1] = 255 - px[1];
        px[2] = 255 - px[2];
    }
}

pub fn brightness(pixels: &mut [u8], delta: i32) {
    for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
        for c in &mut px[..3] {
            *c = (*c as i32 + delta).clamp(0, 255) as u8;
        }
    }
}

/// Luma at or above `level` becomes white, everything else black
pub fn threshold(pixels: &mut [u8], level: u8) {
    for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
        let v = if luma(px[0], px[1], px[2]) >= level {
            255
        } else {
            0
        };
        px[0] = v;
        px[1] = v;
        px[2] = v;
    }
}

pub fn sepia(pixels: &mut [u8]) {
    color_matrix(pixels, &SEPIA);
}

/// Stretch each channel around mid-grey by `factor`
pub fn contrast(pixels: &mut [u8], factor: f32) {
    for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
        for c in &mut px[..3] {
            *c = to_channel((*c as f32 - 128.0) * factor + 128.0);
        }
    }
}

/// Scale each channel's distance from the pixel's luma by `factor`
pub fn saturation(pixels: &mut [u8], factor: f32) {
    for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
        let y = luma(px[0], px[1], px[2]) as f32;
        for c in &mut px[..3] {
            *c = to_channel(y + (*c as f32 - y) * factor);
        }
    }
}

pub fn color_matrix(pixels: &mut [u8], m: &Matrix3) {
    for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
        let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
        px[0] = to_channel(m[0] * r + m[1] * g + m[2] * b);
        px[1] = to_channel(m[3] * r + m[4] * g + m[5] * b);
        px[2] = to_channel(m[6] * r + m[7] * g + m[8] * b);
    }
}

/// Darken towards the corners. `strength` 255 takes the corners to black.
pub fn vignette(pixels: &mut [u8], width: u32, height: u32, strength: u8) {
    if strength == 0 || width == 0 || height == 0 {
        return;
    }
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);
    let strength = strength as f32 / 255.0;

    for (i, px) in pixels
        .chunks_exact_mut(BYTES_PER_PIXEL)
        .take(width as usize * height as usize)
        .enumerate()
    {
        let x = (i % width as usize) as f32 - cx;
        let y = (i / width as usize) as f32 - cy;
        let d = (x * x + y * y).sqrt() / max_dist;
        let scale = 1.0 - strength * d * d;
        for c in &mut px[..3] {
            *c = to_channel(*c as f32 * scale);
        }
    }
}

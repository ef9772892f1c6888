//! Frame analysis heuristics
//!
//! Every score here is a deterministic function of the pixel data. The face
//! signals use a plain RGB skin-tone rule; they are presence cues, not a
//! detector.

use luma_core::{luma, AlertFlags, BYTES_PER_PIXEL};

/// Mean per-pixel RGB difference above which a pixel counts as moved
pub const MOTION_PIXEL_DELTA: u32 = 25;

/// Thresholds behind the alert flags
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionThresholds {
    /// Brightness jump between consecutive frames
    pub brightness_jump: u8,
    /// Motion score above which motion is excessive
    pub excessive_motion: u32,
    /// Face presence below which no face is reported
    pub min_face_presence: u8,
    /// Percentage of skin rows a column needs to count towards a face
    pub skin_column_percent: u32,
    /// A face run must be at least `width / min_face_width_divisor` columns wide
    pub min_face_width_divisor: u32,
    /// Skin centroid further than `width / gaze_offset_divisor` from centre = looking away
    pub gaze_offset_divisor: u32,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        DetectionThresholds {
            brightness_jump: 40,
            excessive_motion: 30,
            min_face_presence: 10,
            skin_column_percent: 30,
            min_face_width_divisor: 10,
            gaze_offset_divisor: 4,
        }
    }
}

/// RGB skin-tone rule
#[inline]
pub fn is_skin(r: u8, g: u8, b: u8) -> bool {
    r > 95
        && g > 40
        && b > 20
        && r > g
        && r > b
        && r - g.min(b) > 15
        && r.abs_diff(g) > 15
}

#[inline]
fn pixel_at(pixels: &[u8], width: u32, x: u32, y: u32) -> &[u8] {
    let i = (y as usize * width as usize + x as usize) * BYTES_PER_PIXEL;
    &pixels[i..i + BYTES_PER_PIXEL]
}

/// Mean of all R, G and B samples
pub fn brightness(pixels: &[u8]) -> u8 {
    let mut sum = 0u64;
    let mut count = 0u64;
    for px in pixels.chunks_exact(BYTES_PER_PIXEL) {
        sum += px[0] as u64 + px[1] as u64 + px[2] as u64;
        count += 3;
    }
    if count == 0 {
        return 0;
    }
    (sum / count) as u8
}

/// Variance of the 4-neighbour Laplacian of luma over interior pixels
pub fn blur_score(pixels: &[u8], width: u32, height: u32) -> u32 {
    if width < 3 || height < 3 {
        return 0;
    }
    let w = width as usize;
    let plane: Vec<i64> = pixels
        .chunks_exact(BYTES_PER_PIXEL)
        .take(w * height as usize)
        .map(|px| luma(px[0], px[1], px[2]) as i64)
        .collect();

    let mut sum = 0i64;
    let mut sum_sq = 0i64;
    let mut n = 0i64;
    for y in 1..height as usize - 1 {
        for x in 1..w - 1 {
            let c = plane[y * w + x];
            let lap = 4 * c - plane[(y - 1) * w + x] - plane[(y + 1) * w + x]
                - plane[y * w + x - 1]
                - plane[y * w + x + 1];
            sum += lap;
            sum_sq += lap * lap;
            n += 1;
        }
    }

    let mean = sum as f64 / n as f64;
    let variance = sum_sq as f64 / n as f64 - mean * mean;
    variance.max(0.0).round().min(u32::MAX as f64) as u32
}

/// Skin share of the centre window (middle half of each axis), scaled so
/// 40% coverage reads as full presence
pub fn face_presence(pixels: &[u8], width: u32, height: u32) -> u8 {
    if width == 0 || height == 0 {
        return 0;
    }
    let x0 = width / 4;
    let x1 = (x0 + (width / 2).max(1)).min(width);
    let y0 = height / 4;
    let y1 = (y0 + (height / 2).max(1)).min(height);

    let mut skin = 0u32;
    let mut total = 0u32;
    for y in y0..y1 {
        for x in x0..x1 {
            let px = pixel_at(pixels, width, x, y);
            if is_skin(px[0], px[1], px[2]) {
                skin += 1;
            }
            total += 1;
        }
    }

    let percent = (skin as f32 / total as f32 * 250.0).round();
    percent.min(100.0) as u8
}

/// Percentage (0-100) of pixels whose mean RGB difference exceeds
/// [`MOTION_PIXEL_DELTA`]
pub fn motion(current: &[u8], previous: &[u8]) -> u32 {
    let mut moved = 0u64;
    let mut count = 0u64;
    for (a, b) in current
        .chunks_exact(BYTES_PER_PIXEL)
        .zip(previous.chunks_exact(BYTES_PER_PIXEL))
    {
        let diff = a[0].abs_diff(b[0]) as u32 + a[1].abs_diff(b[1]) as u32 + a[2].abs_diff(b[2]) as u32;
        if diff / 3 > MOTION_PIXEL_DELTA {
            moved += 1;
        }
        count += 1;
    }
    if count == 0 {
        return 0;
    }
    (moved * 100 / count) as u32
}

/// Runs of skin-dominated columns in the middle band, each at least
/// `width / min_face_width_divisor` wide
fn face_runs(pixels: &[u8], width: u32, height: u32, t: &DetectionThresholds) -> u32 {
    let y0 = height / 4;
    let y1 = (y0 + (height / 2).max(1)).min(height);
    let band = y1 - y0;
    let min_run = (width / t.min_face_width_divisor.max(1)).max(1);

    let mut runs = 0;
    let mut run = 0;
    for x in 0..=width {
        let skin_column = x < width && {
            let skin = (y0..y1)
                .filter(|&y| {
                    let px = pixel_at(pixels, width, x, y);
                    is_skin(px[0], px[1], px[2])
                })
                .count() as u32;
            skin * 100 >= band * t.skin_column_percent
        };
        if skin_column {
            run += 1;
        } else {
            if run >= min_run {
                runs += 1;
            }
            run = 0;
        }
    }
    runs
}

/// Horizontal centroid of all skin pixels
fn skin_centroid_x(pixels: &[u8], width: u32, height: u32) -> Option<f32> {
    let mut sum = 0u64;
    let mut count = 0u64;
    for y in 0..height {
        for x in 0..width {
            let px = pixel_at(pixels, width, x, y);
            if is_skin(px[0], px[1], px[2]) {
                sum += x as u64;
                count += 1;
            }
        }
    }
    (count > 0).then(|| sum as f32 / count as f32)
}

/// Compare the current frame against the previous frame and its brightness
pub fn detect_cheating(
    current: &[u8],
    width: u32,
    height: u32,
    previous: &[u8],
    previous_brightness: u8,
    t: &DetectionThresholds,
) -> AlertFlags {
    let mut flags = AlertFlags::NONE;
    if width == 0 || height == 0 {
        return flags;
    }

    let presence = face_presence(current, width, height);
    let face_present = presence >= t.min_face_presence;

    flags.set(
        AlertFlags::MULTIPLE_FACES,
        face_runs(current, width, height, t) >= 2,
    );
    flags.set(
        AlertFlags::BRIGHTNESS_CHANGE,
        brightness(current).abs_diff(previous_brightness) > t.brightness_jump,
    );
    flags.set(
        AlertFlags::EXCESSIVE_MOTION,
        motion(current, previous) > t.excessive_motion,
    );
    flags.set(AlertFlags::NO_FACE, !face_present);

    if face_present {
        if let Some(cx) = skin_centroid_x(current, width, height) {
            let centre = (width as f32 - 1.0) / 2.0;
            let limit = width as f32 / t.gaze_offset_divisor.max(1) as f32;
            flags.set(AlertFlags::LOOKING_AWAY, (cx - centre).abs() > limit);
        }
    }

    flags
}

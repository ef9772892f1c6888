//! Per-frame metrics

/// Scalar metrics derived for a single frame. Never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameMetrics {
    /// Mean RGB sample value (0-255)
    pub brightness: u8,
    /// Sharpness energy, higher = sharper
    pub blur_score: u32,
    /// Face presence confidence (0-100)
    pub face_presence: u8,
    /// Share of changed pixels vs. the previous frame (0-100)
    pub motion_score: u32,
}

impl FrameMetrics {
    /// Brightness as a fraction of full scale
    pub fn brightness_ratio(&self) -> f32 {
        self.brightness as f32 / 255.0
    }

    /// Blur score scaled for a 0-100 gauge
    pub fn blur_percent(&self) -> u32 {
        (self.blur_score / 100).min(100)
    }

    /// Motion score clamped for a 0-100 gauge
    pub fn motion_percent(&self) -> u32 {
        self.motion_score.min(100)
    }
}

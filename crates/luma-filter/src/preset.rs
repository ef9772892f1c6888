//! Tone presets
//!
//! A preset is a colour matrix plus a vignette strength. The host owns the
//! numbers; the guest only applies what it is handed.

use std::fmt;
use std::str::FromStr;

use crate::filter::ColorMatrix;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TonePreset {
    /// Faded warm tones with a darkened border
    Vintage,
    Cool,
    Warm,
}

impl TonePreset {
    pub const ALL: [TonePreset; 3] = [TonePreset::Vintage, TonePreset::Cool, TonePreset::Warm];

    pub fn name(self) -> &'static str {
        match self {
            TonePreset::Vintage => "vintage",
            TonePreset::Cool => "cool",
            TonePreset::Warm => "warm",
        }
    }

    pub fn matrix(self) -> ColorMatrix {
        match self {
            TonePreset::Vintage => ColorMatrix([
                0.90, 0.50, 0.10, //
                0.30, 0.80, 0.10, //
                0.20, 0.30, 0.50,
            ]),
            TonePreset::Cool => ColorMatrix([
                0.90, 0.00, 0.00, //
                0.00, 1.00, 0.10, //
                0.00, 0.10, 1.20,
            ]),
            TonePreset::Warm => ColorMatrix([
                1.20, 0.10, 0.00, //
                0.00, 1.05, 0.00, //
                0.00, 0.00, 0.80,
            ]),
        }
    }

    /// Corner darkening, 0 = none, 255 = corners fully black
    pub fn vignette(self) -> u8 {
        match self {
            TonePreset::Vintage => 160,
            TonePreset::Cool | TonePreset::Warm => 0,
        }
    }
}

impl fmt::Display for TonePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TonePreset {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TonePreset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

//! Filter selection and parameter encoding

use std::fmt;
use std::str::FromStr;

use luma_core::LumaError;

use crate::preset::TonePreset;

/// Quantization scale for matrix coefficients: `sample = coef * 64 + 128`
pub const MATRIX_SCALE: f32 = 64.0;
pub const MATRIX_ZERO: f32 = 128.0;

/// 3x3 colour matrix applied to (R, G, B), row-major
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorMatrix(pub [f32; 9]);

impl ColorMatrix {
    pub const IDENTITY: ColorMatrix = ColorMatrix([
        1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, 0.0, 1.0,
    ]);

    /// Quantize one coefficient. Representable range is -2.0 ..= 1.984.
    #[inline]
    pub fn quantize(coef: f32) -> u8 {
        (coef * MATRIX_SCALE + MATRIX_ZERO).round().clamp(0.0, 255.0) as u8
    }

    /// 8-bit samples for transfer into the guest
    pub fn encode(&self) -> [u8; 9] {
        let mut out = [0u8; 9];
        for (o, c) in out.iter_mut().zip(self.0.iter()) {
            *o = Self::quantize(*c);
        }
        out
    }
}

/// Auxiliary bytes a filter passes to the guest
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterParams(Vec<u8>);

impl FilterParams {
    pub fn matrix(matrix: &ColorMatrix) -> Self {
        FilterParams(matrix.encode().to_vec())
    }

    /// 9 matrix samples followed by the vignette strength
    pub fn preset(preset: TonePreset) -> Self {
        let mut bytes = preset.matrix().encode().to_vec();
        bytes.push(preset.vignette());
        FilterParams(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Filter family
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    Pixelwise,
    Neighborhood,
    Preset,
}

/// Every filter the pipeline can run
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Filter {
    Grayscale,
    /// RGB only; alpha is preserved
    Invert,
    /// Saturating add to R, G and B
    Brightness(i32),
    /// Luma >= level becomes white, else black
    Threshold(u8),
    Sepia,
    /// Multiplier around mid-grey, 1.0 = unchanged
    Contrast(f32),
    /// Multiplier of distance from luma, 1.0 = unchanged
    Saturation(f32),
    ColorMatrix(ColorMatrix),
    EdgeDetect,
    Blur,
    Preset(TonePreset),
}

impl Filter {
    pub const DEFAULT_BRIGHTNESS: i32 = 30;
    pub const DEFAULT_THRESHOLD: u8 = 128;
    pub const DEFAULT_CONTRAST: f32 = 1.5;
    pub const DEFAULT_SATURATION: f32 = 1.5;

    pub fn name(&self) -> &'static str {
        match self {
            Filter::Grayscale => "grayscale",
            Filter::Invert => "invert",
            Filter::Brightness(_) => "brightness",
            Filter::Threshold(_) => "threshold",
            Filter::Sepia => "sepia",
            Filter::Contrast(_) => "contrast",
            Filter::Saturation(_) => "saturation",
            Filter::ColorMatrix(_) => "colorMatrix",
            Filter::EdgeDetect => "edgeDetect",
            Filter::Blur => "blur",
            Filter::Preset(p) => p.name(),
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::EdgeDetect | Filter::Blur => FilterKind::Neighborhood,
            Filter::Preset(_) => FilterKind::Preset,
            _ => FilterKind::Pixelwise,
        }
    }

    /// Parameter buffer the guest reads, if any
    pub fn params(&self) -> Option<FilterParams> {
        match self {
            Filter::ColorMatrix(m) => Some(FilterParams::matrix(m)),
            Filter::Preset(p) => Some(FilterParams::preset(*p)),
            _ => None,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Brightness(d) => write!(f, "brightness:{}", d),
            Filter::Threshold(l) => write!(f, "threshold:{}", l),
            Filter::Contrast(c) => write!(f, "contrast:{}", c),
            Filter::Saturation(s) => write!(f, "saturation:{}", s),
            Filter::ColorMatrix(m) => {
                f.write_str("colorMatrix:")?;
                for (i, coef) in m.0.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", coef)?;
                }
                Ok(())
            }
            other => f.write_str(other.name()),
        }
    }
}

fn parse_param<T: FromStr>(filter: &str, value: Option<&str>, default: T) -> Result<T, LumaError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| LumaError::InvalidParameter {
            filter: filter.to_string(),
            value: v.to_string(),
        }),
    }
}

/// Nine comma-separated coefficients, row-major. No value means identity.
fn parse_matrix(filter: &str, value: Option<&str>) -> Result<ColorMatrix, LumaError> {
    let Some(v) = value else {
        return Ok(ColorMatrix::IDENTITY);
    };
    let invalid = || LumaError::InvalidParameter {
        filter: filter.to_string(),
        value: v.to_string(),
    };

    let mut coefficients = [0.0f32; 9];
    let mut parts = v.split(',');
    for coef in coefficients.iter_mut() {
        *coef = parts
            .next()
            .and_then(|p| p.trim().parse().ok())
            .ok_or_else(invalid)?;
    }
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok(ColorMatrix(coefficients))
}

/// Parses `name` or `name:value`, e.g. `"threshold:100"` or
/// `"colorMatrix:1,0,0,0,1,0,0,0,1"`.
///
/// Unknown names yield [`LumaError::UnsupportedFilter`].
impl FromStr for Filter {
    type Err = LumaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.trim().split_once(':') {
            Some((n, v)) => (n.trim(), Some(v)),
            None => (s.trim(), None),
        };
        let key = name.to_ascii_lowercase().replace(&['-', '_'][..], "");

        let filter = match key.as_str() {
            "grayscale" | "greyscale" => Filter::Grayscale,
            "invert" => Filter::Invert,
            "brightness" => Filter::Brightness(parse_param(name, value, Self::DEFAULT_BRIGHTNESS)?),
            "threshold" => Filter::Threshold(parse_param(name, value, Self::DEFAULT_THRESHOLD)?),
            "sepia" => Filter::Sepia,
            "contrast" => Filter::Contrast(parse_param(name, value, Self::DEFAULT_CONTRAST)?),
            "saturation" => Filter::Saturation(parse_param(name, value, Self::DEFAULT_SATURATION)?),
            "colormatrix" | "matrix" => Filter::ColorMatrix(parse_matrix(name, value)?),
            "edge" | "edgedetect" | "sobel" => Filter::EdgeDetect,
            "blur" | "gaussian" => Filter::Blur,
            other => match other.parse::<TonePreset>() {
                Ok(preset) => Filter::Preset(preset),
                Err(_) => return Err(LumaError::UnsupportedFilter(name.to_string())),
            },
        };
        Ok(filter)
    }
}

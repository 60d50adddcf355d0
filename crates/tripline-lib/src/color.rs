//! Line color specifications and byte conversion

use crate::StyleError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// RGBA bytes, one quadruple per vertex in the color buffer
pub type Rgba = [u8; 4];

/// A `lineColor` value as written in a style symbol
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum LineColor {
    /// Channels in 0-255, alpha synthesized as 255
    Rgb([f64; 3]),
    /// Channels in 0-255
    Rgba([f64; 4]),
    /// Any CSS color string
    Spec(String),
}

impl LineColor {
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::Rgb([r, g, b])
    }

    /// Resolve to four channels in 0-255, before opacity is applied
    pub fn to_channels(&self) -> Result<[f64; 4], StyleError> {
        match self {
            Self::Rgb([r, g, b]) => Ok([*r, *g, *b, 255.0]),
            Self::Rgba(channels) => Ok(*channels),
            Self::Spec(spec) => {
                parse_spec(spec).ok_or_else(|| StyleError::InvalidColor(spec.clone()))
            }
        }
    }
}

impl From<&str> for LineColor {
    fn from(spec: &str) -> Self {
        Self::Spec(spec.to_string())
    }
}

impl From<[f64; 3]> for LineColor {
    fn from(channels: [f64; 3]) -> Self {
        Self::Rgb(channels)
    }
}

impl From<[f64; 4]> for LineColor {
    fn from(channels: [f64; 4]) -> Self {
        Self::Rgba(channels)
    }
}

/// Clamp a channel into a byte, rounding half to even
#[inline]
pub(crate) fn clamp_channel(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

pub(crate) fn to_rgba(channels: [f64; 4]) -> Rgba {
    channels.map(clamp_channel)
}

/// Any CSS color: hex, `rgb()`/`rgba()`, `hsl()`/`hwb()` or a named color
fn parse_spec(spec: &str) -> Option<[f64; 4]> {
    let color = csscolorparser::parse(spec.trim()).ok()?;
    Some([color.r, color.g, color.b, color.a].map(|c| f64::from(c) * 255.0))
}

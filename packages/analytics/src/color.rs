//! Choropleth color scale.
//!
//! Three-stop gradient: light blue at `t = 0`, yellow at `t = 0.5`, dark red
//! at `t = 1`, where `t = value / max` clamped to `[0, 1]`.

use epi_map_covid_models::{DEFAULT_GREY_HEX, Legend, LegendStop, ScaleStop};

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Creates a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Formats as uppercase `#RRGGBB`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Linear interpolation towards `other`, rounding each channel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        let channel = |a: u8, b: u8| -> u8 {
            let a = f64::from(a);
            let b = f64::from(b);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        };
        Self::new(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }
}

/// Light blue (`#ADD8E6`).
pub const LOW_COLOR: Rgb = Rgb::new(173, 216, 230);

/// Yellow (`#FFFF00`).
pub const MID_COLOR: Rgb = Rgb::new(255, 255, 0);

/// Dark red (`#8B0000`).
pub const HIGH_COLOR: Rgb = Rgb::new(139, 0, 0);

/// Maps `value` to a gradient color relative to `max`.
///
/// Returns [`DEFAULT_GREY_HEX`] when `value` is unknown or non-finite, or
/// when `max` is not a positive number.
#[must_use]
pub fn color_hex(value: Option<f64>, max: f64) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return DEFAULT_GREY_HEX.to_string();
    };
    if max.is_nan() || max <= 0.0 {
        return DEFAULT_GREY_HEX.to_string();
    }

    let t = (value / max).clamp(0.0, 1.0);
    let color = if t <= 0.5 {
        LOW_COLOR.lerp(MID_COLOR, t / 0.5)
    } else {
        MID_COLOR.lerp(HIGH_COLOR, (t - 0.5) / 0.5)
    };
    color.to_hex()
}

/// Legend metadata for the gradient.
#[must_use]
pub fn legend(max: Option<f64>) -> Legend {
    Legend {
        default_color: DEFAULT_GREY_HEX.to_string(),
        stops: vec![
            LegendStop {
                position: 0.0,
                color: LOW_COLOR.to_hex(),
                label: ScaleStop::Low,
            },
            LegendStop {
                position: 0.5,
                color: MID_COLOR.to_hex(),
                label: ScaleStop::Medium,
            },
            LegendStop {
                position: 1.0,
                color: HIGH_COLOR.to_hex(),
                label: ScaleStop::High,
            },
        ],
        max_value: max,
    }
}

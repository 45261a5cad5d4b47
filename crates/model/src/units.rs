//! Measurement units and readouts
//!
//! Document space is calibrated at 96 DPI: one unit is one CSS pixel.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PIXELS_PER_INCH: f64 = 96.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementUnit {
    #[default]
    Px,
    Mm,
    Cm,
    In,
}

impl MeasurementUnit {
    /// Document units per one of this unit.
    pub fn pixels_per_unit(&self) -> f64 {
        match self {
            MeasurementUnit::Px => 1.0,
            MeasurementUnit::Mm => PIXELS_PER_INCH / 25.4,
            MeasurementUnit::Cm => PIXELS_PER_INCH / 2.54,
            MeasurementUnit::In => PIXELS_PER_INCH,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            MeasurementUnit::Px => "px",
            MeasurementUnit::Mm => "mm",
            MeasurementUnit::Cm => "cm",
            MeasurementUnit::In => "in",
        }
    }

    pub fn from_pixels(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_unit()
    }

    /// Label for a distance in document units, two decimals.
    pub fn format_distance(&self, pixels: f64) -> String {
        format!("{:.2} {}", self.from_pixels(pixels), self.suffix())
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown measurement unit '{0}', expected px, mm, cm or in")]
pub struct UnknownUnit(pub String);

impl FromStr for MeasurementUnit {
    type Err = UnknownUnit;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "px" => Ok(MeasurementUnit::Px),
            "mm" => Ok(MeasurementUnit::Mm),
            "cm" => Ok(MeasurementUnit::Cm),
            "in" => Ok(MeasurementUnit::In),
            _ => Err(UnknownUnit(value.to_owned())),
        }
    }
}

/// Interior angle at `vertex` between the rays to `a` and `b`, in degrees `[0, 180]`.
pub fn interior_angle(a: &Point, vertex: &Point, b: &Point) -> f64 {
    let first = a.angle_from(vertex);
    let second = b.angle_from(vertex);
    let mut degrees = (second - first).abs().to_degrees();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    degrees
}

/// Label for an angle, one decimal.
pub fn format_angle(degrees: f64) -> String {
    format!("{degrees:.1}°")
}

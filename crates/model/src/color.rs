//! Stroke colors as stored by the persistence layer (`#RRGGBB`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Convert to normalized RGBA values (0.0 to 1.0)
    pub fn to_normalized(&self) -> (f32, f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Distance measurement stroke.
    pub const MEASURE_DISTANCE: Color = Color::rgb(0xFF, 0x6B, 0x00);
    /// Angle measurement stroke.
    pub const MEASURE_ANGLE: Color = Color::rgb(0x6B, 0x00, 0xFF);
    /// Selection handle outline.
    pub const SELECTION: Color = Color::rgb(0x00, 0xFF, 0x00);
    /// Rotation handle fill.
    pub const ROTATION_HANDLE: Color = Color::rgb(0x1E, 0x90, 0xFF);
}

impl Default for Color {
    fn default() -> Self {
        Color::RED
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}', expected #RRGGBB or #RRGGBBAA")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let hex = value.trim().strip_prefix('#').ok_or_else(|| ParseColorError(value.to_owned()))?;
        let channel = |index: usize| {
            hex.get(index..index + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ParseColorError(value.to_owned()))
        };

        match hex.len() {
            6 => Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Color::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => Err(ParseColorError(value.to_owned())),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_hex() {
        let color: Color = "#FF6B00".parse().unwrap();
        assert_eq!(color, Color::MEASURE_DISTANCE);
        assert_eq!(color.to_string(), "#FF6B00");
        assert_eq!("#ff000080".parse::<Color>().unwrap(), Color::new(255, 0, 0, 128));
    }

    #[test]
    fn rejects_garbage() {
        assert!("red".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert!("#GG0000".parse::<Color>().is_err());
    }

    #[test]
    fn color_normalization() {
        let (r, g, b, a) = Color::rgb(255, 128, 0).to_normalized();
        assert!((r - 1.0).abs() < 0.001);
        assert!((g - 0.502).abs() < 0.01);
        assert!(b.abs() < 0.001);
        assert!((a - 1.0).abs() < 0.001);
    }
}

//! Unit handling
//!
//! Distinguishes the two G-code unit modes (G21 millimeters, G20 inches),
//! converts between them and formats coordinates for re-serialized commands.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Machine coordinate units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Millimeters (G21)
    #[default]
    Millimeters,
    /// Inches (G20)
    Inches,
}

impl Units {
    /// Convert a value from one unit to another
    pub fn convert(value: f64, from: Units, to: Units) -> f64 {
        match (from, to) {
            (Units::Millimeters, Units::Inches) => value / MM_PER_INCH,
            (Units::Inches, Units::Millimeters) => value * MM_PER_INCH,
            _ => value,
        }
    }

    /// The G-code word selecting this unit mode
    pub fn gcode(&self) -> &'static str {
        match self {
            Units::Millimeters => "G21",
            Units::Inches => "G20",
        }
    }

    /// Short unit label ("mm" or "in")
    pub fn label(&self) -> &'static str {
        match self {
            Units::Millimeters => "mm",
            Units::Inches => "in",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mm" | "millimeters" | "metric" | "g21" => Ok(Self::Millimeters),
            "in" | "inch" | "inches" | "imperial" | "g20" => Ok(Self::Inches),
            _ => Err(format!("Unknown units: {}", s)),
        }
    }
}

/// Format a coordinate with at most `precision` decimals
///
/// Trailing zeros and a dangling decimal point are dropped, and negative zero
/// prints as `0`, so `format_coordinate(-0.00001, 3)` is `"0"` and
/// `format_coordinate(12.5, 4)` is `"12.5"`.
pub fn format_coordinate(value: f64, precision: usize) -> String {
    let mut text = format!("{:.*}", precision, value);
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion() {
        assert_eq!(Units::convert(25.4, Units::Millimeters, Units::Inches), 1.0);
        assert_eq!(Units::convert(2.0, Units::Inches, Units::Millimeters), 50.8);
        assert_eq!(Units::convert(3.0, Units::Inches, Units::Inches), 3.0);
    }

    #[test]
    fn test_parse_units() {
        assert_eq!("mm".parse::<Units>().unwrap(), Units::Millimeters);
        assert_eq!("G20".parse::<Units>().unwrap(), Units::Inches);
        assert!("furlongs".parse::<Units>().is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Units::Millimeters.to_string(), "mm");
        assert_eq!(Units::Inches.gcode(), "G20");
    }

    #[test]
    fn test_format_coordinate() {
        assert_eq!(format_coordinate(12.5, 4), "12.5");
        assert_eq!(format_coordinate(10.0, 4), "10");
        assert_eq!(format_coordinate(1.23456, 3), "1.235");
        assert_eq!(format_coordinate(-0.00001, 3), "0");
        assert_eq!(format_coordinate(-2.6, 0), "-3");
        assert_eq!(format_coordinate(100.0, 0), "100");
    }
}

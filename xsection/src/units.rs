//! Length units and the vertical scale.
//!
//! Everything inside the engine is in meters. Conversion to and from
//! project units happens only at the edges, through the helpers here.

use crate::XsecError;
use std::{fmt, str::FromStr};

/// International foot, in meters.
pub const FEET_TO_METERS: f64 = 0.3048;

pub const FEET_PER_MILE: f64 = 5280.0;

/// Units of elevations and depths in source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ElevUnits {
    Feet,
    Meters,
}

impl ElevUnits {
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            Self::Feet => value * FEET_TO_METERS,
            Self::Meters => value,
        }
    }

    pub fn from_meters(self, value: f64) -> f64 {
        match self {
            Self::Feet => value / FEET_TO_METERS,
            Self::Meters => value,
        }
    }
}

impl fmt::Display for ElevUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Feet => "Feet",
            Self::Meters => "Meters",
        })
    }
}

impl FromStr for ElevUnits {
    type Err = XsecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feet" | "foot" | "ft" => Ok(Self::Feet),
            "meters" | "meter" | "metres" | "m" => Ok(Self::Meters),
            other => Err(XsecError::Config(format!("unknown elevation unit '{other}'"))),
        }
    }
}

/// Units of horizontal distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LinearUnit {
    Meters,
    Kilometers,
    Feet,
    Miles,
}

impl LinearUnit {
    pub fn meters_per_unit(self) -> f64 {
        match self {
            Self::Meters => 1.0,
            Self::Kilometers => 1000.0,
            Self::Feet => FEET_TO_METERS,
            Self::Miles => FEET_PER_MILE * FEET_TO_METERS,
        }
    }

    pub fn to_meters(self, value: f64) -> f64 {
        value * self.meters_per_unit()
    }

    pub fn from_meters(self, value: f64) -> f64 {
        value / self.meters_per_unit()
    }
}

impl fmt::Display for LinearUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Meters => "Meters",
            Self::Kilometers => "Kilometers",
            Self::Feet => "Feet",
            Self::Miles => "Miles",
        })
    }
}

impl FromStr for LinearUnit {
    type Err = XsecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "meters" | "meter" | "metres" | "m" => Ok(Self::Meters),
            "kilometers" | "kilometer" | "kilometres" | "km" => Ok(Self::Kilometers),
            "feet" | "foot" | "ft" => Ok(Self::Feet),
            "miles" | "mile" | "mi" => Ok(Self::Miles),
            other => Err(XsecError::Config(format!("unknown linear unit '{other}'"))),
        }
    }
}

/// A linear measurement such as `500 Meters`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Length {
    pub value: f64,
    pub unit: LinearUnit,
}

impl Length {
    pub fn new(value: f64, unit: LinearUnit) -> Self {
        Self { value, unit }
    }

    pub fn meters(&self) -> f64 {
        self.unit.to_meters(self.value)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

impl FromStr for Length {
    type Err = XsecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let (Some(value), Some(unit), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(XsecError::Config(format!(
                "expected '<value> <unit>', got '{s}'"
            )));
        };
        let value = value
            .parse::<f64>()
            .map_err(|_| XsecError::Config(format!("'{value}' is not a number")))?;
        Ok(Self {
            value,
            unit: unit.parse()?,
        })
    }
}

/// Maps elevations in source units to schematic Y and back.
///
/// Schematic Y is meters multiplied by the vertical exaggeration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalScale {
    pub units: ElevUnits,
    pub exaggeration: f64,
}

impl VerticalScale {
    pub fn new(units: ElevUnits, exaggeration: f64) -> Self {
        Self {
            units,
            exaggeration,
        }
    }

    /// Source-unit elevation (or depth) to schematic Y.
    pub fn to_schematic(&self, value: f64) -> f64 {
        self.units.to_meters(value) * self.exaggeration
    }

    /// Schematic Y back to an unexaggerated value in `self.units`.
    pub fn from_schematic(&self, y: f64) -> f64 {
        self.units.from_meters(y / self.exaggeration)
    }
}

#[cfg(test)]
mod tests {
    use super::{ElevUnits, Length, LinearUnit, VerticalScale};
    use approx::assert_relative_eq;

    #[test]
    fn test_length_from_str() {
        let length: Length = "500 Meters".parse().unwrap();
        assert_eq!(length, Length::new(500.0, LinearUnit::Meters));
        let length: Length = "2 mi".parse().unwrap();
        assert_relative_eq!(length.meters(), 3218.688, epsilon = 1e-9);
        assert!("500".parse::<Length>().is_err());
        assert!("five Meters".parse::<Length>().is_err());
        assert!("5 furlongs".parse::<Length>().is_err());
    }

    #[test]
    fn test_vertical_scale() {
        let feet = VerticalScale::new(ElevUnits::Feet, 1.0);
        assert_relative_eq!(feet.to_schematic(500.0), 152.4, epsilon = 1e-9);
        assert_relative_eq!(
            feet.from_schematic(feet.to_schematic(400.0)),
            400.0,
            epsilon = 1e-9
        );

        let meters = VerticalScale::new(ElevUnits::Meters, 2.0);
        assert_relative_eq!(meters.to_schematic(500.0), 1000.0);
        assert_relative_eq!(meters.from_schematic(1000.0), 500.0);
        let as_feet = VerticalScale::new(ElevUnits::Feet, 2.0);
        assert_relative_eq!(
            as_feet.from_schematic(meters.to_schematic(500.0)),
            500.0 / 0.3048,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_linear_units() {
        assert_relative_eq!(LinearUnit::Kilometers.to_meters(1.5), 1500.0);
        assert_relative_eq!(LinearUnit::Feet.from_meters(0.3048), 1.0);
        assert_eq!("KM".parse::<LinearUnit>().unwrap(), LinearUnit::Kilometers);
    }
}

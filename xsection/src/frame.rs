//! Axis frame, tick lines and tick labels for a section.

use crate::{
    borehole::BoreholeStick,
    math::{round_to_interval, steps, Rounding},
    profile::SurfaceProfile,
    units::{ElevUnits, LinearUnit, VerticalScale},
    GeometryError, XsecError,
};
use geo::geometry::{Coord, LineString, Rect};
use std::fmt;

/// Tick intervals for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSpec {
    pub distance_interval: f64,
    pub distance_unit: LinearUnit,
    pub elevation_interval: f64,
    pub elevation_unit: ElevUnits,
}

impl GridSpec {
    pub fn validate(&self) -> Result<(), XsecError> {
        for (name, interval) in [
            ("distance", self.distance_interval),
            ("elevation", self.elevation_interval),
        ] {
            if !(interval.is_finite() && interval > 0.0) {
                return Err(XsecError::Config(format!(
                    "{name} interval must be positive, got {interval}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum MarkKind {
    Frame,
    DistanceMark,
    ElevationMark,
}

impl fmt::Display for MarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Frame => "FRAME",
            Self::DistanceMark => "DISTANCE MARK",
            Self::ElevationMark => "ELEVATION MARK",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridLine {
    pub id: String,
    pub kind: MarkKind,
    pub label: String,
    pub line: LineString<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridLabel {
    pub id: String,
    pub kind: MarkKind,
    pub label: String,
    pub position: Coord<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridFrame {
    pub name: String,
    pub labels_name: String,
    pub spec: GridSpec,
    /// Schematic bounds of the frame.
    pub bounds: Rect<f64>,
    /// Tick values in `spec.elevation_unit`, ascending.
    pub elevation_ticks: Vec<f64>,
    /// Tick values in `spec.distance_unit`, ascending.
    pub distance_ticks: Vec<f64>,
    pub lines: Vec<GridLine>,
    pub labels: Vec<GridLabel>,
}

/// Schematic extent of everything drawn for one section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Extents {
    /// X runs to the end of the topographic profile. Y covers the
    /// borehole sticks, the topographic profile and, when present, the
    /// bedrock profile.
    pub fn from_outputs(
        sticks: &[BoreholeStick],
        topography: &SurfaceProfile,
        bedrock: Option<&SurfaceProfile>,
    ) -> Result<Self, XsecError> {
        let ((_, x_max), (topo_min, topo_max)) = topography
            .x_extent()
            .zip(topography.y_extent())
            .ok_or(GeometryError::NoCoverage)?;
        let mut y_min = topo_min;
        let mut y_max = topo_max;
        for stick in sticks {
            y_min = y_min.min(stick.bottom);
            y_max = y_max.max(stick.top);
        }
        if let Some((lo, _)) = bedrock.and_then(SurfaceProfile::y_extent) {
            y_min = y_min.min(lo);
        }
        Ok(Self {
            x_max,
            y_min,
            y_max,
        })
    }
}

/// Formats a tick value; whole numbers print without decimals.
pub fn tick_label(value: f64) -> String {
    // Normalizes -0.
    let value = value + 0.0;
    if (value - value.round()).abs() < 1e-9 {
        format!("{:.0}", value.round() + 0.0)
    } else {
        let text = format!("{value:.6}");
        text.trim_end_matches('0').trim_end_matches('.').to_owned()
    }
}

/// Most ticks a single axis may carry.
pub const MAX_TICKS: usize = 1000;

/// Rejects an axis from `start` to `end` at `interval` that would
/// carry more than [`MAX_TICKS`] ticks.
#[allow(clippy::cast_precision_loss)]
fn tick_count(axis: &str, start: f64, end: f64, interval: f64) -> Result<(), XsecError> {
    let count = ((end - start) / interval).round() + 1.0;
    if !count.is_finite() || count > MAX_TICKS as f64 {
        return Err(XsecError::Config(format!(
            "{axis} interval {interval} gives {count} ticks, more than {MAX_TICKS}"
        )));
    }
    Ok(())
}

pub struct FrameBuilder {
    exaggeration: f64,
}

impl FrameBuilder {
    pub fn new(exaggeration: f64) -> Self {
        Self { exaggeration }
    }

    pub fn build(
        &self,
        section: &str,
        ve_label: &str,
        extents: Extents,
        spec: &GridSpec,
    ) -> Result<GridFrame, XsecError> {
        let scale = VerticalScale::new(spec.elevation_unit, self.exaggeration);
        let dist = spec.distance_unit;

        // Round in unexaggerated tick units, then map back.
        let elev_min = round_to_interval(
            scale.from_schematic(extents.y_min),
            spec.elevation_interval,
            Rounding::Floor,
        );
        let elev_max = round_to_interval(
            scale.from_schematic(extents.y_max),
            spec.elevation_interval,
            Rounding::Ceil,
        );
        let dist_max = round_to_interval(
            dist.from_meters(extents.x_max),
            spec.distance_interval,
            Rounding::Ceil,
        );
        tick_count("elevation", elev_min, elev_max, spec.elevation_interval)?;
        tick_count("distance", 0.0, dist_max, spec.distance_interval)?;
        let elevation_ticks: Vec<f64> = steps(elev_min, elev_max, spec.elevation_interval).collect();
        let distance_ticks: Vec<f64> = steps(0.0, dist_max, spec.distance_interval).collect();

        let to_y = |value: f64| scale.to_schematic(value);
        let (x_min, x_max) = (0.0, dist.to_meters(dist_max));
        let (y_min, y_max) = (to_y(elev_min), to_y(elev_max));

        let mut serial = 1;
        let mut next_id = || {
            serial += 1;
            format!("{section}FM{serial}")
        };

        let mut lines = vec![GridLine {
            id: format!("{section}FM_1"),
            kind: MarkKind::Frame,
            label: String::new(),
            line: LineString::from(vec![
                (x_min, y_max),
                (x_min, y_min),
                (x_max, y_min),
                (x_max, y_max),
                (x_min, y_max),
            ]),
        }];
        for value in &elevation_ticks {
            let y = to_y(*value);
            lines.push(GridLine {
                id: next_id(),
                kind: MarkKind::ElevationMark,
                label: tick_label(*value),
                line: LineString::from(vec![(x_min, y), (x_max, y)]),
            });
        }
        for value in &distance_ticks {
            let x = dist.to_meters(*value);
            lines.push(GridLine {
                id: next_id(),
                kind: MarkKind::DistanceMark,
                label: tick_label(*value),
                line: LineString::from(vec![(x, y_min), (x, y_max)]),
            });
        }

        let mut labels = Vec::with_capacity(elevation_ticks.len() + distance_ticks.len());
        for value in &elevation_ticks {
            labels.push(GridLabel {
                id: next_id(),
                kind: MarkKind::ElevationMark,
                label: tick_label(*value),
                position: Coord {
                    x: x_min,
                    y: to_y(*value),
                },
            });
        }
        for value in &distance_ticks {
            labels.push(GridLabel {
                id: next_id(),
                kind: MarkKind::DistanceMark,
                label: tick_label(*value),
                position: Coord {
                    x: dist.to_meters(*value),
                    y: y_min,
                },
            });
        }

        let units = format!("{dist}_{}", spec.elevation_unit);
        Ok(GridFrame {
            name: format!("{section}_{ve_label}x_Frame_{units}"),
            labels_name: format!("{section}_{ve_label}x_Labels_{units}"),
            spec: *spec,
            bounds: Rect::new(Coord { x: x_min, y: y_min }, Coord { x: x_max, y: y_max }),
            elevation_ticks,
            distance_ticks,
            lines,
            labels,
        })
    }
}

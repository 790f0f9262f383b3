//! Projection of boreholes onto a path and their schematic sticks.

use crate::{
    engine::GeometryEngine,
    units::{ElevUnits, VerticalScale},
    workspace::{LineScope, Scratch},
    Path, Surface, XsecError,
};
use chrono::NaiveDate;
use geo::{
    geometry::{Coord, LineString, Point},
    EuclideanDistance,
};
use log::{debug, warn};
use std::collections::{BTreeMap, HashSet};

/// A well as supplied by the data source.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoreholeRecord {
    pub well_id: String,
    pub location: Coord<f64>,
    /// Total depth, in project elevation units.
    pub depth: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub depth_to_bedrock: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub completion_date: Option<NaiveDate>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub static_water_level: Option<f64>,
    /// Flowing (artesian) well.
    #[cfg_attr(feature = "serde", serde(default))]
    pub flowing: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: BTreeMap<String, String>,
}

impl BoreholeRecord {
    pub fn new(well_id: impl Into<String>, location: Coord<f64>, depth: f64) -> Self {
        Self {
            well_id: well_id.into(),
            location,
            depth,
            depth_to_bedrock: None,
            completion_date: None,
            static_water_level: None,
            flowing: false,
            attributes: BTreeMap::new(),
        }
    }
}

/// A borehole placed on a path.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProjectedBorehole {
    pub record: BoreholeRecord,
    /// Distance along the path.
    pub m: f64,
    /// Signed offset from the path, positive on its left.
    pub perpendicular_distance: f64,
    /// Draped elevation in project units, 0 when draping failed.
    pub surface_elevation: f64,
    /// Cartesian angle of the path at `m`, degrees.
    pub loc_angle: f64,
    /// Geographic azimuth of the section plane at `m`, degrees.
    pub local_azimuth: f64,
}

/// Vertical schematic line for one borehole.
///
/// `top` and `bottom` are exaggerated meters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoreholeStick {
    pub stick_id: String,
    pub borehole: ProjectedBorehole,
    pub top: f64,
    pub bottom: f64,
    pub exaggeration: f64,
}

impl BoreholeStick {
    pub fn well_id(&self) -> &str {
        &self.borehole.record.well_id
    }

    /// Schematic X.
    pub fn m(&self) -> f64 {
        self.borehole.m
    }

    pub fn depth(&self) -> f64 {
        self.borehole.record.depth
    }

    pub fn dist_from_section(&self) -> f64 {
        self.borehole.perpendicular_distance
    }

    /// Top elevation, unexaggerated, in `units`.
    pub fn top_in(&self, units: ElevUnits) -> f64 {
        VerticalScale::new(units, self.exaggeration).from_schematic(self.top)
    }

    /// Bottom elevation, unexaggerated, in `units`.
    pub fn bottom_in(&self, units: ElevUnits) -> f64 {
        VerticalScale::new(units, self.exaggeration).from_schematic(self.bottom)
    }

    pub fn line(&self) -> LineString<f64> {
        LineString::from(vec![(self.m(), self.top), (self.m(), self.bottom)])
    }
}

/// Name of a section's borehole stick collection.
pub fn sticks_name(section: &str) -> String {
    format!("{section}_bhLines")
}

/// Stick id prefix: the uppercase letters of a collection name.
pub fn id_prefix(name: &str) -> String {
    name.chars().filter(char::is_ascii_uppercase).collect()
}

/// Geographic azimuth for a cartesian angle in degrees.
pub fn local_azimuth(loc_angle: f64) -> f64 {
    (-90.0 - loc_angle).rem_euclid(360.0)
}

pub struct BoreholeProjector<'a> {
    engine: &'a dyn GeometryEngine,
    scale: VerticalScale,
    /// Meters.
    selection_distance: f64,
}

impl<'a> BoreholeProjector<'a> {
    pub fn new(engine: &'a dyn GeometryEngine, scale: VerticalScale, selection_distance: f64) -> Self {
        Self {
            engine,
            scale,
            selection_distance,
        }
    }

    /// Places every borehole within the selection distance of `path`
    /// onto it.
    pub fn project(
        &self,
        scope: &LineScope<'_>,
        path: &Path,
        surface: &dyn Surface,
        records: &[BoreholeRecord],
    ) -> Result<Vec<ProjectedBorehole>, XsecError> {
        let now = std::time::Instant::now();
        let line = path.line();
        let selected: Vec<&BoreholeRecord> = records
            .iter()
            .filter(|record| {
                Point::from(record.location).euclidean_distance(&line) <= self.selection_distance
            })
            .collect();
        debug!(
            "{}: {} of {} boreholes within {} m",
            path.section,
            selected.len(),
            records.len(),
            self.selection_distance
        );

        let locations: Vec<Coord<f64>> = selected.iter().map(|record| record.location).collect();
        let elevations = self.engine.drape_points(surface, &locations);

        let mut events = self
            .engine
            .locate_points(path, &locations, self.selection_distance)?;
        events.retain(|event| event.route_id == path.route_id);
        if events.len() > selected.len() {
            let before = events.len();
            let mut seen = HashSet::new();
            events.retain(|event| seen.insert(event.source));
            debug!(
                "{}: removed {} duplicate borehole locations",
                path.section,
                before - events.len()
            );
        }
        scope.put("bhEvents", Scratch::Events(events.clone()));

        let projected: Vec<ProjectedBorehole> = events
            .into_iter()
            .map(|event| {
                let record = selected[event.source];
                let surface_elevation = elevations[event.source].unwrap_or_else(|| {
                    warn!(
                        "{}: no surface elevation for borehole {}, using 0",
                        path.section, record.well_id
                    );
                    0.0
                });
                ProjectedBorehole {
                    record: record.clone(),
                    m: event.m,
                    perpendicular_distance: event.offset,
                    surface_elevation,
                    loc_angle: event.angle,
                    local_azimuth: local_azimuth(event.angle),
                }
            })
            .collect();

        debug!(
            "{}: projected {} boreholes; duration: {:?}",
            path.section,
            projected.len(),
            now.elapsed()
        );
        Ok(projected)
    }

    /// Builds one stick per projected borehole, skipping rows that
    /// cannot be drawn.
    pub fn sticks(&self, path: &Path, projected: Vec<ProjectedBorehole>) -> Vec<BoreholeStick> {
        let prefix = id_prefix(&sticks_name(&path.section));
        let length = path.length();
        let mut sticks = Vec::with_capacity(projected.len());
        for (idx, borehole) in projected.into_iter().enumerate() {
            let stick_id = format!("{prefix}{}", idx + 1);
            let record = &borehole.record;
            let reason = if !record.depth.is_finite() || record.depth < 0.0 {
                Some(format!("invalid depth {}", record.depth))
            } else if !borehole.surface_elevation.is_finite() {
                Some(format!("invalid elevation {}", borehole.surface_elevation))
            } else if !(0.0..=length).contains(&borehole.m) {
                Some(format!("measure {} outside route", borehole.m))
            } else {
                None
            };
            if let Some(reason) = reason {
                warn!("{}: skipping borehole {}: {reason}", path.section, record.well_id);
                continue;
            }
            let top = self.scale.to_schematic(borehole.surface_elevation);
            let bottom = self
                .scale
                .to_schematic(borehole.surface_elevation - record.depth);
            sticks.push(BoreholeStick {
                stick_id,
                borehole,
                top,
                bottom,
                exaggeration: self.scale.exaggeration,
            });
        }
        sticks
    }
}

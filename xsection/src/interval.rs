//! Lithology and screen intervals positioned along borehole sticks.

use crate::{borehole::BoreholeStick, engine::GeometryEngine, XsecError};
use geo::geometry::{Coord, Line, LineString, Polygon};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A depth range of one well, e.g. a lithologic unit or a screen.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DepthInterval {
    pub well_id: String,
    pub depth_top: f64,
    pub depth_bottom: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: BTreeMap<String, String>,
}

impl DepthInterval {
    pub fn new(well_id: impl Into<String>, depth_top: f64, depth_bottom: f64) -> Self {
        Self {
            well_id: well_id.into(),
            depth_top,
            depth_bottom,
            attributes: BTreeMap::new(),
        }
    }
}

/// How interval sticks are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StickForm {
    #[default]
    Line,
    Polygon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    Lithology,
    Screens,
}

impl IntervalKind {
    /// Output collection name.
    pub fn collection_name(self, section: &str, ve: &str) -> String {
        match self {
            Self::Lithology => format!("{section}_LITH_{ve}x"),
            Self::Screens => format!("{section}_SCRNS_{ve}x"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StickGeometry {
    Line(LineString<f64>),
    Polygon(Polygon<f64>),
}

/// The schematic piece of a borehole stick covered by one interval.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalStick {
    pub interval: DepthInterval,
    /// Id of the parent borehole stick.
    pub stick_id: String,
    pub m: f64,
    /// Schematic Y of the clipped interval top.
    pub top: f64,
    /// Schematic Y of the clipped interval bottom.
    pub bottom: f64,
    pub distance_from_path: f64,
    pub percent_of_selection_distance: f64,
    pub geometry: StickGeometry,
}

/// A borehole stick addressed by depth, 0 at the top.
struct VerticalRoute<'s> {
    stick: &'s BoreholeStick,
}

impl<'s> VerticalRoute<'s> {
    fn depth(&self) -> f64 {
        self.stick.depth()
    }

    fn y_at(&self, depth: f64) -> f64 {
        let stick = self.stick;
        stick.top - depth / self.depth() * (stick.top - stick.bottom)
    }

    /// Clips `[from, to]` to the route, `None` if nothing is left.
    fn clip(&self, from: f64, to: f64) -> Option<(f64, f64)> {
        let (from, to) = (from.max(0.0), to.min(self.depth()));
        (to > from).then_some((from, to))
    }
}

pub struct IntervalSegmenter<'a> {
    engine: &'a dyn GeometryEngine,
    /// Meters.
    selection_distance: f64,
    form: StickForm,
    /// Schematic half-width of polygon sticks.
    stick_width: f64,
}

impl<'a> IntervalSegmenter<'a> {
    pub fn new(
        engine: &'a dyn GeometryEngine,
        selection_distance: f64,
        form: StickForm,
        stick_width: f64,
    ) -> Self {
        Self {
            engine,
            selection_distance,
            form,
            stick_width,
        }
    }

    /// Positions each interval along its borehole's stick.
    pub fn segment(
        &self,
        section: &str,
        kind: IntervalKind,
        sticks: &[BoreholeStick],
        intervals: &[DepthInterval],
    ) -> Result<Vec<IntervalStick>, XsecError> {
        let mut routes: HashMap<&str, VerticalRoute<'_>> = HashMap::new();
        for stick in sticks {
            if stick.depth().is_nan() || stick.depth() <= 0.0 {
                warn!(
                    "{section}: no depth route for well {}: depth {}",
                    stick.well_id(),
                    stick.depth()
                );
                continue;
            }
            if routes.contains_key(stick.well_id()) {
                warn!("{section}: duplicate stick for well {}, keeping the first", stick.well_id());
                continue;
            }
            routes.insert(stick.well_id(), VerticalRoute { stick });
        }

        let wells: HashSet<&str> = sticks.iter().map(BoreholeStick::well_id).collect();
        let candidates = intervals
            .iter()
            .enumerate()
            .filter(|(_, interval)| wells.contains(interval.well_id.as_str()));

        let mut out = Vec::new();
        for (idx, interval) in candidates {
            let Some(route) = routes.get(interval.well_id.as_str()) else {
                warn!(
                    "{section}: {kind:?} row {idx}: route not found for well {}",
                    interval.well_id
                );
                continue;
            };
            let (mut from, mut to) = (interval.depth_top, interval.depth_bottom);
            if !(from.is_finite() && to.is_finite()) {
                warn!(
                    "{section}: {kind:?} row {idx}: well {} has non-finite depths",
                    interval.well_id
                );
                continue;
            }
            if from > to {
                debug!(
                    "{section}: {kind:?} row {idx}: swapping top {from} and bottom {to}"
                );
                std::mem::swap(&mut from, &mut to);
            }
            let Some((from, to)) = route.clip(from, to) else {
                warn!(
                    "{section}: {kind:?} row {idx}: interval {from}-{to} of well {} is outside depth {}",
                    interval.well_id,
                    route.depth()
                );
                continue;
            };

            let stick = route.stick;
            let (top, bottom) = (route.y_at(from), route.y_at(to));
            let segment = Line::new(
                Coord { x: stick.m(), y: top },
                Coord { x: stick.m(), y: bottom },
            );
            let geometry = match self.form {
                StickForm::Line => StickGeometry::Line(LineString::from(segment)),
                StickForm::Polygon => {
                    StickGeometry::Polygon(self.engine.buffer_segment(segment, self.stick_width)?)
                }
            };
            let distance_from_path = stick.dist_from_section().abs();
            out.push(IntervalStick {
                interval: interval.clone(),
                stick_id: stick.stick_id.clone(),
                m: stick.m(),
                top,
                bottom,
                distance_from_path,
                percent_of_selection_distance: 100.0 * distance_from_path / self.selection_distance,
                geometry,
            });
        }
        debug!("{section}: {} {kind:?} sticks", out.len());
        Ok(out)
    }
}

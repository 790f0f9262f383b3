//! Elevation surfaces sampled along a path, in schematic space.

use crate::{
    confidence::{Confidence, ConfidenceZone},
    engine::GeometryEngine,
    error::Stage,
    path::drape_route,
    units::VerticalScale,
    workspace::{LineScope, Scratch},
    Path, Surface, XsecError,
};
use chrono::{Datelike, NaiveDate};
use geo::{geometry::LineString, EuclideanLength};
use log::{debug, warn};
use std::fmt;

/// Inclusive range of completion years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.start..=self.end).contains(&date.year())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SurfaceKind {
    Topography,
    Bedrock,
    /// Water table, optionally built from wells completed in a range
    /// of years.
    Groundwater(Option<YearRange>),
}

impl SurfaceKind {
    pub fn stage(self) -> Stage {
        match self {
            Self::Topography => Stage::Topography,
            Self::Bedrock => Stage::Bedrock,
            Self::Groundwater(_) => Stage::Groundwater,
        }
    }

    /// Output collection name, e.g. `A_GWL_1990_2000_5x`.
    pub fn output_name(self, section: &str, ve: &str) -> String {
        format!("{section}_{self}_{ve}x")
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topography => f.write_str("TOPO"),
            Self::Bedrock => f.write_str("BDRK"),
            Self::Groundwater(None) => f.write_str("GWL_AllYears"),
            Self::Groundwater(Some(YearRange { start, end })) => write!(f, "GWL_{start}_{end}"),
        }
    }
}

/// Part of a profile, tagged when the surface was classified.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfileSegment {
    pub confidence: Option<Confidence>,
    /// Span along the surface route, before the horizontal shift.
    pub from_m: f64,
    pub to_m: f64,
    /// Schematic (distance, exaggerated elevation) vertices.
    pub line: LineString<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceProfile {
    pub name: String,
    pub kind: SurfaceKind,
    /// Horizontal shift for the stretch of path the surface misses at
    /// its origin end.
    pub move_length: f64,
    pub segments: Vec<ProfileSegment>,
}

impl SurfaceProfile {
    fn extent(&self, axis: impl Fn(&geo::Coord<f64>) -> f64) -> Option<(f64, f64)> {
        self.segments
            .iter()
            .flat_map(|segment| segment.line.coords())
            .map(axis)
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn x_extent(&self) -> Option<(f64, f64)> {
        self.extent(|c| c.x)
    }

    pub fn y_extent(&self) -> Option<(f64, f64)> {
        self.extent(|c| c.y)
    }

    /// Schematic length summed over segments.
    pub fn length(&self) -> f64 {
        self.segments.iter().map(|s| s.line.euclidean_length()).sum()
    }
}

pub struct SurfaceProfiler<'a> {
    engine: &'a dyn GeometryEngine,
    scale: VerticalScale,
}

impl<'a> SurfaceProfiler<'a> {
    pub fn new(engine: &'a dyn GeometryEngine, scale: VerticalScale) -> Self {
        Self { engine, scale }
    }

    /// Samples `surface` along `path` and moves it into schematic
    /// space. With a `zone` the profile is split into classified
    /// segments; otherwise it is one untagged segment.
    pub fn profile(
        &self,
        scope: &LineScope<'_>,
        path: &Path,
        surface: &dyn Surface,
        kind: SurfaceKind,
        zone: Option<&ConfidenceZone>,
        ve_label: &str,
    ) -> Result<SurfaceProfile, XsecError> {
        let now = std::time::Instant::now();
        let route = drape_route(
            self.engine,
            &path.section,
            &path.route_id,
            path.direction,
            &path.line(),
            surface,
        )?;
        scope.put(&format!("{kind}_route"), Scratch::Route(route.clone()));
        let move_length = self.move_length(scope, path, surface, kind)?;

        let spans: Vec<(Option<Confidence>, f64, f64)> = match zone {
            None => vec![(None, 0.0, route.length())],
            Some(zone) => zone
                .spans(self.engine, &route)?
                .into_iter()
                .map(|span| (Some(span.confidence), span.from_m, span.to_m))
                .collect(),
        };
        let segments: Vec<ProfileSegment> = spans
            .into_iter()
            .filter_map(|(confidence, from_m, to_m)| {
                let line: LineString<f64> = route
                    .slice(from_m, to_m)
                    .into_iter()
                    .map(|v| (v.m + move_length, self.scale.to_schematic(v.z)))
                    .collect();
                (line.0.len() > 1).then_some(ProfileSegment {
                    confidence,
                    from_m,
                    to_m,
                    line,
                })
            })
            .collect();
        if segments.is_empty() {
            warn!("{}: {kind} profile has no segments", path.section);
        }

        debug!(
            "{}: {kind} profile; segments: {}, move_length: {move_length}, duration: {:?}",
            path.section,
            segments.len(),
            now.elapsed()
        );
        Ok(SurfaceProfile {
            name: kind.output_name(&path.section, ve_label),
            kind,
            move_length,
            segments,
        })
    }

    /// Length of path outside the surface's footprint at the path's
    /// origin end.
    pub fn move_length(
        &self,
        scope: &LineScope<'_>,
        path: &Path,
        surface: &dyn Surface,
        kind: SurfaceKind,
    ) -> Result<f64, XsecError> {
        let Some(origin) = path.origin() else {
            return Ok(0.0);
        };
        let erased = self.engine.erase(&path.line(), surface.footprint())?;
        let parts = self.engine.explode(erased);
        let tolerance = 1e-6 * path.length().max(1.0);
        let touches_origin = |part: &&LineString<f64>| {
            [part.0.first(), part.0.last()]
                .into_iter()
                .flatten()
                .any(|c| (c.x - origin.x).hypot(c.y - origin.y) <= tolerance)
        };
        let move_length = parts
            .iter()
            .filter(touches_origin)
            .map(|part| part.euclidean_length())
            .sum();
        scope.put(&format!("{kind}_erase"), Scratch::Lines(parts));
        Ok(move_length)
    }
}

#[cfg(test)]
mod tests {
    use super::{SurfaceKind, SurfaceProfiler, YearRange};
    use crate::{
        test_util::{masked, plane, west_east},
        units::{ElevUnits, VerticalScale},
        PlanarEngine, Workspace, XsecError,
    };
    use approx::assert_relative_eq;

    #[test]
    fn test_names() {
        assert_eq!(SurfaceKind::Topography.output_name("A", "1"), "A_TOPO_1x");
        assert_eq!(SurfaceKind::Bedrock.output_name("A", "10"), "A_BDRK_10x");
        assert_eq!(SurfaceKind::Groundwater(None).output_name("A", "5"), "A_GWL_AllYears_5x");
        let range = YearRange { start: 1990, end: 2000 };
        assert_eq!(
            SurfaceKind::Groundwater(Some(range)).output_name("A", "5"),
            "A_GWL_1990_2000_5x"
        );
    }

    #[test]
    fn test_full_coverage() {
        let surface = plane(0.0, -50.0, 1000.0, 100.0, 10.0);
        let path = west_east("A", 1000.0, 100.0);
        let workspace = Workspace::new();
        let scope = workspace.scope("A");
        let profiler = SurfaceProfiler::new(&PlanarEngine, VerticalScale::new(ElevUnits::Feet, 2.0));
        let profile = profiler
            .profile(&scope, &path, &surface, SurfaceKind::Topography, None, "2")
            .unwrap();
        assert_relative_eq!(profile.move_length, 0.0);
        assert_eq!(profile.segments.len(), 1);
        assert_eq!(profile.segments[0].confidence, None);
        let (x0, x1) = profile.x_extent().unwrap();
        assert_relative_eq!(x0, 0.0);
        assert_relative_eq!(x1, 1000.0, epsilon = 1e-6);
        let (y0, y1) = profile.y_extent().unwrap();
        assert_relative_eq!(y0, 100.0 * 0.3048 * 2.0, epsilon = 1e-9);
        assert_relative_eq!(y1, 100.0 * 0.3048 * 2.0, epsilon = 1e-9);
        assert_eq!(profile.name, "A_TOPO_2x");
    }

    #[test]
    fn test_partial_coverage_shifts_profile() {
        // Data only for x in [200, 700).
        let surface = masked(0.0, -50.0, 1000.0, 100.0, 10.0, |x| (200.0..700.0).contains(&x));
        let path = west_east("A", 1000.0, 0.0);
        let workspace = Workspace::new();
        let scope = workspace.scope("A");
        let profiler = SurfaceProfiler::new(&PlanarEngine, VerticalScale::new(ElevUnits::Meters, 1.0));
        let profile = profiler
            .profile(&scope, &path, &surface, SurfaceKind::Bedrock, None, "1")
            .unwrap();
        assert_relative_eq!(profile.move_length, 200.0, epsilon = 1e-6);
        let (x0, x1) = profile.x_extent().unwrap();
        assert_relative_eq!(x0, 200.0, epsilon = 1e-6);
        assert_relative_eq!(x1, 700.0, epsilon = 1e-6);
        assert!(workspace.contains("A/BDRK_erase"));
        assert!(workspace.contains("A/BDRK_route"));
    }

    #[test]
    fn test_no_coverage_fails() {
        let surface = plane(5000.0, 5000.0, 100.0, 100.0, 10.0);
        let path = west_east("A", 1000.0, 0.0);
        let workspace = Workspace::new();
        let scope = workspace.scope("A");
        let profiler = SurfaceProfiler::new(&PlanarEngine, VerticalScale::new(ElevUnits::Meters, 1.0));
        let err = profiler
            .profile(&scope, &path, &surface, SurfaceKind::Bedrock, None, "1")
            .unwrap_err();
        assert!(matches!(err, XsecError::Geometry(_)));
    }
}

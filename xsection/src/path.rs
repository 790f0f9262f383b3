//! Traverse lines and the measured paths built from them.

use crate::{
    engine::GeometryEngine,
    error::UnknownDirection,
    workspace::{LineScope, Scratch},
    GeometryError, Surface, XsecError,
};
use geo::geometry::{Coord, LineString, Rect};
use log::debug;
use std::{fmt, str::FromStr};

/// Compass direction a traverse line is read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    #[cfg_attr(feature = "serde", serde(rename = "W-E"))]
    WestEast,
    #[cfg_attr(feature = "serde", serde(rename = "E-W"))]
    EastWest,
    #[cfg_attr(feature = "serde", serde(rename = "N-S"))]
    NorthSouth,
    #[cfg_attr(feature = "serde", serde(rename = "S-N"))]
    SouthNorth,
    #[cfg_attr(feature = "serde", serde(rename = "NW-SE"))]
    NorthwestSoutheast,
    #[cfg_attr(feature = "serde", serde(rename = "SE-NW"))]
    SoutheastNorthwest,
    #[cfg_attr(feature = "serde", serde(rename = "NE-SW"))]
    NortheastSouthwest,
    #[cfg_attr(feature = "serde", serde(rename = "SW-NE"))]
    SouthwestNortheast,
}

impl Direction {
    pub const ALL: [Self; 8] = [
        Self::WestEast,
        Self::EastWest,
        Self::NorthSouth,
        Self::SouthNorth,
        Self::NorthwestSoutheast,
        Self::SoutheastNorthwest,
        Self::NortheastSouthwest,
        Self::SouthwestNortheast,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::WestEast => "W-E",
            Self::EastWest => "E-W",
            Self::NorthSouth => "N-S",
            Self::SouthNorth => "S-N",
            Self::NorthwestSoutheast => "NW-SE",
            Self::SoutheastNorthwest => "SE-NW",
            Self::NortheastSouthwest => "NE-SW",
            Self::SouthwestNortheast => "SW-NE",
        }
    }

    pub fn quadrant(self) -> Quadrant {
        match self {
            Self::WestEast | Self::NorthwestSoutheast | Self::EastWest => Quadrant::Northwest,
            Self::SouthwestNortheast | Self::SouthNorth | Self::NorthSouth => Quadrant::Southwest,
            Self::NortheastSouthwest => Quadrant::Northeast,
            Self::SoutheastNorthwest => Quadrant::Southeast,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|direction| direction.code() == code)
            .ok_or_else(|| UnknownDirection(s.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Quadrant {
    Northwest,
    Southwest,
    Northeast,
    Southeast,
}

impl Quadrant {
    /// Bounding box corner a route in this quadrant starts from.
    pub fn origin_corner(self) -> Corner {
        match self {
            Self::Northwest => Corner::UpperLeft,
            Self::Southwest => Corner::LowerLeft,
            Self::Northeast => Corner::UpperRight,
            Self::Southeast => Corner::LowerRight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    UpperLeft,
    LowerLeft,
    UpperRight,
    LowerRight,
}

impl Corner {
    pub fn of(self, rect: Rect<f64>) -> Coord<f64> {
        let (min, max) = (rect.min(), rect.max());
        match self {
            Self::UpperLeft => Coord { x: min.x, y: max.y },
            Self::LowerLeft => min,
            Self::UpperRight => max,
            Self::LowerRight => Coord { x: max.x, y: min.y },
        }
    }
}

/// A route vertex: planar position, elevation and measure.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathVertex {
    pub x: f64,
    pub y: f64,
    /// Elevation in project units.
    pub z: f64,
    /// Distance from the route origin.
    pub m: f64,
}

impl PathVertex {
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

/// Geometry of a traverse line as authored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LineShape {
    /// Plain 2D vertices.
    Planar(LineString<f64>),
    /// Vertices that already carry elevation and measure.
    Routed(Vec<PathVertex>),
}

/// A user-drawn line defining the plane of one cross-section.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraverseLine {
    pub section: String,
    /// Raw compass code, e.g. `W-E`.
    pub direction: String,
    pub shape: LineShape,
}

impl TraverseLine {
    pub fn new(section: impl Into<String>, direction: impl Into<String>, line: LineString<f64>) -> Self {
        Self {
            section: section.into(),
            direction: direction.into(),
            shape: LineShape::Planar(line),
        }
    }

    pub fn direction(&self) -> Result<Direction, XsecError> {
        self.direction
            .parse()
            .map_err(|source| XsecError::Direction {
                line: self.section.clone(),
                source,
            })
    }
}

impl From<Path> for TraverseLine {
    fn from(path: Path) -> Self {
        Self {
            section: path.section,
            direction: path.direction.code().to_owned(),
            shape: LineShape::Routed(path.vertices),
        }
    }
}

/// A traverse line with elevation and a measure from its origin end.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    pub section: String,
    /// Identifier of this run's route, only meaningful while the run
    /// is in progress.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub route_id: String,
    pub direction: Direction,
    pub vertices: Vec<PathVertex>,
}

impl Path {
    pub fn quadrant(&self) -> Quadrant {
        self.direction.quadrant()
    }

    /// Total measure, i.e. the route length.
    pub fn length(&self) -> f64 {
        self.vertices.last().map_or(0.0, |v| v.m)
    }

    pub fn origin(&self) -> Option<Coord<f64>> {
        self.vertices.first().map(PathVertex::coord)
    }

    /// Planar geometry, in measure order.
    pub fn line(&self) -> LineString<f64> {
        self.vertices.iter().map(PathVertex::coord).collect()
    }

    pub fn measures(&self) -> Vec<f64> {
        self.vertices.iter().map(|v| v.m).collect()
    }

    /// The interpolated vertex at measure `m`, clamped to the route.
    pub fn at(&self, m: f64) -> Option<PathVertex> {
        let first = self.vertices.first()?;
        let last = self.vertices.last()?;
        let m = m.clamp(first.m, last.m);
        let idx = self.vertices.partition_point(|v| v.m < m);
        if idx == 0 {
            return Some(*first);
        }
        let (a, b) = (self.vertices[idx - 1], self.vertices[idx]);
        let span = b.m - a.m;
        let t = if span > 0.0 { (m - a.m) / span } else { 0.0 };
        Some(PathVertex {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
            z: a.z + (b.z - a.z) * t,
            m,
        })
    }

    /// The portion of the route between two measures.
    pub fn slice(&self, from_m: f64, to_m: f64) -> Vec<PathVertex> {
        let (from_m, to_m) = if from_m <= to_m {
            (from_m, to_m)
        } else {
            (to_m, from_m)
        };
        let (Some(start), Some(end)) = (self.at(from_m), self.at(to_m)) else {
            return Vec::new();
        };
        let mut vertices = vec![start];
        vertices.extend(
            self.vertices
                .iter()
                .filter(|v| v.m > start.m && v.m < end.m)
                .copied(),
        );
        vertices.push(end);
        vertices
    }

    /// Checks that measures start at zero and never decrease.
    pub fn check(&self) -> Result<(), GeometryError> {
        if self.vertices.len() < 2 {
            return Err(GeometryError::DegenerateRoute(self.vertices.len()));
        }
        if self.vertices[0].m != 0.0 {
            return Err(GeometryError::NonMonotonicRoute(0));
        }
        match self
            .vertices
            .windows(2)
            .position(|pair| pair[1].m.is_nan() || pair[1].m < pair[0].m)
        {
            Some(idx) => Err(GeometryError::NonMonotonicRoute(idx + 1)),
            None => Ok(()),
        }
    }
}

/// Builds the measured path for one traverse line.
///
/// A line that already carries elevation and measures is returned as
/// is; a planar line is draped on `surface` and measured from the
/// corner its direction calls for.
pub fn build_path(
    engine: &dyn GeometryEngine,
    scope: &LineScope<'_>,
    line: &TraverseLine,
    surface: &dyn Surface,
) -> Result<Path, XsecError> {
    let direction = line.direction()?;
    let path = match &line.shape {
        LineShape::Routed(vertices) => {
            debug!("{}: reusing measured route", line.section);
            let path = Path {
                section: line.section.clone(),
                route_id: scope.route_id().to_owned(),
                direction,
                vertices: vertices.clone(),
            };
            path.check()?;
            path
        }
        LineShape::Planar(planar) => drape_route(
            engine,
            &line.section,
            scope.route_id(),
            direction,
            planar,
            surface,
        )?,
    };
    scope.put("zm_line", Scratch::Route(path.clone()));
    Ok(path)
}

/// Drapes `line` on `surface` and measures it from the corner of
/// `direction`'s quadrant.
pub(crate) fn drape_route(
    engine: &dyn GeometryEngine,
    section: &str,
    route_id: &str,
    direction: Direction,
    line: &LineString<f64>,
    surface: &dyn Surface,
) -> Result<Path, GeometryError> {
    let now = std::time::Instant::now();
    let draped = engine.drape_line(surface, line)?;
    let vertices = engine.create_route(&draped, direction.quadrant().origin_corner())?;
    let path = Path {
        section: section.to_owned(),
        route_id: route_id.to_owned(),
        direction,
        vertices,
    };
    debug!(
        "{section}: route on {}; len: {}, vertices: {}, duration: {:?}",
        surface.name(),
        path.length(),
        path.vertices.len(),
        now.elapsed()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{build_path, Corner, Direction, LineShape, Path, Quadrant, TraverseLine};
    use crate::{test_util::plane, PlanarEngine, Workspace, XsecError};
    use approx::assert_relative_eq;
    use geo::{coord, line_string, Rect};

    #[test]
    fn test_quadrant_table() {
        use Direction::*;
        use Quadrant::*;
        let table = [
            ("W-E", WestEast, Northwest),
            ("NW-SE", NorthwestSoutheast, Northwest),
            ("E-W", EastWest, Northwest),
            ("SW-NE", SouthwestNortheast, Southwest),
            ("S-N", SouthNorth, Southwest),
            ("N-S", NorthSouth, Southwest),
            ("NE-SW", NortheastSouthwest, Northeast),
            ("SE-NW", SoutheastNorthwest, Southeast),
        ];
        for (code, direction, quadrant) in table {
            let parsed: Direction = code.parse().unwrap();
            assert_eq!(parsed, direction);
            assert_eq!(parsed.code(), code);
            assert_eq!(parsed.quadrant(), quadrant);
        }
        assert_eq!(" w-e ".parse::<Direction>().unwrap(), WestEast);
        assert!("W-W".parse::<Direction>().is_err());
        assert!("".parse::<Direction>().is_err());
    }

    #[test]
    fn test_corners() {
        let rect = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 5.0 });
        assert_eq!(Quadrant::Northwest.origin_corner(), Corner::UpperLeft);
        assert_eq!(Quadrant::Southwest.origin_corner(), Corner::LowerLeft);
        assert_eq!(Quadrant::Northeast.origin_corner(), Corner::UpperRight);
        assert_eq!(Quadrant::Southeast.origin_corner(), Corner::LowerRight);
        assert_eq!(Corner::UpperLeft.of(rect), coord! { x: 0.0, y: 5.0 });
        assert_eq!(Corner::LowerLeft.of(rect), coord! { x: 0.0, y: 0.0 });
        assert_eq!(Corner::UpperRight.of(rect), coord! { x: 10.0, y: 5.0 });
        assert_eq!(Corner::LowerRight.of(rect), coord! { x: 10.0, y: 0.0 });
    }

    #[test]
    fn test_west_east_line_drawn_backwards() {
        let surface = plane(0.0, 0.0, 1000.0, 100.0, 10.0);
        let workspace = Workspace::new();
        let scope = workspace.scope("A");
        let line = TraverseLine::new(
            "A",
            "W-E",
            line_string![(x: 900.0, y: 50.0), (x: 100.0, y: 50.0)],
        );
        let path = build_path(&PlanarEngine, &scope, &line, &surface).unwrap();
        path.check().unwrap();
        assert_relative_eq!(path.origin().unwrap().x, 100.0);
        assert_relative_eq!(path.length(), 800.0, epsilon = 1e-6);
        assert!(path.vertices.windows(2).all(|w| w[1].m >= w[0].m));
        assert!(path.vertices.iter().all(|v| v.m >= 0.0 && v.m <= path.length()));
        assert!(workspace.contains("A/zm_line"));
    }

    #[test]
    fn test_south_north_origin() {
        let surface = plane(0.0, 0.0, 100.0, 1000.0, 10.0);
        let workspace = Workspace::new();
        let scope = workspace.scope("B");
        let line = TraverseLine::new(
            "B",
            "S-N",
            line_string![(x: 50.0, y: 900.0), (x: 50.0, y: 100.0)],
        );
        let path = build_path(&PlanarEngine, &scope, &line, &surface).unwrap();
        assert_relative_eq!(path.origin().unwrap().y, 100.0);
    }

    #[test]
    fn test_unknown_direction() {
        let surface = plane(0.0, 0.0, 100.0, 100.0, 10.0);
        let workspace = Workspace::new();
        let scope = workspace.scope("C");
        let line = TraverseLine::new("C", "UP", line_string![(x: 5.0, y: 5.0), (x: 95.0, y: 5.0)]);
        let err = build_path(&PlanarEngine, &scope, &line, &surface).unwrap_err();
        assert!(matches!(err, XsecError::Direction { ref line, .. } if line == "C"));
    }

    #[test]
    fn test_routed_line_is_reused() {
        let surface = plane(0.0, 0.0, 1000.0, 100.0, 10.0);
        let workspace = Workspace::new();
        let scope = workspace.scope("A");
        let line = TraverseLine::new("A", "E-W", line_string![(x: 10.0, y: 50.0), (x: 990.0, y: 50.0)]);
        let first = build_path(&PlanarEngine, &scope, &line, &surface).unwrap();
        let again = build_path(&PlanarEngine, &scope, &TraverseLine::from(first.clone()), &surface).unwrap();
        assert_eq!(first, again);
        assert!(matches!(TraverseLine::from(again).shape, LineShape::Routed(_)));
    }

    #[test]
    fn test_slice_and_interpolation() {
        let path = Path {
            section: "A".into(),
            route_id: "A_01".into(),
            direction: Direction::WestEast,
            vertices: vec![
                super::PathVertex { x: 0.0, y: 0.0, z: 10.0, m: 0.0 },
                super::PathVertex { x: 100.0, y: 0.0, z: 20.0, m: 100.0 },
                super::PathVertex { x: 200.0, y: 0.0, z: 0.0, m: 200.0 },
            ],
        };
        let mid = path.at(150.0).unwrap();
        assert_relative_eq!(mid.x, 150.0);
        assert_relative_eq!(mid.z, 10.0);
        let slice = path.slice(50.0, 175.0);
        assert_eq!(slice.len(), 3);
        assert_relative_eq!(slice[0].m, 50.0);
        assert_relative_eq!(slice[1].m, 100.0);
        assert_relative_eq!(slice[2].m, 175.0);
        assert_relative_eq!(path.at(-5.0).unwrap().m, 0.0);
    }
}

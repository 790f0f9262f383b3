//! Geometry primitives the pipeline is written against.
//!
//! The pipeline only orchestrates; every spatial operation (draping,
//! linear referencing, buffering, overlay) goes through a
//! [`GeometryEngine`]. [`PlanarEngine`] implements them in planar
//! coordinates on top of `geo`.

mod planar;

pub use planar::{PlanarEngine, CIRCLE_SEGMENTS};

use crate::{path::Corner, GeometryError, Path, PathVertex, Surface};
use geo::geometry::{Coord, Line, LineString, MultiLineString, MultiPolygon, Polygon};

/// A planar coordinate with an elevation sampled from a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrapedCoord {
    pub coord: Coord<f64>,
    pub z: f64,
}

/// One point located along a route.
#[derive(Debug, Clone, PartialEq)]
pub struct PointEvent {
    /// Index of the located point in the input slice.
    pub source: usize,
    /// Identifier of the route the point was located on.
    pub route_id: String,
    /// Distance along the route.
    pub m: f64,
    /// Perpendicular offset, positive left of the route direction.
    pub offset: f64,
    /// Cartesian angle of the route at `m`, in degrees.
    pub angle: f64,
}

/// A piece of a two-input union.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionPiece {
    pub geometry: MultiPolygon<f64>,
    pub in_first: bool,
    pub in_second: bool,
}

pub trait GeometryEngine {
    /// Checks that the engine can run at all.
    fn ensure_available(&self) -> Result<(), GeometryError> {
        Ok(())
    }

    /// Samples `surface` along `line`, densified at the surface's
    /// sample spacing. Stretches without data are dropped and interior
    /// gaps bridged.
    fn drape_line(
        &self,
        surface: &dyn Surface,
        line: &LineString<f64>,
    ) -> Result<Vec<DrapedCoord>, GeometryError>;

    /// Samples `surface` at each point.
    fn drape_points(&self, surface: &dyn Surface, points: &[Coord<f64>]) -> Vec<Option<f64>>;

    /// Builds a measured route over `vertices`, starting at the end
    /// nearest `corner` of their bounding box.
    fn create_route(
        &self,
        vertices: &[DrapedCoord],
        corner: Corner,
    ) -> Result<Vec<PathVertex>, GeometryError>;

    /// Locates points within `search_radius` of `route`.
    ///
    /// A point equidistant from several route segments yields one
    /// event per segment.
    fn locate_points(
        &self,
        route: &Path,
        points: &[Coord<f64>],
        search_radius: f64,
    ) -> Result<Vec<PointEvent>, GeometryError>;

    /// Returns the `[from_m, to_m]` spans of `route` lying strictly
    /// inside `area`, ascending.
    fn locate_polygons(
        &self,
        route: &Path,
        area: &MultiPolygon<f64>,
    ) -> Result<Vec<(f64, f64)>, GeometryError>;

    /// Dissolved round buffer around `points`.
    fn buffer_points(
        &self,
        points: &[Coord<f64>],
        distance: f64,
    ) -> Result<MultiPolygon<f64>, GeometryError>;

    /// Flat-capped buffer of one segment.
    fn buffer_segment(&self, segment: Line<f64>, half_width: f64)
        -> Result<Polygon<f64>, GeometryError>;

    /// Overlays two areas, tagging each piece with the inputs it came
    /// from.
    fn union_with_membership(
        &self,
        first: &MultiPolygon<f64>,
        second: &MultiPolygon<f64>,
    ) -> Result<Vec<UnionPiece>, GeometryError>;

    /// Returns the parts of `line` not strictly inside `eraser`.
    fn erase(
        &self,
        line: &LineString<f64>,
        eraser: &MultiPolygon<f64>,
    ) -> Result<MultiLineString<f64>, GeometryError>;

    /// Splits a multipart line into single parts.
    fn explode(&self, lines: MultiLineString<f64>) -> Vec<LineString<f64>> {
        lines.0.into_iter().filter(|part| part.0.len() > 1).collect()
    }
}

use super::{DrapedCoord, GeometryEngine, PointEvent, UnionPiece};
use crate::{path::Corner, GeometryError, Path, PathVertex, Surface};
use geo::{
    geometry::{Coord, Line, LineString, MultiLineString, MultiPolygon, Point, Polygon, Rect},
    BooleanOps, Contains,
};
use itertools::Itertools;
use std::f64::consts::TAU;

/// Vertices used to approximate a buffer circle.
pub const CIRCLE_SEGMENTS: usize = 64;

/// Parametric tolerance for intersections and duplicate cuts.
const EPS: f64 = 1e-9;

/// Bisection steps used to find where a line leaves a surface.
const EDGE_STEPS: usize = 32;

/// Geometry engine for projected, planar coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarEngine;

impl GeometryEngine for PlanarEngine {
    fn drape_line(
        &self,
        surface: &dyn Surface,
        line: &LineString<f64>,
    ) -> Result<Vec<DrapedCoord>, GeometryError> {
        let mut draped: Vec<DrapedCoord> = Vec::new();
        let mut push = |vertex: DrapedCoord| {
            if draped.last().map_or(true, |last| last.coord != vertex.coord) {
                draped.push(vertex);
            }
        };

        let mut prev: Option<(Coord<f64>, bool)> = None;
        for coord in densify(line, surface.sample_spacing()) {
            let z = surface.elevation(coord);
            match (prev, z) {
                (Some((outside, false)), Some(_)) => {
                    if let Some(edge) = find_edge(surface, coord, outside) {
                        push(edge);
                    }
                }
                (Some((inside, true)), None) => {
                    if let Some(edge) = find_edge(surface, inside, coord) {
                        push(edge);
                    }
                }
                _ => (),
            }
            if let Some(z) = z {
                push(DrapedCoord { coord, z });
            }
            prev = Some((coord, z.is_some()));
        }

        if draped.len() < 2 {
            return Err(GeometryError::NoCoverage);
        }
        Ok(draped)
    }

    fn drape_points(&self, surface: &dyn Surface, points: &[Coord<f64>]) -> Vec<Option<f64>> {
        points.iter().map(|coord| surface.elevation(*coord)).collect()
    }

    fn create_route(
        &self,
        vertices: &[DrapedCoord],
        corner: Corner,
    ) -> Result<Vec<PathVertex>, GeometryError> {
        let mut vertices: Vec<DrapedCoord> = vertices.to_vec();
        vertices.dedup_by(|a, b| a.coord == b.coord);
        let (Some(first), Some(last)) = (vertices.first(), vertices.last()) else {
            return Err(GeometryError::DegenerateRoute(0));
        };
        if vertices.len() < 2 {
            return Err(GeometryError::DegenerateRoute(vertices.len()));
        }

        let bounds = vertices
            .iter()
            .skip(1)
            .fold(Rect::new(first.coord, first.coord), |rect, v| {
                Rect::new(
                    Coord {
                        x: rect.min().x.min(v.coord.x),
                        y: rect.min().y.min(v.coord.y),
                    },
                    Coord {
                        x: rect.max().x.max(v.coord.x),
                        y: rect.max().y.max(v.coord.y),
                    },
                )
            });
        let origin = corner.of(bounds);
        if distance(last.coord, origin) < distance(first.coord, origin) {
            vertices.reverse();
        }

        let mut m = 0.0;
        let mut route = Vec::with_capacity(vertices.len());
        for (idx, v) in vertices.iter().enumerate() {
            if idx > 0 {
                m += distance(vertices[idx - 1].coord, v.coord);
            }
            route.push(PathVertex {
                x: v.coord.x,
                y: v.coord.y,
                z: v.z,
                m,
            });
        }
        if m <= 0.0 {
            return Err(GeometryError::DegenerateRoute(1));
        }
        Ok(route)
    }

    fn locate_points(
        &self,
        route: &Path,
        points: &[Coord<f64>],
        search_radius: f64,
    ) -> Result<Vec<PointEvent>, GeometryError> {
        if route.vertices.len() < 2 {
            return Err(GeometryError::DegenerateRoute(route.vertices.len()));
        }
        let mut events = Vec::new();
        for (source, point) in points.iter().enumerate() {
            let candidates: Vec<(f64, PointEvent)> = route
                .vertices
                .iter()
                .tuple_windows()
                .map(|(a, b)| {
                    let (t, closest) = project(*point, a.coord(), b.coord());
                    let dist = distance(*point, closest);
                    let side = cross(sub(b.coord(), a.coord()), sub(*point, a.coord()));
                    let event = PointEvent {
                        source,
                        route_id: route.route_id.clone(),
                        m: a.m + t * (b.m - a.m),
                        offset: if side < 0.0 { -dist } else { dist },
                        angle: (b.y - a.y).atan2(b.x - a.x).to_degrees(),
                    };
                    (dist, event)
                })
                .collect();
            let nearest = candidates
                .iter()
                .map(|(dist, _)| *dist)
                .fold(f64::INFINITY, f64::min);
            if nearest > search_radius {
                continue;
            }
            let tolerance = EPS * nearest.max(1.0);
            events.extend(
                candidates
                    .into_iter()
                    .filter(|(dist, _)| *dist <= nearest + tolerance)
                    .map(|(_, event)| event),
            );
        }
        Ok(events)
    }

    fn locate_polygons(
        &self,
        route: &Path,
        area: &MultiPolygon<f64>,
    ) -> Result<Vec<(f64, f64)>, GeometryError> {
        if route.vertices.len() < 2 {
            return Err(GeometryError::DegenerateRoute(route.vertices.len()));
        }
        let coords: Vec<Coord<f64>> = route.vertices.iter().map(PathVertex::coord).collect();
        Ok(inside_spans(&coords, &route.measures(), area))
    }

    fn buffer_points(
        &self,
        points: &[Coord<f64>],
        distance: f64,
    ) -> Result<MultiPolygon<f64>, GeometryError> {
        if distance.is_nan() || distance <= 0.0 {
            return Ok(MultiPolygon::new(vec![]));
        }
        // Neighbouring discs end up in the same early merges.
        let mut centers = points.to_vec();
        centers.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        let discs = centers
            .into_iter()
            .map(|center| MultiPolygon::new(vec![circle(center, distance)]))
            .collect();
        Ok(dissolve(discs))
    }

    fn buffer_segment(
        &self,
        segment: Line<f64>,
        half_width: f64,
    ) -> Result<Polygon<f64>, GeometryError> {
        let delta = segment.delta();
        let len = delta.x.hypot(delta.y);
        if len <= 0.0 {
            return Err(GeometryError::DegenerateRoute(1));
        }
        let normal = Coord {
            x: -delta.y / len * half_width,
            y: delta.x / len * half_width,
        };
        let (a, b) = (segment.start, segment.end);
        Ok(Polygon::new(
            LineString::from(vec![
                add(a, normal),
                sub(a, normal),
                sub(b, normal),
                add(b, normal),
                add(a, normal),
            ]),
            vec![],
        ))
    }

    fn union_with_membership(
        &self,
        first: &MultiPolygon<f64>,
        second: &MultiPolygon<f64>,
    ) -> Result<Vec<UnionPiece>, GeometryError> {
        let (both, first_only, second_only) = match (first.0.is_empty(), second.0.is_empty()) {
            (true, true) => return Ok(Vec::new()),
            (false, true) => (MultiPolygon::new(vec![]), first.clone(), MultiPolygon::new(vec![])),
            (true, false) => (MultiPolygon::new(vec![]), MultiPolygon::new(vec![]), second.clone()),
            (false, false) => (
                first.intersection(second),
                first.difference(second),
                second.difference(first),
            ),
        };
        Ok([(both, true, true), (first_only, true, false), (second_only, false, true)]
            .into_iter()
            .filter(|(geometry, _, _)| !geometry.0.is_empty())
            .map(|(geometry, in_first, in_second)| UnionPiece {
                geometry,
                in_first,
                in_second,
            })
            .collect())
    }

    fn erase(
        &self,
        line: &LineString<f64>,
        eraser: &MultiPolygon<f64>,
    ) -> Result<MultiLineString<f64>, GeometryError> {
        let coords = &line.0;
        if coords.len() < 2 {
            return Err(GeometryError::DegenerateRoute(coords.len()));
        }
        let measures = cumulative_lengths(coords);
        let total = measures.last().copied().unwrap_or_default();

        let mut parts = Vec::new();
        let mut cursor = 0.0;
        for (from, to) in inside_spans(coords, &measures, eraser)
            .into_iter()
            .chain(std::iter::once((total, total)))
        {
            if from - cursor > EPS {
                parts.push(LineString::from(slice(coords, &measures, cursor, from)));
            }
            cursor = to;
        }
        Ok(MultiLineString::new(parts))
    }
}

fn sub(a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    Coord {
        x: a.x - b.x,
        y: a.y - b.y,
    }
}

fn add(a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    Coord {
        x: a.x + b.x,
        y: a.y + b.y,
    }
}

fn cross(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

fn dot(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.x + a.y * b.y
}

fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

fn lerp(a: Coord<f64>, b: Coord<f64>, t: f64) -> Coord<f64> {
    Coord {
        x: a.x + (b.x - a.x) * t,
        y: a.y + (b.y - a.y) * t,
    }
}

/// Closest point to `p` on segment `ab`, with its parameter.
fn project(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> (f64, Coord<f64>) {
    let ab = sub(b, a);
    let len2 = dot(ab, ab);
    if len2 == 0.0 {
        return (0.0, a);
    }
    let t = (dot(sub(p, a), ab) / len2).clamp(0.0, 1.0);
    (t, lerp(a, b, t))
}

/// Inserts points along `line` so no gap exceeds `spacing`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn densify(line: &LineString<f64>, spacing: f64) -> Vec<Coord<f64>> {
    let mut coords = Vec::new();
    for segment in line.lines() {
        let len = distance(segment.start, segment.end);
        let n = if spacing > 0.0 {
            (len / spacing).ceil().max(1.0) as usize
        } else {
            1
        };
        coords.extend((0..n).map(|k| lerp(segment.start, segment.end, k as f64 / n as f64)));
    }
    coords.extend(line.0.last().copied());
    coords
}

/// Bisects between a covered and an uncovered coordinate for the last
/// covered position.
fn find_edge(
    surface: &dyn Surface,
    mut inside: Coord<f64>,
    mut outside: Coord<f64>,
) -> Option<DrapedCoord> {
    for _ in 0..EDGE_STEPS {
        let mid = lerp(inside, outside, 0.5);
        if surface.elevation(mid).is_some() {
            inside = mid;
        } else {
            outside = mid;
        }
    }
    surface
        .elevation(inside)
        .map(|z| DrapedCoord { coord: inside, z })
}

fn cumulative_lengths(coords: &[Coord<f64>]) -> Vec<f64> {
    let mut total = 0.0;
    std::iter::once(0.0)
        .chain(coords.windows(2).map(|pair| {
            total += distance(pair[0], pair[1]);
            total
        }))
        .collect()
}

fn point_at(coords: &[Coord<f64>], measures: &[f64], m: f64) -> Coord<f64> {
    let idx = measures.partition_point(|&x| x < m);
    if idx == 0 {
        return coords[0];
    }
    if idx >= coords.len() {
        return coords[coords.len() - 1];
    }
    let span = measures[idx] - measures[idx - 1];
    let t = if span > 0.0 {
        (m - measures[idx - 1]) / span
    } else {
        0.0
    };
    lerp(coords[idx - 1], coords[idx], t)
}

fn slice(coords: &[Coord<f64>], measures: &[f64], from: f64, to: f64) -> Vec<Coord<f64>> {
    let mut part = vec![point_at(coords, measures, from)];
    part.extend(
        coords
            .iter()
            .zip(measures)
            .filter(|(_, &m)| m > from && m < to)
            .map(|(c, _)| *c),
    );
    part.push(point_at(coords, measures, to));
    part
}

/// Parameters along `segment` where it meets `edge`. A collinear
/// overlap contributes both of its ends.
fn crossings(segment: Line<f64>, edge: Line<f64>) -> Vec<f64> {
    let r = segment.delta();
    let s = edge.delta();
    let rr = dot(r, r);
    if rr == 0.0 {
        return Vec::new();
    }
    let qp = sub(edge.start, segment.start);
    let denom = cross(r, s);
    let scale = rr.sqrt() * dot(s, s).sqrt();
    if denom.abs() <= EPS * scale {
        // Parallel; only collinear edges matter.
        if cross(qp, r).abs() > EPS * rr {
            return Vec::new();
        }
        return [dot(qp, r) / rr, dot(add(qp, s), r) / rr]
            .into_iter()
            .filter(|t| (-EPS..=1.0 + EPS).contains(t))
            .map(|t| t.clamp(0.0, 1.0))
            .collect();
    }
    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    if (-EPS..=1.0 + EPS).contains(&t) && (-EPS..=1.0 + EPS).contains(&u) {
        vec![t.clamp(0.0, 1.0)]
    } else {
        Vec::new()
    }
}

/// Measure spans of the polyline strictly inside `area`.
///
/// The line is cut wherever it meets a ring edge; each piece is
/// classified by its midpoint.
fn inside_spans(coords: &[Coord<f64>], measures: &[f64], area: &MultiPolygon<f64>) -> Vec<(f64, f64)> {
    let edges: Vec<Line<f64>> = area
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .flat_map(LineString::lines)
        .collect();

    let mut cuts = measures.to_vec();
    for (idx, (a, b)) in coords.iter().tuple_windows().enumerate() {
        let (m0, m1) = (measures[idx], measures[idx + 1]);
        let segment = Line::new(*a, *b);
        for edge in &edges {
            cuts.extend(
                crossings(segment, *edge)
                    .into_iter()
                    .map(|t| m0 + t * (m1 - m0)),
            );
        }
    }
    cuts.sort_by(f64::total_cmp);
    cuts.dedup_by(|a, b| (*a - *b).abs() <= EPS);

    let mut spans: Vec<(f64, f64)> = Vec::new();
    for (from, to) in cuts.into_iter().tuple_windows() {
        if to - from <= EPS {
            continue;
        }
        let mid = Point::from(point_at(coords, measures, (from + to) / 2.0));
        if !area.contains(&mid) {
            continue;
        }
        match spans.last_mut() {
            Some(last) if (from - last.1).abs() <= EPS => last.1 = to,
            _ => spans.push((from, to)),
        }
    }
    spans
}

/// Unions `parts` pairwise, level by level, so each input takes part
/// in a logarithmic number of overlays.
fn dissolve(mut parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    while parts.len() > 1 {
        let mut merged = Vec::with_capacity((parts.len() + 1) / 2);
        let mut level = parts.into_iter();
        while let Some(first) = level.next() {
            merged.push(match level.next() {
                Some(second) => first.union(&second),
                None => first,
            });
        }
        parts = merged;
    }
    parts.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

#[allow(clippy::cast_precision_loss)]
fn circle(center: Coord<f64>, radius: f64) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = (0..=CIRCLE_SEGMENTS)
        .map(|k| {
            let theta = TAU * (k % CIRCLE_SEGMENTS) as f64 / CIRCLE_SEGMENTS as f64;
            Coord {
                x: center.x + radius * theta.cos(),
                y: center.y + radius * theta.sin(),
            }
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

//! Confident versus inferred stretches of a surface.
//!
//! A surface estimate is confident where it lies within the selection
//! distance of a well that measured it, and inferred elsewhere inside
//! the surface's footprint.

use crate::{
    borehole::BoreholeRecord,
    engine::GeometryEngine,
    profile::SurfaceKind,
    workspace::{LineScope, Scratch},
    Path, XsecError,
};
use geo::{
    geometry::{Coord, MultiPolygon, Point},
    BoundingRect, EuclideanDistance,
};
use log::{debug, warn};
use std::fmt;

/// Fewest wells a groundwater time slice should have before its
/// classification is considered meaningful.
pub const MIN_SLICE_WELLS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Confidence {
    Confident,
    Inferred,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Confident => "CONFIDENT",
            Self::Inferred => "INFERRED",
        })
    }
}

/// A classified stretch of route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedSpan {
    pub confidence: Confidence,
    pub from_m: f64,
    pub to_m: f64,
}

/// Classified pieces of a surface's footprint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfidenceZone {
    pub pieces: Vec<(Confidence, MultiPolygon<f64>)>,
}

impl ConfidenceZone {
    /// Locates the pieces along `route`, ascending by start measure,
    /// with touching spans of the same class merged.
    pub fn spans(
        &self,
        engine: &dyn GeometryEngine,
        route: &Path,
    ) -> Result<Vec<ClassifiedSpan>, XsecError> {
        let mut spans = Vec::new();
        for (confidence, area) in &self.pieces {
            for (from_m, to_m) in engine.locate_polygons(route, area)? {
                spans.push(ClassifiedSpan {
                    confidence: *confidence,
                    from_m,
                    to_m,
                });
            }
        }
        spans.retain(|span| span.to_m > span.from_m);
        spans.sort_by(|a, b| a.from_m.total_cmp(&b.from_m));

        let mut merged: Vec<ClassifiedSpan> = Vec::with_capacity(spans.len());
        for span in spans {
            match merged.last_mut() {
                Some(last)
                    if last.confidence == span.confidence
                        && (span.from_m - last.to_m).abs() <= 1e-9 =>
                {
                    last.to_m = span.to_m;
                }
                _ => merged.push(span),
            }
        }
        Ok(merged)
    }
}

/// Locations of the wells supporting `kind`.
///
/// Bedrock uses wells with a positive depth to bedrock. A groundwater
/// slice uses wells completed within its years that measured a
/// positive static water level, plus flowing wells at zero.
pub fn supporting_wells(section: &str, kind: SurfaceKind, records: &[BoreholeRecord]) -> Vec<Coord<f64>> {
    match kind {
        SurfaceKind::Topography => Vec::new(),
        SurfaceKind::Bedrock => {
            let wells: Vec<Coord<f64>> = records
                .iter()
                .filter(|r| r.depth_to_bedrock.is_some_and(|d| d > 0.0))
                .map(|r| r.location)
                .collect();
            if wells.is_empty() {
                warn!("{section}: no wells report depth to bedrock, bedrock is inferred everywhere");
            }
            wells
        }
        SurfaceKind::Groundwater(years) => {
            let mut wells = Vec::new();
            for record in records {
                let in_slice = match years {
                    None => true,
                    Some(range) => record.completion_date.is_some_and(|date| range.contains(date)),
                };
                if !in_slice {
                    continue;
                }
                match record.static_water_level {
                    Some(swl) if swl > 0.0 => wells.push(record.location),
                    Some(swl) if swl == 0.0 && record.flowing => {
                        warn!(
                            "{section}: flowing well {} reports a static water level of zero",
                            record.well_id
                        );
                        wells.push(record.location);
                    }
                    _ => (),
                }
            }
            if wells.len() < MIN_SLICE_WELLS {
                warn!(
                    "{section}: only {} wells support {kind}, fewer than {MIN_SLICE_WELLS}",
                    wells.len()
                );
            }
            wells
        }
    }
}

pub struct ConfidenceClassifier<'a> {
    engine: &'a dyn GeometryEngine,
    /// Meters.
    selection_distance: f64,
}

impl<'a> ConfidenceClassifier<'a> {
    pub fn new(engine: &'a dyn GeometryEngine, selection_distance: f64) -> Self {
        Self {
            engine,
            selection_distance,
        }
    }

    /// Wells whose buffer can reach `path`.
    fn within_reach(&self, path: &Path, wells: &[Coord<f64>]) -> Vec<Coord<f64>> {
        let line = path.line();
        let Some(bounds) = line.bounding_rect() else {
            return Vec::new();
        };
        let reach = self.selection_distance;
        let (min, max) = (bounds.min(), bounds.max());
        wells
            .iter()
            .filter(|c| {
                c.x >= min.x - reach && c.x <= max.x + reach && c.y >= min.y - reach && c.y <= max.y + reach
            })
            .filter(|c| Point::from(**c).euclidean_distance(&line) <= reach)
            .copied()
            .collect()
    }

    /// Splits `footprint` into pieces near `wells` (confident) and
    /// away from them (inferred), as seen from `path`. Wells too far
    /// from `path` to affect it are ignored, and buffer outside the
    /// footprint is discarded.
    pub fn classify(
        &self,
        scope: &LineScope<'_>,
        path: &Path,
        kind: SurfaceKind,
        wells: &[Coord<f64>],
        footprint: &MultiPolygon<f64>,
    ) -> Result<ConfidenceZone, XsecError> {
        let now = std::time::Instant::now();
        let near = self.within_reach(path, wells);
        debug!(
            "{}: {} of {} {kind} wells within reach",
            scope.section(),
            near.len(),
            wells.len()
        );
        let buffer = self.engine.buffer_points(&near, self.selection_distance)?;
        scope.put(&format!("{kind}_buffer"), Scratch::Area(buffer.clone()));
        let pieces = self.engine.union_with_membership(footprint, &buffer)?;
        scope.put(&format!("{kind}_union"), Scratch::Pieces(pieces.clone()));

        let pieces: Vec<(Confidence, MultiPolygon<f64>)> = pieces
            .into_iter()
            .filter_map(|piece| match (piece.in_first, piece.in_second) {
                (true, true) => Some((Confidence::Confident, piece.geometry)),
                (true, false) => Some((Confidence::Inferred, piece.geometry)),
                (false, _) => None,
            })
            .collect();
        debug!(
            "{}: classified {kind} from {} wells; pieces: {}, duration: {:?}",
            scope.section(),
            near.len(),
            pieces.len(),
            now.elapsed()
        );
        Ok(ConfidenceZone { pieces })
    }
}

#[cfg(test)]
mod tests {
    use super::{supporting_wells, Confidence, ConfidenceClassifier, ConfidenceZone};
    use crate::{
        borehole::BoreholeRecord,
        profile::{SurfaceKind, YearRange},
        test_util::west_east,
        workspace::Scratch,
        PlanarEngine, Workspace,
    };
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use geo::{coord, polygon, MultiPolygon};

    fn extent(x0: f64, x1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: -500.0),
            (x: x1, y: -500.0),
            (x: x1, y: 500.0),
            (x: x0, y: 500.0),
        ]])
    }

    #[test]
    fn test_spans_partition_extent() {
        let workspace = Workspace::new();
        let scope = workspace.scope("A");
        let path = west_east("A", 1000.0, 0.0);
        let footprint = extent(-100.0, 1100.0);
        let classifier = ConfidenceClassifier::new(&PlanarEngine, 100.0);
        let zone = classifier
            .classify(&scope, &path, SurfaceKind::Bedrock, &[coord! { x: 500.0, y: 0.0 }], &footprint)
            .unwrap();
        let spans = zone.spans(&PlanarEngine, &path).unwrap();

        let classes: Vec<Confidence> = spans.iter().map(|s| s.confidence).collect();
        assert_eq!(
            classes,
            vec![Confidence::Inferred, Confidence::Confident, Confidence::Inferred]
        );
        assert_relative_eq!(spans[0].from_m, 0.0);
        assert_relative_eq!(spans[1].from_m, 400.0, epsilon = 1e-6);
        assert_relative_eq!(spans[1].to_m, 600.0, epsilon = 1e-6);
        assert_relative_eq!(spans[2].to_m, 1000.0);
        for pair in spans.windows(2) {
            assert_relative_eq!(pair[0].to_m, pair[1].from_m, epsilon = 1e-9);
        }
        let covered: f64 = spans.iter().map(|s| s.to_m - s.from_m).sum();
        assert_relative_eq!(covered, 1000.0, epsilon = 1e-6);
        assert!(workspace.contains("A/BDRK_buffer"));
        assert!(workspace.contains("A/BDRK_union"));
    }

    #[test]
    fn test_spans_restricted_to_footprint() {
        let workspace = Workspace::new();
        let scope = workspace.scope("A");
        let path = west_east("A", 1000.0, 0.0);
        // Footprint ends at 800; the buffer around 900 sticks out.
        let footprint = extent(-100.0, 800.0);
        let classifier = ConfidenceClassifier::new(&PlanarEngine, 150.0);
        let zone = classifier
            .classify(&scope, &path, SurfaceKind::Bedrock, &[coord! { x: 900.0, y: 0.0 }], &footprint)
            .unwrap();
        let spans = zone.spans(&PlanarEngine, &path).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].confidence, Confidence::Inferred);
        assert_eq!(spans[1].confidence, Confidence::Confident);
        assert_relative_eq!(spans[1].to_m, 800.0, epsilon = 1e-6);
        let covered: f64 = spans.iter().map(|s| s.to_m - s.from_m).sum();
        assert_relative_eq!(covered, 800.0, epsilon = 1e-6);
    }

    #[test]
    fn test_without_wells_all_inferred() {
        let workspace = Workspace::new();
        let scope = workspace.scope("A");
        let path = west_east("A", 1000.0, 0.0);
        let classifier = ConfidenceClassifier::new(&PlanarEngine, 100.0);
        let zone = classifier
            .classify(&scope, &path, SurfaceKind::Bedrock, &[], &extent(-100.0, 1100.0))
            .unwrap();
        let spans = zone.spans(&PlanarEngine, &path).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].confidence, Confidence::Inferred);
    }

    #[test]
    fn test_far_wells_do_not_change_spans() {
        let path = west_east("A", 1000.0, 0.0);
        let footprint = extent(-100.0, 1100.0);
        let classifier = ConfidenceClassifier::new(&PlanarEngine, 100.0);
        let near = [coord! { x: 300.0, y: 20.0 }, coord! { x: 700.0, y: -40.0 }];

        let workspace = Workspace::new();
        let alone = classifier
            .classify(&workspace.scope("A"), &path, SurfaceKind::Bedrock, &near, &footprint)
            .unwrap()
            .spans(&PlanarEngine, &path)
            .unwrap();

        // Hundreds of wells beyond the selection distance, one of them
        // just off the path's east end.
        let mut crowded = near.to_vec();
        crowded.push(coord! { x: 1080.0, y: 80.0 });
        crowded.extend((0..300).map(|i| {
            let x = -2000.0 + 20.0 * f64::from(i);
            let y = if i % 2 == 0 { 150.0 } else { -3000.0 };
            coord! { x: x, y: y }
        }));
        let workspace = Workspace::new();
        let scope = workspace.scope("A");
        let zone = classifier
            .classify(&scope, &path, SurfaceKind::Bedrock, &crowded, &footprint)
            .unwrap();
        assert_eq!(zone.spans(&PlanarEngine, &path).unwrap(), alone);
        assert_eq!(alone.len(), 5);
        // Only the two near wells were buffered.
        let buffered = scope.with("BDRK_buffer", |data| match data {
            Scratch::Area(area) => area.0.len(),
            _ => 0,
        });
        assert_eq!(buffered, Some(2));
    }

    #[test]
    fn test_boundary_path_gets_no_span() {
        let path = west_east("A", 1000.0, 0.0);
        let zone = ConfidenceZone {
            pieces: vec![(
                Confidence::Confident,
                MultiPolygon::new(vec![polygon![
                    (x: 0.0, y: 0.0),
                    (x: 1000.0, y: 0.0),
                    (x: 1000.0, y: 100.0),
                    (x: 0.0, y: 100.0),
                ]]),
            )],
        };
        assert!(zone.spans(&PlanarEngine, &path).unwrap().is_empty());
    }

    #[test]
    fn test_supporting_wells() {
        let date = |y| NaiveDate::from_ymd_opt(y, 6, 1);
        let mut a = BoreholeRecord::new("a", coord! { x: 0.0, y: 0.0 }, 50.0);
        a.depth_to_bedrock = Some(30.0);
        a.static_water_level = Some(12.0);
        a.completion_date = date(1995);
        let mut b = BoreholeRecord::new("b", coord! { x: 1.0, y: 0.0 }, 50.0);
        b.depth_to_bedrock = Some(0.0);
        b.static_water_level = Some(0.0);
        b.flowing = true;
        b.completion_date = date(2005);
        let mut c = BoreholeRecord::new("c", coord! { x: 2.0, y: 0.0 }, 50.0);
        c.static_water_level = Some(0.0);
        c.completion_date = date(1999);
        let records = vec![a, b, c];

        assert_eq!(supporting_wells("A", SurfaceKind::Bedrock, &records).len(), 1);
        assert_eq!(supporting_wells("A", SurfaceKind::Groundwater(None), &records).len(), 2);
        let nineties = YearRange { start: 1990, end: 1999 };
        let wells = supporting_wells("A", SurfaceKind::Groundwater(Some(nineties)), &records);
        assert_eq!(wells, vec![coord! { x: 0.0, y: 0.0 }]);
        assert!(supporting_wells("A", SurfaceKind::Topography, &records).is_empty());
    }
}

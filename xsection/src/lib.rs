//! # Schematic geologic cross-sections
//!
//! `xsection` turns boreholes, depth intervals and elevation surfaces
//! into two-dimensional cross-section diagrams along traverse lines.
//!
//! Schematic space has distance along the traverse line on X and
//! vertically exaggerated elevation (meters) on Y. For each line the
//! [`Pipeline`] runs, in order:
//!
//! 1. [path]: drape and measure the traverse line.
//! 1. [borehole]: project nearby boreholes and draw them as sticks.
//! 1. [interval]: place lithology and screen intervals on the sticks.
//! 1. [profile]: sample topography, bedrock and groundwater surfaces.
//! 1. [confidence]: tag surface stretches as confident or inferred.
//! 1. [frame]: lay out the axis frame and tick marks.
//!
//! All spatial primitives go through a [`GeometryEngine`].

pub mod borehole;
pub mod confidence;
pub mod engine;
mod error;
pub mod frame;
pub mod interval;
pub mod math;
pub mod path;
mod pipeline;
pub mod profile;
mod project;
mod surface;
pub mod units;
pub mod workspace;

pub use crate::{
    borehole::{BoreholeRecord, BoreholeStick, ProjectedBorehole},
    confidence::{Confidence, ConfidenceZone},
    engine::{GeometryEngine, PlanarEngine},
    error::{GeometryError, LineFailure, Stage, UnknownDirection, XsecError},
    frame::{GridFrame, GridSpec},
    interval::{DepthInterval, IntervalStick, StickForm},
    path::{Direction, Path, PathVertex, Quadrant, TraverseLine},
    pipeline::{CrossSection, GroundwaterSurface, Pipeline, PipelineBuilder, RunReport},
    profile::{SurfaceKind, SurfaceProfile, YearRange},
    project::{Project, DEFAULT_STICK_WIDTH},
    surface::{NamedSurface, Surface},
    units::{ElevUnits, Length, LinearUnit},
    workspace::Workspace,
};
pub use {demgrid, geo};

#[cfg(test)]
pub(crate) mod test_util {
    use crate::{Direction, Path, PathVertex};
    use demgrid::Grid;
    use geo::coord;

    const NODATA: f32 = -9999.0;

    /// A flat grid at elevation 100 covering `[x0, x0 + width)` by
    /// `[y0, y0 + height)`.
    pub fn plane(x0: f64, y0: f64, width: f64, height: f64, cell: f64) -> Grid {
        masked(x0, y0, width, height, cell, |_| true)
    }

    /// Like [`plane`], but only columns whose center satisfies `keep`
    /// hold data.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn masked(
        x0: f64,
        y0: f64,
        width: f64,
        height: f64,
        cell: f64,
        keep: impl Fn(f64) -> bool,
    ) -> Grid {
        let cols = (width / cell).round() as usize;
        let rows = (height / cell).round() as usize;
        let samples = (0..rows)
            .flat_map(|_| 0..cols)
            .map(|col| {
                if keep(x0 + (col as f64 + 0.5) * cell) {
                    100.0
                } else {
                    NODATA
                }
            })
            .collect();
        Grid::from_samples(coord! { x: x0, y: y0 }, cell, (cols, rows), Some(NODATA), samples).unwrap()
    }

    /// A measured west-east path along `y = 0` with a vertex at its
    /// midpoint.
    pub fn west_east(section: &str, length: f64, z: f64) -> Path {
        Path {
            section: section.to_owned(),
            route_id: format!("{section}_01"),
            direction: Direction::WestEast,
            vertices: [0.0, length / 2.0, length]
                .into_iter()
                .map(|m| PathVertex { x: m, y: 0.0, z, m })
                .collect(),
        }
    }
}

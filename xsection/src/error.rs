use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XsecError {
    #[error("missing required parameter '{0}'")]
    Builder(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("traverse line {line}: {source}")]
    Direction {
        line: String,
        #[source]
        source: UnknownDirection,
    },

    #[error("{0}")]
    Geometry(#[from] GeometryError),

    #[error("{0}")]
    Dem(#[from] demgrid::DemError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized direction code '{0}'")]
pub struct UnknownDirection(pub String);

/// Failures reported by a [`GeometryEngine`](crate::GeometryEngine).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("route needs at least two distinct vertices, got {0}")]
    DegenerateRoute(usize),

    #[error("route measures are not monotonic at vertex {0}")]
    NonMonotonicRoute(usize),

    #[error("surface has no data along the line")]
    NoCoverage,
}

/// Pipeline stage in which a traverse line failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Stage {
    Path,
    Boreholes,
    Lithology,
    Screens,
    Topography,
    Bedrock,
    Groundwater,
    Confidence,
    Grid,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Path => "elevation route",
            Self::Boreholes => "borehole sticks",
            Self::Lithology => "lithology sticks",
            Self::Screens => "screen sticks",
            Self::Topography => "topographic profile",
            Self::Bedrock => "bedrock profile",
            Self::Groundwater => "groundwater profile",
            Self::Confidence => "confidence zone",
            Self::Grid => "grid lines",
        };
        f.write_str(name)
    }
}

/// A per-line fatal error: the named stage aborted processing of
/// one traverse line.
#[derive(Error, Debug)]
#[error("{stage} failed for traverse line {section}: {source}")]
pub struct LineFailure {
    pub section: String,
    pub stage: Stage,
    #[source]
    pub source: XsecError,
}

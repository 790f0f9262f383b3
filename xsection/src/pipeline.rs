use crate::{
    borehole::{sticks_name, BoreholeProjector, BoreholeRecord, BoreholeStick},
    confidence::{supporting_wells, ConfidenceClassifier},
    engine::{GeometryEngine, PlanarEngine},
    error::{LineFailure, Stage},
    frame::{Extents, FrameBuilder, GridFrame},
    interval::{DepthInterval, IntervalKind, IntervalSegmenter, IntervalStick},
    path::{build_path, Path, TraverseLine},
    profile::{SurfaceKind, SurfaceProfile, SurfaceProfiler, YearRange},
    workspace::{LineScope, Workspace},
    Project, Surface, XsecError,
};
use log::{error, info};
use std::collections::HashSet;

static PLANAR: PlanarEngine = PlanarEngine;

/// Everything drawn for one traverse line.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrossSection {
    pub section: String,
    /// Vertical exaggeration as used in output names.
    pub ve_label: String,
    pub path: Path,
    pub boreholes: Vec<BoreholeStick>,
    pub lithology: Vec<IntervalStick>,
    pub screens: Vec<IntervalStick>,
    pub topography: SurfaceProfile,
    pub bedrock: Option<SurfaceProfile>,
    pub groundwater: Vec<SurfaceProfile>,
    pub frames: Vec<GridFrame>,
}

impl CrossSection {
    pub fn sticks_name(&self) -> String {
        sticks_name(&self.section)
    }

    pub fn lithology_name(&self) -> String {
        IntervalKind::Lithology.collection_name(&self.section, &self.ve_label)
    }

    pub fn screens_name(&self) -> String {
        IntervalKind::Screens.collection_name(&self.section, &self.ve_label)
    }

    /// All surface profiles, topography first.
    pub fn profiles(&self) -> impl Iterator<Item = &SurfaceProfile> {
        std::iter::once(&self.topography)
            .chain(self.bedrock.as_ref())
            .chain(&self.groundwater)
    }
}

/// Outcome of a run: the sections that finished and the lines that
/// did not.
#[derive(Debug, Default)]
pub struct RunReport {
    pub sections: Vec<CrossSection>,
    pub failures: Vec<LineFailure>,
}

/// A groundwater surface and the years of wells supporting it.
#[derive(Clone, Copy)]
pub struct GroundwaterSurface<'a> {
    pub surface: &'a dyn Surface,
    pub years: Option<YearRange>,
}

/// Builds cross-sections for a set of traverse lines.
pub struct Pipeline<'a> {
    project: &'a Project,
    engine: &'a dyn GeometryEngine,
    topography: &'a dyn Surface,
    bedrock: Option<&'a dyn Surface>,
    groundwater: Vec<GroundwaterSurface<'a>>,
    boreholes: &'a [BoreholeRecord],
    lithology: Option<&'a [DepthInterval]>,
    screens: Option<&'a [DepthInterval]>,
}

impl<'a> Pipeline<'a> {
    pub fn builder() -> PipelineBuilder<'a> {
        PipelineBuilder {
            project: None,
            engine: None,
            topography: None,
            bedrock: None,
            groundwater: Vec::new(),
            boreholes: &[],
            lithology: None,
            screens: None,
        }
    }

    /// Runs every line with a fresh workspace.
    pub fn run(&self, lines: &[TraverseLine]) -> Result<RunReport, XsecError> {
        self.run_in(&Workspace::new(), lines)
    }

    /// Runs every line, in section name order, using `workspace` for
    /// intermediates.
    ///
    /// Configuration problems abort before any line is processed. A
    /// line that fails is reported and skipped.
    pub fn run_in(&self, workspace: &Workspace, lines: &[TraverseLine]) -> Result<RunReport, XsecError> {
        self.engine.ensure_available()?;
        let mut names = HashSet::new();
        for line in lines {
            line.direction()?;
            if !names.insert(line.section.as_str()) {
                return Err(XsecError::Config(format!(
                    "duplicate traverse line {}",
                    line.section
                )));
            }
        }

        let mut ordered: Vec<&TraverseLine> = lines.iter().collect();
        ordered.sort_by(|a, b| a.section.cmp(&b.section));

        let mut report = RunReport::default();
        for line in ordered {
            info!("processing traverse line {}", line.section);
            let scope = workspace.scope(&line.section);
            match self.section(&scope, line) {
                Ok(section) => report.sections.push(section),
                Err(failure) => {
                    error!("{failure}");
                    report.failures.push(failure);
                }
            }
        }
        info!(
            "built {} cross-sections, {} failed",
            report.sections.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Builds the cross-section for one line.
    pub fn section(&self, scope: &LineScope<'_>, line: &TraverseLine) -> Result<CrossSection, LineFailure> {
        let section = line.section.as_str();
        let selection = self.project.selection_distance.meters();
        let scale = self.project.scale();
        let ve_label = self.project.ve_label();

        let path = build_path(self.engine, scope, line, self.topography)
            .map_err(failed(section, Stage::Path))?;

        let projector = BoreholeProjector::new(self.engine, scale, selection);
        let projected = projector
            .project(scope, &path, self.topography, self.boreholes)
            .map_err(failed(section, Stage::Boreholes))?;
        let boreholes = projector.sticks(&path, projected);

        let segmenter = IntervalSegmenter::new(
            self.engine,
            selection,
            self.project.stick_form,
            self.project.stick_width,
        );
        let intervals = |kind: IntervalKind, rows: Option<&[DepthInterval]>, stage: Stage| {
            let Some(rows) = rows else {
                info!("{section}: no {kind:?} rows, skipping");
                return Ok(Vec::new());
            };
            segmenter
                .segment(section, kind, &boreholes, rows)
                .map_err(failed(section, stage))
        };
        let lithology = intervals(IntervalKind::Lithology, self.lithology, Stage::Lithology)?;
        let screens = intervals(IntervalKind::Screens, self.screens, Stage::Screens)?;

        let profiler = SurfaceProfiler::new(self.engine, scale);
        let topography = profiler
            .profile(scope, &path, self.topography, SurfaceKind::Topography, None, &ve_label)
            .map_err(failed(section, Stage::Topography))?;

        let classifier = ConfidenceClassifier::new(self.engine, selection);
        let classified = |surface: &dyn Surface, kind: SurfaceKind| {
            let wells = supporting_wells(section, kind, self.boreholes);
            let zone = classifier
                .classify(scope, &path, kind, &wells, surface.footprint())
                .map_err(failed(section, Stage::Confidence))?;
            profiler
                .profile(scope, &path, surface, kind, Some(&zone), &ve_label)
                .map_err(failed(section, kind.stage()))
        };
        let bedrock = self
            .bedrock
            .map(|surface| classified(surface, SurfaceKind::Bedrock))
            .transpose()?;
        let groundwater = self
            .groundwater
            .iter()
            .map(|gw| classified(gw.surface, SurfaceKind::Groundwater(gw.years)))
            .collect::<Result<Vec<_>, _>>()?;

        let extents = Extents::from_outputs(&boreholes, &topography, bedrock.as_ref())
            .map_err(failed(section, Stage::Grid))?;
        let builder = FrameBuilder::new(self.project.vertical_exaggeration);
        let frames = self
            .project
            .grids
            .iter()
            .map(|spec| builder.build(section, &ve_label, extents, spec))
            .collect::<Result<Vec<_>, _>>()
            .map_err(failed(section, Stage::Grid))?;

        Ok(CrossSection {
            section: section.to_owned(),
            ve_label,
            path,
            boreholes,
            lithology,
            screens,
            topography,
            bedrock,
            groundwater,
            frames,
        })
    }
}

fn failed(section: &str, stage: Stage) -> impl FnOnce(XsecError) -> LineFailure + '_ {
    move |source| LineFailure {
        section: section.to_owned(),
        stage,
        source,
    }
}

pub struct PipelineBuilder<'a> {
    /// Run settings (required).
    project: Option<&'a Project>,

    /// Geometry engine (defaults to [`PlanarEngine`]).
    engine: Option<&'a dyn GeometryEngine>,

    /// Topographic surface (required).
    topography: Option<&'a dyn Surface>,

    bedrock: Option<&'a dyn Surface>,

    groundwater: Vec<GroundwaterSurface<'a>>,

    boreholes: &'a [BoreholeRecord],

    lithology: Option<&'a [DepthInterval]>,

    screens: Option<&'a [DepthInterval]>,
}

impl<'a> PipelineBuilder<'a> {
    /// Run settings (required).
    #[must_use]
    pub fn project(mut self, project: &'a Project) -> Self {
        self.project = Some(project);
        self
    }

    /// Geometry engine (defaults to [`PlanarEngine`]).
    #[must_use]
    pub fn engine(mut self, engine: &'a dyn GeometryEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Topographic surface, also used to drape paths and boreholes
    /// (required).
    #[must_use]
    pub fn topography(mut self, surface: &'a dyn Surface) -> Self {
        self.topography = Some(surface);
        self
    }

    #[must_use]
    pub fn bedrock(mut self, surface: &'a dyn Surface) -> Self {
        self.bedrock = Some(surface);
        self
    }

    /// Adds a groundwater surface; `years` limits the supporting wells
    /// by completion date.
    #[must_use]
    pub fn groundwater(mut self, surface: &'a dyn Surface, years: Option<YearRange>) -> Self {
        self.groundwater.push(GroundwaterSurface { surface, years });
        self
    }

    #[must_use]
    pub fn boreholes(mut self, records: &'a [BoreholeRecord]) -> Self {
        self.boreholes = records;
        self
    }

    #[must_use]
    pub fn lithology(mut self, rows: &'a [DepthInterval]) -> Self {
        self.lithology = Some(rows);
        self
    }

    #[must_use]
    pub fn screens(mut self, rows: &'a [DepthInterval]) -> Self {
        self.screens = Some(rows);
        self
    }

    pub fn build(self) -> Result<Pipeline<'a>, XsecError> {
        let project = self.project.ok_or(XsecError::Builder("project"))?;
        let topography = self.topography.ok_or(XsecError::Builder("topography"))?;
        project.validate()?;
        Ok(Pipeline {
            project,
            engine: self.engine.unwrap_or(&PLANAR),
            topography,
            bedrock: self.bedrock,
            groundwater: self.groundwater,
            boreholes: self.boreholes,
            lithology: self.lithology,
            screens: self.screens,
        })
    }
}

//! Project file loading.

use anyhow::{Context, Error as AnyError};
use demgrid::Grid;
use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use xsection::{
    BoreholeRecord, DepthInterval, NamedSurface, Project, TraverseLine, YearRange,
};

#[derive(Debug, Deserialize)]
pub struct ProjectFile {
    pub settings: Project,
    pub surfaces: SurfacePaths,
    pub lines: Vec<TraverseLine>,
    #[serde(default)]
    pub boreholes: Vec<BoreholeRecord>,
    pub lithology: Option<Vec<DepthInterval>>,
    pub screens: Option<Vec<DepthInterval>>,
}

/// Raster paths, relative to the project file.
#[derive(Debug, Deserialize)]
pub struct SurfacePaths {
    pub topography: PathBuf,
    pub bedrock: Option<PathBuf>,
    #[serde(default)]
    pub groundwater: Vec<GroundwaterPath>,
}

#[derive(Debug, Deserialize)]
pub struct GroundwaterPath {
    pub path: PathBuf,
    pub years: Option<YearRange>,
}

pub struct Surfaces {
    pub topography: NamedSurface<Grid>,
    pub bedrock: Option<NamedSurface<Grid>>,
    pub groundwater: Vec<(NamedSurface<Grid>, Option<YearRange>)>,
}

impl ProjectFile {
    pub fn load(path: &Path) -> Result<Self, AnyError> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading project {}", path.display()))?;
        let mut project: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing project {}", path.display()))?;
        if let Some(base) = path.parent() {
            project.surfaces.resolve(base);
        }
        Ok(project)
    }
}

impl SurfacePaths {
    fn resolve(&mut self, base: &Path) {
        let join = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        join(&mut self.topography);
        if let Some(bedrock) = self.bedrock.as_mut() {
            join(bedrock);
        }
        for gw in &mut self.groundwater {
            join(&mut gw.path);
        }
    }

    pub fn open(&self, memmap: bool) -> Result<Surfaces, AnyError> {
        Ok(Surfaces {
            topography: open_grid(&self.topography, memmap)?,
            bedrock: self
                .bedrock
                .as_deref()
                .map(|path| open_grid(path, memmap))
                .transpose()?,
            groundwater: self
                .groundwater
                .iter()
                .map(|gw| Ok((open_grid(&gw.path, memmap)?, gw.years)))
                .collect::<Result<_, AnyError>>()?,
        })
    }
}

fn open_grid(path: &Path, memmap: bool) -> Result<NamedSurface<Grid>, AnyError> {
    let is_float = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("flt"));
    let grid = if memmap && is_float {
        Grid::memmap(path)
    } else {
        Grid::load(path)
    }
    .with_context(|| format!("opening surface {}", path.display()))?;
    let (cols, rows) = grid.dimensions();
    info!("{}: {cols}x{rows} cells of {}", path.display(), grid.cell_size());
    let name = path
        .file_stem()
        .map_or_else(|| path.display().to_string(), |stem| stem.to_string_lossy().into_owned());
    Ok(NamedSurface::new(name, grid))
}

#[cfg(test)]
mod tests {
    use super::ProjectFile;
    use std::io::Write;
    use xsection::{ElevUnits, LinearUnit, Surface};

    const PROJECT: &str = r#"{
        "settings": {
            "elev_units": "feet",
            "vertical_exaggeration": 10,
            "selection_distance": { "value": 500, "unit": "meters" },
            "grids": [{
                "distance_interval": 1,
                "distance_unit": "kilometers",
                "elevation_interval": 50,
                "elevation_unit": "feet"
            }]
        },
        "surfaces": { "topography": "topo.asc" },
        "lines": [{
            "section": "A",
            "direction": "W-E",
            "shape": { "planar": [{ "x": 0, "y": 5 }, { "x": 30, "y": 5 }] }
        }],
        "boreholes": [{
            "well_id": "W1",
            "location": { "x": 12, "y": 4 },
            "depth": 80,
            "completion_date": "1995-06-01",
            "static_water_level": 12.5
        }],
        "lithology": [{ "well_id": "W1", "depth_top": 0, "depth_bottom": 20 }]
    }"#;

    #[test]
    fn test_load_project() {
        let dir = tempfile::tempdir().unwrap();
        let mut topo = std::fs::File::create(dir.path().join("topo.asc")).unwrap();
        write!(
            topo,
            "ncols 4\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 10\nNODATA_value -9999\n500 500 500 500\n"
        )
        .unwrap();
        let path = dir.path().join("project.json");
        std::fs::write(&path, PROJECT).unwrap();

        let project = ProjectFile::load(&path).unwrap();
        assert_eq!(project.settings.elev_units, ElevUnits::Feet);
        assert_eq!(project.settings.selection_distance.unit, LinearUnit::Meters);
        assert_eq!(project.settings.stick_width, xsection::DEFAULT_STICK_WIDTH);
        assert_eq!(project.lines[0].direction().unwrap().code(), "W-E");
        assert_eq!(project.boreholes[0].completion_date.unwrap().to_string(), "1995-06-01");
        assert_eq!(project.lithology.as_ref().unwrap().len(), 1);
        assert!(project.screens.is_none());
        assert_eq!(project.surfaces.topography, dir.path().join("topo.asc"));

        let surfaces = project.surfaces.open(false).unwrap();
        assert_eq!(surfaces.topography.name(), "topo");
        assert!(surfaces.bedrock.is_none());
    }
}

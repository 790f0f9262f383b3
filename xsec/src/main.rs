#![allow(clippy::cast_possible_truncation)]

mod input;
mod options;

use crate::{
    input::ProjectFile,
    options::{Cli, Command},
};
use anyhow::{anyhow, Error as AnyError};
use clap::Parser;
use itertools::Itertools;
use serde::Serialize;
use textplots::{Chart, Plot, Shape};
use xsection::{
    frame::tick_label, CrossSection, Pipeline, Project, RunReport, SurfaceProfile,
};

fn main() -> Result<(), AnyError> {
    let Cli {
        project,
        memmap,
        exaggeration,
        selection_distance,
        section,
        cmd,
    } = Cli::parse();

    env_logger::init();

    let mut input = ProjectFile::load(&project)?;
    if let Some(ve) = exaggeration {
        input.settings.vertical_exaggeration = ve;
    }
    if let Some(distance) = selection_distance {
        input.settings.selection_distance = distance;
    }
    if !section.is_empty() {
        input.lines.retain(|line| section.contains(&line.section));
    }

    let surfaces = input.surfaces.open(memmap)?;
    let mut builder = Pipeline::builder()
        .project(&input.settings)
        .topography(&surfaces.topography)
        .boreholes(&input.boreholes);
    if let Some(bedrock) = &surfaces.bedrock {
        builder = builder.bedrock(bedrock);
    }
    for (surface, years) in &surfaces.groundwater {
        builder = builder.groundwater(surface, *years);
    }
    if let Some(rows) = &input.lithology {
        builder = builder.lithology(rows);
    }
    if let Some(rows) = &input.screens {
        builder = builder.screens(rows);
    }
    let report = builder.build()?.run(&input.lines)?;

    match cmd {
        Command::Json { pretty } => print_json(&report, pretty)?,
        Command::Plot => plot_ascii(&report),
        Command::Summary => print_summary(&report, &input.settings),
    }

    for failure in &report.failures {
        eprintln!("{failure}");
    }
    match report.failures.len() {
        0 => Ok(()),
        n => Err(anyhow!("{n} of {} traverse lines failed", n + report.sections.len())),
    }
}

#[derive(Serialize)]
struct JsonFailure<'a> {
    section: &'a str,
    stage: xsection::Stage,
    error: String,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    sections: &'a [CrossSection],
    failures: Vec<JsonFailure<'a>>,
}

fn print_json(report: &RunReport, pretty: bool) -> Result<(), AnyError> {
    let out = JsonReport {
        sections: &report.sections,
        failures: report
            .failures
            .iter()
            .map(|failure| JsonFailure {
                section: &failure.section,
                stage: failure.stage,
                error: failure.source.to_string(),
            })
            .collect(),
    };
    let json = if pretty {
        serde_json::to_string_pretty(&out)?
    } else {
        serde_json::to_string(&out)?
    };
    println!("{json}");
    Ok(())
}

fn profile_points(profile: &SurfaceProfile) -> Vec<(f32, f32)> {
    profile
        .segments
        .iter()
        .flat_map(|segment| segment.line.coords())
        .map(|c| (c.x as f32, c.y as f32))
        .collect()
}

fn plot_ascii(report: &RunReport) {
    for section in &report.sections {
        let xmax = section.path.length() as f32;
        for profile in section.profiles() {
            let points = profile_points(profile);
            if points.len() < 2 {
                continue;
            }
            println!("{}", profile.name);
            Chart::new(300, 150, 0.0, xmax)
                .lineplot(&Shape::Lines(&points))
                .display();
        }
    }
}

fn print_summary(report: &RunReport, project: &Project) {
    let units = project.elev_units;
    for section in &report.sections {
        println!(
            "{} ({}): {:.1} m, {} boreholes, {} lithology, {} screens",
            section.section,
            section.path.direction,
            section.path.length(),
            section.boreholes.len(),
            section.lithology.len(),
            section.screens.len(),
        );
        for stick in &section.boreholes {
            println!(
                "  {} {}: M {:.1}, {:.1} to {:.1} {units}, {:.1} m off line",
                stick.stick_id,
                stick.well_id(),
                stick.m(),
                stick.top_in(units),
                stick.bottom_in(units),
                stick.dist_from_section(),
            );
        }
        for profile in section.profiles() {
            let classes = profile
                .segments
                .iter()
                .filter_map(|segment| segment.confidence)
                .unique()
                .sorted()
                .join("/");
            println!(
                "  {}: {} segments, shifted {:.1} m{}",
                profile.name,
                profile.segments.len(),
                profile.move_length,
                if classes.is_empty() { String::new() } else { format!(", {classes}") },
            );
        }
        for frame in &section.frames {
            println!(
                "  {}: distance [{}], elevation [{}]",
                frame.name,
                frame.distance_ticks.iter().copied().map(tick_label).join(", "),
                frame.elevation_ticks.iter().copied().map(tick_label).join(", "),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use xsection::{Direction, Path, PathVertex};

    #[test]
    fn test_route_id_not_serialized() {
        let path = Path {
            section: "A".to_owned(),
            route_id: "A_01".to_owned(),
            direction: Direction::WestEast,
            vertices: vec![
                PathVertex { x: 0.0, y: 0.0, z: 500.0, m: 0.0 },
                PathVertex { x: 3000.0, y: 0.0, z: 500.0, m: 3000.0 },
            ],
        };
        let json = serde_json::to_value(&path).unwrap();
        assert!(json.get("route_id").is_none());
        assert_eq!(json["direction"], "W-E");

        let back: Path = serde_json::from_value(json).unwrap();
        assert!(back.route_id.is_empty());
        assert_eq!(back.vertices, path.vertices);
    }
}

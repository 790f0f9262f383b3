use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xsection::Length;

/// Build schematic geologic cross-sections along traverse lines.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// Project file (JSON) with settings, surfaces, lines and wells.
    pub project: PathBuf,

    /// Memory-map `.flt` surfaces instead of reading them into memory.
    #[arg(long, default_value_t = false)]
    pub memmap: bool,

    /// Override the project's vertical exaggeration.
    #[arg(short = 'x', long)]
    pub exaggeration: Option<f64>,

    /// Override the project's selection distance, e.g. "500 Meters".
    #[arg(short = 'd', long)]
    pub selection_distance: Option<Length>,

    /// Only build these sections (repeatable).
    #[arg(short, long)]
    pub section: Vec<String>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print all cross-sections to stdout as JSON.
    Json {
        /// Indent the output.
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Plot each section's surface profiles to the terminal.
    Plot,

    /// Print per-section counts, extents and failures.
    Summary,
}

// src/cli/mod.rs — CLI definition (clap derive)

pub mod doctor;
pub mod generate;
pub mod render;
pub mod review;
pub mod session_loop;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "scadcritic",
    about = "Evaluate and improve OpenSCAD designs with a vision model",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Review and iteratively improve an existing .scad file
    Review {
        /// Path to the .scad file
        file: String,

        /// Maximum number of evaluation iterations
        #[arg(short = 'n', long)]
        max_iterations: Option<u32>,

        /// Stop once the overall score reaches this value (1-10)
        #[arg(short, long)]
        target_score: Option<u8>,

        /// Model identifier
        #[arg(short, long)]
        model: Option<String>,

        /// Apply every suggestion without prompting
        #[arg(long)]
        auto: bool,

        /// Evaluate once and exit without changing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a new design from a description, then iterate on it
    Generate {
        /// Text description of the desired design
        description: String,

        /// Output filename (defaults to a slug of the description)
        #[arg(short, long)]
        output: Option<String>,

        /// Maximum number of evaluation iterations
        #[arg(short = 'n', long)]
        max_iterations: Option<u32>,

        /// Stop once the overall score reaches this value (1-10)
        #[arg(short, long)]
        target_score: Option<u8>,

        /// Model identifier
        #[arg(short, long)]
        model: Option<String>,

        /// Apply every suggestion without prompting
        #[arg(long)]
        auto: bool,
    },

    /// Render a .scad file to a PNG image
    Render {
        /// Path to the .scad file
        file: String,

        /// Output path (defaults to the source path with .png)
        #[arg(short, long)]
        output: Option<String>,

        #[arg(long, default_value_t = 1024)]
        width: u32,

        #[arg(long, default_value_t = 768)]
        height: u32,

        /// Quality preset: eval, preview or export
        #[arg(short, long, default_value = "preview")]
        quality: String,
    },

    /// Export a .scad file to a mesh or 2D format
    Export {
        /// Path to the .scad file
        file: String,

        /// Output path (defaults to the source path with the format extension)
        #[arg(short, long)]
        output: Option<String>,

        /// stl, 3mf, off, amf, csg, dxf or svg
        #[arg(short, long, default_value = "stl")]
        format: String,

        /// Quality preset: eval, preview or export
        #[arg(short, long, default_value = "export")]
        quality: String,
    },

    /// Check a .scad file for syntax errors
    Validate {
        /// Path to the .scad file
        file: String,
    },

    /// Check the OpenSCAD binary, API key and data directory
    Doctor,
}

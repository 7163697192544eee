// src/render/mod.rs — Render invoker: quality presets and the renderer seam

pub mod openscad;

pub use openscad::OpenScadRenderer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::ScadCriticError;

/// Fidelity/speed presets, applied as `-D` variable overrides.
///
/// Eval keeps `$fn` and interpolation steps low so the iterative loop
/// turns around in seconds; Export is what ends up on the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Eval,
    Preview,
    Export,
}

impl Quality {
    /// `($fn, num_steps)` override values for this preset.
    pub fn overrides(&self) -> [(&'static str, u32); 2] {
        match self {
            Quality::Eval => [("$fn", 60), ("num_steps", 50)],
            Quality::Preview => [("$fn", 60), ("num_steps", 100)],
            Quality::Export => [("$fn", 90), ("num_steps", 100)],
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = ScadCriticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eval" => Ok(Quality::Eval),
            "preview" => Ok(Quality::Preview),
            "export" => Ok(Quality::Export),
            other => Err(ScadCriticError::InvalidInput(format!(
                "unknown quality '{other}' (expected eval, preview or export)"
            ))),
        }
    }
}

/// Options for a PNG render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
    pub colorscheme: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            quality: Quality::Preview,
            colorscheme: "Cornfield".into(),
        }
    }
}

/// Mesh/2D export formats OpenSCAD can emit, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    ThreeMf,
    Off,
    Amf,
    Csg,
    Dxf,
    Svg,
}

impl MeshFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
            MeshFormat::ThreeMf => "3mf",
            MeshFormat::Off => "off",
            MeshFormat::Amf => "amf",
            MeshFormat::Csg => "csg",
            MeshFormat::Dxf => "dxf",
            MeshFormat::Svg => "svg",
        }
    }
}

impl std::str::FromStr for MeshFormat {
    type Err = ScadCriticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stl" => Ok(MeshFormat::Stl),
            "3mf" => Ok(MeshFormat::ThreeMf),
            "off" => Ok(MeshFormat::Off),
            "amf" => Ok(MeshFormat::Amf),
            "csg" => Ok(MeshFormat::Csg),
            "dxf" => Ok(MeshFormat::Dxf),
            "svg" => Ok(MeshFormat::Svg),
            other => Err(ScadCriticError::InvalidInput(format!(
                "invalid format '{other}' (expected stl, 3mf, off, amf, csg, dxf or svg)"
            ))),
        }
    }
}

/// The narrow rendering surface the evaluation loop depends on.
/// `OpenScadRenderer` implements it against the real binary; tests
/// substitute scripted stubs.
#[async_trait]
pub trait DesignRenderer: Send + Sync {
    /// Render source text to a PNG at evaluation quality.
    async fn render_preview(&self, code: &str) -> Result<Vec<u8>, ScadCriticError>;

    /// Syntax-check source text without keeping any output.
    async fn validate_code(&self, code: &str) -> Result<(), ScadCriticError>;
}

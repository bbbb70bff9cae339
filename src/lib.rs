// Library exports for sheetplot

pub mod chart;
pub mod columns;
pub mod data;
pub mod decode;
pub mod error;
pub mod graph;
pub mod palette;
pub mod parser;
pub mod render;
pub mod scale;
pub mod session;
pub mod store;

pub use chart::{build, Chart, ChartKind, ChartRequest, Encoding, Selection};
pub use data::{Column, ColumnType, Dataset, Value};
pub use decode::{decode, decode_upload};
pub use error::{DashError, Result};
pub use render::{RenderResult, Rendered, Renderer};
pub use session::{Session, SessionManager, SessionState};
pub use store::DatasetStore;

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Where the standalone HTML page is written.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default)]
    pub title: Option<String>,
}

/// Smallest canvas edge, in pixels, the chart layouts fit into.
pub const MIN_CANVAS_SIZE: u32 = 100;

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output.html")
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            output_path: default_output_path(),
            title: None,
        }
    }
}

impl RenderOptions {
    /// Parse options from a JSON object; missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let options: RenderOptions =
            serde_json::from_str(text).map_err(|e| DashError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DashError::Config(format!("failed to read `{}`: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Reject canvases too small to lay a chart out on.
    pub fn validate(&self) -> Result<()> {
        if self.width < MIN_CANVAS_SIZE || self.height < MIN_CANVAS_SIZE {
            return Err(DashError::Config(format!(
                "chart size {}x{} is too small (minimum {}x{})",
                self.width, self.height, MIN_CANVAS_SIZE, MIN_CANVAS_SIZE
            )));
        }
        Ok(())
    }
}

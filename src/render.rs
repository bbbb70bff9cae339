//! Presentation of a chart or an error message.
//!
//! Every call produces a complete replacement for the chart area; nothing
//! from a previous render is merged into the new output.

use crate::chart::{Chart, ChartKind, Selection};
use crate::columns;
use crate::data::Dataset;
use crate::error::{DashError, Result};
use crate::graph::Canvas;
use crate::RenderOptions;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{info, warn};

/// Rows shown in the dataset preview table.
pub const PREVIEW_ROWS: usize = 5;

/// Either a chart to draw or the message that replaces it.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderResult {
    Chart(Chart),
    Error(String),
}

impl From<Result<Chart>> for RenderResult {
    fn from(outcome: Result<Chart>) -> Self {
        match outcome {
            Ok(chart) => RenderResult::Chart(chart),
            Err(e) => RenderResult::Error(e.to_string()),
        }
    }
}

/// What ends up in the chart area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Chart { svg: String },
    Error { message: String },
}

impl Rendered {
    pub fn is_error(&self) -> bool {
        matches!(self, Rendered::Error { .. })
    }

    /// HTML for the chart area.
    pub fn to_html(&self) -> String {
        match self {
            Rendered::Chart { svg } => format!("<div id=\"output-plot\">{}</div>", svg),
            Rendered::Error { message } => format!(
                "<div id=\"output-plot\" class=\"error\">{}</div>",
                escape_html(message)
            ),
        }
    }
}

/// Everything the standalone page shows besides the chart itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageContext<'a> {
    pub dataset: Option<&'a Dataset>,
    pub selection: Option<&'a Selection>,
    pub output: Option<&'a Rendered>,
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render(&self, result: &RenderResult) -> Rendered {
        match result {
            RenderResult::Chart(chart) => {
                let canvas = Canvas::new(
                    self.options.width,
                    self.options.height,
                    self.options.title.clone(),
                );
                match canvas.draw(chart) {
                    Ok(svg) => Rendered::Chart { svg },
                    Err(e) => {
                        let error = DashError::ChartConstruction(format!("{:#}", e));
                        warn!(kind = %chart.kind, error = %error, "chart drawing failed");
                        Rendered::Error {
                            message: error.to_string(),
                        }
                    }
                }
            }
            RenderResult::Error(message) => Rendered::Error {
                message: message.clone(),
            },
        }
    }

    /// Build a standalone HTML document for the current session view.
    pub fn page(&self, ctx: &PageContext) -> String {
        let mut html = String::new();
        let title = self.options.title.as_deref().unwrap_or("sheetplot");

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(html, "<title>{}</title>", escape_html(title));
        let _ = writeln!(html, "<style>{}</style>", PAGE_CSS);
        html.push_str("</head>\n<body>\n");

        if let Some(dataset) = ctx.dataset {
            let _ = writeln!(html, "<h5>{}</h5>", escape_html(dataset.source()));
            html.push_str(&preview_table(dataset));
            html.push_str("<hr>\n");

            let selection = ctx.selection.cloned().unwrap_or_default();
            html.push_str(&column_select("dropdown-x-axis", dataset, selection.x.as_deref()));
            html.push_str(&column_select("dropdown-y-axis", dataset, selection.y.as_deref()));
            html.push_str(&kind_select(selection.kind));
        }

        if let Some(output) = ctx.output {
            html.push_str(&output.to_html());
            html.push('\n');
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    /// Write [`Renderer::page`] to the configured output path.
    pub fn write_page(&self, ctx: &PageContext) -> Result<PathBuf> {
        let path = self.options.output_path.clone();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.page(ctx))?;
        info!(path = %path.display(), "wrote page");
        Ok(path)
    }
}

const PAGE_CSS: &str = "body{font-family:sans-serif;margin:10px}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:2px 6px}\
select{display:block;margin:8px 0}.error{color:#b00;font-weight:bold}";

fn preview_table(dataset: &Dataset) -> String {
    let mut html = String::from("<table id=\"dataset\">\n<tr>");
    if let Some(index) = dataset.index() {
        let _ = write!(html, "<th>{}</th>", escape_html(&index.name));
    }
    for name in dataset.column_names() {
        let _ = write!(html, "<th>{}</th>", escape_html(name));
    }
    html.push_str("</tr>\n");

    for (row, cells) in dataset.head(PREVIEW_ROWS).into_iter().enumerate() {
        html.push_str("<tr>");
        if let Some(index) = dataset.index() {
            let _ = write!(html, "<td>{}</td>", escape_html(&index.values[row].to_string()));
        }
        for cell in cells {
            let _ = write!(html, "<td>{}</td>", escape_html(&cell.to_string()));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</table>\n");
    html
}

fn column_select(id: &str, dataset: &Dataset, selected: Option<&str>) -> String {
    let mut html = format!("<select id=\"{}\">\n", id);
    for option in columns::options(dataset) {
        let marker = if Some(option.value.as_str()) == selected {
            " selected"
        } else {
            ""
        };
        let _ = writeln!(
            html,
            "<option value=\"{}\"{}>{}</option>",
            escape_html(&option.value),
            marker,
            escape_html(&option.label)
        );
    }
    html.push_str("</select>\n");
    html
}

fn kind_select(selected: Option<ChartKind>) -> String {
    let mut html = String::from("<select id=\"dropdown-plot-type\">\n");
    for kind in ChartKind::ALL {
        let marker = if Some(kind) == selected {
            " selected"
        } else {
            ""
        };
        let _ = writeln!(
            html,
            "<option value=\"{}\"{}>{}</option>",
            kind.tag(),
            marker,
            kind.label()
        );
    }
    html.push_str("</select>\n");
    html
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

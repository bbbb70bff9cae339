use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use sheetplot::parser::{parse_line, SessionCommand};
use sheetplot::render::PageContext;
use sheetplot::{
    build, decode, ChartKind, ChartRequest, RenderOptions, RenderResult, Rendered, Renderer,
    Session,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sheetplot")]
#[command(version, about = "Chart two columns of a CSV or Excel file", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one chart from a file and write it as an HTML page
    Render {
        /// CSV, XLS or XLSX file
        file: PathBuf,

        /// Column for the x axis
        #[arg(long)]
        x: String,

        /// Column for the y axis
        #[arg(long)]
        y: String,

        /// Chart kind: scatter, line, bar, sunburst, treemap or pie
        #[arg(long, default_value = "scatter")]
        kind: String,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Interactive session reading commands from stdin
    Session {
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// HTML output path (default: output.html)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Chart width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Chart height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// JSON file with render options
    #[arg(long)]
    config: Option<PathBuf>,
}

impl OutputArgs {
    fn resolve(&self) -> Result<RenderOptions> {
        let mut options = match &self.config {
            Some(path) => RenderOptions::from_json_file(path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))?,
            None => RenderOptions::default(),
        };
        if let Some(output) = &self.output {
            options.output_path = output.clone();
        }
        if let Some(width) = self.width {
            options.width = width;
        }
        if let Some(height) = self.height {
            options.height = height;
        }
        options.validate()?;
        Ok(options)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Render {
            file,
            x,
            y,
            kind,
            output,
        } => run_render(&file, x, y, &kind, output.resolve()?),
        Command::Session { output } => run_session(output.resolve()?),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_render(file: &Path, x: String, y: String, kind: &str, options: RenderOptions) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read '{}'", file.display()))?;
    let filename = file_name(file);
    let renderer = Renderer::new(options);

    let dataset = decode(&bytes, &filename);
    let result = match &dataset {
        Ok(ds) => RenderResult::from(
            kind.parse::<ChartKind>()
                .and_then(|kind| build(ds, &ChartRequest::new(x, y, kind))),
        ),
        Err(e) => RenderResult::Error(e.to_string()),
    };
    let rendered = renderer.render(&result);

    let path = renderer
        .write_page(&PageContext {
            dataset: dataset.as_ref().ok(),
            selection: None,
            output: Some(&rendered),
        })
        .context("Failed to write page")?;

    match rendered {
        Rendered::Chart { .. } => {
            info!(path = %path.display(), "chart written");
            println!("{}", path.display());
            Ok(())
        }
        Rendered::Error { message } => anyhow::bail!(message),
    }
}

fn run_session(options: RenderOptions) -> Result<()> {
    let mut session = Session::new(Renderer::new(options));
    info!(session = session.id(), "session started");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "sheetplot session {} (type 'help' for commands)", session.id())?;

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "error: {}", message)?;
                continue;
            }
        };

        match command {
            SessionCommand::Quit => break,
            SessionCommand::Help => writeln!(out, "{}", HELP)?,
            SessionCommand::Upload(path) => {
                let path = PathBuf::from(path);
                match std::fs::read(&path) {
                    Ok(bytes) => match session.upload(&bytes, &file_name(&path)) {
                        Ok(columns) => writeln!(out, "columns: {}", columns.join(", "))?,
                        Err(e) => writeln!(out, "error: {}", e)?,
                    },
                    Err(e) => writeln!(out, "error: cannot read '{}': {}", path.display(), e)?,
                }
            }
            SessionCommand::SelectX(column) => {
                let status = describe(session.select_x(column));
                writeln!(out, "{}", status)?;
            }
            SessionCommand::SelectY(column) => {
                let status = describe(session.select_y(column));
                writeln!(out, "{}", status)?;
            }
            SessionCommand::Kind(tag) => {
                let status = describe(session.select_kind_tag(&tag));
                writeln!(out, "{}", status)?;
            }
            SessionCommand::Columns => {
                writeln!(out, "columns: {}", session.columns().join(", "))?;
            }
            SessionCommand::Show => {
                let selection = session.selection();
                writeln!(
                    out,
                    "state: {:?}; x: {}; y: {}; kind: {}; {}",
                    session.state(),
                    selection.x.as_deref().unwrap_or("-"),
                    selection.y.as_deref().unwrap_or("-"),
                    selection.kind.map(|k| k.tag()).unwrap_or("-"),
                    describe(session.output())
                )?;
            }
            SessionCommand::Save(path) => {
                let result = match path {
                    Some(path) => {
                        let mut options = session.renderer().options().clone();
                        options.output_path = PathBuf::from(path);
                        let dataset = session.dataset();
                        Renderer::new(options).write_page(&PageContext {
                            dataset: dataset.as_deref(),
                            selection: Some(session.selection()),
                            output: session.output(),
                        })
                    }
                    None => session.save(),
                };
                match result {
                    Ok(path) => writeln!(out, "saved {}", path.display())?,
                    Err(e) => writeln!(out, "error: {}", e)?,
                }
            }
        }
        out.flush()?;
    }

    Ok(())
}

fn describe(output: Option<&Rendered>) -> String {
    match output {
        Some(Rendered::Chart { .. }) => "chart ready".to_string(),
        Some(Rendered::Error { message }) => format!("error: {}", message),
        None => "waiting for x, y and kind".to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

const HELP: &str = "commands:
  upload <file>     load a .csv, .xls or .xlsx file
  x <column>        choose the x-axis column
  y <column>        choose the y-axis column
  kind <kind>       scatter, line, bar, sunburst, treemap or pie
  columns           list the dataset's columns
  show              print the current selection
  save [path]       write the HTML page
  quit              leave the session";

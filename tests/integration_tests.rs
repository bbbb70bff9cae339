use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Helper function to run `sheetplot render` on a fixture and return the written page
fn run_render(file: &str, x: &str, y: &str, kind: &str) -> (Result<String, String>, String) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let page_path = dir.path().join("page.html");

    let output = Command::new(env!("CARGO_BIN_EXE_sheetplot"))
        .args(["render", file, "--x", x, "--y", y, "--kind", kind, "--output"])
        .arg(&page_path)
        .output()
        .expect("Failed to spawn process");

    let page = fs::read_to_string(&page_path).unwrap_or_default();
    if output.status.success() {
        (Ok(String::from_utf8_lossy(&output.stdout).to_string()), page)
    } else {
        (Err(String::from_utf8_lossy(&output.stderr).to_string()), page)
    }
}

/// The `<svg>...</svg>` part of a page, so assertions skip the preview table
fn svg_fragment(page: &str) -> &str {
    let start = page.find("<svg").expect("page has no svg");
    let end = page.rfind("</svg>").expect("svg is not closed");
    &page[start..end]
}

/// Helper function to drive `sheetplot session` with a script on stdin
fn run_session(script: &str, dir: &Path) -> String {
    let mut child = Command::new(env!("CARGO_BIN_EXE_sheetplot"))
        .args(["session", "--output"])
        .arg(dir.join("session.html"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn process");

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(script.as_bytes())
            .expect("Failed to write to stdin");
    }

    let output = child.wait_with_output().expect("Failed to wait for process");
    assert!(
        output.status.success(),
        "session failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_end_to_end_scatter_plot() {
    let (result, page) = run_render("test/sales.csv", "units", "revenue", "scatter");
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(result.unwrap().trim_end().ends_with("page.html"));
    assert!(page.contains("<svg"));
    assert!(page.contains("<h5>sales.csv</h5>"));
}

#[test]
fn test_end_to_end_line_chart_over_dates() {
    let (result, page) = run_render("test/timeseries.csv", "date", "temperature", "line");
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(page.contains("<svg"));
}

#[test]
fn test_end_to_end_bar_chart() {
    let (result, page) = run_render("test/sales.csv", "region", "units", "bar");
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    let svg = svg_fragment(&page);
    for region in ["North", "South", "East", "West"] {
        assert!(svg.contains(region), "bar chart is missing the {} label", region);
    }
}

#[test]
fn test_end_to_end_canvas_too_small() {
    let dir = TempDir::new().unwrap();
    let page_path = dir.path().join("page.html");

    let output = Command::new(env!("CARGO_BIN_EXE_sheetplot"))
        .args(["render", "test/sales.csv", "--x", "region", "--y", "revenue"])
        .args(["--kind", "pie", "--width", "0", "--height", "0", "--output"])
        .arg(&page_path)
        .output()
        .expect("Failed to spawn process");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("too small"), "stderr: {}", stderr);
    assert!(!page_path.exists());
}

#[test]
fn test_end_to_end_part_to_whole_charts() {
    for kind in ["pie", "sunburst", "treemap"] {
        let (result, page) = run_render("test/sales.csv", "region", "revenue", kind);
        assert!(result.is_ok(), "{} failed: {:?}", kind, result.err());
        assert!(page.contains("<svg"), "{} produced no chart", kind);
    }
}

#[test]
fn test_end_to_end_kind_is_case_insensitive() {
    let (result, _) = run_render("test/sales.csv", "region", "units", "Bar");
    assert!(result.is_ok(), "Failed: {:?}", result.err());
}

#[test]
fn test_end_to_end_unnamed_index_column() {
    let (result, page) = run_render("test/indexed.csv", "x", "y", "scatter");
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(!page.contains("Unnamed: 0</option>"));
    assert!(page.contains("<option value=\"x\">x</option>"));
}

#[test]
fn test_end_to_end_column_not_found() {
    let (result, page) = run_render("test/sales.csv", "region", "profit", "bar");
    let err = result.expect_err("missing column should fail");
    assert!(err.contains("profit"), "stderr: {}", err);
    assert!(page.contains("column not found: profit"));
    assert!(!page.contains("<svg"));
}

#[test]
fn test_end_to_end_unsupported_format() {
    let (result, page) = run_render("test/notes.txt", "region", "units", "bar");
    let err = result.expect_err("txt upload should fail");
    assert!(err.contains("notes.txt"), "stderr: {}", err);
    assert!(page.contains("class=\"error\""));
}

#[test]
fn test_end_to_end_unknown_kind() {
    let (result, _) = run_render("test/sales.csv", "region", "units", "histogram");
    let err = result.expect_err("unknown kind should fail");
    assert!(err.contains("histogram"), "stderr: {}", err);
}

#[test]
fn test_end_to_end_missing_file() {
    let (result, _) = run_render("test/does_not_exist.csv", "a", "b", "bar");
    assert!(result.is_err());
}

#[test]
fn test_session_builds_chart_after_all_selections() {
    let dir = TempDir::new().unwrap();
    let script = "upload test/sales.csv\nx region\nshow\ny units\nkind bar\nsave\nquit\n";
    let stdout = run_session(script, dir.path());

    assert!(stdout.contains("columns: region, units, revenue"), "{}", stdout);
    assert!(stdout.contains("waiting for x, y and kind"), "{}", stdout);
    assert!(stdout.contains("chart ready"), "{}", stdout);

    let page = fs::read_to_string(dir.path().join("session.html")).unwrap();
    assert!(page.contains("<svg"));
    assert!(page.contains("<option value=\"region\" selected>region</option>"));
    assert!(page.contains("<option value=\"bar\" selected>Bar Plot</option>"));
}

#[test]
fn test_session_reports_errors_and_keeps_going() {
    let dir = TempDir::new().unwrap();
    let other = dir.path().join("other.html");
    let script = format!(
        "upload test/notes.txt\nplot everything\nupload test/sales.csv\nx region\ny nope\nkind pie\nsave \"{}\"\n",
        other.display()
    );
    let stdout = run_session(&script, dir.path());

    assert!(stdout.contains("error: unsupported file format"), "{}", stdout);
    assert!(stdout.contains("could not understand 'plot everything'"), "{}", stdout);
    assert!(stdout.contains("error: column not found: nope"), "{}", stdout);
    assert!(stdout.contains("saved "), "{}", stdout);

    let page = fs::read_to_string(&other).unwrap();
    assert!(page.contains("column not found: nope"));
    assert!(!dir.path().join("session.html").exists());
}

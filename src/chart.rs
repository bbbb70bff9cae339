//! Chart dispatch: two column names and a [`ChartKind`] become a [`Chart`].
//!
//! [`build`] is a pure function of the dataset and the request, so it can be
//! shared by every session without synchronisation.

use crate::data::{Column, ColumnType, Dataset, Value};
use crate::error::{DashError, Result};
use crate::graph::{BarStyle, LineStyle, PointStyle};
use crate::palette;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Scatter,
    Line,
    Bar,
    Sunburst,
    Treemap,
    Pie,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Scatter,
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::Sunburst,
        ChartKind::Treemap,
        ChartKind::Pie,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ChartKind::Scatter => "scatter",
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Sunburst => "sunburst",
            ChartKind::Treemap => "treemap",
            ChartKind::Pie => "pie",
        }
    }

    /// Label shown in the chart-type dropdown.
    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Scatter => "Scatter Plot",
            ChartKind::Line => "Line Plot",
            ChartKind::Bar => "Bar Plot",
            ChartKind::Sunburst => "Sunburst Plot",
            ChartKind::Treemap => "Treemap",
            ChartKind::Pie => "Pie Chart",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ChartKind {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.tag().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DashError::UnsupportedChartKind(wanted.to_string()))
    }
}

/// What the user asked to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub x: String,
    pub y: String,
    pub kind: ChartKind,
}

impl ChartRequest {
    pub fn new(x: impl Into<String>, y: impl Into<String>, kind: ChartKind) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            kind,
        }
    }
}

/// The dropdown state of one session; a request exists once all three are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub x: Option<String>,
    pub y: Option<String>,
    pub kind: Option<ChartKind>,
}

impl Selection {
    pub fn request(&self) -> Option<ChartRequest> {
        Some(ChartRequest::new(
            self.x.clone()?,
            self.y.clone()?,
            self.kind?,
        ))
    }
}

/// A labelled slice of a part-of-whole chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub label: String,
    pub value: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Encoding {
    Points {
        points: Vec<(Value, Value)>,
        style: PointStyle,
    },
    Line {
        points: Vec<(Value, Value)>,
        style: LineStyle,
    },
    Bars {
        categories: Vec<Value>,
        heights: Vec<f64>,
        style: BarStyle,
    },
    Sunburst {
        segments: Vec<Segment>,
    },
    Treemap {
        segments: Vec<Segment>,
    },
    Pie {
        segments: Vec<Segment>,
    },
}

/// A renderable description of one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub kind: ChartKind,
    pub x_title: String,
    pub y_title: String,
    pub encoding: Encoding,
}

/// Validate the request against `dataset` and encode the chosen columns.
pub fn build(dataset: &Dataset, request: &ChartRequest) -> Result<Chart> {
    let (x, y) = resolve_columns(dataset, request)?;

    let rows: Vec<(&Value, &Value)> = x
        .values
        .iter()
        .zip(&y.values)
        .filter(|(a, b)| !a.is_empty() && !b.is_empty())
        .collect();

    if rows.is_empty() {
        return Err(DashError::ChartConstruction(format!(
            "no rows have values in both '{}' and '{}'",
            x.name, y.name
        )));
    }

    let encoding = match request.kind {
        ChartKind::Scatter => Encoding::Points {
            points: owned_pairs(&rows),
            style: PointStyle::scatter(),
        },
        ChartKind::Line => Encoding::Line {
            points: owned_pairs(&rows),
            style: LineStyle::spline(),
        },
        ChartKind::Bar => {
            require_numeric(y, "bar heights")?;
            Encoding::Bars {
                categories: rows.iter().map(|(c, _)| (*c).clone()).collect(),
                heights: rows.iter().filter_map(|(_, h)| h.as_f64()).collect(),
                style: BarStyle::default(),
            }
        }
        ChartKind::Sunburst => Encoding::Sunburst {
            segments: aggregate(&rows, y, "sunburst arc sizes")?,
        },
        ChartKind::Treemap => Encoding::Treemap {
            segments: aggregate(&rows, y, "treemap areas")?,
        },
        ChartKind::Pie => Encoding::Pie {
            segments: aggregate(&rows, y, "pie wedge sizes")?,
        },
    };

    debug!(kind = %request.kind, x = %x.name, y = %y.name, rows = rows.len(), "built chart");

    Ok(Chart {
        kind: request.kind,
        x_title: x.name.clone(),
        y_title: y.name.clone(),
        encoding,
    })
}

fn resolve_columns<'a>(
    dataset: &'a Dataset,
    request: &ChartRequest,
) -> Result<(&'a Column, &'a Column)> {
    let x = dataset.column(&request.x);
    let y = dataset.column(&request.y);

    match (x, y) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => {
            let mut missing = Vec::new();
            if x.is_none() {
                missing.push(request.x.clone());
            }
            if y.is_none() && !(x.is_none() && request.x == request.y) {
                missing.push(request.y.clone());
            }
            Err(DashError::ColumnNotFound(missing))
        }
    }
}

fn owned_pairs(rows: &[(&Value, &Value)]) -> Vec<(Value, Value)> {
    rows.iter().map(|(a, b)| ((*a).clone(), (*b).clone())).collect()
}

fn require_numeric(column: &Column, purpose: &str) -> Result<()> {
    if column.kind == ColumnType::Numeric {
        Ok(())
    } else {
        Err(DashError::ChartConstruction(format!(
            "{} need a numeric column, but '{}' holds {} values",
            purpose, column.name, column.kind
        )))
    }
}

/// Sum `y` per distinct `x` label, in order of first appearance.
fn aggregate(rows: &[(&Value, &Value)], y: &Column, purpose: &str) -> Result<Vec<Segment>> {
    require_numeric(y, purpose)?;

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut sums: Vec<(String, f64)> = Vec::new();

    for (label, value) in rows {
        let value = value.as_f64().unwrap_or(0.0);
        if !value.is_finite() || value < 0.0 {
            return Err(DashError::ChartConstruction(format!(
                "{} must be non-negative numbers, found {} in '{}'",
                purpose, value, y.name
            )));
        }

        let label = label.to_string();
        match positions.get(&label) {
            Some(&i) => sums[i].1 += value,
            None => {
                positions.insert(label.clone(), sums.len());
                sums.push((label, value));
            }
        }
    }

    let total: f64 = sums.iter().map(|(_, v)| v).sum();
    if !total.is_finite() {
        return Err(DashError::ChartConstruction(format!(
            "{} in '{}' are too large to add up",
            purpose, y.name
        )));
    }

    if sums.iter().all(|(_, v)| *v == 0.0) {
        return Err(DashError::ChartConstruction(format!(
            "{} sum to zero in '{}'",
            purpose, y.name
        )));
    }

    Ok(sums
        .into_iter()
        .enumerate()
        .map(|(i, (label, value))| Segment {
            label,
            value,
            color: palette::categorical(i),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;

    fn sample() -> Dataset {
        decode(b"a,b\n1,10\n2,20\n3,30", "sample.csv").unwrap()
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("bar".parse::<ChartKind>().unwrap(), ChartKind::Bar);
        assert_eq!(" Pie ".parse::<ChartKind>().unwrap(), ChartKind::Pie);
        let err = "histogram".parse::<ChartKind>().unwrap_err();
        assert!(matches!(err, DashError::UnsupportedChartKind(tag) if tag == "histogram"));
    }

    #[test]
    fn test_selection_request_needs_all_fields() {
        let mut selection = Selection::default();
        assert!(selection.request().is_none());
        selection.x = Some("a".into());
        selection.y = Some("b".into());
        assert!(selection.request().is_none());
        selection.kind = Some(ChartKind::Line);
        assert_eq!(selection.request(), Some(ChartRequest::new("a", "b", ChartKind::Line)));
    }

    #[test]
    fn test_bar_scenario() {
        let chart = build(&sample(), &ChartRequest::new("a", "b", ChartKind::Bar)).unwrap();
        assert_eq!(chart.x_title, "a");
        assert_eq!(chart.y_title, "b");
        match chart.encoding {
            Encoding::Bars {
                categories,
                heights,
                style,
            } => {
                assert_eq!(
                    categories,
                    vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]
                );
                assert_eq!(heights, vec![10.0, 20.0, 30.0]);
                assert_eq!(style.color, palette::BAR_FILL);
            }
            other => panic!("expected bars, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_column_scenario() {
        let err = build(&sample(), &ChartRequest::new("a", "c", ChartKind::Bar)).unwrap_err();
        match err {
            DashError::ColumnNotFound(names) => assert_eq!(names, vec!["c"]),
            other => panic!("expected ColumnNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_both_columns_missing_are_reported() {
        let err = build(&sample(), &ChartRequest::new("p", "q", ChartKind::Line)).unwrap_err();
        assert!(matches!(err, DashError::ColumnNotFound(names) if names == vec!["p", "q"]));
    }

    #[test]
    fn test_scatter_keeps_row_pairs() {
        let chart = build(&sample(), &ChartRequest::new("a", "b", ChartKind::Scatter)).unwrap();
        match chart.encoding {
            Encoding::Points { points, style } => {
                assert_eq!(points.len(), 3);
                assert_eq!(points[1], (Value::Number(2.0), Value::Number(20.0)));
                assert_eq!(style.size, 10.0);
                assert_eq!(style.alpha, 0.7);
            }
            other => panic!("expected points, got {:?}", other),
        }
    }

    #[test]
    fn test_line_keeps_row_order() {
        let ds = decode(b"t,v\n3,1\n1,2\n2,3\n", "t.csv").unwrap();
        let chart = build(&ds, &ChartRequest::new("t", "v", ChartKind::Line)).unwrap();
        match chart.encoding {
            Encoding::Line { points, style } => {
                let xs: Vec<String> = points.iter().map(|(x, _)| x.to_string()).collect();
                assert_eq!(xs, vec!["3", "1", "2"]);
                assert!(style.smooth);
                assert_eq!(style.width, 3.0);
            }
            other => panic!("expected line, got {:?}", other),
        }
    }

    #[test]
    fn test_pie_groups_by_category_with_palette() {
        let ds = decode(
            b"fruit,n\napple,1\npear,2\napple,3\nfig,4\nkiwi,5\n",
            "fruit.csv",
        )
        .unwrap();
        let chart = build(&ds, &ChartRequest::new("fruit", "n", ChartKind::Pie)).unwrap();
        match chart.encoding {
            Encoding::Pie { segments } => {
                assert_eq!(segments.len(), 4);
                let labels: Vec<&str> = segments.iter().map(|s| s.label.as_str()).collect();
                assert_eq!(labels, vec!["apple", "pear", "fig", "kiwi"]);
                assert_eq!(segments[0].value, 4.0);
                for (i, segment) in segments.iter().enumerate() {
                    assert_eq!(segment.color, palette::CATEGORICAL[i]);
                }
            }
            other => panic!("expected pie, got {:?}", other),
        }
    }

    #[test]
    fn test_pie_palette_repeats_after_fifteen() {
        let mut csv = String::from("k,v\n");
        for i in 0..17 {
            csv.push_str(&format!("cat{},1\n", i));
        }
        let ds = decode(csv.as_bytes(), "many.csv").unwrap();
        let chart = build(&ds, &ChartRequest::new("k", "v", ChartKind::Pie)).unwrap();
        let Encoding::Pie { segments } = chart.encoding else {
            panic!("expected pie");
        };
        assert_eq!(segments.len(), 17);
        assert_eq!(segments[15].color, palette::CATEGORICAL[0]);
        assert_eq!(segments[16].color, palette::CATEGORICAL[1]);
    }

    #[test]
    fn test_sunburst_and_treemap_sum_values() {
        let ds = decode(b"g,v\na,1\nb,2\na,5\n", "g.csv").unwrap();
        for kind in [ChartKind::Sunburst, ChartKind::Treemap] {
            let chart = build(&ds, &ChartRequest::new("g", "v", kind)).unwrap();
            let segments = match chart.encoding {
                Encoding::Sunburst { segments } | Encoding::Treemap { segments } => segments,
                other => panic!("unexpected encoding {:?}", other),
            };
            let values: Vec<f64> = segments.iter().map(|s| s.value).collect();
            assert_eq!(values, vec![6.0, 2.0]);
        }
    }

    #[test]
    fn test_text_heights_are_construction_errors() {
        let ds = decode(b"a,b\n1,x\n2,y\n", "t.csv").unwrap();
        for kind in [ChartKind::Bar, ChartKind::Pie, ChartKind::Sunburst, ChartKind::Treemap] {
            let err = build(&ds, &ChartRequest::new("a", "b", kind)).unwrap_err();
            assert!(matches!(err, DashError::ChartConstruction(_)), "{kind}: {err:?}");
        }
    }

    #[test]
    fn test_text_axes_are_fine_for_scatter() {
        let ds = decode(b"a,b\n1,x\n2,y\n", "t.csv").unwrap();
        assert!(build(&ds, &ChartRequest::new("a", "b", ChartKind::Scatter)).is_ok());
    }

    #[test]
    fn test_negative_pie_values_rejected() {
        let ds = decode(b"a,b\nx,-1\ny,2\n", "t.csv").unwrap();
        let err = build(&ds, &ChartRequest::new("a", "b", ChartKind::Pie)).unwrap_err();
        assert!(matches!(err, DashError::ChartConstruction(_)));
    }

    #[test]
    fn test_overflowing_part_sizes_rejected() {
        let ds = decode(b"a,b\nx,1e308\ny,1e308\n", "t.csv").unwrap();
        for kind in [ChartKind::Pie, ChartKind::Sunburst, ChartKind::Treemap] {
            let err = build(&ds, &ChartRequest::new("a", "b", kind)).unwrap_err();
            assert!(matches!(err, DashError::ChartConstruction(_)), "{kind}: {err:?}");
        }
    }

    #[test]
    fn test_empty_cells_are_skipped() {
        let ds = decode(b"a,b\n1,\n2,5\n,7\n", "t.csv").unwrap();
        let chart = build(&ds, &ChartRequest::new("a", "b", ChartKind::Bar)).unwrap();
        let Encoding::Bars { heights, .. } = chart.encoding else {
            panic!("expected bars");
        };
        assert_eq!(heights, vec![5.0]);
    }

    #[test]
    fn test_no_usable_rows() {
        let ds = decode(b"a,b\n1,\n", "t.csv").unwrap();
        let err = build(&ds, &ChartRequest::new("a", "b", ChartKind::Scatter)).unwrap_err();
        assert!(matches!(err, DashError::ChartConstruction(_)));
    }
}

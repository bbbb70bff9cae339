use crate::data::Value;
use chrono::DateTime;
use std::collections::HashSet;
use std::ops::Range;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// How one axis maps cell values onto chart coordinates.
///
/// The kind is inferred from the values actually plotted: all numbers give a
/// continuous axis, all dates a temporal one (days since the Unix epoch),
/// anything else is categorical with one slot per distinct label.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisScale {
    Continuous { min: f64, max: f64 },
    Temporal { min: f64, max: f64 },
    Categorical { categories: Vec<String> },
}

impl AxisScale {
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value> + Clone) -> Self {
        let all = |pred: fn(&Value) -> bool| values.clone().into_iter().all(pred);

        if all(|v| matches!(v, Value::Number(_))) {
            let (min, max) = min_max(values.into_iter().filter_map(Value::as_f64));
            AxisScale::Continuous { min, max }
        } else if all(|v| matches!(v, Value::Date(_))) {
            let (min, max) = min_max(values.into_iter().filter_map(days_since_epoch));
            AxisScale::Temporal { min, max }
        } else {
            AxisScale::categorical(values)
        }
    }

    /// One slot per distinct display label, in first-appearance order.
    pub fn categorical<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut seen = HashSet::new();
        let categories = values
            .into_iter()
            .map(Value::to_string)
            .filter(|label| seen.insert(label.clone()))
            .collect();
        AxisScale::Categorical { categories }
    }

    /// Continuous axis spanning `values` and zero, for bar heights.
    pub fn continuous_from_zero(values: &[f64]) -> Self {
        let (min, max) = min_max(values.iter().copied().chain(std::iter::once(0.0)));
        AxisScale::Continuous { min, max }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, AxisScale::Categorical { .. })
    }

    /// Coordinate of a value on this axis.
    pub fn position(&self, value: &Value) -> Option<f64> {
        match self {
            AxisScale::Continuous { .. } => value.as_f64(),
            AxisScale::Temporal { .. } => days_since_epoch(value),
            AxisScale::Categorical { categories } => {
                let label = value.to_string();
                categories.iter().position(|c| *c == label).map(|i| i as f64)
            }
        }
    }

    /// Padded coordinate range for the chart.
    pub fn range(&self) -> Range<f64> {
        match self {
            AxisScale::Continuous { min, max } | AxisScale::Temporal { min, max } => {
                padded(*min, *max)
            }
            AxisScale::Categorical { categories } => -0.5..(categories.len() as f64 - 0.5),
        }
    }

    /// Width of [`AxisScale::range`]; infinite when the values are too far apart.
    pub fn span(&self) -> f64 {
        let range = self.range();
        range.end - range.start
    }

    /// Number of tick labels to ask the mesh for.
    pub fn label_count(&self) -> usize {
        match self {
            AxisScale::Categorical { categories } => categories.len().max(1),
            _ => 10,
        }
    }

    pub fn label(&self, position: f64) -> String {
        match self {
            AxisScale::Continuous { .. } => format_number(position),
            AxisScale::Temporal { .. } => {
                DateTime::from_timestamp((position * SECONDS_PER_DAY).round() as i64, 0)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default()
            }
            AxisScale::Categorical { categories } => {
                // Only whole positions carry a category.
                let slot = position.round();
                if (position - slot).abs() > 1e-6 || slot < 0.0 {
                    return String::new();
                }
                categories
                    .get(slot as usize)
                    .cloned()
                    .unwrap_or_default()
            }
        }
    }
}

fn days_since_epoch(value: &Value) -> Option<f64> {
    match value {
        Value::Date(d) => Some(d.and_utc().timestamp() as f64 / SECONDS_PER_DAY),
        _ => None,
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        (0.0, 1.0)
    } else {
        (min, max)
    }
}

/// Widen `min..max` by 5% on each side, saturating at the largest finite values.
fn padded(min: f64, max: f64) -> Range<f64> {
    let padding = if min == max {
        1.0
    } else {
        // halves first so the difference cannot overflow
        (max / 2.0 - min / 2.0) * 0.1
    };
    (min - padding).max(f64::MIN)..(max + padding).min(f64::MAX)
}

fn format_number(n: f64) -> String {
    if n.fract().abs() < 1e-9 && n.abs() < 1e15 {
        format!("{}", n.round() as i64)
    } else {
        let text = format!("{:.3}", n);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

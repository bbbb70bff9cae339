use crate::chart::{Chart, Encoding, Segment};
use crate::data::Value;
use crate::palette::{self, parse_color};
use crate::scale::AxisScale;
use crate::MIN_CANVAS_SIZE;
use anyhow::{ensure, Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::cmp::Ordering;
use std::f64::consts::PI;

/// Style configuration for line charts
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
    pub smooth: bool,
}

impl LineStyle {
    pub fn spline() -> Self {
        Self {
            color: palette::SERIES.to_string(),
            width: 3.0,
            smooth: true,
        }
    }
}

/// Style configuration for scatter markers
#[derive(Debug, Clone, PartialEq)]
pub struct PointStyle {
    pub color: String,
    /// Marker diameter in pixels.
    pub size: f64,
    pub alpha: f64,
    pub outline_color: String,
    pub outline_width: f64,
}

impl PointStyle {
    pub fn scatter() -> Self {
        Self {
            color: palette::SERIES.to_string(),
            size: 10.0,
            alpha: 0.7,
            outline_color: palette::OUTLINE.to_string(),
            outline_width: 0.5,
        }
    }
}

/// Style configuration for bar charts
#[derive(Debug, Clone, PartialEq)]
pub struct BarStyle {
    pub color: String,
    pub alpha: f64,
    /// Bar width as a fraction of one category slot.
    pub width: f64,
}

impl Default for BarStyle {
    fn default() -> Self {
        Self {
            color: palette::BAR_FILL.to_string(),
            alpha: 1.0,
            width: 0.8,
        }
    }
}

type SvgArea<'a> = DrawingArea<SVGBackend<'a>, Shift>;

/// Marks for the cartesian chart kinds, already mapped to coordinates.
enum Marks<'a> {
    Points(Vec<(f64, f64)>, &'a PointStyle),
    Line(Vec<(f64, f64)>, &'a LineStyle),
    Bars(Vec<(f64, f64)>, &'a BarStyle),
}

/// SVG canvas a single chart is drawn onto
pub struct Canvas {
    width: u32,
    height: u32,
    title: Option<String>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, title: Option<String>) -> Self {
        Canvas {
            width,
            height,
            title,
        }
    }

    /// Draw `chart` and return the SVG document.
    pub fn draw(&self, chart: &Chart) -> Result<String> {
        ensure!(
            self.width >= MIN_CANVAS_SIZE && self.height >= MIN_CANVAS_SIZE,
            "canvas {}x{} is smaller than the {}x{} minimum",
            self.width,
            self.height,
            MIN_CANVAS_SIZE,
            MIN_CANVAS_SIZE
        );

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height))
                .into_drawing_area();
            root.fill(&WHITE).context("Failed to fill background")?;

            match &chart.encoding {
                Encoding::Points { points, style } => {
                    let (x_scale, y_scale, coords) = map_points(points);
                    let marks = Marks::Points(coords, style);
                    self.draw_cartesian(&root, chart, &x_scale, &y_scale, marks)?;
                }
                Encoding::Line { points, style } => {
                    let (x_scale, y_scale, coords) = map_points(points);
                    let marks = Marks::Line(coords, style);
                    self.draw_cartesian(&root, chart, &x_scale, &y_scale, marks)?;
                }
                Encoding::Bars {
                    categories,
                    heights,
                    style,
                } => {
                    let x_scale = AxisScale::categorical(categories);
                    let y_scale = AxisScale::continuous_from_zero(heights);
                    let coords = categories
                        .iter()
                        .zip(heights)
                        .filter_map(|(c, &h)| Some((x_scale.position(c)?, h)))
                        .collect();
                    let marks = Marks::Bars(coords, style);
                    self.draw_cartesian(&root, chart, &x_scale, &y_scale, marks)?;
                }
                Encoding::Sunburst { segments } => {
                    self.draw_radial(&root, chart, segments, 0.35)?;
                }
                Encoding::Pie { segments } => {
                    self.draw_radial(&root, chart, segments, 0.0)?;
                }
                Encoding::Treemap { segments } => {
                    self.draw_treemap(&root, chart, segments)?;
                }
            }

            root.present().context("Failed to present drawing")?;
        }
        Ok(svg)
    }

    fn caption(&self, chart: &Chart) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("{} by {}", chart.y_title, chart.x_title))
    }

    fn draw_cartesian(
        &self,
        root: &SvgArea,
        chart: &Chart,
        x_scale: &AxisScale,
        y_scale: &AxisScale,
        marks: Marks,
    ) -> Result<()> {
        // plotters cannot place ticks on an infinite span
        ensure!(
            x_scale.span().is_finite(),
            "values in '{}' span too wide a range to plot",
            chart.x_title
        );
        ensure!(
            y_scale.span().is_finite(),
            "values in '{}' span too wide a range to plot",
            chart.y_title
        );

        let mut builder = ChartBuilder::on(root);
        builder.margin(10).x_label_area_size(40).y_label_area_size(60);
        if let Some(title) = &self.title {
            builder.caption(title, ("sans-serif", 20));
        }
        let mut ctx = builder
            .build_cartesian_2d(x_scale.range(), y_scale.range())
            .context("Failed to build chart")?;

        let x_formatter = |v: &f64| x_scale.label(*v);
        let y_formatter = |v: &f64| y_scale.label(*v);
        ctx.configure_mesh()
            .x_labels(x_scale.label_count())
            .y_labels(y_scale.label_count())
            .x_label_formatter(&x_formatter)
            .y_label_formatter(&y_formatter)
            .x_desc(chart.x_title.as_str())
            .y_desc(chart.y_title.as_str())
            .draw()
            .context("Failed to draw mesh")?;

        match marks {
            Marks::Points(coords, style) => {
                let radius = (style.size / 2.0).round() as i32;
                let fill = parse_color(&style.color).mix(style.alpha).filled();
                let outline = parse_color(&style.outline_color)
                    .stroke_width(style.outline_width.ceil() as u32);
                ctx.draw_series(coords.iter().map(|&p| Circle::new(p, radius, fill)))
                    .context("Failed to draw point series")?;
                ctx.draw_series(coords.iter().map(|&p| Circle::new(p, radius, outline)))
                    .context("Failed to draw point outlines")?;
            }
            Marks::Line(coords, style) => {
                let path = if style.smooth {
                    catmull_rom(&coords, 8)
                } else {
                    coords
                };
                let stroke = parse_color(&style.color).stroke_width(style.width.round() as u32);
                ctx.draw_series(LineSeries::new(path, stroke))
                    .context("Failed to draw line series")?;
            }
            Marks::Bars(bars, style) => {
                let fill = parse_color(&style.color).mix(style.alpha).filled();
                let half = style.width / 2.0;
                ctx.draw_series(bars.iter().map(|&(x, h)| {
                    Rectangle::new([(x - half, 0.0), (x + half, h)], fill)
                }))
                .context("Failed to draw bars")?;
            }
        }

        Ok(())
    }

    /// Pie (no hole) and sunburst (ring around a labelled centre).
    fn draw_radial(
        &self,
        root: &SvgArea,
        chart: &Chart,
        segments: &[Segment],
        hole: f64,
    ) -> Result<()> {
        let area = root
            .titled(&self.caption(chart), ("sans-serif", 20))
            .context("Failed to draw caption")?;
        let (w, h) = area.dim_in_pixel();
        let center = (w as f64 / 2.0, h as f64 / 2.0);
        let outer = w.min(h) as f64 * 0.4;
        let inner = outer * hole;
        let total: f64 = segments.iter().map(|s| s.value).sum();
        ensure!(
            total.is_finite() && total > 0.0,
            "segment sizes in '{}' do not add up to a finite positive total",
            chart.y_title
        );
        let label_style = ("sans-serif", 13)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Center));

        let mut start = -PI / 2.0;
        for segment in segments {
            let sweep = segment.value / total * 2.0 * PI;
            if sweep <= 0.0 {
                continue;
            }
            let end = start + sweep;

            let outline = ring_sector(center, inner, outer, start, end);
            area.draw(&Polygon::new(outline.clone(), parse_color(segment.color).filled()))
                .context("Failed to draw segment")?;
            let mut closed = outline;
            if let Some(&first) = closed.first() {
                closed.push(first);
            }
            area.draw(&PathElement::new(closed, WHITE.stroke_width(1)))
                .context("Failed to draw segment border")?;

            if sweep > 0.2 {
                let mid = (start + end) / 2.0;
                let r = if hole > 0.0 {
                    (inner + outer) / 2.0
                } else {
                    outer * 0.65
                };
                let pos = polar(center, r, mid);
                let text = if hole > 0.0 {
                    segment.label.clone()
                } else {
                    format!("{} ({:.1}%)", segment.label, segment.value / total * 100.0)
                };
                area.draw(&Text::new(text, pos, label_style.clone()))
                    .context("Failed to draw segment label")?;
            }

            start = end;
        }

        if hole > 0.0 {
            let pos = (center.0.round() as i32, center.1.round() as i32);
            area.draw(&Text::new(chart.y_title.clone(), pos, label_style))
                .context("Failed to draw centre label")?;
        }

        Ok(())
    }

    fn draw_treemap(&self, root: &SvgArea, chart: &Chart, segments: &[Segment]) -> Result<()> {
        let area = root
            .titled(&self.caption(chart), ("sans-serif", 20))
            .context("Failed to draw caption")?;
        let (w, h) = area.dim_in_pixel();
        let bounds = Rect {
            x: 4.0,
            y: 4.0,
            w: (w as f64 - 8.0).max(0.0),
            h: (h as f64 - 8.0).max(0.0),
        };
        let values: Vec<f64> = segments.iter().map(|s| s.value).collect();
        ensure!(
            values.iter().sum::<f64>().is_finite(),
            "treemap areas in '{}' do not add up to a finite total",
            chart.y_title
        );
        let label_style = ("sans-serif", 13)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Left, VPos::Top));

        for (segment, rect) in segments.iter().zip(squarify(&values, bounds)) {
            if rect.w <= 0.0 || rect.h <= 0.0 {
                continue;
            }
            let corners = rect.corners();
            area.draw(&Rectangle::new(corners, parse_color(segment.color).filled()))
                .context("Failed to draw treemap cell")?;
            area.draw(&Rectangle::new(corners, WHITE.stroke_width(2)))
                .context("Failed to draw treemap border")?;
            if rect.w > 40.0 && rect.h > 20.0 {
                let pos = (corners[0].0 + 6, corners[0].1 + 6);
                area.draw(&Text::new(segment.label.clone(), pos, label_style.clone()))
                    .context("Failed to draw treemap label")?;
            }
        }

        Ok(())
    }
}

fn map_points(points: &[(Value, Value)]) -> (AxisScale, AxisScale, Vec<(f64, f64)>) {
    let x_scale = AxisScale::infer(points.iter().map(|(x, _)| x));
    let y_scale = AxisScale::infer(points.iter().map(|(_, y)| y));
    let coords = points
        .iter()
        .filter_map(|(x, y)| Some((x_scale.position(x)?, y_scale.position(y)?)))
        .collect();
    (x_scale, y_scale, coords)
}

fn polar(center: (f64, f64), r: f64, angle: f64) -> (i32, i32) {
    (
        (center.0 + r * angle.cos()).round() as i32,
        (center.1 + r * angle.sin()).round() as i32,
    )
}

/// Outline of an annulus sector; with `inner == 0` this is a pie wedge.
fn ring_sector(
    center: (f64, f64),
    inner: f64,
    outer: f64,
    start: f64,
    end: f64,
) -> Vec<(i32, i32)> {
    let steps = (((end - start) / (PI / 90.0)).ceil() as usize).max(2);
    let angle = |i: usize| start + (end - start) * i as f64 / steps as f64;

    let mut points: Vec<(i32, i32)> = (0..=steps).map(|i| polar(center, outer, angle(i))).collect();
    if inner > 0.0 {
        points.extend((0..=steps).rev().map(|i| polar(center, inner, angle(i))));
    } else {
        points.push((center.0.round() as i32, center.1.round() as i32));
    }
    points
}

/// Catmull-Rom interpolation through `points`, `segments` sub-steps per span.
pub fn catmull_rom(points: &[(f64, f64)], segments: usize) -> Vec<(f64, f64)> {
    if points.len() < 3 || segments < 2 {
        return points.to_vec();
    }

    let at = |i: isize| points[i.clamp(0, points.len() as isize - 1) as usize];
    let mut out = Vec::with_capacity((points.len() - 1) * segments + 1);

    for i in 0..points.len() as isize - 1 {
        let (p0, p1, p2, p3) = (at(i - 1), at(i), at(i + 1), at(i + 2));
        for step in 0..segments {
            let t = step as f64 / segments as f64;
            let (t2, t3) = (t * t, t * t * t);
            let blend = |a: f64, b: f64, c: f64, d: f64| {
                0.5 * (2.0 * b
                    + (-a + c) * t
                    + (2.0 * a - 5.0 * b + 4.0 * c - d) * t2
                    + (-a + 3.0 * b - 3.0 * c + d) * t3)
            };
            out.push((blend(p0.0, p1.0, p2.0, p3.0), blend(p0.1, p1.1, p2.1, p3.1)));
        }
    }
    out.push(points[points.len() - 1]);
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    fn corners(&self) -> [(i32, i32); 2] {
        [
            (self.x.round() as i32, self.y.round() as i32),
            ((self.x + self.w).round() as i32, (self.y + self.h).round() as i32),
        ]
    }
}

/// Squarified treemap layout. The result is index-aligned with `values`;
/// non-positive values get an empty rectangle.
pub fn squarify(values: &[f64], bounds: Rect) -> Vec<Rect> {
    let mut out = vec![Rect::default(); values.len()];
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    if total <= 0.0 || bounds.w <= 0.0 || bounds.h <= 0.0 {
        return out;
    }

    let scale = bounds.w * bounds.h / total;
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| values[i] > 0.0).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));
    let areas: Vec<(usize, f64)> = order.into_iter().map(|i| (i, values[i] * scale)).collect();

    let mut remaining = bounds;
    let mut row: Vec<(usize, f64)> = Vec::new();
    for &item in &areas {
        let side = remaining.w.min(remaining.h);
        let mut candidate = row.clone();
        candidate.push(item);
        if row.is_empty() || worst_ratio(&candidate, side) <= worst_ratio(&row, side) {
            row = candidate;
        } else {
            remaining = layout_row(&row, remaining, &mut out);
            row = vec![item];
        }
    }
    if !row.is_empty() {
        layout_row(&row, remaining, &mut out);
    }

    out
}

fn worst_ratio(row: &[(usize, f64)], side: f64) -> f64 {
    let sum: f64 = row.iter().map(|(_, a)| a).sum();
    let max = row.iter().map(|(_, a)| *a).fold(f64::NEG_INFINITY, f64::max);
    let min = row.iter().map(|(_, a)| *a).fold(f64::INFINITY, f64::min);
    let (sum2, side2) = (sum * sum, side * side);
    f64::max(side2 * max / sum2, sum2 / (side2 * min))
}

/// Place `row` along the shorter side of `bounds`, returning the leftover space.
fn layout_row(row: &[(usize, f64)], bounds: Rect, out: &mut [Rect]) -> Rect {
    let sum: f64 = row.iter().map(|(_, a)| a).sum();

    if bounds.w >= bounds.h {
        let column_w = sum / bounds.h;
        let mut y = bounds.y;
        for &(i, area) in row {
            let h = area / column_w;
            out[i] = Rect {
                x: bounds.x,
                y,
                w: column_w,
                h,
            };
            y += h;
        }
        Rect {
            x: bounds.x + column_w,
            w: bounds.w - column_w,
            ..bounds
        }
    } else {
        let row_h = sum / bounds.w;
        let mut x = bounds.x;
        for &(i, area) in row {
            let w = area / row_h;
            out[i] = Rect {
                x,
                y: bounds.y,
                w,
                h: row_h,
            };
            x += w;
        }
        Rect {
            y: bounds.y + row_h,
            h: bounds.h - row_h,
            ..bounds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{build, ChartKind, ChartRequest};
    use crate::decode::decode;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * b.abs().max(1.0)
    }

    #[test]
    fn test_squarify_fills_bounds_proportionally() {
        let bounds = Rect {
            x: 0.0,
            y: 0.0,
            w: 600.0,
            h: 400.0,
        };
        let values = [6.0, 6.0, 4.0, 3.0, 2.0, 2.0, 1.0];
        let rects = squarify(&values, bounds);
        let total: f64 = values.iter().sum();

        let covered: f64 = rects.iter().map(|r| r.w * r.h).sum();
        assert!(approx(covered, 600.0 * 400.0));
        for (value, rect) in values.iter().zip(&rects) {
            assert!(approx(rect.w * rect.h, value / total * 600.0 * 400.0));
            assert!(rect.x >= -1e-6 && rect.x + rect.w <= 600.0 + 1e-6);
            assert!(rect.y >= -1e-6 && rect.y + rect.h <= 400.0 + 1e-6);
        }
    }

    #[test]
    fn test_squarify_skips_zero_values() {
        let bounds = Rect {
            x: 0.0,
            y: 0.0,
            w: 10.0,
            h: 10.0,
        };
        let rects = squarify(&[0.0, 5.0], bounds);
        assert_eq!(rects[0], Rect::default());
        assert!(approx(rects[1].w * rects[1].h, 100.0));
    }

    #[test]
    fn test_catmull_rom_passes_through_points() {
        let points = vec![(0.0, 0.0), (1.0, 2.0), (2.0, 1.0), (3.0, 3.0)];
        let smooth = catmull_rom(&points, 4);
        assert_eq!(smooth.len(), 3 * 4 + 1);
        for (i, p) in points.iter().enumerate() {
            let q = smooth[i * 4];
            assert!(approx(p.0, q.0) && approx(p.1, q.1));
        }
    }

    #[test]
    fn test_catmull_rom_short_input_unchanged() {
        let points = vec![(0.0, 0.0), (1.0, 1.0)];
        assert_eq!(catmull_rom(&points, 8), points);
    }

    #[test]
    fn test_ring_sector_wedge_closes_at_center() {
        let wedge = ring_sector((50.0, 50.0), 0.0, 10.0, 0.0, PI / 2.0);
        assert_eq!(wedge.first(), Some(&(60, 50)));
        assert_eq!(wedge.last(), Some(&(50, 50)));
    }

    #[test]
    fn test_every_kind_draws_svg() {
        let ds = decode(b"k,v\na,1\nb,3\nc,2\n", "t.csv").unwrap();
        let canvas = Canvas::new(400, 300, None);
        for kind in ChartKind::ALL {
            let chart = build(&ds, &ChartRequest::new("k", "v", kind)).unwrap();
            let svg = canvas.draw(&chart).unwrap();
            assert!(svg.contains("<svg"), "{kind} produced no svg");
        }
    }
}

use std::path::Path;

use anyhow::Result;

use super::layout::{format_tick, tick_step, Area, Axis};
use super::*;

const Y_TICKS: usize = 6;
const X_TICKS: usize = 8;

/// One labelled line of a line chart
#[derive(Clone, Debug)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Clone, Debug, Default)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

/// Horizontal grid lines, y tick labels and the frame of a plot area
fn draw_y_axis(canvas: &mut Canvas, plot: Area, axis: &Axis) -> Result<()> {
    let step = tick_step(axis.min, axis.max, Y_TICKS);
    for tick in axis.ticks(Y_TICKS) {
        let y = axis.to_pixel(tick, plot.bottom(), plot.y);
        canvas.line((plot.x, y), (plot.right(), y), GRID, 1)?;
        canvas.line((plot.x - 5, y), (plot.x, y), BLACK, 1)?;
        canvas.text_middle(&format_tick(tick, step), plot.x - 8, y, Anchor::Right, SMALL)?;
    }
    canvas.outline(plot, BLACK)
}

fn draw_x_axis(canvas: &mut Canvas, plot: Area, axis: &Axis) -> Result<()> {
    let step = tick_step(axis.min, axis.max, X_TICKS);
    let (_, label_height) = text_size("0", SMALL)?;
    for tick in axis.ticks(X_TICKS) {
        let x = axis.to_pixel(tick, plot.x, plot.right());
        canvas.line((x, plot.y), (x, plot.bottom()), GRID, 1)?;
        canvas.line((x, plot.bottom()), (x, plot.bottom() + 5), BLACK, 1)?;
        canvas.text(
            &format_tick(tick, step),
            x,
            plot.bottom() + 10 + label_height,
            Anchor::Center,
            SMALL,
        )?;
    }
    Ok(())
}

/// Boxed list of color swatches and labels, anchored at the top-right
/// corner of `plot`
fn draw_legend(canvas: &mut Canvas, plot: Area, labels: &[&str]) -> Result<()> {
    if labels.is_empty() {
        return Ok(());
    }
    let row_height = 20;
    let swatch = 24;
    let mut label_width = 0;
    for label in labels {
        label_width = label_width.max(text_size(label, SMALL)?.0);
    }
    let width = swatch + label_width + 24;
    let height = row_height * labels.len() as i32 + 8;
    let frame = Area::new(plot.right() - width - 10, plot.y + 10, width, height);
    canvas.fill(frame, WHITE)?;
    canvas.outline(frame, GRID)?;

    for (i, label) in labels.iter().enumerate() {
        let y = frame.y + 4 + row_height * i as i32 + row_height / 2;
        let x = frame.x + 8;
        canvas.line((x, y), (x + swatch, y), palette(i), 2)?;
        canvas.text_middle(label, x + swatch + 8, y, Anchor::Left, SMALL)?;
    }
    Ok(())
}

/// Title above the plot, x label below it and y label over the y axis
fn draw_labels(canvas: &mut Canvas, plot: Area, title: &str, x_label: &str, y_label: &str) -> Result<()> {
    let full = canvas.area();
    canvas.text(title, full.width / 2, 30, Anchor::Center, TITLE)?;
    canvas.text(x_label, plot.x + plot.width / 2, full.bottom() - 15, Anchor::Center, LABEL)?;
    canvas.text(y_label, plot.x, plot.y - 10, Anchor::Left, LABEL)
}

impl LineChart {
    pub fn new(title: &str, x_label: &str, y_label: &str) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            series: vec![],
        }
    }

    pub fn add_series(&mut self, label: &str, points: Vec<(f64, f64)>) {
        self.series.push(Series {
            label: label.to_string(),
            points,
        });
    }

    /// Data ranges of both axes
    pub fn axes(&self) -> (Axis, Axis) {
        let points = || self.series.iter().flat_map(|s| s.points.iter());
        let x = Axis::covering(points().map(|p| p.0));
        let y = Axis::covering(points().map(|p| p.1)).padded();
        (x, y)
    }

    pub fn render(&self, width: u32, height: u32) -> Result<Canvas> {
        let mut canvas = Canvas::new(width as i32, height as i32)?;
        let plot = canvas.area().inset(80, 70, 30, 70);
        let (x_axis, y_axis) = self.axes();

        draw_x_axis(&mut canvas, plot, &x_axis)?;
        draw_y_axis(&mut canvas, plot, &y_axis)?;

        for (i, series) in self.series.iter().enumerate() {
            let pixels: Vec<(i32, i32)> = series
                .points
                .iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|&(x, y)| {
                    (
                        x_axis.to_pixel(x, plot.x, plot.right()),
                        y_axis.to_pixel(y, plot.bottom(), plot.y),
                    )
                })
                .collect();
            canvas.polyline(&pixels, palette(i), 2)?;
        }

        let labels: Vec<&str> = self.series.iter().map(|s| s.label.as_str()).collect();
        draw_legend(&mut canvas, plot, &labels)?;
        draw_labels(&mut canvas, plot, &self.title, &self.x_label, &self.y_label)?;
        Ok(canvas)
    }

    pub fn save(&self, path: &Path, width: u32, height: u32) -> Result<()> {
        self.render(width, height)?.save(path)
    }
}

/// One panel of a bar chart: a bar per label, with optional error bars
#[derive(Clone, Debug)]
pub struct BarGroup {
    pub title: String,
    pub values: Vec<f64>,
    pub errors: Vec<Option<f64>>,
}

impl BarGroup {
    /// Value range with zero and the tips of the error bars included
    pub fn axis(&self) -> Axis {
        let tips = self.values.iter().zip(&self.errors).flat_map(|(v, e)| {
            let e = e.unwrap_or(0.);
            [v - e, v + e]
        });
        Axis::covering(tips).with_zero().padded()
    }
}

/// Small multiples: one bar panel per group, bars colored per label
#[derive(Clone, Debug, Default)]
pub struct BarChart {
    pub title: String,
    pub labels: Vec<String>,
    pub groups: Vec<BarGroup>,
}

impl BarChart {
    pub fn new(title: &str, labels: Vec<String>) -> Self {
        Self {
            title: title.to_string(),
            labels,
            groups: vec![],
        }
    }

    pub fn add_group(&mut self, title: &str, values: Vec<f64>, errors: Vec<Option<f64>>) {
        self.groups.push(BarGroup {
            title: title.to_string(),
            values,
            errors,
        });
    }

    fn draw_group(&self, canvas: &mut Canvas, panel: Area, group: &BarGroup) -> Result<()> {
        let plot = panel.inset(70, 40, 15, 20);
        let axis = group.axis();
        canvas.text(&group.title, panel.x + panel.width / 2, panel.y + 22, Anchor::Center, LABEL)?;
        draw_y_axis(canvas, plot, &axis)?;

        let n = group.values.len().max(1) as i32;
        let slot = plot.width / n;
        let bar_width = (slot * 2 / 3).max(1);
        let zero = axis.to_pixel(0., plot.bottom(), plot.y);
        for (i, (&value, error)) in group.values.iter().zip(&group.errors).enumerate() {
            let center = plot.x + slot * i as i32 + slot / 2;
            let top = axis.to_pixel(value, plot.bottom(), plot.y);
            let bar = Area::new(center - bar_width / 2, top.min(zero), bar_width, (zero - top).abs().max(1));
            canvas.fill(bar, palette(i))?;

            if let Some(error) = error {
                let low = axis.to_pixel(value - error, plot.bottom(), plot.y);
                let high = axis.to_pixel(value + error, plot.bottom(), plot.y);
                canvas.line((center, low), (center, high), BLACK, 1)?;
                canvas.line((center - 5, low), (center + 5, low), BLACK, 1)?;
                canvas.line((center - 5, high), (center + 5, high), BLACK, 1)?;
            }
        }
        Ok(())
    }

    /// Row of colored swatches naming the bars
    fn draw_key(&self, canvas: &mut Canvas, y: i32) -> Result<()> {
        let mut widths = vec![];
        for label in &self.labels {
            widths.push(text_size(label, SMALL)?.0 + 40);
        }
        let total: i32 = widths.iter().sum();
        let mut x = (canvas.area().width - total) / 2;
        for (i, (label, width)) in self.labels.iter().zip(widths).enumerate() {
            canvas.fill(Area::new(x, y - 6, 14, 12), palette(i))?;
            canvas.text_middle(label, x + 20, y, Anchor::Left, SMALL)?;
            x += width;
        }
        Ok(())
    }

    pub fn render(&self, width: u32, height: u32) -> Result<Canvas> {
        let mut canvas = Canvas::new(width as i32, height as i32)?;
        let full = canvas.area();
        canvas.text(&self.title, full.width / 2, 30, Anchor::Center, TITLE)?;

        let body = full.inset(10, 45, 10, 45);
        for (panel, group) in body.columns(self.groups.len()).into_iter().zip(&self.groups) {
            self.draw_group(&mut canvas, panel, group)?;
        }
        self.draw_key(&mut canvas, full.bottom() - 22)?;
        Ok(canvas)
    }

    pub fn save(&self, path: &Path, width: u32, height: u32) -> Result<()> {
        self.render(width, height)?.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_line_chart_axes() {
        let mut chart = LineChart::new("Overlap per Frame for All Trackers", "Frame Number", "Overlap");
        chart.add_series("CSRT Overlap", vec![(1., 0.5), (2., 0.7)]);
        chart.add_series("VIT Overlap", vec![(1., 0.3), (5., 0.9)]);
        let (x, y) = chart.axes();
        assert_eq!(x, Axis { min: 1., max: 5. });
        assert_relative_eq!(y.min, 0.27, epsilon = 1e-12);
        assert_relative_eq!(y.max, 0.93, epsilon = 1e-12);
    }

    #[test]
    fn test_bar_group_axis() {
        let group = BarGroup {
            title: "average_overlap".to_string(),
            values: vec![0.5, 0.8],
            errors: vec![Some(0.1), None],
        };
        let axis = group.axis();
        assert_relative_eq!(axis.min, -0.04, epsilon = 1e-12);
        assert_relative_eq!(axis.max, 0.84, epsilon = 1e-12);
    }

    #[test]
    fn test_render() {
        let dir = tempfile::tempdir().unwrap();

        let mut chart = LineChart::new("Center Error per Frame for All Trackers", "Frame Number", "Center Error");
        chart.add_series("CSRT Center Error", vec![(1., 3.), (2., 4.), (3., f64::NAN), (4., 2.)]);
        chart.add_series("DaSiam Center Error", vec![]);
        let path = dir.path().join("lines.png");
        chart.save(&path, 640, 480).unwrap();
        assert!(path.is_file());

        let mut bars = BarChart::new("Overall", vec!["CSRT".to_string(), "VIT".to_string()]);
        bars.add_group("average_overlap", vec![0.5, 0.7], vec![Some(0.1), Some(0.05)]);
        bars.add_group("average_error", vec![12., 8.], vec![None, None]);
        let path = dir.path().join("bars.png");
        bars.save(&path, 800, 400).unwrap();
        assert!(path.is_file());
    }
}

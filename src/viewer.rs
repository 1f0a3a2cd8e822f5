use eframe::egui;
use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke, Vec2};

use crate::record::local_time;
use crate::report::{Axis, Panel, SeriesChart};

const PANEL_HEIGHT: f32 = 220.0;
const MARGIN: f32 = 40.0;
const SERIES_COLORS: [Color32; 3] = [
    Color32::from_rgb(31, 119, 180),
    Color32::from_rgb(255, 127, 14),
    Color32::from_rgb(44, 160, 44),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub min: f64,
    pub max: f64,
}

impl Scale {
    /// Zero-based scale covering `values`, with headroom above the largest.
    pub fn to_zero(values: impl IntoIterator<Item = f64>) -> Self {
        let max = values.into_iter().fold(0.0_f64, f64::max);
        Self {
            min: 0.0,
            max: if max > 0.0 { max * 1.1 } else { 1.0 },
        }
    }

    pub fn spanning(min: f64, max: f64) -> Self {
        if max > min {
            Self { min, max }
        } else {
            Self {
                min: min - 1.0,
                max: max + 1.0,
            }
        }
    }

    pub fn map(&self, value: f64, from_px: f32, to_px: f32) -> f32 {
        let t = (value - self.min) / (self.max - self.min);
        from_px + (to_px - from_px) * t as f32
    }
}

fn axis_scale(panel: &Panel, axis: Axis) -> Scale {
    let series = panel
        .series
        .iter()
        .filter(|s| s.axis == axis)
        .flat_map(|s| s.points.iter().map(|&(_, v)| v));
    let lines = panel
        .reference_lines
        .iter()
        .filter(|l| l.axis == axis)
        .map(|l| l.value);
    Scale::to_zero(series.chain(lines))
}

pub struct ChartViewer {
    chart: SeriesChart,
    time: Scale,
}

impl ChartViewer {
    pub fn new(chart: SeriesChart) -> Self {
        let (start, end) = chart.time_range().unwrap_or((0.0, 1.0));
        Self {
            chart,
            time: Scale::spanning(start, end),
        }
    }

    fn draw_panel(&self, ui: &mut egui::Ui, panel: &Panel) {
        ui.horizontal(|ui| {
            for (i, series) in panel.series.iter().enumerate() {
                ui.colored_label(SERIES_COLORS[i % SERIES_COLORS.len()], &series.name);
            }
        });

        let size = Vec2::new(ui.available_width(), PANEL_HEIGHT);
        let (rect, _) = ui.allocate_exact_size(size, Sense::hover());
        let painter = ui.painter_at(rect);
        let plot = Rect::from_min_max(
            Pos2::new(rect.left() + MARGIN, rect.top() + 10.0),
            Pos2::new(rect.right() - MARGIN, rect.bottom() - 20.0),
        );
        painter.rect_stroke(plot, 0.0, Stroke::new(1.0, Color32::GRAY), egui::StrokeKind::Inside);

        let primary = axis_scale(panel, Axis::Primary);
        let secondary = axis_scale(panel, Axis::Secondary);
        let scale_for = |axis: Axis| if axis == Axis::Primary { primary } else { secondary };
        let x_of = |t: f64| self.time.map(t, plot.left(), plot.right());

        for line in &panel.reference_lines {
            let y = scale_for(line.axis).map(line.value, plot.bottom(), plot.top());
            let path = [Pos2::new(plot.left(), y), Pos2::new(plot.right(), y)];
            let stroke = Stroke::new(1.0, Color32::DARK_GRAY);
            painter.extend(Shape::dashed_line(&path, stroke, 6.0, 4.0));
            if let Some(label) = &line.label {
                painter.text(
                    Pos2::new(plot.left() + 4.0, y - 2.0),
                    Align2::LEFT_BOTTOM,
                    label,
                    FontId::default(),
                    Color32::DARK_GRAY,
                );
            }
        }

        for &gap in &self.chart.gaps {
            let x = x_of(gap);
            let path = [Pos2::new(x, plot.top()), Pos2::new(x, plot.bottom())];
            painter.extend(Shape::dotted_line(&path, Color32::RED, 6.0, 1.0));
        }

        for (i, series) in panel.series.iter().enumerate() {
            let scale = scale_for(series.axis);
            let points: Vec<Pos2> = series
                .points
                .iter()
                .map(|&(t, v)| Pos2::new(x_of(t), scale.map(v, plot.bottom(), plot.top())))
                .collect();
            let color = SERIES_COLORS[i % SERIES_COLORS.len()];
            painter.add(Shape::line(points.clone(), Stroke::new(2.0, color)));
            for point in points {
                painter.circle_filled(point, 3.0, color);
            }
        }

        painter.text(
            Pos2::new(plot.left() - 4.0, plot.top()),
            Align2::RIGHT_TOP,
            format!("{:.0}", primary.max),
            FontId::default(),
            Color32::BLACK,
        );
        painter.text(
            Pos2::new(plot.left() - 4.0, plot.center().y),
            Align2::RIGHT_CENTER,
            &panel.y_title,
            FontId::proportional(10.0),
            Color32::BLACK,
        );
        if let Some(title) = &panel.secondary_y_title {
            painter.text(
                Pos2::new(plot.right() + 4.0, plot.top()),
                Align2::LEFT_TOP,
                format!("{:.0}", secondary.max),
                FontId::default(),
                Color32::BLACK,
            );
            painter.text(
                Pos2::new(plot.right() + 4.0, plot.center().y),
                Align2::LEFT_CENTER,
                title,
                FontId::proportional(10.0),
                Color32::BLACK,
            );
        }

        let format_time = |t: f64| local_time(t).format("%Y-%m-%d %H:%M").to_string();
        painter.text(
            Pos2::new(plot.left(), plot.bottom() + 4.0),
            Align2::LEFT_TOP,
            format_time(self.time.min),
            FontId::default(),
            Color32::BLACK,
        );
        painter.text(
            Pos2::new(plot.right(), plot.bottom() + 4.0),
            Align2::RIGHT_TOP,
            format_time(self.time.max),
            FontId::default(),
            Color32::BLACK,
        );
    }

    fn draw_trace_table(&self, ui: &mut egui::Ui) {
        if self.chart.traces.is_empty() {
            ui.label("No traces recorded.");
            return;
        }
        let rows = self.chart.traces.iter().map(|c| c.hops.len()).max().unwrap_or(0);
        egui::ScrollArea::both().show(ui, |ui| {
            egui::Grid::new("trace_table").striped(true).show(ui, |ui| {
                for column in &self.chart.traces {
                    ui.strong(local_time(column.timestamp).format("%Y-%m-%d %H:%M:%S").to_string());
                }
                ui.end_row();
                for row in 0..rows {
                    for column in &self.chart.traces {
                        ui.label(column.hops.get(row).map(String::as_str).unwrap_or(""));
                    }
                    ui.end_row();
                }
            });
        });
    }
}

impl eframe::App for ChartViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(&self.chart.title);
            ui.separator();
            self.draw_panel(ui, &self.chart.speed);
            ui.separator();
            self.draw_panel(ui, &self.chart.packet_loss);
            ui.label(&self.chart.x_title);
            ui.separator();
            self.draw_trace_table(ui);
        });
    }
}

/// Opens the chart window and blocks until it is closed.
pub fn show(chart: SeriesChart) -> eframe::Result {
    let title = chart.title.clone();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 760.0]),
        ..Default::default()
    };
    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(ChartViewer::new(chart)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ping::PingMeasurement;
    use crate::record::SampleRecord;
    use crate::report::render_series;

    #[test]
    fn zero_based_scale_leaves_headroom() {
        let scale = Scale::to_zero([10.0, 50.0, 20.0]);
        assert_eq!(scale.min, 0.0);
        assert!((scale.max - 55.0).abs() < 1e-9);
    }

    #[test]
    fn empty_scale_is_not_degenerate() {
        assert_eq!(Scale::to_zero([]), Scale { min: 0.0, max: 1.0 });
        assert_eq!(Scale::spanning(5.0, 5.0), Scale { min: 4.0, max: 6.0 });
    }

    #[test]
    fn map_flips_for_screen_coordinates() {
        let scale = Scale::spanning(0.0, 10.0);
        assert_eq!(scale.map(0.0, 200.0, 100.0), 200.0);
        assert_eq!(scale.map(10.0, 200.0, 100.0), 100.0);
        assert_eq!(scale.map(5.0, 200.0, 100.0), 150.0);
    }

    #[test]
    fn reference_lines_widen_the_axis() {
        let chart = render_series(&[
            SampleRecord::new(1.0, Some(PingMeasurement::new("8.8.8.8", 1.0)), None),
            SampleRecord::new(2.0, Some(PingMeasurement::new("8.8.8.8", 2.0)), None),
        ]);
        let scale = axis_scale(&chart.packet_loss, Axis::Primary);
        assert!((scale.max - 3.3).abs() < 1e-9);
    }

    #[test]
    fn viewer_spans_all_records() {
        let chart = render_series(&[
            SampleRecord::new(100.0, None, None),
            SampleRecord::new(400.0, Some(PingMeasurement::new("8.8.8.8", 0.0)), None),
        ]);
        let viewer = ChartViewer::new(chart);
        assert_eq!(viewer.time, Scale { min: 100.0, max: 400.0 });
    }
}

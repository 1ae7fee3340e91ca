use egui::{Color32, RichText};
use egui_plot::{Corner, HLine, Legend, Line, LineStyle, Plot, PlotPoints};

use crate::processing::downsampling;
use crate::processing::statistics::VoltageStats;
use crate::state::theme::{Theme, TraceKind};
use crate::state::waveform::WaveformSeries;

/// One line on a chart.
pub struct Trace<'a> {
    pub kind: TraceKind,
    pub name: String,
    pub series: &'a WaveformSeries,
}

impl<'a> Trace<'a> {
    pub fn new(kind: TraceKind, series: &'a WaveformSeries) -> Self {
        Self {
            kind,
            name: kind.label().to_string(),
            series,
        }
    }

    pub fn named(kind: TraceKind, name: impl Into<String>, series: &'a WaveformSeries) -> Self {
        Self {
            kind,
            name: name.into(),
            series,
        }
    }
}

/// Per-chart view state that survives between frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartView {
    /// The user has panned or zoomed; only the visible window is decimated.
    pub zoomed: bool,
}

/// Appearance shared by every chart in the window.
#[derive(Debug, Clone, Copy)]
pub struct ChartStyle {
    pub theme: Theme,
    pub max_points: usize,
    pub height: f32,
}

/// A framed chart of traces sharing one time axis.
pub struct Chart<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub traces: Vec<Trace<'a>>,
    /// Trace whose peak-to-peak span is shown above the plot and as two
    /// dashed guides.
    pub annotate: Option<usize>,
    /// Voltage range the y axis always includes, so charts can be compared.
    pub y_range: Option<(f64, f64)>,
}

impl<'a> Chart<'a> {
    pub fn new(id: &'a str, title: &'a str, traces: Vec<Trace<'a>>) -> Self {
        Self {
            id,
            title,
            traces,
            annotate: None,
            y_range: None,
        }
    }

    /// Annotate the last trace, the filtered one when present.
    pub fn annotate_last(mut self) -> Self {
        self.annotate = self.traces.len().checked_sub(1);
        self
    }

    pub fn y_range(mut self, range: Option<(f64, f64)>) -> Self {
        self.y_range = range;
        self
    }

    pub fn show(self, ui: &mut egui::Ui, view: &mut ChartView, style: &ChartStyle) {
        show_waveform_chart(ui, &self, view, style);
    }
}

/// Smallest and largest finite voltage across `series`.
pub fn voltage_range(series: &[&WaveformSeries]) -> Option<(f64, f64)> {
    series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.voltage))
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn show_waveform_chart(ui: &mut egui::Ui, chart: &Chart<'_>, view: &mut ChartView, style: &ChartStyle) {
    let Chart {
        id,
        title,
        traces,
        annotate,
        y_range,
    } = chart;
    let (theme, max_points) = (&style.theme, style.max_points);
    let Some(first) = traces.first().filter(|t| !t.series.is_empty()) else {
        return;
    };
    let x_label = first.series.axis_label_time();
    let y_label = first.series.axis_label_voltage();
    let unit = first.series.metadata.voltage_unit.clone();

    let stats = annotate
        .and_then(|i| traces.get(i))
        .and_then(|t| VoltageStats::of_series(t.series));

    egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(10))
        .corner_radius(egui::CornerRadius::same(8))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(*title).strong().size(16.0));
                if let Some(stats) = &stats {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(
                            RichText::new(stats.annotation(&unit))
                                .monospace()
                                .color(theme.warning_color()),
                        )
                        .on_hover_text(stats.report(title, &unit));
                    });
                }
            });

            let zoomed = view.zoomed;
            let mut plot = Plot::new(*id)
                .height(style.height)
                .x_axis_label(x_label)
                .y_axis_label(y_label)
                .legend(Legend::default().position(Corner::RightTop).background_alpha(0.8));
            if let Some((lo, hi)) = *y_range {
                plot = plot.include_y(lo).include_y(hi);
            }
            let response = plot.show(ui, |plot_ui| {
                let bounds = plot_ui.plot_bounds();
                let (view_min, view_max) = (bounds.min()[0], bounds.max()[0]);

                for trace in traces.iter() {
                    let points = if zoomed && view_min < view_max {
                        downsampling::downsample_for_view(
                            &trace.series.points,
                            view_min,
                            view_max,
                            max_points,
                        )
                    } else {
                        downsampling::lttb(&trace.series.points, max_points)
                    };
                    if points.is_empty() {
                        continue;
                    }
                    let line = Line::new(&trace.name, PlotPoints::from(points))
                        .color(theme.trace_color(trace.kind))
                        .width(1.5);
                    plot_ui.line(line);
                }

                if let Some(stats) = &stats {
                    let guide = theme.warning_color().gamma_multiply(0.7);
                    for (name, y) in [("Max", stats.max), ("Min", stats.min)] {
                        plot_ui.hline(
                            HLine::new(name, y)
                                .color(guide)
                                .style(LineStyle::dashed_loose()),
                        );
                    }
                }
            });

            let r = &response.response;
            if r.double_clicked() {
                view.zoomed = false;
            } else if r.dragged()
                || (r.hovered()
                    && ui.input(|i| {
                        i.raw.events.iter().any(|e| {
                            matches!(e, egui::Event::MouseWheel { .. } | egui::Event::Zoom(_))
                        })
                    }))
            {
                view.zoomed = true;
            }
        });
}

/// Placeholder shown where a chart would be when no signal is loaded.
pub fn show_empty_state(ui: &mut egui::Ui, message: Option<&str>) {
    ui.add_space(80.0);
    ui.vertical_centered(|ui| {
        ui.label(RichText::new("No signal loaded").strong().size(16.0));
        ui.add_space(8.0);
        match message {
            Some(msg) => {
                ui.colored_label(Color32::from_rgb(255, 80, 80), msg);
            }
            None => {
                ui.label(
                    RichText::new("Upload a DSO export from the side panel, or drag-and-drop a CSV file.")
                        .weak(),
                );
            }
        }
    });
}

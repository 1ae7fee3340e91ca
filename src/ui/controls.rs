use egui::RichText;

use crate::state::session::{Analysis, FilterSettings, Session, Slot};
use crate::state::theme::Theme;

/// Requests from the side panel that need the app to act.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    None,
    Upload(Slot),
    Clear(Slot),
    ScaleChanged(f64),
    FilterChanged,
    /// `time,voltage` download of one normalized capture.
    DownloadStructured(Slot),
    DownloadExtracted,
    /// Every trace on screen as one multi-column file.
    DownloadAnalysis,
}

/// Inputs the side panel edits before they are committed to the session.
#[derive(Debug, Clone, Copy)]
pub struct ControlInputs {
    pub scale_factor: f64,
}

fn section(ui: &mut egui::Ui, title: &str) {
    ui.add_space(6.0);
    ui.label(RichText::new(title).strong());
    ui.add_space(2.0);
}

/// Render the side panel. At most one action is returned per frame.
pub fn show_controls(
    ui: &mut egui::Ui,
    session: &Session,
    analysis: &Analysis,
    inputs: &mut ControlInputs,
    filter: &mut FilterSettings,
    theme: &Theme,
) -> ControlAction {
    let mut action = ControlAction::None;

    for slot in [Slot::Signal, Slot::Noise] {
        section(ui, &format!("{} capture", slot.label()));
        ui.horizontal(|ui| {
            if ui.button("Upload...").on_hover_text("Choose a DSO CSV export").clicked() {
                action = ControlAction::Upload(slot);
            }
            if session.capture(slot).is_some() && ui.small_button("Clear").clicked() {
                action = ControlAction::Clear(slot);
            }
        });

        match session.capture(slot) {
            Some(capture) => {
                let series = capture.series();
                let report = &capture.outcome.report;
                ui.label(RichText::new(&capture.upload.filename).monospace());
                ui.label(format!("{} points", series.len()));
                if let Some(rate) = series.sample_rate_hz() {
                    ui.label(format!("Sampling rate: {:.1} Sa/s", rate));
                }
                let columns = if report.synthesized_time() {
                    format!("Column: {} (time from sample rate)", report.voltage_column)
                } else {
                    let time = report.time_column.as_deref().unwrap_or_default();
                    format!("Columns: {time}, {}", report.voltage_column)
                };
                ui.label(RichText::new(columns).weak());
                if report.dropped_rows() > 0 {
                    ui.label(format!("{} of {} rows dropped", report.dropped_rows(), report.input_rows));
                }
                for warning in report.warnings() {
                    ui.colored_label(theme.warning_color(), warning);
                }
            }
            None => {
                ui.label(RichText::new("Nothing loaded").weak());
            }
        }
        ui.separator();
    }

    section(ui, "Time axis");
    ui.horizontal(|ui| {
        ui.label("Scale factor");
        let drag = egui::DragValue::new(&mut inputs.scale_factor)
            .speed(1.0)
            .range(1e-9..=1e9);
        let resp = ui.add(drag).on_hover_text("Multiplier applied to every time value, e.g. 1000 for s to ms");
        if (resp.lost_focus() || resp.drag_stopped()) && inputs.scale_factor != session.options.scale_factor {
            action = ControlAction::ScaleChanged(inputs.scale_factor);
        }
    });
    ui.horizontal(|ui| {
        for preset in [1.0, 1e3, 1e6] {
            if ui.small_button(format!("x{preset}")).clicked() {
                inputs.scale_factor = preset;
                action = ControlAction::ScaleChanged(preset);
            }
        }
    });
    ui.separator();

    section(ui, "Low-pass filter");
    let mut changed = ui
        .checkbox(&mut filter.enabled, "Apply Butterworth low-pass")
        .changed();
    ui.add_enabled_ui(filter.enabled, |ui| {
        changed |= ui
            .add(
                egui::Slider::new(&mut filter.cutoff_hz, 1.0..=1000.0)
                    .logarithmic(true)
                    .suffix(" Hz")
                    .text("Cutoff"),
            )
            .changed();
        ui.label(RichText::new(format!("Order {}, zero-phase", filter.order)).weak());
    });
    if changed {
        action = ControlAction::FilterChanged;
    }
    for error in &analysis.errors {
        ui.colored_label(theme.warning_color(), error);
    }
    ui.separator();

    section(ui, "Download");
    ui.add_enabled_ui(session.signal.is_some(), |ui| {
        if ui.button("Structured signal CSV").on_hover_text("time,voltage").clicked() {
            action = ControlAction::DownloadStructured(Slot::Signal);
        }
    });
    ui.add_enabled_ui(session.noise.is_some(), |ui| {
        if ui.button("Structured noise CSV").clicked() {
            action = ControlAction::DownloadStructured(Slot::Noise);
        }
    });
    ui.add_enabled_ui(analysis.extraction.is_some(), |ui| {
        if ui.button("Extracted signal CSV").clicked() {
            action = ControlAction::DownloadExtracted;
        }
    });
    ui.add_enabled_ui(session.signal.is_some(), |ui| {
        if ui
            .button("Analysis table CSV")
            .on_hover_text("All traces on screen, aligned on time")
            .clicked()
        {
            action = ControlAction::DownloadAnalysis;
        }
    });

    action
}

use std::path::{Path, PathBuf};

use eframe::egui;

use crate::config::AnalyzerConfig;
use crate::data::export::{self, AnalysisTable};
use crate::data::upload::Upload;
use crate::state::session::{Analysis, Session, Slot};
use crate::state::theme::{Theme, TraceKind};
use crate::state::waveform::WaveformSeries;
use crate::ui::controls::{self, ControlAction, ControlInputs};
use crate::ui::waveform_panel::{self, Chart, ChartStyle, ChartView, Trace};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const CHART_HEIGHT: f32 = 260.0;

/// The main TapScope application.
pub struct TapScopeApp {
    config: AnalyzerConfig,
    session: Session,
    /// Derived traces, recomputed only when the session changes.
    analysis: Analysis,
    inputs: ControlInputs,
    theme: Theme,
    /// Signal, noise and extracted chart views, in display order.
    views: [ChartView; 3],
    /// An error message to display until dismissed or replaced.
    pub error_message: Option<String>,
    pub show_about: bool,
}

impl TapScopeApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AnalyzerConfig) -> Self {
        let ctx = &cc.egui_ctx;
        let mut style = (*ctx.style()).clone();
        style.text_styles.insert(egui::TextStyle::Body, egui::FontId::proportional(15.0));
        style.text_styles.insert(egui::TextStyle::Button, egui::FontId::proportional(14.5));
        style.text_styles.insert(egui::TextStyle::Heading, egui::FontId::proportional(22.0));
        style.text_styles.insert(egui::TextStyle::Monospace, egui::FontId::monospace(13.5));
        style.spacing.button_padding = egui::vec2(10.0, 5.0);
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        ctx.set_style(style);
        ctx.set_visuals(config.theme.visuals());

        let session = Session::new(&config);
        Self {
            inputs: ControlInputs {
                scale_factor: session.options.scale_factor,
            },
            theme: config.theme,
            analysis: Analysis::default(),
            views: [ChartView::default(); 3],
            error_message: None,
            show_about: false,
            session,
            config,
        }
    }

    fn open_upload_dialog(&mut self, slot: Slot) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Oscilloscope CSV", &["csv", "txt", "tsv"])
            .add_filter("All Files", &["*"])
            .pick_file()
        {
            self.load_path(slot, &path);
        }
    }

    /// Read and normalize a file synchronously; the UI waits for it.
    fn load_path(&mut self, slot: Slot, path: &Path) {
        match Upload::from_path(path) {
            Ok(upload) => self.load_upload(slot, upload),
            Err(e) => self.error_message = Some(e),
        }
    }

    fn load_upload(&mut self, slot: Slot, upload: Upload) {
        let filename = upload.filename.clone();
        match self.session.load(slot, upload) {
            Ok(_) => self.error_message = None,
            Err(e) => {
                tracing::error!("Failed to load {filename}: {e}");
                self.error_message = Some(format!("{filename}: {e}"));
            }
        }
        self.reset_views(slot);
        self.refresh_analysis();
    }

    /// Forget pan and zoom on every chart that shows `slot`'s data.
    fn reset_views(&mut self, slot: Slot) {
        for &i in slot_views(slot) {
            self.views[i] = ChartView::default();
        }
    }

    fn refresh_analysis(&mut self) {
        self.analysis = self.session.analyze();
    }

    fn apply_scale_factor(&mut self, scale_factor: f64) {
        match self.session.set_scale_factor(scale_factor) {
            Ok(()) => {
                self.views = [ChartView::default(); 3];
                self.refresh_analysis();
            }
            Err(e) => {
                self.inputs.scale_factor = self.session.options.scale_factor;
                self.error_message = Some(e.to_string());
            }
        }
    }

    fn pick_save_path(suggested: &str) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .set_file_name(suggested)
            .add_filter("CSV Files", &["csv"])
            .save_file()
    }

    fn download_series(&mut self, series: &WaveformSeries, suffix: &str) {
        let name = export::default_export_name(&series.metadata.source_filename, suffix);
        if let Some(path) = Self::pick_save_path(&name) {
            if let Err(e) = export::save_structured_csv(series, &path) {
                self.error_message = Some(format!("Failed to export CSV: {e}"));
            }
        }
    }

    fn download_table(&mut self, table: &AnalysisTable, source_filename: &str) {
        let name = export::default_export_name(source_filename, "analysis");
        if let Some(path) = Self::pick_save_path(&name) {
            if let Err(e) = table.save(&path) {
                self.error_message = Some(format!("Failed to export CSV: {e}"));
            }
        }
    }

    fn handle_action(&mut self, action: ControlAction) {
        match action {
            ControlAction::None => {}
            ControlAction::Upload(slot) => self.open_upload_dialog(slot),
            ControlAction::Clear(slot) => {
                self.session.clear(slot);
                self.reset_views(slot);
                self.refresh_analysis();
            }
            ControlAction::ScaleChanged(scale) => self.apply_scale_factor(scale),
            ControlAction::FilterChanged => self.refresh_analysis(),
            ControlAction::DownloadStructured(slot) => {
                if let Some(series) = self.session.capture(slot).map(|c| c.series().clone()) {
                    self.download_series(&series, "structured");
                }
            }
            ControlAction::DownloadExtracted => {
                if let Some(series) = self.analysis.extraction.as_ref().map(|x| x.extracted.clone()) {
                    self.download_series(&series, "extracted");
                }
            }
            ControlAction::DownloadAnalysis => match self.session.analysis_table(&self.analysis) {
                Ok(Some(table)) => {
                    let source = self
                        .session
                        .signal
                        .as_ref()
                        .map(|c| c.upload.filename.clone())
                        .unwrap_or_default();
                    self.download_table(&table, &source);
                }
                Ok(None) => {}
                Err(e) => self.error_message = Some(format!("Failed to build table: {e}")),
            },
        }
    }

    fn show_charts(&mut self, ui: &mut egui::Ui) {
        let Some(signal) = self.session.signal.as_ref() else {
            waveform_panel::show_empty_state(ui, self.error_message.as_deref());
            return;
        };
        let style = ChartStyle {
            theme: self.theme,
            max_points: self.config.max_plot_points,
            height: CHART_HEIGHT,
        };
        let analysis = &self.analysis;
        let noise = self.session.noise.as_ref();
        let [signal_view, noise_view, extracted_view] = &mut self.views;

        // Signal and noise share y limits so their amplitudes compare directly.
        let shared_y = noise.and_then(|noise| {
            let compared: Vec<&WaveformSeries> = [Some(signal.series()), Some(noise.series())]
                .into_iter()
                .chain([analysis.filtered_signal.as_ref(), analysis.filtered_noise.as_ref()])
                .flatten()
                .collect();
            waveform_panel::voltage_range(&compared)
        });

        let mut traces = vec![Trace::new(TraceKind::Signal, signal.series())];
        if let Some(filtered) = &analysis.filtered_signal {
            traces.push(Trace::named(TraceKind::Filtered, "Filtered Signal", filtered));
        }
        Chart::new("signal_plot", "Signal with Tapping", traces)
            .annotate_last()
            .y_range(shared_y)
            .show(ui, signal_view, &style);

        if let Some(noise) = noise {
            ui.add_space(10.0);
            let mut traces = vec![Trace::new(TraceKind::Noise, noise.series())];
            if let Some(filtered) = &analysis.filtered_noise {
                traces.push(Trace::named(TraceKind::Filtered, "Filtered Noise", filtered));
            }
            Chart::new("noise_plot", "Noise Signal (Without Tapping)", traces)
                .y_range(shared_y)
                .show(ui, noise_view, &style);
        }

        if let Some(extraction) = &analysis.extraction {
            ui.add_space(10.0);
            let mut traces = vec![Trace::new(TraceKind::Extracted, &extraction.extracted)];
            if let Some(filtered) = &analysis.filtered_extraction {
                traces.push(Trace::named(
                    TraceKind::Filtered,
                    "Filtered Extracted Signal",
                    &filtered.extracted,
                ));
            }
            Chart::new("extracted_plot", "Extracted Signal (Noise Removed)", traces)
                .annotate_last()
                .show(ui, extracted_view, &style);
            if extraction.matched_count < extraction.total_possible {
                ui.colored_label(
                    style.theme.warning_color(),
                    format!(
                        "Only {} of {} samples aligned between signal and noise",
                        extraction.matched_count, extraction.total_possible
                    ),
                );
            }
        }
    }
}

/// Indices into `views` of the charts drawn from `slot`. The extracted
/// chart depends on both captures.
fn slot_views(slot: Slot) -> &'static [usize] {
    match slot {
        Slot::Signal => &[0, 2],
        Slot::Noise => &[1, 2],
    }
}

/// Dropped files named like a noise capture go to the noise slot.
fn slot_for_dropped(path: &Path) -> Slot {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_lowercase())
        .unwrap_or_default();
    if name.contains("noise") {
        Slot::Noise
    } else {
        Slot::Signal
    }
}

impl eframe::App for TapScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(self.theme.visuals());

        // Collect paths first to avoid borrow issues
        let mut dropped_paths: Vec<PathBuf> = Vec::new();
        ctx.input(|i| {
            for file in &i.raw.dropped_files {
                if let Some(path) = &file.path {
                    if Upload::is_supported_path(path) {
                        dropped_paths.push(path.clone());
                    }
                }
            }
        });
        for path in dropped_paths {
            self.load_path(slot_for_dropped(&path), &path);
        }

        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(16, 8)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let title = egui::Label::new(egui::RichText::new("TapScope").heading())
                        .sense(egui::Sense::click());
                    if ui.add(title).on_hover_text("About").clicked() {
                        self.show_about = true;
                    }
                    ui.label(egui::RichText::new("Tapping signal analyzer").weak());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let toggle_label = match self.theme {
                            Theme::Dark => "Light Mode",
                            Theme::Light => "Dark Mode",
                        };
                        if ui.button(toggle_label).clicked() {
                            self.theme = self.theme.toggle();
                        }
                        ui.separator();
                        ui.small(format!("v{VERSION}"));
                    });
                });
            });

        egui::TopBottomPanel::bottom("footer")
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(16, 6)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let scale = self.session.options.scale_factor;
                    ui.label(egui::RichText::new(format!("Time scale x{scale}")).weak());
                    if let Some(msg) = &self.error_message {
                        ui.separator();
                        ui.colored_label(egui::Color32::from_rgb(255, 80, 80), msg);
                        if ui.small_button("dismiss").clicked() {
                            self.error_message = None;
                        }
                    }
                });
            });

        let mut action = ControlAction::None;
        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let mut filter = self.session.filter;
                    action = controls::show_controls(
                        ui,
                        &self.session,
                        &self.analysis,
                        &mut self.inputs,
                        &mut filter,
                        &self.theme,
                    );
                    self.session.filter = filter;
                });
            });
        self.handle_action(action);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.show_charts(ui);
            });
        });

        if self.show_about {
            egui::Window::new("About TapScope")
                .open(&mut self.show_about)
                .resizable(false)
                .collapsible(false)
                .show(ctx, |ui| {
                    ui.label(format!("TapScope v{VERSION}"));
                    ui.label("Normalizes oscilloscope CSV exports into time,voltage waveforms.");
                    ui.add_space(4.0);
                    ui.label(egui::RichText::new("Double-click a chart to reset its view.").weak());
                });
        }
    }
}

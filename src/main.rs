mod app;
mod config;
mod data;
mod error;
mod processing;
mod state;
mod ui;

use app::TapScopeApp;
use config::AnalyzerConfig;
use eframe::egui;

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = AnalyzerConfig::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("TapScope")
            .with_inner_size(config.window_size)
            .with_min_inner_size([800.0, 600.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "TapScope",
        options,
        Box::new(|cc| Ok(Box::new(TapScopeApp::new(cc, config)))),
    )
}

use egui::{Color32, Visuals};
use serde::{Deserialize, Serialize};

/// Which capture a trace on the chart shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    Signal,
    Noise,
    Extracted,
    Filtered,
}

impl TraceKind {
    pub fn label(&self) -> &'static str {
        match self {
            TraceKind::Signal => "Signal with Tapping",
            TraceKind::Noise => "Noise Signal (Without Tapping)",
            TraceKind::Extracted => "Extracted Signal (Noise Removed)",
            TraceKind::Filtered => "Filtered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn visuals(&self) -> Visuals {
        match self {
            Theme::Dark => Visuals::dark(),
            Theme::Light => Visuals::light(),
        }
    }

    pub fn trace_color(&self, kind: TraceKind) -> Color32 {
        match (kind, self) {
            (TraceKind::Signal, _) => Color32::from_rgb(60, 170, 60),
            (TraceKind::Noise, _) => Color32::from_rgb(70, 110, 230),
            (TraceKind::Filtered, _) => Color32::from_rgb(230, 70, 60),
            (TraceKind::Extracted, Theme::Dark) => Color32::from_rgb(230, 230, 230),
            (TraceKind::Extracted, Theme::Light) => Color32::from_rgb(20, 20, 20),
        }
    }

    pub fn warning_color(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_rgb(240, 190, 60),
            Theme::Light => Color32::from_rgb(170, 110, 0),
        }
    }
}

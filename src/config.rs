use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::state::theme::Theme;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV_VAR: &str = "TAPSCOPE_CONFIG";

/// Startup defaults for the analyzer. Every field may be omitted from the
/// config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub default_scale_factor: f64,
    pub filter_cutoff_hz: f64,
    pub filter_order: usize,
    pub filter_enabled: bool,
    /// Upper bound on points drawn per trace.
    pub max_plot_points: usize,
    pub window_size: [f32; 2],
    pub theme: Theme,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            default_scale_factor: 1.0,
            filter_cutoff_hz: 50.0,
            filter_order: 4,
            filter_enabled: false,
            max_plot_points: 5000,
            window_size: [1200.0, 800.0],
            theme: Theme::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config.sanitized())
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path).map_err(|e| format!("Cannot read config: {e}"))?;
        Self::from_json(&text).map_err(|e| format!("Invalid config: {e}"))
    }

    /// Load from the file named by [`CONFIG_ENV_VAR`], falling back to
    /// defaults when it is unset or unusable.
    pub fn load() -> Self {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => match Self::from_file(Path::new(&path)) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::warn!("{e}; using defaults");
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    /// Replace out-of-range values with defaults.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.default_scale_factor.is_finite() || self.default_scale_factor <= 0.0 {
            tracing::warn!("Ignoring invalid default_scale_factor {}", self.default_scale_factor);
            self.default_scale_factor = defaults.default_scale_factor;
        }
        if !self.filter_cutoff_hz.is_finite() || self.filter_cutoff_hz <= 0.0 {
            self.filter_cutoff_hz = defaults.filter_cutoff_hz;
        }
        if self.filter_order == 0 || self.filter_order % 2 != 0 {
            tracing::warn!("Ignoring odd filter_order {}", self.filter_order);
            self.filter_order = defaults.filter_order;
        }
        if self.max_plot_points < 3 {
            self.max_plot_points = defaults.max_plot_points;
        }
        self
    }
}

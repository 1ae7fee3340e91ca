use crate::config::AnalyzerConfig;
use crate::data::export::AnalysisTable;
use crate::data::upload::Upload;
use crate::error::{ExportError, NormalizeError};
use crate::processing::filter;
use crate::processing::noise::{self, Extraction};
use crate::processing::normalizer::{self, NormalizeOptions, NormalizeOutcome};
use crate::state::waveform::WaveformSeries;

/// Which upload a file is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The capture with tapping; required for any chart.
    Signal,
    /// Optional capture of background noise, subtracted from the signal.
    Noise,
}

impl Slot {
    pub fn label(&self) -> &'static str {
        match self {
            Slot::Signal => "Signal",
            Slot::Noise => "Noise",
        }
    }
}

/// A file the user uploaded together with its normalized waveform.
#[derive(Debug, Clone)]
pub struct LoadedCapture {
    pub upload: Upload,
    pub outcome: NormalizeOutcome,
}

impl LoadedCapture {
    pub fn series(&self) -> &WaveformSeries {
        &self.outcome.series
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    pub enabled: bool,
    pub cutoff_hz: f64,
    pub order: usize,
}

/// Traces derived from the loaded captures for one display cycle.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub filtered_signal: Option<WaveformSeries>,
    pub filtered_noise: Option<WaveformSeries>,
    pub extraction: Option<Extraction>,
    pub filtered_extraction: Option<Extraction>,
    /// Problems that prevented a derived trace; the raw traces still show.
    pub errors: Vec<String>,
}

/// Everything the user has loaded and chosen in this window. Nothing here
/// outlives the process.
#[derive(Debug, Clone)]
pub struct Session {
    pub signal: Option<LoadedCapture>,
    pub noise: Option<LoadedCapture>,
    pub options: NormalizeOptions,
    pub filter: FilterSettings,
}

impl Session {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            signal: None,
            noise: None,
            options: NormalizeOptions::with_scale(config.default_scale_factor),
            filter: FilterSettings {
                enabled: config.filter_enabled,
                cutoff_hz: config.filter_cutoff_hz,
                order: config.filter_order,
            },
        }
    }

    pub fn capture(&self, slot: Slot) -> Option<&LoadedCapture> {
        match slot {
            Slot::Signal => self.signal.as_ref(),
            Slot::Noise => self.noise.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<LoadedCapture> {
        match slot {
            Slot::Signal => &mut self.signal,
            Slot::Noise => &mut self.noise,
        }
    }

    /// Normalize a new upload into `slot`, discarding what was there.
    ///
    /// On failure the slot is left empty so no stale chart is shown.
    pub fn load(&mut self, slot: Slot, upload: Upload) -> Result<&LoadedCapture, NormalizeError> {
        let result = normalizer::normalize(&upload, &self.options);
        let target = self.slot_mut(slot);
        *target = None;
        let outcome = result?;
        tracing::info!("Loaded {} capture {}", slot.label(), upload.filename);
        Ok(target.insert(LoadedCapture { upload, outcome }))
    }

    pub fn clear(&mut self, slot: Slot) {
        *self.slot_mut(slot) = None;
    }

    /// Re-run normalization of every loaded file with a new scale factor.
    ///
    /// Nothing changes unless every file normalizes with the new factor.
    pub fn set_scale_factor(&mut self, scale_factor: f64) -> Result<(), NormalizeError> {
        let options = NormalizeOptions {
            scale_factor,
            ..self.options.clone()
        };

        let renormalize = |capture: &Option<LoadedCapture>| -> Result<Option<LoadedCapture>, NormalizeError> {
            capture
                .as_ref()
                .map(|c| {
                    normalizer::normalize(&c.upload, &options).map(|outcome| LoadedCapture {
                        upload: c.upload.clone(),
                        outcome,
                    })
                })
                .transpose()
        };
        let signal = renormalize(&self.signal)?;
        let noise = renormalize(&self.noise)?;

        self.signal = signal;
        self.noise = noise;
        self.options = options;
        Ok(())
    }

    /// Compute the filtered and noise-removed traces for the current state.
    pub fn analyze(&self) -> Analysis {
        let mut analysis = Analysis::default();
        let Some(signal) = self.signal.as_ref().map(|c| c.series()) else {
            return analysis;
        };
        let noise = self.noise.as_ref().map(|c| c.series());

        if self.filter.enabled {
            let f = self.filter;
            match filter::lowpass_series(signal, f.cutoff_hz, f.order) {
                Ok(s) => analysis.filtered_signal = Some(s),
                Err(e) => analysis.errors.push(format!("Signal filter: {e}")),
            }
            if let Some(noise) = noise {
                match filter::lowpass_series(noise, f.cutoff_hz, f.order) {
                    Ok(s) => analysis.filtered_noise = Some(s),
                    Err(e) => analysis.errors.push(format!("Noise filter: {e}")),
                }
            }
        }

        if let Some(noise_series) = noise {
            let tolerance = noise::default_tolerance(signal);
            match noise::subtract_noise(signal, noise_series, tolerance) {
                Ok(x) => analysis.extraction = Some(x),
                Err(e) => analysis.errors.push(format!("Noise removal: {e}")),
            }
            if let (Some(fs), Some(fnoise)) = (&analysis.filtered_signal, &analysis.filtered_noise) {
                if let Ok(x) = noise::subtract_noise(fs, fnoise, tolerance) {
                    analysis.filtered_extraction = Some(x);
                }
            }
        }

        for e in &analysis.errors {
            tracing::warn!("{e}");
        }
        analysis
    }

    /// Multi-column download of every trace on screen, aligned on time.
    ///
    /// Columns are `time,signal` for a lone capture, or
    /// `time,noise,signal,extracted` once a noise reference is loaded, each
    /// followed by its `filtered_*` counterpart when the filter is on.
    pub fn analysis_table(&self, analysis: &Analysis) -> Result<Option<AnalysisTable>, ExportError> {
        let Some(signal) = self.signal.as_ref().map(|c| c.series()) else {
            return Ok(None);
        };

        let table = match &analysis.extraction {
            Some(x) => {
                let mut table = AnalysisTable::new("time", x.extracted.times());
                table.push_column("noise", x.noise.clone())?;
                table.push_column("signal", x.signal.clone())?;
                table.push_column("extracted", x.extracted.voltages())?;
                if let Some(fx) = &analysis.filtered_extraction {
                    table.push_column("filtered_noise", fx.noise.clone())?;
                    table.push_column("filtered_signal", fx.signal.clone())?;
                    table.push_column("filtered_extracted", fx.extracted.voltages())?;
                }
                table
            }
            None => {
                let mut table = AnalysisTable::new("time", signal.times());
                table.push_column("signal", signal.voltages())?;
                if let Some(fs) = &analysis.filtered_signal {
                    table.push_column("filtered_signal", fs.voltages())?;
                }
                table
            }
        };
        Ok(Some(table))
    }
}

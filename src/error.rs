use thiserror::Error;

/// Failures that stop a file from being turned into a waveform.
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// The input is not delimited text.
    #[error("Cannot read file as delimited text: {0}")]
    Parse(String),

    /// Required time/voltage columns could not be identified.
    #[error("Cannot find time and voltage columns: {0}")]
    Schema(String),

    /// Every row was dropped while coercing values.
    #[error("No valid samples in file ({dropped} rows dropped)")]
    EmptyResult { dropped: usize },

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

impl From<csv::Error> for NormalizeError {
    fn from(value: csv::Error) -> Self {
        NormalizeError::Parse(value.to_string())
    }
}

/// Failures of the signal analysis helpers.
#[derive(Error, Debug, PartialEq)]
pub enum AnalysisError {
    #[error("Sample rate cannot be determined from the series")]
    UnknownSampleRate,

    #[error("Cutoff {cutoff_hz} Hz must be above 0 and below Nyquist ({nyquist_hz} Hz)")]
    InvalidCutoff { cutoff_hz: f64, nyquist_hz: f64 },

    #[error("Filter order must be a positive even number, got {0}")]
    InvalidOrder(usize),

    #[error("Need at least {needed} samples to filter, got {actual}")]
    TooFewSamples { needed: usize, actual: usize },

    #[error("No matching time values between signal and noise")]
    NoOverlap,
}

/// Failures while writing a download file.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Analysis table columns have mismatched lengths")]
    ColumnLength,
}

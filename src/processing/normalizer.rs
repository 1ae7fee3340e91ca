use serde::{Deserialize, Serialize};

use crate::data::columns::{self, ColumnMatch, TIME_ALIASES, VOLTAGE_ALIASES};
use crate::data::parser::{self, RawTable};
use crate::data::upload::Upload;
use crate::error::NormalizeError;
use crate::state::waveform::{SeriesMetadata, WaveformPoint, WaveformSeries};

/// User choices applied while normalizing a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Multiplier applied to every time value.
    pub scale_factor: f64,
    /// Explicit time column, bypassing alias matching.
    pub time_column: Option<String>,
    /// Explicit voltage column, bypassing alias matching.
    pub voltage_column: Option<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            time_column: None,
            voltage_column: None,
        }
    }
}

impl NormalizeOptions {
    pub fn with_scale(scale_factor: f64) -> Self {
        Self {
            scale_factor,
            ..Self::default()
        }
    }
}

/// What was kept and what was dropped during normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeReport {
    /// Data rows found below the header.
    pub input_rows: usize,
    /// Rows with a missing or non-numeric time or voltage.
    pub invalid_rows: usize,
    /// Rows whose (scaled) time repeated an earlier row.
    pub duplicate_rows: usize,
    /// Rows beyond the point count declared in the preamble.
    pub truncated_rows: usize,
    pub delimiter: char,
    /// `None` when time was derived from the declared sample rate.
    pub time_column: Option<String>,
    pub voltage_column: String,
}

impl NormalizeReport {
    pub fn dropped_rows(&self) -> usize {
        self.invalid_rows + self.duplicate_rows + self.truncated_rows
    }

    pub fn synthesized_time(&self) -> bool {
        self.time_column.is_none()
    }

    /// Human-readable notes about dropped rows.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.invalid_rows > 0 {
            out.push(format!("{} row(s) with missing or non-numeric values dropped", self.invalid_rows));
        }
        if self.duplicate_rows > 0 {
            out.push(format!("{} row(s) with duplicate timestamps dropped", self.duplicate_rows));
        }
        if self.truncated_rows > 0 {
            out.push(format!("{} row(s) beyond the declared point count ignored", self.truncated_rows));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    pub series: WaveformSeries,
    pub report: NormalizeReport,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TimeSource {
    Column(usize),
    /// Time is `row_index / rate`.
    SampleRate(f64),
}

/// Turn an uploaded DSO export into a clean, time-sorted waveform.
///
/// Rows with unusable values are dropped and counted rather than failing the
/// whole file. Identical input and options always give identical output.
pub fn normalize(upload: &Upload, options: &NormalizeOptions) -> Result<NormalizeOutcome, NormalizeError> {
    let scale = options.scale_factor;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(NormalizeError::InvalidOption(format!(
            "scale factor must be a positive number, got {scale}"
        )));
    }

    let text = upload.decode_text()?;
    let table = parser::parse_table(&text)?;
    let (time_source, voltage_idx) = resolve_columns(&table, options)?;
    let decimal_comma = table.decimal_comma();

    let mut rows = table.rows.as_slice();
    let mut truncated_rows = 0;
    if let Some(declared) = table.preamble.point_count() {
        if rows.len() > declared {
            truncated_rows = rows.len() - declared;
            rows = &rows[..declared];
        }
    }

    let mut points = Vec::with_capacity(rows.len());
    let mut invalid_rows = 0usize;
    for (idx, row) in rows.iter().enumerate() {
        let time = match time_source {
            TimeSource::Column(col) => row.get(col).and_then(|s| parser::parse_number(s, decimal_comma)),
            TimeSource::SampleRate(rate) => Some(idx as f64 / rate),
        };
        let voltage = row
            .get(voltage_idx)
            .and_then(|s| parser::parse_number(s, decimal_comma));

        match (time, voltage) {
            (Some(t), Some(v)) => {
                let scaled = t * scale;
                // Fold -0.0 into 0.0 so it dedups against a later 0.0.
                let scaled = if scaled == 0.0 { 0.0 } else { scaled };
                if scaled.is_finite() {
                    points.push(WaveformPoint::new(scaled, v));
                } else {
                    invalid_rows += 1;
                }
            }
            _ => invalid_rows += 1,
        }
    }

    if points.is_empty() {
        return Err(NormalizeError::EmptyResult {
            dropped: invalid_rows + truncated_rows,
        });
    }

    // Stable sort keeps input order among equal times, so dedup keeps the first.
    points.sort_by(|a, b| a.time.total_cmp(&b.time));
    let before = points.len();
    points.dedup_by(|later, earlier| later.time == earlier.time);
    let duplicate_rows = before - points.len();

    let headers = table.headers.as_deref().unwrap_or(&[]);
    let report = NormalizeReport {
        input_rows: table.rows.len(),
        invalid_rows,
        duplicate_rows,
        truncated_rows,
        delimiter: table.delimiter as char,
        time_column: match time_source {
            TimeSource::Column(col) => headers.get(col).cloned(),
            TimeSource::SampleRate(_) => None,
        },
        voltage_column: headers
            .get(voltage_idx)
            .cloned()
            .unwrap_or_else(|| format!("column {}", voltage_idx + 1)),
    };

    let base_time_unit = match time_source {
        TimeSource::Column(col) => column_unit(&table, col, columns::infer_time_unit),
        TimeSource::SampleRate(_) => None,
    }
    .unwrap_or_else(|| "s".to_string());
    let voltage_unit = column_unit(&table, voltage_idx, columns::infer_voltage_unit)
        .or_else(|| table.preamble.voltage_unit())
        .unwrap_or_else(|| "V".to_string());

    let metadata = SeriesMetadata {
        source_filename: upload.filename.clone(),
        sample_count: points.len(),
        time_unit: columns::scaled_time_unit(&base_time_unit, scale),
        base_time_unit,
        voltage_unit,
        scale_factor: scale,
        sample_rate_hz: table.preamble.sample_rate_hz(),
    };

    for warning in report.warnings() {
        tracing::warn!("{}: {}", upload.filename, warning);
    }
    tracing::info!(
        "Normalized {}: {} of {} rows kept (time: {}, voltage: {}, scale x{})",
        upload.filename,
        points.len(),
        report.input_rows,
        report.time_column.as_deref().unwrap_or("sample rate"),
        report.voltage_column,
        scale
    );

    Ok(NormalizeOutcome {
        series: WaveformSeries::new(points, metadata),
        report,
    })
}

/// Unit for a column, from its header suffix or else the units row.
fn column_unit(table: &RawTable, col: usize, infer: fn(&str) -> Option<String>) -> Option<String> {
    table
        .headers
        .as_ref()
        .and_then(|h| h.get(col))
        .and_then(|h| columns::split_header(h).1)
        .and_then(infer)
        .or_else(|| {
            table
                .units
                .as_ref()
                .and_then(|u| u.get(col))
                .and_then(|u| infer(u))
        })
}

fn resolve_columns(table: &RawTable, options: &NormalizeOptions) -> Result<(TimeSource, usize), NormalizeError> {
    let rate = table.preamble.sample_rate_hz();

    let headers = match &table.headers {
        Some(h) => h,
        None => {
            if options.time_column.is_some() || options.voltage_column.is_some() {
                return Err(NormalizeError::Schema(
                    "file has no header row to select columns from".to_string(),
                ));
            }
            return match rate {
                Some(rate) => Ok((TimeSource::SampleRate(rate), 0)),
                None => Err(NormalizeError::Schema(
                    "file has no header row and declares no sample rate".to_string(),
                )),
            };
        }
    };

    let time_idx = match &options.time_column {
        Some(name) => Some(named_column(headers, name)?),
        None => match columns::find_column(headers, TIME_ALIASES, None) {
            ColumnMatch::Found(idx) => Some(idx),
            ColumnMatch::NotFound => None,
            ColumnMatch::Ambiguous(alias, hits) => return Err(ambiguous(headers, alias, &hits)),
        },
    };

    let voltage_idx = match &options.voltage_column {
        Some(name) => {
            let idx = named_column(headers, name)?;
            if Some(idx) == time_idx {
                return Err(NormalizeError::Schema(format!(
                    "column '{name}' cannot be both time and voltage"
                )));
            }
            idx
        }
        None => match columns::find_column(headers, VOLTAGE_ALIASES, time_idx) {
            ColumnMatch::Found(idx) => idx,
            ColumnMatch::Ambiguous(alias, hits) => return Err(ambiguous(headers, alias, &hits)),
            ColumnMatch::NotFound => {
                return Err(NormalizeError::Schema(format!(
                    "no voltage column among [{}]",
                    headers.join(", ")
                )))
            }
        },
    };

    match (time_idx, rate) {
        (Some(idx), _) => Ok((TimeSource::Column(idx), voltage_idx)),
        (None, Some(rate)) => Ok((TimeSource::SampleRate(rate), voltage_idx)),
        (None, None) => Err(NormalizeError::Schema(format!(
            "no time column among [{}]",
            headers.join(", ")
        ))),
    }
}

fn named_column(headers: &[String], name: &str) -> Result<usize, NormalizeError> {
    columns::find_named(headers, name)
        .ok_or_else(|| NormalizeError::Schema(format!("column '{name}' not found")))
}

fn ambiguous(headers: &[String], alias: &str, hits: &[usize]) -> NormalizeError {
    let names: Vec<&str> = hits.iter().filter_map(|&i| headers.get(i)).map(|s| s.as_str()).collect();
    NormalizeError::Schema(format!(
        "'{alias}' matches several columns: {}",
        names.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::export;
    use proptest::prelude::*;

    fn upload(text: &str) -> Upload {
        Upload::new("scope.csv", text.as_bytes().to_vec())
    }

    fn run(text: &str, scale: f64) -> Result<NormalizeOutcome, NormalizeError> {
        normalize(&upload(text), &NormalizeOptions::with_scale(scale))
    }

    fn pairs(series: &WaveformSeries) -> Vec<(f64, f64)> {
        series.points.iter().map(|p| (p.time, p.voltage)).collect()
    }

    #[test]
    fn test_scaled_example_with_duplicate_and_invalid_rows() {
        let out = run("time,CH1\n0.0,1.2\n0.001,1.5\n0.001,1.5\nx,2.0\n", 1000.0).unwrap();
        assert_eq!(pairs(&out.series), vec![(0.0, 1.2), (1.0, 1.5)]);
        assert_eq!(out.report.input_rows, 4);
        assert_eq!(out.report.duplicate_rows, 1);
        assert_eq!(out.report.invalid_rows, 1);
        assert_eq!(out.report.dropped_rows(), 2);
        assert_eq!(out.report.warnings().len(), 2);
        assert_eq!(out.series.metadata.sample_count, 2);
        assert_eq!(out.series.metadata.scale_factor, 1000.0);
        assert_eq!(out.series.metadata.time_unit, "ms");
        assert_eq!(out.series.metadata.voltage_unit, "V");
        assert_eq!(out.series.metadata.source_filename, "scope.csv");
    }

    #[test]
    fn test_unrecognized_headers_is_schema_error() {
        let err = run("foo,bar\n1,2\n", 1.0).unwrap_err();
        assert!(matches!(err, NormalizeError::Schema(_)));
    }

    #[test]
    fn test_header_only_is_empty_result() {
        let err = run("time,voltage\n", 1.0).unwrap_err();
        assert!(matches!(err, NormalizeError::EmptyResult { dropped: 0 }));
    }

    #[test]
    fn test_all_rows_invalid_is_empty_result() {
        let err = run("time,CH1\n1,\n,2\n", 1.0).unwrap_err();
        assert!(matches!(err, NormalizeError::EmptyResult { dropped: 2 }));
    }

    #[test]
    fn test_empty_and_binary_files_are_parse_errors() {
        assert!(matches!(run("", 1.0), Err(NormalizeError::Parse(_))));
        let binary = Upload::new("scope.csv", vec![0x00, 0x01, 0x02]);
        assert!(matches!(
            normalize(&binary, &NormalizeOptions::default()),
            Err(NormalizeError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_bad_scale_factor() {
        for scale in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                run("time,CH1\n0,1\n", scale),
                Err(NormalizeError::InvalidOption(_))
            ));
        }
    }

    #[test]
    fn test_sorts_unordered_rows_and_keeps_first_duplicate() {
        let out = run("Time,Voltage\n2,20\n1,10\n2,99\n0,0\n", 1.0).unwrap();
        assert_eq!(pairs(&out.series), vec![(0.0, 0.0), (1.0, 10.0), (2.0, 20.0)]);
        assert_eq!(out.report.duplicate_rows, 1);
    }

    #[test]
    fn test_units_from_header_suffix() {
        let out = run("Time (ms),CH1 (mV)\n0,5\n1,6\n", 1.0).unwrap();
        assert_eq!(out.series.metadata.time_unit, "ms");
        assert_eq!(out.series.metadata.voltage_unit, "mV");
        assert_eq!(out.report.time_column.as_deref(), Some("Time (ms)"));
        assert_eq!(out.report.voltage_column, "CH1 (mV)");
    }

    #[test]
    fn test_units_row_export() {
        let out = run("X,CH1\nSecond,Volt\n0,0.1\n0.5,0.2\n", 1000.0).unwrap();
        assert_eq!(pairs(&out.series), vec![(0.0, 0.1), (500.0, 0.2)]);
        assert_eq!(out.series.metadata.time_unit, "ms");
        assert_eq!(out.series.metadata.base_time_unit, "s");
        assert_eq!(out.series.metadata.voltage_unit, "V");
    }

    #[test]
    fn test_instrument_title_line_above_header() {
        let out = run("Tektronix,TDS2002\nTime,CH1\n0,1\n1,2\n", 1.0).unwrap();
        assert_eq!(pairs(&out.series), vec![(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(out.report.time_column.as_deref(), Some("Time"));
        assert_eq!(out.report.voltage_column, "CH1");
        assert_eq!(out.report.dropped_rows(), 0);
    }

    #[test]
    fn test_ambiguous_columns_is_schema_error() {
        let err = run("time,Time (s),CH1\n0,0,1\n", 1.0).unwrap_err();
        assert!(matches!(err, NormalizeError::Schema(_)));
    }

    #[test]
    fn test_multichannel_prefers_ch1() {
        let out = run("Time,CH2,CH1\n0,9,1\n1,9,2\n", 1.0).unwrap();
        assert_eq!(out.series.voltages(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_explicit_column_overrides() {
        let text = "Sample,Input A,Input B\n0,1,10\n1,2,20\n";
        let options = NormalizeOptions {
            scale_factor: 1.0,
            time_column: Some("sample".to_string()),
            voltage_column: Some("Input B".to_string()),
        };
        let out = normalize(&upload(text), &options).unwrap();
        assert_eq!(pairs(&out.series), vec![(0.0, 10.0), (1.0, 20.0)]);

        let missing = NormalizeOptions {
            voltage_column: Some("Input C".to_string()),
            ..options.clone()
        };
        assert!(matches!(normalize(&upload(text), &missing), Err(NormalizeError::Schema(_))));

        let same = NormalizeOptions {
            voltage_column: Some("Sample".to_string()),
            ..options
        };
        assert!(matches!(normalize(&upload(text), &same), Err(NormalizeError::Schema(_))));
    }

    #[test]
    fn test_dso_preamble_synthesizes_time() {
        let text = "CH1\nSampling rate:100kSa/s\nSource:CH1\nVertical Unit:mV\nAttenuation:10X\nPoints:4\n1.0\n2.0\n3.0\n4.0\n5.0\n";
        let out = run(text, 1.0).unwrap();
        let times = out.series.times();
        assert_eq!(times.len(), 4);
        for (i, t) in times.iter().enumerate() {
            assert!((t - i as f64 * 1e-5).abs() < 1e-15);
        }
        assert_eq!(out.series.voltages(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(out.report.truncated_rows, 1);
        assert!(out.report.synthesized_time());
        assert_eq!(out.series.metadata.voltage_unit, "mV");
        assert_eq!(out.series.metadata.sample_rate_hz, Some(100_000.0));
    }

    #[test]
    fn test_headerless_with_sample_rate() {
        let text = "Sampling rate:1kSa/s\n0.5\n0.25\n";
        let out = run(text, 1000.0).unwrap();
        assert_eq!(pairs(&out.series), vec![(0.0, 0.5), (1.0, 0.25)]);
        assert_eq!(out.series.metadata.time_unit, "ms");
        assert_eq!(out.report.voltage_column, "column 1");
    }

    #[test]
    fn test_headerless_without_rate_is_schema_error() {
        assert!(matches!(run("0,1\n1,2\n", 1.0), Err(NormalizeError::Schema(_))));
    }

    #[test]
    fn test_semicolon_decimal_comma_file() {
        let out = run("Time;Voltage\n0,5;1,25\n1,5;2,5\n", 1.0).unwrap();
        assert_eq!(pairs(&out.series), vec![(0.5, 1.25), (1.5, 2.5)]);
        assert_eq!(out.report.delimiter, ';');
    }

    #[test]
    fn test_deterministic() {
        let text = "time,CH1\n3,1\n1,2\n2,3\nbad,4\n";
        assert_eq!(run(text, 2.0).unwrap(), run(text, 2.0).unwrap());
    }

    #[test]
    fn test_export_round_trip() {
        let out = run("Time,CH1\n0.1,0.3\n-0.2,1e-7\n0.30000000000000004,-5\n", 1.0).unwrap();
        let bytes = export::structured_csv_bytes(&out.series).unwrap();
        let again = normalize(&Upload::new("again.csv", bytes), &NormalizeOptions::default()).unwrap();
        assert_eq!(again.series.points, out.series.points);
        assert_eq!(again.report.dropped_rows(), 0);
    }

    fn csv_from(rows: &[(String, String)]) -> String {
        let mut text = String::from("time,CH1\n");
        for (t, v) in rows {
            text.push_str(&format!("{t},{v}\n"));
        }
        text
    }

    fn cell() -> impl Strategy<Value = String> {
        prop_oneof![
            8 => (-1000i64..1000).prop_map(|i| format!("{}", i as f64 * 0.001)),
            1 => Just("x".to_string()),
            1 => Just(String::new()),
        ]
    }

    proptest! {
        #[test]
        fn test_output_sorted_and_not_longer_than_input(
            rows in prop::collection::vec((cell(), cell()), 1..60)
        ) {
            let text = csv_from(&rows);
            match run(&text, 1.0) {
                Ok(out) => {
                    prop_assert!(out.series.len() <= rows.len());
                    prop_assert!(out.report.input_rows <= rows.len());
                    prop_assert!(out.series.points.windows(2).all(|w| w[0].time < w[1].time));
                    prop_assert_eq!(
                        out.series.len() + out.report.invalid_rows + out.report.duplicate_rows,
                        out.report.input_rows
                    );
                }
                Err(NormalizeError::EmptyResult { .. }) => {}
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }

        #[test]
        fn test_scaling_is_linear(
            times in prop::collection::btree_set(-5000i64..5000, 1..40),
            k in prop_oneof![Just(0.001), Just(1.0), Just(2.5), Just(1000.0), Just(1e6)]
        ) {
            let rows: Vec<(String, String)> = times
                .iter()
                .rev()
                .map(|&t| (format!("{}", t as f64 * 1e-3), format!("{}", t % 7)))
                .collect();
            let text = csv_from(&rows);
            let base = run(&text, 1.0).unwrap();
            let scaled = run(&text, k).unwrap();
            let expected: Vec<f64> = base.series.times().iter().map(|t| {
                let s = t * k;
                if s == 0.0 { 0.0 } else { s }
            }).collect();
            prop_assert_eq!(scaled.series.times(), expected);
            prop_assert_eq!(scaled.series.voltages(), base.series.voltages());
        }

        #[test]
        fn test_round_trip_is_idempotent(
            values in prop::collection::vec((-1e6f64..1e6, -1e3f64..1e3), 1..50)
        ) {
            let rows: Vec<(String, String)> = values
                .iter()
                .map(|(t, v)| (format!("{t}"), format!("{v}")))
                .collect();
            let first = run(&csv_from(&rows), 1.0).unwrap();
            let bytes = export::structured_csv_bytes(&first.series).unwrap();
            let second = normalize(&Upload::new("export.csv", bytes), &NormalizeOptions::default()).unwrap();
            prop_assert_eq!(second.series.points, first.series.points);
        }
    }
}

use std::io::Write;
use std::path::Path;

use crate::error::ExportError;
use crate::state::waveform::WaveformSeries;

/// Header row of the structured download format.
pub const STRUCTURED_HEADER: [&str; 2] = ["time", "voltage"];

fn writer<W: Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out)
}

/// Write a series as `time,voltage` rows in ascending time order.
///
/// Numbers use Rust's shortest round-trip formatting, so reading the file
/// back yields exactly the same values.
pub fn write_structured_csv<W: Write>(series: &WaveformSeries, out: W) -> Result<(), ExportError> {
    let mut wtr = writer(out);
    wtr.write_record(STRUCTURED_HEADER)?;
    for p in &series.points {
        wtr.write_record([p.time.to_string(), p.voltage.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn structured_csv_bytes(series: &WaveformSeries) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_structured_csv(series, &mut buf)?;
    Ok(buf)
}

pub fn save_structured_csv(series: &WaveformSeries, path: &Path) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_structured_csv(series, std::io::BufWriter::new(file))?;
    tracing::info!("Exported {} points to {:?}", series.len(), path);
    Ok(())
}

/// Suggested download name: `capture.csv` becomes `capture_structured.csv`.
pub fn default_export_name(source_filename: &str, suffix: &str) -> String {
    let stem = Path::new(source_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("waveform");
    format!("{stem}_{suffix}.csv")
}

/// Multi-column table of aligned traces sharing one time axis, e.g. noise,
/// signal and the extracted difference.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisTable {
    pub time_label: String,
    pub time: Vec<f64>,
    pub columns: Vec<(String, Vec<f64>)>,
}

impl AnalysisTable {
    pub fn new(time_label: impl Into<String>, time: Vec<f64>) -> Self {
        Self {
            time_label: time_label.into(),
            time,
            columns: Vec::new(),
        }
    }

    pub fn push_column(&mut self, label: impl Into<String>, values: Vec<f64>) -> Result<(), ExportError> {
        if values.len() != self.time.len() {
            return Err(ExportError::ColumnLength);
        }
        self.columns.push((label.into(), values));
        Ok(())
    }

    pub fn write_csv<W: Write>(&self, out: W) -> Result<(), ExportError> {
        let mut wtr = writer(out);
        let mut header = vec![self.time_label.clone()];
        header.extend(self.columns.iter().map(|(label, _)| label.clone()));
        wtr.write_record(&header)?;

        for (i, t) in self.time.iter().enumerate() {
            let mut row = vec![t.to_string()];
            for (_, values) in &self.columns {
                let v = values[i];
                row.push(if v.is_finite() { v.to_string() } else { String::new() });
            }
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ExportError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))?;
        tracing::info!("Exported analysis table ({} rows) to {:?}", self.time.len(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::waveform::{SeriesMetadata, WaveformPoint};

    fn series(points: &[(f64, f64)]) -> WaveformSeries {
        WaveformSeries::new(
            points.iter().map(|&(t, v)| WaveformPoint::new(t, v)).collect(),
            SeriesMetadata {
                source_filename: "scope.csv".to_string(),
                sample_count: 0,
                time_unit: "s".to_string(),
                base_time_unit: "s".to_string(),
                voltage_unit: "V".to_string(),
                scale_factor: 1.0,
                sample_rate_hz: None,
            },
        )
    }

    #[test]
    fn test_structured_format() {
        let bytes = structured_csv_bytes(&series(&[(0.0, 1.2), (1.0, 1.5), (2.5, -0.0001)])).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "time,voltage\n0,1.2\n1,1.5\n2.5,-0.0001\n"
        );
    }

    #[test]
    fn test_empty_series_writes_header_only() {
        let bytes = structured_csv_bytes(&series(&[])).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "time,voltage\n");
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        save_structured_csv(&series(&[(0.0, 1.0)]), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "time,voltage\n0,1\n");
    }

    #[test]
    fn test_default_export_name() {
        assert_eq!(default_export_name("capture.csv", "structured"), "capture_structured.csv");
        assert_eq!(default_export_name("", "analysis"), "waveform_analysis.csv");
    }

    #[test]
    fn test_analysis_table() {
        let mut table = AnalysisTable::new("Time (s)", vec![0.0, 1.0]);
        table.push_column("Noise (V)", vec![0.1, 0.2]).unwrap();
        table.push_column("Signal (V)", vec![1.0, f64::NAN]).unwrap();
        assert!(matches!(
            table.push_column("Bad", vec![1.0]),
            Err(ExportError::ColumnLength)
        ));

        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Time (s),Noise (V),Signal (V)\n0,0.1,1\n1,0.2,\n"
        );
    }
}

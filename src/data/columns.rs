/// Header names recognised as the time axis, in priority order.
pub const TIME_ALIASES: &[&str] = &[
    "time",
    "t",
    "seconds",
    "second",
    "sec",
    "s",
    "x",
    "timestamp",
];

/// Header names recognised as the voltage channel, in priority order.
pub const VOLTAGE_ALIASES: &[&str] = &[
    "ch1",
    "voltage",
    "amplitude",
    "volt",
    "v",
    "signal",
    "ch2",
    "ch3",
    "ch4",
    "y",
];

/// Split a header like `Time (ms)` or `CH1[V]` into its name and unit.
pub fn split_header(header: &str) -> (&str, Option<&str>) {
    let trimmed = header.trim();
    for (open, close) in [('(', ')'), ('[', ']')] {
        if let Some(stripped) = trimmed.strip_suffix(close) {
            if let Some(idx) = stripped.rfind(open) {
                let name = stripped[..idx].trim();
                let unit = stripped[idx + open.len_utf8()..].trim();
                if !name.is_empty() {
                    return (name, (!unit.is_empty()).then_some(unit));
                }
            }
        }
    }
    (trimmed, None)
}

/// Outcome of looking up one alias list against the headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMatch {
    Found(usize),
    NotFound,
    /// The winning alias matched several columns.
    Ambiguous(&'static str, Vec<usize>),
}

/// Find the column for the first alias (in list order) that matches any
/// header, skipping `exclude`. Matching ignores case and unit suffixes.
pub fn find_column(headers: &[String], aliases: &[&'static str], exclude: Option<usize>) -> ColumnMatch {
    for &alias in aliases {
        let hits: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != exclude)
            .filter(|(_, h)| split_header(h).0.eq_ignore_ascii_case(alias))
            .map(|(idx, _)| idx)
            .collect();

        match hits.len() {
            0 => continue,
            1 => return ColumnMatch::Found(hits[0]),
            _ => return ColumnMatch::Ambiguous(alias, hits),
        }
    }
    ColumnMatch::NotFound
}

/// Find a column the user named explicitly.
pub fn find_named(headers: &[String], name: &str) -> Option<usize> {
    let wanted = name.trim();
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(wanted))
        .or_else(|| headers.iter().position(|h| split_header(h).0.eq_ignore_ascii_case(wanted)))
}

/// Infer the time unit from a header unit or a units-row cell.
pub fn infer_time_unit(text: &str) -> Option<String> {
    let lower = text.trim().to_lowercase();
    let unit = match lower.as_str() {
        "" => return None,
        "s" | "sec" | "second" | "seconds" => "s",
        "ms" | "msec" | "millisecond" | "milliseconds" => "ms",
        "us" | "\u{b5}s" | "\u{3bc}s" | "usec" | "microsecond" | "microseconds" => "us",
        "ns" | "nsec" | "nanosecond" | "nanoseconds" => "ns",
        "ps" | "picosecond" | "picoseconds" => "ps",
        _ => return Some(text.trim().to_string()),
    };
    Some(unit.to_string())
}

/// Infer the voltage unit from a header unit or a units-row cell.
pub fn infer_voltage_unit(text: &str) -> Option<String> {
    let lower = text.trim().to_lowercase();
    let unit = match lower.as_str() {
        "" => return None,
        "v" | "volt" | "volts" => "V",
        "mv" | "millivolt" | "millivolts" => "mV",
        "uv" | "\u{b5}v" | "\u{3bc}v" | "microvolt" | "microvolts" => "uV",
        "kv" | "kilovolt" | "kilovolts" => "kV",
        _ => return Some(text.trim().to_string()),
    };
    Some(unit.to_string())
}

/// Whether a units-row cell names a unit we know, e.g. `Second` or `Volt`.
pub fn is_known_unit(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    [
        "s", "sec", "second", "seconds", "ms", "us", "\u{b5}s", "ns", "ps",
        "v", "volt", "volts", "mv", "uv", "\u{b5}v", "kv", "a", "ma", "sequence",
    ]
    .contains(&lower.as_str())
}

const TIME_LADDER: &[&str] = &["s", "ms", "us", "ns", "ps"];

/// Length of one time unit in seconds, for units [`infer_time_unit`] yields.
pub fn seconds_per_unit(unit: &str) -> Option<f64> {
    TIME_LADDER
        .iter()
        .position(|u| *u == unit)
        .map(|pos| 10f64.powi(-3 * pos as i32))
}

/// Label for the time unit after multiplying every time by `scale_factor`.
///
/// Powers of 1000 walk the SI ladder (`s` x 1000 is `ms`); other factors are
/// spelled out.
pub fn scaled_time_unit(unit: &str, scale_factor: f64) -> String {
    if scale_factor == 1.0 {
        return unit.to_string();
    }

    if let Some(pos) = TIME_LADDER.iter().position(|u| *u == unit) {
        let steps = scale_factor.log10() / 3.0;
        let rounded = steps.round();
        let exact = 10f64.powf(rounded * 3.0);
        if (steps - rounded).abs() < 1e-9 && (exact - scale_factor).abs() <= exact * 1e-12 {
            let target = pos as i64 + rounded as i64;
            if let Ok(target) = usize::try_from(target) {
                if let Some(u) = TIME_LADDER.get(target) {
                    return u.to_string();
                }
            }
        }
    }
    format!("{unit}\u{00d7}{scale_factor}")
}

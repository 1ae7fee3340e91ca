/// Metadata lines found above the data section of a DSO export, e.g.
/// `Sampling rate:100kSa/s` or `Points:10000`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preamble {
    pub entries: Vec<(String, String)>,
}

impl Preamble {
    /// Interpret a record as a `Key:Value` metadata line.
    ///
    /// The record must have exactly one non-empty field, and the text before
    /// the first `:` must contain a letter so that clock times like `12:30:01`
    /// are not mistaken for metadata.
    pub fn metadata_entry(fields: &[&str]) -> Option<(String, String)> {
        let mut non_empty = fields.iter().map(|f| f.trim()).filter(|f| !f.is_empty());
        let field = non_empty.next()?;
        if non_empty.next().is_some() {
            return None;
        }

        let (key, value) = field.split_once(':')?;
        let key = key.trim();
        if !key.chars().any(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        Some((key.to_string(), value.trim().to_string()))
    }

    pub fn push(&mut self, key: String, value: String) {
        self.entries.push((key, value));
    }

    fn find(&self, pred: impl Fn(&str) -> bool) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| pred(&k.to_lowercase()))
            .map(|(_, v)| v.as_str())
    }

    /// Declared sample rate in samples per second.
    ///
    /// Falls back to the reciprocal of a declared sample interval.
    pub fn sample_rate_hz(&self) -> Option<f64> {
        let rate = self
            .find(|k| k.contains("sampl") && k.contains("rate"))
            .and_then(parse_quantity)
            .filter(|r| *r > 0.0);
        if rate.is_some() {
            return rate;
        }

        self.find(|k| k.contains("interval") || k.contains("increment"))
            .and_then(parse_quantity)
            .filter(|dt| *dt > 0.0)
            .map(|dt| 1.0 / dt)
    }

    /// Declared number of acquired points.
    pub fn point_count(&self) -> Option<usize> {
        self.find(|k| k.contains("point") || k.contains("length") || k.contains("depth"))
            .and_then(parse_quantity)
            .filter(|n| *n >= 1.0)
            .map(|n| n.round() as usize)
    }

    pub fn voltage_unit(&self) -> Option<String> {
        self.find(|k| k.contains("unit") && !k.contains("horiz") && !k.contains("time"))
            .map(|v| v.to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Parse a number with an optional SI prefix and unit, e.g. `100kSa/s`,
/// `1 MSa/s`, `2.5e6`, `500Hz` or `2us`.
pub fn parse_quantity(text: &str) -> Option<f64> {
    let text = text.trim();
    let numeric_len = text
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;

    // Back off until the prefix parses: "5e" in "5eSa" is not a number.
    let (value, rest) = (1..=numeric_len)
        .rev()
        .filter(|&end| text.is_char_boundary(end))
        .find_map(|end| text[..end].parse::<f64>().ok().map(|v| (v, &text[end..])))?;

    if !value.is_finite() {
        return None;
    }

    let multiplier = match rest.trim_start().chars().next() {
        Some('p') => 1e-12,
        Some('n') => 1e-9,
        Some('u') | Some('\u{b5}') | Some('\u{3bc}') => 1e-6,
        Some('m') => 1e-3,
        Some('k') | Some('K') => 1e3,
        Some('M') => 1e6,
        Some('G') => 1e9,
        _ => 1.0,
    };
    Some(value * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preamble(lines: &[(&str, &str)]) -> Preamble {
        Preamble {
            entries: lines
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_metadata_entry_detection() {
        assert_eq!(
            Preamble::metadata_entry(&["Sampling rate:100kSa/s"]),
            Some(("Sampling rate".to_string(), "100kSa/s".to_string()))
        );
        assert_eq!(
            Preamble::metadata_entry(&["Points: 1200", "", ""]),
            Some(("Points".to_string(), "1200".to_string()))
        );
        assert_eq!(Preamble::metadata_entry(&["12:30:01"]), None);
        assert_eq!(Preamble::metadata_entry(&["Time", "CH1"]), None);
        assert_eq!(Preamble::metadata_entry(&["CH1"]), None);
        assert_eq!(Preamble::metadata_entry(&["", ""]), None);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("100kSa/s"), Some(100_000.0));
        assert_eq!(parse_quantity(" 1 MSa/s"), Some(1_000_000.0));
        assert_eq!(parse_quantity("2.5e6"), Some(2_500_000.0));
        assert_eq!(parse_quantity("500Hz"), Some(500.0));
        assert_eq!(parse_quantity("1200"), Some(1200.0));
        assert_eq!(parse_quantity("4e"), Some(4.0));
        assert_eq!(parse_quantity("fast"), None);
        assert_eq!(parse_quantity(""), None);
    }

    #[test]
    fn test_sample_rate_from_rate_or_interval() {
        let p = preamble(&[("Sampling rate", "100kSa/s")]);
        assert_eq!(p.sample_rate_hz(), Some(100_000.0));

        let p = preamble(&[("Sample Interval", "0.5")]);
        assert_eq!(p.sample_rate_hz(), Some(2.0));

        let p = preamble(&[("Source", "CH1")]);
        assert_eq!(p.sample_rate_hz(), None);
    }

    #[test]
    fn test_point_count_and_unit() {
        let p = preamble(&[("Memory Depth", "10k"), ("Vertical Unit", "mV")]);
        assert_eq!(p.point_count(), Some(10_000));
        assert_eq!(p.voltage_unit(), Some("mV".to_string()));
        assert!(!p.entries.is_empty());
    }
}

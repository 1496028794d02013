//! Response parsers for the TDS2024B's ASCII replies.
//!
//! The instrument answers with or without SCPI headers depending on its
//! `header` setting, e.g. `:WFMPRE:CH1:XINCR 2.0E-6` or plain `2.0E-6`.
//! Every parser here accepts both forms. Labels are matched on the last
//! segment of the header, case-insensitively.

use crate::error::{ScopeError, ScopeResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// A single preamble field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PreambleValue {
    /// Numeric field such as `XINCR 2.0E-6`
    Number(f64),
    /// Enumerated or quoted field such as `ENCDG ASC` or `WFID "Ch1, ..."`
    Text(String),
}

impl PreambleValue {
    fn from_raw(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(quoted) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            return PreambleValue::Text(quoted.to_string());
        }
        match raw.parse::<f64>() {
            Ok(number) => PreambleValue::Number(number),
            Err(_) => PreambleValue::Text(raw.to_string()),
        }
    }

    /// The numeric value, if this field is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PreambleValue::Number(n) => Some(*n),
            PreambleValue::Text(_) => None,
        }
    }

    /// The text value, if this field is not numeric.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PreambleValue::Text(s) => Some(s),
            PreambleValue::Number(_) => None,
        }
    }
}

/// Waveform scaling metadata returned by `wfmpre?`.
///
/// The response is a semicolon-separated list of `NAME value` pairs; field
/// order does not matter and unknown fields are kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveformPreamble {
    fields: BTreeMap<String, PreambleValue>,
}

impl WaveformPreamble {
    /// Parses a labeled preamble response.
    ///
    /// # Errors
    /// `ScopeError::Parse` if the response contains no labeled fields (for
    /// instance when the instrument has headers switched off).
    pub fn parse(response: &str) -> ScopeResult<Self> {
        let fields: BTreeMap<String, PreambleValue> = split_fields(response)
            .into_iter()
            .filter_map(labeled_field)
            .map(|(name, value)| (name.to_ascii_uppercase(), PreambleValue::from_raw(value)))
            .collect();

        if fields.is_empty() {
            return Err(ScopeError::parse("waveform preamble", response.trim()));
        }
        Ok(Self { fields })
    }

    /// Looks up a field by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&PreambleValue> {
        self.fields.get(&name.to_ascii_uppercase())
    }

    /// A numeric field.
    ///
    /// # Errors
    /// `ScopeError::Parse` if the field is missing or not numeric.
    pub fn number(&self, name: &str) -> ScopeResult<f64> {
        match self.get(name) {
            Some(PreambleValue::Number(n)) => Ok(*n),
            Some(PreambleValue::Text(text)) => Err(ScopeError::parse(name, text.as_str())),
            None => Err(ScopeError::parse(name, self.describe())),
        }
    }

    /// A text field, `None` if missing or numeric.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PreambleValue::as_str)
    }

    /// Seconds per sample.
    pub fn xincr(&self) -> ScopeResult<f64> {
        self.number("XINCR")
    }

    /// Time of the first sample relative to the trigger.
    pub fn xzero(&self) -> ScopeResult<f64> {
        self.number("XZERO")
    }

    /// Volts per digitizer count.
    pub fn ymult(&self) -> ScopeResult<f64> {
        self.number("YMULT")
    }

    /// Digitizer count offset.
    pub fn yoff(&self) -> ScopeResult<f64> {
        self.number("YOFF")
    }

    /// Vertical offset in volts.
    pub fn yzero(&self) -> ScopeResult<f64> {
        self.number("YZERO")
    }

    /// Number of points in the transferred record.
    pub fn nr_pt(&self) -> ScopeResult<usize> {
        let points = self.number("NR_PT")?;
        if points < 0.0 || points.fract() != 0.0 {
            return Err(ScopeError::parse("NR_PT", points.to_string()));
        }
        Ok(points as usize)
    }

    /// Waveform identifier string, e.g. `Ch1, DC coupling, ...`.
    pub fn wfid(&self) -> Option<&str> {
        self.text("WFID")
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PreambleValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parsed fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if no field was parsed. Never true for a value built by `parse`.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn describe(&self) -> String {
        let names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        format!("fields [{}]", names.join(", "))
    }
}

impl FromStr for WaveformPreamble {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Extracts the number following `label` in a response.
///
/// Accepts `VALUE 3.25E-2`, `:MEASUREMENT:IMMED:VALUE 3.25E-2`, a label
/// inside a semicolon-separated list, or a bare number when headers are off.
pub fn parse_labeled_value(response: &str, label: &str) -> ScopeResult<f64> {
    let trimmed = response.trim();
    for (name, value) in split_fields(trimmed).into_iter().filter_map(labeled_field) {
        if name.eq_ignore_ascii_case(label) {
            return value
                .trim()
                .parse::<f64>()
                .map_err(|_| ScopeError::parse(label, trimmed));
        }
    }
    trimmed
        .parse::<f64>()
        .map_err(|_| ScopeError::parse(label, trimmed))
}

/// Parses a `curve?` response into raw digitizer counts.
///
/// The leading `:CURVE` header and stray commas around the list are dropped.
pub fn parse_curve(response: &str) -> ScopeResult<Vec<i32>> {
    let trimmed = response.trim();
    let body = if trimmed.starts_with(|c: char| c == ':' || c.is_ascii_alphabetic()) {
        trimmed
            .split_once(char::is_whitespace)
            .map_or("", |(_, rest)| rest)
    } else {
        trimmed
    };
    let body = body.trim_matches(|c: char| c == ',' || c.is_whitespace());
    if body.is_empty() {
        return Err(ScopeError::parse("curve data", trimmed));
    }

    body.split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<i32>()
                .map_err(|_| ScopeError::parse("curve sample", token))
        })
        .collect()
}

/// Parses an `*opc?` reply.
pub fn parse_opc(response: &str) -> ScopeResult<bool> {
    match last_token(response) {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(ScopeError::parse("operation complete flag", response.trim())),
    }
}

/// Parses an 8-bit status register reply such as `*esr?` or `*stb?`.
pub fn parse_register(response: &str, what: &str) -> ScopeResult<u8> {
    last_token(response)
        .parse::<u8>()
        .map_err(|_| ScopeError::parse(what, response.trim()))
}

fn last_token(response: &str) -> &str {
    response.split_whitespace().last().unwrap_or("")
}

/// Splits on `;` outside double quotes.
fn split_fields(response: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (i, c) in response.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                fields.push(&response[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(&response[start..]);
    fields
}

/// `:WFMPRE:CH1:XINCR 2.0E-6` -> `("XINCR", "2.0E-6")`
fn labeled_field(field: &str) -> Option<(&str, &str)> {
    let (header, value) = field.trim().split_once(char::is_whitespace)?;
    let name = header.rsplit(':').next().unwrap_or(header);
    if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '*') {
        return None;
    }
    Some((name, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREAMBLE: &str = ":WFMPRE:BYT_NR 1;BIT_NR 8;ENCDG ASC;BN_FMT RP;BYT_OR MSB;\
NR_PT 2500;WFID \"Ch1, DC coupling, 2.0E0 V/div, 5.0E-4 s/div, 2500 points, Sample mode\";\
PT_FMT Y;XINCR 2.0E-6;PT_OFF 0;XZERO -2.5E-3;XUNIT \"s\";YMULT 8.0E-2;YZERO 0.0E0;\
YOFF 2.5E1;YUNIT \"Volts\"\n";

    #[test]
    fn test_preamble_fields() {
        let preamble = WaveformPreamble::parse(PREAMBLE).unwrap();
        assert_eq!(preamble.xincr().unwrap(), 2.0e-6);
        assert_eq!(preamble.ymult().unwrap(), 8.0e-2);
        assert_eq!(preamble.yoff().unwrap(), 25.0);
        assert_eq!(preamble.yzero().unwrap(), 0.0);
        assert_eq!(preamble.xzero().unwrap(), -2.5e-3);
        assert_eq!(preamble.nr_pt().unwrap(), 2500);
        assert_eq!(preamble.text("encdg"), Some("ASC"));
        assert_eq!(preamble.text("YUNIT"), Some("Volts"));
        assert!(preamble.wfid().unwrap().starts_with("Ch1, DC coupling"));
    }

    #[test]
    fn test_preamble_is_order_independent() {
        let a = WaveformPreamble::parse("YOFF 5;YMULT 0.1;XINCR 0.001").unwrap();
        let b = WaveformPreamble::parse("XINCR 0.001;YMULT 0.1;YOFF 5").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_preamble_missing_field() {
        let preamble = WaveformPreamble::parse("XINCR 0.001").unwrap();
        let err = preamble.ymult().unwrap_err();
        assert!(matches!(err, ScopeError::Parse { ref what, .. } if what == "YMULT"));
    }

    #[test]
    fn test_preamble_text_where_number_expected() {
        let preamble = WaveformPreamble::parse("YMULT abc").unwrap();
        assert!(preamble.ymult().is_err());
    }

    #[test]
    fn test_headerless_preamble_rejected() {
        assert!(WaveformPreamble::parse("1;8;ASC;RP;MSB;2500").is_err());
        assert!("".parse::<WaveformPreamble>().is_err());
    }

    #[test]
    fn test_labeled_value_forms() {
        assert_eq!(parse_labeled_value("VALUE 3.25E-2\n", "VALUE").unwrap(), 3.25e-2);
        assert_eq!(
            parse_labeled_value(":MEASUREMENT:IMMED:VALUE 1.5E3", "value").unwrap(),
            1.5e3
        );
        assert_eq!(
            parse_labeled_value(":WFMPRE:CH1:XINCR 1.0E-3", "XINCR").unwrap(),
            1.0e-3
        );
        assert_eq!(parse_labeled_value("4.0E-6\n", "XINCR").unwrap(), 4.0e-6);
    }

    #[test]
    fn test_labeled_value_errors() {
        assert!(parse_labeled_value("", "VALUE").is_err());
        assert!(parse_labeled_value("VALUE high", "VALUE").is_err());
        assert!(parse_labeled_value("TYPE FREQ", "VALUE").is_err());
    }

    #[test]
    fn test_curve_with_header() {
        assert_eq!(
            parse_curve(":CURVE 10,20,30,40\n").unwrap(),
            vec![10, 20, 30, 40]
        );
    }

    #[test]
    fn test_curve_without_header_and_stray_commas() {
        assert_eq!(parse_curve(",-5,0,127,-128,\n").unwrap(), vec![-5, 0, 127, -128]);
        assert_eq!(parse_curve("1, 2 ,3").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_curve_errors() {
        assert!(parse_curve(":CURVE \n").is_err());
        assert!(parse_curve("").is_err());
        let err = parse_curve(":CURVE 1,x,3").unwrap_err();
        assert!(matches!(err, ScopeError::Parse { ref response, .. } if response == "x"));
    }

    #[test]
    fn test_opc_and_registers() {
        assert!(parse_opc("1\n").unwrap());
        assert!(!parse_opc("0\n").unwrap());
        assert!(parse_opc(":*OPC 1").unwrap());
        assert!(parse_opc("").is_err());
        assert_eq!(parse_register("32\n", "ESR").unwrap(), 32);
        assert!(parse_register("300", "STB").is_err());
    }
}

//! Device parameters, their values and reported ranges.
//!
//! Parameter values travel as [`ParamValue`] and are grouped in an
//! insertion-ordered [`ParameterSet`]. Valid ranges are facts reported by
//! the device and are queried separately; they never travel inside a set.

use std::fmt;

/// Exposure time in microseconds.
pub const EXPOSURE_TIME: &str = "ExposureTime";
/// Frame width in pixels.
pub const WIDTH: &str = "Width";
/// Frame height in pixels.
pub const HEIGHT: &str = "Height";
/// Analog gain.
pub const GAIN: &str = "Gain";
/// Auto white balance mode (`Off` / `Once`).
pub const BALANCE_WHITE_AUTO: &str = "BalanceWhiteAuto";
/// Trigger switch (`Off` for continuous, `On` for triggered).
pub const TRIGGER_MODE: &str = "TriggerMode";
/// Trigger source used while triggered.
pub const TRIGGER_SOURCE: &str = "TriggerSource";
/// Command issued before each grab while triggered.
pub const TRIGGER_SOFTWARE: &str = "TriggerSoftware";
/// Gamma used by image quality enhancement.
pub const GAMMA_PARAM: &str = "GammaParam";
/// Contrast used by image quality enhancement.
pub const CONTRAST_PARAM: &str = "ContrastParam";

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Interprets config-file text: quoted text, then integers, then floats,
    /// else text.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            return Self::Text(inner.to_owned());
        }
        if let Ok(v) = text.parse::<i64>() {
            return Self::Int(v);
        }
        if let Ok(v) = text.parse::<f64>() {
            return Self::Float(v);
        }
        Self::Text(text.to_owned())
    }

    /// Config-file form of the value. Text that [`parse`](Self::parse)
    /// would not read back unchanged is wrapped in double quotes.
    pub fn to_config_text(&self) -> String {
        match self {
            Self::Text(s) if Self::parse(s) != *self => format!("\"{s}\""),
            other => other.to_string(),
        }
    }

    /// Returns the numeric value, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Returns the textual value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            // Debug keeps the fractional part (`1000.0`) so the value parses back as a float.
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Inclusive bounds reported by the device for a numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

impl ParamRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Checks a value against the bounds. Text values have no numeric
    /// interpretation and are left to the device to accept or reject.
    pub fn contains(&self, value: &ParamValue) -> bool {
        match value.as_f64() {
            Some(v) => v >= self.min && v <= self.max,
            None => true,
        }
    }
}

impl fmt::Display for ParamRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Ordered mapping from parameter name to value.
///
/// Iteration follows first-insertion order; re-inserting an existing name
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: Vec<(String, ParamValue)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefers_integers() {
        assert_eq!(ParamValue::parse("640"), ParamValue::Int(640));
        assert_eq!(ParamValue::parse(" 1000.5 "), ParamValue::Float(1000.5));
        assert_eq!(ParamValue::parse("Once"), ParamValue::Text("Once".into()));
    }

    #[test]
    fn test_float_display_parses_back_as_float() {
        let v = ParamValue::Float(1000.0);
        assert_eq!(v.to_string(), "1000.0");
        assert_eq!(ParamValue::parse(&v.to_string()), v);
    }

    #[test]
    fn test_numeric_looking_text_is_quoted() {
        for text in ["0042", "inf", "nan", " padded ", "\"quoted\""] {
            let v = ParamValue::from(text);
            let rendered = v.to_config_text();
            assert!(rendered.starts_with('"'), "{rendered}");
            assert_eq!(ParamValue::parse(&rendered), v);
        }
        assert_eq!(ParamValue::from("Once").to_config_text(), "Once");
        assert_eq!(ParamValue::Int(42).to_config_text(), "42");
        assert_eq!(ParamValue::parse("\"\""), ParamValue::from(""));
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = ParamRange::new(100.0, 1000.0);
        assert!(range.contains(&ParamValue::Int(100)));
        assert!(range.contains(&ParamValue::Float(1000.0)));
        assert!(!range.contains(&ParamValue::Int(99)));
        assert!(!range.contains(&ParamValue::Float(1000.5)));
        assert!(range.contains(&ParamValue::from("Off")));
    }

    #[test]
    fn test_set_keeps_insertion_order_on_replace() {
        let mut set = ParameterSet::new();
        set.insert(WIDTH, 640i64);
        set.insert(HEIGHT, 480i64);
        assert_eq!(set.insert(WIDTH, 320i64), Some(ParamValue::Int(640)));

        let names: Vec<_> = set.names().collect();
        assert_eq!(names, vec![WIDTH, HEIGHT]);
        assert_eq!(set.get(WIDTH), Some(&ParamValue::Int(320)));
    }

    #[test]
    fn test_remove() {
        let mut set: ParameterSet = [(GAIN, 1.5f64)].into_iter().collect();
        assert_eq!(set.remove(GAIN), Some(ParamValue::Float(1.5)));
        assert!(set.is_empty());
        assert_eq!(set.remove(GAIN), None);
    }
}

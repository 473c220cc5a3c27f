use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Value & Unit ─────────────────────────────────────────────────

/// Primary display value of a status. Numbers stay numbers until the
/// status is formatted so that units can rescale them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Default for Value {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Scale divisor and suffix applied to numeric values, e.g. `(1024, "K")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub scale: f64,
    pub suffix: String,
}

impl Unit {
    pub fn new(scale: f64, suffix: impl Into<String>) -> Self {
        Self {
            scale,
            suffix: suffix.into(),
        }
    }

    fn apply(&self, value: &Value) -> Value {
        if self.scale == 1.0 || self.scale == 0.0 {
            return value.clone();
        }
        match value {
            Value::Int(v) => Value::Float(*v as f64 / self.scale),
            Value::Float(v) => Value::Float(v / self.scale),
            Value::Text(_) => value.clone(),
        }
    }
}

// ─── Content (wire form) ──────────────────────────────────────────

/// What a bus property carries: the label glyph and the formatted value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Content {
    pub label: String,
    pub text: String,
}

impl Content {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

// ─── StatusValue ──────────────────────────────────────────────────

/// One displayable metric, published on the bus under `tag`.
///
/// `format` holds a single placeholder: `{}`, optionally with a right-aligned
/// width and a precision (`{:>3}`, `{:.1}`, `{:>5.1}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusValue {
    pub tag: String,
    pub label: String,
    pub value: Value,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl StatusValue {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            label: String::new(),
            value: Value::default(),
            format: "{}".to_string(),
            unit: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// True when label or value differ; format and unit are fixed per tag.
    pub fn differs_from(&self, other: &StatusValue) -> bool {
        self.label != other.label || self.value != other.value
    }

    /// Render the value through the format template and unit.
    pub fn text(&self) -> String {
        let value = match &self.unit {
            Some(unit) => unit.apply(&self.value),
            None => self.value.clone(),
        };
        let mut out = apply_format(&self.format, &value);
        if let Some(unit) = &self.unit {
            out.push_str(&unit.suffix);
        }
        out
    }

    pub fn content(&self) -> Content {
        Content {
            label: self.label.clone(),
            text: self.text(),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct Placeholder {
    width: Option<usize>,
    precision: Option<usize>,
}

/// Parse the inside of `{...}`. Returns `None` for anything that is not a
/// supported placeholder so that literal braces pass through.
fn parse_placeholder(inner: &str) -> Option<Placeholder> {
    if inner.is_empty() {
        return Some(Placeholder::default());
    }
    let spec = inner.strip_prefix(':')?;
    let spec = spec.strip_prefix('>').unwrap_or(spec);
    let (width, precision) = match spec.split_once('.') {
        Some((w, p)) => (w, Some(p)),
        None => (spec, None),
    };
    let width = if width.is_empty() {
        None
    } else {
        Some(width.parse().ok()?)
    };
    let precision = match precision {
        Some(p) => Some(p.parse().ok()?),
        None => None,
    };
    Some(Placeholder { width, precision })
}

fn render_value(value: &Value, placeholder: &Placeholder) -> String {
    let raw = match (value, placeholder.precision) {
        (Value::Float(v), Some(p)) => format!("{v:.p$}"),
        (Value::Float(v), None) if v.fract() == 0.0 => format!("{v:.0}"),
        (Value::Int(v), Some(p)) => format!("{:.p$}", *v as f64),
        (v, _) => v.to_string(),
    };
    match placeholder.width {
        Some(w) => format!("{raw:>w$}"),
        None => raw,
    }
}

/// Substitute `value` into the first placeholder of `template`. A template
/// without a placeholder gets the value appended.
pub fn apply_format(template: &str, value: &Value) -> String {
    let mut search_from = 0;
    while let Some(rel_open) = template[search_from..].find('{') {
        let open = search_from + rel_open;
        let Some(rel_close) = template[open..].find('}') else {
            break;
        };
        let close = open + rel_close;
        if let Some(placeholder) = parse_placeholder(&template[open + 1..close]) {
            let mut out = String::with_capacity(template.len() + 8);
            out.push_str(&template[..open]);
            out.push_str(&render_value(value, &placeholder));
            out.push_str(&template[close + 1..]);
            return out;
        }
        search_from = close + 1;
    }
    format!("{template}{value}")
}

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ids::is_hex;

/// Declared type of a field. Values are never coerced between kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    String,
    Integer,
    Boolean,
    Array(Box<Kind>),
}

/// Constraint applied after the kind check. On arrays it applies to each element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    MinLength(usize),
    MaxLength(usize),
    Length(usize),
    Min(i64),
    Max(i64),
    OneOf(&'static [&'static str]),
    /// Absolute `http`/`https` URL.
    Url,
    Hex,
}

#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    kind: Kind,
    required: bool,
    trim: bool,
    default: Option<Value>,
    rules: Vec<Rule>,
}

impl Field {
    fn new(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: true,
            trim: false,
            default: None,
            rules: Vec::new(),
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, Kind::String)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, Kind::Integer)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, Kind::Boolean)
    }

    pub fn array(name: &'static str, of: Kind) -> Self {
        Self::new(name, Kind::Array(Box::new(of)))
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Value used when the field is absent. Implies optional.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    /// Strip surrounding whitespace from string values before rules run.
    pub fn trimmed(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// Ordered fields of one request section.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    fields: Vec<Field>,
}

impl Shape {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }
}

/// Raw or normalised request sections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sections {
    pub body: Value,
    pub params: Value,
    pub query: Value,
}

impl Default for Sections {
    fn default() -> Self {
        Self {
            body: Value::Object(Map::new()),
            params: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    body: Option<Shape>,
    params: Option<Shape>,
    query: Option<Shape>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, shape: Shape) -> Self {
        self.body = Some(shape);
        self
    }

    pub fn params(mut self, shape: Shape) -> Self {
        self.params = Some(shape);
        self
    }

    pub fn query(mut self, shape: Shape) -> Self {
        self.query = Some(shape);
        self
    }

    pub fn expects_body(&self) -> bool {
        self.body.is_some()
    }

    /// Validate `input` and return the normalised sections, or the message
    /// of the first failure. Section shapes are checked before any field;
    /// fields are checked in declaration order.
    pub fn check(&self, input: &Sections) -> Result<Sections, String> {
        let sections = [
            (&self.body, &input.body, "request body must be a JSON object"),
            (&self.params, &input.params, "path parameters must be an object"),
            (&self.query, &input.query, "query string must be an object"),
        ];

        for (shape, value, message) in &sections {
            if shape.is_some() && !value.is_object() {
                return Err((*message).to_string());
            }
        }

        let mut out = Sections::default();
        let targets = [&mut out.body, &mut out.params, &mut out.query];
        for ((shape, value, _), target) in sections.iter().zip(targets) {
            if let (Some(shape), Some(object)) = (shape, value.as_object()) {
                *target = Value::Object(check_shape(shape, object)?);
            }
        }
        Ok(out)
    }
}

fn check_shape(shape: &Shape, input: &Map<String, Value>) -> Result<Map<String, Value>, String> {
    let mut out = Map::new();
    for field in &shape.fields {
        match input.get(field.name) {
            Some(value) => {
                let normalised = check_value(field.name, &field.kind, field, value)?;
                out.insert(field.name.to_string(), normalised);
            }
            None => {
                if let Some(default) = &field.default {
                    out.insert(field.name.to_string(), default.clone());
                } else if field.required {
                    return Err(format!("{} is required", field.name));
                }
            }
        }
    }
    Ok(out)
}

fn check_value(path: &str, kind: &Kind, field: &Field, value: &Value) -> Result<Value, String> {
    match kind {
        Kind::String => {
            let s = value
                .as_str()
                .ok_or_else(|| format!("{path} must be a string"))?;
            let s = if field.trim { s.trim() } else { s };
            check_text(path, s, &field.rules)?;
            Ok(Value::String(s.to_string()))
        }
        Kind::Integer => {
            let n = as_whole_number(value).ok_or_else(|| format!("{path} must be an integer"))?;
            check_number(path, n, &field.rules)?;
            Ok(Value::from(n))
        }
        Kind::Boolean => value
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| format!("{path} must be a boolean")),
        Kind::Array(inner) => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("{path} must be an array"))?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| check_value(&format!("{path}[{i}]"), inner, field, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
    }
}

/// Accepts `2025` and `2025.0`, rejects `2025.5` and anything outside `i64`.
fn as_whole_number(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() != 0.0 || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return None;
    }
    Some(f as i64)
}

fn check_text(path: &str, s: &str, rules: &[Rule]) -> Result<(), String> {
    let len = s.chars().count();
    for rule in rules {
        match rule {
            Rule::MinLength(1) if len == 0 => return Err(format!("{path} must not be empty")),
            Rule::MinLength(min) if len < *min => {
                return Err(format!("{path} must be at least {min} characters"))
            }
            Rule::MaxLength(max) if len > *max => {
                return Err(format!("{path} must be at most {max} characters"))
            }
            Rule::Length(exact) if len != *exact => {
                return Err(format!("{path} must be exactly {exact} characters"))
            }
            Rule::OneOf(allowed) if !allowed.contains(&s) => {
                return Err(format!("{path} must be one of: {}", allowed.join(", ")))
            }
            Rule::Url if !is_web_url(s) => return Err(format!("{path} must be a valid URL")),
            Rule::Hex if !is_hex(s) => {
                return Err(format!("{path} must be a hexadecimal string"))
            }
            _ => {}
        }
    }
    Ok(())
}

fn check_number(path: &str, n: i64, rules: &[Rule]) -> Result<(), String> {
    for rule in rules {
        match rule {
            Rule::Min(min) if n < *min => {
                return Err(format!("{path} must be greater than or equal to {min}"))
            }
            Rule::Max(max) if n > *max => {
                return Err(format!("{path} must be less than or equal to {max}"))
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_web_url(s: &str) -> bool {
    url::Url::parse(s)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

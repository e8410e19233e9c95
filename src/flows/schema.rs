//! Declarative shapes for flow inputs/outputs and log records.
//!
//! Validation is a pure function returning `Result<(), Violation>`; callers
//! decide which error kind a violation becomes.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::media::from_data_uri;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    String,
    Number,
    Integer,
    Boolean,
    Enum(Vec<&'static str>),
    /// A string holding a base64 data URI (or bare base64 payload).
    DataUri,
    Array(Box<Shape>),
    Object(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub shape: Shape,
    pub required: bool,
    pub description: &'static str,
}

impl Field {
    pub fn required(name: &'static str, shape: Shape, description: &'static str) -> Self {
        Self {
            name,
            shape,
            required: true,
            description,
        }
    }

    pub fn optional(name: &'static str, shape: Shape, description: &'static str) -> Self {
        Self {
            name,
            shape,
            required: false,
            description,
        }
    }
}

/// Where a value failed its shape, as a JSON path like `$.goals[1].target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn root(message: impl Into<String>) -> Self {
        Self::new("$", message)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl std::error::Error for Violation {}

/// Target vocabulary for [`Shape::to_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Lower-case JSON Schema, used for the public flow catalog.
    JsonSchema,
    /// Upper-case OpenAPI subset accepted as a generative-AI response schema.
    ResponseSchema,
}

impl Shape {
    pub fn object(fields: Vec<Field>) -> Self {
        Shape::Object(fields)
    }

    pub fn array(item: Shape) -> Self {
        Shape::Array(Box::new(item))
    }

    pub fn one_of(values: &[&'static str]) -> Self {
        Shape::Enum(values.to_vec())
    }

    /// Same object with every field made optional; used for merge-writes.
    pub fn partial(&self) -> Self {
        match self {
            Shape::Object(fields) => Shape::Object(
                fields
                    .iter()
                    .cloned()
                    .map(|f| Field {
                        required: false,
                        ..f
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    pub fn validate(&self, value: &Value) -> Result<(), Violation> {
        self.check(value, "$")
    }

    fn check(&self, value: &Value, path: &str) -> Result<(), Violation> {
        let mismatch = |expected: &str| {
            Violation::new(path, format!("expected {}, found {}", expected, kind_of(value)))
        };
        match self {
            Shape::String => value.is_string().then_some(()).ok_or_else(|| mismatch("string")),
            Shape::Number => value.is_number().then_some(()).ok_or_else(|| mismatch("number")),
            Shape::Integer => {
                let ok = value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|n| n.fract() == 0.0);
                ok.then_some(()).ok_or_else(|| mismatch("integer"))
            }
            Shape::Boolean => value.is_boolean().then_some(()).ok_or_else(|| mismatch("boolean")),
            Shape::Enum(allowed) => {
                let s = value.as_str().ok_or_else(|| mismatch("string"))?;
                if allowed.contains(&s) {
                    Ok(())
                } else {
                    Err(Violation::new(
                        path,
                        format!("'{}' is not one of {}", s, allowed.join(", ")),
                    ))
                }
            }
            Shape::DataUri => {
                let s = value.as_str().ok_or_else(|| mismatch("data uri string"))?;
                from_data_uri(s)
                    .map(|_| ())
                    .map_err(|e| Violation::new(path, e.to_string()))
            }
            Shape::Array(item) => {
                let items = value.as_array().ok_or_else(|| mismatch("array"))?;
                for (i, v) in items.iter().enumerate() {
                    item.check(v, &format!("{}[{}]", path, i))?;
                }
                Ok(())
            }
            Shape::Object(fields) => {
                let map = value.as_object().ok_or_else(|| mismatch("object"))?;
                for field in fields {
                    let child = format!("{}.{}", path, field.name);
                    match map.get(field.name) {
                        None | Some(Value::Null) if field.required => {
                            return Err(Violation::new(child, "required field is missing"));
                        }
                        None | Some(Value::Null) => {}
                        Some(v) => field.shape.check(v, &child)?,
                    }
                }
                Ok(())
            }
        }
    }

    /// Drops object keys the shape does not declare.
    pub fn prune(&self, value: Value) -> Value {
        match (self, value) {
            (Shape::Object(fields), Value::Object(mut map)) => {
                let mut out = Map::new();
                for field in fields {
                    if let Some(v) = map.remove(field.name) {
                        out.insert(field.name.to_string(), field.shape.prune(v));
                    }
                }
                Value::Object(out)
            }
            (Shape::Array(item), Value::Array(items)) => {
                Value::Array(items.into_iter().map(|v| item.prune(v)).collect())
            }
            (_, v) => v,
        }
    }

    pub fn to_schema(&self, dialect: Dialect) -> Value {
        let ty = |lower: &str| match dialect {
            Dialect::JsonSchema => lower.to_string(),
            Dialect::ResponseSchema => lower.to_uppercase(),
        };
        match self {
            Shape::String => json!({ "type": ty("string") }),
            Shape::Number => json!({ "type": ty("number") }),
            Shape::Integer => json!({ "type": ty("integer") }),
            Shape::Boolean => json!({ "type": ty("boolean") }),
            Shape::DataUri => match dialect {
                Dialect::JsonSchema => json!({ "type": "string", "contentEncoding": "base64" }),
                Dialect::ResponseSchema => json!({ "type": "STRING" }),
            },
            Shape::Enum(values) => match dialect {
                Dialect::JsonSchema => json!({ "type": "string", "enum": values }),
                Dialect::ResponseSchema => {
                    json!({ "type": "STRING", "format": "enum", "enum": values })
                }
            },
            Shape::Array(item) => json!({ "type": ty("array"), "items": item.to_schema(dialect) }),
            Shape::Object(fields) => {
                let mut properties = Map::new();
                for f in fields {
                    let mut s = f.shape.to_schema(dialect);
                    if !f.description.is_empty() {
                        s["description"] = Value::String(f.description.to_string());
                    }
                    properties.insert(f.name.to_string(), s);
                }
                let required: Vec<&str> =
                    fields.iter().filter(|f| f.required).map(|f| f.name).collect();
                json!({ "type": ty("object"), "properties": properties, "required": required })
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

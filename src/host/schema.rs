//! Parameter schemas for tools and prompts.
//!
//! A schema is an ordered list of named parameters, each with a primitive
//! type and a required flag. Validation checks presence and type field by
//! field and yields [`Arguments`] holding only the declared parameters.

use std::collections::HashSet;

use serde_json::{json, Map, Value};

use super::error::{HandlerResult, HostError, HostResult};

/// Primitive type expected for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// JSON string.
    String,
    /// Any JSON number.
    Number,
    /// Integral JSON number.
    Integer,
    /// JSON boolean.
    Boolean,
}

impl ParamType {
    /// Returns the JSON Schema type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    /// Checks whether a JSON value has this type. No coercion is applied.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// Returns the JSON type name of a value, for error messages.
const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Expected type.
    pub ty: ParamType,
    /// Whether the caller must supply it.
    pub required: bool,
    /// Human-readable description.
    pub description: String,
}

/// Ordered parameter declarations for a tool or prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSchema {
    params: Vec<ParamSpec>,
}

impl ParamSchema {
    /// Creates an empty schema (no parameters).
    #[must_use]
    pub const fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Adds a required parameter.
    #[must_use]
    pub fn required(self, name: &str, ty: ParamType, description: &str) -> Self {
        self.with(name, ty, true, description)
    }

    /// Adds an optional parameter.
    #[must_use]
    pub fn optional(self, name: &str, ty: ParamType, description: &str) -> Self {
        self.with(name, ty, false, description)
    }

    fn with(mut self, name: &str, ty: ParamType, required: bool, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            ty,
            required,
            description: description.to_string(),
        });
        self
    }

    /// Returns the declared parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Checks the declarations themselves: names must be non-empty and unique.
    pub(crate) fn check(&self, owner: &str) -> HostResult<()> {
        let mut seen = HashSet::new();
        for param in &self.params {
            if param.name.is_empty() {
                return Err(HostError::configuration(format!(
                    "'{owner}' declares a parameter with an empty name"
                )));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(HostError::configuration(format!(
                    "'{owner}' declares parameter '{}' more than once",
                    param.name
                )));
            }
        }
        Ok(())
    }

    /// Validates caller-supplied arguments against this schema.
    ///
    /// `None` and `null` are treated as an empty argument object. A `null`
    /// value for an optional parameter counts as absent. Undeclared
    /// arguments are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Validation`] naming the first offending field.
    pub fn validate(&self, args: Option<&Value>) -> HostResult<Arguments> {
        let empty = Map::new();
        let supplied = match args {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(HostError::validation(
                    "arguments",
                    format!("expected object, got {}", json_type_name(other)),
                ));
            }
        };

        let mut values = Map::new();
        for param in &self.params {
            match supplied.get(&param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(HostError::validation(
                            &param.name,
                            "required argument is missing",
                        ));
                    }
                }
                Some(value) if param.ty.matches(value) => {
                    values.insert(param.name.clone(), value.clone());
                }
                Some(value) => {
                    return Err(HostError::validation(
                        &param.name,
                        format!(
                            "expected {}, got {}",
                            param.ty.as_str(),
                            json_type_name(value)
                        ),
                    ));
                }
            }
        }

        Ok(Arguments { values })
    }

    /// Renders the schema as a JSON Schema object for `tools/list`.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({ "type": p.ty.as_str(), "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Arguments that passed schema validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    /// Returns the raw value of an argument, if supplied.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns a string argument.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is absent or not a string.
    pub fn str(&self, name: &str) -> HandlerResult<&str> {
        self.opt_str(name)
            .ok_or_else(|| format!("missing string argument '{name}'").into())
    }

    /// Returns an optional string argument.
    #[must_use]
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Returns a numeric argument as `f64`.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is absent or not a number.
    pub fn f64(&self, name: &str) -> HandlerResult<f64> {
        self.values
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| format!("missing numeric argument '{name}'").into())
    }

    /// Returns the number of supplied arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no arguments were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

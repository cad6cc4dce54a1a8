//! Closed tagged-variant parameter schema used by [`crate::nodes::extractor`].
//!
//! Parameter schemas describe the shape an extractor must coerce an LLM
//! reply into before writing it to context. The type set is intentionally
//! closed (no user-extensible custom types) so coercion rules can be total.

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A declared parameter type.
///
/// Record fields are resolved recursively, so a schema can describe nested
/// dataclass-style objects without a separate registration step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int,
    Float,
    Bool,
    List(Box<ParamType>),
    Map(Box<ParamType>),
    Record(BTreeMap<String, ParamType>),
}

impl ParamType {
    /// Resolve a bare type name (as it would appear in a JSON schema's
    /// `"type"` field) to a scalar `ParamType`. Returns `None` for `list`,
    /// `map`, and `record`, which carry structure a name alone can't encode.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(ParamType::String),
            "integer" | "int" => Some(ParamType::Int),
            "float" | "number" => Some(ParamType::Float),
            "boolean" | "bool" => Some(ParamType::Bool),
            _ => None,
        }
    }
}

/// Coerce a parsed JSON value to the declared type.
///
/// Rules, in order: the declared type accepted exactly; a string accepted
/// with a numeric parse for `Int`/`Float`; a single-element list accepted
/// where a scalar was declared (the element is coerced recursively);
/// otherwise rejected.
pub fn coerce(field: &str, value: &Value, declared: &ParamType) -> Result<Value> {
    match declared {
        ParamType::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Array(items) if items.len() == 1 => coerce(field, &items[0], declared),
            other => Err(type_coercion_error(field, "string", other)),
        },
        ParamType::Int => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::Number(n) if n.is_f64() && n.as_f64().unwrap().fract() == 0.0 => {
                Ok(Value::from(n.as_f64().unwrap() as i64))
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| type_coercion_error(field, "integer", value)),
            Value::Array(items) if items.len() == 1 => coerce(field, &items[0], declared),
            other => Err(type_coercion_error(field, "integer", other)),
        },
        ParamType::Float => match value {
            Value::Number(n) => Ok(Value::from(n.as_f64().unwrap_or_default())),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| type_coercion_error(field, "float", value)),
            Value::Array(items) if items.len() == 1 => coerce(field, &items[0], declared),
            other => Err(type_coercion_error(field, "float", other)),
        },
        ParamType::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "0" => Ok(Value::Bool(false)),
                _ => Err(type_coercion_error(field, "boolean", value)),
            },
            Value::Array(items) if items.len() == 1 => coerce(field, &items[0], declared),
            other => Err(type_coercion_error(field, "boolean", other)),
        },
        ParamType::List(elem_ty) => match value {
            Value::Array(items) => {
                let coerced: Result<Vec<Value>> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| coerce(&format!("{field}[{i}]"), item, elem_ty))
                    .collect();
                Ok(Value::Array(coerced?))
            }
            other => Err(type_coercion_error(field, "list", other)),
        },
        ParamType::Map(value_ty) => match value {
            Value::Object(obj) => {
                let mut out = serde_json::Map::new();
                for (k, v) in obj {
                    out.insert(k.clone(), coerce(&format!("{field}.{k}"), v, value_ty)?);
                }
                Ok(Value::Object(out))
            }
            other => Err(type_coercion_error(field, "map", other)),
        },
        ParamType::Record(fields) => match value {
            Value::Object(obj) => {
                let mut out = serde_json::Map::new();
                for (name, field_ty) in fields {
                    let Some(raw) = obj.get(name) else {
                        return Err(GraphError::TypeCoercion {
                            field: format!("{field}.{name}"),
                            reason: "missing required field".to_string(),
                        });
                    };
                    out.insert(name.clone(), coerce(&format!("{field}.{name}"), raw, field_ty)?);
                }
                Ok(Value::Object(out))
            }
            other => Err(type_coercion_error(field, "record", other)),
        },
    }
}

fn type_coercion_error(field: &str, expected: &str, got: &Value) -> GraphError {
    GraphError::TypeCoercion {
        field: field.to_string(),
        reason: format!("expected {expected}, got {got}"),
    }
}

/// Coerce every field of a `param_schema` map against a parsed JSON object,
/// as used by [`crate::nodes::extractor`] step 3.
pub fn coerce_all(
    schema: &BTreeMap<String, ParamType>,
    parsed: &Value,
) -> Result<serde_json::Map<String, Value>> {
    let obj = parsed.as_object().ok_or_else(|| GraphError::TypeCoercion {
        field: "<root>".to_string(),
        reason: format!("expected an object, got {parsed}"),
    })?;

    let mut out = serde_json::Map::new();
    for (name, ty) in schema {
        let Some(raw) = obj.get(name) else {
            return Err(GraphError::TypeCoercion {
                field: name.clone(),
                reason: "missing required field".to_string(),
            });
        };
        out.insert(name.clone(), coerce(name, raw, ty)?);
    }
    Ok(out)
}

//! Configuration module for project data structures
//!
//! This module handles deserialization of saved project data from Python
//! dicts and the value conversions both ways across the PyO3 boundary.

use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyList, PyTuple};
use pyo3::IntoPyObjectExt;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::StyleEngineError;
use crate::expr;
use crate::style::{ConditionalStyle, ConditionalStyleManager, PropertyMap};
use crate::tag::{TagRegistry, TagSnapshot, TagValue};
use crate::trigger::{Operand, Trigger};

// ============================================================================
// Python <-> JSON conversion
// ============================================================================

/// Convert an arbitrary Python object into a JSON value.
///
/// Supports the scalar types, lists/tuples and string-keyed dicts, which is
/// exactly what saved project files contain.
pub fn py_to_json(obj: &Bound<'_, PyAny>) -> PyResult<Value> {
    if obj.is_none() {
        return Ok(Value::Null);
    }
    // bool must be checked before int: Python bools are ints
    if let Ok(b) = obj.downcast::<PyBool>() {
        return Ok(Value::Bool(b.is_true()));
    }
    if let Ok(i) = obj.extract::<i64>() {
        return Ok(Value::from(i));
    }
    if let Ok(f) = obj.extract::<f64>() {
        return Ok(serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null));
    }
    if let Ok(s) = obj.extract::<String>() {
        return Ok(Value::String(s));
    }
    if let Ok(list) = obj.downcast::<PyList>() {
        let mut items = Vec::with_capacity(list.len());
        for item in list.iter() {
            items.push(py_to_json(&item)?);
        }
        return Ok(Value::Array(items));
    }
    if let Ok(tuple) = obj.downcast::<PyTuple>() {
        let mut items = Vec::with_capacity(tuple.len());
        for item in tuple.iter() {
            items.push(py_to_json(&item)?);
        }
        return Ok(Value::Array(items));
    }
    if let Ok(dict) = obj.downcast::<PyDict>() {
        let mut map = serde_json::Map::new();
        for (key, value) in dict.iter() {
            let key: String = key.extract()?;
            map.insert(key, py_to_json(&value)?);
        }
        return Ok(Value::Object(map));
    }
    Err(StyleEngineError::DeserializationError(format!(
        "unsupported value type: {}",
        obj.get_type().name()?
    ))
    .into())
}

/// Convert a JSON value into a Python object.
pub fn json_to_py(py: Python<'_>, value: &Value) -> PyResult<Py<PyAny>> {
    match value {
        Value::Null => Ok(py.None()),
        Value::Bool(b) => b.into_py_any(py),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into_py_any(py)
            } else {
                n.as_f64().unwrap_or(0.0).into_py_any(py)
            }
        }
        Value::String(s) => s.into_py_any(py),
        Value::Array(items) => {
            let list = PyList::empty(py);
            for item in items {
                list.append(json_to_py(py, item)?)?;
            }
            list.into_py_any(py)
        }
        Value::Object(map) => {
            let dict = PyDict::new(py);
            for (key, value) in map {
                dict.set_item(key, json_to_py(py, value)?)?;
            }
            dict.into_py_any(py)
        }
    }
}

// ============================================================================
// Python <-> tag value conversion
// ============================================================================

/// Convert a Python object into a tag value.
pub fn py_to_tag_value(obj: &Bound<'_, PyAny>) -> PyResult<TagValue> {
    if let Ok(b) = obj.downcast::<PyBool>() {
        return Ok(TagValue::Bool(b.is_true()));
    }
    if let Ok(i) = obj.extract::<i64>() {
        return Ok(TagValue::Int(i));
    }
    if let Ok(f) = obj.extract::<f64>() {
        return Ok(TagValue::Real(f));
    }
    if let Ok(s) = obj.extract::<String>() {
        return Ok(TagValue::Str(s));
    }
    if let Ok(list) = obj.downcast::<PyList>() {
        let mut items = Vec::with_capacity(list.len());
        for item in list.iter() {
            items.push(py_to_tag_value(&item)?);
        }
        return Ok(TagValue::Array(items));
    }
    Err(StyleEngineError::DeserializationError(format!(
        "unsupported tag value type: {}",
        obj.get_type().name()?
    ))
    .into())
}

/// Convert a tag value into a Python object.
pub fn tag_value_to_py(py: Python<'_>, value: &TagValue) -> PyResult<Py<PyAny>> {
    match value {
        TagValue::Bool(b) => b.into_py_any(py),
        TagValue::Int(i) => i.into_py_any(py),
        TagValue::Real(r) => r.into_py_any(py),
        TagValue::Str(s) => s.into_py_any(py),
        TagValue::Array(items) => {
            let list = PyList::empty(py);
            for item in items {
                list.append(tag_value_to_py(py, item)?)?;
            }
            list.into_py_any(py)
        }
    }
}

/// Deserialize a `{name: value}` dict into a tag snapshot.
pub fn deserialize_snapshot(dict: &Bound<'_, PyDict>) -> PyResult<TagSnapshot> {
    let mut snapshot = TagSnapshot::new();
    for (key, value) in dict.iter() {
        let key: String = key.extract()?;
        snapshot.insert(key, py_to_tag_value(&value)?);
    }
    Ok(snapshot)
}

/// Deserialize a `{name: value}` dict into expression variables. Values
/// with no scalar representation are skipped; referencing one from an
/// expression then reports an unknown variable.
pub fn deserialize_variables(
    dict: &Bound<'_, PyDict>,
) -> PyResult<HashMap<String, expr::Value>> {
    let mut variables = HashMap::new();
    for (key, value) in dict.iter() {
        let key: String = key.extract()?;
        if let Some(value) = py_to_tag_value(&value)?.as_expr_value() {
            variables.insert(key, value);
        }
    }
    Ok(variables)
}

// ============================================================================
// Model extraction
// ============================================================================

/// Deserialize a property dict (style attributes, button properties).
pub fn deserialize_property_map(dict: &Bound<'_, PyDict>) -> PyResult<PropertyMap> {
    match py_to_json(dict.as_any())? {
        Value::Object(map) => Ok(map),
        _ => Ok(PropertyMap::new()),
    }
}

/// Serialize a property dict back to Python.
pub fn property_map_to_py<'py>(
    py: Python<'py>,
    map: &PropertyMap,
) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    for (key, value) in map {
        dict.set_item(key, json_to_py(py, value)?)?;
    }
    Ok(dict)
}

/// Deserialize an operand from a Python dict.
pub fn deserialize_operand(obj: &Bound<'_, PyAny>) -> PyResult<Operand> {
    let value = py_to_json(obj)?;
    serde_json::from_value(value)
        .map_err(|e| StyleEngineError::DeserializationError(e.to_string()).into())
}

/// Deserialize a trigger from a Python dict.
pub fn deserialize_trigger(obj: &Bound<'_, PyAny>) -> PyResult<Trigger> {
    let value = py_to_json(obj)?;
    serde_json::from_value(value)
        .map_err(|e| StyleEngineError::DeserializationError(e.to_string()).into())
}

/// Deserialize a conditional style, accepting legacy key spellings.
pub fn deserialize_style(obj: &Bound<'_, PyAny>) -> PyResult<ConditionalStyle> {
    let value = py_to_json(obj)?;
    ConditionalStyle::from_value(value).map_err(Into::into)
}

/// Deserialize a full style manager from its dict form.
pub fn deserialize_manager(obj: &Bound<'_, PyAny>) -> PyResult<ConditionalStyleManager> {
    let value = py_to_json(obj)?;
    ConditionalStyleManager::from_dict(value).map_err(Into::into)
}

/// Deserialize the tag databases of a saved project.
/// Expected format: `{"tag_databases": {id: {...}, ...}}`
pub fn deserialize_tag_registry(project: &Bound<'_, PyDict>) -> PyResult<TagRegistry> {
    let value = py_to_json(project.as_any())?;
    TagRegistry::load_from_project(value).map_err(Into::into)
}

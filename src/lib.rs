//! HMI Style Core - High-performance conditional style and action engine
//!
//! This crate provides the rule/expression engine behind an HMI screen
//! designer and its runtime simulator, with Python bindings via PyO3:
//! a restricted expression evaluator, the Ordinary/On/Off/Range trigger
//! model, the conditional style resolver and the bit/word action executor.

use pyo3::prelude::*;

pub mod action;
pub mod config;
pub mod error;
pub mod expr;
pub mod runtime;
pub mod style;
pub mod tag;
pub mod trigger;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use pyo3::types::{PyDict, PyList};
use std::sync::Arc;

use crate::error::StyleEngineError;
use crate::runtime::ButtonRuntime;
use crate::style::{ConditionalStyleManager, MatchOrder, PropertyMap, VisualState};
use crate::tag::{TagPath, TagRegistry, TagSnapshot};
use crate::trigger::{CompareOp, ConditionKind};

// ============================================================================
// Cached Project
// ============================================================================

/// Global cached tag registry for the loaded project
static CACHED_PROJECT: OnceCell<Arc<RwLock<TagRegistry>>> = OnceCell::new();

fn cached_project() -> PyResult<Arc<RwLock<TagRegistry>>> {
    CACHED_PROJECT
        .get()
        .cloned()
        .ok_or_else(|| {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(
                "Project not initialized. Call init_project() first.",
            )
        })
}

// ============================================================================
// Python Functions
// ============================================================================

/// Initialize the project tag databases (call once per loaded project)
///
/// This caches the tag registry in Rust memory so subsequent reads and
/// writes avoid re-deserializing the project. Calling it again replaces
/// the cached registry.
///
/// # Arguments
/// * `project` - Saved project data containing `tag_databases`
#[pyfunction]
fn init_project(project: &Bound<'_, PyDict>) -> PyResult<()> {
    let registry = config::deserialize_tag_registry(project)?;

    // If already initialized, update the registry
    if let Some(existing) = CACHED_PROJECT.get() {
        let mut guard = existing.write();
        *guard = registry;
    } else {
        let _ = CACHED_PROJECT.set(Arc::new(RwLock::new(registry)));
    }

    Ok(())
}

/// Check if a project is initialized
#[pyfunction]
fn is_project_initialized() -> bool {
    CACHED_PROJECT.get().is_some()
}

/// All tags of the loaded project as canonical "[DB]::Tag" paths
#[pyfunction]
fn project_tag_paths() -> PyResult<Vec<String>> {
    let project = cached_project()?;
    let registry = project.read();
    Ok(registry.all_tag_paths())
}

/// Read a tag value, or one element of an array tag
///
/// # Arguments
/// * `path` - Canonical "[DB]::Tag" path
/// * `indices` - Optional element indices for array tags
#[pyfunction]
#[pyo3(signature = (path, indices=None))]
fn read_tag(py: Python<'_>, path: &str, indices: Option<Vec<usize>>) -> PyResult<Py<PyAny>> {
    let tag_path = TagPath::parse(path)
        .ok_or_else(|| StyleEngineError::TagNotFound(path.to_string()))?;
    let project = cached_project()?;
    let registry = project.read();
    let db_id = registry
        .find_db_id_by_name(&tag_path.db_name)
        .ok_or_else(|| StyleEngineError::DatabaseNotFound(tag_path.db_name.clone()))?
        .to_string();
    let value = registry
        .tag_element_value(&db_id, &tag_path.tag_name, &indices.unwrap_or_default())
        .ok_or_else(|| StyleEngineError::TagNotFound(path.to_string()))?;
    config::tag_value_to_py(py, &value)
}

/// Write a tag value, or one element of an array tag. Returns whether the
/// write happened.
#[pyfunction]
#[pyo3(signature = (path, value, indices=None))]
fn write_tag(path: &str, value: &Bound<'_, PyAny>, indices: Option<Vec<usize>>) -> PyResult<bool> {
    let tag_path = TagPath::parse(path)
        .ok_or_else(|| StyleEngineError::TagNotFound(path.to_string()))?;
    let new_value = config::py_to_tag_value(value)?;
    let project = cached_project()?;
    let mut registry = project.write();
    let db_id = registry
        .find_db_id_by_name(&tag_path.db_name)
        .ok_or_else(|| StyleEngineError::DatabaseNotFound(tag_path.db_name.clone()))?
        .to_string();
    Ok(registry.set_tag_element_value(
        &db_id,
        &tag_path.tag_name,
        &indices.unwrap_or_default(),
        new_value,
    ))
}

/// Safely evaluate a boolean/arithmetic expression against tag values
///
/// Returns `(value, error)`. On success error is None, otherwise value is
/// None and error contains a message. Never raises on malformed
/// expressions, unknown variables or disallowed constructs.
#[pyfunction]
fn safe_eval(
    py: Python<'_>,
    expr: &str,
    variables: &Bound<'_, PyDict>,
) -> PyResult<(Py<PyAny>, Option<String>)> {
    let variables = config::deserialize_variables(variables)?;
    match crate::expr::safe_eval(expr, &variables) {
        (Some(value), None) => {
            let value = match value {
                crate::expr::Value::Bool(b) => config::json_to_py(py, &b.into())?,
                crate::expr::Value::Num(n) => config::json_to_py(py, &n.into())?,
                crate::expr::Value::Str(s) => config::json_to_py(py, &s.into())?,
            };
            Ok((value, None))
        }
        (_, error) => Ok((py.None(), error)),
    }
}

/// Validate a range trigger section, returning `(is_valid, error)`
#[pyfunction]
#[pyo3(signature = (operand1, operator, operand2=None, lower_bound=None, upper_bound=None, prefix="Range Trigger"))]
fn validate_range_section(
    operand1: Option<&Bound<'_, PyAny>>,
    operator: &str,
    operand2: Option<&Bound<'_, PyAny>>,
    lower_bound: Option<&Bound<'_, PyAny>>,
    upper_bound: Option<&Bound<'_, PyAny>>,
    prefix: &str,
) -> PyResult<(bool, Option<String>)> {
    let operator = match CompareOp::parse(operator) {
        Some(op) => op,
        None => {
            return Ok((false, Some(format!("Unsupported operator: {}", operator))));
        }
    };

    let operand1 = extract_optional_operand(operand1)?;
    let operand2 = extract_optional_operand(operand2)?;
    let lower_bound = extract_optional_operand(lower_bound)?;
    let upper_bound = extract_optional_operand(upper_bound)?;

    Ok(to_validation_tuple(trigger::validate_range_section(
        operand1.as_ref(),
        operator,
        operand2.as_ref(),
        lower_bound.as_ref(),
        upper_bound.as_ref(),
        prefix,
    )))
}

/// Validate a complete trigger dict, returning `(is_valid, error)`
#[pyfunction]
fn validate_trigger(trigger_data: &Bound<'_, PyAny>) -> PyResult<(bool, Option<String>)> {
    let trigger = config::deserialize_trigger(trigger_data)?;
    Ok(to_validation_tuple(trigger::validate_trigger(&trigger)))
}

/// Validate an operand's array usage against the loaded project: the
/// index count must match the tag's declared dimensions and every
/// constant index must be an integer. Returns `(is_valid, error)`.
#[pyfunction]
fn validate_operand(operand: &Bound<'_, PyAny>) -> PyResult<(bool, Option<String>)> {
    let operand = config::deserialize_operand(operand)?;
    let project = cached_project()?;
    let registry = project.read();
    Ok(to_validation_tuple(trigger::validate_operand_indices(
        &operand, &registry,
    )))
}

/// Validate a bit/word action dict the way its dialog does, returning
/// `(is_valid, error)`
#[pyfunction]
fn validate_action(action_data: &Bound<'_, PyAny>) -> PyResult<(bool, Option<String>)> {
    let value = config::py_to_json(action_data)?;
    let action: action::ButtonAction = serde_json::from_value(value)
        .map_err(|e| StyleEngineError::DeserializationError(e.to_string()))?;
    let result = match &action {
        action::ButtonAction::Bit(bit) => action::validate_bit_action(bit),
        action::ButtonAction::Word(word) => action::validate_word_action(word),
    };
    Ok(to_validation_tuple(result))
}

/// Evaluate a condition of any accepted shape against tag values
///
/// The condition may be None (always true), a trigger dict, an expression
/// string, or a plain bool. Returns `(matched, error)`; resolution and
/// evaluation failures are reported in `error` with `matched` false.
#[pyfunction]
fn evaluate_condition(
    condition: &Bound<'_, PyAny>,
    tag_values: &Bound<'_, PyDict>,
) -> PyResult<(bool, Option<String>)> {
    let snapshot = config::deserialize_snapshot(tag_values)?;

    if condition.is_none() {
        return Ok((true, None));
    }
    if let Ok(b) = condition.downcast::<pyo3::types::PyBool>() {
        return Ok((b.is_true(), None));
    }
    if let Ok(text) = condition.extract::<String>() {
        return Ok(to_condition_tuple(trigger::evaluate_condition(
            ConditionKind::Expression(&text),
            &snapshot,
        )));
    }
    if condition.downcast::<PyDict>().is_ok() {
        let trigger = config::deserialize_trigger(condition)?;
        return Ok(to_condition_tuple(trigger::evaluate_condition(
            ConditionKind::Trigger(&trigger),
            &snapshot,
        )));
    }
    // Anything else numeric keeps Python truthiness semantics
    if let Ok(n) = condition.extract::<f64>() {
        return Ok((n != 0.0, None));
    }
    Ok((
        false,
        Some(format!(
            "Invalid condition type: {}",
            condition.get_type().name()?
        )),
    ))
}

fn extract_optional_operand(
    obj: Option<&Bound<'_, PyAny>>,
) -> PyResult<Option<trigger::Operand>> {
    match obj {
        None => Ok(None),
        Some(obj) if obj.is_none() => Ok(None),
        Some(obj) => Ok(Some(config::deserialize_operand(obj)?)),
    }
}

fn to_validation_tuple(result: error::Result<()>) -> (bool, Option<String>) {
    match result {
        Ok(()) => (true, None),
        Err(err) => (false, Some(err.to_string())),
    }
}

fn to_condition_tuple(result: error::Result<bool>) -> (bool, Option<String>) {
    match result {
        Ok(matched) => (matched, None),
        Err(err) => (false, Some(err.to_string())),
    }
}

// ============================================================================
// StyleResolver PyClass
// ============================================================================

/// StyleResolver - per-button conditional style resolution
///
/// Wraps the rule list and default style of one button. Resolution is a
/// pure query: the caller passes the current tag values on every call.
///
/// # Thread Safety
/// StyleResolver holds plain owned data (Vec, maps, strings), so it is
/// Send + Sync and safe to hand to worker threads.
#[pyclass]
struct StyleResolver {
    inner: ConditionalStyleManager,
}

#[pymethods]
impl StyleResolver {
    #[new]
    #[pyo3(signature = (default_style=None))]
    fn new(default_style: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        let mut inner = ConditionalStyleManager::new();
        if let Some(default_style) = default_style {
            inner.default_style = config::deserialize_property_map(default_style)?;
        }
        Ok(Self { inner })
    }

    /// Number of conditional styles
    #[getter]
    fn style_count(&self) -> usize {
        self.inner.conditional_styles.len()
    }

    /// Append a conditional style dict; a unique style_id is assigned
    fn add_style(&mut self, style: &Bound<'_, PyAny>) -> PyResult<()> {
        let style = config::deserialize_style(style)?;
        self.inner.add_style(style);
        Ok(())
    }

    /// Remove a style by index; out-of-range indices are ignored
    fn remove_style(&mut self, index: usize) {
        self.inner.remove_style(index);
    }

    /// Replace a style by index; out-of-range indices are ignored
    fn update_style(&mut self, index: usize, style: &Bound<'_, PyAny>) -> PyResult<()> {
        let style = config::deserialize_style(style)?;
        self.inner.update_style(index, style);
        Ok(())
    }

    /// Set rule evaluation order: "priority" (default) or "insertion"
    fn set_match_order(&mut self, order: &str) -> PyResult<()> {
        self.inner.match_order = match order {
            "priority" => MatchOrder::Priority,
            "insertion" => MatchOrder::Insertion,
            other => {
                return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
                    "Unknown match order: {}",
                    other
                )))
            }
        };
        Ok(())
    }

    /// Resolve the active style for the given tag values
    ///
    /// # Arguments
    /// * `tag_values` - Mapping from tag path/alias to current value
    /// * `state` - Optional visual state: "hover", "click" or "disabled"
    #[pyo3(signature = (tag_values, state=None))]
    fn get_active_style(
        &self,
        py: Python<'_>,
        tag_values: &Bound<'_, PyDict>,
        state: Option<&str>,
    ) -> PyResult<Py<PyAny>> {
        let snapshot = config::deserialize_snapshot(tag_values)?;
        let state = state.and_then(VisualState::parse);
        let props = self.inner.get_active_style(&snapshot, state);
        Ok(config::property_map_to_py(py, &props)?.into())
    }

    /// Serialize the full rule list and default style
    fn to_dict(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        config::json_to_py(py, &self.inner.to_dict())
    }

    /// Rebuild a resolver from its dict form
    #[staticmethod]
    fn from_dict(data: &Bound<'_, PyAny>) -> PyResult<Self> {
        Ok(Self {
            inner: config::deserialize_manager(data)?,
        })
    }
}

// ============================================================================
// ButtonController PyClass
// ============================================================================

/// ButtonController - runtime behavior of one button
///
/// Built once from the saved button properties; holds the parsed styles
/// and actions in Rust heap memory so the per-tick calls avoid
/// re-deserializing the config. Press/release/click return the tag writes
/// to apply as `(path, value)` pairs; the caller owns the tag store.
#[pyclass]
struct ButtonController {
    inner: ButtonRuntime,
}

#[pymethods]
impl ButtonController {
    #[new]
    fn new(properties: &Bound<'_, PyDict>) -> PyResult<Self> {
        let properties = config::deserialize_property_map(properties)?;
        Ok(Self {
            inner: ButtonRuntime::from_properties(&properties),
        })
    }

    /// Snapshot keys of every tag the button's styles and actions read
    fn referenced_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.inner.referenced_tags().iter().cloned().collect();
        tags.sort();
        tags
    }

    /// Whether a change to this tag requires re-resolving the style
    fn is_interested(&self, path: &str) -> bool {
        self.inner.on_tag_changed(path)
    }

    /// Resolve the properties to render for the given tag values
    #[pyo3(signature = (tag_values, state=None))]
    fn resolved_style(
        &self,
        py: Python<'_>,
        tag_values: &Bound<'_, PyDict>,
        state: Option<&str>,
    ) -> PyResult<Py<PyAny>> {
        let snapshot = config::deserialize_snapshot(tag_values)?;
        let state = state.and_then(VisualState::parse);
        let props = self.inner.resolved_style(&snapshot, state);
        Ok(config::property_map_to_py(py, &props)?.into())
    }

    /// Tag writes for a press edge
    fn press(&self, py: Python<'_>, tag_values: &Bound<'_, PyDict>) -> PyResult<Py<PyAny>> {
        let snapshot = config::deserialize_snapshot(tag_values)?;
        writes_to_py(py, self.inner.press(&snapshot))
    }

    /// Tag writes for a release edge
    fn release(&self, py: Python<'_>, tag_values: &Bound<'_, PyDict>) -> PyResult<Py<PyAny>> {
        let snapshot = config::deserialize_snapshot(tag_values)?;
        writes_to_py(py, self.inner.release(&snapshot))
    }

    /// Tag writes for a click
    fn click(&self, py: Python<'_>, tag_values: &Bound<'_, PyDict>) -> PyResult<Py<PyAny>> {
        let snapshot = config::deserialize_snapshot(tag_values)?;
        writes_to_py(py, self.inner.click(&snapshot))
    }
}

fn writes_to_py(py: Python<'_>, writes: Vec<action::TagWrite>) -> PyResult<Py<PyAny>> {
    let list = PyList::empty(py);
    for write in writes {
        let value = config::tag_value_to_py(py, &write.value)?;
        list.append((write.path, value))?;
    }
    Ok(list.into())
}

// ============================================================================
// Batch Resolution
// ============================================================================

/// ResolvedStyleBatch - resolved property dicts for a set of buttons
///
/// Holds the resolution results in Rust heap memory; Python reads them
/// lazily through `styles()` without re-serializing the inputs.
#[pyclass]
struct ResolvedStyleBatch {
    resolved: Vec<PropertyMap>,
}

#[pymethods]
impl ResolvedStyleBatch {
    fn __len__(&self) -> usize {
        self.resolved.len()
    }

    /// Resolved property dicts, one per input button config
    fn styles(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        let list = PyList::empty(py);
        for props in &self.resolved {
            list.append(config::property_map_to_py(py, props)?)?;
        }
        Ok(list.into())
    }
}

fn resolve_batch(
    configs: &[PropertyMap],
    snapshot: &TagSnapshot,
    state: Option<VisualState>,
) -> Vec<PropertyMap> {
    configs
        .iter()
        .map(|properties| {
            ButtonRuntime::from_properties(properties).resolved_style(snapshot, state)
        })
        .collect()
}

fn extract_batch_inputs(
    configs: &Bound<'_, PyList>,
    tag_values: &Bound<'_, PyDict>,
) -> PyResult<(Vec<PropertyMap>, TagSnapshot)> {
    let mut extracted = Vec::with_capacity(configs.len());
    for config_obj in configs.iter() {
        let dict = config_obj.downcast::<PyDict>().map_err(|_| {
            StyleEngineError::DeserializationError(
                "button config must be a dict".to_string(),
            )
        })?;
        extracted.push(config::deserialize_property_map(dict)?);
    }
    Ok((extracted, config::deserialize_snapshot(tag_values)?))
}

/// Resolve active styles for a list of button property dicts
///
/// # Arguments
/// * `configs` - List of saved button properties (each may contain
///   `conditional_styles` and `actions`)
/// * `tag_values` - Current tag values
/// * `state` - Optional visual state applied to every resolution
#[pyfunction]
#[pyo3(signature = (configs, tag_values, state=None))]
fn resolve_styles(
    py: Python<'_>,
    configs: &Bound<'_, PyList>,
    tag_values: &Bound<'_, PyDict>,
    state: Option<&str>,
) -> PyResult<Py<PyAny>> {
    let (configs, snapshot) = extract_batch_inputs(configs, tag_values)?;
    let state = state.and_then(VisualState::parse);
    let batch = ResolvedStyleBatch {
        resolved: resolve_batch(&configs, &snapshot, state),
    };
    batch.styles(py)
}

/// Resolve active styles for a list of button configs asynchronously
///
/// Runs the resolution in a background thread using Tokio's
/// spawn_blocking, keeping Python's asyncio event loop responsive during
/// large screen updates. The GIL is released while resolving.
///
/// # Returns
/// A Python awaitable that resolves to a ResolvedStyleBatch
///
/// # Example (Python)
/// ```python
/// batch = await resolve_styles_async(button_configs, tag_values)
/// for props in batch.styles():
///     apply(props)
/// ```
#[pyfunction]
#[pyo3(signature = (configs, tag_values, state=None))]
fn resolve_styles_async<'py>(
    py: Python<'py>,
    configs: &Bound<'py, PyList>,
    tag_values: &Bound<'py, PyDict>,
    state: Option<&str>,
) -> PyResult<Bound<'py, PyAny>> {
    // Convert Python inputs before entering the async context
    let (configs, snapshot) = extract_batch_inputs(configs, tag_values)?;
    let state = state.and_then(VisualState::parse);

    pyo3_async_runtimes::tokio::future_into_py(py, async move {
        let batch = tokio::task::spawn_blocking(move || ResolvedStyleBatch {
            resolved: resolve_batch(&configs, &snapshot, state),
        })
        .await
        .map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
                "Style resolution task panicked: {}",
                e
            ))
        })?;

        Ok(batch)
    })
}

// ============================================================================
// Python Module Definition
// ============================================================================

/// Python module definition
#[pymodule]
fn hmi_style_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(init_project, m)?)?;
    m.add_function(wrap_pyfunction!(is_project_initialized, m)?)?;
    m.add_function(wrap_pyfunction!(project_tag_paths, m)?)?;
    m.add_function(wrap_pyfunction!(read_tag, m)?)?;
    m.add_function(wrap_pyfunction!(write_tag, m)?)?;
    m.add_function(wrap_pyfunction!(safe_eval, m)?)?;
    m.add_function(wrap_pyfunction!(validate_range_section, m)?)?;
    m.add_function(wrap_pyfunction!(validate_trigger, m)?)?;
    m.add_function(wrap_pyfunction!(validate_operand, m)?)?;
    m.add_function(wrap_pyfunction!(validate_action, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_condition, m)?)?;
    m.add_function(wrap_pyfunction!(resolve_styles, m)?)?;
    m.add_function(wrap_pyfunction!(resolve_styles_async, m)?)?;
    m.add_class::<StyleResolver>()?;
    m.add_class::<ButtonController>()?;
    m.add_class::<ResolvedStyleBatch>()?;
    Ok(())
}

//! Expression parsing cache - Optimized with faster hashing

use std::collections::HashMap;

use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::Result;
use crate::expr::ast::{Expr, Value};
use crate::expr::{evaluator, parser};

/// Parse results are kept process-wide; the same handful of condition
/// strings is re-evaluated on every tag change, so parsing once is enough.
/// Only successful parses are cached.
static EXPR_CACHE: Lazy<RwLock<AHashMap<String, Expr>>> = Lazy::new(|| {
    let map = AHashMap::with_capacity(256);
    RwLock::new(map)
});

/// Upper bound on distinct cached expressions; a real screen has a few
/// dozen at most, so hitting this means the input is adversarial.
const EXPR_CACHE_MAXSIZE: usize = 1024;

/// Get or parse an expression string, using cache for repeated expressions
#[inline]
pub fn get_or_parse(expr: &str) -> Result<Expr> {
    // Fast path: check read lock first
    {
        let cache = EXPR_CACHE.read();
        if let Some(ast) = cache.get(expr) {
            return Ok(ast.clone());
        }
    }

    // Slow path: parse and cache
    let ast = parser::parse(expr)?;

    {
        let mut cache = EXPR_CACHE.write();
        if cache.len() >= EXPR_CACHE_MAXSIZE {
            cache.clear();
        }
        cache.insert(expr.to_string(), ast.clone());
    }

    Ok(ast)
}

/// Evaluate an expression string against a variable mapping, using the
/// parse cache.
#[inline]
pub fn eval_expression(expr: &str, variables: &HashMap<String, Value>) -> Result<Value> {
    let ast = get_or_parse(expr)?;
    evaluator::evaluate(&ast, variables)
}

/// Safely evaluate an expression, returning `(value, error)`.
///
/// On success the error is `None`; on any failure the value is `None` and
/// the error carries a descriptive message. This function never panics on
/// malformed input and has no side effects, so it is safe to call on
/// untrusted expression text.
pub fn safe_eval(
    expr: &str,
    variables: &HashMap<String, Value>,
) -> (Option<Value>, Option<String>) {
    match eval_expression(expr, variables) {
        Ok(value) => (Some(value), None),
        Err(err) => (None, Some(err.to_string())),
    }
}

/// Clear the expression cache (useful for testing)
#[allow(dead_code)]
pub fn clear_cache() {
    let mut cache = EXPR_CACHE.write();
    cache.clear();
}

/// Get cache statistics
#[allow(dead_code)]
pub fn cache_size() -> usize {
    let cache = EXPR_CACHE.read();
    cache.len()
}

//! Shared loadings arithmetic for the loadings-based families.

use serde_json::{json, Map, Value};
use std::cmp::Ordering;

/// Per-component salient variables: component id -> ordered
/// `[{"variable", "loading"}]`, strongest first, truncated to `top`.
pub(crate) fn salient_map(
    loadings: &[Vec<f64>],
    variable_names: &[String],
    component_names: &[String],
    cutoff: f64,
    top: usize,
) -> Map<String, Value> {
    let mut out = Map::new();
    for (col, component) in component_names.iter().enumerate() {
        let mut entries: Vec<(String, f64)> = loadings
            .iter()
            .zip(variable_names)
            .filter_map(|(row, name)| {
                let value = row.get(col).copied().unwrap_or(0.0);
                (value.abs() >= cutoff).then(|| (name.clone(), value))
            })
            .collect();
        entries.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(Ordering::Equal)
        });
        entries.truncate(top);
        let rendered: Vec<Value> = entries
            .into_iter()
            .map(|(variable, loading)| json!({ "variable": variable, "loading": loading }))
            .collect();
        out.insert(component.clone(), Value::Array(rendered));
    }
    out
}

/// Variables salient on two or more components.
pub(crate) fn cross_loadings(
    loadings: &[Vec<f64>],
    variable_names: &[String],
    component_names: &[String],
    cutoff: f64,
) -> Vec<Value> {
    let mut out = Vec::new();
    for (row, name) in loadings.iter().zip(variable_names) {
        let hits: Vec<&String> = row
            .iter()
            .enumerate()
            .filter(|(_, v)| v.abs() >= cutoff)
            .filter_map(|(col, _)| component_names.get(col))
            .collect();
        if hits.len() >= 2 {
            out.push(json!({ "variable": name, "components": hits }));
        }
    }
    out
}

/// Components with fewer salient variables than `minimum`.
pub(crate) fn weakly_defined(salient: &Map<String, Value>, order: &[String], minimum: usize) -> Vec<String> {
    order
        .iter()
        .filter(|id| {
            salient
                .get(*id)
                .and_then(Value::as_array)
                .is_some_and(|list| list.len() < minimum)
        })
        .cloned()
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

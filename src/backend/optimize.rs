//! Deterministic optimization passes over the intent graph.
//!
//! Opt-in via `--optimize`. Three passes run in a fixed order: constant
//! folding of literal-only operations, dead-assignment removal, and orphan
//! pruning. Artifacts are byte-identical when the flag is off.

use serde::Serialize;
use serde_json::{json, Value};

use crate::backend::graph::IntentGraph;

/// Summary of optimization actions applied to a graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizationReport {
    pub folded_operations: usize,
    pub removed_assignments: usize,
    pub notes: Vec<String>,
}

/// Applies the optimization passes to a graph copy.
pub struct GraphOptimizer;

impl GraphOptimizer {
    pub fn optimize(graph: &IntentGraph) -> (IntentGraph, OptimizationReport) {
        let mut optimized = graph.clone();
        let mut report = OptimizationReport::default();

        constant_fold(&mut optimized, &mut report);
        remove_dead_assignments(&mut optimized, &mut report);
        prune_orphans(&mut optimized);

        (optimized, report)
    }
}

fn constant_fold(graph: &mut IntentGraph, report: &mut OptimizationReport) {
    let node_ids: Vec<u32> = graph.nodes.keys().copied().collect();
    for node_id in node_ids {
        let Some(node) = graph.nodes.get(&node_id) else {
            continue;
        };
        if node.kind != "OperationIntent" {
            continue;
        }
        let operator = node
            .attrs
            .get("operator")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let operand_ids = graph.child_ids(node_id, "operand");
        if operand_ids.is_empty() {
            continue;
        }
        let mut values = Vec::new();
        let mut all_literals = true;
        for operand_id in &operand_ids {
            match graph.nodes.get(operand_id) {
                Some(operand) if operand.kind == "LiteralIntent" => {
                    values.push(operand.attrs.get("value").cloned().unwrap_or(Value::Null));
                }
                _ => {
                    all_literals = false;
                    break;
                }
            }
        }
        if !all_literals {
            continue;
        }

        let Some(folded) = eval_operator(&operator, &values) else {
            continue;
        };

        let Some(node) = graph.nodes.get_mut(&node_id) else {
            continue;
        };
        node.kind = "LiteralIntent".to_string();
        node.attrs.clear();
        node.attrs
            .insert("value_type".to_string(), json!(value_type_name(&folded)));
        node.attrs.insert("value".to_string(), folded);
        node.attrs
            .insert("folded_from".to_string(), json!(operator));
        graph
            .edges
            .retain(|edge| !(edge.source == node_id && edge.edge_type == "operand"));
        report.folded_operations += 1;
        report
            .notes
            .push(format!("Folded operation node {node_id} ({operator})."));
    }
}

fn remove_dead_assignments(graph: &mut IntentGraph, report: &mut OptimizationReport) {
    let referenced: Vec<String> = graph
        .nodes
        .values()
        .filter(|node| node.kind == "RefIntent")
        .filter_map(|node| node.attrs.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    let node_ids: Vec<u32> = graph.nodes.keys().copied().collect();
    for node_id in node_ids {
        let Some(node) = graph.nodes.get(&node_id) else {
            continue;
        };
        if node.kind != "AssignmentIntent" {
            continue;
        }
        let Some(name) = node.attrs.get("name").and_then(Value::as_str) else {
            continue;
        };
        if referenced.iter().any(|r| r == name) {
            continue;
        }
        let name = name.to_string();
        graph.remove_node(node_id);
        report.removed_assignments += 1;
        report
            .notes
            .push(format!("Removed dead assignment node {node_id} ({name})."));
    }
}

fn prune_orphans(graph: &mut IntentGraph) {
    let mut changed = true;
    while changed {
        changed = false;
        let node_ids: Vec<u32> = graph.nodes.keys().copied().collect();
        for node_id in node_ids {
            if Some(node_id) == graph.root_id {
                continue;
            }
            if !graph.incoming(node_id).is_empty() {
                continue;
            }
            graph.remove_node(node_id);
            changed = true;
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "str",
        _ => "unknown",
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn numeric_result(left: &Value, right: &Value, result: f64) -> Value {
    // Integer operands keep integer results when the value is integral.
    if left.is_i64() && right.is_i64() && result.fract() == 0.0 {
        json!(result as i64)
    } else {
        json!(result)
    }
}

fn eval_operator(operator: &str, values: &[Value]) -> Option<Value> {
    if values.len() == 1 {
        let value = &values[0];
        return match operator {
            "!" => value.as_bool().map(|b| json!(!b)),
            "-" => as_f64(value).map(|v| numeric_result(value, value, -v)),
            "+" => as_f64(value).map(|v| numeric_result(value, value, v)),
            _ => None,
        };
    }
    if values.len() != 2 {
        return None;
    }
    let (left, right) = (&values[0], &values[1]);

    match operator {
        "+" => {
            if let (Some(a), Some(b)) = (left.as_str(), right.as_str()) {
                return Some(json!(format!("{a}{b}")));
            }
            let (a, b) = (as_f64(left)?, as_f64(right)?);
            Some(numeric_result(left, right, a + b))
        }
        "-" => {
            let (a, b) = (as_f64(left)?, as_f64(right)?);
            Some(numeric_result(left, right, a - b))
        }
        "*" => {
            let (a, b) = (as_f64(left)?, as_f64(right)?);
            Some(numeric_result(left, right, a * b))
        }
        "/" => {
            let (a, b) = (as_f64(left)?, as_f64(right)?);
            if b == 0.0 {
                return None;
            }
            // Division always folds to a float, matching target semantics.
            Some(json!(a / b))
        }
        "%" => {
            let (a, b) = (as_f64(left)?, as_f64(right)?);
            if b == 0.0 {
                return None;
            }
            Some(numeric_result(left, right, a % b))
        }
        "==" => Some(json!(left == right)),
        "!=" => Some(json!(left != right)),
        "<" => Some(json!(as_f64(left)? < as_f64(right)?)),
        "<=" => Some(json!(as_f64(left)? <= as_f64(right)?)),
        ">" => Some(json!(as_f64(left)? > as_f64(right)?)),
        ">=" => Some(json!(as_f64(left)? >= as_f64(right)?)),
        "&&" => Some(json!(left.as_bool()? && right.as_bool()?)),
        "||" => Some(json!(left.as_bool()? || right.as_bool()?)),
        _ => None,
    }
}

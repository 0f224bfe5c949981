//! Intent graph: a typed multigraph projection of the IR.
//!
//! Used for `explain` and `diff` artifacts. Nodes live in an indexed arena
//! keyed by id; edges are a flat list carrying an integer `order` so child
//! traversal is deterministic. Graphs are acyclic by construction.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::backend::ir::{literal_to_json, IrExpr, IrModule, IrParam, IrStmt};
use icl_core::types::SymType;

/// A typed semantic node in the intent graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: u32,
    pub kind: String,
    pub attrs: Map<String, Value>,
}

/// A directed typed relation between graph nodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: u32,
    pub target: u32,
    pub edge_type: String,
    pub order: u32,
}

/// Directed multigraph over intent nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentGraph {
    pub nodes: BTreeMap<u32, GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub root_id: Option<u32>,
}

impl IntentGraph {
    pub fn add_node(&mut self, id: u32, kind: impl Into<String>, attrs: Map<String, Value>) {
        self.nodes.insert(
            id,
            GraphNode {
                id,
                kind: kind.into(),
                attrs,
            },
        );
    }

    pub fn add_edge(&mut self, source: u32, target: u32, edge_type: impl Into<String>, order: u32) {
        self.edges.push(GraphEdge {
            source,
            target,
            edge_type: edge_type.into(),
            order,
        });
    }

    /// Outgoing edges from `source`, optionally filtered, sorted by order.
    pub fn outgoing(&self, source: u32, edge_type: Option<&str>) -> Vec<&GraphEdge> {
        let mut edges: Vec<&GraphEdge> = self
            .edges
            .iter()
            .filter(|edge| edge.source == source)
            .filter(|edge| edge_type.is_none_or(|ty| edge.edge_type == ty))
            .collect();
        edges.sort_by_key(|edge| edge.order);
        edges
    }

    pub fn incoming(&self, target: u32) -> Vec<&GraphEdge> {
        self.edges.iter().filter(|edge| edge.target == target).collect()
    }

    /// Target ids of ordered outgoing edges of one type.
    pub fn child_ids(&self, source: u32, edge_type: &str) -> Vec<u32> {
        self.outgoing(source, Some(edge_type))
            .into_iter()
            .map(|edge| edge.target)
            .collect()
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: u32) {
        self.nodes.remove(&id);
        self.edges
            .retain(|edge| edge.source != id && edge.target != id);
    }

    /// Serialize to the stable graph JSON shape.
    pub fn to_json(&self) -> Value {
        json!({
            "root_id": self.root_id,
            "nodes": self.nodes.values().collect::<Vec<_>>(),
            "edges": self.edges,
        })
    }

    pub fn from_json(payload: &Value) -> Result<IntentGraph, serde_json::Error> {
        let mut graph = IntentGraph {
            root_id: payload
                .get("root_id")
                .and_then(Value::as_u64)
                .map(|id| id as u32),
            ..IntentGraph::default()
        };
        if let Some(nodes) = payload.get("nodes") {
            let nodes: Vec<GraphNode> = serde_json::from_value(nodes.clone())?;
            for node in nodes {
                graph.nodes.insert(node.id, node);
            }
        }
        if let Some(edges) = payload.get("edges") {
            graph.edges = serde_json::from_value(edges.clone())?;
        }
        Ok(graph)
    }
}

// ============================================================================
// IR -> graph projection
// ============================================================================

/// Builds the intent graph from an IR module.
pub struct GraphBuilder {
    graph: IntentGraph,
    counter: u32,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: IntentGraph::default(),
            counter: 0,
        }
    }

    pub fn build(mut self, module: &IrModule) -> IntentGraph {
        let module_id = self.next_id();
        let mut attrs = Map::new();
        attrs.insert("name".to_string(), json!("module"));
        self.graph.add_node(module_id, "ModuleIntent", attrs);
        self.graph.root_id = Some(module_id);

        for (order, stmt) in module.statements.iter().enumerate() {
            self.build_stmt(stmt, module_id, "contains", order as u32);
        }
        self.graph
    }

    fn build_stmt(&mut self, stmt: &IrStmt, parent: u32, edge_type: &str, order: u32) {
        let node_id = match stmt {
            IrStmt::Assignment {
                name,
                type_hint,
                value,
                ..
            } => {
                let id = self.next_id();
                let mut attrs = Map::new();
                attrs.insert("name".to_string(), json!(name));
                attrs.insert(
                    "type_hint".to_string(),
                    json!(type_hint.map(SymType::as_str)),
                );
                self.graph.add_node(id, "AssignmentIntent", attrs);
                let value_id = self.build_expr(value);
                self.graph.add_edge(id, value_id, "value", 0);
                id
            }

            IrStmt::Expression { expr, .. } => {
                let id = self.next_id();
                self.graph.add_node(id, "ExpressionIntent", Map::new());
                let expr_id = self.build_expr(expr);
                self.graph.add_edge(id, expr_id, "expr", 0);
                id
            }

            IrStmt::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                let id = self.next_id();
                let mut attrs = Map::new();
                attrs.insert("control".to_string(), json!("if"));
                self.graph.add_node(id, "ControlIntent", attrs);
                let cond_id = self.build_expr(condition);
                self.graph.add_edge(id, cond_id, "condition", 0);
                for (idx, inner) in then_block.iter().enumerate() {
                    self.build_stmt(inner, id, "contains_then", idx as u32);
                }
                for (idx, inner) in else_block.iter().enumerate() {
                    self.build_stmt(inner, id, "contains_else", idx as u32);
                }
                id
            }

            IrStmt::Loop {
                iterator,
                start,
                end,
                body,
                ..
            } => {
                let id = self.next_id();
                let mut attrs = Map::new();
                attrs.insert("iterator".to_string(), json!(iterator));
                self.graph.add_node(id, "LoopIntent", attrs);
                let start_id = self.build_expr(start);
                let end_id = self.build_expr(end);
                self.graph.add_edge(id, start_id, "start", 0);
                self.graph.add_edge(id, end_id, "end", 1);
                for (idx, inner) in body.iter().enumerate() {
                    self.build_stmt(inner, id, "contains_body", idx as u32);
                }
                id
            }

            IrStmt::Function {
                name,
                params,
                return_type,
                body,
                expr_body,
                ..
            } => {
                let id = self.next_id();
                let mut attrs = Map::new();
                attrs.insert("name".to_string(), json!(name));
                attrs.insert("params".to_string(), params_attr(params));
                attrs.insert(
                    "return_type".to_string(),
                    json!(return_type.map(SymType::as_str)),
                );
                attrs.insert("expr_body".to_string(), json!(expr_body.is_some()));
                self.graph.add_node(id, "FuncIntent", attrs);
                if let Some(expr) = expr_body {
                    let expr_id = self.build_expr(expr);
                    self.graph.add_edge(id, expr_id, "return_expr", 0);
                } else {
                    for (idx, inner) in body.iter().enumerate() {
                        self.build_stmt(inner, id, "contains_body", idx as u32);
                    }
                }
                id
            }

            IrStmt::Return { value, .. } => {
                let id = self.next_id();
                self.graph.add_node(id, "ReturnIntent", Map::new());
                if let Some(expr) = value {
                    let value_id = self.build_expr(expr);
                    self.graph.add_edge(id, value_id, "value", 0);
                }
                id
            }
        };

        self.graph.add_edge(parent, node_id, edge_type, order);
    }

    fn build_expr(&mut self, expr: &IrExpr) -> u32 {
        match expr {
            IrExpr::Literal { value, .. } => {
                let id = self.next_id();
                let mut attrs = Map::new();
                attrs.insert("value".to_string(), literal_to_json(value));
                attrs.insert("value_type".to_string(), json!(value.type_name()));
                self.graph.add_node(id, "LiteralIntent", attrs);
                id
            }

            IrExpr::Ref { name, .. } => {
                let id = self.next_id();
                let mut attrs = Map::new();
                attrs.insert("name".to_string(), json!(name));
                self.graph.add_node(id, "RefIntent", attrs);
                id
            }

            IrExpr::Unary {
                operator, operand, ..
            } => {
                let id = self.next_id();
                let mut attrs = Map::new();
                attrs.insert("operator".to_string(), json!(operator));
                attrs.insert("arity".to_string(), json!(1));
                self.graph.add_node(id, "OperationIntent", attrs);
                let operand_id = self.build_expr(operand);
                self.graph.add_edge(id, operand_id, "operand", 0);
                id
            }

            IrExpr::Binary {
                left,
                operator,
                right,
                ..
            } => {
                let id = self.next_id();
                let mut attrs = Map::new();
                attrs.insert("operator".to_string(), json!(operator));
                attrs.insert("arity".to_string(), json!(2));
                self.graph.add_node(id, "OperationIntent", attrs);
                let left_id = self.build_expr(left);
                let right_id = self.build_expr(right);
                self.graph.add_edge(id, left_id, "operand", 0);
                self.graph.add_edge(id, right_id, "operand", 1);
                id
            }

            IrExpr::Call {
                callee,
                args,
                at_prefixed,
                ..
            } => {
                let id = self.next_id();
                let mut attrs = Map::new();
                attrs.insert("at_prefixed".to_string(), json!(at_prefixed));
                // A plain identifier callee folds into the call node; other
                // callees hang off a dedicated edge.
                if let IrExpr::Ref { name, .. } = callee.as_ref() {
                    attrs.insert("callee_name".to_string(), json!(name));
                    self.graph.add_node(id, "CallIntent", attrs);
                } else {
                    self.graph.add_node(id, "CallIntent", attrs);
                    let callee_id = self.build_expr(callee);
                    self.graph.add_edge(id, callee_id, "callee", 0);
                }
                for (idx, arg) in args.iter().enumerate() {
                    let arg_id = self.build_expr(arg);
                    self.graph.add_edge(id, arg_id, "arg", idx as u32);
                }
                id
            }

            IrExpr::Lambda {
                params,
                return_type,
                body,
                ..
            } => {
                let id = self.next_id();
                let mut attrs = Map::new();
                attrs.insert("params".to_string(), params_attr(params));
                attrs.insert(
                    "return_type".to_string(),
                    json!(return_type.map(SymType::as_str)),
                );
                self.graph.add_node(id, "LambdaIntent", attrs);
                let body_id = self.build_expr(body);
                self.graph.add_edge(id, body_id, "body", 0);
                id
            }
        }
    }

    fn next_id(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn params_attr(params: &[IrParam]) -> Value {
    Value::Array(
        params
            .iter()
            .map(|param| {
                json!({
                    "name": param.name,
                    "type_hint": param.type_hint.map(SymType::as_str),
                })
            })
            .collect(),
    )
}

// ============================================================================
// Structural diff
// ============================================================================

/// Structural diff between two intent graphs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphDiff {
    pub added_nodes: Vec<u32>,
    pub removed_nodes: Vec<u32>,
    pub changed_nodes: Vec<u32>,
    pub added_edges: Vec<GraphEdge>,
    pub removed_edges: Vec<GraphEdge>,
}

/// Compare two graph snapshots by node id.
pub fn diff_graphs(before: &IntentGraph, after: &IntentGraph) -> GraphDiff {
    let before_ids: BTreeSet<u32> = before.nodes.keys().copied().collect();
    let after_ids: BTreeSet<u32> = after.nodes.keys().copied().collect();

    let added_nodes: Vec<u32> = after_ids.difference(&before_ids).copied().collect();
    let removed_nodes: Vec<u32> = before_ids.difference(&after_ids).copied().collect();

    let mut changed_nodes = Vec::new();
    for id in before_ids.intersection(&after_ids) {
        let left = &before.nodes[id];
        let right = &after.nodes[id];
        if left.kind != right.kind || left.attrs != right.attrs {
            changed_nodes.push(*id);
        }
    }

    let before_edges: BTreeSet<GraphEdge> = before.edges.iter().cloned().collect();
    let after_edges: BTreeSet<GraphEdge> = after.edges.iter().cloned().collect();

    GraphDiff {
        added_nodes,
        removed_nodes,
        changed_nodes,
        added_edges: after_edges.difference(&before_edges).cloned().collect(),
        removed_edges: before_edges.difference(&after_edges).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ir::IrBuilder;
    use crate::frontend::{lexer, parser, semantic};

    fn build_graph(source: &str) -> IntentGraph {
        let tokens = lexer::lex(source).expect("lex should succeed");
        let program = parser::parse(&tokens).expect("parse should succeed");
        let model = semantic::analyze(&program).expect("analysis should succeed");
        let (module, _) = IrBuilder::new(&model, "<input>").build(&program);
        GraphBuilder::new().build(&module)
    }

    #[test]
    fn module_root_contains_statements_in_order() {
        let graph = build_graph("x := 1; y := 2; z := 3;");
        let root = graph.root_id.expect("root should exist");
        let children = graph.child_ids(root, "contains");
        assert_eq!(children.len(), 3);
        let orders: Vec<u32> = graph
            .outgoing(root, Some("contains"))
            .iter()
            .map(|edge| edge.order)
            .collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn operation_nodes_carry_ordered_operands() {
        let graph = build_graph("x := 1 + 2;");
        let op = graph
            .nodes
            .values()
            .find(|node| node.kind == "OperationIntent")
            .expect("operation node");
        let operands = graph.child_ids(op.id, "operand");
        assert_eq!(operands.len(), 2);
    }

    #[test]
    fn call_with_identifier_callee_folds_name() {
        let graph = build_graph("fn f(n:Num):Num => n; x := @f(1);");
        let call = graph
            .nodes
            .values()
            .find(|node| node.kind == "CallIntent" && node.attrs.contains_key("callee_name"))
            .expect("call node");
        assert_eq!(call.attrs["callee_name"], "f");
        assert!(graph.child_ids(call.id, "callee").is_empty());
    }

    #[test]
    fn if_uses_then_and_else_edges() {
        let graph = build_graph("if true ? { x := 1; } : { x := 2; }");
        let control = graph
            .nodes
            .values()
            .find(|node| node.kind == "ControlIntent")
            .expect("control node");
        assert_eq!(graph.child_ids(control.id, "contains_then").len(), 1);
        assert_eq!(graph.child_ids(control.id, "contains_else").len(), 1);
        assert_eq!(graph.child_ids(control.id, "condition").len(), 1);
    }

    #[test]
    fn json_round_trip_preserves_structure() {
        let graph = build_graph("sum := 0; loop i in 0..3 { sum := sum + i; }");
        let payload = graph.to_json();
        let restored = IntentGraph::from_json(&payload).expect("graph should deserialize");
        assert_eq!(graph, restored);
    }

    #[test]
    fn serialization_is_deterministic() {
        let source = "fn add(a:Num,b:Num):Num => a+b; x := @add(1,2); @print(x);";
        let first = serde_json::to_string(&build_graph(source).to_json()).expect("serialize");
        let second = serde_json::to_string(&build_graph(source).to_json()).expect("serialize");
        assert_eq!(first, second);
    }

    #[test]
    fn diff_reports_added_and_changed_nodes() {
        let before = build_graph("x := 1;");
        let after = build_graph("x := 2; y := 3;");
        let diff = diff_graphs(&before, &after);
        assert!(!diff.added_nodes.is_empty());
        assert!(diff.removed_nodes.is_empty());
        assert!(!diff.changed_nodes.is_empty(), "literal value changed");
    }

    #[test]
    fn identical_graphs_diff_empty() {
        let before = build_graph("x := 1;");
        let after = build_graph("x := 1;");
        let diff = diff_graphs(&before, &after);
        assert!(diff.added_nodes.is_empty());
        assert!(diff.removed_nodes.is_empty());
        assert!(diff.changed_nodes.is_empty());
        assert!(diff.added_edges.is_empty());
        assert!(diff.removed_edges.is_empty());
    }

    #[test]
    fn edge_orders_form_contiguous_permutations() {
        let graph = build_graph(
            "fn f(a:Num):Num { if a > 0 ? { ret a; } : { ret 0; } } x := @f(3); @print(x);",
        );
        let mut per_container: BTreeMap<(u32, &str), Vec<u32>> = BTreeMap::new();
        for edge in &graph.edges {
            per_container
                .entry((edge.source, edge.edge_type.as_str()))
                .or_default()
                .push(edge.order);
        }
        for ((source, edge_type), mut orders) in per_container {
            orders.sort_unstable();
            let expected: Vec<u32> = (0..orders.len() as u32).collect();
            assert_eq!(
                orders, expected,
                "orders for ({source}, {edge_type}) must be 0..n-1"
            );
        }
    }
}

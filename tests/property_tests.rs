//! Property-based tests for pipeline invariants.
//!
//! Programs are generated from data (statement kinds plus literal payloads)
//! and rendered with position-unique names, so every generated module is
//! semantically valid. The properties cover the determinism, round-trip, and
//! ordering guarantees the compiler promises.

use proptest::prelude::*;

use icl::backend::packs::registry::default_registry;
use icl::pipeline::{self, CompileOptions};

/// One statement's worth of generation data.
#[derive(Debug, Clone)]
enum StmtSeed {
    Assign(i64),
    Arithmetic(i64, i64),
    Annotated(i64),
    Logic(bool, bool),
    LoopSum(u8),
    Conditional(i64),
    Function(i64),
    PrintLiteral(i64),
}

fn stmt_seed() -> impl Strategy<Value = StmtSeed> {
    prop_oneof![
        (-999i64..999).prop_map(StmtSeed::Assign),
        ((-99i64..99), (-99i64..99)).prop_map(|(a, b)| StmtSeed::Arithmetic(a, b)),
        (-999i64..999).prop_map(StmtSeed::Annotated),
        (any::<bool>(), any::<bool>()).prop_map(|(a, b)| StmtSeed::Logic(a, b)),
        (1u8..9).prop_map(StmtSeed::LoopSum),
        (-99i64..99).prop_map(StmtSeed::Conditional),
        (-99i64..99).prop_map(StmtSeed::Function),
        (-999i64..999).prop_map(StmtSeed::PrintLiteral),
    ]
}

/// Render seeds into a valid module; names embed the statement index so
/// bindings never collide.
fn render(seeds: &[StmtSeed], separator: &str) -> String {
    let statements: Vec<String> = seeds
        .iter()
        .enumerate()
        .map(|(idx, seed)| match seed {
            StmtSeed::Assign(v) => format!("v{idx} := {v};"),
            StmtSeed::Arithmetic(a, b) => format!("v{idx} := {a} + {b} * 2;"),
            StmtSeed::Annotated(v) => format!("v{idx}:Num := {v};"),
            StmtSeed::Logic(a, b) => format!("v{idx} := {a} && !{b};"),
            StmtSeed::LoopSum(n) => {
                format!("v{idx} := 0; loop i{idx} in 0..{n} {{ v{idx} := v{idx} + i{idx}; }}")
            }
            StmtSeed::Conditional(v) => format!(
                "v{idx} := {v}; if v{idx} > 0 ? {{ @print(v{idx}); }} : {{ @print(0); }}"
            ),
            StmtSeed::Function(v) => {
                format!("fn f{idx}(a:Num):Num => a + {v}; @print(@f{idx}(1));")
            }
            StmtSeed::PrintLiteral(v) => format!("@print({v});"),
        })
        .collect();
    statements.join(separator)
}

fn program() -> impl Strategy<Value = String> {
    (
        proptest::collection::vec(stmt_seed(), 1..6),
        prop_oneof![Just(" "), Just("\n"), Just("\n\n")],
    )
        .prop_map(|(seeds, separator)| render(&seeds, separator))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Two compilations of the same source produce byte-identical code,
    /// identical IR ids, and identical graph serialization.
    #[test]
    fn compilation_is_deterministic(source in program()) {
        let packs = default_registry();
        let options = CompileOptions::default();
        for target in ["python", "js", "rust"] {
            let first = pipeline::compile_source(&source, target, &options, &packs)
                .expect("generated program should compile");
            let second = pipeline::compile_source(&source, target, &options, &packs)
                .expect("generated program should compile");
            prop_assert_eq!(&first.artifact.code, &second.artifact.code);
            prop_assert_eq!(
                serde_json::to_string(&first.front.graph.to_json()).unwrap(),
                serde_json::to_string(&second.front.graph.to_json()).unwrap()
            );
            prop_assert_eq!(
                serde_json::to_string(&first.front.source_map.to_json()).unwrap(),
                serde_json::to_string(&second.front.source_map.to_json()).unwrap()
            );
        }
    }

    /// `parse(compress(parse(s)))` equals `parse(s)` at the AST level.
    #[test]
    fn compression_round_trips(source in program()) {
        let options = CompileOptions::default();
        let original = pipeline::check_source(&source, &options)
            .expect("generated program should check");
        let compressed = icl::format::compress_source(&source)
            .expect("generated program should compress");
        let reparsed = pipeline::check_source(&compressed, &options)
            .expect("compressed program should check");
        prop_assert_eq!(
            serde_json::to_string(&icl::ast::program_to_json(&original.program)).unwrap(),
            serde_json::to_string(&icl::ast::program_to_json(&reparsed.program)).unwrap()
        );
    }

    /// Token spans are non-decreasing in source order.
    #[test]
    fn token_spans_are_monotonic(source in program()) {
        let tokens = icl::lexer::lex(&source).expect("generated program should lex");
        let mut previous = (0u32, 0u32);
        for token in &tokens {
            let start = (token.span.line, token.span.column);
            prop_assert!(start >= previous, "span went backwards at {:?}", token);
            previous = start;
        }
    }

    /// For every container edge set, orders are a gapless 0..n-1 permutation.
    #[test]
    fn graph_edge_orders_are_permutations(source in program()) {
        let options = CompileOptions::default();
        let front = pipeline::check_source(&source, &options)
            .expect("generated program should check");
        let mut per_container: std::collections::BTreeMap<(u32, String), Vec<u32>> =
            std::collections::BTreeMap::new();
        for edge in &front.graph.edges {
            per_container
                .entry((edge.source, edge.edge_type.clone()))
                .or_default()
                .push(edge.order);
        }
        for ((_, _), mut orders) in per_container {
            orders.sort_unstable();
            let expected: Vec<u32> = (0..orders.len() as u32).collect();
            prop_assert_eq!(orders, expected);
        }
    }

    /// Source-map ids cover 1..=n with every span inside the source text.
    #[test]
    fn source_map_ids_are_dense_and_in_range(source in program()) {
        let options = CompileOptions::default();
        let front = pipeline::check_source(&source, &options)
            .expect("generated program should check");
        let line_count = source.lines().count() as u32;
        let ids: Vec<u32> = front.front_ids();
        let expected: Vec<u32> = (1..=ids.len() as u32).collect();
        prop_assert_eq!(ids, expected);
        for (_, span) in front.source_map.iter() {
            prop_assert!(span.line >= 1);
            prop_assert!(span.end_line <= line_count + 1);
        }
    }
}

/// Convenience accessor used by the density property.
trait FrontIds {
    fn front_ids(&self) -> Vec<u32>;
}

impl FrontIds for icl::pipeline::FrontArtifacts {
    fn front_ids(&self) -> Vec<u32> {
        self.source_map.iter().map(|(id, _)| id).collect()
    }
}

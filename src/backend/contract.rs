//! Contract-test harness for language packs.
//!
//! A fixed corpus of canonical programs runs through the full pipeline per
//! target. The report grades every feature per target: declared-true features
//! must compile on every applicable case, and declared-false features must
//! fail explicitly with `LOW001`. A pack marked stable must pass 100% of the
//! required cases with no contradictions.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::backend::packs::registry::PackRegistry;
use crate::backend::packs::Stability;
use crate::pipeline::{self, CompileOptions};

/// Single contract fixture for cross-target compilation checks.
#[derive(Debug, Clone, Serialize)]
pub struct ContractCase {
    pub name: &'static str,
    pub source: &'static str,
    pub features: &'static [&'static str],
    pub required_for_stable: bool,
}

pub const CONTRACT_CASES: &[ContractCase] = &[
    ContractCase {
        name: "assignment_arithmetic",
        source: "x := 1 + 2;",
        features: &["assignment", "arithmetic", "literal"],
        required_for_stable: true,
    },
    ContractCase {
        name: "reference_reuse",
        source: "x := 1; y := x + 2;",
        features: &["assignment", "reference", "arithmetic", "literal"],
        required_for_stable: true,
    },
    ContractCase {
        name: "function_call_return",
        source: "fn add(a, b) { ret a + b; } out := add(1, 2);",
        features: &[
            "function",
            "return",
            "call",
            "assignment",
            "arithmetic",
            "literal",
            "reference",
        ],
        required_for_stable: true,
    },
    ContractCase {
        name: "if_else_comparison",
        source: "x := 2; if x > 1 ? { y := x; } : { y := 0; }",
        features: &["if", "comparison", "assignment", "literal", "reference"],
        required_for_stable: true,
    },
    ContractCase {
        name: "loop_update",
        source: "sum := 0; loop i in 0..3 { sum := sum + i; }",
        features: &["loop", "assignment", "arithmetic", "literal", "reference"],
        required_for_stable: true,
    },
    ContractCase {
        name: "unary_logic",
        source: "ok := true && !false;",
        features: &["assignment", "logic", "unary", "literal"],
        required_for_stable: true,
    },
    ContractCase {
        name: "expression_stmt_call",
        source: "print(1);",
        features: &["expression_stmt", "call", "literal"],
        required_for_stable: true,
    },
    ContractCase {
        name: "typed_annotation",
        source: "v:Num := 1;",
        features: &["typed_annotation", "assignment", "literal"],
        required_for_stable: true,
    },
    ContractCase {
        name: "at_call",
        source: "fn inc(n) { ret n + 1; } z := @inc(1);",
        features: &[
            "at_call",
            "call",
            "function",
            "return",
            "assignment",
            "arithmetic",
            "literal",
            "reference",
        ],
        required_for_stable: true,
    },
];

/// Result for one case/target compilation run.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub case: &'static str,
    pub target: String,
    pub ok: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

/// Per-feature grading for one target.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureStatus {
    pub declared_supported: bool,
    pub status: &'static str,
    pub cases: Vec<&'static str>,
    pub pass_count: usize,
    pub low001_count: usize,
    pub other_fail_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetSummary {
    pub passed: usize,
    pub total: usize,
    pub stability: Stability,
    pub all_cases_ok: bool,
    pub stable_feature_ok: bool,
    pub target_ok: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetFeatureMatrix {
    pub target: String,
    pub stability: Stability,
    pub contradictions: Vec<String>,
    pub features: BTreeMap<&'static str, FeatureStatus>,
}

/// Full contract-suite report.
#[derive(Debug, Clone, Serialize)]
pub struct ContractReport {
    pub ok: bool,
    pub stable_only: bool,
    pub targets: Vec<String>,
    pub required_stable_features: Vec<&'static str>,
    pub cases: Vec<ContractCase>,
    pub results: Vec<CaseResult>,
    pub summary: BTreeMap<String, TargetSummary>,
    pub feature_matrix: BTreeMap<String, TargetFeatureMatrix>,
}

fn all_features() -> Vec<&'static str> {
    let set: BTreeSet<&'static str> = CONTRACT_CASES
        .iter()
        .flat_map(|case| case.features.iter().copied())
        .collect();
    set.into_iter().collect()
}

fn required_stable_features() -> Vec<&'static str> {
    let set: BTreeSet<&'static str> = CONTRACT_CASES
        .iter()
        .filter(|case| case.required_for_stable)
        .flat_map(|case| case.features.iter().copied())
        .collect();
    set.into_iter().collect()
}

/// Run the canonical contract corpus for the selected targets.
pub fn run_contract_suite(
    registry: &PackRegistry,
    targets: Option<&[String]>,
    stable_only: bool,
) -> ContractReport {
    let selected: Vec<String> = match targets {
        Some(targets) if !targets.is_empty() => targets.to_vec(),
        _ => {
            let stability = if stable_only {
                Some(Stability::Stable)
            } else {
                None
            };
            registry.targets(stability)
        }
    };

    let options = CompileOptions::default();
    let mut results = Vec::new();
    for target in &selected {
        for case in CONTRACT_CASES {
            match pipeline::compile_source(case.source, target, &options, registry) {
                Ok(_) => results.push(CaseResult {
                    case: case.name,
                    target: target.clone(),
                    ok: true,
                    error_code: None,
                    error_message: None,
                }),
                Err(failure) => {
                    let first = failure.diagnostics.first();
                    results.push(CaseResult {
                        case: case.name,
                        target: target.clone(),
                        ok: false,
                        error_code: first.map(|d| d.code.clone()),
                        error_message: first.map(|d| d.message.clone()),
                    });
                }
            }
        }
    }

    let features = all_features();
    let required = required_stable_features();
    let mut summary = BTreeMap::new();
    let mut feature_matrix = BTreeMap::new();
    let mut target_ok_flags = Vec::new();

    for target in &selected {
        let Ok(pack) = registry.get(target) else {
            continue;
        };
        let manifest = pack.manifest();
        let target_results: Vec<&CaseResult> =
            results.iter().filter(|r| &r.target == target).collect();
        let by_case: BTreeMap<&str, &CaseResult> =
            target_results.iter().map(|r| (r.case, *r)).collect();

        let passed = target_results.iter().filter(|r| r.ok).count();
        let total = target_results.len();

        let mut per_feature = BTreeMap::new();
        let mut contradictions = Vec::new();

        for feature in &features {
            // An absent coverage entry counts as unsupported, matching the
            // lowering gate.
            let declared_supported = manifest
                .feature_coverage
                .get(*feature)
                .copied()
                .unwrap_or(false);
            let feature_cases: Vec<&ContractCase> = CONTRACT_CASES
                .iter()
                .filter(|case| case.features.contains(feature))
                .collect();

            let status = if declared_supported {
                // Grade support only on cases that are legal under the full
                // coverage matrix of this target.
                let applicable: Vec<&CaseResult> = feature_cases
                    .iter()
                    .filter(|case| {
                        case.features.iter().all(|item| {
                            manifest.feature_coverage.get(*item).copied().unwrap_or(false)
                        })
                    })
                    .filter_map(|case| by_case.get(case.name).copied())
                    .collect();
                let pass_count = applicable.iter().filter(|r| r.ok).count();
                let low001_count = applicable
                    .iter()
                    .filter(|r| r.error_code.as_deref() == Some("LOW001"))
                    .count();
                let other_fail_count = applicable
                    .iter()
                    .filter(|r| !r.ok && r.error_code.as_deref() != Some("LOW001"))
                    .count();

                let status = if applicable.is_empty() {
                    "unexercised"
                } else if pass_count == applicable.len() {
                    "supported"
                } else if low001_count > 0 {
                    "declared_supported_but_rejected"
                } else {
                    "declared_supported_but_failed"
                };
                FeatureStatus {
                    declared_supported,
                    status,
                    cases: feature_cases.iter().map(|case| case.name).collect(),
                    pass_count,
                    low001_count,
                    other_fail_count,
                }
            } else {
                // Declared-false features must fail explicitly anywhere they
                // are exercised.
                let exercised: Vec<&CaseResult> = feature_cases
                    .iter()
                    .filter_map(|case| by_case.get(case.name).copied())
                    .collect();
                let pass_count = exercised.iter().filter(|r| r.ok).count();
                let low001_count = exercised
                    .iter()
                    .filter(|r| r.error_code.as_deref() == Some("LOW001"))
                    .count();
                let other_fail_count = exercised
                    .iter()
                    .filter(|r| !r.ok && r.error_code.as_deref() != Some("LOW001"))
                    .count();

                let status = if exercised.is_empty() {
                    "unexercised"
                } else if low001_count == exercised.len() {
                    "unsupported_enforced"
                } else if pass_count > 0 {
                    "declared_unsupported_but_passed"
                } else {
                    "declared_unsupported_but_failed_nonstruct"
                };
                FeatureStatus {
                    declared_supported,
                    status,
                    cases: feature_cases.iter().map(|case| case.name).collect(),
                    pass_count,
                    low001_count,
                    other_fail_count,
                }
            };

            if status.status.contains("but") {
                contradictions.push(format!("{feature}:{}", status.status));
            }
            per_feature.insert(*feature, status);
        }

        let is_stable = manifest.stability == Stability::Stable;
        let all_cases_ok = target_results.iter().all(|r| r.ok);
        let stable_feature_ok = required
            .iter()
            .all(|feature| per_feature[feature].status == "supported");

        let target_ok = if is_stable {
            all_cases_ok && stable_feature_ok && contradictions.is_empty()
        } else {
            contradictions.is_empty()
        };

        summary.insert(
            target.clone(),
            TargetSummary {
                passed,
                total,
                stability: manifest.stability,
                all_cases_ok,
                stable_feature_ok,
                target_ok,
            },
        );
        feature_matrix.insert(
            target.clone(),
            TargetFeatureMatrix {
                target: target.clone(),
                stability: manifest.stability,
                contradictions,
                features: per_feature,
            },
        );
        target_ok_flags.push(target_ok);
    }

    ContractReport {
        ok: !target_ok_flags.is_empty() && target_ok_flags.iter().all(|ok| *ok),
        stable_only,
        targets: selected,
        required_stable_features: required,
        cases: CONTRACT_CASES.to_vec(),
        results,
        summary,
        feature_matrix,
    }
}

//! Natural-alias catalog for ICL source normalization.
//!
//! The alias normalizer rewrites whole-word natural spellings (`mkfn`,
//! `prnt`, `and`, ...) into canonical tokens before lexing. This module is
//! the single source of truth for that mapping: a metadata table for the
//! catalog listing plus `phf` lookup maps per mode.
//!
//! ## Notes
//! - `core` covers statement keywords and the portable `print` builtin.
//! - `extended` additionally covers boolean literals and word operators.
//! - Lookup is case-sensitive.

use serde::Serialize;

/// Alias tier selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasMode {
    Core,
    Extended,
}

impl AliasMode {
    pub fn parse(mode: &str) -> Option<AliasMode> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "core" => Some(AliasMode::Core),
            "extended" => Some(AliasMode::Extended),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AliasMode::Core => "core",
            AliasMode::Extended => "extended",
        }
    }
}

/// Catalog entry for one canonical token and its accepted spellings.
#[derive(Debug, Clone, Serialize)]
pub struct AliasEntry {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub category: &'static str,
    pub tier: &'static str,
    pub description: &'static str,
    /// How the canonical construct renders per target, for docs and tooling.
    pub target_forms: &'static [(&'static str, &'static str)],
}

pub const ALIAS_ENTRIES: &[AliasEntry] = &[
    AliasEntry {
        canonical: "fn",
        aliases: &["mkfn", "makefn", "defn", "func", "function"],
        category: "statement",
        tier: "core",
        description: "Function definition keyword.",
        target_forms: &[
            ("python", "def name(args): ..."),
            ("js", "function name(args) { ... }"),
            ("rust", "fn name(args) -> T { ... }"),
            ("web", "function name(args) { ... }"),
        ],
    },
    AliasEntry {
        canonical: "lam",
        aliases: &["lambda", "anon", "anonfn", "mklam"],
        category: "expression",
        tier: "core",
        description: "Inline lambda expression keyword.",
        target_forms: &[
            ("python", "lambda a: expr"),
            ("js", "(a) => expr"),
            ("rust", "|a| expr"),
            ("web", "(a) => expr"),
        ],
    },
    AliasEntry {
        canonical: "ret",
        aliases: &["rtn", "return", "giveback"],
        category: "statement",
        tier: "core",
        description: "Return statement keyword.",
        target_forms: &[
            ("python", "return expr"),
            ("js", "return expr;"),
            ("rust", "return expr;"),
            ("web", "return expr;"),
        ],
    },
    AliasEntry {
        canonical: "if",
        aliases: &["iff", "when", "cond"],
        category: "statement",
        tier: "core",
        description: "Conditional statement keyword.",
        target_forms: &[
            ("python", "if cond: ... else: ..."),
            ("js", "if (cond) { ... } else { ... }"),
            ("rust", "if cond { ... } else { ... }"),
            ("web", "if (cond) { ... } else { ... }"),
        ],
    },
    AliasEntry {
        canonical: "loop",
        aliases: &["lp", "repeat", "forloop", "iter"],
        category: "statement",
        tier: "core",
        description: "Range loop statement keyword.",
        target_forms: &[
            ("python", "for i in range(start, end): ..."),
            ("js", "for (let i = start; i < end; i++) { ... }"),
            ("rust", "for i in (start)..(end) { ... }"),
            ("web", "for (let i = start; i < end; i++) { ... }"),
        ],
    },
    AliasEntry {
        canonical: "in",
        aliases: &["within"],
        category: "statement",
        tier: "core",
        description: "Loop range delimiter keyword.",
        target_forms: &[
            ("python", "range(start, end)"),
            ("js", "for init; test; update"),
            ("rust", "(start)..(end)"),
            ("web", "for init; test; update"),
        ],
    },
    AliasEntry {
        canonical: "print",
        aliases: &["prnt", "echo", "say", "log"],
        category: "builtin",
        tier: "core",
        description: "Portable print builtin.",
        target_forms: &[
            ("python", "print(value)"),
            ("js", "print(value) (helper -> console.log)"),
            ("rust", "println!(\"{:?}\", value)"),
            ("web", "print(value) (helper -> DOM + console)"),
        ],
    },
    AliasEntry {
        canonical: "true",
        aliases: &["yes", "on"],
        category: "literal",
        tier: "extended",
        description: "Boolean true literal.",
        target_forms: &[
            ("python", "True"),
            ("js", "true"),
            ("rust", "true"),
            ("web", "true"),
        ],
    },
    AliasEntry {
        canonical: "false",
        aliases: &["no", "off"],
        category: "literal",
        tier: "extended",
        description: "Boolean false literal.",
        target_forms: &[
            ("python", "False"),
            ("js", "false"),
            ("rust", "false"),
            ("web", "false"),
        ],
    },
    AliasEntry {
        canonical: "&&",
        aliases: &["and"],
        category: "operator",
        tier: "extended",
        description: "Logical AND operator.",
        target_forms: &[("python", "and"), ("js", "&&"), ("rust", "&&"), ("web", "&&")],
    },
    AliasEntry {
        canonical: "||",
        aliases: &["or"],
        category: "operator",
        tier: "extended",
        description: "Logical OR operator.",
        target_forms: &[("python", "or"), ("js", "||"), ("rust", "||"), ("web", "||")],
    },
    AliasEntry {
        canonical: "!",
        aliases: &["not"],
        category: "operator",
        tier: "extended",
        description: "Logical NOT operator.",
        target_forms: &[("python", "not"), ("js", "!"), ("rust", "!"), ("web", "!")],
    },
    AliasEntry {
        canonical: "==",
        aliases: &["eq"],
        category: "operator",
        tier: "extended",
        description: "Equality operator.",
        target_forms: &[("python", "=="), ("js", "=="), ("rust", "=="), ("web", "==")],
    },
    AliasEntry {
        canonical: "!=",
        aliases: &["neq"],
        category: "operator",
        tier: "extended",
        description: "Inequality operator.",
        target_forms: &[("python", "!="), ("js", "!="), ("rust", "!="), ("web", "!=")],
    },
    AliasEntry {
        canonical: ">=",
        aliases: &["gte"],
        category: "operator",
        tier: "extended",
        description: "Greater-than-or-equal operator.",
        target_forms: &[("python", ">="), ("js", ">="), ("rust", ">="), ("web", ">=")],
    },
    AliasEntry {
        canonical: "<=",
        aliases: &["lte"],
        category: "operator",
        tier: "extended",
        description: "Less-than-or-equal operator.",
        target_forms: &[("python", "<="), ("js", "<="), ("rust", "<="), ("web", "<=")],
    },
];

/// Core-tier alias -> canonical lookup.
static CORE_LOOKUP: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "mkfn" => "fn",
    "makefn" => "fn",
    "defn" => "fn",
    "func" => "fn",
    "function" => "fn",
    "lambda" => "lam",
    "anon" => "lam",
    "anonfn" => "lam",
    "mklam" => "lam",
    "rtn" => "ret",
    "return" => "ret",
    "giveback" => "ret",
    "iff" => "if",
    "when" => "if",
    "cond" => "if",
    "lp" => "loop",
    "repeat" => "loop",
    "forloop" => "loop",
    "iter" => "loop",
    "within" => "in",
    "prnt" => "print",
    "echo" => "print",
    "say" => "print",
    "log" => "print",
};

/// Extended-tier additions: boolean literals and word operators.
static EXTENDED_LOOKUP: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "yes" => "true",
    "on" => "true",
    "no" => "false",
    "off" => "false",
    "and" => "&&",
    "or" => "||",
    "not" => "!",
    "eq" => "==",
    "neq" => "!=",
    "gte" => ">=",
    "lte" => "<=",
};

/// Resolve one identifier-shaped word to its canonical form, if aliased.
pub fn resolve(word: &str, mode: AliasMode) -> Option<&'static str> {
    if let Some(canonical) = CORE_LOOKUP.get(word) {
        return Some(canonical);
    }
    if mode == AliasMode::Extended {
        return EXTENDED_LOOKUP.get(word).copied();
    }
    None
}

/// Entries enabled for the selected mode, in catalog order.
pub fn entries(mode: AliasMode) -> Vec<&'static AliasEntry> {
    ALIAS_ENTRIES
        .iter()
        .filter(|entry| mode == AliasMode::Extended || entry.tier == "core")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_mode_resolves_keyword_aliases_only() {
        assert_eq!(resolve("mkfn", AliasMode::Core), Some("fn"));
        assert_eq!(resolve("prnt", AliasMode::Core), Some("print"));
        assert_eq!(resolve("and", AliasMode::Core), None);
    }

    #[test]
    fn extended_mode_adds_operators_and_literals() {
        assert_eq!(resolve("and", AliasMode::Extended), Some("&&"));
        assert_eq!(resolve("yes", AliasMode::Extended), Some("true"));
        assert_eq!(resolve("lte", AliasMode::Extended), Some("<="));
    }

    #[test]
    fn lookup_maps_cover_every_catalog_alias() {
        for entry in ALIAS_ENTRIES {
            for alias in entry.aliases {
                assert_eq!(
                    resolve(alias, AliasMode::Extended),
                    Some(entry.canonical),
                    "alias {alias} should resolve to {}",
                    entry.canonical
                );
            }
        }
    }

    #[test]
    fn entries_filter_by_tier() {
        assert!(entries(AliasMode::Core).iter().all(|e| e.tier == "core"));
        assert!(entries(AliasMode::Extended).len() > entries(AliasMode::Core).len());
    }
}

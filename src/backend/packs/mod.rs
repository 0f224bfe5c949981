//! Language packs: target emitters with declarative manifests.
//!
//! A pack exposes a manifest, an `emit` stage (lowered IR to target source
//! text), and a `scaffold` stage (emitted text to an output bundle). Packs
//! consume only lowered IR, never source text, tokens, or AST. Emission must
//! be deterministic and side-effect-free: equal inputs produce byte-identical
//! output.

pub mod js;
pub mod pseudo;
pub mod python;
pub mod registry;
pub mod rust_lang;
pub mod web;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::backend::lower::LoweredModule;

/// Pack maturity level. Stable packs are held to the full contract corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Experimental,
    Beta,
    Stable,
}

impl Stability {
    pub fn parse(value: &str) -> Option<Stability> {
        match value {
            "experimental" => Some(Stability::Experimental),
            "beta" => Some(Stability::Beta),
            "stable" => Some(Stability::Stable),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stability::Experimental => "experimental",
            Stability::Beta => "beta",
            Stability::Stable => "stable",
        }
    }
}

/// How the target language groups statements into blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockModel {
    Indent,
    Braces,
    Tags,
    Other,
}

/// How the target language terminates statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementTermination {
    Newline,
    Semicolon,
    Custom,
}

/// Output file layout a pack scaffolds around its primary artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaffolding {
    pub primary: String,
    #[serde(default)]
    pub additional: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
}

impl Scaffolding {
    pub fn single(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            additional: Vec::new(),
            entrypoint: None,
        }
    }
}

/// Declarative metadata for a target language pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackManifest {
    pub pack_id: String,
    pub version: String,
    pub target: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub stability: Stability,
    pub file_extension: String,
    pub block_model: BlockModel,
    pub statement_termination: StatementTermination,
    pub type_strategy: String,
    #[serde(default)]
    pub runtime_helpers: Vec<String>,
    pub scaffolding: Scaffolding,
    pub feature_coverage: BTreeMap<String, bool>,
}

impl PackManifest {
    /// Structural completeness checks. Empty result means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.pack_id.trim().is_empty() {
            errors.push("pack_id is required".to_string());
        }
        if self.version.trim().is_empty() {
            errors.push("version is required".to_string());
        }
        if self.target.trim().is_empty() {
            errors.push("target is required".to_string());
        }
        if self.file_extension.trim().is_empty() {
            errors.push("file_extension is required".to_string());
        }
        if self.type_strategy.trim().is_empty() {
            errors.push("type_strategy is required".to_string());
        }
        if self.scaffolding.primary.trim().is_empty() {
            errors.push("scaffolding.primary is required".to_string());
        }
        if self.feature_coverage.is_empty() {
            errors.push("feature_coverage must not be empty".to_string());
        }
        for feature in self.feature_coverage.keys() {
            if !icl_core::features::is_known_feature(feature) {
                errors.push(format!("unknown feature id '{feature}' in feature_coverage"));
            }
        }
        errors
    }
}

/// Context passed into pack emit/scaffold calls.
#[derive(Debug, Clone, Default)]
pub struct EmissionContext {
    pub target: String,
    pub debug: bool,
}

impl EmissionContext {
    pub fn for_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            debug: false,
        }
    }
}

/// Scaffolded output payload for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputBundle {
    pub primary_path: String,
    pub files: BTreeMap<String, String>,
}

impl OutputBundle {
    pub fn single(path: impl Into<String>, code: impl Into<String>) -> Self {
        let path = path.into();
        let mut files = BTreeMap::new();
        files.insert(path.clone(), code.into());
        Self {
            primary_path: path,
            files,
        }
    }

    /// Primary artifact text.
    pub fn code(&self) -> &str {
        self.files
            .get(&self.primary_path)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Language pack contract: emit + scaffold behind a manifest.
pub trait LanguagePack {
    fn manifest(&self) -> &PackManifest;

    /// Produce target source text from a lowered module. Deterministic and
    /// side-effect-free: equal inputs must produce byte-identical output.
    fn emit(&self, lowered: &LoweredModule, context: &EmissionContext) -> String;

    /// Produce the output bundle. Defaults to a single-file bundle at the
    /// manifest's primary scaffold path.
    fn scaffold(&self, emitted: &str, _context: &EmissionContext) -> OutputBundle {
        OutputBundle::single(self.manifest().scaffolding.primary.clone(), emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icl_core::features;

    fn manifest() -> PackManifest {
        PackManifest {
            pack_id: "icl.test".to_string(),
            version: "2.0.0".to_string(),
            target: "test".to_string(),
            aliases: vec![],
            stability: Stability::Beta,
            file_extension: "txt".to_string(),
            block_model: BlockModel::Braces,
            statement_termination: StatementTermination::Semicolon,
            type_strategy: "gradual_symbolic".to_string(),
            runtime_helpers: vec![],
            scaffolding: Scaffolding::single("main.txt"),
            feature_coverage: features::full_coverage(),
        }
    }

    #[test]
    fn complete_manifest_validates() {
        assert!(manifest().validate().is_empty());
    }

    #[test]
    fn missing_fields_are_reported() {
        let mut bad = manifest();
        bad.pack_id = " ".to_string();
        bad.file_extension = String::new();
        let errors = bad.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn unknown_feature_ids_are_rejected() {
        let mut bad = manifest();
        bad.feature_coverage.insert("teleport".to_string(), true);
        assert!(bad
            .validate()
            .iter()
            .any(|error| error.contains("teleport")));
    }

    #[test]
    fn manifest_serializes_with_lowercase_enums() {
        let json = serde_json::to_value(manifest()).expect("manifest should serialize");
        assert_eq!(json["stability"], "beta");
        assert_eq!(json["block_model"], "braces");
        assert_eq!(json["statement_termination"], "semicolon");
    }

    #[test]
    fn bundle_code_returns_primary_file() {
        let bundle = OutputBundle::single("main.py", "x = 1\n");
        assert_eq!(bundle.code(), "x = 1\n");
    }
}

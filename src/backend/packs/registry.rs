//! Pack registry: lookup by target id or alias, validation, explicit
//! registration.
//!
//! The registry is constructed by the host at process start; there is no
//! implicit discovery at call time. The `module[:symbol]` specifier syntax of
//! the CLI resolves against a static table of built-in registrars rather than
//! loading code dynamically.

use std::collections::BTreeMap;

use crate::backend::packs::pseudo::{PseudoPack, PSEUDO_PROFILES};
use crate::backend::packs::{
    js::JavaScriptPack, python::PythonPack, rust_lang::RustPack, web::WebPack, LanguagePack,
    PackManifest, Stability,
};
use crate::frontend::diagnostics::Diagnostic;

/// Validation summary for one pack manifest.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PackValidationResult {
    pub target: String,
    pub ok: bool,
    pub errors: Vec<String>,
}

/// In-memory mapping from canonical target id (and aliases) to pack.
#[derive(Default)]
pub struct PackRegistry {
    packs: BTreeMap<String, Box<dyn LanguagePack>>,
    aliases: BTreeMap<String, String>,
}

impl PackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pack after validating its manifest. Fails with `PACK002`
    /// when the manifest is structurally incomplete.
    pub fn register(&mut self, pack: Box<dyn LanguagePack>) -> Result<(), Diagnostic> {
        let manifest = pack.manifest().clone();
        let errors = manifest.validate();
        if !errors.is_empty() {
            return Err(Diagnostic::new(
                "PACK002",
                format!(
                    "Invalid language pack manifest for target '{}'.",
                    manifest.target
                ),
            )
            .with_hint(errors.join("; ")));
        }

        self.aliases
            .insert(manifest.target.clone(), manifest.target.clone());
        for alias in &manifest.aliases {
            self.aliases.insert(alias.clone(), manifest.target.clone());
        }
        self.packs.insert(manifest.target, pack);
        Ok(())
    }

    /// Remove a pack and every alias routing to it.
    pub fn unregister(&mut self, target: &str) -> bool {
        let Some(canonical) = self.aliases.get(target).cloned() else {
            return false;
        };
        self.packs.remove(&canonical);
        self.aliases.retain(|_, routed| routed != &canonical);
        true
    }

    pub fn has_target(&self, target: &str) -> bool {
        self.aliases.contains_key(target)
    }

    /// Resolve a target id or alias. Fails with `PACK001` when unknown.
    pub fn get(&self, target: &str) -> Result<&dyn LanguagePack, Diagnostic> {
        let canonical = self.aliases.get(target).ok_or_else(|| {
            Diagnostic::new(
                "PACK001",
                format!("Unknown target language pack '{target}'."),
            )
            .with_hint(format!("Available packs: {}", self.targets(None).join(", ")))
        })?;
        Ok(self.packs[canonical].as_ref())
    }

    /// Canonical target ids, optionally filtered by stability, sorted.
    pub fn targets(&self, stability: Option<Stability>) -> Vec<String> {
        self.manifests(stability)
            .into_iter()
            .map(|manifest| manifest.target)
            .collect()
    }

    /// Manifests sorted by target, optionally filtered by stability.
    pub fn manifests(&self, stability: Option<Stability>) -> Vec<PackManifest> {
        self.packs
            .values()
            .map(|pack| pack.manifest().clone())
            .filter(|manifest| stability.is_none_or(|s| manifest.stability == s))
            .collect()
    }

    /// Validate one target's manifest, or all manifests.
    pub fn validate(&self, target: Option<&str>) -> Result<Vec<PackValidationResult>, Diagnostic> {
        let manifests = match target {
            Some(target) => vec![self.get(target)?.manifest().clone()],
            None => self.manifests(None),
        };
        Ok(manifests
            .into_iter()
            .map(|manifest| {
                let errors = manifest.validate();
                PackValidationResult {
                    target: manifest.target,
                    ok: errors.is_empty(),
                    errors,
                }
            })
            .collect())
    }
}

/// Registry populated with the stable built-in packs plus the experimental
/// pseudo-packs.
pub fn default_registry() -> PackRegistry {
    let mut registry = PackRegistry::new();
    let builtins: Vec<Box<dyn LanguagePack>> = vec![
        Box::new(PythonPack::new()),
        Box::new(JavaScriptPack::new()),
        Box::new(RustPack::new()),
        Box::new(WebPack::new()),
    ];
    for pack in builtins {
        registry
            .register(pack)
            .expect("built-in pack manifests are valid");
    }
    for profile in PSEUDO_PROFILES {
        registry
            .register(Box::new(PseudoPack::new(*profile)))
            .expect("pseudo pack manifests are valid");
    }
    registry
}

// ============================================================================
// Host-level `module[:symbol]` loader
// ============================================================================

/// Apply a custom pack specifier to the registry.
///
/// Dynamic module loading is deliberately absent; specifiers resolve against
/// a static table of built-in registrars. A missing `:symbol` defaults to
/// `register`.
pub fn load_pack_spec(registry: &mut PackRegistry, spec: &str) -> Result<(), Diagnostic> {
    let (module, symbol) = split_spec(spec, "PACK005", "Pack spec cannot be empty.")?;

    match module.as_str() {
        "icl.packs.builtin" => {
            if symbol != "register" {
                return Err(Diagnostic::new(
                    "PACK004",
                    format!("Pack symbol '{symbol}' not found in module '{module}'."),
                )
                .with_hint("Use module[:symbol] with an exported register function."));
            }
            for profile in PSEUDO_PROFILES {
                if !registry.has_target(profile.target) {
                    registry.register(Box::new(PseudoPack::new(*profile)))?;
                }
            }
            Ok(())
        }
        other => Err(Diagnostic::new(
            "PACK003",
            format!("Unknown pack module '{other}' in spec '{spec}'."),
        )
        .with_hint("Built-in registrars: icl.packs.builtin[:register].")),
    }
}

pub(crate) fn split_spec(
    spec: &str,
    empty_code: &str,
    empty_message: &str,
) -> Result<(String, String), Diagnostic> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(Diagnostic::new(empty_code, empty_message).with_hint("Use module[:symbol]."));
    }
    match trimmed.split_once(':') {
        Some((module, symbol)) => {
            let symbol = symbol.trim();
            let symbol = if symbol.is_empty() { "register" } else { symbol };
            Ok((module.trim().to_string(), symbol.to_string()))
        }
        None => Ok((trimmed.to_string(), "register".to_string())),
    }
}

//! Symbol table and scope management.
//!
//! Scopes form a stack with parent chaining: module root, function scopes,
//! `if`-branch scopes, loop-body scopes. Lookups walk the chain outward; a
//! scope is dropped when analysis of its block ends. The builtin `print`
//! (arity 1, returns `Void`) is seeded into the module root.

use std::collections::BTreeMap;

use icl_core::types::SymType;

use crate::frontend::diagnostics::Span;

/// Symbol record for variables, parameters, functions, and builtins.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    pub name: String,
    pub ty: SymType,
    pub is_function: bool,
    pub arity: Option<usize>,
    pub return_type: Option<SymType>,
    pub param_types: Vec<SymType>,
    pub span: Option<Span>,
}

impl SymbolInfo {
    pub fn variable(name: impl Into<String>, ty: SymType) -> Self {
        Self {
            name: name.into(),
            ty,
            is_function: false,
            arity: None,
            return_type: None,
            param_types: Vec::new(),
            span: None,
        }
    }

    pub fn function(
        name: impl Into<String>,
        param_types: Vec<SymType>,
        return_type: SymType,
        span: Option<Span>,
    ) -> Self {
        Self {
            name: name.into(),
            ty: SymType::Fn,
            is_function: true,
            arity: Some(param_types.len()),
            return_type: Some(return_type),
            param_types,
            span,
        }
    }
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<usize>,
    symbols: BTreeMap<String, SymbolInfo>,
}

/// Scope tree with an active-scope cursor.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: usize,
}

impl SymbolTable {
    /// Create a table with the module root scope and builtins installed.
    pub fn new() -> Self {
        let mut table = Self {
            scopes: vec![Scope::default()],
            current: 0,
        };
        table.define(SymbolInfo::function(
            "print",
            vec![SymType::Any],
            SymType::Void,
            None,
        ));
        table
    }

    /// Enter a child scope of the current scope; returns its handle.
    pub fn push_scope(&mut self) -> usize {
        let scope = Scope {
            parent: Some(self.current),
            symbols: BTreeMap::new(),
        };
        self.scopes.push(scope);
        self.current = self.scopes.len() - 1;
        self.current
    }

    /// Leave the current scope, returning to its parent.
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    /// Define a symbol in the current scope, shadowing outer bindings.
    pub fn define(&mut self, symbol: SymbolInfo) {
        self.scopes[self.current]
            .symbols
            .insert(symbol.name.clone(), symbol);
    }

    /// Resolve a name in the current scope or any ancestor.
    pub fn resolve(&self, name: &str) -> Option<&SymbolInfo> {
        let mut cursor = Some(self.current);
        while let Some(index) = cursor {
            let scope = &self.scopes[index];
            if let Some(symbol) = scope.symbols.get(name) {
                return Some(symbol);
            }
            cursor = scope.parent;
        }
        None
    }

    /// True when the name is bound directly in the current scope.
    pub fn defined_locally(&self, name: &str) -> bool {
        self.scopes[self.current].symbols.contains_key(name)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_print_is_preinstalled() {
        let table = SymbolTable::new();
        let print = table.resolve("print").expect("print should exist");
        assert!(print.is_function);
        assert_eq!(print.arity, Some(1));
        assert_eq!(print.return_type, Some(SymType::Void));
    }

    #[test]
    fn lookup_walks_parent_chain() {
        let mut table = SymbolTable::new();
        table.define(SymbolInfo::variable("x", SymType::Num));
        table.push_scope();
        assert_eq!(table.resolve("x").map(|s| s.ty), Some(SymType::Num));
        assert!(!table.defined_locally("x"));
    }

    #[test]
    fn child_bindings_are_dropped_on_pop() {
        let mut table = SymbolTable::new();
        table.push_scope();
        table.define(SymbolInfo::variable("inner", SymType::Bool));
        table.pop_scope();
        assert!(table.resolve("inner").is_none());
    }

    #[test]
    fn inner_scopes_shadow_outer_bindings() {
        let mut table = SymbolTable::new();
        table.define(SymbolInfo::variable("v", SymType::Num));
        table.push_scope();
        table.define(SymbolInfo::variable("v", SymType::Str));
        assert_eq!(table.resolve("v").map(|s| s.ty), Some(SymType::Str));
        table.pop_scope();
        assert_eq!(table.resolve("v").map(|s| s.ty), Some(SymType::Num));
    }
}

// src/symbols/scope.rs
use crate::symbols::symbol::Symbol;
use crate::symbols::tag::Tag;
use std::collections::HashMap;

/// Identifies a scope frame. A plain incrementing counter rather than a
/// UUID: scopes never leave the module being lowered, so global uniqueness
/// across compilations is not a requirement here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// One lexical frame: its own symbol namespace, its own tag namespace (C
/// keeps structs/unions separate from ordinary identifiers), and a parent
/// pointer for the enclosing scope.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    symbols: HashMap<String, Symbol>,
    tags: HashMap<String, Tag>,
    parent: Option<ScopeId>,
}

/// The scope chain for one translation unit: a vector-of-frames plus a
/// current-scope cursor, equivalent to a linked chain of frames but without
/// heap fragmentation — `enter_scope`/`leave_scope` push and pop the cursor,
/// `lookup_*` walks parents from the cursor outward to the module scope.
#[derive(Debug)]
pub struct ScopeTable {
    scopes: HashMap<ScopeId, Scope>,
    current: ScopeId,
    root: ScopeId,
    next_id: usize,
}

impl ScopeTable {
    pub fn new() -> Self {
        let root = ScopeId(0);
        let mut scopes = HashMap::new();
        scopes.insert(root, Scope::default());
        Self { scopes, current: root, root, next_id: 1 }
    }

    pub fn root_scope(&self) -> ScopeId {
        self.root
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    pub fn enter_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.next_id);
        self.next_id += 1;
        self.scopes.insert(id, Scope { parent: Some(self.current), ..Scope::default() });
        self.current = id;
        id
    }

    /// Leaves the current scope, returning to its parent. A no-op at the
    /// root scope (mirrors the documented source behavior of tolerating an
    /// unbalanced call rather than panicking).
    pub fn leave_scope(&mut self) {
        if let Some(parent) = self.scopes.get(&self.current).and_then(|s| s.parent) {
            self.current = parent;
        }
    }

    fn frame(&self, id: ScopeId) -> &Scope {
        self.scopes.get(&id).expect("ScopeId always refers to a live frame")
    }

    fn frame_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.scopes.get_mut(&id).expect("ScopeId always refers to a live frame")
    }

    /// Declares `symbol` in the current scope. Returns the previous symbol's
    /// declaration site if one with the same name already exists in this
    /// scope (the caller turns that into `CompileError::RedefinitionOfSymbol`);
    /// a name that merely shadows an outer scope's symbol is always allowed.
    pub fn declare_symbol(&mut self, name: &str, symbol: Symbol) -> Result<(), Symbol> {
        let frame = self.frame_mut(self.current);
        if let Some(existing) = frame.symbols.get(name) {
            return Err(existing.clone());
        }
        frame.symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    pub fn lookup_symbol(&self, name: &str) -> Option<&Symbol> {
        let mut scope = Some(self.current);
        while let Some(id) = scope {
            let frame = self.frame(id);
            if let Some(sym) = frame.symbols.get(name) {
                return Some(sym);
            }
            scope = frame.parent;
        }
        None
    }

    pub fn lookup_symbol_in_current_scope(&self, name: &str) -> Option<&Symbol> {
        self.frame(self.current).symbols.get(name)
    }

    /// Declares a fresh tag (the first sighting of this identifier as a
    /// struct/union tag in the current scope, whether forward-declared or
    /// defined in full). Returns the previous tag if one with this name is
    /// already declared in this scope.
    pub fn declare_tag(&mut self, name: &str, tag: Tag) -> Result<(), Tag> {
        let frame = self.frame_mut(self.current);
        if let Some(existing) = frame.tags.get(name) {
            return Err(existing.clone());
        }
        frame.tags.insert(name.to_string(), tag);
        Ok(())
    }

    pub fn lookup_tag(&self, name: &str) -> Option<&Tag> {
        let mut scope = Some(self.current);
        while let Some(id) = scope {
            let frame = self.frame(id);
            if let Some(tag) = frame.tags.get(name) {
                return Some(tag);
            }
            scope = frame.parent;
        }
        None
    }

    pub fn lookup_tag_in_current_scope(&self, name: &str) -> Option<&Tag> {
        self.frame(self.current).tags.get(name)
    }

    /// Mutable access to a tag anywhere on the chain, used by tag completion
    /// (incomplete → complete is the only legal post-declaration mutation).
    pub fn lookup_tag_mut(&mut self, name: &str) -> Option<&mut Tag> {
        let mut scope = Some(self.current);
        while let Some(id) = scope {
            if self.frame(id).tags.contains_key(name) {
                return self.frame_mut(id).tags.get_mut(name);
            }
            scope = self.frame(id).parent;
        }
        None
    }
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Value;
    use crate::location::source_span::SourceSpan;
    use crate::symbols::symbol::SymbolKind;
    use crate::types::{CType, IrType};

    fn sym(name: &str) -> Symbol {
        Symbol {
            kind: SymbolKind::LocalVar,
            source_identifier: name.into(),
            ir_name: format!("%{name}").into(),
            c_type: CType::SINT,
            ir_type: IrType::I32,
            ir_ptr: Value::var(format!("%{name}"), IrType::ptr(IrType::I32)),
            declared_at: SourceSpan::default(),
            is_const: false,
        }
    }

    #[test]
    fn lookup_walks_parent_chain() {
        let mut table = ScopeTable::new();
        table.declare_symbol("x", sym("x")).unwrap();
        table.enter_scope();
        assert!(table.lookup_symbol("x").is_some());
        assert!(table.lookup_symbol_in_current_scope("x").is_none());
    }

    #[test]
    fn redeclaration_in_same_scope_is_rejected() {
        let mut table = ScopeTable::new();
        table.declare_symbol("x", sym("x")).unwrap();
        assert!(table.declare_symbol("x", sym("x")).is_err());
    }

    #[test]
    fn shadowing_in_a_nested_scope_is_allowed() {
        let mut table = ScopeTable::new();
        table.declare_symbol("x", sym("x")).unwrap();
        table.enter_scope();
        assert!(table.declare_symbol("x", sym("x")).is_ok());
    }

    #[test]
    fn leave_scope_at_root_is_a_no_op() {
        let mut table = ScopeTable::new();
        let root = table.current_scope();
        table.leave_scope();
        assert_eq!(table.current_scope(), root);
    }

    #[test]
    fn tag_namespace_is_separate_from_symbol_namespace() {
        let mut table = ScopeTable::new();
        table.declare_symbol("P", sym("P")).unwrap();
        table
            .declare_tag("P", crate::symbols::tag::Tag::incomplete("P", "P_0"))
            .expect("tag namespace must not collide with symbol namespace");
        assert!(table.lookup_tag("P").is_some());
        assert!(table.lookup_symbol("P").is_some());
    }
}

// src/symbols/symbol.rs
use crate::ir::Value;
use crate::location::source_span::SourceSpan;
use crate::types::{CType, IrType};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    LocalVar,
    GlobalVar,
    Function,
}

/// A declared identifier: a local, a global, or a function. `ir_ptr` holds
/// the address of the symbol's storage (the result of its `alloca` for a
/// local, the global's own IR name for a global) for variables, or the
/// function's own IR name for a function — so every symbol reference goes
/// through the same field regardless of kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub source_identifier: Arc<str>,
    pub ir_name: Arc<str>,
    pub c_type: CType,
    pub ir_type: IrType,
    pub ir_ptr: Value,
    pub declared_at: SourceSpan,
    /// Whether the declaration carried a `const` qualifier; assignment
    /// lowering rejects an lvalue whose symbol has this set.
    pub is_const: bool,
}

impl Symbol {
    pub fn is_function(&self) -> bool {
        self.kind == SymbolKind::Function
    }
}

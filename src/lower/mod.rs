//! The lowering pass: walks a [`crate::ast::TranslationUnit`] and produces an
//! [`crate::ir::IrModule`] plus a list of [`CompileError`] diagnostics.
//!
//! [`lower_translation_unit`] is the single public entry point; everything
//! else in this module is the recursive-descent machinery behind it —
//! expression lowering ([`expr`]), statement lowering ([`stmt`]), declaration
//! lowering ([`decl`]), function lowering ([`function`]), and constant
//! folding ([`constfold`]).
pub mod constfold;
pub mod decl;
pub mod expr;
pub mod function;
pub mod stmt;

use crate::arch::ArchDescriptor;
use crate::ast::TranslationUnit;
use crate::config::LoweringConfig;
use crate::error::CompileError;
use crate::ir::builder::{IrBuilder, Position};
use crate::ir::module::IrModule;
use crate::ir::value::Value;
use crate::location::source_span::SourceSpan;
use crate::symbols::scope::ScopeTable;
use crate::symbols::tag::TagUidGenerator;
use crate::types::ir_type::IrType;
use std::collections::HashMap;
use std::sync::Arc;

/// `Ok` whenever the pass did not hit a fatal error — the accumulated error
/// list may still be non-empty, meaning the pass completed but found
/// semantic errors. `Err` only for the two fatal cases: an unimplemented
/// construct under the default configuration, or IR-validator rejection.
pub type LoweringOutcome = Result<(IrModule, Vec<CompileError>), CompileError>;

/// The result of lowering one expression: a value (possibly an lvalue
/// holding an address), a deferred pointer indirection awaiting collapse, or
/// `Err` once a diagnostic has already been recorded for this subtree.
/// Every `Err` propagates: callers short-circuit to `Err` on any `Err`
/// operand, matching the "accumulate and continue at the next statement"
/// discipline described in the error-handling design.
#[derive(Debug, Clone)]
pub enum ExprResult {
    Err,
    Value { value: Value, c_type: crate::types::CType, is_lvalue: bool, is_string_literal: bool },
    /// `*inner`: `inner`'s rvalue is the address this dereference designates.
    /// Nesting models `**p` etc. without needing a pointer graph — address
    /// resolution and final-value loading both recurse through `inner`.
    Indirection { inner: Box<ExprResult>, pointee: crate::types::CType },
}

impl ExprResult {
    pub fn value(value: Value, c_type: crate::types::CType) -> Self {
        ExprResult::Value { value, c_type, is_lvalue: false, is_string_literal: false }
    }

    pub fn lvalue(address: Value, c_type: crate::types::CType) -> Self {
        ExprResult::Value { value: address, c_type, is_lvalue: true, is_string_literal: false }
    }

    pub fn is_err(&self) -> bool {
        matches!(self, ExprResult::Err)
    }

    pub fn c_type(&self) -> Option<&crate::types::CType> {
        match self {
            ExprResult::Err => None,
            ExprResult::Value { c_type, .. } => Some(c_type),
            ExprResult::Indirection { pointee, .. } => Some(pointee),
        }
    }
}

/// Per-function mutable state: its own builder, counters (inherited via the
/// builder), label bookkeeping for `goto`, and the (break, continue) label
/// stack for nested loops/switches.
#[derive(Debug, Default)]
pub struct FunctionCtx {
    pub builder: IrBuilder,
    break_continue: Vec<(Arc<str>, Arc<str>)>,
    labels: HashMap<String, Arc<str>>,
    label_defs: HashMap<String, SourceSpan>,
    pending_gotos: Vec<(String, SourceSpan)>,
    alloca_prologue_end: Option<Position>,
}

impl FunctionCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_break_continue(&mut self, brk: Arc<str>, cont: Arc<str>) {
        self.break_continue.push((brk, cont));
    }

    pub fn pop_break_continue(&mut self) {
        self.break_continue.pop();
    }

    pub fn current_break(&self) -> Option<Arc<str>> {
        self.break_continue.last().map(|(b, _)| b.clone())
    }

    pub fn current_continue(&self) -> Option<Arc<str>> {
        self.break_continue.last().map(|(_, c)| c.clone())
    }

    /// Looks up (or lazily allocates) the IR label bound to a source `goto`
    /// target or label definition; the same map serves both sites so either
    /// order of definition-vs-reference resolves to the same IR label.
    pub fn ir_label_for(&mut self, source_label: &str) -> Arc<str> {
        if let Some(existing) = self.labels.get(source_label) {
            return existing.clone();
        }
        let fresh = self.builder.fresh_label();
        self.labels.insert(source_label.to_string(), fresh.clone());
        fresh
    }

    pub fn record_label_def(&mut self, source_label: &str, span: SourceSpan) -> Option<SourceSpan> {
        self.label_defs.insert(source_label.to_string(), span)
    }

    pub fn record_goto(&mut self, source_label: &str, span: SourceSpan) {
        self.pending_gotos.push((source_label.to_string(), span));
    }

    /// Every recorded `goto` must name a label this function actually
    /// defines; undefined ones become `CompileError::UndeclaredLabel`.
    pub fn unresolved_gotos(&self) -> Vec<(String, SourceSpan)> {
        self.pending_gotos.iter().filter(|(name, _)| !self.label_defs.contains_key(name)).cloned().collect()
    }
}

/// Module-wide mutable state shared across every function and global being
/// lowered: the module under construction, the scope/tag tables, the
/// architecture and configuration, and the accumulated diagnostic list.
pub struct TraversalContext {
    pub module: IrModule,
    pub arch: ArchDescriptor,
    pub config: LoweringConfig,
    pub scopes: ScopeTable,
    pub tag_uids: TagUidGenerator,
    pub errors: Vec<CompileError>,
    global_counter: usize,
    function_defined: HashMap<String, bool>,
}

impl TraversalContext {
    pub fn new(name: impl Into<String>, arch: ArchDescriptor, config: LoweringConfig) -> Self {
        Self {
            module: IrModule::new(name, arch.clone()),
            arch,
            config,
            scopes: ScopeTable::new(),
            tag_uids: TagUidGenerator::new(),
            errors: Vec::new(),
            global_counter: 0,
            function_defined: HashMap::new(),
        }
    }

    pub fn fresh_global_name(&mut self) -> Arc<str> {
        let n = self.global_counter;
        self.global_counter += 1;
        Arc::from(format!("@{n}"))
    }

    pub fn is_function_defined(&self, name: &str) -> bool {
        self.function_defined.get(name).copied().unwrap_or(false)
    }

    pub fn mark_function_defined(&mut self, name: &str) {
        self.function_defined.insert(name.to_string(), true);
    }

    /// Resolves a `CType` to its `IrType`, routing struct/union references
    /// through the tag scope table. A by-value reference needs the tag's
    /// completed layout, so it resolves to `None` (and surfaces as
    /// "incomplete or unknown tag") until `complete_tag` has run. A pointer
    /// to a tag only needs its uid, which a declared-but-incomplete tag
    /// already has — this is what makes `struct N { struct N *next; };`
    /// resolvable before `N` itself is complete.
    pub fn c_to_ir(&self, ty: &crate::types::CType) -> Result<IrType, &'static str> {
        crate::types::convert::c_to_ir(
            &self.arch,
            ty,
            &|name| self.scopes.lookup_tag(name).and_then(|tag| tag.ir_type.clone()),
            &|name| self.scopes.lookup_tag(name).map(|tag| tag.uid.clone()),
        )
    }

    /// Like [`Self::c_to_ir`], but turns a resolution failure into a recorded
    /// `CompileError::UnimplementedConstruct` (both failure modes of
    /// `c_to_ir` — a non-constant array length or an unresolved tag — are
    /// open questions the specification names) instead of a bare `&'static str`.
    pub fn resolve_ir_type(&mut self, ty: &crate::types::CType, span: &SourceSpan) -> Option<IrType> {
        match self.c_to_ir(ty) {
            Ok(ir) => Some(ir),
            Err(message) => {
                self.record_error(CompileError::UnimplementedConstruct { what: message.to_string(), span: span.clone() });
                None
            }
        }
    }

    /// Pushes a non-fatal diagnostic onto the accumulated error list and
    /// emits a matching `tracing` event, per the error-handling design's
    /// "emitted alongside accumulation, not instead of it" requirement.
    pub fn record_error(&mut self, err: CompileError) {
        tracing::error!(code = err.code(), "{err}");
        self.errors.push(err);
    }
}

/// Lowers a complete translation unit. Wraps the whole call in an
/// `info_span` naming the declaration count and target architecture, per the
/// driver's observability contract; each function/global lowering opens its
/// own child span carrying the symbol's source identifier.
pub fn lower_translation_unit(
    ast: &TranslationUnit,
    arch: &ArchDescriptor,
    config: &LoweringConfig,
) -> LoweringOutcome {
    let span = tracing::info_span!(
        "lower_translation_unit",
        declarations = ast.decls.len(),
        architecture = arch.name
    );
    let _enter = span.enter();

    let mut ctx = TraversalContext::new("module", arch.clone(), *config);
    for external in &ast.decls {
        match external {
            crate::ast::ExternalDecl::Function(def) => function::lower_function(&mut ctx, def)?,
            crate::ast::ExternalDecl::Global(decl) => decl::lower_global_decl(&mut ctx, decl)?,
        }
    }
    Ok((ctx.module, ctx.errors))
}

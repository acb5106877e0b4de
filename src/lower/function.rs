// src/lower/function.rs
use crate::ast::decl::{CParamDecl, FunctionDef};
use crate::error::CompileError;
use crate::ir::module::IrFunction;
use crate::ir::value::Value;
use crate::lower::stmt::lower_stmt;
use crate::lower::{FunctionCtx, TraversalContext};
use crate::symbols::symbol::{Symbol, SymbolKind};
use crate::types::{CParam, CType};
use std::sync::Arc;

type FunctionOutcome = Result<(), CompileError>;

/// Lowers one function definition: synthesizes its `CType::Function` from
/// the declarator, stages parameters as mutable locals (the non-SSA
/// parameter-as-alloca pattern used throughout this pass), walks the body,
/// and closes out with implicit-return insertion and goto resolution.
pub fn lower_function(ctx: &mut TraversalContext, def: &FunctionDef) -> FunctionOutcome {
    let span = tracing::info_span!("lower_function", name = %def.name);
    let _enter = span.enter();

    if ctx.is_function_defined(&def.name) {
        let previous = ctx.scopes.lookup_symbol(&def.name).map(|s| s.declared_at.clone()).unwrap_or_else(|| def.span.clone());
        ctx.record_error(CompileError::RedefinitionOfSymbol { name: def.name.clone(), span: def.span.clone(), previous });
        return Ok(());
    }

    let fn_c_type = CType::Function {
        ret: Box::new(def.return_type.clone()),
        params: def.params.iter().map(param_to_c_param).collect(),
        variadic: def.variadic,
    };
    let Some(fn_ir_ty) = ctx.resolve_ir_type(&fn_c_type, &def.span) else { return Ok(()) };

    let ir_name: Arc<str> = Arc::from(def.name.as_str());
    let fn_symbol = Symbol {
        kind: SymbolKind::Function,
        source_identifier: ir_name.clone(),
        ir_name: ir_name.clone(),
        c_type: fn_c_type,
        ir_type: fn_ir_ty.clone(),
        ir_ptr: Value::var(ir_name.clone(), crate::types::IrType::Void),
        declared_at: def.span.clone(),
        is_const: true,
    };
    // A matching prototype may already be declared (from a forward
    // declaration processed as a global decl); the definition's own symbol
    // takes priority only when none exists yet.
    if ctx.scopes.lookup_symbol_in_current_scope(&def.name).is_none() {
        let _ = ctx.scopes.declare_symbol(&def.name, fn_symbol);
    }
    ctx.mark_function_defined(&def.name);

    let ret_ir = match &fn_ir_ty {
        crate::types::IrType::Function { ret, .. } => (**ret).clone(),
        other => other.clone(),
    };

    let mut fcx = FunctionCtx::new();
    ctx.scopes.enter_scope();

    let mut param_values = Vec::with_capacity(def.params.len());
    for param in &def.params {
        match lower_param(ctx, &mut fcx, param) {
            Some(value) => param_values.push(value),
            None => {
                ctx.scopes.leave_scope();
                return Ok(());
            }
        }
    }

    lower_stmt(ctx, &mut fcx, &def.body)?;

    let needs_implicit_return = !matches!(fcx.builder.instructions().last(), Some(inst) if inst.is_terminator());
    if needs_implicit_return {
        let value = if matches!(ret_ir, crate::types::IrType::Void) { None } else { Some(Value::zero(ret_ir.clone())) };
        fcx.builder.build_ret(value, def.span.clone());
    }

    for (name, span) in fcx.unresolved_gotos() {
        ctx.record_error(CompileError::UndeclaredLabel { name, span });
    }

    ctx.scopes.leave_scope();

    ctx.module.functions.push(IrFunction {
        name: ir_name,
        ty: fn_ir_ty,
        params: param_values,
        is_variadic: def.variadic,
        body: fcx.builder.finalize(),
    });
    Ok(())
}

/// Stages one parameter as a mutable local: the incoming value arrives as a
/// fresh temporary (its IR-level calling-convention name), then is stored
/// into a dedicated alloca so the body can reassign it like any other local,
/// matching how every other binding in this pass is represented.
fn lower_param(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, param: &CParamDecl) -> Option<Value> {
    let decayed = param.ty.decayed();
    let ir_ty = ctx.resolve_ir_type(&decayed, &param.span)?;
    let incoming_name = fcx.builder.fresh_temp();
    let incoming = Value::var(incoming_name, ir_ty.clone());

    let addr = fcx.builder.insert_alloca(ir_ty.clone(), param.span.clone());
    fcx.builder.build_store(addr.clone(), incoming.clone(), param.span.clone());

    let symbol = Symbol {
        kind: SymbolKind::LocalVar,
        source_identifier: param.name.as_str().into(),
        ir_name: match &addr {
            Value::Var { name, .. } => name.clone(),
            _ => unreachable!("insert_alloca always returns a Var"),
        },
        c_type: decayed,
        ir_type: ir_ty,
        ir_ptr: addr,
        declared_at: param.span.clone(),
        is_const: false,
    };
    let _ = ctx.scopes.declare_symbol(&param.name, symbol);
    Some(incoming)
}

fn param_to_c_param(param: &CParamDecl) -> CParam {
    CParam { ty: param.ty.clone(), name: Some(Arc::from(param.name.as_str())) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::lp64;
    use crate::ast::stmt::Stmt;
    use crate::config::LoweringConfig;
    use crate::location::source_span::SourceSpan;

    fn fresh_ctx() -> TraversalContext {
        TraversalContext::new("t", lp64(), LoweringConfig::default())
    }

    #[test]
    fn empty_void_function_gets_an_implicit_return() {
        let mut ctx = fresh_ctx();
        let span = SourceSpan::default();
        let def = FunctionDef {
            name: "f".into(),
            return_type: CType::Void,
            params: vec![],
            variadic: false,
            body: Stmt::Compound { items: vec![], span: span.clone() },
            span,
        };
        lower_function(&mut ctx, &def).unwrap();
        let f = ctx.module.function("f").unwrap();
        assert!(f.body.last().unwrap().is_terminator());
    }

    #[test]
    fn redefining_a_function_twice_is_an_error() {
        let mut ctx = fresh_ctx();
        let span = SourceSpan::default();
        let def = FunctionDef {
            name: "f".into(),
            return_type: CType::Void,
            params: vec![],
            variadic: false,
            body: Stmt::Compound { items: vec![], span: span.clone() },
            span,
        };
        lower_function(&mut ctx, &def).unwrap();
        lower_function(&mut ctx, &def).unwrap();
        assert_eq!(ctx.errors.len(), 1);
    }

    #[test]
    fn parameters_are_staged_as_stores_into_fresh_allocas() {
        let mut ctx = fresh_ctx();
        let span = SourceSpan::default();
        let def = FunctionDef {
            name: "g".into(),
            return_type: CType::SINT,
            params: vec![CParamDecl { name: "a".into(), ty: CType::SINT, span: span.clone() }],
            variadic: false,
            body: Stmt::Return { value: Some(crate::ast::expr::Expr::Ident { name: "a".into(), span: span.clone() }), span: span.clone() },
            span,
        };
        lower_function(&mut ctx, &def).unwrap();
        let f = ctx.module.function("g").unwrap();
        assert_eq!(f.params.len(), 1);
        assert!(f.body.iter().any(|i| i.is_alloca()));
    }
}

// src/lower/stmt.rs
use crate::ast::stmt::{BlockItem, ForInit, Stmt};
use crate::error::CompileError;
use crate::ir::value::Value;
use crate::location::source_span::{HasSpan, SourceSpan};
use crate::lower::expr::{lower_expr, rvalue_of};
use crate::lower::{decl, ExprResult, FunctionCtx, TraversalContext};

type StmtOutcome = Result<(), CompileError>;

pub fn lower_stmt(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, stmt: &Stmt) -> StmtOutcome {
    match stmt {
        Stmt::Expr { expr, .. } => {
            lower_expr(ctx, fcx, expr)?;
            Ok(())
        }
        Stmt::Compound { items, .. } => lower_compound(ctx, fcx, items),
        Stmt::If { cond, then_branch, else_branch, span } => lower_if(ctx, fcx, cond, then_branch, else_branch.as_deref(), span),
        Stmt::While { cond, body, span } => lower_while(ctx, fcx, cond, body, span),
        Stmt::DoWhile { body, cond, span } => lower_do_while(ctx, fcx, body, cond, span),
        Stmt::For { init, cond, post, body, span } => lower_for(ctx, fcx, init.as_ref(), cond.as_ref(), post.as_ref(), body, span),
        Stmt::Return { value, span } => lower_return(ctx, fcx, value.as_ref(), span),
        Stmt::Break { span } => lower_break(ctx, fcx, span),
        Stmt::Continue { span } => lower_continue(ctx, fcx, span),
        Stmt::Label { name, inner, span } => lower_label(ctx, fcx, name, inner, span),
        Stmt::Goto { label, span } => {
            let ir_label = fcx.ir_label_for(label);
            fcx.record_goto(label, span.clone());
            fcx.builder.build_br(ir_label, span.clone());
            Ok(())
        }
        Stmt::Empty { .. } => Ok(()),
    }
}

fn lower_compound(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, items: &[BlockItem]) -> StmtOutcome {
    ctx.scopes.enter_scope();
    for item in items {
        match item {
            BlockItem::Decl(local) => decl::lower_local_decl(ctx, fcx, local)?,
            BlockItem::Stmt(s) => lower_stmt(ctx, fcx, s)?,
        }
    }
    ctx.scopes.leave_scope();
    Ok(())
}

/// Lowers a condition expression to its boolean (`i1`) rvalue, recording
/// `InvalidIfConditionType`/`InvalidLoopConditionType` as directed by
/// `err_kind` when the condition isn't scalar.
fn lower_condition(
    ctx: &mut TraversalContext,
    fcx: &mut FunctionCtx,
    cond: &crate::ast::expr::Expr,
    span: &SourceSpan,
    make_error: impl FnOnce(String, SourceSpan) -> CompileError,
) -> Result<Option<Value>, CompileError> {
    let result = lower_expr(ctx, fcx, cond)?;
    if result.is_err() {
        return Ok(None);
    }
    let (value, c_type) = match rvalue_of(ctx, fcx, &result, span) {
        Some(pair) => pair,
        None => return Ok(None),
    };
    if !c_type.is_scalar() {
        ctx.record_error(make_error(c_type.to_string(), span.clone()));
        return Ok(None);
    }
    if let Some(i) = value.as_const_int() {
        return Ok(Some(Value::const_int((i != 0) as i64, crate::types::IrType::Bool)));
    }
    if let Some(f) = value.as_const_float() {
        return Ok(Some(Value::const_int((f != 0.0) as i64, crate::types::IrType::Bool)));
    }
    let zero = Value::zero(value.ty().clone());
    let as_bool = fcx.builder.build_compare(crate::ir::instruction::CompareOp::Ne, value, zero, crate::types::IrType::Bool, span.clone());
    Ok(Some(as_bool))
}

fn lower_if(
    ctx: &mut TraversalContext,
    fcx: &mut FunctionCtx,
    cond: &crate::ast::expr::Expr,
    then_branch: &Stmt,
    else_branch: Option<&Stmt>,
    span: &SourceSpan,
) -> StmtOutcome {
    let cond_val = lower_condition(ctx, fcx, cond, span, |found, span| CompileError::InvalidIfConditionType { found, span })?;
    let Some(cond_val) = cond_val else { return Ok(()) };

    if let Some(i) = cond_val.as_const_int() {
        if i != 0 {
            return lower_stmt(ctx, fcx, then_branch);
        }
        return match else_branch {
            Some(e) => lower_stmt(ctx, fcx, e),
            None => Ok(()),
        };
    }

    let else_label = fcx.builder.fresh_label();
    let merge_label = fcx.builder.fresh_label();
    let zero = Value::zero(crate::types::IrType::Bool);
    let test = fcx.builder.build_compare(crate::ir::instruction::CompareOp::Eq, cond_val, zero, crate::types::IrType::Bool, span.clone());
    fcx.builder.build_br_cond(test, else_label.clone(), span.clone());
    lower_stmt(ctx, fcx, then_branch)?;
    fcx.builder.build_br(merge_label.clone(), span.clone());
    fcx.builder.build_nop(Some(else_label), span.clone());
    if let Some(e) = else_branch {
        lower_stmt(ctx, fcx, e)?;
    }
    fcx.builder.build_nop(Some(merge_label), span.clone());
    Ok(())
}

fn lower_while(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, cond: &crate::ast::expr::Expr, body: &Stmt, span: &SourceSpan) -> StmtOutcome {
    let head_label = fcx.builder.fresh_label();
    let body_label = fcx.builder.fresh_label();
    let exit_label = fcx.builder.fresh_label();

    fcx.builder.build_br(head_label.clone(), span.clone());
    fcx.builder.build_nop(Some(head_label.clone()), span.clone());
    let cond_val = lower_condition(ctx, fcx, cond, span, |found, span| CompileError::InvalidLoopConditionType { found, span })?;
    let Some(cond_val) = cond_val else { return Ok(()) };
    let zero = Value::zero(crate::types::IrType::Bool);
    let test = fcx.builder.build_compare(crate::ir::instruction::CompareOp::Eq, cond_val, zero, crate::types::IrType::Bool, span.clone());
    fcx.builder.build_br_cond(test, exit_label.clone(), span.clone());
    fcx.builder.build_nop(Some(body_label), span.clone());

    fcx.push_break_continue(exit_label.clone(), head_label.clone());
    lower_stmt(ctx, fcx, body)?;
    fcx.pop_break_continue();

    fcx.builder.build_br(head_label, span.clone());
    fcx.builder.build_nop(Some(exit_label), span.clone());
    Ok(())
}

fn lower_do_while(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, body: &Stmt, cond: &crate::ast::expr::Expr, span: &SourceSpan) -> StmtOutcome {
    let body_label = fcx.builder.fresh_label();
    let cond_label = fcx.builder.fresh_label();
    let exit_label = fcx.builder.fresh_label();

    fcx.builder.build_nop(Some(body_label.clone()), span.clone());
    fcx.push_break_continue(exit_label.clone(), cond_label.clone());
    lower_stmt(ctx, fcx, body)?;
    fcx.pop_break_continue();

    fcx.builder.build_nop(Some(cond_label), span.clone());
    let cond_val = lower_condition(ctx, fcx, cond, span, |found, span| CompileError::InvalidLoopConditionType { found, span })?;
    if let Some(cond_val) = cond_val {
        fcx.builder.build_br_cond(cond_val, body_label, span.clone());
    }
    fcx.builder.build_nop(Some(exit_label), span.clone());
    Ok(())
}

fn lower_for(
    ctx: &mut TraversalContext,
    fcx: &mut FunctionCtx,
    init: Option<&ForInit>,
    cond: Option<&crate::ast::expr::Expr>,
    step: Option<&crate::ast::expr::Expr>,
    body: &Stmt,
    span: &SourceSpan,
) -> StmtOutcome {
    ctx.scopes.enter_scope();
    match init {
        Some(ForInit::Decl(local)) => decl::lower_local_decl(ctx, fcx, local)?,
        Some(ForInit::Expr(e)) => {
            lower_expr(ctx, fcx, e)?;
        }
        None => {}
    }

    let head_label = fcx.builder.fresh_label();
    let step_label = fcx.builder.fresh_label();
    let body_label = fcx.builder.fresh_label();
    let exit_label = fcx.builder.fresh_label();

    fcx.builder.build_br(head_label.clone(), span.clone());
    fcx.builder.build_nop(Some(head_label.clone()), span.clone());
    if let Some(cond_expr) = cond {
        let cond_val = lower_condition(ctx, fcx, cond_expr, span, |found, span| CompileError::InvalidLoopConditionType { found, span })?;
        if let Some(cond_val) = cond_val {
            let zero = Value::zero(crate::types::IrType::Bool);
            let test = fcx.builder.build_compare(crate::ir::instruction::CompareOp::Eq, cond_val, zero, crate::types::IrType::Bool, span.clone());
            fcx.builder.build_br_cond(test, exit_label.clone(), span.clone());
        }
    }
    fcx.builder.build_nop(Some(body_label), span.clone());

    fcx.push_break_continue(exit_label.clone(), step_label.clone());
    lower_stmt(ctx, fcx, body)?;
    fcx.pop_break_continue();

    fcx.builder.build_nop(Some(step_label), span.clone());
    if let Some(step_expr) = step {
        lower_expr(ctx, fcx, step_expr)?;
    }
    fcx.builder.build_br(head_label, span.clone());
    fcx.builder.build_nop(Some(exit_label), span.clone());
    ctx.scopes.leave_scope();
    Ok(())
}

fn lower_return(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, value: Option<&crate::ast::expr::Expr>, span: &SourceSpan) -> StmtOutcome {
    match value {
        None => {
            fcx.builder.build_ret(None, span.clone());
            Ok(())
        }
        Some(expr) => {
            let result = lower_expr(ctx, fcx, expr)?;
            if result.is_err() {
                fcx.builder.build_ret(None, span.clone());
                return Ok(());
            }
            let (value, _) = match rvalue_of(ctx, fcx, &result, expr.span()) {
                Some(pair) => pair,
                None => {
                    fcx.builder.build_ret(None, span.clone());
                    return Ok(());
                }
            };
            fcx.builder.build_ret(Some(value), span.clone());
            Ok(())
        }
    }
}

fn lower_break(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, span: &SourceSpan) -> StmtOutcome {
    match fcx.current_break() {
        Some(label) => {
            fcx.builder.build_br(label, span.clone());
            Ok(())
        }
        None => {
            ctx.record_error(CompileError::BreakOutsideOfLoopOrSwitchCase { span: span.clone() });
            Ok(())
        }
    }
}

fn lower_continue(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, span: &SourceSpan) -> StmtOutcome {
    match fcx.current_continue() {
        Some(label) => {
            fcx.builder.build_br(label, span.clone());
            Ok(())
        }
        None => {
            ctx.record_error(CompileError::ContinueOutsideOfLoop { span: span.clone() });
            Ok(())
        }
    }
}

fn lower_label(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, name: &str, inner: &Stmt, span: &SourceSpan) -> StmtOutcome {
    if let Some(previous) = fcx.record_label_def(name, span.clone()) {
        ctx.record_error(CompileError::RedefinitionOfLabel { name: name.to_string(), span: span.clone(), previous });
        return lower_stmt(ctx, fcx, inner);
    }
    let label = fcx.ir_label_for(name);
    fcx.builder.build_nop(Some(label), span.clone());
    lower_stmt(ctx, fcx, inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::lp64;
    use crate::config::LoweringConfig;
    use crate::lower::TraversalContext;

    fn fresh() -> (TraversalContext, FunctionCtx) {
        (TraversalContext::new("t", lp64(), LoweringConfig::default()), FunctionCtx::new())
    }

    #[test]
    fn break_outside_loop_is_reported() {
        let (mut ctx, mut fcx) = fresh();
        let span = SourceSpan::default();
        lower_break(&mut ctx, &mut fcx, &span).unwrap();
        assert_eq!(ctx.errors.len(), 1);
    }

    #[test]
    fn constant_true_if_lowers_only_the_then_branch() {
        let (mut ctx, mut fcx) = fresh();
        let span = SourceSpan::default();
        let cond = crate::ast::expr::Expr::IntLiteral { value: 1, span: span.clone() };
        let then_branch = Stmt::Return { value: None, span: span.clone() };
        let else_branch = Stmt::Return { value: Some(crate::ast::expr::Expr::IntLiteral { value: 2, span: span.clone() }), span: span.clone() };
        lower_if(&mut ctx, &mut fcx, &cond, &then_branch, Some(&else_branch), &span).unwrap();
        assert_eq!(fcx.builder.instructions().len(), 1);
    }
}

// src/lower/expr.rs
use crate::ast::expr::{BinaryOp, Expr, IncDecOp, LogicalOp, SizeofTarget, UnaryOp};
use crate::error::CompileError;
use crate::ir::instruction::{ArithOp, CastOp, CompareOp};
use crate::ir::value::Value;
use crate::location::source_span::{HasSpan, SourceSpan};
use crate::lower::constfold;
use crate::lower::{ExprResult, FunctionCtx, TraversalContext};
use crate::types::CType;

type ExprOutcome = Result<ExprResult, CompileError>;

/// Loads through an lvalue's address, or collapses an `Indirection` chain
/// down to its final value. Arrays never load: their "value" decays to a
/// pointer to their first element instead, matching C's array-to-pointer
/// conversion rule.
pub fn rvalue_of(
    ctx: &mut TraversalContext,
    fcx: &mut FunctionCtx,
    result: &ExprResult,
    span: &SourceSpan,
) -> Option<(Value, CType)> {
    match result {
        ExprResult::Err => None,
        ExprResult::Value { value, c_type, is_lvalue, .. } => {
            if c_type.is_array() {
                return decay_array(ctx, value, c_type, span);
            }
            if *is_lvalue {
                let ir_ty = ctx.resolve_ir_type(c_type, span)?;
                Some((fcx.builder.build_load(ir_ty, value.clone(), span.clone()), c_type.clone()))
            } else {
                Some((value.clone(), c_type.clone()))
            }
        }
        ExprResult::Indirection { pointee, .. } => {
            let addr = address_of(ctx, fcx, result, span)?;
            if pointee.is_array() {
                return decay_array(ctx, &addr, pointee, span);
            }
            let ir_ty = ctx.resolve_ir_type(pointee, span)?;
            Some((fcx.builder.build_load(ir_ty, addr, span.clone()), pointee.clone()))
        }
    }
}

fn decay_array(ctx: &mut TraversalContext, address: &Value, array_ty: &CType, span: &SourceSpan) -> Option<(Value, CType)> {
    let decayed = array_ty.decayed();
    let elem_ir = ctx.resolve_ir_type(&decayed, span)?;
    let reinterpreted = match address {
        Value::Var { name, .. } => Value::var(name.clone(), elem_ir),
        other => other.clone(),
    };
    Some((reinterpreted, decayed))
}

/// The address an lvalue or indirection result designates; `None` for a
/// non-addressable (plain rvalue) result.
fn address_of(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, result: &ExprResult, span: &SourceSpan) -> Option<Value> {
    match result {
        ExprResult::Value { value, is_lvalue: true, .. } => Some(value.clone()),
        ExprResult::Indirection { inner, .. } => rvalue_of(ctx, fcx, inner, span).map(|(v, _)| v),
        _ => None,
    }
}

/// Emits whatever cast opcode bridges `value`'s IR type to `to_ir`. A no-op
/// when the types already match — the algebraic law that `(T)(x)` for
/// `T = typeof(x)` produces no conversion instruction falls out of this
/// early return rather than needing special-case handling at call sites.
pub(crate) fn implicit_convert(ctx: &TraversalContext, fcx: &mut FunctionCtx, value: Value, to_ir: crate::types::IrType, span: &SourceSpan) -> Value {
    let from_ir = value.ty().clone();
    if from_ir == to_ir {
        return value;
    }
    let op = if from_ir.is_pointer() && to_ir.is_pointer() {
        CastOp::Bitcast
    } else if from_ir.is_pointer() && to_ir.is_integer() {
        CastOp::PtrToInt
    } else if from_ir.is_integer() && to_ir.is_pointer() {
        CastOp::IntToPtr
    } else if from_ir.is_float() && to_ir.is_integer() {
        CastOp::FloatToInt
    } else if from_ir.is_integer() && to_ir.is_float() {
        CastOp::IntToFloat
    } else if from_ir.is_integer() && to_ir.is_integer() {
        let (from_bits, to_bits) = (ctx.arch.size_in_bits(&from_ir), ctx.arch.size_in_bits(&to_ir));
        if to_bits < from_bits {
            CastOp::Trunc
        } else if to_bits == from_bits {
            // same-width signed/unsigned conversion (e.g. i32 -> u32): no bits move.
            CastOp::Bitcast
        } else {
            CastOp::Ext
        }
    } else if from_ir.is_float() && to_ir.is_float() {
        if ctx.arch.size_in_bits(&to_ir) < ctx.arch.size_in_bits(&from_ir) { CastOp::Trunc } else { CastOp::Ext }
    } else {
        CastOp::Bitcast
    };
    fcx.builder.build_cast(op, to_ir, value, span.clone())
}

/// Converts a scalar rvalue to a boolean (`i1`) comparison against zero,
/// used everywhere a condition is required (`if`, loops, `&&`/`||`, ternary).
fn to_bool(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, value: Value, c_type: &CType, span: &SourceSpan) -> ExprOutcome {
    if !c_type.is_scalar() {
        ctx.record_error(CompileError::InvalidConversionToBoolean { found: c_type.to_string(), span: span.clone() });
        return Ok(ExprResult::Err);
    }
    if let Some(i) = value.as_const_int() {
        return Ok(ExprResult::value(Value::const_int((i != 0) as i64, crate::types::IrType::Bool), CType::Bool));
    }
    if let Some(fl) = value.as_const_float() {
        return Ok(ExprResult::value(Value::const_int((fl != 0.0) as i64, crate::types::IrType::Bool), CType::Bool));
    }
    let zero = Value::zero(value.ty().clone());
    let result = fcx.builder.build_compare(CompareOp::Ne, value, zero, crate::types::IrType::Bool, span.clone());
    Ok(ExprResult::value(result, CType::Bool))
}

pub fn lower_expr(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, expr: &Expr) -> ExprOutcome {
    match expr {
        Expr::Ident { name, span } => lower_ident(ctx, name, span),
        Expr::IntLiteral { value, .. } => Ok(ExprResult::value(Value::const_int(*value, ctx.arch.sint()), CType::SINT)),
        Expr::FloatLiteral { value, .. } => Ok(ExprResult::value(Value::const_float(*value, ctx.arch.double()), CType::Floating(crate::types::c_type::FloatSize::Double))),
        Expr::CharLiteral { value, .. } => Ok(ExprResult::value(Value::const_int(*value, ctx.arch.sint()), CType::SINT)),
        Expr::StringLiteral { value, span } => lower_string_literal(ctx, fcx, value, span),
        Expr::Paren { inner, .. } => lower_expr(ctx, fcx, inner),
        Expr::Unary { op, operand, span } => lower_unary(ctx, fcx, *op, operand, span),
        Expr::PrefixIncDec { op, operand, span } => lower_inc_dec(ctx, fcx, *op, operand, span, true),
        Expr::PostfixIncDec { op, operand, span } => lower_inc_dec(ctx, fcx, *op, operand, span, false),
        Expr::Sizeof { target, span } => lower_sizeof(ctx, fcx, target, span),
        Expr::Binary { op, left, right, span } => lower_binary(ctx, fcx, *op, left, right, span),
        Expr::Logical { op, left, right, span } => lower_logical(ctx, fcx, *op, left, right, span),
        Expr::Assign { target, value, span } => lower_assign(ctx, fcx, target, value, span),
        Expr::CompoundAssign { span, .. } => {
            ctx.record_error(CompileError::UnimplementedConstruct { what: "compound assignment".into(), span: span.clone() });
            unimplemented_outcome(ctx, span)
        }
        Expr::Ternary { cond, then_expr, else_expr, span } => lower_ternary(ctx, fcx, cond, then_expr, else_expr, span),
        Expr::Call { callee, args, span } => lower_call(ctx, fcx, callee, args, span),
        Expr::Subscript { base, index, span } => lower_subscript(ctx, fcx, base, index, span),
        Expr::Member { base, field, arrow, span } => lower_member(ctx, fcx, base, field, *arrow, span),
    }
}

fn unimplemented_outcome(ctx: &TraversalContext, span: &SourceSpan) -> ExprOutcome {
    if ctx.config.unimplemented_is_fatal {
        Err(CompileError::UnimplementedConstruct { what: "unimplemented construct".into(), span: span.clone() })
    } else {
        Ok(ExprResult::Err)
    }
}

fn lower_ident(ctx: &mut TraversalContext, name: &str, span: &SourceSpan) -> ExprOutcome {
    match ctx.scopes.lookup_symbol(name) {
        Some(sym) => Ok(ExprResult::lvalue(sym.ir_ptr.clone(), sym.c_type.clone())),
        None => {
            ctx.record_error(CompileError::UndeclaredIdentifier { name: name.to_string(), span: span.clone() });
            Ok(ExprResult::Err)
        }
    }
}

/// Decodes C99 escape sequences (`\n`, `\t`, `\\`, `\"`, octal `\NNN`, hex
/// `\xHH`, ...) into their byte values. An unrecognized escape passes the
/// character through unescaped rather than erroring — the lexer that
/// produced `text` is assumed to have already rejected malformed escapes.
fn decode_escapes(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('r') => bytes.push(b'\r'),
            Some('a') => bytes.push(0x07),
            Some('b') => bytes.push(0x08),
            Some('f') => bytes.push(0x0c),
            Some('v') => bytes.push(0x0b),
            Some('0') => bytes.push(0),
            Some('\\') => bytes.push(b'\\'),
            Some('\'') => bytes.push(b'\''),
            Some('"') => bytes.push(b'"'),
            Some('?') => bytes.push(b'?'),
            Some('x') => {
                let mut value: u32 = 0;
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(16)) {
                    value = value * 16 + d;
                    chars.next();
                }
                bytes.push(value as u8);
            }
            Some(other) if other.is_digit(8) => {
                let mut value = other.to_digit(8).unwrap();
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => {}
        }
    }
    bytes
}

fn lower_string_literal(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, text: &str, _span: &SourceSpan) -> ExprOutcome {
    let name = ctx.fresh_global_name();
    let mut bytes = decode_escapes(text);
    bytes.push(0);
    let array_ty = crate::types::IrType::array(crate::types::IrType::I8, bytes.len());
    let global = crate::ir::module::IrGlobal {
        name: name.clone(),
        ir_type: crate::types::IrType::ptr(array_ty.clone()),
        initialized: true,
        value: Value::ConstBytes { bytes: std::sync::Arc::from(bytes), ty: array_ty },
    };
    ctx.module.globals.push(global);
    let decayed = Value::ConstStringRef { global_name: name, ty: crate::types::IrType::ptr(crate::types::IrType::I8) };
    let _ = fcx; // string literals never touch the current function's builder
    Ok(ExprResult::Value {
        value: decayed,
        c_type: CType::SCHAR.pointer_to(),
        is_lvalue: false,
        is_string_literal: true,
    })
}

fn lower_unary(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, op: UnaryOp, operand: &Expr, span: &SourceSpan) -> ExprOutcome {
    match op {
        UnaryOp::Plus => lower_expr(ctx, fcx, operand),
        UnaryOp::Neg => {
            let inner = lower_expr(ctx, fcx, operand)?;
            if inner.is_err() {
                return Ok(ExprResult::Err);
            }
            let (value, c_type) = match rvalue_of(ctx, fcx, &inner, span) {
                Some(pair) => pair,
                None => return Ok(ExprResult::Err),
            };
            if !c_type.is_arithmetic() {
                ctx.record_error(CompileError::InvalidUnaryNotOperandType { found: c_type.to_string(), span: span.clone() });
                return Ok(ExprResult::Err);
            }
            if let Some(i) = value.as_const_int() {
                return Ok(ExprResult::value(Value::const_int(i.wrapping_neg(), value.ty().clone()), c_type));
            }
            if let Some(fl) = value.as_const_float() {
                return Ok(ExprResult::value(Value::const_float(-fl, value.ty().clone()), c_type));
            }
            let zero = Value::zero(value.ty().clone());
            let ty = value.ty().clone();
            let result = fcx.builder.build_arith(ArithOp::Sub, ty, zero, value, span.clone());
            Ok(ExprResult::value(result, c_type))
        }
        UnaryOp::BitwiseNot => {
            let inner = lower_expr(ctx, fcx, operand)?;
            if inner.is_err() {
                return Ok(ExprResult::Err);
            }
            let (value, c_type) = match rvalue_of(ctx, fcx, &inner, span) {
                Some(pair) => pair,
                None => return Ok(ExprResult::Err),
            };
            if !c_type.is_integer() {
                ctx.record_error(CompileError::InvalidUnaryNotOperandType { found: c_type.to_string(), span: span.clone() });
                return Ok(ExprResult::Err);
            }
            if let Some(i) = value.as_const_int() {
                return Ok(ExprResult::value(Value::const_int(!i, value.ty().clone()), c_type));
            }
            let ty = value.ty().clone();
            let result = fcx.builder.build_not(ty, value, span.clone());
            Ok(ExprResult::value(result, c_type))
        }
        UnaryOp::LogicalNot => {
            let inner = lower_expr(ctx, fcx, operand)?;
            if inner.is_err() {
                return Ok(ExprResult::Err);
            }
            let (value, c_type) = match rvalue_of(ctx, fcx, &inner, span) {
                Some(pair) => pair,
                None => return Ok(ExprResult::Err),
            };
            let as_bool = to_bool(ctx, fcx, value, &c_type, span)?;
            if as_bool.is_err() {
                return Ok(ExprResult::Err);
            }
            let (bool_val, _) = rvalue_of(ctx, fcx, &as_bool, span).expect("to_bool always yields a value result");
            if let Some(i) = bool_val.as_const_int() {
                return Ok(ExprResult::value(Value::const_int((i == 0) as i64, crate::types::IrType::Bool), CType::Bool));
            }
            let zero = Value::zero(crate::types::IrType::Bool);
            let result = fcx.builder.build_compare(CompareOp::Eq, bool_val, zero, crate::types::IrType::Bool, span.clone());
            Ok(ExprResult::value(result, CType::Bool))
        }
        UnaryOp::AddressOf => {
            let inner = lower_expr(ctx, fcx, operand)?;
            if inner.is_err() {
                return Ok(ExprResult::Err);
            }
            match &inner {
                ExprResult::Indirection { .. } => match address_of(ctx, fcx, &inner, span) {
                    Some(addr) => {
                        let pointee = inner.c_type().expect("non-err result has a type").clone();
                        Ok(ExprResult::value(addr, pointee.pointer_to()))
                    }
                    None => Ok(ExprResult::Err),
                },
                ExprResult::Value { is_lvalue: true, value, c_type, .. } => {
                    Ok(ExprResult::value(value.clone(), c_type.clone().pointer_to()))
                }
                _ => {
                    ctx.record_error(CompileError::InvalidAssignmentTarget { span: span.clone() });
                    Ok(ExprResult::Err)
                }
            }
        }
        UnaryOp::Deref => {
            let inner = lower_expr(ctx, fcx, operand)?;
            if inner.is_err() {
                return Ok(ExprResult::Err);
            }
            let (ptr_val, ptr_c_type) = match rvalue_of(ctx, fcx, &inner, span) {
                Some(pair) => pair,
                None => return Ok(ExprResult::Err),
            };
            let pointee = match ptr_c_type.pointee() {
                Some(p) => p.clone(),
                None => {
                    ctx.record_error(CompileError::UnaryIndirectionOperandNotPtrType { found: ptr_c_type.to_string(), span: span.clone() });
                    return Ok(ExprResult::Err);
                }
            };
            if pointee.is_function() {
                ctx.record_error(CompileError::UnimplementedConstruct { what: "function-pointer dereference".into(), span: span.clone() });
                return unimplemented_outcome(ctx, span);
            }
            Ok(ExprResult::Indirection { inner: Box::new(ExprResult::value(ptr_val, ptr_c_type)), pointee })
        }
    }
}

fn lower_inc_dec(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, op: IncDecOp, operand: &Expr, span: &SourceSpan, prefix: bool) -> ExprOutcome {
    let target = lower_expr(ctx, fcx, operand)?;
    if target.is_err() {
        return Ok(ExprResult::Err);
    }
    let addr = match address_of(ctx, fcx, &target, span) {
        Some(a) => a,
        None => {
            ctx.record_error(CompileError::InvalidAssignmentTarget { span: span.clone() });
            return Ok(ExprResult::Err);
        }
    };
    let (current, c_type) = match rvalue_of(ctx, fcx, &target, span) {
        Some(pair) => pair,
        None => return Ok(ExprResult::Err),
    };
    if !c_type.is_scalar() {
        ctx.record_error(CompileError::CannotIncrementDecrementType { found: c_type.to_string(), span: span.clone() });
        return Ok(ExprResult::Err);
    }
    let sign = if matches!(op, IncDecOp::Inc) { 1i64 } else { -1i64 };
    let updated = if c_type.is_pointer() {
        let elem_ty = c_type.pointee().expect("pointer has a pointee").clone();
        let elem_ir = match ctx.resolve_ir_type(&elem_ty, span) {
            Some(t) => t,
            None => return Ok(ExprResult::Err),
        };
        let index = Value::const_int(sign, ctx.arch.ptr_int_type());
        fcx.builder.build_get_array_element_ptr(elem_ir, current.clone(), index, span.clone())
    } else if c_type.is_floating() {
        let one = Value::const_float(sign as f64, current.ty().clone());
        let ty = current.ty().clone();
        fcx.builder.build_arith(ArithOp::Add, ty, current.clone(), one, span.clone())
    } else {
        let one = Value::const_int(sign, current.ty().clone());
        let ty = current.ty().clone();
        fcx.builder.build_arith(ArithOp::Add, ty, current.clone(), one, span.clone())
    };
    fcx.builder.build_store(addr, updated.clone(), span.clone());
    let result_value = if prefix { updated } else { current };
    Ok(ExprResult::value(result_value, c_type))
}

fn lower_sizeof(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, target: &SizeofTarget, span: &SourceSpan) -> ExprOutcome {
    let c_type = match target {
        SizeofTarget::Type(ty) => ty.clone(),
        SizeofTarget::Expr(inner) => {
            let result = lower_expr(ctx, fcx, inner)?;
            match result.c_type() {
                Some(t) => t.clone(),
                None => return Ok(ExprResult::Err),
            }
        }
    };
    if c_type.is_struct_or_union() {
        if let crate::types::CType::StructOrUnion { has_body: false, .. } = &c_type {
            ctx.record_error(CompileError::UnimplementedConstruct { what: "sizeof on incomplete type".into(), span: span.clone() });
            return unimplemented_outcome(ctx, span);
        }
    }
    let ir_ty = match ctx.resolve_ir_type(&c_type, span) {
        Some(t) => t,
        None => return Ok(ExprResult::Err),
    };
    let bytes = ctx.arch.size_in_bytes(&ir_ty);
    let ptr_uint = ctx.arch.ptr_int_type();
    Ok(ExprResult::value(Value::const_int(bytes as i64, ptr_uint), CType::Integer { signed: false, size: crate::types::c_type::IntSize::Long }))
}

fn lower_binary(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, op: BinaryOp, left: &Expr, right: &Expr, span: &SourceSpan) -> ExprOutcome {
    let lhs_result = lower_expr(ctx, fcx, left)?;
    let rhs_result = lower_expr(ctx, fcx, right)?;
    if lhs_result.is_err() || rhs_result.is_err() {
        return Ok(ExprResult::Err);
    }
    let (lhs_val, lhs_ty) = match rvalue_of(ctx, fcx, &lhs_result, span) {
        Some(p) => p,
        None => return Ok(ExprResult::Err),
    };
    let (rhs_val, rhs_ty) = match rvalue_of(ctx, fcx, &rhs_result, span) {
        Some(p) => p,
        None => return Ok(ExprResult::Err),
    };

    match op {
        BinaryOp::Add | BinaryOp::Sub => lower_additive(ctx, fcx, op, lhs_val, lhs_ty, rhs_val, rhs_ty, span),
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => lower_muldiv(ctx, fcx, op, lhs_val, lhs_ty, rhs_val, rhs_ty, span),
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
            lower_bitwise(ctx, fcx, op, lhs_val, lhs_ty, rhs_val, rhs_ty, span)
        }
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            lower_compare(ctx, fcx, op, lhs_val, lhs_ty, rhs_val, rhs_ty, span)
        }
    }
}

fn arith_op_of(op: BinaryOp) -> ArithOp {
    match op {
        BinaryOp::Add => ArithOp::Add,
        BinaryOp::Sub => ArithOp::Sub,
        BinaryOp::Mul => ArithOp::Mul,
        BinaryOp::Div => ArithOp::Div,
        BinaryOp::Mod => ArithOp::Mod,
        BinaryOp::BitAnd => ArithOp::And,
        BinaryOp::BitOr => ArithOp::Or,
        BinaryOp::BitXor => ArithOp::Xor,
        BinaryOp::Shl => ArithOp::Shl,
        BinaryOp::Shr => ArithOp::Shr,
        _ => unreachable!("not an arithmetic/bitwise operator"),
    }
}

fn compare_op_of(op: BinaryOp) -> CompareOp {
    match op {
        BinaryOp::Eq => CompareOp::Eq,
        BinaryOp::Ne => CompareOp::Ne,
        BinaryOp::Lt => CompareOp::Lt,
        BinaryOp::Le => CompareOp::Le,
        BinaryOp::Gt => CompareOp::Gt,
        BinaryOp::Ge => CompareOp::Ge,
        _ => unreachable!("not a comparison operator"),
    }
}

#[allow(clippy::too_many_arguments)]
fn lower_additive(
    ctx: &mut TraversalContext,
    fcx: &mut FunctionCtx,
    op: BinaryOp,
    lhs_val: Value,
    lhs_ty: CType,
    rhs_val: Value,
    rhs_ty: CType,
    span: &SourceSpan,
) -> ExprOutcome {
    if lhs_ty.is_pointer() && rhs_ty.is_integer() {
        return lower_pointer_arith(ctx, fcx, lhs_val, &lhs_ty, rhs_val, op, span);
    }
    if op == BinaryOp::Add && lhs_ty.is_integer() && rhs_ty.is_pointer() {
        return lower_pointer_arith(ctx, fcx, rhs_val, &rhs_ty, lhs_val, op, span);
    }
    if op == BinaryOp::Sub && lhs_ty.is_pointer() && rhs_ty.is_pointer() {
        ctx.record_error(CompileError::UnimplementedConstruct { what: "pointer difference".into(), span: span.clone() });
        return unimplemented_outcome(ctx, span);
    }
    if !lhs_ty.is_arithmetic() || !rhs_ty.is_arithmetic() {
        ctx.record_error(CompileError::InvalidBinaryOperands {
            op: binop_symbol(op).into(),
            left_ty: lhs_ty.to_string(),
            right_ty: rhs_ty.to_string(),
            span: span.clone(),
        });
        return Ok(ExprResult::Err);
    }
    arithmetic_result(ctx, fcx, op, lhs_val, rhs_val, span)
}

fn lower_pointer_arith(
    ctx: &mut TraversalContext,
    fcx: &mut FunctionCtx,
    ptr_val: Value,
    ptr_c_type: &CType,
    index_val: Value,
    op: BinaryOp,
    span: &SourceSpan,
) -> ExprOutcome {
    let elem_c_type = ptr_c_type.pointee().expect("checked pointer above").clone();
    let elem_ir = match ctx.resolve_ir_type(&elem_c_type, span) {
        Some(t) => t,
        None => return Ok(ExprResult::Err),
    };
    let index = if op == BinaryOp::Sub {
        if let Some(i) = index_val.as_const_int() {
            Value::const_int(-i, index_val.ty().clone())
        } else {
            let zero = Value::zero(index_val.ty().clone());
            let ty = index_val.ty().clone();
            fcx.builder.build_arith(ArithOp::Sub, ty, zero, index_val, span.clone())
        }
    } else {
        index_val
    };
    let result = fcx.builder.build_get_array_element_ptr(elem_ir, ptr_val, index, span.clone());
    Ok(ExprResult::value(result, ptr_c_type.clone()))
}

fn lower_muldiv(
    ctx: &mut TraversalContext,
    fcx: &mut FunctionCtx,
    op: BinaryOp,
    lhs_val: Value,
    lhs_ty: CType,
    rhs_val: Value,
    rhs_ty: CType,
    span: &SourceSpan,
) -> ExprOutcome {
    let required_arithmetic = op != BinaryOp::Mod;
    let ok = if required_arithmetic { lhs_ty.is_arithmetic() && rhs_ty.is_arithmetic() } else { lhs_ty.is_integer() && rhs_ty.is_integer() };
    if !ok {
        ctx.record_error(CompileError::InvalidBinaryOperands {
            op: binop_symbol(op).into(),
            left_ty: lhs_ty.to_string(),
            right_ty: rhs_ty.to_string(),
            span: span.clone(),
        });
        return Ok(ExprResult::Err);
    }
    arithmetic_result(ctx, fcx, op, lhs_val, rhs_val, span)
}

fn lower_bitwise(
    ctx: &mut TraversalContext,
    fcx: &mut FunctionCtx,
    op: BinaryOp,
    lhs_val: Value,
    lhs_ty: CType,
    rhs_val: Value,
    rhs_ty: CType,
    span: &SourceSpan,
) -> ExprOutcome {
    if !lhs_ty.is_integer() || !rhs_ty.is_integer() {
        ctx.record_error(CompileError::InvalidBinaryOperands {
            op: binop_symbol(op).into(),
            left_ty: lhs_ty.to_string(),
            right_ty: rhs_ty.to_string(),
            span: span.clone(),
        });
        return Ok(ExprResult::Err);
    }
    arithmetic_result(ctx, fcx, op, lhs_val, rhs_val, span)
}

fn arithmetic_result(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, op: BinaryOp, lhs_val: Value, rhs_val: Value, span: &SourceSpan) -> ExprOutcome {
    let common = crate::types::convert::common_arith_type(lhs_val.ty(), rhs_val.ty());
    let lhs = implicit_convert(ctx, fcx, lhs_val, common.clone(), span);
    let rhs = implicit_convert(ctx, fcx, rhs_val, common.clone(), span);
    let arith_op = arith_op_of(op);
    if let (Some(a), Some(b)) = (lhs.as_const_int(), rhs.as_const_int()) {
        if matches!(arith_op, ArithOp::Div | ArithOp::Mod) && b == 0 {
            if ctx.config.div_by_zero_is_diagnostic {
                ctx.record_error(CompileError::InvalidBinaryOperands {
                    op: binop_symbol(op).into(),
                    left_ty: common.to_string(),
                    right_ty: common.to_string(),
                    span: span.clone(),
                });
            }
            return Ok(ExprResult::value(Value::zero(common.clone()), common_c_type(&common)));
        }
        if let Some(folded) = constfold::fold_int_arith(arith_op, a, b, common.clone()) {
            return Ok(ExprResult::value(folded, common_c_type(&common)));
        }
    }
    if let (Some(a), Some(b)) = (lhs.as_const_float(), rhs.as_const_float()) {
        if let Some(folded) = constfold::fold_float_arith(arith_op, a, b, common.clone()) {
            return Ok(ExprResult::value(folded, common_c_type(&common)));
        }
    }
    let result = fcx.builder.build_arith(arith_op, common.clone(), lhs, rhs, span.clone());
    Ok(ExprResult::value(result, common_c_type(&common)))
}

fn lower_compare(
    ctx: &mut TraversalContext,
    fcx: &mut FunctionCtx,
    op: BinaryOp,
    lhs_val: Value,
    lhs_ty: CType,
    rhs_val: Value,
    rhs_ty: CType,
    span: &SourceSpan,
) -> ExprOutcome {
    if lhs_ty.is_pointer() && rhs_ty.is_pointer() {
        ctx.record_error(CompileError::UnimplementedConstruct { what: "pointer comparison".into(), span: span.clone() });
        return unimplemented_outcome(ctx, span);
    }
    if !lhs_ty.is_arithmetic() || !rhs_ty.is_arithmetic() {
        ctx.record_error(CompileError::InvalidBinaryOperands {
            op: binop_symbol(op).into(),
            left_ty: lhs_ty.to_string(),
            right_ty: rhs_ty.to_string(),
            span: span.clone(),
        });
        return Ok(ExprResult::Err);
    }
    let common = crate::types::convert::common_arith_type(lhs_val.ty(), rhs_val.ty());
    let lhs = implicit_convert(ctx, fcx, lhs_val, common.clone(), span);
    let rhs = implicit_convert(ctx, fcx, rhs_val, common.clone(), span);
    let cmp_op = compare_op_of(op);
    if let (Some(a), Some(b)) = (lhs.as_const_int(), rhs.as_const_int()) {
        return Ok(ExprResult::value(constfold::fold_int_compare(cmp_op, a, b, crate::types::IrType::Bool), CType::Bool));
    }
    if let (Some(a), Some(b)) = (lhs.as_const_float(), rhs.as_const_float()) {
        return Ok(ExprResult::value(constfold::fold_float_compare(cmp_op, a, b, crate::types::IrType::Bool), CType::Bool));
    }
    let result = fcx.builder.build_compare(cmp_op, lhs, rhs, crate::types::IrType::Bool, span.clone());
    Ok(ExprResult::value(result, CType::Bool))
}

fn common_c_type(ir: &crate::types::IrType) -> CType {
    use crate::types::IrType;
    match ir {
        IrType::F32 => CType::Floating(crate::types::c_type::FloatSize::Float),
        IrType::F64 => CType::Floating(crate::types::c_type::FloatSize::Double),
        IrType::U32 => CType::UINT,
        IrType::U64 => CType::Integer { signed: false, size: crate::types::c_type::IntSize::Long },
        _ => CType::SINT,
    }
}

fn binop_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
    }
}

fn lower_logical(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, op: LogicalOp, left: &Expr, right: &Expr, span: &SourceSpan) -> ExprOutcome {
    let lhs_result = lower_expr(ctx, fcx, left)?;
    if lhs_result.is_err() {
        return Ok(ExprResult::Err);
    }
    let (lhs_val, lhs_ty) = match rvalue_of(ctx, fcx, &lhs_result, span) {
        Some(p) => p,
        None => return Ok(ExprResult::Err),
    };
    if !lhs_ty.is_scalar() {
        ctx.record_error(CompileError::InvalidLogicalBinaryOperandType { found: lhs_ty.to_string(), span: span.clone() });
        return Ok(ExprResult::Err);
    }
    let lhs_bool = to_bool(ctx, fcx, lhs_val, &lhs_ty, span)?;
    let (lhs_bool_val, _) = match rvalue_of(ctx, fcx, &lhs_bool, span) {
        Some(p) => p,
        None => return Ok(ExprResult::Err),
    };

    if let Some(i) = lhs_bool_val.as_const_int() {
        let left_is_false = i == 0;
        let short_circuits = matches!(op, LogicalOp::And) == left_is_false;
        if short_circuits {
            return Ok(ExprResult::value(Value::const_int(i, crate::types::IrType::Bool), CType::Bool));
        }
        let rhs_result = lower_expr(ctx, fcx, right)?;
        if rhs_result.is_err() {
            return Ok(ExprResult::Err);
        }
        let (rhs_val, rhs_ty) = match rvalue_of(ctx, fcx, &rhs_result, span) {
            Some(p) => p,
            None => return Ok(ExprResult::Err),
        };
        if !rhs_ty.is_scalar() {
            ctx.record_error(CompileError::InvalidLogicalBinaryOperandType { found: rhs_ty.to_string(), span: span.clone() });
            return Ok(ExprResult::Err);
        }
        let rhs_bool = to_bool(ctx, fcx, rhs_val, &rhs_ty, span)?;
        return Ok(rhs_bool);
    }

    let result_name = fcx.builder.fresh_temp();
    let merge_label = fcx.builder.fresh_label();
    fcx.builder.build_assign_into(result_name.clone(), lhs_bool_val.clone(), span.clone());
    let short_circuit_target = if matches!(op, LogicalOp::And) {
        Value::const_int(0, crate::types::IrType::Bool)
    } else {
        Value::const_int(1, crate::types::IrType::Bool)
    };
    let skip_cond = fcx.builder.build_compare(CompareOp::Eq, lhs_bool_val, short_circuit_target, crate::types::IrType::Bool, span.clone());
    fcx.builder.build_br_cond(skip_cond, merge_label.clone(), span.clone());

    let rhs_result = lower_expr(ctx, fcx, right)?;
    if rhs_result.is_err() {
        return Ok(ExprResult::Err);
    }
    let (rhs_val, rhs_ty) = match rvalue_of(ctx, fcx, &rhs_result, span) {
        Some(p) => p,
        None => return Ok(ExprResult::Err),
    };
    if !rhs_ty.is_scalar() {
        ctx.record_error(CompileError::InvalidLogicalBinaryOperandType { found: rhs_ty.to_string(), span: span.clone() });
        return Ok(ExprResult::Err);
    }
    let rhs_bool = to_bool(ctx, fcx, rhs_val, &rhs_ty, span)?;
    let (rhs_bool_val, _) = match rvalue_of(ctx, fcx, &rhs_bool, span) {
        Some(p) => p,
        None => return Ok(ExprResult::Err),
    };
    fcx.builder.build_assign_into(result_name.clone(), rhs_bool_val, span.clone());
    fcx.builder.build_nop(Some(merge_label), span.clone());
    Ok(ExprResult::value(Value::var(result_name, crate::types::IrType::Bool), CType::Bool))
}

fn lower_assign(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, target_expr: &Expr, value_expr: &Expr, span: &SourceSpan) -> ExprOutcome {
    let target = lower_expr(ctx, fcx, target_expr)?;
    if target.is_err() {
        return Ok(ExprResult::Err);
    }
    let is_assignable = matches!(&target, ExprResult::Value { is_lvalue: true, .. } | ExprResult::Indirection { .. });
    if !is_assignable {
        ctx.record_error(CompileError::InvalidAssignmentTarget { span: span.clone() });
        return Ok(ExprResult::Err);
    }
    if let ExprResult::Value { c_type, .. } = &target {
        if let Some(sym) = symbol_for_lvalue(ctx, target_expr) {
            if sym.is_const {
                ctx.record_error(CompileError::InvalidAssignmentTarget { span: span.clone() });
                return Ok(ExprResult::Err);
            }
        }
        let _ = c_type;
    }

    let target_c_type = target.c_type().expect("assignable target has a type").clone();
    let addr = match address_of(ctx, fcx, &target, span) {
        Some(a) => a,
        None => {
            ctx.record_error(CompileError::InvalidAssignmentTarget { span: span.clone() });
            return Ok(ExprResult::Err);
        }
    };

    let value_result = lower_expr(ctx, fcx, value_expr)?;
    if value_result.is_err() {
        return Ok(ExprResult::Err);
    }
    let (value, _) = match rvalue_of(ctx, fcx, &value_result, span) {
        Some(p) => p,
        None => return Ok(ExprResult::Err),
    };
    let target_ir = match ctx.resolve_ir_type(&target_c_type, span) {
        Some(t) => t,
        None => return Ok(ExprResult::Err),
    };
    let converted = implicit_convert(ctx, fcx, value, target_ir, span);
    fcx.builder.build_store(addr, converted.clone(), span.clone());
    Ok(ExprResult::value(converted, target_c_type))
}

/// Looks the assignment target's symbol back up, purely to check its
/// `const` qualifier — only meaningful for a plain identifier target.
fn symbol_for_lvalue<'a>(ctx: &'a TraversalContext, target_expr: &Expr) -> Option<&'a crate::symbols::Symbol> {
    match target_expr {
        Expr::Ident { name, .. } => ctx.scopes.lookup_symbol(name),
        _ => None,
    }
}

fn lower_ternary(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, cond: &Expr, then_expr: &Expr, else_expr: &Expr, span: &SourceSpan) -> ExprOutcome {
    let cond_result = lower_expr(ctx, fcx, cond)?;
    if cond_result.is_err() {
        return Ok(ExprResult::Err);
    }
    let (cond_val, cond_ty) = match rvalue_of(ctx, fcx, &cond_result, span) {
        Some(p) => p,
        None => return Ok(ExprResult::Err),
    };
    if !cond_ty.is_scalar() {
        ctx.record_error(CompileError::InvalidTernaryConditionType { found: cond_ty.to_string(), span: span.clone() });
        return Ok(ExprResult::Err);
    }
    let cond_bool = to_bool(ctx, fcx, cond_val, &cond_ty, span)?;
    let (cond_bool_val, _) = match rvalue_of(ctx, fcx, &cond_bool, span) {
        Some(p) => p,
        None => return Ok(ExprResult::Err),
    };

    if let Some(i) = cond_bool_val.as_const_int() {
        let checkpoint = fcx.builder.get_position();
        let (chosen, discarded) = if i != 0 { (then_expr, else_expr) } else { (else_expr, then_expr) };
        let discard_checkpoint = fcx.builder.get_position();
        let _ = lower_expr(ctx, fcx, discarded)?;
        fcx.builder.clear_after(discard_checkpoint);
        let _ = checkpoint;
        return lower_expr(ctx, fcx, chosen);
    }

    let then_result = lower_expr(ctx, fcx, then_expr)?;
    let else_result = lower_expr(ctx, fcx, else_expr)?;
    if then_result.is_err() || else_result.is_err() {
        return Ok(ExprResult::Err);
    }
    let (then_val, then_ty) = match rvalue_of(ctx, fcx, &then_result, span) {
        Some(p) => p,
        None => return Ok(ExprResult::Err),
    };
    let (else_val, else_ty) = match rvalue_of(ctx, fcx, &else_result, span) {
        Some(p) => p,
        None => return Ok(ExprResult::Err),
    };

    let (result_ty, result_c_type) = match ternary_result_type(&then_ty, &else_ty, then_val.ty(), else_val.ty()) {
        Some(pair) => pair,
        None => {
            ctx.record_error(CompileError::InvalidTernaryOperands { true_ty: then_ty.to_string(), false_ty: else_ty.to_string(), span: span.clone() });
            return Ok(ExprResult::Err);
        }
    };

    let result_name = fcx.builder.fresh_temp();
    let merge_label = fcx.builder.fresh_label();
    let false_label = fcx.builder.fresh_label();
    let zero = Value::zero(crate::types::IrType::Bool);
    let test = fcx.builder.build_compare(CompareOp::Eq, cond_bool_val, zero, crate::types::IrType::Bool, span.clone());
    fcx.builder.build_br_cond(test, false_label.clone(), span.clone());
    let converted_then = if matches!(result_ty, crate::types::IrType::Void) { then_val } else { implicit_convert(ctx, fcx, then_val, result_ty.clone(), span) };
    fcx.builder.build_assign_into(result_name.clone(), converted_then, span.clone());
    fcx.builder.build_br(merge_label.clone(), span.clone());
    fcx.builder.build_nop(Some(false_label), span.clone());
    let converted_else = if matches!(result_ty, crate::types::IrType::Void) { else_val } else { implicit_convert(ctx, fcx, else_val, result_ty.clone(), span) };
    fcx.builder.build_assign_into(result_name.clone(), converted_else, span.clone());
    fcx.builder.build_nop(Some(merge_label), span.clone());
    Ok(ExprResult::value(Value::var(result_name, result_ty), result_c_type))
}

fn ternary_result_type(then_c: &CType, else_c: &CType, then_ir: &crate::types::IrType, else_ir: &crate::types::IrType) -> Option<(crate::types::IrType, CType)> {
    if then_c.is_arithmetic() && else_c.is_arithmetic() {
        let common = crate::types::convert::common_arith_type(then_ir, else_ir);
        return Some((common.clone(), common_c_type(&common)));
    }
    if then_c.is_void() && else_c.is_void() {
        return Some((crate::types::IrType::Void, CType::Void));
    }
    if then_c.is_pointer() && else_c.is_pointer() {
        return Some((then_ir.clone(), then_c.clone()));
    }
    None
}

fn lower_call(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, callee: &Expr, args: &[Expr], span: &SourceSpan) -> ExprOutcome {
    let name = match callee {
        Expr::Ident { name, .. } => name.clone(),
        _ => {
            ctx.record_error(CompileError::CallTargetNotFunction { span: span.clone() });
            return Ok(ExprResult::Err);
        }
    };
    let (fn_c_type, fn_ir_name) = match ctx.scopes.lookup_symbol(&name) {
        Some(sym) if sym.c_type.is_function() => (sym.c_type.clone(), sym.ir_name.clone()),
        Some(_) => {
            ctx.record_error(CompileError::CallTargetNotFunction { span: span.clone() });
            return Ok(ExprResult::Err);
        }
        None => {
            ctx.record_error(CompileError::UndeclaredIdentifier { name: name.clone(), span: span.clone() });
            return Ok(ExprResult::Err);
        }
    };
    let (ret_c_type, params, variadic) = match &fn_c_type {
        CType::Function { ret, params, variadic } => ((**ret).clone(), params.clone(), *variadic),
        _ => unreachable!("checked is_function above"),
    };
    let expected = params.len();
    if (!variadic && args.len() != expected) || (variadic && args.len() < expected) {
        ctx.record_error(CompileError::CallArgumentCountMismatch { expected, found: args.len(), span: span.clone() });
        return Ok(ExprResult::Err);
    }

    let mut arg_values = Vec::with_capacity(args.len());
    for (i, arg_expr) in args.iter().enumerate() {
        let arg_result = lower_expr(ctx, fcx, arg_expr)?;
        if arg_result.is_err() {
            return Ok(ExprResult::Err);
        }
        let (mut value, _) = match rvalue_of(ctx, fcx, &arg_result, arg_expr.span()) {
            Some(p) => p,
            None => return Ok(ExprResult::Err),
        };
        if i < expected {
            let param_ir = match ctx.resolve_ir_type(&params[i].ty.decayed(), arg_expr.span()) {
                Some(t) => t,
                None => return Ok(ExprResult::Err),
            };
            value = implicit_convert(ctx, fcx, value, param_ir, arg_expr.span());
        } else {
            let promoted = crate::types::convert::default_argument_promote(value.ty());
            value = implicit_convert(ctx, fcx, value, promoted, arg_expr.span());
        }
        arg_values.push(value);
    }

    let ret_ir = match ctx.resolve_ir_type(&ret_c_type, span) {
        Some(t) => t,
        None => return Ok(ExprResult::Err),
    };
    match fcx.builder.build_call(fn_ir_name, ret_ir, arg_values, span.clone()) {
        Some(value) => Ok(ExprResult::value(value, ret_c_type)),
        None => Ok(ExprResult::Value { value: Value::zero(crate::types::IrType::Void), c_type: CType::Void, is_lvalue: false, is_string_literal: false }),
    }
}

fn lower_subscript(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, base: &Expr, index: &Expr, span: &SourceSpan) -> ExprOutcome {
    let base_result = lower_expr(ctx, fcx, base)?;
    if base_result.is_err() {
        return Ok(ExprResult::Err);
    }
    let base_c_type = base_result.c_type().cloned();
    let (base_val, base_ty) = match base_c_type {
        Some(ref t) if t.is_array() || t.is_pointer() => match rvalue_of(ctx, fcx, &base_result, span) {
            Some(p) => p,
            None => return Ok(ExprResult::Err),
        },
        _ => {
            ctx.record_error(CompileError::InvalidSubscriptTarget { span: span.clone() });
            return Ok(ExprResult::Err);
        }
    };

    let index_result = lower_expr(ctx, fcx, index)?;
    if index_result.is_err() {
        return Ok(ExprResult::Err);
    }
    let (index_val, index_ty) = match rvalue_of(ctx, fcx, &index_result, span) {
        Some(p) => p,
        None => return Ok(ExprResult::Err),
    };
    if !index_ty.is_integer() {
        ctx.record_error(CompileError::InvalidSubscriptType { found: index_ty.to_string(), span: span.clone() });
        return Ok(ExprResult::Err);
    }

    let elem_c_type = base_ty.pointee().expect("array/pointer decays to a pointee type").clone();
    let elem_ir = match ctx.resolve_ir_type(&elem_c_type, span) {
        Some(t) => t,
        None => return Ok(ExprResult::Err),
    };
    let addr = fcx.builder.build_get_array_element_ptr(elem_ir, base_val, index_val, span.clone());
    Ok(ExprResult::lvalue(addr, elem_c_type))
}

fn lower_member(ctx: &mut TraversalContext, fcx: &mut FunctionCtx, base: &Expr, field: &str, arrow: bool, span: &SourceSpan) -> ExprOutcome {
    let base_result = lower_expr(ctx, fcx, base)?;
    if base_result.is_err() {
        return Ok(ExprResult::Err);
    }
    let (struct_c_type, base_addr) = if arrow {
        let base_c_type = base_result.c_type().cloned();
        match base_c_type {
            Some(t) if t.is_pointer() && t.pointee().is_some_and(CType::is_struct_or_union) => {
                let (addr, _) = match rvalue_of(ctx, fcx, &base_result, span) {
                    Some(p) => p,
                    None => return Ok(ExprResult::Err),
                };
                (t.pointee().unwrap().clone(), addr)
            }
            _ => {
                ctx.record_error(CompileError::InvalidMemberAccessTarget { span: span.clone() });
                return Ok(ExprResult::Err);
            }
        }
    } else {
        match &base_result {
            ExprResult::Value { is_lvalue: true, c_type, value, .. } if c_type.is_struct_or_union() => (c_type.clone(), value.clone()),
            _ => {
                ctx.record_error(CompileError::InvalidMemberAccessTarget { span: span.clone() });
                return Ok(ExprResult::Err);
            }
        }
    };

    let struct_name = struct_c_type.to_string();
    let c_field = match &struct_c_type {
        CType::StructOrUnion { fields, .. } => fields.iter().find(|f| &*f.name == field),
        _ => None,
    };
    let c_field = match c_field {
        Some(f) => f.clone(),
        None => {
            ctx.record_error(CompileError::InvalidStructFieldReference { field: field.to_string(), struct_name, span: span.clone() });
            return Ok(ExprResult::Err);
        }
    };
    let struct_ir = match ctx.resolve_ir_type(&struct_c_type, span) {
        Some(t) => t,
        None => return Ok(ExprResult::Err),
    };
    let ir_field = match struct_ir.field(field) {
        Some(f) => f.clone(),
        None => {
            ctx.record_error(CompileError::InvalidStructFieldReference { field: field.to_string(), struct_name: struct_c_type.to_string(), span: span.clone() });
            return Ok(ExprResult::Err);
        }
    };
    let addr = fcx.builder.build_get_struct_member_ptr(ir_field.ty.clone(), base_addr, ir_field.index, span.clone());
    Ok(ExprResult::lvalue(addr, c_field.ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::lp64;
    use crate::config::LoweringConfig;
    use crate::location::source_span::SourceSpan;
    use crate::lower::TraversalContext;

    fn fresh() -> (TraversalContext, FunctionCtx) {
        (TraversalContext::new("t", lp64(), LoweringConfig::default()), FunctionCtx::new())
    }

    #[test]
    fn integer_literal_plus_literal_constant_folds() {
        let (mut ctx, mut fcx) = fresh();
        let span = SourceSpan::default();
        let e = Expr::Binary {
            op: BinaryOp::Add,
            left: Box::new(Expr::IntLiteral { value: 2, span: span.clone() }),
            right: Box::new(Expr::IntLiteral { value: 3, span: span.clone() }),
            span: span.clone(),
        };
        let result = lower_expr(&mut ctx, &mut fcx, &e).unwrap();
        let (value, _) = rvalue_of(&mut ctx, &mut fcx, &result, &span).unwrap();
        assert_eq!(value.as_const_int(), Some(5));
        assert!(fcx.builder.instructions().is_empty());
    }

    #[test]
    fn undeclared_identifier_is_recorded_and_propagates_err() {
        let (mut ctx, mut fcx) = fresh();
        let span = SourceSpan::default();
        let e = Expr::Ident { name: "missing".into(), span: span.clone() };
        let result = lower_expr(&mut ctx, &mut fcx, &e).unwrap();
        assert!(result.is_err());
        assert_eq!(ctx.errors.len(), 1);
    }

    #[test]
    fn address_of_deref_cancels_without_a_load() {
        use crate::symbols::symbol::{Symbol, SymbolKind};
        let (mut ctx, mut fcx) = fresh();
        let span = SourceSpan::default();
        let ptr_ty = CType::SINT.pointer_to();
        ctx.scopes
            .declare_symbol(
                "p",
                Symbol {
                    kind: SymbolKind::LocalVar,
                    source_identifier: "p".into(),
                    ir_name: "%p".into(),
                    c_type: ptr_ty.clone(),
                    ir_type: crate::types::IrType::ptr(crate::types::IrType::I32),
                    ir_ptr: Value::var("%p_addr", crate::types::IrType::ptr(crate::types::IrType::ptr(crate::types::IrType::I32))),
                    declared_at: span.clone(),
                    is_const: false,
                },
            )
            .unwrap();
        let deref = Expr::Unary { op: UnaryOp::Deref, operand: Box::new(Expr::Ident { name: "p".into(), span: span.clone() }), span: span.clone() };
        let addr_of_deref = Expr::Unary { op: UnaryOp::AddressOf, operand: Box::new(deref), span: span.clone() };
        let before = fcx.builder.instructions().len();
        let result = lower_expr(&mut ctx, &mut fcx, &addr_of_deref).unwrap();
        assert!(!result.is_err());
        // &*p loads p's own value (the pointer) but must not load through it again.
        assert_eq!(fcx.builder.instructions().len(), before + 1);
    }

    #[test]
    fn decode_escapes_replaces_named_and_numeric_escapes() {
        assert_eq!(decode_escapes(r"a\nb"), b"a\nb");
        assert_eq!(decode_escapes(r#"\t\\\""#), b"\t\\\"");
        assert_eq!(decode_escapes(r"\x41\102"), b"AB");
    }

    #[test]
    fn string_literal_global_carries_the_escape_processed_bytes() {
        let (mut ctx, mut fcx) = fresh();
        let span = SourceSpan::default();
        let e = Expr::StringLiteral { value: r"hi\n".into(), span: span.clone() };
        let result = lower_expr(&mut ctx, &mut fcx, &e).unwrap();
        assert!(!result.is_err());
        assert_eq!(ctx.module.globals.len(), 1);
        let global = &ctx.module.globals[0];
        match &global.value {
            Value::ConstBytes { bytes, .. } => assert_eq!(&**bytes, b"hi\n\0"),
            other => panic!("expected ConstBytes, got {other:?}"),
        }
    }

    #[test]
    fn implicit_convert_prefers_bitcast_for_same_width_sign_change() {
        let (ctx, mut fcx) = fresh();
        let span = SourceSpan::default();
        let value = Value::var("%v", crate::types::IrType::I32);
        let converted = implicit_convert(&ctx, &mut fcx, value, crate::types::IrType::U32, &span);
        assert!(matches!(converted, Value::Var { .. }));
        let last = fcx.builder.instructions().last().cloned().unwrap();
        assert!(matches!(last, crate::ir::instruction::Instruction::Cast { op: CastOp::Bitcast, .. }));
    }
}

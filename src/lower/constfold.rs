// src/lower/constfold.rs
//! Constant folding for already-common-typed integer and float operands.
//! Only reached once both operands of a binary expression are
//! `Value::ConstInt`/`Value::ConstFloat` of the same IR type; lowering falls
//! back to emitting the corresponding instruction otherwise.
use crate::ir::instruction::{ArithOp, CompareOp};
use crate::ir::value::Value;
use crate::types::IrType;

/// Folds an integer arithmetic/bitwise operator over two constants of the
/// same type. Division and modulo by zero return `None`, signaling "not
/// foldable here" — the caller decides (per [`crate::config::LoweringConfig`])
/// whether that becomes a silent zero or a diagnostic.
pub fn fold_int_arith(op: ArithOp, lhs: i64, rhs: i64, ty: IrType) -> Option<Value> {
    let folded = match op {
        ArithOp::Add => lhs.wrapping_add(rhs),
        ArithOp::Sub => lhs.wrapping_sub(rhs),
        ArithOp::Mul => lhs.wrapping_mul(rhs),
        ArithOp::Div => {
            if rhs == 0 {
                return None;
            }
            lhs.wrapping_div(rhs)
        }
        ArithOp::Mod => {
            if rhs == 0 {
                return None;
            }
            lhs.wrapping_rem(rhs)
        }
        ArithOp::And => lhs & rhs,
        ArithOp::Or => lhs | rhs,
        ArithOp::Xor => lhs ^ rhs,
        ArithOp::Shl => lhs.wrapping_shl(rhs as u32),
        ArithOp::Shr => lhs.wrapping_shr(rhs as u32),
    };
    Some(Value::const_int(folded, ty))
}

pub fn fold_float_arith(op: ArithOp, lhs: f64, rhs: f64, ty: IrType) -> Option<Value> {
    let folded = match op {
        ArithOp::Add => lhs + rhs,
        ArithOp::Sub => lhs - rhs,
        ArithOp::Mul => lhs * rhs,
        ArithOp::Div => lhs / rhs,
        _ => return None,
    };
    Some(Value::const_float(folded, ty))
}

pub fn fold_int_compare(op: CompareOp, lhs: i64, rhs: i64, bool_ty: IrType) -> Value {
    let result = match op {
        CompareOp::Eq => lhs == rhs,
        CompareOp::Ne => lhs != rhs,
        CompareOp::Lt => lhs < rhs,
        CompareOp::Le => lhs <= rhs,
        CompareOp::Gt => lhs > rhs,
        CompareOp::Ge => lhs >= rhs,
    };
    Value::const_int(result as i64, bool_ty)
}

pub fn fold_float_compare(op: CompareOp, lhs: f64, rhs: f64, bool_ty: IrType) -> Value {
    let result = match op {
        CompareOp::Eq => lhs == rhs,
        CompareOp::Ne => lhs != rhs,
        CompareOp::Lt => lhs < rhs,
        CompareOp::Le => lhs <= rhs,
        CompareOp::Gt => lhs > rhs,
        CompareOp::Ge => lhs >= rhs,
    };
    Value::const_int(result as i64, bool_ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_folds_to_a_constant() {
        let v = fold_int_arith(ArithOp::Add, 2, 3, IrType::I32).unwrap();
        assert_eq!(v.as_const_int(), Some(5));
    }

    #[test]
    fn division_by_zero_is_not_folded() {
        assert!(fold_int_arith(ArithOp::Div, 1, 0, IrType::I32).is_none());
    }

    #[test]
    fn comparison_folds_to_a_bool_constant() {
        let v = fold_int_compare(CompareOp::Lt, 1, 2, IrType::Bool);
        assert_eq!(v.as_const_int(), Some(1));
    }
}

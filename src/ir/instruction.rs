// src/ir/instruction.rs
use crate::ir::value::Value;
use crate::location::source_span::SourceSpan;
use crate::types::IrType;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A cast opcode: which of the IR's narrowing/widening/reinterpreting
/// conversions is being performed. `trunc`/`ext` move within integer widths,
/// `bitcast` reinterprets same-width bits, `ftoi`/`itof` cross the
/// float/integer boundary, `ptoi`/`itop` cross the pointer/integer boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    Trunc,
    Ext,
    Bitcast,
    FloatToInt,
    IntToFloat,
    PtrToInt,
    IntToPtr,
}

/// One instruction in the linear, pre-CFG instruction stream. Every
/// variant that produces a value names its destination as `result`; `nop`
/// carries no result and exists purely to mark a label position for the
/// external CFG builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Alloca { result: Arc<str>, ty: IrType, span: SourceSpan },
    Load { result: Arc<str>, ty: IrType, ptr: Value, span: SourceSpan },
    Store { ptr: Value, value: Value, span: SourceSpan },
    Assign { result: Arc<str>, value: Value, span: SourceSpan },
    Arith { result: Arc<str>, op: ArithOp, ty: IrType, lhs: Value, rhs: Value, span: SourceSpan },
    Not { result: Arc<str>, ty: IrType, operand: Value, span: SourceSpan },
    Compare { result: Arc<str>, op: CompareOp, lhs: Value, rhs: Value, span: SourceSpan },
    Cast { result: Arc<str>, op: CastOp, ty: IrType, operand: Value, span: SourceSpan },
    Br { label: Arc<str>, span: SourceSpan },
    BrCond { cond: Value, label: Arc<str>, span: SourceSpan },
    Nop { label: Option<Arc<str>>, span: SourceSpan },
    Call { result: Option<Arc<str>>, callee: Arc<str>, ty: IrType, args: Vec<Value>, span: SourceSpan },
    Ret { value: Option<Value>, span: SourceSpan },
    GetArrayElementPtr { result: Arc<str>, elem_ty: IrType, base: Value, index: Value, span: SourceSpan },
    GetStructMemberPtr { result: Arc<str>, field_ty: IrType, base: Value, field_index: usize, span: SourceSpan },
}

impl Instruction {
    pub fn is_alloca(&self) -> bool {
        matches!(self, Instruction::Alloca { .. })
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, Instruction::Br { .. } | Instruction::BrCond { .. } | Instruction::Ret { .. })
    }

    pub fn result_name(&self) -> Option<&Arc<str>> {
        match self {
            Instruction::Alloca { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::Assign { result, .. }
            | Instruction::Arith { result, .. }
            | Instruction::Not { result, .. }
            | Instruction::Compare { result, .. }
            | Instruction::Cast { result, .. }
            | Instruction::GetArrayElementPtr { result, .. }
            | Instruction::GetStructMemberPtr { result, .. } => Some(result),
            Instruction::Call { result, .. } => result.as_ref(),
            _ => None,
        }
    }

    pub fn span(&self) -> &SourceSpan {
        match self {
            Instruction::Alloca { span, .. }
            | Instruction::Load { span, .. }
            | Instruction::Store { span, .. }
            | Instruction::Assign { span, .. }
            | Instruction::Arith { span, .. }
            | Instruction::Not { span, .. }
            | Instruction::Compare { span, .. }
            | Instruction::Cast { span, .. }
            | Instruction::Br { span, .. }
            | Instruction::BrCond { span, .. }
            | Instruction::Nop { span, .. }
            | Instruction::Call { span, .. }
            | Instruction::Ret { span, .. }
            | Instruction::GetArrayElementPtr { span, .. }
            | Instruction::GetStructMemberPtr { span, .. } => span,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Alloca { result, ty, .. } => write!(f, "{result} = alloca {ty}"),
            Instruction::Load { result, ptr, .. } => write!(f, "{result} = load {ptr}"),
            Instruction::Store { ptr, value, .. } => write!(f, "store {value}, {ptr}"),
            Instruction::Assign { result, value, .. } => write!(f, "{result} = assign {value}"),
            Instruction::Arith { result, op, lhs, rhs, .. } => write!(f, "{result} = {op:?} {lhs}, {rhs}"),
            Instruction::Not { result, operand, .. } => write!(f, "{result} = not {operand}"),
            Instruction::Compare { result, op, lhs, rhs, .. } => write!(f, "{result} = {op:?} {lhs}, {rhs}"),
            Instruction::Cast { result, op, operand, .. } => write!(f, "{result} = {op:?} {operand}"),
            Instruction::Br { label, .. } => write!(f, "br {label}"),
            Instruction::BrCond { cond, label, .. } => write!(f, "br_cond {cond}, {label}"),
            Instruction::Nop { label: Some(label), .. } => write!(f, "nop {label}"),
            Instruction::Nop { label: None, .. } => write!(f, "nop"),
            Instruction::Call { result: Some(result), callee, args, .. } => {
                write!(f, "{result} = call {callee}(")?;
                write_args(f, args)
            }
            Instruction::Call { result: None, callee, args, .. } => {
                write!(f, "call {callee}(")?;
                write_args(f, args)
            }
            Instruction::Ret { value: Some(value), .. } => write!(f, "ret {value}"),
            Instruction::Ret { value: None, .. } => write!(f, "ret void"),
            Instruction::GetArrayElementPtr { result, base, index, .. } => {
                write!(f, "{result} = get_array_element_ptr {base}, {index}")
            }
            Instruction::GetStructMemberPtr { result, base, field_index, .. } => {
                write!(f, "{result} = get_struct_member_ptr {base}, {field_index}")
            }
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Value]) -> fmt::Result {
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{a}")?;
    }
    write!(f, ")")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_branches_and_returns_are_terminators() {
        let span = SourceSpan::default();
        assert!(Instruction::Ret { value: None, span: span.clone() }.is_terminator());
        assert!(!Instruction::Nop { label: None, span }.is_terminator());
    }

    #[test]
    fn result_name_is_none_for_void_call() {
        let call = Instruction::Call {
            result: None,
            callee: "f".into(),
            ty: IrType::Void,
            args: vec![],
            span: SourceSpan::default(),
        };
        assert!(call.result_name().is_none());
    }
}

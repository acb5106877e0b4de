// src/ir/builder.rs
use crate::ir::instruction::{ArithOp, CastOp, CompareOp, Instruction};
use crate::ir::value::Value;
use crate::location::source_span::SourceSpan;
use crate::types::IrType;
use std::sync::Arc;

/// Identifies a position in the builder's instruction stream: the index
/// immediately after which the next `build_<op>` call inserts. Equivalent to
/// a node handle into a doubly linked list, backed by a plain `Vec` — the
/// cursor never needs to walk the list itself, so the extra indirection a
/// real linked list would buy has no payoff here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position(usize);

/// Cursor-based builder over the function's instruction stream. New
/// instructions are always inserted immediately after the cursor, which then
/// advances past them — this lets constant-folded branches discard an
/// unchosen arm's instructions with [`Self::clear_after`], and lets
/// [`Self::insert_alloca`] splice every stack allocation into the entry
/// prologue regardless of where the builder's own cursor currently sits.
#[derive(Debug, Default)]
pub struct IrBuilder {
    instructions: Vec<Instruction>,
    cursor: usize,
    alloca_cursor: usize,
    temp_counter: usize,
    label_counter: usize,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_temp(&mut self) -> Arc<str> {
        let n = self.temp_counter;
        self.temp_counter += 1;
        Arc::from(format!("%{n}"))
    }

    pub fn fresh_label(&mut self) -> Arc<str> {
        let n = self.label_counter;
        self.label_counter += 1;
        Arc::from(format!("l{n}"))
    }

    pub fn get_position(&self) -> Position {
        Position(self.cursor)
    }

    pub fn position_after(&mut self, pos: Position) {
        self.cursor = pos.0;
    }

    /// Discards every instruction emitted after `pos`, restoring the cursor
    /// there. Used to excise the unchosen arm of a constant-folded ternary
    /// after it has been lowered once for type checking.
    pub fn clear_after(&mut self, pos: Position) {
        self.instructions.truncate(pos.0);
        self.cursor = pos.0;
        if self.alloca_cursor > pos.0 {
            self.alloca_cursor = pos.0;
        }
    }

    fn insert(&mut self, inst: Instruction) -> Position {
        if self.alloca_cursor >= self.cursor {
            self.alloca_cursor += 1;
        }
        self.instructions.insert(self.cursor, inst);
        self.cursor += 1;
        Position(self.cursor)
    }

    /// Allocates a stack slot, always in the entry prologue: the insertion
    /// happens at `alloca_cursor`, which only ever advances past other
    /// allocas, never past ordinary instructions the caller has since
    /// emitted at the main cursor.
    pub fn insert_alloca(&mut self, ty: IrType, span: SourceSpan) -> Value {
        let result = self.fresh_temp();
        self.instructions.insert(self.alloca_cursor, Instruction::Alloca { result: result.clone(), ty: ty.clone(), span });
        if self.cursor >= self.alloca_cursor {
            self.cursor += 1;
        }
        self.alloca_cursor += 1;
        Value::var(result, IrType::ptr(ty))
    }

    pub fn build_load(&mut self, ty: IrType, ptr: Value, span: SourceSpan) -> Value {
        let result = self.fresh_temp();
        self.insert(Instruction::Load { result: result.clone(), ty: ty.clone(), ptr, span });
        Value::var(result, ty)
    }

    pub fn build_store(&mut self, ptr: Value, value: Value, span: SourceSpan) {
        self.insert(Instruction::Store { ptr, value, span });
    }

    pub fn build_assign(&mut self, value: Value, span: SourceSpan) -> Value {
        let result = self.fresh_temp();
        let ty = value.ty().clone();
        self.insert(Instruction::Assign { result: result.clone(), value, span });
        Value::var(result, ty)
    }

    /// Assigns into an already-named temporary (used by short-circuit
    /// logical operators and ternary lowering, which must write both
    /// branches into the same pre-allocated result name).
    pub fn build_assign_into(&mut self, result: Arc<str>, value: Value, span: SourceSpan) {
        self.insert(Instruction::Assign { result, value, span });
    }

    pub fn build_arith(&mut self, op: ArithOp, ty: IrType, lhs: Value, rhs: Value, span: SourceSpan) -> Value {
        let result = self.fresh_temp();
        self.insert(Instruction::Arith { result: result.clone(), op, ty: ty.clone(), lhs, rhs, span });
        Value::var(result, ty)
    }

    pub fn build_not(&mut self, ty: IrType, operand: Value, span: SourceSpan) -> Value {
        let result = self.fresh_temp();
        self.insert(Instruction::Not { result: result.clone(), ty: ty.clone(), operand, span });
        Value::var(result, ty)
    }

    pub fn build_compare(&mut self, op: CompareOp, lhs: Value, rhs: Value, bool_ty: IrType, span: SourceSpan) -> Value {
        let result = self.fresh_temp();
        self.insert(Instruction::Compare { result: result.clone(), op, lhs, rhs, span });
        Value::var(result, bool_ty)
    }

    pub fn build_cast(&mut self, op: CastOp, ty: IrType, operand: Value, span: SourceSpan) -> Value {
        let result = self.fresh_temp();
        self.insert(Instruction::Cast { result: result.clone(), op, ty: ty.clone(), operand, span });
        Value::var(result, ty)
    }

    pub fn build_br(&mut self, label: Arc<str>, span: SourceSpan) {
        self.insert(Instruction::Br { label, span });
    }

    pub fn build_br_cond(&mut self, cond: Value, label: Arc<str>, span: SourceSpan) {
        self.insert(Instruction::BrCond { cond, label, span });
    }

    pub fn build_nop(&mut self, label: Option<Arc<str>>, span: SourceSpan) {
        self.insert(Instruction::Nop { label, span });
    }

    pub fn build_call(&mut self, callee: Arc<str>, ret_ty: IrType, args: Vec<Value>, span: SourceSpan) -> Option<Value> {
        if matches!(ret_ty, IrType::Void) {
            self.insert(Instruction::Call { result: None, callee, ty: ret_ty, args, span });
            None
        } else {
            let result = self.fresh_temp();
            self.insert(Instruction::Call { result: Some(result.clone()), callee, ty: ret_ty.clone(), args, span });
            Some(Value::var(result, ret_ty))
        }
    }

    pub fn build_ret(&mut self, value: Option<Value>, span: SourceSpan) {
        self.insert(Instruction::Ret { value, span });
    }

    pub fn build_get_array_element_ptr(&mut self, elem_ty: IrType, base: Value, index: Value, span: SourceSpan) -> Value {
        let result = self.fresh_temp();
        self.insert(Instruction::GetArrayElementPtr { result: result.clone(), elem_ty: elem_ty.clone(), base, index, span });
        Value::var(result, IrType::ptr(elem_ty))
    }

    pub fn build_get_struct_member_ptr(&mut self, field_ty: IrType, base: Value, field_index: usize, span: SourceSpan) -> Value {
        let result = self.fresh_temp();
        self.insert(Instruction::GetStructMemberPtr {
            result: result.clone(),
            field_ty: field_ty.clone(),
            base,
            field_index,
            span,
        });
        Value::var(result, IrType::ptr(field_ty))
    }

    pub fn finalize(self) -> Vec<Instruction> {
        self.instructions
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocas_always_land_before_later_instructions() {
        let mut b = IrBuilder::new();
        let span = SourceSpan::default();
        b.insert_alloca(IrType::I32, span.clone());
        b.build_ret(None, span.clone());
        b.insert_alloca(IrType::I32, span);
        let insts = b.finalize();
        assert!(insts[0].is_alloca());
        assert!(insts[1].is_alloca());
        assert!(!insts[2].is_alloca());
    }

    #[test]
    fn clear_after_discards_the_unchosen_ternary_arm() {
        let mut b = IrBuilder::new();
        let span = SourceSpan::default();
        let checkpoint = b.get_position();
        b.build_ret(None, span);
        assert_eq!(b.instructions().len(), 1);
        b.clear_after(checkpoint);
        assert!(b.instructions().is_empty());
    }

    #[test]
    fn temp_and_label_counters_are_monotonic() {
        let mut b = IrBuilder::new();
        assert_eq!(&*b.fresh_temp(), "%0");
        assert_eq!(&*b.fresh_temp(), "%1");
        assert_eq!(&*b.fresh_label(), "l0");
    }
}

// src/error/compile_error.rs
use crate::error::severity::Severity;
use crate::location::source_span::SourceSpan;
use thiserror::Error;

/// Every diagnostic the lowering pass can produce.
///
/// Most variants are non-fatal: the traversal context accumulates them into
/// a `Vec<CompileError>` and keeps walking the AST (the expression or
/// statement that triggered the error simply becomes `ExprResult::Err` and
/// propagates). [`CompileError::severity`] marks the two variants that
/// instead abort the pass outright.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("use of undeclared identifier '{name}' at {span}")]
    UndeclaredIdentifier { name: String, span: SourceSpan },

    #[error("use of undeclared label '{name}' at {span}")]
    UndeclaredLabel { name: String, span: SourceSpan },

    #[error("invalid operands to binary '{op}': '{left_ty}' and '{right_ty}' at {span}")]
    InvalidBinaryOperands { op: String, left_ty: String, right_ty: String, span: SourceSpan },

    #[error("invalid assignment target at {span}")]
    InvalidAssignmentTarget { span: SourceSpan },

    #[error("redefinition of '{name}' at {span} (first declared at {previous})")]
    RedefinitionOfSymbol { name: String, span: SourceSpan, previous: SourceSpan },

    #[error("redefinition of label '{name}' at {span} (first defined at {previous})")]
    RedefinitionOfLabel { name: String, span: SourceSpan, previous: SourceSpan },

    #[error("redefinition of tag '{name}' at {span} (first declared at {previous})")]
    RedefinitionOfTag { name: String, span: SourceSpan, previous: SourceSpan },

    #[error("invalid initializer: expected '{expected}', found '{found}' at {span}")]
    InvalidInitializerType { expected: String, found: String, span: SourceSpan },

    #[error("global initializer is not a compile-time constant at {span}")]
    GlobalInitializerNotConstant { span: SourceSpan },

    #[error("invalid 'if' condition type '{found}' at {span}")]
    InvalidIfConditionType { found: String, span: SourceSpan },

    #[error("invalid ternary condition type '{found}' at {span}")]
    InvalidTernaryConditionType { found: String, span: SourceSpan },

    #[error("invalid ternary operand types '{true_ty}' and '{false_ty}' at {span}")]
    InvalidTernaryOperands { true_ty: String, false_ty: String, span: SourceSpan },

    #[error("call target is not a function at {span}")]
    CallTargetNotFunction { span: SourceSpan },

    #[error("call argument count mismatch: expected {expected}, found {found} at {span}")]
    CallArgumentCountMismatch { expected: usize, found: usize, span: SourceSpan },

    #[error("invalid loop condition type '{found}' at {span}")]
    InvalidLoopConditionType { found: String, span: SourceSpan },

    #[error("invalid operand type '{found}' for unary '~' at {span}")]
    InvalidUnaryNotOperandType { found: String, span: SourceSpan },

    #[error("invalid operand type '{found}' for logical operator at {span}")]
    InvalidLogicalBinaryOperandType { found: String, span: SourceSpan },

    #[error("cannot convert '{found}' to boolean at {span}")]
    InvalidConversionToBoolean { found: String, span: SourceSpan },

    #[error("unary '*' operand is not a pointer type, found '{found}' at {span}")]
    UnaryIndirectionOperandNotPtrType { found: String, span: SourceSpan },

    #[error("subscript target is not an array or pointer at {span}")]
    InvalidSubscriptTarget { span: SourceSpan },

    #[error("subscript index type '{found}' is not an integer at {span}")]
    InvalidSubscriptType { found: String, span: SourceSpan },

    #[error("member access target is not a struct/union (or pointer to one) at {span}")]
    InvalidMemberAccessTarget { span: SourceSpan },

    #[error("'{struct_name}' has no field named '{field}' at {span}")]
    InvalidStructFieldReference { field: String, struct_name: String, span: SourceSpan },

    #[error("cannot increment/decrement operand of type '{found}' at {span}")]
    CannotIncrementDecrementType { found: String, span: SourceSpan },

    #[error("'break' outside of loop or switch at {span}")]
    BreakOutsideOfLoopOrSwitchCase { span: SourceSpan },

    #[error("'continue' outside of loop at {span}")]
    ContinueOutsideOfLoop { span: SourceSpan },

    /// A construct named as an open question in the specification
    /// (designated initializers, struct initializer lists, compound
    /// assignment, `sizeof` on an incomplete type, non-constant array
    /// lengths, pointer-pointer comparison, function-pointer deref/address-of).
    #[error("unimplemented: {what} at {span}")]
    UnimplementedConstruct { what: String, span: SourceSpan },

    /// The external IR validator rejected a lowered function. This indicates
    /// a bug in the lowering pass, not a problem with the input program.
    #[error("IR validation failed for function '{function}': {message}")]
    IrValidationFailed { function: String, message: String },
}

impl CompileError {
    /// The canonical, stable identifier for this diagnostic's kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UndeclaredIdentifier { .. } => "use-of-undeclared-identifier",
            Self::UndeclaredLabel { .. } => "use-of-undeclared-label",
            Self::InvalidBinaryOperands { .. } => "invalid-binary-expression-operands",
            Self::InvalidAssignmentTarget { .. } => "invalid-assignment-target",
            Self::RedefinitionOfSymbol { .. } => "redefinition-of-symbol",
            Self::RedefinitionOfLabel { .. } => "redefinition-of-label",
            Self::RedefinitionOfTag { .. } => "redefinition-of-tag",
            Self::InvalidInitializerType { .. } => "invalid-initializer-type",
            Self::GlobalInitializerNotConstant { .. } => "global-initializer-not-constant",
            Self::InvalidIfConditionType { .. } => "invalid-if-condition-type",
            Self::InvalidTernaryConditionType { .. } => "invalid-ternary-condition-type",
            Self::InvalidTernaryOperands { .. } => "invalid-ternary-expression-operands",
            Self::CallTargetNotFunction { .. } => "call-target-not-function",
            Self::CallArgumentCountMismatch { .. } => "call-argument-count-mismatch",
            Self::InvalidLoopConditionType { .. } => "invalid-loop-condition-type",
            Self::InvalidUnaryNotOperandType { .. } => "invalid-unary-not-operand-type",
            Self::InvalidLogicalBinaryOperandType { .. } => "invalid-logical-binary-expression-operand-type",
            Self::InvalidConversionToBoolean { .. } => "invalid-conversion-to-boolean",
            Self::UnaryIndirectionOperandNotPtrType { .. } => "unary-indirection-operand-not-ptr-type",
            Self::InvalidSubscriptTarget { .. } => "invalid-subscript-target",
            Self::InvalidSubscriptType { .. } => "invalid-subscript-type",
            Self::InvalidMemberAccessTarget { .. } => "invalid-member-access-target",
            Self::InvalidStructFieldReference { .. } => "invalid-struct-field-reference",
            Self::CannotIncrementDecrementType { .. } => "cannot-increment-decrement-type",
            Self::BreakOutsideOfLoopOrSwitchCase { .. } => "break-outside-of-loop-or-switch-case",
            Self::ContinueOutsideOfLoop { .. } => "continue-outside-of-loop",
            Self::UnimplementedConstruct { .. } => "unimplemented-construct",
            Self::IrValidationFailed { .. } => "ir-validation-failed",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::UnimplementedConstruct { .. } | Self::IrValidationFailed { .. } => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Source position of the diagnostic, when one is tracked. `IrValidationFailed`
    /// has none: it is raised after lowering, against an already-finalized function.
    pub fn span(&self) -> Option<&SourceSpan> {
        match self {
            Self::UndeclaredIdentifier { span, .. }
            | Self::UndeclaredLabel { span, .. }
            | Self::InvalidBinaryOperands { span, .. }
            | Self::InvalidAssignmentTarget { span }
            | Self::RedefinitionOfSymbol { span, .. }
            | Self::RedefinitionOfLabel { span, .. }
            | Self::RedefinitionOfTag { span, .. }
            | Self::InvalidInitializerType { span, .. }
            | Self::GlobalInitializerNotConstant { span }
            | Self::InvalidIfConditionType { span, .. }
            | Self::InvalidTernaryConditionType { span, .. }
            | Self::InvalidTernaryOperands { span, .. }
            | Self::CallTargetNotFunction { span }
            | Self::CallArgumentCountMismatch { span, .. }
            | Self::InvalidLoopConditionType { span, .. }
            | Self::InvalidUnaryNotOperandType { span, .. }
            | Self::InvalidLogicalBinaryOperandType { span, .. }
            | Self::InvalidConversionToBoolean { span, .. }
            | Self::UnaryIndirectionOperandNotPtrType { span, .. }
            | Self::InvalidSubscriptTarget { span }
            | Self::InvalidSubscriptType { span, .. }
            | Self::InvalidMemberAccessTarget { span }
            | Self::InvalidStructFieldReference { span, .. }
            | Self::CannotIncrementDecrementType { span, .. }
            | Self::BreakOutsideOfLoopOrSwitchCase { span }
            | Self::ContinueOutsideOfLoop { span }
            | Self::UnimplementedConstruct { span, .. } => Some(span),
            Self::IrValidationFailed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> SourceSpan {
        SourceSpan::default()
    }

    #[test]
    fn code_matches_taxonomy_string() {
        let e = CompileError::UndeclaredIdentifier { name: "x".into(), span: span() };
        assert_eq!(e.code(), "use-of-undeclared-identifier");
    }

    #[test]
    fn unimplemented_and_validation_failures_are_fatal() {
        assert_eq!(
            CompileError::UnimplementedConstruct { what: "designated initializers".into(), span: span() }.severity(),
            Severity::Fatal
        );
        assert_eq!(
            CompileError::IrValidationFailed { function: "f".into(), message: "bad".into() }.severity(),
            Severity::Fatal
        );
    }

    #[test]
    fn ordinary_diagnostics_are_error_severity() {
        assert_eq!(CompileError::InvalidAssignmentTarget { span: span() }.severity(), Severity::Error);
    }
}

//! # Error module
//!
//! Diagnostics produced by the lowering pass. [`compile_error::CompileError`]
//! is the single sum type covering the whole error taxonomy — undeclared
//! identifiers, redefinitions, type mismatches, control-flow misuse — plus
//! the two fatal internal variants raised by unimplemented constructs and by
//! IR-validation handoff failures.
//!
//! Diagnostics are structured values, not formatted text: rendering one into
//! a human-readable report with a source snippet is left to the caller.
pub mod compile_error;
pub mod severity;

pub use compile_error::CompileError;
pub use severity::Severity;

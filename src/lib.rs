// src/lib.rs
//! # c99ir
//!
//! The semantic-analysis and intermediate-representation lowering core of a
//! C99 compiler: given a parsed translation unit and an architecture
//! descriptor, produces a typed non-SSA three-address IR plus a list of
//! diagnostics.
//!
//! ## Modules
//! * [`arch`] — the architecture descriptor (primitive widths, pointer size)
//! * [`types`] — C types, IR types, struct/union layout, conversions
//! * [`symbols`] — scopes, symbols, and struct/union tags
//! * [`ast`] — the input AST shape this crate consumes
//! * [`ir`] — the output intermediate representation
//! * [`lower`] — the lowering pass itself
//! * [`error`] — the diagnostic taxonomy
//! * [`config`] — the pass's small behavioral configuration surface
//! * [`location`] — source positions shared by the AST and every diagnostic
pub mod arch;
pub mod ast;
pub mod config;
pub mod error;
pub mod ir;
pub mod location;
pub mod lower;
pub mod symbols;
pub mod types;

pub use config::LoweringConfig;
pub use error::CompileError;
pub use lower::{lower_translation_unit, LoweringOutcome};

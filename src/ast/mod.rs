//! The input AST shape this crate consumes: declarations ([`decl`]),
//! statements ([`stmt`]), and expressions ([`expr`]). Lexing, preprocessing,
//! and parsing that produce these trees are out of scope; this module only
//! names the interface the lowering pass walks.
pub mod decl;
pub mod expr;
pub mod stmt;

pub use decl::{CParamDecl, Declarator, ExternalDecl, FunctionDef, GlobalDecl, Initializer, LocalDecl, TranslationUnit};
pub use expr::{BinaryOp, Expr, IncDecOp, LogicalOp, SizeofTarget, UnaryOp};
pub use stmt::{BlockItem, ForInit, Stmt};

//! Declared identifiers and their two namespaces: ordinary symbols
//! ([`symbol`]) and struct/union tags ([`tag`]), organized into a lexical
//! scope chain ([`scope`]).
pub mod scope;
pub mod symbol;
pub mod tag;

pub use scope::{Scope, ScopeId, ScopeTable};
pub use symbol::{Symbol, SymbolKind};
pub use tag::{Tag, TagUidGenerator};

// src/ast/decl.rs
use crate::ast::expr::Expr;
use crate::ast::stmt::Stmt;
use crate::location::source_span::{HasSpan, SourceSpan};
use crate::types::c_type::CType;

/// One declared name in a declaration group: `int a = 1, b[3], *c;` is three
/// `Declarator`s sharing a base `CType` pinned down by the parser
/// (array/pointer/function suffixes already folded in).
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub ty: CType,
    pub init: Option<Initializer>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    Expr(Expr),
    List(Vec<Initializer>),
}

/// A local declaration: an optional tag-defining prefix (`struct N { ... };`
/// with no declarator) plus zero or more declarators sharing a base type.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    pub tag_def: Option<CType>,
    pub declarators: Vec<Declarator>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDecl {
    pub tag_def: Option<CType>,
    pub declarators: Vec<Declarator>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub return_type: CType,
    pub params: Vec<CParamDecl>,
    pub variadic: bool,
    pub body: Stmt,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CParamDecl {
    pub name: String,
    pub ty: CType,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExternalDecl {
    Function(FunctionDef),
    Global(GlobalDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    pub decls: Vec<ExternalDecl>,
}

impl HasSpan for ExternalDecl {
    fn span(&self) -> &SourceSpan {
        match self {
            ExternalDecl::Function(f) => &f.span,
            ExternalDecl::Global(g) => &g.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_def_span_is_reachable_through_external_decl() {
        let f = FunctionDef {
            name: "main".into(),
            return_type: CType::SINT,
            params: vec![],
            variadic: false,
            body: Stmt::Compound { items: vec![], span: SourceSpan::default() },
            span: SourceSpan::default(),
        };
        let ext = ExternalDecl::Function(f);
        assert_eq!(*ext.span(), SourceSpan::default());
    }
}

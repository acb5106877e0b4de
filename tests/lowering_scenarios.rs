//! End-to-end scenarios driving `lower_translation_unit` the way a caller
//! outside this crate would, checked against the emitted `IrModule` rather
//! than against any internal helper.

use c99ir::arch::lp64;
use c99ir::ast::{
    BinaryOp, CParamDecl, Declarator, Expr, ExternalDecl, FunctionDef, GlobalDecl, Initializer,
    LocalDecl, Stmt, TranslationUnit,
};
use c99ir::config::LoweringConfig;
use c99ir::lower::lower_translation_unit;
use c99ir::location::source_span::SourceSpan;
use c99ir::types::CType;

fn sp() -> SourceSpan {
    SourceSpan::default()
}

fn unit(decls: Vec<ExternalDecl>) -> TranslationUnit {
    TranslationUnit { decls }
}

/// `int main(void) { return 0; }` — one function, no globals, zero errors.
#[test]
fn return_constant_produces_a_single_return_instruction() {
    let main = FunctionDef {
        name: "main".into(),
        return_type: CType::SINT,
        params: vec![],
        variadic: false,
        body: Stmt::Return { value: Some(Expr::IntLiteral { value: 0, span: sp() }), span: sp() },
        span: sp(),
    };
    let ast = unit(vec![ExternalDecl::Function(main)]);
    let (module, errors) = lower_translation_unit(&ast, &lp64(), &LoweringConfig::default()).unwrap();

    assert!(errors.is_empty());
    assert!(module.globals.is_empty());
    assert_eq!(module.functions.len(), 1);
    let f = module.function("main").unwrap();
    assert!(matches!(f.body.last(), Some(i) if i.is_terminator()));
}

/// `int a = 5; int main(){ return a + 1; }` — a constant global read back
/// inside an arithmetic expression.
#[test]
fn global_initializer_is_readable_from_a_function_body() {
    let global = GlobalDecl {
        tag_def: None,
        declarators: vec![Declarator {
            name: "a".into(),
            ty: CType::SINT,
            init: Some(Initializer::Expr(Expr::IntLiteral { value: 5, span: sp() })),
            span: sp(),
        }],
        span: sp(),
    };
    let main = FunctionDef {
        name: "main".into(),
        return_type: CType::SINT,
        params: vec![],
        variadic: false,
        body: Stmt::Return {
            value: Some(Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::Ident { name: "a".into(), span: sp() }),
                right: Box::new(Expr::IntLiteral { value: 1, span: sp() }),
                span: sp(),
            }),
            span: sp(),
        },
        span: sp(),
    };
    let ast = unit(vec![ExternalDecl::Global(global), ExternalDecl::Function(main)]);
    let (module, errors) = lower_translation_unit(&ast, &lp64(), &LoweringConfig::default()).unwrap();

    assert!(errors.is_empty());
    assert_eq!(module.globals.len(), 1);
    assert!(module.globals[0].initialized);

    let f = module.function("main").unwrap();
    assert!(f.body.iter().any(|i| matches!(i, c99ir::ir::instruction::Instruction::Load { .. })));
    assert!(f.body.iter().any(|i| matches!(i, c99ir::ir::instruction::Instruction::Arith { .. })));
}

/// `int f(int *p){ return p[2]; }` — pointer parameter, subscript lowers to
/// an explicit element-address computation followed by a load.
#[test]
fn pointer_parameter_subscript_lowers_to_element_ptr_then_load() {
    let f = FunctionDef {
        name: "f".into(),
        return_type: CType::SINT,
        params: vec![CParamDecl { name: "p".into(), ty: CType::SINT.pointer_to(), span: sp() }],
        variadic: false,
        body: Stmt::Return {
            value: Some(Expr::Subscript {
                base: Box::new(Expr::Ident { name: "p".into(), span: sp() }),
                index: Box::new(Expr::IntLiteral { value: 2, span: sp() }),
                span: sp(),
            }),
            span: sp(),
        },
        span: sp(),
    };
    let ast = unit(vec![ExternalDecl::Function(f)]);
    let (module, errors) = lower_translation_unit(&ast, &lp64(), &LoweringConfig::default()).unwrap();

    assert!(errors.is_empty());
    let func = module.function("f").unwrap();
    assert!(func.body.iter().any(|i| matches!(i, c99ir::ir::instruction::Instruction::GetArrayElementPtr { .. })));
    assert!(func.params.len() == 1);
}

/// `int main(){ int i=0; while(i<3) i=i+1; return i; }` — a `while` loop
/// lowers to a label triple with the negated condition branching past the
/// body, matching the non-SSA control-flow scheme.
#[test]
fn while_loop_lowers_to_label_triple_with_negated_branch() {
    let body = Stmt::Compound {
        items: vec![
            c99ir::ast::BlockItem::Decl(LocalDecl {
                tag_def: None,
                declarators: vec![Declarator {
                    name: "i".into(),
                    ty: CType::SINT,
                    init: Some(Initializer::Expr(Expr::IntLiteral { value: 0, span: sp() })),
                    span: sp(),
                }],
                span: sp(),
            }),
            c99ir::ast::BlockItem::Stmt(Stmt::While {
                cond: Expr::Binary {
                    op: BinaryOp::Lt,
                    left: Box::new(Expr::Ident { name: "i".into(), span: sp() }),
                    right: Box::new(Expr::IntLiteral { value: 3, span: sp() }),
                    span: sp(),
                },
                body: Box::new(Stmt::Expr {
                    expr: Expr::Assign {
                        target: Box::new(Expr::Ident { name: "i".into(), span: sp() }),
                        value: Box::new(Expr::Binary {
                            op: BinaryOp::Add,
                            left: Box::new(Expr::Ident { name: "i".into(), span: sp() }),
                            right: Box::new(Expr::IntLiteral { value: 1, span: sp() }),
                            span: sp(),
                        }),
                        span: sp(),
                    },
                    span: sp(),
                }),
                span: sp(),
            }),
            c99ir::ast::BlockItem::Stmt(Stmt::Return {
                value: Some(Expr::Ident { name: "i".into(), span: sp() }),
                span: sp(),
            }),
        ],
        span: sp(),
    };
    let main = FunctionDef { name: "main".into(), return_type: CType::SINT, params: vec![], variadic: false, body, span: sp() };
    let ast = unit(vec![ExternalDecl::Function(main)]);
    let (module, errors) = lower_translation_unit(&ast, &lp64(), &LoweringConfig::default()).unwrap();

    assert!(errors.is_empty());
    let f = module.function("main").unwrap();
    let br_cond_count = f.body.iter().filter(|i| matches!(i, c99ir::ir::instruction::Instruction::BrCond { .. })).count();
    let br_count = f.body.iter().filter(|i| matches!(i, c99ir::ir::instruction::Instruction::Br { .. })).count();
    assert_eq!(br_cond_count, 1);
    assert_eq!(br_count, 1);

    // alloca precedes every non-alloca instruction (invariant 1 of the
    // testable properties: allocas form a prologue).
    let first_non_alloca = f.body.iter().position(|i| !i.is_alloca());
    if let Some(idx) = first_non_alloca {
        assert!(f.body[..idx].iter().all(|i| i.is_alloca()));
    }
}

/// `struct P{int x;int y;}; int f(struct P *p){ return p->y; }` — a struct
/// tag gets a layout registered in the module's type map, and member access
/// lowers to an explicit field-address computation.
#[test]
fn struct_member_access_registers_tag_layout_and_lowers_to_member_ptr() {
    use c99ir::types::c_type::CField;
    use std::sync::Arc;

    let p_ty = CType::StructOrUnion {
        is_union: false,
        tag_ident: Some(Arc::from("P")),
        has_body: true,
        fields: vec![
            CField { name: Arc::from("x"), ty: CType::SINT, declared_index: 0 },
            CField { name: Arc::from("y"), ty: CType::SINT, declared_index: 1 },
        ],
        packed: false,
    };
    let f = FunctionDef {
        name: "f".into(),
        return_type: CType::SINT,
        params: vec![CParamDecl { name: "p".into(), ty: p_ty.clone().pointer_to(), span: sp() }],
        variadic: false,
        body: Stmt::Return {
            value: Some(Expr::Member {
                base: Box::new(Expr::Ident { name: "p".into(), span: sp() }),
                field: "y".into(),
                arrow: true,
                span: sp(),
            }),
            span: sp(),
        },
        span: sp(),
    };
    let global = GlobalDecl { tag_def: Some(p_ty), declarators: vec![], span: sp() };
    let ast = unit(vec![ExternalDecl::Global(global), ExternalDecl::Function(f)]);
    let (module, errors) = lower_translation_unit(&ast, &lp64(), &LoweringConfig::default()).unwrap();

    assert!(errors.is_empty());
    assert_eq!(module.type_map.len(), 1);
    let func = module.function("f").unwrap();
    assert!(func.body.iter().any(|i| matches!(i, c99ir::ir::instruction::Instruction::GetStructMemberPtr { field_index: 1, .. })));
}

/// `struct N { struct N *next; };` — a self-referential struct tag
/// completes: the `next` field's pointer resolves against `N`'s own uid
/// while `N` is still incomplete, rather than failing to resolve.
#[test]
fn self_referential_struct_tag_completes() {
    use c99ir::types::c_type::CField;
    use c99ir::types::IrType;
    use std::sync::Arc;

    let self_ptr = CType::StructOrUnion {
        is_union: false,
        tag_ident: Some(Arc::from("N")),
        has_body: false,
        fields: vec![],
        packed: false,
    }
    .pointer_to();
    let n_ty = CType::StructOrUnion {
        is_union: false,
        tag_ident: Some(Arc::from("N")),
        has_body: true,
        fields: vec![CField { name: Arc::from("next"), ty: self_ptr, declared_index: 0 }],
        packed: false,
    };
    let global = GlobalDecl { tag_def: Some(n_ty), declarators: vec![], span: sp() };
    let ast = unit(vec![ExternalDecl::Global(global)]);
    let (module, errors) = lower_translation_unit(&ast, &lp64(), &LoweringConfig::default()).unwrap();

    assert!(errors.is_empty());
    assert_eq!(module.type_map.len(), 1);
    let ir = module.type_map.values().next().unwrap();
    let fields = match ir {
        IrType::StructOrUnion { fields, .. } => fields,
        other => panic!("expected a struct layout, got {other:?}"),
    };
    assert_eq!(fields.len(), 1);
    match &fields[0].ty {
        IrType::Ptr(inner) => assert!(matches!(inner.as_ref(), IrType::StructOrUnion { fields, .. } if fields.is_empty())),
        other => panic!("expected `next` to be a pointer, got {other:?}"),
    }
}

/// `struct N; ... struct N *p;` — a bare forward declaration interns an
/// incomplete tag, so a later pointer-to-`N` declarator resolves.
#[test]
fn forward_declared_tag_resolves_a_later_pointer_declarator() {
    let forward = CType::StructOrUnion {
        is_union: false,
        tag_ident: Some(std::sync::Arc::from("N")),
        has_body: false,
        fields: vec![],
        packed: false,
    };
    let forward_decl = GlobalDecl { tag_def: Some(forward.clone()), declarators: vec![], span: sp() };
    let pointer_decl = GlobalDecl {
        tag_def: None,
        declarators: vec![Declarator { name: "p".into(), ty: forward.pointer_to(), init: None, span: sp() }],
        span: sp(),
    };
    let ast = unit(vec![ExternalDecl::Global(forward_decl), ExternalDecl::Global(pointer_decl)]);
    let (module, errors) = lower_translation_unit(&ast, &lp64(), &LoweringConfig::default()).unwrap();

    assert!(errors.is_empty());
    assert_eq!(module.globals.len(), 1);
}

/// Calling a function twice with the same name is a diagnostic, not a panic
/// or a fatal abort — the pass keeps going and still emits the first
/// definition.
#[test]
fn redefining_a_function_is_a_non_fatal_diagnostic() {
    let def = |span: SourceSpan| FunctionDef {
        name: "f".into(),
        return_type: CType::Void,
        params: vec![],
        variadic: false,
        body: Stmt::Compound { items: vec![], span: span.clone() },
        span,
    };
    let ast = unit(vec![ExternalDecl::Function(def(sp())), ExternalDecl::Function(def(sp()))]);
    let (module, errors) = lower_translation_unit(&ast, &lp64(), &LoweringConfig::default()).unwrap();

    assert_eq!(errors.len(), 1);
    assert_eq!(module.functions.len(), 1);
}

/// Architecture-descriptor internal consistency (§8 ambient-stack coverage):
/// `size_in_bytes` agrees with `size_in_bits` for a pointer type, and the
/// pointer-sized integer type used for arithmetic matches the pointer's own
/// width.
#[test]
fn lp64_pointer_width_is_internally_consistent() {
    let arch = lp64();
    let ptr_ty = c99ir::types::IrType::ptr(c99ir::types::IrType::I32);
    let bits = arch.size_in_bits(&ptr_ty);
    assert_eq!(bits % 8, 0);
    assert_eq!(arch.size_in_bytes(&ptr_ty), bits / 8);
    assert_eq!(arch.size_in_bits(&arch.ptr_int_type()), bits);
}

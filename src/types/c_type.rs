// src/types/c_type.rs
use std::sync::Arc;

/// Integer width class, independent of signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntSize {
    Char,
    Short,
    Int,
    Long,
    LongLong,
}

/// Floating-point width class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatSize {
    Float,
    Double,
    LongDouble,
}

/// A field of a struct or union, as declared in source (before layout/padding).
#[derive(Debug, Clone, PartialEq)]
pub struct CField {
    pub name: Arc<str>,
    pub ty: CType,
    pub declared_index: usize,
}

/// A function parameter's declared C type and (optional) name.
#[derive(Debug, Clone, PartialEq)]
pub struct CParam {
    pub ty: CType,
    pub name: Option<Arc<str>>,
}

/// The C type system as seen by the lowering pass: a tagged variant mirroring
/// C99's type grammar, carrying enough structure (ordered fields, ordered
/// parameters, declared indices) to drive both type-checking and struct
/// layout. Array element counts may be non-constant expressions in the
/// grammar the parser accepts, but this pass requires a resolved constant
/// length (a non-constant length is `CompileError::UnimplementedConstruct`,
/// per the open questions in the specification).
#[derive(Debug, Clone, PartialEq)]
pub enum CType {
    Void,
    Bool,
    Integer { signed: bool, size: IntSize },
    Floating(FloatSize),
    Pointer(Box<CType>),
    Array { element: Box<CType>, length: Option<usize> },
    Function { ret: Box<CType>, params: Vec<CParam>, variadic: bool },
    StructOrUnion {
        is_union: bool,
        tag_ident: Option<Arc<str>>,
        has_body: bool,
        fields: Vec<CField>,
        packed: bool,
    },
}

/// A `CType` paired with its `const` qualifier. Lowering tracks qualification
/// separately from shape because two otherwise-identical types differing
/// only in `const` still unify for arithmetic and assignment-compatibility
/// purposes, but differ for assignability.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedCType {
    pub ty: CType,
    pub is_const: bool,
}

impl QualifiedCType {
    pub fn new(ty: CType) -> Self {
        Self { ty, is_const: false }
    }

    pub fn new_const(ty: CType) -> Self {
        Self { ty, is_const: true }
    }
}

impl CType {
    pub const SCHAR: CType = CType::Integer { signed: true, size: IntSize::Char };
    pub const UCHAR: CType = CType::Integer { signed: false, size: IntSize::Char };
    pub const SINT: CType = CType::Integer { signed: true, size: IntSize::Int };
    pub const UINT: CType = CType::Integer { signed: false, size: IntSize::Int };
    pub const SLONG: CType = CType::Integer { signed: true, size: IntSize::Long };

    pub fn pointer_to(self) -> CType {
        CType::Pointer(Box::new(self))
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, CType::Bool | CType::Integer { .. } | CType::Floating(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, CType::Bool | CType::Integer { .. })
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, CType::Floating(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, CType::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, CType::Array { .. })
    }

    pub fn is_scalar(&self) -> bool {
        self.is_arithmetic() || self.is_pointer()
    }

    pub fn is_void(&self) -> bool {
        matches!(self, CType::Void)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, CType::Function { .. })
    }

    pub fn is_struct_or_union(&self) -> bool {
        matches!(self, CType::StructOrUnion { .. })
    }

    /// The element type of an array or the pointee of a pointer, i.e. the
    /// type array-to-pointer decay produces when applied to this type.
    pub fn decayed(&self) -> CType {
        match self {
            CType::Array { element, .. } => (**element).clone().pointer_to(),
            other => other.clone(),
        }
    }

    pub fn pointee(&self) -> Option<&CType> {
        match self {
            CType::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&CType> {
        match self {
            CType::Array { element, .. } => Some(element),
            _ => None,
        }
    }
}

impl std::fmt::Display for CType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CType::Void => write!(f, "void"),
            CType::Bool => write!(f, "_Bool"),
            CType::Integer { signed, size } => {
                let base = match size {
                    IntSize::Char => "char",
                    IntSize::Short => "short",
                    IntSize::Int => "int",
                    IntSize::Long => "long",
                    IntSize::LongLong => "long long",
                };
                if *signed {
                    write!(f, "{base}")
                } else {
                    write!(f, "unsigned {base}")
                }
            }
            CType::Floating(FloatSize::Float) => write!(f, "float"),
            CType::Floating(FloatSize::Double) => write!(f, "double"),
            CType::Floating(FloatSize::LongDouble) => write!(f, "long double"),
            CType::Pointer(inner) => write!(f, "{inner}*"),
            CType::Array { element, length: Some(n) } => write!(f, "{element}[{n}]"),
            CType::Array { element, length: None } => write!(f, "{element}[]"),
            CType::Function { ret, params, variadic } => {
                let mut parts: Vec<String> = params.iter().map(|p| p.ty.to_string()).collect();
                if *variadic {
                    parts.push("...".to_string());
                }
                write!(f, "{ret} ({})", parts.join(", "))
            }
            CType::StructOrUnion { is_union, tag_ident, .. } => {
                let kw = if *is_union { "union" } else { "struct" };
                match tag_ident {
                    Some(name) => write!(f, "{kw} {name}"),
                    None => write!(f, "{kw} <anonymous>"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_decays_to_pointer_to_element() {
        let arr = CType::Array { element: Box::new(CType::SINT), length: Some(4) };
        assert_eq!(arr.decayed(), CType::SINT.pointer_to());
    }

    #[test]
    fn non_array_decays_to_itself() {
        assert_eq!(CType::SINT.decayed(), CType::SINT);
    }

    #[test]
    fn display_matches_c_spelling() {
        assert_eq!(CType::UINT.to_string(), "unsigned int");
        assert_eq!(CType::SINT.pointer_to().to_string(), "int*");
    }
}

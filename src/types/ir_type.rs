// src/types/ir_type.rs
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A struct or union field after layout has run: its declared name, its IR
/// type, and its index in the field list (padding fields are anonymous and
/// excluded from `field_map`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IrField {
    pub name: Option<Arc<str>>,
    pub ty: IrType,
    pub index: usize,
}

/// The intermediate representation's type system, with every primitive
/// width already resolved by an [`crate::arch::ArchDescriptor`] — unlike the
/// C type model, there is no architecture-dependent ambiguity left once a
/// value of this type exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Ptr(Box<IrType>),
    Array { element: Box<IrType>, length: usize },
    Function { ret: Box<IrType>, params: Vec<IrType>, variadic: bool },
    StructOrUnion { uid: Arc<str>, is_union: bool, fields: Vec<IrField> },
}

impl IrType {
    pub fn ptr(pointee: IrType) -> Self {
        IrType::Ptr(Box::new(pointee))
    }

    pub fn array(element: IrType, length: usize) -> Self {
        IrType::Array { element: Box::new(element), length }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            IrType::I8
                | IrType::I16
                | IrType::I32
                | IrType::I64
                | IrType::U8
                | IrType::U16
                | IrType::U32
                | IrType::U64
                | IrType::Bool
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, IrType::I8 | IrType::I16 | IrType::I32 | IrType::I64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IrType::F32 | IrType::F64)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, IrType::Ptr(_))
    }

    pub fn is_scalar(&self) -> bool {
        self.is_integer() || self.is_float() || self.is_pointer()
    }

    pub fn pointee(&self) -> Option<&IrType> {
        match self {
            IrType::Ptr(inner) => Some(inner),
            _ => None,
        }
    }

    /// Looks up a struct/union field by name, returning its 0-based index
    /// among all fields (including anonymous padding) and a reference to it.
    pub fn field(&self, name: &str) -> Option<&IrField> {
        match self {
            IrType::StructOrUnion { fields, .. } => {
                fields.iter().find(|f| f.name.as_deref() == Some(name))
            }
            _ => None,
        }
    }

    /// Builds the name→field lookup table described by the specification's
    /// `field_map`. Computed on demand rather than stored, since the field
    /// list itself is the single source of truth and recomputation is cheap
    /// relative to the one-time cost of struct-layout construction.
    pub fn field_map(&self) -> HashMap<&str, &IrField> {
        match self {
            IrType::StructOrUnion { fields, .. } => {
                fields.iter().filter_map(|f| f.name.as_deref().map(|n| (n, f))).collect()
            }
            _ => HashMap::new(),
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Bool => write!(f, "i1"),
            IrType::I8 => write!(f, "i8"),
            IrType::I16 => write!(f, "i16"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::U8 => write!(f, "u8"),
            IrType::U16 => write!(f, "u16"),
            IrType::U32 => write!(f, "u32"),
            IrType::U64 => write!(f, "u64"),
            IrType::F32 => write!(f, "f32"),
            IrType::F64 => write!(f, "f64"),
            IrType::Ptr(inner) => write!(f, "{inner}*"),
            IrType::Array { element, length } => write!(f, "[{element} x {length}]"),
            IrType::Function { ret, params, variadic } => {
                let mut parts: Vec<String> = params.iter().map(ToString::to_string).collect();
                if *variadic {
                    parts.push("...".to_string());
                }
                write!(f, "{ret} ({})", parts.join(", "))
            }
            IrType::StructOrUnion { uid, is_union, .. } => {
                write!(f, "{} {uid}", if *is_union { "union" } else { "struct" })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup_finds_by_name() {
        let ty = IrType::StructOrUnion {
            uid: Arc::from("P_0"),
            is_union: false,
            fields: vec![
                IrField { name: Some(Arc::from("x")), ty: IrType::I32, index: 0 },
                IrField { name: Some(Arc::from("y")), ty: IrType::I32, index: 1 },
            ],
        };
        assert_eq!(ty.field("y").unwrap().index, 1);
        assert!(ty.field("z").is_none());
    }

    #[test]
    fn ptr_and_array_constructors_box_the_element() {
        let p = IrType::ptr(IrType::I32);
        assert_eq!(p.pointee(), Some(&IrType::I32));
        let a = IrType::array(IrType::I8, 4);
        assert!(matches!(a, IrType::Array { length: 4, .. }));
    }
}

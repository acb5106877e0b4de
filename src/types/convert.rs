// src/types/convert.rs
//! C-type → IR-type resolution and the arithmetic-conversion rules
//! (integer promotion, usual arithmetic conversions) that binary/comparison/
//! call lowering apply before emitting an instruction. The promotion
//! hierarchy mirrors a teacher type-checker's hand-ranked table, generalized
//! to operate on already-arch-resolved `IrType`s instead of a fixed set of
//! language-specific numeric types.
use crate::arch::ArchDescriptor;
use crate::types::c_type::{CType, FloatSize, IntSize};
use crate::types::ir_type::IrType;
use std::sync::Arc;

/// Converts a declared C type into its IR representation. A direct (by-value)
/// struct/union reference is resolved via `struct_ir`, which looks up the
/// already-built (padded) IR type for a tag by its source identifier — tag
/// completion (§4.2) is responsible for populating that table before any
/// by-value reference is converted, since a by-value member needs the tag's
/// full field layout.
///
/// A pointer to a tagged struct/union is resolved differently, via `tag_uid`:
/// it only needs the tag's identity (its uid and union-ness), not its layout,
/// so it resolves as soon as the tag has been declared — complete or not.
/// This is what makes a recursive or forward-declared tag representable:
/// `struct N { struct N *next; };` resolves `next`'s pointee against `N`'s
/// uid while `N` itself is still incomplete.
///
/// Returns `Err("non-constant array length")` for an `Array` whose length
/// wasn't resolved to a constant, and `Err("incomplete or unknown tag")` for
/// a struct/union reference neither callback can resolve — both are surfaced
/// by the caller as `CompileError::UnimplementedConstruct` or a
/// tag-resolution error respectively, since this module carries no
/// `SourceSpan`.
pub fn c_to_ir(
    arch: &ArchDescriptor,
    ty: &CType,
    struct_ir: &impl Fn(&str) -> Option<IrType>,
    tag_uid: &impl Fn(&str) -> Option<Arc<str>>,
) -> Result<IrType, &'static str> {
    Ok(match ty {
        CType::Void => IrType::Void,
        CType::Bool => IrType::Bool,
        CType::Integer { signed, size } => match (signed, size) {
            (true, IntSize::Char) => arch.schar(),
            (false, IntSize::Char) => arch.uchar(),
            (true, IntSize::Short) => arch.sshort(),
            (false, IntSize::Short) => arch.ushort(),
            (true, IntSize::Int) => arch.sint(),
            (false, IntSize::Int) => arch.uint(),
            (true, IntSize::Long) => arch.slong(),
            (false, IntSize::Long) => arch.ulong(),
            (true, IntSize::LongLong) => arch.slonglong(),
            (false, IntSize::LongLong) => arch.ulonglong(),
        },
        CType::Floating(FloatSize::Float) => arch.float(),
        CType::Floating(FloatSize::Double) => arch.double(),
        CType::Floating(FloatSize::LongDouble) => arch.long_double(),
        CType::Pointer(inner) => match inner.as_ref() {
            CType::StructOrUnion { tag_ident: Some(tag), is_union, .. } => {
                let uid = tag_uid(tag).ok_or("incomplete or unknown tag")?;
                IrType::ptr(IrType::StructOrUnion { uid, is_union: *is_union, fields: Vec::new() })
            }
            other => IrType::ptr(c_to_ir(arch, other, struct_ir, tag_uid)?),
        },
        CType::Array { element, length: Some(n) } => IrType::array(c_to_ir(arch, element, struct_ir, tag_uid)?, *n),
        CType::Array { length: None, .. } => return Err("non-constant array length"),
        CType::Function { ret, params, variadic } => IrType::Function {
            ret: Box::new(c_to_ir(arch, ret, struct_ir, tag_uid)?),
            params: params.iter().map(|p| c_to_ir(arch, &p.ty, struct_ir, tag_uid)).collect::<Result<_, _>>()?,
            variadic: *variadic,
        },
        CType::StructOrUnion { tag_ident: Some(tag), .. } => {
            struct_ir(tag).ok_or("incomplete or unknown tag")?
        }
        CType::StructOrUnion { tag_ident: None, .. } => return Err("incomplete or unknown tag"),
    })
}

/// Rank used by the usual arithmetic conversions; higher sorts first.
/// Floats outrank all integers; among integers, wider outranks narrower and,
/// at equal width, unsigned outranks signed (C99 6.3.1.8).
fn rank(ty: &IrType) -> u8 {
    match ty {
        IrType::F64 => 100,
        IrType::F32 => 90,
        IrType::U64 => 80,
        IrType::I64 => 79,
        IrType::U32 => 70,
        IrType::I32 => 69,
        IrType::U16 => 60,
        IrType::I16 => 59,
        IrType::U8 => 50,
        IrType::I8 => 49,
        IrType::Bool => 40,
        _ => 0,
    }
}

/// Integer promotion (C99 6.3.1.1): anything narrower than `int` widens to
/// `int`. Already-`int`-or-wider integers, floats, pointers, and aggregates
/// pass through unchanged.
pub fn integer_promote(ty: &IrType) -> IrType {
    match ty {
        IrType::Bool | IrType::I8 | IrType::U8 | IrType::I16 | IrType::U16 => IrType::I32,
        other => other.clone(),
    }
}

/// Default argument promotion applied to variadic call arguments (C99
/// 6.5.2.2p7): integer promotion, plus `float` widens to `double`.
pub fn default_argument_promote(ty: &IrType) -> IrType {
    match ty {
        IrType::F32 => IrType::F64,
        other => integer_promote(other),
    }
}

/// The usual arithmetic conversions (C99 6.3.1.8), computed directly over
/// already-arch-resolved IR types: both operands are integer-promoted, then
/// the one with lower rank converts to match the other's type.
pub fn common_arith_type(a: &IrType, b: &IrType) -> IrType {
    let a = integer_promote(a);
    let b = integer_promote(b);
    if a == b {
        return a;
    }
    if rank(&a) >= rank(&b) { a } else { b }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::lp64;

    #[test]
    fn sub_int_types_promote_to_i32() {
        assert_eq!(integer_promote(&IrType::I8), IrType::I32);
        assert_eq!(integer_promote(&IrType::Bool), IrType::I32);
        assert_eq!(integer_promote(&IrType::I64), IrType::I64);
    }

    #[test]
    fn common_type_prefers_float_over_integer() {
        assert_eq!(common_arith_type(&IrType::F32, &IrType::I32), IrType::F32);
        assert_eq!(common_arith_type(&IrType::F64, &IrType::F32), IrType::F64);
    }

    #[test]
    fn common_type_of_equal_rank_signed_and_unsigned_prefers_unsigned() {
        assert_eq!(common_arith_type(&IrType::I32, &IrType::U32), IrType::U32);
    }

    #[test]
    fn default_argument_promotion_widens_float_to_double() {
        assert_eq!(default_argument_promote(&IrType::F32), IrType::F64);
        assert_eq!(default_argument_promote(&IrType::I8), IrType::I32);
    }

    #[test]
    fn c_to_ir_resolves_primitives_via_arch() {
        let arch = lp64();
        let ir = c_to_ir(&arch, &CType::SINT, &|_| None, &|_| None).unwrap();
        assert_eq!(ir, IrType::I32);
    }

    #[test]
    fn c_to_ir_rejects_non_constant_array_length() {
        let arch = lp64();
        let ty = CType::Array { element: Box::new(CType::SINT), length: None };
        assert_eq!(c_to_ir(&arch, &ty, &|_| None, &|_| None), Err("non-constant array length"));
    }

    #[test]
    fn c_to_ir_resolves_pointer_to_tag_by_uid_without_requiring_completion() {
        use crate::types::c_type::CType as C;
        use std::sync::Arc as A;
        let arch = lp64();
        let ty = C::Pointer(Box::new(C::StructOrUnion {
            is_union: false,
            tag_ident: Some(A::from("N")),
            has_body: false,
            fields: vec![],
            packed: false,
        }));
        let ir = c_to_ir(&arch, &ty, &|_| None, &|name| (name == "N").then(|| A::from("N_0"))).unwrap();
        assert_eq!(ir, IrType::ptr(IrType::StructOrUnion { uid: A::from("N_0"), is_union: false, fields: vec![] }));
    }
}

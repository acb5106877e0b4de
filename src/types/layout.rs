// src/types/layout.rs
//! Struct/union layout: the padding pass that turns a raw, unpadded field
//! list into an [`IrType::StructOrUnion`] whose fields satisfy their natural
//! alignment, with anonymous filler fields inserted between them.
use crate::arch::ArchDescriptor;
use crate::types::ir_type::{IrField, IrType};
use std::sync::Arc;

/// Builds a padded struct/union IR type from an ordered, unpadded field
/// list. For a union, every member starts at offset 0 and the type's size is
/// the widest/most-aligned member's size; no padding fields are inserted
/// between union members (they overlap by definition).
pub fn build_struct_or_union(
    arch: &ArchDescriptor,
    uid: Arc<str>,
    is_union: bool,
    raw_fields: Vec<(Option<Arc<str>>, IrType)>,
    packed: bool,
) -> IrType {
    if is_union {
        let fields = raw_fields
            .into_iter()
            .enumerate()
            .map(|(index, (name, ty))| IrField { name, ty, index })
            .collect();
        return IrType::StructOrUnion { uid, is_union: true, fields };
    }

    let mut fields = Vec::with_capacity(raw_fields.len());
    let mut offset: u32 = 0;
    let mut pad_counter = 0usize;

    for (name, ty) in raw_fields {
        let align = if packed { 1 } else { arch.align_of(&ty) };
        let misalignment = offset % align.max(1);
        if misalignment != 0 {
            let pad_bytes = align - misalignment;
            fields.push(IrField {
                name: None,
                ty: IrType::array(IrType::I8, pad_bytes as usize),
                index: fields.len(),
            });
            offset += pad_bytes;
            pad_counter += 1;
        }
        let index = fields.len();
        let size = arch.size_in_bytes(&ty);
        fields.push(IrField { name, ty, index });
        offset += size;
    }

    let _ = pad_counter; // retained for symmetry with a future alignment-diagnostics pass
    IrType::StructOrUnion { uid, is_union: false, fields }
}

/// Byte size of a struct/union: the sum of its (already-padded) fields for a
/// struct, or the size of its widest field for a union.
pub fn size_in_bytes(arch: &ArchDescriptor, ty: &IrType) -> u32 {
    match ty {
        IrType::StructOrUnion { is_union: false, fields, .. } => {
            fields.iter().map(|f| arch.size_in_bytes(&f.ty)).sum()
        }
        IrType::StructOrUnion { is_union: true, fields, .. } => {
            fields.iter().map(|f| arch.size_in_bytes(&f.ty)).max().unwrap_or(0)
        }
        other => arch.size_in_bytes(other),
    }
}

/// Alignment of a struct/union: the maximum alignment of any member (C99's
/// rule), regardless of struct vs. union.
pub fn align_of_bytes(arch: &ArchDescriptor, ty: &IrType) -> u32 {
    match ty {
        IrType::StructOrUnion { fields, .. } => {
            fields.iter().map(|f| arch.align_of(&f.ty)).max().unwrap_or(1)
        }
        other => arch.size_in_bytes(other).max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::lp64;

    #[test]
    fn struct_pads_field_to_its_alignment() {
        let arch = lp64();
        // struct { char c; int x; } -> pad 3 bytes between c and x on LP64.
        let ty = build_struct_or_union(
            &arch,
            Arc::from("S_0"),
            false,
            vec![(Some(Arc::from("c")), IrType::I8), (Some(Arc::from("x")), IrType::I32)],
            false,
        );
        assert_eq!(size_in_bytes(&arch, &ty), 8);
        assert_eq!(ty.field("x").unwrap().index, 2); // [c, pad, x]
    }

    #[test]
    fn packed_struct_has_no_padding() {
        let arch = lp64();
        let ty = build_struct_or_union(
            &arch,
            Arc::from("S_1"),
            false,
            vec![(Some(Arc::from("c")), IrType::I8), (Some(Arc::from("x")), IrType::I32)],
            true,
        );
        assert_eq!(size_in_bytes(&arch, &ty), 5);
    }

    #[test]
    fn union_size_is_the_widest_member() {
        let arch = lp64();
        let ty = build_struct_or_union(
            &arch,
            Arc::from("U_0"),
            true,
            vec![(Some(Arc::from("i")), IrType::I32), (Some(Arc::from("d")), IrType::F64)],
            false,
        );
        assert_eq!(size_in_bytes(&arch, &ty), 8);
    }
}

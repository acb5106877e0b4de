// src/arch.rs
//! The architecture descriptor: the single value through which every
//! arch-dependent width decision in the lowering pass is routed, named and
//! shaped after the teacher's platform/data-layout configuration pair but
//! pared down to exactly what lowering needs — IR types for the C
//! primitives and a pointer-sized integer type — rather than a full
//! LLVM-style datalayout string. The pass never inspects the host platform;
//! a descriptor is always supplied by the caller.
use crate::types::ir_type::IrType;

/// Width/signedness resolution for every C primitive type, plus the integer
/// type used for pointer arithmetic and `sizeof`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchDescriptor {
    pub name: &'static str,
    schar: IrType,
    sshort: IrType,
    sint: IrType,
    slong: IrType,
    slonglong: IrType,
    uchar: IrType,
    ushort: IrType,
    uint: IrType,
    ulong: IrType,
    ulonglong: IrType,
    float: IrType,
    double: IrType,
    long_double: IrType,
    ptr_int_type: IrType,
}

impl ArchDescriptor {
    pub fn schar(&self) -> IrType {
        self.schar.clone()
    }
    pub fn sshort(&self) -> IrType {
        self.sshort.clone()
    }
    pub fn sint(&self) -> IrType {
        self.sint.clone()
    }
    pub fn slong(&self) -> IrType {
        self.slong.clone()
    }
    pub fn slonglong(&self) -> IrType {
        self.slonglong.clone()
    }
    pub fn uchar(&self) -> IrType {
        self.uchar.clone()
    }
    pub fn ushort(&self) -> IrType {
        self.ushort.clone()
    }
    pub fn uint(&self) -> IrType {
        self.uint.clone()
    }
    pub fn ulong(&self) -> IrType {
        self.ulong.clone()
    }
    pub fn ulonglong(&self) -> IrType {
        self.ulonglong.clone()
    }
    pub fn float(&self) -> IrType {
        self.float.clone()
    }
    pub fn double(&self) -> IrType {
        self.double.clone()
    }
    pub fn long_double(&self) -> IrType {
        self.long_double.clone()
    }

    /// The unsigned integer type wide enough to hold a pointer, used for
    /// `sizeof` results and for scaling pointer arithmetic.
    pub fn ptr_int_type(&self) -> IrType {
        self.ptr_int_type.clone()
    }

    /// Width of `ty` in bits. Aggregate types recurse; this is the primitive
    /// leaf of the layout engine in [`crate::types::layout`].
    pub fn size_in_bits(&self, ty: &IrType) -> u32 {
        match ty {
            IrType::Void => 0,
            IrType::Bool | IrType::I8 | IrType::U8 => 8,
            IrType::I16 | IrType::U16 => 16,
            IrType::I32 | IrType::U32 | IrType::F32 => 32,
            IrType::I64 | IrType::U64 | IrType::F64 => 64,
            IrType::Ptr(_) | IrType::Function { .. } => self.size_in_bits(&self.ptr_int_type),
            IrType::Array { element, length } => self.size_in_bits(element) * *length as u32,
            IrType::StructOrUnion { .. } => crate::types::layout::size_in_bytes(self, ty) * 8,
        }
    }

    pub fn size_in_bytes(&self, ty: &IrType) -> u32 {
        self.size_in_bits(ty).div_ceil(8)
    }

    /// Natural alignment of `ty`, in bytes.
    pub fn align_of(&self, ty: &IrType) -> u32 {
        match ty {
            IrType::StructOrUnion { .. } => crate::types::layout::align_of_bytes(self, ty),
            IrType::Array { element, .. } => self.align_of(element),
            _ => self.size_in_bytes(ty).max(1),
        }
    }
}

/// LP64 preset (64-bit Linux/BSD/macOS on x86-64 or AArch64): `long` and
/// pointers are 64 bits, `int` is 32 bits. Named after the ABI data model,
/// matching the platform-preset idiom of a named enum of target configs
/// rather than host-detection.
pub fn lp64() -> ArchDescriptor {
    ArchDescriptor {
        name: "lp64",
        schar: IrType::I8,
        sshort: IrType::I16,
        sint: IrType::I32,
        slong: IrType::I64,
        slonglong: IrType::I64,
        uchar: IrType::U8,
        ushort: IrType::U16,
        uint: IrType::U32,
        ulong: IrType::U64,
        ulonglong: IrType::U64,
        float: IrType::F32,
        double: IrType::F64,
        long_double: IrType::F64,
        ptr_int_type: IrType::U64,
    }
}

/// ILP32 preset (32-bit x86/ARM): `int`, `long`, and pointers are 32 bits.
pub fn ilp32() -> ArchDescriptor {
    ArchDescriptor {
        name: "ilp32",
        schar: IrType::I8,
        sshort: IrType::I16,
        sint: IrType::I32,
        slong: IrType::I32,
        slonglong: IrType::I64,
        uchar: IrType::U8,
        ushort: IrType::U16,
        uint: IrType::U32,
        ulong: IrType::U32,
        ulonglong: IrType::U64,
        float: IrType::F32,
        double: IrType::F64,
        long_double: IrType::F64,
        ptr_int_type: IrType::U32,
    }
}

/// LLP64 preset (64-bit Windows): `long` stays 32 bits, pointers are 64 bits.
pub fn llp64() -> ArchDescriptor {
    ArchDescriptor {
        name: "llp64",
        schar: IrType::I8,
        sshort: IrType::I16,
        sint: IrType::I32,
        slong: IrType::I32,
        slonglong: IrType::I64,
        uchar: IrType::U8,
        ushort: IrType::U16,
        uint: IrType::U32,
        ulong: IrType::U32,
        ulonglong: IrType::U64,
        float: IrType::F32,
        double: IrType::F64,
        long_double: IrType::F64,
        ptr_int_type: IrType::U64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lp64_long_and_pointer_are_64_bit() {
        let arch = lp64();
        assert_eq!(arch.size_in_bits(&arch.slong()), 64);
        assert_eq!(arch.size_in_bits(&IrType::ptr(IrType::I32)), 64);
    }

    #[test]
    fn ilp32_long_is_32_bit() {
        let arch = ilp32();
        assert_eq!(arch.size_in_bits(&arch.slong()), 32);
    }

    #[test]
    fn size_in_bytes_rounds_up_from_bits() {
        let arch = lp64();
        assert_eq!(arch.size_in_bytes(&IrType::Bool), 1);
        assert_eq!(arch.size_in_bytes(&IrType::I64), 8);
    }

    #[test]
    fn array_size_scales_by_length() {
        let arch = lp64();
        let arr = IrType::array(IrType::I32, 4);
        assert_eq!(arch.size_in_bytes(&arr), 16);
    }
}

// src/ir/module.rs
use crate::arch::ArchDescriptor;
use crate::ir::instruction::Instruction;
use crate::ir::value::Value;
use crate::types::IrType;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub name: Arc<str>,
    pub ty: IrType,
    pub params: Vec<Value>,
    pub is_variadic: bool,
    pub body: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrGlobal {
    pub name: Arc<str>,
    /// Pointer to the global's storage; the pointee is the declared type.
    pub ir_type: IrType,
    pub initialized: bool,
    pub value: Value,
}

/// The pass's output: one function/global list per translation unit, plus
/// the tag-UID → struct/union type map every pointer-to-tag IR type keys
/// into.
#[derive(Debug, Clone, PartialEq)]
pub struct IrModule {
    pub name: String,
    pub architecture: ArchDescriptor,
    pub functions: Vec<IrFunction>,
    pub globals: Vec<IrGlobal>,
    pub type_map: HashMap<Arc<str>, IrType>,
}

impl IrModule {
    pub fn new(name: impl Into<String>, architecture: ArchDescriptor) -> Self {
        Self { name: name.into(), architecture, functions: Vec::new(), globals: Vec::new(), type_map: HashMap::new() }
    }

    pub fn register_tag_type(&mut self, uid: Arc<str>, ty: IrType) {
        self.type_map.insert(uid, ty);
    }

    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| &*f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::lp64;

    #[test]
    fn register_tag_type_is_queryable_back_out() {
        let mut module = IrModule::new("t", lp64());
        let uid: Arc<str> = Arc::from("P_0");
        module.register_tag_type(uid.clone(), IrType::StructOrUnion { uid: uid.clone(), is_union: false, fields: vec![] });
        assert!(module.type_map.contains_key(&uid));
    }
}

// src/symbols/tag.rs
use crate::types::{CType, IrType};
use std::sync::Arc;

/// A struct/union tag, modeled as a two-state lifecycle: declared with no
/// body (`incomplete`, `c_type`/`ir_type` both `None`) and later completed
/// exactly once when its body is processed. The IR pointer type carries the
/// tag's `uid` rather than a direct reference to its `IrType`, so pointers to
/// a not-yet-complete tag (the recursive-struct case) are well-formed before
/// completion ever runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub source_identifier: Arc<str>,
    pub uid: Arc<str>,
    pub c_type: Option<CType>,
    pub ir_type: Option<IrType>,
}

impl Tag {
    pub fn incomplete(source_identifier: impl Into<Arc<str>>, uid: impl Into<Arc<str>>) -> Self {
        Self { source_identifier: source_identifier.into(), uid: uid.into(), c_type: None, ir_type: None }
    }

    pub fn is_complete(&self) -> bool {
        self.ir_type.is_some()
    }

    pub fn complete(&mut self, c_type: CType, ir_type: IrType) {
        self.c_type = Some(c_type);
        self.ir_type = Some(ir_type);
    }
}

/// Generates tag UIDs of the form `<identifier>_<counter>` (or
/// `__anon_tag_<counter>` for an anonymous struct/union), monotonically
/// incrementing and shared module-wide so every tag gets a unique UID
/// regardless of how many scopes reuse the same source identifier.
#[derive(Debug, Default)]
pub struct TagUidGenerator {
    next: usize,
}

impl TagUidGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_uid(&mut self, source_identifier: Option<&str>) -> Arc<str> {
        let n = self.next;
        self.next += 1;
        match source_identifier {
            Some(name) => Arc::from(format!("{name}_{n}")),
            None => Arc::from(format!("__anon_tag_{n}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_format_matches_identifier_counter() {
        let mut r#gen = TagUidGenerator::new();
        assert_eq!(&*r#gen.next_uid(Some("P")), "P_0");
        assert_eq!(&*r#gen.next_uid(Some("P")), "P_1");
    }

    #[test]
    fn anonymous_tags_get_synthesized_names() {
        let mut r#gen = TagUidGenerator::new();
        assert_eq!(&*r#gen.next_uid(None), "__anon_tag_0");
    }

    #[test]
    fn tag_lifecycle_incomplete_then_complete() {
        let mut tag = Tag::incomplete("N", "N_0");
        assert!(!tag.is_complete());
        tag.complete(
            CType::StructOrUnion {
                is_union: false,
                tag_ident: Some(Arc::from("N")),
                has_body: true,
                fields: vec![],
                packed: false,
            },
            IrType::StructOrUnion { uid: Arc::from("N_0"), is_union: false, fields: vec![] },
        );
        assert!(tag.is_complete());
    }
}

// src/location/source_span.rs
use crate::location::source_location::SourceLocation;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A contiguous range of source text in a specific file.
///
/// Spans track the source file path, a start position (inclusive), and an
/// end position (exclusive). Every AST node and every `CompileError` carries
/// one of these so a caller can locate the offending text without this crate
/// having to format source snippets itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceSpan {
    /// Path to source file (shared reference)
    pub file_path: Arc<str>,

    /// Starting position of the span (inclusive)
    pub start: SourceLocation,

    /// Ending position of the span (exclusive)
    pub end: SourceLocation,
}

impl SourceSpan {
    /// Creates a new source span covering a specific range.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use c99ir::location::source_location::SourceLocation;
    /// use c99ir::location::source_span::SourceSpan;
    /// let start = SourceLocation::new(1, 1, 0);
    /// let end = SourceLocation::new(1, 5, 4);
    /// let span = SourceSpan::new(Arc::from("test.c"), start, end);
    /// ```
    pub fn new(file_path: Arc<str>, start: SourceLocation, end: SourceLocation) -> Self {
        Self { file_path, start, end }
    }

    /// Merges another span into this one in-place.
    ///
    /// Expands current span to cover both original and `other` span.
    /// Only merges if spans are from the same file.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use c99ir::location::source_location::SourceLocation;
    /// use c99ir::location::source_span::SourceSpan;
    /// let mut span1 = SourceSpan::new(Arc::from("f"), SourceLocation::new(1, 1, 0), SourceLocation::new(1, 5, 4));
    /// let span2 = SourceSpan::new(Arc::from("f"), SourceLocation::new(1,3, 2), SourceLocation::new(1,8, 7));
    /// span1.merge(&span2);
    /// assert_eq!(span1.start, SourceLocation::new(1, 1, 0));
    /// assert_eq!(span1.end, SourceLocation::new(1,8, 7));
    /// ```
    pub fn merge(&mut self, other: &SourceSpan) {
        if self.file_path == other.file_path {
            self.start = self.start.min(other.start);
            self.end = self.end.max(other.end);
        }
    }

    /// Creates a new span that combines this span with another.
    ///
    /// Returns `Some(SourceSpan)` if spans are from the same file, `None` otherwise.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use c99ir::location::source_location::SourceLocation;
    /// use c99ir::location::source_span::SourceSpan;
    /// let span1 = SourceSpan::new(Arc::from("f"), SourceLocation::new(1, 1, 0), SourceLocation::new(1,5,4));
    /// let span2 = SourceSpan::new(Arc::from("f"), SourceLocation::new(1,3,2), SourceLocation::new(2,5,8));
    /// let merged = span1.merged(&span2).unwrap();
    /// assert_eq!(merged.start, SourceLocation::new(1, 1, 0));
    /// assert_eq!(merged.end, SourceLocation::new(2,5,8));
    /// ```
    pub fn merged(&self, other: &SourceSpan) -> Option<Self> {
        (self.file_path == other.file_path)
            .then(|| Self { file_path: self.file_path.clone(), start: self.start.min(other.start), end: self.end.max(other.end) })
    }
}

impl Default for SourceSpan {
    /// Creates a default invalid span with empty path and zero positions.
    ///
    /// Primarily useful for placeholder values. Should not be used for
    /// actual source references.
    fn default() -> Self {
        SourceSpan { file_path: Arc::from(""), start: SourceLocation::default(), end: SourceLocation::default() }
    }
}

impl std::fmt::Display for SourceSpan {
    /// Format: `[truncated_path]:line [start_line]:column [start_col] - line [end_line]:column [end_col]`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let truncated_path = truncate_path(Path::new(&*self.file_path), 2);
        write!(
            f,
            "{}:line {}:column {} - line {}:column {}",
            truncated_path, self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

/// Truncates a path to show only the last `depth` components.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use c99ir::location::source_span::truncate_path;
/// let path = Path::new("/project/src/module/file.c");
/// let expected = if cfg!(unix) { "../module/file.c" } else { "..\\module\\file.c" };
/// assert_eq!(truncate_path(path, 2), expected);
/// ```
pub fn truncate_path(path: &Path, depth: usize) -> String {
    let components: Vec<_> = path.components().collect();
    let len = components.len();

    let truncated = if len <= depth {
        PathBuf::from_iter(&components)
    } else {
        let tail = &components[len - depth..];
        PathBuf::from("..").join(PathBuf::from_iter(tail))
    };

    truncated.display().to_string()
}

/// Implemented by every AST node so callers (and the lowering pass) can
/// recover its source position without a big match statement at each call site.
pub trait HasSpan {
    fn span(&self) -> &SourceSpan;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: usize, col: usize, pos: usize) -> SourceLocation {
        SourceLocation::new(line, col, pos)
    }

    #[test]
    fn merge_expands_to_cover_both_spans() {
        let mut a = SourceSpan::new(Arc::from("f.c"), loc(1, 1, 0), loc(1, 5, 4));
        let b = SourceSpan::new(Arc::from("f.c"), loc(2, 1, 10), loc(2, 3, 12));
        a.merge(&b);
        assert_eq!(a.start, loc(1, 1, 0));
        assert_eq!(a.end, loc(2, 3, 12));
    }

    #[test]
    fn merge_across_files_is_a_no_op() {
        let mut a = SourceSpan::new(Arc::from("a.c"), loc(1, 1, 0), loc(1, 5, 4));
        let b = SourceSpan::new(Arc::from("b.c"), loc(9, 9, 99), loc(9, 9, 99));
        let before = a.clone();
        a.merge(&b);
        assert_eq!(a, before);
    }

    #[test]
    fn merged_across_files_is_none() {
        let a = SourceSpan::new(Arc::from("a.c"), loc(1, 1, 0), loc(1, 5, 4));
        let b = SourceSpan::new(Arc::from("b.c"), loc(1, 1, 0), loc(1, 5, 4));
        assert!(a.merged(&b).is_none());
    }
}

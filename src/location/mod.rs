/// # Location Module
///
/// Source position tracking shared by the AST and by every diagnostic. It
/// provides line/column/offset points ([`source_location`]) and contiguous
/// ranges built from them ([`source_span`]). Rendering a span into a
/// human-readable report with source context is left to the caller.
pub mod source_location;
pub mod source_span;

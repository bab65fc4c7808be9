//! # Astro Component Codegen (Native)
//!
//! Single-file component compiler: consumes a parsed document AST (a
//! frontmatter script block, style blocks, and an HTML-like template with
//! embedded expressions and component references) and emits a
//! self-contained JavaScript render module: a script section, hoisted
//! import/export lines, one composed hyperscript expression for the
//! template, and the extracted CSS.
//!
//! ## Pipeline Invariants
//!
//! 1. **Two passes, one state**: the frontmatter pass fully completes
//!    before the template walk starts; component resolution reads what it
//!    collected. A `CodegenState` belongs to exactly one document compile.
//! 2. **Every component local** either appears in the hoisted import
//!    lines or is a synthesized custom-element module alias.
//! 3. **Resolution priority**: imported components win over frontmatter
//!    declarations; capitalized names found only in declarations resolve
//!    as frontmatter-defined; `Fragment` is built in; anything else is a
//!    fatal error.
//! 4. **Markdown depth**: the region marker's count never goes negative
//!    and is `Outside` exactly when the count would be zero.
//! 5. **Paren accounting**: the walk's paren counter equals the number of
//!    unclosed `h(` calls in the active buffer and returns to its -1
//!    sentinel at walk end, so the emitted `html` is always balanced.
//! 6. **Removed ranges never resurface**: stripped imports, prop-style
//!    exports, and `getStaticPaths` are spliced out of the script text by
//!    exact byte range.

mod ast;
mod attributes;
mod codegen;
mod components;
mod css;
mod error;
mod frontmatter;
mod hydration;
mod markdown;
mod options;
mod state;
mod template;
mod transpile;

#[cfg(test)]
mod codegen_tests;

pub use ast::{
    Ast, AstMeta, Attribute, AttributeNode, AttributeSegment, AttributeValue, ElementNode,
    ExpressionNode, FragmentNode, HtmlRoot, ModuleBlock, MustacheNode, MustacheValue, RawNode,
    ShorthandValue, Span, SpreadAttribute, StyleNode, TemplateNode, TextNode,
    FEATURE_CUSTOM_ELEMENT,
};
#[cfg(feature = "napi")]
pub use codegen::compile_document;
pub use codegen::{codegen, Artifact, CodegenDriver};
pub use error::{CompileError, ErrorKind, Position};
pub use hydration::{Hydration, HYDRATION_METHODS};
pub use markdown::{CommonmarkRenderer, MarkdownRenderError, MarkdownRenderer};
pub use options::{AstroConfig, CodegenOptions, CompileOptions, LogCrateSink, LogEvent, LogSink};
pub use state::{CodegenState, ComponentInfo, ImportSpecifierKind};
pub use transpile::{ExpressionTransformer, OxcTransformer, TransformDiagnostic};

//! Expression transpilation.
//!
//! The compiler does not transpile code itself; it drives an
//! [`ExpressionTransformer`] and translates its fragment-relative
//! diagnostics into file coordinates. The default transformer is the oxc
//! pipeline: parse (TSX, module goal), semantic analysis, type stripping,
//! and re-emission with single-quoted strings so spliced literals survive
//! byte-for-byte.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};

use crate::error::{offset_to_position, CompileError, ErrorKind, Position};
use crate::state::CodegenState;

/// A transformer failure, positioned relative to the fragment it was
/// handed.
#[derive(Debug, Clone)]
pub struct TransformDiagnostic {
    pub message: String,
    /// Byte offsets into the fragment.
    pub start: u32,
    pub end: u32,
}

pub trait ExpressionTransformer {
    fn transform(&self, source: &str) -> Result<String, TransformDiagnostic>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEFAULT TRANSFORMER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct OxcTransformer;

pub fn fragment_source_type() -> SourceType {
    SourceType::default()
        .with_typescript(true)
        .with_jsx(true)
        .with_module(true)
}

impl ExpressionTransformer for OxcTransformer {
    fn transform(&self, source: &str) -> Result<String, TransformDiagnostic> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, fragment_source_type()).parse();
        if let Some(err) = ret.errors.first() {
            let (start, end) = err
                .labels
                .as_ref()
                .and_then(|labels| labels.first())
                .map(|label| (label.offset() as u32, (label.offset() + label.len()) as u32))
                .unwrap_or((0, 0));
            return Err(TransformDiagnostic {
                message: err.message.to_string(),
                start,
                end,
            });
        }

        let mut program = ret.program;
        let semantic_ret = SemanticBuilder::new().build(&program);
        let scoping = semantic_ret.semantic.into_scoping();
        let transformer_ret =
            Transformer::new(&allocator, Path::new("fragment.tsx"), &TransformOptions::default())
                .build_with_scoping(scoping, &mut program);
        if let Some(err) = transformer_ret.errors.first() {
            return Err(TransformDiagnostic {
                message: err.message.to_string(),
                start: 0,
                end: 0,
            });
        }

        let code = Codegen::new()
            .with_options(CodegenOptions {
                single_quote: true,
                ..CodegenOptions::default()
            })
            .build(&program)
            .code;
        Ok(code)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADAPTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Translate a fragment-relative diagnostic into original-file coordinates:
/// the fragment's start line is added to the reported line, and its start
/// column is added only when the failure is on the fragment's first line.
fn offset_diagnostic(base: Position, fragment: &str, offset: u32) -> Position {
    let rel = offset_to_position(fragment, offset as usize);
    let line = base.line + rel.line - 1;
    let column = if rel.line == 1 {
        base.column + rel.column
    } else {
        rel.column
    };
    Position { line, column }
}

/// Run `fragment` through the transformer. `fragment_offset` is the byte
/// offset of the fragment in the original file; failures come back in file
/// coordinates with a code frame rendered from the re-read source. On
/// success, trailing semicolons and whitespace are stripped.
pub fn transpile_fragment(
    transformer: &dyn ExpressionTransformer,
    fragment: &str,
    fragment_offset: u32,
    state: &CodegenState,
) -> Result<String, CompileError> {
    match transformer.transform(fragment) {
        Ok(code) => Ok(code.trim().trim_end_matches(';').trim_end().to_string()),
        Err(diagnostic) => {
            let base = state.position_of(fragment_offset);
            let start = offset_diagnostic(base, fragment, diagnostic.start);
            let end = offset_diagnostic(base, fragment, diagnostic.end);
            Err(CompileError::new(
                ErrorKind::Transpile,
                state.filename.clone(),
                start,
                diagnostic.message,
            )
            .with_end(end)
            .with_frame(state.frame_at(start)))
        }
    }
}

//! Top-level codegen driver.
//!
//! Runs the pipeline in its one valid order (frontmatter analysis, CSS
//! extraction, template walk) over a single [`CodegenState`], then
//! assembles the artifact. The sequencing is explicit: the template walk
//! resolves components against what the frontmatter collected, so the
//! frontmatter pass must complete first.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};

use crate::ast::Ast;
use crate::css::extract_css;
use crate::error::CompileError;
use crate::frontmatter::analyze_frontmatter;
use crate::markdown::{CommonmarkRenderer, MarkdownRenderer};
use crate::options::CodegenOptions;
use crate::state::CodegenState;
use crate::template::{compile_template, CodegenContext};
use crate::transpile::{ExpressionTransformer, OxcTransformer};

/// The emitted render module, ready for the downstream bundler. `html` is
/// a single balanced expression acceptable as an argument to
/// `h(Fragment, null, <html>)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub script: String,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub html: String,
    pub css: Option<String>,
    pub get_static_paths: Option<String>,
    pub has_custom_elements: bool,
    /// Synthesized module alias → runtime URL, insertion-ordered.
    pub custom_element_candidates: Vec<(String, String)>,
}

/// Driver with injectable collaborators. The defaults make the crate
/// usable stand-alone; a host can swap in its own transformer or Markdown
/// renderer.
pub struct CodegenDriver {
    transformer: Box<dyn ExpressionTransformer>,
    markdown: Box<dyn MarkdownRenderer>,
}

impl Default for CodegenDriver {
    fn default() -> Self {
        CodegenDriver {
            transformer: Box::new(OxcTransformer),
            markdown: Box::new(CommonmarkRenderer),
        }
    }
}

impl CodegenDriver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_transformer(mut self, transformer: impl ExpressionTransformer + 'static) -> Self {
        self.transformer = Box::new(transformer);
        self
    }

    #[must_use]
    pub fn with_markdown_renderer(mut self, renderer: impl MarkdownRenderer + 'static) -> Self {
        self.markdown = Box::new(renderer);
        self
    }

    /// Compile one document. The state lives for exactly this call and is
    /// never reused across documents.
    pub fn codegen(&self, mut ast: Ast, opts: &CodegenOptions) -> Result<Artifact, CompileError> {
        let mut state = CodegenState::new(&opts.filename, &opts.file_id);

        // 1. Frontmatter: imports, exports, declarations, getStaticPaths.
        let script = analyze_frontmatter(
            ast.module.as_ref(),
            &mut state,
            opts,
            &*self.transformer,
            ast.meta.has_custom_elements(),
        )?;

        // 2. Styles: collect verbatim, strip from the template.
        extract_css(&mut ast, &mut state);

        // 3. Template: one balanced hyperscript expression.
        let ctx = CodegenContext {
            options: opts,
            transformer: &*self.transformer,
            markdown: &*self.markdown,
        };
        let html = compile_template(&mut state, &ctx, &ast.html.children)?;

        // 4. Assemble.
        let css = if state.css.is_empty() {
            None
        } else {
            Some(state.css.join("\n\n"))
        };
        Ok(Artifact {
            script,
            imports: state.import_statements,
            exports: state.export_statements,
            html,
            css,
            get_static_paths: state.get_static_paths,
            has_custom_elements: ast.meta.has_custom_elements(),
            custom_element_candidates: state.custom_element_candidates,
        })
    }
}

/// Library entry point with default collaborators.
pub fn codegen(ast: Ast, opts: &CodegenOptions) -> Result<Artifact, CompileError> {
    CodegenDriver::default().codegen(ast, opts)
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI BRIDGE
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeOptions {
    #[serde(default)]
    astro_config: crate::options::AstroConfig,
    filename: String,
    file_id: String,
}

/// JSON-bridged entry point for a Node host: takes the AST and options as
/// JSON, returns the artifact as JSON.
#[cfg(feature = "napi")]
#[napi]
pub fn compile_document(ast_json: String, options_json: String) -> napi::Result<String> {
    let ast: Ast = serde_json::from_str(&ast_json)
        .map_err(|err| napi::Error::from_reason(format!("invalid AST: {err}")))?;
    let bridge: BridgeOptions = serde_json::from_str(&options_json)
        .map_err(|err| napi::Error::from_reason(format!("invalid options: {err}")))?;

    let opts = CodegenOptions::new(bridge.filename, bridge.file_id).with_compile_options(
        crate::options::CompileOptions {
            astro_config: bridge.astro_config,
            ..Default::default()
        },
    );
    let artifact = codegen(ast, &opts).map_err(|err| napi::Error::from_reason(err.to_string()))?;
    serde_json::to_string(&artifact).map_err(|err| napi::Error::from_reason(err.to_string()))
}

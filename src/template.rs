//! Template code generation.
//!
//! An in-order enter/leave walk over the html tree that emits one balanced
//! hyperscript expression. The walk juggles several concerns at once:
//!
//! 1. **Dual buffers**: `out` holds the hyperscript stream; `markdown`
//!    accumulates raw text inside a `<Markdown>` region until a flush
//!    renders, re-parses, and re-enters codegen on the result.
//! 2. **Paren accounting**: `paren` starts at the -1 sentinel and tracks
//!    unclosed `h(` calls; slot wrapping and component wrapping open
//!    parens that are not 1:1 with AST nodes, so depth is never inferred
//!    from the node stack.
//! 3. **Component resolution** against the frontmatter symbol table, with
//!    wrapper synthesis for hydrated, custom-element, and `client:only`
//!    components.
//! 4. **Cleanup**: a four-step rewrite chain repairs the over-aggressive
//!    commas emitted around skipped expressions.

use lazy_static::lazy_static;
use regex::Regex;

use crate::ast::{ElementNode, TemplateNode};
use crate::attributes::{js_string, resolve_attributes, ResolvedAttributes};
use crate::components::{
    component_runtime_url, is_component_name, resolve_component, ResolvedComponent,
};
use crate::error::{CompileError, ErrorKind};
use crate::hydration::{extract_hydration, split_legacy_hydration, Hydration};
use crate::markdown::{dedent, parse_rendered_html, MarkdownRenderer};
use crate::options::{CodegenOptions, LogEvent};
use crate::state::{CodegenState, ComponentInfo, ImportSpecifierKind, MarkdownMarker};
use crate::transpile::{transpile_fragment, ExpressionTransformer};

pub const COMPONENT_WRAPPER_IMPORT: &str =
    "import { __astro_component } from 'astro/internal/__astro_component.js';";
pub const FRAGMENT_RUNTIME_IMPORT: &str = "import { Fragment } from 'astro/internal/h.js';";
pub const ELEMENT_REGISTRY_IMPORT: &str =
    "import { AstroElementRegistry } from 'astro/internal/element-registry.js';";
pub const PRISM_IMPORT: &str = "import Prism from 'astro/components/Prism.astro';";

/// Sentinel the parser leaves behind for `\{` escapes inside `<code>`.
pub const ESCAPED_LEFT_CURLY: &str = "ASTRO_ESCAPED_LEFT_CURLY_BRACKET\0";

/// The external collaborators the walk calls out to.
pub struct CodegenContext<'a> {
    pub options: &'a CodegenOptions,
    pub transformer: &'a dyn ExpressionTransformer,
    pub markdown: &'a dyn MarkdownRenderer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Buffer {
    Out,
    Markdown,
}

pub struct TemplateCodegen<'s, 'c> {
    state: &'s mut CodegenState,
    ctx: &'s CodegenContext<'c>,
    out: String,
    markdown: String,
    curr: Buffer,
    paren: i32,
    markdown_start: u32,
}

/// Compile a list of template nodes into one balanced hyperscript
/// expression. Recursion re-enters here for expression children and
/// flushed Markdown subtrees.
pub fn compile_template(
    state: &mut CodegenState,
    ctx: &CodegenContext<'_>,
    nodes: &[TemplateNode],
) -> Result<String, CompileError> {
    let mut walker = TemplateCodegen {
        state,
        ctx,
        out: String::new(),
        markdown: String::new(),
        curr: Buffer::Out,
        paren: -1,
        markdown_start: 0,
    };
    for node in nodes {
        walker.walk(node, None)?;
    }
    debug_assert_eq!(walker.paren, -1, "unclosed h( calls at walk end");
    Ok(cleanup_output(&walker.out))
}

impl<'s, 'c> TemplateCodegen<'s, 'c> {
    fn walk(&mut self, node: &TemplateNode, parent: Option<&ElementNode>) -> Result<(), CompileError> {
        match node {
            TemplateNode::Text(text) => {
                self.emit_text(&text.data, parent);
                Ok(())
            }
            TemplateNode::CodeSpan(raw) | TemplateNode::CodeFence(raw) => {
                if self.state.markers.is_inside() {
                    self.markdown.push_str(&raw.data);
                } else {
                    self.push_curr(&format!(",{}", js_string(&raw.data)));
                }
                Ok(())
            }
            TemplateNode::Comment(_) => Ok(()),
            TemplateNode::Style(style) => {
                // Normally stripped by the CSS extractor; collect stragglers
                // without inlining them.
                self.state.css.push(style.content.clone());
                Ok(())
            }
            TemplateNode::MustacheTag(tag) => {
                if self.state.markers.is_inside() {
                    self.curr = Buffer::Markdown;
                }
                for child in &tag.children {
                    self.walk(child, parent)?;
                }
                Ok(())
            }
            TemplateNode::Expression(expr) => self.emit_expression(expr),
            TemplateNode::Fragment(fragment) => {
                self.prepend_comma();
                self.out.push_str("h(Fragment, null,");
                self.paren += 1;
                for child in &fragment.children {
                    self.walk(child, None)?;
                }
                self.close_parens(1);
                Ok(())
            }
            TemplateNode::SlotTemplate(el) => {
                self.prepend_comma();
                self.out.push_str("h(Fragment, null, children");
                self.paren += 1;
                for child in &el.children {
                    self.walk(child, Some(el))?;
                }
                self.close_parens(1);
                Ok(())
            }
            TemplateNode::Slot(el) => self.emit_slot(el),
            TemplateNode::Element(el)
            | TemplateNode::InlineComponent(el)
            | TemplateNode::Head(el)
            | TemplateNode::Title(el)
            | TemplateNode::Body(el) => {
                self.emit_element(matches!(node, TemplateNode::InlineComponent(_)), el)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BUFFERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn push_curr(&mut self, code: &str) {
        match self.curr {
            Buffer::Out => self.out.push_str(code),
            Buffer::Markdown => self.markdown.push_str(code),
        }
    }

    fn prepend_comma(&mut self) {
        if self.curr == Buffer::Out && !self.out.is_empty() {
            self.out.push(',');
        }
    }

    fn close_parens(&mut self, count: usize) {
        for _ in 0..count {
            if self.paren >= 0 {
                self.out.push(')');
                self.paren -= 1;
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LEAVES
    // ═══════════════════════════════════════════════════════════════════════════

    fn emit_text(&mut self, data: &str, parent: Option<&ElementNode>) {
        if self.state.markers.is_inside() {
            self.markdown.push_str(data);
            return;
        }
        let parent_name = parent.map(|el| el.name.as_str());
        if parent_name != Some("Markdown") && data.trim().is_empty() {
            return;
        }
        let text = if parent_name == Some("code") {
            data.replace(ESCAPED_LEFT_CURLY, "{")
        } else {
            data.to_string()
        };
        self.push_curr(&format!(",{}", js_string(&text)));
    }

    fn emit_expression(&mut self, expr: &crate::ast::ExpressionNode) -> Result<(), CompileError> {
        // Children are compiled independently and spliced between chunks.
        let mut compiled = Vec::with_capacity(expr.children.len());
        for child in &expr.children {
            compiled.push(compile_template(self.state, self.ctx, std::slice::from_ref(child))?);
        }
        let mut raw = String::new();
        let mut next_child = 0;
        for chunk in &expr.code_chunks {
            raw.push_str(chunk);
            if next_child < compiled.len() {
                raw.push_str(&compiled[next_child]);
                next_child += 1;
            }
        }
        for rest in &compiled[next_child..] {
            raw.push_str(rest);
        }
        if raw.trim().is_empty() {
            return Ok(());
        }

        let code = match transpile_fragment(self.ctx.transformer, &raw, expr.span.start, self.state)
        {
            Ok(code) => code,
            Err(err) => {
                // Recovered locally: nothing is emitted, so the surrounding
                // expression stays balanced.
                self.ctx.options.sink().parse_error(
                    LogEvent::new(err.message.clone())
                        .at(err.filename.clone(), err.start)
                        .with_frame(err.frame.clone()),
                );
                return Ok(());
            }
        };

        if matches!(code.trim(), "false" | "null" | "undefined" | "void 0") {
            return Ok(());
        }
        if self.state.markers.is_inside() {
            self.markdown.push_str(&format!("{{{code}}}"));
        } else {
            self.push_curr(&format!(",({code})"));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ELEMENTS AND COMPONENTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn emit_slot(&mut self, el: &ElementNode) -> Result<(), CompileError> {
        let attrs =
            resolve_attributes(&el.attributes, self.state, self.ctx.options, self.ctx.transformer)?;
        if self.curr == Buffer::Markdown {
            self.flush_markdown()?;
        }
        self.prepend_comma();
        self.out
            .push_str(&format!("h(__astro_slot, {}, children", generate_attributes(&attrs)));
        self.paren += 1;
        for child in &el.children {
            self.walk(child, Some(el))?;
        }
        self.close_parens(1);
        Ok(())
    }

    fn emit_element(&mut self, is_inline_component: bool, el: &ElementNode) -> Result<(), CompileError> {
        let mut name = el.name.clone();

        // Legacy <Name:method /> hydration syntax, normalized before any
        // resolution.
        let mut legacy = None;
        if let Some((base, hydration)) = split_legacy_hydration(
            &name,
            self.ctx.options,
            self.state.position_of(el.span.start),
        ) {
            name = base;
            legacy = Some(hydration);
        }

        if name == "Markdown" {
            self.enter_markdown(el)?;
            for child in &el.children {
                self.walk(child, Some(el))?;
            }
            return self.leave_markdown();
        }

        let mut attrs =
            resolve_attributes(&el.attributes, self.state, self.ctx.options, self.ctx.transformer)?;
        let hydration = extract_hydration(&mut attrs).or(legacy);

        if is_inline_component && name == "Prism" && !self.state.components.contains_key("Prism") {
            self.state.add_import_statement(PRISM_IMPORT);
            self.state.record_component(
                ComponentInfo {
                    specifier_kind: ImportSpecifierKind::Default,
                    local_name: "Prism".to_string(),
                    exported_name: None,
                    source_url: "astro/components/Prism.astro".to_string(),
                },
                PRISM_IMPORT,
            );
        }

        let lookup = name.split('.').next().unwrap_or(&name).to_string();
        if !is_component_name(&name) && !self.state.components.contains_key(&lookup) {
            return self.emit_call(format!("h({},", js_string(&name)), attrs, el, true);
        }

        let resolved = resolve_component(&name, self.state).ok_or_else(|| {
            let start = self.state.position_of(el.span.start);
            CompileError::new(
                ErrorKind::UnresolvedComponent,
                self.state.filename.clone(),
                start,
                format!("Unable to render \"{name}\" because it is undefined"),
            )
            .with_frame(self.state.frame_at(start))
        })?;

        match resolved {
            ResolvedComponent::FrontmatterDefined | ResolvedComponent::Fragment => {
                if let Some(hydration) = &hydration {
                    let start = self.state.position_of(el.span.start);
                    return Err(CompileError::new(
                        ErrorKind::IllegalHydration,
                        self.state.filename.clone(),
                        start,
                        format!(
                            "\"client:{}\" is not allowed on \"{name}\" because it is defined in this file's frontmatter",
                            hydration.method
                        ),
                    )
                    .with_frame(self.state.frame_at(start)));
                }
                self.emit_call(format!("h({name},"), attrs, el, true)
            }
            ResolvedComponent::CustomElement | ResolvedComponent::Imported => {
                let wrapper = self.component_wrapper(&name, resolved, hydration.as_ref())?;
                self.emit_call(format!("h({wrapper},"), attrs, el, false)
            }
        }
    }

    /// Shared emission tail for everything that becomes an `h(...)` call:
    /// flush any pending Markdown, wrap slotted nodes in
    /// `__astro_slot_content`, emit the call, walk the children, close up.
    ///
    /// `head` is the call text up to (and including) the comma before the
    /// props object; the props are generated after the `slot` attribute is
    /// pulled out.
    fn emit_call(
        &mut self,
        head: String,
        mut attrs: ResolvedAttributes,
        el: &ElementNode,
        trailing_comma: bool,
    ) -> Result<(), CompileError> {
        if self.curr == Buffer::Markdown {
            self.flush_markdown()?;
        }
        let slot = attrs.remove("slot");
        self.prepend_comma();
        if let Some(slot_name) = &slot {
            self.out
                .push_str(&format!("h(__astro_slot_content, {{ name: {slot_name} }},"));
            self.paren += 1;
        }
        self.out.push_str(&head);
        self.out.push_str(&generate_attributes(&attrs));
        if trailing_comma {
            self.out.push(',');
        }
        self.paren += 1;
        for child in &el.children {
            self.walk(child, Some(el))?;
        }
        self.close_parens(1 + usize::from(slot.is_some()));
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COMPONENT WRAPPERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn component_wrapper(
        &mut self,
        name: &str,
        resolved: ResolvedComponent,
        hydration: Option<&Hydration>,
    ) -> Result<String, CompileError> {
        self.state.add_import_statement(COMPONENT_WRAPPER_IMPORT);
        self.state.add_import_statement(FRAGMENT_RUNTIME_IMPORT);

        if resolved == ResolvedComponent::CustomElement {
            self.state.add_import_statement(ELEMENT_REGISTRY_IMPORT);
            let hydrate = hydration
                .map(|h| js_string(&h.method))
                .unwrap_or_else(|| "undefined".to_string());
            return Ok(format!(
                "__astro_component(...__astro_element_registry.astroComponentArgs({}, {{ hydrate: {}, displayName: {} }}))",
                js_string(name),
                hydrate,
                js_string(name)
            ));
        }

        let lookup = name.split('.').next().unwrap_or(name).to_string();
        let info = self.state.components.get(&lookup).cloned().ok_or_else(|| {
            CompileError::new(
                ErrorKind::UnresolvedComponent,
                self.state.filename.clone(),
                crate::error::Position::start_of_file(),
                format!("Unable to render \"{name}\" because it is undefined"),
            )
        })?;
        let value = hydration
            .and_then(|h| h.value.clone())
            .unwrap_or_else(|| "null".to_string());

        let Some(hydration) = hydration else {
            return Ok(format!(
                "__astro_component({name}, {{ hydrate: undefined, displayName: {}, value: {} }})",
                js_string(name),
                value
            ));
        };

        let url = component_runtime_url(
            self.ctx.options.config(),
            &info.source_url,
            &self.state.filename,
        );
        let export_value = match info.specifier_kind {
            ImportSpecifierKind::Default => "default".to_string(),
            ImportSpecifierKind::Named => info
                .exported_name
                .clone()
                .unwrap_or_else(|| lookup.clone()),
            ImportSpecifierKind::Namespace => name
                .split('.')
                .nth(1)
                .unwrap_or("default")
                .to_string(),
        };
        let component_export = serde_json::json!({ "value": export_value }).to_string();

        let identifier = if hydration.method == "only" {
            // The component never runs on the server: drop its raw import
            // and render a Fragment in its place.
            self.state.remove_component_imports(&lookup);
            "Fragment".to_string()
        } else {
            name.to_string()
        };

        Ok(format!(
            "__astro_component({identifier}, {{ hydrate: {}, displayName: {}, componentUrl: {}, componentExport: {}, value: {} }})",
            js_string(&hydration.method),
            js_string(name),
            js_string(&url),
            component_export,
            value
        ))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MARKDOWN REGIONS
    // ═══════════════════════════════════════════════════════════════════════════

    fn enter_markdown(&mut self, el: &ElementNode) -> Result<(), CompileError> {
        let mut attrs =
            resolve_attributes(&el.attributes, self.state, self.ctx.options, self.ctx.transformer)?;
        // A nested $scope is dropped: the outermost region's scope governs
        // every flush until the count returns to zero.
        let scope = attrs.remove("$scope").map(|raw| {
            serde_json::from_str::<String>(&raw).unwrap_or(raw)
        });

        if self.state.markers.is_inside() {
            if let MarkdownMarker::Inside { count, .. } = &mut self.state.markers {
                *count += 1;
            }
            if !attrs.is_empty() {
                self.flush_markdown()?;
                self.out.push_str(&format!(
                    ",Markdown.__render({}),",
                    generate_attributes(&attrs)
                ));
            }
        } else {
            if !attrs.is_empty() {
                self.out.push_str(&format!(
                    ",Markdown.__render({}),",
                    generate_attributes(&attrs)
                ));
            }
            self.markdown_start = el.span.start;
            self.state.markers = MarkdownMarker::Inside { scope, count: 1 };
        }
        self.curr = Buffer::Markdown;
        Ok(())
    }

    fn leave_markdown(&mut self) -> Result<(), CompileError> {
        if let MarkdownMarker::Inside { count, .. } = &mut self.state.markers {
            *count -= 1;
            if *count == 0 {
                self.flush_markdown()?;
                self.state.markers = MarkdownMarker::Outside;
            }
        }
        Ok(())
    }

    /// Render the buffered Markdown, re-parse the HTML, re-enter codegen on
    /// the subtree, and splice the result into `out`.
    fn flush_markdown(&mut self) -> Result<(), CompileError> {
        self.curr = Buffer::Out;
        if self.markdown.trim().is_empty() {
            self.markdown.clear();
            return Ok(());
        }
        let source = std::mem::take(&mut self.markdown);
        let text = dedent(&source);
        let scope = self.state.markdown_scope();
        let rendered = self
            .ctx
            .markdown
            .render(&text, scope.as_deref())
            .map_err(|err| {
                let start = self.state.position_of(self.markdown_start);
                CompileError::new(
                    ErrorKind::MarkdownRender,
                    self.state.filename.clone(),
                    start,
                    err.to_string(),
                )
                .with_frame(self.state.frame_at(start))
            })?;
        let nodes = parse_rendered_html(&rendered);

        let saved = std::mem::replace(&mut self.state.markers, MarkdownMarker::Outside);
        let result = compile_template(self.state, self.ctx, &nodes);
        self.state.markers = saved;

        self.out.push(',');
        self.out.push_str(&result?);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPS OBJECTS AND OUTPUT CLEANUP
// ═══════════════════════════════════════════════════════════════════════════════

/// Generate a props object. Every object carries the `__astroContext`
/// pass-through so render context survives component boundaries.
pub fn generate_attributes(attrs: &ResolvedAttributes) -> String {
    let mut out = String::from("{");
    for (name, value) in attrs.iter() {
        if name.starts_with("...") {
            out.push_str(name);
            out.push(',');
        } else {
            out.push_str(&js_string(name));
            out.push(':');
            out.push_str(value);
            out.push(',');
        }
    }
    out.push_str("[__astroContext]:props[__astroContext]}");
    out
}

lazy_static! {
    static ref COMMA_BEFORE_PAREN: Regex = Regex::new(r",\)").unwrap();
    static ref COMMA_RUNS: Regex = Regex::new(r",{2,}").unwrap();
    static ref PAREN_THEN_H: Regex = Regex::new(r"\)h").unwrap();
}

/// Repair the over-aggressive commas the walk emits around skipped
/// expressions: strip a leading comma, collapse `,)`, collapse comma runs,
/// and restore the comma between adjacent calls.
fn cleanup_output(out: &str) -> String {
    let out = out.strip_prefix(',').unwrap_or(out);
    let out = COMMA_BEFORE_PAREN.replace_all(out, ")");
    let out = COMMA_RUNS.replace_all(&out, ",");
    PAREN_THEN_H.replace_all(&out, "),h").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Span, TextNode};
    use crate::markdown::CommonmarkRenderer;
    use crate::transpile::OxcTransformer;

    fn element(name: &str, children: Vec<TemplateNode>) -> TemplateNode {
        TemplateNode::Element(ElementNode {
            name: name.to_string(),
            attributes: vec![],
            children,
            span: Span::default(),
        })
    }

    fn text(data: &str) -> TemplateNode {
        TemplateNode::Text(TextNode {
            data: data.to_string(),
            span: Span::default(),
        })
    }

    fn compile(nodes: &[TemplateNode]) -> String {
        let mut state = CodegenState::new("/index.astro", "index.astro");
        let options = CodegenOptions::new("/index.astro", "index.astro");
        let ctx = CodegenContext {
            options: &options,
            transformer: &OxcTransformer,
            markdown: &CommonmarkRenderer,
        };
        compile_template(&mut state, &ctx, nodes).unwrap()
    }

    #[test]
    fn cleanup_chain_rewrites() {
        assert_eq!(cleanup_output(",h(\"a\",{},)"), "h(\"a\",{})");
        assert_eq!(cleanup_output("h(\"a\",{},,\"x\")"), "h(\"a\",{},\"x\")");
        assert_eq!(cleanup_output("h(\"a\",{})h(\"b\",{})"), "h(\"a\",{}),h(\"b\",{})");
    }

    #[test]
    fn plain_element_with_text() {
        let html = compile(&[element("h1", vec![text("Hi")])]);
        assert_eq!(
            html,
            "h(\"h1\",{[__astroContext]:props[__astroContext]},\"Hi\")"
        );
    }

    #[test]
    fn whitespace_only_text_is_skipped() {
        let html = compile(&[element("div", vec![text("\n  "), element("p", vec![text("x")])])]);
        assert_eq!(
            html,
            "h(\"div\",{[__astroContext]:props[__astroContext]},h(\"p\",{[__astroContext]:props[__astroContext]},\"x\"))"
        );
    }

    #[test]
    fn siblings_are_comma_separated_and_balanced() {
        let html = compile(&[element("a", vec![]), element("b", vec![])]);
        assert_eq!(html.matches('(').count(), html.matches(')').count());
        assert!(html.contains("),h("));
    }

    #[test]
    fn code_sentinel_unescapes_inside_code_parents() {
        let html = compile(&[element(
            "code",
            vec![text(&format!("a {}b", ESCAPED_LEFT_CURLY))],
        )]);
        assert!(html.contains("\"a {b\""));
    }

    #[test]
    fn fragment_nodes_emit_null_props() {
        let html = compile(&[TemplateNode::Fragment(crate::ast::FragmentNode {
            children: vec![element("p", vec![text("x")])],
            span: Span::default(),
        })]);
        assert!(html.starts_with("h(Fragment, null,"));
        assert_eq!(html.matches('(').count(), html.matches(')').count());
    }
}

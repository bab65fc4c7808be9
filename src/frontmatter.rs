//! Frontmatter analysis.
//!
//! Parses the script block (TSX grammar, module goal, top-level await) and
//! classifies its top-level statements: imports are recorded and hoisted,
//! `__layout`/`__content` exports pass through verbatim, prop-style exports
//! are removed with a deprecation warning, `export function getStaticPaths`
//! is lifted whole, and plain declarations feed the template's component
//! resolution. Removal happens by splicing exact byte ranges out of the
//! script text back-to-front, so statement offsets stay valid while
//! walking in reverse.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, CallExpression, Declaration, Expression,
    ImportDeclarationSpecifier, Statement,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::Span;

use crate::ast::ModuleBlock;
use crate::components::component_runtime_url;
use crate::error::{CompileError, ErrorKind};
use crate::options::{CodegenOptions, LogEvent};
use crate::state::{CodegenState, ComponentInfo, ImportSpecifierKind};
use crate::transpile::{fragment_source_type, transpile_fragment, ExpressionTransformer};

pub const FETCH_CONTENT_IMPORT: &str =
    "import { fetchContent } from 'astro/internal/fetch-content.js';";

/// Node builtins that must be imported through the `node:` scheme.
const BUILTIN_MODULES: [&str; 38] = [
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "zlib",
];

fn is_bare_builtin(source: &str) -> bool {
    if source.starts_with("node:") {
        return false;
    }
    let head = source.split('/').next().unwrap_or(source);
    BUILTIN_MODULES.contains(&head)
}

// ═══════════════════════════════════════════════════════════════════════════════
// fetchContent REWRITE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct FetchContentScan {
    /// Spans of string-literal arguments to wrap.
    rewrites: Vec<Span>,
    /// Spans of calls with a non-literal (or missing) argument.
    invalid: Vec<Span>,
}

impl<'a> Visit<'a> for FetchContentScan {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::StaticMemberExpression(member) = &call.callee {
            if member.property.name == "fetchContent" {
                if let Expression::Identifier(object) = &member.object {
                    if object.name == "Astro" {
                        match call.arguments.first().and_then(|arg| arg.as_expression()) {
                            Some(Expression::StringLiteral(lit)) => self.rewrites.push(lit.span),
                            _ => self.invalid.push(call.span),
                        }
                    }
                }
            }
        }
        walk::walk_call_expression(self, call);
    }
}

/// Wrap every `Astro.fetchContent(<string>)` argument in
/// `import.meta.globEager(...)`. Returns the rewritten script and whether
/// anything changed.
fn rewrite_fetch_content(
    script: &str,
    module_offset: u32,
    state: &CodegenState,
) -> Result<(String, bool), CompileError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, script, fragment_source_type()).parse();
    if let Some(err) = ret.errors.first() {
        return Err(frontmatter_parse_error(err, module_offset, state));
    }

    let mut scan = FetchContentScan::default();
    scan.visit_program(&ret.program);

    if let Some(span) = scan.invalid.first() {
        let start = state.position_of(module_offset + span.start);
        return Err(CompileError::new(
            ErrorKind::FetchContentArgument,
            state.filename.clone(),
            start,
            "Astro.fetchContent() can only accept a string literal argument",
        )
        .with_frame(state.frame_at(start)));
    }

    if scan.rewrites.is_empty() {
        return Ok((script.to_string(), false));
    }

    let mut rewritten = script.to_string();
    let mut spans = scan.rewrites;
    spans.sort_by(|a, b| b.start.cmp(&a.start));
    for span in spans {
        let (start, end) = (span.start as usize, span.end as usize);
        let literal = &script[start..end];
        rewritten.replace_range(start..end, &format!("import.meta.globEager({literal})"));
    }
    Ok((rewritten, true))
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATEMENT CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

fn collect_binding_names(pattern: &BindingPattern<'_>, out: &mut Vec<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => out.push(id.name.to_string()),
        BindingPattern::ObjectPattern(object) => {
            for property in &object.properties {
                collect_binding_names(&property.value, out);
            }
            if let Some(rest) = &object.rest {
                collect_binding_names(&rest.argument, out);
            }
        }
        BindingPattern::ArrayPattern(array) => {
            for element in array.elements.iter().flatten() {
                collect_binding_names(element, out);
            }
            if let Some(rest) = &array.rest {
                collect_binding_names(&rest.argument, out);
            }
        }
        BindingPattern::AssignmentPattern(assignment) => {
            collect_binding_names(&assignment.left, out);
        }
    }
}

/// Slice a statement's source text, pulling in a dangling semicolon.
fn statement_text(script: &str, span: Span) -> String {
    let start = span.start as usize;
    let mut end = span.end as usize;
    if script.as_bytes().get(end) == Some(&b';') {
        end += 1;
    }
    script[start..end].to_string()
}

/// Range to splice out for a removed statement: the statement, a dangling
/// semicolon, and the rest of its line.
fn removal_range(script: &str, span: Span) -> (usize, usize) {
    let bytes = script.as_bytes();
    let start = span.start as usize;
    let mut end = span.end as usize;
    if bytes.get(end) == Some(&b';') {
        end += 1;
    }
    while matches!(bytes.get(end), Some(&b' ') | Some(&b'\t') | Some(&b'\r')) {
        end += 1;
    }
    if bytes.get(end) == Some(&b'\n') {
        end += 1;
    }
    (start, end)
}

fn frontmatter_parse_error(
    err: &oxc_diagnostics::OxcDiagnostic,
    module_offset: u32,
    state: &CodegenState,
) -> CompileError {
    let offset = err
        .labels
        .as_ref()
        .and_then(|labels| labels.first())
        .map(|label| label.offset() as u32)
        .unwrap_or(0);
    let start = state.position_of(module_offset + offset);
    CompileError::new(
        ErrorKind::FrontmatterParse,
        state.filename.clone(),
        start,
        err.message.to_string(),
    )
    .with_frame(state.frame_at(start))
}

/// Analyze the frontmatter module and return the emitted script.
pub fn analyze_frontmatter(
    module: Option<&ModuleBlock>,
    state: &mut CodegenState,
    opts: &CodegenOptions,
    transformer: &dyn ExpressionTransformer,
    has_custom_elements: bool,
) -> Result<String, CompileError> {
    let Some(module) = module else {
        return Ok(String::new());
    };
    if module.content.trim().is_empty() {
        return Ok(String::new());
    }
    let module_offset = module.span.start;

    let (script, rewrote) = rewrite_fetch_content(&module.content, module_offset, state)?;

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, &script, fragment_source_type()).parse();
    if let Some(err) = ret.errors.first() {
        return Err(frontmatter_parse_error(err, module_offset, state));
    }

    let mut removals: Vec<(usize, usize)> = Vec::new();
    let mut import_lines: Vec<String> = Vec::new();
    let mut export_lines: Vec<String> = Vec::new();
    let mut prop_names: Vec<String> = Vec::new();
    let mut custom_element_sources: Vec<String> = Vec::new();

    for stmt in ret.program.body.iter().rev() {
        match stmt {
            Statement::ImportDeclaration(import) => {
                let source = import.source.value.to_string();
                if is_bare_builtin(&source) {
                    let start = state.position_of(module_offset + import.span.start);
                    return Err(CompileError::new(
                        ErrorKind::BareBuiltinModule,
                        state.filename.clone(),
                        start,
                        format!(
                            "Builtin module \"{source}\" must be imported with the \"node:\" scheme, e.g. \"node:{source}\""
                        ),
                    )
                    .with_frame(state.frame_at(start)));
                }

                let text = statement_text(&script, import.span);
                match &import.specifiers {
                    Some(specifiers) if !specifiers.is_empty() => {
                        for specifier in specifiers {
                            let info = match specifier {
                                ImportDeclarationSpecifier::ImportSpecifier(s) => ComponentInfo {
                                    specifier_kind: ImportSpecifierKind::Named,
                                    local_name: s.local.name.to_string(),
                                    exported_name: Some(s.imported.name().to_string()),
                                    source_url: source.clone(),
                                },
                                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                                    ComponentInfo {
                                        specifier_kind: ImportSpecifierKind::Default,
                                        local_name: s.local.name.to_string(),
                                        exported_name: None,
                                        source_url: source.clone(),
                                    }
                                }
                                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                                    ComponentInfo {
                                        specifier_kind: ImportSpecifierKind::Namespace,
                                        local_name: s.local.name.to_string(),
                                        exported_name: None,
                                        source_url: source.clone(),
                                    }
                                }
                            };
                            state.record_component(info, &text);
                        }
                    }
                    _ => {
                        if has_custom_elements {
                            custom_element_sources.push(source);
                        }
                    }
                }
                import_lines.push(text);
                removals.push(removal_range(&script, import.span));
            }

            Statement::ExportNamedDeclaration(export) => {
                if export.source.is_some() {
                    continue; // re-export, leave in place
                }
                match &export.declaration {
                    Some(Declaration::VariableDeclaration(var)) => {
                        let mut names = Vec::new();
                        for declarator in &var.declarations {
                            collect_binding_names(&declarator.id, &mut names);
                        }
                        let text = statement_text(&script, export.span);
                        if names.iter().any(|n| n == "__layout" || n == "__content") {
                            export_lines.push(text);
                        } else {
                            prop_names.extend(names);
                        }
                        removals.push(removal_range(&script, export.span));
                    }
                    Some(Declaration::FunctionDeclaration(func))
                        if func.id.as_ref().is_some_and(|id| id.name == "getStaticPaths") =>
                    {
                        state.get_static_paths = Some(statement_text(&script, export.span));
                        removals.push(removal_range(&script, export.span));
                    }
                    _ => {} // leave in place
                }
            }

            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    state.declarations.insert(id.name.to_string());
                }
            }

            Statement::VariableDeclaration(var) => {
                let mut names = Vec::new();
                for declarator in &var.declarations {
                    collect_binding_names(&declarator.id, &mut names);
                }
                for name in names {
                    state.declarations.insert(name);
                }
            }

            _ => {} // leave in place
        }
    }

    // The reverse walk collected everything back-to-front; restore source
    // order before it becomes observable.
    import_lines.reverse();
    export_lines.reverse();
    prop_names.reverse();
    custom_element_sources.reverse();

    for line in import_lines {
        state.add_import_statement(line);
    }
    for line in export_lines {
        state.add_export_statement(line);
    }
    for source in custom_element_sources {
        let alias = state.next_custom_element_alias();
        let url = component_runtime_url(opts.config(), &source, &opts.filename);
        state.custom_element_candidates.push((alias, url));
    }

    if !prop_names.is_empty() {
        opts.sink().warn(
            LogEvent::new(format!(
                "`export` props are deprecated. Use `const {{ {} }} = Astro.props;` instead.",
                prop_names.join(", ")
            ))
            .at(state.filename.clone(), state.position_of(module_offset)),
        );
    }

    if rewrote {
        state.add_import_statement(FETCH_CONTENT_IMPORT);
    }

    let mut survivor = script;
    removals.sort_by(|a, b| b.0.cmp(&a.0));
    for (start, end) in removals {
        survivor.replace_range(start..end, "");
    }
    if survivor.trim().is_empty() {
        return Ok(String::new());
    }

    transpile_fragment(transformer, &survivor, module_offset, state)
}

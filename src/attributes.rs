//! Attribute resolution.
//!
//! Turns parsed attribute nodes into an insertion-ordered name → code
//! fragment map. Text values are quoted through serde_json so escaping
//! matches JS string literal rules exactly.

use crate::ast::{AttributeNode, AttributeSegment, AttributeValue};
use crate::components::is_page_file;
use crate::error::{CompileError, ErrorKind};
use crate::options::{CodegenOptions, LogEvent};
use crate::state::CodegenState;
use crate::transpile::{transpile_fragment, ExpressionTransformer};

/// Insertion-ordered attribute map. Small enough that linear scans beat a
/// real map, and emission order must follow source order anyway.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAttributes {
    entries: Vec<(String, String)>,
}

impl ResolvedAttributes {
    pub fn push(&mut self, name: String, value: String) {
        self.entries.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.entries.iter()
    }
}

/// Quote a Rust string as a JS string literal.
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Resolve every attribute on a node into code fragments. A transpile
/// failure inside an attribute expression is reported through the sink and
/// the attribute is dropped; the compile continues.
pub fn resolve_attributes(
    attributes: &[AttributeNode],
    state: &CodegenState,
    opts: &CodegenOptions,
    transformer: &dyn ExpressionTransformer,
) -> Result<ResolvedAttributes, CompileError> {
    let mut resolved = ResolvedAttributes::default();

    for attribute in attributes {
        match attribute {
            AttributeNode::Spread(spread) => {
                let source = spread.expression.joined_chunks();
                match transpile_fragment(transformer, &source, spread.expression.span.start, state) {
                    Ok(code) => resolved.push(format!("...({code})"), String::new()),
                    Err(err) => report_recovered(opts, &err),
                }
            }
            AttributeNode::Attribute(attr) => match &attr.value {
                AttributeValue::Bool(true) => resolved.push(attr.name.clone(), "true".to_string()),
                AttributeValue::Bool(false) => {}
                AttributeValue::Segments(segments) if segments.is_empty() => {
                    resolved.push(attr.name.clone(), "\"\"".to_string());
                }
                AttributeValue::Segments(segments) if segments.len() > 1 => {
                    let mut parts = Vec::with_capacity(segments.len());
                    for segment in segments {
                        match segment {
                            AttributeSegment::Text(text) => parts.push(js_string(&text.data)),
                            AttributeSegment::MustacheTag(tag) => {
                                let chunk = tag
                                    .expression
                                    .code_chunks
                                    .first()
                                    .ok_or_else(|| unknown_value(attr, state))?;
                                parts.push(chunk.clone());
                            }
                            AttributeSegment::AttributeShorthand(_) => {
                                return Err(unknown_value(attr, state));
                            }
                        }
                    }
                    resolved.push(attr.name.clone(), format!("({})", parts.join("+")));
                }
                AttributeValue::Segments(segments) => match &segments[0] {
                    AttributeSegment::MustacheTag(tag) => {
                        let source = tag.expression.joined_chunks();
                        match transpile_fragment(
                            transformer,
                            &source,
                            tag.expression.span.start,
                            state,
                        ) {
                            Ok(code) => resolved.push(attr.name.clone(), format!("({code})")),
                            Err(err) => report_recovered(opts, &err),
                        }
                    }
                    AttributeSegment::Text(text) => {
                        warn_if_relative_path(&text.data, state, opts, attr.span.start);
                        resolved.push(attr.name.clone(), js_string(&text.data));
                    }
                    AttributeSegment::AttributeShorthand(_) => {
                        resolved.push(attr.name.clone(), format!("({})", attr.name));
                    }
                },
            },
        }
    }

    Ok(resolved)
}

fn unknown_value(attr: &crate::ast::Attribute, state: &CodegenState) -> CompileError {
    let start = state.position_of(attr.span.start);
    CompileError::new(
        ErrorKind::UnknownNode,
        state.filename.clone(),
        start,
        format!("Unknown attribute value kind on \"{}\"", attr.name),
    )
    .with_frame(state.frame_at(start))
}

fn report_recovered(opts: &CodegenOptions, err: &CompileError) {
    opts.sink().parse_error(
        LogEvent::new(err.message.clone())
            .at(err.filename.clone(), err.start)
            .with_frame(err.frame.clone()),
    );
}

/// Relative-path string literals are usually mistakes outside page files:
/// the emitted module is served from a rewritten URL, so `./`-style paths
/// no longer point where the author thinks.
fn warn_if_relative_path(value: &str, state: &CodegenState, opts: &CodegenOptions, offset: u32) {
    if is_page_file(opts.config(), &state.filename) {
        return;
    }
    if value.starts_with("./") || value.starts_with("../") {
        opts.sink().warn(
            LogEvent::new(format!(
                "Relative path \"{value}\" will not resolve from the built component. Use an absolute path instead."
            ))
            .at(state.filename.clone(), state.position_of(offset)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        Attribute, ExpressionNode, MustacheValue, ShorthandValue, Span, SpreadAttribute, TextNode,
    };
    use crate::transpile::OxcTransformer;

    fn text_segment(data: &str) -> AttributeSegment {
        AttributeSegment::Text(TextNode {
            data: data.to_string(),
            span: Span::default(),
        })
    }

    fn mustache_segment(code: &str) -> AttributeSegment {
        AttributeSegment::MustacheTag(MustacheValue {
            expression: ExpressionNode {
                code_chunks: vec![code.to_string()],
                children: vec![],
                span: Span::default(),
            },
            span: Span::default(),
        })
    }

    fn attr(name: &str, value: AttributeValue) -> AttributeNode {
        AttributeNode::Attribute(Attribute {
            name: name.to_string(),
            value,
            span: Span::default(),
        })
    }

    fn resolve(attrs: &[AttributeNode]) -> ResolvedAttributes {
        let state = CodegenState::new("/src/pages/index.astro", "index.astro");
        let opts = CodegenOptions::new("/src/pages/index.astro", "index.astro");
        resolve_attributes(attrs, &state, &opts, &OxcTransformer).unwrap()
    }

    #[test]
    fn text_values_are_json_quoted() {
        let resolved = resolve(&[attr(
            "title",
            AttributeValue::Segments(vec![text_segment("say \"hi\"")]),
        )]);
        assert_eq!(resolved.get("title"), Some("\"say \\\"hi\\\"\""));
    }

    #[test]
    fn boolean_and_empty_values() {
        let resolved = resolve(&[
            attr("hidden", AttributeValue::Bool(true)),
            attr("skipped", AttributeValue::Bool(false)),
            attr("empty", AttributeValue::Segments(vec![])),
        ]);
        assert_eq!(resolved.get("hidden"), Some("true"));
        assert!(resolved.get("skipped").is_none());
        assert_eq!(resolved.get("empty"), Some("\"\""));
    }

    #[test]
    fn mustache_values_are_parenthesized() {
        let resolved = resolve(&[attr(
            "count",
            AttributeValue::Segments(vec![mustache_segment("items.length")]),
        )]);
        assert_eq!(resolved.get("count"), Some("(items.length)"));
    }

    #[test]
    fn multi_segment_values_join_with_plus() {
        let resolved = resolve(&[attr(
            "class",
            AttributeValue::Segments(vec![text_segment("btn "), mustache_segment("variant")]),
        )]);
        assert_eq!(resolved.get("class"), Some("(\"btn \"+variant)"));
    }

    #[test]
    fn shorthand_uses_the_attribute_name() {
        let resolved = resolve(&[attr(
            "title",
            AttributeValue::Segments(vec![AttributeSegment::AttributeShorthand(
                ShorthandValue::default(),
            )]),
        )]);
        assert_eq!(resolved.get("title"), Some("(title)"));
    }

    #[test]
    fn spread_becomes_a_spread_key() {
        let resolved = resolve(&[AttributeNode::Spread(SpreadAttribute {
            expression: ExpressionNode {
                code_chunks: vec!["props".to_string()],
                children: vec![],
                span: Span::default(),
            },
            span: Span::default(),
        })]);
        assert_eq!(resolved.get("...(props)"), Some(""));
    }
}

//! Markdown region support.
//!
//! A `<Markdown>` region buffers raw text during the template walk. On
//! flush the text is dedented, rendered to HTML by an external
//! [`MarkdownRenderer`], re-parsed with html5ever, and the resulting
//! subtree re-enters codegen. The default renderer is plain CommonMark.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use thiserror::Error;

use crate::ast::{
    Attribute, AttributeNode, AttributeSegment, AttributeValue, ElementNode, Span, TemplateNode,
    TextNode,
};

#[derive(Debug, Clone, Error)]
#[error("markdown render failed: {message}")]
pub struct MarkdownRenderError {
    pub message: String,
}

pub trait MarkdownRenderer {
    /// Render Markdown source to HTML. `scope` is the scoped class name of
    /// the surrounding document, for renderers that support style scoping.
    fn render(&self, source: &str, scope: Option<&str>) -> Result<String, MarkdownRenderError>;
}

/// Default renderer: plain CommonMark, ignoring the scope class.
pub struct CommonmarkRenderer;

impl MarkdownRenderer for CommonmarkRenderer {
    fn render(&self, source: &str, _scope: Option<&str>) -> Result<String, MarkdownRenderError> {
        Ok(markdown::to_html(source))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEDENT
// ═══════════════════════════════════════════════════════════════════════════════

fn leading_ws(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b' ' || *b == b'\t').count()
}

/// Strip the common leading indentation so template-indented Markdown
/// still parses as block content.
pub fn dedent(input: &str) -> String {
    let min_indent = input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(leading_ws)
        .min()
        .unwrap_or(0);
    if min_indent == 0 {
        return input.to_string();
    }
    input
        .lines()
        .map(|line| if line.len() >= min_indent { &line[min_indent..] } else { "" })
        .collect::<Vec<_>>()
        .join("\n")
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERED-HTML RE-PARSE
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse rendered Markdown HTML back into template nodes so the result can
/// re-enter codegen.
pub fn parse_rendered_html(html: &str) -> Vec<TemplateNode> {
    let dom = match parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
    {
        Ok(dom) => dom,
        Err(_) => return Vec::new(),
    };

    let mut nodes = Vec::new();
    collect_body_content(&dom.document, &mut nodes);
    nodes
}

/// The document parser wraps fragments in synthetic `<html>`/`<head>`/
/// `<body>` elements; descend through them and convert the real content.
fn collect_body_content(handle: &Handle, out: &mut Vec<TemplateNode>) {
    match &handle.data {
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                collect_body_content(child, out);
            }
        }
        NodeData::Element { name, .. }
            if matches!(name.local.as_ref(), "html" | "head" | "body") =>
        {
            for child in handle.children.borrow().iter() {
                collect_body_content(child, out);
            }
        }
        _ => {
            if let Some(node) = convert_node(handle) {
                out.push(node);
            }
        }
    }
}

fn convert_node(handle: &Handle) -> Option<TemplateNode> {
    match &handle.data {
        NodeData::Text { contents } => Some(TemplateNode::Text(TextNode {
            data: contents.borrow().to_string(),
            span: Span::default(),
        })),
        NodeData::Element { name, attrs, .. } => {
            let attributes = attrs
                .borrow()
                .iter()
                .map(|attr| {
                    AttributeNode::Attribute(Attribute {
                        name: attr.name.local.to_string(),
                        value: AttributeValue::Segments(vec![AttributeSegment::Text(TextNode {
                            data: attr.value.to_string(),
                            span: Span::default(),
                        })]),
                        span: Span::default(),
                    })
                })
                .collect();
            let children = handle
                .children
                .borrow()
                .iter()
                .filter_map(convert_node)
                .collect();
            Some(TemplateNode::Element(ElementNode {
                name: name.local.to_string(),
                attributes,
                children,
                span: Span::default(),
            }))
        }
        _ => None,
    }
}

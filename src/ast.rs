//! Input AST for the document compiler.
//!
//! The front-end parser hands us a root document with three children: an
//! optional frontmatter module (script text plus its source range), an
//! ordered list of style blocks, and the html tree. Every node carries a
//! byte range into the original file so diagnostics can point at user
//! source. The whole tree round-trips through serde, which is also the
//! contract the napi bridge uses.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// META FLAGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Set when the parser saw at least one custom-element import candidate.
pub const FEATURE_CUSTOM_ELEMENT: u32 = 1 << 0;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AstMeta {
    #[serde(default)]
    pub features: u32,
}

impl AstMeta {
    pub fn has_custom_elements(&self) -> bool {
        self.features & FEATURE_CUSTOM_ELEMENT != 0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPANS
// ═══════════════════════════════════════════════════════════════════════════════

/// Byte range into the original file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENT ROOT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ast {
    /// Frontmatter script block, when the document has one.
    #[serde(default)]
    pub module: Option<ModuleBlock>,
    /// Top-level `<style>` blocks, in document order.
    #[serde(default)]
    pub css: Vec<StyleNode>,
    /// The html tree. The root node itself emits nothing; codegen walks
    /// its children.
    pub html: HtmlRoot,
    #[serde(default)]
    pub meta: AstMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleBlock {
    pub content: String,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlRoot {
    #[serde(default)]
    pub children: Vec<TemplateNode>,
    #[serde(default)]
    pub span: Span,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TemplateNode {
    Element(ElementNode),
    InlineComponent(ElementNode),
    Fragment(FragmentNode),
    Slot(ElementNode),
    SlotTemplate(ElementNode),
    Head(ElementNode),
    Title(ElementNode),
    Body(ElementNode),
    Text(TextNode),
    MustacheTag(MustacheNode),
    Expression(ExpressionNode),
    CodeSpan(RawNode),
    CodeFence(RawNode),
    Comment(RawNode),
    Style(StyleNode),
}

impl TemplateNode {
    /// Element-class nodes share the attribute/children shape and the
    /// hyperscript emission path.
    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            TemplateNode::Element(el)
            | TemplateNode::InlineComponent(el)
            | TemplateNode::Slot(el)
            | TemplateNode::SlotTemplate(el)
            | TemplateNode::Head(el)
            | TemplateNode::Title(el)
            | TemplateNode::Body(el) => Some(el),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeNode>,
    #[serde(default)]
    pub children: Vec<TemplateNode>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentNode {
    #[serde(default)]
    pub children: Vec<TemplateNode>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub data: String,
    #[serde(default)]
    pub span: Span,
}

/// `{ ... }` in template position. The expression payload lives in the
/// children (an [`ExpressionNode`]); inside a Markdown region the tag only
/// promotes the active buffer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MustacheNode {
    #[serde(default)]
    pub children: Vec<TemplateNode>,
    #[serde(default)]
    pub span: Span,
}

/// An embedded expression: alternating code chunks and template children
/// to be spliced between them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionNode {
    #[serde(default)]
    pub code_chunks: Vec<String>,
    #[serde(default)]
    pub children: Vec<TemplateNode>,
    #[serde(default)]
    pub span: Span,
}

impl ExpressionNode {
    pub fn joined_chunks(&self) -> String {
        self.code_chunks.concat()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub data: String,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleNode {
    /// Raw CSS text, collected verbatim.
    pub content: String,
    #[serde(default)]
    pub span: Span,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AttributeNode {
    Attribute(Attribute),
    Spread(SpreadAttribute),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadAttribute {
    pub expression: ExpressionNode,
    #[serde(default)]
    pub span: Span,
}

/// Either a bare boolean attribute or a list of value segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Segments(Vec<AttributeSegment>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AttributeSegment {
    Text(TextNode),
    MustacheTag(MustacheValue),
    AttributeShorthand(ShorthandValue),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MustacheValue {
    pub expression: ExpressionNode,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShorthandValue {
    #[serde(default)]
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_nodes_round_trip_through_json() {
        let node = TemplateNode::Element(ElementNode {
            name: "h1".to_string(),
            attributes: vec![AttributeNode::Attribute(Attribute {
                name: "class".to_string(),
                value: AttributeValue::Segments(vec![AttributeSegment::Text(TextNode {
                    data: "title".to_string(),
                    span: Span::default(),
                })]),
                span: Span::default(),
            })],
            children: vec![TemplateNode::Text(TextNode {
                data: "Hi".to_string(),
                span: Span::default(),
            })],
            span: Span::new(0, 20),
        });

        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"type\":\"Element\""));
        let back: TemplateNode = serde_json::from_str(&json).unwrap();
        let el = back.as_element().unwrap();
        assert_eq!(el.name, "h1");
        assert_eq!(el.children.len(), 1);
    }

    #[test]
    fn boolean_attribute_values_deserialize_untagged() {
        let json = r#"{"name":"hidden","value":true,"span":{"start":0,"end":0}}"#;
        let attr: Attribute = serde_json::from_str(json).unwrap();
        assert!(matches!(attr.value, AttributeValue::Bool(true)));
    }

    #[test]
    fn meta_feature_bit() {
        let meta = AstMeta {
            features: FEATURE_CUSTOM_ELEMENT,
        };
        assert!(meta.has_custom_elements());
        assert!(!AstMeta::default().has_custom_elements());
    }
}

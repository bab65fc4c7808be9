//! CSS extraction.
//!
//! Collects the raw text of every `<style>` block (the root's style list
//! first, then any `<style>` nodes left inside the template) and removes
//! the template nodes so the hyperscript walk never inlines them. CSS is
//! collected verbatim; minification and global-file assembly happen
//! downstream.

use crate::ast::{Ast, TemplateNode};
use crate::state::CodegenState;

pub fn extract_css(ast: &mut Ast, state: &mut CodegenState) {
    for style in &ast.css {
        state.css.push(style.content.clone());
    }
    extract_from_children(&mut ast.html.children, state);
}

fn extract_from_children(children: &mut Vec<TemplateNode>, state: &mut CodegenState) {
    children.retain(|child| match child {
        TemplateNode::Style(style) => {
            state.css.push(style.content.clone());
            false
        }
        _ => true,
    });
    for child in children {
        match child {
            TemplateNode::Element(el)
            | TemplateNode::InlineComponent(el)
            | TemplateNode::Slot(el)
            | TemplateNode::SlotTemplate(el)
            | TemplateNode::Head(el)
            | TemplateNode::Title(el)
            | TemplateNode::Body(el) => extract_from_children(&mut el.children, state),
            TemplateNode::Fragment(fragment) => extract_from_children(&mut fragment.children, state),
            TemplateNode::MustacheTag(tag) => extract_from_children(&mut tag.children, state),
            TemplateNode::Expression(expr) => extract_from_children(&mut expr.children, state),
            _ => {}
        }
    }
}

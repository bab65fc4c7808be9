//! End-to-end codegen scenarios.
//!
//! Each test drives the whole pipeline through [`codegen`] with a
//! hand-built AST, the way the front-end parser would hand one over.

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::ast::{
        Ast, AstMeta, Attribute, AttributeNode, AttributeSegment, AttributeValue, ElementNode,
        ExpressionNode, HtmlRoot, ModuleBlock, MustacheNode, Span, TemplateNode, TextNode,
    };
    use crate::codegen::{codegen, Artifact};
    use crate::options::{CodegenOptions, CompileOptions, LogEvent, LogSink};
    use crate::template::{COMPONENT_WRAPPER_IMPORT, FRAGMENT_RUNTIME_IMPORT};

    // ═══════════════════════════════════════════════════════════════════════════
    // SINK
    // ═══════════════════════════════════════════════════════════════════════════

    #[derive(Default)]
    struct CaptureSink {
        warnings: RefCell<Vec<LogEvent>>,
        parse_errors: RefCell<Vec<LogEvent>>,
    }

    impl LogSink for CaptureSink {
        fn warn(&self, event: LogEvent) {
            self.warnings.borrow_mut().push(event);
        }
        fn error(&self, _event: LogEvent) {}
        fn parse_error(&self, event: LogEvent) {
            self.parse_errors.borrow_mut().push(event);
        }
    }

    fn options() -> (CodegenOptions, Rc<CaptureSink>) {
        let sink = Rc::new(CaptureSink::default());
        let opts = CodegenOptions::new("/index.astro", "index.astro").with_compile_options(
            CompileOptions {
                logging: sink.clone(),
                ..CompileOptions::default()
            },
        );
        (opts, sink)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // AST BUILDERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn doc(module: Option<&str>, children: Vec<TemplateNode>) -> Ast {
        Ast {
            module: module.map(|content| ModuleBlock {
                content: content.to_string(),
                span: Span::default(),
            }),
            css: vec![],
            html: HtmlRoot {
                children,
                span: Span::default(),
            },
            meta: AstMeta::default(),
        }
    }

    fn element(name: &str, attributes: Vec<AttributeNode>, children: Vec<TemplateNode>) -> TemplateNode {
        TemplateNode::Element(ElementNode {
            name: name.to_string(),
            attributes,
            children,
            span: Span::default(),
        })
    }

    fn component(name: &str, attributes: Vec<AttributeNode>, children: Vec<TemplateNode>) -> TemplateNode {
        TemplateNode::InlineComponent(ElementNode {
            name: name.to_string(),
            attributes,
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

    fn bool_attr(name: &str) -> AttributeNode {
        AttributeNode::Attribute(Attribute {
            name: name.to_string(),
            value: AttributeValue::Bool(true),
            span: Span::default(),
        })
    }

    fn text_attr(name: &str, value: &str) -> AttributeNode {
        AttributeNode::Attribute(Attribute {
            name: name.to_string(),
            value: AttributeValue::Segments(vec![AttributeSegment::Text(TextNode {
                data: value.to_string(),
                span: Span::default(),
            })]),
            span: Span::default(),
        })
    }

    fn mustache(code: &str) -> TemplateNode {
        TemplateNode::MustacheTag(MustacheNode {
            children: vec![TemplateNode::Expression(ExpressionNode {
                code_chunks: vec![code.to_string()],
                children: vec![],
                span: Span::default(),
            })],
            span: Span::default(),
        })
    }

    fn balanced(code: &str) -> bool {
        code.matches('(').count() == code.matches(')').count()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SCENARIOS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn empty_document() {
        let (opts, _) = options();
        let artifact = codegen(doc(None, vec![]), &opts).unwrap();
        assert_eq!(
            artifact,
            Artifact {
                script: String::new(),
                imports: vec![],
                exports: vec![],
                html: String::new(),
                css: None,
                get_static_paths: None,
                has_custom_elements: false,
                custom_element_candidates: vec![],
            }
        );
    }

    #[test]
    fn single_static_element() {
        let (opts, _) = options();
        let artifact = codegen(doc(None, vec![element("h1", vec![], vec![text("Hi")])]), &opts).unwrap();
        assert_eq!(
            artifact.html,
            "h(\"h1\",{[__astroContext]:props[__astroContext]},\"Hi\")"
        );
    }

    #[test]
    fn imported_component_with_load_hydration() {
        let (opts, _) = options();
        let artifact = codegen(
            doc(
                Some("import X from './X.jsx';"),
                vec![component("X", vec![bool_attr("client:load")], vec![])],
            ),
            &opts,
        )
        .unwrap();

        assert_eq!(
            artifact.html,
            "h(__astro_component(X, { hydrate: \"load\", displayName: \"X\", componentUrl: \"/_astro/X.js\", componentExport: {\"value\":\"default\"}, value: null }),{[__astroContext]:props[__astroContext]})"
        );
        assert!(artifact.imports.contains(&"import X from './X.jsx';".to_string()));
        assert!(artifact.imports.contains(&COMPONENT_WRAPPER_IMPORT.to_string()));
        assert!(artifact.imports.contains(&FRAGMENT_RUNTIME_IMPORT.to_string()));
    }

    #[test]
    fn client_only_collapses_to_fragment() {
        let (opts, _) = options();
        let artifact = codegen(
            doc(
                Some("import X from './X.jsx';"),
                vec![component("X", vec![bool_attr("client:only")], vec![])],
            ),
            &opts,
        )
        .unwrap();

        assert!(artifact.html.contains("__astro_component(Fragment, { hydrate: \"only\""));
        assert!(!artifact.imports.contains(&"import X from './X.jsx';".to_string()));
        assert!(artifact.imports.contains(&COMPONENT_WRAPPER_IMPORT.to_string()));
    }

    #[test]
    fn fetch_content_rewrite() {
        let (opts, _) = options();
        let artifact = codegen(
            doc(Some("const x = Astro.fetchContent('./*.md');"), vec![]),
            &opts,
        )
        .unwrap();

        assert!(artifact.script.contains("import.meta.globEager('./*.md')"));
        assert!(artifact
            .imports
            .iter()
            .any(|line| line.contains("fetchContent")));
    }

    #[test]
    fn nested_markdown_attributes_still_render() {
        let (opts, _) = options();
        let artifact = codegen(
            doc(
                None,
                vec![component(
                    "Markdown",
                    vec![],
                    vec![
                        text("outer *one*"),
                        component(
                            "Markdown",
                            vec![text_attr("$scope", "inner"), text_attr("data-x", "1")],
                            vec![text("# Inner")],
                        ),
                        text("outer *two*"),
                    ],
                )],
            ),
            &opts,
        )
        .unwrap();

        // The nested tag's ordinary attributes flush into a __render call.
        assert!(
            artifact.html.contains("Markdown.__render("),
            "html: {}",
            artifact.html
        );
        assert!(
            artifact.html.contains("\"data-x\":\"1\""),
            "html: {}",
            artifact.html
        );
        // The nested $scope is consumed, not forwarded; the outer region's
        // scope stays in force.
        assert!(!artifact.html.contains("$scope"), "html: {}", artifact.html);
        // Text buffered before the nested tag was flushed through the
        // renderer and re-entered codegen ahead of the __render call.
        assert!(artifact.html.contains("h(\"em\""), "html: {}", artifact.html);
        assert!(artifact.html.contains("\"one\""), "html: {}", artifact.html);
        assert!(balanced(&artifact.html));
    }

    #[test]
    fn markdown_region_reenters_codegen() {
        let (opts, _) = options();
        let artifact = codegen(
            doc(None, vec![component("Markdown", vec![], vec![text("# Hi")])]),
            &opts,
        )
        .unwrap();

        assert!(artifact.html.contains("h(\"h1\""), "html: {}", artifact.html);
        assert!(artifact.html.contains("\"Hi\""), "html: {}", artifact.html);
        assert!(balanced(&artifact.html));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // UNIVERSAL PROPERTIES
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn balanced_parens_for_compound_documents() {
        let (opts, _) = options();
        let ast = doc(
            Some("import X from './X.jsx';\nconst shown = true;"),
            vec![element(
                "main",
                vec![],
                vec![
                    element("h1", vec![], vec![text("Title")]),
                    mustache("shown"),
                    component("X", vec![bool_attr("client:idle")], vec![text("slot body")]),
                    component("Markdown", vec![], vec![text("*hi*")]),
                ],
            )],
        );
        let artifact = codegen(ast, &opts).unwrap();
        assert!(balanced(&artifact.html), "html: {}", artifact.html);
    }

    #[test]
    fn idempotent_emission() {
        let ast = doc(
            Some("import X from './X.jsx';"),
            vec![
                element("p", vec![text_attr("class", "lead")], vec![text("a")]),
                component("X", vec![bool_attr("client:load")], vec![]),
            ],
        );
        let (opts_a, _) = options();
        let (opts_b, _) = options();
        let first = codegen(ast.clone(), &opts_a).unwrap();
        let second = codegen(ast, &opts_b).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn imports_contain_no_duplicates() {
        let (opts, _) = options();
        let artifact = codegen(
            doc(
                Some("import X from './X.jsx';\nimport Y from './Y.jsx';"),
                vec![
                    component("X", vec![bool_attr("client:load")], vec![]),
                    component("Y", vec![bool_attr("client:load")], vec![]),
                ],
            ),
            &opts,
        )
        .unwrap();

        let unique: std::collections::HashSet<&String> = artifact.imports.iter().collect();
        assert_eq!(unique.len(), artifact.imports.len());
    }

    #[test]
    fn slot_name_round_trip() {
        let (opts, _) = options();
        let artifact = codegen(
            doc(
                Some("import Layout from './Layout.astro';"),
                vec![component(
                    "Layout",
                    vec![],
                    vec![element("p", vec![text_attr("slot", "X")], vec![text("body")])],
                )],
            ),
            &opts,
        )
        .unwrap();

        assert!(
            artifact.html.contains("h(__astro_slot_content, { name: \"X\" },"),
            "html: {}",
            artifact.html
        );
        assert!(balanced(&artifact.html));
    }

    #[test]
    fn one_h_call_per_emitted_element() {
        let (opts, _) = options();
        let artifact = codegen(
            doc(
                None,
                vec![element(
                    "ul",
                    vec![],
                    vec![
                        element("li", vec![], vec![text("a")]),
                        element("li", vec![], vec![text("b")]),
                    ],
                )],
            ),
            &opts,
        )
        .unwrap();
        assert_eq!(artifact.html.matches("h(").count(), 3);
    }

    #[test]
    fn skipped_expressions_leave_no_debris() {
        let (opts, _) = options();
        let artifact = codegen(
            doc(None, vec![element("div", vec![], vec![mustache("false")])]),
            &opts,
        )
        .unwrap();
        assert_eq!(artifact.html, "h(\"div\",{[__astroContext]:props[__astroContext]})");
    }

    #[test]
    fn get_static_paths_reaches_the_artifact() {
        let (opts, _) = options();
        let artifact = codegen(
            doc(
                Some("export function getStaticPaths() {\n  return [];\n}"),
                vec![],
            ),
            &opts,
        )
        .unwrap();
        let lifted = artifact.get_static_paths.unwrap();
        assert!(lifted.starts_with("export function getStaticPaths()"));
        assert!(artifact.script.is_empty());
    }

    #[test]
    fn css_blocks_join_with_blank_lines() {
        let (opts, _) = options();
        let mut ast = doc(None, vec![element("p", vec![], vec![text("x")])]);
        ast.css = vec![
            crate::ast::StyleNode {
                content: ".a{}".to_string(),
                span: Span::default(),
            },
            crate::ast::StyleNode {
                content: ".b{}".to_string(),
                span: Span::default(),
            },
        ];
        let artifact = codegen(ast, &opts).unwrap();
        assert_eq!(artifact.css.as_deref(), Some(".a{}\n\n.b{}"));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // WARNINGS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn legacy_hydration_syntax_warns_and_hydrates() {
        let (opts, sink) = options();
        let artifact = codegen(
            doc(
                Some("import X from './X.jsx';"),
                vec![component("X:load", vec![], vec![])],
            ),
            &opts,
        )
        .unwrap();

        assert!(artifact.html.contains("hydrate: \"load\""));
        let warnings = sink.warnings.borrow();
        assert!(warnings.iter().any(|w| w.message.contains("deprecated")));
    }

    #[test]
    fn exported_props_warn_and_are_dropped() {
        let (opts, sink) = options();
        let artifact = codegen(
            doc(Some("export let title = 'x';\nconst keep = 1;"), vec![]),
            &opts,
        )
        .unwrap();

        assert!(!artifact.script.contains("export let"));
        assert!(artifact.script.contains("const keep = 1"));
        let warnings = sink.warnings.borrow();
        assert!(warnings.iter().any(|w| w.message.contains("title")));
    }

    #[test]
    fn relative_path_attribute_warns_outside_pages() {
        let (opts, sink) = options();
        codegen(
            doc(
                None,
                vec![element("img", vec![text_attr("src", "../images/a.png")], vec![])],
            ),
            &opts,
        )
        .unwrap();
        assert!(sink
            .warnings
            .borrow()
            .iter()
            .any(|w| w.message.contains("../images/a.png")));

        // Page files are exempt.
        let sink2 = Rc::new(CaptureSink::default());
        let page_opts = CodegenOptions::new("/src/pages/index.astro", "index.astro")
            .with_compile_options(CompileOptions {
                logging: sink2.clone(),
                ..CompileOptions::default()
            });
        codegen(
            doc(
                None,
                vec![element("img", vec![text_attr("src", "../images/a.png")], vec![])],
            ),
            &page_opts,
        )
        .unwrap();
        assert!(sink2.warnings.borrow().is_empty());
    }

    #[test]
    fn broken_template_expression_is_recovered() {
        let (opts, sink) = options();
        let artifact = codegen(
            doc(None, vec![element("div", vec![], vec![mustache("const = !")])]),
            &opts,
        )
        .unwrap();

        assert_eq!(artifact.html, "h(\"div\",{[__astroContext]:props[__astroContext]})");
        assert_eq!(sink.parse_errors.borrow().len(), 1);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FATALS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn unresolved_component_is_fatal() {
        let (opts, _) = options();
        let err = codegen(doc(None, vec![component("Missing", vec![], vec![])]), &opts).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UnresolvedComponent);
        assert!(err.message.contains("Unable to render \"Missing\""));
    }

    #[test]
    fn hydrating_a_frontmatter_component_is_fatal() {
        let (opts, _) = options();
        let err = codegen(
            doc(
                Some("function Local() { return null; }"),
                vec![component("Local", vec![bool_attr("client:load")], vec![])],
            ),
            &opts,
        )
        .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::IllegalHydration);
    }
}

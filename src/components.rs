//! Component resolution and runtime URL synthesis.

use crate::options::AstroConfig;
use crate::state::CodegenState;

/// What a template tag resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedComponent {
    /// Brought into scope by a frontmatter import.
    Imported,
    /// Declared in the frontmatter itself.
    FrontmatterDefined,
    /// Lowercase tag with a hyphen, handled through the element registry.
    CustomElement,
    /// The built-in `Fragment` component.
    Fragment,
}

/// Resolve a tag name against the frontmatter symbol table. Dotted names
/// resolve their first segment (namespace import access). Returns `None`
/// for an undefined component; the caller turns that into the fatal
/// "Unable to render" error.
pub fn resolve_component(name: &str, state: &CodegenState) -> Option<ResolvedComponent> {
    let lookup = name.split('.').next().unwrap_or(name);
    if state.components.contains_key(lookup) {
        return Some(ResolvedComponent::Imported);
    }
    if is_custom_element(name) {
        return Some(ResolvedComponent::CustomElement);
    }
    if state.declarations.contains(lookup) {
        return Some(ResolvedComponent::FrontmatterDefined);
    }
    if name == "Fragment" {
        return Some(ResolvedComponent::Fragment);
    }
    None
}

/// Tags that look like components rather than plain HTML: capitalized,
/// dotted, or custom elements.
pub fn is_component_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase()) || name.contains('.') || is_custom_element(name)
}

pub fn is_custom_element(name: &str) -> bool {
    name.contains('-') && name.starts_with(|c: char| c.is_ascii_lowercase())
}

// ═══════════════════════════════════════════════════════════════════════════════
// RUNTIME URLS
// ═══════════════════════════════════════════════════════════════════════════════

/// Extensions that collapse to `.js`; everything else keeps its extension
/// as part of the path and gains a `.js` suffix.
const PLAIN_EXTENSIONS: [&str; 4] = ["js", "jsx", "ts", "tsx"];

fn strip_scheme(path: &str) -> &str {
    path.strip_prefix("file://").unwrap_or(path)
}

/// Join a specifier against the importing file, resolving `.` and `..`
/// segments without touching the filesystem. Bare specifiers pass through.
fn join_specifier(parent_file: &str, specifier: &str) -> String {
    if !specifier.starts_with("./") && !specifier.starts_with("../") {
        return specifier.to_string();
    }
    let parent = strip_scheme(parent_file);
    let dir = match parent.rfind('/') {
        Some(idx) => &parent[..idx],
        None => "",
    };
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

fn rewrite_extension(path: &str) -> String {
    let last_segment_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[last_segment_start..].rfind('.') {
        Some(rel_dot) => {
            let dot = last_segment_start + rel_dot;
            let ext = &path[dot + 1..];
            if PLAIN_EXTENSIONS.contains(&ext) {
                format!("{}.js", &path[..dot])
            } else {
                format!("{}.js", path)
            }
        }
        None => format!("{}.js", path),
    }
}

/// Synthesize the runtime URL the hydration loader fetches a component
/// from: join against the importing file, strip the project root, rewrite
/// the extension, and prefix `/_astro/`.
pub fn component_runtime_url(config: &AstroConfig, specifier: &str, parent_file: &str) -> String {
    let joined = join_specifier(parent_file, specifier);
    let root = strip_scheme(&config.project_root);
    let stripped = joined
        .strip_prefix(root)
        .unwrap_or(&joined)
        .trim_start_matches('/');
    format!("/_astro/{}", rewrite_extension(stripped))
}

/// Whether a file lives under the configured pages root.
pub fn is_page_file(config: &AstroConfig, filename: &str) -> bool {
    strip_scheme(filename).starts_with(strip_scheme(&config.pages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ComponentInfo, ImportSpecifierKind};

    fn state_with_component(local: &str) -> CodegenState {
        let mut state = CodegenState::new("/index.astro", "index.astro");
        state.record_component(
            ComponentInfo {
                specifier_kind: ImportSpecifierKind::Default,
                local_name: local.to_string(),
                exported_name: None,
                source_url: format!("./{local}.jsx"),
            },
            &format!("import {local} from './{local}.jsx';"),
        );
        state
    }

    #[test]
    fn resolves_imported_and_dotted_names() {
        let state = state_with_component("Ns");
        assert_eq!(resolve_component("Ns", &state), Some(ResolvedComponent::Imported));
        assert_eq!(resolve_component("Ns.Button", &state), Some(ResolvedComponent::Imported));
    }

    #[test]
    fn resolution_precedence() {
        let mut state = CodegenState::new("/index.astro", "index.astro");
        state.declarations.insert("Local".to_string());
        assert_eq!(
            resolve_component("Local", &state),
            Some(ResolvedComponent::FrontmatterDefined)
        );
        assert_eq!(
            resolve_component("my-element", &state),
            Some(ResolvedComponent::CustomElement)
        );
        assert_eq!(resolve_component("Fragment", &state), Some(ResolvedComponent::Fragment));
        assert_eq!(resolve_component("Missing", &state), None);
    }

    #[test]
    fn custom_element_detection() {
        assert!(is_custom_element("my-element"));
        assert!(!is_custom_element("My-Element"));
        assert!(!is_custom_element("div"));
    }

    #[test]
    fn runtime_url_collapses_plain_extensions() {
        let config = AstroConfig::default();
        assert_eq!(
            component_runtime_url(&config, "./X.jsx", "/index.astro"),
            "/_astro/X.js"
        );
        assert_eq!(
            component_runtime_url(&config, "./components/Counter.tsx", "/src/pages/index.astro"),
            "/_astro/src/pages/components/Counter.js"
        );
    }

    #[test]
    fn runtime_url_preserves_other_extensions() {
        let config = AstroConfig::default();
        assert_eq!(
            component_runtime_url(&config, "./Widget.vue", "/index.astro"),
            "/_astro/Widget.vue.js"
        );
        assert_eq!(
            component_runtime_url(&config, "./Chart.svelte", "/index.astro"),
            "/_astro/Chart.svelte.js"
        );
    }

    #[test]
    fn runtime_url_resolves_parent_segments_and_roots() {
        let config = AstroConfig::default().with_project_root("/proj/");
        assert_eq!(
            component_runtime_url(&config, "../shared/X.ts", "/proj/src/pages/index.astro"),
            "/_astro/src/shared/X.js"
        );
        let file_config = AstroConfig::default().with_project_root("file:///proj/");
        assert_eq!(
            component_runtime_url(&file_config, "./X.jsx", "file:///proj/index.astro"),
            "/_astro/X.js"
        );
    }

    #[test]
    fn page_file_detection() {
        let config = AstroConfig::default();
        assert!(is_page_file(&config, "/src/pages/index.astro"));
        assert!(!is_page_file(&config, "/src/components/Card.astro"));
    }
}

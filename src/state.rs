//! Per-document codegen state.
//!
//! One [`CodegenState`] lives for exactly one document compile. The
//! frontmatter analyzer populates it, the CSS extractor appends to it, and
//! the template walk reads it while emitting code. It must never be reused
//! across documents.

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{code_frame, offset_to_position, Position};

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT INFO
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportSpecifierKind {
    Default,
    Named,
    Namespace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    pub specifier_kind: ImportSpecifierKind,
    pub local_name: String,
    /// Present for named imports where the exported name differs from (or
    /// equals) the local binding.
    pub exported_name: Option<String>,
    /// Import source exactly as written.
    pub source_url: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKDOWN MARKER
// ═══════════════════════════════════════════════════════════════════════════════

/// Depth marker for `<Markdown>` regions. `Outside` iff the count would be
/// zero; the count tracks nesting because Markdown regions may nest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownMarker {
    Outside,
    Inside { scope: Option<String>, count: u32 },
}

impl MarkdownMarker {
    pub fn is_inside(&self) -> bool {
        matches!(self, MarkdownMarker::Inside { .. })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct CodegenState {
    /// Local name → import info for every component the frontmatter brought
    /// into scope.
    pub components: HashMap<String, ComponentInfo>,
    /// Local name → the verbatim import lines that introduced it, kept so
    /// `client:only` can delete them again.
    pub component_imports: HashMap<String, Vec<String>>,
    /// Synthesized module alias → emitted runtime URL, insertion-ordered.
    pub custom_element_candidates: Vec<(String, String)>,
    /// Identifiers declared in the frontmatter (functions and variables).
    pub declarations: HashSet<String>,
    /// Verbatim import lines, deduplicated by exact string equality.
    pub import_statements: Vec<String>,
    seen_imports: HashSet<String>,
    /// Verbatim export lines (`__layout` / `__content`).
    pub export_statements: Vec<String>,
    /// Collected CSS blocks, in document order.
    pub css: Vec<String>,
    /// Markdown region marker.
    pub markers: MarkdownMarker,
    /// Lifted `getStaticPaths` declaration, verbatim.
    pub get_static_paths: Option<String>,
    pub filename: String,
    pub file_id: String,
    /// Original file text, read lazily and best-effort on the diagnostic
    /// path only.
    source: OnceCell<Option<String>>,
}

impl CodegenState {
    pub fn new(filename: impl Into<String>, file_id: impl Into<String>) -> Self {
        CodegenState {
            components: HashMap::new(),
            component_imports: HashMap::new(),
            custom_element_candidates: Vec::new(),
            declarations: HashSet::new(),
            import_statements: Vec::new(),
            seen_imports: HashSet::new(),
            export_statements: Vec::new(),
            css: Vec::new(),
            markers: MarkdownMarker::Outside,
            get_static_paths: None,
            filename: filename.into(),
            file_id: file_id.into(),
            source: OnceCell::new(),
        }
    }

    /// Add an import line unless an identical line is already present.
    pub fn add_import_statement(&mut self, line: impl Into<String>) {
        let line = line.into();
        if self.seen_imports.insert(line.clone()) {
            self.import_statements.push(line);
        }
    }

    /// Remove an exact import line (used by `client:only`).
    pub fn remove_import_statement(&mut self, line: &str) {
        if self.seen_imports.remove(line) {
            self.import_statements.retain(|l| l != line);
        }
    }

    pub fn add_export_statement(&mut self, line: impl Into<String>) {
        let line = line.into();
        if !self.export_statements.contains(&line) {
            self.export_statements.push(line);
        }
    }

    pub fn record_component(&mut self, info: ComponentInfo, import_text: &str) {
        self.component_imports
            .entry(info.local_name.clone())
            .or_default()
            .push(import_text.to_string());
        self.components.insert(info.local_name.clone(), info);
    }

    /// Delete every raw import line recorded for `local_name`.
    pub fn remove_component_imports(&mut self, local_name: &str) {
        if let Some(lines) = self.component_imports.get(local_name).cloned() {
            for line in lines {
                self.remove_import_statement(&line);
            }
        }
    }

    pub fn next_custom_element_alias(&self) -> String {
        format!("__module{}", self.custom_element_candidates.len())
    }

    pub fn markdown_scope(&self) -> Option<String> {
        match &self.markers {
            MarkdownMarker::Inside { scope, .. } => scope.clone(),
            MarkdownMarker::Outside => None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DIAGNOSTICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn source_text(&self) -> Option<&str> {
        self.source
            .get_or_init(|| std::fs::read_to_string(&self.filename).ok())
            .as_deref()
    }

    /// Position of a byte offset in the original file, best-effort.
    pub fn position_of(&self, offset: u32) -> Position {
        match self.source_text() {
            Some(text) => offset_to_position(text, offset as usize),
            None => Position::start_of_file(),
        }
    }

    /// Code frame at a position in the original file, best-effort.
    pub fn frame_at(&self, pos: Position) -> Option<String> {
        self.source_text().map(|text| code_frame(text, pos))
    }
}

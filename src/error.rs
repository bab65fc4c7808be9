//! Compile error type and diagnostic framing.
//!
//! Every fatal error carries the same payload: the file it happened in, a
//! position in that file's coordinates, an optional code frame rendered
//! from the re-read source, and a message. Line numbers are 1-based,
//! columns 0-based.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }

    /// Fallback when the source text is unavailable.
    pub fn start_of_file() -> Self {
        Position { line: 1, column: 0 }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::start_of_file()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The frontmatter script failed to parse.
    FrontmatterParse,
    /// An expression failed to transpile.
    Transpile,
    /// A component tag could not be resolved.
    UnresolvedComponent,
    /// `Astro.fetchContent` called with a non-literal argument.
    FetchContentArgument,
    /// A Node builtin imported without the `node:` scheme.
    BareBuiltinModule,
    /// `client:*` directive on a frontmatter-defined component.
    IllegalHydration,
    /// Attribute value or AST node of an unknown kind.
    UnknownNode,
    /// The Markdown renderer reported a failure.
    MarkdownRender,
}

#[derive(Debug, Clone, Error)]
#[error("{filename}:{start}: {message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub filename: String,
    pub start: Position,
    pub end: Option<Position>,
    pub frame: Option<String>,
    pub message: String,
}

impl CompileError {
    pub fn new(kind: ErrorKind, filename: impl Into<String>, start: Position, message: impl Into<String>) -> Self {
        CompileError {
            kind,
            filename: filename.into(),
            start,
            end: None,
            frame: None,
            message: message.into(),
        }
    }

    pub fn with_end(mut self, end: Position) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_frame(mut self, frame: Option<String>) -> Self {
        self.frame = frame;
        self
    }
}

/// Convert a byte offset into a position within `source`.
pub fn offset_to_position(source: &str, offset: usize) -> Position {
    let offset = offset.min(source.len());
    let mut line = 1u32;
    let mut column = 0u32;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    Position { line, column }
}

/// Render a code frame around `pos`: up to two lines of leading context,
/// the offending line, and a caret column marker.
pub fn code_frame(source: &str, pos: Position) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() || pos.line == 0 {
        return String::new();
    }
    let target = (pos.line as usize).min(lines.len());
    let first = target.saturating_sub(2).max(1);
    let gutter = target.to_string().len();

    let mut out = String::new();
    for n in first..=target {
        out.push_str(&format!("{:>width$} | {}\n", n, lines[n - 1], width = gutter));
    }
    let caret_pad = " ".repeat(pos.column as usize);
    out.push_str(&format!("{:>width$} | {}^", "", caret_pad, width = gutter));
    out
}

//! Compile options and the logging sink.
//!
//! The core never owns a logging transport: warnings and recovered parse
//! errors go through the [`LogSink`] trait carried on [`CompileOptions`].
//! The default sink forwards to the `log` crate.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::Position;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Project-level paths, as absolute URLs or absolute paths. Only the two
/// roots the codegen needs: everything else about configuration is loaded
/// and validated upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AstroConfig {
    pub project_root: String,
    pub pages: String,
}

impl Default for AstroConfig {
    fn default() -> Self {
        AstroConfig {
            project_root: "/".to_string(),
            pages: "/src/pages".to_string(),
        }
    }
}

impl AstroConfig {
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<String>) -> Self {
        self.project_root = root.into();
        self
    }

    #[must_use]
    pub fn with_pages(mut self, pages: impl Into<String>) -> Self {
        self.pages = pages.into();
        self
    }
}

#[derive(Clone)]
pub struct CompileOptions {
    pub astro_config: AstroConfig,
    pub logging: Rc<dyn LogSink>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            astro_config: AstroConfig::default(),
            logging: Rc::new(LogCrateSink),
        }
    }
}

impl std::fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileOptions")
            .field("astro_config", &self.astro_config)
            .field("logging", &"<sink>")
            .finish()
    }
}

/// Everything `codegen` needs besides the AST itself.
#[derive(Debug, Clone, Default)]
pub struct CodegenOptions {
    pub compile_options: CompileOptions,
    pub filename: String,
    pub file_id: String,
}

impl CodegenOptions {
    pub fn new(filename: impl Into<String>, file_id: impl Into<String>) -> Self {
        CodegenOptions {
            compile_options: CompileOptions::default(),
            filename: filename.into(),
            file_id: file_id.into(),
        }
    }

    #[must_use]
    pub fn with_compile_options(mut self, compile_options: CompileOptions) -> Self {
        self.compile_options = compile_options;
        self
    }

    pub fn config(&self) -> &AstroConfig {
        &self.compile_options.astro_config
    }

    pub fn sink(&self) -> &dyn LogSink {
        &*self.compile_options.logging
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOGGING SINK
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct LogEvent {
    pub filename: Option<String>,
    pub frame: Option<String>,
    pub start: Option<Position>,
    pub message: String,
}

impl LogEvent {
    pub fn new(message: impl Into<String>) -> Self {
        LogEvent {
            filename: None,
            frame: None,
            start: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn at(mut self, filename: impl Into<String>, start: Position) -> Self {
        self.filename = Some(filename.into());
        self.start = Some(start);
        self
    }

    #[must_use]
    pub fn with_frame(mut self, frame: Option<String>) -> Self {
        self.frame = frame;
        self
    }
}

pub trait LogSink {
    fn warn(&self, event: LogEvent);
    fn error(&self, event: LogEvent);
    fn parse_error(&self, event: LogEvent);
}

/// Default sink: forward everything to the `log` crate.
pub struct LogCrateSink;

fn format_event(event: &LogEvent) -> String {
    let mut out = String::new();
    if let Some(filename) = &event.filename {
        out.push_str(filename);
        if let Some(start) = &event.start {
            out.push_str(&format!(":{}", start));
        }
        out.push_str(": ");
    }
    out.push_str(&event.message);
    if let Some(frame) = &event.frame {
        out.push('\n');
        out.push_str(frame);
    }
    out
}

impl LogSink for LogCrateSink {
    fn warn(&self, event: LogEvent) {
        log::warn!("{}", format_event(&event));
    }

    fn error(&self, event: LogEvent) {
        log::error!("{}", format_event(&event));
    }

    fn parse_error(&self, event: LogEvent) {
        log::error!("{}", format_event(&event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_formatting_carries_location_and_frame() {
        let event = LogEvent::new("something odd")
            .at("/src/pages/index.astro", Position::new(4, 2))
            .with_frame(Some("4 | x".to_string()));
        let formatted = format_event(&event);
        assert!(formatted.starts_with("/src/pages/index.astro:4:2: something odd"));
        assert!(formatted.ends_with("4 | x"));
    }

    #[test]
    fn options_builders() {
        let opts = CodegenOptions::new("/src/pages/a.astro", "a.astro").with_compile_options(
            CompileOptions {
                astro_config: AstroConfig::default().with_project_root("/proj/"),
                ..CompileOptions::default()
            },
        );
        assert_eq!(opts.config().project_root, "/proj/");
        assert_eq!(opts.filename, "/src/pages/a.astro");
    }
}

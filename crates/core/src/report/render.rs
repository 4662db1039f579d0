use super::aggregate::Aggregate;
use crate::types::{Diagnostic, Severity};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Formats diagnostics as `path:line:column: message`.
///
/// Line and column numbers are zero-padded to the width of the largest one
/// in the listing so that messages line up.
#[derive(Debug, Clone)]
pub struct DiagnosticRenderer<'a> {
    srcs: &'a [PathBuf],
    line_width: usize,
    column_width: usize,
}

impl<'a> DiagnosticRenderer<'a> {
    pub fn new(srcs: &'a [PathBuf], diagnostics: &[Diagnostic]) -> Self {
        let max_line = diagnostics
            .iter()
            .filter_map(|d| d.location.line)
            .max()
            .unwrap_or(0);
        let max_column = diagnostics
            .iter()
            .filter_map(|d| d.location.column)
            .max()
            .unwrap_or(0);

        Self {
            srcs,
            line_width: digits(max_line),
            column_width: digits(max_column),
        }
    }

    pub fn line_width(&self) -> usize {
        self.line_width
    }

    pub fn column_width(&self) -> usize {
        self.column_width
    }

    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let location = &diagnostic.location;
        format!(
            "{}:{:0lw$}:{:0cw$}: {}",
            self.abbreviate(&location.path),
            location.line.unwrap_or(0),
            location.column.unwrap_or(0),
            diagnostic.message,
            lw = self.line_width,
            cw = self.column_width,
        )
    }

    /// Shortens `path` to start at the source root that contains it.
    /// Paths outside every source root are shown as they are.
    pub fn abbreviate(&self, path: &Path) -> String {
        for src in self.srcs {
            if let Ok(rest) = path.strip_prefix(src) {
                return match src.file_name() {
                    Some(root) => Path::new(root).join(rest).display().to_string(),
                    None => rest.display().to_string(),
                };
            }
        }
        path.display().to_string()
    }
}

fn digits(n: u32) -> usize {
    n.checked_ilog10().map_or(1, |log| log as usize + 1)
}

/// Indents the logged line so that listings line up the way the compiler's
/// own console output does, where levels are named `ERROR`, `WARNING` and `INFO`
fn log_padding(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "  ",
        Severity::Warning => "",
        Severity::Info => "   ",
    }
}

/// Logs every diagnostic at the level of its severity and returns the
/// rendered lines in report order. Only the logged text is padded.
pub fn report(aggregate: &Aggregate, srcs: &[PathBuf]) -> Vec<String> {
    let renderer = DiagnosticRenderer::new(srcs, &aggregate.diagnostics);

    aggregate
        .diagnostics
        .iter()
        .map(|diagnostic| {
            if !diagnostic.location.has_line_column() {
                error!(
                    "diagnostic without line/column: {}",
                    diagnostic.location.path.display()
                );
            }

            let line = renderer.render(diagnostic);
            let pad = log_padding(diagnostic.severity);
            match diagnostic.severity {
                Severity::Error => error!("{pad}{line}"),
                Severity::Warning => warn!("{pad}{line}"),
                Severity::Info => info!("{pad}{line}"),
            }
            line
        })
        .collect()
}

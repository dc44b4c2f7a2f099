//! Accumulated, human-readable outcome of one upload or generate action.

use crate::utils::escape_html;
use std::fmt;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusReport {
    lines: Vec<String>,
}

impl StatusReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report holding a single line.
    pub fn single(line: impl Into<String>) -> Self {
        let mut report = Self::new();
        report.push(line);
        report
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines escaped for HTML and joined with `<br>`.
    pub fn to_html(&self) -> String {
        self.lines
            .iter()
            .map(|line| escape_html(line))
            .collect::<Vec<_>>()
            .join("<br>")
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

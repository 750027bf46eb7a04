//! Provenance header stamped onto every successful output.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TOOL_NAME: &str = "Mønlur Obfuscator";
pub const DEFAULT_TOOL_VERSION: &str = "v1.0";

const MARKER_PREFIX: &str = "-- This file was protected using ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProvenanceHeader {
    pub tool_name: String,
    pub version: String,
}

impl Default for ProvenanceHeader {
    fn default() -> Self {
        Self {
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            version: DEFAULT_TOOL_VERSION.to_string(),
        }
    }
}

impl ProvenanceHeader {
    /// The marker line without version, used to recognize an existing stamp.
    fn marker(&self) -> String {
        format!("{}{}", MARKER_PREFIX, self.tool_name)
    }

    /// The full comment block, including the trailing blank line.
    pub fn render(&self) -> String {
        format!("{} [{}]\n\n", self.marker(), self.version)
    }

    /// True if the text already begins with a header for this tool (any version).
    pub fn is_stamped(&self, text: &str) -> bool {
        text.trim_start_matches('\u{feff}')
            .trim_start()
            .starts_with(&self.marker())
    }

    /// Prepends the header unless an equivalent one is already present.
    pub fn stamp(&self, body: &str) -> String {
        if self.is_stamped(body) {
            return body.to_string();
        }
        let mut out = self.render();
        out.push_str(body);
        out
    }

    /// Removes every header line for this tool from `text`, together with the
    /// blank line that follows it.
    pub fn strip(&self, text: &str) -> String {
        let marker = self.marker();
        if !text.contains(&marker) {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut skip_blank = false;
        for line in text.split_inclusive('\n') {
            let trimmed = line.trim();
            if trimmed.starts_with(&marker) {
                skip_blank = true;
                continue;
            }
            if skip_blank && trimmed.is_empty() {
                skip_blank = false;
                continue;
            }
            skip_blank = false;
            out.push_str(line);
        }
        out
    }
}

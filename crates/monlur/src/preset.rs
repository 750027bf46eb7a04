//! Obfuscation strength presets.

use serde::{Deserialize, Serialize};

/// Named strength configuration controlling which transform stages run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preset {
    Weak,
    #[default]
    Medium,
    Strong,
    Minify,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Weak, Preset::Medium, Preset::Strong, Preset::Minify];

    /// Maps caller input onto a preset. Never fails: anything unrecognized
    /// (including an absent value) becomes [`Preset::Medium`].
    pub fn normalize(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Preset::default();
        };
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(value))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Weak => "Weak",
            Preset::Medium => "Medium",
            Preset::Strong => "Strong",
            Preset::Minify => "Minify",
        }
    }

    /// Whether identifier substitution runs for this preset.
    pub fn renames_identifiers(&self) -> bool {
        matches!(self, Preset::Medium | Preset::Strong)
    }

    /// Whether junk declarations are inserted for this preset.
    pub fn inserts_junk(&self) -> bool {
        matches!(self, Preset::Strong)
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

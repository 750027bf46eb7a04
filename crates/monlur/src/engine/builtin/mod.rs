//! In-process transform: string literal encoding, local renaming and junk
//! insertion. Pure and deterministic for a given source and preset.

pub mod literals;
pub mod renamer;
pub mod scanner;

use std::borrow::Cow;

use async_trait::async_trait;
use tracing::debug;

use crate::error::JobError;
use crate::preset::Preset;
use crate::provenance::ProvenanceHeader;

use self::renamer::{discover_locals, identifiers_in, RenameCursor, Renamer, JUNK_INDEX};
use self::scanner::{scan, Segment};
use super::{EngineOutput, EngineRequest, TransformEngine};

#[derive(Debug, Clone, Default)]
pub struct BuiltinEngine {
    header: ProvenanceHeader,
}

/// A segment after stage 1: code eligible for renaming, a string value, or a comment.
enum Piece<'a> {
    Code(&'a str),
    Value(Cow<'a, str>),
    Comment(&'a str),
}

impl BuiltinEngine {
    pub fn new(header: ProvenanceHeader) -> Self {
        Self { header }
    }

    /// Transforms `source` and returns the output stamped with this engine's header.
    pub fn obfuscate(&self, source: &str, preset: Preset) -> String {
        self.obfuscate_with(source, preset, &self.header)
    }

    /// Transforms `source` and stamps it with `header`.
    pub fn obfuscate_with(
        &self,
        source: &str,
        preset: Preset,
        header: &ProvenanceHeader,
    ) -> String {
        let preset = match preset {
            Preset::Minify => Preset::Medium,
            other => other,
        };
        let source = header.strip(source);
        let segments = scan(&source);

        // Stage 1: string literal encoding
        let mut encoded = 0usize;
        let pieces: Vec<Piece<'_>> = segments
            .iter()
            .map(|segment| match segment {
                Segment::Code(code) => Piece::Code(code),
                Segment::Quoted { raw, body } => match literals::encode_literal(body) {
                    Some(expr) => {
                        encoded += 1;
                        Piece::Value(expr.into())
                    }
                    None => Piece::Value((*raw).into()),
                },
                Segment::LongString(text) => Piece::Value((*text).into()),
                Segment::Comment(text) => Piece::Comment(text),
            })
            .collect();

        let code_fragments = || {
            pieces.iter().filter_map(|piece| match piece {
                Piece::Code(code) => Some(*code),
                Piece::Value(_) | Piece::Comment(_) => None,
            })
        };

        // Stage 2: identifier substitution
        let mut renamer = Renamer::new(identifiers_in(code_fragments()));
        if preset.renames_identifiers() {
            let locals = discover_locals(code_fragments());
            renamer.assign_all(&locals);
        }

        let mut body = String::with_capacity(source.len() * 2);
        let mut cursor = RenameCursor::new();
        for piece in &pieces {
            match piece {
                Piece::Code(code) => body.push_str(&renamer.apply(code, &mut cursor)),
                Piece::Value(text) => {
                    cursor.value();
                    body.push_str(text);
                }
                Piece::Comment(text) => body.push_str(text),
            }
        }

        // Stage 3: junk insertion
        if preset.inserts_junk() {
            let junk_name = renamer.claim_from(JUNK_INDEX);
            body.insert_str(0, &format!("local {}=function()return nil end;", junk_name));
        }

        debug!(
            preset = %preset,
            literals_encoded = encoded,
            locals_renamed = renamer.mapping().len(),
            "Built-in transform finished"
        );

        let mut out = header.render();
        out.push_str(&body);
        out
    }
}

#[async_trait]
impl TransformEngine for BuiltinEngine {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn supports(&self, preset: Preset) -> bool {
        !matches!(preset, Preset::Minify)
    }

    async fn invoke(&self, request: EngineRequest<'_>) -> Result<EngineOutput, JobError> {
        let engine = self.clone();
        let source = request.source.to_string();
        let preset = request.preset;
        let header = request.header.clone();

        let output = tokio::task::spawn_blocking(move || {
            engine.obfuscate_with(&source, preset, &header)
        })
        .await
        .map_err(|e| JobError::EngineExecutionFailed {
            status: "panicked".to_string(),
            diagnostics: e.to_string(),
        })?;

        Ok(EngineOutput::InMemory(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> BuiltinEngine {
        BuiltinEngine::default()
    }

    const SAMPLE: &str = r#"
print("Hello, World!")
local x = 5
local y = 10
local result = x + y
print("Result:", result)
"#;

    #[test]
    fn test_output_starts_with_header() {
        let out = engine().obfuscate(SAMPLE, Preset::Medium);
        assert!(out.starts_with("-- This file was protected using Mønlur Obfuscator [v1.0]\n\n"));
    }

    #[test]
    fn test_hi_example() {
        let out = engine().obfuscate(r#"print("hi")"#, Preset::Medium);
        // two-character literal is left untouched
        assert!(out.ends_with(r#"print("hi")"#));
    }

    #[test]
    fn test_long_literals_are_encoded() {
        let out = engine().obfuscate(SAMPLE, Preset::Weak);
        assert!(!out.contains("\"Hello, World!\""));
        assert!(!out.contains("\"Result:\""));
        assert!(out.contains("string.char(t[i])"));
        assert!(out.contains("{72,101,108,108,111,44,32,87,111,114,108,100,33}"));
    }

    #[test]
    fn test_weak_does_not_rename() {
        let out = engine().obfuscate(SAMPLE, Preset::Weak);
        assert!(out.contains("local x = 5"));
        assert!(out.contains("local result = x + y"));
    }

    #[test]
    fn test_medium_renames_locals() {
        let out = engine().obfuscate(SAMPLE, Preset::Medium);
        assert!(out.contains("local _l = 5"));
        assert!(out.contains("local _1 = 10"));
        assert!(out.contains("local _I = _l + _1"));
        assert!(out.contains("print("));
        assert!(!out.contains("result"));
    }

    #[test]
    fn test_strong_prepends_junk_after_header() {
        let header = ProvenanceHeader::default().render();
        let out = engine().obfuscate(SAMPLE, Preset::Strong);
        let body = out.strip_prefix(&header).unwrap();
        assert!(body.starts_with(&format!(
            "local {}=function()return nil end;",
            renamer::synthetic_name(JUNK_INDEX)
        )));
    }

    #[test]
    fn test_minify_behaves_like_medium() {
        assert_eq!(
            engine().obfuscate(SAMPLE, Preset::Minify),
            engine().obfuscate(SAMPLE, Preset::Medium)
        );
    }

    #[test]
    fn test_deterministic() {
        for preset in Preset::ALL {
            assert_eq!(
                engine().obfuscate(SAMPLE, preset),
                engine().obfuscate(SAMPLE, preset)
            );
        }
    }

    #[test]
    fn test_header_appears_once_for_prestamped_source() {
        let header = ProvenanceHeader::default();
        let stamped = engine().obfuscate(SAMPLE, Preset::Medium);
        let twice = engine().obfuscate(&stamped, Preset::Medium);
        assert_eq!(twice.matches(&header.render()).count(), 1);
        assert_eq!(twice.matches("This file was protected").count(), 1);
    }

    #[test]
    fn test_strings_and_comments_are_not_renamed() {
        let source = "local x = 1\nprint('x') -- x stays\nreturn x";
        let out = engine().obfuscate(source, Preset::Medium);
        assert!(out.contains("print('x') -- x stays"));
        assert!(out.contains("return _l"));
    }

    #[test]
    fn test_malformed_source_degrades_gracefully() {
        let source = "local s = \"unterminated\nend end ((";
        let out = engine().obfuscate(source, Preset::Strong);
        assert!(out.contains("\"unterminated"));
    }

    #[test]
    fn test_reserved_words_never_renamed() {
        let source = "local function go() return nil end\nlocal print = print\nlocal v = go()";
        let out = engine().obfuscate(source, Preset::Medium);
        for keyword in ["local", "function", "return", "nil", "end", "print"] {
            assert!(out.contains(keyword), "keyword {} missing", keyword);
        }
        assert!(!out.contains("go()"));
    }

    #[test]
    fn test_call_without_parentheses_stays_one_expression() {
        let source = "local json = require \"cjson\"\nprint \"hello\"";
        let out = engine().obfuscate(source, Preset::Weak);
        assert!(out.contains("require ((function()local t={99,106,115,111,110}"), "{}", out);
        assert!(out.contains("print ((function()local t={104,101,108,108,111}"), "{}", out);
        assert!(out.ends_with("end return s end)())"), "{}", out);
    }

    #[test]
    fn test_fields_and_methods_keep_their_names() {
        let source = "local insert = table.insert\n\
                      local s = name\n\
                      local t = { insert = 1 }\n\
                      insert(t, s:len())";
        let out = engine().obfuscate(source, Preset::Medium);
        assert!(out.contains("local _l = table.insert"), "{}", out);
        assert!(out.contains("local _I = { insert = 1 }"), "{}", out);
        assert!(out.contains("_l(_I, _1:len())"), "{}", out);
    }

    #[test]
    fn test_key_after_string_value_is_not_renamed() {
        let source = "local key = 1\nlocal t = { 'abc', key = key }";
        let out = engine().obfuscate(source, Preset::Medium);
        assert!(out.ends_with("end)()), key = _l }"), "{}", out);
    }

    #[test]
    fn test_obfuscate_with_uses_given_header() {
        let other = ProvenanceHeader {
            tool_name: "Acme Shield".to_string(),
            version: "v2".to_string(),
        };
        let out = engine().obfuscate_with(SAMPLE, Preset::Medium, &other);
        assert!(out.starts_with(&other.render()));
        assert_eq!(out.matches("This file was protected").count(), 1);
    }

    #[tokio::test]
    async fn test_invoke_returns_in_memory_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let manager = crate::workspace::WorkspaceManager::new(dir.path());
        let workspace = manager.allocate().unwrap();
        let header = ProvenanceHeader::default();

        let output = engine()
            .invoke(EngineRequest {
                workspace: &workspace,
                manager: &manager,
                source: SAMPLE,
                preset: Preset::Medium,
                deadline: std::time::Duration::from_secs(5),
                header: &header,
            })
            .await
            .unwrap();

        match output {
            EngineOutput::InMemory(code) => {
                assert_eq!(code, engine().obfuscate(SAMPLE, Preset::Medium))
            }
            EngineOutput::Artifact => panic!("built-in engine must not use artifacts"),
        }
    }
}

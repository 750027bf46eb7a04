//! Local identifier discovery and substitution with confusable synthetic names.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// Confusable alphabet used for synthetic names (lowercase L, one, uppercase i).
const ALPHABET: [char; 3] = ['l', '1', 'I'];

/// Index used for the inert junk declaration.
pub const JUNK_INDEX: usize = 999;

/// Names that are never renamed: Lua keywords plus standard library globals
/// that are commonly cached in locals (`local print = print`).
const RESERVED: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if",
    "in", "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
    "print", "string", "table", "math", "io", "os", "coroutine", "debug", "utf8", "pairs",
    "ipairs", "next", "type", "tostring", "tonumber", "require", "select", "error", "assert",
    "pcall", "xpcall", "setmetatable", "getmetatable", "rawget", "rawset", "rawequal",
    "rawlen", "unpack", "load", "loadstring", "dofile", "self", "_G", "_ENV",
];

static LOCAL_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\blocal\s+(?:function\s+)?([A-Za-z_][A-Za-z0-9_]*)((?:\s*,\s*[A-Za-z_][A-Za-z0-9_]*)*)",
    )
    .expect("valid local declaration regex")
});

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").expect("valid identifier regex")
});

/// Renders `index` in base 3 over [`ALPHABET`], most significant symbol first,
/// prefixed with `_`.
pub fn synthetic_name(index: usize) -> String {
    let mut symbols = Vec::new();
    let mut n = index;
    loop {
        symbols.push(ALPHABET[n % ALPHABET.len()]);
        n /= ALPHABET.len();
        if n == 0 {
            break;
        }
    }
    let mut name = String::with_capacity(symbols.len() + 1);
    name.push('_');
    name.extend(symbols.iter().rev());
    name
}

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Every identifier-shaped token in the given code fragments.
pub fn identifiers_in<'a>(code: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    code.into_iter()
        .flat_map(|fragment| IDENTIFIER.find_iter(fragment))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Declared local names in first-seen order, reserved names excluded.
pub fn discover_locals<'a>(code: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();

    for fragment in code {
        for caps in LOCAL_DECL.captures_iter(fragment) {
            let first = caps.get(1).map(|m| m.as_str());
            let rest = caps
                .get(2)
                .map(|m| m.as_str())
                .unwrap_or_default()
                .split(',')
                .map(str::trim);

            for name in first.into_iter().chain(rest) {
                if name.is_empty() || is_reserved(name) {
                    continue;
                }
                if seen.insert(name.to_string()) {
                    ordered.push(name.to_string());
                }
            }
        }
    }

    ordered
}

/// Assigns synthetic names to locals, skipping any candidate that already
/// appears in the source so no two identifiers end up sharing a name.
#[derive(Debug, Default)]
pub struct Renamer {
    mapping: HashMap<String, String>,
    taken: HashSet<String>,
    next_index: usize,
}

impl Renamer {
    pub fn new(existing_identifiers: HashSet<String>) -> Self {
        Self {
            mapping: HashMap::new(),
            taken: existing_identifiers,
            next_index: 0,
        }
    }

    pub fn assign_all(&mut self, locals: &[String]) {
        for name in locals {
            if self.mapping.contains_key(name) {
                continue;
            }
            let synthetic = self.claim_from(self.next_index);
            self.mapping.insert(name.clone(), synthetic);
        }
    }

    /// Claims the first free synthetic name at or after `index`.
    pub fn claim_from(&mut self, index: usize) -> String {
        let mut index = index;
        loop {
            let candidate = synthetic_name(index);
            index += 1;
            if self.taken.insert(candidate.clone()) {
                if index > self.next_index {
                    self.next_index = index;
                }
                return candidate;
            }
        }
    }

    pub fn mapping(&self) -> &HashMap<String, String> {
        &self.mapping
    }

    /// Replaces mapped identifiers in one pass over a code fragment.
    ///
    /// Field and method names (`t.name`, `s:name`) and table-constructor keys
    /// (`{name = ...}`) are not variables and are left alone. `cursor` carries
    /// the syntactic context across the fragments of one source.
    pub fn apply(&self, code: &str, cursor: &mut RenameCursor) -> String {
        let mut out = String::with_capacity(code.len());
        let mut last = 0;

        for m in IDENTIFIER.find_iter(code) {
            let gap = &code[last..m.start()];
            cursor.advance(gap);
            out.push_str(gap);

            let token = m.as_str();
            let rename = self
                .mapping
                .get(token)
                .filter(|_| !cursor.after_member_access())
                .filter(|_| !cursor.at_constructor_key(&code[m.end()..]));
            match rename {
                Some(synthetic) => out.push_str(synthetic),
                None => out.push_str(token),
            }
            cursor.word();
            last = m.end();
        }

        let tail = &code[last..];
        cursor.advance(tail);
        out.push_str(tail);
        out
    }
}

/// Syntactic context tracked while walking code fragments in order.
#[derive(Debug, Default)]
pub struct RenameCursor {
    /// Last two significant characters, most recent in `[1]`. Words are
    /// recorded as `'w'`, string values as `'"'`.
    recent: [Option<char>; 2],
    /// Open brackets, innermost last.
    brackets: Vec<char>,
}

impl RenameCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a string value (quoted literal or long string) between fragments.
    pub fn value(&mut self) {
        self.push('"');
    }

    fn word(&mut self) {
        self.push('w');
    }

    fn push(&mut self, c: char) {
        self.recent = [self.recent[1], Some(c)];
    }

    fn advance(&mut self, text: &str) {
        for c in text.chars().filter(|c| !c.is_whitespace()) {
            match c {
                '(' | '[' | '{' => self.brackets.push(c),
                ')' | ']' | '}' => {
                    self.brackets.pop();
                }
                _ => {}
            }
            // Digits belong to number literals; `1.5` must not read as member access.
            if c.is_ascii_alphanumeric() || c == '_' {
                self.word();
            } else {
                self.push(c);
            }
        }
    }

    /// `.name` or `:name`, but not `..name` (concatenation) or `::name::` (label).
    fn after_member_access(&self) -> bool {
        match self.recent {
            [before, Some('.')] => before != Some('.'),
            [before, Some(':')] => before != Some(':'),
            _ => false,
        }
    }

    /// `name =` directly inside `{`, after `{`, `,` or `;`.
    fn at_constructor_key(&self, rest: &str) -> bool {
        if self.brackets.last() != Some(&'{') {
            return false;
        }
        if !matches!(self.recent[1], Some('{' | ',' | ';')) {
            return false;
        }
        let rest = rest.trim_start();
        rest.starts_with('=') && !rest.starts_with("==")
    }
}

//! Call-Site Classifier
//!
//! Decides whether a diagnostic call is a request to instrument a
//! definition or a plain inspection, from the first argument's kind and the
//! source text of the calling line.
//!
//! This is a heuristic. A plain call whose first argument is callable and
//! whose line happens to start with a definition keyword is classified as
//! instrumentation. Compile-time call sites avoid it entirely: the `dd!`
//! macro arms split `dd!(expr)` from `dd! { fn ... }` syntactically.

use ddebug_core::SourceLocation;
use ddebug_ports::SourceProviderRef;

/// What the first argument of a diagnostic call is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Value,
    Function,
    Class,
}

impl ArgKind {
    pub fn is_callable(&self) -> bool {
        matches!(self, ArgKind::Function | ArgKind::Class)
    }
}

/// Classification of one diagnostic call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// The call decorates the definition on its line
    DecoratorUse,
    /// The call inspects its arguments
    PlainCall,
}

const DEFINITION_KEYWORDS: &[&str] = &["fn", "impl", "struct", "enum", "trait"];
const QUALIFIERS: &[&str] = &["async", "const", "unsafe", "default"];

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split the leading word off `text` if it is exactly `word`.
fn strip_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(word)?;
    match rest.chars().next() {
        Some(c) if is_ident_char(c) => None,
        _ => Some(rest.trim_start()),
    }
}

/// Skip a balanced `open ... close` group at the start of `text`.
fn skip_group(text: &str, open: char, close: char) -> Option<&str> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(text[i + c.len_utf8()..].trim_start());
            }
        }
    }
    None
}

/// Skip a `"..."` literal at the start of `text`.
fn skip_string(text: &str) -> Option<&str> {
    let body = text.strip_prefix('"')?;
    let end = body.find('"')?;
    Some(body[end + 1..].trim_start())
}

/// True when `line` starts a Rust item definition.
///
/// Leading attributes, visibility and qualifiers (`async`, `const`,
/// `unsafe`, `extern "C"`) are skipped. Keywords only count at a token
/// boundary.
pub fn is_definition_line(line: &str) -> bool {
    let mut rest = line.trim_start();

    while rest.starts_with("#[") {
        match skip_group(&rest[1..], '[', ']') {
            Some(after) => rest = after,
            None => return false,
        }
    }

    if let Some(after) = strip_word(rest, "pub") {
        rest = after;
        if rest.starts_with('(') {
            match skip_group(rest, '(', ')') {
                Some(after) => rest = after,
                None => return false,
            }
        }
    }

    loop {
        if let Some(after) = QUALIFIERS.iter().find_map(|q| strip_word(rest, q)) {
            rest = after;
            continue;
        }
        if let Some(after) = strip_word(rest, "extern") {
            rest = skip_string(after).unwrap_or(after);
            continue;
        }
        break;
    }

    DEFINITION_KEYWORDS
        .iter()
        .any(|keyword| strip_word(rest, keyword).is_some())
}

/// Classify one call from its first argument and calling line.
///
/// Missing source text or a missing first argument is always a plain call.
pub fn classify(first: Option<ArgKind>, source_line: Option<&str>) -> CallKind {
    match (first, source_line) {
        (Some(kind), Some(line)) if kind.is_callable() && is_definition_line(line) => {
            CallKind::DecoratorUse
        }
        _ => CallKind::PlainCall,
    }
}

/// Classifier reading call-site lines through a source provider.
#[derive(Clone)]
pub struct Classifier {
    source: SourceProviderRef,
}

impl Classifier {
    pub fn new(source: SourceProviderRef) -> Self {
        Self { source }
    }

    /// Source text of the line at `site`.
    pub fn source_line(&self, site: &SourceLocation) -> Option<String> {
        self.source.line(&site.file, site.line)
    }

    pub fn classify_site(&self, site: &SourceLocation, first: Option<ArgKind>) -> CallKind {
        let line = self.source_line(site);
        classify(first, line.as_deref())
    }
}

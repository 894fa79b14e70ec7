//! Path evaluation.
//!
//! Rules address values inside a document with JSONPath expressions. A path is
//! compiled once, when the rule is created, into a list of `Segment`s and is
//! then evaluated against every document the rule sees.
//!
//! ```text
//! "$.customer['first name'].tags[0]"
//!    │        │              │    └─ Child(Indices[0])
//!    │        │              └────── Child(Names["tags"])
//!    │        └───────────────────── Child(Names["first name"])
//!    └────────────────────────────── Child(Names["customer"])
//! ```
//!
//! ## Supported syntax
//!
//! - root `$` (a path without it is read as if it started with `$.`)
//! - `.name`, `['name']`, `["name"]`, `['a','b']`
//! - `[n]`, `[-n]`, `[0,2]`, `[start:end]`
//! - `.*`, `[*]`
//! - `..name`, `..*`, `..[n]`
//!
//! Filter expressions (`[?(...)]`) and functions are not supported.
//!
//! ## Definite and indefinite paths
//!
//! A path made only of single-name and single-index steps is *definite*: it
//! yields exactly one value, or nothing when a step is missing. Any other path
//! is *indefinite* and always yields an array of matches, possibly empty; it is
//! never "not found".

use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Something that can locate a value inside a parsed document.
///
/// [`JsonPath`] is the default implementation; [`Pointer`] adapts RFC 6901
/// JSON pointers. Implementations must be pure: the same document always
/// yields the same answer.
pub trait PathEvaluator: fmt::Debug + Send + Sync {
    /// Return the value at this path, or `None` when nothing is there.
    fn evaluate<'a>(&self, document: &'a Value) -> Option<Cow<'a, Value>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at position {position}: {message}")]
pub struct PathSyntaxError {
    /// Byte offset into the path string as passed to [`JsonPath::parse`].
    pub position: usize,
    pub message: String,
}

impl PathSyntaxError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        PathSyntaxError { position, message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector {
    Names(Vec<String>),
    Indices(Vec<i64>),
    Slice { start: Option<i64>, end: Option<i64> },
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Child(Selector),
    Descendant(Selector),
}

impl Segment {
    fn is_definite(&self) -> bool {
        match self {
            Segment::Child(Selector::Names(names)) => names.len() == 1,
            Segment::Child(Selector::Indices(indices)) => indices.len() == 1,
            _ => false,
        }
    }
}

/// A compiled JSONPath expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    segments: Vec<Segment>,
    definite: bool,
}

impl JsonPath {
    /// Compile `path`. Error positions are byte offsets into `path` as given,
    /// surrounding whitespace included.
    pub fn parse(path: &str) -> Result<Self, PathSyntaxError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(PathSyntaxError::new(0, "path is empty"));
        }

        let lead = path.len() - path.trim_start().len();
        let segments = segments(trimmed).map_err(|err| PathSyntaxError { position: err.position + lead, ..err })?;

        let definite = segments.iter().all(Segment::is_definite);
        log::trace!("[path:compiled] path=\"{}\" segments={} definite={}", path, segments.len(), definite);

        Ok(JsonPath { source: path.to_string(), segments, definite })
    }

    /// The path string this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when the path can match at most one value.
    pub fn is_definite(&self) -> bool {
        self.definite
    }

    fn select_definite<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let mut current = document;
        for segment in &self.segments {
            current = match segment {
                Segment::Child(Selector::Names(names)) => current.as_object()?.get(&names[0])?,
                Segment::Child(Selector::Indices(indices)) => {
                    let array = current.as_array()?;
                    array.get(resolve_index(indices[0], array.len())?)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    fn select_all<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![document];
        for segment in &self.segments {
            let mut next = Vec::new();
            match segment {
                Segment::Child(selector) => {
                    for node in current {
                        select_children(node, selector, &mut next);
                    }
                }
                Segment::Descendant(selector) => {
                    for node in current {
                        let mut scope = Vec::new();
                        collect_descendants(node, &mut scope);
                        for inner in scope {
                            select_children(inner, selector, &mut next);
                        }
                    }
                }
            }
            current = next;
        }
        current
    }
}

impl PathEvaluator for JsonPath {
    fn evaluate<'a>(&self, document: &'a Value) -> Option<Cow<'a, Value>> {
        if self.definite {
            return self.select_definite(document).map(Cow::Borrowed);
        }
        let matches = self.select_all(document).into_iter().cloned().collect();
        Some(Cow::Owned(Value::Array(matches)))
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for JsonPath {
    type Err = PathSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JsonPath::parse(s)
    }
}

/// RFC 6901 JSON pointer (`/customer/name`), evaluated with
/// [`serde_json::Value::pointer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer(pub String);

impl PathEvaluator for Pointer {
    fn evaluate<'a>(&self, document: &'a Value) -> Option<Cow<'a, Value>> {
        document.pointer(&self.0).map(Cow::Borrowed)
    }
}

// --- Parsing helpers ---------------------------------------------------------

fn first_char(s: &str) -> char {
    s.chars().next().unwrap_or(' ')
}

/// Split a trimmed, non-empty path into segments. Positions are relative to `trimmed`.
fn segments(trimmed: &str) -> Result<Vec<Segment>, PathSyntaxError> {
    let mut segments = Vec::new();
    let mut pos = 0;

    if trimmed.starts_with('$') {
        pos = 1;
    } else if !trimmed.starts_with('[') && !trimmed.starts_with('.') {
        // Bare `customer.name` reads as `$.customer.name`.
        let (selector, len) = dot_member(trimmed, 0)?;
        segments.push(Segment::Child(selector));
        pos = len;
    }

    while pos < trimmed.len() {
        let rest = &trimmed[pos..];
        if let Some(after) = rest.strip_prefix("..") {
            let offset = pos + 2;
            let (selector, len) = if after.starts_with('[') {
                bracket(after, offset)?
            } else {
                dot_member(after, offset)?
            };
            segments.push(Segment::Descendant(selector));
            pos = offset + len;
        } else if let Some(after) = rest.strip_prefix('.') {
            let (selector, len) = dot_member(after, pos + 1)?;
            segments.push(Segment::Child(selector));
            pos += 1 + len;
        } else if rest.starts_with('[') {
            let (selector, len) = bracket(rest, pos)?;
            segments.push(Segment::Child(selector));
            pos += len;
        } else {
            return Err(PathSyntaxError::new(pos, format!("unexpected character '{}'", first_char(rest))));
        }
    }

    Ok(segments)
}

/// Parse the member after a `.` (or at the start of a bare path). Returns the
/// selector and the number of bytes consumed.
fn dot_member(input: &str, offset: usize) -> Result<(Selector, usize), PathSyntaxError> {
    if input.starts_with('*') {
        return Ok((Selector::Wildcard, 1));
    }
    let re = regex!(r"^[^.\[\]\s'\x22()]+");
    match re.find(input) {
        Some(m) => Ok((Selector::Names(vec![m.as_str().to_string()]), m.end())),
        None if input.is_empty() => Err(PathSyntaxError::new(offset, "path ends after '.'")),
        None => Err(PathSyntaxError::new(offset, format!("expected a member name, found '{}'", first_char(input)))),
    }
}

/// Parse a `[...]` selector starting at `input[0] == '['`.
fn bracket(input: &str, offset: usize) -> Result<(Selector, usize), PathSyntaxError> {
    if let Some(m) = regex!(r"^\[\s*\*\s*\]").find(input) {
        return Ok((Selector::Wildcard, m.end()));
    }

    if let Some(caps) = regex!(r"^\[\s*(-?\d+)?\s*:\s*(-?\d+)?\s*\]").captures(input) {
        let start = caps.get(1).map(|g| parse_int(g.as_str(), offset)).transpose()?;
        let end = caps.get(2).map(|g| parse_int(g.as_str(), offset)).transpose()?;
        return Ok((Selector::Slice { start, end }, caps[0].len()));
    }

    if let Some(caps) = regex!(r"^\[\s*(-?\d+(?:\s*,\s*-?\d+)*)\s*\]").captures(input) {
        let indices = caps[1].split(',').map(|s| parse_int(s.trim(), offset)).collect::<Result<Vec<_>, _>>()?;
        return Ok((Selector::Indices(indices), caps[0].len()));
    }

    let names_re = regex!(
        r#"^\[\s*((?:'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*")(?:\s*,\s*(?:'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"))*)\s*\]"#
    );
    if let Some(caps) = names_re.captures(input) {
        let names = regex!(r#"'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)""#)
            .captures_iter(&caps[1])
            .filter_map(|c| c.get(1).or_else(|| c.get(2)))
            .map(|g| unescape(g.as_str()))
            .collect();
        return Ok((Selector::Names(names), caps[0].len()));
    }

    if input.starts_with("[?") {
        return Err(PathSyntaxError::new(offset, "filter expressions are not supported"));
    }
    if !input.contains(']') {
        return Err(PathSyntaxError::new(offset, "unclosed '['"));
    }
    Err(PathSyntaxError::new(offset, "expected an index, a slice, '*' or a quoted name inside '[]'"))
}

fn parse_int(text: &str, offset: usize) -> Result<i64, PathSyntaxError> {
    text.parse().map_err(|_| PathSyntaxError::new(offset, format!("index '{text}' is out of range")))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

// --- Evaluation helpers ------------------------------------------------------

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { len + index } else { index };
    if (0..len).contains(&resolved) { usize::try_from(resolved).ok() } else { None }
}

fn clamp_bound(bound: i64, len: i64) -> i64 {
    if bound < 0 { (len + bound).max(0) } else { bound.min(len) }
}

fn select_children<'a>(node: &'a Value, selector: &Selector, out: &mut Vec<&'a Value>) {
    match (selector, node) {
        (Selector::Names(names), Value::Object(map)) => {
            out.extend(names.iter().filter_map(|name| map.get(name)));
        }
        (Selector::Indices(indices), Value::Array(items)) => {
            out.extend(indices.iter().filter_map(|&i| resolve_index(i, items.len())).map(|i| &items[i]));
        }
        (Selector::Slice { start, end }, Value::Array(items)) => {
            let len = items.len() as i64;
            let from = clamp_bound(start.unwrap_or(0), len);
            let to = clamp_bound(end.unwrap_or(len), len);
            if from < to {
                out.extend(&items[from as usize..to as usize]);
            }
        }
        (Selector::Wildcard, Value::Object(map)) => out.extend(map.values()),
        (Selector::Wildcard, Value::Array(items)) => out.extend(items.iter()),
        _ => {}
    }
}

/// Pre-order walk: `node` first, then every nested value.
fn collect_descendants<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    out.push(node);
    match node {
        Value::Object(map) => map.values().for_each(|v| collect_descendants(v, out)),
        Value::Array(items) => items.iter().for_each(|v| collect_descendants(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "customer": {
                "name": "Jan",
                "first name": "Jan",
                "age": 18,
                "nickname": null,
                "tags": ["a", "b", "c"],
                "orders": [
                    {"id": 1, "total": 10.5},
                    {"id": 2, "total": 7.25}
                ]
            }
        })
    }

    fn eval(path: &str) -> Option<Value> {
        JsonPath::parse(path).unwrap().evaluate(&doc()).map(Cow::into_owned)
    }

    #[test]
    fn definite_paths_return_single_values() {
        assert_eq!(eval("$.customer.name"), Some(json!("Jan")));
        assert_eq!(eval("$['customer']['first name']"), Some(json!("Jan")));
        assert_eq!(eval("$.customer.tags[1]"), Some(json!("b")));
        assert_eq!(eval("$.customer.tags[-1]"), Some(json!("c")));
        assert_eq!(eval("$.customer.orders[0].total"), Some(json!(10.5)));
        assert_eq!(eval("customer.age"), Some(json!(18)));
        assert_eq!(eval("$"), Some(doc()));
    }

    #[test]
    fn explicit_null_is_found() {
        assert_eq!(eval("$.customer.nickname"), Some(Value::Null));
    }

    #[test]
    fn missing_definite_paths_are_not_found() {
        assert_eq!(eval("$.wrong.path"), None);
        assert_eq!(eval("$.customer.tags[7]"), None);
        assert_eq!(eval("$.customer.name.first"), None);
        assert_eq!(eval("$.customer.tags.name"), None);
    }

    #[test]
    fn indefinite_paths_return_arrays() {
        assert_eq!(eval("$.customer.orders[*].id"), Some(json!([1, 2])));
        assert_eq!(eval("$..total"), Some(json!([10.5, 7.25])));
        assert_eq!(eval("$.customer.tags[0:2]"), Some(json!(["a", "b"])));
        assert_eq!(eval("$.customer.tags[-2:]"), Some(json!(["b", "c"])));
        assert_eq!(eval("$.customer.tags[0,2]"), Some(json!(["a", "c"])));
        assert_eq!(eval("$.customer['name','age']"), Some(json!(["Jan", 18])));
        assert_eq!(eval("$..missing"), Some(json!([])));
    }

    #[test]
    fn definiteness_is_tracked() {
        assert!(JsonPath::parse("$.a.b[0]").unwrap().is_definite());
        assert!(!JsonPath::parse("$.a[*]").unwrap().is_definite());
        assert!(!JsonPath::parse("$..a").unwrap().is_definite());
    }

    #[test]
    fn malformed_paths_are_rejected() {
        assert!(JsonPath::parse("").is_err());
        assert!(JsonPath::parse("$.").is_err());
        assert!(JsonPath::parse("$.a[").is_err());
        assert!(JsonPath::parse("$.a[x]").is_err());
        assert!(JsonPath::parse("$.a$b").is_ok());

        let err = JsonPath::parse("$.items[?(@.id == 1)]").unwrap_err();
        assert_eq!(err.position, 7);
        assert!(err.message.contains("filter"));
    }

    #[test]
    fn error_positions_count_leading_whitespace() {
        let bare = JsonPath::parse("$.a[x]").unwrap_err();
        let padded = JsonPath::parse("   $.a[x]  ").unwrap_err();
        assert_eq!(padded.position, bare.position + 3);
        assert_eq!(&"   $.a[x]  "[padded.position..padded.position + 1], &"$.a[x]"[bare.position..bare.position + 1]);

        let err = JsonPath::parse("\t$.items[?(@.id == 1)]").unwrap_err();
        assert_eq!(err.position, 8);
        assert!(JsonPath::parse("  $.a ").is_ok());
    }

    #[test]
    fn quoted_names_unescape() {
        let path = JsonPath::parse(r"$['it\'s']").unwrap();
        assert_eq!(path.evaluate(&json!({"it's": 1})).map(Cow::into_owned), Some(json!(1)));
    }

    #[test]
    fn pointer_adapter() {
        let pointer = Pointer("/customer/tags/0".to_string());
        assert_eq!(pointer.evaluate(&doc()).map(Cow::into_owned), Some(json!("a")));
        assert!(Pointer("/nope".to_string()).evaluate(&doc()).is_none());
    }
}

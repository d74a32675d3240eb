//
//  url.rs
//  routecheck
//
//  URL value types: partially evaluated strings, path segments and the
//  normalized `ResolvedUrl` that routes and call sites are compared by.
//

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// HTTP verb of a route or a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    /// Case-insensitive: `get`, `GET` and `RequestMethod.GET` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let simple = s.rsplit('.').next().unwrap_or(s);
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(simple))
            .ok_or_else(|| format!("unknown HTTP method: {s}"))
    }
}

// ── Partially evaluated strings ─────────────────────────────────────────────

/// One piece of a partially evaluated string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Piece {
    Text(String),
    /// A value only known at runtime.
    Opaque,
}

/// A string as far as static evaluation got: text and opaque holes, in
/// source order. Adjacent pieces of the same kind are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StrValue {
    pieces: Vec<Piece>,
}

impl StrValue {
    pub fn text(s: impl Into<String>) -> Self {
        let mut v = Self::default();
        v.push_text(&s.into());
        v
    }

    pub fn opaque() -> Self {
        Self {
            pieces: vec![Piece::Opaque],
        }
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn push_text(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        if let Some(Piece::Text(last)) = self.pieces.last_mut() {
            last.push_str(s);
        } else {
            self.pieces.push(Piece::Text(s.to_string()));
        }
    }

    pub fn push_opaque(&mut self) {
        if self.pieces.last() != Some(&Piece::Opaque) {
            self.pieces.push(Piece::Opaque);
        }
    }

    pub fn append(&mut self, other: &StrValue) {
        for piece in &other.pieces {
            match piece {
                Piece::Text(s) => self.push_text(s),
                Piece::Opaque => self.push_opaque(),
            }
        }
    }

    /// The full text, when nothing is opaque.
    pub fn as_literal(&self) -> Option<String> {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(s) => out.push_str(s),
                Piece::Opaque => return None,
            }
        }
        Some(out)
    }

    pub fn is_opaque(&self) -> bool {
        self.pieces.iter().all(|p| *p == Piece::Opaque) && !self.pieces.is_empty()
    }
}

// ── Resolved URLs ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    Literal(String),
    /// Unresolvable or variable-driven segment.
    Wildcard,
}

/// Scheme and host in front of the path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    Literal(String),
    /// An opaque base URL such as an injected `baseUrl`.
    Unresolved,
}

const UNRESOLVED_ORIGIN: &str = "*://*";
const WILDCARD_TEXT: &str = "{*}";

/// A normalized URL template. Construction always normalizes, so derived
/// equality and hashing compare normalized values.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolvedUrl {
    origin: Option<Origin>,
    segments: Vec<PathSegment>,
}

impl ResolvedUrl {
    pub fn new(origin: Option<Origin>, segments: Vec<PathSegment>) -> Self {
        Self { origin, segments }
    }

    /// Parse a template string. Parsing the `Display` output of a value
    /// yields that value again.
    pub fn parse(s: &str) -> Self {
        Self::from_value(&StrValue::text(s))
    }

    /// Normalize a partially evaluated string into origin + path segments.
    pub fn from_value(value: &StrValue) -> Self {
        let (origin, rest) = split_origin(value.pieces());

        let mut segments = Vec::new();
        let mut current = SegmentBuf::default();
        'pieces: for piece in rest {
            match piece {
                Piece::Opaque => current.opaque = true,
                Piece::Text(text) => {
                    for c in text.chars() {
                        match c {
                            '/' => current.flush(&mut segments),
                            '?' | '#' => break 'pieces,
                            _ => current.text.push(c),
                        }
                    }
                }
            }
        }
        current.flush(&mut segments);

        Self { origin, segments }
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The same URL with the scheme/host prefix removed.
    pub fn path_only(&self) -> Self {
        Self {
            origin: None,
            segments: self.segments.clone(),
        }
    }

    /// Append `other`'s path segments onto this URL's path.
    pub fn join(&self, other: &ResolvedUrl) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self {
            origin: self.origin.clone(),
            segments,
        }
    }

    /// True when nothing about the target is known statically.
    pub fn is_unresolved(&self) -> bool {
        !matches!(self.origin, Some(Origin::Literal(_)))
            && !self
                .segments
                .iter()
                .any(|s| matches!(s, PathSegment::Literal(_)))
    }

    /// Path portion rendered as a template, e.g. `/api/v1/users/{*}`.
    pub fn path_template(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                PathSegment::Literal(s) => out.push_str(s),
                PathSegment::Wildcard => out.push_str(WILDCARD_TEXT),
            }
        }
        out
    }
}

impl fmt::Display for ResolvedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(Origin::Literal(s)) => f.write_str(s)?,
            Some(Origin::Unresolved) => f.write_str(UNRESOLVED_ORIGIN)?,
            None => {}
        }
        f.write_str(&self.path_template())
    }
}

impl From<&str> for ResolvedUrl {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for ResolvedUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResolvedUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

#[derive(Default)]
struct SegmentBuf {
    text: String,
    opaque: bool,
}

impl SegmentBuf {
    fn flush(&mut self, segments: &mut Vec<PathSegment>) {
        if self.opaque || is_path_variable(&self.text) {
            segments.push(PathSegment::Wildcard);
        } else if !self.text.is_empty() {
            segments.push(PathSegment::Literal(std::mem::take(&mut self.text)));
        }
        self.text.clear();
        self.opaque = false;
    }
}

/// Split a leading `scheme://host` (literal or opaque) off the pieces.
fn split_origin(pieces: &[Piece]) -> (Option<Origin>, Vec<Piece>) {
    match pieces {
        [Piece::Text(first), rest @ ..] => {
            let Some(host_start) = scheme_end(first) else {
                return (None, pieces.to_vec());
            };
            let mut host = first[..host_start].to_string();
            let mut opaque = false;
            let mut remaining = Vec::new();
            let mut in_host = true;

            let tail = std::iter::once(Piece::Text(first[host_start..].to_string()))
                .chain(rest.iter().cloned());
            for piece in tail {
                if !in_host {
                    remaining.push(piece);
                    continue;
                }
                match piece {
                    Piece::Opaque => opaque = true,
                    Piece::Text(text) => match text.find('/') {
                        Some(slash) => {
                            host.push_str(&text[..slash]);
                            remaining.push(Piece::Text(text[slash..].to_string()));
                            in_host = false;
                        }
                        None => host.push_str(&text),
                    },
                }
            }

            let origin = if opaque || host == UNRESOLVED_ORIGIN {
                Origin::Unresolved
            } else {
                Origin::Literal(host)
            };
            (Some(origin), remaining)
        }
        [Piece::Opaque, Piece::Text(next), ..] if next.starts_with('/') => {
            (Some(Origin::Unresolved), pieces[1..].to_vec())
        }
        _ => (None, pieces.to_vec()),
    }
}

/// Byte offset just past `scheme://`, if the text starts with one.
fn scheme_end(text: &str) -> Option<usize> {
    let idx = text.find("://")?;
    let scheme = &text[..idx];
    let valid = scheme == "*"
        || (scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')));
    valid.then_some(idx + 3)
}

/// Segment written as a path variable in any common route syntax.
fn is_path_variable(segment: &str) -> bool {
    (segment.starts_with('{') && segment.ends_with('}'))
        || (segment.starts_with("${") && segment.ends_with('}'))
        || (segment.starts_with('<') && segment.ends_with('>') && segment.len() > 2)
        || (segment.len() > 1
            && segment.starts_with(':')
            && segment[1..]
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_'))
        || segment == "*"
        || segment == "**"
}

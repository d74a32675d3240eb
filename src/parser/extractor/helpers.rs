//
//  helpers.rs
//  routecheck
//

use std::path::Path;

use tree_sitter::Node;

use crate::model::SourceLocation;

/// Get the full text of a node.
pub fn node_text(node: &Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}

/// Text of a named field of `node`, if present.
pub fn field_text(node: &Node, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field).map(|n| node_text(&n, source))
}

/// 1-based location of a node's first character.
pub fn location(path: &Path, node: &Node) -> SourceLocation {
    let pos = node.start_position();
    SourceLocation::new(path, pos.row + 1, pos.column + 1)
}

/// Named children, skipping comments.
pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !c.is_extra())
        .collect()
}

/// Contents of a Java string literal or text block, escapes decoded.
pub fn string_literal_value(node: &Node, source: &[u8]) -> String {
    let text = node.utf8_text(source).unwrap_or("");
    let inner = if let Some(rest) = text.strip_prefix("\"\"\"") {
        rest.strip_suffix("\"\"\"").unwrap_or(rest).trim_start_matches(['\r', '\n'])
    } else {
        let rest = text.strip_prefix('"').unwrap_or(text);
        rest.strip_suffix('"').unwrap_or(rest)
    };
    unescape(inner)
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#"/api/\"quoted\""#), "/api/\"quoted\"");
        assert_eq!(unescape(r"a\\b"), r"a\b");
        assert_eq!(unescape("/plain"), "/plain");
    }
}

//
//  logs.rs
//  routecheck
//
//  Handler log templates. A pass of its own over the syntax tree: the
//  lowering drops logging, so nothing here reaches route or call analysis.
//

use std::path::Path;

use tree_sitter::Node;

use super::helpers::{field_text, location, named_children, node_text, string_literal_value};
use super::java::{LOG_LEVELS, LOG_RECEIVERS};
use crate::model::HandlerLog;

/// `String.format` conversions that count as placeholders.
const FORMAT_CONVERSIONS: &str = "sdioxXeEfgGaAcbBhHntp";

/// The first log statement of every method in a compilation unit, for
/// methods that have one.
pub(super) fn collect(path: &Path, source: &[u8], root: &Node) -> Vec<HandlerLog> {
    let mut logs = Vec::new();
    visit_methods(root, &mut |method: &Node| {
        let Some(name) = method.child_by_field_name("name") else {
            return;
        };
        let Some(body) = method.child_by_field_name("body") else {
            return;
        };
        if let Some(template) = first_log_template(&body, source) {
            logs.push(HandlerLog {
                handler_method: node_text(&name, source),
                location: location(path, &name),
                constant_parts: constant_parts(&template),
                template,
            });
        }
    });
    logs
}

fn visit_methods<'t>(node: &Node<'t>, f: &mut dyn FnMut(&Node<'t>)) {
    for child in named_children(node) {
        if child.kind() == "method_declaration" {
            f(&child);
        }
        visit_methods(&child, f);
    }
}

/// Message literal of the first `log.<level>("...", ..)` call in source order.
fn first_log_template(node: &Node, source: &[u8]) -> Option<String> {
    for child in named_children(node) {
        if child.kind() == "method_invocation" {
            if let Some(template) = log_message(&child, source) {
                return Some(template);
            }
        }
        if let Some(template) = first_log_template(&child, source) {
            return Some(template);
        }
    }
    None
}

fn log_message(call: &Node, source: &[u8]) -> Option<String> {
    let object = call.child_by_field_name("object")?;
    let level = field_text(call, "name", source)?;
    if object.kind() != "identifier"
        || !LOG_RECEIVERS.contains(&node_text(&object, source).as_str())
        || !LOG_LEVELS.contains(&level.as_str())
    {
        return None;
    }
    let arguments = call.child_by_field_name("arguments")?;
    let first = named_children(&arguments).into_iter().next()?;
    if first.kind() != "string_literal" {
        return None;
    }
    let template = string_literal_value(&first, source);
    (!template.is_empty()).then_some(template)
}

/// Constant text of a log template, split on placeholders.
///
/// `"Downloading Document {} for case: {}"` -> `["Downloading Document", "for case:"]`
pub fn constant_parts(template: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut rest = template;
    while let Some(c) = rest.chars().next() {
        match placeholder_len(rest) {
            Some(len) => {
                parts.push(std::mem::take(&mut current));
                rest = &rest[len..];
            }
            None => {
                current.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    parts.push(current);
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Byte length of the placeholder `s` starts with: `{}` or `%[n][$]<conv>`.
fn placeholder_len(s: &str) -> Option<usize> {
    if s.starts_with("{}") {
        return Some(2);
    }
    let spec = s.strip_prefix('%')?;
    let digits = spec.bytes().take_while(u8::is_ascii_digit).count();
    let mut len = 1 + digits;
    if spec[digits..].starts_with('$') {
        len += 1;
    }
    let conversion = s[len..].chars().next()?;
    FORMAT_CONVERSIONS
        .contains(conversion)
        .then_some(len + conversion.len_utf8())
}

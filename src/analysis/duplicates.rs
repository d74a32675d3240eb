//
//  duplicates.rs
//  routecheck
//
//  Hardcoded path fragments repeated within one class.
//

use std::collections::BTreeMap;

use tracing::debug;

use super::symbols::ClassSymbol;
use crate::model::{DuplicateLiteralFinding, Expr, SourceLocation};

/// One literal string node and, if it is a constant's whole initializer,
/// that constant's name.
struct Occurrence<'a> {
    location: &'a SourceLocation,
    constant: Option<&'a str>,
}

/// Report every literal fragment occurring at least `min_occurrences`
/// times in the class. Constant references are not occurrences; a
/// constant's own initializer is, and names the finding's replacement.
pub fn detect_duplicates(symbol: &ClassSymbol, min_occurrences: usize) -> Vec<DuplicateLiteralFinding> {
    let mut groups: BTreeMap<&str, Vec<Occurrence<'_>>> = BTreeMap::new();

    let decl = symbol.decl();
    for field in &decl.fields {
        let Some(init) = &field.initializer else {
            continue;
        };
        match init {
            Expr::Str { value, location } if field.is_final => {
                groups.entry(value.as_str()).or_default().push(Occurrence {
                    location,
                    constant: Some(field.name.as_str()),
                });
            }
            _ => push_literals(&mut groups, init),
        }
    }

    let mappings = decl
        .request_mapping
        .iter()
        .chain(decl.methods.iter().flat_map(|m| m.mappings.iter()));
    for mapping in mappings {
        for path in &mapping.paths {
            push_literals(&mut groups, path);
        }
    }

    for method in &decl.methods {
        for stmt in &method.body {
            if let Some(expr) = stmt.expr() {
                push_literals(&mut groups, expr);
            }
        }
    }

    let threshold = min_occurrences.max(2);
    let mut findings = Vec::new();
    for (fragment, occurrences) in groups {
        if occurrences.len() < threshold || !fragment.chars().any(char::is_alphanumeric) {
            continue;
        }

        let bound_constant = occurrences.iter().find_map(|o| o.constant);
        let mut sites: Vec<SourceLocation> = occurrences
            .iter()
            .filter(|o| bound_constant.is_none() || o.constant != bound_constant)
            .map(|o| o.location.clone())
            .collect();
        sites.sort();

        debug!(
            class = %symbol.name(),
            fragment = %fragment,
            count = occurrences.len(),
            "duplicate literal"
        );
        findings.push(DuplicateLiteralFinding {
            literal_fragment: fragment.to_string(),
            occurrences: sites,
            owner_class: symbol.qualified_name().to_string(),
            bound_constant: bound_constant.map(str::to_string),
        });
    }

    findings.sort_by(|a, b| a.occurrences.first().cmp(&b.occurrences.first()));
    findings
}

fn push_literals<'a>(groups: &mut BTreeMap<&'a str, Vec<Occurrence<'a>>>, expr: &'a Expr) {
    for (value, location) in expr.literals() {
        groups.entry(value).or_default().push(Occurrence {
            location,
            constant: None,
        });
    }
}

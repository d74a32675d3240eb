//
//  matcher.rs
//  routecheck
//
//  Reconciles declared routes against client call sites. Pure function of
//  its inputs: output order never depends on input order.
//

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::HostPolicy;
use crate::model::{
    ClientCallSite, Diagnostic, HttpMethod, MatchResult, PathSegment, ResolvedUrl,
    RouteDeclaration, SourceLocation, TemplateUsage,
};

/// Everything the matcher produces.
#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    pub results: Vec<MatchResult>,
    pub diagnostics: Vec<Diagnostic>,
    pub template_usages: Vec<TemplateUsage>,
}

/// Normalized comparison form of a URL under a host policy.
fn match_key(url: &ResolvedUrl, policy: HostPolicy) -> ResolvedUrl {
    match policy {
        HostPolicy::Strip => url.path_only(),
        HostPolicy::Keep => url.clone(),
    }
}

/// Whether a call URL reaches a declared route template. A wildcard in the
/// route absorbs any single call segment; a wildcard in the call only
/// lines up with a wildcard in the route.
fn reaches(route: &ResolvedUrl, call: &ResolvedUrl) -> bool {
    route.origin() == call.origin()
        && route.segments().len() == call.segments().len()
        && route
            .segments()
            .iter()
            .zip(call.segments())
            .all(|(r, c)| match (r, c) {
                (PathSegment::Wildcard, _) => true,
                (PathSegment::Literal(a), PathSegment::Literal(b)) => a == b,
                (PathSegment::Literal(_), PathSegment::Wildcard) => false,
            })
}

/// Match declarations against call sites.
pub fn match_routes(
    declarations: &[RouteDeclaration],
    call_sites: &[ClientCallSite],
    policy: HostPolicy,
) -> MatchReport {
    let route_keys: Vec<ResolvedUrl> = declarations
        .iter()
        .map(|d| match_key(&d.path_template, policy))
        .collect();
    let mut paired = vec![false; declarations.len()];
    let mut results = Vec::new();

    for call in call_sites {
        if call.url_template.is_unresolved() {
            debug!(location = %call.source_location, "unresolved call site, not matched");
            results.push(MatchResult::UnmatchedCall {
                call_site: call.clone(),
            });
            continue;
        }

        // Exact templates shadow wildcard ones, per verb.
        let key = match_key(&call.url_template, policy);
        let exact: Vec<usize> = (0..declarations.len())
            .filter(|&i| route_keys[i] == key)
            .collect();
        let reaching: Vec<usize> = (0..declarations.len())
            .filter(|&i| reaches(&route_keys[i], &key))
            .collect();
        let with_verb = |indices: &[usize]| -> Vec<usize> {
            indices
                .iter()
                .copied()
                .filter(|&i| declarations[i].http_method == call.http_method)
                .collect()
        };

        let mut same_verb = with_verb(&exact);
        if same_verb.is_empty() {
            same_verb = with_verb(&reaching);
        }
        let candidates = if exact.is_empty() { reaching } else { exact };

        if !same_verb.is_empty() {
            for i in same_verb {
                paired[i] = true;
                results.push(MatchResult::Matched {
                    declaration: declarations[i].clone(),
                    call_site: call.clone(),
                });
            }
        } else if !candidates.is_empty() {
            for i in candidates {
                paired[i] = true;
                results.push(MatchResult::MethodMismatch {
                    declaration: declarations[i].clone(),
                    call_site: call.clone(),
                });
            }
        } else {
            results.push(MatchResult::UnmatchedCall {
                call_site: call.clone(),
            });
        }
    }

    for (declaration, _) in declarations.iter().zip(&paired).filter(|(_, p)| !**p) {
        results.push(MatchResult::UnmatchedDeclaration {
            declaration: declaration.clone(),
        });
    }
    results.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let diagnostics = ambiguous_routes(declarations, &route_keys);
    let template_usages = template_usages(call_sites, policy);

    debug!(
        results = results.len(),
        ambiguous = diagnostics.len(),
        templates = template_usages.len(),
        "matched routes"
    );

    MatchReport {
        results,
        diagnostics,
        template_usages,
    }
}

/// More than one handler serving the same method + path.
fn ambiguous_routes(declarations: &[RouteDeclaration], keys: &[ResolvedUrl]) -> Vec<Diagnostic> {
    let mut groups: BTreeMap<(HttpMethod, &ResolvedUrl), Vec<&RouteDeclaration>> = BTreeMap::new();
    for (declaration, key) in declarations.iter().zip(keys) {
        groups
            .entry((declaration.http_method, key))
            .or_default()
            .push(declaration);
    }

    let mut diagnostics: Vec<Diagnostic> = groups
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .map(|((http_method, template), group)| {
            let mut declarations: Vec<RouteDeclaration> = group.into_iter().cloned().collect();
            declarations.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
            Diagnostic::AmbiguousRoute {
                http_method,
                template: template.clone(),
                declarations,
            }
        })
        .collect();
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    diagnostics
}

/// Group call sites targeting one normalized template.
fn template_usages(call_sites: &[ClientCallSite], policy: HostPolicy) -> Vec<TemplateUsage> {
    let mut groups: BTreeMap<(HttpMethod, ResolvedUrl), Vec<SourceLocation>> = BTreeMap::new();
    for call in call_sites {
        groups
            .entry((call.http_method, match_key(&call.url_template, policy)))
            .or_default()
            .push(call.source_location.clone());
    }
    groups
        .into_iter()
        .map(|((http_method, template), mut call_sites)| {
            call_sites.sort();
            TemplateUsage {
                http_method,
                template,
                call_sites,
            }
        })
        .collect()
}

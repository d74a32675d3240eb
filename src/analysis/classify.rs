//
//  classify.rs
//  routecheck
//
//  Stereotype classification from a class's marker set. Names never
//  factor in: a `...Controller` carrying only `@Service` is irrelevant.
//

use serde::Serialize;
use std::collections::BTreeSet;

use crate::model::MarkerKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stereotype {
    RouteHandler,
    HttpClient,
    Irrelevant,
}

/// Markers that make a class serve routes.
const ROUTE_HANDLER_MARKERS: &[MarkerKind] = &[MarkerKind::RestController, MarkerKind::Controller];

/// Markers that make a class a managed HTTP client component.
const HTTP_CLIENT_MARKERS: &[MarkerKind] = &[MarkerKind::Component];

/// Classify a class by its markers. Route handling wins over client
/// capability so the outcome is always exactly one stereotype.
pub fn classify(markers: &BTreeSet<MarkerKind>) -> Stereotype {
    if ROUTE_HANDLER_MARKERS.iter().any(|m| markers.contains(m)) {
        Stereotype::RouteHandler
    } else if HTTP_CLIENT_MARKERS.iter().any(|m| markers.contains(m)) {
        Stereotype::HttpClient
    } else {
        Stereotype::Irrelevant
    }
}

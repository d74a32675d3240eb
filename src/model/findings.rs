//
//  findings.rs
//  routecheck
//
//  Everything the engine emits: extracted routes and call sites, match
//  results, duplicate-literal findings and diagnostics. Plain data.
//

use serde::{Deserialize, Serialize};

use super::types::SourceLocation;
use super::url::{HttpMethod, ResolvedUrl};

/// A server-side route served by a handler method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteDeclaration {
    pub http_method: HttpMethod,
    pub path_template: ResolvedUrl,
    pub owner_class: String,
    pub handler_method: String,
    pub source_location: SourceLocation,
}

/// Total order over every field, location first.
pub(crate) type OrderKey<'a> = (&'a SourceLocation, HttpMethod, &'a ResolvedUrl, &'a str, &'a str);

impl RouteDeclaration {
    pub(crate) fn order_key(&self) -> OrderKey<'_> {
        (
            &self.source_location,
            self.http_method,
            &self.path_template,
            &self.owner_class,
            &self.handler_method,
        )
    }
}

/// A client-side HTTP invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientCallSite {
    pub http_method: HttpMethod,
    pub url_template: ResolvedUrl,
    pub owner_class: String,
    pub caller_method: String,
    pub source_location: SourceLocation,
}

impl ClientCallSite {
    pub(crate) fn order_key(&self) -> OrderKey<'_> {
        (
            &self.source_location,
            self.http_method,
            &self.url_template,
            &self.owner_class,
            &self.caller_method,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResult {
    Matched {
        declaration: RouteDeclaration,
        call_site: ClientCallSite,
    },
    UnmatchedDeclaration {
        declaration: RouteDeclaration,
    },
    UnmatchedCall {
        call_site: ClientCallSite,
    },
    MethodMismatch {
        declaration: RouteDeclaration,
        call_site: ClientCallSite,
    },
}

impl MatchResult {
    pub fn declaration(&self) -> Option<&RouteDeclaration> {
        match self {
            MatchResult::Matched { declaration, .. }
            | MatchResult::UnmatchedDeclaration { declaration }
            | MatchResult::MethodMismatch { declaration, .. } => Some(declaration),
            MatchResult::UnmatchedCall { .. } => None,
        }
    }

    pub fn call_site(&self) -> Option<&ClientCallSite> {
        match self {
            MatchResult::Matched { call_site, .. }
            | MatchResult::UnmatchedCall { call_site }
            | MatchResult::MethodMismatch { call_site, .. } => Some(call_site),
            MatchResult::UnmatchedDeclaration { .. } => None,
        }
    }

    /// Ordering key: call site first where there is one, then the
    /// declaration. Total, so equal keys mean equal results.
    pub(crate) fn sort_key(&self) -> (Option<OrderKey<'_>>, Option<OrderKey<'_>>, u8) {
        let rank = match self {
            MatchResult::Matched { .. } => 0,
            MatchResult::MethodMismatch { .. } => 1,
            MatchResult::UnmatchedCall { .. } => 2,
            MatchResult::UnmatchedDeclaration { .. } => 3,
        };
        let call = self.call_site().map(ClientCallSite::order_key);
        let decl = self.declaration().map(RouteDeclaration::order_key);
        match call {
            Some(_) => (call, decl, rank),
            None => (decl, None, rank),
        }
    }
}

/// The first log statement of a handler method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerLog {
    pub handler_method: String,
    /// Location of the method name, same as its routes' `source_location`.
    pub location: SourceLocation,
    /// The message literal as written.
    pub template: String,
    /// Constant text between placeholders (`{}`, `%s`, `%2$d`), trimmed.
    pub constant_parts: Vec<String>,
}

/// A path fragment hardcoded more than once in one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateLiteralFinding {
    pub literal_fragment: String,
    /// Inline occurrences, in source order.
    pub occurrences: Vec<SourceLocation>,
    pub owner_class: String,
    /// Constant already holding this fragment, if the class declares one.
    pub bound_constant: Option<String>,
}

/// Call sites that target the same method and normalized template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateUsage {
    pub http_method: HttpMethod,
    pub template: ResolvedUrl,
    pub call_sites: Vec<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Constant initializers that reference each other in a loop.
    CyclicConstantBinding {
        owner_class: String,
        chain: Vec<String>,
        location: SourceLocation,
    },
    /// More than one handler serving the same method + path.
    AmbiguousRoute {
        http_method: HttpMethod,
        template: ResolvedUrl,
        declarations: Vec<RouteDeclaration>,
    },
}

impl Diagnostic {
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Diagnostic::CyclicConstantBinding { location, .. } => Some(location),
            Diagnostic::AmbiguousRoute { declarations, .. } => {
                declarations.first().map(|d| &d.source_location)
            }
        }
    }

    /// Location first, then the remaining content.
    #[allow(clippy::type_complexity)]
    pub(crate) fn sort_key(
        &self,
    ) -> (
        Option<&SourceLocation>,
        Option<(HttpMethod, &ResolvedUrl)>,
        &[String],
        Vec<OrderKey<'_>>,
    ) {
        match self {
            Diagnostic::CyclicConstantBinding { chain, .. } => {
                (self.location(), None, chain.as_slice(), Vec::new())
            }
            Diagnostic::AmbiguousRoute {
                http_method,
                template,
                declarations,
            } => (
                self.location(),
                Some((*http_method, template)),
                &[] as &[String],
                declarations.iter().map(RouteDeclaration::order_key).collect(),
            ),
        }
    }
}

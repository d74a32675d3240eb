//! Engine data model.
//!
//! - `types`: declarations a parser hands in (classes, fields, methods, expressions)
//! - `url`: partially evaluated strings and normalized URL templates
//! - `findings`: routes, call sites, match results, diagnostics and handler logs

pub mod findings;
pub mod types;
pub mod url;

pub use findings::{
    ClientCallSite, Diagnostic, DuplicateLiteralFinding, HandlerLog, MatchResult,
    RouteDeclaration, TemplateUsage,
};
pub use types::{
    ClassDecl, Expr, FieldDecl, Invocation, MappingMarker, MarkerKind, MethodDecl, Param,
    SourceLocation, Stmt,
};
pub use url::{HttpMethod, Origin, PathSegment, Piece, ResolvedUrl, StrValue};

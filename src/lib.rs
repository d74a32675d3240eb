//! # routecheck
//!
//! Static cross-check of declared HTTP routes against the client call
//! sites of the same codebase.
//!
//! ## What it reports
//!
//! - **Matched** routes and calls, keyed by HTTP method and normalized path
//! - **Unmatched routes**: declared but never called from the scanned code
//! - **Unmatched calls**: calls to paths no scanned handler serves
//! - **Method mismatches**: same path, different verb
//! - **Duplicate literals**: path fragments hardcoded more than once in a class
//! - **Diagnostics**: cyclic constant bindings, ambiguous routes
//! - **Recommendations** (opt-in): per route, whether it is still referenced,
//!   seen at runtime, or a candidate for deprecation, with the handler's
//!   log template
//!
//! URLs are resolved statically from literals, constants and
//! concatenation. Anything known only at runtime becomes a `{*}` wildcard
//! segment; resolution never fails.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use routecheck::{analyze_roots, RouteCheckConfig};
//!
//! let roots = vec![PathBuf::from("src/main/java")];
//! let report = analyze_roots(&roots, RouteCheckConfig::default());
//! for result in &report.matches {
//!     println!("{result:?}");
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod recommend;
pub mod report;

// Re-exports for convenience
pub use analysis::{AnalysisReport, Analyzer, CancellationToken, GlobalBindings};
pub use config::RouteCheckConfig;
pub use error::{Result, RouteCheckError};
pub use recommend::{Recommendation, RecommendationStatus, RuntimeUsage};
pub use report::Report;

use std::path::PathBuf;

use crate::model::ClassDecl;

/// Parse in-memory sources and analyze them.
///
/// Files whose language is unsupported or that fail to parse are reported
/// as errors; nothing is analyzed in that case.
pub fn analyze_sources(
    sources: &[(PathBuf, String)],
    config: RouteCheckConfig,
) -> Result<AnalysisReport> {
    let mut classes: Vec<ClassDecl> = Vec::new();
    for (path, source) in sources {
        classes.extend(parser::extract_file(path, source)?);
    }
    Ok(Analyzer::new(config).analyze(&classes))
}

/// Scan directories on disk and analyze every supported file found.
pub fn analyze_roots(roots: &[PathBuf], config: RouteCheckConfig) -> AnalysisReport {
    let classes = parser::scan_roots(roots, &config.scan.extra_ignores);
    Analyzer::new(config).analyze(&classes)
}

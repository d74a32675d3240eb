//! The route/call-site engine.
//!
//! Each class is analyzed on its own: its constants are bound
//! ([`symbols`]), it is classified from its markers ([`classify`]), and
//! then either its routes ([`routes`]) or its HTTP call sites ([`calls`])
//! are extracted through the expression [`resolver`]. Repeated hardcoded
//! fragments are collected per class ([`duplicates`]). Once every class is
//! done, the [`matcher`] reconciles routes against call sites.
//!
//! [`pipeline::Analyzer`] drives all of this in parallel.

pub mod calls;
pub mod classify;
pub mod duplicates;
pub mod matcher;
pub mod pipeline;
pub mod resolver;
pub mod routes;
pub mod symbols;

pub use calls::{extract_call_sites, ClientConventions};
pub use classify::{classify, Stereotype};
pub use duplicates::detect_duplicates;
pub use matcher::{match_routes, MatchReport};
pub use pipeline::{AnalysisReport, Analyzer, CancellationToken};
pub use resolver::{ConstantScope, NoConstants, Resolver};
pub use routes::extract_routes;
pub use symbols::{Binding, ClassSymbol, GlobalBindings};

//
//  pipeline.rs
//  routecheck
//
//  Per-class analysis fanned out over rayon, with the matcher as the
//  synchronization point once every class is done.
//

use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::calls::{extract_call_sites, ClientConventions};
use super::classify::{classify, Stereotype};
use super::duplicates::detect_duplicates;
use super::matcher::match_routes;
use super::routes::extract_routes;
use super::symbols::{ClassSymbol, GlobalBindings};
use crate::config::RouteCheckConfig;
use crate::parser::scan::lock_recovering;
use crate::model::{
    ClassDecl, ClientCallSite, Diagnostic, DuplicateLiteralFinding, MatchResult,
    RouteDeclaration, TemplateUsage,
};

/// Cooperative cancellation flag shared between a caller and a running
/// analysis. Workers check it before starting each class.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one analysis run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    pub routes: Vec<RouteDeclaration>,
    pub call_sites: Vec<ClientCallSite>,
    pub matches: Vec<MatchResult>,
    pub template_usages: Vec<TemplateUsage>,
    pub duplicates: Vec<DuplicateLiteralFinding>,
    pub diagnostics: Vec<Diagnostic>,
    pub classes_analyzed: usize,
    /// Set when the run was cancelled before every class was analyzed.
    pub cancelled: bool,
}

/// What one class contributes.
#[derive(Default)]
struct ClassOutcome {
    routes: Vec<RouteDeclaration>,
    call_sites: Vec<ClientCallSite>,
    duplicates: Vec<DuplicateLiteralFinding>,
    diagnostics: Vec<Diagnostic>,
}

pub struct Analyzer {
    config: RouteCheckConfig,
    conventions: ClientConventions,
    globals: Option<GlobalBindings>,
    cancel: CancellationToken,
}

impl Analyzer {
    pub fn new(config: RouteCheckConfig) -> Self {
        Self {
            conventions: ClientConventions::from_config(&config.client),
            config,
            globals: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an explicit cross-class constant table instead of deriving one.
    pub fn with_globals(mut self, globals: GlobalBindings) -> Self {
        self.globals = Some(globals);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &RouteCheckConfig {
        &self.config
    }

    /// Analyze a snapshot of parsed classes.
    pub fn analyze(&self, classes: &[ClassDecl]) -> AnalysisReport {
        match self.config.analysis.threads {
            Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(|| self.run(classes)),
                Err(e) => {
                    warn!(threads, error = %e, "failed to build thread pool, using the global pool");
                    self.run(classes)
                }
            },
            None => self.run(classes),
        }
    }

    fn run(&self, classes: &[ClassDecl]) -> AnalysisReport {
        let globals = self.globals(classes);
        let outcomes: Mutex<Vec<ClassOutcome>> = Mutex::new(Vec::with_capacity(classes.len()));

        classes.par_iter().for_each(|decl| {
            if self.cancel.is_cancelled() {
                return;
            }
            let outcome = self.analyze_class(decl, &globals);
            lock_recovering(&outcomes).push(outcome);
        });

        let outcomes = outcomes
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let classes_analyzed = outcomes.len();
        let cancelled = self.cancel.is_cancelled() && classes_analyzed < classes.len();
        if cancelled {
            warn!(
                analyzed = classes_analyzed,
                total = classes.len(),
                "analysis cancelled"
            );
        }

        let mut report = AnalysisReport {
            classes_analyzed,
            cancelled,
            ..AnalysisReport::default()
        };
        for outcome in outcomes {
            report.routes.extend(outcome.routes);
            report.call_sites.extend(outcome.call_sites);
            report.duplicates.extend(outcome.duplicates);
            report.diagnostics.extend(outcome.diagnostics);
        }
        report.routes.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        report
            .call_sites
            .sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        report.duplicates.sort_by(|a, b| {
            (&a.owner_class, a.occurrences.first(), &a.literal_fragment).cmp(&(
                &b.owner_class,
                b.occurrences.first(),
                &b.literal_fragment,
            ))
        });

        let matched = match_routes(
            &report.routes,
            &report.call_sites,
            self.config.matching.host_policy,
        );
        report.matches = matched.results;
        report.template_usages = matched.template_usages;
        report.diagnostics.extend(matched.diagnostics);
        report
            .diagnostics
            .sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        info!(
            classes = report.classes_analyzed,
            routes = report.routes.len(),
            call_sites = report.call_sites.len(),
            duplicates = report.duplicates.len(),
            diagnostics = report.diagnostics.len(),
            "analysis complete"
        );
        report
    }

    /// Cross-class constants: explicit, derived, or none.
    fn globals(&self, classes: &[ClassDecl]) -> GlobalBindings {
        if let Some(globals) = &self.globals {
            return globals.clone();
        }
        if !self.config.analysis.derive_globals {
            return GlobalBindings::new();
        }

        let empty = GlobalBindings::new();
        let symbols: Vec<ClassSymbol> = classes
            .par_iter()
            .map(|decl| ClassSymbol::build(decl.clone(), &empty))
            .collect();
        let globals = GlobalBindings::from_symbols(&symbols);
        debug!(constants = globals.len(), "derived global bindings");
        globals
    }

    fn analyze_class(&self, decl: &ClassDecl, globals: &GlobalBindings) -> ClassOutcome {
        let stereotype = classify(&decl.markers);
        let symbol = ClassSymbol::build(decl.clone(), globals);

        let mut outcome = ClassOutcome {
            duplicates: detect_duplicates(&symbol, self.config.duplicates.min_occurrences),
            diagnostics: symbol.diagnostics().to_vec(),
            ..ClassOutcome::default()
        };
        match stereotype {
            Stereotype::RouteHandler => outcome.routes = extract_routes(&symbol, globals),
            Stereotype::HttpClient => {
                outcome.call_sites = extract_call_sites(&symbol, globals, &self.conventions)
            }
            Stereotype::Irrelevant => {}
        }

        debug!(
            class = %symbol.qualified_name(),
            stereotype = ?stereotype,
            routes = outcome.routes.len(),
            call_sites = outcome.call_sites.len(),
            "analyzed class"
        );
        outcome
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(RouteCheckConfig::default())
    }
}

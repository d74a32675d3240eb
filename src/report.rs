//
//  report.rs
//  routecheck
//
//  Rendering of an analysis for humans (text) and tools (JSON).
//

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::AnalysisReport;
use crate::config::HostPolicy;
use crate::model::{ClientCallSite, Diagnostic, MatchResult, RouteDeclaration};
use crate::recommend::{Recommendation, RecommendationStatus};

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub roots: Vec<String>,
    pub host_policy: HostPolicy,
}

/// Counts per finding kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub classes: usize,
    pub routes: usize,
    pub call_sites: usize,
    pub matched: usize,
    pub unmatched_declarations: usize,
    pub unmatched_calls: usize,
    pub method_mismatches: usize,
    pub duplicate_literals: usize,
    pub diagnostics: usize,
    /// Only counted when recommendations were computed.
    pub deprecation_candidates: usize,
}

impl Summary {
    pub fn of(analysis: &AnalysisReport) -> Self {
        let mut summary = Self {
            classes: analysis.classes_analyzed,
            routes: analysis.routes.len(),
            call_sites: analysis.call_sites.len(),
            duplicate_literals: analysis.duplicates.len(),
            diagnostics: analysis.diagnostics.len(),
            ..Self::default()
        };
        for result in &analysis.matches {
            match result {
                MatchResult::Matched { .. } => summary.matched += 1,
                MatchResult::UnmatchedDeclaration { .. } => summary.unmatched_declarations += 1,
                MatchResult::UnmatchedCall { .. } => summary.unmatched_calls += 1,
                MatchResult::MethodMismatch { .. } => summary.method_mismatches += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: Summary,
    #[serde(flatten)]
    pub analysis: AnalysisReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<Recommendation>,
}

impl Report {
    pub fn new(analysis: AnalysisReport, roots: &[String], host_policy: HostPolicy) -> Self {
        Self {
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                roots: roots.to_vec(),
                host_policy,
            },
            summary: Summary::of(&analysis),
            analysis,
            recommendations: Vec::new(),
        }
    }

    pub fn with_recommendations(mut self, recommendations: Vec<Recommendation>) -> Self {
        self.summary.deprecation_candidates = recommendations
            .iter()
            .filter(|r| r.status == RecommendationStatus::CandidateForDeprecation)
            .count();
        self.recommendations = recommendations;
        self
    }

    /// True when anything a strict run should fail on is present:
    /// unmatched calls, method mismatches, duplicate literals or diagnostics.
    pub fn has_findings(&self) -> bool {
        let s = &self.summary;
        s.unmatched_calls > 0 || s.method_mismatches > 0 || s.duplicate_literals > 0 || s.diagnostics > 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let a = &self.analysis;
        let mut lines = vec![format!(
            "routecheck {}: {} classes, {} routes, {} call sites",
            self.metadata.version, self.summary.classes, self.summary.routes, self.summary.call_sites
        )];
        if a.cancelled {
            lines.push("(cancelled: partial results)".to_string());
        }

        if !a.routes.is_empty() {
            lines.push(String::new());
            lines.push("Routes".to_string());
            lines.extend(a.routes.iter().map(|r| format!("  {}", route_line(r))));
        }

        if !a.call_sites.is_empty() {
            lines.push(String::new());
            lines.push("Call sites".to_string());
            lines.extend(a.call_sites.iter().map(|c| format!("  {}", call_line(c))));
        }

        let problems: Vec<String> = a
            .matches
            .iter()
            .filter_map(|m| match m {
                MatchResult::Matched { .. } => None,
                MatchResult::UnmatchedDeclaration { declaration } => {
                    Some(format!("  [unmatched route] {}", route_line(declaration)))
                }
                MatchResult::UnmatchedCall { call_site } => {
                    Some(format!("  [unmatched call] {}", call_line(call_site)))
                }
                MatchResult::MethodMismatch {
                    declaration,
                    call_site,
                } => Some(format!(
                    "  [method mismatch] {} called, {} declared: {}",
                    call_line(call_site),
                    declaration.http_method,
                    route_line(declaration)
                )),
            })
            .collect();
        if !problems.is_empty() {
            lines.push(String::new());
            lines.push("Matching".to_string());
            lines.extend(problems);
        }

        let repeated: Vec<String> = a
            .template_usages
            .iter()
            .filter(|u| u.call_sites.len() > 1)
            .map(|u| {
                format!(
                    "  {} {} called from {} sites",
                    u.http_method,
                    u.template,
                    u.call_sites.len()
                )
            })
            .collect();
        if !repeated.is_empty() {
            lines.push(String::new());
            lines.push("Shared templates".to_string());
            lines.extend(repeated);
        }

        if !a.duplicates.is_empty() {
            lines.push(String::new());
            lines.push("Duplicate literals".to_string());
            for d in &a.duplicates {
                let sites: Vec<String> = d.occurrences.iter().map(|l| l.to_string()).collect();
                let hint = match &d.bound_constant {
                    Some(constant) => format!(" (use {constant})"),
                    None => String::new(),
                };
                lines.push(format!(
                    "  {:?} in {}{}: {}",
                    d.literal_fragment,
                    d.owner_class,
                    hint,
                    sites.join(", ")
                ));
            }
        }

        if !a.diagnostics.is_empty() {
            lines.push(String::new());
            lines.push("Diagnostics".to_string());
            lines.extend(a.diagnostics.iter().map(|d| format!("  {}", diagnostic_line(d))));
        }

        if !self.recommendations.is_empty() {
            lines.push(String::new());
            lines.push("Recommendations".to_string());
            for r in &self.recommendations {
                lines.push(format!("  [{}] {}", r.status.as_str(), route_line(&r.declaration)));
                lines.push(format!("    {}", r.rationale));
                if let Some(log) = &r.log {
                    lines.push(format!("    log: {:?}", log.constant_parts.join(" ... ")));
                }
                lines.extend(r.warnings.iter().map(|w| format!("    warning: {w}")));
            }
        }

        let s = &self.summary;
        lines.push(String::new());
        lines.push(format!(
            "{} matched, {} unmatched routes, {} unmatched calls, {} method mismatches, {} duplicate literals, {} diagnostics",
            s.matched,
            s.unmatched_declarations,
            s.unmatched_calls,
            s.method_mismatches,
            s.duplicate_literals,
            s.diagnostics
        ));
        lines.join("\n")
    }
}

fn route_line(r: &RouteDeclaration) -> String {
    format!(
        "{} {}  {}#{} ({})",
        r.http_method, r.path_template, r.owner_class, r.handler_method, r.source_location
    )
}

fn call_line(c: &ClientCallSite) -> String {
    format!(
        "{} {}  {}#{} ({})",
        c.http_method, c.url_template, c.owner_class, c.caller_method, c.source_location
    )
}

fn diagnostic_line(d: &Diagnostic) -> String {
    match d {
        Diagnostic::CyclicConstantBinding {
            owner_class,
            chain,
            location,
        } => format!(
            "cyclic constant binding in {owner_class}: {} ({location})",
            chain.join(" -> ")
        ),
        Diagnostic::AmbiguousRoute {
            http_method,
            template,
            declarations,
        } => {
            let handlers: Vec<String> = declarations
                .iter()
                .map(|r| format!("{}#{}", r.owner_class, r.handler_method))
                .collect();
            format!(
                "ambiguous route {http_method} {template}: {}",
                handlers.join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HttpMethod, ResolvedUrl, SourceLocation};

    fn analysis() -> AnalysisReport {
        let route = RouteDeclaration {
            http_method: HttpMethod::Get,
            path_template: ResolvedUrl::parse("/health"),
            owner_class: "welcome.to.the.jungle.SimpleController".to_string(),
            handler_method: "healthCheck".to_string(),
            source_location: SourceLocation::new("SimpleController.java", 17, 28),
        };
        AnalysisReport {
            matches: vec![MatchResult::UnmatchedDeclaration {
                declaration: route.clone(),
            }],
            routes: vec![route],
            classes_analyzed: 1,
            ..AnalysisReport::default()
        }
    }

    #[test]
    fn test_summary_counts() {
        let report = Report::new(analysis(), &[".".to_string()], HostPolicy::Strip);
        assert_eq!(report.summary.routes, 1);
        assert_eq!(report.summary.unmatched_declarations, 1);
        assert!(!report.has_findings());
    }

    #[test]
    fn test_json_shape() {
        let report = Report::new(analysis(), &[".".to_string()], HostPolicy::Strip);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["metadata"]["host_policy"], "strip");
        assert_eq!(value["routes"][0]["path_template"], "/health");
        assert_eq!(value["routes"][0]["http_method"], "GET");
        assert_eq!(value["matches"][0]["kind"], "unmatched_declaration");
        assert!(value["metadata"]["generated_at"].is_string());
    }

    #[test]
    fn test_recommendations_in_report() {
        let analysis = analysis();
        let recommendations = crate::recommend::recommend(&analysis, &[], None);
        let report = Report::new(analysis, &[".".to_string()], HostPolicy::Strip)
            .with_recommendations(recommendations);
        assert_eq!(report.summary.deprecation_candidates, 1);

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["recommendations"][0]["status"], "candidate_for_deprecation");
        assert_eq!(value["recommendations"][0]["declaration"]["handler_method"], "healthCheck");
        assert!(value["recommendations"][0]["runtime_occurrences"].is_null());

        let text = report.render_text();
        assert!(text.contains("[candidate_for_deprecation] GET /health"));
        assert!(text.contains("warning: No log statement found in handler"));
    }

    #[test]
    fn test_recommendations_omitted_when_not_computed() {
        let report = Report::new(analysis(), &[".".to_string()], HostPolicy::Strip);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert!(value.get("recommendations").is_none());
        assert!(!report.render_text().contains("Recommendations"));
    }

    #[test]
    fn test_text_rendering() {
        let report = Report::new(analysis(), &[".".to_string()], HostPolicy::Strip);
        let text = report.render_text();
        assert!(text.contains("GET /health  welcome.to.the.jungle.SimpleController#healthCheck"));
        assert!(text.contains("[unmatched route]"));
        assert!(text.ends_with("0 matched, 1 unmatched routes, 0 unmatched calls, 0 method mismatches, 0 duplicate literals, 0 diagnostics"));
    }
}

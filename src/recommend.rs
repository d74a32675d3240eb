//
//  recommend.rs
//  routecheck
//
//  Per-route deprecation advice. Runs after the engine on its results,
//  plus handler log templates and, when supplied, runtime occurrence
//  counts exported from a log platform.
//

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::analysis::AnalysisReport;
use crate::error::{Result, RouteCheckError};
use crate::model::{HandlerLog, HttpMethod, MatchResult, ResolvedUrl, RouteDeclaration, SourceLocation};
use crate::parser::extract_handler_logs;

const NO_LOG_WARNING: &str = "No log statement found in handler: skipping log analysis";
const NO_RUNTIME_WARNING: &str = "No runtime usage data supplied: skipping runtime analysis";
const MISMATCH_ONLY_WARNING: &str = "Only referenced with a different HTTP method";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    RuntimeUsageDetected,
    StillReferencedInCode,
    CandidateForDeprecation,
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RuntimeUsageDetected => "runtime_usage_detected",
            Self::StillReferencedInCode => "still_referenced_in_code",
            Self::CandidateForDeprecation => "candidate_for_deprecation",
        }
    }

    pub fn rationale(&self) -> &'static str {
        match self {
            Self::RuntimeUsageDetected => {
                "Runtime log occurrences were detected in the specified time range."
            }
            Self::StillReferencedInCode => {
                "Static references to the endpoint were found in the scanned codebases."
            }
            Self::CandidateForDeprecation => {
                "No runtime usage detected and no static references found in scanned codebases."
            }
        }
    }
}

/// Advice for one declared route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub declaration: RouteDeclaration,
    pub status: RecommendationStatus,
    pub rationale: String,
    /// Call sites reaching the route, with or without the right verb.
    pub code_references: usize,
    /// `None` when no runtime data was supplied.
    pub runtime_occurrences: Option<u64>,
    pub log: Option<HandlerLog>,
    pub warnings: Vec<String>,
}

/// Runtime occurrence counts per route.
///
/// Read from a JSON object keyed by `"<METHOD> <path>"`:
///
/// ```json
/// { "GET /api/payment/status": 1204, "DELETE /api/payment/{id}": 0 }
/// ```
///
/// Paths are normalized like route templates, so `{id}` and `{*}` agree.
#[derive(Debug, Clone, Default)]
pub struct RuntimeUsage {
    counts: BTreeMap<(HttpMethod, ResolvedUrl), u64>,
}

impl RuntimeUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
            .map_err(|e| RouteCheckError::RuntimeUsage(format!("{}: {e}", path.display())))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, u64> =
            serde_json::from_str(json).map_err(|e| RouteCheckError::RuntimeUsage(e.to_string()))?;
        let mut usage = Self::new();
        for (key, count) in raw {
            let (method, path) = key.trim().split_once(char::is_whitespace).ok_or_else(|| {
                RouteCheckError::RuntimeUsage(format!("expected \"<METHOD> <path>\", got {key:?}"))
            })?;
            let method: HttpMethod = method.parse().map_err(RouteCheckError::RuntimeUsage)?;
            usage.insert(method, path.trim(), count);
        }
        Ok(usage)
    }

    /// Add occurrences for a route; repeated keys accumulate.
    pub fn insert(&mut self, method: HttpMethod, path: &str, count: u64) {
        *self
            .counts
            .entry((method, ResolvedUrl::parse(path).path_only()))
            .or_default() += count;
    }

    pub fn occurrences(&self, route: &RouteDeclaration) -> u64 {
        self.counts
            .get(&(route.http_method, route.path_template.path_only()))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Read the handler files of `routes` and pull each handler's log template.
///
/// Unreadable or unparsable files are logged and skipped.
pub fn collect_handler_logs(routes: &[RouteDeclaration]) -> Vec<HandlerLog> {
    let files: BTreeSet<&Path> = routes
        .iter()
        .map(|r| r.source_location.file.as_path())
        .collect();
    let files: Vec<&Path> = files.into_iter().collect();

    let mut logs: Vec<HandlerLog> = files
        .par_iter()
        .flat_map_iter(|file| {
            let source = match fs::read_to_string(file) {
                Ok(source) => source,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "failed to read handler file");
                    return Vec::new();
                }
            };
            extract_handler_logs(file, &source).unwrap_or_else(|e| {
                warn!(file = %file.display(), error = %e, "failed to parse handler file");
                Vec::new()
            })
        })
        .collect();
    logs.sort_by(|a, b| a.location.cmp(&b.location));
    debug!(files = files.len(), logs = logs.len(), "collected handler log templates");
    logs
}

/// One recommendation per declared route, in route order.
pub fn recommend(
    analysis: &AnalysisReport,
    logs: &[HandlerLog],
    runtime: Option<&RuntimeUsage>,
) -> Vec<Recommendation> {
    let logs: HashMap<&SourceLocation, &HandlerLog> =
        logs.iter().map(|log| (&log.location, log)).collect();

    // (matched, mismatched) call sites per route
    let mut references: HashMap<&RouteDeclaration, (usize, usize)> = HashMap::new();
    for result in &analysis.matches {
        match result {
            MatchResult::Matched { declaration, .. } => {
                references.entry(declaration).or_default().0 += 1
            }
            MatchResult::MethodMismatch { declaration, .. } => {
                references.entry(declaration).or_default().1 += 1
            }
            MatchResult::UnmatchedDeclaration { .. } | MatchResult::UnmatchedCall { .. } => {}
        }
    }

    analysis
        .routes
        .iter()
        .map(|route| {
            let (matched, mismatched) = references.get(route).copied().unwrap_or_default();
            let log = logs.get(&route.source_location).map(|log| (*log).clone());
            let runtime_occurrences = runtime.map(|usage| usage.occurrences(route));

            let status = if runtime_occurrences.unwrap_or(0) > 0 {
                RecommendationStatus::RuntimeUsageDetected
            } else if matched + mismatched > 0 {
                RecommendationStatus::StillReferencedInCode
            } else {
                RecommendationStatus::CandidateForDeprecation
            };

            let mut warnings = Vec::new();
            if log.is_none() {
                warnings.push(NO_LOG_WARNING.to_string());
            }
            if runtime_occurrences.is_none() {
                warnings.push(NO_RUNTIME_WARNING.to_string());
            }
            if matched == 0 && mismatched > 0 {
                warnings.push(MISMATCH_ONLY_WARNING.to_string());
            }

            Recommendation {
                declaration: route.clone(),
                status,
                rationale: status.rationale().to_string(),
                code_references: matched + mismatched,
                runtime_occurrences,
                log,
                warnings,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClientCallSite;

    fn route(method: HttpMethod, path: &str, line: usize) -> RouteDeclaration {
        RouteDeclaration {
            http_method: method,
            path_template: ResolvedUrl::parse(path),
            owner_class: "com.example.UserController".to_string(),
            handler_method: format!("handler{line}"),
            source_location: SourceLocation::new("UserController.java", line, 10),
        }
    }

    fn call(method: HttpMethod, path: &str) -> ClientCallSite {
        ClientCallSite {
            http_method: method,
            url_template: ResolvedUrl::parse(path),
            owner_class: "com.example.UserClient".to_string(),
            caller_method: "fetch".to_string(),
            source_location: SourceLocation::new("UserClient.java", 9, 16),
        }
    }

    fn analysis() -> AnalysisReport {
        let listed = route(HttpMethod::Get, "/api/v1/users", 10);
        let removed = route(HttpMethod::Delete, "/api/v1/users/{id}", 20);
        let renamed = route(HttpMethod::Put, "/api/v1/users/{id}", 30);
        AnalysisReport {
            matches: vec![
                MatchResult::Matched {
                    declaration: listed.clone(),
                    call_site: call(HttpMethod::Get, "/api/v1/users"),
                },
                MatchResult::UnmatchedDeclaration {
                    declaration: removed.clone(),
                },
                MatchResult::MethodMismatch {
                    declaration: renamed.clone(),
                    call_site: call(HttpMethod::Post, "/api/v1/users/{*}"),
                },
            ],
            routes: vec![listed, removed, renamed],
            ..AnalysisReport::default()
        }
    }

    fn log_for(line: usize, template: &str) -> HandlerLog {
        HandlerLog {
            handler_method: format!("handler{line}"),
            location: SourceLocation::new("UserController.java", line, 10),
            template: template.to_string(),
            constant_parts: crate::parser::constant_parts(template),
        }
    }

    #[test]
    fn test_status_from_code_references() {
        let recommendations = recommend(&analysis(), &[], None);
        let statuses: Vec<&str> = recommendations.iter().map(|r| r.status.as_str()).collect();
        assert_eq!(
            statuses,
            vec![
                "still_referenced_in_code",
                "candidate_for_deprecation",
                "still_referenced_in_code",
            ]
        );
        assert_eq!(
            recommendations[1].rationale,
            "No runtime usage detected and no static references found in scanned codebases."
        );
        assert_eq!(recommendations[0].code_references, 1);
        assert_eq!(recommendations[1].code_references, 0);
        assert!(recommendations[2].warnings.contains(&MISMATCH_ONLY_WARNING.to_string()));
    }

    #[test]
    fn test_warnings_when_evidence_is_missing() {
        let logs = vec![log_for(10, "Listing users for tenant {}")];
        let recommendations = recommend(&analysis(), &logs, None);

        let listed = &recommendations[0];
        assert_eq!(listed.warnings, vec![NO_RUNTIME_WARNING.to_string()]);
        assert_eq!(
            listed.log.as_ref().map(|l| l.constant_parts.clone()),
            Some(vec!["Listing users for tenant".to_string()])
        );
        assert_eq!(listed.runtime_occurrences, None);

        let removed = &recommendations[1];
        assert_eq!(
            removed.warnings,
            vec![NO_LOG_WARNING.to_string(), NO_RUNTIME_WARNING.to_string()]
        );
    }

    #[test]
    fn test_runtime_usage_takes_precedence() {
        let usage = RuntimeUsage::from_json(
            r#"{ "DELETE /api/v1/users/{userId}": 42, "GET /api/v1/users": 0 }"#,
        )
        .unwrap();
        assert_eq!(usage.len(), 2);
        let recommendations = recommend(&analysis(), &[], Some(&usage));

        assert_eq!(recommendations[1].status, RecommendationStatus::RuntimeUsageDetected);
        assert_eq!(recommendations[1].runtime_occurrences, Some(42));
        assert_eq!(
            recommendations[1].rationale,
            "Runtime log occurrences were detected in the specified time range."
        );
        // zero occurrences fall through to code references
        assert_eq!(recommendations[0].status, RecommendationStatus::StillReferencedInCode);
        assert_eq!(recommendations[0].runtime_occurrences, Some(0));
        // supplied data without an entry counts as zero
        assert_eq!(recommendations[2].runtime_occurrences, Some(0));
        assert!(!recommendations[2].warnings.contains(&NO_RUNTIME_WARNING.to_string()));
    }

    #[test]
    fn test_runtime_usage_rejects_bad_keys() {
        assert!(RuntimeUsage::from_json(r#"{ "/api/v1/users": 3 }"#).is_err());
        assert!(RuntimeUsage::from_json(r#"{ "FETCH /api/v1/users": 3 }"#).is_err());
        assert!(RuntimeUsage::from_json("[1, 2]").is_err());

        let mut usage = RuntimeUsage::new();
        usage.insert(HttpMethod::Get, "https://api.example.com/api/v1/users/", 2);
        usage.insert(HttpMethod::Get, "/api/v1/users", 3);
        assert_eq!(usage.occurrences(&route(HttpMethod::Get, "/api/v1/users", 1)), 5);
    }

    #[test]
    fn test_handler_logs_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("UserController.java");
        fs::write(
            &file,
            r#"@RestController
class UserController {
    @GetMapping("/api/v1/users")
    List<User> list() {
        log.info("Listing %d users", count);
        return null;
    }
}
"#,
        )
        .unwrap();
        let mut listed = route(HttpMethod::Get, "/api/v1/users", 4);
        listed.source_location = SourceLocation::new(&file, 4, 16);
        let mut missing = route(HttpMethod::Get, "/gone", 1);
        missing.source_location = SourceLocation::new(dir.path().join("Missing.java"), 1, 1);

        let logs = collect_handler_logs(&[listed.clone(), missing]);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].location, listed.source_location);
        assert_eq!(logs[0].constant_parts, vec!["Listing", "users"]);
    }
}

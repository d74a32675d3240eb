//! End-to-end behavior over the Java fixtures in tests/fixtures.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use routecheck::analysis::{classify, Stereotype};
use routecheck::config::HostPolicy;
use routecheck::model::{
    Diagnostic, HttpMethod, MatchResult, Origin, ResolvedUrl, RouteDeclaration,
};
use routecheck::parser::extract_file;
use routecheck::recommend::{collect_handler_logs, recommend};
use routecheck::{
    analyze_roots, analyze_sources, AnalysisReport, RecommendationStatus, RouteCheckConfig,
    RuntimeUsage,
};

fn fixture(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

fn analyze(files: &[&str]) -> AnalysisReport {
    let sources: Vec<(PathBuf, String)> = files
        .iter()
        .map(|f| {
            let path = fixture(f);
            let source = std::fs::read_to_string(&path).unwrap();
            (path, source)
        })
        .collect();
    analyze_sources(&sources, RouteCheckConfig::default()).unwrap()
}

fn analyze_inline(files: &[(&str, &str)]) -> AnalysisReport {
    let sources: Vec<(PathBuf, String)> = files
        .iter()
        .map(|(name, source)| (PathBuf::from(name), source.to_string()))
        .collect();
    analyze_sources(&sources, RouteCheckConfig::default()).unwrap()
}

fn routes(report: &AnalysisReport) -> Vec<(HttpMethod, String)> {
    report
        .routes
        .iter()
        .map(|r| (r.http_method, r.path_template.to_string()))
        .collect()
}

fn calls(report: &AnalysisReport) -> Vec<(HttpMethod, String, String)> {
    report
        .call_sites
        .iter()
        .map(|c| {
            (
                c.http_method,
                c.url_template.path_template(),
                c.caller_method.clone(),
            )
        })
        .collect()
}

#[test]
fn test_service_named_like_controller_yields_no_routes() {
    let path = fixture("controllers/NotAController.java");
    let source = std::fs::read_to_string(&path).unwrap();
    let classes = extract_file(&path, &source).unwrap();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].name, "PaymentService");
    assert_eq!(classify(&classes[0].markers), Stereotype::Irrelevant);

    let report = analyze(&["controllers/NotAController.java"]);
    assert!(report.routes.is_empty());
    assert!(report.call_sites.is_empty());
    assert!(report.matches.is_empty());
}

#[test]
fn test_base_path_is_prefixed_onto_method_paths() {
    let report = analyze(&["controllers/PaymentController.java"]);
    assert_eq!(
        routes(&report),
        vec![
            (HttpMethod::Post, "/api/payment/confirmation".to_string()),
            (HttpMethod::Get, "/api/payment/status".to_string()),
            (HttpMethod::Put, "/api/payment/update".to_string()),
            (HttpMethod::Delete, "/api/payment/cancel".to_string()),
        ]
    );
    let owners: BTreeSet<&str> = report.routes.iter().map(|r| r.owner_class.as_str()).collect();
    assert_eq!(owners, BTreeSet::from(["welcome.to.the.jungle.PaymentController"]));
}

#[test]
fn test_controller_without_base_path() {
    let report = analyze(&["controllers/SimpleController.java"]);
    assert_eq!(routes(&report), vec![(HttpMethod::Get, "/health".to_string())]);
    assert_eq!(report.routes[0].handler_method, "healthCheck");
}

#[test]
fn test_logging_never_changes_extraction() {
    let plain = analyze(&["controllers/PaymentController.java"]);
    let logged = analyze(&["logging/PaymentController.java"]);

    // locations differ between the two files; everything else must not
    let strip = |routes: &[RouteDeclaration]| -> Vec<(HttpMethod, ResolvedUrl, String, String)> {
        routes
            .iter()
            .map(|r| {
                (
                    r.http_method,
                    r.path_template.clone(),
                    r.owner_class.clone(),
                    r.handler_method.clone(),
                )
            })
            .collect()
    };
    assert_eq!(strip(&plain.routes), strip(&logged.routes));
    assert!(logged.call_sites.is_empty());
    assert!(logged.duplicates.is_empty());
}

#[test]
fn test_user_client_constant_folding() {
    let report = analyze(&["clients/UserClient.java"]);
    assert_eq!(
        calls(&report),
        vec![
            (HttpMethod::Get, "/api/v1/users/{*}".to_string(), "getUser".to_string()),
            (HttpMethod::Get, "/api/v1/users".to_string(), "getAllUsers".to_string()),
            (HttpMethod::Delete, "/api/v2/users/{*}".to_string(), "deleteUser".to_string()),
        ]
    );

    let all_users = &report.call_sites[1].url_template;
    assert_eq!(
        all_users.origin(),
        Some(&Origin::Literal("https://api.example.com".to_string()))
    );
    assert_eq!(all_users.to_string(), "https://api.example.com/api/v1/users");
}

#[test]
fn test_versions_stay_distinct_templates() {
    let report = analyze(&["clients/UserClient.java"]);
    let templates: BTreeSet<String> = report
        .template_usages
        .iter()
        .map(|u| format!("{} {}", u.http_method, u.template))
        .collect();
    assert!(templates.contains("DELETE /api/v2/users/{*}"));
    assert!(templates.contains("GET /api/v1/users/{*}"));
    assert!(templates.contains("GET /api/v1/users"));
    assert_eq!(templates.len(), 3);
}

#[test]
fn test_user_client_inline_literals_are_flagged() {
    let report = analyze(&["clients/UserClient.java"]);
    assert_eq!(report.duplicates.len(), 1);
    let finding = &report.duplicates[0];
    assert_eq!(finding.literal_fragment, "/api/v1/users");
    assert_eq!(finding.bound_constant.as_deref(), Some("USER_ENDPOINT"));
    let lines: Vec<usize> = finding.occurrences.iter().map(|l| l.line).collect();
    // getUser and getAllUsers inline it; the log messages do not count
    assert_eq!(lines, vec![13, 20]);
}

#[test]
fn test_payment_client_repeated_literal_is_flagged() {
    let report = analyze(&["clients/PaymentClient.java"]);
    assert_eq!(
        calls(&report),
        vec![
            (HttpMethod::Post, "/api/v1/payment/process".to_string(), "processPayment".to_string()),
            (HttpMethod::Get, "/api/v1/payment/status/{*}".to_string(), "getStatus".to_string()),
        ]
    );
    assert_eq!(report.call_sites[0].url_template.origin(), Some(&Origin::Unresolved));

    assert_eq!(report.duplicates.len(), 1);
    let finding = &report.duplicates[0];
    assert_eq!(finding.literal_fragment, "/api/v1/payment");
    assert_eq!(finding.owner_class, "com.example.clients.PaymentClient");
    assert_eq!(finding.bound_constant.as_deref(), Some("PAYMENT_ENDPOINT"));
    let lines: Vec<usize> = finding.occurrences.iter().map(|l| l.line).collect();
    assert_eq!(lines, vec![13, 19]);
}

#[test]
fn test_payment_controller_against_payment_client() {
    let report = analyze(&[
        "controllers/PaymentController.java",
        "clients/PaymentClient.java",
    ]);

    let unmatched_declarations = report
        .matches
        .iter()
        .filter(|m| matches!(m, MatchResult::UnmatchedDeclaration { .. }))
        .count();
    let unmatched_calls = report
        .matches
        .iter()
        .filter(|m| matches!(m, MatchResult::UnmatchedCall { .. }))
        .count();
    assert_eq!(unmatched_declarations, 4);
    assert_eq!(unmatched_calls, 2);
    assert_eq!(report.matches.len(), 6);
}

#[test]
fn test_resolution_is_idempotent() {
    let report = analyze_roots(&[fixture("controllers"), fixture("clients")], RouteCheckConfig::default());
    let templates = report
        .routes
        .iter()
        .map(|r| &r.path_template)
        .chain(report.call_sites.iter().map(|c| &c.url_template));
    for template in templates {
        let again = ResolvedUrl::parse(&template.to_string());
        assert_eq!(&again, template, "re-resolving {template} changed it");
    }
}

#[test]
fn test_full_scan_of_fixtures() {
    let report = analyze_roots(&[fixture("controllers"), fixture("clients")], RouteCheckConfig::default());
    assert_eq!(report.classes_analyzed, 6);
    assert_eq!(report.routes.len(), 5);
    assert_eq!(report.call_sites.len(), 7);
    assert!(report
        .matches
        .iter()
        .all(|m| !matches!(m, MatchResult::Matched { .. })));
    assert!(report.diagnostics.is_empty());

    // results come out sorted by location
    let locations: Vec<_> = report
        .call_sites
        .iter()
        .map(|c| c.source_location.clone())
        .collect();
    let mut sorted = locations.clone();
    sorted.sort();
    assert_eq!(locations, sorted);
}

#[test]
fn test_host_policy_keep() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("UsersController.java"),
        r#"
@RestController
@RequestMapping("/api/v1/users")
class UsersController {
    @GetMapping
    List<User> all() { return null; }
}
"#,
    )
    .unwrap();
    std::fs::copy(fixture("clients/UserClient.java"), dir.path().join("UserClient.java")).unwrap();

    let matched = |policy: HostPolicy| {
        let mut config = RouteCheckConfig::default();
        config.matching.host_policy = policy;
        analyze_roots(&[dir.path().to_path_buf()], config)
            .matches
            .iter()
            .filter(|m| matches!(m, MatchResult::Matched { .. }))
            .count()
    };
    assert_eq!(matched(HostPolicy::Strip), 1);
    assert_eq!(matched(HostPolicy::Keep), 0);
}

#[test]
fn test_interface_constants_feed_controller_paths() {
    let report = analyze_inline(&[
        (
            "ApiPaths.java",
            r#"
package com.example;

public interface ApiPaths {
    String USERS = "/api/users";
}
"#,
        ),
        (
            "UsersController.java",
            r#"
package com.example;

@RestController
@RequestMapping(ApiPaths.USERS)
class UsersController {
    @GetMapping("/{id}")
    User one(@PathVariable String id) { return null; }
}
"#,
        ),
    ]);
    assert_eq!(routes(&report), vec![(HttpMethod::Get, "/api/users/{*}".to_string())]);
}

#[test]
fn test_multi_verb_mapping_and_exchange_calls() {
    let report = analyze_inline(&[
        (
            "SearchController.java",
            r#"
@RestController
class SearchController {
    @RequestMapping(value = "/api/search", method = {RequestMethod.GET, RequestMethod.POST})
    List<Hit> search() { return List.of(); }
}
"#,
        ),
        (
            "SearchClient.java",
            r#"
@Component
class SearchClient {
    private final RestTemplate restTemplate;

    List<Hit> search() {
        return restTemplate.exchange("/api/search", HttpMethod.POST, null, HitList.class).getBody();
    }
}
"#,
        ),
    ]);
    assert_eq!(
        routes(&report),
        vec![
            (HttpMethod::Get, "/api/search".to_string()),
            (HttpMethod::Post, "/api/search".to_string()),
        ]
    );
    assert_eq!(
        calls(&report),
        vec![(HttpMethod::Post, "/api/search".to_string(), "search".to_string())]
    );
    let matched: Vec<HttpMethod> = report
        .matches
        .iter()
        .filter_map(|m| match m {
            MatchResult::Matched { declaration, .. } => Some(declaration.http_method),
            _ => None,
        })
        .collect();
    assert_eq!(matched, vec![HttpMethod::Post]);
}

#[test]
fn test_cyclic_constants_reach_the_report() {
    let report = analyze_inline(&[(
        "Loop.java",
        r#"
package com.example;

@Component
class Loop {
    static final String A = B + "/a";
    static final String B = A + "/b";

    Item fetch() { return restTemplate.getForObject(A, Item.class); }
}
"#,
    )]);
    let cycles: Vec<(&str, &[String])> = report
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            Diagnostic::CyclicConstantBinding {
                owner_class, chain, ..
            } => Some((owner_class.as_str(), chain.as_slice())),
            _ => None,
        })
        .collect();
    assert_eq!(cycles.len(), 1, "{:?}", report.diagnostics);
    assert_eq!(cycles[0].0, "com.example.Loop");
    assert_eq!(cycles[0].1.first(), cycles[0].1.last());
    assert!(report.call_sites[0].url_template.is_unresolved());
}

#[test]
fn test_same_location_routes_order_is_stable() {
    let controller = r#"
@RestController
class MultiController {
    @GetMapping({"/b", "/a"})
    String both() { return ""; }
}
"#;
    let first = analyze_inline(&[("MultiController.java", controller)]);
    let second = analyze_inline(&[("MultiController.java", controller)]);
    assert_eq!(
        routes(&first),
        vec![
            (HttpMethod::Get, "/a".to_string()),
            (HttpMethod::Get, "/b".to_string()),
        ]
    );
    assert_eq!(first.matches, second.matches);
}

#[test]
fn test_recommendations_for_logged_controller() {
    let report = analyze_roots(
        &[fixture("logging"), fixture("clients")],
        RouteCheckConfig::default(),
    );
    let logs = collect_handler_logs(&report.routes);
    let templates: Vec<(&str, &str)> = logs
        .iter()
        .map(|l| (l.handler_method.as_str(), l.template.as_str()))
        .collect();
    assert_eq!(
        templates,
        vec![
            ("confirmPayment", "POST /api/payment/confirmation received"),
            ("getPaymentStatus", "GET /api/payment/status"),
            ("updatePayment", "PUT /api/payment/update"),
            ("cancelPayment", "DELETE /api/payment/cancel"),
        ]
    );

    let mut usage = RuntimeUsage::new();
    usage.insert(HttpMethod::Get, "/api/payment/status", 17);
    let recommendations = recommend(&report, &logs, Some(&usage));
    let statuses: Vec<(String, RecommendationStatus)> = recommendations
        .iter()
        .map(|r| (r.declaration.handler_method.clone(), r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("confirmPayment".to_string(), RecommendationStatus::CandidateForDeprecation),
            ("getPaymentStatus".to_string(), RecommendationStatus::RuntimeUsageDetected),
            ("updatePayment".to_string(), RecommendationStatus::CandidateForDeprecation),
            ("cancelPayment".to_string(), RecommendationStatus::CandidateForDeprecation),
        ]
    );
    assert!(recommendations.iter().all(|r| r.warnings.is_empty()));
}

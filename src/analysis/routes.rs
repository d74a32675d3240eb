//
//  routes.rs
//  routecheck
//
//  Route extraction for route-handler classes: class-level base path
//  joined with each handler's method-level path.
//

use tracing::debug;

use super::resolver::{ConstantScope, Resolver};
use super::symbols::{ClassSymbol, GlobalBindings};
use crate::model::{HttpMethod, MappingMarker, ResolvedUrl, RouteDeclaration};

/// Extract every route declared by a route-handler class.
///
/// The method-level path is always appended to the class-level base
/// path (root when absent). A mapping naming several verbs yields one
/// route per verb. Methods without a verb are skipped unless the
/// class-level mapping supplies them.
pub fn extract_routes(symbol: &ClassSymbol, globals: &GlobalBindings) -> Vec<RouteDeclaration> {
    let mut scope = symbol.scope(globals);
    let class_mapping = symbol.decl().request_mapping.as_ref();
    let base_paths = resolve_paths(class_mapping, &mut scope);
    let class_verbs: &[HttpMethod] = class_mapping.map(|m| m.verbs.as_slice()).unwrap_or(&[]);

    let mut routes = Vec::new();
    for method in symbol.methods() {
        for mapping in &method.mappings {
            let verbs = if mapping.verbs.is_empty() {
                class_verbs
            } else {
                mapping.verbs.as_slice()
            };
            if verbs.is_empty() {
                debug!(
                    class = %symbol.name(),
                    method = %method.name,
                    "mapping without HTTP verb, skipped"
                );
                continue;
            }

            let method_paths = resolve_paths(Some(mapping), &mut scope);
            for &verb in verbs {
                for base in &base_paths {
                    for path in &method_paths {
                        routes.push(RouteDeclaration {
                            http_method: verb,
                            path_template: base.join(path),
                            owner_class: symbol.qualified_name().to_string(),
                            handler_method: method.name.clone(),
                            source_location: method.location.clone(),
                        });
                    }
                }
            }
        }
    }

    debug!(class = %symbol.name(), routes = routes.len(), "extracted routes");
    routes
}

/// Resolve a mapping's paths; a missing mapping or one without paths
/// contributes the empty path.
fn resolve_paths(mapping: Option<&MappingMarker>, scope: &mut dyn ConstantScope) -> Vec<ResolvedUrl> {
    match mapping {
        Some(m) if !m.paths.is_empty() => m
            .paths
            .iter()
            .map(|path| Resolver::new(&mut *scope).resolve(path).path_only())
            .collect(),
        _ => vec![ResolvedUrl::default()],
    }
}

//
//  calls.rs
//  routecheck
//
//  Call-site extraction for HTTP-client classes. Statements are replayed in
//  order so locals built before a call feed its URL argument.
//

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::resolver::Resolver;
use super::symbols::{ClassSymbol, GlobalBindings};
use crate::config::ClientConfig;
use crate::model::{ClientCallSite, Expr, HttpMethod, Invocation, MethodDecl, SourceLocation, Stmt};

/// Built-in invocation names and the verb they send.
const BUILTIN_VERBS: &[(&str, HttpMethod)] = &[
    ("get", HttpMethod::Get),
    ("post", HttpMethod::Post),
    ("put", HttpMethod::Put),
    ("delete", HttpMethod::Delete),
    ("patch", HttpMethod::Patch),
    ("head", HttpMethod::Head),
    ("options", HttpMethod::Options),
    ("getForObject", HttpMethod::Get),
    ("getForEntity", HttpMethod::Get),
    ("postForObject", HttpMethod::Post),
    ("postForEntity", HttpMethod::Post),
    ("postForLocation", HttpMethod::Post),
    ("patchForObject", HttpMethod::Patch),
    ("headForHeaders", HttpMethod::Head),
    ("optionsForAllow", HttpMethod::Options),
];

/// Invocations whose verb is passed as an argument:
/// `exchange(url, HttpMethod.GET, ..)`, `method(HttpMethod.GET)`.
const VERB_ARGUMENT_CALLS: &[&str] = &["exchange", "method"];

/// Enum types whose constants name a verb.
const VERB_TYPES: &[&str] = &["HttpMethod", "RequestMethod"];

/// Declared types an URL argument may have.
const URL_TYPES: &[&str] = &["String", "URI", "CharSequence"];

/// Fluent request builders take the URL from a trailing `.uri(...)`.
const FLUENT_URI: &str = "uri";

/// How request dispatchers and their verbs are recognized.
#[derive(Debug, Clone)]
pub struct ClientConventions {
    receivers: HashSet<String>,
    types: HashSet<String>,
    verbs: HashMap<String, HttpMethod>,
}

impl ClientConventions {
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut verbs: HashMap<String, HttpMethod> = BUILTIN_VERBS
            .iter()
            .map(|(name, verb)| (name.to_string(), *verb))
            .collect();
        verbs.extend(config.verb_aliases.iter().map(|(k, v)| (k.clone(), *v)));

        Self {
            receivers: config.dispatch_receivers.iter().cloned().collect(),
            types: config.dispatch_types.iter().cloned().collect(),
            verbs,
        }
    }

    /// The verb an invocation name sends, if it is a verb call at all.
    pub fn verb(&self, method: &str) -> Option<HttpMethod> {
        self.verbs.get(method).copied()
    }

    /// The verb `call` sends, from its name or from a verb constant among
    /// its arguments.
    pub fn verb_of(&self, call: &Invocation) -> Option<HttpMethod> {
        if let Some(verb) = self.verb(&call.method) {
            return Some(verb);
        }
        if !VERB_ARGUMENT_CALLS.contains(&call.method.as_str()) {
            return None;
        }
        call.args.iter().find_map(verb_constant)
    }

    fn is_dispatch_type(&self, type_name: &str) -> bool {
        self.types.contains(simple_type(type_name))
    }
}

impl Default for ClientConventions {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// `java.util.List<String>` -> `List`.
fn simple_type(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name).trim();
    base.rsplit('.').next().unwrap_or(base)
}

/// `HttpMethod.GET` -> GET.
fn verb_constant(expr: &Expr) -> Option<HttpMethod> {
    match expr {
        Expr::Qualified { qualifier, name } if VERB_TYPES.contains(&simple_type(qualifier)) => {
            name.parse().ok()
        }
        _ => None,
    }
}

/// Declared types of the names visible in one method.
#[derive(Default)]
struct TypeEnv<'a> {
    fields: HashMap<&'a str, &'a str>,
    locals: HashMap<&'a str, &'a str>,
}

impl<'a> TypeEnv<'a> {
    fn lookup(&self, name: &str) -> Option<&'a str> {
        self.locals
            .get(name)
            .or_else(|| self.fields.get(name))
            .copied()
    }

    fn declare(&mut self, name: &'a str, type_name: Option<&'a str>) {
        match type_name {
            Some(t) if t != "var" => {
                self.locals.insert(name, t);
            }
            _ => {
                self.locals.remove(name);
            }
        }
    }
}

/// A verb invocation found in a statement, before its URL is resolved.
struct Found<'e> {
    verb: HttpMethod,
    args: &'e [Expr],
    location: &'e SourceLocation,
}

/// Extract every HTTP call site from a client class.
pub fn extract_call_sites(
    symbol: &ClassSymbol,
    globals: &GlobalBindings,
    conventions: &ClientConventions,
) -> Vec<ClientCallSite> {
    let mut sites = Vec::new();
    for method in symbol.methods() {
        let collector = CallCollector {
            symbol,
            conventions,
            method,
        };
        collector.collect(globals, &mut sites);
    }
    debug!(class = %symbol.name(), calls = sites.len(), "extracted call sites");
    sites
}

struct CallCollector<'a> {
    symbol: &'a ClassSymbol,
    conventions: &'a ClientConventions,
    method: &'a MethodDecl,
}

impl<'a> CallCollector<'a> {
    fn collect(&self, globals: &GlobalBindings, sites: &mut Vec<ClientCallSite>) {
        let method: &'a MethodDecl = self.method;
        let mut scope = self.symbol.scope(globals);
        let mut resolver =
            Resolver::new(&mut scope).with_params(method.params.iter().map(|p| p.name.as_str()));

        let mut types = TypeEnv::default();
        for field in &self.symbol.decl().fields {
            if let Some(t) = &field.type_name {
                types.fields.insert(field.name.as_str(), t.as_str());
            }
        }
        for param in &method.params {
            types.declare(&param.name, param.type_name.as_deref());
        }

        for stmt in &method.body {
            if let Some(expr) = stmt.expr() {
                let mut found = Vec::new();
                self.find(expr, &types, &mut found);
                for call in found {
                    let Some(arg) = self.url_argument(call.args, &types) else {
                        debug!(
                            class = %self.symbol.name(),
                            method = %method.name,
                            location = %call.location,
                            "verb call without URL argument, skipped"
                        );
                        continue;
                    };
                    sites.push(ClientCallSite {
                        http_method: call.verb,
                        url_template: resolver.resolve(arg),
                        owner_class: self.symbol.qualified_name().to_string(),
                        caller_method: method.name.clone(),
                        source_location: call.location.clone(),
                    });
                }
            }

            if let Stmt::Local {
                name, type_name, ..
            } = stmt
            {
                types.declare(name, type_name.as_deref());
            }
            resolver.run_statement(stmt);
        }
    }

    /// Collect verb invocations in `expr`, outermost first.
    fn find<'e>(&self, expr: &'e Expr, types: &TypeEnv<'_>, found: &mut Vec<Found<'e>>) {
        match expr {
            Expr::Call(call) => {
                if let Some(inner) = self.fluent_verb_call(call, types) {
                    found.push(Found {
                        verb: inner.0,
                        args: &call.args,
                        location: &inner.1.location,
                    });
                    if let Some(receiver) = &inner.1.receiver {
                        self.find(receiver, types, found);
                    }
                } else {
                    if let Some(verb) = self.dispatch_verb(call, types) {
                        if !call.args.is_empty() {
                            found.push(Found {
                                verb,
                                args: &call.args,
                                location: &call.location,
                            });
                        }
                    }
                    if let Some(receiver) = &call.receiver {
                        self.find(receiver, types, found);
                    }
                }
                for arg in &call.args {
                    self.find(arg, types, found);
                }
            }
            Expr::Concat(parts) => {
                for part in parts {
                    self.find(part, types, found);
                }
            }
            _ => {}
        }
    }

    /// `client.get().uri(...)` or `client.method(HttpMethod.GET).uri(...)`:
    /// the verb call under `.uri`, taking no URL of its own.
    fn fluent_verb_call<'e>(
        &self,
        call: &'e Invocation,
        types: &TypeEnv<'_>,
    ) -> Option<(HttpMethod, &'e Invocation)> {
        if call.method != FLUENT_URI {
            return None;
        }
        match call.receiver.as_deref() {
            Some(Expr::Call(inner)) if inner.args.iter().all(|a| verb_constant(a).is_some()) => {
                self.dispatch_verb(inner, types).map(|verb| (verb, inner))
            }
            _ => None,
        }
    }

    /// The verb of `call` when it is sent through a request dispatcher.
    fn dispatch_verb(&self, call: &Invocation, types: &TypeEnv<'_>) -> Option<HttpMethod> {
        let verb = self.conventions.verb_of(call)?;
        let (name, type_name) = match call.receiver.as_deref()? {
            Expr::Name(name) => (name.as_str(), types.lookup(name)),
            Expr::Qualified { qualifier, name } if qualifier == "this" => {
                (name.as_str(), types.fields.get(name.as_str()).copied())
            }
            _ => return None,
        };
        let is_dispatcher = self.conventions.receivers.contains(name)
            || type_name.is_some_and(|t| self.conventions.is_dispatch_type(t));
        is_dispatcher.then_some(verb)
    }

    /// First argument that can hold a URL.
    fn url_argument<'e>(&self, args: &'e [Expr], types: &TypeEnv<'_>) -> Option<&'e Expr> {
        args.iter().find(|arg| match arg {
            Expr::ClassLiteral(_) | Expr::Other => false,
            Expr::Qualified { .. } if verb_constant(arg).is_some() => false,
            Expr::Name(name) => match types.lookup(name) {
                Some(t) => URL_TYPES.contains(&simple_type(t)),
                None => true,
            },
            _ => true,
        })
    }
}

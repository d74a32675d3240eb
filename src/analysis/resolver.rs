//
//  resolver.rs
//  routecheck
//
//  Static evaluation of string-building expressions. Never fails: any
//  shape it cannot see through becomes an opaque hole, which ends up as a
//  wildcard segment once the value is normalized into a `ResolvedUrl`.
//

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::model::{Expr, ResolvedUrl, Stmt, StrValue};

/// Where constant references are looked up.
pub trait ConstantScope {
    /// Value of constant `name`, optionally behind a qualifier (`this`,
    /// `Owner`, `com.x.Owner`). `None` when nothing by that name is known.
    fn lookup(&mut self, qualifier: Option<&str>, name: &str) -> Option<StrValue>;
}

/// Scope with no constants at all.
pub struct NoConstants;

impl ConstantScope for NoConstants {
    fn lookup(&mut self, _qualifier: Option<&str>, _name: &str) -> Option<StrValue> {
        None
    }
}

/// Evaluates expressions against constants, method parameters and locals.
///
/// Lookup order for a bare name: locals, then parameters (always opaque),
/// then class constants. Locals are bound in statement order, so a later
/// assignment shadows an earlier one.
pub struct Resolver<'s, S: ConstantScope + ?Sized> {
    constants: &'s mut S,
    params: HashSet<String>,
    locals: HashMap<String, StrValue>,
}

impl<'s, S: ConstantScope + ?Sized> Resolver<'s, S> {
    pub fn new(constants: &'s mut S) -> Self {
        Self {
            constants,
            params: HashSet::new(),
            locals: HashMap::new(),
        }
    }

    pub fn with_params<'p>(mut self, params: impl IntoIterator<Item = &'p str>) -> Self {
        self.params.extend(params.into_iter().map(str::to_string));
        self
    }

    pub fn bind_local(&mut self, name: &str, value: StrValue) {
        self.locals.insert(name.to_string(), value);
    }

    pub fn local(&self, name: &str) -> Option<&StrValue> {
        self.locals.get(name)
    }

    /// Apply a statement's bindings (locals and reassignments).
    pub fn run_statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Local { name, init, .. } => {
                let value = match init {
                    Some(expr) => self.evaluate(expr),
                    None => StrValue::opaque(),
                };
                self.bind_local(name, value);
            }
            Stmt::Assign { name, value } => {
                let value = self.evaluate(value);
                self.bind_local(name, value);
            }
            Stmt::Expr(_) | Stmt::Return(_) => {}
        }
    }

    /// Evaluate an expression into a partially evaluated string.
    pub fn evaluate(&mut self, expr: &Expr) -> StrValue {
        match expr {
            Expr::Str { value, .. } => StrValue::text(value.as_str()),
            Expr::Name(name) => {
                if let Some(value) = self.locals.get(name) {
                    return value.clone();
                }
                if self.params.contains(name) {
                    return StrValue::opaque();
                }
                self.constants.lookup(None, name).unwrap_or_else(|| {
                    trace!(name = %name, "unbound name resolves to wildcard");
                    StrValue::opaque()
                })
            }
            Expr::Qualified { qualifier, name } => self
                .constants
                .lookup(Some(qualifier.as_str()), name)
                .unwrap_or_else(|| {
                    trace!(qualifier = %qualifier, name = %name, "unknown qualified constant");
                    StrValue::opaque()
                }),
            Expr::Concat(parts) => {
                let mut value = StrValue::default();
                for part in parts {
                    let part = self.evaluate(part);
                    value.append(&part);
                }
                value
            }
            Expr::Call(call) if call.method == "concat" && call.args.len() == 1 => {
                match &call.receiver {
                    Some(receiver) => {
                        let mut value = self.evaluate(receiver);
                        let arg = self.evaluate(&call.args[0]);
                        value.append(&arg);
                        value
                    }
                    None => StrValue::opaque(),
                }
            }
            Expr::Call(_) | Expr::ClassLiteral(_) | Expr::Other => StrValue::opaque(),
        }
    }

    /// Evaluate and normalize into a URL template.
    pub fn resolve(&mut self, expr: &Expr) -> ResolvedUrl {
        ResolvedUrl::from_value(&self.evaluate(expr))
    }
}

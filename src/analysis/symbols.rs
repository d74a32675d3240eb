//
//  symbols.rs
//  routecheck
//
//  Per-class constant environments. Constants are resolved lazily in
//  dependency order; a reference chain that loops back on itself is cut,
//  reported once, and every constant on the loop becomes unresolved.
//

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use super::resolver::{ConstantScope, Resolver};
use crate::model::{
    ClassDecl, Diagnostic, FieldDecl, MarkerKind, MethodDecl, ResolvedUrl, StrValue,
};

/// What a constant name is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Resolved(StrValue),
    Unresolved,
}

impl Binding {
    pub fn value(&self) -> StrValue {
        match self {
            Binding::Resolved(value) => value.clone(),
            Binding::Unresolved => StrValue::opaque(),
        }
    }

    pub fn url(&self) -> Option<ResolvedUrl> {
        match self {
            Binding::Resolved(value) => Some(ResolvedUrl::from_value(value)),
            Binding::Unresolved => None,
        }
    }
}

/// Constants visible across classes, keyed by `Owner.NAME` and
/// `package.Owner.NAME`.
#[derive(Debug, Clone, Default)]
pub struct GlobalBindings {
    values: HashMap<String, StrValue>,
}

impl GlobalBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, qualifier: &str, name: &str, value: StrValue) {
        self.values.insert(format!("{qualifier}.{name}"), value);
    }

    pub fn get(&self, qualifier: &str, name: &str) -> Option<&StrValue> {
        self.values.get(&format!("{qualifier}.{name}"))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Export every fully literal constant of the given classes.
    pub fn from_symbols<'a>(symbols: impl IntoIterator<Item = &'a ClassSymbol>) -> Self {
        let mut globals = Self::new();
        for symbol in symbols {
            for (name, binding) in &symbol.bindings {
                if let Binding::Resolved(value) = binding {
                    if value.as_literal().is_some() {
                        globals.insert(symbol.name(), name, value.clone());
                        if symbol.qualified_name != symbol.name() {
                            globals.insert(&symbol.qualified_name, name, value.clone());
                        }
                    }
                }
            }
        }
        globals
    }
}

/// A class with its constant environment. Immutable once built.
#[derive(Debug, Clone)]
pub struct ClassSymbol {
    decl: ClassDecl,
    qualified_name: String,
    bindings: BTreeMap<String, Binding>,
    diagnostics: Vec<Diagnostic>,
}

impl ClassSymbol {
    /// Build the constant environment for one class.
    pub fn build(decl: ClassDecl, globals: &GlobalBindings) -> Self {
        let (bindings, diagnostics) = {
            let mut builder = TableBuilder::new(&decl, globals);
            for field in &decl.fields {
                builder.resolve_field(field);
            }
            builder.finish()
        };

        debug!(
            class = %decl.name,
            constants = bindings.len(),
            cycles = diagnostics.len(),
            "built symbol table"
        );

        Self {
            qualified_name: decl.qualified_name(),
            decl,
            bindings,
            diagnostics,
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn markers(&self) -> &BTreeSet<MarkerKind> {
        &self.decl.markers
    }

    pub fn decl(&self) -> &ClassDecl {
        &self.decl
    }

    pub fn methods(&self) -> &[MethodDecl] {
        &self.decl.methods
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.decl.fields.iter().find(|f| f.name == name)
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn bindings(&self) -> &BTreeMap<String, Binding> {
        &self.bindings
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// A lookup scope over this class's constants plus the global table.
    pub fn scope<'a>(&'a self, globals: &'a GlobalBindings) -> ClassScope<'a> {
        ClassScope {
            symbol: self,
            globals,
        }
    }

    fn is_self_qualifier(&self, qualifier: &str) -> bool {
        is_self_qualifier(&self.decl, &self.qualified_name, qualifier)
    }
}

fn is_self_qualifier(decl: &ClassDecl, qualified_name: &str, qualifier: &str) -> bool {
    qualifier == "this" || qualifier == decl.name || qualifier == qualified_name
}

/// Read-only constant scope over a built class.
pub struct ClassScope<'a> {
    symbol: &'a ClassSymbol,
    globals: &'a GlobalBindings,
}

impl ConstantScope for ClassScope<'_> {
    fn lookup(&mut self, qualifier: Option<&str>, name: &str) -> Option<StrValue> {
        match qualifier {
            Some(q) if !self.symbol.is_self_qualifier(q) => self.globals.get(q, name).cloned(),
            _ => self.symbol.binding(name).map(Binding::value),
        }
    }
}

enum FieldState {
    InProgress,
    Done(Binding),
}

/// Resolves one class's fields on demand, tracking the chain of constants
/// currently being resolved to detect reference loops.
struct TableBuilder<'a> {
    decl: &'a ClassDecl,
    qualified_name: String,
    globals: &'a GlobalBindings,
    state: HashMap<String, FieldState>,
    stack: Vec<String>,
    poisoned: HashSet<String>,
    reported: HashSet<BTreeSet<String>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> TableBuilder<'a> {
    fn new(decl: &'a ClassDecl, globals: &'a GlobalBindings) -> Self {
        Self {
            decl,
            qualified_name: decl.qualified_name(),
            globals,
            state: HashMap::new(),
            stack: Vec::new(),
            poisoned: HashSet::new(),
            reported: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    fn resolve_field(&mut self, field: &'a FieldDecl) -> StrValue {
        let in_progress = match self.state.get(&field.name) {
            Some(FieldState::Done(binding)) => return binding.value(),
            Some(FieldState::InProgress) => true,
            None => false,
        };
        if in_progress {
            self.report_cycle(field);
            return StrValue::opaque();
        }

        let binding = match (&field.initializer, field.is_final) {
            (Some(init), true) => {
                self.state
                    .insert(field.name.clone(), FieldState::InProgress);
                self.stack.push(field.name.clone());
                let value = Resolver::new(self).evaluate(init);
                self.stack.pop();
                if self.poisoned.contains(&field.name) {
                    Binding::Unresolved
                } else {
                    Binding::Resolved(value)
                }
            }
            _ => Binding::Unresolved,
        };

        let value = binding.value();
        self.state
            .insert(field.name.clone(), FieldState::Done(binding));
        value
    }

    fn report_cycle(&mut self, field: &FieldDecl) {
        let start = self
            .stack
            .iter()
            .position(|name| *name == field.name)
            .unwrap_or(0);
        let mut chain: Vec<String> = self.stack[start..].to_vec();
        chain.push(field.name.clone());

        let members: BTreeSet<String> = chain.iter().cloned().collect();
        self.poisoned.extend(members.iter().cloned());
        if !self.reported.insert(members) {
            return;
        }

        warn!(
            class = %self.decl.name,
            chain = %chain.join(" -> "),
            "cyclic constant binding"
        );
        self.diagnostics.push(Diagnostic::CyclicConstantBinding {
            owner_class: self.qualified_name.clone(),
            chain,
            location: field.location.clone(),
        });
    }

    fn finish(self) -> (BTreeMap<String, Binding>, Vec<Diagnostic>) {
        let bindings = self
            .state
            .into_iter()
            .filter_map(|(name, state)| match state {
                FieldState::Done(binding) => Some((name, binding)),
                FieldState::InProgress => None,
            })
            .collect();
        (bindings, self.diagnostics)
    }
}

impl ConstantScope for TableBuilder<'_> {
    fn lookup(&mut self, qualifier: Option<&str>, name: &str) -> Option<StrValue> {
        if let Some(q) = qualifier {
            if !is_self_qualifier(self.decl, &self.qualified_name, q) {
                return self.globals.get(q, name).cloned();
            }
        }
        let decl = self.decl;
        let field = decl.fields.iter().find(|f| f.name == name)?;
        Some(self.resolve_field(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Expr, SourceLocation};

    fn constant(name: &str, init: Expr) -> FieldDecl {
        FieldDecl {
            name: name.to_string(),
            type_name: Some("String".to_string()),
            is_final: true,
            initializer: Some(init),
            location: SourceLocation::new("C.java", 1, 1),
        }
    }

    fn class(name: &str, fields: Vec<FieldDecl>) -> ClassDecl {
        ClassDecl {
            name: name.to_string(),
            package: Some("com.example".to_string()),
            markers: BTreeSet::new(),
            request_mapping: None,
            fields,
            methods: Vec::new(),
            location: SourceLocation::new("C.java", 1, 1),
        }
    }

    fn s(v: &str) -> Expr {
        Expr::str(v, SourceLocation::default())
    }

    #[test]
    fn test_transitive_folding_out_of_declaration_order() {
        // URL is declared before the constants it references
        let decl = class(
            "UserClient",
            vec![
                constant(
                    "USERS_URL",
                    Expr::Concat(vec![Expr::name("BASE_URL"), Expr::name("USER_ENDPOINT")]),
                ),
                constant("BASE_URL", s("https://api.example.com")),
                constant("USER_ENDPOINT", s("/api/v1/users")),
            ],
        );
        let symbol = ClassSymbol::build(decl, &GlobalBindings::new());
        let url = symbol.binding("USERS_URL").and_then(Binding::url).unwrap();
        assert_eq!(url.to_string(), "https://api.example.com/api/v1/users");
        assert!(symbol.diagnostics().is_empty());
    }

    #[test]
    fn test_non_final_and_uninitialized_fields_are_unresolved() {
        let mut mutable = constant("base", s("/api"));
        mutable.is_final = false;
        let mut injected = constant("baseUrl", s(""));
        injected.initializer = None;
        let symbol = ClassSymbol::build(class("C", vec![mutable, injected]), &GlobalBindings::new());
        assert_eq!(symbol.binding("base"), Some(&Binding::Unresolved));
        assert_eq!(symbol.binding("baseUrl"), Some(&Binding::Unresolved));
    }

    #[test]
    fn test_cycle_is_reported_once_and_unresolved() {
        let decl = class(
            "Loop",
            vec![
                constant("A", Expr::Concat(vec![Expr::name("B"), s("/a")])),
                constant("B", Expr::Concat(vec![Expr::name("A"), s("/b")])),
                constant("C", Expr::Concat(vec![s("/c/"), Expr::name("A")])),
            ],
        );
        let symbol = ClassSymbol::build(decl, &GlobalBindings::new());

        assert_eq!(symbol.diagnostics().len(), 1);
        match &symbol.diagnostics()[0] {
            Diagnostic::CyclicConstantBinding {
                owner_class, chain, ..
            } => {
                assert_eq!(owner_class, "com.example.Loop");
                assert_eq!(chain, &vec!["A".to_string(), "B".to_string(), "A".to_string()]);
            }
            other => panic!("unexpected diagnostic {other:?}"),
        }
        assert_eq!(symbol.binding("A"), Some(&Binding::Unresolved));
        assert_eq!(symbol.binding("B"), Some(&Binding::Unresolved));
        // C depends on the loop but is not part of it
        let c = symbol.binding("C").and_then(Binding::url).unwrap();
        assert_eq!(c.path_template(), "/c/{*}");
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let decl = class(
            "Selfish",
            vec![constant("X", Expr::Concat(vec![Expr::name("X"), s("/x")]))],
        );
        let symbol = ClassSymbol::build(decl, &GlobalBindings::new());
        assert_eq!(symbol.diagnostics().len(), 1);
        assert_eq!(symbol.binding("X"), Some(&Binding::Unresolved));
    }

    #[test]
    fn test_qualified_references() {
        let mut globals = GlobalBindings::new();
        globals.insert("ApiPaths", "V1", StrValue::text("/api/v1"));

        let decl = class(
            "OrderClient",
            vec![
                constant("ORDERS", s("/orders")),
                constant(
                    "URL",
                    Expr::Concat(vec![
                        Expr::Qualified {
                            qualifier: "ApiPaths".to_string(),
                            name: "V1".to_string(),
                        },
                        Expr::Qualified {
                            qualifier: "this".to_string(),
                            name: "ORDERS".to_string(),
                        },
                        s("/"),
                        Expr::Qualified {
                            qualifier: "Missing".to_string(),
                            name: "X".to_string(),
                        },
                    ]),
                ),
            ],
        );
        let symbol = ClassSymbol::build(decl, &globals);
        let url = symbol.binding("URL").and_then(Binding::url).unwrap();
        assert_eq!(url.to_string(), "/api/v1/orders/{*}");
    }

    #[test]
    fn test_globals_export_only_literal_constants() {
        let decl = class(
            "Paths",
            vec![
                constant("ROOT", s("/api")),
                constant("DYNAMIC", Expr::Concat(vec![s("/x/"), Expr::name("unknown")])),
            ],
        );
        let symbol = ClassSymbol::build(decl, &GlobalBindings::new());
        let globals = GlobalBindings::from_symbols([&symbol]);
        assert_eq!(globals.get("Paths", "ROOT"), Some(&StrValue::text("/api")));
        assert_eq!(
            globals.get("com.example.Paths", "ROOT"),
            Some(&StrValue::text("/api"))
        );
        assert_eq!(globals.get("Paths", "DYNAMIC"), None);
    }
}

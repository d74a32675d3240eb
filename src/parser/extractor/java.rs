//! Java lowering: type declarations into the engine's input model.
//!
//! Only what the engine reads survives: class and mapping annotations,
//! field initializers, parameters, and the string-building / invocation
//! statements of method bodies. Logging statements are dropped here so
//! they can never leak literals or calls into the analysis.

use std::collections::BTreeSet;
use std::path::Path;

use tree_sitter::Node;

use super::helpers::{field_text, location, named_children, node_text, string_literal_value};
use crate::model::{
    ClassDecl, Expr, FieldDecl, HttpMethod, Invocation, MappingMarker, MarkerKind, MethodDecl,
    Param, Stmt,
};

/// Receivers whose level calls are logging.
pub(super) const LOG_RECEIVERS: &[&str] = &["LOGGER", "logger", "log", "LOG"];
pub(super) const LOG_LEVELS: &[&str] = &["info", "debug", "warn", "error", "trace", "fatal"];
const CONSOLE_STREAMS: &[&str] = &["System.out", "System.err"];

/// Declarations lowered into a `ClassDecl`.
const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

/// Statement kinds whose nested statements are flattened into the method.
const NESTING_STATEMENTS: &[&str] = &[
    "block",
    "if_statement",
    "for_statement",
    "enhanced_for_statement",
    "while_statement",
    "do_statement",
    "try_statement",
    "try_with_resources_statement",
    "catch_clause",
    "finally_clause",
    "synchronized_statement",
    "labeled_statement",
];

pub struct JavaLowering<'a> {
    path: &'a Path,
    source: &'a [u8],
    package: Option<String>,
    classes: Vec<ClassDecl>,
}

impl<'a> JavaLowering<'a> {
    pub fn new(path: &'a Path, source: &'a [u8]) -> Self {
        Self {
            path,
            source,
            package: None,
            classes: Vec::new(),
        }
    }

    /// Lower every type in the compilation unit, nested ones included.
    pub fn lower(mut self, root: &Node) -> Vec<ClassDecl> {
        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => {
                    self.package = named_children(&child)
                        .into_iter()
                        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
                        .map(|n| node_text(&n, self.source));
                }
                kind if TYPE_DECLARATIONS.contains(&kind) => self.lower_class(&child),
                _ => {}
            }
        }
        self.classes
    }

    fn text(&self, node: &Node) -> String {
        node_text(node, self.source)
    }

    fn lower_class(&mut self, node: &Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };

        let mut markers = BTreeSet::new();
        let mut request_mapping = None;
        for annotation in self.annotations(node) {
            let name = self.annotation_name(&annotation);
            if request_mapping.is_none() {
                request_mapping = self.mapping(&annotation, &name);
            }
            markers.insert(MarkerKind::from_annotation(&name));
        }

        // interface fields are implicitly static final
        let implicit_final = node.kind() == "interface_declaration";
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.lower_members(&body, implicit_final, &mut fields, &mut methods);
        }

        self.classes.push(ClassDecl {
            name: self.text(&name_node),
            package: self.package.clone(),
            markers,
            request_mapping,
            fields,
            methods,
            location: location(self.path, &name_node),
        });
    }

    /// Members of a class, interface, enum or record body.
    fn lower_members(
        &mut self,
        body: &Node,
        implicit_final: bool,
        fields: &mut Vec<FieldDecl>,
        methods: &mut Vec<MethodDecl>,
    ) {
        for member in named_children(body) {
            match member.kind() {
                "field_declaration" | "constant_declaration" => {
                    fields.extend(self.lower_field(&member, implicit_final))
                }
                "method_declaration" => methods.extend(self.lower_method(&member)),
                "enum_body_declarations" => {
                    self.lower_members(&member, implicit_final, fields, methods)
                }
                kind if TYPE_DECLARATIONS.contains(&kind) => self.lower_class(&member),
                _ => {}
            }
        }
    }

    /// Annotations attached to a declaration through its modifiers.
    fn annotations<'t>(&self, decl: &Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = decl.walk();
        let modifiers = decl
            .children(&mut cursor)
            .find(|c| c.kind() == "modifiers");
        match modifiers {
            Some(modifiers) => named_children(&modifiers)
                .into_iter()
                .filter(|c| matches!(c.kind(), "annotation" | "marker_annotation"))
                .collect(),
            None => Vec::new(),
        }
    }

    fn annotation_name(&self, annotation: &Node) -> String {
        let name = field_text(annotation, "name", self.source).unwrap_or_default();
        match name.rsplit_once('.') {
            Some((_, simple)) => simple.to_string(),
            None => name,
        }
    }

    fn has_modifier(&self, decl: &Node, keyword: &str) -> bool {
        let mut cursor = decl.walk();
        let modifiers = decl
            .children(&mut cursor)
            .find(|c| c.kind() == "modifiers");
        match modifiers {
            Some(modifiers) => {
                let mut inner = modifiers.walk();
                let found = modifiers.children(&mut inner).any(|c| c.kind() == keyword);
                found
            }
            None => false,
        }
    }

    /// A route mapping annotation, if `name` is one.
    fn mapping(&self, annotation: &Node, name: &str) -> Option<MappingMarker> {
        let mut verbs = match name {
            "RequestMapping" => Vec::new(),
            "GetMapping" => vec![HttpMethod::Get],
            "PostMapping" => vec![HttpMethod::Post],
            "PutMapping" => vec![HttpMethod::Put],
            "DeleteMapping" => vec![HttpMethod::Delete],
            "PatchMapping" => vec![HttpMethod::Patch],
            _ => return None,
        };

        let mut paths = Vec::new();
        if let Some(arguments) = annotation.child_by_field_name("arguments") {
            for argument in named_children(&arguments) {
                if argument.kind() != "element_value_pair" {
                    paths.extend(self.element_values(&argument));
                    continue;
                }
                let key = field_text(&argument, "key", self.source).unwrap_or_default();
                let Some(value) = argument.child_by_field_name("value") else {
                    continue;
                };
                match key.as_str() {
                    "value" | "path" => paths.extend(self.element_values(&value)),
                    "method" if verbs.is_empty() => {
                        for verb in self
                            .element_values(&value)
                            .iter()
                            .filter_map(|v| self.request_method(v))
                        {
                            if !verbs.contains(&verb) {
                                verbs.push(verb);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        Some(MappingMarker {
            verbs,
            paths,
            location: location(self.path, annotation),
        })
    }

    /// `RequestMethod.GET` -> GET.
    fn request_method(&self, expr: &Expr) -> Option<HttpMethod> {
        match expr {
            Expr::Qualified { name, .. } | Expr::Name(name) => name.parse().ok(),
            _ => None,
        }
    }

    /// Element values, flattening `{a, b}` arrays.
    fn element_values(&self, node: &Node) -> Vec<Expr> {
        if node.kind() == "element_value_array_initializer" {
            named_children(node)
                .iter()
                .flat_map(|n| self.element_values(n))
                .collect()
        } else {
            vec![self.lower_expr(node)]
        }
    }

    fn lower_field(&self, node: &Node, implicit_final: bool) -> Vec<FieldDecl> {
        let type_name = field_text(node, "type", self.source);
        let is_final = implicit_final || self.has_modifier(node, "final");
        let mut cursor = node.walk();
        let declarators: Vec<Node> = node.children_by_field_name("declarator", &mut cursor).collect();
        declarators
            .iter()
            .filter_map(|declarator| {
                let name = field_text(declarator, "name", self.source)?;
                Some(FieldDecl {
                    name,
                    type_name: type_name.clone(),
                    is_final,
                    initializer: declarator
                        .child_by_field_name("value")
                        .map(|v| self.lower_expr(&v)),
                    location: location(self.path, declarator),
                })
            })
            .collect()
    }

    fn lower_method(&self, node: &Node) -> Option<MethodDecl> {
        let name_node = node.child_by_field_name("name")?;

        let mappings = self
            .annotations(node)
            .iter()
            .filter_map(|a| self.mapping(a, &self.annotation_name(a)))
            .collect();

        let params = node
            .child_by_field_name("parameters")
            .map(|list| {
                named_children(&list)
                    .iter()
                    .filter(|p| matches!(p.kind(), "formal_parameter" | "spread_parameter"))
                    .filter_map(|p| self.lower_param(p))
                    .collect()
            })
            .unwrap_or_default();

        let mut body = Vec::new();
        if let Some(block) = node.child_by_field_name("body") {
            self.lower_statement(&block, &mut body);
        }

        Some(MethodDecl {
            name: self.text(&name_node),
            params,
            mappings,
            body,
            location: location(self.path, &name_node),
        })
    }

    fn lower_param(&self, node: &Node) -> Option<Param> {
        if node.kind() == "spread_parameter" {
            // String... parts: a variable_declarator child carries the name
            let declarator = named_children(node)
                .into_iter()
                .find(|c| c.kind() == "variable_declarator")?;
            return Some(Param {
                name: field_text(&declarator, "name", self.source)?,
                type_name: None,
            });
        }
        Some(Param {
            name: field_text(node, "name", self.source)?,
            type_name: field_text(node, "type", self.source),
        })
    }

    /// Lower a statement, flattening nested blocks into `out`.
    fn lower_statement(&self, node: &Node, out: &mut Vec<Stmt>) {
        match node.kind() {
            "local_variable_declaration" => {
                let type_name = field_text(node, "type", self.source);
                let mut cursor = node.walk();
                let declarators: Vec<Node> =
                    node.children_by_field_name("declarator", &mut cursor).collect();
                for declarator in declarators {
                    if let Some(name) = field_text(&declarator, "name", self.source) {
                        out.push(Stmt::Local {
                            name,
                            type_name: type_name.clone(),
                            init: declarator
                                .child_by_field_name("value")
                                .map(|v| self.lower_expr(&v)),
                        });
                    }
                }
            }
            "expression_statement" => {
                if let Some(expr) = named_children(node).first() {
                    if self.is_logging_call(expr) {
                        return;
                    }
                    out.push(self.lower_expression_statement(expr));
                }
            }
            "return_statement" => {
                if let Some(expr) = named_children(node).first() {
                    out.push(Stmt::Return(self.lower_expr(expr)));
                }
            }
            kind if NESTING_STATEMENTS.contains(&kind) => {
                for child in named_children(node) {
                    let child_kind = child.kind();
                    if child_kind.ends_with("statement")
                        || child_kind.ends_with("_declaration")
                        || NESTING_STATEMENTS.contains(&child_kind)
                    {
                        self.lower_statement(&child, out);
                    }
                }
            }
            _ => {}
        }
    }

    fn lower_expression_statement(&self, expr: &Node) -> Stmt {
        if expr.kind() == "assignment_expression" {
            let left = expr.child_by_field_name("left");
            let right = expr.child_by_field_name("right");
            let operator = field_text(expr, "operator", self.source).unwrap_or_default();
            if let (Some(left), Some(right)) = (left, right) {
                if left.kind() == "identifier" {
                    let name = self.text(&left);
                    let value = self.lower_expr(&right);
                    let value = match operator.as_str() {
                        "=" => value,
                        "+=" => Expr::Concat(vec![Expr::Name(name.clone()), value]),
                        _ => Expr::Other,
                    };
                    return Stmt::Assign { name, value };
                }
                return Stmt::Expr(self.lower_expr(&right));
            }
        }
        Stmt::Expr(self.lower_expr(expr))
    }

    /// `log.info(...)`, `LOGGER.debug(...)`, `System.out.println(...)`.
    fn is_logging_call(&self, node: &Node) -> bool {
        if node.kind() != "method_invocation" {
            return false;
        }
        let Some(object) = node.child_by_field_name("object") else {
            return false;
        };
        let receiver = self.text(&object);
        match object.kind() {
            "identifier" => {
                let method = field_text(node, "name", self.source).unwrap_or_default();
                LOG_RECEIVERS.contains(&receiver.as_str()) && LOG_LEVELS.contains(&method.as_str())
            }
            "field_access" => CONSOLE_STREAMS.contains(&receiver.as_str()),
            _ => false,
        }
    }

    fn lower_expr(&self, node: &Node) -> Expr {
        match node.kind() {
            "string_literal" => Expr::Str {
                value: string_literal_value(node, self.source),
                location: location(self.path, node),
            },
            "identifier" => Expr::Name(self.text(node)),
            "field_access" => {
                let object = node.child_by_field_name("object");
                let field = field_text(node, "field", self.source);
                match (object, field) {
                    (Some(object), Some(name))
                        if matches!(object.kind(), "identifier" | "this" | "field_access") =>
                    {
                        Expr::Qualified {
                            qualifier: self.text(&object),
                            name,
                        }
                    }
                    _ => Expr::Other,
                }
            }
            "binary_expression" => {
                let operator = field_text(node, "operator", self.source).unwrap_or_default();
                let left = node.child_by_field_name("left");
                let right = node.child_by_field_name("right");
                match (operator.as_str(), left, right) {
                    ("+", Some(left), Some(right)) => {
                        let mut parts = Vec::new();
                        for side in [left, right] {
                            match self.lower_expr(&side) {
                                Expr::Concat(inner) => parts.extend(inner),
                                other => parts.push(other),
                            }
                        }
                        Expr::Concat(parts)
                    }
                    _ => Expr::Other,
                }
            }
            "parenthesized_expression" => named_children(node)
                .first()
                .map(|inner| self.lower_expr(inner))
                .unwrap_or(Expr::Other),
            "method_invocation" => self.lower_invocation(node).unwrap_or(Expr::Other),
            "class_literal" => Expr::ClassLiteral(
                named_children(node)
                    .first()
                    .map(|t| self.text(t))
                    .unwrap_or_default(),
            ),
            _ => Expr::Other,
        }
    }

    fn lower_invocation(&self, node: &Node) -> Option<Expr> {
        let name_node = node.child_by_field_name("name")?;
        let receiver = node
            .child_by_field_name("object")
            .map(|object| Box::new(self.lower_expr(&object)));
        let args = node
            .child_by_field_name("arguments")
            .map(|list| named_children(&list).iter().map(|a| self.lower_expr(a)).collect())
            .unwrap_or_default();
        Some(Expr::Call(Invocation {
            receiver,
            method: self.text(&name_node),
            args,
            location: location(self.path, &name_node),
        }))
    }
}

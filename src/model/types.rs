//
//  types.rs
//  routecheck
//
//  Declarations handed to the engine by a parser. One `ClassDecl` per
//  class, already stripped of everything except markers, constants,
//  mappings and string-building / HTTP-invocation statements.
//

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use super::url::HttpMethod;

/// Where something was written in the scanned source.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// A marker attached to a class (a Spring stereotype annotation and friends).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    RestController,
    Controller,
    Component,
    Service,
    Repository,
    Configuration,
    Other(String),
}

impl MarkerKind {
    /// Map an annotation name (simple or qualified) to a marker.
    pub fn from_annotation(name: &str) -> Self {
        let simple = name.rsplit('.').next().unwrap_or(name);
        match simple {
            "RestController" => Self::RestController,
            "Controller" => Self::Controller,
            "Component" => Self::Component,
            "Service" => Self::Service,
            "Repository" => Self::Repository,
            "Configuration" => Self::Configuration,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A route mapping marker (`@GetMapping("/x")`, `@RequestMapping(...)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingMarker {
    /// Verbs served, in declaration order; empty when the marker names
    /// none (plain `@RequestMapping`).
    pub verbs: Vec<HttpMethod>,
    /// Path expressions; empty means the default (empty) path.
    pub paths: Vec<Expr>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub type_name: Option<String>,
    pub is_final: bool,
    pub initializer: Option<Expr>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub mappings: Vec<MappingMarker>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub package: Option<String>,
    pub markers: BTreeSet<MarkerKind>,
    /// Class-level base path marker, if any.
    pub request_mapping: Option<MappingMarker>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub location: SourceLocation,
}

impl ClassDecl {
    /// `package.Name`, or just `Name` for the default package.
    pub fn qualified_name(&self) -> String {
        match &self.package {
            Some(pkg) if !pkg.is_empty() => format!("{pkg}.{}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// A linear statement. Nested blocks are flattened upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Local {
        name: String,
        type_name: Option<String>,
        init: Option<Expr>,
    },
    Assign {
        name: String,
        value: Expr,
    },
    Expr(Expr),
    Return(Expr),
}

impl Stmt {
    /// The expression carried by this statement, if any.
    pub fn expr(&self) -> Option<&Expr> {
        match self {
            Stmt::Local { init, .. } => init.as_ref(),
            Stmt::Assign { value, .. } => Some(value),
            Stmt::Expr(e) | Stmt::Return(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub receiver: Option<Box<Expr>>,
    pub method: String,
    pub args: Vec<Expr>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Str {
        value: String,
        location: SourceLocation,
    },
    Name(String),
    Qualified {
        qualifier: String,
        name: String,
    },
    Concat(Vec<Expr>),
    Call(Invocation),
    ClassLiteral(String),
    Other,
}

impl Expr {
    pub fn str(value: impl Into<String>, location: SourceLocation) -> Self {
        Expr::Str {
            value: value.into(),
            location,
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    /// Visit every expression node, outermost first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Concat(parts) => {
                for part in parts {
                    part.walk(visit);
                }
            }
            Expr::Call(call) => {
                if let Some(receiver) = &call.receiver {
                    receiver.walk(visit);
                }
                for arg in &call.args {
                    arg.walk(visit);
                }
            }
            _ => {}
        }
    }

    /// Every string literal in this expression, in source order.
    pub fn literals(&self) -> Vec<(&str, &SourceLocation)> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Str { value, location } = e {
                out.push((value.as_str(), location));
            }
        });
        out
    }
}

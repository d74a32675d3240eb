//
//  error.rs
//  routecheck
//
//  Errors from the layers around the engine (parsing, scanning, config,
//  runtime usage input).
//  The engine itself never fails; unresolvable input degrades to wildcards.
//

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RouteCheckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(PathBuf),

    #[error("Failed to initialize parser for {0}: {1}")]
    ParserInitError(PathBuf, String),

    #[error("Tree-sitter failed to parse {0}")]
    TreeSitterParseFailed(PathBuf),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Invalid runtime usage data: {0}")]
    RuntimeUsage(String),
}

pub type Result<T> = std::result::Result<T, RouteCheckError>;

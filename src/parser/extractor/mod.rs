//
//  mod.rs
//  routecheck
//

mod helpers;
mod java;
mod logs;

use std::path::Path;

use tree_sitter::{Parser, Tree};

use super::language::SupportedLanguage;
use crate::error::RouteCheckError;
use crate::model::{ClassDecl, HandlerLog};

pub use logs::constant_parts;

fn parse(path: &Path, source: &str) -> crate::error::Result<(SupportedLanguage, Tree)> {
    let lang = SupportedLanguage::from_path(path)
        .ok_or_else(|| RouteCheckError::UnsupportedLanguage(path.to_path_buf()))?;

    let mut parser = Parser::new();
    let ts_lang = lang.tree_sitter_language();
    parser
        .set_language(&ts_lang)
        .map_err(|e| RouteCheckError::ParserInitError(path.to_path_buf(), e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| RouteCheckError::TreeSitterParseFailed(path.to_path_buf()))?;
    Ok((lang, tree))
}

/// Parse one source file and lower its classes into the engine's model.
pub fn extract_file(path: &Path, source: &str) -> crate::error::Result<Vec<ClassDecl>> {
    let (lang, tree) = parse(path, source)?;
    let classes = match lang {
        SupportedLanguage::Java => {
            java::JavaLowering::new(path, source.as_bytes()).lower(&tree.root_node())
        }
    };
    Ok(classes)
}

/// First log template of every method in one source file.
pub fn extract_handler_logs(path: &Path, source: &str) -> crate::error::Result<Vec<HandlerLog>> {
    let (lang, tree) = parse(path, source)?;
    let logs = match lang {
        SupportedLanguage::Java => logs::collect(path, source.as_bytes(), &tree.root_node()),
    };
    Ok(logs)
}

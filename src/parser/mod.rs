//! Java front-end.
//!
//! Turns source files into the [`ClassDecl`](crate::model::ClassDecl)
//! stream the analysis consumes. tree-sitter does the parsing; lowering
//! keeps only annotations, constants and string-building / invocation
//! statements. Handler log templates come from a separate pass
//! ([`extract_handler_logs`]).

pub mod extractor;
pub mod language;
pub mod scan;

pub use extractor::{constant_parts, extract_file, extract_handler_logs};
pub use language::SupportedLanguage;
pub use scan::{discover_files, scan_roots};

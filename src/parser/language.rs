//
//  language.rs
//  routecheck
//

use std::path::Path;

/// Source languages the front-end can lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedLanguage {
    Java,
}

impl SupportedLanguage {
    /// Detect the language from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "java" => Some(Self::Java),
            _ => None,
        }
    }

    pub fn tree_sitter_language(&self) -> tree_sitter::Language {
        match self {
            Self::Java => tree_sitter_java::LANGUAGE.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Java => "java",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(
            SupportedLanguage::from_path(Path::new("src/main/java/UserClient.java")),
            Some(SupportedLanguage::Java)
        );
        assert_eq!(SupportedLanguage::from_path(Path::new("build.gradle")), None);
        assert_eq!(SupportedLanguage::from_path(Path::new("Makefile")), None);
    }
}

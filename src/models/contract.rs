use std::path::Path;

use serde::{Deserialize, Serialize};

/// A contract submitted for analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInput {
    /// File name, used in locations and for temp project layout
    pub filename: String,

    /// Source text
    pub code: String,

    /// Target platform id
    pub platform: String,

    /// Source language, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Additional sources the contract imports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ContractInput>,
}

impl ContractInput {
    /// Create a contract without language or dependencies
    pub fn new(
        filename: impl Into<String>,
        code: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            code: code.into(),
            platform: platform.into(),
            language: None,
            dependencies: Vec::new(),
        }
    }

    /// Set the language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Add a dependency
    pub fn with_dependency(mut self, dependency: ContractInput) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// File name without directories or extension
    pub fn stem(&self) -> String {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("contract")
            .to_string()
    }

    /// Lowercased file extension, if any
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Number of source lines
    pub fn line_count(&self) -> usize {
        self.code.lines().count()
    }
}

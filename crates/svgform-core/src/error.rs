use serde::{Serialize, Serializer};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors reported by [`crate::scan`]. Scans never fail as a whole; these are accumulated into
/// [`crate::ScanResult::errors`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("Document text is empty")]
    EmptyDocument,

    #[error("Failed to parse document: {message}")]
    MalformedDocument { message: String },

    #[error("Document has no root element")]
    MissingRoot,

    #[error("Embedded diagram attribute `{attribute}` is missing or empty on the root element")]
    MissingEmbeddedDocument { attribute: String },

    #[error("Failed to parse embedded diagram: {message}")]
    MalformedEmbeddedDocument { message: String },

    #[error("Embedded diagram root is <{found}>, expected <mxfile> or <mxGraphModel>")]
    UnexpectedEmbeddedRoot { found: String },

    #[error("Failed to decode compressed diagram page {page}: {message}")]
    CompressedPage { page: usize, message: String },

    #[error("No fields matched the configured rules")]
    NoFieldsMatched,
}

impl ScanError {
    /// `true` for failures that abort the pass; `false` for the informational no-match case.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::NoFieldsMatched)
    }
}

impl Serialize for ScanError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

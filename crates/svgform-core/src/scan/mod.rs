//! Dialect detection and attribute scanning.
//!
//! Two dialects are understood:
//! - [`Dialect::Direct`]: candidates are attribute values of the exported document itself.
//! - [`Dialect::Embedded`]: the root element carries an entity-encoded secondary document (the
//!   producer's native graph description, e.g. draw.io's `mxfile`) whose elements are scanned
//!   instead. The secondary document is metadata only; geometry is always looked up in the
//!   rendered primary document.

mod direct;
mod embedded;

use crate::config::DocumentConventions;
use crate::error::ScanError;
use crate::mapping::FieldMapping;
use crate::rules::MatchRule;
use crate::xml;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Direct,
    Embedded,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Embedded => "embedded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "direct" => Some(Self::Direct),
            "embedded" => Some(Self::Embedded),
            _ => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Skips detection when set.
    pub dialect: Option<Dialect>,
    pub conventions: DocumentConventions,
}

impl ScanOptions {
    pub fn forced(dialect: Dialect) -> Self {
        Self {
            dialect: Some(dialect),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanMetadata {
    pub dialect: Dialect,
    /// Distinct attributes that were scanned, in first-use order.
    pub attributes_used: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub mappings: Vec<FieldMapping>,
    pub errors: Vec<ScanError>,
    pub metadata: ScanMetadata,
}

impl ScanResult {
    fn failed(metadata: ScanMetadata, error: ScanError) -> Self {
        Self {
            mappings: Vec::new(),
            errors: vec![error],
            metadata,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_structural_error(&self) -> bool {
        self.errors.iter().any(ScanError::is_structural)
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Rules sharing one target attribute, with their original declaration indices.
pub(crate) struct AttributeGroup<'r> {
    pub(crate) attribute: &'r str,
    pub(crate) rules: Vec<(usize, &'r MatchRule)>,
}

/// Groups rules by target attribute so each attribute is scanned once. Group order is the order
/// in which attributes first appear; rule order inside a group is declaration order.
pub(crate) fn group_by_attribute<'r>(
    rules: &'r [MatchRule],
    default_attribute: &'r str,
) -> Vec<AttributeGroup<'r>> {
    let mut groups: Vec<AttributeGroup<'r>> = Vec::new();
    for (index, rule) in rules.iter().enumerate() {
        let attribute = rule.target_attribute(default_attribute);
        match groups.iter_mut().find(|g| g.attribute == attribute) {
            Some(group) => group.rules.push((index, rule)),
            None => groups.push(AttributeGroup {
                attribute,
                rules: vec![(index, rule)],
            }),
        }
    }
    groups
}

fn metadata_for(
    dialect: Dialect,
    rules: &[MatchRule],
    conventions: &DocumentConventions,
) -> ScanMetadata {
    let default_attribute = conventions.default_match_attribute(dialect);
    ScanMetadata {
        dialect,
        attributes_used: group_by_attribute(rules, default_attribute)
            .into_iter()
            .map(|g| g.attribute.to_string())
            .collect(),
    }
}

/// Detects the dialect of an already-parsed document: embedded when the root carries a
/// non-blank embedded-document attribute.
pub fn detect_dialect(root: roxmltree::Node<'_, '_>, conventions: &DocumentConventions) -> Dialect {
    let embedded = xml::attribute(root, &conventions.embedded_document_attribute)
        .is_some_and(|v| !v.trim().is_empty());
    if embedded {
        Dialect::Embedded
    } else {
        Dialect::Direct
    }
}

/// Scans `document` for fields.
///
/// Never panics and never returns partial mappings from a half-parsed document: any structural
/// failure yields zero mappings plus a descriptive error. Metadata is always filled in.
pub fn scan(document: &str, rules: &[MatchRule], options: &ScanOptions) -> ScanResult {
    let conventions = &options.conventions;
    let fallback_dialect = options.dialect.unwrap_or(Dialect::Direct);

    if document.trim().is_empty() {
        return ScanResult::failed(
            metadata_for(fallback_dialect, rules, conventions),
            ScanError::EmptyDocument,
        );
    }

    let doc = match xml::parse(document) {
        Ok(doc) => doc,
        Err(roxmltree::Error::NoRootNode) => {
            return ScanResult::failed(
                metadata_for(fallback_dialect, rules, conventions),
                ScanError::MissingRoot,
            );
        }
        Err(err) => {
            return ScanResult::failed(
                metadata_for(fallback_dialect, rules, conventions),
                ScanError::MalformedDocument {
                    message: err.to_string(),
                },
            );
        }
    };

    let dialect = options
        .dialect
        .unwrap_or_else(|| detect_dialect(doc.root_element(), conventions));
    let metadata = metadata_for(dialect, rules, conventions);
    let groups = group_by_attribute(rules, conventions.default_match_attribute(dialect));

    let scanned = match dialect {
        Dialect::Direct => Ok(direct::scan_direct(&doc, &groups, conventions)),
        Dialect::Embedded => embedded::scan_embedded(&doc, &groups, conventions),
    };

    let mappings = match scanned {
        Ok(mappings) => mappings,
        Err(err) => {
            tracing::debug!(%dialect, error = %err, "scan failed");
            return ScanResult::failed(metadata, err);
        }
    };

    tracing::debug!(
        %dialect,
        rules = rules.len(),
        mappings = mappings.len(),
        "scan finished"
    );

    if mappings.is_empty() {
        return ScanResult::failed(metadata, ScanError::NoFieldsMatched);
    }

    ScanResult {
        mappings,
        errors: Vec::new(),
        metadata,
    }
}

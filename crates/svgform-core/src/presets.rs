//! Producer-specific conveniences.
//!
//! Tools that are known never to embed a secondary document get the direct dialect forced, which
//! skips detection entirely.

use crate::config::DocumentConventions;
use crate::rules::{FieldType, MatchRule, RuleSpec};
use crate::scan::{Dialect, ScanOptions, ScanResult, scan};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_INPUT_PREFIX: &str = "input-";
pub const DEFAULT_OUTPUT_PREFIX: &str = "output-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Producer {
    #[serde(alias = "draw.io", alias = "diagrams.net")]
    DrawIo,
    Figma,
    Inkscape,
    Illustrator,
}

impl Producer {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DrawIo => "drawio",
            Self::Figma => "figma",
            Self::Inkscape => "inkscape",
            Self::Illustrator => "illustrator",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "drawio" | "draw.io" | "diagrams.net" => Some(Self::DrawIo),
            "figma" => Some(Self::Figma),
            "inkscape" => Some(Self::Inkscape),
            "illustrator" => Some(Self::Illustrator),
            _ => None,
        }
    }

    /// `None` means "detect": draw.io exports may or may not embed their graph description.
    pub fn forced_dialect(self) -> Option<Dialect> {
        match self {
            Self::DrawIo => None,
            Self::Figma | Self::Inkscape | Self::Illustrator => Some(Dialect::Direct),
        }
    }

    pub fn scan_options(self, conventions: DocumentConventions) -> ScanOptions {
        ScanOptions {
            dialect: self.forced_dialect(),
            conventions,
        }
    }
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn scan_for(
    producer: Producer,
    document: &str,
    rules: &[MatchRule],
    conventions: &DocumentConventions,
) -> ScanResult {
    scan(document, rules, &producer.scan_options(conventions.clone()))
}

/// `input-<name>` → input, `output-<name>` → output.
pub fn default_rules() -> Vec<MatchRule> {
    vec![
        MatchRule::prefix(FieldType::Input, DEFAULT_INPUT_PREFIX),
        MatchRule::prefix(FieldType::Output, DEFAULT_OUTPUT_PREFIX),
    ]
}

/// [`default_rules`] in configuration form.
pub fn default_rule_specs() -> Vec<RuleSpec> {
    vec![
        RuleSpec::prefix(FieldType::Input, DEFAULT_INPUT_PREFIX),
        RuleSpec::prefix(FieldType::Output, DEFAULT_OUTPUT_PREFIX),
    ]
}

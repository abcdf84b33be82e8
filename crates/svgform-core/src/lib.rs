#![forbid(unsafe_code)]

//! Field discovery for vendor-produced SVG diagrams (headless).
//!
//! Diagramming tools name their elements inconsistently. This crate turns an exported document
//! into a list of [`FieldMapping`]s by evaluating an ordered list of [`MatchRule`]s against
//! element attributes:
//! - [`matcher`]: first-rule-wins evaluation of a single candidate string
//! - [`rules`]: the loose wire shape ([`RuleSpec`]), validation and compilation
//! - [`scan`]: dialect detection and attribute scanning (direct attributes, or a draw.io-style
//!   secondary document embedded in an attribute of the root element)
//!
//! Everything here is synchronous and pure; geometry and overlays live in `svgform-overlay`.

pub mod config;
pub mod entities;
pub mod error;
pub mod mapping;
pub mod matcher;
pub mod presets;
pub mod rules;
pub mod scan;
mod xml;

pub use config::{DocumentConventions, FormConfig};
pub use error::{ConfigError, ScanError};
pub use mapping::{FieldIdentity, FieldMapping, identities, same_field_set};
pub use matcher::{FieldMatch, match_candidate};
pub use presets::{Producer, scan_for};
pub use rules::{
    CompiledRules, FieldType, MatchRule, MatchStrategy, RuleProblem, RuleSpec, compile_rules,
    validate_rules,
};
pub use scan::{Dialect, ScanMetadata, ScanOptions, ScanResult, detect_dialect, scan};

#[cfg(test)]
mod tests;

//! Configuration: rule list, optional forced dialect and the attribute-naming conventions of
//! the documents being scanned.

use crate::error::Result;
use crate::rules::{CompiledRules, RuleSpec, compile_rules};
use crate::scan::{Dialect, ScanOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_ID_ATTRIBUTE: &str = "id";
pub const DEFAULT_CELL_ID_ATTRIBUTE: &str = "data-cell-id";
pub const DEFAULT_EMBEDDED_DOCUMENT_ATTRIBUTE: &str = "content";
pub const DEFAULT_EMBEDDED_ID_ATTRIBUTE: &str = "external-id";

/// Attribute names used by producers to identify elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentConventions {
    /// Primary identifier attribute of rendered elements (and the default match attribute for
    /// the direct dialect).
    pub id_attribute: String,
    /// Tool-generated reference attribute on rendered elements (draw.io `data-cell-id`).
    pub cell_id_attribute: String,
    /// Root attribute holding the embedded secondary document.
    pub embedded_document_attribute: String,
    /// Default match attribute inside the embedded document.
    pub embedded_id_attribute: String,
}

impl Default for DocumentConventions {
    fn default() -> Self {
        Self {
            id_attribute: DEFAULT_ID_ATTRIBUTE.to_string(),
            cell_id_attribute: DEFAULT_CELL_ID_ATTRIBUTE.to_string(),
            embedded_document_attribute: DEFAULT_EMBEDDED_DOCUMENT_ATTRIBUTE.to_string(),
            embedded_id_attribute: DEFAULT_EMBEDDED_ID_ATTRIBUTE.to_string(),
        }
    }
}

impl DocumentConventions {
    /// Attribute scanned by rules without an explicit `attribute`, per dialect.
    pub fn default_match_attribute(&self, dialect: Dialect) -> &str {
        match dialect {
            Dialect::Direct => &self.id_attribute,
            Dialect::Embedded => &self.embedded_id_attribute,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormConfig {
    pub rules: Vec<RuleSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,
    pub conventions: DocumentConventions,
}

impl FormConfig {
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Deep-merges `overrides` onto `base` (objects merged per key, everything else replaced)
    /// and deserializes the result.
    pub fn layered(base: &Value, overrides: &Value) -> Result<Self> {
        let mut merged = base.clone();
        deep_merge_value(&mut merged, overrides);
        Self::from_value(merged)
    }

    pub fn compile(&self) -> CompiledRules {
        compile_rules(&self.rules)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            dialect: self.dialect,
            conventions: self.conventions.clone(),
        }
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

use crate::rules::FieldType;
use serde::{Deserialize, Serialize};

/// One matched element. Immutable once produced by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// The raw attribute value that matched.
    pub data_id: String,
    /// The field name extracted by the winning rule.
    pub name: String,
    /// Identifier used to locate the element in the rendered document.
    pub source_element_id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// The attribute whose value was matched.
    pub matched_attribute: String,
}

impl FieldMapping {
    pub fn identity(&self) -> FieldIdentity {
        FieldIdentity {
            name: self.name.clone(),
            data_id: self.data_id.clone(),
            source_element_id: self.source_element_id.clone(),
            field_type: self.field_type,
        }
    }
}

/// Structural identity of a mapping, used to decide whether overlays must be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldIdentity {
    pub name: String,
    pub data_id: String,
    pub source_element_id: String,
    pub field_type: FieldType,
}

pub fn identities(mappings: &[FieldMapping]) -> Vec<FieldIdentity> {
    mappings.iter().map(FieldMapping::identity).collect()
}

/// Ordered comparison of two identity lists (count and order both matter).
pub fn same_field_set(a: &[FieldIdentity], b: &[FieldIdentity]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

use crate::geom::Size;
use crate::resolve::ResolvedField;
use serde::Serialize;
use svgform_core::{Dialect, FieldType};

/// Summary of one resolve pass, for debug surfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub total: usize,
    pub inputs: usize,
    pub outputs: usize,
    /// Fields with non-null geometry.
    pub resolved: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_size: Option<Size>,
    pub errors: Vec<String>,
}

impl Diagnostics {
    pub fn collect(
        fields: &[ResolvedField],
        dialect: Option<Dialect>,
        document_size: Option<Size>,
        errors: Vec<String>,
    ) -> Self {
        let count = |t: FieldType| fields.iter().filter(|f| f.mapping.field_type == t).count();
        Self {
            total: fields.len(),
            inputs: count(FieldType::Input),
            outputs: count(FieldType::Output),
            resolved: fields.iter().filter(|f| f.is_resolved()).count(),
            dialect,
            document_size,
            errors,
        }
    }
}

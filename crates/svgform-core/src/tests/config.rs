use crate::*;
use serde_json::json;

#[test]
fn defaults_apply_to_missing_sections() {
    let cfg = FormConfig::from_json_str(r#"{ "rules": [{ "type": "input", "prefix": "in-" }] }"#)
        .unwrap();
    assert_eq!(cfg.dialect, None);
    assert_eq!(cfg.conventions, DocumentConventions::default());
    assert_eq!(cfg.conventions.cell_id_attribute, "data-cell-id");
    assert!(cfg.compile().is_valid());
}

#[test]
fn yaml_config_is_accepted() {
    let cfg = FormConfig::from_yaml_str(
        "dialect: embedded\nconventions:\n  embeddedIdAttribute: tags\nrules:\n  - type: output\n    ids: [total]\n",
    )
    .unwrap();
    assert_eq!(cfg.dialect, Some(Dialect::Embedded));
    assert_eq!(cfg.conventions.embedded_id_attribute, "tags");
    assert_eq!(cfg.conventions.id_attribute, "id");
    assert_eq!(cfg.scan_options().dialect, Some(Dialect::Embedded));
}

#[test]
fn layered_config_merges_objects_and_replaces_arrays() {
    let base = json!({
        "rules": [{ "type": "input", "prefix": "input-" }],
        "conventions": { "idAttribute": "id", "cellIdAttribute": "data-cell-id" }
    });
    let overrides = json!({
        "rules": [{ "type": "output", "prefix": "result-" }],
        "conventions": { "cellIdAttribute": "data-node" }
    });
    let cfg = FormConfig::layered(&base, &overrides).unwrap();
    assert_eq!(cfg.rules.len(), 1);
    assert_eq!(cfg.rules[0], RuleSpec::prefix(FieldType::Output, "result-"));
    assert_eq!(cfg.conventions.cell_id_attribute, "data-node");
    assert_eq!(cfg.conventions.id_attribute, "id");
}

#[test]
fn malformed_config_reports_json_error() {
    let err = FormConfig::from_json_str("{ rules: ").unwrap_err();
    assert!(err.to_string().starts_with("Invalid configuration JSON"));
}

#[test]
fn badly_shaped_rules_do_not_fail_the_config() {
    let cfg = FormConfig::from_json_str(
        r#"{ "rules": [
            { "type": "input", "prefix": "a-" },
            { "type": "input", "ids": ["a"], "exact": ["b"] },
            "oops"
        ] }"#,
    )
    .unwrap();
    assert_eq!(cfg.rules.len(), 3);

    let compiled = cfg.compile();
    assert_eq!(compiled.rules.len(), 1);
    let indices: Vec<usize> = compiled.problems.iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![1, 2]);

    let res = scan(
        r#"<svg><rect id="a-total"/></svg>"#,
        &compiled.rules,
        &cfg.scan_options(),
    );
    assert_eq!(res.mappings.len(), 1);
    assert_eq!(res.mappings[0].name, "total");
}

#[test]
fn yaml_rules_list_tolerates_scalar_entries() {
    let cfg = FormConfig::from_yaml_str("rules:\n  - oops\n  - type: output\n    exact: [total]\n")
        .unwrap();
    let compiled = cfg.compile();
    assert_eq!(compiled.problems.len(), 1);
    assert_eq!(compiled.problems[0].to_string(), "rules[0]: rule must be an object");
    assert_eq!(compiled.rules[0].strategy.kind(), "ids");
}

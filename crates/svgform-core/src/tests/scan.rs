use crate::*;

const BASIC_SVG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100" viewBox="0 0 200 100">
  <rect id="input-a" x="10" y="10" width="40" height="20"/>
  <rect id="input-b" x="10" y="40" width="40" height="20"/>
  <g id="decor"><rect id="output-sum" x="100" y="10" width="60" height="20"/></g>
</svg>"#;

fn default_scan(doc: &str, rules: &[MatchRule]) -> ScanResult {
    scan(doc, rules, &ScanOptions::default())
}

#[test]
fn prefix_rules_find_inputs_and_outputs() {
    let rules = presets::default_rules();
    let res = default_scan(BASIC_SVG, &rules);
    assert!(res.is_ok(), "{:?}", res.errors);
    assert_eq!(res.metadata.dialect, Dialect::Direct);
    assert_eq!(res.metadata.attributes_used, vec!["id".to_string()]);

    let got: Vec<(&str, FieldType)> = res
        .mappings
        .iter()
        .map(|m| (m.name.as_str(), m.field_type))
        .collect();
    assert_eq!(
        got,
        vec![
            ("a", FieldType::Input),
            ("b", FieldType::Input),
            ("sum", FieldType::Output)
        ]
    );
    assert_eq!(res.mappings[2].data_id, "output-sum");
    assert_eq!(res.mappings[2].source_element_id, "output-sum");
    assert_eq!(res.mappings[2].matched_attribute, "id");
}

#[test]
fn exact_set_yields_single_verbatim_mapping() {
    let doc = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="food-price"/><rect id="other"/></svg>"#;
    let rules = vec![MatchRule::exact(
        FieldType::Input,
        ["food-price", "num-people"],
    )];
    let res = default_scan(doc, &rules);
    assert_eq!(res.mappings.len(), 1);
    assert_eq!(res.mappings[0].name, "food-price");
}

#[test]
fn non_id_attribute_rules_reuse_own_id_or_matched_value() {
    let doc = r#"<svg xmlns="http://www.w3.org/2000/svg">
      <rect id="r1" class="field-qty"/>
      <rect class="field-price"/>
      <rect id="input-x"/>
    </svg>"#;
    let rules = vec![
        MatchRule::prefix(FieldType::Input, "input-"),
        MatchRule::prefix(FieldType::Input, "field-").with_attribute("class"),
    ];
    let res = default_scan(doc, &rules);
    assert_eq!(
        res.metadata.attributes_used,
        vec!["id".to_string(), "class".to_string()]
    );
    let got: Vec<(&str, &str, &str)> = res
        .mappings
        .iter()
        .map(|m| {
            (
                m.name.as_str(),
                m.source_element_id.as_str(),
                m.matched_attribute.as_str(),
            )
        })
        .collect();
    assert_eq!(
        got,
        vec![
            ("x", "input-x", "id"),
            ("qty", "r1", "class"),
            ("price", "field-price", "class"),
        ]
    );
}

#[test]
fn qualified_attributes_resolve_through_namespace_scope() {
    let doc = r#"<svg xmlns="http://www.w3.org/2000/svg"
        xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape">
      <rect id="rect12" inkscape:label="input-age"/>
      <rect id="rect13" label="input-ignored"/>
    </svg>"#;
    let rules = vec![MatchRule::prefix(FieldType::Input, "input-").with_attribute("inkscape:label")];
    let res = default_scan(doc, &rules);
    assert_eq!(res.mappings.len(), 1);
    assert_eq!(res.mappings[0].name, "age");
    assert_eq!(res.mappings[0].source_element_id, "rect12");
}

#[test]
fn duplicate_names_are_kept() {
    let doc = r#"<svg xmlns="http://www.w3.org/2000/svg">
      <rect id="a1" class="output-total"/><rect id="a2" class="output-total"/>
    </svg>"#;
    let rules = vec![MatchRule::prefix(FieldType::Output, "output-").with_attribute("class")];
    let res = default_scan(doc, &rules);
    assert_eq!(res.mappings.len(), 2);
    assert_eq!(res.mappings[0].name, res.mappings[1].name);
    assert_ne!(
        res.mappings[0].source_element_id,
        res.mappings[1].source_element_id
    );
}

#[test]
fn empty_document_is_rejected_immediately() {
    let res = default_scan("   \n", &presets::default_rules());
    assert_eq!(res.errors, vec![ScanError::EmptyDocument]);
    assert!(res.mappings.is_empty());
    assert_eq!(res.metadata.dialect, Dialect::Direct);
    assert_eq!(res.metadata.attributes_used, vec!["id".to_string()]);
}

#[test]
fn malformed_document_yields_no_partial_mappings() {
    let doc = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="input-a"/><g>"#;
    let res = default_scan(doc, &presets::default_rules());
    assert!(res.mappings.is_empty());
    assert_eq!(res.errors.len(), 1);
    assert!(res.has_structural_error());
    assert!(res.error_messages()[0].starts_with("Failed to parse document"));
}

#[test]
fn no_match_is_informational() {
    let doc = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="nothing"/></svg>"#;
    let res = default_scan(doc, &presets::default_rules());
    assert_eq!(res.errors, vec![ScanError::NoFieldsMatched]);
    assert!(!res.has_structural_error());
    assert_eq!(
        res.error_messages(),
        vec!["No fields matched the configured rules".to_string()]
    );
}

#[test]
fn forcing_direct_skips_embedded_detection() {
    let doc = r#"<svg xmlns="http://www.w3.org/2000/svg" content="not a diagram"><rect id="input-a"/></svg>"#;
    let auto = default_scan(doc, &presets::default_rules());
    assert_eq!(auto.metadata.dialect, Dialect::Embedded);
    assert!(auto.has_structural_error());

    let res = scan_for(
        Producer::Figma,
        doc,
        &presets::default_rules(),
        &DocumentConventions::default(),
    );
    assert!(res.is_ok());
    assert_eq!(res.metadata.dialect, Dialect::Direct);
    assert_eq!(res.mappings[0].name, "a");
}

#[test]
fn scan_result_serializes_errors_as_messages() {
    let res = default_scan("", &presets::default_rules());
    let v = serde_json::to_value(&res).unwrap();
    assert_eq!(v["errors"][0], "Document text is empty");
    assert_eq!(v["metadata"]["dialect"], "direct");
    assert_eq!(v["metadata"]["attributesUsed"][0], "id");
}

#[test]
fn document_without_root_element_is_structural() {
    let rules = presets::default_rules();
    for doc in ["<!-- nothing here -->", "<?xml version=\"1.0\"?>"] {
        let res = default_scan(doc, &rules);
        assert_eq!(res.errors, vec![ScanError::MissingRoot], "{doc}");
        assert!(res.mappings.is_empty());
        assert!(res.has_structural_error());
        assert_eq!(res.metadata.dialect, Dialect::Direct);
        assert_eq!(res.metadata.attributes_used, vec!["id".to_string()]);
    }
}

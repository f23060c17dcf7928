// Tests for checking schemas against their draft's metaschema

use json_schema_validation::{Draft, Error, SchemaError, validate};
use serde_json::json;

#[test]
fn test_draft_detection_from_schema_keyword() {
    let cases = [
        ("http://json-schema.org/draft-03/schema#", Some(Draft::Draft3)),
        ("http://json-schema.org/draft-04/schema#", Some(Draft::Draft4)),
        ("http://json-schema.org/draft-06/schema#", Some(Draft::Draft6)),
        ("http://json-schema.org/draft-04/schema", Some(Draft::Draft4)),
        ("http://example.com/custom-meta", None),
    ];
    for (uri, expected) in cases {
        assert_eq!(Draft::from_schema(&json!({"$schema": uri})), expected, "{uri}");
    }
    assert_eq!(Draft::from_schema(&json!(true)), None);
}

#[test]
fn test_invalid_schemas_per_draft() {
    let invalid = [
        json!({"type": 12}),
        json!({"required": "foo", "minLength": -1}),
        json!({"enum": []}),
    ];
    for schema in &invalid {
        for draft in [Draft::Draft4, Draft::Draft6] {
            assert!(
                matches!(draft.check_schema(schema), Err(SchemaError::Invalid { .. })),
                "{} accepted {}",
                draft.name(),
                schema
            );
        }
    }
}

#[test]
fn test_draft_specific_keyword_shapes() {
    // Draft 3 `required` is a boolean on the property schema.
    let draft3 = json!({"properties": {"foo": {"required": true}}});
    Draft::Draft3.check_schema(&draft3).unwrap();
    assert!(Draft::Draft4.check_schema(&draft3).is_err());

    // Draft 6 `exclusiveMinimum` is a number.
    let draft6 = json!({"exclusiveMinimum": 5});
    Draft::Draft6.check_schema(&draft6).unwrap();
    assert!(Draft::Draft4.check_schema(&draft6).is_err());
}

#[test]
fn test_one_shot_validate_uses_declared_draft() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-03/schema#",
        "properties": {"foo": {"type": "integer", "required": true}}
    });
    validate(&json!({"foo": 1}), &schema, None).unwrap();
    assert!(matches!(
        validate(&json!({}), &schema, None),
        Err(Error::Validation(_))
    ));

    // An explicit draft wins over `$schema`: Draft 4 rejects the boolean `required`.
    assert!(matches!(
        validate(&json!({"foo": 1}), &schema, Some(Draft::Draft4)),
        Err(Error::Schema(_))
    ));
}

// Tests for error paths, messages, structured output and best_match

use json_schema_validation::{
    Draft, PathSegment, ValidationError, ValidationErrorKind, Validator, best_match,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn errors(draft: Draft, schema: Value, instance: &Value) -> Vec<ValidationError> {
    Validator::new(draft, schema)
        .iter_errors(instance)
        .map(|item| item.expect("evaluation should succeed"))
        .collect()
}

#[test]
fn test_every_error_is_reported_in_keyword_order() {
    let instance = json!({"bar": "x", "foo": 3});
    let found = errors(
        Draft::Draft6,
        json!({
            "properties": {"bar": {"type": "integer"}, "foo": {"enum": [1, 2]}},
            "required": ["baz"]
        }),
        &instance,
    );

    let summary: Vec<(String, String, String)> = found
        .iter()
        .map(|error| {
            (
                error.instance_path.to_json_pointer(),
                error.schema_path.to_json_pointer(),
                error.message.clone(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (
                "/bar".to_string(),
                "/properties/bar/type".to_string(),
                r#""x" is not of type "integer""#.to_string()
            ),
            (
                "/foo".to_string(),
                "/properties/foo/enum".to_string(),
                "3 is not one of [1,2]".to_string()
            ),
            (
                String::new(),
                "/required".to_string(),
                r#""baz" is a required property"#.to_string()
            ),
        ]
    );
}

#[test]
fn test_error_fields() {
    let instance = json!({"items": [1, {"name": 7}]});
    let found = errors(
        Draft::Draft4,
        json!({
            "properties": {
                "items": {"items": {"properties": {"name": {"type": "string"}}}}
            }
        }),
        &instance,
    );
    assert_eq!(found.len(), 1);
    let error = &found[0];

    assert_eq!(error.kind, ValidationErrorKind::Type { expected: vec![json!("string")] });
    assert_eq!(error.keyword.as_deref(), Some("type"));
    assert_eq!(error.keyword_value, json!("string"));
    assert_eq!(error.instance, json!(7));
    assert_eq!(
        error.instance_path.segments(),
        &[
            PathSegment::Key("items".to_string()),
            PathSegment::Index(1),
            PathSegment::Key("name".to_string()),
        ]
    );
    assert_eq!(
        error.schema_path.to_json_pointer(),
        "/properties/items/items/properties/name/type"
    );
    assert_eq!(error.error_code(), "JS-1-02");
    insta::assert_snapshot!(error.to_string(), @r#"Validation error at items.[1].name: 7 is not of type "string""#);
}

#[test]
fn test_structured_output() {
    let found = errors(Draft::Draft6, json!({"maximum": 3}), &json!(5));
    assert_eq!(found.len(), 1);
    let rendered = serde_json::to_string(&found[0].to_json()).unwrap();
    insta::assert_snapshot!(rendered, @r#"{"code":"JS-1-11","context":[],"instance_path":"","keyword":"maximum","kind":{"data":{"exclusive":false,"limit":3},"type":"Maximum"},"message":"5 is greater than the maximum of 3","schema_path":"/maximum"}"#);
}

#[test]
fn test_context_paths_are_absolute() {
    let instance = json!({"foo": {"bar": 12}});
    let found = errors(
        Draft::Draft6,
        json!({
            "properties": {
                "foo": {"anyOf": [{"type": "string"}, {"properties": {"bar": {"type": "array"}}}]}
            }
        }),
        &instance,
    );
    assert_eq!(found.len(), 1);
    let error = &found[0];
    assert_eq!(error.keyword.as_deref(), Some("anyOf"));
    assert_eq!(error.context.len(), 2);

    let context: Vec<(String, String)> = error
        .context
        .iter()
        .map(|child| {
            (
                child.instance_path.to_json_pointer(),
                child.schema_path.to_json_pointer(),
            )
        })
        .collect();
    assert_eq!(
        context,
        vec![
            ("/foo".to_string(), "/properties/foo/anyOf/0/type".to_string()),
            (
                "/foo/bar".to_string(),
                "/properties/foo/anyOf/1/properties/bar/type".to_string()
            ),
        ]
    );
}

#[test]
fn test_best_match_descends_to_the_deepest_context_error() {
    let instance = json!({"foo": {"bar": 12}});
    let found = errors(
        Draft::Draft6,
        json!({
            "properties": {
                "foo": {"anyOf": [{"type": "string"}, {"properties": {"bar": {"type": "array"}}}]}
            }
        }),
        &instance,
    );
    let best = best_match(found).unwrap();
    assert_eq!(best.message, r#"12 is not of type "array""#);
    assert_eq!(best.instance_path.to_json_pointer(), "/foo/bar");
}

#[test]
fn test_best_match_prefers_strong_keywords() {
    let found = errors(
        Draft::Draft6,
        json!({"minProperties": 2, "anyOf": [{"type": "string"}, {"type": "number"}]}),
        &json!({"a": 1}),
    );
    assert_eq!(found.len(), 2);
    let best = best_match(found).unwrap();
    assert_eq!(best.keyword.as_deref(), Some("minProperties"));
}

#[test]
fn test_one_of_messages() {
    let schema = json!({"oneOf": [{"type": "integer"}, {"minimum": 2}]});

    let none = errors(Draft::Draft6, schema.clone(), &json!(1.5));
    assert_eq!(none[0].kind, ValidationErrorKind::OneOfNotValid);
    assert_eq!(none[0].message, "1.5 is not valid under any of the given schemas");
    assert_eq!(none[0].context.len(), 2);

    let both = errors(Draft::Draft6, schema, &json!(3));
    assert_eq!(
        both[0].kind,
        ValidationErrorKind::OneOfMultipleValid {
            valid: vec![json!({"type": "integer"}), json!({"minimum": 2})]
        }
    );
    assert_eq!(both[0].message, r#"3 is valid under each of {"type":"integer"}, {"minimum":2}"#);
}

#[test]
fn test_additional_properties_messages() {
    let plain = errors(
        Draft::Draft4,
        json!({"properties": {"foo": {}}, "additionalProperties": false}),
        &json!({"foo": 1, "bar": 2, "baz": 3}),
    );
    assert_eq!(
        plain[0].message,
        r#"Additional properties are not allowed ("bar", "baz" were unexpected)"#
    );

    let patterned = errors(
        Draft::Draft4,
        json!({"patternProperties": {"^b": {}, "^a": {}}, "additionalProperties": false}),
        &json!({"zebra": 1}),
    );
    assert_eq!(
        patterned[0].message,
        r#""zebra" does not match any of the regexes: "^a", "^b""#
    );
}

#[test]
fn test_draft3_type_error_names_schema_entries() {
    let found = errors(
        Draft::Draft3,
        json!({"type": ["integer", {"name": "Foo", "properties": {"a": {"type": "null"}}}]}),
        &json!({"a": 1}),
    );
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, r#"{"a":1} is not of type "integer", "Foo""#);
    assert_eq!(found[0].context.len(), 1);
}

#[test]
fn test_false_schema_error() {
    let found = errors(
        Draft::Draft6,
        json!({"properties": {"foo": false}}),
        &json!({"foo": "bar"}),
    );
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, ValidationErrorKind::FalseSchema);
    assert_eq!(found[0].message, r#"False schema does not allow "bar""#);
    assert_eq!(found[0].keyword.as_deref(), None);
    assert_eq!(found[0].schema_path.to_json_pointer(), "/properties/foo");
}

// Tests for the format keyword with built-in and user-supplied checkers

use json_schema_validation::{
    BoxError, Draft, FormatCheckError, FormatChecker, ValidationErrorKind, Validator,
};
use serde_json::{Value, json};

fn checked(draft: Draft, format: &str) -> Validator {
    Validator::options()
        .draft(draft)
        .format_checker(draft.format_checker())
        .build(json!({"format": format}))
}

#[test]
fn test_draft3_format_names() {
    let cases = [
        ("ip-address", json!("127.0.0.1"), json!("127.0.0.300")),
        ("host-name", json!("example.com"), json!("not_a_host")),
        ("date", json!("1963-06-19"), json!("06/19/1963")),
        ("time", json!("08:30:06"), json!("8:30 AM")),
        ("color", json!("#fff"), json!("puce")),
    ];
    for (format, good, bad) in cases {
        let validator = checked(Draft::Draft3, format);
        assert!(validator.is_valid(&good), "{format}: {good}");
        assert!(!validator.is_valid(&bad), "{format}: {bad}");
    }
}

#[test]
fn test_draft4_format_names() {
    let cases = [
        ("ipv4", json!("192.168.0.1"), json!("192.168.0")),
        ("ipv6", json!("::1"), json!("1:2:3")),
        ("hostname", json!("www.example.com"), json!("-leading-dash")),
        ("email", json!("joe@example.com"), json!("joe")),
        ("uri", json!("http://example.com/a"), json!("a/relative/path")),
        (
            "date-time",
            json!("1963-06-19T08:30:06Z"),
            json!("1963-06-19 08:30"),
        ),
    ];
    for (format, good, bad) in cases {
        let validator = checked(Draft::Draft4, format);
        assert!(validator.is_valid(&good), "{format}: {good}");
        assert!(!validator.is_valid(&bad), "{format}: {bad}");
    }
}

#[test]
fn test_draft6_format_names() {
    let cases = [
        ("json-pointer", json!("/foo/0"), json!("foo")),
        ("uri-reference", json!("../relative"), json!("not a reference")),
        ("uri-template", json!("http://example.com/{id}"), json!("http://example.com/{id")),
    ];
    for (format, good, bad) in cases {
        let validator = checked(Draft::Draft6, format);
        assert!(validator.is_valid(&good), "{format}: {good}");
        assert!(!validator.is_valid(&bad), "{format}: {bad}");
    }
}

#[test]
fn test_draft_specific_names_are_unknown_elsewhere() {
    // Unknown to the Draft 4 checker, so anything goes.
    let validator = checked(Draft::Draft4, "ip-address");
    assert!(validator.is_valid(&json!("not an address")));

    let validator = checked(Draft::Draft3, "json-pointer");
    assert!(validator.is_valid(&json!("not a pointer")));
}

#[test]
fn test_non_strings_always_conform() {
    let validator = checked(Draft::Draft6, "ipv4");
    for instance in [json!(12), json!(null), json!([1]), json!({"a": 1})] {
        assert!(validator.is_valid(&instance), "{instance}");
    }
}

#[test]
fn test_error_carries_format_kind() {
    let validator = checked(Draft::Draft6, "ipv4");
    let error = validator
        .iter_errors(&json!("1.2.3"))
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(
        error.kind,
        ValidationErrorKind::Format {
            format: "ipv4".to_string()
        }
    );
    assert_eq!(error.message, r#""1.2.3" is not a "ipv4""#);
    assert!(error.cause.is_some());
}

#[test]
fn test_user_checker_alongside_builtins() {
    let checker = Draft::Draft6.format_checker().checks("even", &[], |instance: &Value| {
        Ok::<bool, BoxError>(instance.as_i64().is_none_or(|number| number % 2 == 0))
    });
    assert!(checker.knows("even"));
    assert!(checker.knows("ipv4"));

    let validator = Validator::options()
        .format_checker(checker)
        .build(json!({"properties": {"n": {"format": "even"}, "ip": {"format": "ipv4"}}}));
    assert!(validator.is_valid(&json!({"n": 4, "ip": "10.0.0.1"})));
    assert!(!validator.is_valid(&json!({"n": 3})));
    assert!(!validator.is_valid(&json!({"ip": "10.0.0"})));
}

#[test]
fn test_checker_used_directly() {
    let checker = FormatChecker::with_formats(["ipv4"]);
    assert_eq!(checker.formats(), vec!["ipv4"]);
    assert!(checker.conforms(&json!("10.0.0.1"), "ipv4").unwrap());
    match checker.check(&json!("10.0.0"), "ipv4") {
        Err(FormatCheckError::Invalid(error)) => {
            assert_eq!(error.message, r#""10.0.0" is not a "ipv4""#);
        }
        other => panic!("Expected an invalid format, got {:?}", other),
    }
}

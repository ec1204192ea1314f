use pretty_assertions::assert_eq;

use super::support::{execute_data, execute_json, star_wars_schema, validation_error};

#[test]
fn skip_true_omits_the_field() {
    let schema = star_wars_schema();
    let data = execute_data(&schema, "{ mirror(value: 1) @skip(if: true) }");
    assert_eq!(data.to_json_string(), "{}");
}

#[test]
fn skip_false_keeps_the_field() {
    let schema = star_wars_schema();
    let data = execute_data(&schema, "{ mirror(value: 1) @skip(if: false) }");
    assert_eq!(data.to_json_string(), r#"{"mirror":-1}"#);
}

#[test]
fn include_false_omits_the_field() {
    let schema = star_wars_schema();
    let data = execute_data(&schema, "{ mirror(value: 1) @include(if: false) }");
    assert_eq!(data.to_json_string(), "{}");
}

#[test]
fn skip_true_and_include_false_agree() {
    let schema = star_wars_schema();
    let skipped = execute_json(&schema, "{ name: mirror(value: 3) @skip(if: true) }");
    let excluded = execute_json(&schema, "{ name: mirror(value: 3) @include(if: false) }");
    assert_eq!(skipped, excluded);
    assert_eq!(skipped, r#"{"data":{},"errors":null}"#);
}

#[test]
fn skip_wins_over_include_when_both_present() {
    let schema = star_wars_schema();
    let data = execute_data(
        &schema,
        "{ mirror(value: 1) @skip(if: true) @include(if: true) }",
    );
    assert_eq!(data.to_json_string(), "{}");
}

#[test]
fn directives_apply_to_fragment_spreads() {
    let schema = star_wars_schema();
    let data = execute_data(
        &schema,
        r#"
        { node { id ...Name @skip(if: true) } }
        fragment Name on Character { name }
        "#,
    );
    assert_eq!(data.to_json_string(), r#"{"node":{"id":"1000"}}"#);
}

#[test]
fn directives_apply_to_inline_fragments() {
    let schema = star_wars_schema();
    let data = execute_data(
        &schema,
        "{ node { id ... on Human { homePlanet } @include(if: false) } }",
    );
    assert_eq!(data.to_json_string(), r#"{"node":{"id":"1000"}}"#);
}

#[test]
fn unknown_directives_are_ignored() {
    let schema = star_wars_schema();
    let data = execute_data(&schema, "{ mirror(value: 2) @custom(level: 3) }");
    assert_eq!(data.to_json_string(), r#"{"mirror":-2}"#);
}

#[test]
fn skip_requires_a_boolean_condition() {
    let schema = star_wars_schema();
    let err = validation_error(&schema, "{ mirror(value: 1) @skip(if: 3) }");
    assert_eq!(err.message, "the \"if\" argument of @skip must be a Boolean");
}

#[test]
fn include_requires_a_condition() {
    let schema = star_wars_schema();
    let err = validation_error(&schema, "{ mirror(value: 1) @include }");
    assert_eq!(err.message, "directive @include requires an \"if\" argument");
}

#[test]
fn variables_drive_directive_conditions() {
    use crate::{ast::Variables, value::Value};

    let schema = star_wars_schema();
    let mut variables = Variables::new();
    variables.insert("keep".into(), Value::Boolean(false));

    let (data, errors) = super::support::execute_with(
        &schema,
        "query($keep: Boolean!) { mirror(value: 1) @include(if: $keep) }",
        variables,
    );
    assert!(errors.is_empty());
    assert_eq!(data.to_json_string(), "{}");
}

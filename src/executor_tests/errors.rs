use pretty_assertions::assert_eq;

use super::support::{execute_data, star_wars_schema, validation_error};

#[test]
fn unknown_fields_fail_validation() {
    let schema = star_wars_schema();
    let err = validation_error(&schema, "{ nothing }");
    assert_eq!(err.message, "unknown field \"nothing\" on type \"Query\"");
}

#[test]
fn leaf_fields_reject_subselections() {
    let schema = star_wars_schema();
    let err = validation_error(&schema, "{ mirror(value: 1) { digits } }");
    assert_eq!(
        err.message,
        "field \"mirror\" of type Int! must not have a subselection",
    );
}

#[test]
fn composite_fields_require_subselections() {
    let schema = star_wars_schema();
    let err = validation_error(&schema, "{ node }");
    assert_eq!(
        err.message,
        "field \"node\" of type Character! must have a subselection",
    );
}

#[test]
fn unions_require_inline_fragments() {
    let schema = star_wars_schema();
    let err = validation_error(&schema, r#"{ search(text: "o") { name } }"#);
    assert_eq!(
        err.message,
        "cannot directly query field \"name\" on union \"SearchResult\"; \
         use an inline fragment on a member type",
    );
}

#[test]
fn typename_is_always_selectable_on_unions() {
    let schema = star_wars_schema();
    let data = execute_data(&schema, r#"{ search(text: "r2") { __typename } }"#);
    assert_eq!(
        data.to_json_string(),
        r#"{"search":[{"__typename":"Droid"}]}"#,
    );
}

#[test]
fn unknown_arguments_are_rejected() {
    let schema = star_wars_schema();
    let err = validation_error(&schema, "{ mirror(other: 1) }");
    assert_eq!(err.message, "unknown arg other");
}

#[test]
fn missing_required_arguments_are_rejected() {
    let schema = star_wars_schema();
    let err = validation_error(&schema, "{ mirror }");
    assert_eq!(err.message, "value: unexpected null");
}

#[test]
fn argument_errors_carry_the_selection_path() {
    let schema = star_wars_schema();
    let err = validation_error(&schema, "{ node { id } outer: mirror(other: 2) }");
    assert_eq!(
        serde_json::to_value(&err.paths).unwrap(),
        serde_json::json!(["outer"]),
    );
}

#[test]
fn fields_resolve_in_source_order_with_aliases() {
    let schema = star_wars_schema();
    let data = execute_data(
        &schema,
        "{ b: mirror(value: 2) a: mirror(value: 1) c: mirror(value: 3) }",
    );
    assert_eq!(data.to_json_string(), r#"{"b":-2,"a":-1,"c":-3}"#);
}

// Direct selections resolve first, then fragment content, matching the
// selection/spread split of the operation tree.
#[test]
fn fragment_fields_follow_direct_selections() {
    let schema = star_wars_schema();
    let data = execute_data(
        &schema,
        r#"
        { node { __typename ...Ids name } }
        fragment Ids on Character { id }
        "#,
    );
    assert_eq!(
        data.to_json_string(),
        r#"{"node":{"__typename":"Human","name":"Luke Skywalker","id":"1000"}}"#,
    );
}

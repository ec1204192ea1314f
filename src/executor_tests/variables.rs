use pretty_assertions::assert_eq;

use crate::{ast::Variables, value::Value};

use super::support::{execute_with, star_wars_schema};

#[test]
fn variables_flow_into_arguments() {
    let schema = star_wars_schema();
    let mut variables = Variables::new();
    variables.insert("v".into(), Value::Int(1));

    let (data, errors) = execute_with(
        &schema,
        "query($v: int64) { mirror(value: $v) }",
        variables,
    );
    assert!(errors.is_empty());
    assert_eq!(data.to_json_string(), r#"{"mirror":-1}"#);
}

#[test]
fn variables_substitute_inside_input_objects() {
    let schema = star_wars_schema();
    let mut variables = Variables::new();
    variables.insert("id".into(), Value::string("u7"));

    let (data, errors) = execute_with(
        &schema,
        "query($id: ID) { find(input: {id: $id}) }",
        variables,
    );
    assert!(errors.is_empty());
    assert_eq!(data.to_json_string(), r#"{"find":"id:u7"}"#);
}

#[test]
fn declared_defaults_apply_when_unset() {
    let schema = star_wars_schema();
    let (data, errors) = execute_with(
        &schema,
        "query($v: Int = 40) { mirror(value: $v) }",
        Variables::new(),
    );
    assert!(errors.is_empty());
    assert_eq!(data.to_json_string(), r#"{"mirror":-40}"#);
}

#[test]
fn string_variables_fail_int_coercion() {
    let schema = star_wars_schema();
    let mut variables = Variables::new();
    variables.insert("v".into(), Value::string("one"));

    let (data, errors) = execute_with(
        &schema,
        "query($v: Int) { mirror(value: $v) }",
        variables,
    );
    assert!(data.is_null());
    assert_eq!(errors[0].message, "value: not an integer");
}

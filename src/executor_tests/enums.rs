use pretty_assertions::assert_eq;

use super::support::{execute, execute_data, star_wars_schema};

#[test]
fn enum_results_stringify_through_the_reverse_map() {
    let schema = star_wars_schema();
    let data = execute_data(&schema, "{ node { appearsIn } }");
    assert_eq!(
        data.to_json_string(),
        r#"{"node":{"appearsIn":["NEWHOPE","EMPIRE","JEDI"]}}"#,
    );
}

#[test]
fn enum_literals_coerce_into_native_values() {
    let schema = star_wars_schema();
    let data = execute_data(&schema, "{ hero(episode: EMPIRE) { name } }");
    assert_eq!(
        data.to_json_string(),
        r#"{"hero":{"name":"Luke Skywalker"}}"#,
    );
}

#[test]
fn absent_nullable_enum_argument_defaults() {
    let schema = star_wars_schema();
    let data = execute_data(&schema, "{ hero { name } }");
    assert_eq!(data.to_json_string(), r#"{"hero":{"name":"R2-D2"}}"#);
}

#[test]
fn unknown_enum_values_fail_coercion() {
    let schema = star_wars_schema();
    let (data, errors) = execute(&schema, "{ hero(episode: PHANTOM) { name } }");
    assert!(data.is_null());
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0].message.contains("unknown value \"PHANTOM\""),
        "unexpected message: {}",
        errors[0].message,
    );
}

use pretty_assertions::assert_eq;

use super::support::{execute_data, star_wars_schema};

#[test]
fn interface_dispatch_resolves_the_concrete_object() {
    let schema = star_wars_schema();
    let data = execute_data(
        &schema,
        "{ node { __typename id ... on Human { homePlanet } ... on Droid { primaryFunction } } }",
    );

    // The value is a Human; the Droid fragment contributes nothing.
    assert_eq!(
        data.to_json_string(),
        r#"{"node":{"__typename":"Human","id":"1000","homePlanet":"Tatooine"}}"#,
    );
}

#[test]
fn interface_fields_are_selectable_without_fragments() {
    let schema = star_wars_schema();
    let data = execute_data(&schema, "{ node { id name } }");
    assert_eq!(
        data.to_json_string(),
        r#"{"node":{"id":"1000","name":"Luke Skywalker"}}"#,
    );
}

#[test]
fn interface_fragments_apply_on_the_interface_itself() {
    let schema = star_wars_schema();
    let data = execute_data(
        &schema,
        "{ node { ... on Character { name } } }",
    );
    assert_eq!(
        data.to_json_string(),
        r#"{"node":{"name":"Luke Skywalker"}}"#,
    );
}

#[test]
fn hero_switches_concrete_type_by_episode() {
    let schema = star_wars_schema();

    let droid = execute_data(&schema, "{ hero { __typename name } }");
    assert_eq!(
        droid.to_json_string(),
        r#"{"hero":{"__typename":"Droid","name":"R2-D2"}}"#,
    );

    let human = execute_data(&schema, "{ hero(episode: EMPIRE) { __typename name } }");
    assert_eq!(
        human.to_json_string(),
        r#"{"hero":{"__typename":"Human","name":"Luke Skywalker"}}"#,
    );
}

#[test]
fn union_members_resolve_through_inline_fragments() {
    let schema = star_wars_schema();
    let data = execute_data(
        &schema,
        r#"
        {
          search(text: "") {
            __typename
            ... on Human { name homePlanet }
            ... on Droid { name primaryFunction }
          }
        }
        "#,
    );

    assert_eq!(
        data.to_json_string(),
        concat!(
            r#"{"search":[{"__typename":"Human","name":"Luke Skywalker","homePlanet":"Tatooine"},"#,
            r#"{"__typename":"Droid","name":"R2-D2","primaryFunction":"Astromech"}]}"#,
        ),
    );
}

#[test]
fn nullable_object_results_resolve_to_null() {
    let schema = star_wars_schema();
    let data = execute_data(&schema, r#"{ human(id: "9999") { name } }"#);
    assert_eq!(data.to_json_string(), r#"{"human":null}"#);
}

#[test]
fn fragments_on_sibling_members_are_skipped_for_non_matching_values() {
    let schema = star_wars_schema();
    let data = execute_data(
        &schema,
        r#"{ search(text: "r2") { ... on Human { name } ... on Droid { primaryFunction } } }"#,
    );
    assert_eq!(
        data.to_json_string(),
        r#"{"search":[{"primaryFunction":"Astromech"}]}"#,
    );
}

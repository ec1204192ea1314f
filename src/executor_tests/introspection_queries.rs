use pretty_assertions::assert_eq;
use serial_test::serial;

use crate::{
    introspection::{add_introspection, INTROSPECTION_QUERY},
    schema::model::Schema,
    value::Value,
};

use super::support::{execute, execute_data, star_wars_schema};

fn introspected() -> Schema {
    add_introspection(star_wars_schema()).expect("introspection merges cleanly")
}

fn query_json(schema: &Schema, source: &str) -> serde_json::Value {
    let data = execute_data(schema, source);
    serde_json::to_value(&data).expect("data serializes")
}

#[test]
fn schema_reports_root_types() {
    let schema = introspected();
    let json = query_json(
        &schema,
        "{ __schema { queryType { name } mutationType { name } subscriptionType { name } } }",
    );
    assert_eq!(
        json,
        serde_json::json!({
            "__schema": {
                "queryType": {"name": "Query"},
                "mutationType": null,
                "subscriptionType": null,
            }
        }),
    );
}

#[test]
fn type_kinds_match_their_registrations() {
    let schema = introspected();

    for (name, kind) in [
        ("Character", "INTERFACE"),
        ("SearchResult", "UNION"),
        ("Droid", "OBJECT"),
        ("Episode", "ENUM"),
        ("Identifier", "INPUT_OBJECT"),
        ("String", "SCALAR"),
    ] {
        let json = query_json(
            &schema,
            &format!("{{ __type(name: \"{name}\") {{ name kind }} }}"),
        );
        assert_eq!(
            json,
            serde_json::json!({"__type": {"name": name, "kind": kind}}),
            "for type {name}",
        );
    }
}

#[test]
fn unreachable_names_resolve_to_null() {
    let schema = introspected();
    let json = query_json(&schema, "{ __type(name: \"Nope\") { name } }");
    assert_eq!(json, serde_json::json!({"__type": null}));
}

#[test]
fn wrappers_expose_of_type_chains() {
    let schema = introspected();
    let json = query_json(
        &schema,
        r#"
        {
          __type(name: "Character") {
            fields {
              name
              type { kind name ofType { kind name } }
            }
          }
        }
        "#,
    );

    let fields = json["__type"]["fields"].as_array().unwrap();
    let appears_in = fields
        .iter()
        .find(|f| f["name"] == "appearsIn")
        .expect("appearsIn is a common field");
    assert_eq!(appears_in["type"]["kind"], "NON_NULL");
    assert_eq!(appears_in["type"]["ofType"]["kind"], "LIST");
}

#[test]
fn interfaces_and_possible_types_are_mutual() {
    let schema = introspected();

    let json = query_json(
        &schema,
        "{ __type(name: \"Character\") { possibleTypes { name } } }",
    );
    assert_eq!(
        json,
        serde_json::json!({
            "__type": {"possibleTypes": [{"name": "Droid"}, {"name": "Human"}]}
        }),
    );

    let json = query_json(&schema, "{ __type(name: \"Human\") { interfaces { name } } }");
    assert_eq!(
        json,
        serde_json::json!({"__type": {"interfaces": [{"name": "Character"}]}}),
    );
}

#[test]
fn one_of_input_objects_advertise_the_flag_and_directive() {
    let schema = introspected();
    let json = query_json(
        &schema,
        r#"
        {
          __type(name: "Identifier") {
            isOneOf
            directives { name }
            inputFields { name type { name } }
          }
        }
        "#,
    );

    assert_eq!(json["__type"]["isOneOf"], serde_json::json!(true));
    assert_eq!(
        json["__type"]["directives"],
        serde_json::json!([{"name": "oneOf"}]),
    );
    assert_eq!(
        json["__type"]["inputFields"],
        serde_json::json!([
            {"name": "email", "type": {"name": "String"}},
            {"name": "id", "type": {"name": "ID"}},
        ]),
    );
}

#[test]
fn objects_report_null_is_one_of() {
    let schema = introspected();
    let json = query_json(&schema, "{ __type(name: \"Droid\") { isOneOf } }");
    assert_eq!(json, serde_json::json!({"__type": {"isOneOf": null}}));
}

#[test]
fn built_in_directives_are_advertised() {
    let schema = introspected();
    let json = query_json(&schema, "{ __schema { directives { name locations } } }");

    let directives = json["__schema"]["directives"].as_array().unwrap();
    let find = |name: &str| {
        directives
            .iter()
            .find(|d| d["name"] == name)
            .unwrap_or_else(|| panic!("directive @{name} missing"))
    };

    assert!(find("include")["locations"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("FIELD")));
    assert!(find("skip")["locations"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("FRAGMENT_SPREAD")));
    assert_eq!(
        find("specifiedBy")["locations"],
        serde_json::json!(["SCALAR"]),
    );
    assert_eq!(
        find("deprecated")["locations"],
        serde_json::json!(["FIELD", "ARGUMENT_DEFINITION", "INPUT_FIELD_DEFINITION"]),
    );
    assert_eq!(find("oneOf")["locations"], serde_json::json!(["INPUT_OBJECT"]));
}

#[test]
fn deprecated_reason_argument_has_the_spec_default() {
    let schema = introspected();
    let json = query_json(
        &schema,
        "{ __schema { directives { name args { name defaultValue } } } }",
    );

    let directives = json["__schema"]["directives"].as_array().unwrap();
    let deprecated = directives
        .iter()
        .find(|d| d["name"] == "deprecated")
        .unwrap();
    assert_eq!(
        deprecated["args"],
        serde_json::json!([{"name": "reason", "defaultValue": "No longer supported"}]),
    );
}

#[test]
fn deprecated_fields_are_filtered_by_default() {
    use crate::schema::build::SchemaBuilder;

    let mut builder = SchemaBuilder::new();
    let mut query = builder.query();
    query.field_fn("current", || 1i64);
    query
        .field_fn("obsolete", || 2i64)
        .deprecated("use current instead");
    let schema = add_introspection(builder.must_build()).unwrap();

    let json = query_json(&schema, "{ __type(name: \"Query\") { fields { name } } }");
    assert_eq!(
        json,
        serde_json::json!({"__type": {"fields": [{"name": "current"}]}}),
    );

    let json = query_json(
        &schema,
        r#"
        {
          __type(name: "Query") {
            fields(includeDeprecated: true) { name isDeprecated deprecationReason }
          }
        }
        "#,
    );
    assert_eq!(
        json,
        serde_json::json!({
            "__type": {"fields": [
                {"name": "current", "isDeprecated": false, "deprecationReason": null},
                {"name": "obsolete", "isDeprecated": true, "deprecationReason": "use current instead"},
            ]}
        }),
    );
}

#[test]
fn deprecated_enum_values_are_filtered_by_default() {
    use crate::schema::build::SchemaBuilder;
    use super::support::Episode;

    let mut builder = SchemaBuilder::new();
    builder
        .enum_type::<Episode>(
            "Episode",
            [
                ("NEWHOPE", Episode::NewHope),
                ("EMPIRE", Episode::Empire),
                ("JEDI", Episode::Jedi),
            ],
        )
        .deprecate_value("JEDI", "retitled");
    builder.query().field_fn("episode", || Episode::Empire);
    let schema = add_introspection(builder.must_build()).unwrap();

    let json = query_json(&schema, "{ __type(name: \"Episode\") { enumValues { name } } }");
    assert_eq!(
        json,
        serde_json::json!({
            "__type": {"enumValues": [{"name": "EMPIRE"}, {"name": "NEWHOPE"}]}
        }),
    );

    let json = query_json(
        &schema,
        "{ __type(name: \"Episode\") { enumValues(includeDeprecated: true) { name } } }",
    );
    let values = json["__type"]["enumValues"].as_array().unwrap();
    assert_eq!(values.len(), 3);
}

#[test]
#[serial(scalar_registry)]
fn specified_by_url_surfaces_for_custom_scalars() {
    use crate::schema::build::{scalars, SchemaBuilder};

    #[derive(Clone, Debug, PartialEq)]
    struct Uuid(String);

    impl crate::OutputValue for Uuid {}

    scalars::register_scalar_with::<Uuid, _, _>(
        "UUID",
        |v| {
            v.as_str()
                .map(|s| Uuid(s.into()))
                .ok_or_else(|| crate::FieldError::new("not a string"))
        },
        |u| Value::string(u.0.clone()),
        scalars::ScalarOptions::default().specified_by("https://tools.ietf.org/html/rfc4122"),
    )
    .expect("UUID registers once");

    let mut builder = SchemaBuilder::new();
    builder
        .query()
        .field_fn("token", || Uuid("a-b-c-d".into()));
    let schema = add_introspection(builder.must_build()).unwrap();

    let json = query_json(
        &schema,
        "{ __type(name: \"UUID\") { name kind specifiedByURL } }",
    );
    assert_eq!(
        json,
        serde_json::json!({
            "__type": {
                "name": "UUID",
                "kind": "SCALAR",
                "specifiedByURL": "https://tools.ietf.org/html/rfc4122",
            }
        }),
    );
}

#[test]
fn built_in_scalars_have_no_specified_by_url() {
    let schema = introspected();
    let json = query_json(&schema, "{ __type(name: \"String\") { name specifiedByURL } }");
    assert_eq!(
        json,
        serde_json::json!({"__type": {"name": "String", "specifiedByURL": null}}),
    );
}

#[test]
fn field_arguments_appear_in_schema_types() {
    let schema = introspected();
    let json = query_json(
        &schema,
        r#"
        {
          __type(name: "Query") {
            fields {
              name
              args { name type { kind ofType { name } } }
            }
          }
        }
        "#,
    );

    let fields = json["__type"]["fields"].as_array().unwrap();
    let mirror = fields.iter().find(|f| f["name"] == "mirror").unwrap();
    assert_eq!(
        mirror["args"],
        serde_json::json!([
            {"name": "value", "type": {"kind": "NON_NULL", "ofType": {"name": "Int"}}}
        ]),
    );
}

#[test]
fn canonical_query_executes_against_any_schema() {
    let schema = introspected();
    let (data, errors) = execute(&schema, INTROSPECTION_QUERY);

    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    let json = serde_json::to_value(&data).unwrap();

    let types = json["__schema"]["types"].as_array().unwrap();
    let names: Vec<&str> = types.iter().filter_map(|t| t["name"].as_str()).collect();
    for expected in ["Character", "Droid", "Episode", "Human", "ID", "Identifier", "Query"] {
        assert!(names.contains(&expected), "missing type {expected}");
    }

    // Meta types stay out of the reachable type listing.
    assert!(!names.contains(&"__Schema"));
    assert!(!names.contains(&"__Type"));
}

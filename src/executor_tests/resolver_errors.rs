use pretty_assertions::assert_eq;

use crate::{
    executor::{Executor, FieldError, FieldResult, RequestContext},
    parser::parse_query,
    schema::{build::SchemaBuilder, model::Schema},
    value::Value,
};

use super::support::execute;

#[derive(Clone, Debug)]
struct Account {
    name: String,
}

impl crate::OutputValue for Account {}

fn accounts_schema() -> Schema {
    let mut builder = SchemaBuilder::new();

    let mut account = builder.object::<Account>("Account");
    account.field_fn("name", |a: &Account| a.name.clone());
    account.field_fn("nickname", |_: &Account| -> FieldResult<Option<String>> {
        Err(FieldError::new("nickname store offline"))
    });
    account.field_fn("secret", |_: &Account| -> FieldResult<String> {
        Err(FieldError::new("not allowed"))
    });
    account
        .field_fn("motto", |_: &Account| -> Option<String> { None })
        .non_null();

    let mut query = builder.query();
    query.field_fn("account", || {
        Some(Account {
            name: "alice".into(),
        })
    });
    query.field_fn("accounts", || {
        vec![
            Account {
                name: "alice".into(),
            },
            Account {
                name: "bob".into(),
            },
        ]
    });
    query.field_fn("broken", || -> FieldResult<Option<i64>> {
        Err(FieldError::new("boom").extension("code", Value::string("Internal")))
    });
    query.field_fn("panicky", || -> Option<i64> { panic!("resolver went sideways") });

    builder.must_build()
}

#[test]
fn nullable_field_errors_leave_siblings_intact() {
    let schema = accounts_schema();
    let (data, errors) = execute(&schema, "{ account { name nickname } }");

    assert_eq!(
        data.to_json_string(),
        r#"{"account":{"name":"alice","nickname":null}}"#,
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "nickname store offline");
    assert_eq!(
        serde_json::to_value(&errors[0].paths).unwrap(),
        serde_json::json!(["account", "nickname"]),
    );
}

#[test]
fn non_null_field_errors_null_the_nearest_nullable_ancestor() {
    let schema = accounts_schema();
    let (data, errors) = execute(&schema, "{ account { name secret } }");

    // `secret` is String!, so the error nulls the whole account object.
    assert_eq!(data.to_json_string(), r#"{"account":null}"#);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "not allowed");
}

#[test]
fn genuine_null_at_non_null_position_synthesizes_one_error() {
    let schema = accounts_schema();
    let (data, errors) = execute(&schema, "{ account { name motto } }");

    assert_eq!(data.to_json_string(), r#"{"account":null}"#);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "cannot return null for non-nullable field",
    );
    assert_eq!(
        serde_json::to_value(&errors[0].paths).unwrap(),
        serde_json::json!(["account", "motto"]),
    );
}

#[test]
fn list_errors_carry_the_element_index() {
    let schema = accounts_schema();
    let (data, errors) = execute(&schema, "{ accounts { name nickname } }");

    assert_eq!(
        data.to_json_string(),
        r#"{"accounts":[{"name":"alice","nickname":null},{"name":"bob","nickname":null}]}"#,
    );
    assert_eq!(errors.len(), 2);
    assert_eq!(
        serde_json::to_value(&errors[0].paths).unwrap(),
        serde_json::json!(["accounts", 0, "nickname"]),
    );
    assert_eq!(
        serde_json::to_value(&errors[1].paths).unwrap(),
        serde_json::json!(["accounts", 1, "nickname"]),
    );
}

#[test]
fn error_extensions_surface_the_code() {
    let schema = accounts_schema();
    let (data, errors) = execute(&schema, "{ broken }");

    assert_eq!(data.to_json_string(), r#"{"broken":null}"#);
    assert_eq!(
        serde_json::to_string(&errors[0]).unwrap(),
        r#"{"message":"boom","extensions":{"code":"Internal"},"paths":["broken"]}"#,
    );
}

#[test]
fn resolver_panics_convert_to_internal_errors() {
    let schema = accounts_schema();
    let (data, errors) = execute(&schema, "{ account { name } panicky }");

    assert_eq!(
        data.to_json_string(),
        r#"{"account":{"name":"alice"},"panicky":null}"#,
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "internal server error");
}

#[test]
fn cancellation_stops_dispatch_at_the_next_resolver() {
    let schema = accounts_schema();
    let query = parse_query("{ account { name } }", &Default::default()).unwrap();

    let ctx = RequestContext::new();
    ctx.cancellation().cancel();

    let (data, errors) = Executor::new().execute(&ctx, &schema, &query);
    assert_eq!(data.to_json_string(), "{}");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "context canceled");
}

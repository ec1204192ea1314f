use pretty_assertions::assert_eq;

use crate::{executor::RequestContext, http};

use super::support::star_wars_schema;

#[test]
fn post_executes_the_query() {
    let schema = star_wars_schema();
    let reply = http::handle(
        &schema,
        &RequestContext::new(),
        "POST",
        "/graphql",
        Some(
            r#"{"query": "query TestQuery($value: int64) { mirror(value: $value) }", "variables": { "value": 1 }}"#,
        ),
    );

    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, "application/json");
    assert_eq!(reply.body, r#"{"data":{"mirror":-1},"errors":null}"#);
}

#[test]
fn missing_body_requires_a_query() {
    let schema = star_wars_schema();
    let reply = http::handle(&schema, &RequestContext::new(), "POST", "/graphql", None);

    assert_eq!(reply.status, 200);
    assert_eq!(
        reply.body,
        r#"{"data":null,"errors":[{"message":"request must include a query","extensions":{"code":"Unknown"},"paths":[]}]}"#,
    );
}

#[test]
fn blank_query_must_have_a_single_query() {
    let schema = star_wars_schema();
    let reply = http::handle(
        &schema,
        &RequestContext::new(),
        "POST",
        "/graphql",
        Some(r#"{"query":""}"#),
    );

    assert_eq!(reply.status, 200);
    assert_eq!(
        reply.body,
        r#"{"data":null,"errors":[{"message":"must have a single query","extensions":{"code":"Unknown"},"paths":[]}]}"#,
    );
}

#[test]
fn non_post_methods_are_rejected() {
    let schema = star_wars_schema();
    let reply = http::handle(&schema, &RequestContext::new(), "PUT", "/graphql", None);

    assert_eq!(reply.status, 200);
    assert_eq!(
        reply.body,
        r#"{"data":null,"errors":[{"message":"request must be a POST","extensions":{"code":"Unknown"},"paths":[]}]}"#,
    );
}

#[test]
fn get_serves_the_playground() {
    let schema = star_wars_schema();
    let reply = http::handle(&schema, &RequestContext::new(), "GET", "/graphql", None);

    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, "text/html; charset=utf-8");
    assert!(reply.body.contains("<title>Jaal GraphQL Playground</title>"));
    assert!(reply.body.contains("endpoint: '/graphql'"));
}

#[test]
fn graphql_errors_still_reply_200() {
    let schema = star_wars_schema();
    let reply = http::handle(
        &schema,
        &RequestContext::new(),
        "POST",
        "/graphql",
        Some(r#"{"query":"{ nothing }"}"#),
    );

    assert_eq!(reply.status, 200);
    assert!(reply.body.contains("unknown field \\\"nothing\\\""));
    assert!(reply.body.starts_with(r#"{"data":null"#));
}

#[test]
fn malformed_bodies_produce_envelope_errors() {
    let schema = star_wars_schema();
    let reply = http::handle(
        &schema,
        &RequestContext::new(),
        "POST",
        "/graphql",
        Some("{not json"),
    );

    assert_eq!(reply.status, 200);
    assert!(reply.body.starts_with(r#"{"data":null,"errors":"#));
}

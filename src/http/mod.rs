//! Library-agnostic building blocks for HTTP endpoints.
//!
//! No web framework is bundled; a transport deserializes the POST body
//! into [`GraphQLRequest`], calls [`execute_request`] and writes the
//! resulting envelope as JSON. [`handle`] wraps the whole method contract,
//! including the playground served on GET.

pub mod playground;

use serde::{Deserialize, Serialize};

use crate::{
    ast::Variables,
    errors::Error,
    executor::{Executor, RequestContext},
    parser::parse_query,
    schema::model::Schema,
    validation::validate_query,
    value::Value,
};

pub use self::playground::playground_source;

/// The expected structure of the decoded JSON request body.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GraphQLRequest {
    /// The GraphQL query text.
    pub query: String,
    /// Optional variable bindings.
    #[serde(default)]
    pub variables: Option<Variables>,
}

impl GraphQLRequest {
    /// Construct a request from parts.
    pub fn new(query: impl Into<String>, variables: Option<Variables>) -> Self {
        GraphQLRequest {
            query: query.into(),
            variables,
        }
    }
}

/// The response envelope: `data` plus `errors`, both always present;
/// `errors` serializes as null when empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphQLResponse {
    /// The executed response tree, or null.
    pub data: Value,
    /// The accumulated errors, or null.
    pub errors: Option<Vec<Error>>,
}

impl GraphQLResponse {
    /// An envelope carrying only a request-level error.
    pub fn from_error(error: Error) -> Self {
        GraphQLResponse {
            data: Value::Null,
            errors: Some(vec![error]),
        }
    }

    /// Serialize the envelope as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"data":null,"errors":null}"#.into())
    }
}

/// Parse, validate and execute one request.
pub fn execute_request(
    schema: &Schema,
    ctx: &RequestContext,
    request: &GraphQLRequest,
) -> GraphQLResponse {
    let variables = request.variables.clone().unwrap_or_default();

    let query = match parse_query(&request.query, &variables) {
        Ok(query) => query,
        Err(e) => return GraphQLResponse::from_error(e.into()),
    };

    if let Err(e) = validate_query(schema, &query) {
        return GraphQLResponse::from_error(e);
    }

    let (data, errors) = Executor::new().execute(ctx, schema, &query);
    GraphQLResponse {
        data,
        errors: if errors.is_empty() {
            None
        } else {
            Some(errors)
        },
    }
}

/// A transport-agnostic HTTP reply.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpReply {
    /// The HTTP status code; GraphQL failures still reply 200.
    pub status: u16,
    /// The `Content-Type` header value.
    pub content_type: &'static str,
    /// The response body.
    pub body: String,
}

/// Serve one HTTP request against the schema.
///
/// GET and HEAD serve the playground page pointing back at `path`. POST
/// executes the body as a GraphQL request and always replies 200 with the
/// JSON envelope; transport-level problems are themselves envelope errors.
/// Any other method is rejected.
pub fn handle(
    schema: &Schema,
    ctx: &RequestContext,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> HttpReply {
    match method {
        "GET" | "HEAD" => HttpReply {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: playground_source(path),
        },
        "POST" => {
            let response = match body {
                None => GraphQLResponse::from_error(Error::new("request must include a query")),
                Some(body) => match serde_json::from_str::<GraphQLRequest>(body) {
                    Ok(request) => execute_request(schema, ctx, &request),
                    Err(e) => GraphQLResponse::from_error(Error::new(e.to_string())),
                },
            };
            json_reply(response)
        }
        _ => json_reply(GraphQLResponse::from_error(Error::new(
            "request must be a POST",
        ))),
    }
}

fn json_reply(response: GraphQLResponse) -> HttpReply {
    HttpReply {
        status: 200,
        content_type: "application/json",
        body: response.to_json(),
    }
}

/*!

# Jaal

Jaal is a code-first GraphQL server framework: declare native Rust data
structures and resolver functions, and the framework reflects them into a
spec-compliant GraphQL schema, then parses, validates and executes
queries, mutations and subscriptions against it. There is no schema
definition language anywhere; the registration API is the only boundary
through which application code shapes the schema.

Jaal does not include a web server. The [`http`] module provides the
building blocks (request/response envelope types, the method contract,
an embedded playground page) to wire the engine into any HTTP stack.

## Example

```
use jaal::{
    ArgumentDef, Arguments, BuildError, FieldResult, FromArguments, RequestContext,
    SchemaBuilder, TypeResolver,
};

struct MirrorArgs {
    value: i64,
}

impl FromArguments for MirrorArgs {
    fn arguments(resolver: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError> {
        Ok(vec![ArgumentDef::of::<i64>(resolver, "value")?])
    }

    fn from_arguments(args: &Arguments<'_>) -> FieldResult<Self> {
        Ok(Self { value: args.get("value")? })
    }
}

let mut schema = SchemaBuilder::new();
schema
    .query()
    .field_fn("mirror", |args: &MirrorArgs| -args.value);
let schema = schema.must_build();

let request = jaal::http::GraphQLRequest::new("{ mirror(value: 1) }", None);
let response = jaal::http::execute_request(&schema, &RequestContext::new(), &request);
assert_eq!(response.to_json(), r#"{"data":{"mirror":-1},"errors":null}"#);
```

## Registration surface

* [`SchemaBuilder::query`], [`SchemaBuilder::mutation`] and
  [`SchemaBuilder::subscription`] expose the lazily created root types.
* [`SchemaBuilder::object`] registers an object type; fields are closures
  over `(context, source, arguments)` in any of the supported shapes.
* [`SchemaBuilder::input_object`] registers an input object; each exposed
  field is a setter closure, and `mark_one_of` opts into the oneOf
  exactly-one-non-null contract.
* [`SchemaBuilder::enum_type`] maps GraphQL names to native values.
* [`SchemaBuilder::union_type`] and [`SchemaBuilder::interface`] take a
  carrier type (usually a Rust enum) plus per-member accessors; the
  one-hot discriminator of the source model becomes a compile-time
  guarantee.
* [`register_scalar`] and friends register custom scalars process-wide,
  optionally carrying a `@specifiedBy` URL.

Introspection is an overlay: [`introspection::add_introspection`] merges
`__schema` and `__type` into a built schema's query type.

*/
#![warn(missing_docs)]

pub mod ast;
mod errors;
pub mod executor;
pub mod http;
pub mod introspection;
pub mod parser;
pub(crate) mod schema;
pub mod validation;
mod value;

pub use crate::{
    ast::{OperationKind, Query, Variables},
    errors::{Error, Extensions, PathSegment},
    executor::{
        CancellationHandle, Executor, FieldError, FieldResult, IntoFieldError, RequestContext,
    },
    parser::parse_query,
    schema::{
        build::{
            field::{FieldFn, OutputValue},
            input::{ArgumentDef, Arguments, FromArguments, FromInputValue, InputFieldFn},
            scalars::{
                register_json_scalar, register_scalar, register_scalar_with, Bytes, Duration, Map,
                ScalarError, ScalarOptions, Timestamp, ID,
            },
            BuildError, SchemaBuilder, TypeResolver,
        },
        meta::{FieldValue, InputContext, TypeKind, TypeRef},
        model::{DirectiveLocation, DirectiveType, Schema},
    },
    validation::validate_query,
    value::{Object, Value},
};

#[cfg(test)]
mod executor_tests;

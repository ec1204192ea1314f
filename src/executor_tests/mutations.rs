use std::sync::atomic::{AtomicI64, Ordering};

use pretty_assertions::assert_eq;

use crate::{
    executor::{Executor, RequestContext},
    parser::parse_query,
    schema::{build::SchemaBuilder, model::Schema},
    validation::validate_query,
};

fn counter_schema() -> Schema {
    let mut builder = SchemaBuilder::new();
    builder.query().field_fn("noop", || true);

    let mut mutation = builder.mutation();
    for name in ["first", "second", "third"] {
        mutation.field_fn(name, |ctx: &RequestContext| {
            let counter = ctx.value::<AtomicI64>().expect("counter in context");
            counter.fetch_add(1, Ordering::SeqCst) + 1
        });
    }

    builder.must_build()
}

#[test]
fn top_level_mutations_run_sequentially_in_source_order() {
    let schema = counter_schema();
    let ctx = RequestContext::with_value(AtomicI64::new(0));

    let query = parse_query(
        "mutation { third: third first: first second: second }",
        &Default::default(),
    )
    .unwrap();
    validate_query(&schema, &query).unwrap();

    let (data, errors) = Executor::new().execute(&ctx, &schema, &query);
    assert!(errors.is_empty());

    // Counters record invocation order: strictly increasing in source
    // order, keyed under the aliases in source order.
    assert_eq!(
        data.to_json_string(),
        r#"{"third":1,"first":2,"second":3}"#,
    );
}

#[test]
fn mutation_requires_a_registered_mutation_root() {
    let mut builder = SchemaBuilder::new();
    builder.query().field_fn("noop", || true);
    let schema = builder.must_build();

    let query = parse_query("mutation { anything }", &Default::default()).unwrap();
    let err = validate_query(&schema, &query).unwrap_err();
    assert_eq!(err.message, "schema has no mutation type");
}

#[test]
fn mutation_errors_do_not_abort_later_siblings() {
    use crate::executor::{FieldError, FieldResult};

    let mut builder = SchemaBuilder::new();
    builder.query().field_fn("noop", || true);

    let mut mutation = builder.mutation();
    mutation.field_fn("works", || 1i64);
    mutation.field_fn("fails", || -> FieldResult<Option<i64>> {
        Err(FieldError::new("write rejected"))
    });
    mutation.field_fn("also", || 2i64);
    let schema = builder.must_build();

    let query = parse_query("mutation { works fails also }", &Default::default()).unwrap();
    validate_query(&schema, &query).unwrap();

    let (data, errors) = Executor::new().execute(&RequestContext::new(), &schema, &query);
    assert_eq!(
        data.to_json_string(),
        r#"{"works":1,"fails":null,"also":2}"#,
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "write rejected");
}

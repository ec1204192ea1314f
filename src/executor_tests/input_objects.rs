use pretty_assertions::assert_eq;

use super::support::{execute, execute_data, star_wars_schema};

#[test]
fn one_of_accepts_exactly_one_non_null_field() {
    let schema = star_wars_schema();
    let data = execute_data(&schema, r#"{ find(input: {id: "u1"}) }"#);
    assert_eq!(data.to_json_string(), r#"{"find":"id:u1"}"#);

    let data = execute_data(&schema, r#"{ find(input: {email: "a@b"}) }"#);
    assert_eq!(data.to_json_string(), r#"{"find":"email:a@b"}"#);
}

#[test]
fn one_of_rejects_two_non_null_fields() {
    let schema = star_wars_schema();
    let (data, errors) = execute(&schema, r#"{ find(input: {id: "u1", email: "a@b"}) }"#);

    assert!(data.is_null());
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0].message.contains("\"Identifier\""),
        "error should name the input type: {}",
        errors[0].message,
    );
}

#[test]
fn one_of_rejects_empty_objects() {
    let schema = star_wars_schema();
    let (data, errors) = execute(&schema, "{ find(input: {}) }");
    assert!(data.is_null());
    assert!(errors[0].message.contains("exactly one non-null field"));
}

#[test]
fn one_of_rejects_all_null_objects() {
    let schema = star_wars_schema();
    let (data, errors) = execute(&schema, "{ find(input: {id: null, email: null}) }");
    assert!(data.is_null());
    assert!(errors[0].message.contains("\"Identifier\""));
}

#[test]
fn one_of_coercion_populates_only_the_given_field() {
    let schema = star_wars_schema();

    // Coerced through variables rather than literals, same shape.
    use crate::{ast::Variables, value::Value};
    let mut variables = Variables::new();
    variables.insert(
        "input".into(),
        serde_json::from_str::<Value>(r#"{"email":"solo@falcon"}"#).unwrap(),
    );

    let (data, errors) = super::support::execute_with(
        &schema,
        "query($input: Identifier!) { find(input: $input) }",
        variables,
    );
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    assert_eq!(data.to_json_string(), r#"{"find":"email:solo@falcon"}"#);
}

#[test]
fn unknown_input_fields_are_rejected() {
    let schema = star_wars_schema();
    let (data, errors) = execute(&schema, r#"{ find(input: {handle: "x"}) }"#);
    assert!(data.is_null());
    assert!(
        errors[0].message.contains("unknown arg handle"),
        "unexpected message: {}",
        errors[0].message,
    );
}

#[test]
fn nested_input_objects_coerce_recursively() {
    use crate::{
        executor::FieldResult,
        schema::build::{
            input::{ArgumentDef, Arguments, FromArguments, FromInputValue},
            BuildError, SchemaBuilder, TypeResolver,
        },
    };

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Filter {
        text: Option<String>,
        nested: Option<Box<Filter>>,
    }

    impl FromInputValue for Filter {}

    struct FilterArgs {
        filter: Filter,
    }

    impl FromArguments for FilterArgs {
        fn arguments(resolver: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError> {
            Ok(vec![ArgumentDef::of::<Filter>(resolver, "filter")?])
        }

        fn from_arguments(args: &Arguments<'_>) -> FieldResult<Self> {
            Ok(Self {
                filter: args.get("filter")?,
            })
        }
    }

    let mut builder = SchemaBuilder::new();
    let mut filter = builder.input_object::<Filter>("Filter");
    filter.field_fn("text", |t: &mut Filter, v: Option<String>| {
        t.text = v;
    });
    filter.field_fn("nested", |t: &mut Filter, v: Option<Box<Filter>>| {
        t.nested = v;
    });

    builder.query().field_fn("depth", |args: &FilterArgs| {
        let mut depth = 0i64;
        let mut current = Some(&args.filter);
        while let Some(f) = current {
            depth += 1;
            current = f.nested.as_deref();
        }
        depth
    });

    let schema = builder.must_build();
    let data = execute_data(
        &schema,
        r#"{ depth(filter: {text: "a", nested: {nested: {text: "c"}}}) }"#,
    );
    assert_eq!(data.to_json_string(), r#"{"depth":3}"#);
}

#[test]
fn non_null_input_cycles_fail_the_build() {
    use crate::schema::build::{
        input::{ArgumentDef, Arguments, FromArguments, FromInputValue},
        BuildError, SchemaBuilder, TypeResolver,
    };
    use crate::executor::FieldResult;

    #[derive(Clone, Debug, Default)]
    struct Loop {
        next: Option<Box<Loop>>,
    }

    impl FromInputValue for Loop {}

    struct LoopArgs {
        #[allow(dead_code)]
        level: Loop,
    }

    impl FromArguments for LoopArgs {
        fn arguments(resolver: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError> {
            Ok(vec![ArgumentDef::of::<Loop>(resolver, "level")?])
        }

        fn from_arguments(args: &Arguments<'_>) -> FieldResult<Self> {
            Ok(Self {
                level: args.get("level")?,
            })
        }
    }

    let mut builder = SchemaBuilder::new();
    let mut reg = builder.input_object::<Loop>("Loop");
    // A required self-reference: no value could ever terminate.
    reg.field_fn("next", |t: &mut Loop, v: Box<Loop>| {
        t.next = Some(v);
    });
    builder
        .query()
        .field_fn("probe", |_args: &LoopArgs| 0i64);

    assert_eq!(
        builder.build().unwrap_err(),
        BuildError::InputObjectCycle("Loop".into()),
    );
}

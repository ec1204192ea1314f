//! End-to-end scenarios covering execution, directives, abstract types,
//! input coercion, error shaping and introspection.

mod directives;
mod enums;
mod errors;
mod http_requests;
mod input_objects;
mod interfaces_unions;
mod introspection_queries;
mod mutations;
mod resolver_errors;
mod variables;

pub(crate) mod support {
    use crate::{
        ast::Variables,
        errors::Error,
        executor::{Executor, FieldResult, RequestContext},
        http::{execute_request, GraphQLRequest},
        parser::parse_query,
        schema::build::{
            input::{ArgumentDef, Arguments, FromArguments, FromInputValue},
            BuildError, OutputValue, SchemaBuilder, TypeResolver,
        },
        schema::model::Schema,
        validation::validate_query,
        value::Value,
        ID,
    };

    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum Episode {
        NewHope,
        Empire,
        Jedi,
    }

    impl OutputValue for Episode {}
    impl FromInputValue for Episode {}

    #[derive(Clone, Debug)]
    pub struct Human {
        pub id: ID,
        pub name: String,
        pub home_planet: Option<String>,
        pub appears_in: Vec<Episode>,
    }

    #[derive(Clone, Debug)]
    pub struct Droid {
        pub id: ID,
        pub name: String,
        pub primary_function: String,
        pub appears_in: Vec<Episode>,
    }

    impl OutputValue for Human {}
    impl OutputValue for Droid {}

    #[derive(Clone, Debug)]
    pub enum Character {
        Human(Human),
        Droid(Droid),
    }

    #[derive(Clone, Debug)]
    pub enum SearchResult {
        Human(Human),
        Droid(Droid),
    }

    impl OutputValue for Character {}
    impl OutputValue for SearchResult {}

    #[derive(Clone, Debug, Default, Eq, PartialEq)]
    pub struct Identifier {
        pub id: Option<ID>,
        pub email: Option<String>,
    }

    impl FromInputValue for Identifier {}

    pub fn luke() -> Human {
        Human {
            id: ID::from("1000"),
            name: "Luke Skywalker".into(),
            home_planet: Some("Tatooine".into()),
            appears_in: vec![Episode::NewHope, Episode::Empire, Episode::Jedi],
        }
    }

    pub fn artoo() -> Droid {
        Droid {
            id: ID::from("2001"),
            name: "R2-D2".into(),
            primary_function: "Astromech".into(),
            appears_in: vec![Episode::NewHope, Episode::Empire, Episode::Jedi],
        }
    }

    pub struct MirrorArgs {
        pub value: i64,
    }

    impl FromArguments for MirrorArgs {
        fn arguments(resolver: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError> {
            Ok(vec![ArgumentDef::of::<i64>(resolver, "value")?])
        }

        fn from_arguments(args: &Arguments<'_>) -> FieldResult<Self> {
            Ok(Self {
                value: args.get("value")?,
            })
        }
    }

    pub struct HeroArgs {
        pub episode: Option<Episode>,
    }

    impl FromArguments for HeroArgs {
        fn arguments(resolver: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError> {
            Ok(vec![ArgumentDef::of::<Option<Episode>>(resolver, "episode")?])
        }

        fn from_arguments(args: &Arguments<'_>) -> FieldResult<Self> {
            Ok(Self {
                episode: args.get("episode")?,
            })
        }
    }

    pub struct HumanArgs {
        pub id: ID,
    }

    impl FromArguments for HumanArgs {
        fn arguments(resolver: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError> {
            Ok(vec![ArgumentDef::of::<ID>(resolver, "id")?])
        }

        fn from_arguments(args: &Arguments<'_>) -> FieldResult<Self> {
            Ok(Self {
                id: args.get("id")?,
            })
        }
    }

    pub struct SearchArgs {
        pub text: String,
    }

    impl FromArguments for SearchArgs {
        fn arguments(resolver: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError> {
            Ok(vec![ArgumentDef::of::<String>(resolver, "text")?])
        }

        fn from_arguments(args: &Arguments<'_>) -> FieldResult<Self> {
            Ok(Self {
                text: args.get("text")?,
            })
        }
    }

    pub struct FindArgs {
        pub input: Identifier,
    }

    impl FromArguments for FindArgs {
        fn arguments(resolver: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError> {
            Ok(vec![ArgumentDef::of::<Identifier>(resolver, "input")?])
        }

        fn from_arguments(args: &Arguments<'_>) -> FieldResult<Self> {
            Ok(Self {
                input: args.get("input")?,
            })
        }
    }

    /// The shared Star Wars flavored schema most scenarios run against.
    pub fn star_wars_schema() -> Schema {
        let mut builder = SchemaBuilder::new();

        builder.enum_type::<Episode>(
            "Episode",
            [
                ("NEWHOPE", Episode::NewHope),
                ("EMPIRE", Episode::Empire),
                ("JEDI", Episode::Jedi),
            ],
        );

        let mut human = builder.object::<Human>("Human");
        human.field_fn("id", |h: &Human| h.id.clone());
        human.field_fn("name", |h: &Human| h.name.clone());
        human.field_fn("homePlanet", |h: &Human| h.home_planet.clone());
        human.field_fn("appearsIn", |h: &Human| h.appears_in.clone());

        let mut droid = builder.object::<Droid>("Droid");
        droid.field_fn("id", |d: &Droid| d.id.clone());
        droid.field_fn("name", |d: &Droid| d.name.clone());
        droid.field_fn("primaryFunction", |d: &Droid| d.primary_function.clone());
        droid.field_fn("appearsIn", |d: &Droid| d.appears_in.clone());

        builder
            .interface::<Character>("Character")
            .member::<Human, _>(|c| match c {
                Character::Human(h) => Some(h),
                _ => None,
            })
            .member::<Droid, _>(|c| match c {
                Character::Droid(d) => Some(d),
                _ => None,
            });

        builder
            .union_type::<SearchResult>("SearchResult")
            .member::<Human, _>(|s| match s {
                SearchResult::Human(h) => Some(h),
                _ => None,
            })
            .member::<Droid, _>(|s| match s {
                SearchResult::Droid(d) => Some(d),
                _ => None,
            });

        let mut input = builder.input_object::<Identifier>("Identifier");
        input.mark_one_of();
        input.field_fn("id", |t: &mut Identifier, v: Option<ID>| {
            t.id = v;
        });
        input.field_fn("email", |t: &mut Identifier, v: Option<String>| {
            t.email = v;
        });

        let mut query = builder.query();
        query.field_fn("hero", |args: &HeroArgs| match args.episode {
            Some(Episode::Empire) => Character::Human(luke()),
            _ => Character::Droid(artoo()),
        });
        query.field_fn("node", || Character::Human(luke()));
        query.field_fn("human", |args: &HumanArgs| {
            (args.id.0 == "1000").then(luke)
        });
        query.field_fn("search", |args: &SearchArgs| {
            let mut results = Vec::new();
            if luke().name.to_lowercase().contains(&args.text.to_lowercase()) {
                results.push(SearchResult::Human(luke()));
            }
            if artoo().name.to_lowercase().contains(&args.text.to_lowercase()) {
                results.push(SearchResult::Droid(artoo()));
            }
            results
        });
        query.field_fn("find", |args: &FindArgs| match &args.input {
            Identifier { id: Some(id), .. } => format!("id:{id}"),
            Identifier {
                email: Some(email), ..
            } => format!("email:{email}"),
            _ => "none".into(),
        });
        query.field_fn("mirror", |args: &MirrorArgs| -args.value);

        builder.must_build()
    }

    /// Parse, validate and execute, panicking on parse failures.
    pub fn execute(schema: &Schema, source: &str) -> (Value, Vec<Error>) {
        execute_with(schema, source, Variables::new())
    }

    pub fn execute_with(
        schema: &Schema,
        source: &str,
        variables: Variables,
    ) -> (Value, Vec<Error>) {
        let query = parse_query(source, &variables).expect("query should parse");
        if let Err(e) = validate_query(schema, &query) {
            return (Value::Null, vec![e]);
        }
        Executor::new().execute(&RequestContext::new(), schema, &query)
    }

    /// Execute and assert the request produced data without errors.
    pub fn execute_data(schema: &Schema, source: &str) -> Value {
        let (data, errors) = execute(schema, source);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        data
    }

    /// Validate a query expected to break a rule, returning the error.
    pub fn validation_error(schema: &Schema, source: &str) -> Error {
        let query = parse_query(source, &Variables::new()).expect("query should parse");
        validate_query(schema, &query).expect_err("validation should fail")
    }

    /// The full request pipeline, serialized as the JSON envelope.
    pub fn execute_json(schema: &Schema, source: &str) -> String {
        execute_request(
            schema,
            &RequestContext::new(),
            &GraphQLRequest::new(source, None),
        )
        .to_json()
    }
}

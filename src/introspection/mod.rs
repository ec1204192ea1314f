//! Schema introspection.
//!
//! Implemented as an overlay schema registered through the public builder
//! API: the meta objects (`__Schema`, `__Type`, ...) mirror the user's
//! types through a thin wrapper over the primary type model, computed on
//! demand rather than copied. [`add_introspection`] merges the overlay's
//! query fields into the user's query type so one root serves both.

use std::sync::Arc;

use arcstr::ArcStr;

use crate::{
    schema::{
        build::{
            input::{ArgumentDef, Arguments, FromArguments},
            BuildError, OutputValue, SchemaBuilder, TypeResolver,
        },
        meta::{
            ArgumentMeta, EnumValueMeta, FieldMeta, InputFieldMeta, MetaType, TypeKind, TypeRef,
        },
        model::{DirectiveLocation, DirectiveType, Schema, SchemaType},
    },
    value::Value,
};

/// The canonical introspection query shipped for tooling. Parseable by
/// this crate's own parser and executable against any built schema.
pub const INTROSPECTION_QUERY: &str = include_str!("query.graphql");

/// A reference to one type of the introspected schema: the shared schema
/// metadata plus the wrapper spelling being described.
#[derive(Clone)]
pub struct TypeRecord {
    schema: Arc<SchemaType>,
    shape: TypeRef,
}

/// The `__Schema` value.
#[derive(Clone)]
pub struct SchemaRecord {
    schema: Arc<SchemaType>,
    type_names: Arc<Vec<ArcStr>>,
}

/// One `__Field` value, assembled on demand from the field meta.
#[derive(Clone)]
pub struct FieldRecord {
    name: String,
    description: Option<String>,
    args: Vec<InputValueRecord>,
    field_type: TypeRecord,
    is_deprecated: bool,
    deprecation_reason: Option<String>,
}

/// One `__InputValue` value.
#[derive(Clone)]
pub struct InputValueRecord {
    name: String,
    description: Option<String>,
    value_type: TypeRecord,
    default_value: Option<String>,
    is_deprecated: bool,
    deprecation_reason: Option<String>,
}

/// One `__EnumValue` value.
#[derive(Clone)]
pub struct EnumValueRecord {
    name: String,
    description: Option<String>,
    is_deprecated: bool,
    deprecation_reason: Option<String>,
}

/// One `__Directive` value.
#[derive(Clone)]
pub struct DirectiveRecord {
    name: String,
    description: Option<String>,
    locations: Vec<DirectiveLocation>,
    args: Vec<InputValueRecord>,
}

impl OutputValue for TypeRecord {}
impl OutputValue for SchemaRecord {}
impl OutputValue for FieldRecord {}
impl OutputValue for InputValueRecord {}
impl OutputValue for EnumValueRecord {}
impl OutputValue for DirectiveRecord {}
impl OutputValue for TypeKind {}
impl OutputValue for DirectiveLocation {}

impl TypeRecord {
    fn named(schema: &Arc<SchemaType>, name: &ArcStr) -> Self {
        TypeRecord {
            schema: Arc::clone(schema),
            shape: TypeRef::Named(name.clone()),
        }
    }

    fn of(schema: &Arc<SchemaType>, shape: &TypeRef) -> Self {
        TypeRecord {
            schema: Arc::clone(schema),
            shape: shape.clone(),
        }
    }

    fn concrete(&self) -> Option<&MetaType> {
        match &self.shape {
            TypeRef::Named(name) => self.schema.concrete_type_by_name(name),
            _ => None,
        }
    }

    fn kind(&self) -> TypeKind {
        match &self.shape {
            TypeRef::NonNull(_) => TypeKind::NonNull,
            TypeRef::List(_) => TypeKind::List,
            TypeRef::Named(_) => self
                .concrete()
                .map(MetaType::type_kind)
                .unwrap_or(TypeKind::Scalar),
        }
    }

    fn type_name(&self) -> Option<String> {
        self.concrete().map(|m| m.name().to_string())
    }

    fn description(&self) -> Option<String> {
        self.concrete()
            .and_then(|m| m.description().map(ToString::to_string))
    }

    fn of_type(&self) -> Option<TypeRecord> {
        match &self.shape {
            TypeRef::NonNull(inner) | TypeRef::List(inner) => {
                Some(TypeRecord::of(&self.schema, inner))
            }
            TypeRef::Named(_) => None,
        }
    }

    fn specified_by_url(&self) -> Option<String> {
        self.concrete()
            .and_then(|m| m.specified_by_url().map(ToString::to_string))
    }

    fn is_one_of(&self) -> Option<bool> {
        match self.concrete() {
            Some(MetaType::InputObject(io)) => Some(io.one_of),
            _ => None,
        }
    }

    fn fields(&self, include_deprecated: bool) -> Option<Vec<FieldRecord>> {
        let fields = match self.concrete()? {
            MetaType::Object(o) => &o.fields,
            MetaType::Interface(i) => &i.fields,
            _ => return None,
        };

        let mut records: Vec<FieldRecord> = fields
            .values()
            .filter(|f| include_deprecated || f.deprecation.is_none())
            .map(|f| FieldRecord::from_meta(&self.schema, f))
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Some(records)
    }

    fn input_fields(&self, include_deprecated: bool) -> Option<Vec<InputValueRecord>> {
        match self.concrete()? {
            MetaType::InputObject(io) => {
                let mut records: Vec<InputValueRecord> = io
                    .fields
                    .iter()
                    .filter(|f| include_deprecated || f.deprecation.is_none())
                    .map(|f| InputValueRecord::from_input_field(&self.schema, f))
                    .collect();
                records.sort_by(|a, b| a.name.cmp(&b.name));
                Some(records)
            }
            _ => None,
        }
    }

    fn interfaces(&self) -> Option<Vec<TypeRecord>> {
        match self.concrete()? {
            MetaType::Object(o) => {
                let mut records: Vec<TypeRecord> = o
                    .interfaces
                    .iter()
                    .map(|name| TypeRecord::named(&self.schema, name))
                    .collect();
                records.sort_by(|a, b| a.shape.to_string().cmp(&b.shape.to_string()));
                Some(records)
            }
            _ => None,
        }
    }

    fn possible_types(&self) -> Option<Vec<TypeRecord>> {
        let members = match self.concrete()? {
            MetaType::Union(u) => &u.members,
            MetaType::Interface(i) => &i.possible_types,
            _ => return None,
        };

        let mut records: Vec<TypeRecord> = members
            .iter()
            .map(|m| TypeRecord::named(&self.schema, &m.name))
            .collect();
        records.sort_by(|a, b| a.shape.to_string().cmp(&b.shape.to_string()));
        Some(records)
    }

    fn enum_values(&self, include_deprecated: bool) -> Option<Vec<EnumValueRecord>> {
        match self.concrete()? {
            MetaType::Enum(e) => {
                let mut records: Vec<EnumValueRecord> = e
                    .values
                    .iter()
                    .filter(|v| include_deprecated || v.deprecation.is_none())
                    .map(EnumValueRecord::from_meta)
                    .collect();
                records.sort_by(|a, b| a.name.cmp(&b.name));
                Some(records)
            }
            _ => None,
        }
    }

    // Type-system directives attached to this type, computed on demand
    // from the underlying meta.
    fn directives(&self) -> Vec<DirectiveRecord> {
        match self.concrete() {
            Some(MetaType::InputObject(io)) if io.one_of => self
                .schema
                .directives()
                .iter()
                .filter(|d| d.name == "oneOf")
                .map(|d| DirectiveRecord::from_meta(&self.schema, d))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl FieldRecord {
    fn from_meta(schema: &Arc<SchemaType>, field: &FieldMeta) -> Self {
        let mut args: Vec<InputValueRecord> = field
            .arguments
            .iter()
            .map(|a| InputValueRecord::from_argument(schema, a))
            .collect();
        args.sort_by(|a, b| a.name.cmp(&b.name));

        FieldRecord {
            name: field.name.to_string(),
            description: field.description.as_ref().map(ToString::to_string),
            args,
            field_type: TypeRecord::of(schema, &field.field_type),
            is_deprecated: field.deprecation.is_some(),
            deprecation_reason: field.deprecation.as_ref().map(ToString::to_string),
        }
    }
}

impl InputValueRecord {
    fn from_argument(schema: &Arc<SchemaType>, arg: &ArgumentMeta) -> Self {
        InputValueRecord {
            name: arg.name.to_string(),
            description: arg.description.as_ref().map(ToString::to_string),
            value_type: TypeRecord::of(schema, &arg.arg_type),
            default_value: arg.default_value.as_ref().map(render_default),
            is_deprecated: arg.deprecation.is_some(),
            deprecation_reason: arg.deprecation.as_ref().map(ToString::to_string),
        }
    }

    fn from_input_field(schema: &Arc<SchemaType>, field: &InputFieldMeta) -> Self {
        InputValueRecord {
            name: field.name.to_string(),
            description: field.description.as_ref().map(ToString::to_string),
            value_type: TypeRecord::of(schema, &field.field_type),
            default_value: field.default_value.as_ref().map(render_default),
            is_deprecated: field.deprecation.is_some(),
            deprecation_reason: field.deprecation.as_ref().map(ToString::to_string),
        }
    }
}

// Strings render bare, everything else as compact JSON.
fn render_default(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_json_string(),
    }
}

impl EnumValueRecord {
    fn from_meta(value: &EnumValueMeta) -> Self {
        EnumValueRecord {
            name: value.name.to_string(),
            description: value.description.as_ref().map(ToString::to_string),
            is_deprecated: value.deprecation.is_some(),
            deprecation_reason: value.deprecation.as_ref().map(ToString::to_string),
        }
    }
}

impl DirectiveRecord {
    fn from_meta(schema: &Arc<SchemaType>, directive: &DirectiveType) -> Self {
        let mut args: Vec<InputValueRecord> = directive
            .arguments
            .iter()
            .map(|a| InputValueRecord::from_argument(schema, a))
            .collect();
        args.sort_by(|a, b| a.name.cmp(&b.name));

        DirectiveRecord {
            name: directive.name.to_string(),
            description: directive.description.as_ref().map(ToString::to_string),
            locations: directive.locations.clone(),
            args,
        }
    }
}

#[derive(Clone)]
struct Introspection {
    schema: Arc<SchemaType>,
    type_names: Arc<Vec<ArcStr>>,
}

impl Introspection {
    fn schema_record(&self) -> SchemaRecord {
        SchemaRecord {
            schema: Arc::clone(&self.schema),
            type_names: Arc::clone(&self.type_names),
        }
    }

    fn type_record(&self, name: &str) -> Option<TypeRecord> {
        self.type_names
            .iter()
            .find(|n| n.as_str() == name)
            .map(|n| TypeRecord::named(&self.schema, n))
    }
}

struct IncludeDeprecatedArgs {
    include_deprecated: Option<bool>,
}

impl FromArguments for IncludeDeprecatedArgs {
    fn arguments(resolver: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError> {
        Ok(vec![ArgumentDef::of::<Option<bool>>(
            resolver,
            "includeDeprecated",
        )?
        .default_value(Value::Boolean(false))])
    }

    fn from_arguments(args: &Arguments<'_>) -> Result<Self, crate::executor::FieldError> {
        Ok(IncludeDeprecatedArgs {
            include_deprecated: args.get("includeDeprecated")?,
        })
    }
}

impl IncludeDeprecatedArgs {
    fn flag(&self) -> bool {
        self.include_deprecated.unwrap_or(false)
    }
}

struct TypeNameArgs {
    name: String,
}

impl FromArguments for TypeNameArgs {
    fn arguments(resolver: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError> {
        Ok(vec![ArgumentDef::of::<String>(resolver, "name")?])
    }

    fn from_arguments(args: &Arguments<'_>) -> Result<Self, crate::executor::FieldError> {
        Ok(TypeNameArgs {
            name: args.get("name")?,
        })
    }
}

fn register_schema_object(builder: &mut SchemaBuilder) {
    let mut obj = builder.object::<SchemaRecord>("__Schema");
    obj.field_fn("types", |s: &SchemaRecord| {
        s.type_names
            .iter()
            .map(|n| TypeRecord::named(&s.schema, n))
            .collect::<Vec<_>>()
    });
    obj.field_fn("queryType", |s: &SchemaRecord| {
        Some(TypeRecord::named(&s.schema, &s.schema.query_type_name))
    });
    obj.field_fn("mutationType", |s: &SchemaRecord| {
        s.schema
            .mutation_type_name
            .as_ref()
            .map(|n| TypeRecord::named(&s.schema, n))
    });
    obj.field_fn("subscriptionType", |s: &SchemaRecord| {
        s.schema
            .subscription_type_name
            .as_ref()
            .map(|n| TypeRecord::named(&s.schema, n))
    });
    obj.field_fn("directives", |s: &SchemaRecord| {
        s.schema
            .directives()
            .iter()
            .map(|d| DirectiveRecord::from_meta(&s.schema, d))
            .collect::<Vec<_>>()
    });
}

fn register_type_object(builder: &mut SchemaBuilder) {
    let mut obj = builder.object::<TypeRecord>("__Type");
    obj.field_fn("kind", |t: &TypeRecord| t.kind());
    obj.field_fn("name", |t: &TypeRecord| t.type_name());
    obj.field_fn("description", |t: &TypeRecord| t.description());
    obj.field_fn("specifiedByURL", |t: &TypeRecord| t.specified_by_url());
    obj.field_fn("isOneOf", |t: &TypeRecord| t.is_one_of());
    obj.field_fn("ofType", |t: &TypeRecord| t.of_type());
    obj.field_fn(
        "fields",
        |t: &TypeRecord, args: &IncludeDeprecatedArgs| t.fields(args.flag()),
    );
    obj.field_fn(
        "inputFields",
        |t: &TypeRecord, args: &IncludeDeprecatedArgs| t.input_fields(args.flag()),
    );
    obj.field_fn("interfaces", |t: &TypeRecord| t.interfaces());
    obj.field_fn("possibleTypes", |t: &TypeRecord| t.possible_types());
    obj.field_fn(
        "enumValues",
        |t: &TypeRecord, args: &IncludeDeprecatedArgs| t.enum_values(args.flag()),
    );
    obj.field_fn("directives", |t: &TypeRecord| t.directives());
}

fn register_field_object(builder: &mut SchemaBuilder) {
    let mut obj = builder.object::<FieldRecord>("__Field");
    obj.field_fn("name", |f: &FieldRecord| f.name.clone());
    obj.field_fn("description", |f: &FieldRecord| f.description.clone());
    obj.field_fn("args", |f: &FieldRecord| f.args.clone());
    obj.field_fn("type", |f: &FieldRecord| f.field_type.clone());
    obj.field_fn("isDeprecated", |f: &FieldRecord| f.is_deprecated);
    obj.field_fn("deprecationReason", |f: &FieldRecord| {
        f.deprecation_reason.clone()
    });
}

fn register_input_value_object(builder: &mut SchemaBuilder) {
    let mut obj = builder.object::<InputValueRecord>("__InputValue");
    obj.field_fn("name", |v: &InputValueRecord| v.name.clone());
    obj.field_fn("description", |v: &InputValueRecord| v.description.clone());
    obj.field_fn("type", |v: &InputValueRecord| v.value_type.clone());
    obj.field_fn("defaultValue", |v: &InputValueRecord| {
        v.default_value.clone()
    });
    obj.field_fn("isDeprecated", |v: &InputValueRecord| v.is_deprecated);
    obj.field_fn("deprecationReason", |v: &InputValueRecord| {
        v.deprecation_reason.clone()
    });
}

fn register_enum_value_object(builder: &mut SchemaBuilder) {
    let mut obj = builder.object::<EnumValueRecord>("__EnumValue");
    obj.field_fn("name", |v: &EnumValueRecord| v.name.clone());
    obj.field_fn("description", |v: &EnumValueRecord| v.description.clone());
    obj.field_fn("isDeprecated", |v: &EnumValueRecord| v.is_deprecated);
    obj.field_fn("deprecationReason", |v: &EnumValueRecord| {
        v.deprecation_reason.clone()
    });
}

fn register_directive_object(builder: &mut SchemaBuilder) {
    let mut obj = builder.object::<DirectiveRecord>("__Directive");
    obj.field_fn("name", |d: &DirectiveRecord| d.name.clone());
    obj.field_fn("description", |d: &DirectiveRecord| d.description.clone());
    obj.field_fn("locations", |d: &DirectiveRecord| d.locations.clone());
    obj.field_fn("args", |d: &DirectiveRecord| d.args.clone());
}

fn register_enums(builder: &mut SchemaBuilder) {
    builder.enum_type::<TypeKind>(
        "__TypeKind",
        [
            ("SCALAR", TypeKind::Scalar),
            ("OBJECT", TypeKind::Object),
            ("INTERFACE", TypeKind::Interface),
            ("UNION", TypeKind::Union),
            ("ENUM", TypeKind::Enum),
            ("INPUT_OBJECT", TypeKind::InputObject),
            ("LIST", TypeKind::List),
            ("NON_NULL", TypeKind::NonNull),
        ],
    );

    builder.enum_type::<DirectiveLocation>(
        "__DirectiveLocation",
        [
            ("QUERY", DirectiveLocation::Query),
            ("MUTATION", DirectiveLocation::Mutation),
            ("SUBSCRIPTION", DirectiveLocation::Subscription),
            ("FIELD", DirectiveLocation::Field),
            ("FRAGMENT_DEFINITION", DirectiveLocation::FragmentDefinition),
            ("FRAGMENT_SPREAD", DirectiveLocation::FragmentSpread),
            ("INLINE_FRAGMENT", DirectiveLocation::InlineFragment),
            ("SCALAR", DirectiveLocation::Scalar),
            (
                "ARGUMENT_DEFINITION",
                DirectiveLocation::ArgumentDefinition,
            ),
            (
                "INPUT_FIELD_DEFINITION",
                DirectiveLocation::InputFieldDefinition,
            ),
            ("INPUT_OBJECT", DirectiveLocation::InputObject),
        ],
    );
}

fn register_query(builder: &mut SchemaBuilder, introspection: &Introspection) {
    let mut query = builder.query();

    let is = introspection.clone();
    query.field_fn("__schema", move || is.schema_record());

    let is = introspection.clone();
    query.field_fn("__type", move |args: &TypeNameArgs| {
        is.type_record(&args.name)
    });
}

// Reachability walk over the user's types, mirroring what the schema build
// indexed but restricted to what a root can actually reach.
fn collect_types(schema: &SchemaType) -> Vec<ArcStr> {
    fn visit(schema: &SchemaType, name: &ArcStr, seen: &mut Vec<ArcStr>) {
        if seen.contains(name) {
            return;
        }
        let Some(meta) = schema.concrete_type_by_name(name) else {
            return;
        };
        seen.push(name.clone());

        match meta {
            MetaType::Object(o) => {
                for field in o.fields.values() {
                    visit(schema, field.field_type.innermost_name(), seen);
                    for arg in &field.arguments {
                        visit(schema, arg.arg_type.innermost_name(), seen);
                    }
                }
            }
            MetaType::Interface(i) => {
                for field in i.fields.values() {
                    visit(schema, field.field_type.innermost_name(), seen);
                    for arg in &field.arguments {
                        visit(schema, arg.arg_type.innermost_name(), seen);
                    }
                }
                for member in &i.possible_types {
                    visit(schema, &member.name, seen);
                }
            }
            MetaType::Union(u) => {
                for member in &u.members {
                    visit(schema, &member.name, seen);
                }
            }
            MetaType::InputObject(io) => {
                for field in &io.fields {
                    visit(schema, field.field_type.innermost_name(), seen);
                }
            }
            MetaType::Scalar(..) | MetaType::Enum(..) => {}
        }
    }

    let mut seen = Vec::new();
    visit(schema, &schema.query_type_name, &mut seen);
    if let Some(name) = &schema.mutation_type_name {
        visit(schema, name, &mut seen);
    }
    if let Some(name) = &schema.subscription_type_name {
        visit(schema, name, &mut seen);
    }
    seen.sort();
    seen
}

/// Merge the introspection fields into the schema's query type, producing
/// a schema that serves both the user's fields and `__schema`/`__type`.
pub fn add_introspection(schema: Schema) -> Result<Schema, BuildError> {
    let user = schema.arc();
    let introspection = Introspection {
        type_names: Arc::new(collect_types(&user)),
        schema: Arc::clone(&user),
    };

    let mut builder = SchemaBuilder::new();
    register_enums(&mut builder);
    register_directive_object(&mut builder);
    register_enum_value_object(&mut builder);
    register_field_object(&mut builder);
    register_input_value_object(&mut builder);
    register_schema_object(&mut builder);
    register_type_object(&mut builder);
    register_query(&mut builder, &introspection);
    let overlay = builder.build()?;
    let overlay = overlay.arc();

    let mut types = user.types.clone();

    let mut query_meta = match user.types.get(&user.query_type_name) {
        Some(MetaType::Object(o)) => o.clone(),
        _ => {
            return Err(BuildError::UnknownReference(
                user.query_type_name.to_string(),
                "introspection".into(),
            ));
        }
    };
    if let Some(MetaType::Object(overlay_query)) = overlay.types.get(&overlay.query_type_name) {
        for (name, field) in &overlay_query.fields {
            query_meta.fields.insert(name.clone(), field.clone());
        }
    }
    types.insert(user.query_type_name.clone(), MetaType::Object(query_meta));

    for (name, meta) in &overlay.types {
        if name == &overlay.query_type_name {
            continue;
        }
        types.entry(name.clone()).or_insert_with(|| meta.clone());
    }

    let mut input_context = user.input_context.clone();
    input_context
        .enums
        .extend(overlay.input_context.enums.clone());
    input_context
        .input_objects
        .extend(overlay.input_context.input_objects.clone());

    Ok(Schema {
        types: Arc::new(SchemaType {
            types,
            query_type_name: user.query_type_name.clone(),
            mutation_type_name: user.mutation_type_name.clone(),
            subscription_type_name: user.subscription_type_name.clone(),
            directives: user.directives.clone(),
            input_context,
        }),
    })
}

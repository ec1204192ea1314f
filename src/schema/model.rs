//! The built, immutable schema.

use std::sync::Arc;

use arcstr::ArcStr;
use fnv::FnvHashMap;

use crate::{
    schema::meta::{ArgumentMeta, InputContext, MetaType, TypeRef},
    value::Value,
};

/// Metadata for a built schema: the name-keyed type index, the root type
/// names, the directive table and the input coercion registry. Immutable
/// and shared read-only across all requests.
#[derive(Debug)]
pub struct SchemaType {
    pub(crate) types: FnvHashMap<ArcStr, MetaType>,
    pub(crate) query_type_name: ArcStr,
    pub(crate) mutation_type_name: Option<ArcStr>,
    pub(crate) subscription_type_name: Option<ArcStr>,
    pub(crate) directives: Vec<DirectiveType>,
    pub(crate) input_context: InputContext,
}

/// A directive the schema advertises through introspection.
#[derive(Clone, Debug)]
pub struct DirectiveType {
    /// The directive name, without the leading `@`.
    pub name: ArcStr,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// The locations the directive may appear at.
    pub locations: Vec<DirectiveLocation>,
    /// The directive's arguments.
    pub arguments: Vec<ArgumentMeta>,
}

/// Where a directive may be applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[expect(missing_docs, reason = "self-explanatory")]
pub enum DirectiveLocation {
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
    Scalar,
    ArgumentDefinition,
    InputFieldDefinition,
    InputObject,
}

impl DirectiveLocation {
    /// The spec spelling of this location.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "QUERY",
            Self::Mutation => "MUTATION",
            Self::Subscription => "SUBSCRIPTION",
            Self::Field => "FIELD",
            Self::FragmentDefinition => "FRAGMENT_DEFINITION",
            Self::FragmentSpread => "FRAGMENT_SPREAD",
            Self::InlineFragment => "INLINE_FRAGMENT",
            Self::Scalar => "SCALAR",
            Self::ArgumentDefinition => "ARGUMENT_DEFINITION",
            Self::InputFieldDefinition => "INPUT_FIELD_DEFINITION",
            Self::InputObject => "INPUT_OBJECT",
        }
    }
}

impl DirectiveType {
    /// The built-in `@include` directive.
    pub fn include() -> Self {
        DirectiveType {
            name: arcstr::literal!("include"),
            description: Some(arcstr::literal!(
                "Directs the executor to include this field or fragment only \
                 when the `if` argument is true."
            )),
            locations: vec![
                DirectiveLocation::Field,
                DirectiveLocation::FragmentSpread,
                DirectiveLocation::InlineFragment,
            ],
            arguments: vec![ArgumentMeta {
                name: arcstr::literal!("if"),
                arg_type: TypeRef::named("Boolean").non_null(),
                description: Some(arcstr::literal!("Included when true.")),
                deprecation: None,
                default_value: None,
            }],
        }
    }

    /// The built-in `@skip` directive.
    pub fn skip() -> Self {
        DirectiveType {
            name: arcstr::literal!("skip"),
            description: Some(arcstr::literal!(
                "Directs the executor to skip this field or fragment only \
                 when the `if` argument is true."
            )),
            locations: vec![
                DirectiveLocation::Field,
                DirectiveLocation::FragmentSpread,
                DirectiveLocation::InlineFragment,
            ],
            arguments: vec![ArgumentMeta {
                name: arcstr::literal!("if"),
                arg_type: TypeRef::named("Boolean").non_null(),
                description: Some(arcstr::literal!("Skipped when true.")),
                deprecation: None,
                default_value: None,
            }],
        }
    }

    /// The built-in `@specifiedBy` directive.
    pub fn specified_by() -> Self {
        DirectiveType {
            name: arcstr::literal!("specifiedBy"),
            description: Some(arcstr::literal!(
                "Exposes a URL that specifies the behaviour of this scalar."
            )),
            locations: vec![DirectiveLocation::Scalar],
            arguments: vec![ArgumentMeta {
                name: arcstr::literal!("url"),
                arg_type: TypeRef::named("String").non_null(),
                description: Some(arcstr::literal!(
                    "The URL that specifies the behaviour of this scalar."
                )),
                deprecation: None,
                default_value: None,
            }],
        }
    }

    /// The built-in `@deprecated` directive.
    pub fn deprecated() -> Self {
        DirectiveType {
            name: arcstr::literal!("deprecated"),
            description: Some(arcstr::literal!(
                "Marks an element of a GraphQL schema as no longer supported."
            )),
            locations: vec![
                DirectiveLocation::Field,
                DirectiveLocation::ArgumentDefinition,
                DirectiveLocation::InputFieldDefinition,
            ],
            arguments: vec![ArgumentMeta {
                name: arcstr::literal!("reason"),
                arg_type: TypeRef::named("String"),
                description: Some(arcstr::literal!(
                    "Explains why this element was deprecated, usually also \
                     including a suggestion for how to access supported \
                     similar data."
                )),
                deprecation: None,
                default_value: Some(Value::string("No longer supported")),
            }],
        }
    }

    /// The built-in `@oneOf` directive.
    pub fn one_of() -> Self {
        DirectiveType {
            name: arcstr::literal!("oneOf"),
            description: Some(arcstr::literal!(
                "Indicates that an Input Object is a OneOf Input Object (and \
                 thus requires exactly one field to be set in a query or \
                 mutation)."
            )),
            locations: vec![DirectiveLocation::InputObject],
            arguments: Vec::new(),
        }
    }

    /// All directives every schema advertises.
    pub fn built_in() -> Vec<Self> {
        vec![
            Self::include(),
            Self::skip(),
            Self::specified_by(),
            Self::deprecated(),
            Self::one_of(),
        ]
    }
}

impl SchemaType {
    /// Look up a named type.
    pub fn concrete_type_by_name(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    /// The query root type.
    pub fn query_type(&self) -> &MetaType {
        self.types
            .get(&self.query_type_name)
            .expect("query root type is always registered")
    }

    /// The mutation root type, when one was registered.
    pub fn mutation_type(&self) -> Option<&MetaType> {
        self.mutation_type_name
            .as_ref()
            .and_then(|n| self.types.get(n))
    }

    /// The subscription root type, when one was registered.
    pub fn subscription_type(&self) -> Option<&MetaType> {
        self.subscription_type_name
            .as_ref()
            .and_then(|n| self.types.get(n))
    }

    /// The directives this schema advertises.
    pub fn directives(&self) -> &[DirectiveType] {
        &self.directives
    }

    /// The per-schema input coercion registry.
    pub fn input_context(&self) -> &InputContext {
        &self.input_context
    }
}

/// A built schema: an [`Arc`] over [`SchemaType`], cheap to clone and share.
#[derive(Clone, Debug)]
pub struct Schema {
    pub(crate) types: Arc<SchemaType>,
}

impl Schema {
    /// The underlying schema metadata.
    pub fn schema_type(&self) -> &SchemaType {
        &self.types
    }

    /// The shared handle to the schema metadata.
    pub fn arc(&self) -> Arc<SchemaType> {
        Arc::clone(&self.types)
    }
}

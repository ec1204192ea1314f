//! The internal typed representation of GraphQL types.
//!
//! Use-sites spell a type as a [`TypeRef`] (name plus list/non-null
//! wrappers); the named payloads live in the schema's type index as
//! [`MetaType`] variants. Within one built schema, type identity and type
//! name coincide; every build produces fresh metas.

use std::{any::Any, fmt, sync::Arc};

use arcstr::ArcStr;
use indexmap::IndexMap;

use crate::{
    ast::{ParsedArgs, SelectionSet},
    executor::{FieldError, RequestContext},
    value::Value,
};

/// A type-erased value owned by the executor.
pub type BoxAny = Box<dyn Any + Send + Sync>;

/// Computes the value of a field given context, source, parsed arguments and
/// the subselection.
pub type Resolver = Arc<
    dyn Fn(
            &RequestContext,
            &dyn Any,
            &ParsedArgs,
            Option<&SelectionSet>,
        ) -> Result<FieldValue, FieldError>
        + Send
        + Sync,
>;

/// Coerces a raw argument object into the typed argument record a resolver
/// expects. Invoked once per selection; the result is cached on the
/// selection.
pub type ArgumentParser =
    Arc<dyn Fn(&Value, &InputContext) -> Result<ParsedArgs, FieldError> + Send + Sync>;

/// Parses one input position (scalar, enum or input object) into a boxed
/// native value.
pub type InputParser =
    Arc<dyn Fn(&Value, &InputContext) -> Result<BoxAny, FieldError> + Send + Sync>;

/// Renders a native value at a scalar position into an output [`Value`].
pub type ScalarSerializer = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;

/// Maps a native enum value back to its GraphQL name.
pub type EnumNamer = Arc<dyn Fn(&dyn Any) -> Option<ArcStr> + Send + Sync>;

/// Extracts the member value out of an interface or union carrier.
pub type Caster = Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;

/// The per-schema registry of input coercers, looked up by the native type
/// of the value being parsed. Threaded through every input parser so that
/// cyclic input objects resolve lazily.
#[derive(Clone, Default)]
pub struct InputContext {
    pub(crate) enums: fnv::FnvHashMap<std::any::TypeId, InputParser>,
    pub(crate) input_objects: fnv::FnvHashMap<std::any::TypeId, InputParser>,
}

impl InputContext {
    /// Parse `value` into the native type `T`, consulting the scalar
    /// registry, then registered enums, then registered input objects.
    pub fn parse<T: Any + Send + Sync>(&self, value: &Value) -> Result<T, FieldError> {
        let id = std::any::TypeId::of::<T>();

        let parser = crate::schema::build::scalars::parser_for(id)
            .or_else(|| self.enums.get(&id).cloned())
            .or_else(|| self.input_objects.get(&id).cloned());

        let Some(parser) = parser else {
            return Err(FieldError::new(format!(
                "{} is not usable as an input type",
                std::any::type_name::<T>(),
            )));
        };

        parser(value, self)?
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| FieldError::new("input parser produced a mismatched type"))
    }
}

impl fmt::Debug for InputContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputContext")
            .field("enums", &self.enums.len())
            .field("input_objects", &self.input_objects.len())
            .finish()
    }
}

/// The value a resolver hands back to the executor: null, a list, or a
/// type-erased item that downstream resolvers and coercions interpret
/// against the expected type.
pub enum FieldValue {
    /// The absence of a value.
    Null,
    /// A list of values.
    List(Vec<FieldValue>),
    /// A native leaf or composite value.
    Item(BoxAny),
}

impl FieldValue {
    /// Wrap a native value.
    pub fn item<T: Any + Send + Sync>(value: T) -> Self {
        Self::Item(Box::new(value))
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::List(l) => f.debug_list().entries(l.iter().map(|_| "..")).finish(),
            Self::Item(_) => f.write_str("Item(..)"),
        }
    }
}

/// How a field, argument or input field spells its type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TypeRef {
    /// A named type, resolved through the schema's type index.
    Named(ArcStr),
    /// A non-null wrapper; never wraps another non-null.
    NonNull(Box<TypeRef>),
    /// A list wrapper.
    List(Box<TypeRef>),
}

impl TypeRef {
    /// A reference to the named type.
    pub fn named(name: impl Into<ArcStr>) -> Self {
        Self::Named(name.into())
    }

    /// Wrap in non-null; a no-op when already non-null.
    #[must_use]
    pub fn non_null(self) -> Self {
        match self {
            Self::NonNull(_) => self,
            other => Self::NonNull(Box::new(other)),
        }
    }

    /// Wrap in a list.
    #[must_use]
    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }

    /// Drop the outermost non-null wrapper, if any.
    #[must_use]
    pub fn nullable(self) -> Self {
        match self {
            Self::NonNull(inner) => *inner,
            other => other,
        }
    }

    /// Whether this reference can only represent non-null values.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// The name of the innermost named type.
    pub fn innermost_name(&self) -> &ArcStr {
        match self {
            Self::Named(name) => name,
            Self::NonNull(inner) | Self::List(inner) => inner.innermost_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::NonNull(inner) => write!(f, "{inner}!"),
            Self::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

/// The GraphQL type kinds, as reported by `__Type.kind`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TypeKind {
    /// A leaf value with custom coercion.
    Scalar,
    /// A value with fields.
    Object,
    /// An abstract type with shared fields.
    Interface,
    /// An abstract type with object members only.
    Union,
    /// A leaf value drawn from a fixed name set.
    Enum,
    /// A composite input value.
    InputObject,
    /// A list wrapper.
    List,
    /// A non-null wrapper.
    NonNull,
}

impl TypeKind {
    /// The spec spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Object => "OBJECT",
            Self::Interface => "INTERFACE",
            Self::Union => "UNION",
            Self::Enum => "ENUM",
            Self::InputObject => "INPUT_OBJECT",
            Self::List => "LIST",
            Self::NonNull => "NON_NULL",
        }
    }
}

/// Scalar type metadata, with its coercion functions.
#[derive(Clone)]
pub struct ScalarMeta {
    /// The GraphQL type name.
    pub name: ArcStr,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// The `@specifiedBy` URL, when one was registered.
    pub specified_by_url: Option<ArcStr>,
    /// From-input coercion.
    pub parse: InputParser,
    /// To-output coercion.
    pub serialize: ScalarSerializer,
}

/// Enum type metadata.
#[derive(Clone)]
pub struct EnumMeta {
    /// The GraphQL type name.
    pub name: ArcStr,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// The declared values, in registration order.
    pub values: Vec<EnumValueMeta>,
    /// Maps a native value back to its GraphQL name.
    pub to_name: EnumNamer,
}

/// One declared enum value.
#[derive(Clone, Debug)]
pub struct EnumValueMeta {
    /// The GraphQL name of the value.
    pub name: ArcStr,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// Deprecation reason, when deprecated.
    pub deprecation: Option<ArcStr>,
}

/// One selectable field on an object or interface.
#[derive(Clone)]
pub struct FieldMeta {
    /// The field name.
    pub name: ArcStr,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// Deprecation reason, when deprecated.
    pub deprecation: Option<ArcStr>,
    /// The result type.
    pub field_type: TypeRef,
    /// Declared arguments, in declaration order.
    pub arguments: Vec<ArgumentMeta>,
    /// Computes the field value.
    pub resolver: Resolver,
    /// Coerces raw arguments into the typed record, once per selection.
    pub parse_arguments: ArgumentParser,
    /// Reserved hook: resolved outside this service.
    pub external: bool,
    /// Reserved hook: costly to resolve.
    pub expensive: bool,
    /// Reserved hook: deferred resolution.
    pub lazy: bool,
}

impl fmt::Debug for FieldMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMeta")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// One declared argument of a field or directive.
#[derive(Clone, Debug)]
pub struct ArgumentMeta {
    /// The argument name.
    pub name: ArcStr,
    /// The argument type.
    pub arg_type: TypeRef,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// Deprecation reason, when deprecated.
    pub deprecation: Option<ArcStr>,
    /// Default value applied when the argument is absent.
    pub default_value: Option<Value>,
}

/// Object type metadata.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// The GraphQL type name.
    pub name: ArcStr,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// The fields, in registration order.
    pub fields: IndexMap<ArcStr, FieldMeta>,
    /// Names of the interfaces this object implements.
    pub interfaces: Vec<ArcStr>,
    /// The field that identifies values of this object, when declared.
    pub key_field: Option<ArcStr>,
}

/// A member of an interface or union, with the caster that extracts its
/// value from the carrier.
#[derive(Clone)]
pub struct MemberMeta {
    /// The member object's type name.
    pub name: ArcStr,
    /// Extracts the member value from a carrier value.
    pub cast: Caster,
}

impl fmt::Debug for MemberMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberMeta").field("name", &self.name).finish()
    }
}

/// Interface type metadata.
#[derive(Clone, Debug)]
pub struct InterfaceMeta {
    /// The GraphQL type name.
    pub name: ArcStr,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// The fields shared by every implementer.
    pub fields: IndexMap<ArcStr, FieldMeta>,
    /// The implementing objects.
    pub possible_types: Vec<MemberMeta>,
}

/// Union type metadata.
#[derive(Clone, Debug)]
pub struct UnionMeta {
    /// The GraphQL type name.
    pub name: ArcStr,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// The member objects.
    pub members: Vec<MemberMeta>,
}

/// Input object type metadata.
#[derive(Clone, Debug)]
pub struct InputObjectMeta {
    /// The GraphQL type name.
    pub name: ArcStr,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// The input fields, in registration order.
    pub fields: Vec<InputFieldMeta>,
    /// Whether exactly one non-null field must be supplied.
    pub one_of: bool,
}

/// One field of an input object.
#[derive(Clone, Debug)]
pub struct InputFieldMeta {
    /// The input field name.
    pub name: ArcStr,
    /// The input field type.
    pub field_type: TypeRef,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// Deprecation reason, when deprecated.
    pub deprecation: Option<ArcStr>,
    /// Default value, when declared.
    pub default_value: Option<Value>,
}

/// A named type in the schema's index.
#[derive(Clone, Debug)]
pub enum MetaType {
    /// A scalar.
    Scalar(ScalarMeta),
    /// An enum.
    Enum(EnumMeta),
    /// An object.
    Object(ObjectMeta),
    /// An interface.
    Interface(InterfaceMeta),
    /// A union.
    Union(UnionMeta),
    /// An input object.
    InputObject(InputObjectMeta),
}

impl fmt::Debug for ScalarMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarMeta")
            .field("name", &self.name)
            .field("specified_by_url", &self.specified_by_url)
            .finish()
    }
}

impl fmt::Debug for EnumMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumMeta")
            .field("name", &self.name)
            .field("values", &self.values)
            .finish()
    }
}

impl MetaType {
    /// The type name.
    pub fn name(&self) -> &ArcStr {
        match self {
            Self::Scalar(s) => &s.name,
            Self::Enum(e) => &e.name,
            Self::Object(o) => &o.name,
            Self::Interface(i) => &i.name,
            Self::Union(u) => &u.name,
            Self::InputObject(io) => &io.name,
        }
    }

    /// The type description, when present.
    pub fn description(&self) -> Option<&ArcStr> {
        match self {
            Self::Scalar(s) => s.description.as_ref(),
            Self::Enum(e) => e.description.as_ref(),
            Self::Object(o) => o.description.as_ref(),
            Self::Interface(i) => i.description.as_ref(),
            Self::Union(u) => u.description.as_ref(),
            Self::InputObject(io) => io.description.as_ref(),
        }
    }

    /// The `__TypeKind` of this type.
    pub fn type_kind(&self) -> TypeKind {
        match self {
            Self::Scalar(..) => TypeKind::Scalar,
            Self::Enum(..) => TypeKind::Enum,
            Self::Object(..) => TypeKind::Object,
            Self::Interface(..) => TypeKind::Interface,
            Self::Union(..) => TypeKind::Union,
            Self::InputObject(..) => TypeKind::InputObject,
        }
    }

    /// The `@specifiedBy` URL for custom scalars bearing one.
    pub fn specified_by_url(&self) -> Option<&ArcStr> {
        match self {
            Self::Scalar(s) => s.specified_by_url.as_ref(),
            _ => None,
        }
    }

    /// Look up a field on an object or interface.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldMeta> {
        match self {
            Self::Object(o) => o.fields.get(name),
            Self::Interface(i) => i.fields.get(name),
            _ => None,
        }
    }

    /// Scalars and enums are leaves.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Scalar(..) | Self::Enum(..))
    }
}

//! The schema builder: registrations in, resolved immutable schema out.
//!
//! Native types are registered with explicit builder calls; the two small
//! traits [`OutputValue`] and [`FromInputValue`](input::FromInputValue)
//! resolve native types to GraphQL types by type identity, so forward
//! references work and nothing is resolved until [`SchemaBuilder::build`]
//! runs.

pub mod field;
pub mod input;
pub mod scalars;

use std::{
    any::{Any, TypeId},
    marker::PhantomData,
    sync::Arc,
};

use arcstr::ArcStr;
use derive_more::{Display, Error};
use fnv::FnvHashMap;
use indexmap::IndexMap;

use crate::{
    executor::FieldError,
    schema::model::{DirectiveType, Schema, SchemaType},
    value::Value,
};

pub use self::{
    field::{FieldFn, OutputValue},
    input::{Arguments, FromArguments, FromInputValue, InputFieldFn},
};

use crate::schema::meta::{
    ArgumentMeta, BoxAny, Caster, EnumMeta, EnumNamer, EnumValueMeta, FieldMeta, InputContext,
    InputFieldMeta, InputObjectMeta, InputParser, InterfaceMeta, MemberMeta, MetaType, ObjectMeta,
    Resolver, ScalarMeta, TypeRef, UnionMeta,
};

const QUERY_NAME: &str = "Query";
const MUTATION_NAME: &str = "Mutation";
const SUBSCRIPTION_NAME: &str = "Subscription";

/// Error produced by [`SchemaBuilder::build`].
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum BuildError {
    /// A native type was used as a field result without being registered.
    #[display("{_0} is not registered as an output type")]
    UnregisteredType(#[error(not(source))] &'static str),

    /// A native type was used in an input position without being usable
    /// there.
    #[display("{_0} is not registered as an input type")]
    NotAnInputType(#[error(not(source))] &'static str),

    /// Two registrations claim the same GraphQL type name.
    #[display("duplicate type name \"{_0}\"")]
    DuplicateTypeName(#[error(not(source))] String),

    /// A type declares two fields with the same name.
    #[display("duplicate field \"{_1}\" on type \"{_0}\"")]
    DuplicateField(String, #[error(not(source))] String),

    /// A union or interface member is not a registered object.
    #[display("member {_0} of \"{_1}\" is not a registered object")]
    MemberNotObject(&'static str, #[error(not(source))] String),

    /// A field or input field references a type missing from the index.
    #[display("type \"{_0}\" referenced by \"{_1}\" is not registered")]
    UnknownReference(String, #[error(not(source))] String),

    /// Input objects reference each other in an all-non-null cycle.
    #[display("non-null input object cycle through \"{_0}\"")]
    InputObjectCycle(#[error(not(source))] String),
}

type BindFieldFn = Box<dyn Fn(&mut TypeResolver<'_>) -> Result<BoundField, BuildError> + Send>;
type TypeRefFn = Box<dyn Fn(&mut TypeResolver<'_>) -> Result<TypeRef, BuildError> + Send>;
type ErasedSetter =
    Arc<dyn Fn(&mut dyn Any, &Value, &InputContext) -> Result<(), FieldError> + Send + Sync>;

struct BoundField {
    field_type: TypeRef,
    arguments: Vec<ArgumentMeta>,
    resolver: Resolver,
    parse_arguments: crate::schema::meta::ArgumentParser,
}

struct PendingField {
    name: ArcStr,
    description: Option<ArcStr>,
    deprecation: Option<ArcStr>,
    non_null: bool,
    external: bool,
    expensive: bool,
    lazy: bool,
    bind: BindFieldFn,
}

struct ObjectReg {
    name: ArcStr,
    description: Option<ArcStr>,
    key_field: Option<ArcStr>,
    fields: Vec<PendingField>,
}

impl ObjectReg {
    fn new(name: impl Into<ArcStr>) -> Self {
        ObjectReg {
            name: name.into(),
            description: None,
            key_field: None,
            fields: Vec::new(),
        }
    }
}

struct EnumReg {
    name: ArcStr,
    description: Option<ArcStr>,
    values: Vec<EnumValueMeta>,
    to_name: EnumNamer,
    parse: InputParser,
}

struct InputFieldReg {
    name: ArcStr,
    description: Option<ArcStr>,
    deprecation: Option<ArcStr>,
    type_ref: TypeRefFn,
    apply: ErasedSetter,
}

struct InputObjectReg {
    name: ArcStr,
    description: Option<ArcStr>,
    one_of: bool,
    make: Arc<dyn Fn() -> BoxAny + Send + Sync>,
    fields: Vec<InputFieldReg>,
}

struct MemberReg {
    type_id: TypeId,
    type_name: &'static str,
    cast: Caster,
}

struct AbstractReg {
    name: ArcStr,
    description: Option<ArcStr>,
    members: Vec<MemberReg>,
}

/// Accumulates registrations and resolves them into a [`Schema`].
#[derive(Default)]
pub struct SchemaBuilder {
    query: Option<ObjectReg>,
    mutation: Option<ObjectReg>,
    subscription: Option<ObjectReg>,
    objects: IndexMap<TypeId, ObjectReg>,
    enums: IndexMap<TypeId, EnumReg>,
    input_objects: IndexMap<TypeId, InputObjectReg>,
    unions: IndexMap<TypeId, AbstractReg>,
    interfaces: IndexMap<TypeId, AbstractReg>,
}

// The TypeId -> name tables consulted while binding fields.
struct TypeTable {
    objects: FnvHashMap<TypeId, ArcStr>,
    enums: FnvHashMap<TypeId, ArcStr>,
    input_objects: FnvHashMap<TypeId, ArcStr>,
    unions: FnvHashMap<TypeId, ArcStr>,
    interfaces: FnvHashMap<TypeId, ArcStr>,
}

/// Resolves native types to [`TypeRef`]s while fields are being bound.
/// Handed to [`OutputValue`], [`FromInputValue`](input::FromInputValue) and
/// [`FromArguments`] impls.
pub struct TypeResolver<'a> {
    table: &'a TypeTable,
    scalars: &'a mut FnvHashMap<ArcStr, scalars::ScalarEntry>,
}

impl TypeResolver<'_> {
    /// Resolve `T` in an output position: scalars, then objects, enums,
    /// unions and interfaces. The result is non-null; `Option` callers
    /// strip the wrapper.
    pub fn output_named<T: Any>(&mut self) -> Result<TypeRef, BuildError> {
        let id = TypeId::of::<T>();

        if let Some(entry) = scalars::entry_for(id) {
            let name = entry.name.clone();
            self.scalars.entry(name.clone()).or_insert(entry);
            return Ok(TypeRef::named(name).non_null());
        }

        for map in [
            &self.table.objects,
            &self.table.enums,
            &self.table.unions,
            &self.table.interfaces,
        ] {
            if let Some(name) = map.get(&id) {
                return Ok(TypeRef::named(name.clone()).non_null());
            }
        }

        Err(BuildError::UnregisteredType(std::any::type_name::<T>()))
    }

    /// Resolve `T` in an input position: scalars, enums and input objects
    /// only; output types are rejected.
    pub fn input_named<T: Any>(&mut self) -> Result<TypeRef, BuildError> {
        let id = TypeId::of::<T>();

        if let Some(entry) = scalars::entry_for(id) {
            let name = entry.name.clone();
            self.scalars.entry(name.clone()).or_insert(entry);
            return Ok(TypeRef::named(name).non_null());
        }

        for map in [&self.table.enums, &self.table.input_objects] {
            if let Some(name) = map.get(&id) {
                return Ok(TypeRef::named(name.clone()).non_null());
            }
        }

        Err(BuildError::NotAnInputType(std::any::type_name::<T>()))
    }
}

/// Registration handle for an object type (or a root).
pub struct ObjectBuilder<'a, T> {
    reg: &'a mut ObjectReg,
    _marker: PhantomData<fn() -> T>,
}

/// Handle to one just-registered field, for attaching options.
pub struct FieldBuilder<'a> {
    field: &'a mut PendingField,
}

impl FieldBuilder<'_> {
    /// Attach a description, surfaced through `__Field.description`.
    pub fn description(self, text: impl Into<ArcStr>) -> Self {
        self.field.description = Some(text.into());
        self
    }

    /// Mark the field deprecated with the given reason.
    pub fn deprecated(self, reason: impl Into<ArcStr>) -> Self {
        self.field.deprecation = Some(reason.into());
        self
    }

    /// Force a non-null result type even when the callable returns an
    /// `Option`. A null result then triggers null propagation.
    pub fn non_null(self) -> Self {
        self.field.non_null = true;
        self
    }

    /// Mark the field as resolved outside this service.
    pub fn external(self) -> Self {
        self.field.external = true;
        self
    }

    /// Mark the field as costly to resolve.
    pub fn expensive(self) -> Self {
        self.field.expensive = true;
        self
    }

    /// Mark the field for deferred resolution.
    pub fn lazy(self) -> Self {
        self.field.lazy = true;
        self
    }
}

impl<T: Send + Sync + 'static> ObjectBuilder<'_, T> {
    /// Expose a field computed by `f`. The callable's shape decides which
    /// of context, source and arguments it receives; see [`FieldFn`].
    pub fn field_fn<Marker, F>(&mut self, name: &str, f: F) -> FieldBuilder<'_>
    where
        Marker: 'static,
        F: FieldFn<T, Marker>,
    {
        let f = Arc::new(f);

        let bind: BindFieldFn = Box::new(move |resolver| {
            let field_type = <F::Out as OutputValue>::output_type_ref(resolver)?;
            let defs = <F::Args as FromArguments>::arguments(resolver)?;
            let arguments: Vec<ArgumentMeta> = defs.into_iter().map(|d| d.meta).collect();

            let declared: Vec<ArcStr> = arguments.iter().map(|a| a.name.clone()).collect();
            let defaults: Vec<(ArcStr, Value)> = arguments
                .iter()
                .filter_map(|a| a.default_value.clone().map(|v| (a.name.clone(), v)))
                .collect();

            let parse_arguments: crate::schema::meta::ArgumentParser =
                Arc::new(move |raw: &Value, ctx: &InputContext| {
                    let mut values: IndexMap<ArcStr, Value> = IndexMap::new();
                    match raw {
                        Value::Null => {}
                        Value::Object(o) => {
                            for (key, value) in o.iter() {
                                match declared.iter().find(|n| n.as_str() == key) {
                                    Some(name) => {
                                        values.insert(name.clone(), value.clone());
                                    }
                                    None => {
                                        return Err(FieldError::new(format!(
                                            "unknown arg {key}"
                                        )));
                                    }
                                }
                            }
                        }
                        _ => return Err(FieldError::new("arguments must be an object")),
                    }
                    for (name, default) in &defaults {
                        if !values.contains_key(name) {
                            values.insert(name.clone(), default.clone());
                        }
                    }

                    let args = Arguments::new(values, ctx);
                    let parsed = <F::Args as FromArguments>::from_arguments(&args)?;
                    Ok(Arc::new(parsed) as crate::ast::ParsedArgs)
                });

            let f = Arc::clone(&f);
            let resolver_fn: Resolver = Arc::new(move |ctx, source, args, _selection_set| {
                let source = source
                    .downcast_ref::<T>()
                    .ok_or_else(|| FieldError::new("resolver source type mismatch"))?;
                let args = (**args)
                    .downcast_ref::<F::Args>()
                    .ok_or_else(|| FieldError::new("resolver argument type mismatch"))?;
                f.invoke(ctx, source, args)
                    .map(OutputValue::into_field_value)
            });

            Ok(BoundField {
                field_type,
                arguments,
                resolver: resolver_fn,
                parse_arguments,
            })
        });

        self.reg.fields.push(PendingField {
            name: name.into(),
            description: None,
            deprecation: None,
            non_null: false,
            external: false,
            expensive: false,
            lazy: false,
            bind,
        });
        FieldBuilder {
            field: self.reg.fields.last_mut().expect("just pushed"),
        }
    }

    /// Attach a description to the type.
    pub fn describe(&mut self, text: impl Into<ArcStr>) -> &mut Self {
        self.reg.description = Some(text.into());
        self
    }

    /// Declare the field identifying values of this object.
    pub fn key(&mut self, field: &str) -> &mut Self {
        self.reg.key_field = Some(field.into());
        self
    }
}

/// Registration handle for an input object type.
pub struct InputObjectBuilder<'a, T> {
    reg: &'a mut InputObjectReg,
    _marker: PhantomData<fn() -> T>,
}

/// Handle to one just-registered input field, for attaching options.
pub struct InputFieldBuilder<'a> {
    field: &'a mut InputFieldReg,
}

impl InputFieldBuilder<'_> {
    /// Attach a description, surfaced through `__InputValue.description`.
    pub fn description(self, text: impl Into<ArcStr>) -> Self {
        self.field.description = Some(text.into());
        self
    }

    /// Mark the input field deprecated with the given reason.
    pub fn deprecated(self, reason: impl Into<ArcStr>) -> Self {
        self.field.deprecation = Some(reason.into());
        self
    }
}

impl<T: Default + Send + Sync + 'static> InputObjectBuilder<'_, T> {
    /// Expose a field of this input object. `f` receives the partially
    /// built target and the parsed value:
    ///
    /// ```ignore
    /// input.field_fn("id", |target: &mut Identifier, value: Option<ID>| {
    ///     target.id = value;
    /// });
    /// ```
    pub fn field_fn<S, Marker, F>(&mut self, name: &str, f: F) -> InputFieldBuilder<'_>
    where
        S: FromInputValue,
        Marker: 'static,
        F: InputFieldFn<T, S, Marker>,
    {
        let apply: ErasedSetter = Arc::new(move |target, value, ctx| {
            let target = target
                .downcast_mut::<T>()
                .ok_or_else(|| FieldError::new("input target type mismatch"))?;
            let parsed = S::from_input(value, ctx)?;
            f.apply(target, parsed)
        });

        self.reg.fields.push(InputFieldReg {
            name: name.into(),
            description: None,
            deprecation: None,
            type_ref: Box::new(|resolver| S::input_type_ref(resolver)),
            apply,
        });
        InputFieldBuilder {
            field: self.reg.fields.last_mut().expect("just pushed"),
        }
    }

    /// Require exactly one non-null field per supplied value, per the
    /// `@oneOf` semantics. The declared fields must all be nullable and
    /// carry no defaults; enforcement happens during coercion.
    pub fn mark_one_of(&mut self) -> &mut Self {
        self.reg.one_of = true;
        self
    }

    /// Attach a description to the type.
    pub fn describe(&mut self, text: impl Into<ArcStr>) -> &mut Self {
        self.reg.description = Some(text.into());
        self
    }
}

/// Registration handle for an enum type.
pub struct EnumBuilder<'a> {
    reg: &'a mut EnumReg,
}

impl EnumBuilder<'_> {
    /// Attach a description to the type.
    pub fn describe(&mut self, text: impl Into<ArcStr>) -> &mut Self {
        self.reg.description = Some(text.into());
        self
    }

    /// Attach a description to one value.
    pub fn describe_value(&mut self, name: &str, text: impl Into<ArcStr>) -> &mut Self {
        if let Some(value) = self.reg.values.iter_mut().find(|v| v.name == name) {
            value.description = Some(text.into());
        }
        self
    }

    /// Mark one value deprecated with the given reason.
    pub fn deprecate_value(&mut self, name: &str, reason: impl Into<ArcStr>) -> &mut Self {
        if let Some(value) = self.reg.values.iter_mut().find(|v| v.name == name) {
            value.deprecation = Some(reason.into());
        }
        self
    }
}

/// Registration handle for a union or interface type.
pub struct AbstractBuilder<'a, T> {
    reg: &'a mut AbstractReg,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> AbstractBuilder<'_, T> {
    /// Declare `M` as a member, with the discriminating accessor that
    /// extracts it from the carrier value. Values that already are a bare
    /// `M` dispatch without going through the accessor.
    pub fn member<M, F>(&mut self, f: F) -> &mut Self
    where
        M: Send + Sync + 'static,
        F: for<'v> Fn(&'v T) -> Option<&'v M> + Send + Sync + 'static,
    {
        let cast: Caster = Arc::new(move |value: &dyn Any| {
            if let Some(carrier) = value.downcast_ref::<T>() {
                if let Some(member) = f(carrier) {
                    return Some(member as &dyn Any);
                }
                return None;
            }
            value.downcast_ref::<M>().map(|m| m as &dyn Any)
        });

        self.reg.members.push(MemberReg {
            type_id: TypeId::of::<M>(),
            type_name: std::any::type_name::<M>(),
            cast,
        });
        self
    }

    /// Attach a description to the type.
    pub fn describe(&mut self, text: impl Into<ArcStr>) -> &mut Self {
        self.reg.description = Some(text.into());
        self
    }
}

impl SchemaBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The query root. Created lazily; repeated calls address the same
    /// registration.
    pub fn query(&mut self) -> ObjectBuilder<'_, ()> {
        let reg = self
            .query
            .get_or_insert_with(|| ObjectReg::new(QUERY_NAME));
        ObjectBuilder {
            reg,
            _marker: PhantomData,
        }
    }

    /// The mutation root. Created lazily; repeated calls address the same
    /// registration.
    pub fn mutation(&mut self) -> ObjectBuilder<'_, ()> {
        let reg = self
            .mutation
            .get_or_insert_with(|| ObjectReg::new(MUTATION_NAME));
        ObjectBuilder {
            reg,
            _marker: PhantomData,
        }
    }

    /// The subscription root. Created lazily; repeated calls address the
    /// same registration.
    pub fn subscription(&mut self) -> ObjectBuilder<'_, ()> {
        let reg = self
            .subscription
            .get_or_insert_with(|| ObjectReg::new(SUBSCRIPTION_NAME));
        ObjectBuilder {
            reg,
            _marker: PhantomData,
        }
    }

    /// Register `T` as the object type `name`.
    pub fn object<T: Send + Sync + 'static>(&mut self, name: &str) -> ObjectBuilder<'_, T> {
        let reg = self
            .objects
            .entry(TypeId::of::<T>())
            .or_insert_with(|| ObjectReg::new(name));
        ObjectBuilder {
            reg,
            _marker: PhantomData,
        }
    }

    /// Register `T` as the input object type `name`. Fields are exposed
    /// with mandatory per-field setter registrations.
    pub fn input_object<T: Default + Send + Sync + 'static>(
        &mut self,
        name: &str,
    ) -> InputObjectBuilder<'_, T> {
        let reg = self
            .input_objects
            .entry(TypeId::of::<T>())
            .or_insert_with(|| InputObjectReg {
                name: name.into(),
                description: None,
                one_of: false,
                make: Arc::new(|| Box::new(T::default()) as BoxAny),
                fields: Vec::new(),
            });
        InputObjectBuilder {
            reg,
            _marker: PhantomData,
        }
    }

    /// Register `T` as the enum type `name`, with the GraphQL name to
    /// native value table.
    pub fn enum_type<T>(
        &mut self,
        name: &str,
        values: impl IntoIterator<Item = (&'static str, T)>,
    ) -> EnumBuilder<'_>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let table: Arc<Vec<(ArcStr, T)>> = Arc::new(
            values
                .into_iter()
                .map(|(n, v)| (ArcStr::from(n), v))
                .collect(),
        );

        let to_name: EnumNamer = {
            let table = Arc::clone(&table);
            Arc::new(move |value: &dyn Any| {
                let value = value.downcast_ref::<T>()?;
                table
                    .iter()
                    .find(|(_, v)| v == value)
                    .map(|(n, _)| n.clone())
            })
        };

        let parse: InputParser = {
            let table = Arc::clone(&table);
            let enum_name = ArcStr::from(name);
            Arc::new(move |value: &Value, _: &InputContext| {
                let s = value
                    .as_str()
                    .ok_or_else(|| FieldError::new("not an enum value"))?;
                table
                    .iter()
                    .find(|(n, _)| n.as_str() == s)
                    .map(|(_, v)| Box::new(v.clone()) as BoxAny)
                    .ok_or_else(|| {
                        FieldError::new(format!("unknown value \"{s}\" for enum {enum_name}"))
                    })
            })
        };

        let reg = self
            .enums
            .entry(TypeId::of::<T>())
            .or_insert_with(|| EnumReg {
                name: name.into(),
                description: None,
                values: table
                    .iter()
                    .map(|(n, _)| EnumValueMeta {
                        name: n.clone(),
                        description: None,
                        deprecation: None,
                    })
                    .collect(),
                to_name,
                parse,
            });
        EnumBuilder { reg }
    }

    /// Register `T` as the union type `name`; declare members with
    /// [`AbstractBuilder::member`]. Exactly one accessor matches per
    /// carrier value; a Rust enum carrier makes that a compile-time
    /// guarantee.
    pub fn union_type<T: Send + Sync + 'static>(&mut self, name: &str) -> AbstractBuilder<'_, T> {
        let reg = self
            .unions
            .entry(TypeId::of::<T>())
            .or_insert_with(|| AbstractReg {
                name: name.into(),
                description: None,
                members: Vec::new(),
            });
        AbstractBuilder {
            reg,
            _marker: PhantomData,
        }
    }

    /// Register `T` as the interface type `name`. The interface surfaces
    /// the fields common to all member objects; members declare the
    /// interface on their side automatically.
    pub fn interface<T: Send + Sync + 'static>(&mut self, name: &str) -> AbstractBuilder<'_, T> {
        let reg = self
            .interfaces
            .entry(TypeId::of::<T>())
            .or_insert_with(|| AbstractReg {
                name: name.into(),
                description: None,
                members: Vec::new(),
            });
        AbstractBuilder {
            reg,
            _marker: PhantomData,
        }
    }

    /// Resolve every registration into an immutable [`Schema`].
    pub fn build(self) -> Result<Schema, BuildError> {
        let query = self.query.unwrap_or_else(|| ObjectReg::new(QUERY_NAME));

        let table = TypeTable {
            objects: self
                .objects
                .iter()
                .map(|(id, r)| (*id, r.name.clone()))
                .collect(),
            enums: self
                .enums
                .iter()
                .map(|(id, r)| (*id, r.name.clone()))
                .collect(),
            input_objects: self
                .input_objects
                .iter()
                .map(|(id, r)| (*id, r.name.clone()))
                .collect(),
            unions: self
                .unions
                .iter()
                .map(|(id, r)| (*id, r.name.clone()))
                .collect(),
            interfaces: self
                .interfaces
                .iter()
                .map(|(id, r)| (*id, r.name.clone()))
                .collect(),
        };

        // Scalars referenced anywhere end up in the type index; the core
        // five are always present since the built-in directives use them.
        let mut scalar_metas: FnvHashMap<ArcStr, scalars::ScalarEntry> = FnvHashMap::default();
        for name in ["String", "Int", "Float", "Boolean", "ID"] {
            let entry = scalars::entry_by_name(name).expect("core scalar is always registered");
            scalar_metas.insert(entry.name.clone(), entry);
        }

        let mut resolver = TypeResolver {
            table: &table,
            scalars: &mut scalar_metas,
        };

        // Input coercion registry: enums parse through their name table,
        // input objects through a composed parser. Nested input-object
        // references resolve through the registry at parse time, so cyclic
        // definitions cost nothing here.
        let mut input_context = InputContext::default();
        for (id, reg) in &self.enums {
            input_context.enums.insert(*id, reg.parse.clone());
        }
        for (id, reg) in &self.input_objects {
            input_context
                .input_objects
                .insert(*id, compose_input_object_parser(reg));
        }

        let mut input_object_metas: Vec<InputObjectMeta> = Vec::new();
        for reg in self.input_objects.values() {
            let mut fields = Vec::with_capacity(reg.fields.len());
            for field in &reg.fields {
                if fields.iter().any(|f: &InputFieldMeta| f.name == field.name) {
                    return Err(BuildError::DuplicateField(
                        reg.name.to_string(),
                        field.name.to_string(),
                    ));
                }
                fields.push(InputFieldMeta {
                    name: field.name.clone(),
                    field_type: (field.type_ref)(&mut resolver)?,
                    description: field.description.clone(),
                    deprecation: field.deprecation.clone(),
                    default_value: None,
                });
            }
            input_object_metas.push(InputObjectMeta {
                name: reg.name.clone(),
                description: reg.description.clone(),
                fields,
                one_of: reg.one_of,
            });
        }

        let mut object_metas: IndexMap<ArcStr, ObjectMeta> = IndexMap::new();
        let roots = [Some(&query), self.mutation.as_ref(), self.subscription.as_ref()];
        for reg in roots.into_iter().flatten().chain(self.objects.values()) {
            let meta = bind_object(reg, &mut resolver)?;
            object_metas.insert(meta.name.clone(), meta);
        }

        // Unions and interfaces resolve their members against the object
        // registrations; interfaces additionally surface the fields common
        // to every member and stamp themselves onto the members.
        let mut union_metas: Vec<UnionMeta> = Vec::new();
        for reg in self.unions.values() {
            union_metas.push(UnionMeta {
                name: reg.name.clone(),
                description: reg.description.clone(),
                members: resolve_members(reg, &table)?,
            });
        }

        let mut interface_metas: Vec<InterfaceMeta> = Vec::new();
        for reg in self.interfaces.values() {
            let members = resolve_members(reg, &table)?;

            let mut fields: IndexMap<ArcStr, FieldMeta> = IndexMap::new();
            if let Some(first) = members.first() {
                let first_fields = object_metas
                    .get(&first.name)
                    .map(|o| o.fields.clone())
                    .unwrap_or_default();
                for (name, field) in first_fields {
                    let shared = members.iter().all(|m| {
                        object_metas
                            .get(&m.name)
                            .is_some_and(|o| o.fields.contains_key(&name))
                    });
                    if shared {
                        fields.insert(name, field);
                    }
                }
            }

            for member in &members {
                if let Some(object) = object_metas.get_mut(&member.name) {
                    object.interfaces.push(reg.name.clone());
                }
            }

            interface_metas.push(InterfaceMeta {
                name: reg.name.clone(),
                description: reg.description.clone(),
                fields,
                possible_types: members,
            });
        }

        // Assemble the index, rejecting name collisions across kinds.
        let mut types: FnvHashMap<ArcStr, MetaType> = FnvHashMap::default();
        let mut insert = |name: ArcStr, meta: MetaType| -> Result<(), BuildError> {
            if types.insert(name.clone(), meta).is_some() {
                return Err(BuildError::DuplicateTypeName(name.to_string()));
            }
            Ok(())
        };

        for (name, entry) in scalar_metas {
            insert(
                name.clone(),
                MetaType::Scalar(ScalarMeta {
                    name,
                    description: entry.description.clone(),
                    specified_by_url: entry.specified_by_url.clone(),
                    parse: entry.parse.clone(),
                    serialize: entry.serialize.clone(),
                }),
            )?;
        }
        for reg in self.enums.values() {
            insert(
                reg.name.clone(),
                MetaType::Enum(EnumMeta {
                    name: reg.name.clone(),
                    description: reg.description.clone(),
                    values: reg.values.clone(),
                    to_name: reg.to_name.clone(),
                }),
            )?;
        }
        for meta in input_object_metas {
            insert(meta.name.clone(), MetaType::InputObject(meta))?;
        }
        for (name, meta) in object_metas {
            insert(name, MetaType::Object(meta))?;
        }
        for meta in union_metas {
            insert(meta.name.clone(), MetaType::Union(meta))?;
        }
        for meta in interface_metas {
            insert(meta.name.clone(), MetaType::Interface(meta))?;
        }

        let schema = SchemaType {
            query_type_name: ArcStr::from(QUERY_NAME),
            mutation_type_name: self.mutation.as_ref().map(|_| ArcStr::from(MUTATION_NAME)),
            subscription_type_name: self
                .subscription
                .as_ref()
                .map(|_| ArcStr::from(SUBSCRIPTION_NAME)),
            directives: DirectiveType::built_in(),
            input_context,
            types,
        };

        check_references(&schema)?;
        check_input_cycles(&schema)?;

        tracing::debug!(types = schema.types.len(), "schema built");
        Ok(Schema {
            types: Arc::new(schema),
        })
    }

    /// [`build`](Self::build), panicking on failure.
    pub fn must_build(self) -> Schema {
        self.build().expect("schema build failed")
    }
}

fn bind_object(reg: &ObjectReg, resolver: &mut TypeResolver<'_>) -> Result<ObjectMeta, BuildError> {
    let mut fields: IndexMap<ArcStr, FieldMeta> = IndexMap::with_capacity(reg.fields.len());

    for pending in &reg.fields {
        if fields.contains_key(&pending.name) {
            return Err(BuildError::DuplicateField(
                reg.name.to_string(),
                pending.name.to_string(),
            ));
        }

        let bound = (pending.bind)(resolver)?;
        let field_type = if pending.non_null {
            bound.field_type.non_null()
        } else {
            bound.field_type
        };

        fields.insert(
            pending.name.clone(),
            FieldMeta {
                name: pending.name.clone(),
                description: pending.description.clone(),
                deprecation: pending.deprecation.clone(),
                field_type,
                arguments: bound.arguments,
                resolver: bound.resolver,
                parse_arguments: bound.parse_arguments,
                external: pending.external,
                expensive: pending.expensive,
                lazy: pending.lazy,
            },
        );
    }

    Ok(ObjectMeta {
        name: reg.name.clone(),
        description: reg.description.clone(),
        fields,
        interfaces: Vec::new(),
        key_field: reg.key_field.clone(),
    })
}

fn resolve_members(reg: &AbstractReg, table: &TypeTable) -> Result<Vec<MemberMeta>, BuildError> {
    reg.members
        .iter()
        .map(|m| match table.objects.get(&m.type_id) {
            Some(name) => Ok(MemberMeta {
                name: name.clone(),
                cast: m.cast.clone(),
            }),
            None => Err(BuildError::MemberNotObject(
                m.type_name,
                reg.name.to_string(),
            )),
        })
        .collect()
}

fn compose_input_object_parser(reg: &InputObjectReg) -> InputParser {
    let name = reg.name.clone();
    let one_of = reg.one_of;
    let make = Arc::clone(&reg.make);
    let fields: Vec<(ArcStr, ErasedSetter)> = reg
        .fields
        .iter()
        .map(|f| (f.name.clone(), f.apply.clone()))
        .collect();

    Arc::new(move |value: &Value, ctx: &InputContext| {
        let object = value
            .as_object()
            .ok_or_else(|| FieldError::new("not an object"))?;

        if one_of {
            input::validate_one_of(&name, object)?;
        }

        for (key, _) in object.iter() {
            if !fields.iter().any(|(n, _)| n.as_str() == key) {
                return Err(FieldError::new(format!("unknown arg {key}")));
            }
        }

        let mut target = make();
        for (field_name, apply) in &fields {
            let Some(field_value) = object.get_field_value(field_name) else {
                continue;
            };
            apply(&mut *target, field_value, ctx).map_err(|e| e.prefixed(field_name))?;
        }
        Ok(target)
    })
}

// Every named reference in fields, arguments and input fields must resolve.
fn check_references(schema: &SchemaType) -> Result<(), BuildError> {
    let check = |type_ref: &TypeRef, owner: &ArcStr| -> Result<(), BuildError> {
        let name = type_ref.innermost_name();
        if schema.types.contains_key(name) {
            Ok(())
        } else {
            Err(BuildError::UnknownReference(
                name.to_string(),
                owner.to_string(),
            ))
        }
    };

    for meta in schema.types.values() {
        match meta {
            MetaType::Object(o) => {
                for field in o.fields.values() {
                    check(&field.field_type, &o.name)?;
                    for arg in &field.arguments {
                        check(&arg.arg_type, &o.name)?;
                    }
                }
            }
            MetaType::Interface(i) => {
                for field in i.fields.values() {
                    check(&field.field_type, &i.name)?;
                    for arg in &field.arguments {
                        check(&arg.arg_type, &i.name)?;
                    }
                }
            }
            MetaType::InputObject(io) => {
                for field in &io.fields {
                    check(&field.field_type, &io.name)?;
                }
            }
            MetaType::Scalar(..) | MetaType::Enum(..) | MetaType::Union(..) => {}
        }
    }
    Ok(())
}

// Input object graphs may be cyclic only when at least one edge of the
// cycle is nullable or list-valued.
fn check_input_cycles(schema: &SchemaType) -> Result<(), BuildError> {
    fn strong_edge(type_ref: &TypeRef) -> Option<&ArcStr> {
        match type_ref {
            TypeRef::NonNull(inner) => match &**inner {
                TypeRef::Named(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    fn visit(
        name: &ArcStr,
        schema: &SchemaType,
        visiting: &mut Vec<ArcStr>,
        done: &mut std::collections::HashSet<ArcStr>,
    ) -> Result<(), BuildError> {
        if done.contains(name) {
            return Ok(());
        }
        if let Some(pos) = visiting.iter().position(|n| n == name) {
            use itertools::Itertools as _;
            return Err(BuildError::InputObjectCycle(
                visiting[pos..].iter().join(" -> "),
            ));
        }

        let Some(MetaType::InputObject(io)) = schema.types.get(name) else {
            return Ok(());
        };

        visiting.push(name.clone());
        for field in &io.fields {
            if let Some(next) = strong_edge(&field.field_type) {
                visit(next, schema, visiting, done)?;
            }
        }
        visiting.pop();
        done.insert(name.clone());
        Ok(())
    }

    let input_names: Vec<ArcStr> = schema
        .types
        .values()
        .filter_map(|m| match m {
            MetaType::InputObject(io) => Some(io.name.clone()),
            _ => None,
        })
        .collect();

    let mut done = std::collections::HashSet::new();
    for name in input_names {
        visit(&name, schema, &mut Vec::new(), &mut done)?;
    }
    Ok(())
}

//! Coercion from JSON-like values into native argument and input types.

use arcstr::ArcStr;
use indexmap::IndexMap;

use crate::{
    executor::{FieldError, IntoFieldError},
    schema::{
        build::{BuildError, TypeResolver},
        meta::{ArgumentMeta, InputContext, TypeRef},
    },
    value::{Object, Value},
};

/// A native type usable in input positions: arguments and input-object
/// fields.
///
/// The default method bodies resolve the type through the scalar registry
/// and the builder's enum and input-object registrations, so scalars,
/// registered enums and registered input objects only need an empty impl.
/// `Option` drops the non-null wrapper and `Vec` maps to a list.
pub trait FromInputValue: Sized + Send + Sync + 'static {
    /// The GraphQL type this native type maps to in input positions.
    fn input_type_ref(resolver: &mut TypeResolver<'_>) -> Result<TypeRef, BuildError> {
        resolver.input_named::<Self>()
    }

    /// Coerce a JSON-like value into this type.
    fn from_input(value: &Value, ctx: &InputContext) -> Result<Self, FieldError> {
        if value.is_null() {
            return Err(FieldError::new("unexpected null"));
        }
        ctx.parse(value)
    }
}

impl FromInputValue for String {}
impl FromInputValue for bool {}
impl FromInputValue for i32 {}
impl FromInputValue for i64 {}
impl FromInputValue for f32 {}
impl FromInputValue for f64 {}
impl FromInputValue for super::scalars::ID {}
impl FromInputValue for super::scalars::Timestamp {}
impl FromInputValue for super::scalars::Duration {}
impl FromInputValue for super::scalars::Bytes {}
impl FromInputValue for super::scalars::Map {}

impl<T: FromInputValue> FromInputValue for Option<T> {
    fn input_type_ref(resolver: &mut TypeResolver<'_>) -> Result<TypeRef, BuildError> {
        Ok(T::input_type_ref(resolver)?.nullable())
    }

    fn from_input(value: &Value, ctx: &InputContext) -> Result<Self, FieldError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_input(value, ctx).map(Some)
        }
    }
}

impl<T: FromInputValue> FromInputValue for Vec<T> {
    fn input_type_ref(resolver: &mut TypeResolver<'_>) -> Result<TypeRef, BuildError> {
        Ok(T::input_type_ref(resolver)?.list().non_null())
    }

    fn from_input(value: &Value, ctx: &InputContext) -> Result<Self, FieldError> {
        let items = value
            .as_list()
            .ok_or_else(|| FieldError::new("not a list"))?;
        items.iter().map(|v| T::from_input(v, ctx)).collect()
    }
}

impl<T: FromInputValue> FromInputValue for Box<T> {
    fn input_type_ref(resolver: &mut TypeResolver<'_>) -> Result<TypeRef, BuildError> {
        T::input_type_ref(resolver)
    }

    fn from_input(value: &Value, ctx: &InputContext) -> Result<Self, FieldError> {
        T::from_input(value, ctx).map(Box::new)
    }
}

/// The coerced arguments of one selection, with typed access.
pub struct Arguments<'a> {
    values: IndexMap<ArcStr, Value>,
    ctx: &'a InputContext,
}

impl<'a> Arguments<'a> {
    pub(crate) fn new(values: IndexMap<ArcStr, Value>, ctx: &'a InputContext) -> Self {
        Arguments { values, ctx }
    }

    /// Get and coerce the argument `name` into `T`. Absent arguments coerce
    /// from null, which succeeds for `Option` types.
    pub fn get<T: FromInputValue>(&self, name: &str) -> Result<T, FieldError> {
        let value = self.values.get(name).unwrap_or(&Value::Null);
        T::from_input(value, self.ctx).map_err(|e| e.prefixed(name))
    }

    /// The raw value of the argument `name`, when one was supplied.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// A native record holding a field's arguments.
///
/// The impl declares each argument's name and type and reassembles the
/// record out of the coerced [`Arguments`]:
///
/// ```ignore
/// struct MirrorArgs {
///     value: i64,
/// }
///
/// impl FromArguments for MirrorArgs {
///     fn arguments(resolver: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError> {
///         Ok(vec![ArgumentDef::of::<i64>(resolver, "value")?])
///     }
///
///     fn from_arguments(args: &Arguments<'_>) -> Result<Self, FieldError> {
///         Ok(Self { value: args.get("value")? })
///     }
/// }
/// ```
pub trait FromArguments: Sized + Send + Sync + 'static {
    /// The declared arguments, in order.
    fn arguments(resolver: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError>;

    /// Reassemble the record from the coerced arguments.
    fn from_arguments(args: &Arguments<'_>) -> Result<Self, FieldError>;
}

impl FromArguments for () {
    fn arguments(_: &mut TypeResolver<'_>) -> Result<Vec<ArgumentDef>, BuildError> {
        Ok(Vec::new())
    }

    fn from_arguments(_: &Arguments<'_>) -> Result<Self, FieldError> {
        Ok(())
    }
}

/// The declaration of one argument inside a [`FromArguments`] impl.
#[derive(Clone, Debug)]
pub struct ArgumentDef {
    pub(crate) meta: ArgumentMeta,
}

impl ArgumentDef {
    /// Declare an argument named `name` of the native type `T`.
    pub fn of<T: FromInputValue>(
        resolver: &mut TypeResolver<'_>,
        name: &str,
    ) -> Result<Self, BuildError> {
        Ok(ArgumentDef {
            meta: ArgumentMeta {
                name: name.into(),
                arg_type: T::input_type_ref(resolver)?,
                description: None,
                deprecation: None,
                default_value: None,
            },
        })
    }

    /// Attach a description, surfaced through `__InputValue.description`.
    #[must_use]
    pub fn description(mut self, text: impl Into<ArcStr>) -> Self {
        self.meta.description = Some(text.into());
        self
    }

    /// Mark the argument deprecated.
    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<ArcStr>) -> Self {
        self.meta.deprecation = Some(reason.into());
        self
    }

    /// Declare a default applied when the argument is absent.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.meta.default_value = Some(value);
        self
    }
}

/// A setter exposing one field of a registered input object: it parses the
/// incoming value into `S` and stores it on the partially built `T`.
/// Both plain setters and setters returning `Result` are accepted.
pub trait InputFieldFn<T, S, Marker>: Send + Sync + 'static {
    /// Apply the parsed value to the target.
    fn apply(&self, target: &mut T, value: S) -> Result<(), FieldError>;
}

/// Marker for setters without an error channel.
pub struct Plain;

/// Marker for setters returning `Result`.
pub struct Failing;

impl<T, S, F> InputFieldFn<T, S, Plain> for F
where
    F: Fn(&mut T, S) + Send + Sync + 'static,
{
    fn apply(&self, target: &mut T, value: S) -> Result<(), FieldError> {
        self(target, value);
        Ok(())
    }
}

impl<T, S, E, F> InputFieldFn<T, S, Failing> for F
where
    F: Fn(&mut T, S) -> Result<(), E> + Send + Sync + 'static,
    E: IntoFieldError,
{
    fn apply(&self, target: &mut T, value: S) -> Result<(), FieldError> {
        self(target, value).map_err(IntoFieldError::into_field_error)
    }
}

/// OneOf enforcement: the raw map must carry exactly one non-null entry.
/// Runs before per-field conversion.
pub(crate) fn validate_one_of(name: &str, object: &Object) -> Result<(), FieldError> {
    let non_null = object.iter().filter(|(_, v)| !v.is_null()).count();
    if non_null == 1 {
        Ok(())
    } else {
        Err(FieldError::new(format!(
            "oneOf input object \"{name}\" must have exactly one non-null field",
        )))
    }
}

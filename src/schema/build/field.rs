//! Output typing and the resolver adapter trait.

use std::marker::PhantomData;

use crate::{
    executor::{FieldError, IntoFieldError, RequestContext},
    schema::{
        build::{BuildError, TypeResolver},
        meta::{FieldValue, TypeRef},
    },
};

use super::input::FromArguments;

/// A native type usable as a field result.
///
/// The default method bodies resolve the type through the scalar registry
/// and the builder's object, enum, union and interface registrations, and
/// hand the value to the executor as a type-erased item. Scalars already
/// have impls; a registered composite type takes one empty impl line:
///
/// ```ignore
/// impl jaal::OutputValue for User {}
/// ```
///
/// A bare `T` maps to `T!`; `Option<T>` drops the non-null wrapper and
/// `Vec<T>` maps to `[T!]!`.
pub trait OutputValue: Sized + Send + Sync + 'static {
    /// The GraphQL type this native type maps to in output positions.
    fn output_type_ref(resolver: &mut TypeResolver<'_>) -> Result<TypeRef, BuildError> {
        resolver.output_named::<Self>()
    }

    /// Convert into the value carrier the executor walks.
    fn into_field_value(self) -> FieldValue {
        FieldValue::item(self)
    }
}

impl OutputValue for String {}
impl OutputValue for bool {}
impl OutputValue for i32 {}
impl OutputValue for i64 {}
impl OutputValue for f32 {}
impl OutputValue for f64 {}
impl OutputValue for super::scalars::ID {}
impl OutputValue for super::scalars::Timestamp {}
impl OutputValue for super::scalars::Duration {}
impl OutputValue for super::scalars::Bytes {}
impl OutputValue for super::scalars::Map {}

impl OutputValue for () {
    fn output_type_ref(_: &mut TypeResolver<'_>) -> Result<TypeRef, BuildError> {
        Ok(TypeRef::named("Boolean"))
    }

    fn into_field_value(self) -> FieldValue {
        FieldValue::Null
    }
}

impl<T: OutputValue> OutputValue for Option<T> {
    fn output_type_ref(resolver: &mut TypeResolver<'_>) -> Result<TypeRef, BuildError> {
        Ok(T::output_type_ref(resolver)?.nullable())
    }

    fn into_field_value(self) -> FieldValue {
        match self {
            Some(v) => v.into_field_value(),
            None => FieldValue::Null,
        }
    }
}

impl<T: OutputValue> OutputValue for Vec<T> {
    fn output_type_ref(resolver: &mut TypeResolver<'_>) -> Result<TypeRef, BuildError> {
        Ok(T::output_type_ref(resolver)?.list().non_null())
    }

    fn into_field_value(self) -> FieldValue {
        FieldValue::List(self.into_iter().map(OutputValue::into_field_value).collect())
    }
}

impl<T: OutputValue> OutputValue for Box<T> {
    fn output_type_ref(resolver: &mut TypeResolver<'_>) -> Result<TypeRef, BuildError> {
        T::output_type_ref(resolver)
    }

    fn into_field_value(self) -> FieldValue {
        (*self).into_field_value()
    }
}

/// A callable registrable as a field resolver.
///
/// The marker parameter distinguishes the accepted shapes, so plain
/// closures register without annotations:
///
/// * `(source)`, `(ctx, source)`, `(ctx, source, args)`, `(source, args)`
/// * the sourceless forms of the same, for root fields
/// * each returning either a bare value or a `Result`
pub trait FieldFn<S, Marker>: Send + Sync + 'static {
    /// The argument record the callable expects.
    type Args: FromArguments;
    /// The result type before erasure.
    type Out: OutputValue;

    /// Invoke the callable.
    fn invoke(
        &self,
        ctx: &RequestContext,
        source: &S,
        args: &Self::Args,
    ) -> Result<Self::Out, FieldError>;
}

/// Marker wrapper for callables returning `Result`.
pub struct Fallible<M>(PhantomData<M>);

macro_rules! field_fn_impl {
    (
        $(#[$doc:meta])*
        $marker:ident, [$($gen:ident),*], ($($fnarg:ty),*), $args_ty:ty,
        |$f:ident, $ctx:ident, $source:ident, $args:ident| $call:expr
    ) => {
        $(#[$doc])*
        pub struct $marker $(<$gen>)* (PhantomData<($($gen,)*)>);

        impl<S, F, R $(, $gen)*> FieldFn<S, $marker $(<$gen>)*> for F
        where
            S: Send + Sync + 'static,
            F: Fn($($fnarg),*) -> R + Send + Sync + 'static,
            R: OutputValue,
            $($gen: FromArguments,)*
        {
            type Args = $args_ty;
            type Out = R;

            fn invoke(
                &self,
                $ctx: &RequestContext,
                $source: &S,
                $args: &Self::Args,
            ) -> Result<R, FieldError> {
                let $f = self;
                Ok($call)
            }
        }

        impl<S, F, R, E $(, $gen)*> FieldFn<S, Fallible<$marker $(<$gen>)*>> for F
        where
            S: Send + Sync + 'static,
            F: Fn($($fnarg),*) -> Result<R, E> + Send + Sync + 'static,
            R: OutputValue,
            E: IntoFieldError,
            $($gen: FromArguments,)*
        {
            type Args = $args_ty;
            type Out = R;

            fn invoke(
                &self,
                $ctx: &RequestContext,
                $source: &S,
                $args: &Self::Args,
            ) -> Result<R, FieldError> {
                let $f = self;
                $call.map_err(IntoFieldError::into_field_error)
            }
        }
    };
}

field_fn_impl!(
    /// Marker for `(source)` callables.
    SourceOnly, [], (&S), (),
    |f, _ctx, _source, _args| f(_source)
);

field_fn_impl!(
    /// Marker for `(ctx, source)` callables.
    CtxSource, [], (&RequestContext, &S), (),
    |f, _ctx, _source, _args| f(_ctx, _source)
);

field_fn_impl!(
    /// Marker for `(ctx, source, args)` callables.
    CtxSourceArgs, [A], (&RequestContext, &S, &A), A,
    |f, _ctx, _source, _args| f(_ctx, _source, _args)
);

field_fn_impl!(
    /// Marker for `(source, args)` callables.
    SourceArgs, [A], (&S, &A), A,
    |f, _ctx, _source, _args| f(_source, _args)
);

field_fn_impl!(
    /// Marker for parameterless callables on root objects.
    NoParams, [], (), (),
    |f, _ctx, _source, _args| f()
);

field_fn_impl!(
    /// Marker for `(ctx)` callables on root objects.
    CtxOnly, [], (&RequestContext), (),
    |f, _ctx, _source, _args| f(_ctx)
);

field_fn_impl!(
    /// Marker for `(args)` callables on root objects.
    ArgsOnly, [A], (&A), A,
    |f, _ctx, _source, _args| f(_args)
);

field_fn_impl!(
    /// Marker for `(ctx, args)` callables on root objects.
    CtxArgs, [A], (&RequestContext, &A), A,
    |f, _ctx, _source, _args| f(_ctx, _args)
);

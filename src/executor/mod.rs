//! Query execution.
//!
//! The executor walks a validated operation tree against the expected types
//! of the schema, invoking resolvers and shaping the ordered response
//! value. Field errors are accumulated with their paths; a null arriving at
//! a non-null position bubbles to the nearest nullable ancestor without
//! recording further errors.

use std::{
    any::Any,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
};

use arcstr::ArcStr;
use indexmap::IndexMap;

use crate::{
    ast::{Directive, OperationKind, Query, SelectionSet},
    errors::{Error, PathSegment},
    schema::{
        build::scalars,
        meta::{BoxAny, FieldValue, MemberMeta, MetaType, ObjectMeta, TypeRef},
        model::{Schema, SchemaType},
    },
    value::{Object, Value},
};

/// The error a resolver reports: a message plus free-form extensions.
/// Converted into an envelope [`Error`] with the current field path when it
/// is recorded.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    message: String,
    extensions: IndexMap<String, Value>,
}

impl FieldError {
    /// Create an error from anything displayable.
    pub fn new<M: fmt::Display>(message: M) -> Self {
        FieldError {
            message: message.to_string(),
            extensions: IndexMap::new(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Attach an extension entry; a `code` entry becomes the envelope
    /// error code.
    #[must_use]
    pub fn extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Decompose into message and extensions.
    pub fn into_parts(self) -> (String, IndexMap<String, Value>) {
        (self.message, self.extensions)
    }

    pub(crate) fn prefixed(mut self, name: &str) -> Self {
        self.message = format!("{name}: {}", self.message);
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The result type resolvers return.
pub type FieldResult<T> = Result<T, FieldError>;

/// Conversion into a [`FieldError`], implemented for the error types
/// resolvers commonly return.
pub trait IntoFieldError {
    /// Perform the conversion.
    fn into_field_error(self) -> FieldError;
}

impl IntoFieldError for FieldError {
    fn into_field_error(self) -> FieldError {
        self
    }
}

impl IntoFieldError for String {
    fn into_field_error(self) -> FieldError {
        FieldError::new(self)
    }
}

impl IntoFieldError for &str {
    fn into_field_error(self) -> FieldError {
        FieldError::new(self)
    }
}

impl IntoFieldError for Box<dyn std::error::Error + Send + Sync> {
    fn into_field_error(self) -> FieldError {
        FieldError::new(self)
    }
}

/// The per-request context handed to every resolver. Carries an optional
/// caller-supplied value and the cancellation flag; resolvers doing I/O
/// are expected to check [`is_cancelled`](Self::is_cancelled) and stop
/// early.
#[derive(Clone, Default)]
pub struct RequestContext {
    cancelled: Arc<AtomicBool>,
    value: Option<Arc<dyn Any + Send + Sync>>,
}

impl RequestContext {
    /// A context with no attached value.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context carrying a caller-supplied value, retrievable with
    /// [`value`](Self::value) from any resolver.
    pub fn with_value<T: Any + Send + Sync>(value: T) -> Self {
        RequestContext {
            cancelled: Arc::new(AtomicBool::new(false)),
            value: Some(Arc::new(value)),
        }
    }

    /// The attached value, when one of type `T` is present.
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.value.as_ref()?.downcast_ref()
    }

    /// Whether the request was cancelled. The executor stops dispatching
    /// selections at the next resolver boundary once this turns true.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// A handle that cancels this request from another thread.
    pub fn cancellation(&self) -> CancellationHandle {
        CancellationHandle(Arc::clone(&self.cancelled))
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("cancelled", &self.is_cancelled())
            .field("has_value", &self.value.is_some())
            .finish()
    }
}

/// Cancels the request it was taken from.
#[derive(Clone, Debug)]
pub struct CancellationHandle(Arc<AtomicBool>);

impl CancellationHandle {
    /// Signal cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Executes validated operation trees against a built schema.
#[derive(Clone, Copy, Debug, Default)]
pub struct Executor;

impl Executor {
    /// Create an executor.
    pub fn new() -> Self {
        Executor
    }

    /// Execute `query` and produce the response data alongside the
    /// accumulated errors. Top-level selections run sequentially in source
    /// order, which is what mutations require; response keys follow source
    /// order at every level.
    pub fn execute(
        &self,
        ctx: &RequestContext,
        schema: &Schema,
        query: &Query,
    ) -> (Value, Vec<Error>) {
        let schema = schema.schema_type();

        let root = match query.kind {
            OperationKind::Query => Some(schema.query_type()),
            OperationKind::Mutation => schema.mutation_type(),
            OperationKind::Subscription => schema.subscription_type(),
        };
        let Some(MetaType::Object(root)) = root else {
            return (
                Value::Null,
                vec![Error::new(format!("schema has no {} type", query.kind))],
            );
        };

        let ec = ExecutionContext {
            ctx,
            schema,
            errors: RwLock::new(Vec::new()),
            cancel_reported: AtomicBool::new(false),
        };

        let mut result = Object::with_capacity(query.selection_set.selections.len());
        let complete = ec.fill_selection_set(
            root,
            &(),
            &query.selection_set,
            &FieldPath::Root,
            &mut result,
            &[],
        );

        let data = if complete {
            Value::Object(result)
        } else {
            Value::Null
        };
        let errors = ec.errors.into_inner().unwrap_or_default();
        (data, errors)
    }
}

// The path to the position currently being resolved, kept as a borrow
// chain so recursion costs nothing.
enum FieldPath<'a> {
    Root,
    Field(&'a FieldPath<'a>, &'a str),
    Index(&'a FieldPath<'a>, usize),
}

impl FieldPath<'_> {
    fn contents(&self) -> Vec<PathSegment> {
        let mut segments = Vec::new();
        let mut current = self;
        loop {
            match current {
                FieldPath::Root => break,
                FieldPath::Field(parent, name) => {
                    segments.push(PathSegment::Field((*name).into()));
                    current = parent;
                }
                FieldPath::Index(parent, index) => {
                    segments.push(PathSegment::Index(*index));
                    current = parent;
                }
            }
        }
        segments.reverse();
        segments
    }
}

// The outcome of resolving one position. `Nulled` means a non-null
// constraint was violated underneath and the null is still looking for a
// nullable ancestor to land on; the triggering error is already recorded.
enum Resolved {
    Value(Value),
    Nulled,
}

struct ExecutionContext<'a> {
    ctx: &'a RequestContext,
    schema: &'a SchemaType,
    errors: RwLock<Vec<Error>>,
    cancel_reported: AtomicBool,
}

impl ExecutionContext<'_> {
    fn push_error(&self, error: FieldError, path: &FieldPath<'_>) {
        let error = Error::from(error).at(path.contents());
        self.errors
            .write()
            .expect("error sink poisoned")
            .push(error);
    }

    fn report_cancelled(&self, path: &FieldPath<'_>) {
        if !self.cancel_reported.swap(true, Ordering::Relaxed) {
            self.push_error(FieldError::new("context canceled"), path);
        }
    }

    // Resolves the selections of one object. Returns false when a
    // non-null field failed, which nulls the enclosing position.
    fn fill_selection_set(
        &self,
        object: &ObjectMeta,
        source: &dyn Any,
        set: &SelectionSet,
        path: &FieldPath<'_>,
        out: &mut Object,
        type_conditions: &[&str],
    ) -> bool {
        for sel in &set.selections {
            if self.ctx.is_cancelled() {
                self.report_cancelled(path);
                return true;
            }
            if is_excluded(&sel.directives) {
                continue;
            }

            let alias = sel.alias.as_str();

            if sel.name == "__typename" {
                out.add_field(alias, Value::string(object.name.as_str()));
                continue;
            }

            let field_path = FieldPath::Field(path, alias);

            let Some(field) = object.fields.get(sel.name.as_str()) else {
                self.push_error(
                    FieldError::new(format!(
                        "unknown field \"{}\" on type \"{}\"",
                        sel.name, object.name,
                    )),
                    &field_path,
                );
                out.add_field(alias, Value::Null);
                continue;
            };

            // The validator normally coerced the arguments already; direct
            // executor use parses them here, still exactly once.
            if sel.parsed_args().is_none() {
                match (field.parse_arguments)(&sel.args, self.schema.input_context()) {
                    Ok(parsed) => sel.set_parsed_args(parsed),
                    Err(e) => {
                        self.push_error(e, &field_path);
                        if field.field_type.is_non_null() {
                            return false;
                        }
                        out.add_field(alias, Value::Null);
                        continue;
                    }
                }
            }
            let args = sel.parsed_args().expect("arguments just parsed");

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                (field.resolver)(self.ctx, source, args, sel.selection_set.as_ref())
            }))
            .unwrap_or_else(|_| Err(FieldError::new("internal server error")));

            match outcome {
                Err(e) => {
                    tracing::debug!(field = %field.name, error = %e, "resolver failed");
                    self.push_error(e, &field_path);
                    if field.field_type.is_non_null() {
                        return false;
                    }
                    out.add_field(alias, Value::Null);
                }
                Ok(value) => {
                    match self.resolve(
                        &field.field_type,
                        value,
                        sel.selection_set.as_ref(),
                        &field_path,
                    ) {
                        Resolved::Value(v) => merge_key_into(out, alias, v),
                        Resolved::Nulled => return false,
                    }
                }
            }
        }

        for spread in &set.fragments {
            if self.ctx.is_cancelled() {
                self.report_cancelled(path);
                return true;
            }
            if is_excluded(&spread.directives) {
                continue;
            }
            if !fragment_applies(&spread.fragment.on, object, type_conditions) {
                continue;
            }
            if !self.fill_selection_set(
                object,
                source,
                &spread.fragment.selection_set,
                path,
                out,
                type_conditions,
            ) {
                return false;
            }
        }

        true
    }

    fn resolve(
        &self,
        expected: &TypeRef,
        value: FieldValue,
        selection_set: Option<&SelectionSet>,
        path: &FieldPath<'_>,
    ) -> Resolved {
        match expected {
            TypeRef::NonNull(inner) => {
                match self.resolve_inner(inner, value, selection_set, path) {
                    Resolved::Value(Value::Null) => {
                        self.push_error(
                            FieldError::new("cannot return null for non-nullable field"),
                            path,
                        );
                        Resolved::Nulled
                    }
                    other => other,
                }
            }
            nullable => match self.resolve_inner(nullable, value, selection_set, path) {
                // The nearest nullable ancestor absorbs the null.
                Resolved::Nulled => Resolved::Value(Value::Null),
                other => other,
            },
        }
    }

    fn resolve_inner(
        &self,
        expected: &TypeRef,
        value: FieldValue,
        selection_set: Option<&SelectionSet>,
        path: &FieldPath<'_>,
    ) -> Resolved {
        match expected {
            TypeRef::NonNull(_) => self.resolve(expected, value, selection_set, path),
            TypeRef::List(inner) => match value {
                FieldValue::Null => Resolved::Value(Value::Null),
                FieldValue::List(items) => {
                    let mut list = Vec::with_capacity(items.len());
                    for (index, item) in items.into_iter().enumerate() {
                        let item_path = FieldPath::Index(path, index);
                        match self.resolve(inner, item, selection_set, &item_path) {
                            Resolved::Value(v) => list.push(v),
                            Resolved::Nulled => return Resolved::Nulled,
                        }
                    }
                    Resolved::Value(Value::List(list))
                }
                FieldValue::Item(_) => {
                    self.push_error(
                        FieldError::new(format!("expected a list at position of {expected}")),
                        path,
                    );
                    Resolved::Nulled
                }
            },
            TypeRef::Named(name) => {
                let Some(meta) = self.schema.concrete_type_by_name(name) else {
                    self.push_error(
                        FieldError::new(format!("type \"{name}\" missing from schema")),
                        path,
                    );
                    return Resolved::Nulled;
                };
                match value {
                    FieldValue::Null => Resolved::Value(Value::Null),
                    FieldValue::List(_) => {
                        self.push_error(
                            FieldError::new(format!("unexpected list at position of {name}")),
                            path,
                        );
                        Resolved::Nulled
                    }
                    FieldValue::Item(item) => self.resolve_item(meta, item, selection_set, path),
                }
            }
        }
    }

    fn resolve_item(
        &self,
        meta: &MetaType,
        item: BoxAny,
        selection_set: Option<&SelectionSet>,
        path: &FieldPath<'_>,
    ) -> Resolved {
        match meta {
            MetaType::Scalar(s) => {
                let serialized = (s.serialize)(&*item).or_else(|| scalars::serialize_any(&*item));
                match serialized {
                    Some(v) => Resolved::Value(v),
                    None => {
                        self.push_error(
                            FieldError::new(format!(
                                "cannot serialize value as scalar {}",
                                s.name,
                            )),
                            path,
                        );
                        Resolved::Nulled
                    }
                }
            }
            MetaType::Enum(e) => match (e.to_name)(&*item) {
                Some(name) => Resolved::Value(Value::string(name.as_str())),
                None => {
                    self.push_error(
                        FieldError::new(format!("invalid value for enum {}", e.name)),
                        path,
                    );
                    Resolved::Nulled
                }
            },
            MetaType::Object(object) => {
                let Some(selection_set) = selection_set else {
                    self.push_error(
                        FieldError::new(format!(
                            "field of type {} must have a selection of subfields",
                            object.name,
                        )),
                        path,
                    );
                    return Resolved::Nulled;
                };
                let mut out = Object::with_capacity(selection_set.selections.len());
                if self.fill_selection_set(object, &*item, selection_set, path, &mut out, &[]) {
                    Resolved::Value(Value::Object(out))
                } else {
                    Resolved::Nulled
                }
            }
            MetaType::Interface(i) => {
                self.resolve_abstract(&i.name, &i.possible_types, item, selection_set, path)
            }
            MetaType::Union(u) => {
                self.resolve_abstract(&u.name, &u.members, item, selection_set, path)
            }
            MetaType::InputObject(io) => {
                self.push_error(
                    FieldError::new(format!(
                        "input object {} cannot appear in output positions",
                        io.name,
                    )),
                    path,
                );
                Resolved::Nulled
            }
        }
    }

    // Concretizes an interface or union value through the member casters,
    // then resolves it as the concrete object. Selections under a
    // type-qualified fragment only apply when the qualifier names the
    // concrete object, one of its interfaces, or the abstract type itself.
    fn resolve_abstract(
        &self,
        abstract_name: &ArcStr,
        members: &[MemberMeta],
        item: BoxAny,
        selection_set: Option<&SelectionSet>,
        path: &FieldPath<'_>,
    ) -> Resolved {
        let Some(selection_set) = selection_set else {
            self.push_error(
                FieldError::new(format!(
                    "field of type {abstract_name} must have a selection of subfields",
                )),
                path,
            );
            return Resolved::Nulled;
        };

        for member in members {
            let Some(concrete_value) = (member.cast)(&*item) else {
                continue;
            };
            let Some(MetaType::Object(object)) = self.schema.concrete_type_by_name(&member.name)
            else {
                self.push_error(
                    FieldError::new(format!(
                        "member \"{}\" of {} missing from schema",
                        member.name, abstract_name,
                    )),
                    path,
                );
                return Resolved::Nulled;
            };

            let mut out = Object::with_capacity(selection_set.selections.len());
            let conditions = [abstract_name.as_str()];
            return if self.fill_selection_set(
                object,
                concrete_value,
                selection_set,
                path,
                &mut out,
                &conditions,
            ) {
                Resolved::Value(Value::Object(out))
            } else {
                Resolved::Nulled
            };
        }

        self.push_error(
            FieldError::new(format!("value does not match any member of {abstract_name}")),
            path,
        );
        Resolved::Nulled
    }
}

fn fragment_applies(on: &str, object: &ObjectMeta, type_conditions: &[&str]) -> bool {
    on.is_empty()
        || on == object.name.as_str()
        || object.interfaces.iter().any(|i| i.as_str() == on)
        || type_conditions.contains(&on)
}

// Selection directives run before the resolver: skip first, include
// second; anything else is ignored here.
fn is_excluded(directives: &[Directive]) -> bool {
    for directive in directives {
        let condition = directive
            .args
            .as_object()
            .and_then(|o| o.get_field_value("if"))
            .and_then(Value::as_boolean);
        match (directive.name.as_str(), condition) {
            ("skip", Some(true)) => return true,
            ("include", Some(false)) => return true,
            _ => {}
        }
    }
    false
}

// Fields surfaced twice under one alias (typically via fragments) merge
// object-wise; the parser already rejected conflicting duplicates.
fn merge_key_into(result: &mut Object, response_name: &str, value: Value) {
    match result.get_field_value_mut(response_name) {
        Some(Value::Object(dest)) => {
            if let Value::Object(src) = value {
                merge_maps(dest, src);
            }
        }
        Some(Value::List(dest)) => {
            if let Value::List(src) = value {
                dest.iter_mut().zip(src).for_each(|(d, s)| {
                    if let (Value::Object(d_obj), Value::Object(s_obj)) = (d, s) {
                        merge_maps(d_obj, s_obj);
                    }
                });
            }
        }
        Some(_) => {}
        None => {
            result.add_field(response_name, value);
        }
    }
}

fn merge_maps(dest: &mut Object, src: Object) {
    for (key, value) in src {
        if dest.contains_field(&key) {
            merge_key_into(dest, &key, value);
        } else {
            dest.add_field(key, value);
        }
    }
}

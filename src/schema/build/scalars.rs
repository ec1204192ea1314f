//! The process-wide scalar registry and the built-in scalars.
//!
//! Scalars are registered globally rather than per schema: the registry maps
//! native type identity to a GraphQL name, an optional `@specifiedBy` URL
//! and the two coercion functions. It is initialized once with the built-in
//! set, treated as append-only, and duplicate registrations are rejected.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{Arc, LazyLock, RwLock},
};

use arcstr::ArcStr;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use derive_more::{Display, Error};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    executor::FieldError,
    schema::meta::{BoxAny, InputContext, InputParser, ScalarSerializer},
    value::Value,
};

/// An RFC3339 timestamp, exposed as the `Timestamp` scalar.
pub type Timestamp = DateTime<Utc>;

/// A span of time in whole seconds, exposed as the `Duration` scalar.
pub type Duration = chrono::Duration;

/// The GraphQL `ID` scalar: an opaque string identifier.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct ID(pub String);

impl From<String> for ID {
    fn from(s: String) -> Self {
        ID(s)
    }
}

impl From<&str> for ID {
    fn from(s: &str) -> Self {
        ID(s.into())
    }
}

impl fmt::Display for ID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A base64-encoded byte sequence, exposed as the `Bytes` scalar.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Bytes(pub Vec<u8>);

/// An opaque string-encoded map, exposed as the `Map` scalar. The wire form
/// is the base64 encoding of the underlying string.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Map {
    /// The encoded map content.
    pub value: String,
}

/// Error registering a custom scalar.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum ScalarError {
    /// The native type already has a scalar registration.
    #[display("native type {_0} is already registered as a scalar")]
    DuplicateType(#[error(not(source))] &'static str),

    /// Another native type already claimed this GraphQL name.
    #[display("scalar name \"{_0}\" is already registered")]
    DuplicateName(#[error(not(source))] String),
}

/// Options for scalar registration.
#[derive(Clone, Debug, Default)]
pub struct ScalarOptions {
    specified_by_url: Option<ArcStr>,
    description: Option<ArcStr>,
}

impl ScalarOptions {
    /// Attach the `@specifiedBy` URL exposed through
    /// `__Type.specifiedByURL`.
    #[must_use]
    pub fn specified_by(mut self, url: impl Into<ArcStr>) -> Self {
        self.specified_by_url = Some(url.into());
        self
    }

    /// Attach a description.
    #[must_use]
    pub fn description(mut self, text: impl Into<ArcStr>) -> Self {
        self.description = Some(text.into());
        self
    }
}

#[derive(Clone)]
pub(crate) struct ScalarEntry {
    pub(crate) name: ArcStr,
    pub(crate) description: Option<ArcStr>,
    pub(crate) specified_by_url: Option<ArcStr>,
    pub(crate) parse: InputParser,
    pub(crate) serialize: ScalarSerializer,
}

struct Registry {
    by_type: HashMap<TypeId, ScalarEntry>,
    names: HashMap<ArcStr, TypeId>,
}

static REGISTRY: LazyLock<RwLock<Registry>> = LazyLock::new(|| RwLock::new(built_ins()));

/// Register a custom scalar for the native type `T` under `name`, with
/// explicit from-input and to-output coercions.
pub fn register_scalar<T, P, S>(name: &str, parse: P, serialize: S) -> Result<(), ScalarError>
where
    T: Any + Send + Sync,
    P: Fn(&Value) -> Result<T, FieldError> + Send + Sync + 'static,
    S: Fn(&T) -> Value + Send + Sync + 'static,
{
    register_scalar_with(name, parse, serialize, ScalarOptions::default())
}

/// Like [`register_scalar`], with additional options such as the
/// `@specifiedBy` URL.
pub fn register_scalar_with<T, P, S>(
    name: &str,
    parse: P,
    serialize: S,
    options: ScalarOptions,
) -> Result<(), ScalarError>
where
    T: Any + Send + Sync,
    P: Fn(&Value) -> Result<T, FieldError> + Send + Sync + 'static,
    S: Fn(&T) -> Value + Send + Sync + 'static,
{
    let entry = make_entry::<T, P, S>(name, parse, serialize, options);
    let mut registry = REGISTRY.write().expect("scalar registry poisoned");

    if registry.by_type.contains_key(&TypeId::of::<T>()) {
        return Err(ScalarError::DuplicateType(std::any::type_name::<T>()));
    }
    if registry.names.contains_key(name) {
        return Err(ScalarError::DuplicateName(name.into()));
    }

    registry.names.insert(entry.name.clone(), TypeId::of::<T>());
    registry.by_type.insert(TypeId::of::<T>(), entry);
    tracing::debug!(scalar = name, "registered custom scalar");
    Ok(())
}

/// Register a scalar whose coercions go through the type's own JSON
/// representation, for types that already know how to (de)serialize
/// themselves.
pub fn register_json_scalar<T>(name: &str, options: ScalarOptions) -> Result<(), ScalarError>
where
    T: Any + Serialize + DeserializeOwned + Send + Sync,
{
    register_scalar_with::<T, _, _>(
        name,
        |value| {
            let json = serde_json::to_value(value)
                .map_err(|e| FieldError::new(e.to_string()))?;
            serde_json::from_value(json).map_err(|e| FieldError::new(e.to_string()))
        },
        |value| {
            serde_json::to_value(value)
                .ok()
                .and_then(|json| serde_json::from_value(json).ok())
                .unwrap_or(Value::Null)
        },
        options,
    )
}

fn make_entry<T, P, S>(name: &str, parse: P, serialize: S, options: ScalarOptions) -> ScalarEntry
where
    T: Any + Send + Sync,
    P: Fn(&Value) -> Result<T, FieldError> + Send + Sync + 'static,
    S: Fn(&T) -> Value + Send + Sync + 'static,
{
    ScalarEntry {
        name: name.into(),
        description: options.description,
        specified_by_url: options.specified_by_url,
        parse: Arc::new(move |value: &Value, _: &InputContext| {
            parse(value).map(|v| Box::new(v) as BoxAny)
        }),
        serialize: Arc::new(move |value: &dyn Any| {
            value.downcast_ref::<T>().map(&serialize)
        }),
    }
}

pub(crate) fn parser_for(id: TypeId) -> Option<InputParser> {
    REGISTRY
        .read()
        .expect("scalar registry poisoned")
        .by_type
        .get(&id)
        .map(|e| e.parse.clone())
}

pub(crate) fn entry_for(id: TypeId) -> Option<ScalarEntry> {
    REGISTRY
        .read()
        .expect("scalar registry poisoned")
        .by_type
        .get(&id)
        .cloned()
}

pub(crate) fn entry_by_name(name: &str) -> Option<ScalarEntry> {
    let registry = REGISTRY.read().expect("scalar registry poisoned");
    let id = registry.names.get(name)?;
    registry.by_type.get(id).cloned()
}

/// Serialize a native value through whichever scalar registration matches
/// its runtime type. This is what makes an `i32` resolver result usable at
/// a position built from an `i64` declaration: both carry the `Int` name.
pub(crate) fn serialize_any(value: &dyn Any) -> Option<Value> {
    let registry = REGISTRY.read().expect("scalar registry poisoned");
    let entry = registry.by_type.get(&value.type_id())?;
    (entry.serialize)(value)
}

fn built_ins() -> Registry {
    let mut registry = Registry {
        by_type: HashMap::new(),
        names: HashMap::new(),
    };

    // Aliased names are fine here: i32 and i64 both surface as `Int`.
    let mut add = |entry: ScalarEntry, id: TypeId| {
        registry.names.entry(entry.name.clone()).or_insert(id);
        registry.by_type.insert(id, entry);
    };

    add(
        make_entry::<String, _, _>(
            "String",
            |v| {
                v.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| FieldError::new("not a string"))
            },
            |s| Value::string(s.clone()),
            ScalarOptions::default(),
        ),
        TypeId::of::<String>(),
    );

    add(
        make_entry::<i64, _, _>(
            "Int",
            |v| v.as_int().ok_or_else(|| FieldError::new("not an integer")),
            |i| Value::Int(*i),
            ScalarOptions::default(),
        ),
        TypeId::of::<i64>(),
    );

    add(
        make_entry::<i32, _, _>(
            "Int",
            |v| {
                v.as_int()
                    .and_then(|i| i32::try_from(i).ok())
                    .ok_or_else(|| FieldError::new("not a 32 bit integer"))
            },
            |i| Value::Int((*i).into()),
            ScalarOptions::default(),
        ),
        TypeId::of::<i32>(),
    );

    add(
        make_entry::<f64, _, _>(
            "Float",
            |v| v.as_float().ok_or_else(|| FieldError::new("not a float")),
            |f| Value::Float(*f),
            ScalarOptions::default(),
        ),
        TypeId::of::<f64>(),
    );

    add(
        make_entry::<f32, _, _>(
            "Float",
            |v| {
                v.as_float()
                    .map(|f| f as f32)
                    .ok_or_else(|| FieldError::new("not a float"))
            },
            |f| Value::Float((*f).into()),
            ScalarOptions::default(),
        ),
        TypeId::of::<f32>(),
    );

    add(
        make_entry::<bool, _, _>(
            "Boolean",
            |v| {
                v.as_boolean()
                    .ok_or_else(|| FieldError::new("not a boolean"))
            },
            |b| Value::Boolean(*b),
            ScalarOptions::default(),
        ),
        TypeId::of::<bool>(),
    );

    add(
        make_entry::<ID, _, _>(
            "ID",
            |v| {
                v.as_str()
                    .map(ID::from)
                    .ok_or_else(|| FieldError::new("not a string"))
            },
            |id| Value::string(id.0.clone()),
            ScalarOptions::default(),
        ),
        TypeId::of::<ID>(),
    );

    add(
        make_entry::<Timestamp, _, _>(
            "Timestamp",
            |v| {
                let s = v.as_str().ok_or_else(|| FieldError::new("not a string"))?;
                DateTime::parse_from_rfc3339(s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| FieldError::new(e.to_string()))
            },
            |t| Value::string(t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ScalarOptions::default(),
        ),
        TypeId::of::<Timestamp>(),
    );

    add(
        make_entry::<Duration, _, _>(
            "Duration",
            |v| {
                v.as_int()
                    .map(Duration::seconds)
                    .ok_or_else(|| FieldError::new("not an integer"))
            },
            |d| Value::Int(d.num_seconds()),
            ScalarOptions::default(),
        ),
        TypeId::of::<Duration>(),
    );

    add(
        make_entry::<Map, _, _>(
            "Map",
            |v| {
                let s = v.as_str().ok_or_else(|| FieldError::new("not a string"))?;
                let decoded = BASE64
                    .decode(s)
                    .map_err(|_| FieldError::new("not a base64 string"))?;
                String::from_utf8(decoded)
                    .map(|value| Map { value })
                    .map_err(|_| FieldError::new("not a utf-8 encoded map"))
            },
            |m| Value::string(BASE64.encode(m.value.as_bytes())),
            ScalarOptions::default(),
        ),
        TypeId::of::<Map>(),
    );

    add(
        make_entry::<Bytes, _, _>(
            "Bytes",
            |v| {
                let s = v.as_str().ok_or_else(|| FieldError::new("not a string"))?;
                BASE64
                    .decode(s)
                    .map(Bytes)
                    .map_err(|_| FieldError::new("not a base64 string"))
            },
            |b| Value::string(BASE64.encode(&b.0)),
            ScalarOptions::default(),
        ),
        TypeId::of::<Bytes>(),
    );

    registry
}

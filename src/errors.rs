//! The structured errors that land in the response envelope.
//!
//! Every error carries a message, a free-form extensions map holding at least
//! an error code, and the path from the response root to the position the
//! error applies to. Errors are never thrown past the executor boundary;
//! request-level failures (parse, validation) simply produce an envelope
//! whose `data` is null.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::{executor::FieldError, value::Value};

/// The error code reported when nothing more specific is known.
pub const CODE_UNKNOWN: &str = "Unknown";

/// One segment of an error path: an output alias or a list index.
#[derive(Clone, Debug, PartialEq)]
pub enum PathSegment {
    /// The output alias of a field.
    Field(String),
    /// The index of a list element.
    Index(usize),
}

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Field(name) => serializer.serialize_str(name),
            Self::Index(i) => serializer.serialize_u64(*i as u64),
        }
    }
}

/// A single entry of the `errors` list in the response envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    /// Human-readable description of the failure.
    pub message: String,
    /// Machine-readable error metadata; always contains a `code` entry.
    pub extensions: Extensions,
    /// Mixed alias/index path into `data`, empty for request-level errors.
    pub paths: Vec<PathSegment>,
}

/// The `extensions` object attached to every error.
#[derive(Clone, Debug, PartialEq)]
pub struct Extensions {
    /// The error code; defaults to [`CODE_UNKNOWN`].
    pub code: String,
    /// Any further entries the error producer attached.
    pub values: IndexMap<String, Value>,
}

impl Default for Extensions {
    fn default() -> Self {
        Extensions {
            code: CODE_UNKNOWN.into(),
            values: IndexMap::new(),
        }
    }
}

impl Serialize for Extensions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.values.len()))?;
        map.serialize_entry("code", &self.code)?;
        for (k, v) in &self.values {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("message", &self.message)?;
        map.serialize_entry("extensions", &self.extensions)?;
        map.serialize_entry("paths", &Paths(&self.paths))?;
        map.end()
    }
}

struct Paths<'a>(&'a [PathSegment]);

impl Serialize for Paths<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for p in self.0 {
            seq.serialize_element(p)?;
        }
        seq.end()
    }
}

impl Error {
    /// Create a request-level error with the default code and an empty path.
    pub fn new<M: Into<String>>(message: M) -> Self {
        Error {
            message: message.into(),
            extensions: Extensions::default(),
            paths: Vec::new(),
        }
    }

    /// Attach a path to this error.
    pub fn at(mut self, paths: Vec<PathSegment>) -> Self {
        self.paths = paths;
        self
    }

    /// Attach an extension entry to this error.
    pub fn extension<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.extensions.values.insert(key.into(), value);
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

impl From<FieldError> for Error {
    fn from(e: FieldError) -> Self {
        let (message, mut values) = e.into_parts();
        let code = match values.shift_remove("code") {
            Some(Value::String(code)) => code,
            Some(other) => other.to_json_string(),
            None => CODE_UNKNOWN.into(),
        };
        Error {
            message,
            extensions: Extensions { code, values },
            paths: Vec::new(),
        }
    }
}

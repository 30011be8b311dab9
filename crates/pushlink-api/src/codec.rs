// Transaction codecs
//
// A codec turns a `Record` into a request body and a response body back
// into a `Payload`. The executor is parameterized by one; JSON is the only
// content type the backend serves.

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::Error;
use crate::record::Record;

/// A decoded response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A single entity.
    Object(Record),
    /// A collection. Elements that were not objects are kept so the
    /// caller can decide whether that is acceptable.
    Array(Vec<Payload>),
    /// A bare value found inside an array.
    Scalar(String),
}

impl Payload {
    pub fn as_object(&self) -> Option<&Record> {
        match self {
            Self::Object(rec) => Some(rec),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Record> {
        match self {
            Self::Object(rec) => Some(rec),
            _ => None,
        }
    }

    /// Convert an array of objects into records. `None` if this is not an
    /// array or any element is not an object.
    pub fn into_records(self) -> Option<Vec<Record>> {
        match self {
            Self::Array(items) => items.into_iter().map(Payload::into_object).collect(),
            _ => None,
        }
    }
}

/// Encode/decode capability injected into the transaction executor.
pub trait Codec: Send + Sync {
    /// Value for the `Accept` / `Content-Type` headers.
    fn mime_type(&self) -> &'static str;

    fn encode(&self, record: &Record) -> Result<Vec<u8>, Error>;

    fn decode(&self, body: &[u8]) -> Result<Payload, Error>;
}

/// `application/json` codec. Every field crosses the wire as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn mime_type(&self) -> &'static str {
        "application/json"
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let object: Map<String, Value> = record
            .iter()
            .map(|(k, v)| (k.to_owned(), Value::String(v.to_owned())))
            .collect();
        serde_json::to_vec(&Value::Object(object)).map_err(|e| Error::MalformedPayload {
            message: e.to_string(),
            body: String::new(),
        })
    }

    fn decode(&self, body: &[u8]) -> Result<Payload, Error> {
        let text = String::from_utf8_lossy(body);
        let trimmed = text.trim_start();

        if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
            return Err(Error::MalformedPayload {
                message: "expected a JSON object or array".into(),
                body: text.into_owned(),
            });
        }

        let value: Value = serde_json::from_str(trimmed).map_err(|e| Error::MalformedPayload {
            message: e.to_string(),
            body: text.to_string(),
        })?;
        trace!(%value, "decoded body");

        Ok(from_value(value))
    }
}

fn from_value(value: Value) -> Payload {
    match value {
        Value::Object(map) => Payload::Object(record_from_map(map)),
        Value::Array(items) => Payload::Array(items.into_iter().map(from_value).collect()),
        other => Payload::Scalar(stringify(other)),
    }
}

fn record_from_map(map: Map<String, Value>) -> Record {
    map.into_iter().map(|(k, v)| (k, stringify(v))).collect()
}

/// JSON strings come through verbatim; everything else as compact JSON text.
fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

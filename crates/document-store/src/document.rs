use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::DocumentId;

/// Version number of a document, used for optimistic concurrency control.
///
/// A freshly inserted document is at version 1; every replacement
/// increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of a document that does not exist yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version (1) assigned on insert.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A JSON document stored in a named collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier of the document.
    pub id: DocumentId,

    /// The collection the document belongs to (e.g. "products").
    pub collection: String,

    /// Current version; 1 after insert.
    pub version: Version,

    /// Optional key that must be unique within the collection.
    pub unique_key: Option<String>,

    /// The document body.
    pub body: serde_json::Value,

    /// When the document was first inserted.
    pub created_at: DateTime<Utc>,

    /// When the document was last written.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a new document builder for the given collection and ID.
    pub fn builder(collection: impl Into<String>, id: DocumentId) -> DocumentBuilder {
        DocumentBuilder::new(collection, id)
    }

    /// Deserializes the body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }

    /// Returns a copy of this document carrying a new body, keeping identity
    /// and timestamps. Used to prepare a conditional replacement.
    pub fn with_body<T: Serialize>(&self, body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            body: serde_json::to_value(body)?,
            ..self.clone()
        })
    }
}

/// Builder for constructing documents.
#[derive(Debug)]
pub struct DocumentBuilder {
    id: DocumentId,
    collection: String,
    unique_key: Option<String>,
    body: serde_json::Value,
    created_at: Option<DateTime<Utc>>,
}

impl DocumentBuilder {
    /// Starts a document in `collection` with identifier `id` and an empty body.
    pub fn new(collection: impl Into<String>, id: DocumentId) -> Self {
        Self {
            id,
            collection: collection.into(),
            unique_key: None,
            body: serde_json::Value::Object(serde_json::Map::new()),
            created_at: None,
        }
    }

    /// Sets the body from a serializable value.
    pub fn body<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = serde_json::to_value(body)?;
        Ok(self)
    }

    /// Sets the body from a raw JSON value.
    pub fn body_raw(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }

    /// Sets a key that must be unique within the collection.
    pub fn unique_key(mut self, key: impl Into<String>) -> Self {
        self.unique_key = Some(key.into());
        self
    }

    /// Sets the creation timestamp. If not set, the current time will be used.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Builds the document at [`Version::first`].
    pub fn build(self) -> Document {
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        Document {
            id: self.id,
            collection: self.collection,
            version: Version::first(),
            unique_key: self.unique_key,
            body: self.body,
            created_at,
            updated_at: created_at,
        }
    }
}

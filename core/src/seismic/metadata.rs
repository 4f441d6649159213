use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered list of metadata keys, used to select what is copied between objects.
pub type MetadataList = Vec<String>;

/// Lookup failure on a [`Metadata`] map.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("key `{0}` not found")]
    Missing(String),
    #[error("key `{key}` is not of type {expected}")]
    WrongType { key: String, expected: &'static str },
}

/// Open-ended key-value attributes attached to traces and ensembles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    attributes: Map<String, Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    fn require(&self, key: &str) -> Result<&Value, MetadataError> {
        self.attributes
            .get(key)
            .ok_or_else(|| MetadataError::Missing(key.to_string()))
    }

    pub fn get_double(&self, key: &str) -> Result<f64, MetadataError> {
        self.require(key)?
            .as_f64()
            .ok_or_else(|| MetadataError::WrongType {
                key: key.to_string(),
                expected: "real",
            })
    }

    pub fn get_int(&self, key: &str) -> Result<i64, MetadataError> {
        self.require(key)?
            .as_i64()
            .ok_or_else(|| MetadataError::WrongType {
                key: key.to_string(),
                expected: "integer",
            })
    }

    pub fn get_string(&self, key: &str) -> Result<String, MetadataError> {
        self.require(key)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| MetadataError::WrongType {
                key: key.to_string(),
                expected: "string",
            })
    }

    /// Copy every key in `keys` from `self` into `to`. A missing key is an error.
    pub fn copy_selected(&self, to: &mut Metadata, keys: &[String]) -> Result<(), MetadataError> {
        for key in keys {
            let value = self.require(key)?.clone();
            to.attributes.insert(key.clone(), value);
        }
        Ok(())
    }
}

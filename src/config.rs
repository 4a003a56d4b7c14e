//! Optional JSON configuration: document `info` and registry extensions.
//!
//! ```json
//! {
//!   "info": { "title": "Users", "version": "1.0.0" },
//!   "combinators": {
//!     "my-codecs": {
//!       "Email": { "schema": { "type": "string", "format": "email" } },
//!       "Id": { "alias": "io-ts#string" }
//!     }
//!   }
//! }
//! ```
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::document::Info;
use crate::ir::{Literal, PrimitiveKind, Schema};
use crate::registry::Registry;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("at JSON path {path} → {message}")]
    Json { path: String, message: String },
    #[error("combinator `{module}#{name}`: {reason}")]
    Combinator {
        module: String,
        name: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub info: Info,
    /// module → exported name → definition
    #[serde(default)]
    pub combinators: IndexMap<String, IndexMap<String, CombinatorDef>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinatorDef {
    /// Zero-argument codec with a fixed schema.
    Schema(FixedSchema),
    /// `"module#name"` of an already registered combinator.
    Alias(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixedSchema {
    /// Omitted means "any value".
    #[serde(rename = "type", default)]
    pub kind: Option<PrimitiveKind>,
    #[serde(rename = "enum", default)]
    pub values: Option<Vec<Value>>,
    /// Every other keyword is passed through to the wire schema.
    #[serde(flatten)]
    pub annotations: IndexMap<String, Value>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        from_slice_with_path(&bytes)
    }

    pub fn from_json(src: &str) -> Result<Self, ConfigError> {
        from_str_with_path(src)
    }

    /// Register fixed schemas first, then aliases (which may point at them).
    pub fn apply(&self, registry: &mut Registry) -> Result<(), ConfigError> {
        for (module, entries) in &self.combinators {
            for (name, def) in entries {
                if let CombinatorDef::Schema(fixed) = def {
                    let schema = fixed.to_schema().map_err(|reason| ConfigError::Combinator {
                        module: module.clone(),
                        name: name.clone(),
                        reason,
                    })?;
                    registry.register_schema(module, name, schema);
                }
            }
        }
        for (module, entries) in &self.combinators {
            for (name, def) in entries {
                let CombinatorDef::Alias(target) = def else { continue };
                let fail = |reason: String| ConfigError::Combinator {
                    module: module.clone(),
                    name: name.clone(),
                    reason,
                };
                let (target_module, target_name) = target
                    .rsplit_once('#')
                    .ok_or_else(|| {
                        fail(format!("alias `{target}` is not of the form `module#name`"))
                    })?;
                registry
                    .alias(module, name, target_module, target_name)
                    .map_err(|e| fail(e.to_string()))?;
            }
        }
        Ok(())
    }
}

impl FixedSchema {
    fn to_schema(&self) -> Result<Schema, String> {
        let mut schema = match (self.kind, &self.values) {
            (None, None) => Schema::any(),
            (None, Some(_)) => return Err("`enum` needs a `type`".to_string()),
            (Some(kind), None) => Schema::primitive(kind),
            (Some(kind), Some(values)) => {
                let values = values.iter().map(literal).collect::<Result<Vec<_>, _>>()?;
                Schema::enumeration(kind, values)
            }
        };
        schema.meta.annotations = self.annotations.clone();
        Ok(schema)
    }
}

fn literal(value: &Value) -> Result<Literal, String> {
    match value {
        Value::String(s) => Ok(Literal::String(s.clone())),
        Value::Bool(b) => Ok(Literal::Boolean(*b)),
        Value::Null => Ok(Literal::Null),
        Value::Number(n) => n
            .as_f64()
            .map(Literal::number)
            .ok_or_else(|| format!("bad number {n}")),
        other => Err(format!("enum values must be scalars, got {other}")),
    }
}

// -------------------- path-aware deserialization --------------------

fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, ConfigError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| ConfigError::Json {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ConfigError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| ConfigError::Json {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

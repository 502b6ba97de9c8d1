//! Typed views over the JSON `meta` columns.
//!
//! Both structs keep unknown keys in `extra` so values written by other tools, or by
//! a future version, survive a load/save cycle untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Metadata attached to a migration script.
///
/// Filled once from the script header when the file is discovered, then edited by
/// flagging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_message: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Metadata attached to a single successful run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ScriptMeta {
    /// Builds metadata from loosely keyed header values. Known keys are matched
    /// case-insensitively, everything else lands in `extra`.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut meta = ScriptMeta::default();
        for (key, value) in pairs {
            match key.to_lowercase().as_str() {
                "author" => meta.author = scalar_string(&value),
                "link" => meta.link = scalar_string(&value),
                "description" => meta.description = scalar_string(&value),
                "flag_message" => meta.flag_message = scalar_string(&value),
                _ => {
                    meta.extra.insert(key, value);
                }
            }
        }
        meta
    }

    /// Reads a stored mapping key by key, so a known key with an odd type is coerced
    /// instead of discarding the rest. Anything but an object reads as empty.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from_pairs(map.clone()),
            _ => ScriptMeta::default(),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    pub fn is_empty(&self) -> bool {
        self.author.is_none()
            && self.link.is_none()
            && self.description.is_none()
            && self.flag_message.is_none()
            && self.extra.is_empty()
    }
}

impl RunMeta {
    pub fn for_runner(runner: &str) -> Self {
        RunMeta {
            runner: Some(runner.to_string()).filter(|r| !r.is_empty()),
            ..RunMeta::default()
        }
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut meta = RunMeta::default();
        for (key, value) in pairs {
            match key.as_str() {
                "runner" => meta.runner = scalar_string(&value),
                "notes" => meta.notes = scalar_string(&value),
                _ => {
                    meta.extra.insert(key, value);
                }
            }
        }
        meta
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from_pairs(map.clone()),
            _ => RunMeta::default(),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

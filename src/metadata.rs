// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! The package metadata document.
//!
//! A package carries an unordered mapping from string keys to arbitrary YAML
//! values. The document travels inside the archive as `.olut/metadata.yaml`
//! and is merged from up to three layers: SCM-derived defaults, the project's
//! own metadata file, and command line overrides.

use std::io::{Read, Write};

use indexmap::IndexMap;
use serde_yaml_ng::Value;

use crate::error::*;

/// A package metadata document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    doc: IndexMap<String, Value>,
}

impl Metadata {
    /// Parse a metadata document from a string.
    pub fn parse(text: &str) -> Result<Metadata> {
        let doc = serde_yaml_ng::from_str(text)
            .map_err(|cause| Error::chain("Cannot parse metadata document.", cause))?;
        Ok(Metadata { doc })
    }

    /// Read a metadata document from a byte stream.
    pub fn load<R: Read>(reader: R) -> Result<Metadata> {
        let doc = serde_yaml_ng::from_reader(reader)
            .map_err(|cause| Error::chain("Cannot parse metadata document.", cause))?;
        Ok(Metadata { doc })
    }

    /// Build a metadata document from `name=value` command line overrides.
    ///
    /// Values are stored as strings.
    pub fn from_overrides<I, S>(pairs: I) -> Result<Metadata>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut meta = Metadata::default();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                Error::new(format!(
                    "Metadata override `{}` is not of the form name=value.",
                    pair
                ))
            })?;
            meta.set(key, value);
        }
        Ok(meta)
    }

    /// Serialize the document to a byte stream as block-style YAML.
    pub fn dump<W: Write>(&self, writer: W) -> Result<()> {
        serde_yaml_ng::to_writer(writer, &self.doc)
            .map_err(|cause| Error::chain("Cannot serialize metadata document.", cause))
    }

    /// Serialize the document to a string.
    pub fn dump_string(&self) -> Result<String> {
        serde_yaml_ng::to_string(&self.doc)
            .map_err(|cause| Error::chain("Cannot serialize metadata document.", cause))
    }

    /// Shallow-merge another document into this one.
    ///
    /// Keys of `other` overwrite keys already present.
    pub fn merge(&mut self, other: &Metadata) {
        for (key, value) in &other.doc {
            self.doc.insert(key.clone(), value.clone());
        }
    }

    /// Look up a top-level value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }

    /// Look up a top-level string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// Set a top-level value.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.doc.insert(key.to_string(), value.into());
    }

    /// Fetch a required identifier such as `name` or `version`.
    ///
    /// Numbers are coerced to their string form; the result must be non-empty
    /// and must not contain a `/`.
    pub fn ident(&self, key: &str) -> Result<String> {
        let value = match self.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => {
                return Err(Error::new(format!(
                    "Metadata key `{}` must be a scalar.",
                    key
                )));
            }
            None => {
                return Err(Error::new(format!(
                    "Metadata is missing the `{}` key.",
                    key
                )));
            }
        };
        if value.is_empty() || value.contains('/') {
            return Err(Error::new(format!(
                "Metadata key `{}` must be a non-empty identifier without `/`, got `{}`.",
                key, value
            )));
        }
        Ok(value)
    }

    /// Remove a list-of-strings key and return its entries.
    ///
    /// Used for `exclude_files` and `include_files`, which are consumed at
    /// build time and never persisted.
    pub fn take_string_list(&mut self, key: &str) -> Vec<String> {
        match self.doc.shift_remove(key) {
            Some(Value::Sequence(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The top-level scalar entries in string form.
    ///
    /// Only strings and numbers qualify; collections, booleans and nulls are
    /// skipped. This drives the `META_*` environment of the hook runner.
    pub fn scalar_entries(&self) -> Vec<(String, String)> {
        self.doc
            .iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some((key.clone(), value))
            })
            .collect()
    }

    /// Whether the document has no entries.
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Label table mapping class indices to human-readable names

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

fn names_entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // `0: 'person'` or `0: "person"`, quotes may be escaped inside
        Regex::new(r#"(\d+)\s*:\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")"#)
            .expect("names regex is valid")
    })
}

/// Mapping from a model's class index to its name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    names: BTreeMap<usize, String>,
}

impl LabelTable {
    pub fn new(names: BTreeMap<usize, String>) -> Self {
        Self { names }
    }

    /// Parse the `names` entry of Ultralytics ONNX metadata
    ///
    /// The exporter writes a Python dict literal, e.g.
    /// `{0: 'person', 1: 'bicycle'}`. Entries that do not match are skipped.
    pub fn from_metadata(raw: &str) -> Self {
        let names = names_entry_regex()
            .captures_iter(raw)
            .filter_map(|cap| {
                let id = cap.get(1)?.as_str().parse::<usize>().ok()?;
                let name = cap.get(2).or_else(|| cap.get(3))?.as_str();
                Some((id, unescape(name)))
            })
            .collect();
        Self::new(names)
    }

    /// Load a labels file
    ///
    /// `.json` files may hold an array of names or an object keyed by class
    /// index. Any other file is read as one name per line, blank lines skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read labels file {}", path.display()))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json(&contents)
                .with_context(|| format!("Invalid labels file {}", path.display()))
        } else {
            let names = contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .enumerate()
                .map(|(id, name)| (id, name.to_string()))
                .collect();
            Ok(Self::new(names))
        }
    }

    fn from_json(contents: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(contents)?;
        let names = match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(id, item)| match item {
                    serde_json::Value::String(name) => Ok((id, name)),
                    other => anyhow::bail!("label {} is not a string: {}", id, other),
                })
                .collect::<Result<BTreeMap<_, _>>>()?,
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(key, item)| {
                    let id = key
                        .parse::<usize>()
                        .with_context(|| format!("label key '{}' is not a class index", key))?;
                    match item {
                        serde_json::Value::String(name) => Ok((id, name)),
                        other => anyhow::bail!("label {} is not a string: {}", id, other),
                    }
                })
                .collect::<Result<BTreeMap<_, _>>>()?,
            other => anyhow::bail!("expected an array or object of labels, got {}", other),
        };
        Ok(Self::new(names))
    }

    /// Resolve a class index to its name, falling back to the stringified id
    pub fn resolve(&self, class_id: usize) -> String {
        self.names
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| class_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn unescape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

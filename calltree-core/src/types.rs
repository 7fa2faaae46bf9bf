//! Data models for extracted callable units and persisted records.
//!
//! The persisted shapes mirror the JSON produced by earlier preprocessing
//! runs: document trees use `__data__`/`__children__`, unit payloads carry
//! `name`/`params`/`body`/`type`, and bundles group the forest, the call
//! graph and the node set of one source file.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::graph::CallGraph;

/// Kind of callable unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    #[serde(rename = "func")]
    Function,
    #[serde(rename = "lambda")]
    Lambda,
    #[serde(rename = "class")]
    Class,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Function => "func",
            UnitKind::Lambda => "lambda",
            UnitKind::Class => "class",
        }
    }
}

/// One function, lambda or class definition found in a source file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallableUnit {
    /// Definition name; `None` for lambdas.
    pub name: Option<String>,
    pub params: Vec<String>,
    /// Verbatim source of the whole definition.
    pub body: String,
    /// `body` with calls to known units wrapped in `#<call>…</call>`.
    pub marked_body: String,
    pub kind: UnitKind,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: u32,
    pub end_line: u32,
}

/// Payload attached to each node of an extracted forest.
///
/// The synthetic forest root only carries `name = "root"`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<UnitKind>,
}

impl UnitPayload {
    pub fn root() -> Self {
        Self {
            name: Some("root".to_string()),
            ..Default::default()
        }
    }
}

impl From<&CallableUnit> for UnitPayload {
    fn from(unit: &CallableUnit) -> Self {
        Self {
            name: unit.name.clone(),
            params: Some(unit.params.clone()),
            body: Some(unit.body.clone()),
            kind: Some(unit.kind),
        }
    }
}

/// A nested `{__data__, __children__}` document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode<T = serde_json::Value> {
    #[serde(rename = "__data__")]
    pub data: T,
    #[serde(rename = "__children__", default = "Vec::new")]
    pub children: Vec<DocumentNode<T>>,
}

impl<T> DocumentNode<T> {
    pub fn leaf(data: T) -> Self {
        Self {
            data,
            children: Vec::new(),
        }
    }

    pub fn with_children(data: T, children: Vec<DocumentNode<T>>) -> Self {
        Self { data, children }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

/// Entry of a bundle's node set: one named unit, keyed by its name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    /// Source with call markers; absent in bundles written before markers existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emb_repr: Option<String>,
}

/// Persisted extraction of one source file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub code: DocumentNode<UnitPayload>,
    pub call_tree: CallGraph,
    pub node_set: NameMap<NodeRecord>,
    #[serde(default)]
    pub call_set: NameMap<u32>,
}

/// Insertion-ordered map keyed by unit name.
///
/// Re-inserting an existing key replaces the value in place, so iteration
/// order always reflects first appearance.
#[derive(Clone, PartialEq)]
pub struct NameMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> NameMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    /// Insert or replace, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get_or_insert_with(&mut self, name: &str, make: impl FnOnce() -> V) -> &mut V {
        let i = match self.index.get(name) {
            Some(&i) => i,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push((name.to_string(), make()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[i].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<V> Default for NameMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for NameMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for NameMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = NameMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for NameMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for NameMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NameMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for NameMapVisitor<V> {
            type Value = NameMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map keyed by unit name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<NameMap<V>, A::Error> {
                let mut map = NameMap::new();
                while let Some((k, v)) = access.next_entry::<String, V>()? {
                    map.insert(k, v);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(NameMapVisitor(PhantomData))
    }
}

//! The tagged tree representation shared by every dynamic-port-breakout
//! component.
//!
//! Config DB, the YANG data tree, and the on-disk defaults file are all
//! "the same shape": a map from string keys to maps/lists/scalars, nested
//! arbitrarily. [`Node`] is that shape made explicit so the key searcher,
//! diff engine, and merge engine can all dispatch on one tag instead of each
//! re-deriving "is this a dict, a list, or a leaf" from a dynamically typed
//! value.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar leaf value.
///
/// `Null` is distinct from a key being absent from its parent map. Config DB
/// itself has no native null scalar; `Null` is only ever synthesized by the
/// diff engine's row-delete sentinel (see `sonic_dpb_transform::diff`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Str(s) => write!(f, "{s}"),
            ScalarValue::Int(i) => write!(f, "{i}"),
            ScalarValue::Float(v) => write!(f, "{v}"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Str(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Str(s)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int(v)
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Bool(v)
    }
}

/// A configuration (sub)tree: a map, an ordered list, or a scalar leaf.
///
/// Maps use a `BTreeMap` rather than a hash map so that iteration order is
/// deterministic across runs. The YANG schema does not care about key
/// order (see spec invariants), but reproducible logs and stable test
/// fixtures do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Map(BTreeMap<String, Node>),
    List(Vec<Node>),
    Scalar(ScalarValue),
}

impl Default for Node {
    fn default() -> Self {
        Node::empty_map()
    }
}

impl Node {
    /// Creates an empty map node.
    pub fn empty_map() -> Self {
        Node::Map(BTreeMap::new())
    }

    /// Creates an empty list node.
    pub fn empty_list() -> Self {
        Node::List(Vec::new())
    }

    /// Creates a scalar node from anything convertible to [`ScalarValue`].
    pub fn scalar(value: impl Into<ScalarValue>) -> Self {
        Node::Scalar(value.into())
    }

    /// The "delete entire row" sentinel: a bare scalar null.
    ///
    /// Config DB semantics: writing `null` at a row position deletes the
    /// row outright.
    pub fn null() -> Self {
        Node::Scalar(ScalarValue::Null)
    }

    /// Returns an empty container with the same shape as `self`
    /// (`Map` -> empty `Map`, `List` -> empty `List`). Used by the key
    /// searcher when it needs to recurse speculatively into a key before
    /// knowing whether the key's subtree mentions a target port.
    ///
    /// Panics if called on a scalar; callers only call this while already
    /// inside a map-or-list dispatch.
    pub fn empty_like(&self) -> Self {
        match self {
            Node::Map(_) => Node::empty_map(),
            Node::List(_) => Node::empty_list(),
            Node::Scalar(_) => panic!("empty_like called on a scalar Node"),
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Node::Map(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Node::List(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Node::Scalar(_))
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, Node>> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Node>> {
        match self {
            Node::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(ScalarValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns true if `self` is empty container (empty map or empty list).
    /// Scalars are never "empty" in this sense.
    pub fn is_empty_container(&self) -> bool {
        match self {
            Node::Map(m) => m.is_empty(),
            Node::List(l) => l.is_empty(),
            Node::Scalar(_) => false,
        }
    }

    /// Looks up a top-level table by name, treating `self` as the root of a
    /// configuration tree (a `Map` from table name to table contents).
    pub fn table(&self, name: &str) -> Option<&Node> {
        self.as_map().and_then(|m| m.get(name))
    }

    /// Convenience for building the root of a configuration tree from
    /// table-name/table-contents pairs.
    pub fn root(tables: impl IntoIterator<Item = (String, Node)>) -> Self {
        Node::Map(tables.into_iter().collect())
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Node::Scalar(ScalarValue::Null),
            serde_json::Value::Bool(b) => Node::Scalar(ScalarValue::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Node::Scalar(ScalarValue::Int(i))
                } else {
                    Node::Scalar(ScalarValue::Float(n.as_f64().unwrap_or_default()))
                }
            }
            serde_json::Value::String(s) => Node::Scalar(ScalarValue::Str(s)),
            serde_json::Value::Array(items) => {
                Node::List(items.into_iter().map(Node::from).collect())
            }
            serde_json::Value::Object(map) => {
                Node::Map(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl From<Node> for serde_json::Value {
    fn from(node: Node) -> Self {
        match node {
            Node::Scalar(ScalarValue::Null) => serde_json::Value::Null,
            Node::Scalar(ScalarValue::Bool(b)) => serde_json::Value::Bool(b),
            Node::Scalar(ScalarValue::Int(i)) => serde_json::Value::from(i),
            Node::Scalar(ScalarValue::Float(f)) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Node::Scalar(ScalarValue::Str(s)) => serde_json::Value::String(s),
            Node::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Node::Map(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_like_preserves_shape() {
        assert!(Node::empty_map().empty_like().is_map());
        assert!(Node::empty_list().empty_like().is_list());
    }

    #[test]
    #[should_panic]
    fn empty_like_panics_on_scalar() {
        Node::scalar("x").empty_like();
    }

    #[test]
    fn table_lookup() {
        let root = Node::root([("PORT".to_string(), Node::empty_map())]);
        assert!(root.table("PORT").is_some());
        assert!(root.table("VLAN").is_none());
    }

    #[test]
    fn json_roundtrip() {
        let json = serde_json::json!({
            "PORT": {
                "Ethernet0": {
                    "speed": "25000",
                    "lanes": "65",
                    "admin_status": "up",
                }
            },
            "VLAN": {
                "Vlan100": {
                    "vlanid": "100",
                    "members": ["Ethernet0"]
                }
            }
        });

        let node: Node = json.clone().into();
        let back: serde_json::Value = node.into();
        assert_eq!(json, back);
    }

    #[test]
    fn null_is_distinct_from_absent() {
        let with_null = Node::root([("k".to_string(), Node::null())]);
        assert!(with_null.table("k").is_some());
        assert_eq!(with_null.table("k"), Some(&Node::null()));

        let without = Node::root([]);
        assert!(without.table("k").is_none());
    }
}

//! Universal parameter value type and the per-query parameter table.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A decoded node reference, as it comes back over the wire.
///
/// This is a value, not a live handle: it carries whatever the server sent
/// and nothing more. There is no back-reference to a session or backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: i64,
    pub element_id: Option<String>,
    pub labels: Vec<String>,
    pub properties: HashMap<String, Value>,
}

/// A decoded relationship reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRef {
    pub id: i64,
    pub element_id: Option<String>,
    pub start_node_id: i64,
    pub end_node_id: i64,
    pub rel_type: String,
    pub properties: HashMap<String, Value>,
}

/// A decoded path: alternating nodes and relationships, always
/// `nodes.len() == relationships.len() + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRef {
    pub nodes: Vec<NodeRef>,
    pub relationships: Vec<RelationshipRef>,
}

/// A relationship as it appears inside a `Path`'s own wire encoding: no
/// start/end node ids, since those are implied by the path's node sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnboundRelationshipRef {
    pub id: i64,
    pub element_id: Option<String>,
    pub rel_type: String,
    pub properties: HashMap<String, Value>,
}

/// A calendar date with no time-of-day component (PackStream tag `D`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateValue(pub NaiveDate);

/// An ISO-8601-style duration: months/days are kept separate from seconds
/// since their real-world length varies (PackStream tag `E`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationValue {
    pub months: i64,
    pub days: i64,
    pub seconds: i64,
    pub nanoseconds: i64,
}

/// A Cartesian 2D point tagged with a spatial reference id (PackStream tag
/// `X`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point2DValue {
    pub srid: i64,
    pub x: f64,
    pub y: f64,
}

impl PartialEq for Point2DValue {
    fn eq(&self, other: &Self) -> bool {
        self.srid == other.srid && self.x.to_bits() == other.x.to_bits() && self.y.to_bits() == other.y.to_bits()
    }
}

/// A Cartesian 3D point (PackStream tag `Y`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point3DValue {
    pub srid: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PartialEq for Point3DValue {
    fn eq(&self, other: &Self) -> bool {
        self.srid == other.srid
            && self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
            && self.z.to_bits() == other.z.to_bits()
    }
}

/// The universe of literals admissible as Cypher parameters (§3 Value).
///
/// Values are immutable once constructed. Equality is structural, with one
/// exception: two `Float(NaN)` values compare equal only when their bit
/// patterns match, so that parameter interning never silently conflates two
/// differently-produced NaNs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Node(NodeRef),
    Relationship(RelationshipRef),
    UnboundRelationship(UnboundRelationshipRef),
    Path(PathRef),
    DateTime(DateTime<Utc>),
    Date(DateValue),
    Duration(DurationValue),
    Point2D(Point2DValue),
    Point3D(Point3DValue),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::Relationship(a), Value::Relationship(b)) => a == b,
            (Value::UnboundRelationship(a), Value::UnboundRelationship(b)) => a == b,
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Point2D(a), Value::Point2D(b)) => a == b,
            (Value::Point3D(a), Value::Point3D(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::Bytes(_) => "BYTES",
            Value::String(_) => "STRING",
            Value::List(_) => "LIST",
            Value::Map(_) => "MAP",
            Value::Node(_) => "NODE",
            Value::Relationship(_) => "RELATIONSHIP",
            Value::UnboundRelationship(_) => "RELATIONSHIP",
            Value::Path(_) => "PATH",
            Value::DateTime(_) => "DATETIME",
            Value::Date(_) => "DATE",
            Value::Duration(_) => "DURATION",
            Value::Point2D(_) => "POINT",
            Value::Point3D(_) => "POINT",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn map(pairs: impl IntoIterator<Item = (impl Into<String>, impl Into<Value>)>) -> Value {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bytes(b) => write!(f, "<bytes[{}]>", b.len()),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Node(n) => write!(f, "{n:?}"),
            Value::Relationship(r) => write!(f, "{r:?}"),
            Value::UnboundRelationship(r) => write!(f, "{r:?}"),
            Value::Path(p) => write!(f, "{p:?}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Date(d) => write!(f, "{}", d.0),
            Value::Duration(d) => write!(f, "{d:?}"),
            Value::Point2D(p) => write!(f, "point({{x: {}, y: {}, srid: {}}})", p.x, p.y, p.srid),
            Value::Point3D(p) => write!(f, "point({{x: {}, y: {}, z: {}, srid: {}}})", p.x, p.y, p.z, p.srid),
        }
    }
}

/// Per-`Query` parameter interning table (§3 ParameterTable, §4.1).
///
/// Names are assigned `p1, p2, ...` in first-seen order and never reused for
/// a different value. Interning the same value twice (by structural
/// equality) returns the existing name instead of growing the table.
#[derive(Debug, Clone, Default)]
pub struct ParameterTable {
    order: Vec<String>,
    values: HashMap<String, Value>,
    reverse: Vec<(Value, String)>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Intern a value, returning its stable parameter name.
    pub fn intern(&mut self, value: Value) -> String {
        if let Some((_, name)) = self.reverse.iter().find(|(v, _)| *v == value) {
            return name.clone();
        }
        let name = format!("p{}", self.order.len() + 1);
        self.order.push(name.clone());
        self.reverse.push((value.clone(), name.clone()));
        self.values.insert(name.clone(), value);
        name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Insert an entry under its existing name, bypassing structural-equality
    /// reuse. Used to rebuild a table from an already-named parameter map
    /// (e.g. `Query::embed_raw`), where names must stay exactly as given.
    pub(crate) fn order_insert(&mut self, name: String, value: Value) {
        self.order.push(name.clone());
        self.reverse.push((value.clone(), name.clone()));
        self.values.insert(name, value);
    }

    /// Ordered `(name, value)` pairs in rendering order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.order.iter().map(move |n| (n.as_str(), &self.values[n]))
    }

    /// Render as an ordered mapping, as returned by `Query::build`.
    pub fn to_map(&self) -> IndexMap<String, Value> {
        self.order
            .iter()
            .map(|n| (n.clone(), self.values[n].clone()))
            .collect()
    }

    /// Merge another table's entries into self, re-interning every value.
    ///
    /// Returns a rewrite map from `other`'s parameter names to the names
    /// those values now have in `self`, so that text rendered against
    /// `other` can be retargeted (§4.1, §4.4 CallSubquery, §9).
    pub fn merge_from(&mut self, other: &ParameterTable) -> HashMap<String, String> {
        let mut rewrite = HashMap::with_capacity(other.order.len());
        for name in &other.order {
            let value = other.values[name].clone();
            let new_name = self.intern(value);
            rewrite.insert(name.clone(), new_name);
        }
        rewrite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_assigns_sequential_names() {
        let mut t = ParameterTable::new();
        assert_eq!(t.intern(Value::from(1)), "p1");
        assert_eq!(t.intern(Value::from("x")), "p2");
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn intern_reuses_equal_values() {
        let mut t = ParameterTable::new();
        let a = t.intern(Value::from("Alice"));
        let b = t.intern(Value::from("Alice"));
        assert_eq!(a, b);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn nan_bit_patterns_distinguish() {
        let mut t = ParameterTable::new();
        let nan1 = f64::from_bits(0x7ff8000000000001);
        let nan2 = f64::from_bits(0x7ff8000000000002);
        let a = t.intern(Value::Float(nan1));
        let b = t.intern(Value::Float(nan2));
        assert_ne!(a, b);
        let c = t.intern(Value::Float(nan1));
        assert_eq!(a, c);
    }

    #[test]
    fn merge_from_preserves_target_and_reinterns_source() {
        let mut target = ParameterTable::new();
        target.intern(Value::from(1)); // p1 in target
        let mut source = ParameterTable::new();
        source.intern(Value::from(1)); // p1 in source, same value
        source.intern(Value::from("hi")); // p2 in source

        let rewrite = target.merge_from(&source);
        assert_eq!(rewrite.get("p1").unwrap(), "p1"); // reused
        assert_eq!(rewrite.get("p2").unwrap(), "p2"); // newly appended
        assert_eq!(target.len(), 2);
    }
}

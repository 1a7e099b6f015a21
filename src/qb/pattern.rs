//! Node / relationship / path patterns (§3 Pattern, §4.3).

use indexmap::IndexSet;

use crate::error::Error;
use crate::Result;

use super::expr::Expression;
use super::query::Query;

/// Relationship traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
    Both,
}

/// Variable-length relationship encoding (§4.3).
///
/// `Range`'s `exclusive_end` mirrors Ruby `Range#exclude_end?`: when set, the
/// rendered upper bound is `hi - 1` rather than `hi` verbatim. This is the
/// prescribed resolution of the two divergent behaviors found upstream (see
/// DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    None,
    Exact(u64),
    Range {
        lo: Option<u64>,
        hi: Option<u64>,
        exclusive_end: bool,
    },
}

impl Length {
    fn render(self) -> String {
        match self {
            Length::None => String::new(),
            Length::Exact(n) => format!("*{n}"),
            Length::Range { lo, hi, exclusive_end } => {
                let hi = hi.map(|h| if exclusive_end { h.saturating_sub(1) } else { h });
                match (lo, hi) {
                    (None, None) => "*".to_string(),
                    (Some(lo), None) => format!("*{lo}.."),
                    (None, Some(hi)) => format!("*..{hi}"),
                    (Some(lo), Some(hi)) => format!("*{lo}..{hi}"),
                }
            }
        }
    }
}

/// A node pattern: `(alias:Label1:Label2 {k1: $p1})`.
#[derive(Debug, Clone, Default)]
pub struct NodePattern {
    pub alias: Option<String>,
    pub labels: Vec<String>,
    pub props: Vec<(String, Expression)>,
}

impl NodePattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.props.push((key.into(), value.into()));
        self
    }

    pub fn render(&self, query: &mut Query) -> String {
        let alias = self.alias.clone().unwrap_or_default();
        let labels: String = self.labels.iter().map(|l| format!(":{l}")).collect();
        if alias.is_empty() && labels.is_empty() && self.props.is_empty() {
            return "()".to_string();
        }
        let props = render_props(&self.props, query);
        format!("({alias}{labels}{props})")
    }

    pub(crate) fn aliases(&self) -> Vec<String> {
        self.alias.iter().cloned().collect()
    }
}

impl From<crate::qb::value::Value> for Expression {
    fn from(v: crate::qb::value::Value) -> Self {
        Expression::Literal(v)
    }
}

/// A relationship pattern: `-[alias:T1|T2 *lo..hi {props}]->`.
#[derive(Debug, Clone, Default)]
pub struct RelationshipPattern {
    pub alias: Option<String>,
    pub types: Vec<String>,
    pub props: Vec<(String, Expression)>,
    pub direction: Option<Direction>,
    pub length: Length,
}

impl Default for Length {
    fn default() -> Self {
        Length::None
    }
}

impl RelationshipPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn rel_type(mut self, t: impl Into<String>) -> Self {
        self.types.push(t.into());
        self
    }

    pub fn types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn length(mut self, length: Length) -> Self {
        self.length = length;
        self
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.props.push((key.into(), value.into()));
        self
    }

    fn is_anonymous(&self) -> bool {
        self.alias.is_none()
            && self.types.is_empty()
            && self.props.is_empty()
            && matches!(self.length, Length::None)
    }

    pub fn render(&self, query: &mut Query) -> String {
        let direction = self.direction.unwrap_or(Direction::Both);
        if self.is_anonymous() {
            return match direction {
                Direction::Out => "-->".to_string(),
                Direction::In => "<--".to_string(),
                Direction::Both => "--".to_string(),
            };
        }

        let alias = self.alias.clone().unwrap_or_default();
        let types: String = if self.types.is_empty() {
            String::new()
        } else {
            format!(":{}", self.types.join("|"))
        };
        let length = self.length.render();
        let props = render_props(&self.props, query);
        let inner = format!("[{alias}{types}{length}{props}]");
        match direction {
            Direction::Out => format!("-{inner}->"),
            Direction::In => format!("<-{inner}-"),
            Direction::Both => format!("-{inner}-"),
        }
    }

    pub(crate) fn aliases(&self) -> Vec<String> {
        self.alias.iter().cloned().collect()
    }
}

/// One element of a path: a node or a relationship.
#[derive(Debug, Clone)]
pub enum PatternElement {
    Node(NodePattern),
    Relationship(RelationshipPattern),
}

/// A pattern value: a bare node, a bare relationship, or a full path.
#[derive(Debug, Clone)]
pub enum Pattern {
    Node(NodePattern),
    Relationship(RelationshipPattern),
    Path(PathPattern),
}

impl Pattern {
    pub fn render(&self, query: &mut Query) -> String {
        match self {
            Pattern::Node(n) => n.render(query),
            Pattern::Relationship(r) => r.render(query),
            Pattern::Path(p) => p.render(query),
        }
    }

    pub(crate) fn aliases(&self) -> Vec<String> {
        match self {
            Pattern::Node(n) => n.aliases(),
            Pattern::Relationship(r) => r.aliases(),
            Pattern::Path(p) => p.aliases(),
        }
    }
}

impl From<NodePattern> for Pattern {
    fn from(n: NodePattern) -> Self {
        Pattern::Node(n)
    }
}
impl From<RelationshipPattern> for Pattern {
    fn from(r: RelationshipPattern) -> Self {
        Pattern::Relationship(r)
    }
}
impl From<PathPattern> for Pattern {
    fn from(p: PathPattern) -> Self {
        Pattern::Path(p)
    }
}

/// A path pattern: must start with a node and alternate node/relationship.
/// Validated at construction (§3, §4.3).
#[derive(Debug, Clone)]
pub struct PathPattern {
    pub elements: Vec<PatternElement>,
}

impl PathPattern {
    pub fn new(elements: Vec<PatternElement>) -> Result<Self> {
        if elements.is_empty() {
            return Err(Error::InvalidPattern("path has no elements".into()));
        }
        for (i, el) in elements.iter().enumerate() {
            let even = i % 2 == 0;
            match (even, el) {
                (true, PatternElement::Node(_)) => {}
                (false, PatternElement::Relationship(_)) => {}
                (true, PatternElement::Relationship(_)) => {
                    return Err(Error::InvalidPattern(format!(
                        "expected a node at position {i}, found a relationship"
                    )));
                }
                (false, PatternElement::Node(_)) => {
                    return Err(Error::InvalidPattern(format!(
                        "expected a relationship at position {i}, found a node"
                    )));
                }
            }
        }
        Ok(Self { elements })
    }

    pub fn render(&self, query: &mut Query) -> String {
        self.elements
            .iter()
            .map(|el| match el {
                PatternElement::Node(n) => n.render(query),
                PatternElement::Relationship(r) => r.render(query),
            })
            .collect()
    }

    pub(crate) fn aliases(&self) -> Vec<String> {
        self.elements
            .iter()
            .flat_map(|el| match el {
                PatternElement::Node(n) => n.aliases(),
                PatternElement::Relationship(r) => r.aliases(),
            })
            .collect()
    }

    /// Labels observed on each node alias along the path (for `AliasIndex`).
    pub(crate) fn node_labels(&self) -> Vec<(String, IndexSet<String>)> {
        self.elements
            .iter()
            .filter_map(|el| match el {
                PatternElement::Node(n) => {
                    let alias = n.alias.clone()?;
                    Some((alias, n.labels.iter().cloned().collect()))
                }
                _ => None,
            })
            .collect()
    }
}

fn render_props(props: &[(String, Expression)], query: &mut Query) -> String {
    if props.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = props
        .iter()
        .map(|(k, v)| format!("{k}: {}", v.render(query)))
        .collect();
    format!(" {{{}}}", rendered.join(", "))
}

//! Clause variants and their canonical ordering (§3 Clause, §4.4).

use super::expr::Expression;
use super::pattern::Pattern;
use super::query::Query;

/// One `SET` assignment.
#[derive(Debug, Clone)]
pub enum Assignment {
    Property(String, String, Expression),
    Properties(String, Expression),
    Label(String, String),
}

impl Assignment {
    fn render(&self, query: &mut Query) -> String {
        match self {
            Assignment::Property(alias, key, expr) => {
                format!("{alias}.{key} = {}", expr.render(query))
            }
            Assignment::Properties(alias, expr) => {
                format!("{alias} += {}", expr.render(query))
            }
            Assignment::Label(alias, label) => format!("{alias}:{label}"),
        }
    }
}

/// One `REMOVE` target.
#[derive(Debug, Clone)]
pub enum RemoveItem {
    Property(String, String),
    Label(String, String),
}

impl RemoveItem {
    fn render(&self) -> String {
        match self {
            RemoveItem::Property(alias, key) => format!("{alias}.{key}"),
            RemoveItem::Label(alias, label) => format!("{alias}:{label}"),
        }
    }
}

/// One `ORDER BY` item.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub expr: Expression,
    pub descending: bool,
}

/// A single clause in an unordered bag that `Query::build` sorts by
/// canonical position (§4.4). Within a position, clauses keep insertion
/// order (stable sort), so repeated SET/REMOVE clauses coexist in the order
/// they were added.
#[derive(Debug, Clone)]
pub enum Clause {
    Match {
        patterns: Vec<Pattern>,
        optional: bool,
        path_var: Option<String>,
    },
    Create(Vec<Pattern>),
    Merge {
        pattern: Pattern,
        on_create: Vec<Assignment>,
        on_match: Vec<Assignment>,
    },
    Call {
        procedure: String,
        args: Vec<Expression>,
        yield_items: Option<Vec<String>>,
        where_: Option<Expression>,
        return_: Option<(Vec<Expression>, bool)>,
    },
    CallSubquery(Box<Query>),
    With {
        items: Vec<Expression>,
        distinct: bool,
    },
    /// Conjuncts ANDed together at render time (§3 Clause, §4.4 Where).
    /// `merge_query` appends `other`'s conjuncts onto an existing `Where`
    /// instead of stacking a second `WHERE` clause.
    Where(Vec<Expression>),
    Set(Vec<Assignment>),
    Remove(Vec<RemoveItem>),
    Delete {
        items: Vec<Expression>,
        detach: bool,
    },
    Return {
        items: Vec<Expression>,
        distinct: bool,
    },
    OrderBy(Vec<OrderItem>),
    Skip(Expression),
    Limit(Expression),
}

impl Clause {
    /// Canonical position: MATCH/CREATE/MERGE, CALL, WITH, WHERE,
    /// SET/REMOVE/DELETE, RETURN, ORDER BY, SKIP, LIMIT.
    pub(crate) fn order_key(&self) -> u8 {
        match self {
            Clause::Match { .. } | Clause::Create(_) | Clause::Merge { .. } => 0,
            Clause::Call { .. } | Clause::CallSubquery(_) => 1,
            Clause::With { .. } => 2,
            Clause::Where(_) => 3,
            Clause::Set(_) | Clause::Remove(_) | Clause::Delete { .. } => 4,
            Clause::Return { .. } => 5,
            Clause::OrderBy(_) => 6,
            Clause::Skip(_) => 7,
            Clause::Limit(_) => 8,
        }
    }

    pub(crate) fn aliases(&self) -> Vec<String> {
        match self {
            Clause::Match { patterns, path_var, .. } => {
                let mut aliases: Vec<String> = patterns.iter().flat_map(Pattern::aliases).collect();
                aliases.extend(path_var.iter().cloned());
                aliases
            }
            Clause::Create(ps) => ps.iter().flat_map(Pattern::aliases).collect(),
            Clause::Merge { pattern, .. } => pattern.aliases(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn render(&self, query: &mut Query) -> String {
        match self {
            Clause::Match { patterns, optional, path_var } => {
                let rendered: Vec<String> = patterns.iter().map(|p| p.render(query)).collect();
                let keyword = if *optional { "OPTIONAL MATCH" } else { "MATCH" };
                match path_var {
                    Some(var) => format!("{keyword} {var} = {}", rendered.join(", ")),
                    None => format!("{keyword} {}", rendered.join(", ")),
                }
            }
            Clause::Create(patterns) => {
                let rendered: Vec<String> = patterns.iter().map(|p| p.render(query)).collect();
                format!("CREATE {}", rendered.join(", "))
            }
            Clause::Merge { pattern, on_create, on_match } => {
                let mut out = format!("MERGE {}", pattern.render(query));
                if !on_create.is_empty() {
                    let items: Vec<String> = on_create.iter().map(|a| a.render(query)).collect();
                    out.push_str(&format!(" ON CREATE SET {}", items.join(", ")));
                }
                if !on_match.is_empty() {
                    let items: Vec<String> = on_match.iter().map(|a| a.render(query)).collect();
                    out.push_str(&format!(" ON MATCH SET {}", items.join(", ")));
                }
                out
            }
            Clause::Call { procedure, args, yield_items, where_, return_ } => {
                let args: Vec<String> = args.iter().map(|a| a.render(query)).collect();
                let mut out = format!("CALL {}({})", procedure, args.join(", "));
                if let Some(items) = yield_items {
                    out.push_str(&format!(" YIELD {}", items.join(", ")));
                }
                if let Some(cond) = where_ {
                    out.push_str(&format!(" WHERE {}", cond.render(query)));
                }
                if let Some((items, distinct)) = return_ {
                    let rendered: Vec<String> = items.iter().map(|e| e.render(query)).collect();
                    let distinct = if *distinct { "DISTINCT " } else { "" };
                    out.push_str(&format!(" RETURN {distinct}{}", rendered.join(", ")));
                }
                out
            }
            Clause::CallSubquery(inner) => {
                let text = inner.render_clauses_against(query);
                format!("CALL {{\n{text}\n}}")
            }
            Clause::With { items, distinct } => {
                let rendered: Vec<String> = items.iter().map(|e| e.render(query)).collect();
                let distinct = if *distinct { "DISTINCT " } else { "" };
                format!("WITH {distinct}{}", rendered.join(", "))
            }
            Clause::Where(conjuncts) => {
                let rendered: Vec<String> = conjuncts.iter().map(|c| c.render(query)).collect();
                format!("WHERE {}", rendered.join(" AND "))
            }
            Clause::Set(items) => {
                let rendered: Vec<String> = items.iter().map(|a| a.render(query)).collect();
                format!("SET {}", rendered.join(", "))
            }
            Clause::Remove(items) => {
                let rendered: Vec<String> = items.iter().map(RemoveItem::render).collect();
                format!("REMOVE {}", rendered.join(", "))
            }
            Clause::Delete { items, detach } => {
                let rendered: Vec<String> = items.iter().map(|e| e.render(query)).collect();
                let detach = if *detach { "DETACH " } else { "" };
                format!("{detach}DELETE {}", rendered.join(", "))
            }
            Clause::Return { items, distinct } => {
                let rendered: Vec<String> = items.iter().map(|e| e.render(query)).collect();
                let distinct = if *distinct { "DISTINCT " } else { "" };
                format!("RETURN {distinct}{}", rendered.join(", "))
            }
            Clause::OrderBy(items) => {
                let rendered: Vec<String> = items
                    .iter()
                    .map(|i| {
                        let e = i.expr.render(query);
                        if i.descending {
                            format!("{e} DESC")
                        } else {
                            e
                        }
                    })
                    .collect();
                format!("ORDER BY {}", rendered.join(", "))
            }
            Clause::Skip(expr) => format!("SKIP {}", expr.render(query)),
            Clause::Limit(expr) => format!("LIMIT {}", expr.render(query)),
        }
    }
}

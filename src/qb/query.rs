//! `Query`: the composable, mergeable Cypher statement builder (§3 Query,
//! §4.1, §4.4–§4.6).

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::error::Error;
use crate::Result;

use super::clause::{Assignment, Clause, OrderItem, RemoveItem};
use super::expr::Expression;
use super::pattern::Pattern;
use super::value::{ParameterTable, Value};

/// Tracks, per alias, the set of labels observed for it anywhere in the
/// query (§3 AliasIndex). Used for the soft unknown-alias check and for
/// `merge!`'s conflict detection.
pub type AliasIndex = HashMap<String, IndexSet<String>>;

/// A single Cypher statement under construction.
///
/// Clauses are kept in an unordered bag and given a canonical position only
/// at `build()` time (§4.4): callers add clauses in whatever order is
/// convenient and the renderer reorders them. Parameters are interned lazily,
/// the first time each `Expression::Literal` is rendered.
#[derive(Debug, Default)]
pub struct Query {
    clauses: Vec<Clause>,
    pub(crate) parameters: ParameterTable,
    alias_index: AliasIndex,
    /// The alias of the last node introduced by MATCH/CREATE/MERGE, used by
    /// `where_map`'s implicit-alias inference (§4.4).
    last_pattern_alias: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `alias` has been declared by some pattern added to this query.
    pub fn declares_alias(&self, alias: &str) -> bool {
        self.alias_index.contains_key(alias)
    }

    fn declare_patterns(&mut self, patterns: &[Pattern]) -> Result<()> {
        for pattern in patterns {
            self.declare_pattern(pattern)?;
        }
        Ok(())
    }

    fn declare_pattern(&mut self, pattern: &Pattern) -> Result<()> {
        let node_aliases: Vec<(String, IndexSet<String>)> = match pattern {
            Pattern::Node(n) => n.alias.clone().into_iter().map(|a| (a, n.labels.iter().cloned().collect())).collect(),
            Pattern::Relationship(_) => Vec::new(),
            Pattern::Path(p) => p.node_labels(),
        };
        let rel_aliases: Vec<(String, IndexSet<String>)> = match pattern {
            Pattern::Relationship(r) => r.alias.clone().into_iter().map(|a| (a, r.types.iter().cloned().collect())).collect(),
            _ => Vec::new(),
        };
        for (alias, labels) in node_aliases.iter().cloned().chain(rel_aliases) {
            self.merge_alias(alias, labels)?;
        }
        if let Some((alias, _)) = node_aliases.last() {
            self.last_pattern_alias = Some(alias.clone());
        }
        Ok(())
    }

    fn merge_alias(&mut self, alias: String, labels: IndexSet<String>) -> Result<()> {
        match self.alias_index.get_mut(&alias) {
            None => {
                self.alias_index.insert(alias, labels);
            }
            Some(existing) => {
                if !labels.is_empty() && !existing.is_empty() && *existing != labels {
                    return Err(Error::AliasConflict(alias));
                }
                existing.extend(labels);
            }
        }
        Ok(())
    }

    pub fn match_clause(mut self, patterns: Vec<Pattern>) -> Result<Self> {
        self.declare_patterns(&patterns)?;
        self.clauses.push(Clause::Match { patterns, optional: false, path_var: None });
        Ok(self)
    }

    /// `OPTIONAL MATCH <pattern>` (§3 Clause, §4.4).
    pub fn optional_match(mut self, patterns: Vec<Pattern>) -> Result<Self> {
        self.declare_patterns(&patterns)?;
        self.clauses.push(Clause::Match { patterns, optional: true, path_var: None });
        Ok(self)
    }

    /// `MATCH p = <pattern>` / `OPTIONAL MATCH p = <pattern>`: binds the
    /// whole pattern to a path variable (§3 Clause `path_var`, §4.4).
    pub fn match_path(mut self, path_var: impl Into<String>, patterns: Vec<Pattern>, optional: bool) -> Result<Self> {
        self.declare_patterns(&patterns)?;
        let path_var = path_var.into();
        self.merge_alias(path_var.clone(), IndexSet::new())?;
        self.clauses.push(Clause::Match { patterns, optional, path_var: Some(path_var) });
        Ok(self)
    }

    pub fn create(mut self, patterns: Vec<Pattern>) -> Result<Self> {
        self.declare_patterns(&patterns)?;
        self.clauses.push(Clause::Create(patterns));
        Ok(self)
    }

    pub fn merge(
        mut self,
        pattern: Pattern,
        on_create: Vec<Assignment>,
        on_match: Vec<Assignment>,
    ) -> Result<Self> {
        self.declare_pattern(&pattern)?;
        self.clauses.push(Clause::Merge { pattern, on_create, on_match });
        Ok(self)
    }

    /// Append a `WHERE` conjunct. Multiple calls accumulate into one clause
    /// joined by `AND` at render time, rather than stacking separate `WHERE`
    /// clauses (§3 Clause, §4.4).
    pub fn where_clause(mut self, expr: Expression) -> Self {
        match self.clauses.last_mut() {
            Some(Clause::Where(conjuncts)) => conjuncts.push(expr),
            _ => self.clauses.push(Clause::Where(vec![expr])),
        }
        self
    }

    /// `where(map)`: implicitly converts a property mapping into an equality
    /// conjunct against the alias most recently introduced by a
    /// MATCH/CREATE/MERGE pattern (§4.4 Query operations).
    pub fn where_map(mut self, map: Vec<(String, Expression)>) -> Result<Self> {
        let alias = self
            .last_pattern_alias
            .clone()
            .ok_or_else(|| Error::CannotInferAlias)?;
        for (key, value) in map {
            let conjunct = Expression::prop(alias.clone(), key).eq(value);
            self = self.where_clause(conjunct);
        }
        Ok(self)
    }

    pub fn set(mut self, assignments: Vec<Assignment>) -> Self {
        self.clauses.push(Clause::Set(assignments));
        self
    }

    pub fn remove(mut self, items: Vec<RemoveItem>) -> Self {
        self.clauses.push(Clause::Remove(items));
        self
    }

    pub fn delete(mut self, items: Vec<Expression>, detach: bool) -> Self {
        self.clauses.push(Clause::Delete { items, detach });
        self
    }

    pub fn with(mut self, items: Vec<Expression>, distinct: bool) -> Self {
        self.clauses.push(Clause::With { items, distinct });
        self
    }

    pub fn return_(mut self, items: Vec<Expression>, distinct: bool) -> Self {
        self.clauses.push(Clause::Return { items, distinct });
        self
    }

    pub fn order_by(mut self, items: Vec<OrderItem>) -> Self {
        self.clauses.push(Clause::OrderBy(items));
        self
    }

    /// `SKIP <amount>`. The amount is parameterized like any other literal
    /// (§4.4); passing `None` interns a `NULL` literal.
    pub fn skip(mut self, n: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Skip(Expression::literal(n)));
        self
    }

    /// `LIMIT <amount>`, parameterized the same way as `skip` (§4.4).
    pub fn limit(mut self, n: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Limit(Expression::literal(n)));
        self
    }

    /// `CALL proc(args) [YIELD ...] [WHERE ...] [RETURN ...]` (§3 Clause
    /// `Call{proc, args, yield?, where?, return?}`, §4.4).
    pub fn call(
        mut self,
        procedure: impl Into<String>,
        args: Vec<Expression>,
        yield_items: Option<Vec<String>>,
        where_: Option<Expression>,
        return_: Option<(Vec<Expression>, bool)>,
    ) -> Self {
        self.clauses.push(Clause::Call {
            procedure: procedure.into(),
            args,
            yield_items,
            where_,
            return_,
        });
        self
    }

    pub fn call_subquery(mut self, inner: Query) -> Self {
        self.clauses.push(Clause::CallSubquery(Box::new(inner)));
        self
    }

    /// Merge `other`'s clauses and alias declarations into `self` (`merge!`,
    /// §4.4 Query operations).
    ///
    /// Conflicting labels on an alias shared by both queries are rejected
    /// (`Error::AliasConflict`). `OrderBy`/`Skip`/`Limit` in `other` replace
    /// any of `self`'s; `Where` conjuncts are appended onto `self`'s existing
    /// `Where` clause rather than stacked as a second clause; everything else
    /// appends in order. Literal values embedded in `other`'s expressions
    /// travel with their clauses and are interned into `self`'s
    /// `ParameterTable` the first time they render, so no parameter rewrite
    /// is needed at merge time (§4.1, §9).
    pub fn merge_query(&mut self, other: Query) -> Result<()> {
        for (alias, labels) in other.alias_index {
            self.merge_alias(alias, labels)?;
        }
        if other.last_pattern_alias.is_some() {
            self.last_pattern_alias = other.last_pattern_alias;
        }
        for clause in other.clauses {
            match clause {
                Clause::OrderBy(_) => {
                    self.clauses.retain(|c| !matches!(c, Clause::OrderBy(_)));
                    self.clauses.push(clause);
                }
                Clause::Skip(_) => {
                    self.clauses.retain(|c| !matches!(c, Clause::Skip(_)));
                    self.clauses.push(clause);
                }
                Clause::Limit(_) => {
                    self.clauses.retain(|c| !matches!(c, Clause::Limit(_)));
                    self.clauses.push(clause);
                }
                Clause::Where(mut conjuncts) => match self.clauses.iter_mut().find(|c| matches!(c, Clause::Where(_))) {
                    Some(Clause::Where(existing)) => existing.append(&mut conjuncts),
                    _ => self.clauses.push(Clause::Where(conjuncts)),
                },
                other => self.clauses.push(other),
            }
        }
        Ok(())
    }

    /// Render `self`'s clauses against a different query's parameter table
    /// (and alias index), for embedding as a `CALL { ... }` subquery body
    /// that shares the outer statement's scope (§4.4 CallSubquery).
    pub(crate) fn render_clauses_against(&self, query: &mut Query) -> String {
        for (alias, labels) in &self.alias_index {
            let _ = query.merge_alias(alias.clone(), labels.clone());
        }
        render_sorted(&self.clauses, query)
    }

    /// Finalize the statement: sort clauses into canonical position, render
    /// each against this query's own parameter table, and return the text
    /// alongside the ordered parameter map (§4.6).
    pub fn build(mut self) -> (String, IndexMap<String, Value>) {
        let clauses = std::mem::take(&mut self.clauses);
        let text = render_sorted(&clauses, &mut self);
        (text, self.parameters.to_map())
    }

    /// Embed an already-rendered Cypher fragment and its parameter map,
    /// rewriting its `$pN` references to this query's names (§9).
    ///
    /// Unlike `merge_query`, this operates on text that has already left
    /// the AST — e.g. a fragment built by a caller in a separate step.
    pub fn embed_raw(&mut self, text: &str, params: IndexMap<String, Value>) -> String {
        let mut source = ParameterTable::new();
        for (name, value) in params {
            source.order_insert(name, value);
        }
        let rewrite = self.parameters.merge_from(&source);
        rewrite_parameter_refs(text, &rewrite)
    }
}

fn render_sorted(clauses: &[Clause], query: &mut Query) -> String {
    let mut indexed: Vec<(usize, &Clause)> = clauses.iter().enumerate().collect();
    indexed.sort_by_key(|(i, c)| (c.order_key(), *i));
    indexed
        .into_iter()
        .map(|(_, c)| c.render(query))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace `$p<digits>` tokens in `text` per `rewrite`, leaving anything not
/// in the map untouched. Token-aware: unlike a naive substring replace, this
/// never mistakes `$p1` for a prefix of `$p10`.
fn rewrite_parameter_refs(text: &str, rewrite: &HashMap<String, String>) -> String {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'p') {
            let start = i + 1;
            let mut end = start + 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start + 1 {
                let name = &text[start..end];
                match rewrite.get(name) {
                    Some(new_name) => {
                        out.push(b'$');
                        out.extend_from_slice(new_name.as_bytes());
                    }
                    None => out.extend_from_slice(&bytes[i..end]),
                }
                i = end;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).expect("rewriting ASCII parameter tokens preserves UTF-8 validity")
}

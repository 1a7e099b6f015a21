//! Typed Cypher expression tree (§3 Expression, §4.2).

use std::collections::BTreeSet;

use super::pattern::Pattern;
use super::query::Query;
use super::value::Value;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "<>",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

/// Logical operators. `Not` is unary; `And`/`Or` take two or more operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithmeticOp {
    fn as_str(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
        }
    }
}

/// A typed Cypher expression.
///
/// `render` emits valid Cypher text and registers any embedded `Value` into
/// the query's `ParameterTable`. Compound expressions are always
/// parenthesized so precedence is explicit in the output (§4.2).
#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Value),
    PropertyAccess(String, String),
    Comparison(Box<Expression>, CompareOp, Box<Expression>),
    Logical(LogicalOp, Vec<Expression>),
    Arithmetic(Box<Expression>, ArithmeticOp, Box<Expression>),
    FunctionCall(String, Vec<Expression>),
    Exists(Box<Pattern>),
    VariableRef(String),
    Parameter(String),
    /// `expr AS alias`, used only inside RETURN/WITH item lists.
    Aliased(Box<Expression>, String),
}

impl Expression {
    pub fn literal(v: impl Into<Value>) -> Self {
        Expression::Literal(v.into())
    }

    pub fn prop(alias: impl Into<String>, key: impl Into<String>) -> Self {
        Expression::PropertyAccess(alias.into(), key.into())
    }

    pub fn var(alias: impl Into<String>) -> Self {
        Expression::VariableRef(alias.into())
    }

    pub fn eq(self, rhs: Expression) -> Self {
        Expression::Comparison(Box::new(self), CompareOp::Eq, Box::new(rhs))
    }

    pub fn cmp(self, op: CompareOp, rhs: Expression) -> Self {
        Expression::Comparison(Box::new(self), op, Box::new(rhs))
    }

    pub fn and(self, other: Expression) -> Self {
        match self {
            Expression::Logical(LogicalOp::And, mut ops) => {
                ops.push(other);
                Expression::Logical(LogicalOp::And, ops)
            }
            lhs => Expression::Logical(LogicalOp::And, vec![lhs, other]),
        }
    }

    pub fn or(self, other: Expression) -> Self {
        match self {
            Expression::Logical(LogicalOp::Or, mut ops) => {
                ops.push(other);
                Expression::Logical(LogicalOp::Or, ops)
            }
            lhs => Expression::Logical(LogicalOp::Or, vec![lhs, other]),
        }
    }

    pub fn not(self) -> Self {
        Expression::Logical(LogicalOp::Not, vec![self])
    }

    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::FunctionCall(name.into(), args)
    }

    pub fn exists(pattern: Pattern) -> Self {
        Expression::Exists(Box::new(pattern))
    }

    pub fn alias(self, name: impl Into<String>) -> Self {
        Expression::Aliased(Box::new(self), name.into())
    }

    /// Aliases this expression reads from (used by the soft `UnknownAlias`
    /// check and by `AliasIndex`).
    pub fn depends_on_aliases(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_aliases(&mut out);
        out
    }

    fn collect_aliases(&self, out: &mut BTreeSet<String>) {
        match self {
            Expression::Literal(_) | Expression::Parameter(_) => {}
            Expression::PropertyAccess(alias, _) | Expression::VariableRef(alias) => {
                out.insert(alias.clone());
            }
            Expression::Comparison(l, _, r) | Expression::Arithmetic(l, _, r) => {
                l.collect_aliases(out);
                r.collect_aliases(out);
            }
            Expression::Logical(_, ops) => {
                for op in ops {
                    op.collect_aliases(out);
                }
            }
            Expression::FunctionCall(_, args) => {
                for a in args {
                    a.collect_aliases(out);
                }
            }
            Expression::Exists(pattern) => {
                out.extend(pattern.aliases());
            }
            Expression::Aliased(inner, _) => inner.collect_aliases(out),
        }
    }

    /// Render as Cypher text, interning literal values into `query`.
    pub fn render(&self, query: &mut Query) -> String {
        match self {
            Expression::Literal(v) => {
                let name = query.parameters.intern(v.clone());
                format!("${name}")
            }
            Expression::PropertyAccess(alias, key) => {
                if !query.declares_alias(alias) {
                    tracing::warn!(alias = %alias, "property access on an alias not declared elsewhere in the query");
                }
                format!("{alias}.{key}")
            }
            Expression::Comparison(lhs, op, rhs) => {
                format!("({} {} {})", lhs.render(query), op.as_str(), rhs.render(query))
            }
            Expression::Logical(LogicalOp::Not, ops) => {
                format!("(NOT {})", ops[0].render(query))
            }
            Expression::Logical(op, ops) => {
                let joiner = match op {
                    LogicalOp::And => " AND ",
                    LogicalOp::Or => " OR ",
                    LogicalOp::Not => unreachable!(),
                };
                let rendered: Vec<String> = ops.iter().map(|o| o.render(query)).collect();
                format!("({})", rendered.join(joiner))
            }
            Expression::Arithmetic(lhs, op, rhs) => {
                format!("({} {} {})", lhs.render(query), op.as_str(), rhs.render(query))
            }
            Expression::FunctionCall(name, args) => {
                let rendered: Vec<String> = args.iter().map(|a| a.render(query)).collect();
                format!("{name}({})", rendered.join(", "))
            }
            Expression::Exists(pattern) => {
                format!("EXISTS {{ {} }}", pattern.render(query))
            }
            Expression::VariableRef(alias) => alias.clone(),
            Expression::Parameter(name) => format!("${name}"),
            Expression::Aliased(inner, name) => {
                format!("{} AS {name}", inner.render(query))
            }
        }
    }
}

//! Boolean condition trees for WHERE clauses.
//!
//! A [`Condition`] is either a single comparison produced by a
//! [`Column`](crate::Column) operator, or an AND/OR node combining two
//! subtrees. Trees are immutable: `&`, `|`, [`Condition::and`] and
//! [`Condition::or`] build new nodes and never mutate their operands.
//!
//! Rendering appends to one SQL buffer and one parameter list in a single
//! walk, so `$n` placeholders always line up with parameter order. Mixed
//! AND/OR nesting is parenthesized explicitly rather than relying on SQL
//! operator precedence.

use crate::value::Value;
use std::ops::{BitAnd, BitOr};

/// Comparison operator of a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl CmpOp {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Compare {
        column: String,
        op: CmpOp,
        value: Value,
    },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

/// A boolean predicate over column values, compiled to a WHERE fragment plus
/// ordered parameters.
#[derive(Debug, Clone)]
pub struct Condition(Node);

impl Condition {
    pub(crate) fn compare(column: impl Into<String>, op: CmpOp, value: Value) -> Self {
        Condition(Node::Compare {
            column: column.into(),
            op,
            value,
        })
    }

    /// Combine two conditions into an AND node.
    pub fn and(self, other: Condition) -> Condition {
        Condition(Node::And(Box::new(self.0), Box::new(other.0)))
    }

    /// Combine two conditions into an OR node.
    pub fn or(self, other: Condition) -> Condition {
        Condition(Node::Or(Box::new(self.0), Box::new(other.0)))
    }

    /// Render this tree, appending SQL text and parameters.
    pub(crate) fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
        render_node(&self.0, sql, params);
    }

    /// Visit every leaf column name in the tree.
    pub(crate) fn for_each_column<F: FnMut(&str)>(&self, f: &mut F) {
        visit_columns(&self.0, f);
    }

    /// Compile just this condition into `(sql, params)`.
    ///
    /// Mainly useful for diagnostics; builders render conditions inline so
    /// that placeholder numbering stays continuous across clauses.
    pub fn build(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.render(&mut sql, &mut params);
        (sql, params)
    }
}

impl BitAnd for Condition {
    type Output = Condition;

    fn bitand(self, rhs: Condition) -> Condition {
        self.and(rhs)
    }
}

impl BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        self.or(rhs)
    }
}

fn render_node(node: &Node, sql: &mut String, params: &mut Vec<Value>) {
    match node {
        Node::Compare { column, op, value } => {
            params.push(value.clone());
            sql.push_str(column);
            sql.push(' ');
            sql.push_str(op.as_sql());
            sql.push_str(" $");
            sql.push_str(&params.len().to_string());
        }
        Node::And(left, right) => {
            render_child(left, matches!(**left, Node::Or(_, _)), sql, params);
            sql.push_str(" AND ");
            render_child(right, matches!(**right, Node::Or(_, _)), sql, params);
        }
        Node::Or(left, right) => {
            render_child(left, matches!(**left, Node::And(_, _)), sql, params);
            sql.push_str(" OR ");
            render_child(right, matches!(**right, Node::And(_, _)), sql, params);
        }
    }
}

fn render_child(node: &Node, parenthesize: bool, sql: &mut String, params: &mut Vec<Value>) {
    if parenthesize {
        sql.push('(');
        render_node(node, sql, params);
        sql.push(')');
    } else {
        render_node(node, sql, params);
    }
}

fn visit_columns<F: FnMut(&str)>(node: &Node, f: &mut F) {
    match node {
        Node::Compare { column, .. } => f(column),
        Node::And(left, right) | Node::Or(left, right) => {
            visit_columns(left, f);
            visit_columns(right, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(column: &str, op: CmpOp, value: impl Into<Value>) -> Condition {
        Condition::compare(column, op, value.into())
    }

    #[test]
    fn leaf_renders_placeholder() {
        let (sql, params) = leaf("name", CmpOp::Eq, "pikachu").build();
        assert_eq!(sql, "name = $1");
        assert_eq!(params, vec![Value::from("pikachu")]);
    }

    #[test]
    fn like_renders_keyword() {
        let (sql, params) = leaf("name", CmpOp::Like, "%chu").build();
        assert_eq!(sql, "name LIKE $1");
        assert_eq!(params, vec![Value::from("%chu")]);
    }

    #[test]
    fn and_contains_token_and_orders_params() {
        let cond = leaf("power", CmpOp::Lte, 1000i32) & leaf("name", CmpOp::Like, "%chu");
        let (sql, params) = cond.build();
        assert_eq!(sql, "power <= $1 AND name LIKE $2");
        assert_eq!(params, vec![Value::Int(1000), Value::from("%chu")]);
    }

    #[test]
    fn or_contains_token() {
        let cond = leaf("name", CmpOp::Eq, "raichu") | leaf("name", CmpOp::Eq, "weedle");
        let (sql, _) = cond.build();
        assert_eq!(sql, "name = $1 OR name = $2");
        assert!(sql.contains("OR"));
    }

    #[test]
    fn or_under_and_is_parenthesized() {
        let cond = leaf("power", CmpOp::Gt, 10i32)
            & (leaf("name", CmpOp::Eq, "raichu") | leaf("name", CmpOp::Eq, "weedle"));
        let (sql, params) = cond.build();
        assert_eq!(sql, "power > $1 AND (name = $2 OR name = $3)");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn and_under_or_is_parenthesized() {
        let cond = (leaf("power", CmpOp::Eq, 2000i32) & leaf("trainer", CmpOp::Eq, "sally"))
            | (leaf("power", CmpOp::Eq, 10i32) & leaf("trainer", CmpOp::Eq, "gordon"));
        let (sql, params) = cond.build();
        assert_eq!(
            sql,
            "(power = $1 AND trainer = $2) OR (power = $3 AND trainer = $4)"
        );
        assert_eq!(
            params,
            vec![
                Value::Int(2000),
                Value::from("sally"),
                Value::Int(10),
                Value::from("gordon"),
            ]
        );
    }

    #[test]
    fn combining_leaves_operands_intact() {
        let a = leaf("power", CmpOp::Gt, 1i32);
        let b = leaf("power", CmpOp::Lt, 9i32);
        let combined = a.clone().and(b.clone());
        // The original subtrees still render on their own.
        assert_eq!(a.build().0, "power > $1");
        assert_eq!(b.build().0, "power < $1");
        assert_eq!(combined.build().0, "power > $1 AND power < $2");
    }

    #[test]
    fn collects_leaf_columns() {
        let cond = leaf("power", CmpOp::Gt, 1i32) & leaf("name", CmpOp::Like, "%chu");
        let mut cols = Vec::new();
        cond.for_each_column(&mut |c| cols.push(c.to_string()));
        assert_eq!(cols, vec!["power", "name"]);
    }
}

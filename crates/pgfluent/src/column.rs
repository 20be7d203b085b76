//! Column descriptors.
//!
//! A [`Column`] is a named, typed attribute of a [`Table`](crate::Table).
//! Its comparison methods are pure constructors: each returns a fresh
//! [`Condition`] leaf bound to `(column, operator, value)` and leaves the
//! column untouched.

use crate::condition::{CmpOp, Condition};
use crate::error::QueryResult;
use crate::ident;
use crate::value::Value;

/// Declared SQL type of a column, with its DDL rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// `VARCHAR(n)` / `VARCHAR`
    Varchar(Option<u32>),
    /// `TEXT`
    Text,
    /// `INTEGER`
    Integer,
    /// `BIGINT`
    BigInt,
    /// `DOUBLE PRECISION`
    Double,
    /// `BOOLEAN`
    Boolean,
    /// `TIMESTAMPTZ`
    Timestamptz,
    /// `UUID`
    Uuid,
    /// `JSONB`
    Jsonb,
}

impl ColumnType {
    /// DDL type text used by `CREATE TABLE`.
    pub fn ddl(&self) -> String {
        match self {
            ColumnType::Varchar(Some(len)) => format!("VARCHAR({len})"),
            ColumnType::Varchar(None) => "VARCHAR".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Double => "DOUBLE PRECISION".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Timestamptz => "TIMESTAMPTZ".to_string(),
            ColumnType::Uuid => "UUID".to_string(),
            ColumnType::Jsonb => "JSONB".to_string(),
        }
    }
}

/// A typed column attribute of a declared table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    ty: ColumnType,
}

impl Column {
    /// Create a column descriptor with a validated name.
    pub fn new(name: &str, ty: ColumnType) -> QueryResult<Self> {
        ident::check(name)?;
        Ok(Self {
            name: name.to_string(),
            ty,
        })
    }

    /// The column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared SQL type.
    pub fn column_type(&self) -> &ColumnType {
        &self.ty
    }

    /// `column = value`
    pub fn eq(&self, value: impl Into<Value>) -> Condition {
        self.cmp(CmpOp::Eq, value)
    }

    /// `column != value`
    pub fn ne(&self, value: impl Into<Value>) -> Condition {
        self.cmp(CmpOp::Ne, value)
    }

    /// `column > value`
    pub fn gt(&self, value: impl Into<Value>) -> Condition {
        self.cmp(CmpOp::Gt, value)
    }

    /// `column >= value`
    pub fn gte(&self, value: impl Into<Value>) -> Condition {
        self.cmp(CmpOp::Gte, value)
    }

    /// `column < value`
    pub fn lt(&self, value: impl Into<Value>) -> Condition {
        self.cmp(CmpOp::Lt, value)
    }

    /// `column <= value`
    pub fn lte(&self, value: impl Into<Value>) -> Condition {
        self.cmp(CmpOp::Lte, value)
    }

    /// `column LIKE pattern`, with standard SQL `%` wildcards.
    pub fn like(&self, pattern: impl Into<Value>) -> Condition {
        self.cmp(CmpOp::Like, pattern)
    }

    fn cmp(&self, op: CmpOp, value: impl Into<Value>) -> Condition {
        Condition::compare(self.name.clone(), op, value.into())
    }
}

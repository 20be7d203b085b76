//! Declared table schemas.
//!
//! [`Table::builder`] is the explicit registration point for a schema: it
//! collects [`Column`] descriptors in declaration order and produces an
//! immutable, cheaply cloneable [`Table`]. The resolved table name lives in a
//! nested [`Meta`] configuration node (`table.meta().tablename`), defaulting
//! to the lower-cased registration name unless overridden.

use crate::column::{Column, ColumnType};
use crate::error::{QueryError, QueryResult};
use crate::ident;
use crate::query::{Query, QueryKind};
use std::sync::Arc;

/// Nested table configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    /// The resolved table name used in compiled statements.
    pub tablename: String,
}

#[derive(Debug)]
struct TableInner {
    meta: Meta,
    columns: Vec<Column>,
}

/// An immutable named relation owning an ordered set of column descriptors.
#[derive(Debug, Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

impl Table {
    /// Start declaring a table.
    ///
    /// `name` plays the role of the type name in a declarative schema: the
    /// table name defaults to its lower-cased form. Use
    /// [`TableBuilder::tablename`] to override it verbatim.
    pub fn builder(name: &str) -> TableBuilder {
        TableBuilder {
            default_name: name.to_lowercase(),
            tablename: None,
            columns: Vec::new(),
            error: None,
        }
    }

    /// The nested configuration node.
    pub fn meta(&self) -> &Meta {
        &self.inner.meta
    }

    /// Declared columns, in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.inner.columns
    }

    /// Look up a declared column by name.
    pub fn column(&self, name: &str) -> QueryResult<&Column> {
        self.inner
            .columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| {
                QueryError::validation(format!(
                    "column '{}' is not declared on table '{}'",
                    name, self.inner.meta.tablename
                ))
            })
    }

    pub(crate) fn has_column(&self, name: &str) -> bool {
        self.inner.columns.iter().any(|c| c.name() == name)
    }

    /// Start a SELECT over this table. An empty slice selects every declared
    /// column.
    pub fn select(&self, columns: &[&str]) -> Query {
        Query::new(self.clone(), QueryKind::Select).project(columns)
    }

    /// Start an UPDATE over this table; add assignments with
    /// [`Query::set`](crate::Query::set).
    pub fn update(&self) -> Query {
        Query::new(self.clone(), QueryKind::Update)
    }

    /// Start a DELETE over this table.
    pub fn delete(&self) -> Query {
        Query::new(self.clone(), QueryKind::Delete)
    }

    /// Build the `CREATE TABLE` statement for this schema.
    pub fn create(&self) -> Query {
        Query::new(self.clone(), QueryKind::Create)
    }
}

/// Builder collecting column declarations for a [`Table`].
#[derive(Debug)]
pub struct TableBuilder {
    default_name: String,
    tablename: Option<String>,
    columns: Vec<Column>,
    error: Option<QueryError>,
}

impl TableBuilder {
    /// Override the table name verbatim.
    pub fn tablename(mut self, name: &str) -> Self {
        self.tablename = Some(name.to_string());
        self
    }

    /// Declare a column of an arbitrary type.
    pub fn column(mut self, name: &str, ty: ColumnType) -> Self {
        match Column::new(name, ty) {
            Ok(col) => self.columns.push(col),
            Err(e) => self.record(e),
        }
        self
    }

    /// Declare a `VARCHAR(length)` column.
    pub fn varchar(self, name: &str, length: u32) -> Self {
        self.column(name, ColumnType::Varchar(Some(length)))
    }

    /// Declare a `TEXT` column.
    pub fn text(self, name: &str) -> Self {
        self.column(name, ColumnType::Text)
    }

    /// Declare an `INTEGER` column.
    pub fn integer(self, name: &str) -> Self {
        self.column(name, ColumnType::Integer)
    }

    /// Declare a `BIGINT` column.
    pub fn big_integer(self, name: &str) -> Self {
        self.column(name, ColumnType::BigInt)
    }

    /// Declare a `DOUBLE PRECISION` column.
    pub fn double(self, name: &str) -> Self {
        self.column(name, ColumnType::Double)
    }

    /// Declare a `BOOLEAN` column.
    pub fn boolean(self, name: &str) -> Self {
        self.column(name, ColumnType::Boolean)
    }

    /// Declare a `TIMESTAMPTZ` column.
    pub fn timestamptz(self, name: &str) -> Self {
        self.column(name, ColumnType::Timestamptz)
    }

    /// Declare a `UUID` column.
    pub fn uuid(self, name: &str) -> Self {
        self.column(name, ColumnType::Uuid)
    }

    /// Declare a `JSONB` column.
    pub fn jsonb(self, name: &str) -> Self {
        self.column(name, ColumnType::Jsonb)
    }

    /// Finish the declaration, validating names and uniqueness.
    pub fn build(self) -> QueryResult<Table> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let tablename = self.tablename.unwrap_or(self.default_name);
        ident::check(&tablename)?;

        for (i, col) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name() == col.name()) {
                return Err(QueryError::validation(format!(
                    "duplicate column '{}' on table '{}'",
                    col.name(),
                    tablename
                )));
            }
        }

        Ok(Table {
            inner: Arc::new(TableInner {
                meta: Meta { tablename },
                columns: self.columns,
            }),
        })
    }

    fn record(&mut self, e: QueryError) {
        if self.error.is_none() {
            self.error = Some(e);
        }
    }
}

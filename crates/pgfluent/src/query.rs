//! Fluent statement builder and execution.
//!
//! A [`Query`] is created from a [`Table`] entry point (`select`, `update`,
//! `delete`, `create`) and extended by chaining. Every chaining method
//! consumes the builder and returns the extended one; invalid input is
//! recorded and surfaces as a `Validation` error at build time, before any
//! SQL reaches a connection.
//!
//! Compilation is deterministic: statement head, SET (UPDATE), WHERE,
//! ORDER BY, LIMIT. Building the same query twice yields identical SQL and
//! parameters.

use crate::client::GenericClient;
use crate::condition::Condition;
use crate::error::{QueryError, QueryResult};
use crate::table::Table;
use crate::value::{Record, Value, decode_row};
use std::fmt;
use tokio_postgres::types::ToSql;

/// Statement kind selected by the [`Table`] entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Update,
    Delete,
    Create,
}

/// Result of executing a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Rows returned by a SELECT, in database order.
    Rows(Vec<Record>),
    /// Affected-row count from UPDATE / DELETE / CREATE.
    Affected(u64),
}

impl QueryOutput {
    /// The returned rows; empty for non-SELECT statements.
    pub fn into_rows(self) -> Vec<Record> {
        match self {
            QueryOutput::Rows(rows) => rows,
            QueryOutput::Affected(_) => Vec::new(),
        }
    }

    /// Borrow the returned rows; empty for non-SELECT statements.
    pub fn rows(&self) -> &[Record] {
        match self {
            QueryOutput::Rows(rows) => rows,
            QueryOutput::Affected(_) => &[],
        }
    }

    /// The affected-row count; for SELECT, the number of rows returned.
    pub fn affected(&self) -> u64 {
        match self {
            QueryOutput::Rows(rows) => rows.len() as u64,
            QueryOutput::Affected(n) => *n,
        }
    }
}

/// A fluent statement builder bound to one table.
#[derive(Debug, Clone)]
pub struct Query {
    table: Table,
    kind: QueryKind,
    columns: Vec<String>,
    filter: Option<Condition>,
    order: Option<(String, bool)>,
    limit: Option<i64>,
    assignments: Vec<(String, Value)>,
    count: bool,
    allow_unfiltered: bool,
    build_error: Option<String>,
}

impl Query {
    pub(crate) fn new(table: Table, kind: QueryKind) -> Self {
        Self {
            table,
            kind,
            columns: Vec::new(),
            filter: None,
            order: None,
            limit: None,
            assignments: Vec::new(),
            count: false,
            allow_unfiltered: false,
            build_error: None,
        }
    }

    /// The statement kind of this builder.
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub(crate) fn project(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// AND a condition into the filter. The first call sets the root; later
    /// calls combine with the existing one, so chained `where_` is the same
    /// filter as a single `&` expression.
    pub fn where_(mut self, condition: Condition) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Order the result by one column. A `-` prefix sorts descending
    /// (`"-power"`); a repeated call replaces the previous ordering.
    pub fn order_by(mut self, field: &str) -> Self {
        let (column, desc) = match field.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (field, false),
        };
        self.order = Some((column.to_string(), desc));
        self
    }

    /// Cap the number of returned rows. Negative limits are rejected before
    /// any database contact.
    pub fn limit(mut self, n: i64) -> Self {
        if n < 0 {
            self.record_error(format!("LIMIT must be non-negative, got {n}"));
        } else {
            self.limit = Some(n);
        }
        self
    }

    /// Replace the projection with `COUNT(*) AS count`. ORDER BY and LIMIT
    /// are omitted from the compiled statement.
    pub fn count(mut self) -> Self {
        if self.kind != QueryKind::Select {
            self.record_error("count() is only valid on a SELECT".to_string());
        } else {
            self.count = true;
        }
        self
    }

    /// Add one `SET column = value` assignment (UPDATE only).
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        if self.kind != QueryKind::Update {
            self.record_error("set() is only valid on an UPDATE".to_string());
        } else {
            self.assignments.push((column.to_string(), value.into()));
        }
        self
    }

    /// Permit an unfiltered DELETE, which otherwise fails validation.
    pub fn allow_unfiltered(mut self) -> Self {
        self.allow_unfiltered = true;
        self
    }

    fn record_error(&mut self, message: String) {
        if self.build_error.is_none() {
            self.build_error = Some(message);
        }
    }

    fn validate(&self) -> QueryResult<()> {
        if let Some(message) = &self.build_error {
            return Err(QueryError::validation(message.clone()));
        }

        // CREATE compiles from the declared schema alone.
        if self.kind == QueryKind::Create {
            return Ok(());
        }

        for column in &self.columns {
            self.table.column(column)?;
        }
        if let Some(filter) = &self.filter {
            let mut unknown = None;
            filter.for_each_column(&mut |column| {
                if unknown.is_none() && !self.table.has_column(column) {
                    unknown = Some(column.to_string());
                }
            });
            if let Some(column) = unknown {
                return Err(QueryError::validation(format!(
                    "condition references column '{}' not declared on table '{}'",
                    column,
                    self.table.meta().tablename
                )));
            }
        }
        if let Some((column, _)) = &self.order {
            self.table.column(column)?;
        }

        match self.kind {
            QueryKind::Update => {
                if self.assignments.is_empty() {
                    return Err(QueryError::validation(
                        "UPDATE requires at least one set() assignment",
                    ));
                }
                for (i, (column, _)) in self.assignments.iter().enumerate() {
                    self.table.column(column)?;
                    if self.assignments[..i].iter().any(|(c, _)| c == column) {
                        return Err(QueryError::validation(format!(
                            "duplicate set() assignment for column '{column}'"
                        )));
                    }
                }
            }
            QueryKind::Delete => {
                if self.filter.is_none() && !self.allow_unfiltered {
                    return Err(QueryError::validation(format!(
                        "unfiltered DELETE on table '{}'; call allow_unfiltered() to permit it",
                        self.table.meta().tablename
                    )));
                }
            }
            QueryKind::Select | QueryKind::Create => {}
        }

        Ok(())
    }

    /// Validate and compile into `(sql, params)`.
    pub fn build(&self) -> QueryResult<(String, Vec<Value>)> {
        self.validate()?;

        let mut sql = String::new();
        let mut params = Vec::new();
        let tablename = &self.table.meta().tablename;

        match self.kind {
            QueryKind::Select => {
                sql.push_str("SELECT ");
                if self.count {
                    sql.push_str("COUNT(*) AS count");
                } else if self.columns.is_empty() {
                    let all: Vec<&str> = self.table.columns().iter().map(|c| c.name()).collect();
                    sql.push_str(&all.join(", "));
                } else {
                    sql.push_str(&self.columns.join(", "));
                }
                sql.push_str(" FROM ");
                sql.push_str(tablename);
                self.push_where(&mut sql, &mut params);
                if !self.count {
                    if let Some((column, desc)) = &self.order {
                        sql.push_str(" ORDER BY ");
                        sql.push_str(column);
                        if *desc {
                            sql.push_str(" DESC");
                        }
                    }
                    if let Some(limit) = self.limit {
                        sql.push_str(" LIMIT ");
                        sql.push_str(&limit.to_string());
                    }
                }
            }
            QueryKind::Update => {
                sql.push_str("UPDATE ");
                sql.push_str(tablename);
                sql.push_str(" SET ");
                for (i, (column, value)) in self.assignments.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    params.push(value.clone());
                    sql.push_str(column);
                    sql.push_str(" = $");
                    sql.push_str(&params.len().to_string());
                }
                self.push_where(&mut sql, &mut params);
            }
            QueryKind::Delete => {
                sql.push_str("DELETE FROM ");
                sql.push_str(tablename);
                self.push_where(&mut sql, &mut params);
            }
            QueryKind::Create => {
                sql.push_str("CREATE TABLE ");
                sql.push_str(tablename);
                sql.push_str(" (");
                for (i, column) in self.table.columns().iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    sql.push_str(column.name());
                    sql.push(' ');
                    sql.push_str(&column.column_type().ddl());
                }
                sql.push(')');
            }
        }

        Ok((sql, params))
    }

    /// The compiled statement text, or the validation error message.
    pub fn to_sql(&self) -> String {
        match self.build() {
            Ok((sql, _)) => sql,
            Err(e) => e.to_string(),
        }
    }

    /// Validate, compile, and run this statement on a connection.
    pub async fn execute<C: GenericClient>(&self, conn: &C) -> QueryResult<QueryOutput> {
        let (sql, params) = self.build()?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|v| v as &(dyn ToSql + Sync)).collect();

        tracing::debug!(sql = %sql, params = params.len(), "executing statement");

        match self.kind {
            QueryKind::Select => {
                let rows = conn.query(&sql, &refs).await?;
                let mut records = Vec::with_capacity(rows.len());
                for row in &rows {
                    records.push(decode_row(row)?);
                }
                Ok(QueryOutput::Rows(records))
            }
            QueryKind::Update | QueryKind::Delete | QueryKind::Create => {
                let affected = conn.execute(&sql, &refs).await?;
                Ok(QueryOutput::Affected(affected))
            }
        }
    }

    /// SELECT convenience: execute and return the rows directly.
    pub async fn fetch<C: GenericClient>(&self, conn: &C) -> QueryResult<Vec<Record>> {
        Ok(self.execute(conn).await?.into_rows())
    }

    /// Acquire a pooled connection for one execution and release it when the
    /// call returns, on success or failure.
    #[cfg(feature = "pool")]
    pub async fn run(&self, pool: &deadpool_postgres::Pool) -> QueryResult<QueryOutput> {
        let client = pool.get().await?;
        self.execute(&client).await
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl Query {
    fn push_where(&self, sql: &mut String, params: &mut Vec<Value>) {
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            filter.render(sql, params);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pokemon() -> Table {
        Table::builder("Pokemon")
            .varchar("name", 50)
            .varchar("trainer", 50)
            .integer("power")
            .build()
            .unwrap()
    }

    #[test]
    fn select_all_columns() {
        let table = pokemon();
        let (sql, params) = table.select(&[]).build().unwrap();
        assert_eq!(sql, "SELECT name, trainer, power FROM pokemon");
        assert!(params.is_empty());
    }

    #[test]
    fn select_projection() {
        let table = pokemon();
        let (sql, _) = table.select(&["name", "power"]).build().unwrap();
        assert_eq!(sql, "SELECT name, power FROM pokemon");
    }

    #[test]
    fn select_with_filter() {
        let table = pokemon();
        let name = table.column("name").unwrap().clone();
        let (sql, params) = table
            .select(&["name"])
            .where_(name.eq("pikachu"))
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT name FROM pokemon WHERE name = $1");
        assert_eq!(params, vec![Value::from("pikachu")]);
    }

    #[test]
    fn chained_where_equals_single_and() {
        let table = pokemon();
        let power = table.column("power").unwrap().clone();
        let name = table.column("name").unwrap().clone();

        let chained = table
            .select(&[])
            .where_(power.lte(1000))
            .where_(name.like("%chu"))
            .build()
            .unwrap();
        let combined = table
            .select(&[])
            .where_(power.lte(1000) & name.like("%chu"))
            .build()
            .unwrap();

        assert_eq!(chained, combined);
        assert!(chained.0.contains("power <= $1 AND name LIKE $2"));
    }

    #[test]
    fn rendered_sql_contains_boolean_tokens() {
        let table = pokemon();
        let name = table.column("name").unwrap().clone();
        let power = table.column("power").unwrap().clone();

        let query = table
            .select(&[])
            .where_(power.gt(10).and(name.eq("raichu").or(name.eq("weedle"))));
        assert!(query.to_sql().contains("AND"));
        assert!(query.to_sql().contains("OR"));
    }

    #[test]
    fn order_by_ascending_and_descending() {
        let table = pokemon();
        let (sql, _) = table.select(&[]).order_by("name").build().unwrap();
        assert!(sql.ends_with("ORDER BY name"));

        let (sql, _) = table.select(&[]).order_by("-power").build().unwrap();
        assert!(sql.ends_with("ORDER BY power DESC"));
    }

    #[test]
    fn repeated_order_by_replaces() {
        let table = pokemon();
        let (sql, _) = table
            .select(&[])
            .order_by("name")
            .order_by("-power")
            .build()
            .unwrap();
        assert!(sql.ends_with("ORDER BY power DESC"));
        assert!(!sql.contains("ORDER BY name"));
    }

    #[test]
    fn limit_renders_inline() {
        let table = pokemon();
        let (sql, params) = table.select(&[]).limit(1).build().unwrap();
        assert!(sql.ends_with("LIMIT 1"));
        assert!(params.is_empty());
    }

    #[test]
    fn negative_limit_fails_fast() {
        let table = pokemon();
        let err = table.select(&[]).limit(-1).build().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("LIMIT"));
    }

    #[test]
    fn count_replaces_projection_and_drops_ordering() {
        let table = pokemon();
        let (sql, _) = table
            .select(&[])
            .order_by("name")
            .limit(5)
            .count()
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) AS count FROM pokemon");
    }

    #[test]
    fn count_with_filter_keeps_where() {
        let table = pokemon();
        let name = table.column("name").unwrap().clone();
        let (sql, params) = table
            .select(&[])
            .where_(name.eq("pikachu"))
            .count()
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) AS count FROM pokemon WHERE name = $1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn clause_order_is_fixed() {
        let table = pokemon();
        let power = table.column("power").unwrap().clone();
        let (sql, _) = table
            .select(&["name"])
            .limit(3)
            .order_by("name")
            .where_(power.gt(5))
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT name FROM pokemon WHERE power > $1 ORDER BY name LIMIT 3"
        );
    }

    #[test]
    fn update_compiles_set_then_where() {
        let table = pokemon();
        let name = table.column("name").unwrap().clone();
        let (sql, params) = table
            .update()
            .set("name", "kakuna")
            .where_(name.eq("weedle"))
            .build()
            .unwrap();
        assert_eq!(sql, "UPDATE pokemon SET name = $1 WHERE name = $2");
        assert_eq!(
            params,
            vec![Value::from("kakuna"), Value::from("weedle")]
        );
    }

    #[test]
    fn update_multiple_assignments() {
        let table = pokemon();
        let power = table.column("power").unwrap().clone();
        let (sql, params) = table
            .update()
            .set("name", "raichu")
            .set("power", 2000)
            .where_(power.gt(1500))
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE pokemon SET name = $1, power = $2 WHERE power > $3"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn duplicate_set_assignment_fails() {
        let table = pokemon();
        let name = table.column("name").unwrap().clone();
        let err = table
            .update()
            .set("name", "kakuna")
            .set("name", "beedrill")
            .where_(name.eq("weedle"))
            .build()
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("duplicate set()"));
    }

    #[test]
    fn update_without_assignments_fails() {
        let table = pokemon();
        let name = table.column("name").unwrap().clone();
        let err = table.update().where_(name.eq("weedle")).build().unwrap_err();
        assert!(err.to_string().contains("at least one set()"));
    }

    #[test]
    fn set_on_select_is_rejected() {
        let table = pokemon();
        let err = table.select(&[]).set("name", "x").build().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn count_on_update_is_rejected() {
        let table = pokemon();
        let err = table.update().count().set("name", "x").build().unwrap_err();
        assert!(err.to_string().contains("SELECT"));
    }

    #[test]
    fn delete_with_filter() {
        let table = pokemon();
        let name = table.column("name").unwrap().clone();
        let (sql, params) = table
            .delete()
            .where_(name.eq("weedle"))
            .build()
            .unwrap();
        assert_eq!(sql, "DELETE FROM pokemon WHERE name = $1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn unfiltered_delete_requires_opt_in() {
        let table = pokemon();
        let err = table.delete().build().unwrap_err();
        assert!(err.to_string().contains("unfiltered DELETE"));

        let (sql, _) = table.delete().allow_unfiltered().build().unwrap();
        assert_eq!(sql, "DELETE FROM pokemon");
    }

    #[test]
    fn create_emits_ddl() {
        let table = pokemon();
        let (sql, params) = table.create().build().unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE pokemon (name VARCHAR(50), trainer VARCHAR(50), power INTEGER)"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn create_ignores_filters_and_projection() {
        let table = pokemon();
        let name = table.column("name").unwrap().clone();
        let (sql, params) = table.create().where_(name.eq("x")).build().unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE pokemon (name VARCHAR(50), trainer VARCHAR(50), power INTEGER)"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn unknown_projection_column_fails() {
        let table = pokemon();
        let err = table.select(&["speed"]).build().unwrap_err();
        assert!(err.to_string().contains("speed"));
    }

    #[test]
    fn unknown_filter_column_fails() {
        let table = pokemon();
        let speed = crate::column::Column::new("speed", crate::column::ColumnType::Integer)
            .unwrap();
        let err = table.select(&[]).where_(speed.gt(1)).build().unwrap_err();
        assert!(err.to_string().contains("not declared"));
    }

    #[test]
    fn unknown_order_column_fails() {
        let table = pokemon();
        assert!(table.select(&[]).order_by("speed").build().is_err());
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let table = pokemon();
        let power = table.column("power").unwrap().clone();
        let query = table.select(&[]).where_(power.lte(1000)).order_by("name");
        assert_eq!(query.build().unwrap(), query.build().unwrap());
    }

    #[test]
    fn display_matches_to_sql() {
        let table = pokemon();
        let query = table.select(&["name"]);
        assert_eq!(format!("{query}"), query.to_sql());
    }

    #[test]
    fn invalid_builder_displays_error() {
        let table = pokemon();
        let query = table.select(&[]).limit(-5);
        assert!(query.to_sql().contains("Validation"));
    }

    #[test]
    fn output_accessors() {
        let out = QueryOutput::Affected(3);
        assert_eq!(out.affected(), 3);
        assert!(out.rows().is_empty());
        assert!(out.into_rows().is_empty());

        let out = QueryOutput::Rows(vec![Record::default()]);
        assert_eq!(out.affected(), 1);
        assert_eq!(out.rows().len(), 1);
    }
}

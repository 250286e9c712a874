//! Row and statement operations against the remote store.
//!
//! Table and column names are always passed through the query builder as
//! identifiers, so they are quoted for the active backend. Only raw
//! administrative statements are sent as given.

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Asterisk, Expr, IntoTableRef, Query, SimpleExpr, TableRef, Value};
use sea_orm::{ConnectionTrait, DbErr, FromQueryResult, JsonValue};
use serde_json::Map;

use crate::error::PatchError;
use crate::infra::db::core::ConnectionHandle;

/// Equality filter for row selection. A JSON `null` value selects `IS NULL`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: JsonValue,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Parse `column=value`. The value is read as JSON when it parses as JSON,
    /// otherwise it is taken as a plain string.
    pub fn parse(spec: &str) -> Result<Self, PatchError> {
        let Some((column, raw)) = spec.split_once('=') else {
            return Err(PatchError::config(format!(
                "filter '{spec}' must look like column=value"
            )));
        };
        let column = column.trim();
        if column.is_empty() {
            return Err(PatchError::config(format!("filter '{spec}' names no column")));
        }
        let raw = raw.trim();
        let value = serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()));
        Ok(Self::eq(column, value))
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Run an administrative statement as-is and return the affected row count.
    async fn execute_raw(&self, sql: &str) -> Result<u64, DbErr>;

    async fn select_rows(
        &self,
        table: &str,
        filter: Option<&Filter>,
        limit: u64,
    ) -> Result<Vec<JsonValue>, DbErr>;

    async fn insert_row(&self, table: &str, row: &Map<String, JsonValue>) -> Result<u64, DbErr>;

    async fn delete_by_id(
        &self,
        table: &str,
        id_column: &str,
        id: &JsonValue,
    ) -> Result<u64, DbErr>;
}

#[async_trait]
impl Store for ConnectionHandle {
    async fn execute_raw(&self, sql: &str) -> Result<u64, DbErr> {
        let result = self.connection().execute_unprepared(sql).await?;
        Ok(result.rows_affected())
    }

    async fn select_rows(
        &self,
        table: &str,
        filter: Option<&Filter>,
        limit: u64,
    ) -> Result<Vec<JsonValue>, DbErr> {
        let mut query = Query::select();
        query.column(Asterisk).from(table_ref(table)?).limit(limit);

        if let Some(filter) = filter {
            let column = Expr::col(Alias::new(filter.column.as_str()));
            let condition = if filter.value.is_null() {
                column.is_null()
            } else {
                column.eq(json_to_value(&filter.value)?)
            };
            query.and_where(condition);
        }

        let stmt = self.backend().build(&query);
        JsonValue::find_by_statement(stmt)
            .all(self.connection())
            .await
    }

    async fn insert_row(&self, table: &str, row: &Map<String, JsonValue>) -> Result<u64, DbErr> {
        if row.is_empty() {
            return Err(DbErr::Custom(format!(
                "insert into '{table}' needs at least one column"
            )));
        }

        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (column, value) in row {
            columns.push(Alias::new(column.as_str()));
            values.push(SimpleExpr::from(json_to_value(value)?));
        }

        let mut query = Query::insert();
        query.into_table(table_ref(table)?).columns(columns);
        query
            .values(values)
            .map_err(|e| DbErr::Custom(format!("invalid insert into '{table}': {e}")))?;

        let stmt = self.backend().build(&query);
        let result = self.connection().execute(stmt).await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_id(
        &self,
        table: &str,
        id_column: &str,
        id: &JsonValue,
    ) -> Result<u64, DbErr> {
        if id.is_null() {
            return Err(DbErr::Custom(format!(
                "refusing to delete from '{table}' by a null {id_column}"
            )));
        }

        let mut query = Query::delete();
        query
            .from_table(table_ref(table)?)
            .and_where(Expr::col(Alias::new(id_column)).eq(json_to_value(id)?));

        let stmt = self.backend().build(&query);
        let result = self.connection().execute(stmt).await?;
        Ok(result.rows_affected())
    }
}

/// Resolve `table` or `schema.table` into a quoted table reference.
fn table_ref(table: &str) -> Result<TableRef, DbErr> {
    let table = table.trim();
    if table.matches('.').count() > 1 {
        return Err(DbErr::Custom(format!(
            "invalid table name '{table}': expected 'table' or 'schema.table'"
        )));
    }
    match table.split_once('.') {
        Some((schema, name)) if !schema.is_empty() && !name.is_empty() => {
            Ok((Alias::new(schema), Alias::new(name)).into_table_ref())
        }
        None if !table.is_empty() => Ok(Alias::new(table).into_table_ref()),
        _ => Err(DbErr::Custom(format!("invalid table name '{table}'"))),
    }
}

fn json_to_value(value: &JsonValue) -> Result<Value, DbErr> {
    match value {
        JsonValue::Null => Ok(Value::String(None)),
        JsonValue::Bool(b) => Ok(Value::from(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::from(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::from(f))
            } else {
                Err(DbErr::Custom(format!("number {n} is out of range")))
            }
        }
        JsonValue::String(s) => Ok(Value::from(s.clone())),
        JsonValue::Array(_) | JsonValue::Object(_) => Err(DbErr::Custom(
            "nested JSON values are not supported as column values".to_string(),
        )),
    }
}

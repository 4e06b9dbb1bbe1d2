//! Rendering of store requests into Postgres statements
//!
//! Rows travel as JSON: reads go through `row_to_json` / `json_build_object`,
//! writes through `jsonb_populate_record(set)`, so column names are the only
//! SQL text built here and they are compile-time identifiers. Values are
//! always bound.

use crate::{DbClient, DbError, DbResult};
use oasis_core::{
    Column, Delete, Insert, Order, Predicate, Row, Select, Store, StoreResult, Update, Value,
};
use serde_json::Value as Json;
use sqlx::types::Json as SqlJson;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, instrument};

type Statement = QueryBuilder<'static, Postgres>;

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn push_value(qb: &mut Statement, value: &Value) {
    match value {
        Value::Int(v) => qb.push_bind(*v),
        Value::Text(v) => qb.push_bind(v.clone()),
        Value::Date(v) => qb.push_bind(*v),
    };
}

fn push_comparison(qb: &mut Statement, column: &str, op: &str, value: &Value) {
    qb.push(quote_ident(column));
    qb.push(format_args!(" {op} "));
    push_value(qb, value);
}

fn push_predicate(qb: &mut Statement, predicate: &Predicate) {
    match predicate {
        Predicate::Eq(column, value) => push_comparison(qb, column, "=", value),
        Predicate::Gt(column, value) => push_comparison(qb, column, ">", value),
        Predicate::Gte(column, value) => push_comparison(qb, column, ">=", value),
        Predicate::Lt(column, value) => push_comparison(qb, column, "<", value),
        Predicate::Or(alternatives) if alternatives.is_empty() => {
            qb.push("FALSE");
        }
        Predicate::Or(alternatives) => {
            qb.push("(");
            for (i, alternative) in alternatives.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_predicate(qb, alternative);
            }
            qb.push(")");
        }
    }
}

fn push_where(qb: &mut Statement, filters: &[Predicate]) {
    for (i, predicate) in filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        push_predicate(qb, predicate);
    }
}

fn push_order(qb: &mut Statement, order: Option<Order>) {
    if let Some(order) = order {
        qb.push(" ORDER BY ");
        qb.push(quote_ident(order.column));
        qb.push(if order.ascending { " ASC" } else { " DESC" });
    }
}

fn push_returning(qb: &mut Statement, table: &str) {
    qb.push(format_args!(
        " RETURNING row_to_json({}.*) AS data",
        quote_ident(table)
    ));
}

/// `json_build_object('a', "t"."a", ...)` over the given columns
fn json_object(table: &str, columns: &[&str]) -> String {
    let pairs: Vec<String> = columns
        .iter()
        .map(|c| format!("{}, {}.{}", quote_literal(c), quote_ident(table), quote_ident(c)))
        .collect();
    format!("json_build_object({})", pairs.join(", "))
}

fn projection(table: &str, columns: &[Column]) -> String {
    if columns.is_empty() {
        return format!("row_to_json({})", quote_ident(table));
    }

    let pairs: Vec<String> = columns
        .iter()
        .map(|column| match column {
            Column::Field(name) => format!(
                "{}, {}.{}",
                quote_literal(name),
                quote_ident(table),
                quote_ident(name)
            ),
            Column::Embed {
                table: embedded,
                columns,
                on,
            } => format!(
                "{}, (SELECT {} FROM {} WHERE {}.\"id\" = {}.{})",
                quote_literal(embedded),
                json_object(embedded, columns),
                quote_ident(embedded),
                quote_ident(embedded),
                quote_ident(table),
                quote_ident(on)
            ),
        })
        .collect();
    format!("json_build_object({})", pairs.join(", "))
}

/// Sorted union of the keys of every row
fn payload_columns(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = rows.iter().flat_map(|row| row.keys().cloned()).collect();
    columns.sort();
    columns.dedup();
    columns
}

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_select(query: &Select) -> Statement {
    let mut qb = Statement::new("SELECT ");
    qb.push(projection(query.table, &query.columns));
    qb.push(" AS data FROM ");
    qb.push(quote_ident(query.table));
    push_where(&mut qb, &query.filters);
    push_order(&mut qb, query.order);
    qb
}

pub fn build_insert(insert: &Insert) -> DbResult<Statement> {
    let columns = payload_columns(&insert.rows);
    if columns.is_empty() {
        return Err(DbError::InvalidQuery(format!(
            "insert into {} without values",
            insert.table
        )));
    }
    let list = column_list(&columns);
    let rows = Json::Array(insert.rows.iter().cloned().map(Json::Object).collect());

    let mut qb = Statement::new("INSERT INTO ");
    qb.push(quote_ident(insert.table));
    qb.push(format_args!(" ({list}) SELECT {list} FROM jsonb_populate_recordset(NULL::"));
    qb.push(quote_ident(insert.table));
    qb.push(", ");
    qb.push_bind(SqlJson(rows));
    qb.push(")");
    push_returning(&mut qb, insert.table);
    Ok(qb)
}

pub fn build_update(update: &Update) -> DbResult<Statement> {
    if update.filters.is_empty() {
        return Err(DbError::InvalidQuery(format!(
            "refusing to update {} without a filter",
            update.table
        )));
    }
    if update.fields.is_empty() {
        return Err(DbError::InvalidQuery(format!(
            "update of {} without fields",
            update.table
        )));
    }
    let columns = payload_columns(std::slice::from_ref(&update.fields));
    let list = column_list(&columns);

    let mut qb = Statement::new("UPDATE ");
    qb.push(quote_ident(update.table));
    qb.push(format_args!(" SET ({list}) = (SELECT {list} FROM jsonb_populate_record(NULL::"));
    qb.push(quote_ident(update.table));
    qb.push(", ");
    qb.push_bind(SqlJson(Json::Object(update.fields.clone())));
    qb.push("))");
    push_where(&mut qb, &update.filters);
    push_returning(&mut qb, update.table);
    Ok(qb)
}

pub fn build_delete(delete: &Delete) -> DbResult<Statement> {
    if delete.filters.is_empty() {
        return Err(DbError::InvalidQuery(format!(
            "refusing to delete from {} without a filter",
            delete.table
        )));
    }

    let mut qb = Statement::new("DELETE FROM ");
    qb.push(quote_ident(delete.table));
    push_where(&mut qb, &delete.filters);
    push_returning(&mut qb, delete.table);
    Ok(qb)
}

impl DbClient {
    /// Run a statement producing one JSON object per row
    async fn fetch_rows(&self, mut statement: Statement) -> DbResult<Vec<Row>> {
        let values: Vec<Json> = statement
            .build_query_scalar()
            .fetch_all(self.pool())
            .await?;

        values
            .into_iter()
            .map(|value| match value {
                Json::Object(row) => Ok(row),
                other => Err(DbError::Decode(format!("expected a JSON object, got {other}"))),
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Store for DbClient {
    #[instrument(skip(self, query), fields(table = query.table))]
    async fn select(&self, query: &Select) -> StoreResult<Vec<Row>> {
        let rows = self.fetch_rows(build_select(query)).await?;
        debug!("Selected {} rows from {}", rows.len(), query.table);
        Ok(rows)
    }

    #[instrument(skip(self, insert), fields(table = insert.table))]
    async fn insert(&self, insert: &Insert) -> StoreResult<Vec<Row>> {
        let rows = self.fetch_rows(build_insert(insert)?).await?;
        debug!("Inserted {} rows into {}", rows.len(), insert.table);
        Ok(rows)
    }

    #[instrument(skip(self, update), fields(table = update.table))]
    async fn update(&self, update: &Update) -> StoreResult<Vec<Row>> {
        let rows = self.fetch_rows(build_update(update)?).await?;
        debug!("Updated {} rows in {}", rows.len(), update.table);
        Ok(rows)
    }

    #[instrument(skip(self, delete), fields(table = delete.table))]
    async fn delete(&self, delete: &Delete) -> StoreResult<Vec<Row>> {
        let rows = self.fetch_rows(build_delete(delete)?).await?;
        debug!("Deleted {} rows from {}", rows.len(), delete.table);
        Ok(rows)
    }
}

//! In-process `Store` used by tests and local tooling
//!
//! Behaves like the relational backend for everything the data service
//! relies on: auto-increment ids, server-side `created_at`, unique
//! columns, nested embeds, ordering and `RETURNING`-style results.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::Value as Json;

use crate::schema::{columns, tables};
use crate::store::{
    Column, Delete, Insert, Predicate, Row, Select, Store, StoreError, StoreResult, Update, Value,
};
use crate::types::parse_calendar_date;

#[derive(Default)]
struct Table {
    rows: Vec<Row>,
    last_id: i64,
}

#[derive(Default)]
struct State {
    tables: HashMap<&'static str, Table>,
    unique: Vec<(&'static str, &'static str)>,
    failing: HashSet<&'static str>,
}

/// Thread-safe in-memory tables keyed by name
pub struct MemoryStore {
    state: Mutex<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store with the four booking tables and a unique guest email
    pub fn new() -> Self {
        let mut state = State::default();
        for table in tables::ALL {
            state.tables.insert(table, Table::default());
        }
        state.unique.push((tables::GUESTS, columns::EMAIL));

        Self {
            state: Mutex::new(state),
        }
    }

    /// Make every request touching `table` fail with a backend error
    pub fn fail_table(&self, table: &'static str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.insert(table);
        }
    }

    /// Undo `fail_table`
    pub fn heal_table(&self, table: &'static str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.remove(table);
        }
    }

    /// Insert fixture rows directly, bypassing constraints
    pub fn seed(&self, table: &'static str, rows: impl IntoIterator<Item = Json>) -> StoreResult<()> {
        let mut state = self.lock()?;
        let table = state
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::InvalidQuery(format!("unknown table {table}")))?;

        for row in rows {
            let Json::Object(row) = row else {
                return Err(StoreError::InvalidQuery("seed rows must be objects".into()));
            };
            let row = table.complete(row);
            table.rows.push(row);
        }
        Ok(())
    }

    /// Number of rows currently stored in `table`
    pub fn count(&self, table: &'static str) -> usize {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.tables.get(table).map(|t| t.rows.len()))
            .unwrap_or(0)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

impl Table {
    /// Fill server-assigned columns
    fn complete(&mut self, mut row: Row) -> Row {
        match row.get(columns::ID).and_then(Json::as_i64) {
            Some(id) => self.last_id = self.last_id.max(id),
            None => {
                self.last_id += 1;
                row.insert(columns::ID.to_string(), Json::from(self.last_id));
            }
        }
        if !row.contains_key(columns::CREATED_AT) {
            row.insert(
                columns::CREATED_AT.to_string(),
                Json::String(Utc::now().to_rfc3339()),
            );
        }
        row
    }
}

impl State {
    fn table(&self, name: &'static str) -> StoreResult<&Table> {
        if self.failing.contains(name) {
            return Err(StoreError::Backend(format!("{name} is unavailable")));
        }
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::InvalidQuery(format!("unknown table {name}")))
    }

    fn table_mut(&mut self, name: &'static str) -> StoreResult<&mut Table> {
        if self.failing.contains(name) {
            return Err(StoreError::Backend(format!("{name} is unavailable")));
        }
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::InvalidQuery(format!("unknown table {name}")))
    }

    /// Reject `candidate` if it collides with another row on a unique column
    fn check_unique(
        &self,
        table: &'static str,
        candidate: &Row,
        others: &[&Row],
    ) -> StoreResult<()> {
        for (_, column) in self.unique.iter().filter(|(t, _)| *t == table) {
            let Some(value) = candidate.get(*column).filter(|v| !v.is_null()) else {
                continue;
            };
            if others.iter().any(|row| row.get(*column) == Some(value)) {
                return Err(StoreError::ConstraintViolation(format!(
                    "duplicate key value violates unique constraint on {table}.{column}"
                )));
            }
        }
        Ok(())
    }

    fn project(&self, row: &Row, requested: &[Column]) -> StoreResult<Row> {
        if requested.is_empty() {
            return Ok(row.clone());
        }

        let mut out = Row::new();
        for column in requested {
            match column {
                Column::Field(name) => {
                    let value = row.get(*name).cloned().unwrap_or(Json::Null);
                    out.insert(name.to_string(), value);
                }
                Column::Embed { table, columns: fields, on } => {
                    let parent = self.table(*table)?;
                    let target = row.get(*on);
                    let nested = parent
                        .rows
                        .iter()
                        .find(|candidate| target.is_some() && candidate.get(columns::ID) == target)
                        .map(|found| {
                            let mut nested = Row::new();
                            for field in fields {
                                let value = found.get(*field).cloned().unwrap_or(Json::Null);
                                nested.insert(field.to_string(), value);
                            }
                            Json::Object(nested)
                        })
                        .unwrap_or(Json::Null);
                    out.insert(table.to_string(), nested);
                }
            }
        }
        Ok(out)
    }
}

fn require_filters(filters: &[Predicate], action: &str) -> StoreResult<()> {
    if filters.is_empty() {
        return Err(StoreError::InvalidQuery(format!(
            "refusing to {action} without a filter"
        )));
    }
    Ok(())
}

fn matches_all(row: &Row, filters: &[Predicate]) -> bool {
    filters.iter().all(|p| matches(row, p))
}

fn matches(row: &Row, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Eq(column, value) => compare(row.get(*column), value) == Some(Ordering::Equal),
        Predicate::Gt(column, value) => compare(row.get(*column), value) == Some(Ordering::Greater),
        Predicate::Gte(column, value) => matches!(
            compare(row.get(*column), value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Predicate::Lt(column, value) => compare(row.get(*column), value) == Some(Ordering::Less),
        Predicate::Or(alternatives) => alternatives.iter().any(|p| matches(row, p)),
    }
}

/// Compare a stored cell with a filter operand; `None` when incomparable (SQL NULL semantics)
fn compare(cell: Option<&Json>, operand: &Value) -> Option<Ordering> {
    let cell = cell?;
    match operand {
        Value::Int(expected) => cell.as_i64().map(|v| v.cmp(expected)),
        Value::Text(expected) => cell.as_str().map(|v| v.cmp(expected.as_str())),
        Value::Date(expected) => cell
            .as_str()
            .and_then(parse_calendar_date)
            .map(|v| v.cmp(expected)),
    }
}

/// Ordering of two cells for ORDER BY; nulls sort last
fn order_cells(a: Option<&Json>, b: Option<&Json>) -> Ordering {
    match (a, b) {
        (Some(Json::Number(x)), Some(Json::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Json::String(x)), Some(Json::String(y))) => x.cmp(y),
        (Some(Json::Bool(x)), Some(Json::Bool(y))) => x.cmp(y),
        (None | Some(Json::Null), None | Some(Json::Null)) => Ordering::Equal,
        (None | Some(Json::Null), _) => Ordering::Greater,
        (_, None | Some(Json::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn select(&self, query: &Select) -> StoreResult<Vec<Row>> {
        let state = self.lock()?;
        let table = state.table(query.table)?;

        let mut hits: Vec<&Row> = table
            .rows
            .iter()
            .filter(|row| matches_all(row, &query.filters))
            .collect();

        if let Some(order) = query.order {
            hits.sort_by(|a, b| {
                let ord = order_cells(a.get(order.column), b.get(order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        hits.into_iter()
            .map(|row| state.project(row, &query.columns))
            .collect()
    }

    async fn insert(&self, insert: &Insert) -> StoreResult<Vec<Row>> {
        let mut state = self.lock()?;
        state.table(insert.table)?;

        let mut staged: Vec<Row> = Vec::with_capacity(insert.rows.len());
        {
            let table = state.table_mut(insert.table)?;
            let mut next_id = table.last_id;
            for row in &insert.rows {
                let mut row = row.clone();
                if row.get(columns::ID).and_then(Json::as_i64).is_none() {
                    next_id += 1;
                    row.insert(columns::ID.to_string(), Json::from(next_id));
                }
                staged.push(row);
            }
        }

        let table = state.table(insert.table)?;
        for (i, row) in staged.iter().enumerate() {
            let others: Vec<&Row> = table
                .rows
                .iter()
                .chain(staged.iter().take(i))
                .collect();
            if others.iter().any(|o| o.get(columns::ID) == row.get(columns::ID)) {
                return Err(StoreError::ConstraintViolation(format!(
                    "duplicate primary key in {}",
                    insert.table
                )));
            }
            state.check_unique(insert.table, row, &others)?;
        }

        let table = state.table_mut(insert.table)?;
        let stored: Vec<Row> = staged.into_iter().map(|row| table.complete(row)).collect();
        table.rows.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn update(&self, update: &Update) -> StoreResult<Vec<Row>> {
        require_filters(&update.filters, "update")?;
        if update.fields.is_empty() {
            return Err(StoreError::InvalidQuery("update without fields".into()));
        }

        let mut state = self.lock()?;
        let table = state.table(update.table)?;

        let targets: Vec<usize> = table
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| matches_all(row, &update.filters))
            .map(|(i, _)| i)
            .collect();

        let mut patched = Vec::with_capacity(targets.len());
        for &i in &targets {
            let mut row = table.rows[i].clone();
            for (key, value) in &update.fields {
                row.insert(key.clone(), value.clone());
            }
            let others: Vec<&Row> = table
                .rows
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, r)| r)
                .collect();
            state.check_unique(update.table, &row, &others)?;
            patched.push(row);
        }

        let table = state.table_mut(update.table)?;
        for (&i, row) in targets.iter().zip(&patched) {
            table.rows[i] = row.clone();
        }
        Ok(patched)
    }

    async fn delete(&self, delete: &Delete) -> StoreResult<Vec<Row>> {
        require_filters(&delete.filters, "delete")?;

        let mut state = self.lock()?;
        let table = state.table_mut(delete.table)?;

        let (removed, kept): (Vec<Row>, Vec<Row>) = table
            .rows
            .drain(..)
            .partition(|row| matches_all(row, &delete.filters));
        table.rows = kept;
        Ok(removed)
    }
}

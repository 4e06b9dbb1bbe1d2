//! Query-builder interface over the relational backend
//!
//! Requests are plain data: a table, structured predicates over typed
//! values, and an optional ordering. Backends render them however they
//! need to; no filter syntax is ever assembled from caller values.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::types::{BookingStatus, RecordId};

/// A stored row as a JSON object keyed by column name
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Typed filter operand
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Text(String),
    Date(NaiveDate),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<BookingStatus> for Value {
    fn from(v: BookingStatus) -> Self {
        Value::Text(v.as_str().to_string())
    }
}

/// Row filter. A request's predicates are AND-ed together.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(&'static str, Value),
    Gt(&'static str, Value),
    Gte(&'static str, Value),
    Lt(&'static str, Value),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Predicate::Eq(column, value.into())
    }

    pub fn gt(column: &'static str, value: impl Into<Value>) -> Self {
        Predicate::Gt(column, value.into())
    }

    pub fn gte(column: &'static str, value: impl Into<Value>) -> Self {
        Predicate::Gte(column, value.into())
    }

    pub fn lt(column: &'static str, value: impl Into<Value>) -> Self {
        Predicate::Lt(column, value.into())
    }

    pub fn or(alternatives: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(alternatives.into_iter().collect())
    }
}

/// Requested column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Field(&'static str),
    /// Nested object from `table` whose `id` equals this row's `on` column,
    /// exposed under the key `table` (null when no row matches)
    Embed {
        table: &'static str,
        columns: Vec<&'static str>,
        on: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

/// Filtered read
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: &'static str,
    /// Empty means every column
    pub columns: Vec<Column>,
    pub filters: Vec<Predicate>,
    pub order: Option<Order>,
}

impl Select {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn columns(mut self, columns: &[&'static str]) -> Self {
        self.columns
            .extend(columns.iter().map(|c| Column::Field(*c)));
        self
    }

    pub fn embed(mut self, table: &'static str, columns: &[&'static str], on: &'static str) -> Self {
        self.columns.push(Column::Embed {
            table,
            columns: columns.to_vec(),
            on,
        });
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn eq(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filter(Predicate::eq(column, value))
    }

    pub fn order_by(mut self, column: &'static str) -> Self {
        self.order = Some(Order {
            column,
            ascending: true,
        });
        self
    }

    pub fn order_by_desc(mut self, column: &'static str) -> Self {
        self.order = Some(Order {
            column,
            ascending: false,
        });
        self
    }
}

/// Insert returning the stored rows
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: &'static str,
    pub rows: Vec<Row>,
}

impl Insert {
    pub fn into_table(table: &'static str) -> Self {
        Self {
            table,
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }
}

/// Update of the given fields on every matching row, returning the new rows
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: &'static str,
    pub fields: Row,
    pub filters: Vec<Predicate>,
}

impl Update {
    pub fn table(table: &'static str, fields: Row) -> Self {
        Self {
            table,
            fields,
            filters: Vec::new(),
        }
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push(Predicate::eq(column, value));
        self
    }
}

/// Delete of every matching row, returning the removed rows
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: &'static str,
    pub filters: Vec<Predicate>,
}

impl Delete {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            filters: Vec::new(),
        }
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push(Predicate::eq(column, value));
        self
    }
}

/// Relational backend seen through a query builder.
///
/// Implementations must refuse updates and deletes without any predicate.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn select(&self, query: &Select) -> StoreResult<Vec<Row>>;

    async fn insert(&self, insert: &Insert) -> StoreResult<Vec<Row>>;

    async fn update(&self, update: &Update) -> StoreResult<Vec<Row>>;

    async fn delete(&self, delete: &Delete) -> StoreResult<Vec<Row>>;
}

/// Decode a row into a record type
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, serde_json::Error> {
    serde_json::from_value(serde_json::Value::Object(row))
}

/// Encode a payload as a row. Fails for payloads that are not JSON objects.
pub fn to_row<T: Serialize>(payload: &T) -> Result<Row, serde_json::Error> {
    match serde_json::to_value(payload)? {
        serde_json::Value::Object(row) => Ok(row),
        other => Err(serde::ser::Error::custom(format!(
            "expected an object payload, got {other}"
        ))),
    }
}

/// Convenience for primary-key lookups
pub fn by_id(id: RecordId) -> Predicate {
    Predicate::eq(crate::schema::columns::ID, id)
}

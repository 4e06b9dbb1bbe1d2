//! Expected backend schema
//!
//! IMPORTANT: the tables are owned by the hosted backend and are not created
//! here. Column names are camelCase and must be quoted in SQL.

use crate::{DbClient, DbError, DbResult};
use oasis_core::schema::tables;
use tracing::{debug, instrument};

/// Tables this layer reads or writes
pub const REQUIRED_TABLES: [&str; 4] = tables::ALL;

impl DbClient {
    /// Verify every required table is visible to the connected role
    #[instrument(skip(self))]
    pub async fn check_schema(&self) -> DbResult<()> {
        let present: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text FROM information_schema.tables
            WHERE table_schema = current_schema() AND table_name = ANY($1)
            "#,
        )
        .bind(&REQUIRED_TABLES[..])
        .fetch_all(self.pool())
        .await?;

        let missing = missing_tables(&present);
        if !missing.is_empty() {
            return Err(DbError::MissingTables(missing));
        }

        debug!("All {} required tables present", REQUIRED_TABLES.len());
        Ok(())
    }
}

fn missing_tables(present: &[String]) -> Vec<String> {
    REQUIRED_TABLES
        .iter()
        .filter(|table| !present.iter().any(|p| p == *table))
        .map(|table| table.to_string())
        .collect()
}

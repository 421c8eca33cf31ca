//! D1 databases
//!
//! The database list endpoint reports `total_pages` and `total_count` as zero
//! no matter how many databases exist, so it is paginated with
//! [`TotalPages::Unreliable`]: a full page means another may follow.

use super::fetcher::{self, encode_segment, require_id, ListRequest, ListStyle};
use crate::api::client::Session;
use crate::engine::metrics::{Metered, Metrics};
use crate::engine::pagination::{Paginated, TotalPages};
use crate::error::Error;
use crate::types::LocationHint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct D1Database {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub num_tables: Option<u64>,
    /// Size in bytes
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
struct CreateDatabase<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_location_hint: Option<&'a LocationHint>,
}

#[derive(Debug, Clone, Serialize)]
struct QueryBody<'a> {
    sql: &'a str,
    #[serde(skip_serializing_if = "no_params")]
    params: &'a [Value],
}

fn no_params(params: &&[Value]) -> bool {
    params.is_empty()
}

/// Execution statistics of one statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMeta {
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub changes: u64,
    #[serde(default)]
    pub last_row_id: Option<i64>,
    #[serde(default)]
    pub rows_read: u64,
    #[serde(default)]
    pub rows_written: u64,
    #[serde(default)]
    pub size_after: Option<u64>,
}

/// Result of one statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub results: Vec<Value>,
    pub success: bool,
    #[serde(default)]
    pub meta: QueryMeta,
}

/// D1 endpoints of the configured account
#[derive(Debug)]
pub struct D1Api {
    session: Arc<Session>,
}

impl D1Api {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    fn database_path(&self) -> Result<String, Error> {
        Ok(format!("accounts/{}/d1/database", encode_segment(self.session.account_id()?)))
    }

    /// List databases, optionally filtered by name
    pub fn list(
        &self,
        name: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<Paginated<'static, D1Database>, Error> {
        let request = ListRequest::new(
            self.database_path()?,
            ListStyle::Numbered(TotalPages::Unreliable),
        )
        .filter("name", name);
        Ok(fetcher::list(&self.session, request, cancel))
    }

    pub async fn get(&self, database_id: &Uuid) -> Result<D1Database, Error> {
        self.session
            .http
            .get(&format!("{}/{}", self.database_path()?, database_id), &[])
            .await?
            .into_result()
    }

    pub async fn create(
        &self,
        name: &str,
        location: Option<&LocationHint>,
    ) -> Result<D1Database, Error> {
        let body = CreateDatabase {
            name: require_id("database name", name)?,
            primary_location_hint: location,
        };
        self.session
            .http
            .post(&self.database_path()?, &body)
            .await?
            .into_result()
    }

    pub async fn delete(&self, database_id: &Uuid) -> Result<(), Error> {
        self.session
            .http
            .delete::<Value>(&format!("{}/{}", self.database_path()?, database_id))
            .await?
            .into_option()?;
        Ok(())
    }

    /// Run SQL; the metrics are the rows read and written across statements
    pub async fn query(
        &self,
        database_id: &Uuid,
        sql: &str,
        params: &[Value],
    ) -> Result<Metered<Vec<QueryResult>>, Error> {
        let sql = require_id("sql", sql)?;
        let results: Vec<QueryResult> = self
            .session
            .http
            .post(
                &format!("{}/{}/query", self.database_path()?, database_id),
                &QueryBody { sql, params },
            )
            .await?
            .into_result()?;

        let metrics = results
            .iter()
            .map(|r| Metrics::rows(r.meta.rows_read, r.meta.rows_written))
            .sum();
        Ok(Metered::new(results, metrics))
    }
}

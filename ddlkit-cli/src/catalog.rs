//! PostgreSQL catalog access for `pull` and `drift`.

use async_trait::async_trait;
use ddlkit_migrate::{CatalogQuery, MigrateResult, MigrationError};
use serde_json::Value;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

use crate::error::{CliError, CliResult};

/// A connected catalog. Each query is wrapped so rows come back as JSON.
pub struct PgCatalog {
    client: Client,
}

impl PgCatalog {
    /// Connect to `url`. The connection task runs until the catalog is
    /// dropped.
    pub async fn connect(url: &str) -> CliResult<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| CliError::Database(format!("Failed to connect: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "Connection error");
            }
        });

        debug!("Connected to database");
        Ok(Self { client })
    }
}

#[async_trait]
impl CatalogQuery for PgCatalog {
    async fn query(&self, sql: &str) -> MigrateResult<Vec<Value>> {
        let wrapped = format!("SELECT row_to_json(q) FROM ({}) AS q", sql);
        let rows = self
            .client
            .query(wrapped.as_str(), &[])
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?;
        rows.iter()
            .map(|row| {
                row.try_get::<_, Value>(0)
                    .map_err(|e| MigrationError::database(e.to_string()))
            })
            .collect()
    }
}
